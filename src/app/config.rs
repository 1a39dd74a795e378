use anyhow::Context;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Startup configuration for the visualizer.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Analyser smoothing constant in [0, 1].
    pub smoothing: f32,
    /// Redraw requests per second.
    pub frame_rate: u32,
    /// Capture device name; `None` selects the host default.
    pub input_device: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            smoothing: 0.6,
            frame_rate: 24,
            input_device: None,
        }
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let input_device = self.input_device.as_deref().unwrap_or("none");
        write!(
            f,
            "smoothing={}\nframe_rate={}\ninput_device={}",
            self.smoothing, self.frame_rate, input_device
        )
    }
}

#[derive(Debug, Error)]
#[error("configuration error: {message}")]
pub struct ConfigParseError {
    message: String,
}

impl ConfigParseError {
    fn new(message: String) -> Self {
        Self { message }
    }
}

impl FromStr for Config {
    type Err = ConfigParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut config = Config::default();

        for line in s.lines() {
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }

            let parts: Vec<&str> = line.splitn(2, '=').collect();
            if parts.len() != 2 {
                return Err(ConfigParseError::new(format!(
                    "invalid line format: {}",
                    line
                )));
            }

            let key = parts[0].trim();
            let value = parts[1].trim();

            match key {
                "smoothing" => {
                    config.smoothing = value.parse().map_err(|_| {
                        ConfigParseError::new(format!("invalid smoothing: {}", value))
                    })?;
                }
                "frame_rate" => {
                    let rate: u32 = value.parse().map_err(|_| {
                        ConfigParseError::new(format!("invalid frame rate: {}", value))
                    })?;
                    if rate == 0 {
                        return Err(ConfigParseError::new("frame rate must be nonzero".into()));
                    }
                    config.frame_rate = rate;
                }
                "input_device" => {
                    config.input_device = if value == "none" {
                        None
                    } else {
                        Some(value.to_string())
                    };
                }
                _ => {
                    return Err(ConfigParseError::new(format!(
                        "unknown configuration key: {}",
                        key
                    )));
                }
            }
        }

        Ok(config)
    }
}

impl Config {
    /// Loads configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file {}", path.as_ref().display()))?;
        let config = content.parse()?;
        Ok(config)
    }

    /// Saves configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        fs::write(&path, self.to_string())
            .with_context(|| format!("failed to write config file {}", path.as_ref().display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.smoothing, 0.6);
        assert_eq!(config.frame_rate, 24);
        assert!(config.input_device.is_none());
    }

    #[test]
    fn test_config_round_trip() {
        let mut config = Config::default();
        config.smoothing = 0.25;
        config.frame_rate = 30;
        config.input_device = Some("Microphone".to_string());

        let serialized = config.to_string();
        let deserialized: Config = serialized.parse().unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_config_load_save() {
        let temp_file = std::env::temp_dir().join("spectre_test_config.tmp");

        let mut config = Config::default();
        config.frame_rate = 60;
        config.save(&temp_file).unwrap();

        let loaded = Config::load(&temp_file).unwrap();
        assert_eq!(loaded, config);

        fs::remove_file(temp_file).unwrap();
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        assert!("volume=11".parse::<Config>().is_err());
    }

    #[test]
    fn test_zero_frame_rate_is_rejected() {
        assert!("frame_rate=0".parse::<Config>().is_err());
    }

    #[test]
    fn test_comments_and_blanks_are_skipped() {
        let parsed: Config = "# a comment\n\nsmoothing=0.8".parse().unwrap();
        assert_eq!(parsed.smoothing, 0.8);
        assert_eq!(parsed.frame_rate, 24);
    }
}
