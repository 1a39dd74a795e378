pub mod config;

pub use config::Config;

use crate::audio::{AudioError, AudioPipeline, BIN_COUNT};

/// Main application struct that coordinates configuration and the audio
/// pipeline. The UI owns one instance behind `Arc<Mutex>`.
pub struct App {
    config: Config,
    pipeline: AudioPipeline,
}

impl App {
    /// Creates a new application instance with default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates a new application instance with a specified configuration.
    pub fn with_config(config: Config) -> Self {
        let pipeline =
            AudioPipeline::new(config.smoothing).with_input_device(config.input_device.clone());
        Self { config, pipeline }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// First user gesture: bring up the capture/analysis chain. No-op once
    /// the pipeline is ready.
    pub async fn activate(&mut self) -> Result<(), AudioError> {
        self.pipeline.activate().await
    }

    pub fn is_ready(&self) -> bool {
        self.pipeline.is_ready()
    }

    /// Update the smoothing constant, applied immediately to a live
    /// analyser.
    pub fn set_smoothing(&mut self, value: f32) {
        self.config.smoothing = value;
        self.pipeline.set_smoothing(value);
    }

    pub fn smoothing(&self) -> f32 {
        self.pipeline.smoothing()
    }

    /// Snapshot of the current per-bin magnitudes, or `None` while the
    /// pipeline is not ready.
    pub fn frequency_magnitudes(&mut self) -> Option<[u8; BIN_COUNT]> {
        self.pipeline.read_magnitudes().copied()
    }

    /// Shuts down the application, releasing the capture stream.
    pub async fn shutdown(&mut self) -> Result<(), AudioError> {
        self.pipeline.shutdown().await
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_starts_idle() {
        let mut app = App::new();
        assert!(!app.is_ready());
        assert!(app.frequency_magnitudes().is_none());
        assert_eq!(app.smoothing(), 0.6);
    }

    #[test]
    fn test_set_smoothing_tracks_config() {
        let mut app = App::new();
        app.set_smoothing(0.85);
        assert_eq!(app.smoothing(), 0.85);
        assert_eq!(app.config().smoothing, 0.85);
    }

    #[test]
    fn test_app_shutdown_when_idle() {
        let mut app = App::new();
        tokio_test::block_on(async {
            assert!(app.shutdown().await.is_ok());
        });
    }
}
