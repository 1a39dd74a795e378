use cpal::{
    self,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};
use log::warn;
use ringbuf::HeapRb;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// A capture device as reported by the audio host.
#[derive(Debug, Clone)]
pub struct AudioDevice {
    pub name: String,
}

impl fmt::Display for AudioDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no input device available")]
    NoInputDevice,
    #[error("input device not found: {0}")]
    DeviceNotFound(String),
    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),
    #[error("audio capture already started")]
    AlreadyStarted,
    #[error("audio capture not started")]
    NotStarted,
    #[error("failed to enumerate input devices: {0}")]
    Devices(#[from] cpal::DevicesError),
    #[error("no usable input stream config: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),
    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),
    #[error("failed to start input stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

pub struct AudioDeviceManager;

impl AudioDeviceManager {
    /// List the capture devices the default host exposes.
    pub fn input_devices() -> Vec<AudioDevice> {
        let mut devices = Vec::new();

        let host = cpal::default_host();
        if let Ok(inputs) = host.input_devices() {
            for device in inputs {
                if let Ok(name) = device.name() {
                    devices.push(AudioDevice { name });
                }
            }
        }

        devices
    }
}

/// Microphone capture: a cpal input stream feeding a lock-free ring buffer,
/// drained on a timer into the registered data callback.
pub struct AudioCapture {
    device_name: Option<String>,
    is_active: bool,
    data_tx: Option<mpsc::Sender<Vec<f32>>>,
    cancel_token: Option<tokio::sync::oneshot::Sender<()>>,
    stream: Option<cpal::Stream>,
}

impl AudioCapture {
    pub fn new() -> Self {
        Self {
            device_name: None,
            is_active: false,
            data_tx: None,
            cancel_token: None,
            stream: None,
        }
    }

    /// Capture from a specific device instead of the host default. The name
    /// must match one reported by `AudioDeviceManager::input_devices`.
    pub fn set_device(&mut self, name: &str) {
        self.device_name = Some(name.to_string());
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Register the callback that receives mono sample chunks.
    pub fn set_data_callback<F>(&mut self, callback: F)
    where
        F: Fn(Vec<f32>) + Send + Sync + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<Vec<f32>>(100);
        self.data_tx = Some(tx);

        let callback = Arc::new(callback);
        tokio::spawn(async move {
            while let Some(data) = rx.recv().await {
                callback(data);
            }
        });
    }

    pub async fn start(&mut self) -> Result<(), AudioError> {
        if self.is_active {
            return Err(AudioError::AlreadyStarted);
        }

        let host = cpal::default_host();

        // An explicitly named device must exist; only an unset name falls
        // back to the host default.
        let device = match &self.device_name {
            Some(name) => host
                .input_devices()?
                .find(|d| d.name().map(|n| &n == name).unwrap_or(false))
                .ok_or_else(|| AudioError::DeviceNotFound(name.clone()))?,
            None => host
                .default_input_device()
                .ok_or(AudioError::NoInputDevice)?,
        };

        let config = device.default_input_config()?;
        let channels = config.channels() as usize;

        let ring_size = 1024 * 8;
        let rb = HeapRb::<f32>::new(ring_size);
        let (mut prod, mut cons) = rb.split();

        let err_fn = |err: cpal::StreamError| {
            warn!("audio stream error: {}", err);
        };

        // Interleaved frames are downmixed to mono before they enter the
        // ring buffer; the analyser operates on a single channel.
        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => device.build_input_stream(
                &config.into(),
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    for frame in data.chunks(channels) {
                        let sample = frame.iter().sum::<f32>() / channels as f32;
                        let _ = prod.push(sample);
                    }
                },
                err_fn,
                None,
            )?,
            cpal::SampleFormat::I16 => device.build_input_stream(
                &config.into(),
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    for frame in data.chunks(channels) {
                        let sum: f32 = frame.iter().map(|&s| s as f32 / i16::MAX as f32).sum();
                        let _ = prod.push(sum / channels as f32);
                    }
                },
                err_fn,
                None,
            )?,
            cpal::SampleFormat::U16 => device.build_input_stream(
                &config.into(),
                move |data: &[u16], _: &cpal::InputCallbackInfo| {
                    for frame in data.chunks(channels) {
                        let sum: f32 = frame
                            .iter()
                            .map(|&s| (s as f32 / u16::MAX as f32) * 2.0 - 1.0)
                            .sum();
                        let _ = prod.push(sum / channels as f32);
                    }
                },
                err_fn,
                None,
            )?,
            other => return Err(AudioError::UnsupportedFormat(format!("{:?}", other))),
        };

        stream.play()?;
        self.stream = Some(stream);

        let (cancel_tx, mut cancel_rx) = tokio::sync::oneshot::channel();
        self.cancel_token = Some(cancel_tx);

        let data_tx = self.data_tx.clone();

        // Drain the ring buffer on a short timer and forward chunks to the
        // data callback channel.
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(20));
            let mut buffer = Vec::with_capacity(1024);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        buffer.clear();
                        while let Some(sample) = cons.pop() {
                            buffer.push(sample);
                            if buffer.len() >= 1024 {
                                break;
                            }
                        }

                        if !buffer.is_empty() {
                            if let Some(tx) = &data_tx {
                                let _ = tx.send(buffer.clone()).await;
                            }
                        }
                    }
                    _ = &mut cancel_rx => {
                        break;
                    }
                }
            }
        });

        self.is_active = true;
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<(), AudioError> {
        if !self.is_active {
            return Err(AudioError::NotStarted);
        }

        if let Some(cancel_token) = self.cancel_token.take() {
            let _ = cancel_token.send(());
        }

        self.stream = None;
        self.is_active = false;
        Ok(())
    }
}

impl Default for AudioCapture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stop_without_start_is_an_error() {
        let mut capture = AudioCapture::new();
        assert!(matches!(capture.stop().await, Err(AudioError::NotStarted)));
    }

    #[tokio::test]
    async fn test_missing_named_device_is_rejected() {
        let mut capture = AudioCapture::new();
        capture.set_device("spectre-test-device-that-does-not-exist");
        assert!(capture.start().await.is_err());
        assert!(!capture.is_active());
    }
}
