use log::{info, warn};
use std::sync::{Arc, Mutex};

use super::analyser::{Analyser, BIN_COUNT};
use super::capture::{AudioCapture, AudioError};

/// Fixed gain applied between the capture source and the analyser.
const INPUT_GAIN: f32 = 2.0;

/// Lifecycle of the capture/analysis chain. One forward transition, taken
/// exactly once, on the first successful activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Uninitialized,
    Ready,
}

/// Lazily-initialized microphone capture and frequency-analysis chain.
///
/// Created inert; `activate` builds the chain on the first user gesture and
/// is a no-op once the pipeline is ready. Magnitudes are only available in
/// the ready state.
pub struct AudioPipeline {
    state: PipelineState,
    smoothing: f32,
    input_device: Option<String>,
    analyser: Option<Arc<Mutex<Analyser>>>,
    capture: Option<AudioCapture>,
    magnitudes: [u8; BIN_COUNT],
}

impl AudioPipeline {
    pub fn new(smoothing: f32) -> Self {
        Self {
            state: PipelineState::Uninitialized,
            smoothing,
            input_device: None,
            analyser: None,
            capture: None,
            magnitudes: [0; BIN_COUNT],
        }
    }

    pub fn with_input_device(mut self, device: Option<String>) -> Self {
        self.input_device = device;
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == PipelineState::Ready
    }

    /// Build and start the capture/analysis chain. Idempotent once ready.
    ///
    /// A failed attempt leaves its analyser behind and the state untouched;
    /// the next activation replaces the partial chain wholesale, so retry
    /// always starts from a fresh context.
    pub async fn activate(&mut self) -> Result<(), AudioError> {
        if self.state == PipelineState::Ready {
            return Ok(());
        }

        let analyser = Arc::new(Mutex::new(Analyser::new(self.smoothing)));
        self.analyser = Some(Arc::clone(&analyser));
        self.magnitudes = [0; BIN_COUNT];

        let mut capture = AudioCapture::new();
        if let Some(name) = &self.input_device {
            capture.set_device(name);
        }

        capture.set_data_callback(move |samples| {
            let mut analyser = analyser.lock().unwrap();
            analyser.push_samples(&samples, INPUT_GAIN);
        });

        if let Err(e) = capture.start().await {
            warn!("audio activation failed: {}", e);
            return Err(e);
        }

        self.capture = Some(capture);
        self.state = PipelineState::Ready;
        info!("audio pipeline ready");
        Ok(())
    }

    /// Update the smoothing constant. Applies immediately to the live
    /// analyser when one exists; otherwise only the stored default used at
    /// creation time changes. The value is passed through unvalidated.
    pub fn set_smoothing(&mut self, value: f32) {
        self.smoothing = value;
        if let Some(analyser) = &self.analyser {
            analyser.lock().unwrap().set_smoothing_time_constant(value);
        }
    }

    pub fn smoothing(&self) -> f32 {
        self.smoothing
    }

    /// Refresh and expose the per-bin byte magnitudes. `None` until the
    /// pipeline is ready; the returned buffer is reused across calls.
    pub fn read_magnitudes(&mut self) -> Option<&[u8; BIN_COUNT]> {
        if self.state != PipelineState::Ready {
            return None;
        }

        if let Some(analyser) = &self.analyser {
            analyser
                .lock()
                .unwrap()
                .byte_frequency_data(&mut self.magnitudes);
        }

        Some(&self.magnitudes)
    }

    /// Stop capture and release the stream. Only called on the way out of
    /// the application, after the render loop has stopped.
    pub async fn shutdown(&mut self) -> Result<(), AudioError> {
        if let Some(capture) = self.capture.as_mut() {
            capture.stop().await?;
        }
        self.capture = None;
        Ok(())
    }
}
