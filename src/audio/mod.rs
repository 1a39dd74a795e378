mod analyser;
mod capture;
mod pipeline;

pub use analyser::{Analyser, BIN_COUNT, FFT_SIZE};
pub use capture::{AudioCapture, AudioDevice, AudioDeviceManager, AudioError};
pub use pipeline::{AudioPipeline, PipelineState};
