// Spectre: terminal microphone spectrum visualizer
// Expose public modules for use in integration tests

pub mod app;
pub mod audio;
pub mod ui;

// Re-export commonly used types for convenience
pub use app::{App, Config};
pub use audio::{Analyser, AudioPipeline, PipelineState, BIN_COUNT, FFT_SIZE};
pub use ui::FrequencyBars;
