use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

/// Transform size of the analyser. 256 input samples per frame.
pub const FFT_SIZE: usize = 256;

/// Number of usable magnitude bins per frame.
pub const BIN_COUNT: usize = FFT_SIZE / 2;

/// Decibel range mapped onto the 0-255 byte magnitudes. The ceiling sits at
/// 1 dB, just above unity gain, which compresses almost every real signal
/// into the same band of the byte range.
const MIN_DECIBELS: f32 = -100.0;
const MAX_DECIBELS: f32 = 1.0;

/// Frequency analyser over a rolling window of input samples.
///
/// Keeps the most recent `FFT_SIZE` samples, and on demand produces one byte
/// magnitude (0-255) per bin: Blackman-windowed FFT, exponential smoothing
/// against the previous frame, then a linear map of the decibel range onto
/// the byte range.
pub struct Analyser {
    fft: Arc<dyn Fft<f32>>,
    window: [f32; FFT_SIZE],
    ring: [f32; FFT_SIZE],
    write_pos: usize,
    scratch: Vec<Complex<f32>>,
    smoothed: [f32; BIN_COUNT],
    smoothing: f32,
}

impl Analyser {
    pub fn new(smoothing: f32) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(FFT_SIZE);

        // Blackman window
        let mut window = [0.0f32; FFT_SIZE];
        for (n, w) in window.iter_mut().enumerate() {
            let phase = 2.0 * PI * n as f32 / FFT_SIZE as f32;
            *w = 0.42 - 0.5 * phase.cos() + 0.08 * (2.0 * phase).cos();
        }

        Self {
            fft,
            window,
            ring: [0.0; FFT_SIZE],
            write_pos: 0,
            scratch: vec![Complex::new(0.0, 0.0); FFT_SIZE],
            smoothed: [0.0; BIN_COUNT],
            smoothing: smoothing.clamp(0.0, 1.0),
        }
    }

    /// Push mono samples into the rolling window, scaled by `gain`.
    pub fn push_samples(&mut self, samples: &[f32], gain: f32) {
        for &sample in samples {
            self.ring[self.write_pos] = sample * gain;
            self.write_pos = (self.write_pos + 1) % FFT_SIZE;
        }
    }

    /// Update the smoothing constant for subsequent frames. Out-of-range
    /// values are clamped to [0, 1], matching what a platform analyser node
    /// would tolerate.
    pub fn set_smoothing_time_constant(&mut self, tau: f32) {
        self.smoothing = tau.clamp(0.0, 1.0);
    }

    pub fn smoothing_time_constant(&self) -> f32 {
        self.smoothing
    }

    /// Fill `out` with the current per-bin byte magnitudes.
    ///
    /// Each call recomputes the transform over the current window and blends
    /// it with the previous frame: `s[k] = tau * s[k] + (1 - tau) * |X[k]|/N`.
    /// Silent bins (s[k] == 0) produce -inf dB, which clamps to 0.
    pub fn byte_frequency_data(&mut self, out: &mut [u8; BIN_COUNT]) {
        for i in 0..FFT_SIZE {
            let idx = (self.write_pos + i) % FFT_SIZE;
            self.scratch[i] = Complex::new(self.ring[idx] * self.window[i], 0.0);
        }

        self.fft.process(&mut self.scratch);

        let tau = self.smoothing;
        let db_span = MAX_DECIBELS - MIN_DECIBELS;
        for (k, byte) in out.iter_mut().enumerate() {
            let magnitude = self.scratch[k].norm() / FFT_SIZE as f32;
            let blended = tau * self.smoothed[k] + (1.0 - tau) * magnitude;
            self.smoothed[k] = blended;

            let db = 20.0 * blended.log10();
            let scaled = 255.0 * (db - MIN_DECIBELS) / db_span;
            *byte = scaled.clamp(0.0, 255.0) as u8;
        }
    }
}
