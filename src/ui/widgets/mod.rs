mod frequency_bars;

pub use frequency_bars::{FrequencyBars, WAITING_MESSAGE};
