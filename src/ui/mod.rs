// User interface module
// Terminal lifecycle, event dispatch and the frequency-bar renderer

pub mod terminal_ui;
pub mod widgets;

pub use terminal_ui::{run_tui, TerminalUI, UiAction};
pub use widgets::FrequencyBars;
