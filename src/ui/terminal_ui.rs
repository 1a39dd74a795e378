use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers, MouseEvent,
        MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::warn;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    widgets::{Block, Borders, Paragraph},
    Terminal,
};
use std::{
    io,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use crate::app::App;
use crate::audio::BIN_COUNT;
use crate::ui::widgets::FrequencyBars;

/// Step applied by the smoothing keys.
const SMOOTHING_STEP: f32 = 0.05;

/// Actions the event handlers can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiAction {
    Activate,
    RaiseSmoothing,
    LowerSmoothing,
    Quit,
}

/// Transient status-bar message.
#[derive(Debug, Clone)]
struct Notification {
    message: String,
    start_time: Instant,
    duration: Duration,
}

/// Main UI controller that manages terminal rendering.
pub struct TerminalUI {
    terminal: Option<Terminal<CrosstermBackend<io::Stdout>>>,
    bars: FrequencyBars,
    notification: Option<Notification>,
}

impl TerminalUI {
    pub fn new() -> Self {
        Self {
            terminal: None,
            bars: FrequencyBars::new(),
            notification: None,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.terminal.is_some()
    }

    /// Enter raw mode and the alternate screen; mouse capture makes the
    /// click-to-start gesture reachable.
    pub fn initialize(&mut self) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

        let backend = CrosstermBackend::new(stdout);
        self.terminal = Some(Terminal::new(backend)?);

        Ok(())
    }

    /// Restore the terminal.
    pub fn shutdown(&mut self) -> io::Result<()> {
        if let Some(terminal) = self.terminal.as_mut() {
            disable_raw_mode()?;
            execute!(
                terminal.backend_mut(),
                LeaveAlternateScreen,
                DisableMouseCapture
            )?;
            terminal.show_cursor()?;
        }
        Ok(())
    }

    /// Hand the renderer the current frame data.
    pub fn update_frame(&self, magnitudes: Option<&[u8; BIN_COUNT]>) {
        self.bars.update_frame(magnitudes);
    }

    pub fn show_notification(&mut self, message: String, duration: Duration) {
        self.notification = Some(Notification {
            message,
            start_time: Instant::now(),
            duration,
        });
    }

    fn update_notification(&mut self) {
        if let Some(notification) = &self.notification {
            if notification.start_time.elapsed() >= notification.duration {
                self.notification = None;
            }
        }
    }

    pub fn handle_key_event(&self, key: KeyCode) -> Option<UiAction> {
        match key {
            KeyCode::Enter | KeyCode::Char(' ') => Some(UiAction::Activate),
            KeyCode::Char('+') | KeyCode::Char('=') => Some(UiAction::RaiseSmoothing),
            KeyCode::Char('-') => Some(UiAction::LowerSmoothing),
            KeyCode::Char('q') | KeyCode::Esc => Some(UiAction::Quit),
            _ => None,
        }
    }

    pub fn handle_mouse_event(&self, mouse: &MouseEvent) -> Option<UiAction> {
        match mouse.kind {
            MouseEventKind::Down(_) => Some(UiAction::Activate),
            _ => None,
        }
    }

    /// Polls for terminal events.
    pub fn poll_events(&self, timeout: Duration) -> io::Result<Option<Event>> {
        if event::poll(timeout)? {
            return Ok(Some(event::read()?));
        }
        Ok(None)
    }

    /// Renders the UI.
    pub fn render(&mut self, app: &App) -> io::Result<()> {
        self.update_notification();

        if let Some(terminal) = self.terminal.as_mut() {
            let bars = self.bars.clone();
            let notification = self.notification.clone();
            let smoothing = app.smoothing();
            let capturing = app.is_ready();

            terminal.draw(|frame| {
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([
                        Constraint::Min(3),    // Visualization area
                        Constraint::Length(3), // Status bar
                    ])
                    .split(frame.size());

                frame.render_widget(bars, chunks[0]);

                let state_text = if capturing { "capturing" } else { "idle" };
                let mut status = format!(
                    "smoothing {:.2}  |  {}  |  [enter/click] start  [+/-] smoothing  [q] quit",
                    smoothing, state_text
                );
                if let Some(notification) = &notification {
                    status.push_str("  |  ");
                    status.push_str(&notification.message);
                }

                let status_bar = Paragraph::new(status)
                    .block(Block::default().borders(Borders::ALL).title("Status"));
                frame.render_widget(status_bar, chunks[1]);
            })?;
        }
        Ok(())
    }
}

impl Default for TerminalUI {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the TUI application.
pub async fn run_tui(app: Arc<Mutex<App>>) -> io::Result<()> {
    let mut terminal_ui = TerminalUI::new();
    terminal_ui.initialize()?;

    // Fixed-rate redraw requests; events are polled with whatever time is
    // left before the next frame, so input never stalls rendering.
    let tick_rate = {
        let app = app.lock().unwrap();
        Duration::from_secs_f64(1.0 / app.config().frame_rate as f64)
    };
    let mut last_tick = Instant::now();

    loop {
        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if let Some(event) = terminal_ui.poll_events(timeout)? {
            let action = match event {
                Event::Key(key_event) => {
                    if key_event.modifiers.contains(KeyModifiers::CONTROL)
                        && key_event.code == KeyCode::Char('c')
                    {
                        Some(UiAction::Quit)
                    } else {
                        terminal_ui.handle_key_event(key_event.code)
                    }
                }
                Event::Mouse(mouse_event) => terminal_ui.handle_mouse_event(&mouse_event),
                _ => None,
            };

            if let Some(action) = action {
                let mut app_lock = app.lock().unwrap();
                match action {
                    UiAction::Activate => {
                        if let Err(e) = app_lock.activate().await {
                            warn!("audio activation failed: {}", e);
                            terminal_ui.show_notification(
                                format!("audio unavailable: {}", e),
                                Duration::from_secs(5),
                            );
                        }
                    }
                    UiAction::RaiseSmoothing => {
                        let smoothing = (app_lock.smoothing() + SMOOTHING_STEP).min(1.0);
                        app_lock.set_smoothing(smoothing);
                    }
                    UiAction::LowerSmoothing => {
                        let smoothing = (app_lock.smoothing() - SMOOTHING_STEP).max(0.0);
                        app_lock.set_smoothing(smoothing);
                    }
                    UiAction::Quit => break,
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            {
                let mut app_lock = app.lock().unwrap();
                let magnitudes = app_lock.frequency_magnitudes();
                terminal_ui.update_frame(magnitudes.as_ref());
            }

            terminal_ui.render(&app.lock().unwrap())?;

            last_tick = Instant::now();
        }
    }

    terminal_ui.shutdown()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_bindings() {
        let ui = TerminalUI::new();
        assert_eq!(ui.handle_key_event(KeyCode::Enter), Some(UiAction::Activate));
        assert_eq!(
            ui.handle_key_event(KeyCode::Char(' ')),
            Some(UiAction::Activate)
        );
        assert_eq!(
            ui.handle_key_event(KeyCode::Char('+')),
            Some(UiAction::RaiseSmoothing)
        );
        assert_eq!(
            ui.handle_key_event(KeyCode::Char('-')),
            Some(UiAction::LowerSmoothing)
        );
        assert_eq!(ui.handle_key_event(KeyCode::Char('q')), Some(UiAction::Quit));
        assert_eq!(ui.handle_key_event(KeyCode::Char('x')), None);
    }

    #[test]
    fn test_uninitialized_ui_renders_nothing() {
        let mut ui = TerminalUI::new();
        assert!(!ui.is_initialized());
        // Render without a terminal attached is a no-op, not a panic.
        let app = App::new();
        assert!(ui.render(&app).is_ok());
    }
}
