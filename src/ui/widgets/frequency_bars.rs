use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    symbols,
    widgets::Widget,
};
use std::sync::{Arc, Mutex};

use crate::audio::BIN_COUNT;

/// Status line shown until the audio pipeline is ready.
pub const WAITING_MESSAGE: &str = "Waiting on audio capture, click or press Enter to start.";

/// Per-frame trail decay: each cell keeps 90% of its color, the equivalent
/// of an alpha-0.1 black overlay instead of a hard clear.
const FADE: f32 = 0.9;

/// Base offset added to every color channel.
const MIN_CHANNEL: f32 = 10.0;

/// Slots overlap their neighbours slightly to avoid visible gaps.
const SLOT_OVERLAP: f32 = 1.05;

/// Stroke thickness of a full-scale bar, in cells.
const MAX_STROKE: f32 = 10.0;

/// Dash pattern along a bar: one cell on, twelve off.
const DASH_ON: usize = 1;
const DASH_OFF: usize = 12;

#[derive(Debug, Clone, Copy, Default)]
struct TrailCell {
    r: f32,
    g: f32,
    b: f32,
}

struct BarsState {
    ready: bool,
    magnitudes: [u8; BIN_COUNT],
    trails: Vec<TrailCell>,
    width: u16,
    height: u16,
}

impl BarsState {
    fn new() -> Self {
        Self {
            ready: false,
            magnitudes: [0; BIN_COUNT],
            trails: Vec::new(),
            width: 0,
            height: 0,
        }
    }

    /// Reallocate the trail buffer when the render area changes size.
    fn resize(&mut self, width: u16, height: u16) {
        if self.width != width || self.height != height {
            self.width = width;
            self.height = height;
            self.trails = vec![TrailCell::default(); width as usize * height as usize];
        }
    }

    fn fade(&mut self) {
        for cell in &mut self.trails {
            cell.r *= FADE;
            cell.g *= FADE;
            cell.b *= FADE;
        }
    }

    /// Rasterize one vertical dashed bar hanging from the top edge.
    fn draw_bar(&mut self, left: f32, bar_height: f32, stroke: f32, color: (u8, u8, u8)) {
        let columns = stroke.round() as i32;
        if columns <= 0 {
            return;
        }

        let rows = (bar_height.floor() as i32).min(self.height as i32);
        let x0 = left.floor() as i32 - (columns - 1) / 2;

        for dx in 0..columns {
            let x = x0 + dx;
            if x < 0 || x >= self.width as i32 {
                continue;
            }

            for y in 0..rows {
                if y as usize % (DASH_ON + DASH_OFF) < DASH_ON {
                    let cell = &mut self.trails[y as usize * self.width as usize + x as usize];
                    cell.r = color.0 as f32;
                    cell.g = color.1 as f32;
                    cell.b = color.2 as f32;
                }
            }
        }
    }

    /// Copy the trail buffer into the terminal buffer.
    fn blit(&self, area: Rect, buf: &mut Buffer) {
        for y in 0..self.height {
            for x in 0..self.width {
                let cell = self.trails[y as usize * self.width as usize + x as usize];
                let color = Color::Rgb(cell.r as u8, cell.g as u8, cell.b as u8);
                buf.get_mut(area.x + x, area.y + y)
                    .set_symbol(symbols::block::FULL)
                    .set_style(Style::default().fg(color));
            }
        }
    }
}

/// Frequency-bar visualization with fading trails.
///
/// One vertical dashed bar per frequency bin, hanging from the top of the
/// area; position, height, thickness and color all derive from the bin index
/// and its current magnitude. The trail buffer persists between frames, so
/// previous frames decay instead of vanishing.
#[derive(Clone)]
pub struct FrequencyBars {
    state: Arc<Mutex<BarsState>>,
}

impl FrequencyBars {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(BarsState::new())),
        }
    }

    /// Feed the widget the current frame: the latest magnitude snapshot, or
    /// `None` while the audio pipeline is not ready.
    pub fn update_frame(&self, magnitudes: Option<&[u8; BIN_COUNT]>) {
        let mut state = self.state.lock().unwrap();
        match magnitudes {
            Some(values) => {
                state.ready = true;
                state.magnitudes.copy_from_slice(values);
            }
            None => state.ready = false,
        }
    }
}

impl Default for FrequencyBars {
    fn default() -> Self {
        Self::new()
    }
}

impl Widget for FrequencyBars {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        let mut state = self.state.lock().unwrap();
        state.resize(area.width, area.height);
        state.fade();

        if !state.ready {
            state.blit(area, buf);
            buf.set_string(
                area.x + 1,
                area.y,
                WAITING_MESSAGE,
                Style::default().fg(Color::White),
            );
            return;
        }

        let magnitudes = state.magnitudes;
        let width = state.width as f32;
        let height = state.height as f32;

        for (i, &raw) in magnitudes.iter().enumerate() {
            let value = boosted_value(i, BIN_COUNT, raw);
            // Slot width is part of the layout but the stroke itself is
            // bounded by stroke width; only the left edge places the bar.
            let (left, _slot) = bar_slot(i, BIN_COUNT, width);
            let color = to_rgb(bar_color(i, BIN_COUNT, value));
            state.draw_bar(left, bar_height(value, height), stroke_width(value), color);
        }

        state.blit(area, buf);
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Raw byte magnitude with the high-frequency boost applied: later bins get
/// `i^2 / (bins * 1.5)` extra, compensating for their naturally lower energy.
fn boosted_value(i: usize, bins: usize, raw: u8) -> f32 {
    let mut value = raw as f32;
    if value > 0.001 {
        value += (i * i) as f32 / (bins as f32 * 1.5);
    }
    value
}

/// Left edge and (overlapping) slot width of bin `i`.
fn bar_slot(i: usize, bins: usize, width: f32) -> (f32, f32) {
    let left = i as f32 / bins as f32 * width;
    let slot = width / bins as f32 * SLOT_OVERLAP;
    (left, slot)
}

fn bar_height(value: f32, height: f32) -> f32 {
    value / 255.0 * height
}

fn stroke_width(value: f32) -> f32 {
    value / 255.0 * MAX_STROKE
}

/// Color channels for bin `i` at (boosted) magnitude `value`, before the
/// final modulo. Channels are deliberately unclamped; the wraparound when a
/// boosted channel passes 255 is part of the visual signature.
fn bar_color(i: usize, bins: usize, value: f32) -> (f32, f32, f32) {
    let mut g = MIN_CHANNEL + i as f32 / bins as f32;
    let mut b = MIN_CHANNEL + value;
    let mut r = MIN_CHANNEL + lerp(g, b, value / 255.0);

    // 1/value is IEEE +inf at zero, so silent bins always take the red
    // override; otherwise it only reaches the lowest few bins.
    if value > 128.0 || 1.0 / value + 0.1 > i as f32 {
        r = 255.0;
    }

    // Periodic brightness accent on every 4th bin.
    if i % 4 == 0 {
        r *= 4.0;
        g *= 4.0;
        b *= 4.0;
    }

    (r, g, b)
}

/// Wrap each channel modulo 255 and truncate to a byte.
fn to_rgb((r, g, b): (f32, f32, f32)) -> (u8, u8, u8) {
    ((r % 255.0) as u8, (g % 255.0) as u8, (b % 255.0) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BINS: usize = BIN_COUNT;

    fn lit_cells(buf: &Buffer, area: Rect) -> Vec<(u16, u16)> {
        let mut lit = Vec::new();
        for y in area.y..area.y + area.height {
            for x in area.x..area.x + area.width {
                if let Color::Rgb(r, g, b) = buf.get(x, y).fg {
                    if r > 0 || g > 0 || b > 0 {
                        lit.push((x, y));
                    }
                }
            }
        }
        lit
    }

    #[test]
    fn test_stroke_width_formula() {
        for value in [0u8, 1, 64, 128, 255] {
            let v = value as f32;
            assert_eq!(stroke_width(v), v / 255.0 * 10.0);
        }
        assert!(stroke_width(200.0) > stroke_width(100.0));
        assert_eq!(stroke_width(0.0), 0.0);
    }

    #[test]
    fn test_zero_value_channels() {
        for i in [0usize, 1, 5, 64, 127] {
            let (r, g, b) = bar_color(i, BINS, 0.0);
            let accent = if i % 4 == 0 { 4.0 } else { 1.0 };
            // Division by zero reads as +inf, so the red override fires on
            // every silent bin.
            assert_eq!(r, 255.0 * accent, "bin {}", i);
            assert_eq!(g, (10.0 + i as f32 / BINS as f32) * accent, "bin {}", i);
            assert_eq!(b, 10.0 * accent, "bin {}", i);
            assert_eq!(bar_height(0.0, 40.0), 0.0);
        }
    }

    #[test]
    fn test_color_grid_pre_modulo() {
        // i = 0, value = 0: override + accent.
        let (r, g, b) = bar_color(0, BINS, 0.0);
        assert_eq!((r, g, b), (255.0 * 4.0, 10.0 * 4.0, 10.0 * 4.0));

        // i = 64, value = 128: no override (128 is not > 128, and
        // 1/128 + 0.1 < 64), but the accent applies.
        let (r, g, b) = bar_color(64, BINS, 128.0);
        let expected_g = 10.0 + 64.0 / BINS as f32;
        let expected_b = 10.0 + 128.0;
        let expected_r = 10.0 + lerp(expected_g, expected_b, 128.0 / 255.0);
        assert_eq!(g, expected_g * 4.0);
        assert_eq!(b, expected_b * 4.0);
        assert_eq!(r, expected_r * 4.0);

        // i = 127, value = 255: magnitude override, no accent.
        let (r, g, b) = bar_color(127, BINS, 255.0);
        assert_eq!(r, 255.0);
        assert_eq!(g, 10.0 + 127.0 / BINS as f32);
        assert_eq!(b, 10.0 + 255.0);
    }

    #[test]
    fn test_modulo_wraps_instead_of_clamping() {
        // The forced red channel wraps straight back to zero.
        assert_eq!(to_rgb((255.0, 40.0, 40.0)), (0, 40, 40));
        // And a boosted blue channel keeps only the remainder.
        assert_eq!(to_rgb((84.0, 42.0, 552.0)), (84, 42, 42));
        // In-range channels pass through truncated.
        assert_eq!(to_rgb((254.9, 10.5, 0.0)), (254, 10, 0));
    }

    #[test]
    fn test_bar_slot_layout() {
        let (left, slot) = bar_slot(0, BINS, 256.0);
        assert_eq!(left, 0.0);
        assert_eq!(slot, 256.0 / BINS as f32 * 1.05);

        let (left, _) = bar_slot(64, BINS, 256.0);
        assert_eq!(left, 128.0);
    }

    #[test]
    fn test_boost_skips_silent_bins() {
        assert_eq!(boosted_value(127, BINS, 0), 0.0);
        let boosted = boosted_value(127, BINS, 1);
        assert_eq!(boosted, 1.0 + (127.0 * 127.0) / (BINS as f32 * 1.5));
        // The boost grows with the bin index.
        assert!(boosted_value(100, BINS, 10) > boosted_value(10, BINS, 10));
    }

    #[test]
    fn test_placeholder_before_ready() {
        let area = Rect::new(0, 0, 70, 12);
        let mut buf = Buffer::empty(area);

        let bars = FrequencyBars::new();
        bars.update_frame(None);
        bars.clone().render(area, &mut buf);

        let rendered: String = (1..area.width)
            .map(|x| buf.get(x, 0).symbol.clone())
            .collect();
        assert!(rendered.starts_with("Waiting on audio capture"));

        // No bars below the status line.
        let area_below = Rect::new(0, 1, area.width, area.height - 1);
        assert!(lit_cells(&buf, area_below).is_empty());
    }

    #[test]
    fn test_zero_magnitudes_draw_nothing() {
        let area = Rect::new(0, 0, 64, 16);
        let mut buf = Buffer::empty(area);

        let bars = FrequencyBars::new();
        bars.update_frame(Some(&[0; BIN_COUNT]));
        bars.clone().render(area, &mut buf);

        assert!(lit_cells(&buf, area).is_empty());
    }

    #[test]
    fn test_hot_bin_lights_its_column() {
        let area = Rect::new(0, 0, 64, 16);
        let mut buf = Buffer::empty(area);

        let mut magnitudes = [0u8; BIN_COUNT];
        magnitudes[16] = 200;

        let bars = FrequencyBars::new();
        bars.update_frame(Some(&magnitudes));
        bars.clone().render(area, &mut buf);

        // Bin 16 of 128 lands at x = 8 on a 64-cell-wide area, and the
        // dash pattern guarantees the top cell of the stroke is on.
        let lit = lit_cells(&buf, area);
        assert!(lit.contains(&(8, 0)), "lit cells: {:?}", lit);
    }

    #[test]
    fn test_trails_decay_between_frames() {
        let area = Rect::new(0, 0, 64, 16);

        let mut magnitudes = [0u8; BIN_COUNT];
        magnitudes[16] = 200;

        let bars = FrequencyBars::new();
        bars.update_frame(Some(&magnitudes));
        let mut first = Buffer::empty(area);
        bars.clone().render(area, &mut first);

        let sum_at = |buf: &Buffer, x: u16, y: u16| match buf.get(x, y).fg {
            Color::Rgb(r, g, b) => r as u32 + g as u32 + b as u32,
            _ => 0,
        };
        let bright = sum_at(&first, 8, 0);
        assert!(bright > 0);

        // Next frame is silent; the old bar should linger, dimmer.
        bars.update_frame(Some(&[0; BIN_COUNT]));
        let mut second = Buffer::empty(area);
        bars.clone().render(area, &mut second);

        let faded = sum_at(&second, 8, 0);
        assert!(faded > 0, "trail vanished instead of fading");
        assert!(faded < bright, "trail did not decay: {} -> {}", bright, faded);
    }

    #[test]
    fn test_resize_clears_trails() {
        let bars = FrequencyBars::new();
        let mut magnitudes = [0u8; BIN_COUNT];
        magnitudes[16] = 200;
        bars.update_frame(Some(&magnitudes));

        let area = Rect::new(0, 0, 64, 16);
        let mut buf = Buffer::empty(area);
        bars.clone().render(area, &mut buf);

        // A different area size swaps in a fresh buffer; only the new
        // frame's bars can be lit.
        bars.update_frame(Some(&[0; BIN_COUNT]));
        let smaller = Rect::new(0, 0, 32, 8);
        let mut buf = Buffer::empty(smaller);
        bars.clone().render(smaller, &mut buf);

        assert!(lit_cells(&buf, smaller).is_empty());
    }
}
