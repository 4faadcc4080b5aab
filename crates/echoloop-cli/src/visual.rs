//! Bar display of the spectrum.
//!
//! Each of the 32 band bytes becomes a bar height `b / 255 * 80 + 2`, so an
//! empty band still shows a 2-unit stub and a full one reaches 82.

use std::io::Write;

use echoloop_analysis::{BAND_COUNT, SpectrumSnapshot};

/// Height of an empty bar.
pub const FLOOR_HEIGHT: f32 = 2.0;
/// Height of a full bar.
pub const MAX_HEIGHT: f32 = 82.0;

/// One frame of bar heights.
pub type BarHeights = [f32; BAND_COUNT];

/// Every bar at the floor.
pub const FLOOR: BarHeights = [FLOOR_HEIGHT; BAND_COUNT];

/// Maps a band byte to a bar height.
#[inline]
pub fn bar_height(band: u8) -> f32 {
    f32::from(band) / 255.0 * (MAX_HEIGHT - FLOOR_HEIGHT) + FLOOR_HEIGHT
}

/// Maps a whole snapshot to bar heights.
pub fn bar_heights(snapshot: &SpectrumSnapshot) -> BarHeights {
    let mut heights = FLOOR;
    for (h, &b) in heights.iter_mut().zip(snapshot.bands()) {
        *h = bar_height(b);
    }
    heights
}

/// Receives one frame of bar heights at a time.
pub trait VisualizationSink: Send {
    /// Draws one frame.
    fn push(&mut self, heights: &BarHeights);

    /// Draws every bar at the floor.
    fn reset(&mut self) {
        self.push(&FLOOR);
    }
}

const BAR_GLYPHS: [char; 9] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Single-line unicode bar graph written to a terminal.
///
/// Each frame rewrites the same line with a carriage return.
pub struct TerminalBars<W: Write + Send> {
    out: W,
    line: String,
}

impl<W: Write + Send> TerminalBars<W> {
    /// Draws to `out`.
    pub fn new(out: W) -> Self {
        Self {
            out,
            line: String::with_capacity(BAND_COUNT * 4 + 4),
        }
    }

    /// The most recently drawn line, without control characters.
    pub fn last_line(&self) -> &str {
        &self.line
    }

    /// Consumes the sink, returning the writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn glyph(height: f32) -> char {
        let level = (height - FLOOR_HEIGHT) / (MAX_HEIGHT - FLOOR_HEIGHT);
        let idx = (level.clamp(0.0, 1.0) * 8.0).round() as usize;
        BAR_GLYPHS[idx]
    }
}

impl<W: Write + Send> VisualizationSink for TerminalBars<W> {
    fn push(&mut self, heights: &BarHeights) {
        self.line.clear();
        self.line.extend(heights.iter().map(|&h| Self::glyph(h)));
        // Write errors are ignored.
        let _ = write!(self.out, "\r[{}]", self.line);
        let _ = self.out.flush();
    }
}

impl<W: Write + Send> std::fmt::Debug for TerminalBars<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalBars")
            .field("line", &self.line)
            .finish_non_exhaustive()
    }
}

/// Keeps every frame it receives.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    frames: Vec<BarHeights>,
}

impl RecordingSink {
    /// Empty recording.
    pub fn new() -> Self {
        Self::default()
    }

    /// All frames in arrival order.
    pub fn frames(&self) -> &[BarHeights] {
        &self.frames
    }

    /// The most recent frame.
    pub fn last(&self) -> Option<&BarHeights> {
        self.frames.last()
    }

    /// Drops recorded frames.
    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

impl VisualizationSink for RecordingSink {
    fn push(&mut self, heights: &BarHeights) {
        self.frames.push(*heights);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heights_span_floor_to_ceiling() {
        assert_eq!(bar_height(0), 2.0);
        assert_eq!(bar_height(255), 82.0);
        assert!((bar_height(128) - (128.0 / 255.0 * 80.0 + 2.0)).abs() < 1e-5);
    }

    #[test]
    fn silent_snapshot_maps_to_floor() {
        assert_eq!(bar_heights(&SpectrumSnapshot::SILENT), FLOOR);
    }

    #[test]
    fn recording_sink_reset_pushes_floor() {
        let mut sink = RecordingSink::new();
        sink.push(&[40.0; BAND_COUNT]);
        sink.reset();
        assert_eq!(sink.frames().len(), 2);
        assert_eq!(sink.last(), Some(&FLOOR));
    }

    #[test]
    fn terminal_bars_draw_one_glyph_per_band() {
        let mut bars = TerminalBars::new(Vec::new());
        let mut heights = FLOOR;
        heights[0] = MAX_HEIGHT;
        bars.push(&heights);
        assert_eq!(bars.last_line().chars().count(), BAND_COUNT);
        assert!(bars.last_line().starts_with('█'));
        assert!(bars.last_line().ends_with(' '));

        let written = String::from_utf8(bars.into_inner()).unwrap();
        assert!(written.starts_with("\r["));
    }
}
