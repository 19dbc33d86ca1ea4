//! Collaborator interfaces the terminal drives.
//!
//! Primary responsibilities:
//! - [`HostLink`]: outbound byte channel to the host (serial line, socket, PTY).
//! - [`GraphicsSurface`]: plot primitives and graphics display control.
//! - [`GraphicsState`]: the pen, cursor and size bookkeeping the terminal needs
//!   to answer status queries without asking the renderer.
//! - Recording implementations for headless use and tests.

use std::collections::VecDeque;
use std::io::{self, Write};

/// Key code reported for a left mouse button click.
pub const CLICK_LEFT: u16 = 232;
/// Key code reported for a right mouse button click.
pub const CLICK_RIGHT: u16 = 233;
/// Key code reported for a middle mouse button click.
pub const CLICK_MIDDLE: u16 = 234;

/// Graphics width accepted by [`GraphicsState::set_size`].
pub const GRAPHICS_WIDTH_RANGE: (u32, u32) = (512, 720);
/// Graphics height accepted by [`GraphicsState::set_size`].
pub const GRAPHICS_HEIGHT_RANGE: (u32, u32) = (360, 480);

/// Plot coordinate in device units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }
}

/// Pointer click or key press captured while the graphics cursor was armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickEvent {
    pub position: Point,
    /// `232..=234` for mouse buttons, otherwise the key's character code.
    pub code: u16,
}

impl ClickEvent {
    #[must_use]
    pub fn new(position: Point, code: u16) -> Self {
        Self { position, code }
    }
}

// ── Host link ───────────────────────────────────────────────────────

/// Outbound byte channel to the host.
///
/// A write error makes the terminal fall back to local echo for the rest of
/// the session.
pub trait HostLink {
    fn send_bytes(&mut self, bytes: &[u8]) -> io::Result<()>;

    fn send_byte(&mut self, byte: u8) -> io::Result<()> {
        self.send_bytes(&[byte])
    }

    fn send_str(&mut self, text: &str) -> io::Result<()> {
        self.send_bytes(text.as_bytes())
    }
}

/// [`HostLink`] over any writer, flushed after every send.
#[derive(Debug)]
pub struct WriterLink<W> {
    writer: W,
}

impl<W: Write> WriterLink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> HostLink for WriterLink<W> {
    fn send_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.writer.write_all(bytes)?;
        self.writer.flush()
    }
}

/// Collects sent bytes in memory. A failing link rejects every write.
#[derive(Debug, Clone, Default)]
pub struct RecordingLink {
    sent: Vec<u8>,
    failing: bool,
}

impl RecordingLink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A link whose writes always fail with `BrokenPipe`.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            sent: Vec::new(),
            failing: true,
        }
    }

    #[must_use]
    pub fn sent(&self) -> &[u8] {
        &self.sent
    }

    pub fn take_sent(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.sent)
    }
}

impl HostLink for RecordingLink {
    fn send_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        if self.failing {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "link closed"));
        }
        self.sent.extend_from_slice(bytes);
        Ok(())
    }
}

// ── Graphics surface ────────────────────────────────────────────────

/// Plot primitive consumer.
///
/// Only `moveto`/`lineto` are mandatory; renderers ignore what they do not
/// support.
pub trait GraphicsSurface {
    fn moveto(&mut self, point: Point);
    fn lineto(&mut self, point: Point);

    fn fill_rect(&mut self, _x: i32, _y: i32, _width: i32, _height: i32) {}

    /// Closed polygon collected between `*p s` and `*p t`.
    fn fill_polygon(&mut self, _points: &[Point]) {}

    fn draw_text(&mut self, _text: &str) {}

    fn set_draw_mode(&mut self, _mode: u8) {}

    fn set_line_type(&mut self, _line_type: u8) {}

    /// Primary pen, 1-based.
    fn set_pen(&mut self, _pen: i32) {}

    /// Graphics text pen, 1-based; 0 tracks the primary pen.
    fn set_text_pen(&mut self, _pen: i32) {}

    fn set_text_size(&mut self, _size: i32) {}

    fn set_text_orientation(&mut self, _degrees: i32) {}

    fn set_text_slant(&mut self, _slanted: bool) {}

    fn set_screen_size(&mut self, _width: u32, _height: u32) {}

    /// Clear graphics memory; `None` uses the background colour.
    fn clear(&mut self, _color: Option<i32>) {}

    /// Snapshot the current image before it is cleared.
    fn save_image(&mut self) {}

    fn set_visible(&mut self, _visible: bool) {}

    fn set_cursor_visible(&mut self, _visible: bool) {}

    fn set_cursor_position(&mut self, _point: Point) {}

    fn reset_defaults(&mut self, _hard: bool) {}

    /// Start sampling the next click or key press.
    fn begin_click_wait(&mut self) {}

    /// Return the sampled click once it exists.
    fn take_click(&mut self) -> Option<ClickEvent> {
        None
    }
}

/// Surface that draws nothing and never reports a click.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSurface;

impl GraphicsSurface for NullSurface {
    fn moveto(&mut self, _point: Point) {}
    fn lineto(&mut self, _point: Point) {}
}

/// One recorded [`GraphicsSurface`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlotCall {
    MoveTo(Point),
    LineTo(Point),
    FillRect { x: i32, y: i32, width: i32, height: i32 },
    FillPolygon(Vec<Point>),
    Text(String),
    DrawMode(u8),
    LineType(u8),
    Pen(i32),
    TextPen(i32),
    TextSize(i32),
    TextOrientation(i32),
    TextSlant(bool),
    ScreenSize(u32, u32),
    Clear(Option<i32>),
    SaveImage,
    Visible(bool),
    CursorVisible(bool),
    CursorPosition(Point),
    ResetDefaults(bool),
    ClickWait,
}

/// Surface that records every call and replays queued clicks.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    calls: Vec<PlotCall>,
    clicks: VecDeque<ClickEvent>,
    armed: bool,
}

impl RecordingSurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn calls(&self) -> &[PlotCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<PlotCall> {
        std::mem::take(&mut self.calls)
    }

    /// Only the `MoveTo`/`LineTo` calls.
    #[must_use]
    pub fn strokes(&self) -> Vec<PlotCall> {
        self.calls
            .iter()
            .filter(|call| matches!(call, PlotCall::MoveTo(_) | PlotCall::LineTo(_)))
            .cloned()
            .collect()
    }

    /// Queue a click to be delivered once a wait is armed.
    pub fn push_click(&mut self, click: ClickEvent) {
        self.clicks.push_back(click);
    }
}

impl GraphicsSurface for RecordingSurface {
    fn moveto(&mut self, point: Point) {
        self.calls.push(PlotCall::MoveTo(point));
    }

    fn lineto(&mut self, point: Point) {
        self.calls.push(PlotCall::LineTo(point));
    }

    fn fill_rect(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.calls.push(PlotCall::FillRect {
            x,
            y,
            width,
            height,
        });
    }

    fn fill_polygon(&mut self, points: &[Point]) {
        self.calls.push(PlotCall::FillPolygon(points.to_vec()));
    }

    fn draw_text(&mut self, text: &str) {
        self.calls.push(PlotCall::Text(text.to_owned()));
    }

    fn set_draw_mode(&mut self, mode: u8) {
        self.calls.push(PlotCall::DrawMode(mode));
    }

    fn set_line_type(&mut self, line_type: u8) {
        self.calls.push(PlotCall::LineType(line_type));
    }

    fn set_pen(&mut self, pen: i32) {
        self.calls.push(PlotCall::Pen(pen));
    }

    fn set_text_pen(&mut self, pen: i32) {
        self.calls.push(PlotCall::TextPen(pen));
    }

    fn set_text_size(&mut self, size: i32) {
        self.calls.push(PlotCall::TextSize(size));
    }

    fn set_text_orientation(&mut self, degrees: i32) {
        self.calls.push(PlotCall::TextOrientation(degrees));
    }

    fn set_text_slant(&mut self, slanted: bool) {
        self.calls.push(PlotCall::TextSlant(slanted));
    }

    fn set_screen_size(&mut self, width: u32, height: u32) {
        self.calls.push(PlotCall::ScreenSize(width, height));
    }

    fn clear(&mut self, color: Option<i32>) {
        self.calls.push(PlotCall::Clear(color));
    }

    fn save_image(&mut self) {
        self.calls.push(PlotCall::SaveImage);
    }

    fn set_visible(&mut self, visible: bool) {
        self.calls.push(PlotCall::Visible(visible));
    }

    fn set_cursor_visible(&mut self, visible: bool) {
        self.calls.push(PlotCall::CursorVisible(visible));
    }

    fn set_cursor_position(&mut self, point: Point) {
        self.calls.push(PlotCall::CursorPosition(point));
    }

    fn reset_defaults(&mut self, hard: bool) {
        self.calls.push(PlotCall::ResetDefaults(hard));
    }

    fn begin_click_wait(&mut self) {
        self.armed = true;
        self.calls.push(PlotCall::ClickWait);
    }

    fn take_click(&mut self) -> Option<ClickEvent> {
        if !self.armed {
            return None;
        }
        let click = self.clicks.pop_front()?;
        self.armed = false;
        Some(click)
    }
}

// ── Graphics bookkeeping ────────────────────────────────────────────

/// Graphics state the terminal reports back to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphicsState {
    /// Last point passed to `moveto`/`lineto`.
    pub pen: Point,
    /// Whether the last stroke was a draw.
    pub pen_down: bool,
    /// Graphics cursor position.
    pub cursor: Point,
    pub cursor_visible: bool,
    pub visible: bool,
    width: u32,
    height: u32,
}

impl GraphicsState {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        let mut state = Self {
            pen: Point::default(),
            pen_down: false,
            cursor: Point::default(),
            cursor_visible: false,
            visible: true,
            width: 0,
            height: 0,
        };
        state.set_size(width, height);
        state
    }

    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Store the display size, clamped into the supported range. Returns the
    /// applied size.
    pub fn set_size(&mut self, width: u32, height: u32) -> (u32, u32) {
        self.width = width.clamp(GRAPHICS_WIDTH_RANGE.0, GRAPHICS_WIDTH_RANGE.1);
        self.height = height.clamp(GRAPHICS_HEIGHT_RANGE.0, GRAPHICS_HEIGHT_RANGE.1);
        (self.width, self.height)
    }

    pub fn record_move(&mut self, point: Point) {
        self.pen = point;
        self.pen_down = false;
    }

    pub fn record_draw(&mut self, point: Point) {
        self.pen = point;
        self.pen_down = true;
    }

    /// Pen and cursor back to the origin, cursor hidden.
    pub fn reset(&mut self) {
        self.pen = Point::default();
        self.pen_down = false;
        self.cursor = Point::default();
        self.cursor_visible = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_link_forwards_bytes() {
        let mut link = WriterLink::new(Vec::new());
        link.send_str("ab").unwrap();
        link.send_byte(b'\r').unwrap();
        assert_eq!(link.into_inner(), b"ab\r");
    }

    #[test]
    fn failing_link_rejects_writes() {
        let mut link = RecordingLink::failing();
        let err = link.send_byte(0x06).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert!(link.sent().is_empty());
    }

    #[test]
    fn recording_surface_delivers_clicks_only_when_armed() {
        let mut surface = RecordingSurface::new();
        surface.push_click(ClickEvent::new(Point::new(3, 4), CLICK_LEFT));
        assert_eq!(surface.take_click(), None);
        surface.begin_click_wait();
        assert_eq!(
            surface.take_click(),
            Some(ClickEvent::new(Point::new(3, 4), CLICK_LEFT))
        );
        assert_eq!(surface.take_click(), None);
    }

    #[test]
    fn strokes_filter_other_calls() {
        let mut surface = RecordingSurface::new();
        surface.set_pen(2);
        surface.moveto(Point::new(1, 1));
        surface.draw_text("x");
        surface.lineto(Point::new(2, 2));
        assert_eq!(
            surface.strokes(),
            vec![
                PlotCall::MoveTo(Point::new(1, 1)),
                PlotCall::LineTo(Point::new(2, 2))
            ]
        );
    }

    #[test]
    fn graphics_size_is_clamped() {
        let mut state = GraphicsState::new(512, 390);
        assert_eq!(state.size(), (512, 390));
        assert_eq!(state.set_size(2000, 10), (720, 360));
        assert_eq!(state.set_size(0, 479), (512, 479));
    }

    #[test]
    fn pen_tracking_follows_strokes() {
        let mut state = GraphicsState::new(640, 480);
        state.record_draw(Point::new(5, 6));
        assert!(state.pen_down);
        state.record_move(Point::new(1, 2));
        assert_eq!((state.pen, state.pen_down), (Point::new(1, 2), false));
        state.reset();
        assert_eq!(state.pen, Point::default());
    }
}
