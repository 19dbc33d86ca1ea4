//! HP-GL capture of plot output.
//!
//! [`HpglRecorder`] sits between the terminal and the real surface, forwards
//! every call, and writes the vector part of the picture as HP-GL. A write
//! error stops the capture; drawing continues.

use std::io::{self, Write};

use tracing::warn;

use crate::surface::{ClickEvent, GraphicsSurface, Point};

const LABEL_TERMINATOR: char = '\x03';

#[derive(Debug)]
pub struct HpglRecorder<S, W: Write> {
    inner: S,
    out: Option<W>,
    error: Option<io::Error>,
}

impl<S: GraphicsSurface, W: Write> HpglRecorder<S, W> {
    /// Start a capture; the `IN;SP1;` header is written immediately.
    pub fn new(inner: S, out: W) -> Self {
        let mut recorder = Self {
            inner,
            out: Some(out),
            error: None,
        };
        recorder.emit(format_args!("IN;SP1;\n"));
        recorder
    }

    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// The error that stopped the capture.
    #[must_use]
    pub fn error(&self) -> Option<&io::Error> {
        self.error.as_ref()
    }

    /// Write the trailer and return the surface and the writer (if the
    /// capture survived).
    pub fn finish(mut self) -> (S, Option<W>) {
        self.emit(format_args!("SP0;\n"));
        if let Some(out) = self.out.as_mut() {
            if let Err(err) = out.flush() {
                warn!(error = %err, "HP-GL flush failed");
                self.out = None;
            }
        }
        (self.inner, self.out)
    }

    fn emit(&mut self, args: std::fmt::Arguments<'_>) {
        let Some(out) = self.out.as_mut() else {
            return;
        };
        if let Err(err) = out.write_fmt(args) {
            warn!(error = %err, "HP-GL capture stopped");
            self.out = None;
            self.error = Some(err);
        }
    }
}

impl<S: GraphicsSurface, W: Write> GraphicsSurface for HpglRecorder<S, W> {
    fn moveto(&mut self, point: Point) {
        self.emit(format_args!("PU{},{};\n", point.x, point.y));
        self.inner.moveto(point);
    }

    fn lineto(&mut self, point: Point) {
        self.emit(format_args!("PD{},{};\n", point.x, point.y));
        self.inner.lineto(point);
    }

    fn fill_rect(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.inner.fill_rect(x, y, width, height);
    }

    fn fill_polygon(&mut self, points: &[Point]) {
        self.inner.fill_polygon(points);
    }

    fn draw_text(&mut self, text: &str) {
        self.emit(format_args!("LB{text}{LABEL_TERMINATOR};\n"));
        self.inner.draw_text(text);
    }

    fn set_draw_mode(&mut self, mode: u8) {
        self.inner.set_draw_mode(mode);
    }

    fn set_line_type(&mut self, line_type: u8) {
        self.inner.set_line_type(line_type);
    }

    fn set_pen(&mut self, pen: i32) {
        self.emit(format_args!("SP{pen};\n"));
        self.inner.set_pen(pen);
    }

    fn set_text_pen(&mut self, pen: i32) {
        self.inner.set_text_pen(pen);
    }

    fn set_text_size(&mut self, size: i32) {
        self.inner.set_text_size(size);
    }

    fn set_text_orientation(&mut self, degrees: i32) {
        self.inner.set_text_orientation(degrees);
    }

    fn set_text_slant(&mut self, slanted: bool) {
        self.inner.set_text_slant(slanted);
    }

    fn set_screen_size(&mut self, width: u32, height: u32) {
        self.inner.set_screen_size(width, height);
    }

    fn clear(&mut self, color: Option<i32>) {
        self.inner.clear(color);
    }

    fn save_image(&mut self) {
        self.inner.save_image();
    }

    fn set_visible(&mut self, visible: bool) {
        self.inner.set_visible(visible);
    }

    fn set_cursor_visible(&mut self, visible: bool) {
        self.inner.set_cursor_visible(visible);
    }

    fn set_cursor_position(&mut self, point: Point) {
        self.inner.set_cursor_position(point);
    }

    fn reset_defaults(&mut self, hard: bool) {
        self.inner.reset_defaults(hard);
    }

    fn begin_click_wait(&mut self) {
        self.inner.begin_click_wait();
    }

    fn take_click(&mut self) -> Option<ClickEvent> {
        self.inner.take_click()
    }
}
