//! Character-cell display sink
//!
//! The controller draws the screen as a grid of fixed-width text cells. Any
//! backend that can place a string at a cell implements [`DisplaySink`]; the
//! numeric helpers format into a stack buffer and go through
//! [`DisplaySink::draw_text`]. [`TextScreen`] is the `embedded-graphics`
//! backend used by both the LCD firmware and the simulator.

pub mod screen;

use core::fmt::Write;

use embedded_graphics::mono_font::{MonoTextStyle, ascii::FONT_10X20};
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Baseline, Text};
use serde::{Deserialize, Serialize};

pub const CHAR_WIDTH_PX: u32 = 10;
pub const CHAR_HEIGHT_PX: u32 = 20;

/// What the lower half of the screen shows while charging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplayMode {
    /// Live voltage and current
    #[default]
    Live,
    /// Accumulated mAh
    Capacity,
    /// Accumulated mWh
    Energy,
}

impl DisplayMode {
    pub const fn next(self) -> Self {
        match self {
            DisplayMode::Live => DisplayMode::Capacity,
            DisplayMode::Capacity => DisplayMode::Energy,
            DisplayMode::Energy => DisplayMode::Live,
        }
    }
}

/// Text cell coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub column: u8,
    pub row: u8,
}

impl Position {
    pub const fn new(column: u8, row: u8) -> Self {
        Self { column, row }
    }
}

pub trait DisplaySink {
    type Error: core::fmt::Debug;

    fn clear(&mut self) -> Result<(), Self::Error>;

    /// Draw `text` starting at `at`, replacing whatever the cells held.
    fn draw_text(&mut self, at: Position, text: &str) -> Result<(), Self::Error>;

    /// Right-aligned unsigned number padded to `width` cells.
    fn draw_u16(&mut self, at: Position, value: u16, width: u8) -> Result<(), Self::Error> {
        let mut text: heapless::String<8> = heapless::String::new();
        // A u16 never exceeds five digits; widths above the buffer are capped.
        let width = (width as usize).min(8);
        let _ = write!(text, "{:>width$}", value);
        self.draw_text(at, &text)
    }

    /// Two-digit zero-padded number, as used for clock fields.
    fn draw_u8(&mut self, at: Position, value: u8) -> Result<(), Self::Error> {
        let mut text: heapless::String<3> = heapless::String::new();
        let _ = write!(text, "{:02}", value);
        self.draw_text(at, &text)
    }

    /// Push buffered output to the panel, if the backend buffers.
    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// [`DisplaySink`] over any RGB565 `DrawTarget` using the 10x20 mono font.
pub struct TextScreen<D> {
    target: D,
    foreground: Rgb565,
    background: Rgb565,
}

impl<D> TextScreen<D>
where
    D: DrawTarget<Color = Rgb565>,
    D::Error: core::fmt::Debug,
{
    pub fn new(target: D) -> Self {
        Self {
            target,
            foreground: Rgb565::WHITE,
            background: Rgb565::BLACK,
        }
    }

    pub fn with_colors(mut self, foreground: Rgb565, background: Rgb565) -> Self {
        self.foreground = foreground;
        self.background = background;
        self
    }

    pub fn target(&self) -> &D {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut D {
        &mut self.target
    }

    fn cell_origin(at: Position) -> Point {
        Point::new(
            (at.column as u32 * CHAR_WIDTH_PX) as i32,
            (at.row as u32 * CHAR_HEIGHT_PX) as i32,
        )
    }
}

impl<D> DisplaySink for TextScreen<D>
where
    D: DrawTarget<Color = Rgb565>,
    D::Error: core::fmt::Debug,
{
    type Error = D::Error;

    fn clear(&mut self) -> Result<(), Self::Error> {
        self.target.clear(self.background)
    }

    fn draw_text(&mut self, at: Position, text: &str) -> Result<(), Self::Error> {
        let origin = Self::cell_origin(at);
        let cells = Size::new(text.len() as u32 * CHAR_WIDTH_PX, CHAR_HEIGHT_PX);

        Rectangle::new(origin, cells)
            .into_styled(PrimitiveStyle::with_fill(self.background))
            .draw(&mut self.target)?;

        let style = MonoTextStyle::new(&FONT_10X20, self.foreground);
        Text::with_baseline(text, origin, style, Baseline::Top).draw(&mut self.target)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_graphics::mock_display::MockDisplay;

    /// Sink that keeps the last text drawn.
    struct LastText {
        text: heapless::String<16>,
        at: Option<Position>,
    }

    impl DisplaySink for LastText {
        type Error = Infallible;

        fn clear(&mut self) -> Result<(), Self::Error> {
            self.text.clear();
            Ok(())
        }

        fn draw_text(&mut self, at: Position, text: &str) -> Result<(), Self::Error> {
            self.text.clear();
            let _ = self.text.push_str(text);
            self.at = Some(at);
            Ok(())
        }
    }

    #[test]
    fn test_display_mode_wraps() {
        assert_eq!(DisplayMode::Live.next(), DisplayMode::Capacity);
        assert_eq!(DisplayMode::Energy.next(), DisplayMode::Live);
    }

    #[test]
    fn test_u16_is_right_aligned() {
        let mut sink = LastText {
            text: heapless::String::new(),
            at: None,
        };
        sink.draw_u16(Position::new(3, 1), 42, 5).unwrap();
        assert_eq!(sink.text.as_str(), "   42");
        assert_eq!(sink.at, Some(Position::new(3, 1)));
    }

    #[test]
    fn test_u8_is_zero_padded() {
        let mut sink = LastText {
            text: heapless::String::new(),
            at: None,
        };
        sink.draw_u8(Position::new(0, 0), 7).unwrap();
        assert_eq!(sink.text.as_str(), "07");
    }

    #[test]
    fn test_text_screen_draws_in_cell() {
        let mut display: MockDisplay<Rgb565> = MockDisplay::new();
        display.set_allow_overdraw(true);

        let mut screen = TextScreen::new(display);
        screen.draw_text(Position::new(1, 0), "A").unwrap();

        let display = screen.target();
        // Cell (1, 0) spans x 10..20, y 0..20; nothing left of it is touched.
        assert!(display.get_pixel(Point::new(9, 0)).is_none());
        assert!(display.get_pixel(Point::new(10, 0)).is_some());
        assert!(display.get_pixel(Point::new(19, 19)).is_some());
    }

    fn draw_through_sink<S: DisplaySink>(sink: &mut S) -> Result<(), S::Error> {
        sink.clear()?;
        sink.draw_u8(Position::new(0, 1), 9)?;
        sink.flush()
    }

    #[test]
    fn test_text_screen_is_a_generic_sink() {
        let mut display: MockDisplay<Rgb565> = MockDisplay::new();
        display.set_allow_overdraw(true);

        let mut screen = TextScreen::new(display);
        draw_through_sink(&mut screen).unwrap();

        let display = screen.target();
        // Row 2 is untouched by the text and keeps the cleared background.
        assert_eq!(display.get_pixel(Point::new(0, 45)), Some(Rgb565::BLACK));
        assert!(display.get_pixel(Point::new(19, 39)).is_some());
    }
}
