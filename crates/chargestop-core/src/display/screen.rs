//! Fixed screen layout
//!
//! ```text
//!   0         1
//!   0123456789012345678
//! 0 CAPACITY  3000 mAh
//! 1 CHARGING
//! 2 V  5004 mV            (Live)      Q  1234 mAh   (Capacity)
//! 3 I  1480 mA            (Live)                    (blank)
//! 4 01:23:45              (while charging)
//! ```
//!
//! Every field is drawn padded to its full width each cycle so stale
//! characters are overwritten without clearing the panel.

use core::fmt::Write;

use heapless::String;

use super::{DisplayMode, DisplaySink, Position};
use crate::limits::LimitKind;

const VALUE_WIDTH: u8 = 5;
const BLANK: &str = "           ";

/// Everything the screen shows for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenView {
    pub selected: LimitKind,
    pub limit_value: u16,
    pub is_charging: bool,
    pub display_mode: DisplayMode,
    pub voltage_mv: u16,
    pub current_ma: u16,
    pub capacity_mah: u32,
    pub energy_mwh: u32,
    /// Charge time, already capped
    pub charge_secs: u32,
}

/// Left-aligned text padded with blanks to `N` cells.
fn padded<const N: usize>(text: &str) -> String<N> {
    let mut cell = String::new();
    let _ = write!(cell, "{:<width$}", text, width = N);
    cell
}

fn saturate(value: u32) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX)
}

/// Issue the draw commands for one frame.
pub fn render<S: DisplaySink>(sink: &mut S, view: &ScreenView) -> Result<(), S::Error> {
    sink.draw_text(Position::new(0, 0), &padded::<8>(view.selected.label()))?;
    sink.draw_u16(Position::new(9, 0), view.limit_value, VALUE_WIDTH)?;
    sink.draw_text(Position::new(15, 0), &padded::<3>(view.selected.unit()))?;

    let state = if view.is_charging { "CHARGING" } else { "PAUSED  " };
    sink.draw_text(Position::new(0, 1), state)?;

    match view.display_mode {
        DisplayMode::Live => {
            sink.draw_text(Position::new(0, 2), "V ")?;
            sink.draw_u16(Position::new(2, 2), view.voltage_mv, VALUE_WIDTH)?;
            sink.draw_text(Position::new(7, 2), " mV ")?;
            sink.draw_text(Position::new(0, 3), "I ")?;
            sink.draw_u16(Position::new(2, 3), view.current_ma, VALUE_WIDTH)?;
            sink.draw_text(Position::new(7, 3), " mA ")?;
        }
        DisplayMode::Capacity => {
            sink.draw_text(Position::new(0, 2), "Q ")?;
            sink.draw_u16(Position::new(2, 2), saturate(view.capacity_mah), VALUE_WIDTH)?;
            sink.draw_text(Position::new(7, 2), " mAh")?;
            sink.draw_text(Position::new(0, 3), BLANK)?;
        }
        DisplayMode::Energy => {
            sink.draw_text(Position::new(0, 2), "E ")?;
            sink.draw_u16(Position::new(2, 2), saturate(view.energy_mwh), VALUE_WIDTH)?;
            sink.draw_text(Position::new(7, 2), " mWh")?;
            sink.draw_text(Position::new(0, 3), BLANK)?;
        }
    }

    if view.is_charging {
        let hours = (view.charge_secs / 3_600).min(u8::MAX as u32) as u8;
        let minutes = (view.charge_secs / 60 % 60) as u8;
        let seconds = (view.charge_secs % 60) as u8;

        sink.draw_u8(Position::new(0, 4), hours)?;
        sink.draw_text(Position::new(2, 4), ":")?;
        sink.draw_u8(Position::new(3, 4), minutes)?;
        sink.draw_text(Position::new(5, 4), ":")?;
        sink.draw_u8(Position::new(6, 4), seconds)?;
    } else {
        sink.draw_text(Position::new(0, 4), BLANK)?;
    }

    sink.flush()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use core::convert::Infallible;
    use heapless::Vec;

    /// Records the draw commands of the latest frame as `(column, row, text)`.
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub commands: Vec<(u8, u8, String<16>), 32>,
        pub flushes: usize,
        frame_done: bool,
    }

    impl RecordingSink {
        pub fn text_at(&self, column: u8, row: u8) -> Option<&str> {
            self.commands
                .iter()
                .rev()
                .find(|(c, r, _)| *c == column && *r == row)
                .map(|(_, _, text)| text.as_str())
        }

        pub fn row(&self, row: u8) -> String<32> {
            let mut line = String::new();
            for (_, _, text) in self.commands.iter().filter(|(_, r, _)| *r == row) {
                let _ = line.push_str(text);
            }
            line
        }
    }

    impl DisplaySink for RecordingSink {
        type Error = Infallible;

        fn clear(&mut self) -> Result<(), Self::Error> {
            self.commands.clear();
            Ok(())
        }

        fn draw_text(&mut self, at: Position, text: &str) -> Result<(), Self::Error> {
            if self.frame_done {
                self.commands.clear();
                self.frame_done = false;
            }
            let mut owned = String::new();
            let _ = owned.push_str(text);
            let _ = self.commands.push((at.column, at.row, owned));
            Ok(())
        }

        fn flush(&mut self) -> Result<(), Self::Error> {
            self.flushes += 1;
            self.frame_done = true;
            Ok(())
        }
    }

    fn view() -> ScreenView {
        ScreenView {
            selected: LimitKind::Capacity,
            limit_value: 3_000,
            is_charging: true,
            display_mode: DisplayMode::Live,
            voltage_mv: 5_004,
            current_ma: 1_480,
            capacity_mah: 1_234,
            energy_mwh: 70_000,
            charge_secs: 5_025,
        }
    }

    #[test]
    fn test_live_frame() {
        let mut sink = RecordingSink::default();
        render(&mut sink, &view()).unwrap();

        assert_eq!(sink.row(0).as_str(), "CAPACITY 3000mAh");
        assert_eq!(sink.row(1).as_str(), "CHARGING");
        assert_eq!(sink.row(2).as_str(), "V  5004 mV ");
        assert_eq!(sink.row(3).as_str(), "I  1480 mA ");
        assert_eq!(sink.row(4).as_str(), "01:23:45");
        assert_eq!(sink.flushes, 1);
    }

    #[test]
    fn test_energy_saturates_on_screen() {
        let mut sink = RecordingSink::default();
        let view = ScreenView {
            display_mode: DisplayMode::Energy,
            ..view()
        };
        render(&mut sink, &view).unwrap();

        assert_eq!(sink.text_at(2, 2), Some("65535"));
        assert_eq!(sink.text_at(0, 3), Some(BLANK));
    }

    #[test]
    fn test_paused_frame_blanks_timer() {
        let mut sink = RecordingSink::default();
        let view = ScreenView {
            is_charging: false,
            selected: LimitKind::Current,
            limit_value: 200,
            display_mode: DisplayMode::Capacity,
            ..view()
        };
        render(&mut sink, &view).unwrap();

        assert_eq!(sink.text_at(0, 1), Some("PAUSED  "));
        assert_eq!(sink.text_at(15, 0), Some("mA "));
        assert_eq!(sink.text_at(2, 2), Some(" 1234"));
        assert_eq!(sink.text_at(0, 4), Some(BLANK));
    }
}
