//! Front panel buttons
//!
//! The four buttons share one ADC pin through a resistor ladder, so at most
//! one button is seen per poll. [`ButtonLadder`] turns the raw reading into a
//! [`Button`], and [`ButtonEdge`] remembers the previous poll to tell a new
//! press from a held one.

/// Discrete button reading, one per control cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Button {
    #[default]
    None,
    Select,
    Increase,
    Decrease,
    Start,
}

/// Source of one button reading per cycle.
pub trait ButtonInput {
    fn poll(&mut self) -> Button;
}

/// Upper ADC bounds (exclusive) of each ladder band, 12-bit scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonLadder {
    pub start_below: u16,
    pub increase_below: u16,
    pub decrease_below: u16,
    pub select_below: u16,
}

impl Default for ButtonLadder {
    fn default() -> Self {
        Self {
            start_below: 200,
            increase_below: 800,
            decrease_below: 1_600,
            select_below: 2_600,
        }
    }
}

impl ButtonLadder {
    pub fn decode(&self, raw: u16) -> Button {
        if raw < self.start_below {
            Button::Start
        } else if raw < self.increase_below {
            Button::Increase
        } else if raw < self.decrease_below {
            Button::Decrease
        } else if raw < self.select_below {
            Button::Select
        } else {
            Button::None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonPress {
    pub button: Button,
    /// First cycle this reading was seen
    pub is_new_press: bool,
}

/// Level-to-edge tracker.
#[derive(Debug, Default)]
pub struct ButtonEdge {
    previous: Button,
}

impl ButtonEdge {
    pub const fn new() -> Self {
        Self {
            previous: Button::None,
        }
    }

    pub fn update(&mut self, reading: Button) -> ButtonPress {
        let is_new_press = reading != Button::None && reading != self.previous;
        self.previous = reading;
        ButtonPress {
            button: reading,
            is_new_press,
        }
    }
}
