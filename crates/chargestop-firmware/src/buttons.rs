//! Resistor-ladder buttons on ADC1

use chargestop_core::buttons::{Button, ButtonInput, ButtonLadder};
use esp_hal::Blocking;
use esp_hal::analog::adc::{Adc, AdcConfig, AdcPin, Attenuation};
use esp_hal::peripherals::{ADC1, GPIO1};
use log::warn;

/// Four buttons sharing GPIO1 through a resistor ladder.
pub struct AdcButtons<'d> {
    adc: Adc<'d, ADC1<'d>, Blocking>,
    pin: AdcPin<GPIO1<'d>, ADC1<'d>>,
    ladder: ButtonLadder,
}

impl<'d> AdcButtons<'d> {
    pub fn new(adc1: ADC1<'d>, gpio: GPIO1<'d>) -> Self {
        let mut config = AdcConfig::new();
        let pin = config.enable_pin(gpio, Attenuation::_11dB);
        Self {
            adc: Adc::new(adc1, config),
            pin,
            ladder: ButtonLadder::default(),
        }
    }
}

impl ButtonInput for AdcButtons<'_> {
    fn poll(&mut self) -> Button {
        match nb::block!(self.adc.read_oneshot(&mut self.pin)) {
            Ok(raw) => self.ladder.decode(raw),
            Err(e) => {
                warn!("Button ADC read failed: {:?}", e);
                Button::None
            }
        }
    }
}
