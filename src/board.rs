//! M5Cardputer board glue.
//!
//! Keys arrive over the UART console (see [`crate::ui::console`]); the
//! dedicated reset button is BtnA on GPIO0, active low with the internal
//! pull-up enabled.

use crate::controller::System;
use crate::ui::console::ConsoleInput;
use crate::ui::{Input, KeysState};
use esp_idf_hal::gpio::{Gpio0, Input as InputMode, PinDriver, Pull};
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_sys::EspError;
use log::info;

/// Console keys plus the GPIO0 reset button.
pub struct CardputerInput<'d> {
    keys: ConsoleInput,
    button: PinDriver<'d, Gpio0, InputMode>,
}

impl<'d> CardputerInput<'d> {
    pub fn new(button: impl Peripheral<P = Gpio0> + 'd) -> Result<Self, EspError> {
        let mut button = PinDriver::input(button)?;
        button.set_pull(Pull::Up)?;
        Ok(Self {
            keys: ConsoleInput::uart(),
            button,
        })
    }
}

impl Input for CardputerInput<'_> {
    fn update(&mut self) {
        self.keys.update();
    }

    fn has_change_event(&self) -> bool {
        self.keys.has_change_event()
    }

    fn is_key_down(&self) -> bool {
        self.keys.is_key_down()
    }

    fn current_keys(&self) -> KeysState {
        self.keys.current_keys()
    }

    fn reset_pressed(&mut self) -> bool {
        self.button.is_low() || self.keys.reset_pressed()
    }
}

/// Restarts the chip.
pub struct EspSystem;

impl System for EspSystem {
    fn restart(&mut self) {
        info!("Restarting device");
        esp_idf_hal::reset::restart();
    }
}
