//! Pin-number addressed GPIO control
//!
//! The default CS/RST handling of [`Panel`](crate::panel::Panel) works on the
//! pin numbers stored in [`Config`](crate::Config). [`Gpio`] is the seam that
//! turns those numbers into pin levels; [`HalGpio`] implements it by binding
//! each configured number to an embedded-hal pin.
//!
//! Pin errors are swallowed here, the same way a hardware reset pulse ignores
//! them: a stuck control line shows up later as a bus or init failure.

use embedded_hal::digital::{ErrorType, InputPin, OutputPin, PinState};

/// GPIO access by pin number
pub trait Gpio {
    /// Configure `pin` as an output
    fn set_output(&mut self, pin: u16);

    /// Configure `pin` as an input
    fn set_input(&mut self, pin: u16) {
        let _ = pin;
    }

    /// Drive `pin` high or low
    fn write(&mut self, pin: u16, high: bool);

    /// Sample `pin`
    fn read(&mut self, pin: u16) -> bool;
}

/// Placeholder for a pin that is not wired
///
/// Writes are ignored and reads return low.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPin;

impl ErrorType for NoPin {
    type Error = core::convert::Infallible;
}

impl OutputPin for NoPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl InputPin for NoPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(false)
    }
    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

/// [`Gpio`] over embedded-hal pins
///
/// Each pin is paired with the number it is configured under. Numbers that do
/// not match any bound pin are ignored.
///
/// ## Example
///
/// ```rust
/// use panel_device::{Gpio, HalGpio, NoPin};
/// # use core::convert::Infallible;
/// # use embedded_hal::digital::OutputPin;
/// # struct MockPin;
/// # impl embedded_hal::digital::ErrorType for MockPin { type Error = Infallible; }
/// # impl OutputPin for MockPin {
/// #     fn set_low(&mut self) -> Result<(), Self::Error> { Ok(()) }
/// #     fn set_high(&mut self) -> Result<(), Self::Error> { Ok(()) }
/// # }
/// let mut gpio = HalGpio::new()
///     .with_cs(5, MockPin)
///     .with_rst(4, MockPin);
/// gpio.write(5, false);
/// assert!(!gpio.read(7));
/// # let _: &HalGpio<MockPin, MockPin, NoPin> = &gpio;
/// ```
pub struct HalGpio<CS = NoPin, RST = NoPin, BUSY = NoPin> {
    cs: Option<(u16, CS)>,
    rst: Option<(u16, RST)>,
    busy: Option<(u16, BUSY)>,
}

impl HalGpio {
    /// Create an adapter with no pins bound
    pub fn new() -> Self {
        Self {
            cs: None,
            rst: None,
            busy: None,
        }
    }
}

impl Default for HalGpio {
    fn default() -> Self {
        Self::new()
    }
}

impl<CS, RST, BUSY> HalGpio<CS, RST, BUSY> {
    /// Bind the chip-select pin
    pub fn with_cs<P: OutputPin>(self, number: u16, pin: P) -> HalGpio<P, RST, BUSY> {
        HalGpio {
            cs: Some((number, pin)),
            rst: self.rst,
            busy: self.busy,
        }
    }

    /// Bind the reset pin
    pub fn with_rst<P: OutputPin>(self, number: u16, pin: P) -> HalGpio<CS, P, BUSY> {
        HalGpio {
            cs: self.cs,
            rst: Some((number, pin)),
            busy: self.busy,
        }
    }

    /// Bind the busy pin
    pub fn with_busy<P: InputPin>(self, number: u16, pin: P) -> HalGpio<CS, RST, P> {
        HalGpio {
            cs: self.cs,
            rst: self.rst,
            busy: Some((number, pin)),
        }
    }
}

impl<CS, RST, BUSY> Gpio for HalGpio<CS, RST, BUSY>
where
    CS: OutputPin,
    RST: OutputPin,
    BUSY: InputPin,
{
    // embedded-hal pins carry their direction in the type
    fn set_output(&mut self, _pin: u16) {}

    fn write(&mut self, pin: u16, high: bool) {
        let state = PinState::from(high);
        if let Some((number, cs)) = self.cs.as_mut() {
            if *number == pin {
                let _ = cs.set_state(state);
                return;
            }
        }
        if let Some((number, rst)) = self.rst.as_mut() {
            if *number == pin {
                let _ = rst.set_state(state);
                return;
            }
        }
        log::trace!("gpio write to unbound pin {}", pin);
    }

    fn read(&mut self, pin: u16) -> bool {
        match self.busy.as_mut() {
            Some((number, busy)) if *number == pin => busy.is_high().unwrap_or(false),
            _ => false,
        }
    }
}
