//! Backlight abstraction
//!
//! [`Light`] receives brightness levels 0 to 255. Polarity is handled by the
//! device (`Config::invert`), so implementations always treat 255 as brightest.

use embedded_hal::pwm::SetDutyCycle;

/// Backlight control
pub trait Light {
    /// Prepare the backlight and apply an initial level
    ///
    /// Returns false when the hardware could not be set up.
    fn init(&mut self, brightness: u8) -> bool {
        self.set_brightness(brightness);
        true
    }

    /// Set the brightness level, 0 (off) to 255 (full)
    fn set_brightness(&mut self, brightness: u8);
}

/// [`Light`] driven by a PWM channel
///
/// The level is scaled onto the channel's duty range.
pub struct PwmLight<P> {
    pwm: P,
    level: u8,
}

impl<P: SetDutyCycle> PwmLight<P> {
    /// Wrap a PWM channel
    pub fn new(pwm: P) -> Self {
        Self { pwm, level: 0 }
    }

    /// Last level written
    pub fn level(&self) -> u8 {
        self.level
    }

    /// Give back the PWM channel
    pub fn into_inner(self) -> P {
        self.pwm
    }
}

impl<P: SetDutyCycle> Light for PwmLight<P> {
    fn init(&mut self, brightness: u8) -> bool {
        self.level = brightness;
        self.pwm
            .set_duty_cycle_fraction(u16::from(brightness), 255)
            .is_ok()
    }

    fn set_brightness(&mut self, brightness: u8) {
        self.level = brightness;
        if self
            .pwm
            .set_duty_cycle_fraction(u16::from(brightness), 255)
            .is_err()
        {
            log::warn!("backlight duty update failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;

    struct MockPwm {
        duty: u16,
    }

    impl embedded_hal::pwm::ErrorType for MockPwm {
        type Error = Infallible;
    }

    impl SetDutyCycle for MockPwm {
        fn max_duty_cycle(&self) -> u16 {
            1000
        }
        fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
            self.duty = duty;
            Ok(())
        }
    }

    #[test]
    fn test_full_brightness_is_max_duty() {
        let mut light = PwmLight::new(MockPwm { duty: 0 });
        light.set_brightness(255);
        assert_eq!(light.level(), 255);
        assert_eq!(light.into_inner().duty, 1000);
    }

    #[test]
    fn test_init_applies_level() {
        let mut light = PwmLight::new(MockPwm { duty: 7 });
        assert!(light.init(0));
        assert_eq!(light.into_inner().duty, 0);
    }
}
