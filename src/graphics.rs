//! Graphics support via embedded-graphics
//!
//! Bridges the device into the embedded-graphics geometry types:
//!
//! - [`Device`] reports its rotated size through [`OriginDimensions`]
//! - [`TouchPoint`] converts into a [`Point`], so calibrated touches can be
//!   hit-tested against drawn primitives directly
//!
//! ## Example
//!
//! ```rust
//! use embedded_graphics_core::geometry::{OriginDimensions, Point, Size};
//! use panel_device::{Config, Device, NullPanel, TouchPoint};
//! # use panel_device::{Bus, Gpio};
//! # struct MockBus;
//! # impl Bus for MockBus {
//! #     type Error = ();
//! #     fn write_command(&mut self, _data: u32, _bits: u8) -> Result<(), ()> { Ok(()) }
//! #     fn write_data(&mut self, _data: u32, _bits: u8) -> Result<(), ()> { Ok(()) }
//! #     fn read_data(&mut self, _bits: u8) -> Result<u32, ()> { Ok(0) }
//! # }
//! # struct MockGpio;
//! # impl Gpio for MockGpio {
//! #     fn set_output(&mut self, _pin: u16) {}
//! #     fn write(&mut self, _pin: u16, _high: bool) {}
//! #     fn read(&mut self, _pin: u16) -> bool { false }
//! # }
//!
//! let mut device: Device<'_, _, MockBus, _> =
//!     Device::new(NullPanel, Config::default(), MockGpio);
//! device.set_rotation(1);
//! assert_eq!(device.size(), Size::new(240, 240));
//!
//! let point: Point = TouchPoint::new(12, 34).into();
//! assert_eq!(point, Point::new(12, 34));
//! ```

use embedded_graphics_core::geometry::{OriginDimensions, Point, Size};

use crate::bus::Bus;
use crate::device::Device;
use crate::gpio::Gpio;
use crate::panel::Panel;
use crate::touch::TouchPoint;

impl From<TouchPoint> for Point {
    fn from(point: TouchPoint) -> Self {
        Self::new(i32::from(point.x), i32::from(point.y))
    }
}

impl<P, B, G> OriginDimensions for Device<'_, P, B, G>
where
    P: Panel,
    B: Bus,
    G: Gpio,
{
    fn size(&self) -> Size {
        Size::new(u32::from(self.width()), u32::from(self.height()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Builder;
    use crate::panel::NullPanel;

    struct NoBus;

    impl Bus for NoBus {
        type Error = ();

        fn write_command(&mut self, _data: u32, _bit_length: u8) -> Result<(), ()> {
            Ok(())
        }
        fn write_data(&mut self, _data: u32, _bit_length: u8) -> Result<(), ()> {
            Ok(())
        }
        fn read_data(&mut self, _bit_length: u8) -> Result<u32, ()> {
            Ok(0)
        }
    }

    struct NoGpio;

    impl Gpio for NoGpio {
        fn set_output(&mut self, _pin: u16) {}
        fn write(&mut self, _pin: u16, _high: bool) {}
        fn read(&mut self, _pin: u16) -> bool {
            false
        }
    }

    #[test]
    fn test_size_follows_rotation() {
        let config = Builder::new()
            .memory_size(240, 320)
            .panel_size(240, 320)
            .build()
            .unwrap();
        let mut device: Device<'_, _, NoBus, _> = Device::new(NullPanel, config, NoGpio);
        assert_eq!(device.size(), Size::new(240, 320));
        device.set_rotation(1);
        assert_eq!(device.size(), Size::new(320, 240));
        device.set_rotation(6);
        assert_eq!(device.size(), Size::new(240, 320));
    }

    #[test]
    fn test_touch_point_into_point() {
        assert_eq!(Point::from(TouchPoint::new(-3, 700)), Point::new(-3, 700));
    }
}
