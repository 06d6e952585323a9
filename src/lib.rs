//! Panel Device Layer
//!
//! The part of a display driver that sits between a specific controller and
//! the bus: bring-up sequencing, byte-coded init command lists, backlight
//! polarity and touch calibration.
//!
//! ## Features
//!
//! - `no_std` compatible
//! - `embedded-hal` v1.0 support
//! - `embedded-graphics` geometry integration (with `graphics` feature)
//! - Init command lists with inline delays
//! - Four-point affine touch calibration
//! - Rotation with a per-panel offset
//!
//! ## Usage
//!
//! ```rust
//! use embedded_hal::delay::DelayNs;
//! use panel_device::{Builder, Bus, CommandListPanel, Device, Gpio};
//!
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
//! # struct MockDelay;
//! # impl DelayNs for MockDelay { fn delay_ns(&mut self, _ns: u32) {} }
//! # let mut bus = MockBus;
//! # let mut delay = MockDelay;
//! // Sleep out, wait 120 ms, 16-bit colour, display on
//! static INIT: [u8; 11] = [0x01, 0x11, 0x02, 0x80, 120, 0x02, 0x3A, 0x55, 0x01, 0x29, 0xFF];
//! static LISTS: [&[u8]; 1] = [&INIT];
//!
//! let config = match Builder::new()
//!     .memory_size(240, 320)
//!     .panel_size(240, 320)
//!     .pin_cs(5)
//!     .pin_rst(4)
//!     .build()
//! {
//!     Ok(config) => config,
//!     Err(_) => return,
//! };
//!
//! let mut device = Device::new(CommandListPanel::new(&LISTS), config, MockGpio);
//! device.set_bus(&mut bus);
//! assert!(device.init(true, &mut delay).is_ok());
//! device.set_rotation(1);
//! assert_eq!((device.width(), device.height()), (320, 240));
//! ```

#![no_std]

#[cfg(test)]
extern crate alloc;

/// Affine touch calibration
pub mod affine;
/// Bus abstraction and SPI implementation
pub mod bus;
/// Init command list interpreter
pub mod command;
/// Device configuration types and builder
pub mod config;
/// Panel device lifecycle
pub mod device;
/// Error types for the crate
pub mod error;
/// Pin-number addressed GPIO control
pub mod gpio;
/// Backlight abstraction
pub mod light;
/// Panel variants
pub mod panel;
/// Coordinate rotation utilities
pub mod rotation;
/// Touch sensor abstraction
pub mod touch;

/// Graphics support via embedded-graphics (requires `graphics` feature)
#[cfg(feature = "graphics")]
pub mod graphics;

pub use affine::{Affine, CALIBRATION_MARGIN, CALIBRATION_POINTS, Calibration};
pub use bus::{Bus, BusError, SpiBus};
pub use command::{CMD_INIT_DELAY, CommandList, CommandSink, Playback, PlaybackState, Record};
pub use config::{Builder, Config, MAX_OFFSET_ROTATION};
pub use device::{CALIBRATION_POLL_MS, CalibrationPrompt, Device, LifecycleState};
pub use error::{BuilderError, CalibrationError, Error};
pub use gpio::{Gpio, HalGpio, NoPin};
pub use light::{Light, PwmLight};
pub use panel::{CommandListPanel, FastReadDir, NullPanel, Panel, RESET_LIST_INDEX};
pub use touch::{Touch, TouchPoint};
