//! Bus abstraction
//!
//! This module provides the [`Bus`] trait the panel device transmits through,
//! and [`SpiBus`], an implementation over an embedded-hal SPI bus plus a
//! Data/Command select pin.
//!
//! Words are passed as a `u32` plus a length in bits. Bytes go out in
//! little-endian order, so `write_data(0x3412, 16)` sends `0x12` then `0x34`.
//!
//! Chip select is not part of the bus: the panel device drives it through
//! [`Panel::cs_control`](crate::panel::Panel::cs_control), which is why
//! [`SpiBus`] takes an [`embedded_hal::spi::SpiBus`] rather than a `SpiDevice`.
//!
//! ## Example
//!
//! ```rust,no_run
//! use panel_device::{Bus, SpiBus};
//! # use core::convert::Infallible;
//! # use embedded_hal::digital::OutputPin;
//! # struct MockSpi;
//! # impl embedded_hal::spi::ErrorType for MockSpi { type Error = Infallible; }
//! # impl embedded_hal::spi::SpiBus for MockSpi {
//! #     fn read(&mut self, _words: &mut [u8]) -> Result<(), Self::Error> { Ok(()) }
//! #     fn write(&mut self, _words: &[u8]) -> Result<(), Self::Error> { Ok(()) }
//! #     fn transfer(&mut self, _read: &mut [u8], _write: &[u8]) -> Result<(), Self::Error> { Ok(()) }
//! #     fn transfer_in_place(&mut self, _words: &mut [u8]) -> Result<(), Self::Error> { Ok(()) }
//! #     fn flush(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//! # struct MockPin;
//! # impl embedded_hal::digital::ErrorType for MockPin { type Error = Infallible; }
//! # impl OutputPin for MockPin {
//! #     fn set_low(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! #     fn set_high(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//! let mut bus = SpiBus::new(MockSpi, MockPin);
//!
//! // Sleep out
//! let _ = bus.write_command(0x11, 8);
//!
//! // Two argument bytes
//! let _ = bus.write_data(0x0055, 16);
//! ```

use core::fmt::Debug;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus as HalSpiBus;

type BusResult<T, E> = core::result::Result<T, E>;

/// Trait for the transport between the panel device and its controller
///
/// Bracketing is layered: [`init`](Bus::init)/[`release`](Bus::release)
/// claim and free the peripheral, [`begin_transaction`](Bus::begin_transaction)/
/// [`end_transaction`](Bus::end_transaction) frame a batch of transfers. Most
/// implementations only need the write and read methods; the brackets default
/// to no-ops.
pub trait Bus {
    /// Error type for bus operations
    ///
    /// Must implement [`Debug`] for error reporting.
    type Error: Debug;

    /// Claim the peripheral
    fn init(&mut self) -> BusResult<(), Self::Error> {
        Ok(())
    }

    /// Free the peripheral for other users
    fn release(&mut self) -> BusResult<(), Self::Error> {
        Ok(())
    }

    /// Start a batch of transfers
    fn begin_transaction(&mut self) -> BusResult<(), Self::Error> {
        Ok(())
    }

    /// Finish a batch of transfers, flushing anything still queued
    fn end_transaction(&mut self) -> BusResult<(), Self::Error> {
        Ok(())
    }

    /// Send `bit_length` bits of `data` as a command word
    ///
    /// # Errors
    ///
    /// Returns an error if the transfer fails.
    fn write_command(&mut self, data: u32, bit_length: u8) -> BusResult<(), Self::Error>;

    /// Send `bit_length` bits of `data` as a data word
    ///
    /// # Errors
    ///
    /// Returns an error if the transfer fails.
    fn write_data(&mut self, data: u32, bit_length: u8) -> BusResult<(), Self::Error>;

    /// Switch to reading, clocking out `dummy_bits` first
    fn begin_read(&mut self, dummy_bits: u8) -> BusResult<(), Self::Error> {
        let _ = dummy_bits;
        Ok(())
    }

    /// Read `bit_length` bits as one word
    ///
    /// # Errors
    ///
    /// Returns an error if the transfer fails.
    fn read_data(&mut self, bit_length: u8) -> BusResult<u32, Self::Error>;

    /// Leave read mode
    fn end_read(&mut self) -> BusResult<(), Self::Error> {
        Ok(())
    }
}

/// Errors that can occur on [`SpiBus`]
///
/// Generic over SPI and GPIO error types.
#[derive(Debug)]
pub enum BusError<SpiErr, PinErr> {
    /// SPI communication error
    Spi(SpiErr),
    /// DC pin error
    Pin(PinErr),
}

impl<SpiErr: Debug, PinErr: Debug> core::fmt::Display for BusError<SpiErr, PinErr> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Spi(e) => write!(f, "SPI error: {e:?}"),
            Self::Pin(e) => write!(f, "Pin error: {e:?}"),
        }
    }
}

impl<SpiErr: Debug, PinErr: Debug> core::error::Error for BusError<SpiErr, PinErr> {}

/// [`Bus`] implementation over embedded-hal SPI
///
/// ## Type Parameters
///
/// * `SPI` - SPI bus implementing [`embedded_hal::spi::SpiBus`]
/// * `DC` - Data/Command pin implementing [`OutputPin`] (low=command, high=data)
///
/// Dummy read bits are rounded up to whole bytes.
pub struct SpiBus<SPI, DC> {
    /// SPI bus for communication
    spi: SPI,
    /// Data/Command select pin
    dc: DC,
    /// Whether `init` has been called without a matching `release`
    claimed: bool,
}

impl<SPI, DC> SpiBus<SPI, DC>
where
    SPI: HalSpiBus,
    DC: OutputPin,
{
    /// Create a new SpiBus
    pub fn new(spi: SPI, dc: DC) -> Self {
        Self {
            spi,
            dc,
            claimed: false,
        }
    }

    /// Whether the bus is currently claimed
    pub fn is_claimed(&self) -> bool {
        self.claimed
    }

    /// Give back the SPI bus and DC pin
    pub fn into_inner(self) -> (SPI, DC) {
        (self.spi, self.dc)
    }

    fn write_word(
        &mut self,
        data: u32,
        bit_length: u8,
    ) -> BusResult<(), BusError<SPI::Error, DC::Error>> {
        let bytes = data.to_le_bytes();
        let len = usize::from(bit_length.div_ceil(8)).min(bytes.len());
        self.spi.write(&bytes[..len]).map_err(BusError::Spi)
    }
}

impl<SPI, DC> Bus for SpiBus<SPI, DC>
where
    SPI: HalSpiBus,
    DC: OutputPin,
{
    type Error = BusError<SPI::Error, DC::Error>;

    fn init(&mut self) -> BusResult<(), Self::Error> {
        self.claimed = true;
        Ok(())
    }

    fn release(&mut self) -> BusResult<(), Self::Error> {
        self.claimed = false;
        self.spi.flush().map_err(BusError::Spi)
    }

    fn end_transaction(&mut self) -> BusResult<(), Self::Error> {
        self.spi.flush().map_err(BusError::Spi)
    }

    fn write_command(&mut self, data: u32, bit_length: u8) -> BusResult<(), Self::Error> {
        self.dc.set_low().map_err(BusError::Pin)?;
        self.write_word(data, bit_length)
    }

    fn write_data(&mut self, data: u32, bit_length: u8) -> BusResult<(), Self::Error> {
        self.dc.set_high().map_err(BusError::Pin)?;
        self.write_word(data, bit_length)
    }

    fn begin_read(&mut self, dummy_bits: u8) -> BusResult<(), Self::Error> {
        self.dc.set_high().map_err(BusError::Pin)?;
        let mut dummy = [0u8; 32];
        let len = usize::from(dummy_bits.div_ceil(8));
        if len > 0 {
            self.spi.read(&mut dummy[..len]).map_err(BusError::Spi)?;
        }
        Ok(())
    }

    fn read_data(&mut self, bit_length: u8) -> BusResult<u32, Self::Error> {
        let mut bytes = [0u8; 4];
        let len = usize::from(bit_length.div_ceil(8)).min(bytes.len());
        self.spi.read(&mut bytes[..len]).map_err(BusError::Spi)?;
        Ok(u32::from_le_bytes(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;
    use core::convert::Infallible;

    #[derive(Default)]
    struct MockSpi {
        written: Vec<Vec<u8>>,
        reads: Vec<usize>,
        flushes: usize,
    }

    impl embedded_hal::spi::ErrorType for MockSpi {
        type Error = Infallible;
    }

    impl HalSpiBus for MockSpi {
        fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
            self.reads.push(words.len());
            for (i, word) in words.iter_mut().enumerate() {
                *word = 0x10 + i as u8;
            }
            Ok(())
        }
        fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
            self.written.push(words.to_vec());
            Ok(())
        }
        fn transfer(&mut self, _read: &mut [u8], _write: &[u8]) -> Result<(), Self::Error> {
            Ok(())
        }
        fn transfer_in_place(&mut self, _words: &mut [u8]) -> Result<(), Self::Error> {
            Ok(())
        }
        fn flush(&mut self) -> Result<(), Self::Error> {
            self.flushes += 1;
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockDc {
        levels: Vec<bool>,
    }

    impl embedded_hal::digital::ErrorType for MockDc {
        type Error = Infallible;
    }

    impl OutputPin for MockDc {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.levels.push(false);
            Ok(())
        }
        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.levels.push(true);
            Ok(())
        }
    }

    #[test]
    fn test_command_drives_dc_low() {
        let mut bus = SpiBus::new(MockSpi::default(), MockDc::default());
        bus.write_command(0x2A, 8).unwrap();
        let (spi, dc) = bus.into_inner();
        assert_eq!(dc.levels, [false]);
        assert_eq!(spi.written, [alloc::vec![0x2A]]);
    }

    #[test]
    fn test_data_is_little_endian() {
        let mut bus = SpiBus::new(MockSpi::default(), MockDc::default());
        bus.write_data(0x0034_1200, 24).unwrap();
        let (spi, dc) = bus.into_inner();
        assert_eq!(dc.levels, [true]);
        assert_eq!(spi.written, [alloc::vec![0x00, 0x12, 0x34]]);
    }

    #[test]
    fn test_claim_and_release() {
        let mut bus = SpiBus::new(MockSpi::default(), MockDc::default());
        assert!(!bus.is_claimed());
        bus.init().unwrap();
        assert!(bus.is_claimed());
        bus.release().unwrap();
        assert!(!bus.is_claimed());
        let (spi, _) = bus.into_inner();
        assert_eq!(spi.flushes, 1);
    }

    #[test]
    fn test_read_skips_dummy_bytes() {
        let mut bus = SpiBus::new(MockSpi::default(), MockDc::default());
        bus.begin_read(9).unwrap();
        let value = bus.read_data(16).unwrap();
        assert_eq!(value, 0x1110);
        let (spi, _) = bus.into_inner();
        assert_eq!(spi.reads, [2, 2]);
    }
}
