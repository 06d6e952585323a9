//! Error types for the panel device layer
//!
//! This module defines error types for configuration building ([`BuilderError`]),
//! touch calibration ([`CalibrationError`]) and device operations ([`Error`]).
//!
//! ## Error Types
//!
//! - [`BuilderError`] - Errors during configuration construction
//! - [`CalibrationError`] - The calibration solve could not produce a usable transform
//! - [`Error`] - Runtime errors during device operations, generic over the bus error
//!
//! Missing collaborators (no backlight, no touch sensor) are not errors: the
//! corresponding operations degrade to no-ops or zero results.
//!
//! ## Example
//!
//! ```
//! use panel_device::{Builder, BuilderError};
//!
//! // Visible area larger than the controller memory
//! let result = Builder::new().memory_size(240, 240).panel_size(240, 320).build();
//! assert!(matches!(result, Err(BuilderError::PanelExceedsMemory { .. })));
//!
//! // Rotation offsets only go up to 7
//! let result = Builder::new().offset_rotation(8).build();
//! assert!(matches!(result, Err(BuilderError::InvalidOffsetRotation(8))));
//! ```

/// Errors that can occur when driving the panel device
///
/// Generic over the bus error type to preserve the specific error.
/// This allows error handling code to match on the underlying hardware error.
#[derive(Debug, PartialEq)]
pub enum Error<E> {
    /// Bus error
    ///
    /// Wraps the underlying error from the [`Bus`](crate::bus::Bus) implementation.
    Bus(E),
    /// No bus has been attached to the device
    NoBus,
    /// The panel variant cannot be initialized (e.g. [`NullPanel`](crate::panel::NullPanel))
    PanelUnavailable,
    /// An init command list ended without its terminator
    ///
    /// Either the record ceiling was reached or the bytes ran out. Nothing from
    /// the incomplete record was transmitted.
    CommandListUnterminated {
        /// Index of the offending list
        list: u8,
        /// Number of records played before playback stopped
        records: usize,
    },
    /// Configuration changes are refused while a bus transaction is open
    TransactionActive,
    /// The panel does not support reading
    NotReadable,
    /// No touch sensor is attached
    NoTouch,
    /// Interactive calibration was abandoned by the prompt
    CalibrationAborted,
    /// The calibration solve failed
    Calibration(CalibrationError),
}

impl<E: core::fmt::Debug> core::fmt::Display for Error<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Bus(e) => write!(f, "Bus error: {e:?}"),
            Self::NoBus => write!(f, "No bus attached"),
            Self::PanelUnavailable => write!(f, "Panel cannot be initialized"),
            Self::CommandListUnterminated { list, records } => write!(
                f,
                "Command list {list} unterminated after {records} records"
            ),
            Self::TransactionActive => write!(f, "Bus transaction in progress"),
            Self::NotReadable => write!(f, "Panel is not readable"),
            Self::NoTouch => write!(f, "No touch sensor attached"),
            Self::CalibrationAborted => write!(f, "Calibration aborted"),
            Self::Calibration(e) => write!(f, "Calibration failed: {e}"),
        }
    }
}

impl<E: core::fmt::Debug> core::error::Error for Error<E> {}

impl<E> From<CalibrationError> for Error<E> {
    fn from(e: CalibrationError) -> Self {
        Self::Calibration(e)
    }
}

/// Errors that can occur when building configuration
///
/// These errors occur during the builder pattern before the device is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderError {
    /// The visible panel is larger than the controller memory
    PanelExceedsMemory {
        /// Visible width requested
        panel_width: u16,
        /// Visible height requested
        panel_height: u16,
        /// Memory width
        memory_width: u16,
        /// Memory height
        memory_height: u16,
    },
    /// The offset window does not fit into controller memory
    ///
    /// `offset_x + panel_width` and `offset_y + panel_height` must not exceed
    /// the memory dimensions.
    OffsetOutOfRange {
        /// X offset requested
        offset_x: u16,
        /// Y offset requested
        offset_y: u16,
    },
    /// Rotation offset outside 0..=7
    InvalidOffsetRotation(u8),
}

impl core::fmt::Display for BuilderError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::PanelExceedsMemory {
                panel_width,
                panel_height,
                memory_width,
                memory_height,
            } => write!(
                f,
                "Panel {panel_width}x{panel_height} exceeds memory {memory_width}x{memory_height}"
            ),
            Self::OffsetOutOfRange { offset_x, offset_y } => {
                write!(f, "Offset ({offset_x}, {offset_y}) places panel outside memory")
            }
            Self::InvalidOffsetRotation(r) => write!(f, "Invalid offset rotation {r} (max 7)"),
        }
    }
}

impl core::error::Error for BuilderError {}

/// Errors from solving a touch calibration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationError {
    /// The reference points do not span a plane (coincident or collinear)
    ///
    /// The current transform is left untouched.
    Singular,
    /// Fewer than four reference points were collected
    Incomplete {
        /// Number of points collected so far
        collected: usize,
    },
}

impl core::fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Singular => write!(f, "Reference points are degenerate"),
            Self::Incomplete { collected } => {
                write!(f, "Calibration incomplete: {collected} of 4 points")
            }
        }
    }
}

impl core::error::Error for CalibrationError {}
