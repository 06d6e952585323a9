//! Touch sensor abstraction

/// One touch sample
///
/// Sensors fill `x`/`y` with raw readings; the device overwrites them with
/// screen coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TouchPoint {
    /// X coordinate
    pub x: i16,
    /// Y coordinate
    pub y: i16,
    /// Contact size, if the sensor reports one
    pub size: u16,
    /// Contact identifier for multi-touch sensors
    pub id: u16,
}

impl TouchPoint {
    /// A point at (x, y) with no size or id
    pub const fn new(x: i16, y: i16) -> Self {
        Self {
            x,
            y,
            size: 0,
            id: 0,
        }
    }
}

/// Touch sensor that produces raw, uncalibrated samples
pub trait Touch {
    /// Prepare the sensor; false if it did not respond
    fn init(&mut self) -> bool {
        true
    }

    /// Fill `points` with up to `points.len()` raw samples
    ///
    /// Returns how many entries were written. Zero means nothing is touching
    /// the panel.
    fn read_raw(&mut self, points: &mut [TouchPoint]) -> usize;
}
