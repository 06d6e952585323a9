//! Rotation utilities
//!
//! Rotation indices run from 0 to 7. The low two bits select a quarter turn
//! (0°, 90°, 180°, 270° clockwise); bit 2 adds a vertical mirror.
//!
//! Calibrated touch points come out in the panel's calibration frame (the
//! panel as seen through `offset_rotation`). [`apply_rotation`] carries them
//! into the frame of the rotation the caller selected.
//!
//! ## Example
//!
//! ```
//! use panel_device::rotation::apply_rotation;
//!
//! // 240x320 panel turned a quarter: the screen is now 320 wide, 240 high
//! let (x, y) = apply_rotation(0, 0, 320, 240, 1);
//! assert_eq!((x, y), (0, 239));
//!
//! // Rotation 0 leaves points alone
//! assert_eq!(apply_rotation(17, 42, 240, 320, 0), (17, 42));
//! ```

/// Rotation bits that flip Y after the optional axis swap (rotations 1, 2, 4, 7)
const FLIP_Y_MASK: u8 = 0b1001_0110;

/// Combine a requested rotation with the panel's rotation offset
///
/// Quarter turns add modulo 4; mirror bits cancel.
pub fn combine_rotation(rotation: u8, offset: u8) -> u8 {
    (rotation.wrapping_add(offset) & 3) | ((rotation & 4) ^ (offset & 4))
}

/// Whether a rotation swaps the width and height
pub fn swaps_axes(rotation: u8) -> bool {
    rotation & 1 != 0
}

/// Map a point from the calibration frame to the screen frame of `rotation`
///
/// # Arguments
///
/// * `x`, `y` - Point in the calibration frame
/// * `width`, `height` - Screen size *after* rotation
/// * `rotation` - Rotation index 0 to 7 (higher bits are ignored)
pub fn apply_rotation(x: i16, y: i16, width: u16, height: u16, rotation: u8) -> (i16, i16) {
    let r = rotation & 7;
    let (mut x, mut y) = if swaps_axes(r) { (y, x) } else { (x, y) };
    if (1u8 << r) & FLIP_Y_MASK != 0 {
        y = mirror(y, height);
    }
    if r & 2 != 0 {
        x = mirror(x, width);
    }
    (x, y)
}

fn mirror(value: i16, extent: u16) -> i16 {
    let far = i32::from(extent) - 1;
    (far - i32::from(value)).clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}
