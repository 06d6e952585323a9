//! Affine touch calibration
//!
//! Raw touch readings are mapped to screen coordinates with a six-coefficient
//! affine transform `[a, b, c, d, e, f]`:
//!
//! ```text
//! x' = a*x + b*y + c
//! y' = d*x + e*y + f
//! ```
//!
//! The coefficients are either set directly or solved from four raw readings
//! taken at known anchor points near the panel corners.
//!
//! ## Anchor order
//!
//! | index | anchor       |
//! |-------|--------------|
//! | 0     | top-left     |
//! | 1     | bottom-left  |
//! | 2     | top-right    |
//! | 3     | bottom-right |
//!
//! Each anchor is inset from its corner by [`CALIBRATION_MARGIN`] pixels.
//!
//! ## Example
//!
//! ```
//! use panel_device::affine::{anchor, Affine};
//!
//! // A sensor that reads 10 counts per pixel, origin at the panel origin
//! let mut raw = [0u16; 8];
//! for i in 0..4 {
//!     let (x, y) = anchor(i, 240, 320);
//!     raw[i * 2] = x * 10;
//!     raw[i * 2 + 1] = y * 10;
//! }
//! let affine = match Affine::calibrate(&raw, 240, 320) {
//!     Ok(affine) => affine,
//!     Err(_) => return,
//! };
//! let (x, y) = affine.apply(1200.0, 1600.0);
//! assert!((x - 120.0).abs() < 0.01);
//! assert!((y - 160.0).abs() < 0.01);
//! ```

use crate::error::CalibrationError;
use crate::touch::TouchPoint;

/// Distance in pixels between each calibration anchor and its panel corner
pub const CALIBRATION_MARGIN: u16 = 10;

/// Number of reference points a calibration needs
pub const CALIBRATION_POINTS: usize = 4;

// Relative floor for the determinant of the centred normal equations.
const SINGULAR_EPSILON: f64 = 1e-9;

/// Screen position of calibration anchor `index` (0 to 3) on a `width` x `height` panel
///
/// Indices above 3 wrap. On a panel narrower or shorter than
/// `2 * CALIBRATION_MARGIN + 2` pixels the opposite anchors along that axis
/// coincide, so [`Affine::calibrate`] on such a panel always returns
/// `CalibrationError::Singular`.
pub fn anchor(index: usize, width: u16, height: u16) -> (u16, u16) {
    let right = (index >> 1) & 1 != 0;
    let bottom = index & 1 != 0;
    let near_x = CALIBRATION_MARGIN.min(width.saturating_sub(1));
    let near_y = CALIBRATION_MARGIN.min(height.saturating_sub(1));
    let x = if right {
        width.saturating_sub(1).saturating_sub(CALIBRATION_MARGIN).max(near_x)
    } else {
        near_x
    };
    let y = if bottom {
        height.saturating_sub(1).saturating_sub(CALIBRATION_MARGIN).max(near_y)
    } else {
        near_y
    };
    (x, y)
}

/// Affine map from raw touch readings to screen coordinates
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Affine {
    coeffs: [f32; 6],
}

impl Default for Affine {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Affine {
    /// The transform that leaves points unchanged
    pub const IDENTITY: Self = Self {
        coeffs: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
    };

    /// Use `coeffs` verbatim
    ///
    /// No validation: a degenerate matrix collapses every point onto a line or
    /// a single point.
    pub const fn new(coeffs: [f32; 6]) -> Self {
        Self { coeffs }
    }

    /// The six coefficients `[a, b, c, d, e, f]`
    pub fn coefficients(&self) -> [f32; 6] {
        self.coeffs
    }

    /// Map one raw position
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        let [a, b, c, d, e, f] = self.coeffs;
        (a * x + b * y + c, d * x + e * y + f)
    }

    /// Map every point in `points` in place
    ///
    /// Results are rounded to the nearest pixel and clamped to the `i16`
    /// range. `size` and `id` are left alone.
    pub fn convert(&self, points: &mut [TouchPoint]) {
        for point in points {
            let (x, y) = self.apply(f32::from(point.x), f32::from(point.y));
            point.x = round_to_i16(x);
            point.y = round_to_i16(y);
        }
    }

    /// Solve the transform from four raw readings
    ///
    /// `parameters` holds the raw `(x, y)` of each anchor in anchor order:
    /// `[x0, y0, x1, y1, x2, y2, x3, y3]`. `width` and `height` are the panel
    /// size the anchors are laid out on.
    ///
    /// # Errors
    ///
    /// Returns `CalibrationError::Singular` if the readings are coincident or
    /// collinear.
    pub fn calibrate(
        parameters: &[u16; 8],
        width: u16,
        height: u16,
    ) -> Result<Self, CalibrationError> {
        let mut raw = [(0.0, 0.0); CALIBRATION_POINTS];
        let mut target = [(0.0, 0.0); CALIBRATION_POINTS];
        for i in 0..CALIBRATION_POINTS {
            raw[i] = (f64::from(parameters[i * 2]), f64::from(parameters[i * 2 + 1]));
            let (tx, ty) = anchor(i, width, height);
            target[i] = (f64::from(tx), f64::from(ty));
        }
        Self::from_correspondences(&raw, &target)
    }

    /// Least-squares fit of `raw[i] -> target[i]`
    ///
    /// Each output axis is an independent three-unknown system. Centring on the
    /// mean eliminates the constant term, leaving a 2x2 system solved directly.
    ///
    /// # Errors
    ///
    /// Returns `CalibrationError::Singular` if the raw points do not span a
    /// plane or the result is not finite.
    pub fn from_correspondences(
        raw: &[(f64, f64); CALIBRATION_POINTS],
        target: &[(f64, f64); CALIBRATION_POINTS],
    ) -> Result<Self, CalibrationError> {
        let (mx, my) = centroid(raw);
        let (mtx, mty) = centroid(target);

        let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
        let (mut sx_tx, mut sy_tx, mut sx_ty, mut sy_ty) = (0.0, 0.0, 0.0, 0.0);
        for i in 0..CALIBRATION_POINTS {
            let dx = raw[i].0 - mx;
            let dy = raw[i].1 - my;
            let dtx = target[i].0 - mtx;
            let dty = target[i].1 - mty;
            sxx += dx * dx;
            syy += dy * dy;
            sxy += dx * dy;
            sx_tx += dx * dtx;
            sy_tx += dy * dtx;
            sx_ty += dx * dty;
            sy_ty += dy * dty;
        }

        let scale = sxx + syy;
        let det = sxx * syy - sxy * sxy;
        if !(scale > 0.0 && det > SINGULAR_EPSILON * scale * scale) {
            log::warn!("calibration points are degenerate (det={})", det);
            return Err(CalibrationError::Singular);
        }

        let a = (sx_tx * syy - sy_tx * sxy) / det;
        let b = (sy_tx * sxx - sx_tx * sxy) / det;
        let c = mtx - a * mx - b * my;
        let d = (sx_ty * syy - sy_ty * sxy) / det;
        let e = (sy_ty * sxx - sx_ty * sxy) / det;
        let f = mty - d * mx - e * my;

        let coeffs = [a as f32, b as f32, c as f32, d as f32, e as f32, f as f32];
        if coeffs.iter().any(|v| !v.is_finite()) {
            log::warn!("calibration produced non-finite coefficients");
            return Err(CalibrationError::Singular);
        }
        Ok(Self { coeffs })
    }
}

fn centroid(points: &[(f64, f64); CALIBRATION_POINTS]) -> (f64, f64) {
    let (sx, sy) = points
        .iter()
        .fold((0.0_f64, 0.0_f64), |(sx, sy), &(x, y)| (sx + x, sy + y));
    let n = CALIBRATION_POINTS as f64;
    (sx / n, sy / n)
}

fn round_to_i16(value: f32) -> i16 {
    // `as` saturates and maps NaN to 0
    if value >= 0.0 {
        (value + 0.5) as i16
    } else {
        (value - 0.5) as i16
    }
}

/// Collector for the four raw readings of a calibration run
///
/// Readings are pushed in anchor order. A fresh collector (or [`clear`](Self::clear))
/// starts over.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Calibration {
    raw: [(u16, u16); CALIBRATION_POINTS],
    len: usize,
}

impl Calibration {
    /// Empty collector
    pub const fn new() -> Self {
        Self {
            raw: [(0, 0); CALIBRATION_POINTS],
            len: 0,
        }
    }

    /// Number of readings collected
    pub fn len(&self) -> usize {
        self.len
    }

    /// No readings yet
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// All four readings collected
    pub fn is_complete(&self) -> bool {
        self.len == CALIBRATION_POINTS
    }

    /// Discard collected readings
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Anchor the next reading belongs to, if any remain
    pub fn next_anchor(&self, width: u16, height: u16) -> Option<(u16, u16)> {
        (!self.is_complete()).then(|| anchor(self.len, width, height))
    }

    /// Record the reading for the next anchor
    ///
    /// Negative readings clamp to zero. Returns true once all four readings are
    /// in; further pushes are ignored.
    pub fn push(&mut self, raw: TouchPoint) -> bool {
        if self.len < CALIBRATION_POINTS {
            self.raw[self.len] = (raw.x.max(0) as u16, raw.y.max(0) as u16);
            self.len += 1;
        }
        self.is_complete()
    }

    /// Readings in the `[x0, y0, ..., x3, y3]` layout `Affine::calibrate` takes
    ///
    /// # Errors
    ///
    /// Returns `CalibrationError::Incomplete` until four readings are in.
    pub fn parameters(&self) -> Result<[u16; 8], CalibrationError> {
        if !self.is_complete() {
            return Err(CalibrationError::Incomplete {
                collected: self.len,
            });
        }
        let mut params = [0u16; 8];
        for (i, (x, y)) in self.raw.iter().enumerate() {
            params[i * 2] = *x;
            params[i * 2 + 1] = *y;
        }
        Ok(params)
    }

    /// Solve the transform from the collected readings
    ///
    /// # Errors
    ///
    /// `CalibrationError::Incomplete` before four readings,
    /// `CalibrationError::Singular` for degenerate readings.
    pub fn solve(&self, width: u16, height: u16) -> Result<Affine, CalibrationError> {
        Affine::calibrate(&self.parameters()?, width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: u16 = 240;
    const H: u16 = 320;

    fn close(a: f32, b: f32) -> bool {
        let diff = a - b;
        diff < 1e-3 && diff > -1e-3
    }

    /// Raw readings from a sensor that is scaled, offset and slightly skewed
    fn skewed_readings() -> [u16; 8] {
        let mut raw = [0u16; 8];
        for i in 0..4 {
            let (x, y) = anchor(i, W, H);
            let (x, y) = (f32::from(x), f32::from(y));
            raw[i * 2] = (12.0 * x + 0.5 * y + 200.0) as u16;
            raw[i * 2 + 1] = (0.25 * x + 11.0 * y + 150.0) as u16;
        }
        raw
    }

    #[test]
    fn test_anchor_layout() {
        assert_eq!(anchor(0, W, H), (10, 10));
        assert_eq!(anchor(1, W, H), (10, 309));
        assert_eq!(anchor(2, W, H), (229, 10));
        assert_eq!(anchor(3, W, H), (229, 309));
    }

    #[test]
    fn test_anchor_tiny_panel_stays_on_panel() {
        let (x, y) = anchor(3, 4, 4);
        assert!(x < 4 && y < 4);
    }

    #[test]
    fn test_narrow_panel_cannot_calibrate() {
        let width = 2 * CALIBRATION_MARGIN;
        assert_eq!(anchor(0, width, H).0, anchor(2, width, H).0);
        let mut raw = [0u16; 8];
        for i in 0..4 {
            let (x, y) = anchor(i, width, H);
            raw[i * 2] = x * 3 + 100;
            raw[i * 2 + 1] = y * 3 + 100;
        }
        assert_eq!(
            Affine::calibrate(&raw, width, H),
            Err(CalibrationError::Singular)
        );
        let width = 2 * CALIBRATION_MARGIN + 2;
        assert!(anchor(0, width, H).0 < anchor(2, width, H).0);
    }

    #[test]
    fn test_identity_leaves_points() {
        let mut points = [
            TouchPoint::new(0, 0),
            TouchPoint::new(-5, 17),
            TouchPoint::new(239, 319),
        ];
        let before = points;
        Affine::IDENTITY.convert(&mut points);
        assert_eq!(points, before);
    }

    #[test]
    fn test_default_is_identity() {
        assert_eq!(
            Affine::default().coefficients(),
            [1.0, 0.0, 0.0, 0.0, 1.0, 0.0]
        );
    }

    #[test]
    fn test_convert_empty_is_noop() {
        let affine = Affine::new([2.0, 0.0, 1.0, 0.0, 2.0, 1.0]);
        affine.convert(&mut []);
    }

    #[test]
    fn test_convert_only_touches_slice() {
        let affine = Affine::new([1.0, 0.0, 100.0, 0.0, 1.0, 100.0]);
        let mut points = [TouchPoint::new(1, 1), TouchPoint::new(2, 2)];
        affine.convert(&mut points[..1]);
        assert_eq!(points[0], TouchPoint::new(101, 101));
        assert_eq!(points[1], TouchPoint::new(2, 2));
    }

    #[test]
    fn test_convert_rounds_and_keeps_id() {
        let affine = Affine::new([0.5, 0.0, 0.0, 0.0, 0.5, -0.2]);
        let mut points = [TouchPoint {
            x: 3,
            y: -3,
            size: 9,
            id: 2,
        }];
        affine.convert(&mut points);
        assert_eq!(points[0].x, 2);
        assert_eq!(points[0].y, -2);
        assert_eq!(points[0].size, 9);
        assert_eq!(points[0].id, 2);
    }

    #[test]
    fn test_convert_saturates() {
        let affine = Affine::new([1000.0, 0.0, 0.0, 0.0, -1000.0, 0.0]);
        let mut points = [TouchPoint::new(1000, 1000)];
        affine.convert(&mut points);
        assert_eq!(points[0], TouchPoint::new(i16::MAX, i16::MIN));
    }

    #[test]
    fn test_calibrate_round_trip() {
        let raw = skewed_readings();
        let affine = Affine::calibrate(&raw, W, H).unwrap();
        for i in 0..4 {
            let (tx, ty) = anchor(i, W, H);
            let (x, y) = affine.apply(f32::from(raw[i * 2]), f32::from(raw[i * 2 + 1]));
            assert!((x - f32::from(tx)) < 0.6 && (f32::from(tx) - x) < 0.6, "x {x} vs {tx}");
            assert!((y - f32::from(ty)) < 0.6 && (f32::from(ty) - y) < 0.6, "y {y} vs {ty}");
        }
    }

    #[test]
    fn test_calibrate_exact_scale() {
        let mut raw = [0u16; 8];
        for i in 0..4 {
            let (x, y) = anchor(i, W, H);
            raw[i * 2] = x * 10 + 100;
            raw[i * 2 + 1] = y * 10 + 50;
        }
        let affine = Affine::calibrate(&raw, W, H).unwrap();
        let [a, b, c, d, e, f] = affine.coefficients();
        assert!(close(a, 0.1) && close(b, 0.0) && close(c, -10.0));
        assert!(close(d, 0.0) && close(e, 0.1) && close(f, -5.0));
    }

    #[test]
    fn test_calibrate_swapped_axes() {
        // Sensor X runs along the panel's Y axis
        let mut raw = [0u16; 8];
        for i in 0..4 {
            let (x, y) = anchor(i, W, H);
            raw[i * 2] = y;
            raw[i * 2 + 1] = x;
        }
        let affine = Affine::calibrate(&raw, W, H).unwrap();
        let [a, b, _, d, e, _] = affine.coefficients();
        assert!(close(a, 0.0) && close(b, 1.0));
        assert!(close(d, 1.0) && close(e, 0.0));
    }

    #[test]
    fn test_calibrate_all_same_point_is_singular() {
        let raw = [500u16; 8];
        assert_eq!(Affine::calibrate(&raw, W, H), Err(CalibrationError::Singular));
    }

    #[test]
    fn test_calibrate_collinear_is_singular() {
        let raw = [100, 100, 200, 200, 300, 300, 400, 400];
        assert_eq!(Affine::calibrate(&raw, W, H), Err(CalibrationError::Singular));
    }

    #[test]
    fn test_calibrate_one_duplicate_still_solves() {
        let mut raw = skewed_readings();
        // Bottom-right pressed where top-right was
        raw[6] = raw[4];
        raw[7] = raw[5];
        let affine = Affine::calibrate(&raw, W, H).unwrap();
        assert!(affine.coefficients().iter().all(|c| c.is_finite()));
    }

    #[test]
    fn test_collector_incomplete() {
        let mut cal = Calibration::new();
        assert!(cal.is_empty());
        assert!(!cal.push(TouchPoint::new(1, 2)));
        assert_eq!(cal.len(), 1);
        assert_eq!(cal.solve(W, H), Err(CalibrationError::Incomplete { collected: 1 }));
    }

    #[test]
    fn test_collector_completes_after_four() {
        let raw = skewed_readings();
        let mut cal = Calibration::new();
        let mut done = false;
        for i in 0..4 {
            assert_eq!(cal.next_anchor(W, H), Some(anchor(i, W, H)));
            done = cal.push(TouchPoint::new(raw[i * 2] as i16, raw[i * 2 + 1] as i16));
        }
        assert!(done);
        assert_eq!(cal.next_anchor(W, H), None);
        assert_eq!(cal.parameters(), Ok(raw));
        assert_eq!(cal.solve(W, H), Affine::calibrate(&raw, W, H));

        // A fifth push changes nothing
        assert!(cal.push(TouchPoint::new(0, 0)));
        assert_eq!(cal.parameters(), Ok(raw));
    }

    #[test]
    fn test_collector_clear_restarts() {
        let mut cal = Calibration::new();
        cal.push(TouchPoint::new(1, 1));
        cal.push(TouchPoint::new(2, 2));
        cal.clear();
        assert!(cal.is_empty());
        assert_eq!(cal.next_anchor(W, H), Some(anchor(0, W, H)));
    }

    #[test]
    fn test_collector_clamps_negative() {
        let mut cal = Calibration::new();
        for _ in 0..4 {
            cal.push(TouchPoint::new(-4, -9));
        }
        assert_eq!(cal.parameters(), Ok([0; 8]));
    }
}
