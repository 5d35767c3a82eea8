//! The Prism color model.
//!
//! A [`Color`] is three unbounded floating-point channels. Expression
//! evaluation routinely produces intermediate values outside [-1, 1];
//! range limiting is an operator (`clamp`), never a property of the type.
//! Equality is channel-wise and tolerance-based, so colors that render
//! identically compare equal even after different arithmetic paths.

use std::fmt;

/// Convenience alias. All Prism arithmetic is `f64`.
pub type Scalar = f64;

/// Tolerance for channel-wise color comparisons.
pub const COLOR_TOLERANCE: Scalar = 0.005;

// JPEG luma weights. Both chroma matrices are derived from these, so the
// YCrCb round trip is exact to float precision.
const KR: Scalar = 0.299;
const KG: Scalar = 0.587;
const KB: Scalar = 0.114;

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

/// An RGB color with channels nominally in [-1, 1].
#[derive(Debug, Clone, Copy)]
pub struct Color {
    pub r: Scalar,
    pub g: Scalar,
    pub b: Scalar,
}

impl Color {
    /// Full black in the [-1, 1] display range.
    pub const BLACK: Self = Self::splat(-1.0);
    /// Full white in the [-1, 1] display range.
    pub const WHITE: Self = Self::splat(1.0);

    /// Create a color from its three channels. Never clamps.
    #[inline]
    #[must_use]
    pub const fn new(r: Scalar, g: Scalar, b: Scalar) -> Self {
        Self { r, g, b }
    }

    /// A gray color with all three channels equal.
    ///
    /// This is how a numeric literal denotes a color: `0.5` is
    /// `Color::splat(0.5)`.
    #[inline]
    #[must_use]
    pub const fn splat(v: Scalar) -> Self {
        Self { r: v, g: v, b: v }
    }

    /// Apply a scalar function to each channel.
    #[inline]
    #[must_use]
    pub fn map(self, f: impl Fn(Scalar) -> Scalar) -> Self {
        Self::new(f(self.r), f(self.g), f(self.b))
    }

    /// Combine two colors channel-by-channel.
    #[inline]
    #[must_use]
    pub fn zip(self, other: Self, f: impl Fn(Scalar, Scalar) -> Scalar) -> Self {
        Self::new(f(self.r, other.r), f(self.g, other.g), f(self.b, other.b))
    }

    /// Limit each channel to the closed interval [-1, 1].
    ///
    /// Boundary values pass through unchanged; NaN channels stay NaN.
    #[inline]
    #[must_use]
    pub fn clamp_unit(self) -> Self {
        self.map(|v| v.clamp(-1.0, 1.0))
    }

    /// Convert (r, g, b) to the (Y, Cb, Cr) luma/chroma layout.
    ///
    /// The red channel of the result carries luma, green carries Cb, and
    /// blue carries Cr.
    #[must_use]
    pub fn rgb_to_ycrcb(self) -> Self {
        let y = KB.mul_add(self.b, KR.mul_add(self.r, KG * self.g));
        let cb = (self.b - y) / (2.0 * (1.0 - KB));
        let cr = (self.r - y) / (2.0 * (1.0 - KR));
        Self::new(y, cb, cr)
    }

    /// Exact inverse of [`Color::rgb_to_ycrcb`].
    #[must_use]
    pub fn ycrcb_to_rgb(self) -> Self {
        let (y, cb, cr) = (self.r, self.g, self.b);
        let r = (2.0 * (1.0 - KR)).mul_add(cr, y);
        let b = (2.0 * (1.0 - KB)).mul_add(cb, y);
        let g = (y - KR * r - KB * b) / KG;
        Self::new(r, g, b)
    }
}

/// Channel-wise tolerance equality.
///
/// Not transitive in the strict sense (a chain of almost-equal colors can
/// drift), which is inherent to tolerance comparison and acceptable for
/// this domain.
impl PartialEq for Color {
    fn eq(&self, other: &Self) -> bool {
        (self.r - other.r).abs() < COLOR_TOLERANCE
            && (self.g - other.g).abs() < COLOR_TOLERANCE
            && (self.b - other.b).abs() < COLOR_TOLERANCE
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Color: {} {} {}", self.r, self.g, self.b)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_within_tolerance() {
        let white = Color::new(1.0, 1.0, 1.0);
        let close_to_white = Color::new(0.999, 1.0001, 1.0);
        assert_eq!(white, close_to_white);
        assert_eq!(close_to_white, white);

        let orange = Color::new(1.0, 0.0, -1.0);
        let close_to_orange = Color::new(1.001, -0.00001, -0.9999);
        assert_eq!(orange, close_to_orange);
    }

    #[test]
    fn equality_outside_tolerance() {
        let white = Color::new(1.0, 1.0, 1.0);
        let orange = Color::new(1.0, 0.0, -1.0);
        assert_ne!(white, orange);
        assert_ne!(orange, white);

        // A single channel past the tolerance is enough
        assert_ne!(Color::splat(0.0), Color::new(0.0, 0.0, 0.006));
    }

    #[test]
    fn nan_is_not_equal_to_itself() {
        let bad = Color::splat(Scalar::NAN);
        assert_ne!(bad, bad);
    }

    #[test]
    fn display_uses_default_rendering() {
        assert_eq!(Color::new(1.0, 1.0, 1.0).to_string(), "Color: 1 1 1");
        assert_eq!(
            Color::new(0.999, 1.0001, 1.0).to_string(),
            "Color: 0.999 1.0001 1"
        );
        assert_eq!(Color::new(1.0, 0.0, -1.0).to_string(), "Color: 1 0 -1");
    }

    #[test]
    fn splat_and_constants() {
        assert_eq!(Color::splat(0.25), Color::new(0.25, 0.25, 0.25));
        assert_eq!(Color::WHITE, Color::new(1.0, 1.0, 1.0));
        assert_eq!(Color::BLACK, Color::new(-1.0, -1.0, -1.0));
    }

    #[test]
    fn clamp_unit_limits_each_channel() {
        let c = Color::new(2.5, -3.0, 0.5).clamp_unit();
        assert_eq!(c, Color::new(1.0, -1.0, 0.5));

        // Exact boundaries are unchanged
        let c = Color::new(1.0, -1.0, 0.0).clamp_unit();
        assert_eq!(c, Color::new(1.0, -1.0, 0.0));

        // Extreme magnitudes saturate
        let c = Color::splat(Scalar::MAX).clamp_unit();
        assert_eq!(c, Color::WHITE);
        let c = Color::splat(-Scalar::MAX).clamp_unit();
        assert_eq!(c, Color::BLACK);
    }

    #[test]
    fn clamp_unit_is_idempotent() {
        for v in [-7.3, -1.0, -0.2, 0.0, 0.9, 1.0, 42.0] {
            let once = Color::splat(v).clamp_unit();
            assert_eq!(once.clamp_unit(), once);
        }
    }

    #[test]
    fn zip_and_map() {
        let a = Color::new(0.1, 0.2, 0.3);
        let b = Color::new(1.0, 2.0, 3.0);
        assert_eq!(a.zip(b, |x, y| x + y), Color::new(1.1, 2.2, 3.3));
        assert_eq!(a.map(|x| x * 2.0), Color::new(0.2, 0.4, 0.6));
    }

    #[test]
    fn ycrcb_round_trip() {
        let cases = [
            Color::BLACK,
            Color::WHITE,
            Color::new(1.0, -1.0, -1.0),  // red
            Color::new(-1.0, 1.0, -1.0),  // green
            Color::new(-1.0, -1.0, 1.0),  // blue
            Color::splat(0.2),            // gray
        ];
        for original in cases {
            let back = original.rgb_to_ycrcb().ycrcb_to_rgb();
            assert!(
                (original.r - back.r).abs() < 1e-9
                    && (original.g - back.g).abs() < 1e-9
                    && (original.b - back.b).abs() < 1e-9,
                "round trip drifted: {original} -> {back}"
            );
        }
    }

    #[test]
    fn ycrcb_of_gray_has_zero_chroma() {
        let c = Color::splat(0.4).rgb_to_ycrcb();
        assert!((c.r - 0.4).abs() < 1e-12);
        assert!(c.g.abs() < 1e-12);
        assert!(c.b.abs() < 1e-12);
    }

    #[test]
    fn ycrcb_stays_in_range_for_unit_inputs() {
        let c = Color::new(0.2, -0.3, 0.4).rgb_to_ycrcb();
        assert!(c.r.abs() <= 1.0 && c.g.abs() <= 1.0 && c.b.abs() <= 1.0);
    }
}
