//! Decoded image rasters and domain-space sampling.
//!
//! A [`Raster`] is the in-memory form of an image supplied by the host's
//! image-loading collaborator. The expression core never decodes files;
//! it only samples rasters, mapping the [-1, 1] evaluation domain onto
//! the pixel grid with either a clipping or a wrapping edge policy.

use crate::color::{Color, Scalar};

// ---------------------------------------------------------------------------
// Raster
// ---------------------------------------------------------------------------

/// A decoded image: a row-major grid of colors.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    width: usize,
    height: usize,
    pixels: Vec<Color>,
}

impl Raster {
    /// Create a raster from row-major pixels.
    ///
    /// # Panics
    /// If either dimension is zero or `pixels.len() != width * height`.
    #[must_use]
    pub fn new(width: usize, height: usize, pixels: Vec<Color>) -> Self {
        assert!(width > 0 && height > 0, "raster must be non-empty");
        assert_eq!(pixels.len(), width * height, "pixel count mismatch");
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Create a raster from packed 8-bit RGB bytes (3 bytes per pixel),
    /// mapping each byte from [0, 255] into the [-1, 1] channel range.
    ///
    /// # Panics
    /// If either dimension is zero or `data.len() != width * height * 3`.
    #[must_use]
    pub fn from_rgb8(width: usize, height: usize, data: &[u8]) -> Self {
        assert_eq!(data.len(), width * height * 3, "byte count mismatch");
        let to_channel = |b: u8| (Scalar::from(b) / 255.0).mul_add(2.0, -1.0);
        let pixels = data
            .chunks_exact(3)
            .map(|px| Color::new(to_channel(px[0]), to_channel(px[1]), to_channel(px[2])))
            .collect();
        Self::new(width, height, pixels)
    }

    /// A raster filled with a single color. Mostly useful in tests.
    #[must_use]
    pub fn solid(width: usize, height: usize, color: Color) -> Self {
        Self::new(width, height, vec![color; width * height])
    }

    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    fn pixel(&self, ix: usize, iy: usize) -> Color {
        self.pixels[iy * self.width + ix]
    }

    /// Sample with the clipping edge policy: coordinates outside [-1, 1]
    /// saturate to the nearest border pixel.
    #[must_use]
    pub fn sample_clip(&self, u: Scalar, v: Scalar) -> Color {
        let ix = Self::index_of(self.width, u.clamp(-1.0, 1.0));
        let iy = Self::index_of(self.height, v.clamp(-1.0, 1.0));
        self.pixel(ix, iy)
    }

    /// Sample with the wrapping edge policy: coordinates repeat with
    /// period 2, so the image tiles across the whole plane.
    #[must_use]
    pub fn sample_wrap(&self, u: Scalar, v: Scalar) -> Color {
        let ix = Self::index_of(self.width, wrap_unit(u));
        let iy = Self::index_of(self.height, wrap_unit(v));
        self.pixel(ix, iy)
    }

    /// Map a domain coordinate in [-1, 1] to a pixel index in [0, n).
    ///
    /// Non-finite coordinates collapse to index 0 rather than failing;
    /// evaluation is total.
    fn index_of(n: usize, u: Scalar) -> usize {
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
        #[allow(clippy::cast_sign_loss)]
        {
            let last = (n - 1) as Scalar;
            (((u + 1.0) * 0.5 * last).round()).clamp(0.0, last) as usize
        }
    }
}

/// Reduce a coordinate into the canonical [-1, 1) period.
fn wrap_unit(v: Scalar) -> Scalar {
    (v + 1.0).rem_euclid(2.0) - 1.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
