//! Gradient noise for the perlin color built-ins.
//!
//! Classic 3-D improved gradient noise (Perlin, 2002): a fixed permutation
//! table hashes lattice corners to one of twelve gradient directions, and
//! the fifth-order fade curve blends the eight corner contributions. The
//! table is fixed, so the function is deterministic; the language's
//! nondeterministic `random()` lives in the render context instead.

use crate::color::Scalar;

/// Ken Perlin's reference permutation of 0..=255.
const PERMUTATION: [u8; 256] = [
    151, 160, 137, 91, 90, 15, 131, 13, 201, 95, 96, 53, 194, 233, 7, 225,
    140, 36, 103, 30, 69, 142, 8, 99, 37, 240, 21, 10, 23, 190, 6, 148, 247,
    120, 234, 75, 0, 26, 197, 62, 94, 252, 219, 203, 117, 35, 11, 32, 57,
    177, 33, 88, 237, 149, 56, 87, 174, 20, 125, 136, 171, 168, 68, 175, 74,
    165, 71, 134, 139, 48, 27, 166, 77, 146, 158, 231, 83, 111, 229, 122, 60,
    211, 133, 230, 220, 105, 92, 41, 55, 46, 245, 40, 244, 102, 143, 54, 65,
    25, 63, 161, 1, 216, 80, 73, 209, 76, 132, 187, 208, 89, 18, 169, 200,
    196, 135, 130, 116, 188, 159, 86, 164, 100, 109, 198, 173, 186, 3, 64,
    52, 217, 226, 250, 124, 123, 5, 202, 38, 147, 118, 126, 255, 82, 85, 212,
    207, 206, 59, 227, 47, 16, 58, 17, 182, 189, 28, 42, 223, 183, 170, 213,
    119, 248, 152, 2, 44, 154, 163, 70, 221, 153, 101, 155, 167, 43, 172, 9,
    129, 22, 39, 253, 19, 98, 108, 110, 79, 113, 224, 232, 178, 185, 112,
    104, 218, 246, 97, 228, 251, 34, 242, 193, 238, 210, 144, 12, 191, 179,
    162, 241, 81, 51, 145, 235, 249, 14, 239, 107, 49, 192, 214, 31, 181,
    199, 106, 157, 184, 84, 204, 176, 115, 121, 50, 45, 127, 4, 150, 254,
    138, 236, 205, 93, 222, 114, 67, 29, 24, 72, 243, 141, 128, 195, 78, 66,
    215, 61, 156, 180,
];

#[inline]
fn perm(i: usize) -> usize {
    usize::from(PERMUTATION[i & 255])
}

/// Fifth-order smoothstep: 6t⁵ - 15t⁴ + 10t³.
#[inline]
fn fade(t: Scalar) -> Scalar {
    t * t * t * t.mul_add(t.mul_add(6.0, -15.0), 10.0)
}

#[inline]
fn lerp(t: Scalar, a: Scalar, b: Scalar) -> Scalar {
    t.mul_add(b - a, a)
}

/// Dot product of the hashed gradient direction with the offset vector.
fn grad(hash: usize, x: Scalar, y: Scalar, z: Scalar) -> Scalar {
    let h = hash & 15;
    let u = if h < 8 { x } else { y };
    let v = if h < 4 {
        y
    } else if h == 12 || h == 14 {
        x
    } else {
        z
    };
    (if h & 1 == 0 { u } else { -u }) + (if h & 2 == 0 { v } else { -v })
}

/// Improved gradient noise at (x, y, z).
///
/// Deterministic; zero at every integer lattice point; output within
/// [-1, 1]. Non-finite inputs propagate as NaN.
#[must_use]
pub fn noise3(x: Scalar, y: Scalar, z: Scalar) -> Scalar {
    #[allow(clippy::cast_possible_truncation)]
    let cell = |v: Scalar| (v.floor() as i64 & 255) as usize;
    let (xi, yi, zi) = (cell(x), cell(y), cell(z));
    let (xf, yf, zf) = (x - x.floor(), y - y.floor(), z - z.floor());

    let u = fade(xf);
    let v = fade(yf);
    let w = fade(zf);

    // Hash the eight cube corners
    let a = perm(xi) + yi;
    let aa = perm(a) + zi;
    let ab = perm(a + 1) + zi;
    let b = perm(xi + 1) + yi;
    let ba = perm(b) + zi;
    let bb = perm(b + 1) + zi;

    lerp(
        w,
        lerp(
            v,
            lerp(
                u,
                grad(perm(aa), xf, yf, zf),
                grad(perm(ba), xf - 1.0, yf, zf),
            ),
            lerp(
                u,
                grad(perm(ab), xf, yf - 1.0, zf),
                grad(perm(bb), xf - 1.0, yf - 1.0, zf),
            ),
        ),
        lerp(
            v,
            lerp(
                u,
                grad(perm(aa + 1), xf, yf, zf - 1.0),
                grad(perm(ba + 1), xf - 1.0, yf, zf - 1.0),
            ),
            lerp(
                u,
                grad(perm(ab + 1), xf, yf - 1.0, zf - 1.0),
                grad(perm(bb + 1), xf - 1.0, yf - 1.0, zf - 1.0),
            ),
        ),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permutation_covers_all_bytes() {
        let mut seen = [false; 256];
        for &v in &PERMUTATION {
            seen[usize::from(v)] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn zero_at_lattice_points() {
        for i in -3..=3 {
            for j in -3..=3 {
                let v = noise3(Scalar::from(i), Scalar::from(j), 0.0);
                assert_eq!(v, 0.0, "lattice point ({i}, {j}, 0)");
            }
        }
    }

    #[test]
    fn deterministic() {
        let a = noise3(0.37, -1.62, 4.01);
        let b = noise3(0.37, -1.62, 4.01);
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn output_within_unit_range() {
        let mut min = Scalar::MAX;
        let mut max = Scalar::MIN;
        for i in 0..60 {
            for j in 0..60 {
                let v = noise3(
                    Scalar::from(i).mul_add(0.173, 0.05),
                    Scalar::from(j).mul_add(0.291, -3.4),
                    1.7,
                );
                min = min.min(v);
                max = max.max(v);
            }
        }
        assert!(min >= -1.0 && max <= 1.0, "range [{min}, {max}]");
        // A reasonable sample should actually move away from zero
        assert!(max > 0.05 && min < -0.05, "range [{min}, {max}]");
    }

    #[test]
    fn varies_between_points() {
        assert_ne!(noise3(0.5, 0.5, 0.5), noise3(0.6, 0.5, 0.5));
    }

    #[test]
    fn nan_propagates() {
        assert!(noise3(Scalar::NAN, 0.0, 0.0).is_nan());
    }
}
