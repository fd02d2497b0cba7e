//! Lens (magnify/pinch) distortion with bilinear sampling.
//!
//! # Algorithm
//!
//! For a destination offset `(x, y)` inside the mask, with `r = |(x, y)|`,
//! the source radius is a blend of the original radius and an
//! intensity-scaled square root:
//!
//! ```text
//! t  = r / radius
//! r' = t * r + (1 - t) * intensity * sqrt(r)
//! ```
//!
//! At the mask edge `t = 1` and the mapping is the identity, so the effect
//! fades out smoothly. Near the center `r'` is dominated by
//! `intensity * sqrt(r)`, which samples further out (bulge) or further in
//! (pinch) depending on the intensity.

use std::time::Instant;

use super::{remap, ExecutionStrategy};
use crate::types::{DistortError, PixelBuffer, CHANNELS};
use serde::{Deserialize, Serialize};

/// Smallest accepted `effect_intensity`.
pub const MIN_INTENSITY: i32 = 1;
/// Largest accepted `effect_intensity`.
pub const MAX_INTENSITY: i32 = 100;

/// How the lens reads a source pixel at a real-valued position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LensSampling {
    /// Weight the four surrounding pixels by fractional distance.
    #[default]
    Bilinear,
    /// Legacy blend with integer-truncated weights.
    ///
    /// The source offset is floored relative to the center and the truncated
    /// weight is always 0, so this resolves to the top-left neighbour. Kept
    /// for byte-compatibility with existing fixtures.
    Floor,
}

/// Parameters for a lens distortion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LensParams {
    /// Effect center X in pixels
    pub center_x: i32,
    /// Effect center Y in pixels
    pub center_y: i32,
    /// Mask radius in pixels (<= 0 is a no-op)
    pub radius: i32,
    /// Effect intensity (1 to 100)
    pub intensity: i32,
    #[serde(default)]
    pub sampling: LensSampling,
}

impl LensParams {
    /// Create lens parameters with the default bilinear sampling.
    pub fn new(center_x: i32, center_y: i32, radius: i32, intensity: i32) -> Self {
        Self {
            center_x,
            center_y,
            radius,
            intensity,
            sampling: LensSampling::default(),
        }
    }

    /// Use the given sampling strategy.
    pub fn with_sampling(mut self, sampling: LensSampling) -> Self {
        self.sampling = sampling;
        self
    }

    /// Check that the intensity is within `MIN_INTENSITY..=MAX_INTENSITY`.
    pub fn validate(&self) -> Result<(), DistortError> {
        if !(MIN_INTENSITY..=MAX_INTENSITY).contains(&self.intensity) {
            return Err(DistortError::InvalidParameter {
                name: "effect_intensity",
                value: i64::from(self.intensity),
                min: i64::from(MIN_INTENSITY),
                max: i64::from(MAX_INTENSITY),
            });
        }
        Ok(())
    }
}

/// Apply a lens distortion, returning the distorted copy.
///
/// The mask includes its boundary (`x² + y² <= radius²`). Destination pixels
/// whose source position falls outside the image keep their original value.
///
/// # Errors
///
/// Returns [`DistortError::InvalidParameter`] when `intensity` is outside
/// `1..=100`. The source is never modified.
pub fn apply_lens(
    src: &PixelBuffer,
    params: &LensParams,
    strategy: ExecutionStrategy,
) -> Result<PixelBuffer, DistortError> {
    if let Err(err) = params.validate() {
        log::warn!("lens rejected: {err}");
        return Err(err);
    }

    let start = Instant::now();
    let intensity = f64::from(params.intensity) / 10.0;
    let radius = i64::from(params.radius);
    let radius_f = radius as f64;
    let radius_sq = radius * radius;
    let (center_x, center_y) = (i64::from(params.center_x), i64::from(params.center_y));
    let (cx, cy) = (center_x as f64, center_y as f64);

    let out = remap(
        src,
        center_x,
        center_y,
        radius,
        strategy,
        |x, y| {
            if x * x + y * y > radius_sq {
                return None;
            }

            let (xf, yf) = (x as f64, y as f64);
            let r = (xf * xf + yf * yf).sqrt();
            let angle = yf.atan2(xf);
            let t = r / radius_f;
            let r = t * r + (1.0 - t) * intensity * r.sqrt();

            // Source position relative to the center
            let (dx, dy) = (r * angle.cos(), r * angle.sin());
            let (src_x, src_y) = (dx + cx, dy + cy);
            if !src.contains(src_x, src_y) {
                return None;
            }

            Some(match params.sampling {
                LensSampling::Bilinear => sample_bilinear(src, src_x, src_y),
                LensSampling::Floor => sample_floor(src, center_x, center_y, dx, dy),
            })
        },
    );

    log::debug!(
        "lens center=({}, {}) radius={} intensity={} sampling={:?}: rewrote {} pixels in {:?}",
        params.center_x,
        params.center_y,
        params.radius,
        params.intensity,
        params.sampling,
        out.rewritten,
        start.elapsed()
    );

    Ok(src.with_pixels(out.pixels))
}

/// The four grid neighbours of `(x0, y0)`, clamped to the last column/row.
///
/// Order: `(x0, y0), (x0+1, y0), (x0, y0+1), (x0+1, y0+1)`.
#[inline]
fn neighbours(src: &PixelBuffer, x0: i64, y0: i64) -> [[u8; CHANNELS]; 4] {
    let x1 = (x0 + 1).min(i64::from(src.width()) - 1);
    let y1 = (y0 + 1).min(i64::from(src.height()) - 1);
    [(x0, y0), (x1, y0), (x0, y1), (x1, y1)]
        .map(|(x, y)| src.pixel(x, y).unwrap_or_default())
}

/// Sample a pixel using bilinear interpolation.
///
/// `(x, y)` must lie inside the image.
fn sample_bilinear(src: &PixelBuffer, x: f64, y: f64) -> [u8; CHANNELS] {
    let x0 = x.floor();
    let y0 = y.floor();

    // Fractional distances
    let fx = x - x0;
    let fy = y - y0;

    let [p00, p10, p01, p11] = neighbours(src, x0 as i64, y0 as i64);

    let mut result = [0u8; CHANNELS];
    for k in 0..CHANNELS {
        let v = f64::from(p00[k]) * (1.0 - fx) * (1.0 - fy)
            + f64::from(p10[k]) * fx * (1.0 - fy)
            + f64::from(p01[k]) * (1.0 - fx) * fy
            + f64::from(p11[k]) * fx * fy;
        result[k] = v.clamp(0.0, 255.0).round() as u8;
    }
    result
}

/// Sample a pixel with the legacy integer-weight blend.
///
/// `(dx, dy)` is the source position relative to the center. It is floored
/// before the center is added: flooring the absolute position instead moves
/// offsets like 2.9999999999999996 onto the next pixel once the center is
/// added.
fn sample_floor(
    src: &PixelBuffer,
    center_x: i64,
    center_y: i64,
    dx: f64,
    dy: f64,
) -> [u8; CHANNELS] {
    let fx = dx.floor();
    let fy = dy.floor();

    // Truncation toward zero of a value in [0, 1).
    let wx = (dx - fx) as i32;
    let wy = (dy - fy) as i32;

    let x0 = (fx as i64 + center_x).clamp(0, i64::from(src.width()) - 1);
    let y0 = (fy as i64 + center_y).clamp(0, i64::from(src.height()) - 1);
    let [p00, p10, p01, p11] = neighbours(src, x0, y0);
    blend_truncated(p00, p10, p01, p11, wx, wy)
}

/// Integer bilinear blend, clamped to `[0, 255]` per channel.
fn blend_truncated(
    p00: [u8; CHANNELS],
    p10: [u8; CHANNELS],
    p01: [u8; CHANNELS],
    p11: [u8; CHANNELS],
    wx: i32,
    wy: i32,
) -> [u8; CHANNELS] {
    let mut result = [0u8; CHANNELS];
    for k in 0..CHANNELS {
        let top = (i32::from(p10[k]) - i32::from(p00[k])) * wx + i32::from(p00[k]);
        let bottom = (i32::from(p11[k]) - i32::from(p01[k])) * wx + i32::from(p01[k]);
        result[k] = ((bottom - top) * wy + top).clamp(0, 255) as u8;
    }
    result
}
