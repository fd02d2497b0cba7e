//! Swirl (vortex) distortion with nearest-neighbour resampling.
//!
//! The source angle of a destination offset is its own angle plus a twist
//! that grows linearly with the distance from the center:
//!
//! ```text
//! strength = step / -100
//! degrees' = degrees(atan2(y, x)) + r * 10 * strength
//! source   = (floor(r * cos(degrees')), floor(r * sin(degrees')))
//! ```
//!
//! Positive and negative steps twist in opposite directions.

use std::f64::consts::PI;
use std::time::Instant;

use super::{remap, ExecutionStrategy};
use crate::types::PixelBuffer;
use serde::{Deserialize, Serialize};

/// Parameters for a swirl distortion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwirlParams {
    /// Effect center X in pixels
    pub center_x: i32,
    /// Effect center Y in pixels
    pub center_y: i32,
    /// Mask radius in pixels (<= 0 is a no-op)
    pub radius: i32,
    /// Twist strength; the sign selects the direction
    pub step: i32,
}

impl SwirlParams {
    /// Create swirl parameters. Any values are accepted.
    pub fn new(center_x: i32, center_y: i32, radius: i32, step: i32) -> Self {
        Self {
            center_x,
            center_y,
            radius,
            step,
        }
    }
}

/// Apply a swirl distortion, returning the distorted copy.
///
/// The mask excludes its boundary (`x² + y² < radius²`). Destination pixels
/// whose source position falls outside the image keep their original value.
pub fn apply_swirl(
    src: &PixelBuffer,
    params: &SwirlParams,
    strategy: ExecutionStrategy,
) -> PixelBuffer {
    let start = Instant::now();
    let strength = f64::from(params.step) / -100.0;
    let radius = i64::from(params.radius);
    let radius_sq = radius * radius;
    let (cx, cy) = (i64::from(params.center_x), i64::from(params.center_y));

    let out = remap(src, cx, cy, radius, strategy, |x, y| {
        if x * x + y * y >= radius_sq {
            return None;
        }

        let (xf, yf) = (x as f64, y as f64);
        let r = (xf * xf + yf * yf).sqrt();
        let degrees = (yf.atan2(xf) * 180.0) / PI + r * 10.0 * strength;
        let angle = (degrees * PI) / 180.0;

        let src_x = (r * angle.cos()).floor() as i64;
        let src_y = (r * angle.sin()).floor() as i64;
        src.pixel(cx + src_x, cy + src_y)
    });

    log::debug!(
        "swirl center=({}, {}) radius={} step={}: rewrote {} pixels in {:?}",
        params.center_x,
        params.center_y,
        params.radius,
        params.step,
        out.rewritten,
        start.elapsed()
    );

    src.with_pixels(out.pixels)
}
