//! Geometric distortions: lens and swirl.
//!
//! Both distortions are inverse mappings restricted to a circular mask. For
//! every destination pixel inside the mask we compute where in the source it
//! should be read from, sample there, and write the result. Pixels outside
//! the mask, or whose source position falls outside the image, pass through
//! unchanged.
//!
//! # Buffer Discipline
//!
//! A pass never reads from the buffer it writes to. The destination starts as
//! a copy of the source, every rewritten pixel is computed from the untouched
//! source, and the caller swaps the destination in once the pass completes.
//!
//! # Coordinate System
//!
//! - Centers and radii are integer pixel coordinates, origin top-left
//! - Mask offsets `(x, y)` range over `[-radius, radius)` on both axes
//! - Centers outside the image are accepted; only in-image pixels are touched

mod lens;
mod swirl;

pub use lens::{apply_lens, LensParams, LensSampling, MAX_INTENSITY, MIN_INTENSITY};
pub use swirl::{apply_swirl, SwirlParams};

use crate::types::{PixelBuffer, CHANNELS};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Controls how a distortion pass is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExecutionStrategy {
    /// Run sequentially on the current thread.
    #[default]
    Serial,
    /// Process destination rows in parallel on the global rayon pool.
    ///
    /// Each worker owns a disjoint set of destination rows and reads the
    /// shared source, so the output is identical to [`ExecutionStrategy::Serial`].
    ParallelRows,
}

/// A single distortion step, serializable as part of an edit recipe.
///
/// ```json
/// [
///   { "type": "lens", "center_x": 100, "center_y": 65, "radius": 65, "intensity": 50 },
///   { "type": "swirl", "center_x": 100, "center_y": 65, "radius": 65, "step": 10 }
/// ]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Distortion {
    Lens(LensParams),
    Swirl(SwirlParams),
}

/// Result of a remap pass.
pub(crate) struct Remapped {
    pub pixels: Vec<u8>,
    /// Number of destination pixels that were rewritten.
    pub rewritten: usize,
}

/// Run a masked inverse-mapping pass over `src`.
///
/// `sample` receives the mask offset `(x, y)` of a destination pixel that lies
/// inside the image and returns the value to write there, or `None` to keep
/// the source value.
pub(crate) fn remap<F>(
    src: &PixelBuffer,
    center_x: i64,
    center_y: i64,
    radius: i64,
    strategy: ExecutionStrategy,
    sample: F,
) -> Remapped
where
    F: Fn(i64, i64) -> Option<[u8; CHANNELS]> + Sync,
{
    let mut pixels = src.as_bytes().to_vec();

    if radius <= 0 || src.is_empty() {
        return Remapped {
            pixels,
            rewritten: 0,
        };
    }

    let width = i64::from(src.width());
    // Clip the mask's column range to the image once; it is the same for every row.
    let x_start = (-radius).max(-center_x);
    let x_end = radius.min(width - center_x);

    let process_row = |(row, dst_row): (usize, &mut [u8])| -> usize {
        let y = row as i64 - center_y;
        if y < -radius || y >= radius {
            return 0;
        }

        let mut rewritten = 0;
        for x in x_start..x_end {
            if let Some(px) = sample(x, y) {
                let idx = (center_x + x) as usize * CHANNELS;
                dst_row[idx..idx + CHANNELS].copy_from_slice(&px);
                rewritten += 1;
            }
        }
        rewritten
    };

    let stride = src.row_stride();
    let rewritten: usize = match strategy {
        ExecutionStrategy::Serial => pixels
            .chunks_exact_mut(stride)
            .enumerate()
            .map(process_row)
            .sum(),
        ExecutionStrategy::ParallelRows => pixels
            .par_chunks_exact_mut(stride)
            .enumerate()
            .map(process_row)
            .sum(),
    };

    Remapped { pixels, rewritten }
}
