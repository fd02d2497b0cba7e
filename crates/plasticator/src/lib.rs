//! Plasticator - lens and swirl distortions for RGBA images
//!
//! This crate applies nonlinear pixel-remapping filters to an in-memory RGBA
//! buffer: a lens (bulge/pinch) and a swirl (vortex), both restricted to a
//! circular region around an arbitrary center.
//!
//! # Usage
//!
//! ```ignore
//! use plasticator::{DistortionEngine, Plastic};
//!
//! let mut engine = DistortionEngine::from_rgba_image(&img);
//! engine.lens(100, 65, 65, 50)?;
//! engine.swirl(100, 65, 65, 10)?;
//! let out = engine.into_rgba_image();
//! ```
//!
//! Decoding and encoding are left to the caller; the `image` crate types are
//! accepted and produced directly.

pub mod distort;
pub mod engine;
pub mod types;

pub use distort::{
    apply_lens, apply_swirl, Distortion, ExecutionStrategy, LensParams, LensSampling, SwirlParams,
};
pub use engine::{DistortionEngine, Plastic};
pub use types::{DistortError, PixelBuffer, CHANNELS};
