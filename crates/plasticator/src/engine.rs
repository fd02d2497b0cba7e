//! The distortion engine: an owned pixel buffer plus the transform surface.
//!
//! Each transform reads the current buffer, builds a complete replacement and
//! only then swaps it in. Transforms therefore compose (a swirl after a lens
//! twists the lensed image), and a failed call leaves the buffer untouched.

use crate::distort::{
    apply_lens, apply_swirl, Distortion, ExecutionStrategy, LensParams, LensSampling, SwirlParams,
};
use crate::types::{DistortError, PixelBuffer};

/// Lens and swirl transforms over an owned RGBA image.
pub trait Plastic {
    /// Image width in pixels.
    fn width(&self) -> u32;

    /// Image height in pixels.
    fn height(&self) -> u32;

    /// Apply a lens distortion centered at `(center_x, center_y)`.
    ///
    /// `effect_intensity` must be in `1..=100`; anything else fails with
    /// [`DistortError::InvalidParameter`] and leaves the image unchanged.
    fn lens(
        &mut self,
        center_x: i32,
        center_y: i32,
        radius: i32,
        effect_intensity: i32,
    ) -> Result<(), DistortError>;

    /// Apply a swirl distortion centered at `(center_x, center_y)`.
    ///
    /// The sign of `step` selects the twist direction.
    fn swirl(
        &mut self,
        center_x: i32,
        center_y: i32,
        radius: i32,
        step: i32,
    ) -> Result<(), DistortError>;

    /// The current (most recently transformed) image.
    fn image(&self) -> &PixelBuffer;
}

/// Owns a private copy of an image and applies distortions to it.
#[derive(Debug, Clone)]
pub struct DistortionEngine {
    buffer: PixelBuffer,
    strategy: ExecutionStrategy,
    lens_sampling: LensSampling,
}

impl DistortionEngine {
    /// Create an engine holding a deep copy of `image`.
    pub fn new(image: &PixelBuffer) -> Self {
        Self::from_buffer(image.clone())
    }

    /// Create an engine that takes ownership of `buffer`.
    pub fn from_buffer(buffer: PixelBuffer) -> Self {
        Self {
            buffer,
            strategy: ExecutionStrategy::default(),
            lens_sampling: LensSampling::default(),
        }
    }

    /// Create an engine from a raw interleaved RGBA slice.
    pub fn from_raw(width: u32, height: u32, pixels: &[u8]) -> Result<Self, DistortError> {
        PixelBuffer::from_raw(width, height, pixels).map(Self::from_buffer)
    }

    /// Create an engine holding a deep copy of an `image::RgbaImage`.
    pub fn from_rgba_image(img: &image::RgbaImage) -> Self {
        Self::from_buffer(PixelBuffer::from_rgba_image(img))
    }

    /// Create an engine from any `image::DynamicImage`, converting it to RGBA8.
    pub fn from_dynamic_image(img: &image::DynamicImage) -> Self {
        Self::from_buffer(PixelBuffer::from_rgba_image(&img.to_rgba8()))
    }

    /// Use the given execution strategy for subsequent transforms.
    pub fn with_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Use the given sampling for [`Plastic::lens`] calls.
    pub fn with_lens_sampling(mut self, sampling: LensSampling) -> Self {
        self.lens_sampling = sampling;
        self
    }

    /// How distortion passes are executed.
    pub fn strategy(&self) -> ExecutionStrategy {
        self.strategy
    }

    /// Sampling used by [`Plastic::lens`].
    pub fn lens_sampling(&self) -> LensSampling {
        self.lens_sampling
    }

    /// The current pixel data.
    pub fn pixels(&self) -> &[u8] {
        self.buffer.as_bytes()
    }

    /// Copy the current image into an `image::RgbaImage`, e.g. for encoding.
    pub fn to_rgba_image(&self) -> image::RgbaImage {
        self.buffer.to_rgba_image()
    }

    /// Consume the engine and hand back the current image.
    pub fn into_buffer(self) -> PixelBuffer {
        self.buffer
    }

    /// Consume the engine and convert the current image to an `image::RgbaImage`.
    pub fn into_rgba_image(self) -> image::RgbaImage {
        self.buffer.into_rgba_image()
    }

    /// Apply a single distortion step.
    pub fn apply(&mut self, op: &Distortion) -> Result<(), DistortError> {
        let next = match op {
            Distortion::Lens(params) => apply_lens(&self.buffer, params, self.strategy)?,
            Distortion::Swirl(params) => apply_swirl(&self.buffer, params, self.strategy),
        };
        self.buffer = next;
        Ok(())
    }

    /// Apply distortion steps in order, stopping at the first failure.
    ///
    /// On failure the image reflects every step before the failing one.
    pub fn apply_all(&mut self, ops: &[Distortion]) -> Result<(), DistortError> {
        for (i, op) in ops.iter().enumerate() {
            if let Err(err) = self.apply(op) {
                log::warn!("recipe stopped at step {} of {}: {}", i + 1, ops.len(), err);
                return Err(err);
            }
        }
        Ok(())
    }
}

impl Plastic for DistortionEngine {
    fn width(&self) -> u32 {
        self.buffer.width()
    }

    fn height(&self) -> u32 {
        self.buffer.height()
    }

    fn lens(
        &mut self,
        center_x: i32,
        center_y: i32,
        radius: i32,
        effect_intensity: i32,
    ) -> Result<(), DistortError> {
        let params = LensParams::new(center_x, center_y, radius, effect_intensity)
            .with_sampling(self.lens_sampling);
        self.apply(&Distortion::Lens(params))
    }

    fn swirl(
        &mut self,
        center_x: i32,
        center_y: i32,
        radius: i32,
        step: i32,
    ) -> Result<(), DistortError> {
        self.apply(&Distortion::Swirl(SwirlParams::new(
            center_x, center_y, radius, step,
        )))
    }

    fn image(&self) -> &PixelBuffer {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    const BACKGROUND: Rgba<u8> = Rgba([0, 0, 255, 255]);
    const LINE: Rgba<u8> = Rgba([0, 255, 255, 255]);

    /// 201x131 blue image with a cyan grid line every 10 pixels.
    fn grid_image() -> RgbaImage {
        RgbaImage::from_fn(201, 131, |x, y| {
            if x % 10 == 0 || y % 10 == 0 {
                LINE
            } else {
                BACKGROUND
            }
        })
    }

    #[test]
    fn test_construction_copies_dimensions() {
        let engine = DistortionEngine::from_rgba_image(&grid_image());

        assert_eq!(engine.width(), 201);
        assert_eq!(engine.height(), 131);
        assert_eq!(engine.pixels().len(), 201 * 131 * 4);
        assert_eq!(engine.strategy(), ExecutionStrategy::Serial);
        assert_eq!(engine.lens_sampling(), LensSampling::Bilinear);
    }

    #[test]
    fn test_construction_is_independent_of_source() {
        let mut img = grid_image();
        let engine = DistortionEngine::from_rgba_image(&img);

        img.put_pixel(5, 5, Rgba([1, 2, 3, 4]));
        assert_eq!(engine.image().pixel(5, 5), Some([0, 0, 255, 255]));

        let mut raw = img.into_raw();
        let engine = DistortionEngine::from_raw(201, 131, &raw).unwrap();
        raw[0] = 42;
        assert_ne!(engine.pixels()[0], 42);
    }

    #[test]
    fn test_new_copies_buffer() {
        let buffer = PixelBuffer::from_rgba_image(&grid_image());
        let mut engine = DistortionEngine::new(&buffer);

        engine.swirl(100, 65, 65, 10).unwrap();
        assert_ne!(engine.image(), &buffer);
        assert_eq!(buffer, PixelBuffer::from_rgba_image(&grid_image()));

        let out = engine.into_buffer();
        assert_eq!(out.width(), buffer.width());
        assert_eq!(out.height(), buffer.height());
    }

    #[test]
    fn test_from_raw_rejects_bad_length() {
        let err = DistortionEngine::from_raw(10, 10, &[0u8; 10]).unwrap_err();
        assert_eq!(
            err,
            DistortError::BufferSizeMismatch {
                expected: 400,
                actual: 10
            }
        );
    }

    #[test]
    fn test_from_dynamic_image_converts_to_rgba() {
        let rgb = image::RgbImage::from_pixel(3, 2, image::Rgb([10, 20, 30]));
        let engine = DistortionEngine::from_dynamic_image(&image::DynamicImage::ImageRgb8(rgb));

        assert_eq!(engine.width(), 3);
        assert_eq!(engine.height(), 2);
        assert_eq!(engine.image().pixel(2, 1), Some([10, 20, 30, 255]));
    }

    #[test]
    fn test_lens_rejects_invalid_intensity() {
        let img = grid_image();
        for intensity in [0, 101, -5, 200] {
            let mut engine = DistortionEngine::from_rgba_image(&img);
            let (w, h) = (engine.width() as i32, engine.height() as i32);

            let err = engine.lens(w / 2, h / 2, h / 2, intensity).unwrap_err();
            assert!(matches!(err, DistortError::InvalidParameter { .. }));
            assert_eq!(engine.pixels(), img.as_raw().as_slice());
        }
    }

    #[test]
    fn test_lens_all_valid_intensities() {
        let img = grid_image();
        for intensity in 1..=100 {
            let mut engine = DistortionEngine::from_rgba_image(&img);
            let (w, h) = (engine.width() as i32, engine.height() as i32);

            engine.lens(w / 2, h / 2, h / 2, intensity).unwrap();
            assert_eq!(engine.pixels().len(), 201 * 131 * 4);
        }
    }

    #[test]
    fn test_lens_end_to_end() {
        let img = grid_image();
        let mut engine = DistortionEngine::from_rgba_image(&img);

        engine.lens(100, 65, 65, 50).unwrap();

        assert_eq!(engine.image().byte_size(), 201 * 131 * 4);
        assert_ne!(engine.pixels(), img.as_raw().as_slice());
        // Corners lie outside the mask
        assert_eq!(engine.image().pixel(0, 0), Some(LINE.0));
        assert_eq!(engine.image().pixel(199, 129), Some(BACKGROUND.0));
    }

    #[test]
    fn test_swirl_end_to_end() {
        let img = grid_image();
        for step in -10..=10 {
            let mut engine = DistortionEngine::from_rgba_image(&img);
            let (w, h) = (engine.width() as i32, engine.height() as i32);

            engine.swirl(w / 2, h / 2, h / 2, step).unwrap();
            assert_eq!(engine.pixels().len(), 201 * 131 * 4);
        }

        let mut cw = DistortionEngine::from_rgba_image(&img);
        let mut ccw = DistortionEngine::from_rgba_image(&img);
        cw.swirl(100, 65, 65, 10).unwrap();
        ccw.swirl(100, 65, 65, -10).unwrap();
        assert_ne!(cw.pixels(), ccw.pixels());
    }

    #[test]
    fn test_transforms_compose() {
        let img = grid_image();

        let mut engine = DistortionEngine::from_rgba_image(&img);
        engine.lens(100, 65, 65, 50).unwrap();
        let lensed = engine.image().clone();
        engine.swirl(100, 65, 65, 10).unwrap();

        let expected = apply_swirl(
            &lensed,
            &SwirlParams::new(100, 65, 65, 10),
            ExecutionStrategy::Serial,
        );
        assert_eq!(engine.image(), &expected);
    }

    #[test]
    fn test_failed_lens_keeps_previous_transform() {
        let mut engine = DistortionEngine::from_rgba_image(&grid_image());
        engine.swirl(100, 65, 65, 10).unwrap();
        let swirled = engine.image().clone();

        assert!(engine.lens(100, 65, 65, 0).is_err());
        assert_eq!(engine.image(), &swirled);
    }

    #[test]
    fn test_apply_all_stops_at_first_error() {
        let img = grid_image();
        let recipe = [
            Distortion::Swirl(SwirlParams::new(100, 65, 65, 10)),
            Distortion::Lens(LensParams::new(100, 65, 65, 500)),
            Distortion::Swirl(SwirlParams::new(100, 65, 65, -10)),
        ];

        let mut engine = DistortionEngine::from_rgba_image(&img);
        assert!(engine.apply_all(&recipe).is_err());

        let mut expected = DistortionEngine::from_rgba_image(&img);
        expected.apply(&recipe[0]).unwrap();
        assert_eq!(engine.image(), expected.image());
    }

    #[test]
    fn test_apply_all_from_json_recipe() {
        let json = r#"[
            {"type": "lens", "center_x": 100, "center_y": 65, "radius": 65, "intensity": 50},
            {"type": "swirl", "center_x": 100, "center_y": 65, "radius": 65, "step": -10}
        ]"#;
        let recipe: Vec<Distortion> = serde_json::from_str(json).unwrap();

        let mut from_recipe = DistortionEngine::from_rgba_image(&grid_image());
        from_recipe.apply_all(&recipe).unwrap();

        let mut direct = DistortionEngine::from_rgba_image(&grid_image());
        direct.lens(100, 65, 65, 50).unwrap();
        direct.swirl(100, 65, 65, -10).unwrap();

        assert_eq!(from_recipe.image(), direct.image());
    }

    #[test]
    fn test_parallel_engine_matches_serial() {
        let img = grid_image();

        let mut serial = DistortionEngine::from_rgba_image(&img);
        let mut parallel =
            DistortionEngine::from_rgba_image(&img).with_strategy(ExecutionStrategy::ParallelRows);

        for engine in [&mut serial, &mut parallel] {
            engine.lens(100, 65, 65, 50).unwrap();
            engine.swirl(60, 40, 50, 7).unwrap();
        }
        assert_eq!(serial.image(), parallel.image());
    }

    #[test]
    fn test_floor_sampling_engine() {
        let img = grid_image();
        let mut engine =
            DistortionEngine::from_rgba_image(&img).with_lens_sampling(LensSampling::Floor);
        engine.lens(100, 65, 65, 50).unwrap();

        // Floor sampling only ever copies source pixels
        for px in engine.pixels().chunks_exact(4) {
            assert!(px == LINE.0 || px == BACKGROUND.0);
        }
    }

    #[test]
    fn test_into_rgba_image() {
        let img = grid_image();
        let mut engine = DistortionEngine::from_rgba_image(&img);
        engine.swirl(100, 65, 65, 3).unwrap();

        let copy = engine.to_rgba_image();
        let owned = engine.into_rgba_image();
        assert_eq!(copy, owned);
        assert_eq!(owned.dimensions(), (201, 131));
    }

    #[test]
    fn test_trait_object() {
        let mut engine: Box<dyn Plastic> =
            Box::new(DistortionEngine::from_rgba_image(&grid_image()));

        engine.lens(100, 65, 65, 50).unwrap();
        engine.swirl(100, 65, 65, 10).unwrap();
        assert_eq!(engine.image().byte_size(), 201 * 131 * 4);
    }
}
