//! Core types: the RGBA pixel buffer and the error taxonomy.

use thiserror::Error;

/// Number of interleaved samples per pixel.
pub const CHANNELS: usize = 4;

/// Error types for distortion operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DistortError {
    /// A transform parameter is outside its accepted range.
    #[error("{name} must be in range {min}..={max}, got {value}")]
    InvalidParameter {
        name: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    /// A raw pixel slice does not match the declared dimensions.
    #[error("Pixel buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// The declared dimensions cannot be addressed on this platform.
    #[error("Image dimensions {width}x{height} overflow the addressable buffer size")]
    DimensionOverflow { width: u32, height: u32 },
}

/// An RGBA image stored as a flat interleaved buffer.
///
/// Pixel `(x, y)` occupies samples `[(y * width + x) * 4, +4)`. The channel
/// order is whatever the producer used; transforms move whole pixels and
/// interpolate each channel independently, so the order is preserved.
///
/// The length invariant `pixels.len() == width * height * 4` holds for the
/// lifetime of the value, which is why the fields are private.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl PixelBuffer {
    /// Create a buffer from owned pixel data, validating its length.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, DistortError> {
        let expected = Self::expected_len(width, height)?;
        if pixels.len() != expected {
            return Err(DistortError::BufferSizeMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Create a buffer by deep-copying a borrowed pixel slice.
    pub fn from_raw(width: u32, height: u32, pixels: &[u8]) -> Result<Self, DistortError> {
        Self::new(width, height, pixels.to_vec())
    }

    /// Create a buffer by deep-copying an `image::RgbaImage`.
    pub fn from_rgba_image(img: &image::RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            pixels: img.as_raw().clone(),
        }
    }

    /// Convert to an `image::RgbaImage`, e.g. for encoding.
    pub fn to_rgba_image(&self) -> image::RgbaImage {
        self.clone().into_rgba_image()
    }

    /// Consume the buffer and convert it to an `image::RgbaImage` without copying.
    pub fn into_rgba_image(self) -> image::RgbaImage {
        let (width, height) = (self.width, self.height);
        match image::RgbaImage::from_raw(width, height, self.pixels) {
            Some(img) => img,
            // Every constructor checks `pixels.len() == width * height * 4`
            None => unreachable!("pixel buffer of {width}x{height} has the wrong length"),
        }
    }

    /// Byte length required for the given dimensions.
    pub fn expected_len(width: u32, height: u32) -> Result<usize, DistortError> {
        (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(CHANNELS))
            .ok_or(DistortError::DimensionOverflow { width, height })
    }

    /// Image width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The interleaved samples in row-major order.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    /// Number of bytes in one row.
    #[inline]
    pub fn row_stride(&self) -> usize {
        self.width as usize * CHANNELS
    }

    /// Get the total number of pixels.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Get the size of the pixel buffer in bytes.
    pub fn byte_size(&self) -> usize {
        self.pixels.len()
    }

    /// Check if this is an empty image.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Check whether a real-valued position lies inside `[0, width) x [0, height)`.
    #[inline]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= 0.0 && x < f64::from(self.width) && y >= 0.0 && y < f64::from(self.height)
    }

    /// Byte offset of pixel `(x, y)`, or `None` when it lies outside the image.
    #[inline]
    pub fn offset(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return None;
        }
        Some((y as usize * self.width as usize + x as usize) * CHANNELS)
    }

    /// Read pixel `(x, y)`, or `None` when it lies outside the image.
    #[inline]
    pub fn pixel(&self, x: i64, y: i64) -> Option<[u8; CHANNELS]> {
        self.offset(x, y).map(|idx| self.texel(idx))
    }

    /// Read the pixel starting at byte offset `idx`.
    #[inline]
    pub(crate) fn texel(&self, idx: usize) -> [u8; CHANNELS] {
        let mut px = [0u8; CHANNELS];
        px.copy_from_slice(&self.pixels[idx..idx + CHANNELS]);
        px
    }

    /// A buffer of the same dimensions holding freshly built pixel data.
    pub(crate) fn with_pixels(&self, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(pixels.len(), self.pixels.len(), "Pixel buffer size mismatch");
        Self {
            width: self.width,
            height: self.height,
            pixels,
        }
    }
}
