// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor — raster decoding, conversion to and from `PixelBuffer`,
// aspect-preserving rescaling and encoding for the decode capability.
// Operates on in-memory images using the `image` crate.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, RgbaImage};
use scanwerk_core::config::OutputFormat;
use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::types::{EncodedImage, PixelBuffer};
use tracing::{debug, instrument};

/// Image pipeline operating on a single in-memory image.
///
/// Each transformation consumes `self` and returns a new `ImageProcessor`,
/// enabling method chaining:
///
/// ```ignore
/// let encoded = ImageProcessor::from_bytes(&upload)?
///     .fit_within(2000)
///     .encode(OutputFormat::Png, 1.0)?;
/// ```
pub struct ImageProcessor {
    /// The current working image.
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Decode raw encoded bytes (JPEG, PNG, TIFF, ...).
    ///
    /// Undecodable input is a `CorruptImage` error: the source never became
    /// pixels.
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(data)
            .map_err(|err| ScanwerkError::CorruptImage(err.to_string()))?;
        debug!(
            width = img.width(),
            height = img.height(),
            "Image decoded from bytes"
        );
        Ok(Self { image: img })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    /// Take ownership of a pixel buffer without copying.
    pub fn from_pixel_buffer(buffer: PixelBuffer) -> Result<Self> {
        let (width, height) = (buffer.width(), buffer.height());
        let rgba = RgbaImage::from_raw(width, height, buffer.into_pixels()).ok_or_else(|| {
            ScanwerkError::InvalidBuffer(format!("{}x{} buffer has wrong length", width, height))
        })?;
        Ok(Self {
            image: DynamicImage::ImageRgba8(rgba),
        })
    }

    // -- Accessors ------------------------------------------------------------

    /// Current image width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Current image height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Consume the processor and return the underlying `DynamicImage`.
    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    /// Consume the processor and return an RGBA pixel buffer.
    pub fn into_pixel_buffer(self) -> Result<PixelBuffer> {
        let rgba = self.image.into_rgba8();
        let (width, height) = rgba.dimensions();
        PixelBuffer::new(width, height, rgba.into_raw())
    }

    // -- Transformations (consume self, return new Self) -----------------------

    /// Scale down so the larger side equals `max_dimension`, preserving
    /// aspect ratio. Images already within the limit are returned untouched;
    /// this never upscales.
    #[instrument(skip(self), fields(max_dimension))]
    pub fn fit_within(self, max_dimension: u32) -> Self {
        let (w, h) = (self.image.width(), self.image.height());
        if w.max(h) <= max_dimension {
            return self;
        }
        let resized = self
            .image
            .resize(max_dimension, max_dimension, FilterType::Lanczos3);
        debug!(
            from_w = w,
            from_h = h,
            new_w = resized.width(),
            new_h = resized.height(),
            "Downscaled to fit"
        );
        Self { image: resized }
    }

    /// Resize to fit inside `width` x `height`, preserving aspect ratio. Scales
    /// up as well as down.
    pub fn resize_to_fit(self, width: u32, height: u32) -> Self {
        let (w, h) = (self.image.width(), self.image.height());
        if (w == width && h <= height) || (h == height && w <= width) {
            return self;
        }
        Self {
            image: self.image.resize(width, height, FilterType::Lanczos3),
        }
    }

    // -- Output ---------------------------------------------------------------

    /// Encode the image for the decode capability.
    ///
    /// `quality` is in [0, 1] and only affects JPEG.
    pub fn encode(&self, format: OutputFormat, quality: f32) -> Result<EncodedImage> {
        let bytes = match format {
            OutputFormat::Png => self.to_png_bytes()?,
            OutputFormat::Jpeg => self.to_jpeg_bytes(jpeg_quality(quality))?,
        };
        Ok(EncodedImage { format, bytes })
    }

    /// Encode the current image as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        self.image
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(|err| ScanwerkError::ImageError(format!("PNG encoding failed: {}", err)))?;
        Ok(buffer)
    }

    /// Encode the current image as JPEG bytes with the given quality (1-100).
    pub fn to_jpeg_bytes(&self, quality: u8) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let rgb = self.image.to_rgb8();
        let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
        rgb.write_with_encoder(encoder)
            .map_err(|err| ScanwerkError::ImageError(format!("JPEG encoding failed: {}", err)))?;
        Ok(buffer)
    }
}

/// Map a [0, 1] quality onto the encoder's 1-100 scale.
fn jpeg_quality(quality: f32) -> u8 {
    (quality.clamp(0.0, 1.0) * 100.0).round().clamp(1.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(w: u32, h: u32) -> PixelBuffer {
        PixelBuffer::filled(w, h, [200, 100, 50, 255]).unwrap()
    }

    #[test]
    fn pixel_buffer_round_trip_keeps_pixels() {
        let mut original = buffer(3, 2);
        original.set_pixel(1, 1, [1, 2, 3, 4]);
        let back = ImageProcessor::from_pixel_buffer(original.clone())
            .unwrap()
            .into_pixel_buffer()
            .unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn fit_within_downscales_larger_side_only() {
        let out = ImageProcessor::from_pixel_buffer(buffer(400, 200))
            .unwrap()
            .fit_within(100);
        assert_eq!((out.width(), out.height()), (100, 50));
    }

    #[test]
    fn fit_within_never_upscales() {
        let out = ImageProcessor::from_pixel_buffer(buffer(40, 20))
            .unwrap()
            .fit_within(100);
        assert_eq!((out.width(), out.height()), (40, 20));
    }

    #[test]
    fn resize_to_fit_upscales_preserving_aspect() {
        let out = ImageProcessor::from_pixel_buffer(buffer(50, 100))
            .unwrap()
            .resize_to_fit(300, 300);
        assert_eq!((out.width(), out.height()), (150, 300));
    }

    #[test]
    fn encoded_png_decodes_back() {
        let encoded = ImageProcessor::from_pixel_buffer(buffer(8, 8))
            .unwrap()
            .encode(OutputFormat::Png, 1.0)
            .unwrap();
        assert_eq!(encoded.format, OutputFormat::Png);
        let back = ImageProcessor::from_bytes(&encoded.bytes).unwrap();
        assert_eq!((back.width(), back.height()), (8, 8));
    }

    #[test]
    fn jpeg_quality_maps_to_encoder_range() {
        assert_eq!(jpeg_quality(0.0), 1);
        assert_eq!(jpeg_quality(0.92), 92);
        assert_eq!(jpeg_quality(3.0), 100);
    }

    #[test]
    fn garbage_bytes_are_corrupt_image() {
        assert!(matches!(
            ImageProcessor::from_bytes(b"nope"),
            Err(ScanwerkError::CorruptImage(_))
        ));
    }
}
