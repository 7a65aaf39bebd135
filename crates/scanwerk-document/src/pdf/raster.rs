// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rasterizer for scanned PDFs: each page is rendered from its largest embedded
// raster image, scaled to the page's MediaBox at the requested scale.

use image::DynamicImage;
use scanwerk_bridge::{RasterDocument, Rasterizer};
use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::types::PixelBuffer;
use tracing::{debug, info, instrument, warn};

use crate::image::processor::ImageProcessor;
use crate::pdf::reader::PdfReader;

/// Scale 1.0 renders one pixel per point (72 DPI).
const MIN_SCALE: f32 = 1.0;
const MAX_SCALE: f32 = 8.0;

/// [`Rasterizer`] backed by lopdf image extraction.
///
/// Covers the documents the pipeline mostly sees (scanner output, phone
/// "scan to PDF", fax gateways), where every page is one big image. Hosts
/// with a vector renderer implement [`Rasterizer`] themselves.
#[derive(Debug, Clone)]
pub struct PdfRasterizer {
    max_raster_pixels: u64,
}

impl PdfRasterizer {
    pub fn new(max_raster_pixels: u64) -> Self {
        Self { max_raster_pixels }
    }
}

impl Default for PdfRasterizer {
    fn default() -> Self {
        Self::new(64_000_000)
    }
}

impl Rasterizer for PdfRasterizer {
    fn open(&self, document: &[u8]) -> Result<Box<dyn RasterDocument>> {
        let reader = PdfReader::from_bytes(document)?;
        Ok(Box::new(PdfRasterDocument {
            reader,
            max_raster_pixels: self.max_raster_pixels,
        }))
    }
}

struct PdfRasterDocument {
    reader: PdfReader,
    max_raster_pixels: u64,
}

impl RasterDocument for PdfRasterDocument {
    fn page_count(&self) -> usize {
        self.reader.page_count()
    }

    #[instrument(skip(self))]
    fn rasterize(&self, page_index: usize, scale: f32) -> Result<PixelBuffer> {
        let scale = clamp_scale(scale);
        let (page_w, page_h) = self.reader.page_size(page_index)?;

        let mut image = self.reader.largest_image(page_index, self.max_raster_pixels)?;
        let rotation = self.reader.page_rotation(page_index)?;
        image = rotate(image, rotation);

        // A rotated page swaps its displayed width and height.
        let (page_w, page_h) = if rotation % 180 == 0 {
            (page_w, page_h)
        } else {
            (page_h, page_w)
        };
        let target_w = (page_w * scale).round().max(1.0) as u32;
        let target_h = (page_h * scale).round().max(1.0) as u32;
        let target_pixels = target_w as u64 * target_h as u64;
        if target_pixels > self.max_raster_pixels {
            return Err(ScanwerkError::Rasterize(format!(
                "page {} at scale {} needs {} pixels, limit is {}",
                page_index, scale, target_pixels, self.max_raster_pixels
            )));
        }

        debug!(
            source_w = image.width(),
            source_h = image.height(),
            target_w,
            target_h,
            rotation,
            "Rendering page from embedded image"
        );
        let buffer = ImageProcessor::from_dynamic(image)
            .resize_to_fit(target_w, target_h)
            .into_pixel_buffer()?;
        info!(
            width = buffer.width(),
            height = buffer.height(),
            "Page rasterized"
        );
        Ok(buffer)
    }
}

fn clamp_scale(scale: f32) -> f32 {
    if !scale.is_finite() {
        warn!(scale, "Non-finite render scale, using minimum");
        return MIN_SCALE;
    }
    let clamped = scale.clamp(MIN_SCALE, MAX_SCALE);
    if clamped != scale {
        warn!(requested = scale, used = clamped, "Render scale clamped");
    }
    clamped
}

fn rotate(image: DynamicImage, degrees: i64) -> DynamicImage {
    match degrees {
        90 => image.rotate90(),
        180 => image.rotate180(),
        270 => image.rotate270(),
        _ => image,
    }
}
