// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capability traits for the collaborators the decode pipeline treats as
// opaque: rasterization, network fetch and the code decoder itself.

use scanwerk_core::error::Result;
use scanwerk_core::types::{EncodedImage, PixelBuffer};

/// Opens paginated documents for rendering.
pub trait Rasterizer {
    /// Parse `document` and return a handle that renders its pages.
    fn open(&self, document: &[u8]) -> Result<Box<dyn RasterDocument>>;
}

/// A parsed, paginated document.
pub trait RasterDocument {
    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// Render page `page_index` (0-based) at `scale` into an RGBA buffer.
    ///
    /// Implementations must reject indices `>= page_count()` with
    /// `ScanwerkError::PageOutOfRange`.
    fn rasterize(&self, page_index: usize, scale: f32) -> Result<PixelBuffer>;
}

/// A fetched remote resource, status and content type included so the
/// caller can choose the acquisition path.
#[derive(Debug, Clone)]
pub struct FetchedResource {
    pub status: u16,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl FetchedResource {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Downloads remote documents.
pub trait Fetcher {
    /// Fetch `url`. Transport failures are errors; HTTP error statuses are
    /// returned as a resource so the caller decides what they mean.
    fn fetch(&self, url: &str) -> Result<FetchedResource>;
}

/// The single-shot code decoder.
///
/// Takes `&mut self`: a handle has at most one call in flight, and a caller
/// that wants concurrency creates one handle per request.
pub trait Decoder {
    /// Attempt to decode one code from an encoded image.
    ///
    /// RETURNS: `Ok(Some(payload))` on success, `Ok(None)` when no payload was
    /// found, and `Err` only when the decoder itself broke.
    fn decode(&mut self, image: &EncodedImage) -> Result<Option<String>>;
}

impl<D: Decoder + ?Sized> Decoder for &mut D {
    fn decode(&mut self, image: &EncodedImage) -> Result<Option<String>> {
        (**self).decode(image)
    }
}

impl<D: Decoder + ?Sized> Decoder for Box<D> {
    fn decode(&mut self, image: &EncodedImage) -> Result<Option<String>> {
        (**self).decode(image)
    }
}
