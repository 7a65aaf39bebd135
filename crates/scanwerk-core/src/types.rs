// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Scanwerk decode pipeline.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::OutputFormat;
use crate::error::{FailureClass, Result, ScanwerkError};

/// Bytes per RGBA pixel.
pub const CHANNELS: usize = 4;

/// Unique identifier for a single top-level decode request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// -- Pixel buffer ------------------------------------------------------------

/// An RGBA, row-major, top-to-bottom pixel buffer.
///
/// `pixels.len() == width * height * 4` holds for the whole lifetime of the
/// value: the dimensions are private and only change through constructors,
/// so any transform that resizes must allocate a new buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw RGBA bytes, validating dimensions and length.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = byte_len(width, height)?;
        if pixels.len() != expected {
            return Err(ScanwerkError::InvalidBuffer(format!(
                "{}x{} buffer needs {} bytes, got {}",
                width,
                height,
                expected,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Allocate a buffer with every pixel set to `rgba`.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self> {
        let len = byte_len(width, height)?;
        let mut pixels = Vec::with_capacity(len);
        for _ in 0..len / CHANNELS {
            pixels.extend_from_slice(&rgba);
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Borrow the raw RGBA bytes.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Mutable access to the RGBA bytes. The slice length is fixed, so the
    /// length invariant cannot be broken through it.
    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Consume the buffer and return its bytes.
    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// The region covering the whole buffer.
    pub fn bounds(&self) -> Region {
        Region::new(0, 0, self.width, self.height)
    }

    /// Read the pixel at (x, y). Panics when out of bounds, like slice indexing.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.offset(x, y);
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }

    /// Write the pixel at (x, y). Panics when out of bounds, like slice indexing.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let i = self.offset(x, y);
        self.pixels[i..i + CHANNELS].copy_from_slice(&rgba);
    }

    /// Paint every pixel of `region` with `rgba`.
    pub fn fill_region(&mut self, region: &Region, rgba: [u8; 4]) -> Result<()> {
        self.check_region(region)?;
        for y in region.y..region.bottom() {
            for x in region.x..region.right() {
                self.set_pixel(x, y, rgba);
            }
        }
        Ok(())
    }

    /// Copy the pixels of `region` into a new, independent buffer.
    pub fn crop(&self, region: &Region) -> Result<PixelBuffer> {
        self.check_region(region)?;
        if region.width == 0 || region.height == 0 {
            return Err(ScanwerkError::InvalidBuffer(format!(
                "cannot crop empty region {}",
                region
            )));
        }
        let row_bytes = region.width as usize * CHANNELS;
        let mut pixels = Vec::with_capacity(row_bytes * region.height as usize);
        for y in region.y..region.bottom() {
            let start = self.offset(region.x, y);
            pixels.extend_from_slice(&self.pixels[start..start + row_bytes]);
        }
        PixelBuffer::new(region.width, region.height, pixels)
    }

    fn check_region(&self, region: &Region) -> Result<()> {
        if region.fits_within(self.width, self.height) {
            Ok(())
        } else {
            Err(ScanwerkError::RegionOutOfBounds {
                region: region.to_string(),
                width: self.width,
                height: self.height,
            })
        }
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) outside {}x{} buffer",
            self.width,
            self.height
        );
        (y as usize * self.width as usize + x as usize) * CHANNELS
    }
}

fn byte_len(width: u32, height: u32) -> Result<usize> {
    if width == 0 || height == 0 {
        return Err(ScanwerkError::InvalidBuffer(format!(
            "dimensions must be positive, got {}x{}",
            width, height
        )));
    }
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(CHANNELS))
        .ok_or_else(|| {
            ScanwerkError::InvalidBuffer(format!("{}x{} buffer overflows usize", width, height))
        })
}

// -- Regions and search nodes --------------------------------------------------

/// A rectangle in pixel coordinates. Describes pixels, never owns them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Whether the region lies entirely inside a `width` x `height` parent.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x
            .checked_add(self.width)
            .is_some_and(|right| right <= width)
            && self
                .y
                .checked_add(self.height)
                .is_some_and(|bottom| bottom <= height)
    }

    /// Whether `other` lies entirely inside this region.
    pub fn contains(&self, other: &Region) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Split into four disjoint quadrants: top-left, top-right, bottom-left,
    /// bottom-right. Halves use floor division; an odd remainder row or
    /// column goes to the second half.
    pub fn quadrants(&self) -> [Region; 4] {
        let left_w = self.width / 2;
        let right_w = self.width - left_w;
        let top_h = self.height / 2;
        let bottom_h = self.height - top_h;
        let mid_x = self.x + left_w;
        let mid_y = self.y + top_h;
        [
            Region::new(self.x, self.y, left_w, top_h),
            Region::new(mid_x, self.y, right_w, top_h),
            Region::new(self.x, mid_y, left_w, bottom_h),
            Region::new(mid_x, mid_y, right_w, bottom_h),
        ]
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// One node of the recursive quadrant search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchNode {
    pub region: Region,
    pub depth: u32,
}

impl SearchNode {
    /// The depth-0 node covering `region`.
    pub fn root(region: Region) -> Self {
        Self { region, depth: 0 }
    }

    /// The four child nodes, in search order.
    pub fn children(&self) -> [SearchNode; 4] {
        self.region.quadrants().map(|region| SearchNode {
            region,
            depth: self.depth + 1,
        })
    }
}

// -- Encoded images ---------------------------------------------------------------

/// An enhanced buffer serialised for the decode capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub format: OutputFormat,
    pub bytes: Vec<u8>,
}

// -- Documents --------------------------------------------------------------------

/// Supported input document types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentType {
    Pdf,
    Jpeg,
    Png,
    Tiff,
    Bmp,
    Gif,
    Webp,
}

impl DocumentType {
    /// Canonical MIME type string.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Tiff => "image/tiff",
            Self::Bmp => "image/bmp",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
        }
    }

    /// Parse a MIME type or `Content-Type` header value. Parameters such as
    /// `; charset=binary` are ignored.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim();
        match essence.to_ascii_lowercase().as_str() {
            "application/pdf" | "application/x-pdf" => Some(Self::Pdf),
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/tiff" => Some(Self::Tiff),
            "image/bmp" | "image/x-ms-bmp" => Some(Self::Bmp),
            "image/gif" => Some(Self::Gif),
            "image/webp" => Some(Self::Webp),
            _ => None,
        }
    }

    /// Infer document type from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "tif" | "tiff" => Some(Self::Tiff),
            "bmp" => Some(Self::Bmp),
            "gif" => Some(Self::Gif),
            "webp" => Some(Self::Webp),
            _ => None,
        }
    }

    /// Guess the type from leading magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"%PDF-") {
            Some(Self::Pdf)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(Self::Png)
        } else if bytes.starts_with(b"II*\0") || bytes.starts_with(b"MM\0*") {
            Some(Self::Tiff)
        } else if bytes.starts_with(b"BM") {
            Some(Self::Bmp)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(Self::Gif)
        } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(Self::Webp)
        } else {
            None
        }
    }

    /// Everything except PDF is already a raster image.
    pub fn is_raster(&self) -> bool {
        !matches!(self, Self::Pdf)
    }
}

/// What the caller hands to the orchestrator.
#[derive(Debug, Clone)]
pub enum DocumentSource {
    /// An uploaded file with its declared MIME type.
    File { bytes: Vec<u8>, mime_type: String },
    /// A remote document to fetch.
    Url { href: String },
    /// An already-acquired frame, e.g. from a camera stream.
    Frame { buffer: PixelBuffer },
}

impl DocumentSource {
    /// Short label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::File { .. } => "file",
            Self::Url { .. } => "url",
            Self::Frame { .. } => "frame",
        }
    }
}

// -- Outcome ----------------------------------------------------------------------

/// The single result reported for a top-level decode request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecodeOutcome {
    /// A code was found and decoded.
    Decoded { payload: String },
    /// The source could not be turned into pixels.
    AcquisitionFailed { cause: String },
    /// The whole search tree was exhausted without a decode.
    NoCodeFound,
    /// Enhancement, encoding or the decoder itself broke.
    DecoderFault { cause: String },
}

impl DecodeOutcome {
    /// Build the terminal failure an error maps to.
    pub fn from_error(err: &ScanwerkError) -> Self {
        match err.failure_class() {
            FailureClass::Acquisition => Self::AcquisitionFailed {
                cause: err.to_string(),
            },
            FailureClass::Decoder => Self::DecoderFault {
                cause: err.to_string(),
            },
        }
    }

    /// The decoded payload, if any.
    pub fn payload(&self) -> Option<&str> {
        match self {
            Self::Decoded { payload } => Some(payload),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Decoded { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_buffer_rejects_wrong_length() {
        let err = PixelBuffer::new(2, 2, vec![0; 15]).unwrap_err();
        assert!(matches!(err, ScanwerkError::InvalidBuffer(_)));
        assert!(PixelBuffer::new(2, 2, vec![0; 16]).is_ok());
    }

    #[test]
    fn pixel_buffer_rejects_zero_dimensions() {
        assert!(PixelBuffer::filled(0, 10, [0, 0, 0, 255]).is_err());
        assert!(PixelBuffer::new(10, 0, Vec::new()).is_err());
    }

    #[test]
    fn crop_copies_exact_region() {
        let mut buffer = PixelBuffer::filled(4, 4, [255, 255, 255, 255]).unwrap();
        buffer.set_pixel(2, 1, [1, 2, 3, 255]);
        let crop = buffer.crop(&Region::new(2, 1, 2, 3)).unwrap();
        assert_eq!((crop.width(), crop.height()), (2, 3));
        assert_eq!(crop.pixel(0, 0), [1, 2, 3, 255]);
        assert_eq!(crop.pixel(1, 2), [255, 255, 255, 255]);
        assert_eq!(crop.pixels().len(), 2 * 3 * 4);
    }

    #[test]
    fn crop_out_of_bounds_is_rejected() {
        let buffer = PixelBuffer::filled(10, 10, [0, 0, 0, 255]).unwrap();
        let err = buffer.crop(&Region::new(5, 5, 6, 5)).unwrap_err();
        assert!(matches!(err, ScanwerkError::RegionOutOfBounds { .. }));
    }

    #[test]
    fn quadrants_of_odd_region_give_remainder_to_second_half() {
        let q = Region::new(10, 20, 101, 51).quadrants();
        assert_eq!(q[0], Region::new(10, 20, 50, 25));
        assert_eq!(q[1], Region::new(60, 20, 51, 25));
        assert_eq!(q[2], Region::new(10, 45, 50, 26));
        assert_eq!(q[3], Region::new(60, 45, 51, 26));
        let total: u64 = q.iter().map(Region::area).sum();
        assert_eq!(total, 101 * 51);
    }

    #[test]
    fn quadrants_stay_inside_parent() {
        let parent = Region::new(3, 7, 99, 100);
        for child in parent.quadrants() {
            assert!(parent.contains(&child), "{child} escapes {parent}");
        }
    }

    #[test]
    fn children_increase_depth() {
        let root = SearchNode::root(Region::new(0, 0, 200, 200));
        for child in root.children() {
            assert_eq!(child.depth, 1);
            assert_eq!(child.region.width, 100);
        }
    }

    #[test]
    fn mime_parsing_ignores_parameters() {
        assert_eq!(
            DocumentType::from_mime("application/pdf; charset=binary"),
            Some(DocumentType::Pdf)
        );
        assert_eq!(DocumentType::from_mime("IMAGE/PNG"), Some(DocumentType::Png));
        assert_eq!(DocumentType::from_mime("text/html"), None);
    }

    #[test]
    fn sniff_recognises_common_signatures() {
        assert_eq!(DocumentType::sniff(b"%PDF-1.7\n"), Some(DocumentType::Pdf));
        assert_eq!(
            DocumentType::sniff(&[0xFF, 0xD8, 0xFF, 0xE0]),
            Some(DocumentType::Jpeg)
        );
        assert_eq!(DocumentType::sniff(b"RIFF\0\0\0\0WEBPVP8 "), Some(DocumentType::Webp));
        assert_eq!(DocumentType::sniff(b"hello"), None);
    }

    #[test]
    fn outcome_from_error_follows_failure_class() {
        let acquisition = DecodeOutcome::from_error(&ScanwerkError::EmptyDocument);
        assert!(matches!(acquisition, DecodeOutcome::AcquisitionFailed { .. }));
        let fault = DecodeOutcome::from_error(&ScanwerkError::Decoder("boom".into()));
        assert_eq!(
            fault,
            DecodeOutcome::DecoderFault {
                cause: "decoder fault: boom".into()
            }
        );
    }

    #[test]
    fn outcome_serialises_with_kind_tag() {
        let json = serde_json::to_string(&DecodeOutcome::Decoded {
            payload: "INV-42".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"kind":"decoded","payload":"INV-42"}"#);
    }
}
