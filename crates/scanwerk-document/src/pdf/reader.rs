// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader — open a document, inspect its page tree and pull embedded raster
// images out of page resources using the `lopdf` crate.

use image::{DynamicImage, GrayImage, ImageFormat, Luma, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use scanwerk_core::error::{Result, ScanwerkError};
use tracing::{debug, info, instrument, warn};

/// US Letter in points, used when a page carries no usable MediaBox.
const DEFAULT_PAGE_SIZE: (f32, f32) = (612.0, 792.0);

/// Bound on `/Parent` hops and nested form XObjects.
const MAX_TREE_DEPTH: usize = 32;
const MAX_FORM_DEPTH: usize = 3;

/// A raster image XObject referenced from a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbeddedImage {
    pub id: ObjectId,
    pub width: u32,
    pub height: u32,
}

impl EmbeddedImage {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Reads existing PDF files.
///
/// Wraps `lopdf::Document` and exposes the page-level queries the rasterizer
/// needs: page count, page geometry and embedded images.
pub struct PdfReader {
    /// The underlying lopdf document.
    document: Document,
    /// Page object ids in page order.
    pages: Vec<ObjectId>,
}

impl PdfReader {
    // -- Construction ---------------------------------------------------------

    /// Create a reader from raw PDF bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(ScanwerkError::EmptyDocument);
        }
        let document = Document::load_mem(data).map_err(|err| {
            ScanwerkError::PdfError(format!("failed to load PDF from memory: {}", err))
        })?;

        // get_pages is keyed by 1-indexed page number, already in order.
        let pages: Vec<ObjectId> = document.get_pages().into_values().collect();
        if pages.is_empty() {
            return Err(ScanwerkError::PdfError("document has no pages".to_string()));
        }

        info!(pages = pages.len(), "PDF loaded from bytes");
        Ok(Self { document, pages })
    }

    // -- Inspection -----------------------------------------------------------

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Page size in points (width, height), from the inherited MediaBox.
    pub fn page_size(&self, page_index: usize) -> Result<(f32, f32)> {
        let page_id = self.page_id(page_index)?;
        let media_box = match self.inherited(page_id, b"MediaBox") {
            Some(obj) => self.resolve(obj)?,
            None => {
                warn!(page_index, "Page has no MediaBox, assuming US Letter");
                return Ok(DEFAULT_PAGE_SIZE);
            }
        };
        let coords: Vec<f32> = match media_box.as_array() {
            Ok(items) => items.iter().filter_map(|o| o.as_float().ok()).collect(),
            Err(_) => Vec::new(),
        };
        if coords.len() != 4 {
            warn!(page_index, "Malformed MediaBox, assuming US Letter");
            return Ok(DEFAULT_PAGE_SIZE);
        }
        let width = (coords[2] - coords[0]).abs();
        let height = (coords[3] - coords[1]).abs();
        if width < 1.0 || height < 1.0 {
            return Err(ScanwerkError::PdfError(format!(
                "page {} has degenerate size {}x{}",
                page_index, width, height
            )));
        }
        Ok((width, height))
    }

    /// Clockwise page rotation in degrees, normalised to 0/90/180/270.
    pub fn page_rotation(&self, page_index: usize) -> Result<i64> {
        let page_id = self.page_id(page_index)?;
        let rotation = self
            .inherited(page_id, b"Rotate")
            .and_then(|obj| self.resolve(obj).ok())
            .and_then(|obj| obj.as_i64().ok())
            .unwrap_or(0);
        Ok(rotation.rem_euclid(360) / 90 * 90)
    }

    /// All raster image XObjects drawn by a page, including those nested in
    /// form XObjects.
    pub fn page_images(&self, page_index: usize) -> Result<Vec<EmbeddedImage>> {
        let page_id = self.page_id(page_index)?;
        let mut images = Vec::new();
        if let Some(resources) = self.inherited(page_id, b"Resources") {
            let resources = self.resolve(resources)?;
            if let Ok(dict) = resources.as_dict() {
                self.collect_images(dict, 0, &mut images);
            }
        }
        images.sort_by_key(|img| std::cmp::Reverse(img.area()));
        images.dedup_by_key(|img| img.id);
        Ok(images)
    }

    /// Decode the largest decodable image on a page.
    ///
    /// Images whose declared pixel count exceeds `max_pixels` are skipped.
    #[instrument(skip(self))]
    pub fn largest_image(&self, page_index: usize, max_pixels: u64) -> Result<DynamicImage> {
        let images = self.page_images(page_index)?;
        debug!(candidates = images.len(), "Embedded images found");

        let mut first_error = None;
        for embedded in images {
            if embedded.area() > max_pixels {
                warn!(
                    width = embedded.width,
                    height = embedded.height,
                    "Skipping oversized embedded image"
                );
                continue;
            }
            match self.decode_image(embedded) {
                Ok(image) => return Ok(image),
                Err(err) => {
                    warn!(%err, id = ?embedded.id, "Embedded image not decodable");
                    first_error.get_or_insert(err);
                }
            }
        }
        Err(first_error.unwrap_or_else(|| {
            ScanwerkError::Rasterize(format!(
                "page {} has no embedded raster image",
                page_index
            ))
        }))
    }

    // -- Image decoding -------------------------------------------------------

    fn decode_image(&self, embedded: EmbeddedImage) -> Result<DynamicImage> {
        let stream = self
            .document
            .get_object(embedded.id)
            .and_then(Object::as_stream)
            .map_err(|err| {
                ScanwerkError::PdfError(format!("cannot read image {:?}: {}", embedded.id, err))
            })?;

        let filters = filter_names(&stream.dict);
        match filters.as_slice() {
            [] => self.decode_samples(stream, embedded, &stream.content),
            [only] if only.as_slice() == b"DCTDecode" => {
                image::load_from_memory_with_format(&stream.content, ImageFormat::Jpeg).map_err(
                    |err| ScanwerkError::Rasterize(format!("embedded JPEG unreadable: {}", err)),
                )
            }
            [only] if only.as_slice() == b"FlateDecode" => {
                let data = stream.decompressed_content().map_err(|err| {
                    ScanwerkError::Rasterize(format!("cannot inflate image stream: {}", err))
                })?;
                self.decode_samples(stream, embedded, &data)
            }
            other => Err(ScanwerkError::Rasterize(format!(
                "unsupported image filter chain {}",
                other
                    .iter()
                    .map(|f| String::from_utf8_lossy(f).into_owned())
                    .collect::<Vec<_>>()
                    .join(" ")
            ))),
        }
    }

    /// Turn raw, unfiltered samples into an image.
    fn decode_samples(
        &self,
        stream: &Stream,
        embedded: EmbeddedImage,
        data: &[u8],
    ) -> Result<DynamicImage> {
        let (w, h) = (embedded.width as usize, embedded.height as usize);
        let is_mask = stream
            .dict
            .get(b"ImageMask")
            .and_then(Object::as_bool)
            .unwrap_or(false);
        let bits = if is_mask {
            1
        } else {
            self.dict_integer(&stream.dict, b"BitsPerComponent").unwrap_or(8)
        };
        let inverted = decode_is_inverted(&stream.dict);

        match bits {
            1 => {
                let row_bytes = w.div_ceil(8);
                ensure_len(data, row_bytes * h)?;
                let gray = GrayImage::from_fn(embedded.width, embedded.height, |x, y| {
                    let byte = data[y as usize * row_bytes + x as usize / 8];
                    let bit = (byte >> (7 - (x % 8))) & 1;
                    let white = (bit == 1) != inverted;
                    Luma([if white { 255 } else { 0 }])
                });
                Ok(DynamicImage::ImageLuma8(gray))
            }
            8 => {
                let components = self
                    .color_components(&stream.dict)
                    .unwrap_or_else(|| data.len() / (w * h).max(1));
                match components {
                    1 => {
                        ensure_len(data, w * h)?;
                        let mut samples = data[..w * h].to_vec();
                        if inverted {
                            samples.iter_mut().for_each(|s| *s = 255 - *s);
                        }
                        GrayImage::from_raw(embedded.width, embedded.height, samples)
                            .map(DynamicImage::ImageLuma8)
                            .ok_or_else(|| sample_error(embedded))
                    }
                    3 => {
                        ensure_len(data, w * h * 3)?;
                        RgbImage::from_raw(embedded.width, embedded.height, data[..w * h * 3].to_vec())
                            .map(DynamicImage::ImageRgb8)
                            .ok_or_else(|| sample_error(embedded))
                    }
                    4 => {
                        ensure_len(data, w * h * 4)?;
                        let rgb: Vec<u8> = data[..w * h * 4]
                            .chunks_exact(4)
                            .flat_map(|cmyk| cmyk_to_rgb([cmyk[0], cmyk[1], cmyk[2], cmyk[3]]))
                            .collect();
                        RgbImage::from_raw(embedded.width, embedded.height, rgb)
                            .map(DynamicImage::ImageRgb8)
                            .ok_or_else(|| sample_error(embedded))
                    }
                    n => Err(ScanwerkError::Rasterize(format!(
                        "unsupported colour component count {}",
                        n
                    ))),
                }
            }
            other => Err(ScanwerkError::Rasterize(format!(
                "unsupported BitsPerComponent {}",
                other
            ))),
        }
    }

    /// Number of colour components implied by `/ColorSpace`, when known.
    fn color_components(&self, dict: &Dictionary) -> Option<usize> {
        let space = self.resolve(dict.get(b"ColorSpace").ok()?).ok()?;
        let family = match space {
            Object::Name(name) => name.clone(),
            Object::Array(items) => items.first()?.as_name().ok()?.to_vec(),
            _ => return None,
        };
        match family.as_slice() {
            b"DeviceGray" | b"CalGray" | b"G" => Some(1),
            b"DeviceRGB" | b"CalRGB" | b"RGB" => Some(3),
            b"DeviceCMYK" | b"CMYK" => Some(4),
            b"ICCBased" => {
                let profile = self.resolve(space.as_array().ok()?.get(1)?).ok()?;
                let n = profile.as_stream().ok()?.dict.get(b"N").ok()?.as_i64().ok()?;
                usize::try_from(n).ok()
            }
            _ => None,
        }
    }

    // -- Helpers --------------------------------------------------------------

    fn page_id(&self, page_index: usize) -> Result<ObjectId> {
        self.pages
            .get(page_index)
            .copied()
            .ok_or(ScanwerkError::PageOutOfRange {
                index: page_index,
                count: self.pages.len(),
            })
    }

    /// Look up a page attribute, walking up `/Parent` for inheritable keys.
    fn inherited(&self, page_id: ObjectId, key: &[u8]) -> Option<&Object> {
        let mut current = self.document.get_dictionary(page_id).ok()?;
        for _ in 0..MAX_TREE_DEPTH {
            if let Ok(value) = current.get(key) {
                return Some(value);
            }
            let parent = match current.get(b"Parent") {
                Ok(Object::Reference(id)) => *id,
                _ => return None,
            };
            current = self.document.get_dictionary(parent).ok()?;
        }
        None
    }

    /// Follow indirect references to the underlying object.
    fn resolve<'a>(&'a self, object: &'a Object) -> Result<&'a Object> {
        let mut current = object;
        for _ in 0..MAX_TREE_DEPTH {
            match current {
                Object::Reference(id) => {
                    current = self.document.get_object(*id).map_err(|err| {
                        ScanwerkError::PdfError(format!("dangling reference {:?}: {}", id, err))
                    })?;
                }
                other => return Ok(other),
            }
        }
        Err(ScanwerkError::PdfError("reference chain too deep".to_string()))
    }

    fn dict_integer(&self, dict: &Dictionary, key: &[u8]) -> Option<i64> {
        self.resolve(dict.get(key).ok()?).ok()?.as_i64().ok()
    }

    fn collect_images(&self, resources: &Dictionary, depth: usize, out: &mut Vec<EmbeddedImage>) {
        let xobjects = match resources
            .get(b"XObject")
            .ok()
            .and_then(|obj| self.resolve(obj).ok())
            .and_then(|obj| obj.as_dict().ok())
        {
            Some(dict) => dict,
            None => return,
        };

        for (_name, value) in xobjects.iter() {
            let id = match value {
                Object::Reference(id) => *id,
                _ => continue,
            };
            let stream = match self.document.get_object(id).and_then(Object::as_stream) {
                Ok(stream) => stream,
                Err(_) => continue,
            };
            let subtype = stream.dict.get(b"Subtype").and_then(Object::as_name).ok();
            match subtype {
                Some(b"Image") => {
                    let width = self.dict_integer(&stream.dict, b"Width").unwrap_or(0);
                    let height = self.dict_integer(&stream.dict, b"Height").unwrap_or(0);
                    if width > 0 && height > 0 {
                        out.push(EmbeddedImage {
                            id,
                            width: width.min(u32::MAX as i64) as u32,
                            height: height.min(u32::MAX as i64) as u32,
                        });
                    }
                }
                Some(b"Form") if depth < MAX_FORM_DEPTH => {
                    let nested = stream
                        .dict
                        .get(b"Resources")
                        .ok()
                        .and_then(|obj| self.resolve(obj).ok())
                        .and_then(|obj| obj.as_dict().ok());
                    if let Some(nested) = nested {
                        self.collect_images(nested, depth + 1, out);
                    }
                }
                _ => {}
            }
        }
    }
}

/// `/Filter` as a list of names (a single name or an array).
fn filter_names(dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_name().ok().map(<[u8]>::to_vec))
            .collect(),
        _ => Vec::new(),
    }
}

/// A `/Decode [1 0]` array flips sample polarity.
fn decode_is_inverted(dict: &Dictionary) -> bool {
    match dict.get(b"Decode").and_then(Object::as_array) {
        Ok(items) => items
            .first()
            .and_then(|first| first.as_float().ok())
            .is_some_and(|first| first >= 1.0),
        Err(_) => false,
    }
}

fn cmyk_to_rgb([c, m, y, k]: [u8; 4]) -> [u8; 3] {
    let white = 255 - k as u32;
    let channel = |v: u8| ((255 - v as u32) * white / 255) as u8;
    [channel(c), channel(m), channel(y)]
}

fn ensure_len(data: &[u8], needed: usize) -> Result<()> {
    if data.len() < needed {
        Err(ScanwerkError::Rasterize(format!(
            "truncated image data: {} bytes, expected {}",
            data.len(),
            needed
        )))
    } else {
        Ok(())
    }
}

fn sample_error(embedded: EmbeddedImage) -> ScanwerkError {
    ScanwerkError::Rasterize(format!(
        "image samples do not match {}x{}",
        embedded.width, embedded.height
    ))
}
