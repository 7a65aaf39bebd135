// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// QR decoder backed by the pure-Rust `rqrr` crate.

use rqrr::PreparedImage;
use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::types::EncodedImage;
use tracing::{debug, trace};

use crate::traits::Decoder;

/// Decodes the first readable QR grid in an encoded image.
///
/// Holds no state between calls; one instance per request keeps call
/// sequencing obvious.
#[derive(Debug, Default)]
pub struct RqrrDecoder {
    calls: u64,
}

impl RqrrDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of decode calls served by this handle.
    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl Decoder for RqrrDecoder {
    fn decode(&mut self, image: &EncodedImage) -> Result<Option<String>> {
        self.calls += 1;

        let decoded = image::load_from_memory(&image.bytes).map_err(|err| {
            ScanwerkError::Decoder(format!("cannot read {:?} input: {}", image.format, err))
        })?;
        let gray = decoded.to_luma8();
        let (width, height) = gray.dimensions();

        let mut prepared = PreparedImage::prepare_from_greyscale(
            width as usize,
            height as usize,
            |x, y| gray.get_pixel(x as u32, y as u32).0[0],
        );
        let grids = prepared.detect_grids();
        trace!(grids = grids.len(), width, height, "rqrr grid detection");

        for grid in &grids {
            match grid.decode() {
                Ok((_meta, content)) if !content.is_empty() => return Ok(Some(content)),
                Ok(_) => debug!("Grid decoded to an empty payload"),
                // A located grid that fails error correction is a miss, not a fault.
                Err(err) => debug!(%err, "Grid found but not decodable"),
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage, ImageFormat, Luma};
    use scanwerk_core::OutputFormat;

    fn png(image: GrayImage) -> EncodedImage {
        let mut bytes = Vec::new();
        DynamicImage::ImageLuma8(image)
            .write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        EncodedImage {
            format: OutputFormat::Png,
            bytes,
        }
    }

    /// `payload` as a QR symbol, `module_px` pixels per module, with the
    /// standard four-module quiet zone.
    fn qr_symbol(payload: &str, module_px: u32) -> GrayImage {
        let code = qrcode::QrCode::new(payload.as_bytes()).unwrap();
        let modules = code.width() as u32;
        let colors = code.to_colors();
        let quiet = 4;
        let side = (modules + 2 * quiet) * module_px;
        GrayImage::from_fn(side, side, |x, y| {
            let (mx, my) = (x / module_px, y / module_px);
            let inside = (quiet..modules + quiet).contains(&mx) && (quiet..modules + quiet).contains(&my);
            let dark = inside
                && colors[((my - quiet) * modules + (mx - quiet)) as usize] == qrcode::Color::Dark;
            Luma([if dark { 0 } else { 255 }])
        })
    }

    #[test]
    fn rendered_symbol_decodes_to_its_payload() {
        let mut decoder = RqrrDecoder::new();
        for module_px in [4, 8] {
            let image = png(qr_symbol("INV-2026-0042", module_px));
            assert_eq!(
                decoder.decode(&image).unwrap().as_deref(),
                Some("INV-2026-0042")
            );
        }
        assert_eq!(decoder.calls(), 2);
    }

    #[test]
    fn blank_image_has_no_payload() {
        let mut decoder = RqrrDecoder::new();
        let image = png(GrayImage::from_pixel(120, 120, Luma([255u8])));
        assert_eq!(decoder.decode(&image).unwrap(), None);
        assert_eq!(decoder.calls(), 1);
    }

    #[test]
    fn garbage_bytes_are_a_fault() {
        let mut decoder = RqrrDecoder::new();
        let image = EncodedImage {
            format: OutputFormat::Png,
            bytes: b"definitely not a png".to_vec(),
        };
        assert!(matches!(
            decoder.decode(&image),
            Err(ScanwerkError::Decoder(_))
        ));
    }
}
