// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub capabilities for builds where a collaborator is not compiled in.
//
// Every trait method returns `PlatformUnavailable`, which the orchestrator
// reports as an acquisition failure.

use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::types::EncodedImage;

use crate::traits::*;

/// Fetcher used when the `http` feature is off.
pub struct UnavailableFetcher;

impl Fetcher for UnavailableFetcher {
    fn fetch(&self, url: &str) -> Result<FetchedResource> {
        tracing::warn!(url, "Fetcher::fetch called on stub fetcher");
        Err(ScanwerkError::PlatformUnavailable)
    }
}

/// Rasterizer for hosts that cannot render paginated documents.
pub struct UnavailableRasterizer;

impl Rasterizer for UnavailableRasterizer {
    fn open(&self, _document: &[u8]) -> Result<Box<dyn RasterDocument>> {
        tracing::warn!("Rasterizer::open called on stub rasterizer");
        Err(ScanwerkError::PlatformUnavailable)
    }
}

/// Decoder that never finds anything.
pub struct NullDecoder;

impl Decoder for NullDecoder {
    fn decode(&mut self, _image: &EncodedImage) -> Result<Option<String>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanwerk_core::OutputFormat;

    #[test]
    fn stubs_report_unavailable() {
        assert!(matches!(
            UnavailableFetcher.fetch("https://example.org"),
            Err(ScanwerkError::PlatformUnavailable)
        ));
        assert!(matches!(
            UnavailableRasterizer.open(b"%PDF-1.4"),
            Err(ScanwerkError::PlatformUnavailable)
        ));
    }

    #[test]
    fn null_decoder_finds_nothing() {
        let image = EncodedImage {
            format: OutputFormat::Png,
            bytes: vec![1, 2, 3],
        };
        assert_eq!(NullDecoder.decode(&image).unwrap(), None);
    }
}
