// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Scanwerk.

use thiserror::Error;

/// Top-level error type for all Scanwerk operations.
#[derive(Debug, Error)]
pub enum ScanwerkError {
    // -- Acquisition errors --
    #[error("unsupported document type: {0}")]
    UnsupportedDocument(String),

    #[error("document is empty")]
    EmptyDocument,

    #[error("document too large: {size} bytes exceeds limit of {limit} bytes")]
    DocumentTooLarge { size: usize, limit: usize },

    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("page {index} out of range (document has {count} pages)")]
    PageOutOfRange { index: usize, count: usize },

    #[error("image could not be decoded: {0}")]
    CorruptImage(String),

    #[error("rasterization failed: {0}")]
    Rasterize(String),

    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("remote server answered HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    // -- Pixel / image errors --
    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("invalid pixel buffer: {0}")]
    InvalidBuffer(String),

    #[error("region {region} lies outside a {width}x{height} buffer")]
    RegionOutOfBounds {
        region: String,
        width: u32,
        height: u32,
    },

    // -- Decoding --
    #[error("decoder fault: {0}")]
    Decoder(String),

    // -- Configuration / plumbing --
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("capability not available in this build")]
    PlatformUnavailable,
}

/// Which terminal failure an error belongs to when it ends a decode request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The source never became a pixel buffer.
    Acquisition,
    /// Something broke while enhancing, encoding or decoding.
    Decoder,
}

impl ScanwerkError {
    /// Classify this error into the terminal failure it produces.
    pub fn failure_class(&self) -> FailureClass {
        match self {
            Self::UnsupportedDocument(_)
            | Self::EmptyDocument
            | Self::DocumentTooLarge { .. }
            | Self::PdfError(_)
            | Self::PageOutOfRange { .. }
            | Self::CorruptImage(_)
            | Self::Rasterize(_)
            | Self::Fetch(_)
            | Self::HttpStatus { .. }
            | Self::Io(_)
            | Self::PlatformUnavailable => FailureClass::Acquisition,

            Self::ImageError(_)
            | Self::InvalidBuffer(_)
            | Self::RegionOutOfBounds { .. }
            | Self::Decoder(_)
            | Self::InvalidConfig(_)
            | Self::Serialization(_) => FailureClass::Decoder,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ScanwerkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquisition_errors_classify_as_acquisition() {
        assert_eq!(
            ScanwerkError::PdfError("truncated".into()).failure_class(),
            FailureClass::Acquisition
        );
        assert_eq!(
            ScanwerkError::HttpStatus {
                status: 404,
                url: "https://example.org/a.pdf".into()
            }
            .failure_class(),
            FailureClass::Acquisition
        );
        assert_eq!(ScanwerkError::EmptyDocument.failure_class(), FailureClass::Acquisition);
    }

    #[test]
    fn pipeline_errors_classify_as_decoder() {
        assert_eq!(
            ScanwerkError::ImageError("png encode".into()).failure_class(),
            FailureClass::Decoder
        );
        assert_eq!(
            ScanwerkError::Decoder("bad state".into()).failure_class(),
            FailureClass::Decoder
        );
    }

    #[test]
    fn http_status_message_names_status_and_url() {
        let err = ScanwerkError::HttpStatus {
            status: 503,
            url: "https://example.org/x".into(),
        };
        assert_eq!(
            err.to_string(),
            "remote server answered HTTP 503 for https://example.org/x"
        );
    }
}
