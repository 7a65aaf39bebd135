// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Acquisition — turn a document source into something the search can walk:
// a paginated document to rasterize page by page, or a single pixel buffer.

use scanwerk_bridge::{Fetcher, RasterDocument, Rasterizer};
use scanwerk_core::config::AcquisitionConfig;
use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::types::{DocumentSource, DocumentType, PixelBuffer};
use scanwerk_document::ImageProcessor;
use tracing::{debug, info, instrument, warn};

/// An acquired source.
pub enum Acquired {
    /// A paginated document; pages are rendered lazily, in order.
    Document(Box<dyn RasterDocument>),
    /// A single raster image or camera frame.
    Image(PixelBuffer),
}

impl Acquired {
    pub fn page_count(&self) -> usize {
        match self {
            Self::Document(document) => document.page_count(),
            Self::Image(_) => 1,
        }
    }
}

impl std::fmt::Debug for Acquired {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Document(document) => f
                .debug_struct("Document")
                .field("pages", &document.page_count())
                .finish(),
            Self::Image(buffer) => f
                .debug_struct("Image")
                .field("width", &buffer.width())
                .field("height", &buffer.height())
                .finish(),
        }
    }
}

/// Resolves sources through the rasterizer and fetcher capabilities.
pub struct Acquirer {
    config: AcquisitionConfig,
    rasterizer: Box<dyn Rasterizer>,
    fetcher: Box<dyn Fetcher>,
}

impl Acquirer {
    pub fn new(
        config: AcquisitionConfig,
        rasterizer: Box<dyn Rasterizer>,
        fetcher: Box<dyn Fetcher>,
    ) -> Self {
        Self {
            config,
            rasterizer,
            fetcher,
        }
    }

    #[instrument(skip_all, fields(source = source.kind()))]
    pub fn acquire(&self, source: DocumentSource) -> Result<Acquired> {
        match source {
            DocumentSource::File { bytes, mime_type } => self.from_bytes(&bytes, Some(&mime_type)),
            DocumentSource::Url { href } => {
                let resource = self.fetcher.fetch(&href)?;
                if !resource.is_success() {
                    return Err(ScanwerkError::HttpStatus {
                        status: resource.status,
                        url: href,
                    });
                }
                self.from_bytes(&resource.bytes, resource.content_type.as_deref())
            }
            DocumentSource::Frame { buffer } => {
                debug!(
                    width = buffer.width(),
                    height = buffer.height(),
                    "Using caller-supplied frame"
                );
                Ok(Acquired::Image(buffer))
            }
        }
    }

    /// Acquire raw document bytes. The declared MIME type wins when it is
    /// recognised; otherwise the leading bytes decide.
    pub fn from_bytes(&self, bytes: &[u8], declared_mime: Option<&str>) -> Result<Acquired> {
        if bytes.is_empty() {
            return Err(ScanwerkError::EmptyDocument);
        }
        if bytes.len() > self.config.max_document_bytes {
            return Err(ScanwerkError::DocumentTooLarge {
                size: bytes.len(),
                limit: self.config.max_document_bytes,
            });
        }

        let document_type = resolve_type(bytes, declared_mime)?;
        info!(
            document_type = document_type.mime_type(),
            bytes = bytes.len(),
            "Acquiring document"
        );

        if document_type.is_raster() {
            let buffer = ImageProcessor::from_bytes(bytes)?.into_pixel_buffer()?;
            Ok(Acquired::Image(buffer))
        } else {
            Ok(Acquired::Document(self.rasterizer.open(bytes)?))
        }
    }
}

fn resolve_type(bytes: &[u8], declared_mime: Option<&str>) -> Result<DocumentType> {
    if let Some(document_type) = declared_mime.and_then(DocumentType::from_mime) {
        return Ok(document_type);
    }
    if let Some(document_type) = DocumentType::sniff(bytes) {
        if let Some(mime) = declared_mime {
            warn!(
                declared = mime,
                sniffed = document_type.mime_type(),
                "Unrecognised content type, using magic bytes"
            );
        }
        return Ok(document_type);
    }
    Err(ScanwerkError::UnsupportedDocument(
        declared_mime.unwrap_or("unknown").to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanwerk_bridge::FetchedResource;
    use scanwerk_bridge::stub::{UnavailableFetcher, UnavailableRasterizer};
    use scanwerk_core::config::OutputFormat;
    use scanwerk_document::PdfRasterizer;

    struct CannedFetcher(FetchedResource);

    impl Fetcher for CannedFetcher {
        fn fetch(&self, _url: &str) -> Result<FetchedResource> {
            Ok(self.0.clone())
        }
    }

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let buffer = PixelBuffer::filled(w, h, [255, 255, 255, 255]).unwrap();
        ImageProcessor::from_pixel_buffer(buffer)
            .unwrap()
            .encode(OutputFormat::Png, 1.0)
            .unwrap()
            .bytes
    }

    fn acquirer() -> Acquirer {
        Acquirer::new(
            AcquisitionConfig::default(),
            Box::new(PdfRasterizer::default()),
            Box::new(UnavailableFetcher),
        )
    }

    #[test]
    fn raster_upload_becomes_a_buffer() {
        let acquired = acquirer()
            .acquire(DocumentSource::File {
                bytes: png_bytes(30, 20),
                mime_type: "image/png".into(),
            })
            .unwrap();
        match acquired {
            Acquired::Image(buffer) => assert_eq!((buffer.width(), buffer.height()), (30, 20)),
            other => panic!("expected an image, got {:?}", other),
        }
    }

    #[test]
    fn octet_stream_falls_back_to_sniffing() {
        let acquired = acquirer()
            .from_bytes(&png_bytes(4, 4), Some("application/octet-stream"))
            .unwrap();
        assert!(matches!(acquired, Acquired::Image(_)));
    }

    #[test]
    fn unknown_types_are_unsupported() {
        let err = acquirer()
            .from_bytes(b"plain text, no magic", Some("text/plain"))
            .unwrap_err();
        assert!(matches!(err, ScanwerkError::UnsupportedDocument(ref m) if m == "text/plain"));
    }

    #[test]
    fn empty_and_oversized_uploads_are_refused() {
        let small = Acquirer::new(
            AcquisitionConfig {
                max_document_bytes: 8,
                ..AcquisitionConfig::default()
            },
            Box::new(UnavailableRasterizer),
            Box::new(UnavailableFetcher),
        );
        assert!(matches!(
            small.from_bytes(&[], Some("image/png")),
            Err(ScanwerkError::EmptyDocument)
        ));
        assert!(matches!(
            small.from_bytes(&png_bytes(4, 4), Some("image/png")),
            Err(ScanwerkError::DocumentTooLarge { limit: 8, .. })
        ));
    }

    #[test]
    fn corrupt_image_is_an_acquisition_error() {
        let err = acquirer()
            .from_bytes(&[0x89, b'P', b'N', b'G', 0, 0], Some("image/png"))
            .unwrap_err();
        assert!(matches!(err, ScanwerkError::CorruptImage(_)));
    }

    #[test]
    fn pdf_goes_through_the_rasterizer() {
        let err = acquirer()
            .from_bytes(b"%PDF-1.7\n1 0 obj\n<<", Some("application/pdf"))
            .unwrap_err();
        assert!(matches!(err, ScanwerkError::PdfError(_)));
    }

    #[test]
    fn http_error_status_is_surfaced() {
        let acquirer = Acquirer::new(
            AcquisitionConfig::default(),
            Box::new(UnavailableRasterizer),
            Box::new(CannedFetcher(FetchedResource {
                status: 404,
                content_type: Some("text/html".into()),
                bytes: b"<html>gone</html>".to_vec(),
            })),
        );
        let err = acquirer
            .acquire(DocumentSource::Url {
                href: "https://example.org/invoice.pdf".into(),
            })
            .unwrap_err();
        assert!(matches!(err, ScanwerkError::HttpStatus { status: 404, .. }));
    }

    #[test]
    fn fetched_content_type_selects_the_path() {
        let acquirer = Acquirer::new(
            AcquisitionConfig::default(),
            Box::new(UnavailableRasterizer),
            Box::new(CannedFetcher(FetchedResource {
                status: 200,
                content_type: Some("image/png; charset=binary".into()),
                bytes: png_bytes(12, 9),
            })),
        );
        let acquired = acquirer
            .acquire(DocumentSource::Url {
                href: "https://example.org/code.png".into(),
            })
            .unwrap();
        assert_eq!(acquired.page_count(), 1);
        assert!(matches!(acquired, Acquired::Image(ref b) if b.width() == 12));
    }

    #[test]
    fn url_without_fetcher_is_platform_unavailable() {
        let err = acquirer()
            .acquire(DocumentSource::Url {
                href: "https://example.org/x.pdf".into(),
            })
            .unwrap_err();
        assert!(matches!(err, ScanwerkError::PlatformUnavailable));
    }
}
