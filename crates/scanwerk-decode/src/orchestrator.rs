// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Decode orchestrator — one request: acquire the source, walk its pages in
// order, run the region search on each and collapse the result into a single
// DecodeOutcome.

use scanwerk_bridge::{Decoder, Fetcher, RasterDocument, Rasterizer, default_fetcher};
use scanwerk_core::config::ScanConfig;
use scanwerk_core::error::{FailureClass, Result, ScanwerkError};
use scanwerk_core::types::{DecodeOutcome, DocumentSource, PixelBuffer, RequestId};
use scanwerk_document::{ImageProcessor, PdfRasterizer, RegionSearch};
use tracing::{debug, info, info_span, warn};

use crate::acquire::{Acquired, Acquirer};

/// Runs decode requests against a fixed configuration.
///
/// Holds no per-request state: the decoder handle is borrowed for the
/// duration of one [`decode_document`](Self::decode_document) call, so a
/// handle can never have two calls in flight.
pub struct DecodeOrchestrator {
    config: ScanConfig,
    acquirer: Acquirer,
    search: RegionSearch,
}

impl DecodeOrchestrator {
    /// Build an orchestrator from explicit capabilities. The configuration is
    /// validated once here.
    pub fn new(
        config: ScanConfig,
        rasterizer: Box<dyn Rasterizer>,
        fetcher: Box<dyn Fetcher>,
    ) -> Result<Self> {
        config.validate()?;
        let acquirer = Acquirer::new(config.acquisition.clone(), rasterizer, fetcher);
        let search = RegionSearch::new(config.enhancement.clone(), config.search.clone());
        Ok(Self {
            config,
            acquirer,
            search,
        })
    }

    /// The lopdf rasterizer plus whatever fetcher this build supports.
    pub fn with_defaults(config: ScanConfig) -> Result<Self> {
        let rasterizer = PdfRasterizer::new(config.acquisition.max_raster_pixels);
        Self::new(config, Box::new(rasterizer), default_fetcher())
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Decode one document. Exactly one outcome is reported per call;
    /// per-candidate misses never surface individually.
    pub fn decode_document(
        &self,
        source: DocumentSource,
        decoder: &mut dyn Decoder,
    ) -> DecodeOutcome {
        let request_id = RequestId::new();
        let span = info_span!("decode_request", %request_id, source = source.kind());
        let _guard = span.enter();

        let mut attempts = 0usize;
        let outcome = match self.run(source, decoder, &mut attempts) {
            Ok(Some(payload)) => DecodeOutcome::Decoded { payload },
            Ok(None) => DecodeOutcome::NoCodeFound,
            Err(err) => {
                warn!(%err, class = ?err.failure_class(), "Decode request failed");
                DecodeOutcome::from_error(&err)
            }
        };

        info!(attempts, success = outcome.is_success(), "Decode request finished");
        outcome
    }

    /// Decode a single already-acquired frame, e.g. from a camera loop.
    pub fn decode_frame(&self, buffer: PixelBuffer, decoder: &mut dyn Decoder) -> DecodeOutcome {
        self.decode_document(DocumentSource::Frame { buffer }, decoder)
    }

    fn run(
        &self,
        source: DocumentSource,
        decoder: &mut dyn Decoder,
        attempts: &mut usize,
    ) -> Result<Option<String>> {
        let acquired = self.acquirer.acquire(source)?;
        debug!(pages = acquired.page_count(), "Source acquired");
        match acquired {
            Acquired::Image(buffer) => self.search_page(&buffer, decoder, attempts),
            Acquired::Document(document) => self.search_document(document.as_ref(), decoder, attempts),
        }
    }

    /// Pages are searched strictly in order; the first payload ends the
    /// request. Pages that fail to render are skipped as long as at least one
    /// page renders.
    fn search_document(
        &self,
        document: &dyn RasterDocument,
        decoder: &mut dyn Decoder,
        attempts: &mut usize,
    ) -> Result<Option<String>> {
        let page_count = document.page_count();
        let pages = self.config.acquisition.pages_to_search(page_count);
        let scale = self.config.acquisition.render_scale;
        let attempt_budget = pages as u64 * self.config.search.max_attempts();
        info!(page_count, pages, scale, attempt_budget, "Searching document pages");

        let mut first_failure: Option<ScanwerkError> = None;
        let mut rendered = 0usize;

        for page_index in 0..pages {
            let buffer = match document.rasterize(page_index, scale) {
                Ok(buffer) => buffer,
                Err(err) if err.failure_class() == FailureClass::Acquisition => {
                    warn!(page_index, %err, "Page could not be rasterized, skipping");
                    first_failure.get_or_insert(err);
                    continue;
                }
                Err(err) => return Err(err),
            };
            rendered += 1;

            if let Some(payload) = self.search_page(&buffer, decoder, attempts)? {
                info!(page_index, "Code found");
                return Ok(Some(payload));
            }
            debug!(page_index, "Page exhausted");
        }

        if rendered == 0 {
            return Err(first_failure.unwrap_or_else(|| {
                ScanwerkError::Rasterize("document has no pages to search".to_string())
            }));
        }
        Ok(None)
    }

    /// Region search on one page, then, when rescan is enabled, again at
    /// successively smaller scales until `min_dimension` is reached.
    fn search_page(
        &self,
        buffer: &PixelBuffer,
        decoder: &mut dyn Decoder,
        attempts: &mut usize,
    ) -> Result<Option<String>> {
        let report = self.search.search(buffer, &mut *decoder)?;
        *attempts += report.attempts;
        if report.found() || !self.config.search.rescan {
            return Ok(report.payload);
        }

        let enhancement = &self.config.enhancement;
        let mut current = buffer.clone();
        loop {
            let larger = current
                .width()
                .max(current.height())
                .min(enhancement.max_dimension);
            let next = (larger as f32 * enhancement.scaling_factor).round() as u32;
            if next < enhancement.min_dimension || next == 0 || next >= larger {
                return Ok(None);
            }

            current = ImageProcessor::from_pixel_buffer(current)?
                .fit_within(next)
                .into_pixel_buffer()?;
            debug!(
                width = current.width(),
                height = current.height(),
                "Rescanning at a smaller scale"
            );

            let report = self.search.search(&current, &mut *decoder)?;
            *attempts += report.attempts;
            if report.found() {
                return Ok(report.payload);
            }
        }
    }
}
