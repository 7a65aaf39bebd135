// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scanwerk-document — Document processing for the Scanwerk decode pipeline.
//
// Provides raster loading and encoding, PDF inspection with an embedded-image
// rasterizer, the image enhancement chain, and the quadrant region search.

pub mod image;
pub mod pdf;
pub mod scan;

// Re-export the primary structs so callers can use `scanwerk_document::RegionSearch` etc.
pub use crate::image::processor::ImageProcessor;
pub use crate::pdf::raster::PdfRasterizer;
pub use crate::pdf::reader::PdfReader;
pub use crate::scan::enhance::ImageEnhancer;
pub use crate::scan::search::{RegionSearch, SearchReport};
