// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — page inspection and rasterization of scanned PDFs.

pub mod raster;
pub mod reader;

pub use raster::PdfRasterizer;
pub use reader::PdfReader;
