// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanning pipeline — the enhancement chain and the recursive region search
// that feeds enhanced candidates to a decoder.

pub mod enhance;
pub mod search;

pub use enhance::ImageEnhancer;
pub use search::{RegionSearch, SearchReport};
