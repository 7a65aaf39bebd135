// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scanwerk-decode — the host-facing entry point of the Scanwerk pipeline.
//
// A caller hands a `DocumentSource` and a decoder handle to
// `DecodeOrchestrator::decode_document` and gets back exactly one
// `DecodeOutcome`: the payload, or why there is none.

pub mod acquire;
pub mod orchestrator;

pub use acquire::{Acquired, Acquirer};
pub use orchestrator::DecodeOrchestrator;

pub use scanwerk_core::human_errors::{HumanError, Severity, humanize_outcome};
pub use scanwerk_core::{DecodeOutcome, DocumentSource, ScanConfig};

#[cfg(feature = "rqrr")]
pub use scanwerk_bridge::RqrrDecoder;
