// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanwerk — Core types, configuration and error definitions shared across all crates.

pub mod config;
pub mod error;
pub mod human_errors;
pub mod types;

pub use config::{
    AcquisitionConfig, DenoiseMode, EnhancementConfig, OutputFormat, ScanConfig, SearchConfig,
    ThresholdMode,
};
pub use error::{FailureClass, ScanwerkError};
pub use types::*;
