// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable guidance for decode outcomes.
//
// Every failure is mapped to plain English with a clear suggestion. The UI
// layer decides how to present it; this module only decides what to say.

use crate::error::ScanwerkError;
use crate::types::DecodeOutcome;

/// Severity of a failure from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Network blip or similar; trying again may work.
    Transient,
    /// The user must do something (rescan, move closer, pick another file).
    ActionRequired,
    /// Cannot be fixed by retrying: wrong format, damaged file.
    Permanent,
}

/// A human-readable failure with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether offering a "try again" button makes sense.
    pub retriable: bool,
    pub severity: Severity,
}

/// Guidance for a finished request, or `None` when a code was decoded.
pub fn humanize_outcome(outcome: &DecodeOutcome) -> Option<HumanError> {
    match outcome {
        DecodeOutcome::Decoded { .. } => None,

        DecodeOutcome::NoCodeFound => Some(HumanError {
            message: "We couldn't find a QR code in this document.".into(),
            suggestion: "Make sure the code is fully visible, in focus and not covered by glare or folds. A sharper scan or a closer photo of the code usually helps.".into(),
            retriable: true,
            severity: Severity::ActionRequired,
        }),

        DecodeOutcome::AcquisitionFailed { cause } => Some(humanize_acquisition(cause)),

        DecodeOutcome::DecoderFault { cause } => Some(HumanError {
            message: "Something went wrong while reading the code.".into(),
            suggestion: format!("Try again. If this keeps happening, please report it. (Detail: {cause})"),
            retriable: true,
            severity: Severity::Transient,
        }),
    }
}

/// Convert a `ScanwerkError` into a `HumanError`.
pub fn humanize_error(err: &ScanwerkError) -> HumanError {
    match err {
        ScanwerkError::UnsupportedDocument(detail) => HumanError {
            message: "This type of file isn't supported.".into(),
            suggestion: format!("Upload a PDF, JPEG or PNG instead. (File type: {detail})"),
            retriable: false,
            severity: Severity::Permanent,
        },

        ScanwerkError::EmptyDocument => HumanError {
            message: "The file is empty.".into(),
            suggestion: "The upload may have been interrupted. Choose the file again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        ScanwerkError::DocumentTooLarge { .. } => HumanError {
            message: "This file is too large to scan.".into(),
            suggestion: "Try a smaller file, or only the page that carries the code.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        ScanwerkError::PdfError(_) | ScanwerkError::PageOutOfRange { .. } => HumanError {
            message: "There's a problem with this PDF file.".into(),
            suggestion: "The file may be damaged or password-protected. Try opening it on a computer first, or export the page as an image.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        ScanwerkError::Rasterize(_) => HumanError {
            message: "We couldn't turn this page into an image.".into(),
            suggestion: "Try exporting the page as a PNG or JPEG and uploading that instead.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        ScanwerkError::Fetch(_) => HumanError {
            message: "We couldn't download the document.".into(),
            suggestion: "Check your connection and that the link is correct, then try again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        ScanwerkError::HttpStatus { status, .. } => {
            if (500..600).contains(status) {
                HumanError {
                    message: "The server holding the document had a problem.".into(),
                    suggestion: "Wait a moment and try again.".into(),
                    retriable: true,
                    severity: Severity::Transient,
                }
            } else {
                HumanError {
                    message: "The link didn't lead to a document.".into(),
                    suggestion: format!("Check the link and try again. (HTTP {status})"),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            }
        }

        ScanwerkError::CorruptImage(_)
        | ScanwerkError::ImageError(_)
        | ScanwerkError::InvalidBuffer(_) => HumanError {
            message: "There's a problem with this image.".into(),
            suggestion: "The image may be damaged or in an unusual format. Try saving it as a JPEG or PNG first.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        ScanwerkError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "The file couldn't be found.".into(),
                    suggestion: "It may have been moved or deleted. Try choosing the file again.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "There was a problem reading the file.".into(),
                    suggestion: "Try again.".into(),
                    retriable: true,
                    severity: Severity::Transient,
                }
            }
        }

        ScanwerkError::PlatformUnavailable => HumanError {
            message: "This feature isn't available here.".into(),
            suggestion: "Upload the file directly instead of using a link.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        ScanwerkError::RegionOutOfBounds { .. }
        | ScanwerkError::Decoder(_)
        | ScanwerkError::InvalidConfig(_)
        | ScanwerkError::Serialization(_) => HumanError {
            message: "Something went wrong while reading the code.".into(),
            suggestion: "Try again. If this keeps happening, please report it.".into(),
            retriable: true,
            severity: Severity::Transient,
        },
    }
}

/// Acquisition causes arrive as strings on the outcome; pick the closest
/// guidance from their wording.
fn humanize_acquisition(cause: &str) -> HumanError {
    let lower = cause.to_ascii_lowercase();

    if lower.contains("unsupported document") {
        HumanError {
            message: "This type of file isn't supported.".into(),
            suggestion: "Upload a PDF, JPEG or PNG instead.".into(),
            retriable: false,
            severity: Severity::Permanent,
        }
    } else if lower.contains("pdf") {
        HumanError {
            message: "There's a problem with this PDF file.".into(),
            suggestion: "The file may be damaged or password-protected. Try exporting the page as an image.".into(),
            retriable: false,
            severity: Severity::Permanent,
        }
    } else if lower.contains("fetch") || lower.contains("http") {
        HumanError {
            message: "We couldn't download the document.".into(),
            suggestion: "Check the link and your connection, then try again.".into(),
            retriable: true,
            severity: Severity::Transient,
        }
    } else if lower.contains("image could not be decoded") {
        HumanError {
            message: "There's a problem with this image.".into(),
            suggestion: "The image may be damaged or in an unusual format. Try saving it as a JPEG or PNG first.".into(),
            retriable: false,
            severity: Severity::Permanent,
        }
    } else if lower.contains("empty") {
        HumanError {
            message: "The file is empty.".into(),
            suggestion: "Choose the file again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        }
    } else {
        HumanError {
            message: "We couldn't open this document.".into(),
            suggestion: format!("Try a different file. (Detail: {cause})"),
            retriable: false,
            severity: Severity::Permanent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_has_no_guidance() {
        let outcome = DecodeOutcome::Decoded {
            payload: "x".into(),
        };
        assert!(humanize_outcome(&outcome).is_none());
    }

    #[test]
    fn no_code_found_asks_for_a_clearer_image() {
        let human = humanize_outcome(&DecodeOutcome::NoCodeFound).unwrap();
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(human.suggestion.contains("visible"));
    }

    #[test]
    fn broken_pdf_is_permanent() {
        let outcome = DecodeOutcome::from_error(&ScanwerkError::PdfError("invalid file header".into()));
        let human = humanize_outcome(&outcome).unwrap();
        assert_eq!(human.severity, Severity::Permanent);
        assert!(!human.retriable);
    }

    #[test]
    fn server_errors_are_transient() {
        let err = ScanwerkError::HttpStatus {
            status: 502,
            url: "https://example.org".into(),
        };
        assert_eq!(humanize_error(&err).severity, Severity::Transient);
        let err = ScanwerkError::HttpStatus {
            status: 404,
            url: "https://example.org".into(),
        };
        assert_eq!(humanize_error(&err).severity, Severity::ActionRequired);
    }

    #[test]
    fn decoder_fault_is_retriable() {
        let human = humanize_outcome(&DecodeOutcome::DecoderFault {
            cause: "decoder fault: boom".into(),
        })
        .unwrap();
        assert!(human.retriable);
        assert!(human.suggestion.contains("boom"));
    }
}
