// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the person holding the camera.
//
// Every technical error is mapped to plain English with a clear suggestion.
// Whatever goes wrong, the fallback is always manual score entry.

use crate::error::StickerError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Timeout or network blip; scanning again may just work.
    Transient,
    /// The user must do something (grant camera access, fix a setting).
    ActionRequired,
    /// Retrying will not help.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether scanning again is worthwhile.
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert a `StickerError` into a `HumanError`.
pub fn humanize_error(err: &StickerError) -> HumanError {
    match err {
        // -- Frames and images --
        StickerError::InvalidFrame { .. } | StickerError::ImageError(_) => HumanError {
            message: "The picture couldn't be processed.".into(),
            suggestion: "Scan the sticker again. If this keeps happening, enter the marks by hand.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        StickerError::Capture(detail) => HumanError {
            message: "We couldn't get a picture from the camera.".into(),
            suggestion: format!("Check that the camera is connected and not used by another app. ({detail})"),
            retriable: true,
            severity: Severity::ActionRequired,
        },

        StickerError::PlatformUnavailable => HumanError {
            message: "No camera is available on this device.".into(),
            suggestion: "Pass saved photos of the sticker instead, or enter the marks by hand.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        // -- Configuration --
        StickerError::Config(detail) => HumanError {
            message: "A scanner setting is invalid.".into(),
            suggestion: format!("Fix or delete the config file to go back to the defaults. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        // -- Engine --
        StickerError::EngineInit(_) | StickerError::EngineStopped => HumanError {
            message: "Automatic sticker detection isn't available.".into(),
            suggestion: "Restart the scanner. Until then, enter the marks by hand.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        StickerError::EngineFault { .. } | StickerError::DetectTimeout(_) => HumanError {
            message: "The sticker couldn't be read this time.".into(),
            suggestion: "Hold the sticker flat and steady inside the frame, then scan again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        // -- OCR backend --
        StickerError::OcrRequest(_) => HumanError {
            message: "The marks couldn't be sent for reading.".into(),
            suggestion: "Check your internet connection. You can type the marks in yourself.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        StickerError::OcrStatus { status, .. } => {
            if *status == 401 || *status == 403 {
                HumanError {
                    message: "The reading service refused the upload.".into(),
                    suggestion: "Sign in again or check the access token in the settings.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "The reading service is having trouble.".into(),
                    suggestion: format!("Try again in a moment, or type the marks in yourself. (HTTP {status})"),
                    retriable: true,
                    severity: Severity::Transient,
                }
            }
        }

        // -- Storage / persistence --
        StickerError::Io(e) => HumanError {
            message: "A file couldn't be read or written.".into(),
            suggestion: format!("Check the folder exists and you have permission to use it. ({e})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        StickerError::Serialization(_) => HumanError {
            message: "A saved file is damaged.".into(),
            suggestion: "Delete the config file to go back to the defaults.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::JobId;

    #[test]
    fn detection_faults_are_retriable() {
        for err in [
            StickerError::DetectTimeout(JobId(3)),
            StickerError::EngineFault {
                job_id: JobId(4),
                message: "panic".into(),
            },
        ] {
            let human = humanize_error(&err);
            assert!(human.retriable);
            assert_eq!(human.severity, Severity::Transient);
        }
    }

    #[test]
    fn auth_failures_need_action() {
        let human = humanize_error(&StickerError::OcrStatus {
            status: 401,
            body: String::new(),
        });
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(!human.retriable);

        let human = humanize_error(&StickerError::OcrStatus {
            status: 502,
            body: String::new(),
        });
        assert!(human.retriable);
        assert!(human.suggestion.contains("502"));
    }

    #[test]
    fn no_camera_points_at_manual_entry() {
        let human = humanize_error(&StickerError::PlatformUnavailable);
        assert_eq!(human.severity, Severity::Permanent);
        assert!(human.suggestion.contains("by hand"));
    }
}
