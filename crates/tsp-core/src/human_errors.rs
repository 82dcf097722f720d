// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the editor and print screens.
//
// Every technical error is mapped to plain English with a clear suggestion.
// Severity drives how the notification is presented (toast vs. dialog).

use crate::error::TspError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Temporary problem; trying again may work.
    Transient,
    /// User must do something first (load an image, move it into view).
    ActionRequired,
    /// Cannot be fixed by retrying.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether retrying the same action can succeed.
    pub retriable: bool,
    /// Severity level (drives icon/colour in UI).
    pub severity: Severity,
}

impl HumanError {
    fn new(message: &str, suggestion: impl Into<String>, retriable: bool, severity: Severity) -> Self {
        Self {
            message: message.into(),
            suggestion: suggestion.into(),
            retriable,
            severity,
        }
    }

    /// One-line form for toasts and CLI output.
    pub fn one_line(&self) -> String {
        format!("{} {}", self.message, self.suggestion)
    }
}

/// Convert a `TspError` into a `HumanError` suitable for a notification.
pub fn humanize_error(err: &TspError) -> HumanError {
    match err {
        // -- Missing input --
        TspError::NoImageLoaded => HumanError::new(
            "No image selected.",
            "Pick a photo first, then try again.",
            false,
            Severity::ActionRequired,
        ),

        TspError::NothingVisible => HumanError::new(
            "The image is outside the print area.",
            "Move or zoom the image so that part of it is inside the frame.",
            false,
            Severity::ActionRequired,
        ),

        TspError::DegenerateGeometry(_) => HumanError::new(
            "The visible part of the image is too small to print.",
            "Zoom out a little or move more of the image into the frame.",
            false,
            Severity::ActionRequired,
        ),

        TspError::NoPages => HumanError::new(
            "There was nothing to print.",
            "Check that the image is visible in the print preview.",
            false,
            Severity::ActionRequired,
        ),

        // -- Filters --
        TspError::Filter(_) | TspError::DimensionMismatch { .. } => HumanError::new(
            "An effect couldn't be applied.",
            "The image is shown without that effect. Try a different setting.",
            true,
            Severity::Transient,
        ),

        TspError::ImageError(_) => HumanError::new(
            "There's a problem with this image.",
            "The image may be damaged or in an unusual format. Try saving it as a JPEG or PNG first.",
            false,
            Severity::Permanent,
        ),

        // -- Resources --
        TspError::Segmentation(_) => HumanError::new(
            "Background removal didn't work on this photo.",
            "Try again, or turn background removal off.",
            true,
            Severity::Transient,
        ),

        TspError::PrintService(detail) => HumanError::new(
            "Printing failed.",
            format!("Check the printer and try again. ({detail})"),
            true,
            Severity::Transient,
        ),

        TspError::Cancelled => HumanError::new(
            "Cancelled.",
            "Nothing was changed.",
            true,
            Severity::Transient,
        ),

        TspError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::NotFound => HumanError::new(
                "The file couldn't be found.",
                "It may have been moved or deleted. Try choosing the file again.",
                false,
                Severity::ActionRequired,
            ),
            std::io::ErrorKind::PermissionDenied => HumanError::new(
                "The app doesn't have permission to use that file.",
                "Check the file permissions, or save to a different folder.",
                false,
                Severity::ActionRequired,
            ),
            _ => HumanError::new(
                "There was a problem reading or writing a file.",
                "Try again. If this keeps happening, your device's storage may be full.",
                true,
                Severity::Transient,
            ),
        },

        TspError::Serialization(_) => HumanError::new(
            "The app had an internal data problem.",
            "Try again. If this keeps happening, please report it.",
            true,
            Severity::Transient,
        ),

        // -- Platform --
        TspError::Bridge(_) => HumanError::new(
            "A device-specific feature didn't work.",
            "Try restarting the app. Some features may not be available on all devices.",
            true,
            Severity::Transient,
        ),

        TspError::PlatformUnavailable => HumanError::new(
            "This feature isn't available on your device.",
            "Some features require a specific type of phone or tablet.",
            false,
            Severity::Permanent,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_image_is_action_required() {
        let human = humanize_error(&TspError::NoImageLoaded);
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(!human.retriable);
    }

    #[test]
    fn segmentation_failure_is_transient() {
        let human = humanize_error(&TspError::Segmentation("model missing".into()));
        assert_eq!(human.severity, Severity::Transient);
        assert!(human.retriable);
    }

    #[test]
    fn missing_file_is_action_required() {
        let err = TspError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(humanize_error(&err).severity, Severity::ActionRequired);
    }

    #[test]
    fn print_service_detail_is_surfaced() {
        let human = humanize_error(&TspError::PrintService("spool full".into()));
        assert!(human.suggestion.contains("spool full"));
    }
}
