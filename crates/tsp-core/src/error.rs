// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for TSP.

use thiserror::Error;

/// Top-level error type for all TSP operations.
#[derive(Debug, Error)]
pub enum TspError {
    // -- Missing input --
    #[error("no image loaded")]
    NoImageLoaded,

    #[error("nothing of the image is visible in the viewport")]
    NothingVisible,

    #[error("degenerate print geometry: {0}")]
    DegenerateGeometry(String),

    #[error("layout produced no printable pages")]
    NoPages,

    // -- Filter errors (recoverable, swallowed by fail-soft stages) --
    #[error("filter failed: {0}")]
    Filter(String),

    #[error("raster size mismatch: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("image processing failed: {0}")]
    ImageError(String),

    // -- Resource errors --
    #[error("segmentation failed: {0}")]
    Segmentation(String),

    #[error("print service error: {0}")]
    PrintService(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Platform bridge --
    #[error("platform bridge error: {0}")]
    Bridge(String),

    #[error("feature not available on this platform")]
    PlatformUnavailable,
}

impl TspError {
    /// Whether a fail-soft stage may swallow this error and pass its input through.
    pub fn is_recoverable_filter_error(&self) -> bool {
        matches!(
            self,
            Self::Filter(_) | Self::DimensionMismatch { .. } | Self::ImageError(_)
        )
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TspError>;
