// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic trait definitions for the capabilities the engine needs
// from its host: image storage, segmentation, and a print service.

use image::RgbaImage;
use tsp_core::error::Result;
use tsp_core::{CancelFlag, ImageRef, PrintOutcome, SegmentationMask};

/// Unified bridge that groups the native capabilities used by the editor.
pub trait PlatformBridge: ImageSource + ImageSink + SegmentationAdapter + Send + Sync {
    /// Human-readable platform name (e.g. "Desktop", "Android 14").
    fn platform_name(&self) -> &str;
}

/// Load a picked image into an RGBA raster.
pub trait ImageSource {
    fn load(&self, image: &ImageRef) -> Result<RgbaImage>;
}

/// Persist an edited raster to the user's gallery or disk.
pub trait ImageSink {
    /// Store the image and return a handle to the saved copy.
    fn save(&self, image: &RgbaImage) -> Result<ImageRef>;
}

/// An open segmenter. Dropping the session closes it, so it is released on
/// every exit path.
pub trait SegmentationSession: Send {
    /// Produce a per-pixel foreground confidence mask for `image`.
    fn segment(&mut self, image: &RgbaImage) -> Result<SegmentationMask>;
}

/// Factory for segmentation sessions.
pub trait SegmentationAdapter: Send + Sync {
    fn open(&self) -> Result<Box<dyn SegmentationSession>>;
}

/// Hand finished pages to the platform print service.
pub trait PrintJobAdapter: Send + Sync {
    /// Submit `pages` as one job, one raster per physical page. `cancel` is
    /// checked before each page.
    fn submit(&self, job_name: &str, pages: &[RgbaImage], cancel: &CancelFlag)
    -> Result<PrintOutcome>;
}
