// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub bridge for targets where no native bridge is linked.
//
// Every trait method returns `PlatformUnavailable`.

use image::RgbaImage;
use tsp_core::error::{Result, TspError};
use tsp_core::{CancelFlag, ImageRef, PrintOutcome};

use crate::traits::*;

/// No-op bridge.
pub struct StubBridge;

impl PlatformBridge for StubBridge {
    fn platform_name(&self) -> &str {
        "Unsupported (stub)"
    }
}

impl ImageSource for StubBridge {
    fn load(&self, _image: &ImageRef) -> Result<RgbaImage> {
        tracing::warn!("ImageSource::load called on stub bridge");
        Err(TspError::PlatformUnavailable)
    }
}

impl ImageSink for StubBridge {
    fn save(&self, _image: &RgbaImage) -> Result<ImageRef> {
        tracing::warn!("ImageSink::save called on stub bridge");
        Err(TspError::PlatformUnavailable)
    }
}

impl SegmentationAdapter for StubBridge {
    fn open(&self) -> Result<Box<dyn SegmentationSession>> {
        tracing::warn!("SegmentationAdapter::open called on stub bridge");
        Err(TspError::PlatformUnavailable)
    }
}

impl PrintJobAdapter for StubBridge {
    fn submit(
        &self,
        _job_name: &str,
        _pages: &[RgbaImage],
        _cancel: &CancelFlag,
    ) -> Result<PrintOutcome> {
        tracing::warn!("PrintJobAdapter::submit called on stub bridge");
        Err(TspError::PlatformUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_capability_is_unavailable() {
        let bridge = StubBridge;
        assert!(matches!(
            bridge.load(&ImageRef("x.png".into())),
            Err(TspError::PlatformUnavailable)
        ));
        assert!(matches!(bridge.open(), Err(TspError::PlatformUnavailable)));
        assert!(matches!(
            bridge.submit("job", &[], &CancelFlag::new()),
            Err(TspError::PlatformUnavailable)
        ));
    }
}
