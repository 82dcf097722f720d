// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Luminance-key segmenter for desktop builds. Treats bright, near-white
// regions as background, which suits line art and photos shot on paper.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use image::RgbaImage;
use tracing::debug;
use tsp_core::SegmentationMask;
use tsp_core::error::Result;

use crate::traits::{SegmentationAdapter, SegmentationSession};

/// Segmenter keyed on Rec. 709 luma.
///
/// Pixels darker than `key` are foreground; confidence ramps linearly over
/// `feather` levels either side of the key.
#[derive(Debug, Clone)]
pub struct LumaKeySegmenter {
    key: f32,
    feather: f32,
    open_sessions: Arc<AtomicUsize>,
}

impl Default for LumaKeySegmenter {
    fn default() -> Self {
        Self::new(235.0, 16.0)
    }
}

impl LumaKeySegmenter {
    pub fn new(key: f32, feather: f32) -> Self {
        Self {
            key,
            feather: feather.max(1.0),
            open_sessions: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of sessions currently open.
    pub fn open_sessions(&self) -> usize {
        self.open_sessions.load(Ordering::Acquire)
    }
}

impl SegmentationAdapter for LumaKeySegmenter {
    fn open(&self) -> Result<Box<dyn SegmentationSession>> {
        self.open_sessions.fetch_add(1, Ordering::AcqRel);
        debug!("luma-key segmenter opened");
        Ok(Box::new(LumaKeySession {
            key: self.key,
            feather: self.feather,
            open_sessions: Arc::clone(&self.open_sessions),
        }))
    }
}

struct LumaKeySession {
    key: f32,
    feather: f32,
    open_sessions: Arc<AtomicUsize>,
}

impl SegmentationSession for LumaKeySession {
    fn segment(&mut self, image: &RgbaImage) -> Result<SegmentationMask> {
        let confidence = image
            .pixels()
            .map(|p| {
                let [r, g, b, _] = p.0;
                let luma = 0.2126 * r as f32 + 0.7152 * g as f32 + 0.0722 * b as f32;
                ((self.key - luma) / (2.0 * self.feather) + 0.5).clamp(0.0, 1.0)
            })
            .collect();
        Ok(SegmentationMask {
            width: image.width(),
            height: image.height(),
            confidence,
        })
    }
}

impl Drop for LumaKeySession {
    fn drop(&mut self) {
        self.open_sessions.fetch_sub(1, Ordering::AcqRel);
        debug!("luma-key segmenter closed");
    }
}
