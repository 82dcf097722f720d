// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! TSP: platform bridge abstractions.
//!
//! The editing and print engine never talks to the OS directly. Image
//! storage, the segmentation model, and the print service are reached
//! through the traits in [`traits`]. Desktop builds get a filesystem image
//! store and a luminance-key segmenter; targets without a native bridge get
//! the [`stub::StubBridge`], which reports every capability as unavailable.

pub mod fs_store;
pub mod luma_key;
pub mod stub;
pub mod traits;

use std::path::PathBuf;

pub use fs_store::FsImageStore;
pub use luma_key::LumaKeySegmenter;
pub use traits::*;

/// Bridge used on desktop and CI: files on disk plus the luminance-key segmenter.
pub struct DesktopBridge {
    store: FsImageStore,
    segmenter: LumaKeySegmenter,
}

impl DesktopBridge {
    pub fn new(store_dir: PathBuf) -> Self {
        Self {
            store: FsImageStore::new(store_dir),
            segmenter: LumaKeySegmenter::default(),
        }
    }
}

impl PlatformBridge for DesktopBridge {
    fn platform_name(&self) -> &str {
        "Desktop"
    }
}

impl ImageSource for DesktopBridge {
    fn load(&self, image: &tsp_core::ImageRef) -> tsp_core::error::Result<image::RgbaImage> {
        self.store.load(image)
    }
}

impl ImageSink for DesktopBridge {
    fn save(&self, image: &image::RgbaImage) -> tsp_core::error::Result<tsp_core::ImageRef> {
        self.store.save(image)
    }
}

impl SegmentationAdapter for DesktopBridge {
    fn open(&self) -> tsp_core::error::Result<Box<dyn SegmentationSession>> {
        self.segmenter.open()
    }
}

/// Retrieves the bridge implementation for the target operating system.
///
/// `store_dir` is where saved images land on platforms that store to disk.
pub fn platform_bridge(store_dir: PathBuf) -> Box<dyn PlatformBridge> {
    #[cfg(any(target_os = "ios", target_os = "android"))]
    {
        // Native bridges are supplied by the host app; nothing is linked here.
        let _ = store_dir;
        Box::new(stub::StubBridge)
    }
    #[cfg(not(any(target_os = "ios", target_os = "android")))]
    {
        Box::new(DesktopBridge::new(store_dir))
    }
}
