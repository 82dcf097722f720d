// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stage cache. Each entry is keyed by a value that covers the base image
// version and every parameter affecting that stage or any earlier one, so a
// changed key invalidates the entry and everything after it.

use std::sync::Arc;

use image::RgbaImage;
use tsp_core::EditParams;

/// Key for the basic (tonal + sharpen) stage output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BasicKey {
    base_version: u64,
    brightness: u32,
    exposure: u32,
    contrast: u32,
    gamma: u32,
    sharpness: u32,
    preserve_background: bool,
}

impl BasicKey {
    pub fn new(base_version: u64, params: &EditParams, preserve_background: bool) -> Self {
        Self {
            base_version,
            brightness: params.brightness().to_bits(),
            exposure: params.exposure().to_bits(),
            contrast: params.contrast().to_bits(),
            gamma: params.gamma().to_bits(),
            sharpness: params.sharpness().to_bits(),
            preserve_background,
        }
    }
}

/// Key for the sketch stage output. Contains the basic key, so any change
/// upstream also misses here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SketchKey {
    basic: BasicKey,
    details: u32,
    gamma: u32,
}

impl SketchKey {
    pub fn new(basic: BasicKey, params: &EditParams) -> Self {
        Self {
            basic,
            details: params.sketch_details().to_bits(),
            gamma: params.sketch_gamma().to_bits(),
        }
    }
}

/// Single-entry-per-stage cache of intermediate rasters.
#[derive(Debug, Default)]
pub struct StageCache {
    basic: Option<(BasicKey, Arc<RgbaImage>)>,
    sketch: Option<(SketchKey, Arc<RgbaImage>)>,
}

impl StageCache {
    pub fn basic(&self, key: &BasicKey) -> Option<Arc<RgbaImage>> {
        self.basic
            .as_ref()
            .filter(|(k, _)| k == key)
            .map(|(_, img)| Arc::clone(img))
    }

    /// Store the basic output. A new key also drops the sketch entry.
    pub fn put_basic(&mut self, key: BasicKey, image: Arc<RgbaImage>) {
        if self.basic.as_ref().is_some_and(|(k, _)| *k != key) {
            self.sketch = None;
        }
        self.basic = Some((key, image));
    }

    pub fn sketch(&self, key: &SketchKey) -> Option<Arc<RgbaImage>> {
        self.sketch
            .as_ref()
            .filter(|(k, _)| k == key)
            .map(|(_, img)| Arc::clone(img))
    }

    pub fn put_sketch(&mut self, key: SketchKey, image: Arc<RgbaImage>) {
        self.sketch = Some((key, image));
    }

    pub fn clear(&mut self) {
        self.basic = None;
        self.sketch = None;
    }

    pub fn is_empty(&self) -> bool {
        self.basic.is_none() && self.sketch.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsp_core::FilterKind;

    fn img() -> Arc<RgbaImage> {
        Arc::new(RgbaImage::new(1, 1))
    }

    #[test]
    fn hit_requires_identical_key() {
        let params = EditParams::default();
        let key = BasicKey::new(1, &params, true);
        let mut cache = StageCache::default();
        cache.put_basic(key, img());
        assert!(cache.basic(&key).is_some());

        let brighter = params.clone().with(FilterKind::Brightness, 5.0);
        assert!(cache.basic(&BasicKey::new(1, &brighter, true)).is_none());
        assert!(cache.basic(&BasicKey::new(2, &params, true)).is_none());
    }

    #[test]
    fn upstream_change_invalidates_sketch() {
        let params = EditParams::default();
        let basic = BasicKey::new(1, &params, false);
        let sketch = SketchKey::new(basic, &params);
        let mut cache = StageCache::default();
        cache.put_basic(basic, img());
        cache.put_sketch(sketch, img());
        assert!(cache.sketch(&sketch).is_some());

        let next = BasicKey::new(2, &params, false);
        cache.put_basic(next, img());
        assert!(cache.sketch(&sketch).is_none());
        assert!(cache.sketch(&SketchKey::new(next, &params)).is_none());
    }

    #[test]
    fn sketch_params_only_affect_sketch_key() {
        let mut params = EditParams::default();
        let basic = BasicKey::new(1, &params, false);
        params.set_sketch_details(20.0);
        assert_eq!(basic, BasicKey::new(1, &params, false));
        assert_ne!(SketchKey::new(basic, &params), SketchKey::new(basic, &EditParams::default()));
    }
}
