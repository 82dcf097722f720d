// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Filesystem image store: loads any format `image` can decode, saves PNG
// with timestamped names.

use std::path::{Path, PathBuf};

use chrono::Utc;
use image::RgbaImage;
use tracing::{info, instrument};
use tsp_core::ImageRef;
use tsp_core::error::{Result, TspError};

use crate::traits::{ImageSink, ImageSource};

/// Image store rooted at a directory.
#[derive(Debug, Clone)]
pub struct FsImageStore {
    dir: PathBuf,
}

impl FsImageStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// First free `tsp_<timestamp>[_n].png` path in the store directory.
    fn next_path(&self) -> PathBuf {
        let stamp = Utc::now().format("%Y%m%d_%H%M%S_%3f");
        let mut path = self.dir.join(format!("tsp_{stamp}.png"));
        let mut n = 1;
        while path.exists() {
            path = self.dir.join(format!("tsp_{stamp}_{n}.png"));
            n += 1;
        }
        path
    }
}

impl ImageSource for FsImageStore {
    #[instrument(skip(self), fields(image = %image))]
    fn load(&self, image: &ImageRef) -> Result<RgbaImage> {
        let path = Path::new(&image.0);
        let decoded = image::open(path).map_err(|err| match err {
            image::ImageError::IoError(io) => TspError::Io(io),
            other => TspError::ImageError(format!("failed to open {}: {}", path.display(), other)),
        })?;
        let rgba = decoded.to_rgba8();
        info!(width = rgba.width(), height = rgba.height(), "Image loaded");
        Ok(rgba)
    }
}

impl ImageSink for FsImageStore {
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    fn save(&self, image: &RgbaImage) -> Result<ImageRef> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.next_path();
        image.save(&path).map_err(|err| {
            TspError::ImageError(format!("failed to save image to {}: {}", path.display(), err))
        })?;
        info!(path = %path.display(), "Image saved");
        Ok(ImageRef::from(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn save_then_load_preserves_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsImageStore::new(dir.path().to_path_buf());
        let img = RgbaImage::from_pixel(8, 4, Rgba([10, 20, 30, 255]));

        let saved = store.save(&img).unwrap();
        assert!(saved.0.ends_with(".png"));

        let loaded = store.load(&saved).unwrap();
        assert_eq!(loaded.dimensions(), (8, 4));
        assert_eq!(*loaded.get_pixel(3, 2), Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn consecutive_saves_do_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsImageStore::new(dir.path().to_path_buf());
        let img = RgbaImage::new(2, 2);
        let a = store.save(&img).unwrap();
        let b = store.save(&img).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn missing_file_is_io_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsImageStore::new(dir.path().to_path_buf());
        let missing = ImageRef(dir.path().join("nope.png").display().to_string());
        match store.load(&missing) {
            Err(TspError::Io(err)) => assert_eq!(err.kind(), std::io::ErrorKind::NotFound),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }
}
