// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-aware data directory resolution.

use std::io;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "tsp";

/// Return the application data directory, creating it if needed.
///
/// `override_dir` wins when given; otherwise the XDG data directory is used.
pub fn data_dir(override_dir: Option<&Path>) -> io::Result<PathBuf> {
    let dir = match override_dir {
        Some(dir) => dir.to_path_buf(),
        None => dirs_fallback().join(APP_DIR),
    };
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Return a subdirectory inside `root` (e.g. "exports", "prints").
pub fn data_subdir(root: &Path, name: &str) -> io::Result<PathBuf> {
    let dir = root.join(name);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

fn dirs_fallback() -> PathBuf {
    // XDG data dir, then home
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    std::env::temp_dir()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_and_subdirs_are_created() {
        let tmp = tempfile::tempdir().unwrap();
        let root = data_dir(Some(&tmp.path().join("state"))).unwrap();
        assert!(root.is_dir());
        let prints = data_subdir(&root, "prints").unwrap();
        assert_eq!(prints, root.join("prints"));
        assert!(prints.is_dir());
    }
}
