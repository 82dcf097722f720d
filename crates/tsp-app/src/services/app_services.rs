// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer: owns the platform bridge, the persisted config,
// and the print job history, and builds the editor and print engines from
// them.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use image::RgbaImage;
use tracing::{info, instrument, warn};
use tsp_bridge::{ImageSink, ImageSource, PlatformBridge, SegmentationAdapter, SegmentationSession};
use tsp_core::error::Result;
use tsp_core::{AppConfig, ImageRef, PrintJob};
use tsp_filters::TextureSet;
use tsp_pipeline::{Pipeline, PipelineSettings, PipelineWorker};
use tsp_print::PdfSpooler;

use super::data_dir;

const CONFIG_FILE: &str = "config.json";
const JOBS_FILE: &str = "jobs.json";
/// Oldest entries are dropped once the history grows past this.
const JOB_HISTORY_LIMIT: usize = 200;

/// Lends the bridge's segmenter to the pipeline.
struct SharedSegmenter(Arc<dyn PlatformBridge>);

impl SegmentationAdapter for SharedSegmenter {
    fn open(&self) -> Result<Box<dyn SegmentationSession>> {
        self.0.open()
    }
}

/// Shared application services.
///
/// All fields are Arc-wrapped so the struct can be cloned into tasks.
#[derive(Clone)]
pub struct AppServices {
    bridge: Arc<dyn PlatformBridge>,
    data_dir: PathBuf,
    config: Arc<Mutex<AppConfig>>,
    jobs: Arc<Mutex<()>>,
}

impl AppServices {
    /// Initialise services rooted at `override_dir` (or the platform default).
    pub fn init(override_dir: Option<&Path>) -> Result<Self> {
        let dir = data_dir::data_dir(override_dir)?;
        let exports = data_dir::data_subdir(&dir, "exports")?;
        let bridge: Arc<dyn PlatformBridge> = Arc::from(tsp_bridge::platform_bridge(exports));
        Ok(Self::with_bridge(dir, bridge))
    }

    /// Services over an explicit bridge.
    pub fn with_bridge(data_dir: PathBuf, bridge: Arc<dyn PlatformBridge>) -> Self {
        let config = load_config(&data_dir).unwrap_or_default();
        info!(path = %data_dir.display(), platform = bridge.platform_name(), "App services initialised");
        Self {
            bridge,
            data_dir,
            config: Arc::new(Mutex::new(config)),
            jobs: Arc::new(Mutex::new(())),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    // -- Config ---------------------------------------------------------------

    fn config_guard(&self) -> MutexGuard<'_, AppConfig> {
        self.config.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Get a clone of the current config.
    pub fn config(&self) -> AppConfig {
        self.config_guard().clone()
    }

    /// Update and persist the config.
    pub fn save_config(&self, config: &AppConfig) -> Result<()> {
        *self.config_guard() = config.clone();
        persist_config(&self.data_dir, config)
    }

    // -- Images ---------------------------------------------------------------

    pub fn load_image(&self, path: &Path) -> Result<RgbaImage> {
        self.bridge.load(&ImageRef::from(path.to_path_buf()))
    }

    /// Save into the bridge's image store.
    pub fn export_image(&self, image: &RgbaImage) -> Result<ImageRef> {
        self.bridge.save(image)
    }

    // -- Engines --------------------------------------------------------------

    /// Start a pipeline worker configured from the current settings.
    pub fn spawn_editor(&self) -> PipelineWorker {
        let config = self.config();
        let segmenter: Arc<dyn SegmentationAdapter> = Arc::new(SharedSegmenter(Arc::clone(&self.bridge)));
        let pipeline = Pipeline::new(
            segmenter,
            TextureSet::from_optional_path(config.grain_texture.as_deref()),
            PipelineSettings::from(&config),
        );
        PipelineWorker::spawn(pipeline, config.debounce())
    }

    /// PDF spooler writing into `out_dir`, or the `prints` data subdir.
    pub fn spooler(&self, out_dir: Option<&Path>) -> Result<PdfSpooler> {
        let config = self.config();
        let dir = match out_dir {
            Some(dir) => dir.to_path_buf(),
            None => data_dir::data_subdir(&self.data_dir, "prints")?,
        };
        Ok(PdfSpooler::new(dir, config.paper_size, config.print_dpi))
    }

    // -- Job history ----------------------------------------------------------

    /// Append a finished job to the history file.
    #[instrument(skip_all, fields(job_id = %job.id, status = ?job.status))]
    pub fn record_job(&self, job: &PrintJob) -> Result<()> {
        let _guard = self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut jobs = read_jobs(&self.data_dir);
        jobs.push(job.clone());
        if jobs.len() > JOB_HISTORY_LIMIT {
            let excess = jobs.len() - JOB_HISTORY_LIMIT;
            jobs.drain(..excess);
        }
        let json = serde_json::to_string_pretty(&jobs)?;
        std::fs::write(self.data_dir.join(JOBS_FILE), json)?;
        Ok(())
    }

    /// Recorded jobs, newest first.
    pub fn recent_jobs(&self, limit: usize) -> Vec<PrintJob> {
        let _guard = self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut jobs = read_jobs(&self.data_dir);
        jobs.reverse();
        jobs.truncate(limit);
        jobs
    }
}

fn read_jobs(data_dir: &Path) -> Vec<PrintJob> {
    let path = data_dir.join(JOBS_FILE);
    let Ok(data) = std::fs::read_to_string(&path) else {
        return Vec::new();
    };
    match serde_json::from_str(&data) {
        Ok(jobs) => jobs,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Job history unreadable, starting fresh");
            Vec::new()
        }
    }
}

// -- Config file persistence -------------------------------------------------

fn load_config(data_dir: &Path) -> Option<AppConfig> {
    let path = data_dir.join(CONFIG_FILE);
    let data = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&data) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Config unreadable, using defaults");
            None
        }
    }
}

fn persist_config(data_dir: &Path, config: &AppConfig) -> Result<()> {
    let path = data_dir.join(CONFIG_FILE);
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json)?;
    Ok(())
}
