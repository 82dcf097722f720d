// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Print task: positioning -> render -> slice -> submit, run on the blocking
// pool with progress reporting and cooperative cancellation.

use std::sync::Arc;

use image::RgbaImage;
use sha2::{Digest, Sha256};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument};

use tsp_bridge::PrintJobAdapter;
use tsp_core::error::{Result, TspError};
use tsp_core::{CancelFlag, JobStatus, PaperSize, PixelSize, PrintJob, PrintOutcome, PrintType};

use crate::compositor::{canvas_size, render_full_area};
use crate::geometry::{ViewTransform, ViewportSize};
use crate::slicer::{CropMarkStyle, slice};

/// Stages a print task moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintStage {
    Idle,
    Positioning,
    Rendering,
    Slicing,
    Spooling,
    Complete,
    Failed,
    Cancelled,
}

/// Progress snapshot published while a task runs.
#[derive(Debug, Clone, PartialEq)]
pub struct PrintProgress {
    pub stage: PrintStage,
    pub percent: u8,
    pub message: String,
}

impl PrintProgress {
    fn new(stage: PrintStage, percent: u8, message: impl Into<String>) -> Self {
        Self {
            stage,
            percent,
            message: message.into(),
        }
    }

    fn idle() -> Self {
        Self::new(PrintStage::Idle, 0, "Waiting")
    }
}

/// Preview state the print should reproduce.
#[derive(Debug, Clone, Copy)]
pub struct PreviewView {
    pub viewport: ViewportSize,
    pub transform: ViewTransform,
}

/// Everything a print task needs.
#[derive(Debug, Clone)]
pub struct PrintRequest {
    pub source: Arc<RgbaImage>,
    pub print_type: PrintType,
    /// `None` prints the whole image centred on the canvas.
    pub view: Option<PreviewView>,
    pub paper_size: PaperSize,
    pub dpi: u32,
    pub canvas_override: Option<PixelSize>,
    pub crop_marks: CropMarkStyle,
    pub job_name: String,
}

/// SHA-256 over the page rasters, including their dimensions.
pub fn fingerprint(pages: &[RgbaImage]) -> String {
    let mut hasher = Sha256::new();
    for page in pages {
        hasher.update(page.width().to_le_bytes());
        hasher.update(page.height().to_le_bytes());
        hasher.update(page.as_raw());
    }
    hex::encode(hasher.finalize())
}

fn publish(progress: &watch::Sender<PrintProgress>, stage: PrintStage, percent: u8, message: impl Into<String>) {
    progress.send_replace(PrintProgress::new(stage, percent, message));
}

/// Compose, slice and submit. The full canvas never outlives this call.
fn produce_and_submit(
    request: &PrintRequest,
    adapter: &dyn PrintJobAdapter,
    cancel: &CancelFlag,
    progress: &watch::Sender<PrintProgress>,
    job: &mut PrintJob,
) -> Result<PrintOutcome> {
    publish(progress, PrintStage::Positioning, 5, "Mapping the preview onto the page");
    let target = canvas_size(request.print_type, request.paper_size, request.dpi, request.canvas_override);
    let (sw, sh) = request.source.dimensions();
    let positioning = match &request.view {
        Some(view) => Some(view.transform.positioning(PixelSize::new(sw, sh), view.viewport, target)?),
        None => None,
    };
    cancel.check()?;

    publish(progress, PrintStage::Rendering, 20, "Rendering the print canvas");
    job.set_status(JobStatus::Rendering, None);
    let pages = {
        let canvas = render_full_area(
            &request.source,
            positioning.as_ref(),
            request.print_type,
            request.paper_size,
            request.dpi,
            request.canvas_override,
        )?;
        cancel.check()?;

        publish(progress, PrintStage::Slicing, 50, "Cutting pages");
        slice(&canvas, request.print_type, request.crop_marks)
    };
    if pages.is_empty() {
        return Err(TspError::NoPages);
    }
    cancel.check()?;

    let rasters: Vec<RgbaImage> = pages.into_iter().map(|p| p.raster).collect();
    job.page_count = rasters.len();
    job.document_hash = Some(fingerprint(&rasters));

    publish(progress, PrintStage::Spooling, 70, format!("Sending {} pages", rasters.len()));
    job.set_status(JobStatus::Spooling, None);
    adapter.submit(&job.job_name, &rasters, cancel)
}

/// Run a print job to completion on the current thread.
///
/// Adapter outcomes (including cancellation and page failures) are recorded
/// on the returned job. Missing-input and resource errors are returned as
/// `Err` after the `Failed` stage is published.
#[instrument(skip_all, fields(print_type = %request.print_type, job_name = %request.job_name))]
pub fn run_print(
    request: &PrintRequest,
    adapter: &dyn PrintJobAdapter,
    cancel: &CancelFlag,
    progress: &watch::Sender<PrintProgress>,
) -> Result<PrintJob> {
    let mut job = PrintJob::new(request.job_name.clone(), request.print_type);

    match produce_and_submit(request, adapter, cancel, progress, &mut job) {
        Ok(PrintOutcome::Completed { pages }) => {
            job.set_status(JobStatus::Completed, None);
            publish(progress, PrintStage::Complete, 100, format!("{pages} pages sent"));
            info!(job_id = %job.id, pages, "Print job complete");
            Ok(job)
        }
        Ok(PrintOutcome::PageFailed { page, reason }) => {
            let message = format!("page {} failed: {reason}", page + 1);
            publish(progress, PrintStage::Failed, 100, message.clone());
            job.set_status(JobStatus::Failed, Some(message));
            Ok(job)
        }
        Ok(PrintOutcome::Cancelled) | Err(TspError::Cancelled) => {
            job.set_status(JobStatus::Cancelled, None);
            publish(progress, PrintStage::Cancelled, 100, "Cancelled");
            info!(job_id = %job.id, "Print job cancelled");
            Ok(job)
        }
        Err(e) => {
            error!(error = %e, "Print job failed");
            publish(progress, PrintStage::Failed, 100, e.to_string());
            Err(e)
        }
    }
}

/// Handle to a print job running in the background.
pub struct PrintTask {
    cancel: CancelFlag,
    progress: watch::Receiver<PrintProgress>,
    handle: JoinHandle<Result<PrintJob>>,
}

impl PrintTask {
    /// Start `request` on the blocking pool.
    pub fn spawn(request: PrintRequest, adapter: Arc<dyn PrintJobAdapter>) -> Self {
        let (tx, progress) = watch::channel(PrintProgress::idle());
        let cancel = CancelFlag::new();
        let handle = {
            let cancel = cancel.clone();
            tokio::task::spawn_blocking(move || run_print(&request, adapter.as_ref(), &cancel, &tx))
        };
        Self {
            cancel,
            progress,
            handle,
        }
    }

    /// Ask the task to stop at its next checkpoint.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Flag that cancels this task, usable after `wait` has taken the handle.
    pub fn cancel_handle(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn progress(&self) -> watch::Receiver<PrintProgress> {
        self.progress.clone()
    }

    pub async fn wait(self) -> Result<PrintJob> {
        self.handle
            .await
            .map_err(|e| TspError::PrintService(format!("print task ended abnormally: {e}")))?
    }
}
