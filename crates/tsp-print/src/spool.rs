// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF spooler: a print adapter that writes each job to a PDF file.
//
// Output goes to `<job>.pdf.part` first and is renamed to `<job>.pdf` only
// once every page is written. The part file is removed on every other exit,
// including cancellation and page failures.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use image::RgbaImage;
use tracing::{debug, error, info, instrument, warn};

use tsp_bridge::PrintJobAdapter;
use tsp_core::error::{Result, TspError};
use tsp_core::{CancelFlag, PaperSize, PrintOutcome};

use crate::pdf::PdfSheetWriter;

/// Removes the partial output unless the job commits.
struct PartFile {
    path: PathBuf,
    committed: bool,
}

impl Drop for PartFile {
    fn drop(&mut self) {
        if !self.committed {
            if let Err(e) = fs::remove_file(&self.path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %self.path.display(), error = %e, "Could not remove partial output");
                }
            }
        }
    }
}

/// Writes print jobs as PDF files into a directory.
#[derive(Debug, Clone)]
pub struct PdfSpooler {
    out_dir: PathBuf,
    paper_size: PaperSize,
    dpi: u32,
}

impl PdfSpooler {
    pub fn new(out_dir: impl Into<PathBuf>, paper_size: PaperSize, dpi: u32) -> Self {
        Self {
            out_dir: out_dir.into(),
            paper_size,
            dpi,
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Final path for `job_name`.
    pub fn output_path(&self, job_name: &str) -> PathBuf {
        self.out_dir.join(format!("{}.pdf", file_stem(job_name)))
    }
}

/// File-name-safe version of a job name.
fn file_stem(job_name: &str) -> String {
    let stem: String = job_name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if stem.is_empty() { "job".to_string() } else { stem }
}

impl PrintJobAdapter for PdfSpooler {
    #[instrument(skip(self, pages, cancel), fields(pages = pages.len()))]
    fn submit(&self, job_name: &str, pages: &[RgbaImage], cancel: &CancelFlag) -> Result<PrintOutcome> {
        if pages.is_empty() {
            return Err(TspError::NoPages);
        }
        fs::create_dir_all(&self.out_dir)?;

        let final_path = self.output_path(job_name);
        let mut part = PartFile {
            path: final_path.with_extension("pdf.part"),
            committed: false,
        };
        let mut file = File::create(&part.path)?;

        let mut writer = PdfSheetWriter::new(job_name, self.paper_size, self.dpi);
        for (index, page) in pages.iter().enumerate() {
            if cancel.is_cancelled() {
                info!(page = index, "Spooling cancelled");
                return Ok(PrintOutcome::Cancelled);
            }
            if let Err(e) = writer.add_page(page) {
                error!(page = index, error = %e, "Page could not be written");
                return Ok(PrintOutcome::PageFailed {
                    page: index,
                    reason: e.to_string(),
                });
            }
        }
        if cancel.is_cancelled() {
            return Ok(PrintOutcome::Cancelled);
        }

        let bytes = writer.finish()?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&part.path, &final_path)?;
        part.committed = true;

        info!(path = %final_path.display(), bytes = bytes.len(), "Print job spooled");
        debug!(job_name, "Spooler done");
        Ok(PrintOutcome::Completed { pages: pages.len() })
    }
}
