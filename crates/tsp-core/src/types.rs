// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the TSP editing and print-layout engine.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Millimetres per inch, used for paper-to-pixel conversion.
const MM_PER_INCH: f64 = 25.4;

/// Unique identifier for a print job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque handle to an image held by an external store (a path on desktop,
/// a content URI on mobile).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRef(pub String);

impl std::fmt::Display for ImageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<PathBuf> for ImageRef {
    fn from(path: PathBuf) -> Self {
        Self(path.display().to_string())
    }
}

// -- Geometry primitives ------------------------------------------------------

/// Width and height of a raster in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelSize {
    pub width: u32,
    pub height: u32,
}

impl PixelSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Integer pixel rectangle (top-left origin, exclusive right/bottom edge).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl IntRect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Floating-point rectangle stored as edges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RectF {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl RectF {
    pub const fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Rectangle of the given size with its top-left corner at the origin.
    pub fn from_size(width: f32, height: f32) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    /// True when the rectangle encloses no area.
    pub fn is_empty(&self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }

    /// Overlap of two rectangles, or `None` when they do not overlap.
    pub fn intersect(&self, other: &RectF) -> Option<RectF> {
        let clipped = RectF::new(
            self.left.max(other.left),
            self.top.max(other.top),
            self.right.min(other.right),
            self.bottom.min(other.bottom),
        );
        (!clipped.is_empty()).then_some(clipped)
    }
}

// -- Paper & layout -----------------------------------------------------------

/// Standard paper sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaperSize {
    A4,
    A3,
    A5,
    Letter,
    Custom { width_mm: u32, height_mm: u32 },
}

impl PaperSize {
    /// Dimensions in millimetres (width, height).
    pub fn dimensions_mm(&self) -> (u32, u32) {
        match self {
            Self::A4 => (210, 297),
            Self::A3 => (297, 420),
            Self::A5 => (148, 210),
            Self::Letter => (216, 279),
            Self::Custom {
                width_mm,
                height_mm,
            } => (*width_mm, *height_mm),
        }
    }

    /// Sheet size in pixels at `dpi`, rounded to the nearest pixel.
    ///
    /// A4 at 300 DPI is 2480 x 3508.
    pub fn pixels_at(&self, dpi: u32) -> PixelSize {
        let (w_mm, h_mm) = self.dimensions_mm();
        let to_px = |mm: u32| (mm as f64 / MM_PER_INCH * dpi as f64).round() as u32;
        PixelSize::new(to_px(w_mm), to_px(h_mm))
    }
}

/// Physical print layout: how many sheets the artwork spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrintType {
    /// One sheet.
    Single,
    /// One column of three sheets, for a forearm or calf.
    Sleeve,
    /// Three by three sheets, for a full back piece.
    Back,
}

impl PrintType {
    /// Grid dimensions as (columns, rows).
    pub fn grid(&self) -> (u32, u32) {
        match self {
            Self::Single => (1, 1),
            Self::Sleeve => (1, 3),
            Self::Back => (3, 3),
        }
    }

    /// Number of physical pages this layout produces.
    pub fn page_count(&self) -> usize {
        let (cols, rows) = self.grid();
        (cols * rows) as usize
    }

    /// Full canvas size for this layout: the sheet size multiplied by the grid.
    pub fn canvas_size(&self, paper: PaperSize, dpi: u32) -> PixelSize {
        let sheet = paper.pixels_at(dpi);
        let (cols, rows) = self.grid();
        PixelSize::new(sheet.width * cols, sheet.height * rows)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Sleeve => "sleeve",
            Self::Back => "back",
        }
    }
}

impl std::fmt::Display for PrintType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// -- Editing ------------------------------------------------------------------

/// Editing mode. Modes are ordered: each one enables every stage of the
/// modes below it.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum EditMode {
    #[default]
    Basic,
    Advanced,
    PostProcess,
    Dotwork,
}

impl EditMode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Advanced => "advanced",
            Self::PostProcess => "post-process",
            Self::Dotwork => "dotwork",
        }
    }
}

impl std::fmt::Display for EditMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-pixel foreground confidence produced by a segmentation model.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentationMask {
    pub width: u32,
    pub height: u32,
    /// Row-major confidences in [0, 1], `width * height` entries.
    pub confidence: Vec<f32>,
}

impl SegmentationMask {
    /// Build a mask, returning `None` if the buffer length does not match the
    /// dimensions.
    pub fn new(width: u32, height: u32, confidence: Vec<f32>) -> Option<Self> {
        (confidence.len() == width as usize * height as usize).then_some(Self {
            width,
            height,
            confidence,
        })
    }

    pub fn size(&self) -> PixelSize {
        PixelSize::new(self.width, self.height)
    }

    /// Confidence at (x, y). Out-of-bounds coordinates read as background.
    pub fn at(&self, x: u32, y: u32) -> f32 {
        if x >= self.width || y >= self.height {
            return 0.0;
        }
        self.confidence[(y * self.width + x) as usize]
    }
}

// -- Print jobs ---------------------------------------------------------------

/// Result reported by a print adapter for a submitted job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrintOutcome {
    /// Every page was delivered.
    Completed { pages: usize },
    /// A page could not be written; pages before it may have been delivered.
    PageFailed { page: usize, reason: String },
    /// The caller cancelled before all pages were delivered.
    Cancelled,
}

/// Lifecycle states of a print job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    /// Created, not started.
    Pending,
    /// Compositing the canvas and slicing pages.
    Rendering,
    /// Handing pages to the print adapter.
    Spooling,
    /// All pages delivered.
    Completed,
    /// Printing failed. See `error_message`.
    Failed,
    /// User cancelled the job.
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// A print job record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintJob {
    pub id: JobId,
    pub job_name: String,
    pub print_type: PrintType,
    pub status: JobStatus,
    /// Number of pages handed to the adapter.
    pub page_count: usize,
    /// SHA-256 hash over the page rasters.
    pub document_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub error_message: Option<String>,
}

impl PrintJob {
    pub fn new(job_name: String, print_type: PrintType) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            job_name,
            print_type,
            status: JobStatus::Pending,
            page_count: 0,
            document_hash: None,
            created_at: now,
            updated_at: now,
            error_message: None,
        }
    }

    /// Move the job to `status`, recording an optional error message.
    pub fn set_status(&mut self, status: JobStatus, error: Option<String>) {
        self.status = status;
        self.error_message = error;
        self.updated_at = Utc::now();
    }
}
