// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// tsp-print: from an edited image to physical sheets.
//
// `geometry` maps the preview's pan/zoom onto the print canvas, `compositor`
// renders the full-area canvas, `slicer` cuts it into crop-marked sheets,
// `pdf` and `spool` write sheets to a PDF file, and `job` runs the whole
// chain as a cancellable background task.

pub mod compositor;
pub mod geometry;
pub mod job;
pub mod pdf;
pub mod slicer;
pub mod spool;

pub use compositor::render_full_area;
pub use geometry::{Pan, PositioningInfo, ViewTransform, ViewportSize, compute_positioning, grid_lines};
pub use job::{PreviewView, PrintProgress, PrintRequest, PrintStage, PrintTask, run_print};
pub use slicer::{CropMarkStyle, PrintablePage, slice};
pub use spool::PdfSpooler;
