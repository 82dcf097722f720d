// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// tsp-pipeline: The staged edit pipeline and the state around it.
//
// `pipeline` runs the fixed stage order (basic -> sketch -> post-process ->
// final) with a per-stage cache; `session` turns editor events into new
// immutable states plus effects; `worker` debounces recompute requests and
// runs only the latest one.

pub mod cache;
pub mod pipeline;
pub mod session;
pub mod worker;

pub use pipeline::{Pipeline, PipelineOutput, PipelineRequest, PipelineSettings, SketchFilter};
pub use session::{EditEffect, EditEvent, EditState, FlipAxis, reduce};
pub use worker::{DisplayState, PipelineWorker};
