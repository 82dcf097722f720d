// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// TSP: Core types, edit parameters, and error definitions shared across all crates.

pub mod cancel;
pub mod config;
pub mod error;
pub mod human_errors;
pub mod params;
pub mod types;

pub use cancel::CancelFlag;
pub use config::AppConfig;
pub use error::TspError;
pub use params::{EditParams, FilterKind};
pub use types::*;
