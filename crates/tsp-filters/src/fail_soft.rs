// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fail-soft stage runner. A failing filter never takes the editor down: the
// stage's input is passed through and the failure is logged and reported.

use std::panic::{AssertUnwindSafe, catch_unwind};

use image::RgbaImage;
use tracing::warn;
use tsp_core::error::{Result, TspError};

/// Output of a fail-soft stage.
#[derive(Debug)]
pub struct StageOutput {
    pub image: RgbaImage,
    /// Set when the stage failed and `image` is the unmodified input.
    pub failure: Option<TspError>,
}

impl StageOutput {
    pub fn into_image(self) -> RgbaImage {
        self.image
    }
}

/// Run `filter` on `input`. On `Err`, panic, or a dimension change the input
/// is returned unchanged and the failure recorded.
pub fn fail_soft<F>(stage: &'static str, input: &RgbaImage, filter: F) -> StageOutput
where
    F: FnOnce(&RgbaImage) -> Result<RgbaImage>,
{
    let failure = match catch_unwind(AssertUnwindSafe(|| filter(input))) {
        Ok(Ok(image)) if image.dimensions() == input.dimensions() => {
            return StageOutput {
                image,
                failure: None,
            };
        }
        Ok(Ok(image)) => TspError::DimensionMismatch {
            expected: input.dimensions(),
            actual: image.dimensions(),
        },
        Ok(Err(err)) => err,
        Err(_) => TspError::Filter(format!("{stage} panicked")),
    };

    warn!(stage, error = %failure, "Stage failed; returning input unchanged");
    StageOutput {
        image: input.clone(),
        failure: Some(failure),
    }
}
