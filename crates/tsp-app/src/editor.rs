// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Editor driver: folds edit events through the session reducer and feeds
// recompute effects to the background worker.

use tokio::sync::watch;
use tracing::{debug, info};
use tsp_core::PrintType;
use tsp_pipeline::{DisplayState, EditEffect, EditEvent, EditState, PipelineWorker, reduce};

/// One open editing session.
pub struct Editor {
    state: EditState,
    worker: PipelineWorker,
    /// Version of the newest recompute handed to the worker.
    requested: u64,
    notices: Vec<String>,
    save_requested: bool,
    print_requested: Option<PrintType>,
}

impl Editor {
    pub fn new(worker: PipelineWorker) -> Self {
        Self {
            state: EditState::default(),
            worker,
            requested: 0,
            notices: Vec::new(),
            save_requested: false,
            print_requested: None,
        }
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    /// Apply `event` and carry out its effects.
    pub fn dispatch(&mut self, event: EditEvent) {
        let (next, effects) = reduce(&self.state, event);
        self.state = next;
        for effect in effects {
            match effect {
                EditEffect::Recompute(request) => {
                    self.requested = request.state_version;
                    self.worker.submit(request);
                }
                EditEffect::Notify(message) => {
                    info!(%message, "Editor notice");
                    self.notices.push(message);
                }
                EditEffect::Save => self.save_requested = true,
                EditEffect::OpenPrintPreview(print_type) => self.print_requested = Some(print_type),
            }
        }
    }

    /// Messages raised by events so far, oldest first. Draining.
    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }

    /// Whether a save was accepted since the last call. Draining.
    pub fn take_save_request(&mut self) -> bool {
        std::mem::take(&mut self.save_requested)
    }

    /// Layout of an accepted print request since the last call. Draining.
    pub fn take_print_request(&mut self) -> Option<PrintType> {
        self.print_requested.take()
    }

    /// Wait until the newest recompute has finished and return what is shown.
    pub async fn settle(&self) -> Result<DisplayState, watch::error::RecvError> {
        let requested = self.requested;
        let mut rx = self.worker.subscribe();
        let shown = rx.wait_for(|d| d.settled >= requested && !d.processing).await?.clone();
        debug!(version = shown.version, requested, "Editor settled");
        Ok(shown)
    }

    pub async fn close(self) {
        self.worker.shutdown().await;
    }
}
