// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Background recompute worker.
//
// Requests land in a single-slot `watch` mailbox, so a burst of slider
// events collapses to the newest one. The worker waits for the mailbox to
// stay quiet for the debounce window, then runs the pipeline on the blocking
// pool. A request arriving mid-run cancels the run in flight; its output is
// discarded and the newest request is processed instead. Results are
// published on a second `watch` channel the UI subscribes to.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use image::RgbaImage;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use tsp_core::error::{Result, TspError};
use tsp_core::human_errors::humanize_error;
use tsp_core::CancelFlag;

use crate::pipeline::{Pipeline, PipelineOutput, PipelineRequest};

/// What the editor should currently show.
#[derive(Debug, Clone, Default)]
pub struct DisplayState {
    pub committed: Option<Arc<RgbaImage>>,
    pub preview: Option<Arc<RgbaImage>>,
    /// Edit-state version the images were produced from.
    pub version: u64,
    pub processing: bool,
    pub notification: Option<String>,
    /// Newest request version whose run has finished, successfully or not.
    pub settled: u64,
}

/// Handle to the debounced recompute task.
pub struct PipelineWorker {
    requests: watch::Sender<Option<PipelineRequest>>,
    display: watch::Receiver<DisplayState>,
    task: JoinHandle<()>,
}

impl PipelineWorker {
    /// Spawn the worker on the current tokio runtime.
    pub fn spawn(pipeline: Pipeline, debounce: Duration) -> Self {
        let (requests, request_rx) = watch::channel(None);
        let (display_tx, display) = watch::channel(DisplayState::default());
        let pipeline = Arc::new(Mutex::new(pipeline));
        let task = tokio::spawn(run_loop(pipeline, request_rx, display_tx, debounce));
        info!(debounce_ms = debounce.as_millis() as u64, "Pipeline worker started");
        Self {
            requests,
            display,
            task,
        }
    }

    /// Queue a recompute. Replaces any request that has not started yet.
    pub fn submit(&self, request: PipelineRequest) {
        debug!(version = request.state_version, "Recompute requested");
        self.requests.send_replace(Some(request));
    }

    pub fn subscribe(&self) -> watch::Receiver<DisplayState> {
        self.display.clone()
    }

    /// Latest published display state.
    pub fn current(&self) -> DisplayState {
        self.display.borrow().clone()
    }

    /// Close the mailbox and wait for the task to finish its current run.
    pub async fn shutdown(self) {
        drop(self.requests);
        if let Err(e) = self.task.await {
            warn!(error = %e, "Pipeline worker ended abnormally");
        }
    }
}

enum RunEnd {
    Finished(u64, Result<PipelineOutput>),
    Superseded,
    Closed,
}

async fn run_loop(
    pipeline: Arc<Mutex<Pipeline>>,
    mut requests: watch::Receiver<Option<PipelineRequest>>,
    display: watch::Sender<DisplayState>,
    debounce: Duration,
) {
    while requests.changed().await.is_ok() {
        loop {
            if !settle(&mut requests, debounce).await {
                return;
            }
            let Some(request) = requests.borrow_and_update().clone() else {
                break;
            };
            display.send_modify(|state| state.processing = true);

            match run_once(&pipeline, &mut requests, request).await {
                RunEnd::Finished(version, result) => {
                    publish(&display, version, result);
                    break;
                }
                RunEnd::Superseded => continue,
                RunEnd::Closed => {
                    display.send_modify(|state| state.processing = false);
                    return;
                }
            }
        }
    }
    debug!("Pipeline worker mailbox closed");
}

/// Wait until the mailbox has been quiet for `debounce`. Returns `false` once
/// every sender is gone.
async fn settle(requests: &mut watch::Receiver<Option<PipelineRequest>>, debounce: Duration) -> bool {
    loop {
        tokio::select! {
            () = tokio::time::sleep(debounce) => return true,
            changed = requests.changed() => {
                if changed.is_err() {
                    return false;
                }
            }
        }
    }
}

async fn run_once(
    pipeline: &Arc<Mutex<Pipeline>>,
    requests: &mut watch::Receiver<Option<PipelineRequest>>,
    request: PipelineRequest,
) -> RunEnd {
    let cancel = CancelFlag::new();
    let version = request.state_version;
    let mut job = {
        let pipeline = Arc::clone(pipeline);
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || {
            let mut pipeline = pipeline.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            pipeline.run(&request, &cancel)
        })
    };

    let superseded = tokio::select! {
        joined = &mut job => {
            return RunEnd::Finished(
                version,
                joined.unwrap_or_else(|e| Err(TspError::Filter(format!("pipeline task: {e}")))),
            );
        }
        changed = requests.changed() => changed.is_ok(),
    };

    cancel.cancel();
    // The blocking run holds the pipeline lock; wait so the next run sees a
    // consistent cache.
    let _ = job.await;
    debug!(version, "Run superseded by a newer request");
    if superseded { RunEnd::Superseded } else { RunEnd::Closed }
}

fn publish(display: &watch::Sender<DisplayState>, version: u64, result: Result<PipelineOutput>) {
    display.send_modify(|state| {
        state.processing = false;
        state.settled = state.settled.max(version);
        match result {
            Ok(output) if output.state_version >= state.version => {
                state.committed = Some(output.committed);
                state.preview = Some(output.preview);
                state.version = output.state_version;
                state.notification =
                    (!output.notices.is_empty()).then(|| output.notices.join("\n"));
            }
            Ok(output) => {
                debug!(stale = output.state_version, shown = state.version, "Dropped stale output");
            }
            Err(TspError::Cancelled) => {}
            Err(e) => {
                warn!(error = %e, "Pipeline run failed; keeping last output");
                state.notification = Some(humanize_error(&e).one_line());
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    use image::Rgba;
    use tsp_bridge::stub::StubBridge;
    use tsp_bridge::{SegmentationAdapter, SegmentationSession};
    use tsp_core::{EditMode, EditParams, FilterKind};
    use tsp_filters::TextureSet;

    use crate::pipeline::PipelineSettings;

    fn worker(debounce_ms: u64) -> PipelineWorker {
        let pipeline = Pipeline::new(
            Arc::new(StubBridge),
            TextureSet::procedural(1),
            PipelineSettings::default(),
        );
        PipelineWorker::spawn(pipeline, Duration::from_millis(debounce_ms))
    }

    fn request(base: &Arc<RgbaImage>, version: u64, brightness: f32) -> PipelineRequest {
        PipelineRequest {
            base: Arc::clone(base),
            base_version: 1,
            params: EditParams::default().with(FilterKind::Brightness, brightness),
            mode: EditMode::Basic,
            state_version: version,
        }
    }

    /// Segmenter that blocks inside `open` until released, so a run can be
    /// held in flight.
    struct GatedSegmenter {
        entered: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl SegmentationAdapter for GatedSegmenter {
        fn open(&self) -> Result<Box<dyn SegmentationSession>> {
            let _ = self.entered.lock().unwrap().send(());
            let _ = self.release.lock().unwrap().recv();
            Err(TspError::Segmentation("released".into()))
        }
    }

    struct Gate {
        entered: mpsc::Receiver<()>,
        release: mpsc::Sender<()>,
    }

    impl Gate {
        async fn wait_entered(self) -> mpsc::Sender<()> {
            let Gate { entered, release } = self;
            tokio::task::spawn_blocking(move || entered.recv())
                .await
                .unwrap()
                .unwrap();
            release
        }
    }

    fn gated_worker() -> (PipelineWorker, Gate) {
        let (entered_tx, entered) = mpsc::channel();
        let (release, release_rx) = mpsc::channel();
        let segmenter = GatedSegmenter {
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        };
        let pipeline = Pipeline::new(
            Arc::new(segmenter),
            TextureSet::procedural(1),
            PipelineSettings::default(),
        );
        (PipelineWorker::spawn(pipeline, Duration::from_millis(1)), Gate { entered, release })
    }

    #[tokio::test]
    async fn burst_settles_on_the_last_request() {
        let worker = worker(20);
        let base = Arc::new(RgbaImage::from_pixel(32, 32, Rgba([100, 100, 100, 255])));
        for (version, brightness) in (1..=10).zip([2.0, 4.0, 6.0, 8.0, 10.0, 12.0, 14.0, 16.0, 18.0, 20.0]) {
            worker.submit(request(&base, version, brightness));
        }

        let mut rx = worker.subscribe();
        let shown = rx
            .wait_for(|s| s.version == 10 && !s.processing)
            .await
            .expect("worker alive")
            .clone();
        let committed = shown.committed.expect("committed image");
        // brightness 20 shifts by round(20 * 1.27) = 25
        assert_eq!(committed.get_pixel(0, 0).0, [125, 125, 125, 255]);
        assert!(shown.notification.is_none());
        worker.shutdown().await;
    }

    #[tokio::test]
    async fn failure_notice_is_published_with_the_output() {
        let worker = worker(1);
        let base = Arc::new(RgbaImage::from_pixel(8, 8, Rgba([10, 10, 10, 255])));
        let mut req = request(&base, 3, 0.0);
        req.params.set_remove_background(true);
        worker.submit(req);

        let mut rx = worker.subscribe();
        let shown = rx
            .wait_for(|s| s.version == 3 && !s.processing)
            .await
            .expect("worker alive")
            .clone();
        assert!(shown.committed.is_some());
        assert!(shown.notification.is_some());
        worker.shutdown().await;
    }

    #[tokio::test]
    async fn newer_request_preempts_the_run_in_flight() {
        let (worker, gate) = gated_worker();
        let base = Arc::new(RgbaImage::from_pixel(16, 16, Rgba([100, 100, 100, 255])));

        let mut rx = worker.subscribe();
        let watcher = tokio::spawn(async move {
            let mut seen = Vec::new();
            while rx.changed().await.is_ok() {
                let state = rx.borrow_and_update().clone();
                seen.push(state.version);
                if state.version == 2 && !state.processing {
                    break;
                }
            }
            seen
        });

        let mut slow = request(&base, 1, 0.0);
        slow.params.set_remove_background(true);
        worker.submit(slow);
        let release = gate.wait_entered().await;

        // Version 1 is blocked in the segmenter; version 2 replaces it.
        worker.submit(request(&base, 2, 20.0));
        tokio::time::sleep(Duration::from_millis(20)).await;
        release.send(()).unwrap();

        let seen = watcher.await.unwrap();
        assert!(!seen.contains(&1), "superseded output was published: {seen:?}");
        let shown = worker.current();
        assert_eq!(shown.version, 2);
        assert_eq!(shown.settled, 2);
        assert!(shown.notification.is_none());
        assert_eq!(shown.committed.unwrap().get_pixel(0, 0).0, [125, 125, 125, 255]);
        worker.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_mid_run_clears_processing() {
        let (worker, gate) = gated_worker();
        let base = Arc::new(RgbaImage::from_pixel(4, 4, Rgba([50, 50, 50, 255])));
        let mut slow = request(&base, 1, 0.0);
        slow.params.set_remove_background(true);
        worker.submit(slow);
        let release = gate.wait_entered().await;

        let rx = worker.subscribe();
        assert!(rx.borrow().processing);
        let closing = tokio::spawn(worker.shutdown());
        tokio::time::sleep(Duration::from_millis(20)).await;
        release.send(()).unwrap();
        closing.await.unwrap();

        let state = rx.borrow();
        assert!(!state.processing);
        assert!(state.committed.is_none());
    }

    #[tokio::test]
    async fn shutdown_without_requests_returns() {
        let worker = worker(5);
        assert!(worker.current().committed.is_none());
        worker.shutdown().await;
    }

    #[test]
    fn stale_output_does_not_replace_newer_display() {
        let (tx, rx) = watch::channel(DisplayState {
            version: 5,
            ..DisplayState::default()
        });
        let img = Arc::new(RgbaImage::new(1, 1));
        publish(
            &tx,
            4,
            Ok(PipelineOutput {
                committed: Arc::clone(&img),
                preview: img,
                state_version: 4,
                notices: Vec::new(),
            }),
        );
        assert!(rx.borrow().committed.is_none());
        assert_eq!(rx.borrow().version, 5);
    }

    #[test]
    fn error_keeps_last_images() {
        let img = Arc::new(RgbaImage::new(1, 1));
        let (tx, rx) = watch::channel(DisplayState {
            committed: Some(Arc::clone(&img)),
            preview: Some(img),
            version: 2,
            processing: true,
            notification: None,
            settled: 2,
        });
        publish(&tx, 3, Err(TspError::Segmentation("model missing".into())));
        let state = rx.borrow();
        assert!(state.committed.is_some());
        assert!(!state.processing);
        assert!(state.notification.is_some());
        assert_eq!(state.settled, 3);
    }
}
