//! Background jobs: screenshot + backend round trips, session reset and status.
//!
//! Each job runs on its own thread and reports back through a channel the UI
//! drains once per frame.

use crate::backend::{BackendClient, TaskResponse};
use crate::capture::ScreenshotProvider;
use crate::error::Result;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Gives the overlay a frame to drop the marker before the screen is captured.
const SETTLE_DELAY: Duration = Duration::from_millis(150);

/// Identifies one outstanding request. Replies carrying any other token are stale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(pub u64);

impl RequestToken {
    pub fn next(self) -> Self {
        RequestToken(self.0 + 1)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestKind {
    Initialize { query: String },
    Update,
}

impl RequestKind {
    pub fn endpoint(&self) -> &'static str {
        match self {
            RequestKind::Initialize { .. } => "/initialize",
            RequestKind::Update => "/update_screenshot",
        }
    }
}

#[derive(Clone, Debug)]
pub struct RoundOutcome {
    pub response: TaskResponse,
    /// Width in pixels of the screenshot the response refers to.
    pub capture_width: u32,
}

#[derive(Debug)]
pub struct WorkerReply {
    pub token: RequestToken,
    pub outcome: Result<RoundOutcome>,
}

/// Captures the screen then calls the endpoint matching `kind`.
pub fn run_round(
    backend: &BackendClient,
    screenshots: &dyn ScreenshotProvider,
    kind: &RequestKind,
) -> Result<RoundOutcome> {
    let shot = screenshots.capture()?;
    debug!("{}: sending {}x{} screenshot", kind.endpoint(), shot.width, shot.height);
    let response = match kind {
        RequestKind::Initialize { query } => backend.initialize(query, &shot.png_base64)?,
        RequestKind::Update => backend.update_screenshot(&shot.png_base64)?,
    };
    Ok(RoundOutcome { response, capture_width: shot.width })
}

/// Last status line fetched from the backend; one fetch at a time.
#[derive(Default)]
pub struct StatusBoard {
    loading: AtomicBool,
    text: Mutex<Option<String>>,
}

impl StatusBoard {
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Relaxed)
    }

    pub fn text(&self) -> Option<String> {
        self.text.lock().clone()
    }

    fn clear(&self) {
        self.text.lock().take();
    }
}

pub struct RequestWorker {
    backend: Arc<BackendClient>,
    screenshots: Arc<dyn ScreenshotProvider>,
    replies_tx: Sender<WorkerReply>,
    replies_rx: Receiver<WorkerReply>,
    status: Arc<StatusBoard>,
}

impl RequestWorker {
    pub fn new(backend: Arc<BackendClient>, screenshots: Arc<dyn ScreenshotProvider>) -> Self {
        let (replies_tx, replies_rx) = crossbeam_channel::unbounded();
        Self {
            backend,
            screenshots,
            replies_tx,
            replies_rx,
            status: Arc::new(StatusBoard::default()),
        }
    }

    pub fn status(&self) -> &Arc<StatusBoard> {
        &self.status
    }

    pub fn dispatch(&self, token: RequestToken, kind: RequestKind) {
        let backend = Arc::clone(&self.backend);
        let screenshots = Arc::clone(&self.screenshots);
        let tx = self.replies_tx.clone();
        info!("request {:?} -> {}", token, kind.endpoint());

        thread::spawn(move || {
            thread::sleep(SETTLE_DELAY);
            let outcome = run_round(&backend, screenshots.as_ref(), &kind);
            match &outcome {
                Err(e) if e.is_transport() => warn!("request {:?} failed: {}", token, e),
                Err(e) => error!("request {:?} failed: {}", token, e),
                Ok(_) => {}
            }
            // The UI may already be gone on shutdown.
            let _ = tx.send(WorkerReply { token, outcome });
        });
    }

    pub fn poll(&self) -> Vec<WorkerReply> {
        self.replies_rx.try_iter().collect()
    }

    /// Fire-and-forget `POST /reset`. The old status line goes with the session.
    pub fn reset_session(&self) {
        self.status.clear();
        let backend = Arc::clone(&self.backend);
        thread::spawn(move || match backend.reset() {
            Ok(ack) => info!("backend reset: {}", ack.message),
            Err(e) => warn!("backend reset failed: {}", e),
        });
    }

    /// Returns false when a status fetch is already running.
    pub fn fetch_status(&self) -> bool {
        if self.status.loading.swap(true, Ordering::AcqRel) {
            return false;
        }
        let backend = Arc::clone(&self.backend);
        let status = Arc::clone(&self.status);
        thread::spawn(move || {
            let line = match backend.status() {
                Ok(info) => info.summary(),
                Err(e) => format!("Status unavailable: {e}"),
            };
            debug!("status: {}", line);
            *status.text.lock() = Some(line);
            status.loading.store(false, Ordering::Release);
        });
        true
    }

    pub fn check_health(&self) {
        let backend = Arc::clone(&self.backend);
        thread::spawn(move || match backend.health() {
            Ok(h) => info!("backend at {} is {}", backend.base_url(), h.status),
            Err(e) => warn!("backend at {} unreachable: {}", backend.base_url(), e),
        });
    }
}
