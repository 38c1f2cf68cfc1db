//! # Vote Session
//!
//! The session context owns all mutable state of one voting session and
//! sequences a capture request through it:
//!
//! ```text
//! request ─▶ phase == Idle? ──no──▶ Ignored
//!               │ yes
//!               ▼
//!          budget left? ──no──▶ Rejected(BudgetExhausted), phase stays Idle
//!               │ yes
//!               ▼
//!        Idle -> Rotating ─▶ capture ─▶ upload ─┬─ ok ──▶ consume vote, Rotating -> Shooting
//!                                              │         (settle timer: Shooting -> Idle)
//!                                              └─ err ─▶ error slot, Rotating -> Idle
//! ```
//!
//! Every step of one request happens strictly after the previous one. Requests
//! arriving while the phase is not `Idle` are dropped, not queued. An upload
//! in flight cannot be cancelled: once the phase leaves `Idle` the attempt runs
//! on its own task, and dropping the `request_capture` future only stops the
//! caller from seeing the outcome.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use live_vote::capture::camera::CameraPreview;
//! use live_vote::processing::CapturePipeline;
//! use live_vote::session::VoteSession;
//! use live_vote::upload::HttpUploader;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let session = VoteSession::builder()
//!     .with_votes_max(20)
//!     .with_capture(Arc::new(CapturePipeline::frame(CameraPreview::detached())))
//!     .with_uploader(Arc::new(HttpUploader::new("http://127.0.0.1:5000/api/upload")))
//!     .build()?;
//!
//! let outcome = session.request_capture().await;
//! println!("{outcome:?}, {} votes left", session.votes_remaining());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Local};
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::{DEFAULT_VOTES_MAX, Timings};
use crate::core::{Phase, PhaseMachine, VoteBudget};
use crate::error::{VoteError, VoteResult, classify};
use crate::processing::CaptureStage;
use crate::upload::Uploader;

/// What happened to one capture request.
#[derive(Debug)]
pub enum CaptureOutcome {
    /// The phase was not idle; nothing was done.
    Ignored,
    /// Rejected before any work began.
    Rejected(VoteError),
    /// Capture or upload failed. The vote was not spent.
    Failed(VoteError),
    /// Uploaded and counted.
    Voted {
        votes_remaining: u32,
        response: Value,
    },
}

impl CaptureOutcome {
    pub fn is_voted(&self) -> bool {
        matches!(self, Self::Voted { .. })
    }

    /// The error for `Rejected` and `Failed`.
    pub fn error(&self) -> Option<&VoteError> {
        match self {
            Self::Rejected(error) | Self::Failed(error) => Some(error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttemptStatus {
    Pending,
    Uploaded,
    Failed,
}

/// One in-flight capture, discarded once the upload resolves.
#[derive(Debug)]
struct CaptureAttempt {
    id: u64,
    started_at: DateTime<Local>,
    image_bytes: usize,
    status: AttemptStatus,
}

impl CaptureAttempt {
    fn start(id: u64) -> Self {
        let attempt = Self {
            id,
            started_at: Local::now(),
            image_bytes: 0,
            status: AttemptStatus::Pending,
        };
        debug!(attempt = attempt.id, "capture attempt started");
        attempt
    }

    fn finish(mut self, status: AttemptStatus) {
        self.status = status;
        let elapsed_ms = (Local::now() - self.started_at).num_milliseconds();
        info!(
            attempt = self.id,
            status = ?self.status,
            image_bytes = self.image_bytes,
            elapsed_ms,
            "capture attempt finished"
        );
    }
}

struct SessionInner {
    budget: VoteBudget,
    phase: PhaseMachine,
    error_slot: watch::Sender<Option<String>>,
    last_response: watch::Sender<Option<Value>>,
    vote_confirmed: watch::Sender<bool>,
    confirm_generation: AtomicU64,
    attempts: AtomicU64,
    capture: Arc<dyn CaptureStage>,
    uploader: Arc<dyn Uploader>,
    timings: Timings,
}

/// Session context: vote budget, phase and error slot, plus the capture and
/// upload stages they coordinate. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct VoteSession {
    inner: Arc<SessionInner>,
}

impl VoteSession {
    /// Create a new session using the builder pattern.
    pub fn builder() -> VoteSessionBuilder {
        VoteSessionBuilder::new()
    }

    pub fn phase(&self) -> Phase {
        self.inner.phase.current()
    }

    /// Receiver that observes every phase change.
    pub fn subscribe_phase(&self) -> watch::Receiver<Phase> {
        self.inner.phase.subscribe()
    }

    pub fn votes_remaining(&self) -> u32 {
        self.inner.budget.remaining()
    }

    pub fn votes_max(&self) -> u32 {
        self.inner.budget.max()
    }

    pub fn can_capture(&self) -> bool {
        self.inner.budget.can_capture()
    }

    /// Current content of the user-visible error slot.
    pub fn error(&self) -> Option<String> {
        self.inner.error_slot.borrow().clone()
    }

    pub fn subscribe_error(&self) -> watch::Receiver<Option<String>> {
        self.inner.error_slot.subscribe()
    }

    pub fn clear_error(&self) {
        self.inner.error_slot.send_replace(None);
    }

    /// Body of the most recent successful upload.
    pub fn last_response(&self) -> Option<Value> {
        self.inner.last_response.borrow().clone()
    }

    /// `true` while the "vote confirmed" indicator is shown.
    pub fn vote_confirmed(&self) -> bool {
        *self.inner.vote_confirmed.borrow()
    }

    pub fn subscribe_vote_confirmed(&self) -> watch::Receiver<bool> {
        self.inner.vote_confirmed.subscribe()
    }

    /// Handle one user-initiated capture request.
    pub async fn request_capture(&self) -> CaptureOutcome {
        let inner = &self.inner;

        if inner.phase.current() != Phase::Idle {
            debug!(phase = %inner.phase.current(), "capture request ignored");
            return CaptureOutcome::Ignored;
        }

        if let Err(error) = inner.budget.check() {
            warn!(max = inner.budget.max(), "capture rejected, no votes left");
            inner.error_slot.send_replace(Some(error.user_message()));
            return CaptureOutcome::Rejected(error);
        }

        if !inner.phase.try_begin() {
            return CaptureOutcome::Ignored;
        }

        // The attempt runs on its own task so a dropped caller cannot strand
        // the phase in Rotating.
        let session = self.clone();
        match tokio::spawn(async move { session.run_attempt().await }).await {
            Ok(outcome) => outcome,
            Err(join_error) => {
                let error = VoteError::state("rotating", "capture_attempt")
                    .with_operation(format!("capture task aborted: {join_error}"));
                self.fail(error)
            }
        }
    }

    async fn run_attempt(&self) -> CaptureOutcome {
        let inner = &self.inner;
        inner.error_slot.send_replace(None);
        inner.last_response.send_replace(None);

        let mut attempt = CaptureAttempt::start(inner.attempts.fetch_add(1, Ordering::Relaxed) + 1);
        match self.capture_and_upload(&mut attempt).await {
            Ok(response) => {
                attempt.finish(AttemptStatus::Uploaded);
                self.confirm(response)
            }
            Err(error) => {
                attempt.finish(AttemptStatus::Failed);
                self.fail(error)
            }
        }
    }

    async fn capture_and_upload(&self, attempt: &mut CaptureAttempt) -> VoteResult<Value> {
        let payload = self.inner.capture.capture().await?;
        attempt.image_bytes = payload.image.len();
        self.inner.uploader.upload(payload).await.into_result()
    }

    fn confirm(&self, response: Value) -> CaptureOutcome {
        let inner = &self.inner;
        inner.budget.consume();
        inner.phase.resolve_success();
        inner.last_response.send_replace(Some(response.clone()));
        inner.vote_confirmed.send_replace(true);

        let votes_remaining = inner.budget.remaining();
        info!(votes_remaining, votes_max = inner.budget.max(), "vote confirmed");

        self.schedule_settle();
        self.schedule_confirm_clear();

        CaptureOutcome::Voted {
            votes_remaining,
            response,
        }
    }

    fn fail(&self, error: VoteError) -> CaptureOutcome {
        warn!(
            category = error.category(),
            transient = classify::is_transient(&error),
            error = %error,
            "capture attempt failed"
        );
        self.inner.error_slot.send_replace(Some(error.user_message()));
        self.inner.phase.resolve_failure();
        CaptureOutcome::Failed(error)
    }

    // Timers hold a weak handle; a dropped session lets them lapse.
    fn schedule_settle(&self) {
        let delay = self.inner.timings.settle_delay;
        let inner = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = inner.upgrade() {
                inner.phase.settle();
            }
        });
    }

    fn schedule_confirm_clear(&self) {
        let generation = self.inner.confirm_generation.fetch_add(1, Ordering::AcqRel) + 1;
        let delay = self.inner.timings.confirm_display;
        let inner = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(inner) = inner.upgrade() else {
                return;
            };
            // A newer confirmation owns the indicator now
            if inner.confirm_generation.load(Ordering::Acquire) == generation {
                inner.vote_confirmed.send_replace(false);
            }
        });
    }
}

/// Builder for creating vote sessions with fluent API.
pub struct VoteSessionBuilder {
    votes_max: u32,
    timings: Timings,
    capture: Option<Arc<dyn CaptureStage>>,
    uploader: Option<Arc<dyn Uploader>>,
}

impl Default for VoteSessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl VoteSessionBuilder {
    pub fn new() -> Self {
        Self {
            votes_max: DEFAULT_VOTES_MAX,
            timings: Timings::default(),
            capture: None,
            uploader: None,
        }
    }

    pub fn with_votes_max(mut self, votes_max: u32) -> Self {
        self.votes_max = votes_max;
        self
    }

    pub fn with_timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    /// Set the stage that produces capture payloads.
    pub fn with_capture(mut self, capture: Arc<dyn CaptureStage>) -> Self {
        self.capture = Some(capture);
        self
    }

    pub fn with_uploader(mut self, uploader: Arc<dyn Uploader>) -> Self {
        self.uploader = Some(uploader);
        self
    }

    /// Build the session with a full budget and the phase at `Idle`.
    pub fn build(self) -> VoteResult<VoteSession> {
        if self.votes_max == 0 {
            return Err(VoteError::config("votes_max", "must be greater than 0"));
        }
        let capture = self
            .capture
            .ok_or_else(|| VoteError::config("capture", "no capture stage specified"))?;
        let uploader = self
            .uploader
            .ok_or_else(|| VoteError::config("uploader", "no uploader specified"))?;

        let (error_slot, _) = watch::channel(None);
        let (last_response, _) = watch::channel(None);
        let (vote_confirmed, _) = watch::channel(false);

        Ok(VoteSession {
            inner: Arc::new(SessionInner {
                budget: VoteBudget::new(self.votes_max),
                phase: PhaseMachine::new(),
                error_slot,
                last_response,
                vote_confirmed,
                confirm_generation: AtomicU64::new(0),
                attempts: AtomicU64::new(0),
                capture,
                uploader,
                timings: self.timings,
            }),
        })
    }
}
