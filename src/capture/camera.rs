//! # Camera Acquisition
//!
//! [`CameraManager`] owns at most one live [`VideoStream`]. Activation walks an
//! ordered list of constraints and keeps the first stream the platform grants:
//!
//! 1. exact rear-facing camera
//! 2. rear-facing preferred, but not required
//! 3. any camera
//!
//! A rejected preference is never retried. If all three are rejected the manager
//! reports [`VoteError::CameraUnavailable`] and stays streamless; the rest of the
//! widget keeps working and only frame capture becomes unavailable.
//!
//! The display side gets a [`CameraPreview`], which holds a weak reference and
//! can never keep a released stream alive.

use std::sync::{Arc, Weak};

use anyhow::Result;
use async_trait::async_trait;
use image::RgbaImage;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{VoteError, VoteResult};

/// Which way the acquired camera faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacingPreference {
    Back,
    Default,
}

/// Facing requirement of one acquisition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacingConstraint {
    /// Must be the rear camera.
    ExactBack,
    /// Rear camera if the platform has one.
    PreferBack,
    /// Whatever the platform offers.
    Any,
}

/// Constraints for one request to the platform camera API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraConstraints {
    pub facing: FacingConstraint,
    /// Always `false`: the widget only needs video.
    pub audio: bool,
}

impl CameraConstraints {
    /// Video-only request with the given facing requirement.
    pub fn video(facing: FacingConstraint) -> Self {
        Self {
            facing,
            audio: false,
        }
    }

    /// The fallback chain, most specific first.
    pub fn preference_order() -> [Self; 3] {
        [
            Self::video(FacingConstraint::ExactBack),
            Self::video(FacingConstraint::PreferBack),
            Self::video(FacingConstraint::Any),
        ]
    }

    /// Facing the stream is reported as when granted under these constraints.
    pub fn facing_preference(&self) -> FacingPreference {
        match self.facing {
            FacingConstraint::ExactBack | FacingConstraint::PreferBack => FacingPreference::Back,
            FacingConstraint::Any => FacingPreference::Default,
        }
    }
}

/// An active video source handed out by a [`CameraBackend`].
pub trait VideoStream: Send + Sync {
    /// Human-readable device label for logs.
    fn label(&self) -> &str;

    /// `false` once every track has been stopped.
    fn is_active(&self) -> bool;

    /// Latest frame at the source's native resolution, if one is ready.
    fn current_frame(&self) -> Option<RgbaImage>;

    /// Stop all tracks. Returns how many tracks this call stopped, so a
    /// second call returns 0.
    fn stop_tracks(&self) -> usize;
}

/// Platform camera API.
#[async_trait]
pub trait CameraBackend: Send + Sync {
    /// Request a stream matching `constraints`.
    async fn open(&self, constraints: &CameraConstraints) -> Result<Arc<dyn VideoStream>>;
}

type PublishedStream = Option<Weak<dyn VideoStream>>;

/// Read-only view of the active stream for display and frame capture.
#[derive(Clone)]
pub struct CameraPreview {
    rx: watch::Receiver<PublishedStream>,
}

impl CameraPreview {
    /// A preview that never shows anything, for widgets without a camera.
    pub fn detached() -> Self {
        let (_tx, rx) = watch::channel(None);
        Self { rx }
    }

    fn stream(&self) -> Option<Arc<dyn VideoStream>> {
        self.rx.borrow().as_ref().and_then(Weak::upgrade)
    }

    /// `true` while an active stream is published.
    pub fn is_live(&self) -> bool {
        self.stream().is_some_and(|stream| stream.is_active())
    }

    /// Grab the current frame of the active stream.
    pub fn current_frame(&self) -> VoteResult<RgbaImage> {
        let stream = self
            .stream()
            .filter(|stream| stream.is_active())
            .ok_or_else(|| VoteError::frame_unavailable("no active camera stream"))?;

        stream.current_frame().ok_or_else(|| {
            VoteError::frame_unavailable(format!("{} has not produced a frame yet", stream.label()))
        })
    }
}

/// Exclusive owner of the widget's camera stream.
pub struct CameraManager {
    backend: Arc<dyn CameraBackend>,
    stream: Option<Arc<dyn VideoStream>>,
    facing: Option<FacingPreference>,
    published: watch::Sender<PublishedStream>,
}

impl CameraManager {
    pub fn new(backend: Arc<dyn CameraBackend>) -> Self {
        let (published, _rx) = watch::channel(None);
        Self {
            backend,
            stream: None,
            facing: None,
            published,
        }
    }

    /// Non-owning handle for the rendering surface.
    pub fn preview(&self) -> CameraPreview {
        CameraPreview {
            rx: self.published.subscribe(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.stream.as_ref().is_some_and(|stream| stream.is_active())
    }

    /// Facing of the active stream, `None` when there is none.
    pub fn facing(&self) -> Option<FacingPreference> {
        self.stream.as_ref().and(self.facing)
    }

    /// Acquire a stream, walking the preference chain.
    ///
    /// Any previously held stream is released first.
    pub async fn activate(&mut self) -> VoteResult<FacingPreference> {
        self.deactivate();

        let mut rejections = Vec::new();
        for constraints in CameraConstraints::preference_order() {
            match self.backend.open(&constraints).await {
                Ok(stream) => {
                    let facing = constraints.facing_preference();
                    info!(
                        device = stream.label(),
                        facing = ?facing,
                        constraint = ?constraints.facing,
                        "camera stream acquired"
                    );
                    self.published.send_replace(Some(Arc::downgrade(&stream)));
                    self.stream = Some(stream);
                    self.facing = Some(facing);
                    return Ok(facing);
                }
                Err(e) => {
                    debug!(constraint = ?constraints.facing, error = %e, "camera preference rejected");
                    rejections.push(format!("{:?}: {e}", constraints.facing));
                }
            }
        }

        warn!("camera unavailable, continuing without preview");
        Err(VoteError::camera_unavailable(rejections.join("; "))
            .with_operation("camera_activate")
            .with_recovery_suggestion("Allow camera access and reload the widget"))
    }

    /// Stop every track of the active stream. A no-op without one.
    ///
    /// Returns the number of tracks stopped.
    pub fn deactivate(&mut self) -> usize {
        let Some(stream) = self.stream.take() else {
            return 0;
        };
        self.facing = None;
        self.published.send_replace(None);

        let stopped = stream.stop_tracks();
        info!(device = stream.label(), tracks = stopped, "camera stream released");
        stopped
    }
}

impl Drop for CameraManager {
    fn drop(&mut self) {
        self.deactivate();
    }
}
