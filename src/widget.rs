//! # Vote Widget
//!
//! Wires the camera, the capture pipeline, the session and the onboarding
//! walkthrough into one component driven by user gestures.
//!
//! Endpoint, trigger gesture and theme are all read from [`WidgetConfig`];
//! there is one widget, parameterized, rather than one per variant.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::capture::camera::{CameraBackend, CameraManager, CameraPreview, FacingPreference};
use crate::capture::surface::{CaptureLibraryLoader, SurfaceCapture};
use crate::config::{CaptureMode, Theme, TriggerMode, WidgetConfig};
use crate::error::{VoteError, VoteResult};
use crate::onboarding::{Onboarding, OnboardingStep};
use crate::processing::CapturePipeline;
use crate::session::{CaptureOutcome, VoteSession};
use crate::upload::Uploader;

/// Raw user input on the vote button.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    Tap,
    /// Pointer travel in logical pixels; negative `dy` is upward.
    Swipe { dx: f32, dy: f32 },
}

/// What a gesture led to.
#[derive(Debug)]
pub enum TriggerResult {
    /// Not the configured trigger, or nothing listens right now.
    Ignored,
    /// Drove the practice vote. `false` if one was already playing.
    Practice(bool),
    /// Drove a real capture request.
    Capture(CaptureOutcome),
}

/// `true` if `gesture` is the configured trigger.
pub fn matches_trigger(trigger: TriggerMode, gesture: Gesture) -> bool {
    match (trigger, gesture) {
        (TriggerMode::Tap, Gesture::Tap) => true,
        (TriggerMode::Swipe { min_distance }, Gesture::Swipe { dx, dy }) => {
            let upward = -dy;
            upward >= min_distance && upward > dx.abs()
        }
        _ => false,
    }
}

pub struct VoteWidget {
    config: WidgetConfig,
    camera: CameraManager,
    session: VoteSession,
    onboarding: Option<Onboarding>,
}

impl VoteWidget {
    /// Build a widget. The camera stays off until [`mount`](Self::mount).
    ///
    /// With `first_run` the onboarding walkthrough owns the trigger until it
    /// is finished.
    pub fn assemble(
        config: WidgetConfig,
        camera: Arc<dyn CameraBackend>,
        library: Arc<dyn CaptureLibraryLoader>,
        uploader: Arc<dyn Uploader>,
        first_run: bool,
    ) -> VoteResult<Self> {
        config
            .validate()
            .map_err(|reason| VoteError::config("widget", reason))?;

        let camera = CameraManager::new(camera);
        let pipeline = match config.capture_mode {
            CaptureMode::Frame => CapturePipeline::frame(camera.preview()),
            CaptureMode::Surface => CapturePipeline::surface(Arc::new(SurfaceCapture::new(
                library,
                config.render.clone(),
            ))),
        };

        let session = VoteSession::builder()
            .with_votes_max(config.votes_max)
            .with_timings(config.timings)
            .with_capture(Arc::new(pipeline))
            .with_uploader(uploader)
            .build()?;

        let onboarding = first_run.then(|| Onboarding::new(config.timings));

        info!(
            mode = ?config.capture_mode,
            trigger = ?config.trigger,
            theme = %config.theme,
            votes = config.votes_max,
            onboarding = first_run,
            "vote widget assembled"
        );

        Ok(Self {
            config,
            camera,
            session,
            onboarding,
        })
    }

    /// Start the camera.
    ///
    /// A `CameraUnavailable` error is not fatal: the widget keeps working
    /// without a preview, and surface capture still succeeds.
    pub async fn mount(&mut self) -> VoteResult<FacingPreference> {
        let result = self.camera.activate().await;
        if let Err(error) = &result {
            warn!(error = %error, "widget mounted without camera");
        }
        result
    }

    /// Release the camera. Safe to call repeatedly.
    pub fn teardown(&mut self) -> usize {
        self.camera.deactivate()
    }

    pub async fn handle_gesture(&self, gesture: Gesture) -> VoteResult<TriggerResult> {
        if !matches_trigger(self.config.trigger, gesture) {
            debug!(?gesture, "gesture does not match trigger");
            return Ok(TriggerResult::Ignored);
        }

        if let Some(onboarding) = self.active_onboarding() {
            if onboarding.state().step != OnboardingStep::Practice {
                return Ok(TriggerResult::Ignored);
            }
            return Ok(TriggerResult::Practice(onboarding.practice_vote().await?));
        }

        Ok(TriggerResult::Capture(self.session.request_capture().await))
    }

    fn active_onboarding(&self) -> Option<&Onboarding> {
        self.onboarding.as_ref().filter(|onboarding| onboarding.is_active())
    }

    /// The walkthrough, if this widget was assembled for a first run.
    pub fn onboarding(&self) -> Option<&Onboarding> {
        self.onboarding.as_ref()
    }

    /// Hand the trigger over to the real session.
    pub fn finish_onboarding(&self) -> VoteResult<()> {
        match &self.onboarding {
            Some(onboarding) => onboarding.finish(),
            None => Err(VoteError::state("no_onboarding", "finish_onboarding")),
        }
    }

    pub fn session(&self) -> &VoteSession {
        &self.session
    }

    pub fn preview(&self) -> CameraPreview {
        self.camera.preview()
    }

    pub fn camera_active(&self) -> bool {
        self.camera.is_active()
    }

    pub fn theme(&self) -> Theme {
        self.config.theme
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }
}

impl Drop for VoteWidget {
    fn drop(&mut self) {
        self.teardown();
    }
}
