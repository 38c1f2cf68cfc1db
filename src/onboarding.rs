//! # Onboarding Flow
//!
//! First-run walkthrough that rehearses the vote button without touching the
//! camera, the capture pipeline or the network.
//!
//! ```text
//! Rules ──confirm_rules──▶ Practice ──finish──▶ Complete
//!                            │  ▲
//!                 practice_vote: animating ─▶ flash ─▶ practice_complete = true
//! ```
//!
//! `Complete` is terminal for the session. Every operation attempted after it
//! returns [`VoteError::State`].

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::config::Timings;
use crate::error::{VoteError, VoteResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnboardingStep {
    #[default]
    Rules,
    Practice,
    /// Collapsed; the main flow owns the trigger.
    Complete,
}

impl fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Rules => "rules",
            Self::Practice => "practice",
            Self::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// Snapshot of the walkthrough.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OnboardingState {
    pub step: OnboardingStep,
    pub practice_animating: bool,
    pub practice_flash: bool,
    /// Set after the first finished practice vote, never cleared.
    pub practice_complete: bool,
}

impl OnboardingState {
    fn busy(&self) -> bool {
        self.practice_animating || self.practice_flash
    }
}

pub struct Onboarding {
    tx: Arc<watch::Sender<OnboardingState>>,
    timings: Timings,
}

impl Onboarding {
    pub fn new(timings: Timings) -> Self {
        let (tx, _rx) = watch::channel(OnboardingState::default());
        Self {
            tx: Arc::new(tx),
            timings,
        }
    }

    pub fn state(&self) -> OnboardingState {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<OnboardingState> {
        self.tx.subscribe()
    }

    /// `false` once the walkthrough has been finished.
    pub fn is_active(&self) -> bool {
        self.state().step != OnboardingStep::Complete
    }

    fn wrong_step(&self, operation: &str) -> VoteError {
        VoteError::state(self.state().step.to_string(), operation).with_operation("onboarding")
    }

    /// `Rules -> Practice`.
    pub fn confirm_rules(&self) -> VoteResult<()> {
        let advanced = self.tx.send_if_modified(|state| {
            if state.step != OnboardingStep::Rules {
                return false;
            }
            state.step = OnboardingStep::Practice;
            true
        });
        if !advanced {
            return Err(self.wrong_step("confirm_rules"));
        }
        info!("onboarding rules confirmed");
        Ok(())
    }

    /// Play one practice vote: the animation window, then the success flash.
    ///
    /// Returns `Ok(false)` when a practice vote is already playing. Resolves
    /// after the flash has ended. Dropping the returned future does not stop
    /// the playback.
    pub async fn practice_vote(&self) -> VoteResult<bool> {
        let mut step = None;
        let started = self.tx.send_if_modified(|state| {
            if state.step != OnboardingStep::Practice {
                step = Some(state.step);
                return false;
            }
            if state.busy() {
                return false;
            }
            state.practice_animating = true;
            true
        });
        if step.is_some() {
            return Err(self.wrong_step("practice_vote"));
        }
        if !started {
            debug!("practice vote already playing");
            return Ok(false);
        }

        // Playback owns its own task; a dropped caller still sees it through.
        let playback = tokio::spawn(play_practice(Arc::clone(&self.tx), self.timings));
        if let Err(join_error) = playback.await {
            self.tx.send_modify(|state| {
                state.practice_animating = false;
                state.practice_flash = false;
            });
            return Err(VoteError::state("practice", "practice_vote")
                .with_operation(format!("practice playback aborted: {join_error}")));
        }
        Ok(true)
    }

    /// `Practice -> Complete`, once a practice vote has finished.
    pub fn finish(&self) -> VoteResult<()> {
        let finished = self.tx.send_if_modified(|state| {
            if state.step != OnboardingStep::Practice || !state.practice_complete {
                return false;
            }
            state.step = OnboardingStep::Complete;
            true
        });
        if !finished {
            let state = self.state();
            if state.step == OnboardingStep::Practice {
                return Err(VoteError::state("practice_incomplete", "finish")
                    .with_operation("onboarding")
                    .with_recovery_suggestion("Cast the practice vote first"));
            }
            return Err(self.wrong_step("finish"));
        }
        info!("onboarding complete");
        Ok(())
    }
}

async fn play_practice(tx: Arc<watch::Sender<OnboardingState>>, timings: Timings) {
    tokio::time::sleep(timings.practice_animation).await;
    tx.send_modify(|state| {
        state.practice_animating = false;
        state.practice_flash = true;
    });

    tokio::time::sleep(timings.practice_flash).await;
    tx.send_modify(|state| {
        state.practice_flash = false;
        state.practice_complete = true;
    });

    info!("practice vote finished");
}
