//! # Phase State Machine
//!
//! One authoritative value describes the vote button:
//!
//! ```text
//!            request (budget ok)          upload ok
//!   Idle ─────────────────────▶ Rotating ──────────▶ Shooting
//!    ▲                              │                   │
//!    └──────── any failure ─────────┘                   │
//!    └──────────────── settle delay ────────────────────┘
//! ```
//!
//! Every transition is a compare-and-set on the current value, so a request
//! that arrives while the machine is not `Idle` simply loses the race and is
//! ignored. Subscribers get each change through a `watch` channel.

use std::fmt;

use tokio::sync::watch;
use tracing::debug;

/// Visual and operational state of the vote button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Resting state, accepts new requests.
    #[default]
    Idle,
    /// A capture attempt is in flight.
    Rotating,
    /// Transient celebration after a confirmed vote.
    Shooting,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Rotating => "rotating",
            Self::Shooting => "shooting",
        };
        f.write_str(name)
    }
}

/// Owner of the process-wide [`Phase`] value.
#[derive(Debug)]
pub struct PhaseMachine {
    tx: watch::Sender<Phase>,
}

impl Default for PhaseMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseMachine {
    /// Starts in [`Phase::Idle`].
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Phase::Idle);
        Self { tx }
    }

    pub fn current(&self) -> Phase {
        *self.tx.borrow()
    }

    /// Receiver that observes every transition.
    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.tx.subscribe()
    }

    /// `Idle -> Rotating`.
    pub fn try_begin(&self) -> bool {
        self.transition(Phase::Idle, Phase::Rotating)
    }

    /// `Rotating -> Shooting`, only for a confirmed upload.
    pub fn resolve_success(&self) -> bool {
        self.transition(Phase::Rotating, Phase::Shooting)
    }

    /// `Rotating -> Idle` after any failure.
    pub fn resolve_failure(&self) -> bool {
        self.transition(Phase::Rotating, Phase::Idle)
    }

    /// `Shooting -> Idle` once the settle delay has elapsed.
    pub fn settle(&self) -> bool {
        self.transition(Phase::Shooting, Phase::Idle)
    }

    fn transition(&self, from: Phase, to: Phase) -> bool {
        let moved = self.tx.send_if_modified(|phase| {
            if *phase == from {
                *phase = to;
                true
            } else {
                false
            }
        });
        if moved {
            debug!(%from, %to, "phase transition");
        }
        moved
    }
}
