//! # Core State
//!
//! The two pieces of shared mutable state a session owns: the vote budget and
//! the phase of the vote button.

pub mod budget;
pub mod phase;

pub use budget::VoteBudget;
pub use phase::{Phase, PhaseMachine};
