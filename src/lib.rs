//! # Live Vote
//!
//! Core of a live voting widget: a camera preview, a vote button that captures
//! what the user is looking at and uploads it to a remote collector, and a
//! per-session vote budget.
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//! - `capture`: camera acquisition with a fallback chain, lazily-loaded surface capture
//! - `processing`: PNG data-URL encoding, data-URL decoding, multipart payload
//! - `upload`: the multipart upload client and its typed outcome
//! - `core`: vote budget and the phase state machine
//! - `session`: the session context sequencing capture, upload and budget
//! - `onboarding`: first-run practice walkthrough
//! - `widget`: composition of all of the above behind trigger gestures
//! - `config`: configuration and validation
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use live_vote::capture::sources::{StillImageLibrary, TestPatternCamera};
//! use live_vote::upload::HttpUploader;
//! use live_vote::{Gesture, VoteWidget, WidgetConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = WidgetConfig::from_env();
//! let uploader = Arc::new(HttpUploader::from_config(&config));
//! let mut widget = VoteWidget::assemble(
//!     config,
//!     Arc::new(TestPatternCamera::new(640, 480)),
//!     Arc::new(StillImageLibrary::new("page.png")),
//!     uploader,
//!     false,
//! )?;
//!
//! let _ = widget.mount().await;
//! widget.handle_gesture(Gesture::Tap).await?;
//! println!("{} votes left", widget.session().votes_remaining());
//! widget.teardown();
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod config;
pub mod core;
pub mod error;
pub mod onboarding;
pub mod processing;
pub mod session;
pub mod upload;
pub mod widget;

/// Re-export error types for convenience
pub use error::{HasRecoverySuggestion, HasSeverity, VoteError, VoteResult};

pub use config::{CaptureMode, Theme, Timings, TriggerMode, WidgetConfig};
pub use crate::core::Phase;
pub use onboarding::{Onboarding, OnboardingState, OnboardingStep};
pub use session::{CaptureOutcome, VoteSession};
pub use upload::{HttpUploader, UploadOutcome, Uploader};
pub use widget::{Gesture, TriggerResult, VoteWidget};
