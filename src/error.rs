//! # Error Handling
//!
//! Every failure in the capture-to-upload chain is a [`VoteError`]. Each variant
//! carries an [`ErrorContext`] with the time it happened, the operation that was
//! running and an optional recovery suggestion, so the session can log a rich
//! record while still collapsing everything into one user-visible message.
//!
//! ## Classification
//!
//! - `CameraUnavailable` is a warning: the camera preview degrades, nothing else.
//! - `BudgetExhausted` is raised before any work begins.
//! - Everything else is a capture or upload failure that returns the phase to
//!   idle without costing a vote.
//!
//! ## Usage
//!
//! ```rust
//! use live_vote::error::{HasRecoverySuggestion, VoteError};
//!
//! let error = VoteError::upload_http(500)
//!     .with_operation("upload")
//!     .with_recovery_suggestion("Try again in a moment");
//!
//! assert_eq!(error.category(), "upload_http");
//! assert_eq!(error.user_message(), "HTTP error! status: 500");
//! assert_eq!(error.recovery_suggestion(), Some("Try again in a moment"));
//! ```

use std::time::SystemTime;

use thiserror::Error;

/// Severity levels for errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Degrades a feature but the system stays fully usable
    Warning,
    /// The current attempt failed; the next one may succeed
    Error,
}

/// Metadata about when and where an error occurred
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// When the error occurred
    pub timestamp: SystemTime,
    /// The operation being performed when the error occurred
    pub operation: Option<String>,
    /// Suggested recovery action
    pub recovery_suggestion: Option<String>,
    /// Error severity level
    pub severity: ErrorSeverity,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            timestamp: SystemTime::now(),
            operation: None,
            recovery_suggestion: None,
            severity: ErrorSeverity::Error,
        }
    }
}

impl ErrorContext {
    /// Create a new error context
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the operation that was being performed
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Set severity level
    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
        self
    }
}

/// Base error type for the live vote core
#[derive(Debug, Error)]
pub enum VoteError {
    /// Every camera preference was rejected
    #[error("Camera unavailable: {reason}")]
    CameraUnavailable {
        reason: String,
        context: ErrorContext,
    },
    /// No live camera frame to capture from
    #[error("No camera frame available: {reason}")]
    FrameUnavailable {
        reason: String,
        context: ErrorContext,
    },
    /// The on-demand capture library could not be loaded
    #[error("Capture library failed to load from {url}: {reason}")]
    CaptureLibraryLoadFailed {
        url: String,
        reason: String,
        context: ErrorContext,
    },
    /// The capture library loaded but rendering failed
    #[error("Surface render failed: {reason}")]
    Render {
        reason: String,
        context: ErrorContext,
    },
    /// Raster to PNG encoding failed
    #[error("Image encoding failed: {reason}")]
    Encode {
        reason: String,
        context: ErrorContext,
    },
    /// The encoded data URL could not be parsed back into bytes
    #[error("Malformed data URL: {reason}")]
    MalformedDataUrl {
        reason: String,
        context: ErrorContext,
    },
    /// Endpoint answered with a non-2xx status
    #[error("HTTP error! status: {status}")]
    UploadHttp { status: u16, context: ErrorContext },
    /// The request never produced a response
    #[error("{message}")]
    UploadTransport {
        message: String,
        context: ErrorContext,
    },
    /// 2xx response whose body is not JSON
    #[error("Invalid upload response (status {status}): {reason}")]
    UploadInvalidBody {
        status: u16,
        reason: String,
        context: ErrorContext,
    },
    /// No votes left in this session
    #[error("No votes remaining ({max} of {max} used)")]
    BudgetExhausted { max: u32, context: ErrorContext },
    /// Configuration validation errors
    #[error("Configuration error in '{field}': {reason}")]
    Config {
        field: String,
        reason: String,
        context: ErrorContext,
    },
    /// Operation not allowed in the current state
    #[error("Invalid state transition from '{current_state}' when attempting '{attempted_operation}'")]
    State {
        current_state: String,
        attempted_operation: String,
        context: ErrorContext,
    },
}

impl VoteError {
    /// Create a camera-unavailable error (warning severity)
    pub fn camera_unavailable(reason: impl Into<String>) -> Self {
        Self::CameraUnavailable {
            reason: reason.into(),
            context: ErrorContext::new().with_severity(ErrorSeverity::Warning),
        }
    }

    /// Create a frame-unavailable error
    pub fn frame_unavailable(reason: impl Into<String>) -> Self {
        Self::FrameUnavailable {
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a capture library load error
    pub fn library_load(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CaptureLibraryLoadFailed {
            url: url.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a render error
    pub fn render(reason: impl Into<String>) -> Self {
        Self::Render {
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create an encoding error
    pub fn encode(reason: impl Into<String>) -> Self {
        Self::Encode {
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a malformed data URL error
    pub fn malformed_data_url(reason: impl Into<String>) -> Self {
        Self::MalformedDataUrl {
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create an HTTP status error
    pub fn upload_http(status: u16) -> Self {
        Self::UploadHttp {
            status,
            context: ErrorContext::new(),
        }
    }

    /// Create a transport error
    pub fn upload_transport(message: impl Into<String>) -> Self {
        Self::UploadTransport {
            message: message.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create an invalid-body error
    pub fn upload_invalid_body(status: u16, reason: impl Into<String>) -> Self {
        Self::UploadInvalidBody {
            status,
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a budget exhausted error
    pub fn budget_exhausted(max: u32) -> Self {
        Self::BudgetExhausted {
            max,
            context: ErrorContext::new().with_severity(ErrorSeverity::Warning),
        }
    }

    /// Create a configuration error
    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config {
            field: field.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a state error
    pub fn state(current_state: impl Into<String>, attempted_operation: impl Into<String>) -> Self {
        Self::State {
            current_state: current_state.into(),
            attempted_operation: attempted_operation.into(),
            context: ErrorContext::new(),
        }
    }

    /// Add operation context
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.context_mut().operation = Some(operation.into());
        self
    }

    /// Add recovery suggestion
    pub fn with_recovery_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context_mut().recovery_suggestion = Some(suggestion.into());
        self
    }

    /// Get the error context
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::CameraUnavailable { context, .. }
            | Self::FrameUnavailable { context, .. }
            | Self::CaptureLibraryLoadFailed { context, .. }
            | Self::Render { context, .. }
            | Self::Encode { context, .. }
            | Self::MalformedDataUrl { context, .. }
            | Self::UploadHttp { context, .. }
            | Self::UploadTransport { context, .. }
            | Self::UploadInvalidBody { context, .. }
            | Self::BudgetExhausted { context, .. }
            | Self::Config { context, .. }
            | Self::State { context, .. } => context,
        }
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            Self::CameraUnavailable { context, .. }
            | Self::FrameUnavailable { context, .. }
            | Self::CaptureLibraryLoadFailed { context, .. }
            | Self::Render { context, .. }
            | Self::Encode { context, .. }
            | Self::MalformedDataUrl { context, .. }
            | Self::UploadHttp { context, .. }
            | Self::UploadTransport { context, .. }
            | Self::UploadInvalidBody { context, .. }
            | Self::BudgetExhausted { context, .. }
            | Self::Config { context, .. }
            | Self::State { context, .. } => context,
        }
    }

    /// Get the error category as a string
    pub fn category(&self) -> &'static str {
        match self {
            Self::CameraUnavailable { .. } => "camera_unavailable",
            Self::FrameUnavailable { .. } => "frame_unavailable",
            Self::CaptureLibraryLoadFailed { .. } => "capture_library",
            Self::Render { .. } => "render",
            Self::Encode { .. } => "encode",
            Self::MalformedDataUrl { .. } => "malformed_data_url",
            Self::UploadHttp { .. } => "upload_http",
            Self::UploadTransport { .. } => "upload_transport",
            Self::UploadInvalidBody { .. } => "upload_invalid_body",
            Self::BudgetExhausted { .. } => "budget_exhausted",
            Self::Config { .. } => "config",
            Self::State { .. } => "state",
        }
    }

    /// Text for the single caller-visible error slot.
    ///
    /// Upload failures show their own message; capture-side failures are
    /// prefixed so the user can tell the screenshot never left the device.
    pub fn user_message(&self) -> String {
        if classify::is_capture_failure(self) {
            format!("Failed to capture screenshot: {self}")
        } else {
            self.to_string()
        }
    }
}

/// Result type alias using the crate error type
pub type VoteResult<T> = Result<T, VoteError>;

/// Trait for errors with severity levels
pub trait HasSeverity {
    /// Get the severity level of this error
    fn severity(&self) -> ErrorSeverity;
}

impl HasSeverity for VoteError {
    fn severity(&self) -> ErrorSeverity {
        self.context().severity
    }
}

/// Trait for errors that provide recovery suggestions
pub trait HasRecoverySuggestion {
    /// Get recovery suggestion for this error
    fn recovery_suggestion(&self) -> Option<&str>;
}

impl HasRecoverySuggestion for VoteError {
    fn recovery_suggestion(&self) -> Option<&str> {
        self.context().recovery_suggestion.as_deref()
    }
}

/// Error classification utilities
pub mod classify {
    use super::VoteError;

    /// Failed before anything was sent to the collector
    pub fn is_capture_failure(error: &VoteError) -> bool {
        matches!(
            error,
            VoteError::FrameUnavailable { .. }
                | VoteError::CaptureLibraryLoadFailed { .. }
                | VoteError::Render { .. }
                | VoteError::Encode { .. }
                | VoteError::MalformedDataUrl { .. }
        )
    }

    /// Failed while talking to the collector
    pub fn is_upload_failure(error: &VoteError) -> bool {
        matches!(
            error,
            VoteError::UploadHttp { .. }
                | VoteError::UploadTransport { .. }
                | VoteError::UploadInvalidBody { .. }
        )
    }

    /// Retrying the same request may succeed without any user action
    pub fn is_transient(error: &VoteError) -> bool {
        match error {
            VoteError::UploadHttp { status, .. } => *status >= 500 || *status == 429,
            VoteError::UploadTransport { .. }
            | VoteError::FrameUnavailable { .. }
            | VoteError::CaptureLibraryLoadFailed { .. } => true,
            _ => false,
        }
    }
}

impl From<image::ImageError> for VoteError {
    fn from(error: image::ImageError) -> Self {
        Self::encode(error.to_string())
    }
}

impl From<base64::DecodeError> for VoteError {
    fn from(error: base64::DecodeError) -> Self {
        Self::malformed_data_url(format!("invalid base64 payload: {error}"))
    }
}
