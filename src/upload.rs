//! # Upload Client
//!
//! One POST per call, multipart body, no retries and no timeout beyond the
//! client default. The result is always an [`UploadOutcome`]; the client never
//! returns early with an error of its own.
//!
//! | Response | `ok` | `http_status` | `error_message` |
//! |----------|------|---------------|-----------------|
//! | 2xx, JSON body | `true` | status | `None` |
//! | 2xx, not JSON | `false` | status | parse failure |
//! | non-2xx | `false` | status | `HTTP error! status: <code>` |
//! | no response | `false` | `None` | transport failure |
//!
//! There is no idempotency key: two calls create two records on the collector.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::WidgetConfig;
use crate::error::{VoteError, VoteResult};
use crate::processing::payload::{CapturePayload, DESCRIPTION_FIELD, IMAGE_FIELD};

/// Why an upload failed.
#[derive(Debug, Clone, PartialEq, Eq)]
enum UploadFailure {
    Http(u16),
    Transport(String),
    InvalidBody { status: u16, reason: String },
}

impl UploadFailure {
    fn into_error(self) -> VoteError {
        match self {
            Self::Http(status) => VoteError::upload_http(status),
            Self::Transport(message) => VoteError::upload_transport(message),
            Self::InvalidBody { status, reason } => VoteError::upload_invalid_body(status, reason),
        }
    }
}

/// Typed result of one upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutcome {
    pub ok: bool,
    pub body: Option<Value>,
    pub http_status: Option<u16>,
    pub error_message: Option<String>,
    #[serde(skip)]
    failure: Option<UploadFailure>,
}

impl UploadOutcome {
    /// 2xx with a JSON body.
    pub fn success(status: u16, body: Value) -> Self {
        Self {
            ok: true,
            body: Some(body),
            http_status: Some(status),
            error_message: None,
            failure: None,
        }
    }

    /// Non-2xx response.
    pub fn http_error(status: u16) -> Self {
        Self::failure(Some(status), UploadFailure::Http(status))
    }

    /// The request never got a response.
    pub fn transport_error(message: impl Into<String>) -> Self {
        Self::failure(None, UploadFailure::Transport(message.into()))
    }

    /// 2xx whose body is not JSON.
    pub fn invalid_body(status: u16, reason: impl Into<String>) -> Self {
        Self::failure(
            Some(status),
            UploadFailure::InvalidBody {
                status,
                reason: reason.into(),
            },
        )
    }

    fn failure(http_status: Option<u16>, failure: UploadFailure) -> Self {
        Self {
            ok: false,
            body: None,
            http_status,
            error_message: Some(failure.clone().into_error().to_string()),
            failure: Some(failure),
        }
    }

    /// The JSON body on success, the matching [`VoteError`] otherwise.
    pub fn into_result(self) -> VoteResult<Value> {
        match self.failure {
            None => Ok(self.body.unwrap_or(Value::Null)),
            Some(failure) => Err(failure.into_error().with_operation("upload")),
        }
    }
}

/// Transmits a capture payload to the collector.
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, payload: CapturePayload) -> UploadOutcome;
}

/// Multipart upload over HTTP.
#[derive(Debug, Clone)]
pub struct HttpUploader {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpUploader {
    /// Uploader posting to `endpoint` verbatim.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// Uploader posting to `{api_base_url}/upload`.
    pub fn from_config(config: &WidgetConfig) -> Self {
        Self::new(config.upload_url())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn form(payload: CapturePayload) -> reqwest::Result<Form> {
        let image = Part::bytes(payload.image.bytes)
            .file_name(payload.filename)
            .mime_str(&payload.image.mime)?;
        Ok(Form::new()
            .part(IMAGE_FIELD, image)
            .text(DESCRIPTION_FIELD, payload.description))
    }
}

#[async_trait]
impl Uploader for HttpUploader {
    async fn upload(&self, payload: CapturePayload) -> UploadOutcome {
        let filename = payload.filename.clone();
        let form = match Self::form(payload) {
            Ok(form) => form,
            Err(e) => return UploadOutcome::transport_error(e.to_string()),
        };

        let response = match self.client.post(&self.endpoint).multipart(form).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(endpoint = %self.endpoint, error = %e, "upload transport failure");
                return UploadOutcome::transport_error(e.to_string());
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(endpoint = %self.endpoint, status = status.as_u16(), "upload rejected");
            return UploadOutcome::http_error(status.as_u16());
        }

        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return UploadOutcome::transport_error(e.to_string()),
        };
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(body) => {
                info!(%filename, status = status.as_u16(), "upload accepted");
                UploadOutcome::success(status.as_u16(), body)
            }
            Err(e) => {
                warn!(status = status.as_u16(), error = %e, "upload response is not JSON");
                UploadOutcome::invalid_body(status.as_u16(), e.to_string())
            }
        }
    }
}
