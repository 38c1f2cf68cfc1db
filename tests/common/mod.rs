//! Common test utilities and helpers for the live vote tests
//!
//! Mock stages for the session and widget tests: uploaders that never touch
//! the network, capture stages that never touch a camera, and backends that
//! count how often they were asked for something.

#![allow(dead_code)]

/// Mock uploaders
pub mod mock_upload {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use live_vote::processing::CapturePayload;
    use live_vote::upload::{UploadOutcome, Uploader};
    use serde_json::json;
    use tokio::sync::Semaphore;

    /// Uploader answering every call with the same status.
    pub struct MockUploader {
        status: u16,
        calls: AtomicUsize,
        payloads: Mutex<Vec<CapturePayload>>,
    }

    impl MockUploader {
        /// Every upload is accepted with `{"received": <n>}`.
        pub fn accepting() -> Self {
            Self::with_status(201)
        }

        /// Every upload gets `status`.
        pub fn with_status(status: u16) -> Self {
            Self {
                status,
                calls: AtomicUsize::new(0),
                payloads: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn filenames(&self) -> Vec<String> {
            self.payloads
                .lock()
                .unwrap()
                .iter()
                .map(|payload| payload.filename.clone())
                .collect()
        }
    }

    #[async_trait]
    impl Uploader for MockUploader {
        async fn upload(&self, payload: CapturePayload) -> UploadOutcome {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.payloads.lock().unwrap().push(payload);
            tokio::time::sleep(Duration::from_millis(5)).await;
            if (200..300).contains(&self.status) {
                UploadOutcome::success(self.status, json!({ "received": n }))
            } else {
                UploadOutcome::http_error(self.status)
            }
        }
    }

    /// Uploader that holds every call until [`release`](Self::release).
    pub struct GatedUploader {
        gate: Semaphore,
        calls: AtomicUsize,
    }

    impl GatedUploader {
        pub fn new() -> Self {
            Self {
                gate: Semaphore::new(0),
                calls: AtomicUsize::new(0),
            }
        }

        /// Let one pending upload through.
        pub fn release(&self) {
            self.gate.add_permits(1);
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Uploader for GatedUploader {
        async fn upload(&self, _payload: CapturePayload) -> UploadOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.gate.acquire().await {
                Ok(permit) => {
                    permit.forget();
                    UploadOutcome::success(200, json!({ "ok": true }))
                }
                Err(e) => UploadOutcome::transport_error(e.to_string()),
            }
        }
    }
}

/// Mock capture stages and backends
pub mod mock_capture {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use chrono::Local;
    use image::RgbaImage;
    use live_vote::capture::camera::{CameraBackend, CameraConstraints, VideoStream};
    use live_vote::capture::sources::gradient_frame;
    use live_vote::capture::surface::{
        CaptureLibraryLoader, RenderOptions, SurfaceRenderer, compose,
    };
    use live_vote::error::{VoteError, VoteResult};
    use live_vote::processing::{CapturePayload, CaptureStage, ImageBlob};

    /// Capture stage producing a tiny fixed payload, or failing on demand.
    pub struct MockCapture {
        calls: AtomicUsize,
        fail_first: usize,
    }

    impl MockCapture {
        pub fn new() -> Self {
            Self::failing_first(0)
        }

        /// The first `n` captures fail with a malformed data URL.
        pub fn failing_first(n: usize) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_first: n,
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CaptureStage for MockCapture {
        async fn capture(&self) -> VoteResult<CapturePayload> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                return Err(VoteError::malformed_data_url("header has no ';'"));
            }
            let image = ImageBlob {
                mime: "image/png".to_string(),
                bytes: b"\x89PNG\r\n\x1a\n".to_vec(),
            };
            Ok(CapturePayload::new(image, Local::now()))
        }
    }

    /// Camera backend that rejects every constraint.
    pub struct NoCamera {
        pub attempts: AtomicUsize,
    }

    impl NoCamera {
        pub fn new() -> Self {
            Self {
                attempts: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CameraBackend for NoCamera {
        async fn open(&self, _constraints: &CameraConstraints) -> Result<Arc<dyn VideoStream>> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(anyhow!("NotAllowedError: permission denied"))
        }
    }

    struct GradientRenderer;

    #[async_trait]
    impl SurfaceRenderer for GradientRenderer {
        async fn render(&self, options: &RenderOptions) -> Result<RgbaImage> {
            Ok(compose(&gradient_frame(16, 9), options, 1.0))
        }
    }

    /// Capture library that counts its loads.
    pub struct CountingLibrary {
        loads: AtomicUsize,
    }

    impl CountingLibrary {
        pub fn new() -> Self {
            Self {
                loads: AtomicUsize::new(0),
            }
        }

        pub fn loads(&self) -> usize {
            self.loads.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CaptureLibraryLoader for CountingLibrary {
        fn source(&self) -> &str {
            "test://counting"
        }

        async fn load(&self) -> Result<Arc<dyn SurfaceRenderer>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            Ok(Arc::new(GradientRenderer))
        }
    }
}

/// Timings short enough for real-clock tests.
pub fn fast_timings() -> live_vote::Timings {
    use std::time::Duration;

    live_vote::Timings {
        settle_delay: Duration::from_millis(20),
        confirm_display: Duration::from_millis(40),
        practice_animation: Duration::from_millis(20),
        practice_flash: Duration::from_millis(10),
    }
}
