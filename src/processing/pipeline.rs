//! # Capture & Encode Pipeline
//!
//! Turns what the user is looking at into a [`CapturePayload`]:
//!
//! 1. grab a raster, either the camera frame or the whole surface
//! 2. encode it as a PNG data URL (on the blocking pool, it can be large)
//! 3. parse the data URL back into bytes and MIME type
//! 4. wrap it with a timestamped filename and description
//!
//! Nothing is written to disk.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local;
use image::RgbaImage;
use tokio::task::spawn_blocking;
use tracing::debug;

use crate::capture::camera::CameraPreview;
use crate::capture::surface::SurfaceCapture;
use crate::config::CaptureMode;
use crate::error::{VoteError, VoteResult};
use crate::processing::encode::{decode_data_url, encode_png_data_url};
use crate::processing::payload::CapturePayload;

/// Anything that can produce the payload for one vote.
#[async_trait]
pub trait CaptureStage: Send + Sync {
    async fn capture(&self) -> VoteResult<CapturePayload>;
}

/// Where the raster comes from.
#[derive(Clone)]
pub enum CaptureStrategy {
    /// Current camera frame at native resolution.
    Frame(CameraPreview),
    /// Whole visible surface via the lazily-loaded capture library.
    Surface(Arc<SurfaceCapture>),
}

/// The capture pipeline configured with one strategy.
#[derive(Clone)]
pub struct CapturePipeline {
    strategy: CaptureStrategy,
}

impl CapturePipeline {
    pub fn new(strategy: CaptureStrategy) -> Self {
        Self { strategy }
    }

    /// Frame capture from the given camera preview.
    pub fn frame(preview: CameraPreview) -> Self {
        Self::new(CaptureStrategy::Frame(preview))
    }

    /// Surface capture through `surface`.
    pub fn surface(surface: Arc<SurfaceCapture>) -> Self {
        Self::new(CaptureStrategy::Surface(surface))
    }

    pub fn mode(&self) -> CaptureMode {
        match self.strategy {
            CaptureStrategy::Frame(_) => CaptureMode::Frame,
            CaptureStrategy::Surface(_) => CaptureMode::Surface,
        }
    }

    async fn raster(&self) -> VoteResult<RgbaImage> {
        match &self.strategy {
            CaptureStrategy::Frame(preview) => preview.current_frame(),
            CaptureStrategy::Surface(surface) => surface.capture().await,
        }
    }
}

#[async_trait]
impl CaptureStage for CapturePipeline {
    async fn capture(&self) -> VoteResult<CapturePayload> {
        let raster = self.raster().await?;
        let (width, height) = raster.dimensions();

        let data_url = spawn_blocking(move || encode_png_data_url(&raster))
            .await
            .map_err(|e| VoteError::encode(e.to_string()).with_operation("encode_png"))??;
        let image = decode_data_url(&data_url)?;

        debug!(
            mode = ?self.mode(),
            width,
            height,
            bytes = image.len(),
            mime = %image.mime,
            "capture encoded"
        );
        Ok(CapturePayload::new(image, Local::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::camera::CameraManager;
    use crate::capture::sources::{TestPatternCamera, gradient_frame};
    use crate::capture::surface::{CaptureLibraryLoader, RenderOptions, SurfaceRenderer};

    #[tokio::test]
    async fn test_frame_capture_uses_native_resolution() {
        let mut camera = CameraManager::new(Arc::new(TestPatternCamera::new(32, 24)));
        camera.activate().await.unwrap();

        let pipeline = CapturePipeline::frame(camera.preview());
        assert_eq!(pipeline.mode(), CaptureMode::Frame);

        let payload = pipeline.capture().await.unwrap();
        assert_eq!(payload.image.mime, "image/png");
        assert!(payload.filename.starts_with("screenshot-"));
        assert!(payload.filename.ends_with(".png"));
        assert!(payload.description.starts_with("Screenshot captured at "));

        let decoded = image::load_from_memory(&payload.image.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 24));
    }

    #[tokio::test]
    async fn test_frame_capture_without_camera_fails() {
        let pipeline = CapturePipeline::frame(CameraPreview::detached());
        let err = pipeline.capture().await.unwrap_err();
        assert_eq!(err.category(), "frame_unavailable");
    }

    struct Gradient;

    #[async_trait]
    impl SurfaceRenderer for Gradient {
        async fn render(&self, options: &RenderOptions) -> anyhow::Result<RgbaImage> {
            Ok(crate::capture::surface::compose(
                &gradient_frame(10, 10),
                options,
                1.0,
            ))
        }
    }

    struct GradientLoader;

    #[async_trait]
    impl CaptureLibraryLoader for GradientLoader {
        fn source(&self) -> &str {
            "test://gradient"
        }

        async fn load(&self) -> anyhow::Result<Arc<dyn SurfaceRenderer>> {
            Ok(Arc::new(Gradient))
        }
    }

    #[tokio::test]
    async fn test_surface_capture_at_double_density() {
        let surface = Arc::new(SurfaceCapture::new(
            Arc::new(GradientLoader),
            RenderOptions::default(),
        ));
        let pipeline = CapturePipeline::surface(surface.clone());
        assert_eq!(pipeline.mode(), CaptureMode::Surface);
        assert!(!surface.is_loaded());

        let payload = pipeline.capture().await.unwrap();
        assert!(surface.is_loaded());

        let decoded = image::load_from_memory(&payload.image.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (20, 20));
    }
}
