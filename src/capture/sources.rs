// # Bundled Capture Sources
//
// Camera backends and capture libraries that need no platform camera or
// browser surface: a synthetic gradient camera for development and demos, and
// still-image sources that replay a file from disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use image::{Rgba, RgbaImage};

use crate::capture::camera::{CameraBackend, CameraConstraints, FacingConstraint, VideoStream};
use crate::capture::surface::{CaptureLibraryLoader, RenderOptions, SurfaceRenderer, compose};
use crate::config::DEFAULT_LIBRARY_URL;

/// Single-track stream serving a fixed frame.
pub struct StaticStream {
    label: String,
    frame: RgbaImage,
    active: AtomicBool,
}

impl StaticStream {
    pub fn new(label: impl Into<String>, frame: RgbaImage) -> Self {
        Self {
            label: label.into(),
            frame,
            active: AtomicBool::new(true),
        }
    }
}

impl VideoStream for StaticStream {
    fn label(&self) -> &str {
        &self.label
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    fn current_frame(&self) -> Option<RgbaImage> {
        self.is_active().then(|| self.frame.clone())
    }

    fn stop_tracks(&self) -> usize {
        usize::from(self.active.swap(false, Ordering::AcqRel))
    }
}

/// Gradient test pattern: red grows left to right, green top to bottom.
pub fn gradient_frame(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        let r = (x * 255 / width.max(1)) as u8;
        let g = (y * 255 / height.max(1)) as u8;
        Rgba([r, g, 128, 255])
    })
}

/// Synthetic camera producing a gradient frame.
///
/// A front-only pattern camera rejects rear-facing constraints, which drives the
/// acquisition fallback chain down to "any camera".
#[derive(Debug, Clone)]
pub struct TestPatternCamera {
    width: u32,
    height: u32,
    has_back: bool,
}

impl TestPatternCamera {
    /// Camera that grants every constraint.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            has_back: true,
        }
    }

    /// Camera without a rear-facing lens.
    pub fn front_only(mut self) -> Self {
        self.has_back = false;
        self
    }
}

#[async_trait]
impl CameraBackend for TestPatternCamera {
    async fn open(&self, constraints: &CameraConstraints) -> Result<Arc<dyn VideoStream>> {
        if !self.has_back && constraints.facing == FacingConstraint::ExactBack {
            return Err(anyhow!("no camera satisfies facingMode: exact environment"));
        }
        if !self.has_back && constraints.facing == FacingConstraint::PreferBack {
            return Err(anyhow!("no rear-facing camera"));
        }
        Ok(Arc::new(StaticStream::new(
            format!("test-pattern {}x{}", self.width, self.height),
            gradient_frame(self.width, self.height),
        )))
    }
}

fn load_rgba(path: &Path) -> Result<RgbaImage> {
    let image = image::open(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(image.to_rgba8())
}

/// Camera that serves one image file as its only frame.
#[derive(Debug, Clone)]
pub struct StillImageCamera {
    path: PathBuf,
}

impl StillImageCamera {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CameraBackend for StillImageCamera {
    async fn open(&self, _constraints: &CameraConstraints) -> Result<Arc<dyn VideoStream>> {
        let path = self.path.clone();
        let frame = tokio::task::spawn_blocking(move || load_rgba(&path)).await??;
        Ok(Arc::new(StaticStream::new(
            self.path.display().to_string(),
            frame,
        )))
    }
}

/// Capture library whose "surface" is an image file, rendered at the requested
/// density.
#[derive(Debug, Clone)]
pub struct StillImageLibrary {
    source: String,
    path: PathBuf,
}

impl StillImageLibrary {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            source: format!("file://{}", path.display()),
            path,
        }
    }
}

#[async_trait]
impl CaptureLibraryLoader for StillImageLibrary {
    fn source(&self) -> &str {
        &self.source
    }

    async fn load(&self) -> Result<Arc<dyn SurfaceRenderer>> {
        let path = self.path.clone();
        let surface = tokio::task::spawn_blocking(move || load_rgba(&path)).await??;
        Ok(Arc::new(StillImageRenderer { surface }))
    }
}

struct StillImageRenderer {
    surface: RgbaImage,
}

#[async_trait]
impl SurfaceRenderer for StillImageRenderer {
    async fn render(&self, options: &RenderOptions) -> Result<RgbaImage> {
        Ok(compose(&self.surface, options, 1.0))
    }
}

/// Loader standing in for native screen capture when the crate is built
/// without the `screen-capture` feature. Every load fails.
#[derive(Debug, Clone)]
pub struct UnsupportedLibrary {
    source: String,
}

impl UnsupportedLibrary {
    /// `source` is reported as the library location in load failures.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

impl Default for UnsupportedLibrary {
    fn default() -> Self {
        Self::new(DEFAULT_LIBRARY_URL)
    }
}

#[async_trait]
impl CaptureLibraryLoader for UnsupportedLibrary {
    fn source(&self) -> &str {
        &self.source
    }

    async fn load(&self) -> Result<Arc<dyn SurfaceRenderer>> {
        Err(anyhow!(
            "native screen capture not compiled in (enable the screen-capture feature)"
        ))
    }
}

/// The native whole-screen capture library for this build, reporting
/// `library_url` as its location.
pub fn native_screen_library(library_url: &str) -> Arc<dyn CaptureLibraryLoader> {
    #[cfg(feature = "screen-capture")]
    return Arc::new(crate::capture::scrap::ScrapLibrary::default().with_source(library_url));

    #[cfg(not(feature = "screen-capture"))]
    Arc::new(UnsupportedLibrary::new(library_url))
}
