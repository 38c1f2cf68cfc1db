// # Native Screen Capture
//
// Surface capture for desktop builds using the `scrap` library. Grabbing the
// primary display is the native counterpart of rendering the whole visible
// document: whatever is on screen, camera preview included, ends up in the
// raster.
//
// `scrap::Capturer` is not `Send` on every platform, so it is created and used
// inside a blocking task for each render. "Loading" the library checks the
// primary display once.
//
// | Platform | Backend |
// |----------|---------|
// | Windows | DXGI desktop duplication |
// | macOS | CoreGraphics display stream |
// | Linux X11 | XCB shared memory |

use std::io::ErrorKind;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use image::RgbaImage;
use scrap::{Capturer, Display};
use tokio::task::spawn_blocking;
use tracing::debug;

use crate::capture::surface::{
    CaptureLibraryLoader, RenderOptions, SurfaceRenderer, bgra_to_rgba, compose,
};

/// How long to wait for the first frame before giving up.
const FRAME_TIMEOUT: Duration = Duration::from_secs(2);

/// Loader for the native screen capture "library".
#[derive(Debug, Clone)]
pub struct ScrapLibrary {
    /// Physical pixels per logical pixel of the primary display.
    density: f32,
    source: String,
}

impl Default for ScrapLibrary {
    fn default() -> Self {
        Self {
            density: 1.0,
            source: "scrap://primary-display".to_string(),
        }
    }
}

impl ScrapLibrary {
    pub fn with_density(mut self, density: f32) -> Self {
        self.density = density;
        self
    }

    /// Location reported in load failures.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }
}

#[async_trait]
impl CaptureLibraryLoader for ScrapLibrary {
    fn source(&self) -> &str {
        &self.source
    }

    async fn load(&self) -> Result<Arc<dyn SurfaceRenderer>> {
        let (w, h) = spawn_blocking(|| -> Result<(usize, usize)> {
            let display = Display::primary().context("scrap: no primary display")?;
            Ok((display.width(), display.height()))
        })
        .await??;
        debug!(width = w, height = h, "primary display found");

        Ok(Arc::new(ScrapRenderer {
            density: self.density,
        }))
    }
}

struct ScrapRenderer {
    density: f32,
}

#[async_trait]
impl SurfaceRenderer for ScrapRenderer {
    async fn render(&self, options: &RenderOptions) -> Result<RgbaImage> {
        let raster = spawn_blocking(grab_primary).await??;
        Ok(compose(&raster, options, self.density))
    }
}

/// Grab one BGRA frame from the primary display and convert it to opaque RGBA.
fn grab_primary() -> Result<RgbaImage> {
    let display = Display::primary().context("scrap: no primary display")?;
    let mut capturer = Capturer::new(display).context("scrap: cannot create capturer")?;
    let (w, h) = (capturer.width(), capturer.height());
    let deadline = Instant::now() + FRAME_TIMEOUT;

    loop {
        match capturer.frame() {
            Ok(frame) => return bgra_to_rgba(&frame, w, h).context("scrap"),
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                if Instant::now() >= deadline {
                    return Err(anyhow!("scrap: no frame within {:?}", FRAME_TIMEOUT));
                }
                // no frame ready yet, small nap
                thread::sleep(Duration::from_millis(2));
            }
            Err(e) => return Err(anyhow!("scrap frame error: {}", e)),
        }
    }
}
