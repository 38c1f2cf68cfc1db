//! # Surface Capture
//!
//! Renders the whole visible surface, not just the camera, through a capture
//! library that is loaded on first use. The load happens once per
//! [`SurfaceCapture`]; callers that arrive while it is in flight wait on the
//! same load instead of starting another fetch. A failed load is not cached,
//! so the next capture request tries again.

use std::sync::Arc;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::error::{VoteError, VoteResult};

/// Options record understood by the capture library.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    /// Fetch cross-origin images with CORS.
    pub use_cors: bool,
    /// Allow cross-origin content to taint the raster.
    pub allow_taint: bool,
    /// `#rrggbb` painted behind transparent regions.
    pub background_color: String,
    /// Pixel density multiplier.
    pub scale: f32,
    /// Library-internal logging.
    pub logging: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            use_cors: true,
            allow_taint: true,
            background_color: "#ffffff".to_string(),
            scale: 2.0,
            logging: false,
        }
    }
}

impl RenderOptions {
    /// Background as an opaque pixel. Unparseable colours fall back to white.
    pub fn background_rgba(&self) -> Rgba<u8> {
        let hex = self.background_color.trim_start_matches('#');
        let channel = |range: std::ops::Range<usize>| {
            hex.get(range)
                .and_then(|digits| u8::from_str_radix(digits, 16).ok())
        };
        match (hex.len(), channel(0..2), channel(2..4), channel(4..6)) {
            (6, Some(r), Some(g), Some(b)) => Rgba([r, g, b, 255]),
            _ => Rgba([255, 255, 255, 255]),
        }
    }
}

/// Flatten `raster` onto the background colour and resample it by
/// `options.scale / density`.
pub fn compose(raster: &RgbaImage, options: &RenderOptions, density: f32) -> RgbaImage {
    let Rgba([br, bg, bb, _]) = options.background_rgba();
    let mut flat = raster.clone();
    for pixel in flat.pixels_mut() {
        let Rgba([r, g, b, a]) = *pixel;
        let alpha = u16::from(a);
        let blend = |fg: u8, bgc: u8| {
            ((u16::from(fg) * alpha + u16::from(bgc) * (255 - alpha)) / 255) as u8
        };
        *pixel = Rgba([blend(r, br), blend(g, bg), blend(b, bb), 255]);
    }

    let factor = options.scale / density.max(f32::EPSILON);
    if (factor - 1.0).abs() < f32::EPSILON {
        return flat;
    }
    let width = ((flat.width() as f32 * factor).round() as u32).max(1);
    let height = ((flat.height() as f32 * factor).round() as u32).max(1);
    imageops::resize(&flat, width, height, FilterType::Triangle)
}

/// Convert a row-padded BGRA screen buffer to opaque RGBA.
///
/// The fourth byte of each pixel is padding on most screen grabbers (X11
/// ZPixmap leaves it at 0), so every output pixel gets alpha 255.
pub fn bgra_to_rgba(frame: &[u8], width: usize, height: usize) -> Result<RgbaImage> {
    let stride = frame.len() / height.max(1);
    if stride < width * 4 {
        return Err(anyhow!(
            "unexpected frame size: got {}, expected at least {}",
            frame.len(),
            width * height * 4
        ));
    }
    Ok(RgbaImage::from_fn(width as u32, height as u32, |x, y| {
        let i = y as usize * stride + x as usize * 4;
        Rgba([frame[i + 2], frame[i + 1], frame[i], 255])
    }))
}

/// Entry point exposed by a loaded capture library.
#[async_trait]
pub trait SurfaceRenderer: Send + Sync {
    /// Render the root visual surface to a raster.
    async fn render(&self, options: &RenderOptions) -> Result<RgbaImage>;
}

/// Fetches the capture library.
#[async_trait]
pub trait CaptureLibraryLoader: Send + Sync {
    /// Where the library comes from, for diagnostics.
    fn source(&self) -> &str;

    async fn load(&self) -> Result<Arc<dyn SurfaceRenderer>>;
}

/// Lazily-loaded surface capture.
pub struct SurfaceCapture {
    loader: Arc<dyn CaptureLibraryLoader>,
    library: OnceCell<Arc<dyn SurfaceRenderer>>,
    options: RenderOptions,
}

impl SurfaceCapture {
    pub fn new(loader: Arc<dyn CaptureLibraryLoader>, options: RenderOptions) -> Self {
        Self {
            loader,
            library: OnceCell::new(),
            options,
        }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn is_loaded(&self) -> bool {
        self.library.initialized()
    }

    /// The loaded library, fetching it on first use.
    pub async fn library(&self) -> VoteResult<Arc<dyn SurfaceRenderer>> {
        let library = self
            .library
            .get_or_try_init(|| async {
                debug!(source = self.loader.source(), "loading capture library");
                let library = self.loader.load().await.map_err(|e| {
                    VoteError::library_load(self.loader.source(), format!("{e:#}"))
                        .with_operation("load_capture_library")
                })?;
                info!(source = self.loader.source(), "capture library ready");
                Ok::<_, VoteError>(library)
            })
            .await?;
        Ok(Arc::clone(library))
    }

    /// Render the surface with the configured options.
    pub async fn capture(&self) -> VoteResult<RgbaImage> {
        let library = self.library().await?;
        library
            .render(&self.options)
            .await
            .map_err(|e| VoteError::render(format!("{e:#}")).with_operation("render_surface"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_bgra_padding_byte_is_not_alpha() {
        // 2x2 frame, rows padded to 12 bytes, padding byte 0 like X11 SHM
        let frame = [
            10, 20, 30, 0, 40, 50, 60, 0, 0xEE, 0xEE, 0xEE, 0xEE, //
            70, 80, 90, 0, 1, 2, 3, 0, 0xEE, 0xEE, 0xEE, 0xEE,
        ];
        let raster = bgra_to_rgba(&frame, 2, 2).unwrap();
        assert_eq!(raster.get_pixel(0, 0), &Rgba([30, 20, 10, 255]));
        assert_eq!(raster.get_pixel(1, 1), &Rgba([3, 2, 1, 255]));

        // Flattening must keep the screen colours, not paint the background
        let options = RenderOptions {
            scale: 1.0,
            ..RenderOptions::default()
        };
        let flat = compose(&raster, &options, 1.0);
        assert_eq!(flat.get_pixel(0, 0), &Rgba([30, 20, 10, 255]));
        assert_eq!(flat.get_pixel(1, 0), &Rgba([60, 50, 40, 255]));
    }

    #[test]
    fn test_bgra_short_frame_is_an_error() {
        assert!(bgra_to_rgba(&[0; 12], 2, 2).is_err());
    }

    struct SolidRenderer;

    #[async_trait]
    impl SurfaceRenderer for SolidRenderer {
        async fn render(&self, options: &RenderOptions) -> Result<RgbaImage> {
            let raster = RgbaImage::from_pixel(10, 5, Rgba([0, 0, 255, 255]));
            Ok(compose(&raster, options, 1.0))
        }
    }

    struct SlowLoader {
        loads: AtomicUsize,
        fail_first: bool,
    }

    #[async_trait]
    impl CaptureLibraryLoader for SlowLoader {
        fn source(&self) -> &str {
            "test://capture-lib"
        }

        async fn load(&self) -> Result<Arc<dyn SurfaceRenderer>> {
            let attempt = self.loads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            if self.fail_first && attempt == 0 {
                anyhow::bail!("script error");
            }
            Ok(Arc::new(SolidRenderer))
        }
    }

    fn loader(fail_first: bool) -> Arc<SlowLoader> {
        Arc::new(SlowLoader {
            loads: AtomicUsize::new(0),
            fail_first,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_captures_share_one_load() {
        let loader = loader(false);
        let surface = SurfaceCapture::new(loader.clone(), RenderOptions::default());

        let (a, b) = tokio::join!(surface.capture(), surface.capture());
        assert_eq!(a.unwrap().dimensions(), (20, 10));
        assert_eq!(b.unwrap().dimensions(), (20, 10));
        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);

        surface.capture().await.unwrap();
        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
        assert!(surface.is_loaded());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_load_is_retried_on_next_capture() {
        let loader = loader(true);
        let surface = SurfaceCapture::new(loader.clone(), RenderOptions::default());

        let err = surface.capture().await.unwrap_err();
        assert_eq!(err.category(), "capture_library");
        assert!(!surface.is_loaded());

        assert!(surface.capture().await.is_ok());
        assert_eq!(loader.loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_compose_flattens_alpha_on_background() {
        let raster = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 0]));
        let options = RenderOptions {
            scale: 1.0,
            ..RenderOptions::default()
        };
        let flat = compose(&raster, &options, 1.0);
        assert_eq!(flat.dimensions(), (2, 2));
        assert_eq!(*flat.get_pixel(0, 0), Rgba([255, 255, 255, 255]));

        let options = RenderOptions {
            background_color: "#102030".to_string(),
            ..options
        };
        let flat = compose(&raster, &options, 1.0);
        assert_eq!(*flat.get_pixel(1, 1), Rgba([0x10, 0x20, 0x30, 255]));
    }

    #[test]
    fn test_compose_scales_relative_to_density() {
        let raster = RgbaImage::from_pixel(8, 4, Rgba([1, 2, 3, 255]));
        let options = RenderOptions::default();
        assert_eq!(compose(&raster, &options, 1.0).dimensions(), (16, 8));
        assert_eq!(compose(&raster, &options, 2.0).dimensions(), (8, 4));
    }

    #[test]
    fn test_background_parse_fallback() {
        let options = RenderOptions {
            background_color: "not-a-colour".to_string(),
            ..RenderOptions::default()
        };
        assert_eq!(options.background_rgba(), Rgba([255, 255, 255, 255]));
    }
}
