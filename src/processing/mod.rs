//! # Processing Module
//!
//! Raster encoding, the data-URL codec, the multipart payload and the capture
//! pipeline that ties them together.

pub mod encode;
pub mod payload;
pub mod pipeline;

// Re-export commonly used types for convenience
pub use encode::{ImageBlob, decode_data_url, encode_png_data_url};
pub use payload::CapturePayload;
pub use pipeline::{CapturePipeline, CaptureStage, CaptureStrategy};
