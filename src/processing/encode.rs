//! # Raster Encoding
//!
//! Both capture strategies end in the same place: the raster is encoded as a
//! PNG data URL, and the data URL is then parsed back into raw bytes plus the
//! MIME type named in its header.
//!
//! ```text
//! RgbaImage ──png──▶ data:image/png;base64,iVBOR... ──parse──▶ ImageBlob
//! ```
//!
//! A header that does not look like `data:<mime>;base64` is reported as
//! [`VoteError::MalformedDataUrl`], which the session treats as an ordinary
//! capture failure.

use std::io::Cursor;

use base64::{Engine as _, engine::general_purpose};
use image::{ImageFormat, RgbaImage};

use crate::error::{VoteError, VoteResult};

/// Decoded image bytes with their MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBlob {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl ImageBlob {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Encode `raster` as a `data:image/png;base64,...` URL.
pub fn encode_png_data_url(raster: &RgbaImage) -> VoteResult<String> {
    let mut png = Cursor::new(Vec::new());
    raster
        .write_to(&mut png, ImageFormat::Png)
        .map_err(|e| VoteError::from(e).with_operation("encode_png"))?;

    Ok(format!(
        "data:image/png;base64,{}",
        general_purpose::STANDARD.encode(png.into_inner())
    ))
}

/// Parse a base64 data URL into an [`ImageBlob`].
pub fn decode_data_url(data_url: &str) -> VoteResult<ImageBlob> {
    let malformed =
        |reason: &str| VoteError::malformed_data_url(reason).with_operation("decode_data_url");

    let (header, payload) = data_url
        .split_once(',')
        .ok_or_else(|| malformed("missing ',' between header and payload"))?;
    let (_, mime_and_params) = header
        .split_once(':')
        .ok_or_else(|| malformed("header has no ':' before the MIME type"))?;
    let (mime, params) = mime_and_params
        .split_once(';')
        .ok_or_else(|| malformed("header has no ';' after the MIME type"))?;

    if !header.starts_with("data:") {
        return Err(malformed("header does not start with 'data:'"));
    }
    if mime.is_empty() {
        return Err(malformed("empty MIME type"));
    }
    if !params.split(';').any(|param| param == "base64") {
        return Err(malformed("payload is not base64 encoded"));
    }

    let bytes = general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| VoteError::from(e).with_operation("decode_data_url"))?;

    Ok(ImageBlob {
        mime: mime.to_string(),
        bytes,
    })
}
