//! Multipart payload for one capture: the image file and a text description.

use chrono::{DateTime, Local};

use crate::processing::encode::ImageBlob;

/// Form field carrying the image.
pub const IMAGE_FIELD: &str = "image";

/// Form field carrying the description.
pub const DESCRIPTION_FIELD: &str = "description";

/// Everything the upload endpoint receives for one vote.
#[derive(Debug, Clone)]
pub struct CapturePayload {
    pub image: ImageBlob,
    /// `screenshot-<epoch_ms>.png`
    pub filename: String,
    /// Human-readable capture time.
    pub description: String,
    pub captured_at: DateTime<Local>,
}

impl CapturePayload {
    pub fn new(image: ImageBlob, captured_at: DateTime<Local>) -> Self {
        Self {
            filename: format!("screenshot-{}.png", captured_at.timestamp_millis()),
            description: format!(
                "Screenshot captured at {}",
                captured_at.format("%-m/%-d/%Y, %-I:%M:%S %p")
            ),
            image,
            captured_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_names_derive_from_capture_time() {
        let captured_at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let blob = ImageBlob {
            mime: "image/png".to_string(),
            bytes: vec![1, 2, 3],
        };

        let payload = CapturePayload::new(blob, captured_at);
        assert_eq!(
            payload.filename,
            format!("screenshot-{}.png", captured_at.timestamp_millis())
        );
        assert_eq!(
            payload.description,
            "Screenshot captured at 3/9/2024, 2:05:07 PM"
        );
        assert_eq!(payload.image.len(), 3);
    }
}
