use base64::{engine::general_purpose, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Invalid base64 image payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    #[error("Image payload is empty")]
    EmptyData,
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("Failed to encode image: {0}")]
    Encode(String),
}

/// An image as the browser sends it: base64 payload plus declared mime type.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageInput {
    #[serde(default, deserialize_with = "string_or_empty")]
    pub base64: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub mime_type: String,
}

/// `null` and non-string values read as empty, so they fail `is_complete`.
fn string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) => text,
        _ => String::new(),
    })
}

/// Reads an `image` field that may be absent, `null`, or not an object at all.
pub fn image_or_none<'de, D>(deserializer: D) -> Result<Option<ImageInput>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(value @ Value::Object(_)) => serde_json::from_value(value).ok(),
        _ => None,
    })
}

impl ImageInput {
    pub fn new(base64: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            base64: base64.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.base64.trim().is_empty() && !self.mime_type.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownscaleSettings {
    pub max_dimension: u32,
    pub jpeg_quality: u8,
}

pub fn detect_mime_type(data: &[u8]) -> Option<String> {
    if data.len() > 12 {
        let ftyp = &data[4..12];
        if ftyp.starts_with(b"ftyp") {
            let brand = &ftyp[4..8];
            if brand == b"heic" || brand == b"heif" || brand == b"hevc" {
                return Some("image/heic".to_string());
            }
        }
    }

    infer::get(data).map(|kind| kind.mime_type().to_string())
}

pub fn normalize_mime_type(mime_type: &str) -> String {
    let lowered = mime_type.trim().to_ascii_lowercase();
    match lowered.as_str() {
        "image/jpg" | "image/pjpeg" => "image/jpeg".to_string(),
        _ => lowered,
    }
}

pub fn is_supported_image_mime(mime_type: &str) -> bool {
    matches!(
        normalize_mime_type(mime_type).as_str(),
        "image/png" | "image/jpeg" | "image/webp" | "image/heic" | "image/heif"
    )
}

/// Shrinks the image so its longer side fits `max_dimension`, re-encoding as JPEG.
/// Images already within bounds come back unchanged.
pub fn downscale_image(
    input: &ImageInput,
    settings: &DownscaleSettings,
) -> Result<ImageInput, MediaError> {
    let bytes = general_purpose::STANDARD.decode(input.base64.trim())?;
    if bytes.is_empty() {
        return Err(MediaError::EmptyData);
    }

    if let Some(sniffed) = detect_mime_type(&bytes) {
        if sniffed != normalize_mime_type(&input.mime_type) {
            warn!(
                "Declared image type {} does not match payload type {}",
                input.mime_type, sniffed
            );
        }
    }

    let decoded =
        image::load_from_memory(&bytes).map_err(|err| MediaError::Decode(err.to_string()))?;
    let (width, height) = (decoded.width(), decoded.height());
    if width.max(height) <= settings.max_dimension {
        return Ok(input.clone());
    }

    let resized = decoded.resize(
        settings.max_dimension,
        settings.max_dimension,
        FilterType::Triangle,
    );
    let rgb = DynamicImage::ImageRgb8(resized.to_rgb8());
    let mut encoded = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut encoded, settings.jpeg_quality.clamp(1, 100));
    rgb.write_with_encoder(encoder)
        .map_err(|err| MediaError::Encode(err.to_string()))?;

    debug!(
        "Downscaled image {}x{} -> {}x{} ({} -> {} bytes)",
        width,
        height,
        rgb.width(),
        rgb.height(),
        bytes.len(),
        encoded.len()
    );

    Ok(ImageInput::new(
        general_purpose::STANDARD.encode(&encoded),
        "image/jpeg",
    ))
}
