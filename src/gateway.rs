use std::sync::Arc;

use async_trait::async_trait;
use tokio::task;
use tracing::{debug, info, warn};

use crate::lighting::{prompt_for, EffectRequest};
use crate::llm::media::{downscale_image, is_supported_image_mime, normalize_mime_type};
use crate::llm::media::{DownscaleSettings, ImageInput};
use crate::utils::timing::log_llm_timing;

const DEFAULT_RESPONSE_MIME: &str = "image/png";
const UNKNOWN_FAILURE_MESSAGE: &str = "Unknown server error";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("Missing image (base64 and mimeType required)")]
    MissingImage,
    #[error("Unsupported image type: {0}")]
    UnsupportedImageType(String),
    #[error("Server misconfiguration: missing API key")]
    ServiceMisconfigured,
    #[error("{0}")]
    GenerationFailed(String),
    #[error("No image returned from model")]
    NoImageReturned,
}

impl GatewayError {
    /// Failures the caller can fix by changing the request.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            GatewayError::MissingImage | GatewayError::UnsupportedImageType(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct EditorError(pub String);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: Option<String>,
    pub data: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponsePart {
    pub text: Option<String>,
    pub inline_data: Option<InlineImage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditResponse {
    pub parts: Vec<ResponsePart>,
}

/// One outbound image-editing call: image plus prompt in, content parts out.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageEditor: Send + Sync {
    async fn submit(
        &self,
        api_key: &str,
        model: &str,
        image: &ImageInput,
        prompt: &str,
    ) -> Result<EditResponse, EditorError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub image_data_url: String,
}

#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub api_key: Option<String>,
    pub model: String,
    pub downscale: Option<DownscaleSettings>,
}

pub struct GenerationGateway {
    settings: GatewaySettings,
    editor: Arc<dyn ImageEditor>,
}

fn first_image_data_url(response: &EditResponse) -> Option<String> {
    response.parts.iter().find_map(|part| {
        let inline = part.inline_data.as_ref()?;
        if inline.data.is_empty() {
            return None;
        }
        let mime_type = inline
            .mime_type
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_RESPONSE_MIME);
        Some(format!("data:{};base64,{}", mime_type, inline.data))
    })
}

/// Decoding and re-encoding run on the blocking pool; any failure keeps the original.
async fn downscale_off_runtime(image: ImageInput, settings: DownscaleSettings) -> ImageInput {
    let input = image.clone();
    match task::spawn_blocking(move || downscale_image(&input, &settings)).await {
        Ok(Ok(downscaled)) => downscaled,
        Ok(Err(err)) => {
            warn!("Image downscale skipped: {}", err);
            image
        }
        Err(err) => {
            warn!("Image downscale task failed: {}", err);
            image
        }
    }
}

impl GenerationGateway {
    pub fn new(settings: GatewaySettings, editor: Arc<dyn ImageEditor>) -> Self {
        Self { settings, editor }
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    pub async fn generate(
        &self,
        image: Option<ImageInput>,
        request: &EffectRequest,
    ) -> Result<GenerationResult, GatewayError> {
        let image = match image {
            Some(image) if image.is_complete() => image,
            _ => return Err(GatewayError::MissingImage),
        };
        if !is_supported_image_mime(&image.mime_type) {
            return Err(GatewayError::UnsupportedImageType(image.mime_type));
        }
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(GatewayError::ServiceMisconfigured)?;

        let prompt = prompt_for(request);
        if request.effect.uses_sunlight() {
            debug!(
                effect = request.effect.as_str(),
                intensity = request.intensity.level(),
                direction = request.direction.as_str(),
                prompt = %prompt,
                "Built lighting prompt"
            );
        } else {
            debug!(effect = request.effect.as_str(), prompt = %prompt, "Built lighting prompt");
        }

        let image = ImageInput::new(image.base64.trim(), normalize_mime_type(&image.mime_type));
        let image = match self.settings.downscale {
            Some(settings) => downscale_off_runtime(image, settings).await,
            None => image,
        };

        let metadata = serde_json::json!({
            "effect": request.effect.as_str(),
            "imageMime": image.mime_type,
            "imageLen": image.base64.len(),
        });
        let response = log_llm_timing(
            "gemini",
            &self.settings.model,
            "apply_lighting_effect",
            Some(metadata),
            || async {
                self.editor
                    .submit(api_key, &self.settings.model, &image, &prompt)
                    .await
                    .map_err(anyhow::Error::new)
            },
        )
        .await
        .map_err(|err| {
            let message = err.to_string();
            warn!("Lighting generation failed: {}", message);
            if message.trim().is_empty() {
                GatewayError::GenerationFailed(UNKNOWN_FAILURE_MESSAGE.to_string())
            } else {
                GatewayError::GenerationFailed(message)
            }
        })?;

        let image_data_url = first_image_data_url(&response).ok_or_else(|| {
            let text = response
                .parts
                .iter()
                .filter_map(|part| part.text.as_deref())
                .find(|text| !text.trim().is_empty())
                .unwrap_or_default();
            warn!(
                "Model {} returned {} part(s) without inline image data: {:?}",
                self.settings.model,
                response.parts.len(),
                text.chars().take(200).collect::<String>()
            );
            GatewayError::NoImageReturned
        })?;

        info!(
            "Lighting effect {} applied with model {}",
            request.effect.as_str(),
            self.settings.model
        );
        Ok(GenerationResult { image_data_url })
    }
}
