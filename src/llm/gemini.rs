use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};
use url::Url;

use crate::gateway::{EditResponse, EditorError, ImageEditor, InlineImage, ResponsePart};
use crate::llm::media::ImageInput;

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    parts: Option<Vec<GeminiPart>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    text: Option<String>,
    inline_data: Option<GeminiInlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: Option<String>,
    data: Option<String>,
}

/// Production `ImageEditor` over the Gemini `generateContent` REST endpoint.
#[derive(Clone)]
pub struct GeminiImageEditor {
    client: Client,
    base_url: Url,
}

fn redact_api_key(text: &str, api_key: &str) -> String {
    let key = api_key.trim();
    if key.is_empty() {
        return text.to_string();
    }
    text.replace(key, "[redacted]")
}

fn truncate_for_log(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let truncated: String = value.chars().take(limit).collect();
    format!("{truncated}... (truncated)")
}

fn summarize_error_body(body: &str) -> (Option<String>, String) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return (None, "empty response body".to_string());
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        let message = value
            .pointer("/error/message")
            .and_then(|v| v.as_str())
            .map(|v| v.to_string())
            .or_else(|| {
                value
                    .get("message")
                    .and_then(|v| v.as_str())
                    .map(|v| v.to_string())
            });
        return (message, truncate_for_log(&value.to_string(), 2000));
    }

    (None, truncate_for_log(trimmed, 2000))
}

fn summarize_response(response: &GeminiResponse) -> Value {
    let candidates = response.candidates.as_deref().unwrap_or(&[]);
    let parts = candidates
        .first()
        .and_then(|candidate| candidate.content.as_ref())
        .and_then(|content| content.parts.as_deref())
        .unwrap_or(&[]);

    let mut text_parts = 0usize;
    let mut image_parts = 0usize;
    let mut text_preview = None;

    for part in parts {
        if let Some(text) = part.text.as_deref() {
            text_parts += 1;
            if text_preview.is_none() && !text.trim().is_empty() {
                text_preview = Some(truncate_for_log(text, 200));
            }
        }
        if part
            .inline_data
            .as_ref()
            .and_then(|inline| inline.data.as_deref())
            .is_some_and(|data| !data.is_empty())
        {
            image_parts += 1;
        }
    }

    json!({
        "candidates": candidates.len(),
        "textParts": text_parts,
        "imageParts": image_parts,
        "textPreview": text_preview
    })
}

fn build_edit_payload(image: &ImageInput, prompt: &str) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [
                {
                    "inlineData": {
                        "data": image.base64,
                        "mimeType": image.mime_type
                    }
                },
                { "text": prompt }
            ]
        }],
        "generationConfig": {
            "responseModalities": ["IMAGE"]
        }
    })
}

fn into_edit_response(response: GeminiResponse) -> EditResponse {
    let parts = response
        .candidates
        .unwrap_or_default()
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts)
        .unwrap_or_default()
        .into_iter()
        .map(|part| ResponsePart {
            text: part.text,
            inline_data: part.inline_data.and_then(|inline| {
                inline.data.map(|data| InlineImage {
                    mime_type: inline.mime_type,
                    data,
                })
            }),
        })
        .collect();
    EditResponse { parts }
}

impl GeminiImageEditor {
    pub fn new(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    fn endpoint(&self, model: &str) -> Result<Url, EditorError> {
        self.base_url
            .join(&format!("v1beta/models/{}:generateContent", model.trim()))
            .map_err(|err| EditorError(format!("Invalid Gemini endpoint for model {model}: {err}")))
    }
}

#[async_trait]
impl ImageEditor for GeminiImageEditor {
    async fn submit(
        &self,
        api_key: &str,
        model: &str,
        image: &ImageInput,
        prompt: &str,
    ) -> Result<EditResponse, EditorError> {
        let url = self.endpoint(model)?;
        let payload = build_edit_payload(image, prompt);

        if tracing::enabled!(tracing::Level::DEBUG) {
            debug!(
                target: "llm.gemini",
                model = model,
                image_mime = %image.mime_type,
                image_len = image.base64.len(),
                prompt = %truncate_for_log(prompt, 200)
            );
        }

        let response = match self
            .client
            .post(url)
            .header("x-goog-api-key", api_key)
            .json(&payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                let err_text = redact_api_key(&err.to_string(), api_key);
                warn!(
                    "Gemini request failed to send: {} (timeout={}, connect={}, status={:?})",
                    err_text,
                    err.is_timeout(),
                    err.is_connect(),
                    err.status()
                );
                return Err(EditorError(err_text));
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let (message, body_summary) = summarize_error_body(&body);
            warn!("Gemini API error: status={}, body={}", status, body_summary);
            let detail = message.unwrap_or(body_summary);
            return Err(EditorError(format!(
                "Gemini request failed with status {}: {}",
                status, detail
            )));
        }

        let value = response
            .json::<GeminiResponse>()
            .await
            .map_err(|err| EditorError(redact_api_key(&err.to_string(), api_key)))?;

        if tracing::enabled!(tracing::Level::DEBUG) {
            debug!(target: "llm.gemini", model = model, response = %summarize_response(&value));
        }
        Ok(into_edit_response(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_carries_image_then_prompt_and_requests_images() {
        let image = ImageInput::new("AAAA", "image/png");
        let payload = build_edit_payload(&image, "Add sunlight");

        assert_eq!(
            payload.pointer("/contents/0/parts/0/inlineData/data"),
            Some(&json!("AAAA"))
        );
        assert_eq!(
            payload.pointer("/contents/0/parts/0/inlineData/mimeType"),
            Some(&json!("image/png"))
        );
        assert_eq!(
            payload.pointer("/contents/0/parts/1/text"),
            Some(&json!("Add sunlight"))
        );
        assert_eq!(
            payload.pointer("/generationConfig/responseModalities"),
            Some(&json!(["IMAGE"]))
        );
    }

    #[test]
    fn response_parts_come_from_the_first_candidate() {
        let raw = json!({
            "candidates": [
                {
                    "content": {
                        "parts": [
                            { "text": "Done" },
                            { "inlineData": { "mimeType": "image/png", "data": "AAAA" } },
                            { "inlineData": { "data": "BBBB" } }
                        ]
                    }
                },
                {
                    "content": {
                        "parts": [{ "inlineData": { "mimeType": "image/png", "data": "ZZZZ" } }]
                    }
                }
            ]
        });
        let response: GeminiResponse = serde_json::from_value(raw).unwrap();
        let edit = into_edit_response(response);

        assert_eq!(edit.parts.len(), 3);
        assert_eq!(edit.parts[0].text.as_deref(), Some("Done"));
        assert_eq!(
            edit.parts[1].inline_data,
            Some(InlineImage {
                mime_type: Some("image/png".to_string()),
                data: "AAAA".to_string(),
            })
        );
        assert_eq!(
            edit.parts[2].inline_data,
            Some(InlineImage {
                mime_type: None,
                data: "BBBB".to_string(),
            })
        );
    }

    #[test]
    fn empty_response_has_no_parts() {
        let response: GeminiResponse = serde_json::from_value(json!({})).unwrap();
        assert!(into_edit_response(response).parts.is_empty());

        let response: GeminiResponse =
            serde_json::from_value(json!({ "candidates": [{ "finishReason": "SAFETY" }] }))
                .unwrap();
        assert!(into_edit_response(response).parts.is_empty());
    }

    #[test]
    fn error_bodies_surface_the_service_message() {
        let (message, _) = summarize_error_body(
            r#"{"error":{"code":429,"message":"Resource has been exhausted","status":"RESOURCE_EXHAUSTED"}}"#,
        );
        assert_eq!(message.as_deref(), Some("Resource has been exhausted"));

        let (message, summary) = summarize_error_body("upstream connect error");
        assert!(message.is_none());
        assert_eq!(summary, "upstream connect error");

        let (message, summary) = summarize_error_body("   ");
        assert!(message.is_none());
        assert_eq!(summary, "empty response body");
    }

    #[test]
    fn api_key_is_redacted_from_messages() {
        assert_eq!(
            redact_api_key("request to ?key=secret123 failed", "secret123"),
            "request to ?key=[redacted] failed"
        );
        assert_eq!(redact_api_key("no key here", ""), "no key here");
    }

    #[test]
    fn endpoint_joins_model_onto_base_url() {
        let editor = GeminiImageEditor::new(
            Client::new(),
            Url::parse("https://generativelanguage.googleapis.com/").unwrap(),
        );
        assert_eq!(
            editor.endpoint("gemini-2.5-flash-image").unwrap().as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash-image:generateContent"
        );
    }
}
