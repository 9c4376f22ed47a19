use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, warn};

use crate::gateway::GatewayError;
use crate::lighting::{EffectRequest, LightingEffect, SunlightDirection, SunlightIntensity};
use crate::llm::media::{image_or_none, ImageInput};
use crate::state::AppState;
use crate::utils::timing::{complete_request_timer, start_request_timer};

const GENERATE_ROUTE: &str = "/api/generate";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default, deserialize_with = "image_or_none")]
    pub image: Option<ImageInput>,
    pub effect: Option<Value>,
    pub sunlight_intensity: Option<Value>,
    pub sunlight_direction: Option<Value>,
}

impl GenerateRequest {
    fn effect_name(&self) -> Option<&str> {
        self.effect.as_ref().and_then(Value::as_str)
    }

    pub fn effect_request(&self) -> EffectRequest {
        EffectRequest::new(
            LightingEffect::from_wire(self.effect_name().unwrap_or_default()),
            SunlightIntensity::from_json(self.sunlight_intensity.as_ref()),
            SunlightDirection::from_wire(
                self.sunlight_direction
                    .as_ref()
                    .and_then(Value::as_str)
                    .unwrap_or_default(),
            ),
        )
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

fn gateway_status(err: &GatewayError) -> StatusCode {
    if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

/// POST /api/generate
pub async fn generate_handler(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            let status = if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                StatusCode::PAYLOAD_TOO_LARGE
            } else {
                StatusCode::BAD_REQUEST
            };
            let message = rejection.body_text();
            warn!("Rejected generate request body: {}", message);
            let mut timer = start_request_timer(GENERATE_ROUTE, None);
            complete_request_timer(&mut timer, status.as_u16(), Some(message.clone()));
            return error_response(status, message);
        }
    };

    let mut timer = start_request_timer(GENERATE_ROUTE, request.effect_name());
    let effect_request = request.effect_request();

    match state.gateway.generate(request.image, &effect_request).await {
        Ok(result) => {
            complete_request_timer(&mut timer, StatusCode::OK.as_u16(), None);
            (
                StatusCode::OK,
                Json(json!({ "image": result.image_data_url })),
            )
                .into_response()
        }
        Err(err) => {
            let status = gateway_status(&err);
            if status.is_server_error() {
                error!("generate api error: {}", err);
            } else {
                warn!("generate api rejected request: {}", err);
            }
            complete_request_timer(&mut timer, status.as_u16(), Some(err.to_string()));
            error_response(status, err.to_string())
        }
    }
}

pub async fn method_not_allowed() -> Response {
    error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

/// GET /api/health
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "status": "ok", "model": state.gateway.model() }))
}
