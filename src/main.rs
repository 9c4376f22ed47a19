use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use tracing::{info, warn};

mod config;
mod gateway;
mod handlers;
mod lighting;
mod llm;
mod state;
mod utils;

use config::{Config, API_KEY_VARIABLES};
use gateway::GenerationGateway;
use llm::GeminiImageEditor;
use state::AppState;
use utils::http::build_http_client;
use utils::logging::init_logging;

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let config = Config::load()?;
    let _guards = init_logging(&config.log_dir, &config.log_level);
    for warning in &config.warnings {
        warn!("{}", warning);
    }

    if config.gemini_api_key.is_none() {
        warn!(
            "No Gemini API key found in {}; generation requests will fail until one is set.",
            API_KEY_VARIABLES.join("/")
        );
    }
    if let Some(downscale) = config.downscale() {
        info!(
            "Downscaling uploads above {}px (JPEG quality {})",
            downscale.max_dimension, downscale.jpeg_quality
        );
    }

    let client = build_http_client(config.gemini_timeout).context("Failed to build HTTP client")?;
    let editor = GeminiImageEditor::new(client, config.gemini_base_url.clone());
    let gateway = GenerationGateway::new(config.gateway_settings(), Arc::new(editor));
    let app = handlers::router(AppState::new(gateway), config.max_body_bytes);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(
        "Starting relight gateway on {} (model {})",
        addr, config.gemini_image_model
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    Ok(())
}
