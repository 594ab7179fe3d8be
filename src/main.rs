// src/main.rs
use actix_web::{App, HttpResponse, HttpServer, middleware, web};
use anyhow::Context;
use log::info;
use std::sync::Arc;
use std::time::Duration;

mod config;
mod errors;
mod handlers;
mod models;
mod presets;
mod prompts;
mod services;

use crate::config::AppConfig;
use crate::errors::StudioError;
use crate::services::{
    GeminiBackend, GenerationClient, ImageProcessor, ModelSettings, SessionStore,
};

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct AppState {
    sessions: Arc<SessionStore>,
    image_processor: Arc<ImageProcessor>,
    max_upload_bytes: usize,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting Lookbook service...");

    let config = AppConfig::from_env().map_err(|e| StudioError::Config(e.to_string()))?;

    // Initialize services
    let backend = GeminiBackend::new(
        config.gemini_api_key.clone(),
        &config.gemini_api_base,
        Duration::from_secs(config.request_timeout_secs),
    )
    .context("failed to build the generative backend client")?;
    let image_processor = ImageProcessor::new(config.max_image_dimension);
    let client = Arc::new(GenerationClient::new(
        Arc::new(backend),
        image_processor.clone(),
        ModelSettings::from(&config),
    ));
    let sessions = Arc::new(SessionStore::new(
        client,
        chrono::Duration::seconds(config.session_ttl_secs),
    ));

    let sweeper = sessions.clone();
    actix_web::rt::spawn(async move {
        let mut ticks = actix_web::rt::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            ticks.tick().await;
            sweeper.purge_expired();
        }
    });

    let app_state = AppState {
        sessions,
        image_processor: Arc::new(image_processor),
        max_upload_bytes: config.max_upload_bytes,
    };

    info!(
        "Image model {}, text model {}",
        config.image_model, config.text_model
    );
    info!("Starting HTTP server on {}", config.bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(middleware::Logger::default())
            .configure(handlers::configure)
            .route("/health", web::get().to(health_check))
    })
    .bind(&config.bind_addr)
    .with_context(|| format!("failed to bind {}", config.bind_addr))?
    .run()
    .await?;

    Ok(())
}

async fn health_check(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "lookbook",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": data.sessions.len()
    }))
}
