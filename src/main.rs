// src/main.rs
use actix_web::{App, HttpResponse, HttpServer, middleware, web};
use anyhow::Context;
use log::info;
use std::path::PathBuf;
use std::sync::Arc;

mod config;
mod errors;
mod handlers;
mod models;
mod services;
#[cfg(test)]
mod test_support;

use crate::config::AppConfig;
use crate::handlers::{index, list_styles, redesign};
use crate::services::providers::build_provider;
use crate::services::{PipelineOptions, RedesignService, RetryPolicy, StyleCatalog};

#[derive(Clone)]
pub struct AppState {
    service: Arc<RedesignService>,
    catalog: Arc<StyleCatalog>,
    provider_label: &'static str,
    static_dir: PathBuf,
    max_upload_bytes: usize,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting Restyle service...");

    let config = AppConfig::from_env().context("invalid configuration")?;

    // Initialize services
    let catalog = Arc::new(StyleCatalog::new());
    let provider = build_provider(&config).context("failed to initialise provider")?;
    let options = PipelineOptions {
        max_dimension: config.preprocess.then_some(config.max_image_dimension),
        retry: config
            .retry_enabled
            .then(|| RetryPolicy::new(config.retry_attempts, config.retry_delay)),
    };

    info!(
        "Using provider '{}' (preprocess: {:?}, retry: {:?}, timeout: {:?})",
        config.provider, options.max_dimension, options.retry, config.request_timeout
    );

    let app_state = AppState {
        service: Arc::new(RedesignService::new(catalog.clone(), provider, options)),
        catalog,
        provider_label: config.provider.as_str(),
        static_dir: config.static_dir.clone(),
        max_upload_bytes: config.max_upload_bytes,
    };

    let (host, port) = config.bind_address();
    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(middleware::Logger::default())
            .configure(routes)
    })
    .bind((host.as_str(), port))
    .with_context(|| format!("failed to bind {}:{}", host, port))?
    .run()
    .await
    .context("HTTP server error")
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/styles", web::get().to(list_styles))
        .route("/redesign", web::post().to(redesign))
        .route("/health", web::get().to(health_check));
}

async fn health_check(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "restyle",
        "version": env!("CARGO_PKG_VERSION"),
        "provider": data.provider_label,
    }))
}
