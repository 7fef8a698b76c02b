// src/main.rs
use actix_files::Files;
use actix_web::{App, HttpServer, middleware, web};
use anyhow::Context;
use log::info;
use std::sync::Arc;

mod config;
mod errors;
mod handlers;
mod mcp;
mod models;
mod services;

use crate::config::Config;
use crate::errors::UxLensError;
use crate::mcp::ToolRegistry;
use crate::services::llm_service::Provider;
use crate::services::{AnalysisPipeline, ImageProcessor, LLMService};

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<AnalysisPipeline>,
    tools: Arc<ToolRegistry>,
    default_provider: Provider,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self, UxLensError> {
        let llm_service = Arc::new(LLMService::new(config)?);
        let image_processor = Arc::new(ImageProcessor::new());
        let pipeline = Arc::new(AnalysisPipeline::new(llm_service, image_processor));
        let tools = Arc::new(ToolRegistry::new(
            pipeline.clone(),
            config.default_provider,
        ));

        Ok(Self {
            pipeline,
            tools,
            default_provider: config.default_provider,
        })
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting UxLens service...");

    let config = Config::from_env().context("Invalid configuration")?;
    let app_state = AppState::new(&config).context("Failed to initialize services")?;

    info!(
        "Default provider: {} ({})",
        config.default_provider,
        match config.default_provider {
            Provider::OpenAI => &config.openai_model,
            Provider::Anthropic => &config.anthropic_model,
        }
    );
    if let Some(dir) = &config.static_dir {
        info!("Serving static files from {}", dir.display());
    }
    info!("Starting HTTP server on {}", config.bind_addr);

    let static_dir = config.static_dir.clone();
    HttpServer::new(move || {
        let app = App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(middleware::Logger::default())
            .configure(handlers::routes);

        match &static_dir {
            Some(dir) => app.service(Files::new("/", dir).index_file("index.html")),
            None => app,
        }
    })
    .bind(&config.bind_addr)
    .with_context(|| format!("Failed to bind {}", config.bind_addr))?
    .run()
    .await
    .context("HTTP server error")
}
