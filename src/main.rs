// src/main.rs
use actix_web::{App, HttpServer, middleware, web};
use anyhow::Context;
use log::info;
use std::sync::Arc;

mod errors;
mod handlers;
mod models;
mod services;

use crate::handlers::{health, predict};
use crate::services::{OpenAiVision, PredictionPipeline, ReplicateClient};

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<PredictionPipeline>,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting cradle service...");

    let openai_key = std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY must be set")?;
    let replicate_token =
        std::env::var("REPLICATE_API_TOKEN").context("REPLICATE_API_TOKEN must be set")?;
    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    let vision = Arc::new(OpenAiVision::new(openai_key));
    let model = Arc::new(ReplicateClient::new(replicate_token));
    let pipeline = Arc::new(PredictionPipeline::new(vision, model));

    let app_state = AppState { pipeline };

    info!("Starting HTTP server on {}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().limit(20 * 1024 * 1024))
            .wrap(middleware::Logger::default())
            .service(web::scope("/api/v1").route("/predict", web::post().to(predict)))
            .route("/health", web::get().to(health))
    })
    .bind(&bind_addr)?
    .run()
    .await?;

    Ok(())
}
