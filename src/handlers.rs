// src/handlers.rs
use crate::{AppState, models::GenerationRequest};
use actix_web::{Error, HttpResponse, web};
use log::info;
use uuid::Uuid;

pub async fn predict(
    body: web::Json<GenerationRequest>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let request_id = Uuid::new_v4();
    let request = body.into_inner();
    request.validate()?;

    info!(
        "[{}] prediction request (similarity={}, age={}, gender={:?})",
        request_id, request.similarity, request.age, request.gender
    );

    let result = data.pipeline.run(&request).await;

    info!(
        "[{}] pipeline finished in {}ms (success={})",
        request_id, result.processing_time_ms, result.success
    );

    Ok(HttpResponse::Ok().json(result))
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "cradle",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
