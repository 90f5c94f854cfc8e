// src/errors.rs
use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PredictorError {
    #[error("Vision service error: {0}")]
    Vision(String),

    #[error("Image generation error: {0}")]
    Generation(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Provider billing error: {0}")]
    Billing(String),

    #[error("Content safety rejection: {0}")]
    ContentSafety(String),

    #[error("All {attempts} generation models failed; last error: {last_error}")]
    ModelsExhausted { attempts: usize, last_error: String },

    #[error("Feature extraction inconclusive after retries")]
    Inconclusive,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PredictorError {
    /// Classify a raw provider error message. Rate-limit, billing, and
    /// content-safety conditions are expected to affect every fallback model
    /// equally, so they get their own non-retryable variants.
    pub fn from_provider(detail: impl Into<String>) -> Self {
        let detail = detail.into();
        let lowered = detail.to_lowercase();

        if lowered.contains("rate limit")
            || lowered.contains("too many requests")
            || lowered.contains("429")
        {
            PredictorError::RateLimited(detail)
        } else if lowered.contains("402")
            || lowered.contains("payment required")
            || lowered.contains("billing")
            || lowered.contains("insufficient credit")
            || lowered.contains("spend limit")
        {
            PredictorError::Billing(detail)
        } else if lowered.contains("nsfw")
            || lowered.contains("safety")
            || lowered.contains("content policy")
            || lowered.contains("flagged")
        {
            PredictorError::ContentSafety(detail)
        } else {
            PredictorError::Generation(detail)
        }
    }

    /// True for failure classes where switching to another fallback model is
    /// not expected to help.
    pub fn is_non_retryable(&self) -> bool {
        matches!(
            self,
            PredictorError::RateLimited(_)
                | PredictorError::Billing(_)
                | PredictorError::ContentSafety(_)
        )
    }

    /// Human-readable message shown to end users. Internal detail stays in
    /// the logs.
    pub fn user_message(&self) -> String {
        match self {
            PredictorError::RateLimited(_) => {
                "Too many requests right now. Please try again later.".to_string()
            }
            PredictorError::Billing(_) => {
                "The prediction service is temporarily unavailable. Please try again soon."
                    .to_string()
            }
            PredictorError::ContentSafety(_) => {
                "The photos could not be processed. Please try different photos.".to_string()
            }
            PredictorError::ModelsExhausted { attempts, .. } => format!(
                "Image generation failed across all {} configured models. Please try again.",
                attempts
            ),
            PredictorError::Validation(detail) => detail.clone(),
            _ => "Something went wrong while generating the prediction. Please try again."
                .to_string(),
        }
    }
}

impl ResponseError for PredictorError {
    fn status_code(&self) -> StatusCode {
        match self {
            PredictorError::Validation(_) => StatusCode::BAD_REQUEST,
            PredictorError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            PredictorError::Billing(_) | PredictorError::ModelsExhausted { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            PredictorError::ContentSafety(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.user_message(),
            "detail": self.to_string(),
        }))
    }
}
