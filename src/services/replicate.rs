// src/services/replicate.rs
//
// Fallback-chained image generation. An ordered list of model
// configurations is tried sequentially; the first one producing a valid
// image URL wins, and non-retryable provider errors abort the whole chain.

use crate::errors::PredictorError;
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use log::{info, warn};
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;

/// Seam for the image-generation provider. Output shape is deliberately
/// untyped; all normalization happens on this side of the boundary.
#[async_trait]
pub trait ImageModel: Send + Sync {
    async fn run(&self, version: &str, input: &Value) -> Result<ModelOutput, PredictorError>;
}

/// The provider's heterogeneous return shapes, reduced to two variants:
/// structured JSON (string / array / object) or a raw image body.
#[derive(Debug, Clone)]
pub enum ModelOutput {
    Json(Value),
    Binary(Bytes),
}

#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub name: &'static str,
    pub version: &'static str,
    pub prompt_prefix: &'static str,
    pub negative_prompt: &'static str,
    pub width: u32,
    pub height: u32,
    pub num_inference_steps: u32,
    pub guidance_scale: f64,
    pub scheduler: &'static str,
}

/// Primary model plus two fallbacks, each with its own sampler settings.
pub fn default_model_chain() -> Vec<ModelConfig> {
    vec![
        ModelConfig {
            name: "sdxl",
            version: "stability-ai/sdxl:39ed52f2a78e934b3ba6e2a89f5b1c712de7dfea535525255b1aa35c5565e08b",
            prompt_prefix: "professional portrait photograph, ",
            negative_prompt: "deformed, disfigured, extra limbs, bad anatomy, blurry, \
                              monochrome, sepia, black and white, cartoon, painting, text",
            width: 768,
            height: 768,
            num_inference_steps: 30,
            guidance_scale: 7.5,
            scheduler: "K_EULER",
        },
        ModelConfig {
            name: "playground-v2.5",
            version: "playgroundai/playground-v2.5-1024px-aesthetic:a45f82a1382bed5c7aeb861dac7c7d191b0fdf74d8d57c4a0e6ed7d4d0bf7d24",
            prompt_prefix: "studio photo, ",
            negative_prompt: "ugly, deformed, noisy, low quality, monochrome, sepia, \
                              grayscale, watermark, illustration",
            width: 1024,
            height: 1024,
            num_inference_steps: 25,
            guidance_scale: 3.0,
            scheduler: "DPMSolver++",
        },
        ModelConfig {
            name: "realvisxl",
            version: "lucataco/realvisxl-v2.0:7d6a2f9c4754477b12c14ed2a58f89bb85128edcdd581d24ce58b6926029de08",
            prompt_prefix: "RAW photo, ",
            negative_prompt: "worst quality, low quality, bad anatomy, watermark, \
                              monochrome, sepia, drawing, anime",
            width: 832,
            height: 832,
            num_inference_steps: 40,
            guidance_scale: 7.0,
            scheduler: "DPM++ SDE Karras",
        },
    ]
}

pub struct ModelInvoker {
    model: std::sync::Arc<dyn ImageModel>,
    chain: Vec<ModelConfig>,
    attempt_timeout: Duration,
    inter_attempt_delay: Duration,
}

impl ModelInvoker {
    pub fn new(model: std::sync::Arc<dyn ImageModel>) -> Self {
        Self {
            model,
            chain: default_model_chain(),
            attempt_timeout: Duration::from_secs(60),
            inter_attempt_delay: Duration::from_secs(2),
        }
    }

    pub fn with_timing(mut self, attempt_timeout: Duration, inter_attempt_delay: Duration) -> Self {
        self.attempt_timeout = attempt_timeout;
        self.inter_attempt_delay = inter_attempt_delay;
        self
    }

    /// Try each configured model in order until one yields a valid image
    /// URL. Rate-limit, billing, and content-safety errors abort the chain
    /// immediately; everything else advances to the next configuration.
    pub async fn generate(&self, prompt: &str) -> Result<String, PredictorError> {
        let mut last_error = PredictorError::Generation("no models configured".to_string());

        for (index, config) in self.chain.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.inter_attempt_delay).await;
            }
            info!(
                "trying model {} ({}/{})",
                config.name,
                index + 1,
                self.chain.len()
            );

            let input = build_input(config, prompt);
            match tokio::time::timeout(self.attempt_timeout, self.model.run(config.version, &input))
                .await
            {
                Err(_) => {
                    warn!("model {} timed out", config.name);
                    last_error =
                        PredictorError::Generation(format!("model {} timed out", config.name));
                }
                Ok(Err(err)) if err.is_non_retryable() => return Err(err),
                Ok(Err(err)) => {
                    warn!("model {} failed: {}", config.name, err);
                    last_error = err;
                }
                Ok(Ok(output)) => match normalize_to_url(&output) {
                    Some(url) => {
                        info!("model {} produced an image", config.name);
                        return Ok(url);
                    }
                    None => {
                        warn!("model {} returned no recognizable image URL", config.name);
                        last_error = PredictorError::Generation(format!(
                            "model {} returned no recognizable image URL",
                            config.name
                        ));
                    }
                },
            }
        }

        Err(PredictorError::ModelsExhausted {
            attempts: self.chain.len(),
            last_error: last_error.to_string(),
        })
    }
}

fn build_input(config: &ModelConfig, prompt: &str) -> Value {
    json!({
        "prompt": format!("{}{}", config.prompt_prefix, prompt),
        "negative_prompt": config.negative_prompt,
        "width": config.width,
        "height": config.height,
        "num_inference_steps": config.num_inference_steps,
        "guidance_scale": config.guidance_scale,
        "scheduler": config.scheduler,
        "num_outputs": 1,
    })
}

/// Reduce whatever shape the provider returned to a single image URL.
/// JSON output goes through a bounded recursive extractor, then a
/// last-resort scan of string values for an embedded http(s) URL; a raw
/// image body becomes a base64 data URL.
pub fn normalize_to_url(output: &ModelOutput) -> Option<String> {
    match output {
        ModelOutput::Binary(bytes) => Some(binary_data_url(bytes)),
        ModelOutput::Json(value) => {
            extract_url(value, 0).or_else(|| bare_http_string(value))
        }
    }
}

fn binary_data_url(bytes: &Bytes) -> String {
    format!(
        "data:image/png;base64,{}",
        general_purpose::STANDARD.encode(bytes)
    )
}

fn extract_url(value: &Value, depth: usize) -> Option<String> {
    if depth > 4 {
        return None;
    }
    match value {
        Value::String(s) if is_image_url(s) => Some(s.clone()),
        Value::Array(items) => items.iter().find_map(|item| extract_url(item, depth + 1)),
        Value::Object(map) => {
            // URL-bearing keys first, then anything else.
            for key in ["url", "href", "output", "image", "images", "uri"] {
                if let Some(nested) = map.get(key) {
                    if let Some(url) = extract_url(nested, depth + 1) {
                        return Some(url);
                    }
                }
            }
            map.values().find_map(|nested| extract_url(nested, depth + 1))
        }
        _ => None,
    }
}

/// Last resort: scan JSON string values for an embedded http(s) URL. Only
/// string values are considered, never key names, and a candidate must
/// carry a real scheme prefix.
fn bare_http_string(value: &Value) -> Option<String> {
    bare_http_in_value(value, 0)
}

fn bare_http_in_value(value: &Value, depth: usize) -> Option<String> {
    if depth > 4 {
        return None;
    }
    match value {
        Value::String(s) => scheme_url_in(s),
        Value::Array(items) => items
            .iter()
            .find_map(|item| bare_http_in_value(item, depth + 1)),
        Value::Object(map) => map
            .values()
            .find_map(|nested| bare_http_in_value(nested, depth + 1)),
        _ => None,
    }
}

fn scheme_url_in(text: &str) -> Option<String> {
    let start = match (text.find("http://"), text.find("https://")) {
        (Some(a), Some(b)) => a.min(b),
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => return None,
    };
    let tail = &text[start..];
    let end = tail
        .find(|c: char| c.is_whitespace() || matches!(c, '"' | '\'' | ',' | '}' | ']'))
        .unwrap_or(tail.len());
    Some(tail[..end].to_string())
}

pub fn is_image_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://") || s.starts_with("data:image")
}

/// Replicate predictions API client: create a prediction, poll until it
/// reaches a terminal status, hand back the raw `output` JSON.
pub struct ReplicateClient {
    client: Client,
    api_token: String,
    poll_interval: Duration,
}

impl ReplicateClient {
    pub fn new(api_token: String) -> Self {
        Self {
            client: Client::new(),
            api_token,
            poll_interval: Duration::from_secs(1),
        }
    }
}

#[async_trait]
impl ImageModel for ReplicateClient {
    async fn run(&self, version: &str, input: &Value) -> Result<ModelOutput, PredictorError> {
        // Accept both "owner/model:hash" and a bare version hash.
        let version_id = version.rsplit(':').next().unwrap_or(version);

        let response = self
            .client
            .post("https://api.replicate.com/v1/predictions")
            .header("Authorization", format!("Token {}", self.api_token))
            .json(&json!({ "version": version_id, "input": input }))
            .send()
            .await
            .map_err(|e| PredictorError::Generation(format!("replicate request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PredictorError::from_provider(format!(
                "replicate returned {}: {}",
                status, body
            )));
        }

        let created: Value = response.json().await.map_err(|e| {
            PredictorError::Serialization(format!("invalid replicate response: {}", e))
        })?;
        let prediction_id = created["id"]
            .as_str()
            .ok_or_else(|| PredictorError::Generation("prediction id missing".to_string()))?
            .to_string();

        // The caller bounds this loop with its per-attempt timeout.
        loop {
            tokio::time::sleep(self.poll_interval).await;

            let poll = self
                .client
                .get(format!(
                    "https://api.replicate.com/v1/predictions/{}",
                    prediction_id
                ))
                .header("Authorization", format!("Token {}", self.api_token))
                .send()
                .await
                .map_err(|e| PredictorError::Generation(format!("replicate poll failed: {}", e)))?
                .json::<Value>()
                .await
                .map_err(|e| {
                    PredictorError::Serialization(format!("invalid poll response: {}", e))
                })?;

            match poll["status"].as_str().unwrap_or("unknown") {
                "succeeded" => return Ok(ModelOutput::Json(poll["output"].clone())),
                "failed" | "canceled" => {
                    let detail = poll["error"].as_str().unwrap_or("prediction failed");
                    return Err(PredictorError::from_provider(detail));
                }
                _ => continue,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedModel {
        outcomes: Mutex<Vec<Result<ModelOutput, PredictorError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedModel {
        fn new(outcomes: Vec<Result<ModelOutput, PredictorError>>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes),
                calls: AtomicUsize::new(0),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ImageModel for ScriptedModel {
        async fn run(&self, _version: &str, _input: &Value) -> Result<ModelOutput, PredictorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut outcomes = self.outcomes.lock().unwrap();
            if outcomes.is_empty() {
                Err(PredictorError::Generation("script exhausted".into()))
            } else {
                outcomes.remove(0)
            }
        }
    }

    fn invoker(model: Arc<ScriptedModel>) -> ModelInvoker {
        ModelInvoker::new(model).with_timing(Duration::from_secs(5), Duration::ZERO)
    }

    fn json_output(value: Value) -> Result<ModelOutput, PredictorError> {
        Ok(ModelOutput::Json(value))
    }

    #[test]
    fn normalize_accepts_a_plain_url_string() {
        let output = ModelOutput::Json(json!("https://img.example/baby.png"));
        assert_eq!(
            normalize_to_url(&output),
            Some("https://img.example/baby.png".to_string())
        );
    }

    #[test]
    fn normalize_walks_arrays_and_nested_objects() {
        let output = ModelOutput::Json(json!(["https://img.example/first.png"]));
        assert_eq!(
            normalize_to_url(&output),
            Some("https://img.example/first.png".to_string())
        );

        let output = ModelOutput::Json(json!({
            "output": { "images": [{ "url": "https://img.example/nested.png" }] }
        }));
        assert_eq!(
            normalize_to_url(&output),
            Some("https://img.example/nested.png".to_string())
        );
    }

    #[test]
    fn normalize_rejects_unrecognizable_shapes() {
        for value in [json!({}), json!([]), json!(null), json!("banana"), json!(42)] {
            assert_eq!(normalize_to_url(&ModelOutput::Json(value)), None);
        }
    }

    #[test]
    fn normalize_encodes_binary_output_as_a_data_url() {
        let output = ModelOutput::Binary(Bytes::from_static(b"\x89PNG fake"));
        let url = normalize_to_url(&output).unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn bare_http_scan_is_a_last_resort() {
        let output = ModelOutput::Json(json!({
            "detail": "result at https://img.example/hidden.png ready"
        }));
        assert_eq!(
            normalize_to_url(&output),
            Some("https://img.example/hidden.png".to_string())
        );
    }

    #[test]
    fn bare_http_scan_ignores_key_names() {
        let output = ModelOutput::Json(json!({"http_status": 500}));
        assert_eq!(normalize_to_url(&output), None);
    }

    #[test]
    fn bare_http_scan_requires_a_scheme_prefix() {
        for value in [
            json!("the http thing failed"),
            json!({"detail": "httpbin is down"}),
            json!(["no url here", {"note": "see http docs"}]),
        ] {
            assert_eq!(normalize_to_url(&ModelOutput::Json(value)), None);
        }
    }

    #[tokio::test]
    async fn first_success_short_circuits_the_chain() {
        let model = ScriptedModel::new(vec![
            Err(PredictorError::Generation("model one broke".into())),
            json_output(json!(["https://img.example/second.png"])),
            json_output(json!(["https://img.example/third.png"])),
        ]);
        let url = invoker(model.clone()).generate("prompt").await.unwrap();

        assert_eq!(url, "https://img.example/second.png");
        assert_eq!(model.call_count(), 2, "third model must not be attempted");
    }

    #[tokio::test]
    async fn rate_limit_aborts_remaining_models() {
        let model = ScriptedModel::new(vec![
            Err(PredictorError::from_provider("429 Too Many Requests")),
            json_output(json!(["https://img.example/unreachable.png"])),
        ]);
        let err = invoker(model.clone()).generate("prompt").await.unwrap_err();

        assert!(matches!(err, PredictorError::RateLimited(_)));
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn billing_error_aborts_remaining_models() {
        let model = ScriptedModel::new(vec![Err(PredictorError::from_provider(
            "402 Payment Required",
        ))]);
        let err = invoker(model.clone()).generate("prompt").await.unwrap_err();

        assert!(matches!(err, PredictorError::Billing(_)));
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn unrecognizable_output_advances_to_the_next_model() {
        let model = ScriptedModel::new(vec![
            json_output(json!({})),
            json_output(json!("https://img.example/fallback.png")),
        ]);
        let url = invoker(model.clone()).generate("prompt").await.unwrap();

        assert_eq!(url, "https://img.example/fallback.png");
        assert_eq!(model.call_count(), 2);
    }

    #[tokio::test]
    async fn exhausted_chain_reports_the_last_error() {
        let model = ScriptedModel::new(vec![
            Err(PredictorError::Generation("timeout one".into())),
            Err(PredictorError::Generation("timeout two".into())),
            Err(PredictorError::Generation("timeout three".into())),
        ]);
        let err = invoker(model.clone()).generate("prompt").await.unwrap_err();

        match err {
            PredictorError::ModelsExhausted {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 3);
                assert!(last_error.contains("timeout three"));
            }
            other => panic!("expected ModelsExhausted, got {:?}", other),
        }
        assert_eq!(model.call_count(), 3);
    }

    #[test]
    fn model_inputs_carry_the_per_model_settings() {
        let chain = default_model_chain();
        let input = build_input(&chain[0], "a baby");
        assert!(
            input["prompt"]
                .as_str()
                .unwrap()
                .starts_with(chain[0].prompt_prefix)
        );
        assert_eq!(input["width"], chain[0].width);
        assert_eq!(input["scheduler"], chain[0].scheduler);
        assert!(
            input["negative_prompt"]
                .as_str()
                .unwrap()
                .contains("monochrome")
        );
    }
}
