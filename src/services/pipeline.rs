// src/services/pipeline.rs
//
// The end-to-end prediction pipeline: extract both parents concurrently,
// blend, compose the prompt, run the fallback chain, attach a name. The
// outer boundary always returns a GenerationResult value; callers branch on
// `success`, never on errors.

use crate::models::{GenerationRequest, GenerationResult};
use crate::services::blender;
use crate::services::image_processor::ImageProcessor;
use crate::services::names;
use crate::services::prompt;
use crate::services::replicate::{ImageModel, ModelInvoker};
use crate::services::vision::{FeatureExtractor, VisionModel};
use futures_util::future;
use log::{info, warn};
use std::sync::Arc;
use std::time::Instant;

pub struct PredictionPipeline {
    extractor: FeatureExtractor,
    invoker: ModelInvoker,
    images: ImageProcessor,
}

impl PredictionPipeline {
    pub fn new(vision: Arc<dyn VisionModel>, model: Arc<dyn ImageModel>) -> Self {
        Self {
            extractor: FeatureExtractor::new(vision),
            invoker: ModelInvoker::new(model),
            images: ImageProcessor::new(),
        }
    }

    pub fn with_invoker(mut self, invoker: ModelInvoker) -> Self {
        self.invoker = invoker;
        self
    }

    pub async fn run(&self, request: &GenerationRequest) -> GenerationResult {
        let started = Instant::now();

        if let Err(err) = request.validate() {
            return GenerationResult::failed(err.user_message(), started.elapsed());
        }

        let parent1_image = match self.images.prepare_base64(&request.parent1_image) {
            Ok(prepared) => prepared,
            Err(err) => return GenerationResult::failed(err.user_message(), started.elapsed()),
        };
        let parent2_image = match self.images.prepare_base64(&request.parent2_image) {
            Ok(prepared) => prepared,
            Err(err) => return GenerationResult::failed(err.user_message(), started.elapsed()),
        };

        // The two extractions are independent; everything after them is
        // strictly sequential.
        let (features1, features2) = future::join(
            self.extractor.extract(&parent1_image),
            self.extractor.extract(&parent2_image),
        )
        .await;

        let blended = blender::blend(
            &features1,
            &features2,
            request.similarity,
            &mut rand::thread_rng(),
        );
        let composed = prompt::compose(request, &blended);
        info!("composed generation prompt ({} chars)", composed.len());

        match self.invoker.generate(&composed).await {
            Ok(image_url) => {
                let baby_name = names::blend_names(
                    request.parent1_name.as_deref(),
                    request.parent2_name.as_deref(),
                    request.gender,
                    &mut rand::thread_rng(),
                );
                GenerationResult::completed(image_url, baby_name, started.elapsed())
            }
            Err(err) => {
                warn!("generation failed: {}", err);
                GenerationResult::failed(err.user_message(), started.elapsed())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::PredictorError;
    use crate::models::Gender;
    use crate::services::replicate::ModelOutput;
    use async_trait::async_trait;
    use base64::{Engine as _, engine::general_purpose};
    use image::{DynamicImage, RgbImage};
    use serde_json::{Value, json};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FixedVision(String);

    #[async_trait]
    impl VisionModel for FixedVision {
        async fn describe(
            &self,
            _image_base64: &str,
            _instruction: &str,
        ) -> Result<String, PredictorError> {
            Ok(self.0.clone())
        }
    }

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

    fn photo_base64() -> String {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 32, image::Rgb([180, 140, 110])));
        let mut buffer = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut buffer), image::ImageFormat::Png)
            .unwrap();
        general_purpose::STANDARD.encode(&buffer)
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            parent1_image: photo_base64(),
            parent2_image: photo_base64(),
            similarity: 50,
            age: 2,
            gender: Gender::Random,
            parent1_name: Some("Marcus".to_string()),
            parent2_name: Some("Elena".to_string()),
        }
    }

    fn pipeline(model: Arc<ScriptedModel>) -> PredictionPipeline {
        let vision: Arc<dyn VisionModel> = Arc::new(FixedVision(
            "fair skin, blue eyes, light brown hair, round face".to_string(),
        ));
        let invoker =
            ModelInvoker::new(model.clone()).with_timing(Duration::from_secs(5), Duration::ZERO);
        PredictionPipeline::new(vision, model).with_invoker(invoker)
    }

    #[tokio::test]
    async fn full_success_returns_url_and_name() {
        let model = ScriptedModel::new(vec![Ok(ModelOutput::Json(json!([
            "https://img.example/baby.png"
        ])))]);
        let result = pipeline(model).run(&request()).await;

        assert!(result.success);
        assert!(result.image_url.unwrap().starts_with("http"));
        let baby_name = result.baby_name.unwrap();
        assert!(!baby_name.name.is_empty());
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn all_models_failing_reports_exhaustion() {
        let model = ScriptedModel::new(vec![
            Err(PredictorError::Generation("timeout".into())),
            Err(PredictorError::Generation("timeout".into())),
            Err(PredictorError::Generation("timeout".into())),
        ]);
        let result = pipeline(model.clone()).run(&request()).await;

        assert!(!result.success);
        assert!(result.image_url.is_none());
        assert!(result.error.unwrap().contains("models"));
        assert_eq!(model.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn billing_error_stops_after_the_first_model() {
        let model = ScriptedModel::new(vec![Err(PredictorError::from_provider(
            "402 Payment Required",
        ))]);
        let result = pipeline(model.clone()).run(&request()).await;

        assert!(!result.success);
        assert!(result.error.unwrap().contains("temporarily unavailable"));
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalid_request_fails_without_calling_providers() {
        let model = ScriptedModel::new(vec![]);
        let mut bad = request();
        bad.similarity = 150;
        let result = pipeline(model.clone()).run(&bad).await;

        assert!(!result.success);
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalid_photo_fails_without_calling_providers() {
        let model = ScriptedModel::new(vec![]);
        let mut bad = request();
        bad.parent1_image = "!!definitely not base64!!".to_string();
        let result = pipeline(model.clone()).run(&bad).await;

        assert!(!result.success);
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }
}
