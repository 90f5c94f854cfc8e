// src/services/vision.rs
use crate::errors::PredictorError;
use crate::models::{EyeColor, FaceShape, HairColor, ParentFeatures, SkinTone};
use crate::services::retry::retry_with_backoff;
use crate::services::vocabulary;
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const DESCRIBE_INSTRUCTION: &str = "Describe this person's facial features for a portrait \
     artist. Cover: skin tone and apparent ethnicity, eye color, hair color and texture, \
     face shape, and any other distinctive inheritable features. Answer in plain prose.";

/// Seam for the vision-description provider. The response is free text; no
/// structured schema is assumed from it.
#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn describe(
        &self,
        image_base64: &str,
        instruction: &str,
    ) -> Result<String, PredictorError>;
}

pub struct OpenAiVision {
    client: Client,
    api_key: String,
    model: String,
}

impl OpenAiVision {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model: "gpt-4o".to_string(),
        }
    }
}

#[async_trait]
impl VisionModel for OpenAiVision {
    async fn describe(
        &self,
        image_base64: &str,
        instruction: &str,
    ) -> Result<String, PredictorError> {
        let response = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&json!({
                "model": self.model,
                "messages": [{
                    "role": "user",
                    "content": [
                        {
                            "type": "text",
                            "text": instruction
                        },
                        {
                            "type": "image_url",
                            "image_url": {
                                "url": format!("data:image/jpeg;base64,{}", image_base64)
                            }
                        }
                    ]
                }],
                "max_tokens": 500
            }))
            .send()
            .await
            .map_err(|e| PredictorError::Vision(format!("vision request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(PredictorError::Vision(format!(
                "vision API returned {}: {}",
                status, error_text
            )));
        }

        let result: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PredictorError::Vision(format!("failed to parse vision response: {}", e)))?;

        result["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| PredictorError::Vision("no content in vision response".to_string()))
    }
}

/// Partially-matched features from one description. Gaps are filled from the
/// fallback catalog when the extraction resolves.
struct ParsedFeatures {
    skin_tone: Option<SkinTone>,
    eye_color: Option<EyeColor>,
    hair_color: Option<HairColor>,
    face_shape: Option<FaceShape>,
    raw: String,
}

impl ParsedFeatures {
    fn from_text(text: &str) -> Self {
        Self {
            skin_tone: vocabulary::skin_tone(text),
            eye_color: vocabulary::eye_color(text),
            hair_color: vocabulary::hair_color(text),
            face_shape: vocabulary::face_shape(text),
            raw: text.to_string(),
        }
    }

    fn is_inconclusive(&self) -> bool {
        self.skin_tone.is_none() && self.eye_color.is_none()
    }

    fn resolve(self, defaults: ParentFeatures) -> ParentFeatures {
        ParentFeatures {
            skin_tone: self.skin_tone.unwrap_or(defaults.skin_tone),
            eye_color: self.eye_color.unwrap_or(defaults.eye_color),
            hair_color: self.hair_color.unwrap_or(defaults.hair_color),
            face_shape: self.face_shape.unwrap_or(defaults.face_shape),
            raw_description: self.raw,
        }
    }
}

/// Turns one parent photo into a fully-populated `ParentFeatures`.
/// Never fails: exhausted retries fall back to a catalog entry.
pub struct FeatureExtractor {
    vision: Arc<dyn VisionModel>,
    retries: u32,
    base_delay: Duration,
}

impl FeatureExtractor {
    pub fn new(vision: Arc<dyn VisionModel>) -> Self {
        Self {
            vision,
            retries: 2,
            base_delay: Duration::from_secs(1),
        }
    }

    #[cfg(test)]
    fn with_policy(vision: Arc<dyn VisionModel>, retries: u32, base_delay: Duration) -> Self {
        Self {
            vision,
            retries,
            base_delay,
        }
    }

    pub async fn extract(&self, image_base64: &str) -> ParentFeatures {
        match self.try_extract(image_base64).await {
            Ok(features) => features,
            Err(err) => {
                warn!("feature extraction failed, using fallback catalog: {}", err);
                fallback_features(time_slot())
            }
        }
    }

    async fn try_extract(&self, image_base64: &str) -> Result<ParentFeatures, PredictorError> {
        let text = retry_with_backoff(
            self.retries,
            self.base_delay,
            |e| !e.is_non_retryable(),
            || self.vision.describe(image_base64, DESCRIBE_INSTRUCTION),
        )
        .await?;

        debug!("vision description: {}", text);
        let mut parsed = ParsedFeatures::from_text(&text);

        if parsed.is_inconclusive() {
            // One extra attempt, separate from the error-retry budget: the
            // call succeeded but the text resolved neither skin nor eyes.
            if let Ok(second) = self.vision.describe(image_base64, DESCRIBE_INSTRUCTION).await {
                let reparsed = ParsedFeatures::from_text(&second);
                if !reparsed.is_inconclusive() {
                    parsed = reparsed;
                }
            }
            if parsed.is_inconclusive() {
                return Err(PredictorError::Inconclusive);
            }
        }

        Ok(parsed.resolve(fallback_features(time_slot())))
    }
}

/// Fixed catalog of plausible feature combinations used when extraction
/// cannot resolve. Indexed by a coarse time slot so repeated failures do not
/// all produce the same baby.
pub fn fallback_features(slot: usize) -> ParentFeatures {
    let (skin_tone, eye_color, hair_color, face_shape) = match slot % 6 {
        0 => (
            SkinTone::Fair,
            EyeColor::Blue,
            HairColor::Blonde,
            FaceShape::Round,
        ),
        1 => (
            SkinTone::Medium,
            EyeColor::Brown,
            HairColor::Brown,
            FaceShape::Oval,
        ),
        2 => (
            SkinTone::Olive,
            EyeColor::Hazel,
            HairColor::DarkBrown,
            FaceShape::Heart,
        ),
        3 => (
            SkinTone::Brown,
            EyeColor::DarkBrown,
            HairColor::Black,
            FaceShape::Round,
        ),
        4 => (
            SkinTone::Tan,
            EyeColor::Green,
            HairColor::Auburn,
            FaceShape::Oval,
        ),
        _ => (
            SkinTone::Dark,
            EyeColor::Brown,
            HairColor::JetBlack,
            FaceShape::Round,
        ),
    };
    ParentFeatures {
        skin_tone,
        eye_color,
        hair_color,
        face_shape,
        raw_description: "fallback profile".to_string(),
    }
}

fn time_slot() -> usize {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    (seconds / 60) as usize
}
