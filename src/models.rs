// src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Skin tone on a rough light-to-dark ordinal scale (1..=9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkinTone {
    Light,
    Fair,
    Olive,
    Medium,
    Tan,
    Brown,
    DarkBrown,
    Dark,
    Black,
}

impl SkinTone {
    pub fn ordinal(self) -> u8 {
        match self {
            SkinTone::Light => 1,
            SkinTone::Fair => 2,
            SkinTone::Olive => 3,
            SkinTone::Medium => 4,
            SkinTone::Tan => 5,
            SkinTone::Brown => 6,
            SkinTone::DarkBrown => 7,
            SkinTone::Dark => 8,
            SkinTone::Black => 9,
        }
    }

    /// Nearest categorical label for an ordinal value; clamps out-of-range input.
    pub fn from_ordinal(value: u8) -> Self {
        match value {
            0 | 1 => SkinTone::Light,
            2 => SkinTone::Fair,
            3 => SkinTone::Olive,
            4 => SkinTone::Medium,
            5 => SkinTone::Tan,
            6 => SkinTone::Brown,
            7 => SkinTone::DarkBrown,
            8 => SkinTone::Dark,
            _ => SkinTone::Black,
        }
    }
}

impl fmt::Display for SkinTone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SkinTone::Light => "light",
            SkinTone::Fair => "fair",
            SkinTone::Olive => "olive",
            SkinTone::Medium => "medium",
            SkinTone::Tan => "tan",
            SkinTone::Brown => "brown",
            SkinTone::DarkBrown => "dark brown",
            SkinTone::Dark => "dark",
            SkinTone::Black => "black",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EyeColor {
    Brown,
    DarkBrown,
    LightBrown,
    Hazel,
    Amber,
    Blue,
    Green,
    Gray,
    /// Synthesized "a-b mixed" label produced by blending two distinct colors.
    Mixed(String),
}

impl EyeColor {
    pub fn is_brown_family(&self) -> bool {
        matches!(
            self,
            EyeColor::Brown | EyeColor::DarkBrown | EyeColor::LightBrown
        )
    }

    /// Relative darkness inside the brown family, for dominance tie-breaks.
    pub fn brown_rank(&self) -> u8 {
        match self {
            EyeColor::DarkBrown => 3,
            EyeColor::Brown => 2,
            EyeColor::LightBrown => 1,
            _ => 0,
        }
    }
}

impl fmt::Display for EyeColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EyeColor::Brown => f.write_str("brown"),
            EyeColor::DarkBrown => f.write_str("dark brown"),
            EyeColor::LightBrown => f.write_str("light brown"),
            EyeColor::Hazel => f.write_str("hazel"),
            EyeColor::Amber => f.write_str("amber"),
            EyeColor::Blue => f.write_str("blue"),
            EyeColor::Green => f.write_str("green"),
            EyeColor::Gray => f.write_str("gray"),
            EyeColor::Mixed(label) => f.write_str(label),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HairColor {
    JetBlack,
    Black,
    DarkBrown,
    Brown,
    LightBrown,
    Auburn,
    Red,
    DarkBlonde,
    Blonde,
    Gray,
    Mixed(String),
}

impl HairColor {
    pub fn is_dark_family(&self) -> bool {
        matches!(
            self,
            HairColor::JetBlack | HairColor::Black | HairColor::DarkBrown
        )
    }

    /// Rough darkness ordering used when the blend prefers the darker color.
    pub fn darkness(&self) -> u8 {
        match self {
            HairColor::JetBlack => 10,
            HairColor::Black => 9,
            HairColor::DarkBrown => 8,
            HairColor::Brown => 7,
            HairColor::Auburn => 6,
            HairColor::Mixed(_) => 5,
            HairColor::Red => 4,
            HairColor::LightBrown => 3,
            HairColor::DarkBlonde => 2,
            HairColor::Blonde => 1,
            HairColor::Gray => 0,
        }
    }
}

impl fmt::Display for HairColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HairColor::JetBlack => f.write_str("jet black"),
            HairColor::Black => f.write_str("black"),
            HairColor::DarkBrown => f.write_str("dark brown"),
            HairColor::Brown => f.write_str("brown"),
            HairColor::LightBrown => f.write_str("light brown"),
            HairColor::Auburn => f.write_str("auburn"),
            HairColor::Red => f.write_str("red"),
            HairColor::DarkBlonde => f.write_str("dark blonde"),
            HairColor::Blonde => f.write_str("blonde"),
            HairColor::Gray => f.write_str("gray"),
            HairColor::Mixed(label) => f.write_str(label),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaceShape {
    Round,
    Oval,
    Heart,
    Square,
    Rectangular,
    Angular,
    Long,
    Diamond,
}

impl FaceShape {
    /// Soft shapes win cross-bucket blends, modeling baby-like softening.
    pub fn is_soft(self) -> bool {
        matches!(self, FaceShape::Round | FaceShape::Oval | FaceShape::Heart)
    }
}

impl fmt::Display for FaceShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FaceShape::Round => "round",
            FaceShape::Oval => "oval",
            FaceShape::Heart => "heart-shaped",
            FaceShape::Square => "square",
            FaceShape::Rectangular => "rectangular",
            FaceShape::Angular => "angular",
            FaceShape::Long => "long",
            FaceShape::Diamond => "diamond-shaped",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Random,
}

/// Extracted description of one parent photo. Every field is populated by the
/// time it leaves the extractor; inconclusive extraction falls back to a
/// catalog entry rather than an "unknown" value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParentFeatures {
    pub skin_tone: SkinTone,
    pub eye_color: EyeColor,
    pub hair_color: HairColor,
    pub face_shape: FaceShape,
    /// Raw vision-model output, kept for diagnostics only.
    pub raw_description: String,
}

/// Child attributes after applying the similarity weighting. Intermediate
/// value only; consumed by the prompt composer and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendedFeatures {
    pub skin_tone: SkinTone,
    pub eye_color: EyeColor,
    pub hair_color: HairColor,
    pub face_shape: FaceShape,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationRequest {
    /// Base64-encoded parent photos, with or without a data-URL prefix.
    pub parent1_image: String,
    pub parent2_image: String,
    /// 0 = takes entirely after parent 1, 100 = entirely after parent 2.
    pub similarity: u8,
    /// Age bracket, 1..=5.
    pub age: u8,
    pub gender: Gender,
    #[serde(default)]
    pub parent1_name: Option<String>,
    #[serde(default)]
    pub parent2_name: Option<String>,
}

impl GenerationRequest {
    pub fn validate(&self) -> Result<(), crate::errors::PredictorError> {
        use crate::errors::PredictorError;

        if self.parent1_image.trim().is_empty() || self.parent2_image.trim().is_empty() {
            return Err(PredictorError::Validation(
                "both parent images are required".to_string(),
            ));
        }
        if self.similarity > 100 {
            return Err(PredictorError::Validation(format!(
                "similarity must be between 0 and 100, got {}",
                self.similarity
            )));
        }
        if !(1..=5).contains(&self.age) {
            return Err(PredictorError::Validation(format!(
                "age must be between 1 and 5, got {}",
                self.age
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BabyName {
    pub name: String,
    pub explanation: String,
}

/// The only artifact returned to callers. Built once and never mutated;
/// callers branch on `success`, never on exceptions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baby_name: Option<BabyName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub processing_time_ms: u64,
    pub created_at: DateTime<Utc>,
}

impl GenerationResult {
    pub fn completed(image_url: String, baby_name: BabyName, elapsed: std::time::Duration) -> Self {
        Self {
            success: true,
            image_url: Some(image_url),
            baby_name: Some(baby_name),
            error: None,
            processing_time_ms: elapsed.as_millis() as u64,
            created_at: Utc::now(),
        }
    }

    pub fn failed(message: String, elapsed: std::time::Duration) -> Self {
        Self {
            success: false,
            image_url: None,
            baby_name: None,
            error: Some(message),
            processing_time_ms: elapsed.as_millis() as u64,
            created_at: Utc::now(),
        }
    }
}
