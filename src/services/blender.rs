// src/services/blender.rs
//
// Combines two parents' categorical features into one child feature set.
// Deterministic apart from the dominance tie-breaks, which draw from an
// injected RNG so tests can seed them.

use crate::models::{BlendedFeatures, EyeColor, FaceShape, HairColor, ParentFeatures, SkinTone};
use rand::Rng;

/// Dominance-bias probabilities. These are tuned heuristics, not a genetic
/// model; they are grouped here so they can be adjusted in one place.
#[derive(Debug, Clone, Copy)]
pub struct BlendTuning {
    /// Chance a brown-family eye color wins over a non-brown one.
    pub brown_eye_dominance: f64,
    /// Chance a dark-family hair color wins over a lighter one.
    pub dark_hair_dominance: f64,
    /// Chance the softer face shape wins a cross-bucket pair.
    pub soft_shape_bias: f64,
}

impl Default for BlendTuning {
    fn default() -> Self {
        Self {
            brown_eye_dominance: 0.65,
            dark_hair_dominance: 0.7,
            soft_shape_bias: 0.75,
        }
    }
}

pub fn blend<R: Rng>(
    parent1: &ParentFeatures,
    parent2: &ParentFeatures,
    similarity: u8,
    rng: &mut R,
) -> BlendedFeatures {
    blend_with(parent1, parent2, similarity, &BlendTuning::default(), rng)
}

pub fn blend_with<R: Rng>(
    parent1: &ParentFeatures,
    parent2: &ParentFeatures,
    similarity: u8,
    tuning: &BlendTuning,
    rng: &mut R,
) -> BlendedFeatures {
    let ratio = f64::from(similarity.min(100)) / 100.0;

    BlendedFeatures {
        skin_tone: blend_skin_tone(parent1.skin_tone, parent2.skin_tone, ratio),
        eye_color: blend_eye_color(&parent1.eye_color, &parent2.eye_color, ratio, tuning, rng),
        hair_color: blend_hair_color(&parent1.hair_color, &parent2.hair_color, ratio, tuning, rng),
        face_shape: blend_face_shape(parent1.face_shape, parent2.face_shape, ratio, tuning, rng),
    }
}

/// Linear interpolation on the ordinal scale. The rounded result always lies
/// between the two parents' ordinals, so no label outside the parent range
/// can be produced.
fn blend_skin_tone(tone1: SkinTone, tone2: SkinTone, ratio: f64) -> SkinTone {
    let o1 = f64::from(tone1.ordinal());
    let o2 = f64::from(tone2.ordinal());
    let blended = (o1 * (1.0 - ratio) + o2 * ratio).round() as u8;
    SkinTone::from_ordinal(blended)
}

fn blend_eye_color<R: Rng>(
    eye1: &EyeColor,
    eye2: &EyeColor,
    ratio: f64,
    tuning: &BlendTuning,
    rng: &mut R,
) -> EyeColor {
    if eye1 == eye2 {
        return eye1.clone();
    }

    match (eye1.is_brown_family(), eye2.is_brown_family()) {
        (true, true) => {
            if eye1.brown_rank() >= eye2.brown_rank() {
                eye1.clone()
            } else {
                eye2.clone()
            }
        }
        (true, false) if rng.gen_bool(tuning.brown_eye_dominance) => eye1.clone(),
        (false, true) if rng.gen_bool(tuning.brown_eye_dominance) => eye2.clone(),
        _ => eye_threshold(eye1, eye2, ratio),
    }
}

fn eye_threshold(eye1: &EyeColor, eye2: &EyeColor, ratio: f64) -> EyeColor {
    if ratio < 0.3 {
        eye1.clone()
    } else if ratio > 0.7 {
        eye2.clone()
    } else {
        EyeColor::Mixed(format!("{}-{} mixed", eye1, eye2))
    }
}

fn blend_hair_color<R: Rng>(
    hair1: &HairColor,
    hair2: &HairColor,
    ratio: f64,
    tuning: &BlendTuning,
    rng: &mut R,
) -> HairColor {
    if hair1 == hair2 {
        return hair1.clone();
    }

    match (hair1.is_dark_family(), hair2.is_dark_family()) {
        (true, true) => darker_hair(hair1, hair2),
        (true, false) if rng.gen_bool(tuning.dark_hair_dominance) => hair1.clone(),
        (false, true) if rng.gen_bool(tuning.dark_hair_dominance) => hair2.clone(),
        _ => hair_threshold(hair1, hair2, ratio),
    }
}

fn hair_threshold(hair1: &HairColor, hair2: &HairColor, ratio: f64) -> HairColor {
    if ratio < 0.3 {
        hair1.clone()
    } else if ratio > 0.7 {
        hair2.clone()
    } else {
        // Ambiguous middle band prefers the darker of the two.
        darker_hair(hair1, hair2)
    }
}

fn darker_hair(hair1: &HairColor, hair2: &HairColor) -> HairColor {
    if hair1.darkness() >= hair2.darkness() {
        hair1.clone()
    } else {
        hair2.clone()
    }
}

fn blend_face_shape<R: Rng>(
    shape1: FaceShape,
    shape2: FaceShape,
    ratio: f64,
    tuning: &BlendTuning,
    rng: &mut R,
) -> FaceShape {
    if shape1 == shape2 {
        return shape1;
    }

    if shape1.is_soft() == shape2.is_soft() {
        if ratio < 0.5 { shape1 } else { shape2 }
    } else {
        let (soft, other) = if shape1.is_soft() {
            (shape1, shape2)
        } else {
            (shape2, shape1)
        };
        if rng.gen_bool(tuning.soft_shape_bias) {
            soft
        } else {
            other
        }
    }
}
