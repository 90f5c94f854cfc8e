// src/services/prompt.rs
//
// Pure string construction: blended features + request parameters in, one
// model-agnostic prompt out. Each model configuration wraps the result with
// its own prefix and negative prompt (see replicate.rs).

use crate::models::{BlendedFeatures, Gender, GenerationRequest, SkinTone};

pub fn compose(request: &GenerationRequest, blended: &BlendedFeatures) -> String {
    let parent1 = request.parent1_name.as_deref().unwrap_or("parent 1");
    let parent2 = request.parent2_name.as_deref().unwrap_or("parent 2");

    format!(
        "close-up portrait photograph of a {subject}, {age}, \
         full color photography, vibrant natural colors, {skin}, \
         {eyes} eyes, {hair} hair, {face} face, \
         {inheritance}, soft studio lighting, highly detailed, \
         sharp focus, 8k, photorealistic",
        subject = gender_phrase(request.gender),
        age = age_phrase(request.age),
        skin = skin_emphasis(blended.skin_tone),
        eyes = blended.eye_color,
        hair = blended.hair_color,
        face = blended.face_shape,
        inheritance = similarity_phrase(request.similarity, parent1, parent2),
    )
}

fn age_phrase(age: u8) -> &'static str {
    match age {
        1 => "a newborn just a few months old",
        2 => "a one year old baby",
        3 => "a two year old toddler",
        4 => "a three year old toddler",
        _ => "a four to five year old child",
    }
}

fn gender_phrase(gender: Gender) -> &'static str {
    match gender {
        Gender::Male => "baby boy",
        Gender::Female => "baby girl",
        Gender::Random => "baby",
    }
}

fn similarity_phrase(similarity: u8, parent1: &str, parent2: &str) -> String {
    match similarity {
        0..=20 => format!("strongly favoring {}'s features", parent1),
        21..=40 => format!("mostly taking after {} with hints of {}", parent1, parent2),
        41..=60 => format!("an even blend of {} and {}", parent1, parent2),
        61..=80 => format!("mostly taking after {} with hints of {}", parent2, parent1),
        _ => format!("strongly favoring {}'s features", parent2),
    }
}

/// Emphasis weighting grows with tone darkness to counteract the generation
/// models' bias toward light-skinned output. Parentheses are prompt-weight
/// syntax understood by the diffusion samplers.
fn skin_emphasis(tone: SkinTone) -> String {
    match tone {
        SkinTone::Light => "light skin tone".to_string(),
        SkinTone::Fair => "fair skin tone".to_string(),
        SkinTone::Olive => "olive skin tone".to_string(),
        SkinTone::Medium => "(medium skin tone)".to_string(),
        SkinTone::Tan => "(tan skin tone)".to_string(),
        SkinTone::Brown => "((brown skin tone))".to_string(),
        SkinTone::DarkBrown => "((dark brown skin tone)), rich complexion".to_string(),
        SkinTone::Dark => "(((dark skin tone))), deep rich complexion".to_string(),
        SkinTone::Black => "(((black skin tone))), deep ebony complexion".to_string(),
    }
}
