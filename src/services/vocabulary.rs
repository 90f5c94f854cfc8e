// src/services/vocabulary.rs
//
// Ordered (pattern, value) rules for turning free-text vision output into
// categorical features. First match wins, so multi-word patterns must appear
// before any pattern they contain ("dark brown" before "brown",
// "rectangular" before "angular").
//
// Descriptions mention several features in one breath, so each category is
// matched against the clauses that name it ("...eyes", "...hair") first and
// only falls back to scanning the whole text when no anchored clause exists.

use crate::models::{EyeColor, FaceShape, HairColor, SkinTone};

pub struct Rule<T: 'static> {
    pub pattern: &'static str,
    pub value: T,
}

const fn rule<T>(pattern: &'static str, value: T) -> Rule<T> {
    Rule { pattern, value }
}

const SKIN_TONE_RULES: &[Rule<SkinTone>] = &[
    rule("dark brown", SkinTone::DarkBrown),
    rule("very dark", SkinTone::Dark),
    rule("light", SkinTone::Light),
    rule("fair", SkinTone::Fair),
    rule("pale", SkinTone::Fair),
    rule("olive", SkinTone::Olive),
    rule("medium", SkinTone::Medium),
    rule("tanned", SkinTone::Tan),
    rule("tan", SkinTone::Tan),
    rule("ebony", SkinTone::Black),
    rule("black", SkinTone::Black),
    rule("dark", SkinTone::Dark),
    rule("brown", SkinTone::Brown),
];

/// Second-chance inference when no skin-tone vocabulary matched.
const ETHNICITY_RULES: &[Rule<SkinTone>] = &[
    rule("african", SkinTone::Dark),
    rule("afro", SkinTone::Dark),
    rule("caribbean", SkinTone::Dark),
    rule("south asian", SkinTone::Brown),
    rule("indian", SkinTone::Brown),
    rule("middle eastern", SkinTone::Tan),
    rule("hispanic", SkinTone::Medium),
    rule("latino", SkinTone::Medium),
    rule("latina", SkinTone::Medium),
    rule("mediterranean", SkinTone::Olive),
    rule("east asian", SkinTone::Fair),
    rule("asian", SkinTone::Fair),
    rule("caucasian", SkinTone::Light),
    rule("european", SkinTone::Light),
    rule("white", SkinTone::Light),
];

const EYE_COLOR_RULES: &[Rule<EyeColor>] = &[
    rule("dark brown", EyeColor::DarkBrown),
    rule("light brown", EyeColor::LightBrown),
    rule("hazel", EyeColor::Hazel),
    rule("amber", EyeColor::Amber),
    rule("blue", EyeColor::Blue),
    rule("green", EyeColor::Green),
    rule("gray", EyeColor::Gray),
    rule("grey", EyeColor::Gray),
    rule("brown", EyeColor::Brown),
];

const HAIR_COLOR_RULES: &[Rule<HairColor>] = &[
    rule("jet black", HairColor::JetBlack),
    rule("dark brown", HairColor::DarkBrown),
    rule("light brown", HairColor::LightBrown),
    rule("dark blonde", HairColor::DarkBlonde),
    rule("dirty blonde", HairColor::DarkBlonde),
    rule("auburn", HairColor::Auburn),
    rule("black", HairColor::Black),
    rule("brown", HairColor::Brown),
    rule("blonde", HairColor::Blonde),
    rule("blond", HairColor::Blonde),
    rule("ginger", HairColor::Red),
    rule("red", HairColor::Red),
    rule("gray", HairColor::Gray),
    rule("grey", HairColor::Gray),
];

const FACE_SHAPE_RULES: &[Rule<FaceShape>] = &[
    rule("rectangular", FaceShape::Rectangular),
    rule("square", FaceShape::Square),
    rule("angular", FaceShape::Angular),
    rule("diamond", FaceShape::Diamond),
    rule("heart", FaceShape::Heart),
    rule("oval", FaceShape::Oval),
    rule("round", FaceShape::Round),
    rule("oblong", FaceShape::Long),
    rule("elongated", FaceShape::Long),
    rule("long", FaceShape::Long),
];

const SKIN_ANCHORS: &[&str] = &["skin", "complexion"];
const EYE_ANCHORS: &[&str] = &["eye"];
const HAIR_ANCHORS: &[&str] = &["hair"];
const FACE_ANCHORS: &[&str] = &["face", "jaw"];

fn match_rules<T: Clone>(text: &str, rules: &[Rule<T>]) -> Option<T> {
    rules
        .iter()
        .find(|rule| contains_word(text, rule.pattern))
        .map(|rule| rule.value.clone())
}

/// Substring match that refuses to fire inside a longer word, so "light"
/// never matches within "slightly".
fn contains_word(text: &str, pattern: &str) -> bool {
    let bytes = text.as_bytes();
    let mut from = 0;
    while let Some(pos) = text[from..].find(pattern) {
        let start = from + pos;
        let end = start + pattern.len();
        let clear_before = start == 0 || !bytes[start - 1].is_ascii_alphabetic();
        let clear_after = end == bytes.len() || !bytes[end].is_ascii_alphabetic();
        if clear_before && clear_after {
            return true;
        }
        from = start + 1;
    }
    false
}

/// Scan the clauses mentioning an anchor word first; fall back to the whole
/// text only when no clause is anchored to this category.
fn match_anchored<T: Clone>(text: &str, anchors: &[&str], rules: &[Rule<T>]) -> Option<T> {
    let mut anchored_any = false;
    for clause in text.split([',', '.', ';', '\n']) {
        if anchors.iter().any(|anchor| clause.contains(anchor)) {
            anchored_any = true;
            if let Some(value) = match_rules(clause, rules) {
                return Some(value);
            }
        }
    }
    if anchored_any {
        None
    } else {
        match_rules(text, rules)
    }
}

pub fn skin_tone(text: &str) -> Option<SkinTone> {
    let lowered = text.to_lowercase();
    match_anchored(&lowered, SKIN_ANCHORS, SKIN_TONE_RULES)
        .or_else(|| match_rules(&lowered, ETHNICITY_RULES))
}

pub fn eye_color(text: &str) -> Option<EyeColor> {
    match_anchored(&text.to_lowercase(), EYE_ANCHORS, EYE_COLOR_RULES)
}

pub fn hair_color(text: &str) -> Option<HairColor> {
    match_anchored(&text.to_lowercase(), HAIR_ANCHORS, HAIR_COLOR_RULES)
}

pub fn face_shape(text: &str) -> Option<FaceShape> {
    match_anchored(&text.to_lowercase(), FACE_ANCHORS, FACE_SHAPE_RULES)
}
