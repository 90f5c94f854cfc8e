// src/services/names.rs
//
// Name-combination heuristic: splice the front of one parent's name onto the
// back of the other's. Falls back to a small pool when no parent names were
// supplied.

use crate::models::{BabyName, Gender};
use rand::Rng;

const MALE_POOL: &[&str] = &["Liam", "Noah", "Mateo", "Kai", "Theo", "Ezra"];
const FEMALE_POOL: &[&str] = &["Mia", "Luna", "Amara", "Ivy", "Nora", "Zara"];
const NEUTRAL_POOL: &[&str] = &["Alex", "River", "Sage", "Rowan", "Remy", "Noa"];

pub fn blend_names<R: Rng>(
    parent1: Option<&str>,
    parent2: Option<&str>,
    gender: Gender,
    rng: &mut R,
) -> BabyName {
    let parent1 = parent1.map(str::trim).filter(|n| !n.is_empty());
    let parent2 = parent2.map(str::trim).filter(|n| !n.is_empty());

    match (parent1, parent2) {
        (Some(first), Some(second)) => {
            // Swap which parent contributes the opening syllables.
            let (head, tail) = if rng.gen_bool(0.5) {
                (first, second)
            } else {
                (second, first)
            };
            let name = style_for_gender(splice(head, tail), gender);
            BabyName {
                explanation: format!("A blend of {} and {}", first, second),
                name,
            }
        }
        _ => {
            let pool = match gender {
                Gender::Male => MALE_POOL,
                Gender::Female => FEMALE_POOL,
                Gender::Random => NEUTRAL_POOL,
            };
            let name = pool[rng.gen_range(0..pool.len())].to_string();
            BabyName {
                name,
                explanation: "Chosen for your little one".to_string(),
            }
        }
    }
}

/// First half of `head` plus second half of `tail`, by characters.
fn splice(head: &str, tail: &str) -> String {
    let head_chars: Vec<char> = head.chars().collect();
    let tail_chars: Vec<char> = tail.chars().collect();

    let head_take = head_chars.len().div_ceil(2);
    let tail_skip = tail_chars.len() / 2;

    let mut combined: String = head_chars[..head_take].iter().collect();
    combined.extend(&tail_chars[tail_skip..]);
    capitalize(&combined.to_lowercase())
}

fn style_for_gender(name: String, gender: Gender) -> String {
    let ends_soft = name
        .chars()
        .last()
        .is_some_and(|c| matches!(c, 'a' | 'e' | 'i' | 'y'));
    match gender {
        Gender::Female if !ends_soft => format!("{}a", name),
        _ => name,
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn blends_two_parent_names() {
        let mut rng = StdRng::seed_from_u64(1);
        let baby = blend_names(Some("Marcus"), Some("Elena"), Gender::Random, &mut rng);
        assert!(!baby.name.is_empty());
        assert!(baby.name.chars().next().unwrap().is_uppercase());
        assert_eq!(baby.explanation, "A blend of Marcus and Elena");
    }

    #[test]
    fn missing_names_fall_back_to_a_pool() {
        let mut rng = StdRng::seed_from_u64(2);
        let baby = blend_names(None, None, Gender::Male, &mut rng);
        assert!(MALE_POOL.contains(&baby.name.as_str()));

        let baby = blend_names(Some("  "), Some("Elena"), Gender::Female, &mut rng);
        assert!(FEMALE_POOL.contains(&baby.name.as_str()));
    }

    #[test]
    fn female_names_get_a_soft_ending() {
        let styled = style_for_gender("Marcel".to_string(), Gender::Female);
        assert!(styled.ends_with('a'));

        let untouched = style_for_gender("Elena".to_string(), Gender::Female);
        assert_eq!(untouched, "Elena");
    }

    #[test]
    fn splice_joins_halves() {
        assert_eq!(splice("Marcus", "Elena"), "Marena");
        assert_eq!(splice("Bo", "Ada"), "Bda");
    }
}
