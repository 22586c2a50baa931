// modification.rs
// Purpose: Classify how a user changed an AI response and how much of it changed

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

const CORRECTION_KEYWORDS: &[&str] = &[
    "wrong", "incorrect", "error", "fix", "fixed", "mistake", "actually", "not", "instead", "bug",
];
const EXTENSION_RATIO: f64 = 1.3;
const TRUNCATION_RATIO: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModificationType {
    Correction,
    Extension,
    Preference,
    None,
}

impl ModificationType {
    /// Full-change trust adjustment for this kind of edit.
    pub fn base_adjustment(&self) -> f64 {
        match self {
            ModificationType::Correction => -8.0,
            ModificationType::Extension => 2.0,
            ModificationType::Preference | ModificationType::None => 0.0,
        }
    }
}

impl FromStr for ModificationType {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.to_lowercase().as_str() {
            "correction" => Ok(ModificationType::Correction),
            "extension" => Ok(ModificationType::Extension),
            "preference" => Ok(ModificationType::Preference),
            "none" => Ok(ModificationType::None),
            other => Err(format!("unknown modification type '{other}'")),
        }
    }
}

impl fmt::Display for ModificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ModificationType::Correction => "correction",
            ModificationType::Extension => "extension",
            ModificationType::Preference => "preference",
            ModificationType::None => "none",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModificationContext {
    pub modification_type: ModificationType,
    /// Share of the content that changed, 0.0..=1.0.
    pub fraction_changed: f64,
}

impl ModificationContext {
    pub fn new(modification_type: ModificationType, fraction_changed: f64) -> Self {
        Self {
            modification_type,
            fraction_changed: unit_fraction(fraction_changed),
        }
    }

    /// Guess the kind of edit from the two texts.
    ///
    /// This is an approximation: correction keywords in the added words win,
    /// then the length ratio decides between extension (grew by more than
    /// 30% while keeping most of the original), correction (shrank by more
    /// than 30%) and preference. Rephrasings that happen to add a word like
    /// "instead" will be read as corrections.
    pub fn classify(original: &str, modified: &str) -> Self {
        let fraction = fraction_changed(original, modified);
        if fraction == 0.0 {
            return Self::new(ModificationType::None, 0.0);
        }

        let original_words = word_set(original);
        let modified_words = word_set(modified);
        let added: HashSet<&String> = modified_words.difference(&original_words).collect();
        let has_correction_keyword = CORRECTION_KEYWORDS
            .iter()
            .any(|keyword| added.iter().any(|word| word.as_str() == *keyword));

        let original_len = original.chars().count().max(1) as f64;
        let ratio = modified.chars().count() as f64 / original_len;
        let retained = if original_words.is_empty() {
            0.0
        } else {
            original_words.intersection(&modified_words).count() as f64 / original_words.len() as f64
        };

        let modification_type = if has_correction_keyword {
            ModificationType::Correction
        } else if ratio > EXTENSION_RATIO && retained >= 0.8 {
            ModificationType::Extension
        } else if ratio < TRUNCATION_RATIO {
            ModificationType::Correction
        } else {
            ModificationType::Preference
        };

        Self::new(modification_type, fraction)
    }

    /// Deserialized contexts skip `new`, so the fraction is clamped again here.
    pub fn adjustment(&self) -> f64 {
        self.modification_type.base_adjustment() * unit_fraction(self.fraction_changed)
    }
}

fn unit_fraction(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn word_set(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

/// Jaccard distance between the word sets of the two texts.
pub fn fraction_changed(original: &str, modified: &str) -> f64 {
    let a = word_set(original);
    let b = word_set(modified);
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    let shared = a.intersection(&b).count();
    1.0 - shared as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_text_is_not_a_modification() {
        let ctx = ModificationContext::classify("Use a HashMap here.", "use a hashmap here");
        assert_eq!(ctx.modification_type, ModificationType::None);
        assert_eq!(ctx.adjustment(), 0.0);
    }

    #[test]
    fn correction_keyword_wins() {
        let ctx = ModificationContext::classify(
            "The capital of Australia is Sydney.",
            "The capital of Australia is actually Canberra.",
        );
        assert_eq!(ctx.modification_type, ModificationType::Correction);
        assert!(ctx.adjustment() < 0.0);
    }

    #[test]
    fn growth_that_keeps_the_original_is_an_extension() {
        let original = "Sort the vector before deduplicating it.";
        let modified = "Sort the vector before deduplicating it, then shrink its capacity to release memory.";
        let ctx = ModificationContext::classify(original, modified);
        assert_eq!(ctx.modification_type, ModificationType::Extension);
        assert!(ctx.adjustment() > 0.0 && ctx.adjustment() <= 2.0);
    }

    #[test]
    fn heavy_truncation_reads_as_correction() {
        let original = "Rust has a garbage collector that runs periodically to free memory for you.";
        let modified = "Rust frees memory.";
        let ctx = ModificationContext::classify(original, modified);
        assert_eq!(ctx.modification_type, ModificationType::Correction);
    }

    #[test]
    fn same_length_rewording_is_preference() {
        let ctx = ModificationContext::classify("We should ship it today.", "Let's ship this today.");
        assert_eq!(ctx.modification_type, ModificationType::Preference);
        assert_eq!(ctx.adjustment(), 0.0);
    }

    #[test]
    fn adjustment_scales_with_fraction() {
        let half = ModificationContext::new(ModificationType::Correction, 0.5);
        assert_eq!(half.adjustment(), -4.0);
        let clamped = ModificationContext::new(ModificationType::Extension, 3.0);
        assert_eq!(clamped.adjustment(), 2.0);
    }

    #[test]
    fn decoded_fraction_is_bounded() {
        let ctx: ModificationContext =
            serde_json::from_str(r#"{"modificationType":"correction","fractionChanged":5.0}"#).unwrap();
        assert_eq!(ctx.adjustment(), -8.0);
        let ctx: ModificationContext =
            serde_json::from_str(r#"{"modificationType":"extension","fractionChanged":-2.0}"#).unwrap();
        assert_eq!(ctx.adjustment(), 0.0);
    }

    #[test]
    fn fraction_changed_bounds() {
        assert_eq!(fraction_changed("", ""), 0.0);
        assert_eq!(fraction_changed("alpha beta", "gamma delta"), 1.0);
        assert!((fraction_changed("a b c d", "a b c e") - 0.4).abs() < 1e-9);
    }
}
