use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Confidence of a fact taken straight from the remote nutrition source.
pub const REMOTE_CONFIDENCE: f64 = 0.8;
/// Confidence of a fact served from the local table alone.
pub const LOCAL_CONFIDENCE: f64 = 0.8;
/// Confidence of a remote fact whose gated fields were filled from the local table.
pub const HYBRID_CONFIDENCE: f64 = 0.9;

pub const DEFAULT_SERVING_LABEL: &str = "100g";

/// Nutrition facts for one food, expressed per `serving_size_label`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionFact {
    pub name: String,
    pub calories_kcal: u32,
    pub protein_grams: f64,
    pub carbohydrate_grams: f64,
    pub fat_grams: f64,
    pub fiber_grams: f64,
    pub serving_size_label: String,
    pub confidence: f64,
}

impl NutritionFact {
    pub fn value_of(&self, field: NutrientField) -> f64 {
        match field {
            NutrientField::Calories => f64::from(self.calories_kcal),
            NutrientField::Protein => self.protein_grams,
            NutrientField::Carbohydrates => self.carbohydrate_grams,
            NutrientField::Fat => self.fat_grams,
            NutrientField::Fiber => self.fiber_grams,
        }
    }

    /// Copies a single field from `other`, leaving everything else untouched.
    pub fn take_field_from(&mut self, other: &NutritionFact, field: NutrientField) {
        match field {
            NutrientField::Calories => self.calories_kcal = other.calories_kcal,
            NutrientField::Protein => self.protein_grams = other.protein_grams,
            NutrientField::Carbohydrates => self.carbohydrate_grams = other.carbohydrate_grams,
            NutrientField::Fat => self.fat_grams = other.fat_grams,
            NutrientField::Fiber => self.fiber_grams = other.fiber_grams,
        }
    }

    /// The same food expressed per `label` instead of its own serving.
    /// `None` when either serving is not a gram amount such as "182g".
    pub fn per_serving(&self, label: &str) -> Option<NutritionFact> {
        let from = serving_grams(&self.serving_size_label)?;
        let to = serving_grams(label)?;
        let k = to / from;
        Some(NutritionFact {
            calories_kcal: (f64::from(self.calories_kcal) * k).round() as u32,
            protein_grams: self.protein_grams * k,
            carbohydrate_grams: self.carbohydrate_grams * k,
            fat_grams: self.fat_grams * k,
            fiber_grams: self.fiber_grams * k,
            serving_size_label: label.to_string(),
            ..self.clone()
        })
    }

    pub fn has_valid_numbers(&self) -> bool {
        [
            self.protein_grams,
            self.carbohydrate_grams,
            self.fat_grams,
            self.fiber_grams,
        ]
        .iter()
        .all(|v| v.is_finite() && *v >= 0.0)
            && (0.0..=1.0).contains(&self.confidence)
    }
}

impl fmt::Display for NutritionFact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}): {} kcal, protein {:.1} g, carbs {:.1} g, fat {:.1} g, fiber {:.1} g [confidence {:.2}]",
            self.name,
            self.serving_size_label,
            self.calories_kcal,
            self.protein_grams,
            self.carbohydrate_grams,
            self.fat_grams,
            self.fiber_grams,
            self.confidence
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NutrientField {
    Calories,
    Protein,
    Carbohydrates,
    Fat,
    Fiber,
}

impl NutrientField {
    /// Fields the remote source may withhold behind its paid tier.
    pub const GATED: [NutrientField; 2] = [NutrientField::Calories, NutrientField::Protein];

    pub fn is_gated(self) -> bool {
        Self::GATED.contains(&self)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NutrientField::Calories => "calories",
            NutrientField::Protein => "protein",
            NutrientField::Carbohydrates => "carbohydrates",
            NutrientField::Fat => "fat",
            NutrientField::Fiber => "fiber",
        }
    }
}

impl fmt::Display for NutrientField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of asking a single source about a food.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Found(NutritionFact),
    NotFound,
    /// The source answered but withheld some fields; they are zero in the fact.
    FieldsRestricted(NutritionFact, BTreeSet<NutrientField>),
    TransportFailure(String),
}

impl LookupOutcome {
    pub fn is_transport_failure(&self) -> bool {
        matches!(self, LookupOutcome::TransportFailure(_))
    }
}

/// Lower-cases and trims a food name for use as a local table key.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Grams in a serving label like "100g" or "30.5 g".
pub fn serving_grams(label: &str) -> Option<f64> {
    label
        .trim()
        .strip_suffix('g')?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|g| g.is_finite() && *g > 0.0)
}

/// Title-cases a lower-case source name, e.g. "chicken biryani" -> "Chicken Biryani".
pub fn display_name(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Masala Dosa \n"), "masala dosa");
        assert_eq!(normalize_name("IDLI"), "idli");
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("chicken biryani"), "Chicken Biryani");
        assert_eq!(display_name("  dal   tadka "), "Dal Tadka");
        assert_eq!(display_name(""), "");
    }

    #[test]
    fn test_take_field_from_copies_only_that_field() {
        let mut remote = NutritionFact {
            name: "Idli".to_string(),
            calories_kcal: 0,
            protein_grams: 0.0,
            carbohydrate_grams: 12.0,
            fat_grams: 0.3,
            fiber_grams: 1.0,
            serving_size_label: "100g".to_string(),
            confidence: REMOTE_CONFIDENCE,
        };
        let local = NutritionFact {
            name: "Idli".to_string(),
            calories_kcal: 58,
            protein_grams: 2.5,
            carbohydrate_grams: 11.7,
            fat_grams: 0.4,
            fiber_grams: 0.9,
            serving_size_label: "100g".to_string(),
            confidence: LOCAL_CONFIDENCE,
        };

        remote.take_field_from(&local, NutrientField::Calories);

        assert_eq!(remote.calories_kcal, 58);
        assert_eq!(remote.protein_grams, 0.0);
        assert_eq!(remote.carbohydrate_grams, 12.0);
        assert_eq!(remote.value_of(NutrientField::Calories), 58.0);
    }

    #[test]
    fn test_serving_grams() {
        assert_eq!(serving_grams("100g"), Some(100.0));
        assert_eq!(serving_grams(" 30.5 g"), Some(30.5));
        assert_eq!(serving_grams("1 cup"), None);
        assert_eq!(serving_grams("0g"), None);
    }

    #[test]
    fn test_per_serving_rescales_amounts() {
        let idli = NutritionFact {
            name: "Idli".to_string(),
            calories_kcal: 58,
            protein_grams: 2.5,
            carbohydrate_grams: 11.7,
            fat_grams: 0.4,
            fiber_grams: 0.9,
            serving_size_label: "100g".to_string(),
            confidence: LOCAL_CONFIDENCE,
        };

        let same = idli.per_serving("100g").unwrap();
        assert_eq!(same, idli);

        let double = idli.per_serving("200g").unwrap();
        assert_eq!(double.calories_kcal, 116);
        assert_eq!(double.protein_grams, 5.0);
        assert_eq!(double.serving_size_label, "200g");
        assert_eq!(double.name, "Idli");

        assert!(idli.per_serving("2 pieces").is_none());
    }

    #[test]
    fn test_gated_fields() {
        assert!(NutrientField::Calories.is_gated());
        assert!(NutrientField::Protein.is_gated());
        assert!(!NutrientField::Fat.is_gated());
        assert!(!NutrientField::Carbohydrates.is_gated());
    }
}
