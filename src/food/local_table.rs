use std::collections::HashMap;

use crate::food::types::{normalize_name, NutritionFact, DEFAULT_SERVING_LABEL, LOCAL_CONFIDENCE};

/// Per-100g facts for common Indian dishes:
/// (key, display name, kcal, protein, carbohydrates, fat, fiber).
const INDIAN_DISHES: &[(&str, &str, u32, f64, f64, f64, f64)] = &[
    ("biryani", "Chicken Biryani", 165, 8.1, 23.0, 4.1, 0.6),
    ("idli", "Idli", 58, 2.5, 11.7, 0.4, 0.9),
    ("dosa", "Dosa", 112, 2.5, 20.0, 2.0, 1.2),
    ("masala dosa", "Masala Dosa", 167, 3.9, 26.5, 5.3, 1.9),
    ("samosa", "Samosa", 262, 4.6, 31.6, 13.0, 2.4),
    ("butter chicken", "Butter Chicken", 150, 12.4, 4.6, 9.2, 0.6),
    ("naan", "Naan", 290, 9.0, 50.0, 5.6, 2.2),
    ("roti", "Roti", 264, 9.6, 48.0, 3.7, 8.5),
    ("dal", "Dal Tadka", 116, 6.8, 16.3, 2.8, 4.2),
    ("chicken curry", "Chicken Curry", 138, 12.0, 4.5, 8.0, 1.1),
    ("paneer tikka", "Paneer Tikka", 242, 14.5, 6.8, 17.6, 1.0),
    ("palak paneer", "Palak Paneer", 168, 8.4, 6.5, 12.4, 2.3),
    ("tandoori chicken", "Tandoori Chicken", 148, 22.4, 3.1, 5.0, 0.5),
    ("pulao", "Vegetable Pulao", 141, 3.0, 24.2, 3.6, 1.5),
    ("paratha", "Aloo Paratha", 258, 5.4, 36.1, 10.2, 3.1),
    ("poha", "Poha", 130, 2.4, 23.4, 2.9, 1.3),
    ("upma", "Upma", 132, 3.2, 20.3, 4.1, 1.7),
    ("vada", "Medu Vada", 291, 9.2, 27.5, 16.3, 3.8),
    ("uttapam", "Uttapam", 146, 4.1, 24.8, 3.4, 1.6),
    ("dhokla", "Dhokla", 160, 6.9, 22.0, 5.1, 2.6),
    ("kachori", "Kachori", 390, 7.7, 41.0, 21.8, 3.4),
    ("pav bhaji", "Pav Bhaji", 193, 4.5, 26.1, 8.1, 3.3),
    ("chole", "Chole", 164, 7.9, 21.6, 5.4, 6.1),
    ("rajma", "Rajma", 140, 7.1, 19.2, 3.8, 5.9),
    ("aloo gobi", "Aloo Gobi", 107, 2.6, 12.9, 5.3, 3.0),
];

/// One row of the local reference table.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalEntry {
    pub key: String,
    pub fact: NutritionFact,
}

/// Immutable, in-memory reference of known dishes.
///
/// Exact lookups go through a hash index. Fuzzy lookups walk the entries
/// longest key first (ties keep insertion order), so "palak paneer curry"
/// resolves to "palak paneer" rather than a shorter key it also contains.
#[derive(Debug, Clone)]
pub struct LocalNutritionTable {
    entries: Vec<LocalEntry>,
    index: HashMap<String, usize>,
    fuzzy_order: Vec<usize>,
}

impl LocalNutritionTable {
    /// Builds a table from `(name, fact)` pairs. Keys are normalized names;
    /// every fact is stamped with the local confidence. A later duplicate key
    /// replaces the earlier one.
    pub fn new<I>(facts: I) -> Self
    where
        I: IntoIterator<Item = (String, NutritionFact)>,
    {
        let mut entries: Vec<LocalEntry> = Vec::new();
        let mut index = HashMap::new();

        for (name, mut fact) in facts {
            let key = normalize_name(&name);
            if key.is_empty() {
                continue;
            }
            fact.confidence = LOCAL_CONFIDENCE;
            let entry = LocalEntry { key: key.clone(), fact };
            match index.get(&key) {
                Some(&pos) => entries[pos] = entry,
                None => {
                    index.insert(key, entries.len());
                    entries.push(entry);
                }
            }
        }

        let mut fuzzy_order: Vec<usize> = (0..entries.len()).collect();
        fuzzy_order.sort_by(|&a, &b| entries[b].key.len().cmp(&entries[a].key.len()));

        Self {
            entries,
            index,
            fuzzy_order,
        }
    }

    /// The built-in table of Indian dishes.
    pub fn builtin() -> Self {
        Self::new(INDIAN_DISHES.iter().map(
            |&(key, name, calories, protein, carbs, fat, fiber)| {
                (
                    key.to_string(),
                    NutritionFact {
                        name: name.to_string(),
                        calories_kcal: calories,
                        protein_grams: protein,
                        carbohydrate_grams: carbs,
                        fat_grams: fat,
                        fiber_grams: fiber,
                        serving_size_label: DEFAULT_SERVING_LABEL.to_string(),
                        confidence: LOCAL_CONFIDENCE,
                    },
                )
            },
        ))
    }

    /// Exact key match.
    pub fn lookup(&self, normalized_name: &str) -> Option<NutritionFact> {
        let key = normalize_name(normalized_name);
        self.index
            .get(&key)
            .map(|&pos| self.entries[pos].fact.clone())
    }

    /// Exact key match, then the first key that contains the query or is
    /// contained in it.
    pub fn fuzzy_lookup(&self, normalized_name: &str) -> Option<NutritionFact> {
        let query = normalize_name(normalized_name);
        if query.is_empty() {
            return None;
        }
        if let Some(fact) = self.lookup(&query) {
            return Some(fact);
        }

        self.fuzzy_order
            .iter()
            .map(|&pos| &self.entries[pos])
            .find(|entry| entry.key.contains(&query) || query.contains(&entry.key))
            .map(|entry| {
                log::debug!("Local table matched '{}' to '{}'", query, entry.key);
                entry.fact.clone()
            })
    }

    pub fn all(&self) -> Vec<NutritionFact> {
        self.entries.iter().map(|e| e.fact.clone()).collect()
    }

    pub fn entries(&self) -> &[LocalEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for LocalNutritionTable {
    fn default() -> Self {
        Self::builtin()
    }
}
