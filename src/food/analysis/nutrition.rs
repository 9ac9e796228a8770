use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::food::api::traits::NutritionSource;
use crate::food::local_table::LocalNutritionTable;
use crate::food::types::{
    normalize_name, LookupOutcome, NutrientField, NutritionFact, HYBRID_CONFIDENCE,
};

/// Neither the remote source nor the local table knows the food.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("No nutrition data found for '{query}'")]
pub struct NotFoundError {
    pub query: String,
}

/// Turns a food name into the best nutrition facts available.
///
/// The remote source is asked first. Calories or protein it withholds (or
/// reports as zero) are filled from the local table when the table knows the
/// dish; if the remote source is down or has nothing, the local table answers
/// alone.
#[derive(Clone)]
pub struct NutritionResolver {
    remote: Arc<dyn NutritionSource>,
    table: Arc<LocalNutritionTable>,
    batch_delay: Duration,
}

impl NutritionResolver {
    pub fn new(remote: Arc<dyn NutritionSource>, table: Arc<LocalNutritionTable>) -> Self {
        Self {
            remote,
            table,
            batch_delay: Duration::from_millis(500),
        }
    }

    pub fn with_batch_delay(mut self, delay: Duration) -> Self {
        self.batch_delay = delay;
        self
    }

    pub fn table(&self) -> &LocalNutritionTable {
        &self.table
    }

    pub async fn resolve(&self, query: &str) -> Result<NutritionFact, NotFoundError> {
        let normalized = normalize_name(query);
        if normalized.is_empty() {
            return Err(NotFoundError {
                query: query.to_string(),
            });
        }

        match self.remote.lookup(query.trim()).await {
            LookupOutcome::Found(fact) => Ok(self.enrich(fact, BTreeSet::new(), &normalized)),
            LookupOutcome::FieldsRestricted(fact, restricted) => {
                Ok(self.enrich(fact, restricted, &normalized))
            }
            LookupOutcome::NotFound => {
                log::debug!(
                    "{} has no entry for '{}', using local table",
                    self.remote.source_name(),
                    normalized
                );
                self.local_fallback(&normalized)
            }
            LookupOutcome::TransportFailure(reason) => {
                log::warn!(
                    "{} unavailable for '{}': {}; using local table",
                    self.remote.source_name(),
                    normalized,
                    reason
                );
                self.local_fallback(&normalized)
            }
        }
    }

    /// Resolves each query in turn, pausing between remote calls. Queries
    /// nobody knows are left out; the rest keep their order.
    pub async fn resolve_many<S: AsRef<str>>(&self, queries: &[S]) -> Vec<NutritionFact> {
        let mut facts = Vec::with_capacity(queries.len());
        for (i, query) in queries.iter().enumerate() {
            if i > 0 && !self.batch_delay.is_zero() {
                tokio::time::sleep(self.batch_delay).await;
            }
            match self.resolve(query.as_ref()).await {
                Ok(fact) => facts.push(fact),
                Err(e) => log::debug!("Skipping batch entry: {}", e),
            }
        }
        facts
    }

    fn enrich(
        &self,
        mut fact: NutritionFact,
        restricted: BTreeSet<NutrientField>,
        normalized: &str,
    ) -> NutritionFact {
        let missing: Vec<NutrientField> = NutrientField::GATED
            .iter()
            .copied()
            .filter(|f| restricted.contains(f) || fact.value_of(*f) == 0.0)
            .collect();

        for field in restricted.iter().filter(|f| !f.is_gated()) {
            log::warn!(
                "Unsupported: remote withheld {} for '{}'; kept as 0",
                field,
                normalized
            );
        }

        if missing.is_empty() {
            return fact;
        }

        let local = self.table.fuzzy_lookup(normalized).and_then(|local| {
            let scaled = local.per_serving(&fact.serving_size_label);
            if scaled.is_none() {
                log::warn!(
                    "Cannot convert local '{}' ({}) to remote serving '{}'; keeping zeros",
                    local.name,
                    local.serving_size_label,
                    fact.serving_size_label
                );
            }
            scaled
        });

        match local {
            Some(local) => {
                log::debug!(
                    "Filling {:?} for '{}' from local entry '{}'",
                    missing,
                    normalized,
                    local.name
                );
                for field in missing {
                    fact.take_field_from(&local, field);
                }
                fact.confidence = HYBRID_CONFIDENCE;
                fact
            }
            None => {
                log::debug!(
                    "No local entry to fill {:?} for '{}'; keeping zeros",
                    missing,
                    normalized
                );
                fact
            }
        }
    }

    fn local_fallback(&self, normalized: &str) -> Result<NutritionFact, NotFoundError> {
        match self.table.fuzzy_lookup(normalized) {
            Some(fact) => {
                log::info!("Served '{}' from local table as '{}'", normalized, fact.name);
                Ok(fact)
            }
            None => Err(NotFoundError {
                query: normalized.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::food::types::{LOCAL_CONFIDENCE, REMOTE_CONFIDENCE};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::time::Instant;

    /// Remote source answering from a fixed map; anything else is `fallback`.
    struct FakeSource {
        answers: HashMap<String, LookupOutcome>,
        fallback: LookupOutcome,
        queries: Mutex<Vec<String>>,
    }

    impl FakeSource {
        fn new(fallback: LookupOutcome) -> Self {
            Self {
                answers: HashMap::new(),
                fallback,
                queries: Mutex::new(Vec::new()),
            }
        }

        fn with(mut self, query: &str, outcome: LookupOutcome) -> Self {
            self.answers.insert(query.to_string(), outcome);
            self
        }
    }

    #[async_trait]
    impl NutritionSource for FakeSource {
        async fn lookup(&self, query: &str) -> LookupOutcome {
            self.queries.lock().push(query.to_string());
            self.answers
                .get(query)
                .cloned()
                .unwrap_or_else(|| self.fallback.clone())
        }

        fn source_name(&self) -> &str {
            "fake"
        }
    }

    fn offline() -> LookupOutcome {
        LookupOutcome::TransportFailure("connection refused".to_string())
    }

    fn remote_fact(name: &str, calories: u32, protein: f64) -> NutritionFact {
        NutritionFact {
            name: name.to_string(),
            calories_kcal: calories,
            protein_grams: protein,
            carbohydrate_grams: 22.4,
            fat_grams: 4.3,
            fiber_grams: 0.7,
            serving_size_label: "100g".to_string(),
            confidence: REMOTE_CONFIDENCE,
        }
    }

    fn resolver(source: FakeSource) -> NutritionResolver {
        NutritionResolver::new(Arc::new(source), Arc::new(LocalNutritionTable::builtin()))
            .with_batch_delay(Duration::ZERO)
    }

    fn restricted(fields: &[NutrientField]) -> BTreeSet<NutrientField> {
        fields.iter().copied().collect()
    }

    #[tokio::test]
    async fn test_remote_unavailable_uses_local_table() {
        let resolver = resolver(FakeSource::new(offline()));
        let table = LocalNutritionTable::builtin();

        for entry in table.entries() {
            let fact = resolver.resolve(&entry.key).await.unwrap();
            assert_eq!(fact, entry.fact);
            assert_eq!(fact.confidence, LOCAL_CONFIDENCE);
        }
    }

    #[tokio::test]
    async fn test_unknown_food_is_not_found() {
        let resolver = resolver(FakeSource::new(LookupOutcome::NotFound));
        let err = resolver.resolve("unknown_xyz").await.unwrap_err();
        assert_eq!(err.query, "unknown_xyz");
    }

    #[tokio::test]
    async fn test_empty_query_is_not_found() {
        let source = FakeSource::new(offline());
        let resolver = resolver(source);
        assert!(resolver.resolve("   ").await.is_err());
    }

    #[tokio::test]
    async fn test_gated_calories_are_filled_from_table() {
        let source = FakeSource::new(LookupOutcome::NotFound).with(
            "biryani",
            LookupOutcome::FieldsRestricted(
                remote_fact("Biryani", 0, 9.5),
                restricted(&[NutrientField::Calories]),
            ),
        );
        let resolver = resolver(source);
        let local = resolver.table().lookup("biryani").unwrap();

        let fact = resolver.resolve("biryani").await.unwrap();

        assert_eq!(fact.confidence, HYBRID_CONFIDENCE);
        assert_eq!(fact.calories_kcal, local.calories_kcal);
        assert_eq!(fact.protein_grams, 9.5);
        assert_eq!(fact.carbohydrate_grams, 22.4);
        assert_eq!(fact.fat_grams, 4.3);
        assert_eq!(fact.fiber_grams, 0.7);
    }

    #[tokio::test]
    async fn test_zero_protein_is_filled_from_table() {
        let source = FakeSource::new(LookupOutcome::NotFound)
            .with("idli", LookupOutcome::Found(remote_fact("Idli", 60, 0.0)));
        let resolver = resolver(source);

        let fact = resolver.resolve("idli").await.unwrap();

        assert_eq!(fact.confidence, HYBRID_CONFIDENCE);
        assert_eq!(fact.calories_kcal, 60);
        assert_eq!(fact.protein_grams, 2.5);
        assert_eq!(fact.carbohydrate_grams, 22.4);
    }

    #[tokio::test]
    async fn test_enrichment_uses_substring_match() {
        let source = FakeSource::new(LookupOutcome::NotFound).with(
            "chicken biryani",
            LookupOutcome::FieldsRestricted(
                remote_fact("Chicken Biryani", 0, 0.0),
                restricted(&[NutrientField::Calories, NutrientField::Protein]),
            ),
        );
        let resolver = resolver(source);

        let fact = resolver.resolve("chicken biryani").await.unwrap();

        assert_eq!(fact.name, "Chicken Biryani");
        assert_eq!(fact.calories_kcal, 165);
        assert_eq!(fact.protein_grams, 8.1);
        assert_eq!(fact.carbohydrate_grams, 22.4);
        assert_eq!(fact.confidence, HYBRID_CONFIDENCE);
    }

    #[tokio::test]
    async fn test_gated_without_local_entry_keeps_zeros() {
        let source = FakeSource::new(LookupOutcome::NotFound).with(
            "quinoa",
            LookupOutcome::FieldsRestricted(
                remote_fact("Quinoa", 0, 0.0),
                restricted(&[NutrientField::Calories, NutrientField::Protein]),
            ),
        );
        let resolver = resolver(source);

        let fact = resolver.resolve("quinoa").await.unwrap();

        assert_eq!(fact.calories_kcal, 0);
        assert_eq!(fact.protein_grams, 0.0);
        assert_eq!(fact.confidence, REMOTE_CONFIDENCE);
        assert!(fact.has_valid_numbers());
    }

    #[tokio::test]
    async fn test_complete_remote_answer_is_untouched() {
        let remote = remote_fact("Dosa", 133, 3.9);
        let source =
            FakeSource::new(LookupOutcome::NotFound).with("dosa", LookupOutcome::Found(remote.clone()));
        let resolver = resolver(source);

        let fact = resolver.resolve("dosa").await.unwrap();

        assert_eq!(fact, remote);
        assert_eq!(fact.confidence, REMOTE_CONFIDENCE);
    }

    #[tokio::test]
    async fn test_remote_gets_trimmed_query_and_table_gets_normalized() {
        let source = Arc::new(FakeSource::new(LookupOutcome::NotFound));
        let resolver =
            NutritionResolver::new(source.clone(), Arc::new(LocalNutritionTable::builtin()));

        let fact = resolver.resolve("  Masala Dosa ").await.unwrap();

        assert_eq!(*source.queries.lock(), vec!["Masala Dosa".to_string()]);
        assert_eq!(fact, resolver.table().lookup("masala dosa").unwrap());
    }

    #[tokio::test]
    async fn test_filled_values_follow_remote_serving() {
        let source = FakeSource::new(LookupOutcome::NotFound).with(
            "idli",
            LookupOutcome::Found(NutritionFact {
                serving_size_label: "200g".to_string(),
                ..remote_fact("Idli", 0, 0.0)
            }),
        );
        let resolver = resolver(source);

        let fact = resolver.resolve("idli").await.unwrap();

        assert_eq!(fact.serving_size_label, "200g");
        assert_eq!(fact.calories_kcal, 116);
        assert_eq!(fact.protein_grams, 5.0);
        assert_eq!(fact.carbohydrate_grams, 22.4);
        assert_eq!(fact.confidence, HYBRID_CONFIDENCE);
    }

    #[tokio::test]
    async fn test_unconvertible_serving_keeps_zeros() {
        let source = FakeSource::new(LookupOutcome::NotFound).with(
            "idli",
            LookupOutcome::Found(NutritionFact {
                serving_size_label: "2 pieces".to_string(),
                ..remote_fact("Idli", 0, 0.0)
            }),
        );
        let resolver = resolver(source);

        let fact = resolver.resolve("idli").await.unwrap();

        assert_eq!(fact.calories_kcal, 0);
        assert_eq!(fact.protein_grams, 0.0);
        assert_eq!(fact.confidence, REMOTE_CONFIDENCE);
    }

    #[tokio::test]
    async fn test_single_remote_call_per_resolve() {
        let source = Arc::new(FakeSource::new(offline()));
        let resolver = NutritionResolver::new(source.clone(), Arc::new(LocalNutritionTable::builtin()));

        resolver.resolve("  Samosa ").await.unwrap();

        assert_eq!(*source.queries.lock(), vec!["Samosa".to_string()]);
    }

    #[tokio::test]
    async fn test_resolve_many_drops_unknown_and_keeps_order() {
        let resolver = resolver(FakeSource::new(LookupOutcome::NotFound));

        let facts = resolver.resolve_many(&["idli", "unknown_xyz", "dosa"]).await;

        let names: Vec<&str> = facts.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Idli", "Dosa"]);
    }

    #[tokio::test]
    async fn test_resolve_many_waits_between_calls() {
        let resolver = NutritionResolver::new(
            Arc::new(FakeSource::new(offline())),
            Arc::new(LocalNutritionTable::builtin()),
        )
        .with_batch_delay(Duration::from_millis(20));

        let started = Instant::now();
        let facts = resolver.resolve_many(&["idli", "dosa", "naan"]).await;

        assert_eq!(facts.len(), 3);
        assert!(started.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn test_resolving_twice_is_identical() {
        let source = FakeSource::new(offline()).with(
            "biryani",
            LookupOutcome::FieldsRestricted(
                remote_fact("Biryani", 0, 0.0),
                restricted(&[NutrientField::Calories, NutrientField::Protein]),
            ),
        );
        let resolver = resolver(source);

        let first = resolver.resolve("biryani").await.unwrap();
        let second = resolver.resolve("biryani").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.calories_kcal.to_le_bytes(), second.calories_kcal.to_le_bytes());
        assert_eq!(first.protein_grams.to_bits(), second.protein_grams.to_bits());
    }

    #[tokio::test]
    async fn test_gated_carbohydrates_are_flagged_not_filled() {
        let source = FakeSource::new(LookupOutcome::NotFound).with(
            "dal",
            LookupOutcome::FieldsRestricted(
                NutritionFact {
                    carbohydrate_grams: 0.0,
                    ..remote_fact("Dal", 120, 7.0)
                },
                restricted(&[NutrientField::Carbohydrates]),
            ),
        );
        let resolver = resolver(source);

        let fact = resolver.resolve("dal").await.unwrap();

        assert_eq!(fact.carbohydrate_grams, 0.0);
        assert_eq!(fact.calories_kcal, 120);
        assert_eq!(fact.confidence, REMOTE_CONFIDENCE);
    }
}
