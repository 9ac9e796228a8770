use async_trait::async_trait;

use crate::food::types::LookupOutcome;

/// A remote source of nutrition facts, queried by food name.
///
/// Implementations never return errors: every failure is reported as
/// `LookupOutcome::TransportFailure` so callers can fall back.
#[async_trait]
pub trait NutritionSource: Send + Sync {
    async fn lookup(&self, query: &str) -> LookupOutcome;

    fn source_name(&self) -> &str;
}
