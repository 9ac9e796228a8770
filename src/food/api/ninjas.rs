use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::time::Duration;
use url::Url;

use crate::food::api::fields::{parse_field, FieldValue};
use crate::food::api::traits::NutritionSource;
use crate::food::config::FoodConfig;
use crate::food::types::{
    display_name, LookupOutcome, NutrientField, NutritionFact, DEFAULT_SERVING_LABEL,
    REMOTE_CONFIDENCE,
};

/// One item of the `/nutrition` response. Gated fields arrive either as a
/// number or as the gating message, so they stay untyped until parsed.
#[derive(Debug, Deserialize)]
struct NinjasItem {
    #[serde(default)]
    name: String,
    #[serde(default)]
    calories: Value,
    #[serde(default)]
    serving_size_g: Value,
    #[serde(default)]
    protein_g: Value,
    #[serde(default)]
    carbohydrates_total_g: Value,
    #[serde(default)]
    fat_total_g: Value,
    #[serde(default)]
    fiber_g: Value,
}

/// Client for the API Ninjas nutrition endpoint.
#[derive(Debug, Clone)]
pub struct ApiNinjasClient {
    api_key: Option<String>,
    base_url: String,
    client: Client,
}

impl ApiNinjasClient {
    pub fn new(api_key: Option<String>, base_url: String, timeout: Duration) -> Self {
        let client = match Client::builder().timeout(timeout).build() {
            Ok(client) => client,
            Err(e) => {
                log::warn!(
                    "Failed to build HTTP client with {:?} timeout, using defaults without one: {}",
                    timeout,
                    e
                );
                Client::new()
            }
        };

        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn from_config(config: &FoodConfig) -> Self {
        Self::new(
            config.api_ninjas_key.clone(),
            config.api_base_url.clone(),
            config.request_timeout,
        )
    }

    fn request_url(&self, query: &str) -> Result<Url, String> {
        let mut url = Url::parse(&format!("{}/nutrition", self.base_url))
            .map_err(|e| format!("Invalid base URL '{}': {}", self.base_url, e))?;
        url.query_pairs_mut().append_pair("query", query);
        Ok(url)
    }

    async fn fetch(&self, query: &str) -> Result<Vec<NinjasItem>, String> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| "API key not configured".to_string())?;
        let url = self.request_url(query)?;

        let response = self
            .client
            .get(url)
            .header("X-Api-Key", api_key)
            .send()
            .await
            .map_err(|e| format!("Failed to send request: {}", e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(format!("Credentials rejected (HTTP {})", status.as_u16()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("API request failed: Status {}, Body: {}", status, body));
        }

        response
            .json::<Vec<NinjasItem>>()
            .await
            .map_err(|e| format!("Failed to parse response: {}", e))
    }
}

#[async_trait]
impl NutritionSource for ApiNinjasClient {
    async fn lookup(&self, query: &str) -> LookupOutcome {
        let query = query.trim();
        match self.fetch(query).await {
            Ok(items) => match items.into_iter().next() {
                Some(item) => item_to_outcome(item, query),
                None => LookupOutcome::NotFound,
            },
            Err(reason) => LookupOutcome::TransportFailure(reason),
        }
    }

    fn source_name(&self) -> &str {
        "api-ninjas"
    }
}

fn item_to_outcome(item: NinjasItem, query: &str) -> LookupOutcome {
    let fields = [
        (NutrientField::Calories, parse_field(&item.calories)),
        (NutrientField::Protein, parse_field(&item.protein_g)),
        (NutrientField::Carbohydrates, parse_field(&item.carbohydrates_total_g)),
        (NutrientField::Fat, parse_field(&item.fat_total_g)),
        (NutrientField::Fiber, parse_field(&item.fiber_g)),
    ];

    let mut restricted = BTreeSet::new();
    for (field, value) in fields.iter() {
        if !value.is_missing() {
            continue;
        }
        if !field.is_gated() {
            // The free tier has always returned these as numbers.
            log::warn!(
                "Remote source returned an unusable {} value ({:?}) for '{}'; treating it as 0",
                field,
                value,
                query
            );
        }
        restricted.insert(*field);
    }

    let value = |field: NutrientField| -> f64 {
        fields
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v.or_zero())
            .unwrap_or(0.0)
    };

    let name = if item.name.trim().is_empty() {
        display_name(query)
    } else {
        display_name(&item.name)
    };

    let fact = NutritionFact {
        name,
        calories_kcal: value(NutrientField::Calories).round() as u32,
        protein_grams: value(NutrientField::Protein),
        carbohydrate_grams: value(NutrientField::Carbohydrates),
        fat_grams: value(NutrientField::Fat),
        fiber_grams: value(NutrientField::Fiber),
        serving_size_label: serving_label(parse_field(&item.serving_size_g)),
        confidence: REMOTE_CONFIDENCE,
    };

    if restricted.is_empty() {
        LookupOutcome::Found(fact)
    } else {
        LookupOutcome::FieldsRestricted(fact, restricted)
    }
}

fn serving_label(value: FieldValue) -> String {
    match value.number() {
        Some(grams) if grams > 0.0 && grams.fract() == 0.0 => format!("{:.0}g", grams),
        Some(grams) if grams > 0.0 => format!("{:.1}g", grams),
        _ => DEFAULT_SERVING_LABEL.to_string(),
    }
}
