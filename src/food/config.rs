use std::env;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const DEFAULT_API_URL: &str = "https://api.api-ninjas.com/v1";
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{name} is not a valid URL: {reason}")]
    InvalidUrl { name: &'static str, reason: String },
    #[error("{name} must be a non-negative integer, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },
    #[error("{name} must be greater than zero")]
    Zero { name: &'static str },
}

#[derive(Debug, Clone)]
pub struct FoodConfig {
    /// Key for the remote nutrition API. Without it only the local table answers.
    pub api_ninjas_key: Option<String>,
    pub api_base_url: String,
    pub request_timeout: Duration,
    /// Pause between remote calls inside one batch.
    pub batch_delay: Duration,
    /// Remote response cache size; zero disables the cache.
    pub cache_capacity: usize,
    pub cache_ttl: Duration,
    pub meal_db_path: String,
    pub history_limit: usize,
}

impl Default for FoodConfig {
    fn default() -> Self {
        Self {
            api_ninjas_key: None,
            api_base_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(10),
            batch_delay: Duration::from_millis(500),
            cache_capacity: 256,
            cache_ttl: Duration::from_secs(86400), // 24 hours
            meal_db_path: "data/meals.db".to_string(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl FoodConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Builds the config from any variable source; unset variables keep their defaults.
    pub fn from_vars<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_ninjas_key = get("API_NINJAS_KEY")
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        let api_base_url = match get("NUTRITION_API_URL") {
            Some(raw) => {
                let parsed = Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidUrl {
                    name: "NUTRITION_API_URL",
                    reason: e.to_string(),
                })?;
                parsed.as_str().trim_end_matches('/').to_string()
            }
            None => defaults.api_base_url,
        };

        let request_timeout = match number(&get, "NUTRITION_TIMEOUT_SECS")? {
            Some(0) => return Err(ConfigError::Zero { name: "NUTRITION_TIMEOUT_SECS" }),
            Some(secs) => Duration::from_secs(secs),
            None => defaults.request_timeout,
        };

        let batch_delay = number(&get, "NUTRITION_BATCH_DELAY_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.batch_delay);

        let cache_capacity = number(&get, "NUTRITION_CACHE_CAPACITY")?
            .map(|n| n as usize)
            .unwrap_or(defaults.cache_capacity);

        let cache_ttl = number(&get, "NUTRITION_CACHE_TTL_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.cache_ttl);

        let meal_db_path = get("MEAL_DB_PATH")
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(defaults.meal_db_path);

        let history_limit = match number(&get, "MEAL_HISTORY_LIMIT")? {
            Some(0) => return Err(ConfigError::Zero { name: "MEAL_HISTORY_LIMIT" }),
            Some(n) => n as usize,
            None => defaults.history_limit,
        };

        Ok(Self {
            api_ninjas_key,
            api_base_url,
            request_timeout,
            batch_delay,
            cache_capacity,
            cache_ttl,
            meal_db_path,
            history_limit,
        })
    }
}

fn number<F>(get: &F, name: &'static str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
        None => Ok(None),
    }
}
