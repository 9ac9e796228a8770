use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, SecondsFormat, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use rusqlite::{params, Row};
use tokio_rusqlite::Connection;
use uuid::Uuid;

use crate::food::config::DEFAULT_HISTORY_LIMIT;
use crate::food::types::NutritionFact;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] tokio_rusqlite::Error),
    #[error("Database connection error: {0}")]
    Connection(String),
    #[error("Portion multiplier must be between 0.01 and 20, got {0}")]
    InvalidPortion(f64),
    #[error("User id must not be empty")]
    MissingUser,
    #[error("Stored meal is unreadable: {0}")]
    Corrupt(String),
}

/// A resolved food the user ate, as stored in their history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealEntry {
    pub id: Uuid,
    pub user_id: String,
    pub fact: NutritionFact,
    /// Multiplier applied to the fact's serving, e.g. 1.5 for one and a half servings.
    pub portion: f64,
    pub captured_at: DateTime<Utc>,
}

impl MealEntry {
    pub fn new(user_id: impl Into<String>, fact: NutritionFact, portion: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            fact,
            portion,
            captured_at: Utc::now(),
        }
    }

    /// The fact scaled by the portion multiplier.
    pub fn scaled(&self) -> NutritionFact {
        let p = self.portion;
        NutritionFact {
            calories_kcal: (f64::from(self.fact.calories_kcal) * p).round() as u32,
            protein_grams: self.fact.protein_grams * p,
            carbohydrate_grams: self.fact.carbohydrate_grams * p,
            fat_grams: self.fact.fat_grams * p,
            fiber_grams: self.fact.fiber_grams * p,
            ..self.fact.clone()
        }
    }
}

/// Sum of scaled meals over a period.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MealTotals {
    pub meals: usize,
    pub calories_kcal: u32,
    pub protein_grams: f64,
    pub carbohydrate_grams: f64,
    pub fat_grams: f64,
    pub fiber_grams: f64,
}

impl MealTotals {
    fn add(&mut self, fact: &NutritionFact) {
        self.meals += 1;
        self.calories_kcal = self.calories_kcal.saturating_add(fact.calories_kcal);
        self.protein_grams += fact.protein_grams;
        self.carbohydrate_grams += fact.carbohydrate_grams;
        self.fat_grams += fact.fat_grams;
        self.fiber_grams += fact.fiber_grams;
    }
}

/// Raw column values, converted into a `MealEntry` outside the SQLite thread.
struct MealRow {
    id: String,
    user_id: String,
    captured_at: String,
    name: String,
    calories_kcal: i64,
    protein_grams: f64,
    carbohydrate_grams: f64,
    fat_grams: f64,
    fiber_grams: f64,
    serving_size_label: String,
    confidence: f64,
    portion: f64,
}

impl MealRow {
    /// Reads a row selected with `MEAL_COLUMNS`.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            captured_at: row.get(2)?,
            name: row.get(3)?,
            calories_kcal: row.get(4)?,
            protein_grams: row.get(5)?,
            carbohydrate_grams: row.get(6)?,
            fat_grams: row.get(7)?,
            fiber_grams: row.get(8)?,
            serving_size_label: row.get(9)?,
            confidence: row.get(10)?,
            portion: row.get(11)?,
        })
    }

    fn into_entry(self) -> Result<MealEntry, DatabaseError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| DatabaseError::Corrupt(format!("bad id '{}': {}", self.id, e)))?;
        let captured_at = DateTime::parse_from_rfc3339(&self.captured_at)
            .map_err(|e| {
                DatabaseError::Corrupt(format!("bad timestamp '{}': {}", self.captured_at, e))
            })?
            .with_timezone(&Utc);
        let calories_kcal = u32::try_from(self.calories_kcal)
            .map_err(|_| DatabaseError::Corrupt(format!("bad calories {}", self.calories_kcal)))?;

        Ok(MealEntry {
            id,
            user_id: self.user_id,
            fact: NutritionFact {
                name: self.name,
                calories_kcal,
                protein_grams: self.protein_grams,
                carbohydrate_grams: self.carbohydrate_grams,
                fat_grams: self.fat_grams,
                fiber_grams: self.fiber_grams,
                serving_size_label: self.serving_size_label,
                confidence: self.confidence,
            },
            portion: self.portion,
            captured_at,
        })
    }
}

const MEAL_COLUMNS: &str = "id, user_id, captured_at, name, calories_kcal, protein_grams, \
     carbohydrate_grams, fat_grams, fiber_grams, serving_size_label, confidence, portion";

fn timestamp(at: &DateTime<Utc>) -> String {
    // Fixed width so that text order is time order.
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub const MIN_PORTION: f64 = 0.01;
pub const MAX_PORTION: f64 = 20.0;

fn check_portion(portion: f64) -> Result<(), DatabaseError> {
    if (MIN_PORTION..=MAX_PORTION).contains(&portion) {
        Ok(())
    } else {
        Err(DatabaseError::InvalidPortion(portion))
    }
}

/// Per-user meal history on SQLite.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Connection>,
    history_limit: usize,
}

impl Database {
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DatabaseError::Connection(e.to_string()))?;
            }
        }
        let conn = Connection::open(path)
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;
        Self::with_connection(conn).await
    }

    pub async fn in_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;
        Self::with_connection(conn).await
    }

    async fn with_connection(conn: Connection) -> Result<Self, DatabaseError> {
        let db = Self {
            conn: Arc::new(conn),
            history_limit: DEFAULT_HISTORY_LIMIT,
        };
        db.initialize().await?;
        Ok(db)
    }

    /// Caps how many entries a history read returns.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit.max(1);
        self
    }

    async fn initialize(&self) -> Result<(), DatabaseError> {
        self.conn
            .call(|conn| {
                conn.execute_batch(
                    "CREATE TABLE IF NOT EXISTS meals (
                        id TEXT PRIMARY KEY,
                        user_id TEXT NOT NULL,
                        captured_at TEXT NOT NULL,
                        name TEXT NOT NULL,
                        calories_kcal INTEGER NOT NULL,
                        protein_grams REAL NOT NULL,
                        carbohydrate_grams REAL NOT NULL,
                        fat_grams REAL NOT NULL,
                        fiber_grams REAL NOT NULL,
                        serving_size_label TEXT NOT NULL,
                        confidence REAL NOT NULL,
                        portion REAL NOT NULL
                    );
                    CREATE INDEX IF NOT EXISTS idx_meals_user_time
                        ON meals (user_id, captured_at DESC);",
                )?;
                Ok(())
            })
            .await?;

        info!("Meal database initialized successfully");
        Ok(())
    }

    /// Stores a new meal for `user_id` with a fresh id and the current time.
    pub async fn record_meal(
        &self,
        user_id: &str,
        fact: NutritionFact,
        portion: f64,
    ) -> Result<MealEntry, DatabaseError> {
        let entry = MealEntry::new(user_id, fact, portion);
        self.save_meal(&entry).await?;
        Ok(entry)
    }

    /// Inserts or replaces an entry whose id and timestamp the caller chose.
    pub async fn save_meal(&self, entry: &MealEntry) -> Result<(), DatabaseError> {
        if entry.user_id.trim().is_empty() {
            return Err(DatabaseError::MissingUser);
        }
        check_portion(entry.portion)?;

        let meal = entry.clone();

        self.conn
            .call(move |conn| {
                conn.execute(
                    &format!(
                        "INSERT OR REPLACE INTO meals ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                        MEAL_COLUMNS
                    ),
                    params![
                        meal.id.to_string(),
                        meal.user_id,
                        timestamp(&meal.captured_at),
                        meal.fact.name,
                        i64::from(meal.fact.calories_kcal),
                        meal.fact.protein_grams,
                        meal.fact.carbohydrate_grams,
                        meal.fact.fat_grams,
                        meal.fact.fiber_grams,
                        meal.fact.serving_size_label,
                        meal.fact.confidence,
                        meal.portion,
                    ],
                )?;
                Ok(())
            })
            .await?;

        info!("Saved meal {} for user {}", entry.id, entry.user_id);
        Ok(())
    }

    /// Most recent meals first, at most `limit` and never more than the history window.
    pub async fn recent_meals(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<MealEntry>, DatabaseError> {
        let limit = limit.clamp(1, self.history_limit);
        let user_id = user_id.to_string();

        let rows = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM meals
                     WHERE user_id = ?1
                     ORDER BY captured_at DESC, rowid DESC
                     LIMIT {}",
                    MEAL_COLUMNS, limit
                ))?;

                let rows = stmt.query_map([&user_id], MealRow::from_row)?;

                let mut meals = Vec::new();
                for row in rows {
                    meals.push(row?);
                }

                Ok(meals)
            })
            .await?;

        rows.into_iter().map(MealRow::into_entry).collect()
    }

    /// The full history window for a user.
    pub async fn history(&self, user_id: &str) -> Result<Vec<MealEntry>, DatabaseError> {
        self.recent_meals(user_id, self.history_limit).await
    }

    pub async fn get_meal(&self, user_id: &str, id: Uuid) -> Result<Option<MealEntry>, DatabaseError> {
        let keys = [user_id.to_string(), id.to_string()];

        let row = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM meals WHERE user_id = ?1 AND id = ?2",
                    MEAL_COLUMNS
                ))?;
                let mut rows = stmt.query(keys)?;

                if let Some(row) = rows.next()? {
                    Ok(Some(MealRow::from_row(row)?))
                } else {
                    Ok(None)
                }
            })
            .await?;

        row.map(MealRow::into_entry).transpose()
    }

    /// Returns false when the user has no such meal.
    pub async fn update_portion(
        &self,
        user_id: &str,
        id: Uuid,
        portion: f64,
    ) -> Result<bool, DatabaseError> {
        check_portion(portion)?;
        let user_id = user_id.to_string();

        let changed = self
            .conn
            .call(move |conn| {
                let changed = conn.execute(
                    "UPDATE meals SET portion = ?1 WHERE user_id = ?2 AND id = ?3",
                    params![portion, user_id, id.to_string()],
                )?;
                Ok(changed)
            })
            .await?;

        Ok(changed > 0)
    }

    /// Returns false when the user has no such meal.
    pub async fn delete_meal(&self, user_id: &str, id: Uuid) -> Result<bool, DatabaseError> {
        let keys = [user_id.to_string(), id.to_string()];

        let changed = self
            .conn
            .call(move |conn| {
                let changed =
                    conn.execute("DELETE FROM meals WHERE user_id = ?1 AND id = ?2", keys)?;
                Ok(changed)
            })
            .await?;

        if changed > 0 {
            info!("Deleted meal {} for user {}", id, user_id);
        }
        Ok(changed > 0)
    }

    /// Portion-scaled totals of everything the user logged on `day` (UTC).
    pub async fn daily_totals(
        &self,
        user_id: &str,
        day: NaiveDate,
    ) -> Result<MealTotals, DatabaseError> {
        let start = day.and_hms_opt(0, 0, 0).map(|t| t.and_utc()).ok_or_else(|| {
            DatabaseError::Corrupt(format!("invalid day {}", day))
        })?;
        let end = start + ChronoDuration::days(1);
        let range = [user_id.to_string(), timestamp(&start), timestamp(&end)];

        let rows = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM meals
                     WHERE user_id = ?1 AND captured_at >= ?2 AND captured_at < ?3",
                    MEAL_COLUMNS
                ))?;

                let rows = stmt.query_map(range, MealRow::from_row)?;

                let mut meals = Vec::new();
                for row in rows {
                    meals.push(row?);
                }

                Ok(meals)
            })
            .await?;

        let mut totals = MealTotals::default();
        for row in rows {
            totals.add(&row.into_entry()?.scaled());
        }
        Ok(totals)
    }
}
