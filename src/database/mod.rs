pub mod database;

pub use database::{Database, DatabaseError, MealEntry, MealTotals};
