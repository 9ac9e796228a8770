pub mod api;
pub mod commands;
pub mod database;
pub mod food;

// Re-export commonly used items
pub use database::{Database, DatabaseError, MealEntry};
pub use food::{
    ClassifierLabel, FoodConfig, LocalNutritionTable, LookupOutcome, NotFoundError,
    NutritionFact, NutritionResolver,
};
