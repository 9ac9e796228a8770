pub mod analysis;
pub mod api;
pub mod config;
pub mod label;
pub mod local_table;
pub mod types;

pub use analysis::{NotFoundError, NutritionResolver};
pub use config::FoodConfig;
pub use label::ClassifierLabel;
pub use local_table::LocalNutritionTable;
pub use types::{LookupOutcome, NutrientField, NutritionFact};
