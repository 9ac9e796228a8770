pub mod cache;
pub mod fields;
pub mod ninjas;
pub mod traits;

// Re-export common types
pub use cache::CachedSource;
pub use ninjas::ApiNinjasClient;
pub use traits::NutritionSource;
