pub mod nutrition;

pub use nutrition::{NotFoundError, NutritionResolver};
