use crate::database::Database;
use crate::food::NutritionResolver;
use std::sync::Arc;

mod food_cmd;
mod meal;
mod system;

const FOOD_COMMANDS: [&str; 3] = ["nutrition", "batch", "scan"];
const MEAL_COMMANDS: [&str; 5] = ["log", "history", "today", "portion", "delete"];

pub struct CommandHandler {
    resolver: Arc<NutritionResolver>,
    db: Arc<Database>,
    user_id: String,
}

impl CommandHandler {
    pub fn new(resolver: Arc<NutritionResolver>, db: Arc<Database>, user_id: impl Into<String>) -> Self {
        Self {
            resolver,
            db,
            user_id: user_id.into(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub async fn handle_command(&mut self, input: &str) -> Result<(), String> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(());
        }

        // Handle single-word commands first
        if matches!(input.to_lowercase().as_str(), "help" | "exit" | "quit") {
            return system::handle_command(input);
        }

        let command = input.split_whitespace().next().unwrap_or_default();

        if FOOD_COMMANDS.contains(&command) {
            return food_cmd::handle_command(input, &self.resolver).await;
        }

        if MEAL_COMMANDS.contains(&command) {
            return meal::handle_command(input, &self.resolver, &self.db, &self.user_id).await;
        }

        // Default to a nutrition lookup if no command matches
        food_cmd::handle_command(&format!("nutrition {}", input), &self.resolver).await
    }
}
