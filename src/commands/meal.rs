use chrono::Utc;
use colored::Colorize;
use uuid::Uuid;

use super::food_cmd::print_fact;
use crate::database::{Database, MealEntry};
use crate::food::NutritionResolver;

pub async fn handle_command(
    input: &str,
    resolver: &NutritionResolver,
    db: &Database,
    user_id: &str,
) -> Result<(), String> {
    let input = input.trim();
    let command = input.split_whitespace().next().unwrap_or_default();
    let rest = input.trim_start_matches(command).trim();

    match command {
        "log" => {
            let (food_item, portion) = parse_log(rest)
                .ok_or_else(|| "Usage: log <food> [portion]".to_string())?;
            let fact = resolver
                .resolve(&food_item)
                .await
                .map_err(|_| format!("❌ '{}' not found. Meal was not logged.", food_item))?;
            let entry = db
                .record_meal(user_id, fact, portion)
                .await
                .map_err(|e| format!("Failed to log meal: {}", e))?;
            println!("✅ Logged {} x{}", entry.fact.name.bright_yellow(), entry.portion);
            print_fact(&entry.scaled());
            println!("  id: {}", entry.id.to_string().dimmed());
            Ok(())
        }
        "history" => {
            let meals = db
                .history(user_id)
                .await
                .map_err(|e| format!("Failed to load history: {}", e))?;
            if meals.is_empty() {
                println!("No meals logged yet. Try: log idli 2");
                return Ok(());
            }
            println!("\n📒 Recent meals for {}:", user_id.cyan());
            for meal in &meals {
                print_meal(meal);
            }
            Ok(())
        }
        "today" => {
            let totals = db
                .daily_totals(user_id, Utc::now().date_naive())
                .await
                .map_err(|e| format!("Failed to compute totals: {}", e))?;
            println!("\n📊 Today: {} meals", totals.meals);
            println!("• Calories: {} kcal", totals.calories_kcal.to_string().cyan());
            println!("• Protein: {:.1} g", totals.protein_grams);
            println!("• Carbohydrates: {:.1} g", totals.carbohydrate_grams);
            println!("• Fat: {:.1} g", totals.fat_grams);
            println!("• Fiber: {:.1} g", totals.fiber_grams);
            Ok(())
        }
        "portion" => {
            let mut parts = rest.split_whitespace();
            let id = parts.next().and_then(|s| Uuid::parse_str(s).ok());
            let portion = parts.next().and_then(|s| s.parse::<f64>().ok());
            let (Some(id), Some(portion)) = (id, portion) else {
                return Err("Usage: portion <id> <portion>".to_string());
            };
            let changed = db
                .update_portion(user_id, id, portion)
                .await
                .map_err(|e| format!("Failed to update meal: {}", e))?;
            if changed {
                println!("✅ Portion updated to {}", portion);
                Ok(())
            } else {
                Err(format!("No meal with id {}", id))
            }
        }
        "delete" => {
            let id = Uuid::parse_str(rest).map_err(|_| "Usage: delete <id>".to_string())?;
            let removed = db
                .delete_meal(user_id, id)
                .await
                .map_err(|e| format!("Failed to delete meal: {}", e))?;
            if removed {
                println!("🗑️ Meal removed");
                Ok(())
            } else {
                Err(format!("No meal with id {}", id))
            }
        }
        _ => Err("Unknown meal command. Type 'help' for available commands.".to_string()),
    }
}

fn print_meal(meal: &MealEntry) {
    let scaled = meal.scaled();
    println!(
        "  {} {} x{} - {} kcal  {}",
        meal.captured_at.format("%Y-%m-%d %H:%M").to_string().dimmed(),
        meal.fact.name.bright_yellow(),
        meal.portion,
        scaled.calories_kcal.to_string().cyan(),
        meal.id.to_string().dimmed()
    );
}

/// `<food> [portion]`; a trailing number is the portion when a food name precedes it.
fn parse_log(rest: &str) -> Option<(String, f64)> {
    let mut parts: Vec<&str> = rest.split_whitespace().collect();
    let portion = match parts.last().and_then(|p| p.parse::<f64>().ok()) {
        Some(p) if parts.len() > 1 => {
            parts.pop();
            p
        }
        _ => 1.0,
    };
    if parts.is_empty() {
        return None;
    }
    Some((parts.join(" "), portion))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log() {
        assert_eq!(parse_log("masala dosa 1.5"), Some(("masala dosa".to_string(), 1.5)));
        assert_eq!(parse_log("idli"), Some(("idli".to_string(), 1.0)));
        assert_eq!(parse_log("  "), None);
    }
}
