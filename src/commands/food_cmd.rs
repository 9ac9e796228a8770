use colored::Colorize;

use crate::food::{ClassifierLabel, NutritionFact, NutritionResolver};

pub async fn handle_command(input: &str, resolver: &NutritionResolver) -> Result<(), String> {
    let input = input.trim();

    match input.split_whitespace().next() {
        Some("nutrition") => {
            let food_item = input.trim_start_matches("nutrition").trim();
            if food_item.is_empty() {
                println!("Please specify a food item to analyze.");
                return Ok(());
            }
            lookup(food_item, resolver).await
        }
        Some("batch") => {
            let items = split_batch(input.trim_start_matches("batch"));
            if items.is_empty() {
                println!("Usage: batch <food>, <food>, ...");
                return Ok(());
            }
            let facts = resolver.resolve_many(items.as_slice()).await;
            println!("Resolved {} of {} items", facts.len(), items.len());
            for fact in &facts {
                print_fact(fact);
            }
            Ok(())
        }
        Some("scan") => {
            let label = parse_scan(input.trim_start_matches("scan"))
                .ok_or_else(|| "Usage: scan <label> [confidence]".to_string())?;
            println!(
                "📷 Classifier says {} ({:.0}%)",
                label.label.cyan(),
                label.confidence * 100.0
            );
            lookup(&label.query(), resolver).await
        }
        _ => Err("Unknown food command. Type 'help' for available commands.".to_string()),
    }
}

async fn lookup(food_item: &str, resolver: &NutritionResolver) -> Result<(), String> {
    match resolver.resolve(food_item).await {
        Ok(fact) => {
            print_fact(&fact);
            Ok(())
        }
        Err(_) => Err(format!(
            "❌ '{}' not found. Try a different name or a manual search.",
            food_item
        )),
    }
}

pub fn print_fact(fact: &NutritionFact) {
    println!("\n🥗 {} (per {})", fact.name.bright_yellow(), fact.serving_size_label);
    println!("• Calories: {} kcal", fact.calories_kcal.to_string().cyan());
    println!("• Protein: {:.1} g", fact.protein_grams);
    println!("• Carbohydrates: {:.1} g", fact.carbohydrate_grams);
    println!("• Fat: {:.1} g", fact.fat_grams);
    println!("• Fiber: {:.1} g", fact.fiber_grams);
    println!("• Confidence: {:.0}%", fact.confidence * 100.0);
}

fn split_batch(rest: &str) -> Vec<String> {
    rest.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// `<label> [confidence]`, where confidence is in [0, 1] and defaults to 1.
fn parse_scan(rest: &str) -> Option<ClassifierLabel> {
    let mut parts: Vec<&str> = rest.split_whitespace().collect();
    let confidence = match parts.last().and_then(|p| p.parse::<f32>().ok()) {
        Some(c) if parts.len() > 1 && (0.0..=1.0).contains(&c) => {
            parts.pop();
            c
        }
        _ => 1.0,
    };
    if parts.is_empty() {
        return None;
    }
    Some(ClassifierLabel::new(parts.join("_"), confidence))
}
