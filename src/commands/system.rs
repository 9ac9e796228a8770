pub fn handle_command(input: &str) -> Result<(), String> {
    match input.to_lowercase().as_str() {
        "help" => {
            println!("\n🥗 Nutrition Commands:");
            println!("  nutrition <food>          - Look up one food");
            println!("  batch <food>, <food>, ... - Look up several foods in order");
            println!("  scan <label> [confidence] - Resolve an image classifier label");
            println!("  Example: nutrition masala dosa, scan butter_chicken 0.87");
            println!("  Anything else you type is looked up as a food name");
            println!();

            println!("📒 Meal Log Commands:");
            println!("  log <food> [portion]      - Record a meal, portion 0.01 to 20 (default 1)");
            println!("  history                   - Show your recent meals");
            println!("  today                     - Show today's totals");
            println!("  portion <id> <portion>    - Change the portion of a logged meal");
            println!("  delete <id>               - Remove a logged meal");
            println!();

            println!("⚙️ System Commands:");
            println!("  help  - Show this help menu");
            println!("  exit  - Exit the program");
            Ok(())
        }
        "exit" | "quit" => {
            println!("👋 Goodbye!");
            std::process::exit(0);
        }
        _ => Err("Unknown system command. Type 'help' for available commands.".to_string()),
    }
}
