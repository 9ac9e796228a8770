use calorie_tracker::api;
use calorie_tracker::commands::CommandHandler;
use calorie_tracker::database::Database;
use calorie_tracker::food::api::{ApiNinjasClient, CachedSource};
use calorie_tracker::food::{FoodConfig, LocalNutritionTable, NutritionResolver};
use clap::Parser;
use colored::Colorize;
use dotenv::dotenv;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Serve the HTTP API instead of the interactive prompt
    #[arg(long)]
    api: bool,

    #[arg(long, default_value = "3000")]
    port: u16,

    /// Meal database path, overrides MEAL_DB_PATH
    #[arg(long)]
    db: Option<String>,

    /// User id for meals logged from the prompt
    #[arg(long, default_value = "local")]
    user: String,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("API error: {0}")]
    ApiError(String),
}

struct Services {
    resolver: Arc<NutritionResolver>,
    db: Arc<Database>,
}

async fn build_services(args: &Args) -> Result<Services, AppError> {
    let config = FoodConfig::from_env().map_err(|e| AppError::ConfigError(e.to_string()))?;

    if config.api_ninjas_key.is_none() {
        log::warn!("API_NINJAS_KEY is not set, only the local nutrition table will answer");
    }

    let remote = CachedSource::wrap(
        Arc::new(ApiNinjasClient::from_config(&config)),
        config.cache_capacity,
        config.cache_ttl,
    );
    let resolver = NutritionResolver::new(remote, Arc::new(LocalNutritionTable::builtin()))
        .with_batch_delay(config.batch_delay);

    let db_path = args.db.clone().unwrap_or(config.meal_db_path);
    let db = Database::new(&db_path)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?
        .with_history_limit(config.history_limit);

    Ok(Services {
        resolver: Arc::new(resolver),
        db: Arc::new(db),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize colored output
    colored::control::set_override(true);

    // Load environment variables
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let services = build_services(&args).await?;

    if args.api {
        run_api_server(&args, services).await?;
    } else {
        run_cli_mode(&args, services).await?;
    }
    Ok(())
}

async fn run_cli_mode(args: &Args, services: Services) -> anyhow::Result<()> {
    let mut command_handler = CommandHandler::new(services.resolver, services.db, args.user.clone());

    println!("🍛 Calorie tracker ready. Logging meals as {}", args.user.cyan());
    if let Err(e) = command_handler.handle_command("help").await {
        println!("{}", e.red());
    }

    let mut rl = Editor::<(), DefaultHistory>::new()?;

    loop {
        match rl.readline("🍽️ ") {
            Ok(line) => {
                let input = line.trim();
                let _ = rl.add_history_entry(input);

                if let Err(e) = command_handler.handle_command(input).await {
                    println!("{}", e.red());
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }
    Ok(())
}

async fn run_api_server(args: &Args, services: Services) -> Result<(), AppError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));

    let app = api::create_api(services.resolver, services.db);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::ApiError(format!("Failed to bind to {}: {}", addr, e)))?;

    log::info!("Server successfully bound to {}", addr);
    println!("Ready to accept connections!");

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::ApiError(format!("Server error: {}", e)))?;

    Ok(())
}
