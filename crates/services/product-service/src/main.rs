//! Product Service - database administration for product records.

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use common::{AppConfiguration, AppError};
use product_service_lib::MigrateAction;

#[derive(Parser)]
#[command(name = "product-service")]
#[command(about = "Product records: schema migrations and configuration checks")]
struct Cli {
    /// Env-file supplying default REGRU__ variables
    #[arg(long, global = true, default_value = common::DEFAULT_ENV_FILE)]
    env_file: std::path::PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database migration commands
    Migrate {
        #[command(subcommand)]
        action: MigrateCommands,
    },
    /// Validate and print the loaded configuration (secrets redacted)
    Config {
        /// Print as JSON instead of debug output
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum MigrateCommands {
    /// Run pending migrations
    Up,
    /// Rollback last migration
    Down,
    /// Show migration status
    Status,
    /// Reset database and run all migrations
    Fresh,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = match AppConfiguration::load_from(Some(cli.env_file.as_path())) {
        Ok(config) => config,
        Err(e) => fail(e.into()),
    };
    tracing::info!(environment = %config.environment, "Configuration loaded");

    match cli.command {
        Commands::Migrate { action } => {
            let migrate_action = match action {
                MigrateCommands::Up => MigrateAction::Up,
                MigrateCommands::Down => MigrateAction::Down,
                MigrateCommands::Status => MigrateAction::Status,
                MigrateCommands::Fresh => MigrateAction::Fresh,
            };
            if let Err(e) = product_service_lib::run_migrations(&config, migrate_action).await {
                fail(e);
            }
        }
        Commands::Config { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("{:#?}", config);
            }
        }
    }

    Ok(())
}

/// Log the error without internal details and exit.
fn fail(err: AppError) -> ! {
    tracing::error!(code = err.code(), "{}", err.user_message());
    std::process::exit(1);
}
