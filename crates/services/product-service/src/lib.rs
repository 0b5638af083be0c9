//! Product Service Library
//!
//! Persistence for `Product` records: the SeaORM entity with its timestamp
//! hooks, schema migrations, the repository and a thin service layer.

pub mod infra;
pub mod repository;
pub mod service;

use tracing::info;

use common::{AppConfiguration, AppResult};

use crate::infra::Database;

pub use crate::repository::{ProductRepository, ProductStore};
pub use crate::service::{ProductManager, ProductService};

/// Run migrations (for CLI commands).
pub async fn run_migrations(config: &AppConfiguration, action: MigrateAction) -> AppResult<()> {
    let db = Database::connect_without_migrations(Database::options(&config.database)?).await?;

    match action {
        MigrateAction::Up => {
            db.run_migrations().await?;
            info!("Migrations applied successfully");
        }
        MigrateAction::Down => {
            db.rollback_migration().await?;
            info!("Rolled back last migration");
        }
        MigrateAction::Status => {
            let status = db.migration_status().await?;
            for (name, applied) in status {
                let marker = if applied { "[x]" } else { "[ ]" };
                println!("{} {}", marker, name);
            }
        }
        MigrateAction::Fresh => {
            db.fresh_migrations().await?;
            info!("Database reset and migrations applied");
        }
    }

    Ok(())
}

/// Migration action type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrateAction {
    Up,
    Down,
    Status,
    Fresh,
}
