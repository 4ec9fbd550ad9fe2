use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use database::{ConnectionManager, DbError};

/// The main entry point for the rideshare database tooling.
#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let cli = Cli::parse();

    let settings = configuration::load_config_from(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    // Held until exit so the file writer can flush.
    let _log_guard = configuration::init_logging(&settings.logging)?;

    let manager = ConnectionManager::new(settings.database);
    manager
        .initialize()
        .await
        .context("Failed to set up the database connection pool")?;

    // Execute the appropriate command
    let outcome = match cli.command {
        Commands::Migrate => handle_migrate(&manager).await,
        Commands::Check => handle_check(&manager).await,
    };

    manager.shutdown().await;
    outcome
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Schema and connectivity tooling for the rideshare PostgreSQL store.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML config file. A missing file is not an error.
    #[arg(long, global = true, default_value = configuration::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending schema migrations.
    Migrate,
    /// Verify the database is reachable and a transaction round-trips.
    Check,
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn handle_migrate(manager: &ConnectionManager) -> Result<()> {
    manager
        .run_migrations()
        .await
        .context("Failed to run database migrations")?;
    Ok(())
}

async fn handle_check(manager: &ConnectionManager) -> Result<()> {
    manager.ping().await.context("Database is unreachable")?;

    let server_time: String = manager
        .with_session(|session| {
            Box::pin(async move {
                let now: String = sqlx::query_scalar("SELECT now()::text")
                    .fetch_one(&mut **session)
                    .await?;
                Ok::<_, DbError>(now)
            })
        })
        .await
        .context("Transaction round trip failed")?;

    if let Some(status) = manager.pool_status().await {
        tracing::info!(
            size = status.size,
            idle = status.idle,
            max_connections = status.max_connections,
            "Connection pool status."
        );
    }
    tracing::info!(%server_time, "Database check passed.");
    Ok(())
}
