mod auth;
mod config;
mod http;
mod vacancy;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use migration::{Migrator, MigratorTrait};
use platform_db::{DbPool, SqlVacancyStore, connect, seed_access_control};
use platform_obs::{ObsConfig, init_tracing};
use tracing::{info, warn};

use crate::{config::AppConfig, http::AppState};

#[derive(Parser, Debug)]
#[command(name = "vacancy-server", version, about = "Vacancy CRUD service")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(long, global = true, env = "VACANCY_CONFIG", default_value = "config.json")]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP(S) server.
    Serve(ServeCommand),
    /// Run database migrations.
    #[command(subcommand)]
    Migrate(MigrateCommand),
    /// Insert the demo roles and accounts.
    Seed,
}

#[derive(Subcommand, Debug)]
enum MigrateCommand {
    /// Apply pending migrations.
    Up,
    /// Rollback the most recent migration.
    Down,
}

#[derive(Args, Debug)]
struct ServeCommand {
    #[arg(long, help = "Start without checking for pending migrations")]
    allow_dirty: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)?;
    init_tracing(ObsConfig::default().with_log_file(config.log_path()))?;
    match cli.command {
        Command::Serve(cmd) => run_server(cmd, &config).await,
        Command::Migrate(action) => match action {
            MigrateCommand::Up => migrate_up(&config).await,
            MigrateCommand::Down => migrate_down(&config).await,
        },
        Command::Seed => run_seed(&config).await,
    }
}

/// Opens the pool eagerly; an unreachable database stops the command here.
async fn setup_pool(config: &AppConfig) -> Result<DbPool> {
    connect(&config.database_settings())
        .await
        .context("connecting to the database")
}

async fn run_server(cmd: ServeCommand, config: &AppConfig) -> Result<()> {
    let pool = setup_pool(config).await?;
    ensure_migrations(&pool, cmd.allow_dirty).await?;
    let state = AppState::new(Arc::new(SqlVacancyStore::new(pool)));
    http::serve(config.serve_config(), state).await
}

async fn ensure_migrations(pool: &DbPool, allow_dirty: bool) -> Result<()> {
    if allow_dirty {
        warn!("skipping pending migration check");
        return Ok(());
    }
    let pending = Migrator::get_pending_migrations(pool)
        .await
        .context("checking pending migrations")?;
    if !pending.is_empty() {
        anyhow::bail!(
            "pending migrations detected; run `vacancy-server migrate up` or pass --allow-dirty"
        );
    }
    Ok(())
}

async fn migrate_up(config: &AppConfig) -> Result<()> {
    let pool = setup_pool(config).await?;
    Migrator::up(&pool, None).await?;
    info!("database migrations applied");
    Ok(())
}

async fn migrate_down(config: &AppConfig) -> Result<()> {
    let pool = setup_pool(config).await?;
    Migrator::down(&pool, Some(1)).await?;
    info!("most recent migration rolled back");
    Ok(())
}

async fn run_seed(config: &AppConfig) -> Result<()> {
    let pool = setup_pool(config).await?;
    seed_access_control(&pool).await?;
    info!("demo accounts seeded");
    Ok(())
}
