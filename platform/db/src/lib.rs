//! Database primitives: pool wiring plus the persistence contract the HTTP
//! layer talks to.

mod memory;
mod seed;
mod store;

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use thiserror::Error;

pub use memory::MemoryStore;
pub use seed::{DEMO_ACCOUNTS, DEMO_ROLES, seed_access_control};
pub use store::{SqlVacancyStore, VacancyStore};

/// Shared connection pool alias.
pub type DbPool = DatabaseConnection;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database url missing")]
    MissingUrl,
    #[error("record not found")]
    NotFound,
    #[error(transparent)]
    Database(#[from] DbErr),
}

pub type DbResult<T> = Result<T, DbError>;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection settings. The environment variable named by `env_key` wins over
/// the configured url so deployments can inject secrets without touching the
/// config file.
#[derive(Clone, Debug)]
pub struct DatabaseSettings {
    url: Option<String>,
    env_key: String,
    max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: None,
            env_key: "DATABASE_URL".to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

impl DatabaseSettings {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn with_env_key(mut self, env_key: impl Into<String>) -> Self {
        self.env_key = env_key.into();
        self
    }

    pub fn database_url(&self) -> DbResult<String> {
        std::env::var(&self.env_key)
            .ok()
            .or_else(|| self.url.clone())
            .filter(|url| !url.trim().is_empty())
            .ok_or(DbError::MissingUrl)
    }
}

/// Build the pool. The first connection is opened here, so an unreachable
/// database fails startup instead of every later request.
pub async fn connect(settings: &DatabaseSettings) -> DbResult<DbPool> {
    let mut options = ConnectOptions::new(settings.database_url()?);
    options
        .max_connections(settings.max_connections)
        .connect_timeout(CONNECT_TIMEOUT)
        .sqlx_logging(false);
    Database::connect(options).await.map_err(DbError::from)
}
