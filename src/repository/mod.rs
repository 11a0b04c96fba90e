//! Repository layer for database operations

pub mod books;
pub mod session;

use std::str::FromStr;

use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Sqlite,
};

use crate::{config::DatabaseConfig, error::AppResult};

pub use session::Session;

/// `STRICT` makes SQLite reject values whose type does not match the column.
pub const BOOKS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS books (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE CHECK (length(name) <= 64),
    author TEXT NOT NULL CHECK (length(author) <= 64),
    year_published INTEGER NOT NULL,
    book_type TEXT NOT NULL CHECK (length(book_type) <= 20),
    status TEXT NOT NULL DEFAULT 'available'
) STRICT
"#;

pub const DROP_BOOKS_SCHEMA: &str = "DROP TABLE IF EXISTS books";

/// Main repository struct holding the database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Sqlite>,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Open a pool for the configured database.
    ///
    /// An in-memory database lives inside one connection, so the pool is
    /// pinned to a single connection that never expires.
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(true);

        let pool_options = if config.is_in_memory() {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
                .max_connections(config.max_connections)
                .min_connections(config.min_connections)
        };
        let pool = pool_options.connect_with(options).await?;

        Ok(Self::new(pool))
    }

    /// Fresh in-memory database with the schema already created
    pub async fn in_memory() -> AppResult<Self> {
        let repository = Self::connect(&DatabaseConfig::in_memory()).await?;
        repository.create_schema().await?;
        Ok(repository)
    }

    pub async fn create_schema(&self) -> AppResult<()> {
        sqlx::query(BOOKS_SCHEMA).execute(&self.pool).await?;
        tracing::debug!("books table ready");
        Ok(())
    }

    pub async fn drop_schema(&self) -> AppResult<()> {
        sqlx::query(DROP_BOOKS_SCHEMA).execute(&self.pool).await?;
        tracing::debug!("books table dropped");
        Ok(())
    }

    /// Check database connectivity
    pub async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Start a unit of work against this repository
    pub fn session(&self) -> Session {
        Session::new(self.pool.clone())
    }
}
