//! SQLite persistence for the registry authorization engine.
//!
//! The [`Store`] owns the only durable state the engine has: accounts,
//! groups and their memberships, the three authorizable object tables
//! (entries, folders, uploads), and the grant table. Grant uniqueness is
//! enforced here with a six-column UNIQUE index rather than by application
//! locking, so two callers racing to create the same grant produce one row
//! and no error to either.

pub mod accounts;
pub mod error;
pub mod grants;
pub mod groups;
pub mod objects;

pub use error::{Result, StoreError};

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use tracing::info;

/// Configuration for the registry store. Deserializable so deployments can
/// supply it from a config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the database file.
    pub database_path: PathBuf,
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
    /// Seconds to wait for a pool connection before giving up.
    pub acquire_timeout: u64,
    /// SQLite busy timeout in milliseconds.
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("data/registry.db"),
            max_connections: 5,
            acquire_timeout: 30,
            busy_timeout_ms: 5_000,
        }
    }
}

/// Connection pool plus the schema the engine relies on.
#[derive(Debug, Clone)]
pub struct Store {
    pool: Pool<Sqlite>,
}

impl Store {
    /// Open (creating if missing) the database at the configured path and
    /// bring the schema up to date.
    pub async fn new(config: StoreConfig) -> Result<Self> {
        if let Some(parent) = config.database_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!("Opening registry store at: {}", config.database_path.display());

        let options = SqliteConnectOptions::new()
            .filename(&config.database_path)
            .create_if_missing(true)
            .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout))
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;

        info!("Registry store initialized");
        Ok(store)
    }

    /// In-memory store for tests. Uses a single connection so the database
    /// lives as long as the pool.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(":memory:")
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS accounts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE COLLATE NOCASE,
                full_name TEXT NOT NULL DEFAULT '',
                is_admin BOOLEAN NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS groups (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                uuid TEXT NOT NULL UNIQUE,
                label TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                group_type TEXT NOT NULL,
                owner_email TEXT,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS group_members (
                group_id INTEGER NOT NULL,
                account_id INTEGER NOT NULL,
                PRIMARY KEY (group_id, account_id),
                FOREIGN KEY (group_id) REFERENCES groups(id) ON DELETE CASCADE,
                FOREIGN KEY (account_id) REFERENCES accounts(id) ON DELETE CASCADE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_email TEXT NOT NULL,
                name TEXT NOT NULL DEFAULT '',
                record_type TEXT NOT NULL DEFAULT 'part',
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS folders (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_email TEXT NOT NULL,
                name TEXT NOT NULL DEFAULT '',
                propagate_permissions BOOLEAN NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS folder_entries (
                folder_id INTEGER NOT NULL,
                entry_id INTEGER NOT NULL,
                PRIMARY KEY (folder_id, entry_id),
                FOREIGN KEY (folder_id) REFERENCES folders(id) ON DELETE CASCADE,
                FOREIGN KEY (entry_id) REFERENCES entries(id) ON DELETE CASCADE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS uploads (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_email TEXT NOT NULL,
                name TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // The six-column UNIQUE index is what makes grant creation
        // insert-if-absent under concurrent callers.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS grants (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                subject_kind TEXT NOT NULL,
                subject_id INTEGER NOT NULL,
                object_kind TEXT NOT NULL,
                object_id INTEGER NOT NULL,
                can_read BOOLEAN NOT NULL,
                can_write BOOLEAN NOT NULL,
                UNIQUE (subject_kind, subject_id, object_kind, object_id, can_read, can_write)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_grants_object ON grants(object_kind, object_id)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_grants_subject ON grants(subject_kind, subject_id)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_group_members_account ON group_members(account_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Close the connection pool.
    pub async fn close(self) {
        self.pool.close().await;
        info!("Registry store closed");
    }
}
