#![warn(mismatched_lifetime_syntaxes)]
#![deny(clippy::pedantic, unsafe_code)]
#![allow(
    clippy::needless_raw_string_hashes,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]
#![allow(clippy::module_name_repetitions)]

//! State management for relsync
//!
//! This crate owns the `SQLite` metadata store: the space registry the
//! cluster reconciler reads, the cluster relation table it writes, and the
//! data-link components the relation rebuilder claims.

pub mod datalink_queries;
pub mod manager;
pub mod models;
pub mod relation_queries;

pub use manager::{DataLinkCommit, MetadataStore};
pub mod queries {
    pub use crate::datalink_queries::*;
    pub use crate::relation_queries::*;
}

pub use models::{
    ClusterRelation, DataBusConfig, DataLink, DataSource, ResultTableConfig, SinkComponent, Space,
    SpaceResource,
};

use relsync_errors::Error;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::time::Duration;

/// Connection pool sizing
#[derive(Debug, Clone, Copy)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub busy_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 5,
            busy_timeout: Duration::from_secs(30),
        }
    }
}

/// Create a new `SQLite` connection pool with default settings
///
/// # Errors
///
/// Returns an error if the database connection fails or configuration is invalid.
pub async fn create_pool(db_path: &Path) -> Result<Pool<Sqlite>, Error> {
    create_pool_with(db_path, PoolSettings::default()).await
}

/// Create a new `SQLite` connection pool
///
/// # Errors
///
/// Returns an error if the database connection fails or configuration is invalid.
pub async fn create_pool_with(
    db_path: &Path,
    settings: PoolSettings,
) -> Result<Pool<Sqlite>, Error> {
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .pragma("temp_store", "MEMORY")
        .busy_timeout(settings.busy_timeout);

    let pool = SqlitePoolOptions::new()
        .max_connections(settings.max_connections)
        .connect_with(options)
        .await
        .map_err(|e| {
            Error::from(relsync_errors::StateError::DatabaseError {
                message: e.to_string(),
            })
        })?;

    tracing::debug!(
        path = %db_path.display(),
        max_connections = settings.max_connections,
        "metadata store pool opened"
    );
    Ok(pool)
}

/// Run database migrations
///
/// # Errors
///
/// Returns an error if any migration fails to execute.
pub async fn run_migrations(pool: &Pool<Sqlite>) -> Result<(), Error> {
    let migrator = sqlx::migrate!("./migrations");
    migrator.run(pool).await.map_err(|e| {
        tracing::error!(error = %e, "metadata store migration failed");
        Error::from(relsync_errors::StateError::MigrationFailed {
            message: e.to_string(),
        })
    })?;
    tracing::debug!(
        migrations = migrator.iter().count(),
        "metadata store schema up to date"
    );
    Ok(())
}
