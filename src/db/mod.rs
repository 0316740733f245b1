//! SQLite output files
//!
//! Two kinds of files are written:
//! - [`PerformanceDb`] - one file per account and day with the `ad_performance` table
//! - [`StructureDb`] - one global file with the `account_structure` table
//!
//! ## Submodules
//!
//! - [`schema`] - Table definitions
//! - [`performance`] - Per-day ad performance upserts
//! - [`structure`] - Atomic account structure file

use crate::error::DatabaseError;
use crate::utils::ensure_parent_dir;
use crate::{Error, Result};
use chrono::NaiveDate;
use sqlx::FromRow;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};

mod performance;
mod schema;
mod structure;

pub use structure::read_account_structure;

/// One row of the `ad_performance` table
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct AdPerformanceRow {
    /// Reported day
    pub date: NaiveDate,
    /// Ad id
    pub ad_id: i64,
    /// `impression_device` breakdown
    pub device: String,
    /// `publisher_platform` breakdown
    pub placement: String,
    /// JSON object with impressions, spend, actions and action values
    pub performance: String,
}

/// One row of the `account_structure` table
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct AccountStructureRow {
    /// Ad id
    pub ad_id: i64,
    /// Ad name
    pub ad: String,
    /// Ad set id
    pub ad_set_id: i64,
    /// Ad set name
    pub ad_set: String,
    /// Campaign id
    pub campaign_id: i64,
    /// Campaign name
    pub campaign: String,
    /// Account id (without `act_` prefix)
    pub account_id: i64,
    /// Account name
    pub account: String,
    /// JSON object of label attributes
    pub attributes: String,
}

/// Per-day ad performance database
pub struct PerformanceDb {
    pool: SqlitePool,
}

/// Account structure database, written to a temporary file and moved into place on
/// [`StructureDb::finish`]
pub struct StructureDb {
    pool: SqlitePool,
    tmp_path: PathBuf,
    path: PathBuf,
}

/// Open (and create if missing) a SQLite file with a single connection
async fn connect(path: &Path) -> Result<SqlitePool> {
    ensure_parent_dir(path).await.map_err(|e| {
        Error::Database(DatabaseError::ConnectionFailed(format!(
            "Failed to create directory for {}: {}",
            path.display(),
            e
        )))
    })?;

    // Rollback journal instead of WAL: the files are handed to other tools and
    // must be self-contained once closed.
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);

    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::ConnectionFailed(format!(
                "Failed to open {}: {}",
                path.display(),
                e
            )))
        })
}

/// Temporary sibling a file is built in before it is renamed to `path`
fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Delete a leftover temporary file of an interrupted run
async fn remove_stale(tmp_path: &Path) -> Result<()> {
    match tokio::fs::remove_file(tmp_path).await {
        Ok(()) => {
            tracing::debug!(path = %tmp_path.display(), "Removed stale temporary file");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::Io(e)),
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
