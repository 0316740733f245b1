//! Account structure file.
//!
//! The file is rebuilt from scratch on every run. Rows go into a temporary
//! sibling first; readers only ever see a complete file.

use crate::error::DatabaseError;
use crate::{Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::{Path, PathBuf};

use super::{AccountStructureRow, StructureDb, connect, remove_stale, schema, tmp_path_for};

impl StructureDb {
    /// Start a new structure file that replaces `path` on [`finish`](Self::finish)
    ///
    /// A leftover temporary file from an interrupted run is discarded.
    pub async fn create(path: &Path) -> Result<Self> {
        let tmp_path = tmp_path_for(path);
        remove_stale(&tmp_path).await?;

        let pool = connect(&tmp_path).await?;
        schema::create_account_structure_table(&pool).await?;

        Ok(Self {
            pool,
            tmp_path,
            path: path.to_path_buf(),
        })
    }

    /// Insert rows in a single transaction
    ///
    /// Rows with an ad id that was already written replace the earlier row.
    pub async fn insert(&self, rows: &[AccountStructureRow]) -> Result<usize> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to begin transaction: {}",
                e
            )))
        })?;

        for row in rows {
            sqlx::query(
                r#"
                INSERT OR REPLACE INTO account_structure (
                    ad_id, ad, ad_set_id, ad_set, campaign_id, campaign,
                    account_id, account, attributes
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(row.ad_id)
            .bind(&row.ad)
            .bind(row.ad_set_id)
            .bind(&row.ad_set)
            .bind(row.campaign_id)
            .bind(&row.campaign)
            .bind(row.account_id)
            .bind(&row.account)
            .bind(&row.attributes)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to insert structure of ad {}: {}",
                    row.ad_id, e
                )))
            })?;
        }

        tx.commit().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to commit account structure: {}",
                e
            )))
        })?;

        Ok(rows.len())
    }

    /// Close the temporary file and move it over the final path
    ///
    /// Returns the final path.
    pub async fn finish(self) -> Result<PathBuf> {
        self.pool.close().await;
        tokio::fs::rename(&self.tmp_path, &self.path).await?;
        Ok(self.path)
    }

    /// Close and delete the temporary file, leaving any previous file untouched
    pub async fn abandon(self) {
        self.pool.close().await;
        if let Err(e) = tokio::fs::remove_file(&self.tmp_path).await {
            tracing::warn!(
                path = %self.tmp_path.display(),
                error = %e,
                "Failed to remove temporary structure file"
            );
        }
    }
}

/// Read every row of an account structure file, ordered by ad id
pub async fn read_account_structure(path: &Path) -> Result<Vec<AccountStructureRow>> {
    let options = SqliteConnectOptions::new().filename(path).read_only(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::ConnectionFailed(format!(
                "Failed to open {}: {}",
                path.display(),
                e
            )))
        })?;

    let rows = sqlx::query_as::<_, AccountStructureRow>(
        r#"
        SELECT ad_id, ad, ad_set_id, ad_set, campaign_id, campaign,
               account_id, account, attributes
        FROM account_structure
        ORDER BY ad_id
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        Error::Database(DatabaseError::QueryFailed(format!(
            "Failed to read account structure: {}",
            e
        )))
    });

    pool.close().await;
    rows
}
