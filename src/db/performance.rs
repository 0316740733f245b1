//! Per-day ad performance upserts.

use crate::error::DatabaseError;
use crate::{Error, Result};
use std::path::Path;

use super::{AdPerformanceRow, PerformanceDb, connect, remove_stale, schema, tmp_path_for};

impl PerformanceDb {
    /// Open the performance file of one account and day
    ///
    /// Creates the file, its parent directories and the table if necessary.
    pub async fn open(path: &Path) -> Result<Self> {
        let pool = connect(path).await?;
        schema::create_ad_performance_table(&pool).await?;
        Ok(Self { pool })
    }

    /// Upsert `rows` into the day file at `path`
    ///
    /// A missing file is built in a temporary sibling and renamed into place once
    /// its rows are committed, so a day file never exists without its rows. An
    /// existing file is updated in place within one transaction.
    pub async fn write(path: &Path, rows: &[AdPerformanceRow]) -> Result<usize> {
        if tokio::fs::try_exists(path).await? {
            let db = Self::open(path).await?;
            let written = db.upsert(rows).await;
            db.close().await;
            return written;
        }

        let tmp_path = tmp_path_for(path);
        remove_stale(&tmp_path).await?;

        let db = Self::open(&tmp_path).await?;
        let written = db.upsert(rows).await;
        db.close().await;

        match written {
            Ok(written) => {
                tokio::fs::rename(&tmp_path, path).await?;
                Ok(written)
            }
            Err(e) => {
                if let Err(remove_err) = tokio::fs::remove_file(&tmp_path).await {
                    tracing::warn!(
                        path = %tmp_path.display(),
                        error = %remove_err,
                        "Failed to remove temporary ad performance file"
                    );
                }
                Err(e)
            }
        }
    }

    /// Insert or replace rows by primary key, in a single transaction
    ///
    /// Returns the number of rows written.
    pub async fn upsert(&self, rows: &[AdPerformanceRow]) -> Result<usize> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to begin transaction: {}",
                e
            )))
        })?;

        for row in rows {
            sqlx::query(
                r#"
                INSERT OR REPLACE INTO ad_performance (date, ad_id, device, placement, performance)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(row.date)
            .bind(row.ad_id)
            .bind(&row.device)
            .bind(&row.placement)
            .bind(&row.performance)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to upsert ad performance of ad {}: {}",
                    row.ad_id, e
                )))
            })?;
        }

        tx.commit().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to commit ad performance: {}",
                e
            )))
        })?;

        Ok(rows.len())
    }

    /// All rows, ordered by primary key
    pub async fn rows(&self) -> Result<Vec<AdPerformanceRow>> {
        let rows = sqlx::query_as::<_, AdPerformanceRow>(
            r#"
            SELECT date, ad_id, device, placement, performance
            FROM ad_performance
            ORDER BY date, ad_id, device, placement
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to read ad performance: {}",
                e
            )))
        })?;

        Ok(rows)
    }

    /// Number of rows
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ad_performance")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to count ad performance: {}",
                    e
                )))
            })?;

        Ok(count)
    }

    /// Close the database connection
    pub async fn close(self) {
        self.pool.close().await;
    }
}
