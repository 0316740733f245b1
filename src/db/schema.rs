//! Table definitions of the output files.
//!
//! Both schemas are consumed by downstream tooling; column names and primary
//! keys must stay stable.

use crate::error::DatabaseError;
use crate::{Error, Result};
use sqlx::sqlite::SqlitePool;

/// Create the `ad_performance` table if it does not exist
pub(super) async fn create_ad_performance_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ad_performance (
            date          DATE   NOT NULL,
            ad_id         BIGINT NOT NULL,
            device        TEXT   NOT NULL,
            placement     TEXT   NOT NULL,
            performance   TEXT   NOT NULL,
            PRIMARY KEY (date, ad_id, device, placement)
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| {
        Error::Database(DatabaseError::SchemaFailed(format!(
            "Failed to create ad_performance table: {}",
            e
        )))
    })?;

    Ok(())
}

/// Create the `account_structure` table if it does not exist
pub(super) async fn create_account_structure_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS account_structure (
            ad_id          BIGINT NOT NULL PRIMARY KEY,
            ad             TEXT   NOT NULL,
            ad_set_id      BIGINT NOT NULL,
            ad_set         TEXT   NOT NULL,
            campaign_id    BIGINT NOT NULL,
            campaign       TEXT   NOT NULL,
            account_id     BIGINT NOT NULL,
            account        TEXT   NOT NULL,
            attributes     TEXT   NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| {
        Error::Database(DatabaseError::SchemaFailed(format!(
            "Failed to create account_structure table: {}",
            e
        )))
    })?;

    Ok(())
}
