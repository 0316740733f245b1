//! Utility functions for output file layout and path manipulation

use chrono::{Datelike, NaiveDate};
use std::path::{Path, PathBuf};

/// Version tag of the account structure file name
///
/// Bumped whenever the `account_structure` schema changes incompatibly.
pub const OUTPUT_FILE_VERSION: &str = "v1";

/// Path of the ad performance file of one account and day
///
/// The account id is given without the `act_` prefix.
///
/// # Examples
///
/// ```
/// use facebook_ads_downloader::utils::performance_db_path;
/// use chrono::NaiveDate;
/// use std::path::Path;
///
/// let day = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
/// let path = performance_db_path(Path::new("/data"), day, "42");
/// assert_eq!(
///     path,
///     Path::new("/data/2024/03/07/facebook/ad-performance-act_42.sqlite3")
/// );
/// ```
pub fn performance_db_path(data_dir: &Path, date: NaiveDate, account_id: &str) -> PathBuf {
    data_dir
        .join(format!("{:04}", date.year()))
        .join(format!("{:02}", date.month()))
        .join(format!("{:02}", date.day()))
        .join("facebook")
        .join(format!(
            "ad-performance-act_{}.sqlite3",
            strip_account_prefix(account_id)
        ))
}

/// Path of the account structure file
pub fn account_structure_path(data_dir: &Path) -> PathBuf {
    data_dir.join(format!(
        "facebook-account-structure_{}.sqlite3",
        OUTPUT_FILE_VERSION
    ))
}

/// Create the parent directory of `path` (and its ancestors) if missing
pub async fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            tokio::fs::create_dir_all(parent).await
        }
        _ => Ok(()),
    }
}

/// Remove a leading `act_` from an account id
pub fn strip_account_prefix(account_id: &str) -> &str {
    let trimmed = account_id.trim();
    trimmed.strip_prefix("act_").unwrap_or(trimmed)
}
