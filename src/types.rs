//! Core types for facebook-ads-downloader

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Event emitted during a download run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Ad accounts listed and filtered by the target accounts
    AccountsResolved {
        /// Number of accounts that will be downloaded
        count: usize,
    },

    /// Account structure file written and moved into place
    StructureWritten {
        /// Final path of the structure file
        path: PathBuf,
        /// Number of ads written
        ads: usize,
    },

    /// Performance of one account and day written
    DayDownloaded {
        /// Account id (without `act_` prefix)
        account_id: String,
        /// Downloaded day
        date: NaiveDate,
        /// Number of rows written
        rows: usize,
    },

    /// Performance of one account and day failed after all retries
    DayFailed {
        /// Account id (without `act_` prefix)
        account_id: String,
        /// Failed day
        date: NaiveDate,
        /// Error message
        error: String,
    },
}

/// Outcome of a complete download run
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DownloadSummary {
    /// Number of accounts downloaded
    pub accounts: usize,
    /// Number of ads in the structure file
    pub ads: usize,
    /// Days written successfully
    pub days_downloaded: usize,
    /// Days skipped because their file exists outside the redownload window
    pub days_skipped: usize,
    /// Days that failed after all retries
    pub days_failed: usize,
    /// Total performance rows written
    pub rows: usize,
    /// Wall clock duration of the run
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
}

impl DownloadSummary {
    /// Number of days attempted
    pub fn days_attempted(&self) -> usize {
        self.days_downloaded + self.days_failed
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = Event::DayDownloaded {
            account_id: "42".into(),
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            rows: 12,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "day_downloaded");
        assert_eq!(json["date"], "2024-05-01");
        assert_eq!(json["rows"], 12);

        let back: Event = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_summary_days_attempted() {
        let summary = DownloadSummary {
            days_downloaded: 5,
            days_failed: 2,
            days_skipped: 30,
            ..Default::default()
        };
        assert_eq!(summary.days_attempted(), 7);
    }

    #[test]
    fn test_summary_elapsed_as_millis() {
        let summary = DownloadSummary {
            elapsed: Duration::from_millis(1500),
            ..Default::default()
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["elapsed"], 1500);
    }
}
