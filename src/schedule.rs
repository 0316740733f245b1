//! Which days to download for an ad account
//!
//! Performance data is kept in one file per account and day. A day is
//! downloaded when its file is missing, or when it lies within the redownload
//! window because the vendor may still revise recent numbers.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

use crate::graph::AdAccount;

/// Format of the `created_time` field of ad accounts
const CREATED_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// Yesterday, in the timezone of the ad account
pub fn last_download_date(account: &AdAccount, now: DateTime<Utc>) -> NaiveDate {
    let offset_secs = (account.timezone_offset_hours_utc * 3600.0).round() as i32;
    let today = match FixedOffset::east_opt(offset_secs) {
        Some(offset) => now.with_timezone(&offset).date_naive(),
        None => {
            tracing::warn!(
                account_id = %account.account_id,
                offset_hours = account.timezone_offset_hours_utc,
                "Invalid timezone offset, using UTC"
            );
            now.date_naive()
        }
    };
    today.pred_opt().unwrap_or(today)
}

/// The first day to download for an account
///
/// The later of the configured first date and the day the account was created.
pub fn first_download_date(account: &AdAccount, configured_first_date: NaiveDate) -> NaiveDate {
    let Some(created_time) = &account.created_time else {
        return configured_first_date;
    };

    match DateTime::parse_from_str(created_time, CREATED_TIME_FORMAT) {
        Ok(created) => configured_first_date.max(created.date_naive()),
        Err(e) => {
            tracing::warn!(
                account_id = %account.account_id,
                created_time = %created_time,
                error = %e,
                "Could not parse account creation time"
            );
            configured_first_date
        }
    }
}

/// Days that need to be (re)downloaded, newest first
///
/// A day qualifies when `is_downloaded` returns false for it, or when it is at
/// most `redownload_window` days before `last`.
pub fn days_to_download<F>(
    first: NaiveDate,
    last: NaiveDate,
    redownload_window: u32,
    is_downloaded: F,
) -> Vec<NaiveDate>
where
    F: Fn(NaiveDate) -> bool,
{
    let mut days = Vec::new();
    let mut current = last;

    while current >= first {
        let age = (last - current).num_days();
        if age <= i64::from(redownload_window) || !is_downloaded(current) {
            days.push(current);
        }
        match current.pred_opt() {
            Some(previous) => current = previous,
            None => break,
        }
    }

    days
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn account(offset_hours: f64, created_time: Option<&str>) -> AdAccount {
        AdAccount {
            account_id: "42".into(),
            name: "Shop".into(),
            created_time: created_time.map(String::from),
            timezone_offset_hours_utc: offset_hours,
        }
    }

    #[test]
    fn test_last_download_date_uses_account_timezone() {
        // 2024-03-10 02:00 UTC is still March 9th in UTC-7
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 2, 0, 0).unwrap();

        assert_eq!(last_download_date(&account(0.0, None), now), date(2024, 3, 9));
        assert_eq!(last_download_date(&account(-7.0, None), now), date(2024, 3, 8));
        assert_eq!(last_download_date(&account(5.5, None), now), date(2024, 3, 9));
    }

    #[test]
    fn test_invalid_offset_falls_back_to_utc() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 2, 0, 0).unwrap();
        assert_eq!(last_download_date(&account(99.0, None), now), date(2024, 3, 9));
    }

    #[test]
    fn test_first_download_date() {
        let configured = date(2015, 1, 1);

        assert_eq!(first_download_date(&account(0.0, None), configured), configured);
        assert_eq!(
            first_download_date(
                &account(0.0, Some("2016-05-12T23:21:33-0700")),
                configured
            ),
            date(2016, 5, 12)
        );
        // Created before the configured first date
        assert_eq!(
            first_download_date(&account(0.0, Some("2014-01-01T00:00:00+0000")), configured),
            configured
        );
        assert_eq!(
            first_download_date(&account(0.0, Some("yesterday")), configured),
            configured
        );
    }

    #[test]
    fn test_days_to_download_fresh_account() {
        let days = days_to_download(date(2024, 1, 1), date(2024, 1, 5), 2, |_| false);
        assert_eq!(
            days,
            vec![
                date(2024, 1, 5),
                date(2024, 1, 4),
                date(2024, 1, 3),
                date(2024, 1, 2),
                date(2024, 1, 1)
            ]
        );
    }

    #[test]
    fn test_days_to_download_only_redownload_window_when_complete() {
        let days = days_to_download(date(2024, 1, 1), date(2024, 1, 31), 2, |_| true);
        assert_eq!(days, vec![date(2024, 1, 31), date(2024, 1, 30), date(2024, 1, 29)]);
    }

    #[test]
    fn test_days_to_download_fills_gaps() {
        let missing = date(2024, 1, 10);
        let days = days_to_download(date(2024, 1, 1), date(2024, 1, 31), 0, |d| d != missing);
        assert_eq!(days, vec![date(2024, 1, 31), missing]);
    }

    #[test]
    fn test_days_to_download_empty_when_first_after_last() {
        let days = days_to_download(date(2024, 2, 1), date(2024, 1, 31), 28, |_| false);
        assert!(days.is_empty());
    }
}
