//! Ad performance: one insights report per account and day.

use chrono::{NaiveDate, Utc};
use futures::future;
use futures::stream::{self, StreamExt};
use serde_json::{Map, Value, json};

use super::FacebookDownloader;
use super::structure::parse_id;
use crate::db::{AdPerformanceRow, PerformanceDb};
use crate::error::{Error, Result};
use crate::graph::{AdAccount, AdInsight};
use crate::report::run_insights_report;
use crate::retry::download_with_retry;
use crate::schedule::{days_to_download, first_download_date, last_download_date};
use crate::types::{DownloadSummary, Event};
use crate::utils::performance_db_path;

impl FacebookDownloader {
    /// Download the ad performance of every due day of `accounts`
    ///
    /// At most `number_of_ad_performance_threads` days run at once. Each day is
    /// retried on its own; a day that still fails is reported and counted but does
    /// not stop the others. The returned summary only has the day and row counts set.
    pub async fn download_ad_performance(
        &self,
        accounts: &[AdAccount],
    ) -> Result<DownloadSummary> {
        let download = &self.config.download;
        let now = Utc::now();

        let mut jobs: Vec<(&AdAccount, NaiveDate)> = Vec::new();
        let mut days_skipped = 0;

        for account in accounts {
            let first = first_download_date(account, download.first_date);
            let last = last_download_date(account, now);
            let days = days_to_download(first, last, download.redownload_window, |day| {
                performance_db_path(&download.data_dir, day, &account.account_id).exists()
            });

            let in_range = if last >= first {
                (last - first).num_days() as usize + 1
            } else {
                0
            };
            days_skipped += in_range - days.len();

            tracing::info!(
                account_id = %account.account_id,
                first = %first,
                last = %last,
                due = days.len(),
                "Scheduled ad performance days"
            );

            jobs.extend(days.into_iter().map(|day| (account, day)));
        }

        let concurrency = download.number_of_ad_performance_threads.max(1);
        let summary = DownloadSummary {
            days_skipped,
            ..Default::default()
        };

        let summary = stream::iter(jobs)
            .map(|(account, date)| async move {
                let result = self.download_day(account, date).await;
                (account, date, result)
            })
            .buffer_unordered(concurrency)
            .fold(summary, |mut summary, (account, date, result)| {
                self.record_day(&mut summary, account, date, result);
                future::ready(summary)
            })
            .await;

        if self.cancel.is_cancelled() {
            tracing::warn!(
                downloaded = summary.days_downloaded,
                "Ad performance download cancelled"
            );
            return Err(Error::Cancelled);
        }

        Ok(summary)
    }

    /// Download one account and day and upsert it into its file
    ///
    /// Only the report is cancellable. Once its rows are in, the file is written
    /// to the end so a cancelled run never leaves a partial day behind.
    async fn download_day(&self, account: &AdAccount, date: NaiveDate) -> Result<usize> {
        let rows = self
            .cancellable(download_with_retry(&self.config.retry, || {
                self.fetch_day(account, date)
            }))
            .await?;

        let path = performance_db_path(&self.config.download.data_dir, date, &account.account_id);
        let written = PerformanceDb::write(&path, &rows).await?;

        tracing::info!(
            account_id = %account.account_id,
            date = %date,
            rows = written,
            "Ad performance downloaded"
        );
        self.emit_event(Event::DayDownloaded {
            account_id: account.account_id.clone(),
            date,
            rows: written,
        });

        Ok(written)
    }

    async fn fetch_day(
        &self,
        account: &AdAccount,
        date: NaiveDate,
    ) -> Result<Vec<AdPerformanceRow>> {
        let insights = run_insights_report(
            self.api.as_ref(),
            account,
            date,
            &self.config.report,
            &self.cancel,
        )
        .await?;

        insights.iter().map(performance_row).collect()
    }

    /// Count a finished day, reporting failures right away
    fn record_day(
        &self,
        summary: &mut DownloadSummary,
        account: &AdAccount,
        date: NaiveDate,
        result: Result<usize>,
    ) {
        match result {
            Ok(rows) => {
                summary.days_downloaded += 1;
                summary.rows += rows;
            }
            Err(Error::Cancelled) => {}
            Err(e) => {
                tracing::error!(
                    account_id = %account.account_id,
                    date = %date,
                    error = %e,
                    "Ad performance download failed"
                );
                summary.days_failed += 1;
                self.emit_event(Event::DayFailed {
                    account_id: account.account_id.clone(),
                    date,
                    error: e.to_string(),
                });
            }
        }
    }
}

/// Convert one insights row into an `ad_performance` row
pub(crate) fn performance_row(insight: &AdInsight) -> Result<AdPerformanceRow> {
    let date = NaiveDate::parse_from_str(&insight.date_start, "%Y-%m-%d").map_err(|_| {
        Error::InvalidResponse(format!("Invalid insights date: {:?}", insight.date_start))
    })?;

    let impressions = insight
        .impressions
        .as_deref()
        .and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or(0);
    let spend = insight
        .spend
        .as_deref()
        .and_then(|v| v.trim().parse::<f64>().ok())
        .unwrap_or(0.0);

    let performance = json!({
        "impressions": impressions,
        "spend": spend,
        "actions": floatify(insight.actions.as_deref()),
        "action_values": floatify(insight.action_values.as_deref()),
    });

    Ok(AdPerformanceRow {
        date,
        ad_id: parse_id("ad", &insight.ad_id)?,
        device: insight.impression_device.clone(),
        placement: insight.publisher_platform.clone(),
        performance: performance.to_string(),
    })
}

/// Turn numeric strings of action entries into numbers, keeping everything else
fn floatify(entries: Option<&[Map<String, Value>]>) -> Vec<Map<String, Value>> {
    entries
        .unwrap_or_default()
        .iter()
        .map(|entry| {
            entry
                .iter()
                .map(|(key, value)| {
                    let value = match value {
                        Value::String(s) => s
                            .trim()
                            .parse::<f64>()
                            .ok()
                            .and_then(serde_json::Number::from_f64)
                            .map(Value::Number)
                            .unwrap_or_else(|| value.clone()),
                        other => other.clone(),
                    };
                    (key.clone(), value)
                })
                .collect()
        })
        .collect()
}
