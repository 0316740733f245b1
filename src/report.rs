//! Asynchronous insights report jobs
//!
//! Ad level insights with breakdowns are too heavy for synchronous requests, so
//! every day is requested as a report run: submit the job, poll its status
//! until it completes, then page through the results.

use chrono::NaiveDate;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::ReportConfig;
use crate::error::{Error, ReportJobError, Result};
use crate::graph::{AdAccount, AdInsight, AdsApi, ReportState};

/// Run an insights report for one account and day and return its rows
///
/// # Errors
/// - [`ReportJobError::Failed`] when the vendor fails or skips the job
/// - [`ReportJobError::TimedOut`] when the job does not complete within `job_timeout`
/// - [`Error::Cancelled`] when `cancel` fires while waiting
/// - any error of the underlying API calls
pub async fn run_insights_report(
    api: &dyn AdsApi,
    account: &AdAccount,
    date: NaiveDate,
    config: &ReportConfig,
    cancel: &CancellationToken,
) -> Result<Vec<AdInsight>> {
    let report_run_id = api.start_insights_report(account, date).await?;
    let started = Instant::now();

    loop {
        let run = api.report_status(&report_run_id).await?;

        match run.state() {
            ReportState::Completed => break,
            ReportState::Failed => {
                return Err(ReportJobError::Failed {
                    report_run_id,
                    status: run.async_status,
                }
                .into());
            }
            ReportState::Running => {
                tracing::trace!(
                    report_run_id = %report_run_id,
                    status = %run.async_status,
                    percent = run.async_percent_completion,
                    "Report still running"
                );
            }
        }

        let waited = started.elapsed();
        if waited >= config.job_timeout {
            return Err(ReportJobError::TimedOut {
                report_run_id,
                waited,
            }
            .into());
        }

        tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            _ = tokio::time::sleep(config.poll_interval) => {}
        }
    }

    let rows = api.report_results(&report_run_id).await?;
    tracing::debug!(
        account_id = %account.account_id,
        date = %date,
        report_run_id = %report_run_id,
        rows = rows.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Report completed"
    );
    Ok(rows)
}
