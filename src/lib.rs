//! # facebook-ads-downloader
//!
//! Downloads the structure and daily ad performance of Facebook ad accounts into
//! SQLite files for downstream ETL.
//!
//! ## Output
//!
//! - `{data_dir}/facebook-account-structure_v1.sqlite3`: one row per ad with its
//!   ad set, campaign, account and label attributes, rebuilt on every run
//! - `{data_dir}/{YYYY}/{MM}/{DD}/facebook/ad-performance-act_{id}.sqlite3`: ad
//!   performance of one account and day, broken down by device and placement
//!
//! Days whose file exists are only downloaded again while they are within the
//! redownload window.
//!
//! ## Quick Start
//!
//! ```no_run
//! use facebook_ads_downloader::{Config, FacebookDownloader, run_until_signal};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.api.app_secret = "app-secret".to_string();
//!     config.api.access_token = "access-token".to_string();
//!
//!     let downloader = FacebookDownloader::new(config)?;
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let summary = run_until_signal(&downloader).await?;
//!     println!("{} days downloaded", summary.days_downloaded);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// SQLite output files
pub mod db;
/// Download orchestration
pub mod downloader;
/// Error types
pub mod error;
/// Graph API client
pub mod graph;
/// Ad label parsing
pub mod labels;
/// Asynchronous insights report jobs
pub mod report;
/// Retry logic with exponential backoff
pub mod retry;
/// Which days to download
pub mod schedule;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::{ApiConfig, Config, DownloadConfig, ReportConfig, RetryConfig};
pub use db::{AccountStructureRow, AdPerformanceRow, PerformanceDb, StructureDb};
pub use downloader::FacebookDownloader;
pub use error::{DatabaseError, Error, GraphApiError, ReportJobError, Result};
pub use graph::{AdsApi, GraphClient};
pub use types::{DownloadSummary, Event};

/// Run a complete download, cancelling it on a termination signal.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// Returns the result of [`FacebookDownloader::download_data`]; a run stopped by a
/// signal ends with [`Error::Cancelled`].
pub async fn run_until_signal(downloader: &FacebookDownloader) -> Result<DownloadSummary> {
    let run = downloader.download_data();
    tokio::pin!(run);

    tokio::select! {
        result = &mut run => return result,
        _ = wait_for_signal() => {
            tracing::warn!("Cancelling download, waiting for running jobs to stop");
            downloader.cancellation_token().cancel();
        }
    }

    run.await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
