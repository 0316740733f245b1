//! Download orchestration split into focused submodules.
//!
//! The `FacebookDownloader` struct and its methods are organized by stage:
//! - [`structure`] - Account structure file (campaigns, ad sets, ads, labels)
//! - [`performance`] - Per-day ad performance with bounded concurrency

mod performance;
mod structure;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::graph::{AdAccount, AdsApi, GraphClient};
use crate::retry::download_with_retry;
use crate::types::{DownloadSummary, Event};

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct FacebookDownloader {
    /// Ads API (Graph API client in production, fakes in tests)
    pub(crate) api: Arc<dyn AdsApi>,
    /// Configuration (wrapped in Arc for sharing across day jobs)
    pub(crate) config: Arc<Config>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Stops pending and in-flight work
    pub(crate) cancel: CancellationToken,
}

impl FacebookDownloader {
    /// Create a downloader that talks to the Graph API
    ///
    /// Validates the configuration and builds the HTTP client.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let client = GraphClient::new(&config.api)?;
        Ok(Self::with_api(config, Arc::new(client)))
    }

    /// Create a downloader on top of any [`AdsApi`] implementation
    pub fn with_api(config: Config, api: Arc<dyn AdsApi>) -> Self {
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            api,
            config: Arc::new(config),
            event_tx,
            cancel: CancellationToken::new(),
        }
    }

    /// Subscribe to download events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events independently.
    /// A subscriber that falls behind by more than 1000 events receives `RecvError::Lagged`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use facebook_ads_downloader::{Config, FacebookDownloader};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let downloader = FacebookDownloader::new(Config::default())?;
    ///
    ///     let mut events = downloader.subscribe();
    ///     tokio::spawn(async move {
    ///         while let Ok(event) = events.recv().await {
    ///             tracing::info!(?event, "download event");
    ///         }
    ///     });
    ///
    ///     downloader.download_data().await?;
    ///     Ok(())
    /// }
    /// ```
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Token that cancels the current and any later run of this downloader
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Get the current configuration
    pub fn config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Emit an event to all subscribers
    ///
    /// If there are no active subscribers, the event is silently dropped.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Run a complete download: accounts, then account structure, then ad performance
    ///
    /// # Errors
    /// - any error while listing accounts or writing the structure file
    /// - [`Error::DownloadsFailed`] when at least one day failed after all retries
    /// - [`Error::Cancelled`] when the run was cancelled
    pub async fn download_data(&self) -> Result<DownloadSummary> {
        let started = Instant::now();

        let accounts = self.ad_accounts().await?;
        let ads = self.download_account_structure(&accounts).await?;
        let performance = self.download_ad_performance(&accounts).await?;

        let summary = DownloadSummary {
            accounts: accounts.len(),
            ads,
            elapsed: started.elapsed(),
            ..performance
        };

        tracing::info!(
            accounts = summary.accounts,
            ads = summary.ads,
            days_downloaded = summary.days_downloaded,
            days_skipped = summary.days_skipped,
            days_failed = summary.days_failed,
            rows = summary.rows,
            elapsed_secs = summary.elapsed.as_secs(),
            "Download finished"
        );

        if summary.days_failed > 0 {
            return Err(Error::DownloadsFailed {
                failed: summary.days_failed,
                total: summary.days_attempted(),
            });
        }

        Ok(summary)
    }

    /// All accessible ad accounts, filtered by the configured target accounts
    pub async fn ad_accounts(&self) -> Result<Vec<AdAccount>> {
        let accounts = self
            .cancellable(download_with_retry(&self.config.retry, || {
                self.api.ad_accounts()
            }))
            .await?;

        let total = accounts.len();
        let accounts: Vec<AdAccount> = accounts
            .into_iter()
            .filter(|account| self.config.is_target_account(&account.account_id))
            .collect();

        if let Some(targets) = &self.config.download.target_accounts {
            for target in targets {
                if !accounts
                    .iter()
                    .any(|a| crate::utils::strip_account_prefix(target) == a.account_id)
                {
                    tracing::warn!(account_id = %target, "Target account is not accessible");
                }
            }
        }

        tracing::info!(
            accessible = total,
            selected = accounts.len(),
            "Resolved ad accounts"
        );
        self.emit_event(Event::AccountsResolved {
            count: accounts.len(),
        });

        Ok(accounts)
    }

    /// Await `future` unless the downloader is cancelled first
    pub(crate) async fn cancellable<T>(
        &self,
        future: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            result = future => result,
        }
    }
}
