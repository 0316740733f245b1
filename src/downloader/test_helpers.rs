//! Shared test helpers: an in-memory ads API and a fast test configuration.

use crate::config::{Config, ReportConfig, RetryConfig};
use crate::downloader::FacebookDownloader;
use crate::error::{Error, GraphApiError, Result};
use crate::graph::{Ad, AdAccount, AdInsight, AdLabel, AdSet, AdsApi, Campaign, ReportRun};
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// In-memory ads API
///
/// Every account shares the same campaigns, ad sets and ads. Each insights report
/// returns one row per ad for the requested day.
#[derive(Default)]
pub(crate) struct FakeAdsApi {
    pub(crate) accounts: Vec<AdAccount>,
    pub(crate) campaigns: Vec<Campaign>,
    pub(crate) ad_sets: Vec<AdSet>,
    pub(crate) ads: Vec<Ad>,
    /// Remaining failed report jobs per day (`u32::MAX` fails forever)
    pub(crate) failing_days: Mutex<HashMap<NaiveDate, u32>>,
    /// Error returned by `ad_accounts`
    pub(crate) accounts_error: Option<GraphApiError>,
    /// Error returned by `ads`
    pub(crate) ads_error: Option<GraphApiError>,
    /// How long submitting a report of a day takes
    submit_delays: Mutex<HashMap<NaiveDate, Duration>>,
    /// Report submissions currently running, and the most seen at once
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    /// Cancelled when report results are fetched
    cancel_on_results: Mutex<Option<CancellationToken>>,
    /// Report run id to (account id, day, fails)
    reports: Mutex<HashMap<String, (String, NaiveDate, bool)>>,
    /// Every submitted report as (account id, day)
    pub(crate) submitted: Mutex<Vec<(String, NaiveDate)>>,
}

impl FakeAdsApi {
    pub(crate) fn new() -> Self {
        Self {
            accounts: vec![account("42", "Shop")],
            campaigns: vec![Campaign {
                id: "300".into(),
                name: "Spring Sale".into(),
                adlabels: vec![label("{channel=social}"), label("{audience=new}")],
            }],
            ad_sets: vec![AdSet {
                id: "200".into(),
                name: "Retargeting".into(),
                campaign_id: "300".into(),
                adlabels: vec![label("{audience=returning}")],
            }],
            ads: vec![
                Ad {
                    id: "100".into(),
                    name: "Video".into(),
                    adset_id: "200".into(),
                    adlabels: vec![],
                },
                Ad {
                    id: "101".into(),
                    name: "Carousel".into(),
                    adset_id: "200".into(),
                    adlabels: vec![label("{format=carousel}")],
                },
            ],
            ..Default::default()
        }
    }

    /// Let report jobs of `day` fail `times` times
    pub(crate) fn fail_day(&self, day: NaiveDate, times: u32) {
        self.failing_days.lock().unwrap().insert(day, times);
    }

    /// Let report submissions of `day` take `delay`
    pub(crate) fn slow_down(&self, day: NaiveDate, delay: Duration) {
        self.submit_delays.lock().unwrap().insert(day, delay);
    }

    /// Cancel `token` as soon as any report results are fetched
    pub(crate) fn cancel_on_results(&self, token: CancellationToken) {
        *self.cancel_on_results.lock().unwrap() = Some(token);
    }

    /// Most report submissions that ran at the same time
    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Number of report jobs submitted for `day`
    pub(crate) fn submissions(&self, day: NaiveDate) -> usize {
        self.submitted
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, d)| *d == day)
            .count()
    }
}

#[async_trait::async_trait]
impl AdsApi for FakeAdsApi {
    async fn ad_accounts(&self) -> Result<Vec<AdAccount>> {
        match &self.accounts_error {
            Some(e) => Err(Error::Api(e.clone())),
            None => Ok(self.accounts.clone()),
        }
    }

    async fn campaigns(&self, _: &AdAccount) -> Result<Vec<Campaign>> {
        Ok(self.campaigns.clone())
    }

    async fn ad_sets(&self, _: &AdAccount) -> Result<Vec<AdSet>> {
        Ok(self.ad_sets.clone())
    }

    async fn ads(&self, _: &AdAccount) -> Result<Vec<Ad>> {
        match &self.ads_error {
            Some(e) => Err(Error::Api(e.clone())),
            None => Ok(self.ads.clone()),
        }
    }

    async fn start_insights_report(&self, account: &AdAccount, date: NaiveDate) -> Result<String> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        let delay = self.submit_delays.lock().unwrap().get(&date).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let fails = {
            let mut failing = self.failing_days.lock().unwrap();
            match failing.get_mut(&date) {
                Some(remaining) if *remaining > 0 => {
                    if *remaining != u32::MAX {
                        *remaining -= 1;
                    }
                    true
                }
                _ => false,
            }
        };

        let mut submitted = self.submitted.lock().unwrap();
        submitted.push((account.account_id.clone(), date));
        let id = format!("run-{}", submitted.len());

        self.reports
            .lock()
            .unwrap()
            .insert(id.clone(), (account.account_id.clone(), date, fails));
        Ok(id)
    }

    async fn report_status(&self, report_run_id: &str) -> Result<ReportRun> {
        let reports = self.reports.lock().unwrap();
        let (_, _, fails) = reports
            .get(report_run_id)
            .ok_or_else(|| Error::Other(format!("unknown report {}", report_run_id)))?;

        let (status, percent) = if *fails {
            ("Job Failed", 0)
        } else {
            ("Job Completed", 100)
        };
        Ok(ReportRun {
            id: report_run_id.to_string(),
            async_status: status.to_string(),
            async_percent_completion: percent,
        })
    }

    async fn report_results(&self, report_run_id: &str) -> Result<Vec<AdInsight>> {
        if let Some(token) = self.cancel_on_results.lock().unwrap().as_ref() {
            token.cancel();
        }

        let reports = self.reports.lock().unwrap();
        let (_, date, _) = reports
            .get(report_run_id)
            .ok_or_else(|| Error::Other(format!("unknown report {}", report_run_id)))?;

        Ok(self
            .ads
            .iter()
            .map(|ad| AdInsight {
                date_start: date.format("%Y-%m-%d").to_string(),
                ad_id: ad.id.clone(),
                impressions: Some("10".into()),
                spend: Some("1.5".into()),
                actions: None,
                action_values: None,
                impression_device: "desktop".into(),
                publisher_platform: "facebook".into(),
            })
            .collect())
    }
}

pub(crate) fn account(id: &str, name: &str) -> AdAccount {
    AdAccount {
        account_id: id.into(),
        name: name.into(),
        created_time: None,
        timezone_offset_hours_utc: 0.0,
    }
}

pub(crate) fn label(name: &str) -> AdLabel {
    AdLabel {
        id: String::new(),
        name: name.into(),
    }
}

/// Yesterday in UTC, the last day downloaded for the fake accounts
pub(crate) fn yesterday() -> NaiveDate {
    Utc::now().date_naive() - ChronoDuration::days(1)
}

/// Config writing into `dir` that covers the last three days with fast retries
pub(crate) fn test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.download.data_dir = dir.path().to_path_buf();
    config.download.first_date = yesterday() - ChronoDuration::days(2);
    config.download.redownload_window = 0;
    config.download.number_of_ad_performance_threads = 2;
    config.report = ReportConfig {
        poll_interval: Duration::from_millis(1),
        job_timeout: Duration::from_secs(5),
    };
    config.retry = RetryConfig {
        max_attempts: 2,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        backoff_multiplier: 2.0,
        jitter: false,
    };
    config
}

/// Downloader on top of `api` writing into a fresh temporary directory
pub(crate) fn create_test_downloader(api: Arc<FakeAdsApi>) -> (FacebookDownloader, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let downloader = FacebookDownloader::with_api(test_config(&dir), api);
    (downloader, dir)
}
