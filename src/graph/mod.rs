//! Facebook Marketing (Graph) API access.
//!
//! - [`types`] - Response objects (accounts, campaigns, ad sets, ads, insights, report runs)
//! - [`client`] - reqwest based [`GraphClient`]
//!
//! The downloader talks to the vendor only through the [`AdsApi`] trait, so the
//! orchestration can be exercised against an in-memory implementation.

mod client;
pub mod types;


pub use client::GraphClient;
pub use types::{Ad, AdAccount, AdInsight, AdLabel, AdSet, Campaign, ReportRun, ReportState};

use crate::error::Result;
use chrono::NaiveDate;

/// Statuses of campaigns, ad sets and ads that are part of the account structure
pub const STRUCTURE_STATUSES: &[&str] = &["ACTIVE", "PAUSED", "ARCHIVED"];

/// Ad statuses included in insights reports
///
/// By default only active ads are reported, which would drop the history of
/// everything that was paused or archived since.
pub const INSIGHTS_AD_STATUSES: &[&str] = &[
    "ACTIVE",
    "PAUSED",
    "PENDING_REVIEW",
    "DISAPPROVED",
    "PREAPPROVED",
    "PENDING_BILLING_INFO",
    "CAMPAIGN_PAUSED",
    "ARCHIVED",
    "ADSET_PAUSED",
];

/// Fields requested for every insights row
pub const INSIGHTS_FIELDS: &[&str] = &[
    "date_start",
    "ad_id",
    "impressions",
    "actions",
    "spend",
    "action_values",
];

/// Breakdowns of insights rows: device and placement
pub const INSIGHTS_BREAKDOWNS: &[&str] = &["impression_device", "publisher_platform"];

/// Vendor operations needed to download structure and performance data
#[async_trait::async_trait]
pub trait AdsApi: Send + Sync {
    /// List the ad accounts accessible with the configured credentials
    async fn ad_accounts(&self) -> Result<Vec<AdAccount>>;

    /// List the campaigns of an account
    async fn campaigns(&self, account: &AdAccount) -> Result<Vec<Campaign>>;

    /// List the ad sets of an account
    async fn ad_sets(&self, account: &AdAccount) -> Result<Vec<AdSet>>;

    /// List the ads of an account
    async fn ads(&self, account: &AdAccount) -> Result<Vec<Ad>>;

    /// Submit an asynchronous ad level insights report for a single day,
    /// returning the report run id
    async fn start_insights_report(&self, account: &AdAccount, date: NaiveDate)
    -> Result<String>;

    /// Fetch the status of a report run
    async fn report_status(&self, report_run_id: &str) -> Result<ReportRun>;

    /// Fetch all result rows of a completed report run
    async fn report_results(&self, report_run_id: &str) -> Result<Vec<AdInsight>>;
}
