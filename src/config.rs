//! Configuration types for facebook-ads-downloader

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::utils::strip_account_prefix;

/// Graph API access configuration
///
/// The app id and secret come from the app's settings in Facebook for Developers
/// (`https://developers.facebook.com/apps/<APP_ID>/settings/`). The access token
/// belongs to a system user with the `read_insights` and `ads_read` permissions.
#[derive(Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// App id of the Facebook app
    #[serde(default)]
    pub app_id: String,

    /// App secret, used to sign every request with an `appsecret_proof`
    #[serde(default)]
    pub app_secret: String,

    /// Access token of the system user
    #[serde(default)]
    pub access_token: String,

    /// Graph API version (default: "v19.0")
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Graph API base URL (default: "https://graph.facebook.com")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Node whose ad accounts are downloaded (default: "me", the token's system user)
    #[serde(default = "default_account_id")]
    pub account_id: String,

    /// Business manager whose owned and client ad accounts are downloaded.
    /// Takes precedence over `account_id` when set.
    #[serde(default)]
    pub business_manager_id: Option<String>,

    /// Number of objects requested per page (default: 1000)
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Timeout of a single HTTP request (default: 120 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            app_secret: String::new(),
            access_token: String::new(),
            api_version: default_api_version(),
            base_url: default_base_url(),
            account_id: default_account_id(),
            business_manager_id: None,
            page_size: default_page_size(),
            request_timeout: default_request_timeout(),
        }
    }
}

// Credentials never end up in logs.
impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("app_id", &self.app_id)
            .field("app_secret", &"<redacted>")
            .field("access_token", &"<redacted>")
            .field("api_version", &self.api_version)
            .field("base_url", &self.base_url)
            .field("account_id", &self.account_id)
            .field("business_manager_id", &self.business_manager_id)
            .field("page_size", &self.page_size)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// What to download and where to write it
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// The directory where result data is written to (default: "/tmp/facebook_ads")
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// The first day for which data is downloaded (default: 2015-01-01)
    ///
    /// Accounts created later start at their creation date instead.
    #[serde(default = "default_first_date")]
    pub first_date: NaiveDate,

    /// The number of days for which the performance data will be redownloaded (default: 28)
    #[serde(default = "default_redownload_window")]
    pub redownload_window: u32,

    /// Account ids (without the `act_` prefix) to restrict the download to.
    /// `None` downloads every accessible account.
    #[serde(default)]
    pub target_accounts: Option<Vec<String>>,

    /// Maximum number of report jobs running at the same time (default: 10)
    #[serde(default = "default_threads")]
    pub number_of_ad_performance_threads: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            first_date: default_first_date(),
            redownload_window: default_redownload_window(),
            target_accounts: None,
            number_of_ad_performance_threads: default_threads(),
        }
    }
}

/// Asynchronous insights report polling
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Delay between two status requests of a running job (default: 5 seconds)
    #[serde(default = "default_poll_interval", with = "duration_serde")]
    pub poll_interval: Duration,

    /// Give up on a job that has not completed after this long (default: 30 minutes)
    #[serde(default = "default_job_timeout", with = "duration_serde")]
    pub job_timeout: Duration,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            job_timeout: default_job_timeout(),
        }
    }
}

/// Retry configuration for transient vendor failures
///
/// The defaults follow the vendor's rate limiting guidance: wait a minute,
/// then double the wait for every further attempt.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 7)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 60 seconds)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 3840 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: false)
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: false,
        }
    }
}

/// Main configuration for FacebookDownloader
///
/// Serialized as JSON with one object per section:
///
/// ```json
/// {
///   "api": { "app_id": "1234567890", "app_secret": "...", "access_token": "..." },
///   "download": { "data_dir": "/data/facebook", "redownload_window": 28 },
///   "report": { "poll_interval": 5 },
///   "retry": { "max_attempts": 7 }
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Graph API access
    #[serde(default)]
    pub api: ApiConfig,

    /// Download scope and output location
    #[serde(default)]
    pub download: DownloadConfig,

    /// Report job polling
    #[serde(default)]
    pub report: ReportConfig,

    /// Retry behavior
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Config {
    /// Load a configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read config file {}: {}", path.display(), e),
            key: None,
        })?;
        serde_json::from_str(&content).map_err(|e| Error::Config {
            message: format!("failed to parse config file {}: {}", path.display(), e),
            key: None,
        })
    }

    /// Check that the configuration can be used for a download run
    pub fn validate(&self) -> Result<()> {
        if self.api.access_token.trim().is_empty() {
            return Err(Error::config("access_token", "access token must be set"));
        }
        if self.api.app_secret.trim().is_empty() {
            return Err(Error::config("app_secret", "app secret must be set"));
        }
        if self.api.page_size == 0 {
            return Err(Error::config("page_size", "page size must be positive"));
        }
        if url::Url::parse(&self.api.base_url).is_err() {
            return Err(Error::config(
                "base_url",
                format!("'{}' is not a valid URL", self.api.base_url),
            ));
        }
        if self.download.number_of_ad_performance_threads == 0 {
            return Err(Error::config(
                "number_of_ad_performance_threads",
                "at least one thread is required",
            ));
        }
        if self.report.poll_interval.is_zero() {
            return Err(Error::config(
                "poll_interval",
                "poll interval must be positive",
            ));
        }
        if matches!(&self.download.target_accounts, Some(targets) if targets.is_empty()) {
            return Err(Error::config(
                "target_accounts",
                "target account list is empty, omit it to download all accounts",
            ));
        }
        Ok(())
    }

    /// Whether an account (id without `act_` prefix) is selected by `target_accounts`
    pub fn is_target_account(&self, account_id: &str) -> bool {
        match &self.download.target_accounts {
            None => true,
            Some(targets) => targets
                .iter()
                .any(|t| strip_account_prefix(t) == strip_account_prefix(account_id)),
        }
    }
}

fn default_api_version() -> String {
    "v19.0".to_string()
}

fn default_base_url() -> String {
    "https://graph.facebook.com".to_string()
}

fn default_account_id() -> String {
    "me".to_string()
}

fn default_page_size() -> u32 {
    1000
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("/tmp/facebook_ads")
}

fn default_first_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2015, 1, 1).unwrap_or_default()
}

fn default_redownload_window() -> u32 {
    28
}

fn default_threads() -> usize {
    10
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_job_timeout() -> Duration {
    Duration::from_secs(30 * 60)
}

fn default_max_attempts() -> u32 {
    7
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60 * 64)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
