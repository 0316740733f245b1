//! download-facebook-performance-data
//!
//! Downloads the account structure and daily ad performance of all accessible
//! ad accounts into SQLite files.
//!
//! Usage:
//!   download-facebook-performance-data --access-token TOKEN --app-secret SECRET --data-dir /data
//!
//! Every option can also be set through its `FACEBOOK_*` environment variable
//! or a `.env` file. Options that are not set keep the value of the `--config`
//! file, or the built-in default.

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use facebook_ads_downloader::{Config, Error, FacebookDownloader, run_until_signal};

#[derive(Parser, Debug)]
#[command(name = "download-facebook-performance-data")]
#[command(version)]
#[command(about = "Download Facebook Ads account structure and ad performance into SQLite files")]
struct Args {
    /// JSON configuration file, overridden by the options below
    #[arg(long, env = "FACEBOOK_CONFIG")]
    config: Option<PathBuf>,

    /// App id of the Facebook app
    #[arg(long, env = "FACEBOOK_APP_ID")]
    app_id: Option<String>,

    /// App secret of the Facebook app
    #[arg(long, env = "FACEBOOK_APP_SECRET", hide_env_values = true)]
    app_secret: Option<String>,

    /// Access token of a user with access to the ad accounts
    #[arg(long, env = "FACEBOOK_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Graph API version
    #[arg(long, env = "FACEBOOK_API_VERSION")]
    api_version: Option<String>,

    /// Directory for the output files
    #[arg(long, env = "FACEBOOK_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// First day to download (YYYY-MM-DD)
    #[arg(long, env = "FACEBOOK_FIRST_DATE")]
    first_date: Option<NaiveDate>,

    /// Days before yesterday that are always downloaded again
    #[arg(long, env = "FACEBOOK_REDOWNLOAD_WINDOW")]
    redownload_window: Option<u32>,

    /// Only download these ad accounts (comma separated, with or without act_ prefix)
    #[arg(long, env = "FACEBOOK_TARGET_ACCOUNTS", value_delimiter = ',')]
    target_accounts: Option<Vec<String>>,

    /// Number of days downloaded at the same time
    #[arg(long, env = "FACEBOOK_NUMBER_OF_AD_PERFORMANCE_THREADS")]
    number_of_ad_performance_threads: Option<usize>,

    /// Download the ad accounts of this business manager instead of the token's user
    #[arg(long, env = "FACEBOOK_BUSINESS_MANAGER_ID")]
    business_manager_id: Option<String>,
}

impl Args {
    /// Load the config file (if any) and apply the options on top
    fn into_config(self) -> Result<Config, Error> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Some(app_id) = self.app_id {
            config.api.app_id = app_id;
        }
        if let Some(app_secret) = self.app_secret {
            config.api.app_secret = app_secret;
        }
        if let Some(access_token) = self.access_token {
            config.api.access_token = access_token;
        }
        if let Some(api_version) = self.api_version {
            config.api.api_version = api_version;
        }
        if let Some(business_manager_id) = self.business_manager_id {
            config.api.business_manager_id = Some(business_manager_id);
        }
        if let Some(data_dir) = self.data_dir {
            config.download.data_dir = data_dir;
        }
        if let Some(first_date) = self.first_date {
            config.download.first_date = first_date;
        }
        if let Some(redownload_window) = self.redownload_window {
            config.download.redownload_window = redownload_window;
        }
        if let Some(targets) = self.target_accounts {
            let targets: Vec<String> = targets
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
            config.download.target_accounts = Some(targets);
        }
        if let Some(threads) = self.number_of_ad_performance_threads {
            config.download.number_of_ad_performance_threads = threads;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = match args.into_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::from(2);
        }
    };

    tracing::info!(
        data_dir = %config.download.data_dir.display(),
        first_date = %config.download.first_date,
        redownload_window = config.download.redownload_window,
        threads = config.download.number_of_ad_performance_threads,
        "Starting download"
    );

    let downloader = match FacebookDownloader::new(config) {
        Ok(downloader) => downloader,
        Err(e) => {
            tracing::error!(error = %e, "Could not create downloader");
            return ExitCode::FAILURE;
        }
    };

    match run_until_signal(&downloader).await {
        Ok(summary) => {
            tracing::info!(
                days_downloaded = summary.days_downloaded,
                rows = summary.rows,
                "Done"
            );
            ExitCode::SUCCESS
        }
        Err(Error::Cancelled) => {
            tracing::warn!("Download cancelled");
            ExitCode::from(130)
        }
        Err(e) => {
            tracing::error!(error = %e, "Download failed");
            ExitCode::FAILURE
        }
    }
}
