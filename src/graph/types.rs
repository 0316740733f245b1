//! Graph API response objects

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An ad account as returned by the `adaccounts` edges
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdAccount {
    /// Numeric account id, without the `act_` prefix
    pub account_id: String,

    /// Account name
    #[serde(default)]
    pub name: String,

    /// Creation time, e.g. "2016-05-12T10:21:33-0700"
    #[serde(default)]
    pub created_time: Option<String>,

    /// UTC offset of the account's timezone in hours (may be fractional)
    #[serde(default)]
    pub timezone_offset_hours_utc: f64,
}

impl AdAccount {
    /// The Graph node id of the account (`act_<account_id>`)
    pub fn node_id(&self) -> String {
        format!("act_{}", self.account_id)
    }
}

/// A label attached to a campaign, ad set or ad
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdLabel {
    /// Label id
    #[serde(default)]
    pub id: String,

    /// Label name, `{key=value}` for labels that carry an attribute
    pub name: String,
}

/// A campaign
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    /// Campaign id
    pub id: String,
    /// Campaign name
    #[serde(default)]
    pub name: String,
    /// Labels
    #[serde(default)]
    pub adlabels: Vec<AdLabel>,
}

/// An ad set
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdSet {
    /// Ad set id
    pub id: String,
    /// Ad set name
    #[serde(default)]
    pub name: String,
    /// Campaign the ad set belongs to
    pub campaign_id: String,
    /// Labels
    #[serde(default)]
    pub adlabels: Vec<AdLabel>,
}

/// An ad
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ad {
    /// Ad id
    pub id: String,
    /// Ad name
    #[serde(default)]
    pub name: String,
    /// Ad set the ad belongs to
    pub adset_id: String,
    /// Labels
    #[serde(default)]
    pub adlabels: Vec<AdLabel>,
}

/// One insights row at ad level, broken down by device and placement
///
/// The Graph API encodes all metrics as strings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdInsight {
    /// The reported day, "YYYY-MM-DD"
    pub date_start: String,

    /// Ad id
    pub ad_id: String,

    /// Number of impressions
    #[serde(default)]
    pub impressions: Option<String>,

    /// Amount spent in account currency
    #[serde(default)]
    pub spend: Option<String>,

    /// Actions per action type
    #[serde(default)]
    pub actions: Option<Vec<Map<String, Value>>>,

    /// Action values per action type
    #[serde(default)]
    pub action_values: Option<Vec<Map<String, Value>>>,

    /// Device breakdown
    #[serde(default)]
    pub impression_device: String,

    /// Placement breakdown
    #[serde(default)]
    pub publisher_platform: String,
}

/// Response of submitting an asynchronous insights report
#[derive(Clone, Debug, Deserialize)]
pub struct ReportRunCreated {
    /// Id of the created report run
    pub report_run_id: String,
}

/// Status of an asynchronous insights report
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ReportRun {
    /// Report run id
    pub id: String,

    /// "Job Not Started", "Job Started", "Job Running", "Job Completed",
    /// "Job Failed" or "Job Skipped"
    pub async_status: String,

    /// Percentage of the job that is done
    #[serde(default)]
    pub async_percent_completion: u32,
}

/// Coarse state of a report run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportState {
    /// Queued or running
    Running,
    /// Results are ready
    Completed,
    /// Failed or skipped by the vendor
    Failed,
}

impl ReportRun {
    /// Map the vendor status to a [`ReportState`]
    ///
    /// A job can report "Job Completed" before its completion reaches 100 percent;
    /// results are only complete once both hold.
    pub fn state(&self) -> ReportState {
        match self.async_status.as_str() {
            "Job Completed" if self.async_percent_completion >= 100 => ReportState::Completed,
            "Job Failed" | "Job Skipped" => ReportState::Failed,
            _ => ReportState::Running,
        }
    }
}

/// One page of a paginated edge
#[derive(Debug, Deserialize)]
pub(crate) struct Page<T> {
    pub(crate) data: Vec<T>,
    #[serde(default)]
    pub(crate) paging: Option<Paging>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Paging {
    #[serde(default)]
    pub(crate) next: Option<String>,
}
