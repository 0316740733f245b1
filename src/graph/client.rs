//! reqwest based Graph API client.

use chrono::NaiveDate;
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use sha2::Sha256;
use url::Url;

use crate::config::ApiConfig;
use crate::error::{Error, GraphErrorEnvelope, Result};

use super::types::{Page, ReportRunCreated};
use super::{
    AdsApi, INSIGHTS_AD_STATUSES, INSIGHTS_BREAKDOWNS, INSIGHTS_FIELDS, STRUCTURE_STATUSES,
};
use super::{Ad, AdAccount, AdInsight, AdSet, Campaign, ReportRun};

/// Fields requested for ad accounts
const AD_ACCOUNT_FIELDS: &str = "account_id,name,created_time,timezone_offset_hours_utc";

/// Upper bound for pages followed on a single edge, guards against paging loops
const MAX_PAGES: usize = 10_000;

/// Longest error body kept in [`Error::Http`]
const MAX_ERROR_BODY: usize = 512;

/// Graph API client
///
/// Every request is authenticated with the access token and an `appsecret_proof`.
/// List edges are followed through `paging.next` until exhausted.
pub struct GraphClient {
    http: reqwest::Client,
    /// `{base_url}/{api_version}/`
    base: Url,
    access_token: String,
    appsecret_proof: String,
    page_size: u32,
    account_id: String,
    business_manager_id: Option<String>,
}

impl GraphClient {
    /// Create a client from the API configuration
    ///
    /// # Errors
    /// Returns a configuration error if the base URL is invalid, or an error if
    /// the HTTP client cannot be created.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let base = format!(
            "{}/{}/",
            config.base_url.trim_end_matches('/'),
            config.api_version.trim_matches('/')
        );
        let base = Url::parse(&base)
            .map_err(|e| Error::config("base_url", format!("invalid base URL '{base}': {e}")))?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("facebook-ads-downloader/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base,
            access_token: config.access_token.clone(),
            appsecret_proof: appsecret_proof(&config.app_secret, &config.access_token)?,
            page_size: config.page_size,
            account_id: config.account_id.clone(),
            business_manager_id: config.business_manager_id.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| Error::Other(format!("invalid Graph API path '{}': {}", path, e)))
    }

    /// Add credentials to a URL unless it already carries them (vendor `next` links do)
    fn authorize(&self, url: &mut Url) {
        let has_token = url.query_pairs().any(|(k, _)| k == "access_token");
        let has_proof = url.query_pairs().any(|(k, _)| k == "appsecret_proof");
        if has_token && has_proof {
            return;
        }
        let mut pairs = url.query_pairs_mut();
        if !has_token {
            pairs.append_pair("access_token", &self.access_token);
        }
        if !has_proof {
            pairs.append_pair("appsecret_proof", &self.appsecret_proof);
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, mut url: Url) -> Result<T> {
        self.authorize(&mut url);
        let response = self.http.get(url).send().await?;
        decode(response).await
    }

    /// Fetch every object of a list edge, following the pagination cursors
    async fn get_all<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let mut url = self.endpoint(path)?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
            pairs.append_pair("limit", &self.page_size.to_string());
        }

        let mut items = Vec::new();
        let mut next = Some(url);
        let mut pages = 0;

        while let Some(url) = next.take() {
            pages += 1;
            if pages > MAX_PAGES {
                return Err(Error::InvalidResponse(format!(
                    "more than {} pages returned for {}",
                    MAX_PAGES, path
                )));
            }

            let page: Page<T> = self.get_json(url).await?;
            items.extend(page.data);

            next = match page.paging.and_then(|p| p.next) {
                Some(link) => Some(Url::parse(&link).map_err(|e| {
                    Error::InvalidResponse(format!("invalid paging link '{}': {}", link, e))
                })?),
                None => None,
            };
        }

        tracing::debug!(path, pages, items = items.len(), "Fetched list edge");
        Ok(items)
    }

    fn structure_params(fields: &str) -> Vec<(&'static str, String)> {
        vec![
            ("fields", fields.to_string()),
            ("effective_status", json!(STRUCTURE_STATUSES).to_string()),
        ]
    }
}

#[async_trait::async_trait]
impl AdsApi for GraphClient {
    async fn ad_accounts(&self) -> Result<Vec<AdAccount>> {
        let params = [("fields", AD_ACCOUNT_FIELDS.to_string())];

        let Some(business_id) = &self.business_manager_id else {
            return self
                .get_all(&format!("{}/adaccounts", self.account_id), &params)
                .await;
        };

        let mut accounts: Vec<AdAccount> = self
            .get_all(&format!("{}/owned_ad_accounts", business_id), &params)
            .await?;
        let client_accounts: Vec<AdAccount> = self
            .get_all(&format!("{}/client_ad_accounts", business_id), &params)
            .await?;

        for account in client_accounts {
            if !accounts.iter().any(|a| a.account_id == account.account_id) {
                accounts.push(account);
            }
        }
        Ok(accounts)
    }

    async fn campaigns(&self, account: &AdAccount) -> Result<Vec<Campaign>> {
        self.get_all(
            &format!("{}/campaigns", account.node_id()),
            &Self::structure_params("id,name,adlabels"),
        )
        .await
    }

    async fn ad_sets(&self, account: &AdAccount) -> Result<Vec<AdSet>> {
        self.get_all(
            &format!("{}/adsets", account.node_id()),
            &Self::structure_params("id,name,campaign_id,adlabels"),
        )
        .await
    }

    async fn ads(&self, account: &AdAccount) -> Result<Vec<Ad>> {
        self.get_all(
            &format!("{}/ads", account.node_id()),
            &Self::structure_params("id,name,adset_id,adlabels"),
        )
        .await
    }

    async fn start_insights_report(
        &self,
        account: &AdAccount,
        date: NaiveDate,
    ) -> Result<String> {
        let day = date.format("%Y-%m-%d").to_string();
        let form = insights_report_params(&day, self.page_size);

        let mut url = self.endpoint(&format!("{}/insights", account.node_id()))?;
        self.authorize(&mut url);

        let response = self.http.post(url).form(&form).send().await?;
        let created: ReportRunCreated = decode(response).await?;

        tracing::debug!(
            account_id = %account.account_id,
            date = %day,
            report_run_id = %created.report_run_id,
            "Submitted insights report"
        );
        Ok(created.report_run_id)
    }

    async fn report_status(&self, report_run_id: &str) -> Result<ReportRun> {
        let mut url = self.endpoint(report_run_id)?;
        url.query_pairs_mut()
            .append_pair("fields", "id,async_status,async_percent_completion");
        self.get_json(url).await
    }

    async fn report_results(&self, report_run_id: &str) -> Result<Vec<AdInsight>> {
        self.get_all(&format!("{}/insights", report_run_id), &[])
            .await
    }
}

/// Form parameters of an ad level insights report for a single day
fn insights_report_params(day: &str, page_size: u32) -> Vec<(&'static str, String)> {
    vec![
        ("level", "ad".to_string()),
        ("fields", INSIGHTS_FIELDS.join(",")),
        ("breakdowns", json!(INSIGHTS_BREAKDOWNS).to_string()),
        ("action_breakdowns", json!(["action_type"]).to_string()),
        ("action_attribution_windows", json!(["28d_click"]).to_string()),
        (
            "time_range",
            json!({ "since": day, "until": day }).to_string(),
        ),
        (
            "filtering",
            json!([{
                "field": "ad.effective_status",
                "operator": "IN",
                "value": INSIGHTS_AD_STATUSES,
            }])
            .to_string(),
        ),
        ("limit", page_size.to_string()),
    ]
}

/// Hex encoded HMAC-SHA256 of the access token, keyed with the app secret
pub(crate) fn appsecret_proof(app_secret: &str, access_token: &str) -> Result<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(app_secret.as_bytes())
        .map_err(|e| Error::config("app_secret", e.to_string()))?;
    mac.update(access_token.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Decode a Graph API response, mapping error envelopes to [`Error::Api`]
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let body = response.text().await?;

    let value: Value = match serde_json::from_str(&body) {
        Ok(value) => value,
        Err(e) if status.is_success() => return Err(Error::Serialization(e)),
        Err(_) => {
            return Err(Error::Http {
                status: status.as_u16(),
                body: truncate(body),
            });
        }
    };

    if value.get("error").is_some() {
        let envelope: GraphErrorEnvelope = serde_json::from_value(value)?;
        return Err(Error::Api(envelope.error));
    }

    if !status.is_success() {
        return Err(Error::Http {
            status: status.as_u16(),
            body: truncate(body),
        });
    }

    serde_json::from_value(value).map_err(|e| Error::InvalidResponse(e.to_string()))
}

fn truncate(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
    }
    body
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_appsecret_proof_is_hmac_sha256_hex() {
        // Well-known HMAC-SHA256 test vector
        let proof = appsecret_proof("key", "The quick brown fox jumps over the lazy dog").unwrap();
        assert_eq!(
            proof,
            "f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8"
        );
    }

    #[test]
    fn test_insights_params_cover_single_day() {
        let params = insights_report_params("2024-03-05", 500);
        let get = |key: &str| {
            params
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.clone())
                .unwrap()
        };

        assert_eq!(get("level"), "ad");
        assert_eq!(
            get("time_range"),
            r#"{"since":"2024-03-05","until":"2024-03-05"}"#
        );
        assert_eq!(get("breakdowns"), r#"["impression_device","publisher_platform"]"#);
        assert_eq!(get("limit"), "500");
        assert!(get("filtering").contains("ADSET_PAUSED"));
        assert!(get("fields").starts_with("date_start,ad_id"));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let body = "é".repeat(MAX_ERROR_BODY);
        let truncated = truncate(body);
        assert!(truncated.len() <= MAX_ERROR_BODY);
        assert!(truncated.chars().all(|c| c == 'é'));
    }
}
