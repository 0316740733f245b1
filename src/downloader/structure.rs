//! Account structure: one row per ad with its ad set, campaign, account and labels.

use std::collections::HashMap;

use super::FacebookDownloader;
use crate::db::{AccountStructureRow, StructureDb};
use crate::error::{Error, Result};
use crate::graph::{Ad, AdAccount, AdSet, Campaign};
use crate::labels::parse_labels;
use crate::retry::download_with_retry;
use crate::types::Event;
use crate::utils::account_structure_path;

impl FacebookDownloader {
    /// Rebuild the account structure file for `accounts`
    ///
    /// The file only replaces the previous one once every account was written.
    /// Returns the number of ads written.
    pub async fn download_account_structure(&self, accounts: &[AdAccount]) -> Result<usize> {
        let path = account_structure_path(&self.config.download.data_dir);
        let db = StructureDb::create(&path).await?;

        let mut ads = 0;
        for account in accounts {
            match self.write_account_structure(&db, account).await {
                Ok(written) => ads += written,
                Err(e) => {
                    db.abandon().await;
                    return Err(e);
                }
            }
        }

        let path = db.finish().await?;
        tracing::info!(path = %path.display(), ads, "Account structure written");
        self.emit_event(Event::StructureWritten { path, ads });

        Ok(ads)
    }

    async fn write_account_structure(
        &self,
        db: &StructureDb,
        account: &AdAccount,
    ) -> Result<usize> {
        let retry = &self.config.retry;

        let campaigns = self
            .cancellable(download_with_retry(retry, || self.api.campaigns(account)))
            .await?;
        let ad_sets = self
            .cancellable(download_with_retry(retry, || self.api.ad_sets(account)))
            .await?;
        let ads = self
            .cancellable(download_with_retry(retry, || self.api.ads(account)))
            .await?;

        let rows = structure_rows(account, &campaigns, &ad_sets, &ads)?;
        let written = db.insert(&rows).await?;

        tracing::debug!(
            account_id = %account.account_id,
            campaigns = campaigns.len(),
            ad_sets = ad_sets.len(),
            ads = written,
            "Account structure downloaded"
        );

        Ok(written)
    }
}

/// Join ads with their ad set and campaign
///
/// Label attributes are merged campaign first, then ad set, then ad, so the most
/// specific level wins. Ads whose ad set or campaign is missing are skipped.
pub(crate) fn structure_rows(
    account: &AdAccount,
    campaigns: &[Campaign],
    ad_sets: &[AdSet],
    ads: &[Ad],
) -> Result<Vec<AccountStructureRow>> {
    let campaigns: HashMap<&str, &Campaign> =
        campaigns.iter().map(|c| (c.id.as_str(), c)).collect();
    let ad_sets: HashMap<&str, &AdSet> = ad_sets.iter().map(|s| (s.id.as_str(), s)).collect();
    let account_id = parse_id("account", &account.account_id)?;

    let mut rows = Vec::with_capacity(ads.len());
    for ad in ads {
        let Some(ad_set) = ad_sets.get(ad.adset_id.as_str()) else {
            tracing::warn!(
                account_id = %account.account_id,
                ad_id = %ad.id,
                ad_set_id = %ad.adset_id,
                "Ad set of ad not found, skipping ad"
            );
            continue;
        };
        let Some(campaign) = campaigns.get(ad_set.campaign_id.as_str()) else {
            tracing::warn!(
                account_id = %account.account_id,
                ad_id = %ad.id,
                campaign_id = %ad_set.campaign_id,
                "Campaign of ad not found, skipping ad"
            );
            continue;
        };

        let mut attributes = parse_labels(&campaign.adlabels);
        attributes.extend(parse_labels(&ad_set.adlabels));
        attributes.extend(parse_labels(&ad.adlabels));

        rows.push(AccountStructureRow {
            ad_id: parse_id("ad", &ad.id)?,
            ad: ad.name.clone(),
            ad_set_id: parse_id("ad set", &ad_set.id)?,
            ad_set: ad_set.name.clone(),
            campaign_id: parse_id("campaign", &campaign.id)?,
            campaign: campaign.name.clone(),
            account_id,
            account: account.name.clone(),
            attributes: serde_json::to_string(&attributes)?,
        });
    }

    Ok(rows)
}

/// Parse a numeric Graph API object id
pub(crate) fn parse_id(kind: &str, id: &str) -> Result<i64> {
    id.trim()
        .parse()
        .map_err(|_| Error::InvalidResponse(format!("Invalid {} id: {:?}", kind, id)))
}
