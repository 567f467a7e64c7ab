use serde_json::{json, Value};

use adflow_shared::error::{Result, ServiceError};
use adflow_shared::fb::{AdsGateway, RemoteObject};
use adflow_shared::models::{id_string, keys, Attributes, CampaignAdLink};
use adflow_shared::store::KvStore;

use crate::ownership::{build_campaign_ownership_tree, OwnershipTree};

const AD_IMPORT_FIELDS: [&str; 5] = ["name", "status", "created_time", "campaign_id", "creative"];
const PREVIEW_FORMAT: &str = "DESKTOP_FEED_STANDARD";

/// Imports one remote ad into the local mirror.
///
/// The canonical record is keyed by the ad's *creative* id — several remote
/// ads sharing one creative collapse to a single row, so re-importing is an
/// overwrite, never a duplicate. Besides the ad's own campaign, an
/// association is written for every other campaign whose creative set
/// already contains this creative (per the ownership tree).
///
/// No transactionality: a failure partway through leaves partial records; a
/// later re-import repairs them because every write is idempotent by
/// canonical id.
pub async fn import_ad<S>(
    store: &S,
    gateway: &dyn AdsGateway,
    fb_account_id: &str,
    ad: Option<RemoteObject>,
    ad_id: Option<&str>,
    tree: Option<OwnershipTree>,
) -> Result<String>
where
    S: KvStore,
{
    let ad = match ad {
        Some(ad) => ad,
        None => {
            let ad_id = ad_id
                .ok_or_else(|| ServiceError::Validation("ad_id".to_string()))?;
            gateway.get_object(ad_id, &AD_IMPORT_FIELDS).await?
        }
    };

    let canonical_id = ad
        .get("creative")
        .and_then(|c| id_string(&c["id"]))
        .ok_or_else(|| ServiceError::RemoteApi("Ad has no creative".to_string()))?;
    let campaign_id = ad
        .get("campaign_id")
        .and_then(id_string)
        .ok_or_else(|| ServiceError::RemoteApi("Ad has no campaign".to_string()))?;

    let preview = gateway
        .get_previews(&ad.id, PREVIEW_FORMAT)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ServiceError::RemoteApi("No ad preview available".to_string()))?;

    let is_enabled = ad.get_str("status") == Some("ACTIVE");

    let mut ad_record = Attributes::new();
    ad_record.insert("ad_id".to_string(), json!(canonical_id));
    ad_record.insert("fb_account_id".to_string(), json!(fb_account_id));
    ad_record.insert(
        "ad_name".to_string(),
        ad.get("name").cloned().unwrap_or(Value::Null),
    );
    ad_record.insert("enabled".to_string(), json!(is_enabled));
    ad_record.insert(
        "created_at".to_string(),
        ad.get("created_time").cloned().unwrap_or(Value::Null),
    );
    ad_record.insert("preview".to_string(), json!(preview));
    store.create(keys::ADS, &canonical_id, ad_record).await?;

    write_link(store, &campaign_id, &canonical_id).await?;

    let tree = match tree {
        Some(tree) => tree,
        None => build_campaign_ownership_tree(store, gateway, fb_account_id).await?,
    };

    for (other_campaign_id, creative_ids) in &tree {
        if other_campaign_id != &campaign_id && creative_ids.contains(&canonical_id) {
            tracing::info!("Also adding this ad to campaign {}", other_campaign_id);
            write_link(store, other_campaign_id, &canonical_id).await?;
        }
    }

    Ok(canonical_id)
}

async fn write_link<S>(store: &S, campaign_id: &str, ad_id: &str) -> Result<()>
where
    S: KvStore,
{
    let mut link = Attributes::new();
    link.insert("campaign_id".to_string(), json!(campaign_id));
    link.insert("ad_id".to_string(), json!(ad_id));
    store
        .create(
            keys::CAMPAIGN_AD,
            &CampaignAdLink::sort_key(campaign_id, ad_id),
            link,
        )
        .await
}
