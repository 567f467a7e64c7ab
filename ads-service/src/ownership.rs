use std::collections::{HashMap, HashSet};

use serde_json::json;

use adflow_shared::error::Result;
use adflow_shared::fb::AdsGateway;
use adflow_shared::models::{id_string, keys, Attributes};
use adflow_shared::store::KvStore;

/// campaign id -> set of creative ids currently attached to it.
pub type OwnershipTree = HashMap<String, HashSet<String>>;

/// Walks every campaign of the account and unions the creative ids of up to
/// 100 of its remote ads. A campaign whose ad listing fails is logged and
/// skipped; the rest of the account still contributes.
///
/// Recomputed from scratch per import unless the caller passes a tree in —
/// memoization is caller-managed.
pub async fn build_campaign_ownership_tree<S>(
    store: &S,
    gateway: &dyn AdsGateway,
    fb_account_id: &str,
) -> Result<OwnershipTree>
where
    S: KvStore,
{
    let mut tree: OwnershipTree = HashMap::new();

    let mut filter = Attributes::new();
    filter.insert("fb_account_id".to_string(), json!(fb_account_id));
    let campaigns = store.query(keys::CAMPAIGN, &filter).await?;

    for row in campaigns {
        let Some(campaign_id) = row.get("campaign_id").and_then(id_string) else {
            continue;
        };

        let ads = match gateway
            .get_edge(&campaign_id, "ads", &["creative"], Some(100))
            .await
        {
            Ok(ads) => ads,
            Err(err) => {
                tracing::error!(
                    "Skipping campaign {} in ownership tree: {}",
                    campaign_id,
                    err
                );
                continue;
            }
        };

        let creatives = tree.entry(campaign_id).or_default();
        for ad in ads {
            if let Some(creative_id) = ad.get("creative").and_then(|c| id_string(&c["id"])) {
                creatives.insert(creative_id);
            }
        }
    }

    Ok(tree)
}
