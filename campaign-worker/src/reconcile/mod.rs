//! Campaign-update reconciliation.
//!
//! One update request touches three independently-failing resources: the
//! local campaign record, the remote campaign object, and every remote ad
//! set under the campaign. There is no cross-system transaction; consistency
//! comes from capturing originals up front and compensating, in reverse
//! order, whatever was applied before a failure. Compensation is best
//! effort: a failed revert is logged and never masks the original error.

use serde::Deserialize;
use serde_json::Value;

use adflow_shared::batch::BatchExecutor;
use adflow_shared::error::{Result, ServiceError};
use adflow_shared::fb::{AdsGateway, BatchRequest, GatewayFactory, RemoteObject};
use adflow_shared::models::{keys, Attributes};
use adflow_shared::store::{get_required, KvStore};

pub mod changes;

pub use changes::{collect_changes, ChangeSet, UpdateFields};

use changes::merge_objects;

/// Parameters carried by the queued `update_campaign` task.
#[derive(Deserialize, Clone, Debug)]
pub struct UpdateCampaignParams {
    pub user_id: String,
    pub fb_account_id: String,
    pub campaign_id: String,
    pub fields: UpdateFields,
}

/// Pre-change values of exactly the local attributes the update touches,
/// grouped the way `update_db_state` writes them. A key that had no prior
/// value holds null, so reverting removes it again.
#[derive(Clone, Debug)]
pub struct OriginalDbState {
    pub campaign: Attributes,
    pub expansion: Attributes,
    pub optimization: Attributes,
}

/// The rollback baseline for one update attempt.
pub struct Originals {
    pub db: OriginalDbState,
    pub campaign: RemoteObject,
    pub adsets: Vec<RemoteObject>,
}

pub fn capture_db_originals(row: &Attributes, changes: &ChangeSet) -> OriginalDbState {
    fn priors(row: &Attributes, group: &Attributes) -> Attributes {
        group
            .keys()
            .map(|k| (k.clone(), row.get(k).cloned().unwrap_or(Value::Null)))
            .collect()
    }

    OriginalDbState {
        campaign: priors(row, &changes.db_campaign),
        expansion: priors(row, &changes.db_expansion),
        optimization: priors(row, &changes.db_optimization),
    }
}

/// Writes the three local change groups. With `can_delete` (revert only),
/// null values REMOVE attributes — this is how expansion/optimization
/// sub-fields that did not exist before the attempt are cleaned up again.
/// Without it, nulls are dropped so an apply can never delete config.
pub async fn update_db_state(
    store: &dyn KvStore,
    campaign_id: &str,
    campaign_state: &Attributes,
    expansion_state: &Attributes,
    optimization_state: &Attributes,
    can_delete: bool,
) -> Result<()> {
    for group in [campaign_state, expansion_state, optimization_state] {
        let changes: Attributes = if can_delete {
            group.clone()
        } else {
            group
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        };
        if !changes.is_empty() {
            store.update(keys::CAMPAIGN, campaign_id, changes).await?;
        }
    }
    Ok(())
}

async fn revert_db_state(
    store: &dyn KvStore,
    campaign_id: &str,
    original: &OriginalDbState,
) -> Result<()> {
    update_db_state(
        store,
        campaign_id,
        &original.campaign,
        &original.expansion,
        &original.optimization,
        true,
    )
    .await
}

/// The update merged into one ad set's exported state. Two fields are
/// authoritative replacements, never merges: a partially-merged
/// `promoted_object` or exclusion list would leave inconsistent remote
/// state.
pub fn adset_update_params(adset: &RemoteObject, changes: &ChangeSet) -> Attributes {
    let mut updates = adset.export();
    merge_objects(&mut updates, &changes.adset_params());

    if let Some(promo) = changes.fb_adset.get("promoted_object") {
        if !promo.is_null() {
            updates.insert("promoted_object".to_string(), promo.clone());
        }
    }

    if let Some(exclusions) = changes.fb_targeting.get("excluded_custom_audiences") {
        let targeting = updates
            .entry("targeting".to_string())
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
        if let Value::Object(t) = targeting {
            t.insert("excluded_custom_audiences".to_string(), exclusions.clone());
        }
    }

    updates
}

/// Applies the ad-set change-set to every ad set, batched, failing on the
/// first rejected call. Returns how many updates were submitted.
pub async fn update_campaign_adsets(
    gateway: &dyn AdsGateway,
    adsets: &[RemoteObject],
    changes: &ChangeSet,
) -> Result<usize> {
    let mut batcher = BatchExecutor::new(true);
    for adset in adsets {
        batcher.push(BatchRequest::post(
            adset.id.clone(),
            adset_update_params(adset, changes),
        ));
    }
    let submitted = batcher.len();
    batcher.execute(gateway).await?;
    Ok(submitted)
}

async fn revert_campaign(gateway: &dyn AdsGateway, original: &RemoteObject) -> Result<()> {
    gateway.update_object(&original.id, &original.export()).await
}

async fn revert_adsets(gateway: &dyn AdsGateway, originals: &[RemoteObject]) -> Result<()> {
    if originals.is_empty() {
        return Ok(());
    }
    let mut batcher = BatchExecutor::new(false);
    for adset in originals {
        batcher.push(BatchRequest::post(adset.id.clone(), adset.export()));
    }
    batcher.execute(gateway).await?;
    Ok(())
}

/// One resource touched by the update. The saga walks these in order and
/// compensates the attempted prefix in reverse on failure; adding a fourth
/// resource means adding a variant, not re-threading the failure handling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Step {
    LocalStore,
    RemoteCampaign,
    RemoteAdsets,
}

impl Step {
    fn name(&self) -> &'static str {
        match self {
            Step::LocalStore => "database",
            Step::RemoteCampaign => "Facebook campaign",
            Step::RemoteAdsets => "Facebook adsets",
        }
    }

    fn has_changes(&self, changes: &ChangeSet) -> bool {
        match self {
            Step::LocalStore => changes.has_db_changes(),
            Step::RemoteCampaign => changes.has_campaign_changes(),
            Step::RemoteAdsets => changes.has_adset_changes(),
        }
    }

    async fn apply(&self, ctx: &UpdateContext<'_>) -> Result<()> {
        match self {
            Step::LocalStore => {
                tracing::info!("Found db changes, attempting DB update");
                update_db_state(
                    ctx.store,
                    ctx.campaign_id,
                    &ctx.changes.db_campaign,
                    &ctx.changes.db_expansion,
                    &ctx.changes.db_optimization,
                    false,
                )
                .await
                .map_err(|e| {
                    tracing::error!("{}", e);
                    ServiceError::Internal("Failed to update database".to_string())
                })
            }
            Step::RemoteCampaign => {
                tracing::info!("Found campaign obj changes, attempting FB object API update");
                ctx.gateway
                    .update_object(ctx.campaign_id, &ctx.changes.fb_campaign)
                    .await
                    .map_err(|e| remote_failure("Failed to update Facebook campaign", e))
            }
            Step::RemoteAdsets => {
                tracing::info!("Found adset changes, attempting FB object API update on each adset");
                update_campaign_adsets(ctx.gateway, &ctx.originals.adsets, ctx.changes)
                    .await
                    .map(|_| ())
                    .map_err(|e| remote_failure("Failed to update Facebook adsets", e))
            }
        }
    }

    async fn compensate(&self, ctx: &UpdateContext<'_>) -> Result<()> {
        match self {
            Step::LocalStore => revert_db_state(ctx.store, ctx.campaign_id, &ctx.originals.db).await,
            Step::RemoteCampaign => revert_campaign(ctx.gateway, &ctx.originals.campaign).await,
            Step::RemoteAdsets => revert_adsets(ctx.gateway, &ctx.originals.adsets).await,
        }
    }
}

fn remote_failure(prefix: &str, err: ServiceError) -> ServiceError {
    match err {
        ServiceError::RemoteApi(detail) => {
            ServiceError::RemoteApi(format!("{}: {}", prefix, detail))
        }
        other => {
            tracing::error!("{}", other);
            ServiceError::RemoteApi(prefix.to_string())
        }
    }
}

struct UpdateContext<'a> {
    store: &'a dyn KvStore,
    gateway: &'a dyn AdsGateway,
    campaign_id: &'a str,
    changes: &'a ChangeSet,
    originals: &'a Originals,
}

async fn run_update(ctx: &UpdateContext<'_>) -> Result<()> {
    let steps: Vec<Step> = [Step::LocalStore, Step::RemoteCampaign, Step::RemoteAdsets]
        .into_iter()
        .filter(|s| s.has_changes(ctx.changes))
        .collect();

    let mut attempted: Vec<Step> = Vec::new();
    for step in steps {
        attempted.push(step);
        if let Err(err) = step.apply(ctx).await {
            tracing::error!("Something went wrong: {}", err);
            // The failing step may have partially applied (batched ad-set
            // writes), so it is compensated along with the earlier steps.
            for done in attempted.iter().rev() {
                tracing::info!("Reverting {} changes", done.name());
                if let Err(revert_err) = done.compensate(ctx).await {
                    tracing::error!("Problem reverting {}: {}", done.name(), revert_err);
                }
            }
            return Err(err);
        }
    }
    Ok(())
}

/// Runs one campaign-update reconciliation end to end. Returns `true` on
/// success; on failure everything applied has been compensated (best
/// effort) and the original error is returned for the task record.
pub async fn update_campaign(
    store: &dyn KvStore,
    gateways: &dyn GatewayFactory,
    params: &UpdateCampaignParams,
) -> Result<bool> {
    tracing::info!(
        user_id = %params.user_id,
        fb_account_id = %params.fb_account_id,
        campaign_id = %params.campaign_id,
        "update_campaign"
    );

    let account_sk =
        adflow_shared::models::FbAccountRecord::sort_key(&params.fb_account_id, &params.user_id);
    let account = get_required(store, keys::FB_ACCOUNT, &account_sk).await?;
    let token = account
        .get("fb_access_token")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            ServiceError::NotFound(format!(
                "Access token for account {} not found",
                params.fb_account_id
            ))
        })?;
    let gateway = gateways.for_token(token);

    tracing::info!("Storing original state");
    let db_row = get_required(store, keys::CAMPAIGN, &params.campaign_id).await?;
    let original_campaign = gateway
        .get_object(&params.campaign_id, &["name", "objective", "daily_budget"])
        .await?;
    let original_adsets = gateway
        .get_edge(
            &params.campaign_id,
            "adsets",
            &["targeting", "user_os", "promoted_object"],
            None,
        )
        .await?;

    tracing::info!("Assembling changes");
    let changes = collect_changes(gateway.as_ref(), &params.fields, &original_adsets).await?;
    let originals = Originals {
        db: capture_db_originals(&db_row, &changes),
        campaign: original_campaign,
        adsets: original_adsets,
    };

    tracing::info!("Making changes");
    let ctx = UpdateContext {
        store,
        gateway: gateway.as_ref(),
        campaign_id: &params.campaign_id,
        changes: &changes,
        originals: &originals,
    };
    run_update(&ctx).await?;

    tracing::info!("Done");
    Ok(true)
}
