use std::collections::HashMap;

use axum::{
    extract::{Extension, Path, State},
    response::Response,
    Json,
};
use serde_json::{json, Value};

use adflow_shared::batch::BatchExecutor;
use adflow_shared::error::ServiceError;
use adflow_shared::fb::{AdsGateway, BatchRequest, RemoteObject};
use adflow_shared::models::{keys, Attributes, CampaignAdLink, ConversionEvent};
use adflow_shared::queue::start_async_task;
use adflow_shared::response::ok;
use adflow_shared::store::{get_required, KvStore};

use crate::error::{AppError, Result};
use crate::models::{CampaignAdSummary, CampaignDetail, TaskStatusResponse};
use crate::routes::AppState;

use super::account_handlers::{events_for_account, events_for_objective};
use super::{id_string, user_context};

const CAMPAIGN_FIELDS: [&str; 4] = ["objective", "effective_status", "daily_budget", "name"];

// GET /campaigns
pub async fn campaign_list<S>(
    State(state): State<AppState<S>>,
    Extension(user_id): Extension<String>,
) -> Result<Response>
where
    S: KvStore,
{
    let (fb_account_id, token) = user_context(&*state.store, &user_id).await?;
    let gateway = state.gateways.for_token(&token);

    let mut filter = Attributes::new();
    filter.insert("fb_account_id".to_string(), json!(fb_account_id));
    let rows = state.store.query(keys::CAMPAIGN, &filter).await?;

    // Only campaigns that finished importing have a name
    let rows: Vec<Attributes> = rows
        .into_iter()
        .filter(|row| row.get("campaign_name").and_then(Value::as_str).is_some())
        .collect();

    let rows_by_id: HashMap<String, Attributes> = rows
        .iter()
        .filter_map(|row| {
            row.get("campaign_id")
                .and_then(id_string)
                .map(|id| (id, row.clone()))
        })
        .collect();

    // One batched read for the whole account's remote campaign state
    let mut batcher = BatchExecutor::new(false);
    for campaign_id in rows_by_id.keys() {
        batcher.push_with_metadata(
            BatchRequest::get(campaign_id.clone(), &CAMPAIGN_FIELDS),
            json!(campaign_id),
        );
    }
    let outcomes = batcher.execute(gateway.as_ref()).await?;

    let mut campaigns = Vec::new();
    for outcome in outcomes {
        let Some(campaign_id) = outcome.metadata.as_ref().and_then(id_string) else {
            continue;
        };
        let body = match outcome.reply {
            Ok(body) => body,
            Err(err) => {
                tracing::error!("Error reading campaign {}: {}", campaign_id, err);
                continue;
            }
        };
        let remote: RemoteObject = match serde_json::from_value(body) {
            Ok(remote) => remote,
            Err(err) => {
                tracing::error!("Malformed campaign object {}: {}", campaign_id, err);
                continue;
            }
        };

        // Keep the local budget mirror fresh
        let daily_budget = remote
            .get("daily_budget")
            .and_then(budget_minor_units)
            .unwrap_or(0);
        let mut budget_change = Attributes::new();
        budget_change.insert("budget".to_string(), json!(daily_budget));
        state
            .store
            .update(keys::CAMPAIGN, &campaign_id, budget_change)
            .await?;

        let row = rows_by_id.get(&campaign_id).cloned();
        match campaign_detail(
            &*state.store,
            gateway.as_ref(),
            &fb_account_id,
            &campaign_id,
            Some(remote),
            row,
            true,
        )
        .await
        {
            Ok(detail) => campaigns.push(detail),
            Err(err) => tracing::error!("Error assembling campaign {}: {}", campaign_id, err.0),
        }
    }

    let available = events_for_account(gateway.as_ref(), &fb_account_id).await?;
    for campaign in &mut campaigns {
        campaign.available_events = available.clone();
    }

    Ok(ok(campaigns, "Successfully get the campaign_list"))
}

// GET /campaigns/:id
pub async fn get_campaign<S>(
    State(state): State<AppState<S>>,
    Path(campaign_id): Path<String>,
    Extension(user_id): Extension<String>,
) -> Result<Response>
where
    S: KvStore,
{
    let (fb_account_id, token) = user_context(&*state.store, &user_id).await?;
    let gateway = state.gateways.for_token(&token);

    let detail = campaign_detail(
        &*state.store,
        gateway.as_ref(),
        &fb_account_id,
        &campaign_id,
        None,
        None,
        false,
    )
    .await?;

    Ok(ok(detail, "Success"))
}

// PATCH /campaigns/:id — enqueue the reconciliation task and return its id
pub async fn update_campaign<S>(
    State(state): State<AppState<S>>,
    Path(campaign_id): Path<String>,
    Extension(user_id): Extension<String>,
    Json(fields): Json<Value>,
) -> Result<Response>
where
    S: KvStore,
{
    let fields = match fields {
        Value::Object(map) if !map.is_empty() => map,
        _ => return Err(AppError::validation("fields")),
    };

    let (fb_account_id, _token) = user_context(&*state.store, &user_id).await?;

    // The campaign must exist locally before we queue work against it
    get_required(&*state.store, keys::CAMPAIGN, &campaign_id).await?;

    let params = json!({
        "user_id": user_id,
        "fb_account_id": fb_account_id,
        "campaign_id": campaign_id,
        "fields": fields,
    });
    let task_id = start_async_task(&*state.store, &*state.queue, "update_campaign", params).await?;

    Ok(ok(json!({ "task_id": task_id }), "Update task queued"))
}

// GET /tasks/:task_id
pub async fn task_status<S>(
    State(state): State<AppState<S>>,
    Path(task_id): Path<String>,
    Extension(_user_id): Extension<String>,
) -> Result<Response>
where
    S: KvStore,
{
    let record = get_required(&*state.store, keys::ASYNC_RESULT, &task_id).await?;

    let response = TaskStatusResponse {
        task_id,
        status: record.get("status").cloned().unwrap_or(Value::Null),
        result: record.get("result").cloned().unwrap_or(Value::Null),
    };

    Ok(ok(response, "Success"))
}

// DELETE /campaigns/:id
pub async fn delete_campaign<S>(
    State(state): State<AppState<S>>,
    Path(campaign_id): Path<String>,
    Extension(user_id): Extension<String>,
) -> Result<Response>
where
    S: KvStore,
{
    let (_fb_account_id, token) = user_context(&*state.store, &user_id).await?;
    let gateway = state.gateways.for_token(&token);

    // Remote status first; the local rows only go once the platform accepted
    let mut status = Attributes::new();
    status.insert("status".to_string(), json!("DELETED"));
    gateway.update_object(&campaign_id, &status).await?;

    state.store.delete(keys::CAMPAIGN, &campaign_id).await?;

    let mut filter = Attributes::new();
    filter.insert("campaign_id".to_string(), json!(campaign_id));
    let links = state.store.query(keys::CAMPAIGN_AD, &filter).await?;
    for link in links {
        if let Some(ad_id) = link.get("ad_id").and_then(id_string) {
            state
                .store
                .delete(
                    keys::CAMPAIGN_AD,
                    &CampaignAdLink::sort_key(&campaign_id, &ad_id),
                )
                .await?;
        }
    }

    Ok(ok(Value::Null, "Successfully deleted"))
}

// GET /campaigns/:id/selectable-events
pub async fn selectable_events<S>(
    State(state): State<AppState<S>>,
    Path(campaign_id): Path<String>,
    Extension(user_id): Extension<String>,
) -> Result<Response>
where
    S: KvStore,
{
    let (fb_account_id, token) = user_context(&*state.store, &user_id).await?;
    let gateway = state.gateways.for_token(&token);

    let campaign = gateway
        .get_object(&campaign_id, &["objective", "effective_status"])
        .await?;
    let objective = campaign.get_str("objective").unwrap_or_default().to_string();

    let events = events_for_objective(gateway.as_ref(), &fb_account_id, &objective).await?;
    Ok(ok(events, "Success"))
}

/// Assembles one campaign view from the local row and the remote mirror.
/// The stored conversion event is normalized here: legacy stringified
/// tuples are repaired and the corrected structure written back.
pub(crate) async fn campaign_detail<S>(
    store: &S,
    gateway: &dyn AdsGateway,
    fb_account_id: &str,
    campaign_id: &str,
    preloaded_remote: Option<RemoteObject>,
    preloaded_row: Option<Attributes>,
    skip_extras: bool,
) -> Result<CampaignDetail>
where
    S: KvStore,
{
    let remote = match preloaded_remote {
        Some(remote) => remote,
        None => gateway.get_object(campaign_id, &CAMPAIGN_FIELDS).await?,
    };

    let row = match preloaded_row {
        Some(row) => row,
        None => get_required(store, keys::CAMPAIGN, campaign_id).await?,
    };

    let mut detail = CampaignDetail {
        campaign_id: campaign_id.to_string(),
        campaign_name: row
            .get("campaign_name")
            .and_then(Value::as_str)
            .map(str::to_string),
        campaign_type: row
            .get("campaign_type")
            .and_then(Value::as_str)
            .map(str::to_string),
        campaign_objective: remote.get_str("objective").map(str::to_string),
        campaign_status: remote.get_str("effective_status") == Some("ACTIVE"),
        daily_budget: remote
            .get("daily_budget")
            .and_then(budget_minor_units)
            .or_else(|| row.get("budget").and_then(Value::as_i64))
            .unwrap_or(0),
        cpa_goal: row.get("cpa_goal").and_then(Value::as_i64).unwrap_or(0),
        date_created: row
            .get("created_at")
            .and_then(Value::as_str)
            .map(str::to_string),
        auto_expansion_status: row
            .get("expansion_enabled")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        auto_expansion_level: row
            .get("exp_number_of_ad_sets")
            .and_then(Value::as_u64)
            .unwrap_or(0) as u32,
        naming_convention: row
            .get("exp_adset_name_template")
            .and_then(Value::as_str)
            .map(str::to_string),
        ad_optimization_status: row
            .get("optimization_enabled")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        ad_optimization_level: row
            .get("opt_number_of_ads")
            .and_then(Value::as_u64)
            .unwrap_or(0) as u32,
        ..Default::default()
    };

    if let Some(stored) = row.get("conversion_event") {
        if let Some((event, needs_repair)) = ConversionEvent::from_attr(stored) {
            if needs_repair {
                tracing::info!(
                    "campaign {} conversion_event is incorrectly formatted as {}, rewriting as {}",
                    campaign_id,
                    stored,
                    event.event
                );
                let mut change = Attributes::new();
                change.insert(
                    "conversion_event".to_string(),
                    serde_json::to_value(&event).map_err(ServiceError::from)?,
                );
                store.update(keys::CAMPAIGN, campaign_id, change).await?;
            }
            detail.optimization_event = Some(event.event);
        }
    }

    if !skip_extras {
        let adsets = gateway
            .get_edge(campaign_id, "adsets", &["targeting"], Some(1))
            .await
            .unwrap_or_else(|err| {
                tracing::error!("Error reading adsets for {}: {}", campaign_id, err);
                Vec::new()
            });
        if let Some(targeting) = adsets.first().and_then(|a| a.get("targeting")) {
            detail.age_min = targeting["age_min"].as_u64().map(|v| v as u8);
            detail.age_max = targeting["age_max"].as_u64().map(|v| v as u8);
            detail.gender = match &targeting["genders"] {
                Value::Null => None,
                value => Some(value.clone()),
            };
            detail.country = country_from_targeting(targeting);
            detail.exclusions = targeting["excluded_custom_audiences"]
                .as_array()
                .cloned()
                .unwrap_or_default();
        }

        detail.account_optimization_events = events_for_objective(
            gateway,
            fb_account_id,
            detail.campaign_objective.as_deref().unwrap_or_default(),
        )
        .await?;
        detail.ads_enabled = campaign_ads(store, fb_account_id, campaign_id).await?;
    }

    Ok(detail)
}

// Cities win over countries when present; mirror that in the label.
fn country_from_targeting(targeting: &Value) -> Option<String> {
    if let Some(country) = targeting["geo_locations"]["cities"][0]["country"].as_str() {
        return Some(format!("{} (More Specific)", country));
    }
    targeting["geo_locations"]["countries"][0]
        .as_str()
        .map(str::to_string)
}

/// Every account ad, flagged with whether its creative already appears in
/// this campaign.
async fn campaign_ads<S>(
    store: &S,
    fb_account_id: &str,
    campaign_id: &str,
) -> Result<Vec<CampaignAdSummary>>
where
    S: KvStore,
{
    let mut filter = Attributes::new();
    filter.insert("fb_account_id".to_string(), json!(fb_account_id));
    let mut ads = store.query(keys::ADS, &filter).await?;

    ads.sort_by(|a, b| {
        let a_created = a.get("created_at").and_then(Value::as_str).unwrap_or("");
        let b_created = b.get("created_at").and_then(Value::as_str).unwrap_or("");
        b_created.cmp(a_created)
    });

    let mut summaries = Vec::new();
    for ad in ads {
        let Some(ad_id) = ad.get("ad_id").and_then(id_string) else {
            continue;
        };

        let mut link_filter = Attributes::new();
        link_filter.insert("ad_id".to_string(), ad["ad_id"].clone());
        let links = store.query(keys::CAMPAIGN_AD, &link_filter).await?;
        let in_campaign = links
            .iter()
            .any(|link| link.get("campaign_id").and_then(id_string).as_deref() == Some(campaign_id));

        summaries.push(CampaignAdSummary {
            id: ad_id,
            name: ad
                .get("ad_name")
                .and_then(Value::as_str)
                .map(str::to_string),
            in_campaign,
            preview: ad
                .get("preview")
                .and_then(Value::as_str)
                .map(str::to_string),
        });
    }

    Ok(summaries)
}

// The platform returns daily_budget as either a number or a numeric string
fn budget_minor_units(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
