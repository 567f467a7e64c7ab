use axum::{
    extract::{Extension, Path, State},
    response::Response,
    Json,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};

use adflow_shared::fb::act;
use adflow_shared::models::{id_string, keys, parse_bool_flag, Attributes, FbAccountRecord};
use adflow_shared::response::ok;
use adflow_shared::store::{get_required, KvStore};

use crate::error::{AppError, Result};
use crate::models::{
    AccountInfo, AccountListRequest, AccountStatusRequest, ConversionEventRequest, InsightsRequest,
};
use crate::routes::AppState;

// POST /accounts/list
pub async fn account_list<S>(
    State(state): State<AppState<S>>,
    Extension(_user_id): Extension<String>,
    Json(payload): Json<AccountListRequest>,
) -> Result<Response>
where
    S: KvStore,
{
    let email = payload.email.ok_or_else(|| AppError::validation("email"))?;

    let mut filter = Attributes::new();
    filter.insert("user_email".to_string(), json!(email));
    filter.insert("account_type".to_string(), json!("facebook"));
    let rows = state.store.query(keys::FB_ACCOUNT, &filter).await?;

    let accounts: Vec<AccountInfo> = rows
        .iter()
        .map(|row| AccountInfo {
            name: row.get("name").and_then(Value::as_str).map(str::to_string),
            id: row.get("fb_account_id").and_then(id_string),
            status: row.get("status").and_then(Value::as_bool),
            budget: row.get("average_daily_budget").and_then(Value::as_i64),
            conversion_event: row
                .get("conversion_event")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
        .collect();

    Ok(ok(accounts, "Success"))
}

// PATCH /accounts/:id/status
//
// The flag arrives as a JSON bool or the strings "true"/"false"; it is
// parsed, never evaluated. Disabling an account pauses every campaign under
// it and switches their automation off.
pub async fn update_account_status<S>(
    State(state): State<AppState<S>>,
    Path(fb_account_id): Path<String>,
    Extension(user_id): Extension<String>,
    Json(payload): Json<AccountStatusRequest>,
) -> Result<Response>
where
    S: KvStore,
{
    let status = payload
        .status
        .as_ref()
        .and_then(parse_bool_flag)
        .ok_or_else(|| AppError::validation("status"))?;

    let sk = FbAccountRecord::sort_key(&fb_account_id, &user_id);
    let mut change = Attributes::new();
    change.insert("status".to_string(), json!(status));
    state.store.update(keys::FB_ACCOUNT, &sk, change).await?;

    if !status {
        let mut filter = Attributes::new();
        filter.insert("fb_account_id".to_string(), json!(fb_account_id));
        let campaigns = state.store.query(keys::CAMPAIGN, &filter).await?;

        for campaign in campaigns {
            let Some(campaign_id) = campaign.get("campaign_id").and_then(id_string) else {
                continue;
            };
            let mut pause = Attributes::new();
            pause.insert("status".to_string(), json!("PAUSED"));
            pause.insert("auto_expand".to_string(), json!(false));
            pause.insert("ad_optimizer".to_string(), json!(false));
            pause.insert("expansion_enabled".to_string(), json!(false));
            pause.insert("optimization_enabled".to_string(), json!(false));
            state
                .store
                .update(keys::CAMPAIGN, &campaign_id, pause)
                .await?;
        }
    }

    Ok(ok(Value::Null, "Successfully updated"))
}

// PATCH /accounts/:id/conversion-event
pub async fn update_account_conversion_event<S>(
    State(state): State<AppState<S>>,
    Path(fb_account_id): Path<String>,
    Extension(user_id): Extension<String>,
    Json(payload): Json<ConversionEventRequest>,
) -> Result<Response>
where
    S: KvStore,
{
    let conversion_event = payload
        .conversion_event
        .ok_or_else(|| AppError::validation("conversion_event"))?;

    let sk = FbAccountRecord::sort_key(&fb_account_id, &user_id);
    let mut change = Attributes::new();
    change.insert("conversion_event".to_string(), json!(conversion_event));
    state.store.update(keys::FB_ACCOUNT, &sk, change).await?;

    Ok(ok(Value::Null, "Successfully updated"))
}

// POST /accounts/:id/insights — which of the given events saw conversions
// in the last 14 days
pub async fn insights_with_data<S>(
    State(state): State<AppState<S>>,
    Path(fb_account_id): Path<String>,
    Extension(user_id): Extension<String>,
    Json(payload): Json<InsightsRequest>,
) -> Result<Response>
where
    S: KvStore,
{
    let events_list = payload
        .events_list
        .ok_or_else(|| AppError::validation("events_list"))?;

    let user = get_required(&*state.store, keys::USER, &user_id).await?;
    let token = user
        .get("fb_access_token")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::not_found("No Facebook access token for this user"))?;
    let gateway = state.gateways.for_token(token);

    let events_to_check: Vec<String> = events_list
        .iter()
        .filter_map(|entry| entry.get(1))
        .filter_map(event_tuple_to_action)
        .map(|e| e.to_uppercase())
        .collect();

    // One single-day range per day, oldest first
    let now = Utc::now();
    let dates: Vec<Value> = (1i64..=14)
        .rev()
        .map(|i| {
            let day = (now - Duration::days(i)).format("%Y-%m-%d").to_string();
            json!({"since": day, "until": day})
        })
        .collect();

    let mut params = Attributes::new();
    params.insert("time_ranges".to_string(), json!(dates));
    let insights = gateway
        .get_insights(
            &act(&fb_account_id),
            &params,
            &["spend", "date_start", "impressions", "actions"],
        )
        .await
        .unwrap_or_else(|err| {
            tracing::error!("Exception in insights_with_data: {}", err);
            Vec::new()
        });

    let mut seen_actions = std::collections::HashSet::new();
    for row in &insights {
        if let Some(actions) = row["actions"].as_array() {
            for action in actions {
                let value = action["value"]
                    .as_str()
                    .and_then(|v| v.parse::<i64>().ok())
                    .or_else(|| action["value"].as_i64())
                    .unwrap_or(0);
                if value > 0 {
                    if let Some(action_type) = action["action_type"].as_str() {
                        seen_actions.insert(action_type.to_uppercase());
                    }
                }
            }
        }
    }

    let events_with_data: Vec<String> = seen_actions
        .into_iter()
        .filter(|action| events_to_check.contains(action))
        .collect();

    Ok(ok(events_with_data, "Success"))
}

// GET /billing/plans
pub async fn billing_plans<S>(
    State(state): State<AppState<S>>,
    Extension(_user_id): Extension<String>,
) -> Result<Response>
where
    S: KvStore,
{
    let plans = state.billing.list_plans().await?;
    Ok(ok(plans, "Success"))
}

/// `["PURCHASE", "default"]`-style tuples render to the insights action
/// name; custom conversions get the offsite-conversion prefix.
fn event_tuple_to_action(event: &Value) -> Option<String> {
    match event {
        Value::Array(parts) => {
            let id = parts.first().and_then(Value::as_str)?;
            match parts.get(1).and_then(Value::as_str) {
                Some("custom_conversion") => Some(format!("offsite_conversion.custom.{}", id)),
                _ => Some(id.to_string()),
            }
        }
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}
