use std::collections::HashSet;

use axum::{
    extract::{Extension, State},
    response::Response,
    Json,
};
use serde_json::{json, Value};

use adflow_shared::fb::{act, AdsGateway};
use adflow_shared::models::Attributes;
use adflow_shared::response::ok;
use adflow_shared::store::KvStore;

use crate::error::{AppError, Result};
use crate::models::{LookalikeRequest, SelectableEvent};
use crate::routes::AppState;

use super::user_context;

/// The standard conversion goals every account can optimize toward.
const DEFAULT_CONVERSIONS: [&str; 9] = [
    "PURCHASE",
    "LEAD",
    "COMPLETE_REGISTRATION",
    "ADD_TO_CART",
    "INITIATED_CHECKOUT",
    "ADD_PAYMENT_INFO",
    "CONTENT_VIEW",
    "SUBSCRIBE",
    "START_TRIAL",
];

// GET /account/pixels
pub async fn account_pixels<S>(
    State(state): State<AppState<S>>,
    Extension(user_id): Extension<String>,
) -> Result<Response>
where
    S: KvStore,
{
    let (fb_account_id, token) = user_context(&*state.store, &user_id).await?;
    let gateway = state.gateways.for_token(&token);

    let pixels = gateway
        .get_edge(&act(&fb_account_id), "adspixels", &["name", "id"], None)
        .await?;

    let mut named: Vec<(String, Value)> = vec![(String::new(), json!(0))];
    for pixel in pixels {
        if let Some(name) = pixel.get_str("name") {
            named.push((name.to_string(), json!(pixel.id)));
        }
    }
    named.sort_by(|a, b| a.0.cmp(&b.0));

    Ok(ok(named, "Success in account_pixels"))
}

// GET /account/apps
pub async fn account_mobile_apps<S>(
    State(state): State<AppState<S>>,
    Extension(user_id): Extension<String>,
) -> Result<Response>
where
    S: KvStore,
{
    let (fb_account_id, token) = user_context(&*state.store, &user_id).await?;
    let gateway = state.gateways.for_token(&token);

    let apps = gateway
        .get_edge(
            &act(&fb_account_id),
            "advertisable_applications",
            &["name", "id"],
            None,
        )
        .await?;

    let mut named: Vec<(String, Value)> = vec![(String::new(), json!(0))];
    for app in apps {
        match app.get_str("name") {
            Some(name) => named.push((name.to_string(), json!(app.id))),
            None => tracing::info!("no name in app"),
        }
    }
    named.sort_by(|a, b| a.0.cmp(&b.0));

    Ok(ok(named, "Success in account_mobile_apps"))
}

// GET /account/audiences
pub async fn account_audiences<S>(
    State(state): State<AppState<S>>,
    Extension(user_id): Extension<String>,
) -> Result<Response>
where
    S: KvStore,
{
    let (fb_account_id, token) = user_context(&*state.store, &user_id).await?;
    let gateway = state.gateways.for_token(&token);

    let audiences = gateway
        .get_edge(
            &act(&fb_account_id),
            "customaudiences",
            &["id", "name"],
            Some(200),
        )
        .await?;

    let named: Vec<(String, Value)> = audiences
        .iter()
        .filter_map(|audience| {
            audience
                .get_str("name")
                .map(|name| (name.to_string(), json!(audience.id)))
        })
        .collect();

    Ok(ok(named, "Success in active_audiences"))
}

// POST /account/lookalikes
pub async fn make_lookalikes<S>(
    State(state): State<AppState<S>>,
    Extension(user_id): Extension<String>,
    Json(payload): Json<LookalikeRequest>,
) -> Result<Response>
where
    S: KvStore,
{
    let audience_id = payload
        .audience_id
        .ok_or_else(|| AppError::validation("audience_id"))?;
    let country = payload
        .country
        .ok_or_else(|| AppError::validation("country"))?;

    let (fb_account_id, token) = user_context(&*state.store, &user_id).await?;
    let gateway = state.gateways.for_token(&token);

    let mut audience_ids = Vec::new();
    for ratio_percent in [1u32, 2, 5] {
        let ratio = f64::from(ratio_percent) / 100.0;
        let mut params = Attributes::new();
        params.insert(
            "name".to_string(),
            json!(format!("{}-{}", audience_id, ratio_percent)),
        );
        params.insert("subtype".to_string(), json!("LOOKALIKE"));
        params.insert("origin_audience_id".to_string(), json!(audience_id));
        params.insert(
            "lookalike_spec".to_string(),
            json!({
                "origin_audience_id": audience_id,
                "ratio": ratio,
                "country": country,
            }),
        );

        let lookalike = gateway
            .create_on_edge(&act(&fb_account_id), "customaudiences", &params)
            .await?;
        tracing::info!(
            "Created lookalike audience with ratio {:.2}: {}",
            ratio,
            lookalike.id
        );
        audience_ids.push(lookalike.id);
    }

    Ok(ok(audience_ids, "Success in fb_make_lookalikes"))
}

/// All conversion events the account can select: the standard set, custom
/// conversions, and custom events observed in recent insights.
pub(crate) async fn events_for_account(
    gateway: &dyn AdsGateway,
    fb_account_id: &str,
) -> Result<Vec<SelectableEvent>> {
    let mut events: Vec<SelectableEvent> = DEFAULT_CONVERSIONS
        .iter()
        .map(|name| (title_case(name), (name.to_string(), "default".to_string())))
        .collect();

    match gateway
        .get_edge(&act(fb_account_id), "customconversions", &["name"], Some(500))
        .await
    {
        Ok(conversions) => {
            for conversion in conversions {
                if let Some(name) = conversion.get_str("name") {
                    events.push((
                        format!("{} (custom conversion)", title_case(name)),
                        (conversion.id.clone(), "custom_conversion".to_string()),
                    ));
                }
            }
        }
        Err(err) => tracing::error!("error reading custom conversions: {}", err),
    }

    // Custom events only show up through insights actions
    let existing: HashSet<String> = events.iter().map(|e| e.1 .0.clone()).collect();
    let mut params = Attributes::new();
    params.insert("date_preset".to_string(), json!("last_90d"));
    let insights = gateway
        .get_insights(&act(fb_account_id), &params, &["actions"])
        .await?;
    if let Some(actions) = insights.first().and_then(|row| row["actions"].as_array()) {
        for action in actions {
            if let Some(action_type) = action["action_type"].as_str() {
                if !existing.contains(action_type) {
                    events.push((
                        format!("{} (custom event)", title_case(action_type)),
                        (action_type.to_string(), "custom_event".to_string()),
                    ));
                }
            }
        }
    }

    events.sort();
    Ok(events)
}

/// Link-click and lead-gen campaigns have one fixed event; conversion and
/// app-install campaigns select from the account's events.
pub(crate) async fn events_for_objective(
    gateway: &dyn AdsGateway,
    fb_account_id: &str,
    objective: &str,
) -> Result<Vec<SelectableEvent>> {
    match objective.to_uppercase().as_str() {
        "LINK_CLICKS" => Ok(vec![(
            "Link Click".to_string(),
            ("LINK_CLICK".to_string(), "default".to_string()),
        )]),
        "LEAD_GENERATION" => Ok(vec![(
            "Lead".to_string(),
            ("LEAD".to_string(), "default".to_string()),
        )]),
        "CONVERSIONS" | "APP_INSTALLS" => events_for_account(gateway, fb_account_id).await,
        _ => Ok(Vec::new()),
    }
}

fn title_case(name: &str) -> String {
    name.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::title_case;

    #[test]
    fn title_case_replaces_underscores() {
        assert_eq!(title_case("COMPLETE_REGISTRATION"), "Complete Registration");
        assert_eq!(title_case("purchase"), "Purchase");
    }
}
