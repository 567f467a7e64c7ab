mod task_tests;

use std::sync::Arc;

use serde_json::json;

use adflow_shared::models::{keys, Attributes};
use adflow_shared::test_utils::{MemoryKvStore, MockAdsGateway};

pub(crate) fn attrs(value: serde_json::Value) -> Attributes {
    match value {
        serde_json::Value::Object(map) => map,
        _ => panic!("expected a JSON object"),
    }
}

/// Store preloaded with the account link and one campaign row.
pub(crate) fn test_store() -> MemoryKvStore {
    MemoryKvStore::with_data(vec![
        (
            keys::FB_ACCOUNT,
            "acct_1-user_1",
            attrs(json!({
                "fb_account_id": "acct_1",
                "user_id": "user_1",
                "fb_access_token": "test-token",
            })),
        ),
        (
            keys::CAMPAIGN,
            "camp_1",
            attrs(json!({
                "campaign_id": "camp_1",
                "fb_account_id": "acct_1",
                "campaign_name": "A",
                "campaign_type": "conversions",
                "budget": 10,
            })),
        ),
    ])
}

/// Gateway scripted with the remote campaign and two ad sets.
pub(crate) fn test_gateway() -> Arc<MockAdsGateway> {
    let gateway = MockAdsGateway::new();

    gateway.insert_object(
        "camp_1",
        json!({
            "name": "A",
            "objective": "CONVERSIONS",
            "daily_budget": 10,
        }),
    );
    gateway.insert_object(
        "adset_1",
        json!({
            "targeting": {
                "age_min": 21,
                "age_max": 45,
                "geo_locations": {"countries": ["GB"]},
            },
            "promoted_object": {"pixel_id": "pix_9", "custom_event_type": "PURCHASE"},
        }),
    );
    gateway.insert_object(
        "adset_2",
        json!({
            "targeting": {"age_min": 18},
            "promoted_object": {"pixel_id": "pix_9", "custom_event_type": "PURCHASE"},
        }),
    );
    gateway.set_edge("camp_1", "adsets", &["adset_1", "adset_2"]);

    Arc::new(gateway)
}
