mod campaign_tests;

use std::sync::Arc;

use axum::Router;
use serde_json::{json, Value};

use adflow_shared::models::{keys, Attributes};
use adflow_shared::test_utils::{MemoryKvStore, MockAdsGateway, MockGatewayFactory, MockTaskQueue};

use crate::routes::{create_router_with_state, AppState};

pub(crate) fn attrs(value: Value) -> Attributes {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected a JSON object"),
    }
}

// Helper function to extract JSON from response
pub(crate) async fn response_to_json(response: axum::response::Response) -> Value {
    let body = response.into_body();
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub(crate) struct TestContext {
    pub store: Arc<MemoryKvStore>,
    pub gateway: Arc<MockAdsGateway>,
    pub queue: Arc<MockTaskQueue>,
}

impl TestContext {
    pub fn app(&self) -> Router {
        create_router_with_state(AppState {
            store: self.store.clone(),
            gateways: Arc::new(MockGatewayFactory::new(self.gateway.clone())),
            queue: self.queue.clone(),
        })
    }
}

/// One user with a linked account, one imported campaign with a remote
/// mirror and a single ad set.
pub(crate) fn test_context() -> TestContext {
    let store = Arc::new(MemoryKvStore::with_data(vec![
        (
            keys::USER,
            "user_1",
            attrs(json!({
                "user_id": "user_1",
                "email": "user@example.com",
                "role": "admin",
                "fb_account_id": "acct_1",
                "fb_access_token": "test-token",
            })),
        ),
        (
            keys::CAMPAIGN,
            "camp_1",
            attrs(json!({
                "campaign_id": "camp_1",
                "fb_account_id": "acct_1",
                "campaign_name": "Spring Sale",
                "campaign_type": "conversions",
                "budget": 1000,
                "cpa_goal": 700,
                "created_at": "2024-03-01T00:00:00Z",
                "conversion_event": {"event": "PURCHASE", "kind": "default"},
            })),
        ),
        (
            keys::ADS,
            "cr_1",
            attrs(json!({
                "ad_id": "cr_1",
                "fb_account_id": "acct_1",
                "ad_name": "Blue Shoes",
                "enabled": true,
                "created_at": "2024-03-02T00:00:00Z",
                "preview": "<iframe>blue</iframe>",
            })),
        ),
        (
            keys::CAMPAIGN_AD,
            "camp_1-cr_1",
            attrs(json!({"campaign_id": "camp_1", "ad_id": "cr_1"})),
        ),
    ]));

    let gateway = Arc::new(MockAdsGateway::new());
    gateway.insert_object(
        "camp_1",
        json!({
            "name": "Spring Sale",
            "objective": "CONVERSIONS",
            "effective_status": "ACTIVE",
            "daily_budget": 1500,
        }),
    );
    gateway.insert_object(
        "adset_1",
        json!({
            "targeting": {
                "age_min": 25,
                "age_max": 55,
                "genders": [1],
                "geo_locations": {"countries": ["US"]},
                "excluded_custom_audiences": [{"id": "aud_1"}],
            },
        }),
    );
    gateway.set_edge("camp_1", "adsets", &["adset_1"]);

    TestContext {
        store,
        gateway,
        queue: Arc::new(MockTaskQueue::new()),
    }
}
