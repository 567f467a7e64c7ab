mod ad_tests;

use std::sync::Arc;

use axum::Router;
use serde_json::{json, Value};

use adflow_shared::models::{keys, Attributes};
use adflow_shared::test_utils::{MemoryKvStore, MockAdsGateway, MockGatewayFactory};

use crate::routes::{create_router_with_state, AppState};

pub(crate) fn attrs(value: Value) -> Attributes {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected a JSON object"),
    }
}

pub(crate) async fn response_to_json(response: axum::response::Response) -> Value {
    let body = response.into_body();
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub(crate) struct TestContext {
    pub store: Arc<MemoryKvStore>,
    pub gateway: Arc<MockAdsGateway>,
}

impl TestContext {
    pub fn app(&self) -> Router {
        create_router_with_state(AppState {
            store: self.store.clone(),
            gateways: Arc::new(MockGatewayFactory::new(self.gateway.clone())),
        })
    }
}

/// Three campaigns under one account. Remote ads: camp_1 owns creatives
/// cr_x and cr_y, camp_2 also references cr_y, camp_3 owns cr_z only.
pub(crate) fn test_context() -> TestContext {
    let store = Arc::new(MemoryKvStore::with_data(vec![
        (
            keys::USER,
            "user_1",
            attrs(json!({
                "user_id": "user_1",
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
            })),
        ),
        (
            keys::CAMPAIGN,
            "camp_2",
            attrs(json!({
                "campaign_id": "camp_2",
                "fb_account_id": "acct_1",
                "campaign_name": "Retargeting",
            })),
        ),
        (
            keys::CAMPAIGN,
            "camp_3",
            attrs(json!({
                "campaign_id": "camp_3",
                "fb_account_id": "acct_1",
                "campaign_name": "Winter Push",
            })),
        ),
    ]));

    let gateway = Arc::new(MockAdsGateway::new());

    gateway.insert_object(
        "ad_100",
        json!({
            "name": "Blue Shoes",
            "status": "ACTIVE",
            "created_time": "2024-03-02T00:00:00Z",
            "campaign_id": "camp_1",
            "creative": {"id": "cr_y"},
        }),
    );
    gateway.insert_object(
        "ad_101",
        json!({
            "name": "Red Shoes",
            "status": "PAUSED",
            "created_time": "2024-03-03T00:00:00Z",
            "campaign_id": "camp_1",
            "creative": {"id": "cr_x"},
        }),
    );
    gateway.insert_object(
        "ad_200",
        json!({
            "name": "Blue Shoes Again",
            "status": "ACTIVE",
            "created_time": "2024-03-04T00:00:00Z",
            "campaign_id": "camp_2",
            "creative": {"id": "cr_y"},
        }),
    );
    gateway.insert_object(
        "ad_300",
        json!({
            "name": "Gloves",
            "status": "ACTIVE",
            "created_time": "2024-03-05T00:00:00Z",
            "campaign_id": "camp_3",
            "creative": {"id": "cr_z"},
        }),
    );

    gateway.set_edge("camp_1", "ads", &["ad_100", "ad_101"]);
    gateway.set_edge("camp_2", "ads", &["ad_200"]);
    gateway.set_edge("camp_3", "ads", &["ad_300"]);

    for ad in ["ad_100", "ad_101", "ad_200", "ad_300"] {
        gateway.add_preview(ad, &format!("<iframe>{}</iframe>", ad));
    }

    TestContext { store, gateway }
}
