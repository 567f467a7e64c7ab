mod account_tests;

use std::sync::Arc;

use axum::Router;
use serde_json::{json, Value};

use adflow_shared::models::{keys, Attributes};
use adflow_shared::test_utils::{
    MemoryKvStore, MockAdsGateway, MockBilling, MockGatewayFactory,
};

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
            billing: Arc::new(MockBilling::new(vec![
                json!({"id": "plan_basic", "amount": 4900}),
                json!({"id": "plan_pro", "amount": 14900}),
            ])),
        })
    }
}

pub(crate) fn test_context() -> TestContext {
    let store = Arc::new(MemoryKvStore::with_data(vec![
        (
            keys::USER,
            "user_1",
            attrs(json!({
                "user_id": "user_1",
                "email": "user@example.com",
                "fb_account_id": "acct_1",
                "fb_access_token": "test-token",
            })),
        ),
        (
            keys::FB_ACCOUNT,
            "acct_1-user_1",
            attrs(json!({
                "fb_account_id": "acct_1",
                "user_id": "user_1",
                "user_email": "user@example.com",
                "account_type": "facebook",
                "name": "Acme Retail",
                "status": true,
                "average_daily_budget": 5000,
                "conversion_event": "PURCHASE",
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
                "status": "ACTIVE",
                "auto_expand": true,
                "expansion_enabled": true,
                "optimization_enabled": true,
            })),
        ),
        (
            keys::CAMPAIGN,
            "camp_2",
            attrs(json!({
                "campaign_id": "camp_2",
                "fb_account_id": "acct_1",
                "campaign_name": "Retargeting",
                "status": "ACTIVE",
            })),
        ),
    ]));

    TestContext {
        store,
        gateway: Arc::new(MockAdsGateway::new()),
    }
}
