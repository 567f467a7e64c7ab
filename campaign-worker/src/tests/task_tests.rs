use std::sync::Arc;

use serde_json::json;

use adflow_shared::fb::GatewayFactory;
use adflow_shared::models::keys;
use adflow_shared::queue::TaskMessage;
use adflow_shared::test_utils::{MemoryKvStore, MockGatewayFactory};

use crate::handlers::handle_task_message;

use super::{attrs, test_gateway, test_store};

use adflow_shared::store::KvStore;

// Seed directly; start_async_task is exercised in the campaign service
async fn queued_task(store: &MemoryKvStore, task_id: &str, task: &str) {
    let record = attrs(json!({
        "task_id": task_id,
        "task": task,
        "status": "queued",
    }));
    store
        .create(keys::ASYNC_RESULT, task_id, record)
        .await
        .unwrap();
}

#[tokio::test]
async fn successful_task_is_marked_done_with_result() {
    let store = Arc::new(test_store());
    let gateway = test_gateway();
    let factory: Arc<dyn GatewayFactory> = Arc::new(MockGatewayFactory::new(gateway));
    queued_task(&store, "task_1", "update_campaign").await;

    let message = TaskMessage {
        task: "update_campaign".to_string(),
        task_id: "task_1".to_string(),
        params: json!({
            "user_id": "user_1",
            "fb_account_id": "acct_1",
            "campaign_id": "camp_1",
            "fields": {"campaign_name": "B"},
        }),
    };

    handle_task_message(store.clone(), factory, &message)
        .await
        .unwrap();

    let record = store.item(keys::ASYNC_RESULT, "task_1").unwrap();
    assert_eq!(record["status"], json!("done"));
    assert_eq!(record["result"], json!(true));
}

#[tokio::test]
async fn failed_task_is_marked_error_with_message() {
    let store = Arc::new(test_store());
    let gateway = test_gateway();
    gateway.fail_call("camp_1", "Budget too low");
    let factory: Arc<dyn GatewayFactory> = Arc::new(MockGatewayFactory::new(gateway));
    queued_task(&store, "task_2", "update_campaign").await;

    let message = TaskMessage {
        task: "update_campaign".to_string(),
        task_id: "task_2".to_string(),
        params: json!({
            "user_id": "user_1",
            "fb_account_id": "acct_1",
            "campaign_id": "camp_1",
            "fields": {"campaign_name": "B", "daily_budget": 20},
        }),
    };

    handle_task_message(store.clone(), factory, &message)
        .await
        .unwrap();

    let record = store.item(keys::ASYNC_RESULT, "task_2").unwrap();
    assert_eq!(record["status"], json!("error"));
    assert_eq!(
        record["result"],
        json!({"error": "Failed to update Facebook campaign: Budget too low"})
    );
}

#[tokio::test]
async fn unknown_task_is_marked_error() {
    let store = Arc::new(test_store());
    let factory: Arc<dyn GatewayFactory> = Arc::new(MockGatewayFactory::new(test_gateway()));
    queued_task(&store, "task_3", "make_coffee").await;

    let message = TaskMessage {
        task: "make_coffee".to_string(),
        task_id: "task_3".to_string(),
        params: json!({}),
    };

    handle_task_message(store.clone(), factory, &message)
        .await
        .unwrap();

    let record = store.item(keys::ASYNC_RESULT, "task_3").unwrap();
    assert_eq!(record["status"], json!("error"));
    assert_eq!(record["result"], json!({"error": "Unknown task: make_coffee"}));
}

#[tokio::test]
async fn task_passes_through_running_state() {
    // After completion the record is terminal; running is observable mid-way
    // only through the store, so assert the final state is terminal and the
    // record kept its identity fields.
    let store = Arc::new(test_store());
    let factory: Arc<dyn GatewayFactory> = Arc::new(MockGatewayFactory::new(test_gateway()));
    queued_task(&store, "task_4", "update_campaign").await;

    let message = TaskMessage {
        task: "update_campaign".to_string(),
        task_id: "task_4".to_string(),
        params: json!({
            "user_id": "user_1",
            "fb_account_id": "acct_1",
            "campaign_id": "camp_1",
            "fields": {},
        }),
    };

    handle_task_message(store.clone(), factory, &message)
        .await
        .unwrap();

    let record = store.item(keys::ASYNC_RESULT, "task_4").unwrap();
    assert_eq!(record["task"], json!("update_campaign"));
    assert_eq!(record["task_id"], json!("task_4"));
    assert_eq!(record["status"], json!("done"));
}
