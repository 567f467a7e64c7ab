use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

use adflow_shared::auth::create_test_request;
use adflow_shared::models::keys;
use adflow_shared::store::KvStore;

use super::{attrs, response_to_json, test_context};

#[tokio::test]
async fn list_returns_campaigns_with_available_events() {
    let ctx = test_context();

    let request = create_test_request("GET", "/campaigns", "user_1", None);
    let response = ctx.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_to_json(response).await;
    assert_eq!(body["message"], json!("Successfully get the campaign_list"));

    let campaigns = body["data"].as_array().unwrap();
    assert_eq!(campaigns.len(), 1);
    let campaign = &campaigns[0];
    assert_eq!(campaign["campaign_id"], json!("camp_1"));
    assert_eq!(campaign["campaign_name"], json!("Spring Sale"));
    // Remote budget wins over the stale local mirror
    assert_eq!(campaign["daily_budget"], json!(1500));
    assert_eq!(campaign["campaign_status"], json!(true));
    assert!(!campaign["available_events"].as_array().unwrap().is_empty());

    // And the local mirror was refreshed from the remote value
    let row = ctx.store.item(keys::CAMPAIGN, "camp_1").unwrap();
    assert_eq!(row["budget"], json!(1500));
}

#[tokio::test]
async fn get_campaign_includes_targeting_extras_and_ads() {
    let ctx = test_context();

    let request = create_test_request("GET", "/campaigns/camp_1", "user_1", None);
    let response = ctx.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_to_json(response).await;
    let campaign = &body["data"];
    assert_eq!(campaign["age_min"], json!(25));
    assert_eq!(campaign["age_max"], json!(55));
    assert_eq!(campaign["gender"], json!([1]));
    assert_eq!(campaign["country"], json!("US"));
    assert_eq!(campaign["exclusions"], json!([{"id": "aud_1"}]));
    assert_eq!(campaign["cpa_goal"], json!(700));

    let ads = campaign["ads_enabled"].as_array().unwrap();
    assert_eq!(ads.len(), 1);
    assert_eq!(ads[0]["id"], json!("cr_1"));
    assert_eq!(ads[0]["in_campaign"], json!(true));
}

#[tokio::test]
async fn get_campaign_repairs_malformed_conversion_event() {
    let ctx = test_context();
    // Overwrite the row with the legacy stringified-tuple defect
    ctx.store
        .create(
            keys::CAMPAIGN,
            "camp_1",
            attrs(json!({
                "campaign_id": "camp_1",
                "fb_account_id": "acct_1",
                "campaign_name": "Spring Sale",
                "budget": 1000,
                "conversion_event": "{PURCHASE,extra}",
            })),
        )
        .await
        .unwrap();

    let request = create_test_request("GET", "/campaigns/camp_1", "user_1", None);
    let response = ctx.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_to_json(response).await;
    assert_eq!(body["data"]["optimization_event"], json!("PURCHASE"));

    // The corrected structure was persisted back to the store
    let row = ctx.store.item(keys::CAMPAIGN, "camp_1").unwrap();
    assert_eq!(
        row["conversion_event"],
        json!({"event": "PURCHASE", "kind": "default"})
    );
}

#[tokio::test]
async fn update_campaign_enqueues_task_and_returns_task_id() {
    let ctx = test_context();

    let request = create_test_request(
        "PATCH",
        "/campaigns/camp_1",
        "user_1",
        Some(json!({"campaign_name": "B", "daily_budget": 2000})),
    );
    let response = ctx.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_to_json(response).await;
    let task_id = body["data"]["task_id"].as_str().unwrap().to_string();

    // The message carries everything the worker needs
    let messages = ctx.queue.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].task, "update_campaign");
    assert_eq!(messages[0].task_id, task_id);
    assert_eq!(messages[0].params["user_id"], json!("user_1"));
    assert_eq!(messages[0].params["fb_account_id"], json!("acct_1"));
    assert_eq!(messages[0].params["campaign_id"], json!("camp_1"));
    assert_eq!(messages[0].params["fields"]["campaign_name"], json!("B"));

    // The task record starts out queued
    let record = ctx.store.item(keys::ASYNC_RESULT, &task_id).unwrap();
    assert_eq!(record["status"], json!("queued"));
}

#[tokio::test]
async fn update_campaign_with_empty_fields_is_rejected() {
    let ctx = test_context();

    let request = create_test_request("PATCH", "/campaigns/camp_1", "user_1", Some(json!({})));
    let response = ctx.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response_to_json(response).await;
    assert_eq!(body["data"], json!(null));
    assert_eq!(body["message"], json!("fields is required"));
    assert!(ctx.queue.messages().is_empty());
}

#[tokio::test]
async fn task_status_polls_the_record() {
    let ctx = test_context();
    ctx.store
        .create(
            keys::ASYNC_RESULT,
            "task_9",
            attrs(json!({
                "task_id": "task_9",
                "task": "update_campaign",
                "status": "done",
                "result": true,
            })),
        )
        .await
        .unwrap();

    let request = create_test_request("GET", "/tasks/task_9", "user_1", None);
    let response = ctx.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_to_json(response).await;
    assert_eq!(body["data"]["status"], json!("done"));
    assert_eq!(body["data"]["result"], json!(true));
}

#[tokio::test]
async fn unknown_task_is_not_found() {
    let ctx = test_context();

    let request = create_test_request("GET", "/tasks/no_such_task", "user_1", None);
    let response = ctx.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_campaign_removes_remote_and_local_state() {
    let ctx = test_context();

    let request = create_test_request("DELETE", "/campaigns/camp_1", "user_1", None);
    let response = ctx.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Remote object marked deleted
    let campaign = ctx.gateway.object("camp_1").unwrap();
    assert_eq!(campaign["status"], json!("DELETED"));

    // Local row and association links are gone
    assert!(ctx.store.item(keys::CAMPAIGN, "camp_1").is_none());
    assert!(ctx.store.item(keys::CAMPAIGN_AD, "camp_1-cr_1").is_none());
}

#[tokio::test]
async fn remote_error_surfaces_as_bad_request_with_message() {
    let ctx = test_context();
    ctx.gateway
        .fail_call("camp_1", "Campaign can not be deleted right now");

    let request = create_test_request("DELETE", "/campaigns/camp_1", "user_1", None);
    let response = ctx.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response_to_json(response).await;
    assert_eq!(
        body["message"],
        json!("Campaign can not be deleted right now")
    );
    // Local state untouched when the remote delete is refused
    assert!(ctx.store.item(keys::CAMPAIGN, "camp_1").is_some());
}

#[tokio::test]
async fn selectable_events_follow_the_campaign_objective() {
    let ctx = test_context();

    let request = create_test_request("GET", "/campaigns/camp_1/selectable-events", "user_1", None);
    let response = ctx.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_to_json(response).await;
    let events = body["data"].as_array().unwrap();
    // CONVERSIONS objective selects from the account event set
    assert!(events.iter().any(|e| e[1][0] == json!("PURCHASE")));
}

#[tokio::test]
async fn requests_without_token_are_unauthorized() {
    let ctx = test_context();

    let request = axum::http::Request::builder()
        .method("GET")
        .uri("/campaigns")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = ctx.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = response_to_json(response).await;
    assert_eq!(body["data"], json!(null));
    assert_eq!(body["message"], json!("Invalid Access Token"));
}
