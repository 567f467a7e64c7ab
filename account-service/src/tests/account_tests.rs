use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

use adflow_shared::auth::create_test_request;
use adflow_shared::models::keys;

use super::{response_to_json, test_context};

#[tokio::test]
async fn account_list_filters_by_email_and_type() {
    let ctx = test_context();

    let request = create_test_request(
        "POST",
        "/accounts/list",
        "user_1",
        Some(json!({"email": "user@example.com"})),
    );
    let response = ctx.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_to_json(response).await;
    let accounts = body["data"].as_array().unwrap();
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0]["name"], json!("Acme Retail"));
    assert_eq!(accounts[0]["id"], json!("acct_1"));
    assert_eq!(accounts[0]["budget"], json!(5000));
    assert_eq!(accounts[0]["conversion_event"], json!("PURCHASE"));
}

#[tokio::test]
async fn account_list_requires_email() {
    let ctx = test_context();

    let request = create_test_request("POST", "/accounts/list", "user_1", Some(json!({})));
    let response = ctx.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response_to_json(response).await;
    assert_eq!(body["message"], json!("email is required"));
}

#[tokio::test]
async fn disabling_account_pauses_every_campaign() {
    let ctx = test_context();

    // The flag arrives as a string and must be parsed, not evaluated
    let request = create_test_request(
        "PATCH",
        "/accounts/acct_1/status",
        "user_1",
        Some(json!({"status": "false"})),
    );
    let response = ctx.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let account = ctx.store.item(keys::FB_ACCOUNT, "acct_1-user_1").unwrap();
    assert_eq!(account["status"], json!(false));

    for campaign_id in ["camp_1", "camp_2"] {
        let row = ctx.store.item(keys::CAMPAIGN, campaign_id).unwrap();
        assert_eq!(row["status"], json!("PAUSED"));
        assert_eq!(row["auto_expand"], json!(false));
        assert_eq!(row["ad_optimizer"], json!(false));
        assert_eq!(row["expansion_enabled"], json!(false));
        assert_eq!(row["optimization_enabled"], json!(false));
    }
}

#[tokio::test]
async fn enabling_account_leaves_campaigns_alone() {
    let ctx = test_context();

    let request = create_test_request(
        "PATCH",
        "/accounts/acct_1/status",
        "user_1",
        Some(json!({"status": true})),
    );
    let response = ctx.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let row = ctx.store.item(keys::CAMPAIGN, "camp_1").unwrap();
    assert_eq!(row["status"], json!("ACTIVE"));
    assert_eq!(row["expansion_enabled"], json!(true));
}

#[tokio::test]
async fn malformed_status_flag_is_rejected() {
    let ctx = test_context();

    let request = create_test_request(
        "PATCH",
        "/accounts/acct_1/status",
        "user_1",
        Some(json!({"status": "os.system('rm -rf /')"})),
    );
    let response = ctx.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Nothing was written
    let account = ctx.store.item(keys::FB_ACCOUNT, "acct_1-user_1").unwrap();
    assert_eq!(account["status"], json!(true));
}

#[tokio::test]
async fn conversion_event_update_writes_the_account_row() {
    let ctx = test_context();

    let request = create_test_request(
        "PATCH",
        "/accounts/acct_1/conversion-event",
        "user_1",
        Some(json!({"conversion_event": "LEAD"})),
    );
    let response = ctx.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let account = ctx.store.item(keys::FB_ACCOUNT, "acct_1-user_1").unwrap();
    assert_eq!(account["conversion_event"], json!("LEAD"));
}

#[tokio::test]
async fn insights_report_only_events_with_conversions() {
    let ctx = test_context();
    ctx.gateway.set_insights(vec![json!({
        "date_start": "2024-03-01",
        "spend": "12.50",
        "actions": [
            {"action_type": "purchase", "value": "5"},
            {"action_type": "lead", "value": "0"},
        ],
    })]);

    let request = create_test_request(
        "POST",
        "/accounts/acct_1/insights",
        "user_1",
        Some(json!({
            "events_list": [
                ["Purchase", ["PURCHASE", "default"]],
                ["Lead", ["LEAD", "default"]],
            ],
        })),
    );
    let response = ctx.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_to_json(response).await;
    assert_eq!(body["data"], json!(["PURCHASE"]));
}

#[tokio::test]
async fn billing_plans_come_from_the_payments_collaborator() {
    let ctx = test_context();

    let request = create_test_request("GET", "/billing/plans", "user_1", None);
    let response = ctx.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_to_json(response).await;
    let plans = body["data"].as_array().unwrap();
    assert_eq!(plans.len(), 2);
    assert_eq!(plans[0]["id"], json!("plan_basic"));
}
