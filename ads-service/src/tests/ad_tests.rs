use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

use adflow_shared::auth::create_test_request;
use adflow_shared::models::keys;
use adflow_shared::store::KvStore;

use super::{attrs, response_to_json, test_context};

async fn seed_imported_ad(ctx: &super::TestContext) {
    ctx.store
        .create(
            keys::ADS,
            "cr_y",
            attrs(json!({
                "ad_id": "cr_y",
                "fb_account_id": "acct_1",
                "ad_name": "Blue Shoes",
                "enabled": true,
                "created_at": "2024-03-02T00:00:00Z",
                "preview": "<iframe>ad_100</iframe>",
            })),
        )
        .await
        .unwrap();
    ctx.store
        .create(
            keys::CAMPAIGN_AD,
            "camp_1-cr_y",
            attrs(json!({"campaign_id": "camp_1", "ad_id": "cr_y"})),
        )
        .await
        .unwrap();
    ctx.store
        .create(
            keys::CAMPAIGN_AD,
            "camp_2-cr_y",
            attrs(json!({"campaign_id": "camp_2", "ad_id": "cr_y"})),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn account_ads_joins_campaign_names() {
    let ctx = test_context();
    seed_imported_ad(&ctx).await;

    let request = create_test_request("GET", "/ads", "user_1", None);
    let response = ctx.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_to_json(response).await;
    let ads = body["data"].as_array().unwrap();
    assert_eq!(ads.len(), 1);
    assert_eq!(ads[0]["id"], json!("cr_y"));
    assert_eq!(ads[0]["status"], json!(true));

    let campaigns = ads[0]["campaigns"].as_array().unwrap();
    assert_eq!(campaigns.len(), 2);
    assert!(campaigns
        .iter()
        .any(|c| c["id"] == json!("camp_1") && c["name"] == json!("Spring Sale")));
    assert!(campaigns
        .iter()
        .any(|c| c["id"] == json!("camp_2") && c["name"] == json!("Retargeting")));
}

#[tokio::test]
async fn ad_status_update_accepts_bool_and_string_flags() {
    let ctx = test_context();
    seed_imported_ad(&ctx).await;

    let request = create_test_request(
        "PATCH",
        "/ads/cr_y/status",
        "user_1",
        Some(json!({"status": false})),
    );
    let response = ctx.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let record = ctx.store.item(keys::ADS, "cr_y").unwrap();
    assert_eq!(record["enabled"], json!(false));

    // The string form is parsed, never evaluated
    let request = create_test_request(
        "PATCH",
        "/ads/cr_y/status",
        "user_1",
        Some(json!({"status": "true"})),
    );
    let response = ctx.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let record = ctx.store.item(keys::ADS, "cr_y").unwrap();
    assert_eq!(record["enabled"], json!(true));
}

#[tokio::test]
async fn ad_status_update_rejects_garbage_flags() {
    let ctx = test_context();
    seed_imported_ad(&ctx).await;

    let request = create_test_request(
        "PATCH",
        "/ads/cr_y/status",
        "user_1",
        Some(json!({"status": "__import__('os')"})),
    );
    let response = ctx.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response_to_json(response).await;
    assert_eq!(body["message"], json!("status is required"));
}

#[tokio::test]
async fn campaign_ad_status_updates_matching_remote_ads() {
    let ctx = test_context();

    let request = create_test_request(
        "PATCH",
        "/campaigns/camp_1/ads/status",
        "user_1",
        Some(json!({"ad_name": "Blue Shoes", "status": "PAUSED"})),
    );
    let response = ctx.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let updated = ctx.gateway.object("ad_100").unwrap();
    assert_eq!(updated["status"], json!("PAUSED"));
    // The other ad in the campaign keeps its status
    let untouched = ctx.gateway.object("ad_101").unwrap();
    assert_eq!(untouched["status"], json!("PAUSED"));
    assert!(ctx.gateway.updates_for("ad_101").is_empty());
}

#[tokio::test]
async fn remove_ad_deletes_remote_ads_and_local_link() {
    let ctx = test_context();
    seed_imported_ad(&ctx).await;

    let request = create_test_request("DELETE", "/campaigns/camp_1/ads/cr_y", "user_1", None);
    let response = ctx.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The remote ad backed by cr_y is gone; the cr_x ad survives
    assert!(ctx.gateway.object("ad_100").is_none());
    assert!(ctx.gateway.object("ad_101").is_some());

    // Only this campaign's association is removed
    assert!(ctx.store.item(keys::CAMPAIGN_AD, "camp_1-cr_y").is_none());
    assert!(ctx.store.item(keys::CAMPAIGN_AD, "camp_2-cr_y").is_some());
}

#[tokio::test]
async fn creative_preview_returns_html() {
    let ctx = test_context();
    ctx.gateway.add_preview("cr_y", "<iframe>creative</iframe>");

    let request = create_test_request(
        "POST",
        "/ads/preview",
        "user_1",
        Some(json!({"creative_id": "cr_y"})),
    );
    let response = ctx.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_to_json(response).await;
    assert_eq!(body["data"], json!("<iframe>creative</iframe>"));
}

#[tokio::test]
async fn requests_without_token_are_unauthorized() {
    let ctx = test_context();

    let request = axum::http::Request::builder()
        .method("GET")
        .uri("/ads")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = ctx.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
