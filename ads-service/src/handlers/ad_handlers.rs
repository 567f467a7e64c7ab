use axum::{
    extract::{Extension, Path, State},
    response::Response,
    Json,
};
use serde_json::{json, Value};

use adflow_shared::batch::BatchExecutor;
use adflow_shared::error::ServiceError;
use adflow_shared::fb::{act, BatchRequest};
use adflow_shared::models::{id_string, keys, parse_bool_flag, Attributes, CampaignAdLink};
use adflow_shared::response::ok;
use adflow_shared::store::KvStore;

use crate::error::{AppError, Result};
use crate::import::import_ad;
use crate::models::{
    AccountAd, AdStatusRequest, CampaignAdStatusRequest, CampaignRef, ImportAdRequest,
    PreviewRequest, VideoAdRequest,
};
use crate::routes::AppState;
use crate::video::wait_for_video_ready;

use super::user_context;

const PREVIEW_FORMAT: &str = "DESKTOP_FEED_STANDARD";

// GET /ads
pub async fn account_ads<S>(
    State(state): State<AppState<S>>,
    Extension(user_id): Extension<String>,
) -> Result<Response>
where
    S: KvStore,
{
    let (fb_account_id, _token) = user_context(&*state.store, &user_id).await?;

    let mut filter = Attributes::new();
    filter.insert("fb_account_id".to_string(), json!(fb_account_id));
    let mut ads = state.store.query(keys::ADS, &filter).await?;

    ads.sort_by(|a, b| {
        let a_created = a.get("created_at").and_then(Value::as_str).unwrap_or("");
        let b_created = b.get("created_at").and_then(Value::as_str).unwrap_or("");
        b_created.cmp(a_created)
    });

    let mut result = Vec::new();
    for ad in ads {
        let Some(ad_id) = ad.get("ad_id").and_then(id_string) else {
            continue;
        };

        let mut link_filter = Attributes::new();
        link_filter.insert("ad_id".to_string(), ad["ad_id"].clone());
        let links = state.store.query(keys::CAMPAIGN_AD, &link_filter).await?;

        let mut campaigns = Vec::new();
        for link in links {
            let Some(campaign_id) = link.get("campaign_id").and_then(id_string) else {
                continue;
            };
            let name = state
                .store
                .get(keys::CAMPAIGN, &campaign_id)
                .await?
                .and_then(|row| {
                    row.get("campaign_name")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                });
            campaigns.push(CampaignRef {
                id: campaign_id,
                name,
            });
        }

        result.push(AccountAd {
            id: ad_id,
            name: ad
                .get("ad_name")
                .and_then(Value::as_str)
                .map(str::to_string),
            preview: ad
                .get("preview")
                .and_then(Value::as_str)
                .map(str::to_string),
            created_at: ad
                .get("created_at")
                .and_then(Value::as_str)
                .map(str::to_string),
            status: ad.get("enabled").and_then(Value::as_bool).unwrap_or(false),
            campaigns,
        });
    }

    Ok(ok(result, "Success"))
}

// POST /ads/import
pub async fn import_ad_handler<S>(
    State(state): State<AppState<S>>,
    Extension(user_id): Extension<String>,
    Json(payload): Json<ImportAdRequest>,
) -> Result<Response>
where
    S: KvStore,
{
    let ad_id = payload.ad_id.ok_or_else(|| AppError::validation("ad_id"))?;

    let (fb_account_id, token) = user_context(&*state.store, &user_id).await?;
    let gateway = state.gateways.for_token(&token);

    let canonical_id = import_ad(
        &*state.store,
        gateway.as_ref(),
        &fb_account_id,
        None,
        Some(&ad_id),
        None,
    )
    .await?;

    Ok(ok(json!({ "ad_id": canonical_id }), "Success"))
}

// PATCH /ads/:id/status
pub async fn update_ad_status<S>(
    State(state): State<AppState<S>>,
    Path(ad_id): Path<String>,
    Extension(_user_id): Extension<String>,
    Json(payload): Json<AdStatusRequest>,
) -> Result<Response>
where
    S: KvStore,
{
    let status = payload
        .status
        .as_ref()
        .and_then(parse_bool_flag)
        .ok_or_else(|| AppError::validation("status"))?;

    let mut change = Attributes::new();
    change.insert("enabled".to_string(), json!(status));
    state.store.update(keys::ADS, &ad_id, change).await?;

    Ok(ok(
        json!({ "ad_id": ad_id, "enabled": status }),
        "Successfully updated!",
    ))
}

// PATCH /campaigns/:id/ads/status — flip remote ads by name
pub async fn update_campaign_ad_status<S>(
    State(state): State<AppState<S>>,
    Path(campaign_id): Path<String>,
    Extension(user_id): Extension<String>,
    Json(payload): Json<CampaignAdStatusRequest>,
) -> Result<Response>
where
    S: KvStore,
{
    let ad_name = payload
        .ad_name
        .ok_or_else(|| AppError::validation("ad_name"))?;
    let status = payload
        .status
        .ok_or_else(|| AppError::validation("status"))?;

    let (_fb_account_id, token) = user_context(&*state.store, &user_id).await?;
    let gateway = state.gateways.for_token(&token);

    let ads = gateway
        .get_edge(&campaign_id, "ads", &["name", "id"], None)
        .await?;

    for ad in ads {
        if ad.get_str("name") == Some(ad_name.as_str()) {
            let mut change = Attributes::new();
            change.insert("status".to_string(), json!(status));
            gateway.update_object(&ad.id, &change).await?;
        }
    }

    Ok(ok(Value::Null, "Successfully updated!"))
}

// DELETE /campaigns/:id/ads/:creative_id
pub async fn remove_ad_from_campaign<S>(
    State(state): State<AppState<S>>,
    Path((campaign_id, creative_id)): Path<(String, String)>,
    Extension(user_id): Extension<String>,
) -> Result<Response>
where
    S: KvStore,
{
    let (_fb_account_id, token) = user_context(&*state.store, &user_id).await?;
    let gateway = state.gateways.for_token(&token);

    // Remote: delete every ad in the campaign backed by this creative
    let ads = gateway
        .get_edge(&campaign_id, "ads", &["creative"], None)
        .await?;
    let mut batcher = BatchExecutor::new(false);
    for ad in ads {
        let ad_creative = ad.get("creative").and_then(|c| id_string(&c["id"]));
        if ad_creative.as_deref() == Some(creative_id.as_str()) {
            batcher.push(BatchRequest::delete(ad.id.clone()));
        }
    }
    if !batcher.is_empty() {
        batcher.execute(gateway.as_ref()).await?;
    }

    // Local: drop the association
    let link_id = CampaignAdLink::sort_key(&campaign_id, &creative_id);
    state.store.delete(keys::CAMPAIGN_AD, &link_id).await?;

    Ok(ok(json!({ "id": link_id }), "Successfully deleted!"))
}

// POST /ads/preview
pub async fn creative_preview<S>(
    State(state): State<AppState<S>>,
    Extension(user_id): Extension<String>,
    Json(payload): Json<PreviewRequest>,
) -> Result<Response>
where
    S: KvStore,
{
    let creative_id = payload
        .creative_id
        .ok_or_else(|| AppError::validation("creative_id"))?;

    let (_fb_account_id, token) = user_context(&*state.store, &user_id).await?;
    let gateway = state.gateways.for_token(&token);

    let html_code = gateway
        .get_previews(&creative_id, PREVIEW_FORMAT)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| {
            AppError(ServiceError::RemoteApi(
                "No preview available for this creative".to_string(),
            ))
        })?;

    Ok(ok(html_code, "Success"))
}

// POST /ads/video — upload, wait for processing, build the creative
pub async fn create_video_ad<S>(
    State(state): State<AppState<S>>,
    Extension(user_id): Extension<String>,
    Json(payload): Json<VideoAdRequest>,
) -> Result<Response>
where
    S: KvStore,
{
    let video_url = payload
        .video_url
        .ok_or_else(|| AppError::validation("video_url"))?;
    let ad_name = payload
        .ad_name
        .ok_or_else(|| AppError::validation("ad_name"))?;
    let page_id = payload
        .page_id
        .ok_or_else(|| AppError::validation("page_id"))?;

    let (fb_account_id, token) = user_context(&*state.store, &user_id).await?;
    let gateway = state.gateways.for_token(&token);

    let mut upload = Attributes::new();
    upload.insert("file_url".to_string(), json!(video_url));
    upload.insert("name".to_string(), json!(ad_name));
    let video = gateway
        .create_on_edge(&act(&fb_account_id), "advideos", &upload)
        .await?;

    if !wait_for_video_ready(gateway.as_ref(), &video.id).await? {
        return Err(AppError(ServiceError::RemoteApi(
            "Video is still processing. Please try again in a few minutes.".to_string(),
        )));
    }

    let mut video_data = serde_json::Map::new();
    video_data.insert("video_id".to_string(), json!(video.id));
    if let Some(message) = &payload.message {
        video_data.insert("message".to_string(), json!(message));
    }
    if let Some(link) = &payload.link {
        video_data.insert(
            "call_to_action".to_string(),
            json!({"type": "LEARN_MORE", "value": {"link": link}}),
        );
    }

    let mut creative_params = Attributes::new();
    creative_params.insert("name".to_string(), json!(ad_name));
    creative_params.insert(
        "object_story_spec".to_string(),
        json!({
            "page_id": page_id,
            "video_data": video_data,
        }),
    );
    let creative = gateway
        .create_on_edge(&act(&fb_account_id), "adcreatives", &creative_params)
        .await?;

    Ok(ok(
        json!({ "creative_id": creative.id, "video_id": video.id }),
        "Success",
    ))
}
