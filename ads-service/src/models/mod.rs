use serde::{Deserialize, Serialize};

/// One canonical ad with every campaign its creative appears in.
#[derive(Serialize, Clone, Debug)]
pub struct AccountAd {
    pub id: String,
    pub name: Option<String>,
    pub preview: Option<String>,
    pub created_at: Option<String>,
    pub status: bool,
    pub campaigns: Vec<CampaignRef>,
}

#[derive(Serialize, Clone, Debug)]
pub struct CampaignRef {
    pub id: String,
    pub name: Option<String>,
}

// Request DTOs. Required fields stay Option so missing ones surface as a
// 400 naming the field instead of a serde rejection.
#[derive(Deserialize, Debug)]
pub struct ImportAdRequest {
    pub ad_id: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct AdStatusRequest {
    pub status: Option<serde_json::Value>,
}

#[derive(Deserialize, Debug)]
pub struct CampaignAdStatusRequest {
    pub ad_name: Option<String>,
    pub status: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct PreviewRequest {
    pub creative_id: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct VideoAdRequest {
    pub video_url: Option<String>,
    pub ad_name: Option<String>,
    pub page_id: Option<String>,
    pub message: Option<String>,
    pub link: Option<String>,
}
