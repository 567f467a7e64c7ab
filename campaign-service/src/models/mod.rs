use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `(display title, (event id, event kind))` — the tuple shape the frontend
/// renders selectable conversion events from.
pub type SelectableEvent = (String, (String, String));

/// Assembled campaign view: local record merged with the remote mirror.
#[derive(Serialize, Clone, Debug, Default)]
pub struct CampaignDetail {
    pub campaign_id: String,
    pub campaign_name: Option<String>,
    pub campaign_type: Option<String>,
    pub campaign_objective: Option<String>,
    pub campaign_status: bool,
    pub daily_budget: i64,
    pub cpa_goal: i64,
    pub date_created: Option<String>,
    pub optimization_event: Option<String>,
    pub auto_expansion_status: bool,
    pub auto_expansion_level: u32,
    pub naming_convention: Option<String>,
    pub ad_optimization_status: bool,
    pub ad_optimization_level: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_min: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_max: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub exclusions: Vec<Value>,
    pub account_optimization_events: Vec<SelectableEvent>,
    pub available_events: Vec<SelectableEvent>,
    pub ads_enabled: Vec<CampaignAdSummary>,
}

/// One account ad as shown inside a campaign view.
#[derive(Serialize, Clone, Debug)]
pub struct CampaignAdSummary {
    pub id: String,
    pub name: Option<String>,
    pub in_campaign: bool,
    pub preview: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct LookalikeRequest {
    pub audience_id: Option<String>,
    pub country: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct TaskStatusResponse {
    pub task_id: String,
    pub status: Value,
    pub result: Value,
}
