use chrono::Utc;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, ServiceError};

/// Partition keys of the single-table layout. Every record lives under one of
/// these, with a per-entity sort key.
pub mod keys {
    pub const CAMPAIGN: &str = "Campaign";
    pub const ADS: &str = "Ads";
    pub const CAMPAIGN_AD: &str = "Campaign_Ad";
    pub const FB_ACCOUNT: &str = "FB_Account";
    pub const ASYNC_RESULT: &str = "AsyncResult";
    pub const USER: &str = "User";
}

/// A flat attribute map, the unit of storage for every record.
pub type Attributes = serde_json::Map<String, Value>;

pub fn to_attributes<T: Serialize>(record: &T) -> Result<Attributes> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        other => Err(ServiceError::Internal(format!(
            "record did not serialize to an object: {}",
            other
        ))),
    }
}

pub fn from_attributes<T: DeserializeOwned>(attrs: Attributes) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(attrs))?)
}

// Helper function to get current timestamp as string
pub fn now_str() -> String {
    Utc::now().to_rfc3339()
}

/// Ids arrive as strings or numbers depending on who wrote the record;
/// render both through one spot.
pub fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Strict boolean parsing for status flags that arrive as JSON booleans or
/// the strings "true"/"false". Anything else is rejected, never evaluated.
pub fn parse_bool_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.to_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// What a campaign optimizes toward. Always stored as this two-field
/// structure; see [`ConversionEvent::from_attr`] for the legacy repair.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ConversionEvent {
    pub event: String,
    pub kind: EventKind,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Default,
    CustomConversion,
    CustomEvent,
}

impl ConversionEvent {
    pub fn new(event: impl Into<String>, kind: EventKind) -> Self {
        Self {
            event: event.into(),
            kind,
        }
    }

    /// Reads a stored `conversion_event` attribute. Older rows hold a
    /// stringified tuple like `"{PURCHASE,extra}"` instead of the structured
    /// form; those are repaired to their first element. Returns the parsed
    /// event and whether the stored value needs rewriting.
    pub fn from_attr(value: &Value) -> Option<(ConversionEvent, bool)> {
        match value {
            Value::Object(_) => serde_json::from_value::<ConversionEvent>(value.clone())
                .ok()
                .map(|ev| (ev, false)),
            Value::String(s) if s.contains('{') && s.contains('}') => {
                let first = s
                    .replace(['{', '}'], "")
                    .split(',')
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .to_string();
                Some((ConversionEvent::new(first, EventKind::Default), true))
            }
            Value::String(s) => Some((ConversionEvent::new(s.clone(), EventKind::Default), false)),
            _ => None,
        }
    }
}

/// Local mirror of one remote campaign. Money fields are currency minor
/// units; `cpa_goal` is never scaled on read or write.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct CampaignRecord {
    pub campaign_id: String,
    pub fb_account_id: String,
    #[serde(default)]
    pub campaign_name: Option<String>,
    #[serde(default)]
    pub campaign_type: Option<String>,
    #[serde(default)]
    pub budget: Option<i64>,
    #[serde(default)]
    pub cpa_goal: Option<i64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub conversion_event: Option<Value>,
    #[serde(default)]
    pub status: Option<String>,
    // Auto-expansion config; absent until expansion is first enabled
    #[serde(default)]
    pub expansion_enabled: Option<bool>,
    #[serde(default)]
    pub exp_number_of_ad_sets: Option<u32>,
    #[serde(default)]
    pub exp_adset_name_template: Option<String>,
    // Ad-optimization config; absent until optimization is first enabled
    #[serde(default)]
    pub optimization_enabled: Option<bool>,
    #[serde(default)]
    pub opt_number_of_ads: Option<u32>,
    #[serde(default)]
    pub auto_expand: Option<bool>,
    #[serde(default)]
    pub ad_optimizer: Option<bool>,
}

/// Canonical ad record. `ad_id` is the *creative* id: several remote ads
/// sharing one creative collapse to a single row.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AdRecord {
    pub ad_id: String,
    pub fb_account_id: String,
    #[serde(default)]
    pub ad_name: Option<String>,
    pub enabled: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub preview: Option<String>,
}

/// Join record: this ad's creative appears in this campaign.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CampaignAdLink {
    pub campaign_id: String,
    pub ad_id: String,
}

impl CampaignAdLink {
    pub fn sort_key(campaign_id: &str, ad_id: &str) -> String {
        format!("{}-{}", campaign_id, ad_id)
    }
}

/// Per (remote account, local user) link record, keyed by
/// `{fb_account_id}-{user_id}`.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct FbAccountRecord {
    pub fb_account_id: String,
    pub user_id: String,
    #[serde(default)]
    pub fb_access_token: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub account_type: Option<String>,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub status: Option<bool>,
    #[serde(default)]
    pub page_id: Option<String>,
    #[serde(default)]
    pub instagram_actor_id: Option<String>,
    #[serde(default)]
    pub pixel_id: Option<String>,
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub average_daily_budget: Option<i64>,
    #[serde(default)]
    pub conversion_event: Option<String>,
    #[serde(default)]
    pub plan: Option<String>,
}

impl FbAccountRecord {
    pub fn sort_key(fb_account_id: &str, user_id: &str) -> String {
        format!("{}-{}", fb_account_id, user_id)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Queued,
    Running,
    Done,
    Error,
}

/// One async task, polled by id. Status only ever moves forward; there is no
/// cancellation.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AsyncTaskRecord {
    pub task_id: String,
    pub task: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub result: Option<Value>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct UserRecord {
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub fb_account_id: Option<String>,
    #[serde(default)]
    pub fb_access_token: Option<String>,
    #[serde(default)]
    pub credits: Option<i64>,
}
