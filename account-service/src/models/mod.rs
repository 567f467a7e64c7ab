use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Serialize, Clone, Debug)]
pub struct AccountInfo {
    pub name: Option<String>,
    pub id: Option<String>,
    pub status: Option<bool>,
    pub budget: Option<i64>,
    pub conversion_event: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct AccountListRequest {
    pub email: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct AccountStatusRequest {
    pub status: Option<Value>,
}

#[derive(Deserialize, Debug)]
pub struct ConversionEventRequest {
    pub conversion_event: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct InsightsRequest {
    /// Selectable-event tuples: `[title, [event id, kind]]`
    pub events_list: Option<Vec<Value>>,
}
