use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::models::Attributes;

pub mod graph;

pub use graph::{GraphApiClient, GraphApiFactory};

/// A request-scoped mirror of one remote Ads object (campaign, ad set, ad,
/// creative, ...). Never authoritative; the remote platform is.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RemoteObject {
    pub id: String,
    #[serde(flatten)]
    pub fields: Attributes,
}

impl RemoteObject {
    pub fn new(id: impl Into<String>, fields: Attributes) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    /// All fields except `id`, the shape replayed on update/revert.
    pub fn export(&self) -> Attributes {
        self.fields.clone()
    }
}

/// One call inside a platform batch request.
#[derive(Serialize, Clone, Debug)]
pub struct BatchRequest {
    pub method: String,
    pub relative_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Attributes>,
}

impl BatchRequest {
    /// Field-selection read; `fields` ride in the relative url.
    pub fn get(relative_url: impl Into<String>, fields: &[&str]) -> Self {
        Self {
            method: "GET".to_string(),
            relative_url: format!("{}?fields={}", relative_url.into(), fields.join(",")),
            body: None,
        }
    }

    pub fn post(relative_url: impl Into<String>, body: Attributes) -> Self {
        Self {
            method: "POST".to_string(),
            relative_url: relative_url.into(),
            body: Some(body),
        }
    }

    pub fn delete(relative_url: impl Into<String>) -> Self {
        Self {
            method: "DELETE".to_string(),
            relative_url: relative_url.into(),
            body: None,
        }
    }
}

/// Per-call outcome of a batch submission.
#[derive(Clone, Debug)]
pub struct BatchReply {
    pub code: u16,
    pub body: Value,
}

impl BatchReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }
}

/// Thin authenticated facade over the ads platform. Field-selection reads,
/// cursor-paginated edges, batched writes, insights.
#[async_trait]
pub trait AdsGateway: Send + Sync + 'static {
    /// Reads one object with the given fields.
    async fn get_object(&self, id: &str, fields: &[&str]) -> Result<RemoteObject>;

    /// Posts a field update to one object.
    async fn update_object(&self, id: &str, params: &Attributes) -> Result<()>;

    /// Deletes one object.
    async fn delete_object(&self, id: &str) -> Result<()>;

    /// Lists a paginated edge (e.g. a campaign's `adsets` or `ads`),
    /// following cursors until exhausted or `limit` objects were read.
    async fn get_edge(
        &self,
        id: &str,
        edge: &str,
        fields: &[&str],
        limit: Option<u32>,
    ) -> Result<Vec<RemoteObject>>;

    /// Creates an object on an edge (e.g. an ad under `act_<id>/ads`).
    async fn create_on_edge(&self, id: &str, edge: &str, params: &Attributes)
        -> Result<RemoteObject>;

    /// Rendered preview bodies for an ad or creative.
    async fn get_previews(&self, id: &str, ad_format: &str) -> Result<Vec<String>>;

    /// Time-ranged insight rows keyed by action type.
    async fn get_insights(&self, id: &str, params: &Attributes, fields: &[&str])
        -> Result<Vec<Value>>;

    /// Submits one platform batch (at most 50 calls; enforced by the batch
    /// executor, not here) and returns the per-call replies in order.
    async fn execute_batch(&self, requests: &[BatchRequest]) -> Result<Vec<BatchReply>>;
}

/// Builds a gateway bound to one caller's access token. Injected into router
/// state so tests can substitute a scripted fake.
pub trait GatewayFactory: Send + Sync + 'static {
    fn for_token(&self, access_token: &str) -> Arc<dyn AdsGateway>;
}

/// Ad-account object id, as the platform spells it.
pub fn act(account_id: &str) -> String {
    format!("act_{}", account_id)
}
