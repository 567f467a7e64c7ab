use std::env;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Result, ServiceError};
use crate::models::Attributes;

use super::{AdsGateway, BatchReply, BatchRequest, GatewayFactory, RemoteObject};

const DEFAULT_GRAPH_URL: &str = "https://graph.facebook.com/v19.0";

/// Graph API client bound to one access token.
pub struct GraphApiClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl GraphApiClient {
    pub fn new(http: reqwest::Client, base_url: String, access_token: String) -> Self {
        Self {
            http,
            base_url,
            access_token,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Decodes a Graph response, turning platform error bodies into
    /// `ServiceError::RemoteApi` with the most readable message.
    async fn decode(response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        let body: Value = response.json().await.map_err(|e| {
            ServiceError::RemoteApi(format!("Invalid Facebook API response: {}", e))
        })?;
        if !status.is_success() || body.get("error").is_some() {
            return Err(ServiceError::from_graph_error(&body));
        }
        Ok(body)
    }

    fn object_from_value(value: Value) -> Result<RemoteObject> {
        serde_json::from_value(value)
            .map_err(|e| ServiceError::RemoteApi(format!("Malformed Facebook object: {}", e)))
    }
}

#[derive(Deserialize)]
struct EdgePage {
    #[serde(default)]
    data: Vec<Value>,
    #[serde(default)]
    paging: Option<Paging>,
}

#[derive(Deserialize)]
struct Paging {
    #[serde(default)]
    cursors: Option<Cursors>,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Deserialize)]
struct Cursors {
    #[serde(default)]
    after: Option<String>,
}

#[async_trait]
impl AdsGateway for GraphApiClient {
    async fn get_object(&self, id: &str, fields: &[&str]) -> Result<RemoteObject> {
        let response = self
            .http
            .get(self.url(id))
            .query(&[
                ("fields", fields.join(",").as_str()),
                ("access_token", self.access_token.as_str()),
            ])
            .send()
            .await?;
        Self::object_from_value(Self::decode(response).await?)
    }

    async fn update_object(&self, id: &str, params: &Attributes) -> Result<()> {
        let response = self
            .http
            .post(self.url(id))
            .query(&[("access_token", &self.access_token)])
            .json(params)
            .send()
            .await?;
        Self::decode(response).await?;
        Ok(())
    }

    async fn delete_object(&self, id: &str) -> Result<()> {
        let response = self
            .http
            .delete(self.url(id))
            .query(&[("access_token", &self.access_token)])
            .send()
            .await?;
        Self::decode(response).await?;
        Ok(())
    }

    async fn get_edge(
        &self,
        id: &str,
        edge: &str,
        fields: &[&str],
        limit: Option<u32>,
    ) -> Result<Vec<RemoteObject>> {
        let mut objects = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let mut query = vec![
                ("fields".to_string(), fields.join(",")),
                ("access_token".to_string(), self.access_token.clone()),
            ];
            if let Some(limit) = limit {
                query.push(("limit".to_string(), limit.to_string()));
            }
            if let Some(cursor) = &after {
                query.push(("after".to_string(), cursor.clone()));
            }

            let response = self
                .http
                .get(self.url(&format!("{}/{}", id, edge)))
                .query(&query)
                .send()
                .await?;
            let page: EdgePage = serde_json::from_value(Self::decode(response).await?)
                .map_err(|e| ServiceError::RemoteApi(format!("Malformed edge page: {}", e)))?;

            for value in page.data {
                objects.push(Self::object_from_value(value)?);
                if let Some(limit) = limit {
                    if objects.len() >= limit as usize {
                        return Ok(objects);
                    }
                }
            }

            after = page
                .paging
                .as_ref()
                .filter(|p| p.next.is_some())
                .and_then(|p| p.cursors.as_ref())
                .and_then(|c| c.after.clone());
            if after.is_none() {
                return Ok(objects);
            }
        }
    }

    async fn create_on_edge(
        &self,
        id: &str,
        edge: &str,
        params: &Attributes,
    ) -> Result<RemoteObject> {
        let response = self
            .http
            .post(self.url(&format!("{}/{}", id, edge)))
            .query(&[("access_token", &self.access_token)])
            .json(params)
            .send()
            .await?;
        Self::object_from_value(Self::decode(response).await?)
    }

    // The previews edge takes ad_format as a query param rather than a field
    // selection, so it doesn't go through get_edge.
    async fn get_previews(&self, id: &str, ad_format: &str) -> Result<Vec<String>> {
        let response = self
            .http
            .get(self.url(&format!("{}/previews", id)))
            .query(&[
                ("ad_format", ad_format),
                ("access_token", self.access_token.as_str()),
            ])
            .send()
            .await?;
        let page: EdgePage = serde_json::from_value(Self::decode(response).await?)
            .map_err(|e| ServiceError::RemoteApi(format!("Malformed previews page: {}", e)))?;
        Ok(page
            .data
            .into_iter()
            .filter_map(|v| v["body"].as_str().map(str::to_string))
            .collect())
    }

    async fn get_insights(
        &self,
        id: &str,
        params: &Attributes,
        fields: &[&str],
    ) -> Result<Vec<Value>> {
        let mut query = vec![
            ("fields".to_string(), fields.join(",")),
            ("access_token".to_string(), self.access_token.clone()),
        ];
        for (key, value) in params {
            let rendered = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            query.push((key.clone(), rendered));
        }

        let response = self
            .http
            .get(self.url(&format!("{}/insights", id)))
            .query(&query)
            .send()
            .await?;
        let page: EdgePage = serde_json::from_value(Self::decode(response).await?)
            .map_err(|e| ServiceError::RemoteApi(format!("Malformed insights page: {}", e)))?;
        Ok(page.data)
    }

    async fn execute_batch(&self, requests: &[BatchRequest]) -> Result<Vec<BatchReply>> {
        #[derive(Deserialize)]
        struct RawReply {
            code: u16,
            body: Option<String>,
        }

        let batch = serde_json::to_string(requests)?;
        let response = self
            .http
            .post(format!("{}/", self.base_url))
            .form(&[
                ("batch", batch.as_str()),
                ("include_headers", "false"),
                ("access_token", self.access_token.as_str()),
            ])
            .send()
            .await?;
        let body = Self::decode(response).await?;

        let raw: Vec<Option<RawReply>> = serde_json::from_value(body)
            .map_err(|e| ServiceError::RemoteApi(format!("Malformed batch reply: {}", e)))?;

        let mut replies = Vec::with_capacity(raw.len());
        for entry in raw {
            match entry {
                Some(reply) => {
                    let parsed = reply
                        .body
                        .as_deref()
                        .and_then(|b| serde_json::from_str(b).ok())
                        .unwrap_or(Value::Null);
                    replies.push(BatchReply {
                        code: reply.code,
                        body: parsed,
                    });
                }
                // The platform reports timed-out batch slots as null
                None => replies.push(BatchReply {
                    code: 0,
                    body: Value::Null,
                }),
            }
        }
        Ok(replies)
    }
}

/// Production [`GatewayFactory`]: one shared HTTP connection pool, one
/// client per caller token.
pub struct GraphApiFactory {
    http: reqwest::Client,
    base_url: String,
}

impl GraphApiFactory {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: env::var("FB_GRAPH_URL").unwrap_or_else(|_| DEFAULT_GRAPH_URL.to_string()),
        }
    }
}

impl Default for GraphApiFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl GatewayFactory for GraphApiFactory {
    fn for_token(&self, access_token: &str) -> Arc<dyn AdsGateway> {
        Arc::new(GraphApiClient::new(
            self.http.clone(),
            self.base_url.clone(),
            access_token.to_string(),
        ))
    }
}
