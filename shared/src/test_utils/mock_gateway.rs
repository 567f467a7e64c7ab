use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::{Result, ServiceError};
use crate::fb::{AdsGateway, BatchReply, BatchRequest, GatewayFactory, RemoteObject};
use crate::models::Attributes;

#[derive(Default)]
struct State {
    objects: HashMap<String, Attributes>,
    edges: HashMap<(String, String), Vec<String>>,
    previews: HashMap<String, Vec<String>>,
    insights: Vec<Value>,
    // object id / relative url -> error message, for direct and batched writes
    failed_calls: HashMap<String, String>,
    // (object id, edge) -> error message
    failed_edges: HashMap<(String, String), String>,
    update_log: Vec<(String, Attributes)>,
    batch_sizes: Vec<usize>,
    // video id -> (polls until ready, polls so far)
    video_polls: HashMap<String, (u32, u32)>,
    next_id: u64,
}

/// Scripted in-memory stand-in for the ads platform. Objects registered with
/// [`insert_object`](MockAdsGateway::insert_object) are mutated by direct and
/// batched writes, so tests can assert on final remote state the way the
/// store tests assert on final local state.
pub struct MockAdsGateway {
    state: Mutex<State>,
}

impl MockAdsGateway {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }

    pub fn insert_object(&self, id: &str, fields: Value) {
        let Value::Object(map) = fields else {
            panic!("mock object fields must be a JSON object");
        };
        self.state.lock().unwrap().objects.insert(id.to_string(), map);
    }

    pub fn set_edge(&self, id: &str, edge: &str, member_ids: &[&str]) {
        self.state.lock().unwrap().edges.insert(
            (id.to_string(), edge.to_string()),
            member_ids.iter().map(|s| s.to_string()).collect(),
        );
    }

    pub fn add_preview(&self, id: &str, body: &str) {
        self.state
            .lock()
            .unwrap()
            .previews
            .entry(id.to_string())
            .or_default()
            .push(body.to_string());
    }

    pub fn set_insights(&self, rows: Vec<Value>) {
        self.state.lock().unwrap().insights = rows;
    }

    /// Makes any write (direct or batched) against `id` fail with `message`.
    pub fn fail_call(&self, id: &str, message: &str) {
        self.state
            .lock()
            .unwrap()
            .failed_calls
            .insert(id.to_string(), message.to_string());
    }

    pub fn clear_failures(&self) {
        self.state.lock().unwrap().failed_calls.clear();
    }

    pub fn fail_edge(&self, id: &str, edge: &str, message: &str) {
        self.state
            .lock()
            .unwrap()
            .failed_edges
            .insert((id.to_string(), edge.to_string()), message.to_string());
    }

    /// Scripts a video object: ready after `ready_after` status polls.
    pub fn script_video(&self, id: &str, ready_after: u32) {
        self.state
            .lock()
            .unwrap()
            .video_polls
            .insert(id.to_string(), (ready_after, 0));
    }

    pub fn video_poll_count(&self, id: &str) -> u32 {
        self.state
            .lock()
            .unwrap()
            .video_polls
            .get(id)
            .map(|(_, polls)| *polls)
            .unwrap_or(0)
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.state.lock().unwrap().batch_sizes.clone()
    }

    pub fn object(&self, id: &str) -> Option<Attributes> {
        self.state.lock().unwrap().objects.get(id).cloned()
    }

    pub fn updates_for(&self, id: &str) -> Vec<Attributes> {
        self.state
            .lock()
            .unwrap()
            .update_log
            .iter()
            .filter(|(target, _)| target == id)
            .map(|(_, params)| params.clone())
            .collect()
    }

    fn apply_write(state: &mut State, id: &str, params: &Attributes) -> Result<()> {
        if let Some(message) = state.failed_calls.get(id) {
            return Err(ServiceError::RemoteApi(message.clone()));
        }
        state
            .update_log
            .push((id.to_string(), params.clone()));
        let entry = state.objects.entry(id.to_string()).or_default();
        for (key, value) in params {
            entry.insert(key.clone(), value.clone());
        }
        Ok(())
    }
}

impl Default for MockAdsGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AdsGateway for MockAdsGateway {
    async fn get_object(&self, id: &str, _fields: &[&str]) -> Result<RemoteObject> {
        let mut state = self.state.lock().unwrap();

        if let Some((ready_after, polls)) = state.video_polls.get_mut(id) {
            *polls += 1;
            let status = if *polls >= *ready_after {
                "ready"
            } else {
                "processing"
            };
            let fields = json!({"status": {"video_status": status}});
            let Value::Object(map) = fields else { unreachable!() };
            return Ok(RemoteObject::new(id, map));
        }

        state
            .objects
            .get(id)
            .map(|fields| RemoteObject::new(id, fields.clone()))
            .ok_or_else(|| ServiceError::RemoteApi(format!("Unsupported get request {}", id)))
    }

    async fn update_object(&self, id: &str, params: &Attributes) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        Self::apply_write(&mut state, id, params)
    }

    async fn delete_object(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(message) = state.failed_calls.get(id) {
            return Err(ServiceError::RemoteApi(message.clone()));
        }
        state.objects.remove(id);
        for members in state.edges.values_mut() {
            members.retain(|m| m != id);
        }
        Ok(())
    }

    async fn get_edge(
        &self,
        id: &str,
        edge: &str,
        _fields: &[&str],
        limit: Option<u32>,
    ) -> Result<Vec<RemoteObject>> {
        let state = self.state.lock().unwrap();
        let key = (id.to_string(), edge.to_string());

        if let Some(message) = state.failed_edges.get(&key) {
            return Err(ServiceError::RemoteApi(message.clone()));
        }

        let members = state.edges.get(&key).cloned().unwrap_or_default();
        let mut objects = Vec::new();
        for member in members {
            if let Some(fields) = state.objects.get(&member) {
                objects.push(RemoteObject::new(member, fields.clone()));
            }
            if let Some(limit) = limit {
                if objects.len() >= limit as usize {
                    break;
                }
            }
        }
        Ok(objects)
    }

    async fn create_on_edge(
        &self,
        id: &str,
        edge: &str,
        params: &Attributes,
    ) -> Result<RemoteObject> {
        let mut state = self.state.lock().unwrap();
        let key = (id.to_string(), edge.to_string());

        if let Some(message) = state.failed_edges.get(&key) {
            return Err(ServiceError::RemoteApi(message.clone()));
        }

        state.next_id += 1;
        let new_id = format!("gen_{}", state.next_id);
        state.objects.insert(new_id.clone(), params.clone());
        state.edges.entry(key).or_default().push(new_id.clone());
        Ok(RemoteObject::new(new_id, params.clone()))
    }

    async fn get_previews(&self, id: &str, _ad_format: &str) -> Result<Vec<String>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .previews
            .get(id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_insights(
        &self,
        _id: &str,
        _params: &Attributes,
        _fields: &[&str],
    ) -> Result<Vec<Value>> {
        Ok(self.state.lock().unwrap().insights.clone())
    }

    async fn execute_batch(&self, requests: &[BatchRequest]) -> Result<Vec<BatchReply>> {
        let mut state = self.state.lock().unwrap();
        state.batch_sizes.push(requests.len());

        let mut replies = Vec::with_capacity(requests.len());
        for request in requests {
            if let Some(message) = state.failed_calls.get(&request.relative_url) {
                replies.push(BatchReply {
                    code: 400,
                    body: json!({"error": {"message": message}}),
                });
                continue;
            }

            match request.method.as_str() {
                "GET" => {
                    let id = request
                        .relative_url
                        .split('?')
                        .next()
                        .unwrap_or_default()
                        .to_string();
                    match state.objects.get(&id) {
                        Some(fields) => {
                            let mut body = fields.clone();
                            body.insert("id".to_string(), json!(id));
                            replies.push(BatchReply {
                                code: 200,
                                body: Value::Object(body),
                            });
                        }
                        None => replies.push(BatchReply {
                            code: 404,
                            body: json!({"error": {"message": format!("Unknown object {}", id)}}),
                        }),
                    }
                    continue;
                }
                "POST" => {
                    let params = request.body.clone().unwrap_or_default();
                    state
                        .update_log
                        .push((request.relative_url.clone(), params.clone()));
                    let entry = state
                        .objects
                        .entry(request.relative_url.clone())
                        .or_default();
                    for (key, value) in params {
                        entry.insert(key, value);
                    }
                }
                "DELETE" => {
                    let id = request.relative_url.clone();
                    state.objects.remove(&id);
                    for members in state.edges.values_mut() {
                        members.retain(|m| m != &id);
                    }
                }
                _ => {}
            }
            replies.push(BatchReply {
                code: 200,
                body: json!({"success": true}),
            });
        }
        Ok(replies)
    }
}

/// [`GatewayFactory`] returning one shared scripted gateway no matter the
/// token, so tests can hold a handle to the same instance the handlers use.
pub struct MockGatewayFactory {
    gateway: Arc<MockAdsGateway>,
}

impl MockGatewayFactory {
    pub fn new(gateway: Arc<MockAdsGateway>) -> Self {
        Self { gateway }
    }
}

impl GatewayFactory for MockGatewayFactory {
    fn for_token(&self, _access_token: &str) -> Arc<dyn AdsGateway> {
        self.gateway.clone()
    }
}
