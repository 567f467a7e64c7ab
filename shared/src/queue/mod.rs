use std::env;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_sqs::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{Result, ServiceError};
use crate::models::{keys, AsyncTaskRecord, TaskStatus};
use crate::store::KvStore;

/// The message a queued task travels as, consumed by the worker Lambda.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TaskMessage {
    pub task: String,
    pub task_id: String,
    pub params: Value,
}

/// Queue collaborator: enqueue-only. A separate invocation consumes the
/// message and writes task status; callers poll by task id.
#[async_trait]
pub trait TaskQueue: Send + Sync + 'static {
    async fn enqueue(&self, message: &TaskMessage) -> Result<()>;
}

/// Creates the task record (`queued`) and enqueues the message. Returns the
/// generated task id for the caller to poll.
pub async fn start_async_task<S, Q>(store: &S, queue: &Q, task: &str, params: Value) -> Result<String>
where
    S: KvStore + ?Sized,
    Q: TaskQueue + ?Sized,
{
    let task_id = Uuid::new_v4().to_string();

    let record = AsyncTaskRecord {
        task_id: task_id.clone(),
        task: task.to_string(),
        status: TaskStatus::Queued,
        result: None,
    };
    store
        .create(
            keys::ASYNC_RESULT,
            &task_id,
            crate::models::to_attributes(&record)?,
        )
        .await?;

    tracing::info!("Launching {} task {}", task, task_id);

    queue
        .enqueue(&TaskMessage {
            task: task.to_string(),
            task_id: task_id.clone(),
            params,
        })
        .await?;

    Ok(task_id)
}

/// Persists a task's terminal state for polling.
pub async fn write_task_status<S>(
    store: &S,
    task_id: &str,
    status: TaskStatus,
    result: Option<Value>,
) -> Result<()>
where
    S: KvStore + ?Sized,
{
    let mut changes = serde_json::Map::new();
    changes.insert("status".to_string(), serde_json::to_value(status)?);
    if let Some(result) = result {
        changes.insert("result".to_string(), result);
    }
    store.update(keys::ASYNC_RESULT, task_id, changes).await
}

/// SQS-backed [`TaskQueue`].
pub struct SqsTaskQueue {
    client: Client,
    queue_url: String,
}

impl SqsTaskQueue {
    pub async fn new() -> Result<Self> {
        let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        let queue_url = env::var("SQS_URL")
            .map_err(|_| ServiceError::Internal("SQS_URL is not set".to_string()))?;

        Ok(Self {
            client: Client::new(&config),
            queue_url,
        })
    }

    pub fn with_client_and_url(client: Client, queue_url: String) -> Self {
        Self { client, queue_url }
    }
}

#[async_trait]
impl TaskQueue for SqsTaskQueue {
    async fn enqueue(&self, message: &TaskMessage) -> Result<()> {
        let body = json!({
            "task": message.task,
            "task_id": message.task_id,
            "params": message.params,
        });

        self.client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body.to_string())
            .message_group_id("start_async_task")
            .send()
            .await
            .map_err(|e| ServiceError::Internal(format!("SQS send_message error: {}", e)))?;

        Ok(())
    }
}
