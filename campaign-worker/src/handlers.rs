use std::sync::Arc;

use serde_json::json;

use adflow_shared::error::{Result, ServiceError};
use adflow_shared::fb::GatewayFactory;
use adflow_shared::models::TaskStatus;
use adflow_shared::queue::{write_task_status, TaskMessage};
use adflow_shared::store::KvStore;

use crate::reconcile::{self, UpdateCampaignParams};

/// Runs one queued task end to end: `running`, then the reconciliation, then
/// `done` with the serialized result or `error` with the failure message.
/// Never returns the task's own failure — the message is acknowledged either
/// way; callers learn the outcome by polling.
pub async fn handle_task_message<S>(
    store: Arc<S>,
    gateways: Arc<dyn GatewayFactory>,
    message: &TaskMessage,
) -> Result<()>
where
    S: KvStore,
{
    tracing::info!(task = %message.task, task_id = %message.task_id, "Processing task");

    write_task_status(&*store, &message.task_id, TaskStatus::Running, None).await?;

    let outcome = run_task(&*store, &*gateways, message).await;

    match outcome {
        Ok(result) => {
            write_task_status(&*store, &message.task_id, TaskStatus::Done, Some(result)).await
        }
        Err(err) => {
            tracing::error!(task_id = %message.task_id, "Task failed: {}", err);
            write_task_status(
                &*store,
                &message.task_id,
                TaskStatus::Error,
                Some(json!({"error": task_error_message(&err)})),
            )
            .await
        }
    }
}

async fn run_task(
    store: &dyn KvStore,
    gateways: &dyn GatewayFactory,
    message: &TaskMessage,
) -> Result<serde_json::Value> {
    match message.task.as_str() {
        "update_campaign" => {
            let params: UpdateCampaignParams = serde_json::from_value(message.params.clone())
                .map_err(|e| {
                    ServiceError::Internal(format!("Invalid update_campaign params: {}", e))
                })?;
            let done = reconcile::update_campaign(store, gateways, &params).await?;
            Ok(json!(done))
        }
        other => Err(ServiceError::Internal(format!("Unknown task: {}", other))),
    }
}

// The task record's error payload carries the curated message, not the
// variant prefix.
fn task_error_message(err: &ServiceError) -> String {
    match err {
        ServiceError::Internal(msg) => msg.clone(),
        other => other.to_string(),
    }
}
