use std::env;
use std::sync::Arc;

use aws_lambda_events::event::sqs::SqsEvent;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use tracing::{error, info};

use adflow_shared::fb::{GatewayFactory, GraphApiFactory};
use adflow_shared::queue::TaskMessage;
use adflow_shared::store::dynamo::DynamoKvStore;
use adflow_shared::store::KvStore;

mod handlers;
mod reconcile;

#[cfg(test)]
mod tests;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .with_ansi(false)
        .init();

    info!("Starting campaign worker Lambda");

    let store = Arc::new(DynamoKvStore::new().await);
    let gateways: Arc<dyn GatewayFactory> = Arc::new(GraphApiFactory::new());

    lambda_runtime::run(service_fn(|event| {
        handler(event, store.clone(), gateways.clone())
    }))
    .await?;
    Ok(())
}

/// Consumes one SQS batch. Every record is acknowledged regardless of task
/// outcome; failures live in the task record, not the queue.
pub async fn handler<S>(
    event: LambdaEvent<SqsEvent>,
    store: Arc<S>,
    gateways: Arc<dyn GatewayFactory>,
) -> Result<(), Error>
where
    S: KvStore,
{
    for record in event.payload.records {
        let Some(body) = record.body else {
            error!("SQS record with no body");
            continue;
        };

        let message = match serde_json::from_str::<TaskMessage>(&body) {
            Ok(message) => message,
            Err(err) => {
                error!("Failed to parse task message: {} ({})", err, body);
                continue;
            }
        };

        if let Err(err) =
            handlers::handle_task_message(store.clone(), gateways.clone(), &message).await
        {
            // Status writes are the only fallible part left; the queue does
            // not retry, so log and move on.
            error!(task_id = %message.task_id, "Failed to record task status: {}", err);
        }
    }

    Ok(())
}
