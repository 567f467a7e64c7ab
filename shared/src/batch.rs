use serde_json::Value;

use crate::error::{Result, ServiceError};
use crate::fb::{AdsGateway, BatchRequest};

/// The platform's max batch size. There is no reason to use a smaller one.
pub const BATCH_SIZE: usize = 50;

/// Outcome of one submitted call, tagged with the metadata supplied when the
/// call was pushed.
#[derive(Debug)]
pub struct BatchOutcome {
    pub reply: std::result::Result<Value, ServiceError>,
    pub metadata: Option<Value>,
}

impl BatchOutcome {
    pub fn is_success(&self) -> bool {
        self.reply.is_ok()
    }
}

pub fn successes(outcomes: &[BatchOutcome]) -> impl Iterator<Item = &BatchOutcome> {
    outcomes.iter().filter(|o| o.is_success())
}

pub fn failures(outcomes: &[BatchOutcome]) -> impl Iterator<Item = &BatchOutcome> {
    outcomes.iter().filter(|o| !o.is_success())
}

/// Collects remote mutation calls and submits them in platform batches of at
/// most [`BATCH_SIZE`], so call sites never think about the limit.
///
/// With `raise_on_failure`, the first failed call is returned as an error —
/// but only after every batch has been submitted; later failures are
/// swallowed. This mirrors the platform's fire-and-forget batch semantics,
/// not a transactional abort.
pub struct BatchExecutor {
    calls: Vec<(BatchRequest, Option<Value>)>,
    raise_on_failure: bool,
}

impl BatchExecutor {
    pub fn new(raise_on_failure: bool) -> Self {
        Self {
            calls: Vec::new(),
            raise_on_failure,
        }
    }

    pub fn push(&mut self, request: BatchRequest) {
        self.calls.push((request, None));
    }

    /// Pushes a call whose outcome should carry `metadata`, so the caller can
    /// correlate replies with its own state.
    pub fn push_with_metadata(&mut self, request: BatchRequest, metadata: Value) {
        self.calls.push((request, Some(metadata)));
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Submits every pushed call and returns one outcome per call, in
    /// submission order.
    pub async fn execute(self, gateway: &dyn AdsGateway) -> Result<Vec<BatchOutcome>> {
        let mut outcomes = Vec::with_capacity(self.calls.len());
        let mut first_failure: Option<ServiceError> = None;

        for chunk in self.calls.chunks(BATCH_SIZE) {
            let requests: Vec<BatchRequest> = chunk.iter().map(|(r, _)| r.clone()).collect();
            let replies = gateway.execute_batch(&requests).await?;

            for ((_, metadata), reply) in chunk.iter().zip(replies) {
                if reply.is_success() {
                    outcomes.push(BatchOutcome {
                        reply: Ok(reply.body),
                        metadata: metadata.clone(),
                    });
                } else {
                    tracing::info!("Batch call failed: {}", reply.body);
                    if first_failure.is_none() {
                        first_failure = Some(ServiceError::from_graph_error(&reply.body));
                    }
                    outcomes.push(BatchOutcome {
                        reply: Err(ServiceError::from_graph_error(&reply.body)),
                        metadata: metadata.clone(),
                    });
                }
            }
        }

        if self.raise_on_failure {
            if let Some(err) = first_failure {
                return Err(err);
            }
        }

        Ok(outcomes)
    }
}
