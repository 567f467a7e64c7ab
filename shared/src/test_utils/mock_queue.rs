use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::Result;
use crate::queue::{TaskMessage, TaskQueue};

/// Records enqueued messages so tests can consume them like the worker would.
pub struct MockTaskQueue {
    messages: Mutex<Vec<TaskMessage>>,
}

impl MockTaskQueue {
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
        }
    }

    pub fn messages(&self) -> Vec<TaskMessage> {
        self.messages.lock().unwrap().clone()
    }
}

impl Default for MockTaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskQueue for MockTaskQueue {
    async fn enqueue(&self, message: &TaskMessage) -> Result<()> {
        self.messages.lock().unwrap().push(message.clone());
        Ok(())
    }
}
