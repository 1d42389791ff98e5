//! Stub completion gateways.

use async_trait::async_trait;
use muse_rs_core::{ChatMessage, CompletionGateway, GatewayError};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Gateway returning canned responses in order; the last response repeats
/// once the queue drains.
pub struct FixedGateway {
    responses: Mutex<VecDeque<String>>,
    last: Mutex<String>,
}

impl FixedGateway {
    /// Create a gateway that always returns `response`.
    pub fn new(response: impl Into<String>) -> Arc<Self> {
        let response = response.into();
        Arc::new(Self {
            responses: Mutex::new(VecDeque::new()),
            last: Mutex::new(response),
        })
    }

    /// Create a gateway returning `responses` in order.
    pub fn with_responses(responses: impl IntoIterator<Item = String>) -> Arc<Self> {
        let queue: VecDeque<String> = responses.into_iter().collect();
        let last = queue.back().cloned().unwrap_or_default();
        Arc::new(Self {
            responses: Mutex::new(queue),
            last: Mutex::new(last),
        })
    }
}

#[async_trait]
impl CompletionGateway for FixedGateway {
    async fn complete(
        &self,
        _model: &str,
        _messages: &[ChatMessage],
    ) -> Result<String, GatewayError> {
        if let Some(next) = self.responses.lock().pop_front() {
            *self.last.lock() = next.clone();
            return Ok(next);
        }
        Ok(self.last.lock().clone())
    }
}

/// Requests captured by a [`RecordingGateway`].
pub type RecordedRequests = Arc<Mutex<Vec<(String, Vec<ChatMessage>)>>>;

/// Gateway that records every request and returns a fixed response.
pub struct RecordingGateway {
    response: String,
    seen: RecordedRequests,
}

impl RecordingGateway {
    /// Create a recording gateway and its capture sink.
    pub fn new(response: impl Into<String>) -> (Arc<Self>, RecordedRequests) {
        let seen: RecordedRequests = Arc::new(Mutex::new(Vec::new()));
        (
            Arc::new(Self {
                response: response.into(),
                seen: seen.clone(),
            }),
            seen,
        )
    }
}

#[async_trait]
impl CompletionGateway for RecordingGateway {
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<String, GatewayError> {
        self.seen
            .lock()
            .push((model.to_string(), messages.to_vec()));
        Ok(self.response.clone())
    }
}
