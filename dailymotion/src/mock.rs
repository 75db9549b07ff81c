//! An in-memory [`Transport`] for tests.
//!
//! Responses are queued up front and handed out in order; every request is recorded so tests can
//! assert on what was sent.

use crate::transport::{ApiRequest, ApiResponse, Transport};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A file upload seen by [`MockTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedUpload {
    pub url: String,
    pub file_name: String,
    pub size: usize,
}

#[derive(Debug, Default)]
struct MockState {
    responses: VecDeque<Result<ApiResponse, String>>,
    requests: Vec<ApiRequest>,
    uploads: Vec<RecordedUpload>,
}

/// Clones share the same queue and recordings.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues a response with the given status and body.
    pub fn respond(&self, status: u16, body: impl Into<String>) -> &Self {
        self.state()
            .responses
            .push_back(Ok(ApiResponse::new(status, body)));
        self
    }

    /// Queues a transport-level failure (no response at all).
    pub fn fail(&self, message: impl Into<String>) -> &Self {
        self.state().responses.push_back(Err(message.into()));
        self
    }

    /// Every request sent so far, oldest first.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.state().requests.clone()
    }

    pub fn last_request(&self) -> Option<ApiRequest> {
        self.state().requests.last().cloned()
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.state().uploads.clone()
    }

    /// Number of queued responses not yet consumed.
    pub fn pending(&self) -> usize {
        self.state().responses.len()
    }

    fn next_response(state: &mut MockState) -> eyre::Result<ApiResponse> {
        match state.responses.pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(eyre::eyre!(message)),
            None => Err(eyre::eyre!("mock transport has no response queued")),
        }
    }
}

impl Transport for MockTransport {
    async fn send(&self, request: ApiRequest) -> eyre::Result<ApiResponse> {
        tracing::debug!(?request, "mock transport received request");
        let mut state = self.state();
        state.requests.push(request);
        Self::next_response(&mut state)
    }

    async fn upload(
        &self,
        url: &str,
        file_name: &str,
        contents: Vec<u8>,
    ) -> eyre::Result<ApiResponse> {
        let mut state = self.state();
        state.uploads.push(RecordedUpload {
            url: url.to_string(),
            file_name: file_name.to_string(),
            size: contents.len(),
        });
        Self::next_response(&mut state)
    }
}
