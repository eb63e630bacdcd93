//! Transport abstraction for opening stream sessions

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use wander_proto::{EventStream, PlannerClient, Result, StreamRequest};

/// Opens one streaming exchange per call
///
/// Implementations only yield events. They never touch conversation state;
/// folding is the controller's job.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a `start` or `resume` session
    async fn open(&self, request: StreamRequest, cancel: CancellationToken) -> Result<EventStream>;
}

/// Transport over the planner HTTP API
pub struct HttpTransport {
    client: PlannerClient,
}

impl HttpTransport {
    pub fn from_client(client: PlannerClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open(&self, request: StreamRequest, cancel: CancellationToken) -> Result<EventStream> {
        self.client.open_stream(&request, cancel).await
    }
}
