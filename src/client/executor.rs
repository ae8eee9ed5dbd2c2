//! Network executor seam.
//!
//! The client never talks to the network itself; the host supplies an
//! executor that performs the actual HTTP call.

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::client::RequestSpec;
use crate::error::Result;

// == Network Executor ==
#[async_trait]
pub trait NetworkExecutor: Send + Sync {
    /// Performs `request`. Implementations should stop early and return
    /// `OrchestratorError::Cancelled` once `token` is cancelled; failures are
    /// reported as `OrchestratorError::NetworkFailure`.
    async fn execute(&self, request: &RequestSpec, token: CancellationToken) -> Result<Value>;
}
