//! The network boundary.
//!
//! The engine only needs "post this request with this token, give me the
//! JSON reply". [`AgentTransport`] is that seam; [`http::HttpTransport`] is
//! the production implementation and tests supply scripted ones.

/// `http` module: the reqwest-backed transport.
pub mod http;

use async_trait::async_trait;
use serde_json::Value;

use crate::agent::config::BearerToken;
use crate::agent::message::ChatRequest;

/// Ways a call can fail to produce a JSON reply.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("agent API responded {status}: {body}")]
    Status { status: u16, body: String },
    #[error("agent API call failed: {0}")]
    Network(String),
    #[error("failed to decode agent API reply: {0}")]
    Decode(String),
    #[error("invalid request header: {0}")]
    Header(String),
    /// The request task stopped before producing a result.
    #[error("agent API call ended without a result")]
    Interrupted,
}

/// Executes one authenticated chat call.
#[async_trait]
pub trait AgentTransport: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Posts `request` with `token` as the bearer credential and returns the
    /// parsed reply body. Non-2xx statuses are errors.
    async fn post(&self, request: &ChatRequest, token: &BearerToken) -> Result<Value, TransportError>;
}
