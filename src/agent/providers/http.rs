use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::Value;

use crate::agent::config::{ApiEnvironment, BearerToken};
use crate::agent::message::ChatRequest;

use super::{AgentTransport, TransportError};

/// `AgentTransport` over HTTPS with `reqwest`.
pub struct HttpTransport {
    endpoint: String,
    client: Client,
}

impl HttpTransport {
    /// Creates a transport for `env.endpoint`, applying `env.timeout` to
    /// every call when set.
    pub fn new(env: &ApiEnvironment) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder();
        if let Some(timeout) = env.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            endpoint: env.endpoint.clone(),
            client: builder.build()?,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl AgentTransport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    async fn post(&self, request: &ChatRequest, token: &BearerToken) -> Result<Value, TransportError> {
        let headers = build_headers(token)?;
        debug!("POST {}", self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .headers(headers)
            .json(request)
            .send()
            .await
            .map_err(|err| TransportError::Network(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|err| TransportError::Network(err.to_string()))?;
        serde_json::from_str(&body).map_err(|err| TransportError::Decode(err.to_string()))
    }
}

/// JSON content type plus `Authorization: Bearer <token>`.
fn build_headers(token: &BearerToken) -> Result<HeaderMap, TransportError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token.as_str()))
        .map_err(|err| TransportError::Header(err.to_string()))?;
    value.set_sensitive(true);
    headers.insert(AUTHORIZATION, value);
    Ok(headers)
}
