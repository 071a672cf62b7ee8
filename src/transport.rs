//! HTTP exchange behind a trait so the executor can run against any client.
//!
//! - `HttpTransport`: one request in, status + (bounded) body out
//! - `ReqwestTransport`: pooled reqwest client, safe to share across tasks
//! - `TransportError`: network-level failures, classified for reporting

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::errors::{IpEnrichError, Result};
use crate::sources::SourceRequest;

/// Raw outcome of a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
    /// The upstream sent more than the body limit; the rest was discarded.
    pub truncated: bool,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
            truncated: false,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    /// Headers arrived but the body could not be read.
    #[error("failed to read response body: {message}")]
    Body { status: u16, message: String },

    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// HTTP status seen before the failure, 0 when none.
    pub fn status(&self) -> u16 {
        match self {
            TransportError::Body { status, .. } => *status,
            _ => 0,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else if e.is_body() || e.is_decode() {
            TransportError::Body {
                status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                message: e.to_string(),
            }
        } else {
            TransportError::Other(e.to_string())
        }
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Perform `request`, keeping at most `max_body` bytes of the body.
    async fn send(
        &self,
        request: &SourceRequest,
        max_body: usize,
    ) -> std::result::Result<HttpResponse, TransportError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Client with an overall per-request `timeout`. Requests carrying their
    /// own (shorter) budget override it.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IpEnrichError::internal(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(
        &self,
        request: &SourceRequest,
        max_body: usize,
    ) -> std::result::Result<HttpResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let mut response = builder.send().await?;
        let status = response.status().as_u16();

        let mut body = Vec::new();
        let mut truncated = false;
        loop {
            let chunk = match response.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    return Err(match TransportError::from(e) {
                        TransportError::Timeout => TransportError::Timeout,
                        other => TransportError::Body {
                            status,
                            message: other.to_string(),
                        },
                    });
                }
            };
            if push_capped(&mut body, &chunk, max_body) {
                truncated = true;
                break;
            }
        }

        if truncated {
            tracing::debug!(url = %request.url, max_body, "response body truncated");
        }

        Ok(HttpResponse {
            status,
            body,
            truncated,
        })
    }
}

/// Append as much of `chunk` as fits under `max`. Returns true once bytes
/// had to be dropped.
fn push_capped(body: &mut Vec<u8>, chunk: &[u8], max: usize) -> bool {
    let room = max.saturating_sub(body.len());
    if chunk.len() > room {
        body.extend_from_slice(&chunk[..room]);
        return true;
    }
    body.extend_from_slice(chunk);
    false
}
