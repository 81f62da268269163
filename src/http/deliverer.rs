//! The `Deliverer` trait issues one POST and collapses every possible
//! outcome into `DeliveryOutcome` - a response (any status, including 5xx)
//! or a transport error. DNS failures, connect failures, TLS failures, and
//! timeouts are all `TransportError`; only a status code we actually saw on
//! the wire counts as `Response`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

/// Bytes of response body kept for the attempt log and for classification.
pub const RESPONSE_BODY_SNIPPET_LIMIT: usize = 2000;

#[derive(Debug, Clone)]
pub enum DeliveryOutcome {
    Response {
        status_code: u16,
        body_snippet: String,
    },
    TransportError {
        message: String,
    },
}

#[async_trait]
pub trait Deliverer: Send + Sync {
    async fn deliver(
        &self,
        target_url: &str,
        body: Vec<u8>,
        headers: Vec<(&'static str, String)>,
        timeout: Duration,
    ) -> DeliveryOutcome;
}

/// Production implementation backed by a shared `reqwest::Client`.
pub struct ReqwestDeliverer {
    client: Client,
}

impl ReqwestDeliverer {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Default for ReqwestDeliverer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Deliverer for ReqwestDeliverer {
    async fn deliver(
        &self,
        target_url: &str,
        body: Vec<u8>,
        headers: Vec<(&'static str, String)>,
        timeout: Duration,
    ) -> DeliveryOutcome {
        let mut request = self.client.post(target_url).timeout(timeout);
        for (name, value) in headers {
            request = request.header(name, value);
        }

        match request.body(body).send().await {
            Ok(response) => {
                let status_code = response.status().as_u16();
                let body_bytes = response.bytes().await.unwrap_or_default();
                let truncated = &body_bytes[..body_bytes.len().min(RESPONSE_BODY_SNIPPET_LIMIT)];
                let body_snippet = String::from_utf8_lossy(truncated).into_owned();

                DeliveryOutcome::Response {
                    status_code,
                    body_snippet,
                }
            }
            Err(e) => DeliveryOutcome::TransportError {
                message: e.to_string(),
            },
        }
    }
}
