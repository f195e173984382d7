//! Transport abstraction for the dispatcher.
//!
//! `ContentClient` never opens sockets itself. It hands a fully built
//! [`HttpRequest`] to a [`Transport`] and gets an [`HttpResponse`] back, so
//! the same dispatch code runs against a real HTTP stack or an in-memory
//! fake in tests.
//!
//! ## Implementations
//!
//! - [`ReqwestTransport`]: `reqwest`-backed transport (feature `reqwest`)
//! - [`StaticTransport`]: replays one canned response, for tests and demos

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse};

/// Executes one HTTP request.
///
/// Implementations should stop early once `cancel` fires and return
/// [`TransportError::Cancelled`]. The dispatcher also races the call
/// against the token, so a transport that ignores it is still cancelled.
/// Non-2xx statuses are responses, not errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(
        &self,
        request: HttpRequest,
        cancel: CancellationToken,
    ) -> Result<HttpResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn execute(
        &self,
        request: HttpRequest,
        cancel: CancellationToken,
    ) -> Result<HttpResponse, TransportError> {
        (**self).execute(request, cancel).await
    }
}

/// Answers every request with the same response and records the requests.
#[derive(Debug)]
pub struct StaticTransport {
    response: HttpResponse,
    requests: Mutex<Vec<HttpRequest>>,
}

impl StaticTransport {
    pub fn new(response: HttpResponse) -> Self {
        Self {
            response,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Convenience for a JSON body with the given status.
    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        Self::new(HttpResponse {
            status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: body.to_string(),
        })
    }

    /// Requests seen so far, oldest first.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Transport for StaticTransport {
    async fn execute(
        &self,
        request: HttpRequest,
        cancel: CancellationToken,
    ) -> Result<HttpResponse, TransportError> {
        if cancel.is_cancelled() {
            return Err(TransportError::Cancelled);
        }
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        Ok(self.response.clone())
    }
}

#[cfg(feature = "reqwest")]
pub use self::reqwest_transport::ReqwestTransport;

#[cfg(feature = "reqwest")]
mod reqwest_transport {
    use super::*;

    /// `reqwest::Client`-backed transport. Cloning shares the connection pool.
    #[derive(Debug, Clone, Default)]
    pub struct ReqwestTransport {
        client: reqwest::Client,
    }

    impl ReqwestTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_client(client: reqwest::Client) -> Self {
            Self { client }
        }

        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, reqwest::Error> {
            let mut builder = self.client.get(&request.url);
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            let response = builder.send().await?;
            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|v| (name.as_str().to_string(), v.to_string()))
                })
                .collect();
            let body = response.text().await?;
            Ok(HttpResponse {
                status,
                headers,
                body,
            })
        }
    }

    #[async_trait]
    impl Transport for ReqwestTransport {
        async fn execute(
            &self,
            request: HttpRequest,
            cancel: CancellationToken,
        ) -> Result<HttpResponse, TransportError> {
            tokio::select! {
                _ = cancel.cancelled() => Err(TransportError::Cancelled),
                result = self.send(request) => result.map_err(TransportError::failed),
            }
        }
    }
}
