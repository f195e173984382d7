//! Request dispatch for the content API.
//!
//! # Design
//! `ContentClient` holds only immutable configuration and a default
//! transport, so concurrent dispatches share nothing mutable. A dispatch is
//! split into two pure halves around one network call:
//! `build_request` turns `DispatchOptions` into an `HttpRequest` (or a
//! `UsageError`, before any I/O) and `parse_response` turns the
//! `HttpResponse` into a typed envelope or a classified failure. The
//! optional observer sees the raw response between the two, whatever the
//! outcome.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::classify::classify;
use crate::config::ClientConfig;
use crate::error::{ClientError, TransportError, UsageError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::media::{media_url, MediaUrlOptions};
use crate::query::encode_query;
use crate::transport::Transport;
use crate::types::{server_relative, Envelope, Media, Query, Resource};

/// Callback run with the raw response before its body is interpreted.
pub type ResponseObserver = Arc<dyn Fn(&HttpResponse) + Send + Sync>;

/// Endpoint form of a dispatch target: `{name}[/{id}][?{query}]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub name: String,
    pub id: Option<String>,
    pub query: Option<Query>,
}

impl Endpoint {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            query: None,
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn query(mut self, query: Query) -> Self {
        self.query = Some(query);
        self
    }
}

/// Inputs of one dispatch. Supply `path` or `endpoint`; `path` wins if both
/// are set.
#[derive(Clone, Default)]
pub struct DispatchOptions {
    pub path: Option<String>,
    pub endpoint: Option<Endpoint>,
    pub cancel: Option<CancellationToken>,
    pub observer: Option<ResponseObserver>,
    /// Replaces the client's transport for this call only.
    pub transport: Option<Arc<dyn Transport>>,
}

impl DispatchOptions {
    pub fn path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn endpoint(endpoint: Endpoint) -> Self {
        Self {
            endpoint: Some(endpoint),
            ..Self::default()
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(&HttpResponse) + Send + Sync + 'static,
    {
        self.observer = Some(Arc::new(observer));
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }
}

impl fmt::Debug for DispatchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchOptions")
            .field("path", &self.path)
            .field("endpoint", &self.endpoint)
            .field("cancel", &self.cancel)
            .field("observer", &self.observer.is_some())
            .field("transport", &self.transport.is_some())
            .finish()
    }
}

/// Async client for the content API.
#[derive(Clone)]
pub struct ContentClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for ContentClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ContentClient {
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    /// Client over the default `reqwest` transport.
    #[cfg(feature = "reqwest")]
    pub fn with_reqwest(config: ClientConfig) -> Self {
        Self::new(config, Arc::new(crate::transport::ReqwestTransport::new()))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Resolve the target URL and headers of a dispatch.
    pub fn build_request(&self, options: &DispatchOptions) -> Result<HttpRequest, UsageError> {
        let url = match (&options.path, &options.endpoint) {
            (Some(path), _) => self.path_url(path)?,
            (None, Some(endpoint)) => self.endpoint_url(endpoint),
            (None, None) => return Err(UsageError::MissingTarget),
        };

        let mut headers = vec![("accept".to_string(), "application/json".to_string())];
        if let Some(key) = &self.config.public_key {
            headers.push((self.config.auth_header.clone(), key.clone()));
        }

        Ok(HttpRequest {
            method: HttpMethod::Get,
            url,
            headers,
        })
    }

    fn path_url(&self, path: &str) -> Result<String, UsageError> {
        let path = server_relative(path);
        let prefix = self.config.version_prefix();
        let versioned = path
            .strip_prefix(prefix.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(|c| c == '/' || c == '?'));
        if !versioned {
            return Err(UsageError::PathMissingVersion {
                path,
                version: self.config.api_version.clone(),
            });
        }
        Ok(format!("{}{path}", self.config.domain))
    }

    fn endpoint_url(&self, endpoint: &Endpoint) -> String {
        let mut url = format!(
            "{}/{}/{}",
            self.config.domain, self.config.api_version, endpoint.name
        );
        if let Some(id) = &endpoint.id {
            url.push('/');
            url.push_str(&urlencoding::encode(id));
        }
        url.push_str(&encode_query(endpoint.query.as_ref()));
        url
    }

    /// Interpret a raw response: parse the body, then classify it.
    pub fn parse_response<T: DeserializeOwned>(
        &self,
        response: &HttpResponse,
    ) -> Result<Envelope<T>, ClientError> {
        let body: Value = serde_json::from_str(&response.body).map_err(|e| ClientError::Api {
            status: response.status,
            title: "Invalid response body".to_string(),
            detail: e.to_string(),
        })?;

        if let Err(err) = classify(&body, response.status) {
            debug!(status = response.status, error = %err, "dispatch: server reported failure");
            return Err(err);
        }

        serde_json::from_value(body).map_err(|e| ClientError::Api {
            status: response.status,
            title: "Unexpected response shape".to_string(),
            detail: e.to_string(),
        })
    }

    /// Issue one request and return its typed envelope.
    pub async fn dispatch<T: DeserializeOwned>(
        &self,
        options: DispatchOptions,
    ) -> Result<Envelope<T>, ClientError> {
        let request = self.build_request(&options)?;
        let transport = options
            .transport
            .clone()
            .unwrap_or_else(|| Arc::clone(&self.transport));
        let cancel = options.cancel.clone().unwrap_or_default();

        debug!(url = %request.url, "dispatch: sending request");
        let url = request.url.clone();
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TransportError::Cancelled),
            result = transport.execute(request, cancel.clone()) => result,
        };
        let response = match result {
            Ok(response) => response,
            Err(err) => {
                warn!(url = %url, error = %err, "dispatch: transport failure");
                return Err(err.into());
            }
        };
        debug!(url = %url, status = response.status, "dispatch: response received");

        if let Some(observer) = &options.observer {
            observer(&response);
        }

        self.parse_response(&response)
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: Endpoint) -> Result<Envelope<T>, ClientError> {
        self.dispatch(DispatchOptions::endpoint(endpoint)).await
    }

    pub async fn posts(&self, query: Query) -> Result<Envelope<Vec<Resource>>, ClientError> {
        self.get(Endpoint::new("posts").query(query)).await
    }

    pub async fn post(&self, id: &str, query: Query) -> Result<Envelope<Resource>, ClientError> {
        self.get(Endpoint::new("posts").id(id).query(query)).await
    }

    pub async fn categories(&self, query: Query) -> Result<Envelope<Vec<Resource>>, ClientError> {
        self.get(Endpoint::new("categories").query(query)).await
    }

    pub async fn category(&self, id: &str) -> Result<Envelope<Resource>, ClientError> {
        self.get(Endpoint::new("categories").id(id)).await
    }

    pub async fn media(&self, id: &str) -> Result<Envelope<Resource>, ClientError> {
        self.get(Endpoint::new("media").id(id)).await
    }

    pub async fn authors(&self, query: Query) -> Result<Envelope<Vec<Resource>>, ClientError> {
        self.get(Endpoint::new("authors").query(query)).await
    }

    pub async fn terms(&self, query: Query) -> Result<Envelope<Vec<Resource>>, ClientError> {
        self.get(Endpoint::new("terms").query(query)).await
    }

    /// Follow `links.next` of `envelope`; `None` on the last page.
    pub async fn next_page<T: DeserializeOwned>(
        &self,
        envelope: &Envelope<T>,
    ) -> Result<Option<Envelope<T>>, ClientError> {
        match envelope.next_path() {
            Some(path) => self.dispatch(DispatchOptions::path(path)).await.map(Some),
            None => Ok(None),
        }
    }

    /// Asset URL of `media` on the configured media domain.
    pub fn media_url(
        &self,
        media: Media<'_>,
        options: &MediaUrlOptions,
    ) -> Result<String, UsageError> {
        media_url(self.config.media_domain(), media, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::StaticTransport;
    use crate::types::{Filter, ResourceType};
    use serde_json::json;
    use std::sync::Mutex;

    const DOMAIN: &str = "http://localhost:3000";

    fn client_with(transport: Arc<StaticTransport>) -> ContentClient {
        ContentClient::new(ClientConfig::new(DOMAIN), transport)
    }

    fn client() -> ContentClient {
        client_with(Arc::new(StaticTransport::json(200, &json!({"data": []}))))
    }

    #[test]
    fn path_is_joined_to_domain() {
        let req = client()
            .build_request(&DispatchOptions::path("/v1/posts?page[number]=2"))
            .unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:3000/v1/posts?page[number]=2");
        assert_eq!(req.header("accept"), Some("application/json"));
        assert_eq!(req.headers.len(), 1);
    }

    #[test]
    fn absolute_path_keeps_path_and_query() {
        let req = client()
            .build_request(&DispatchOptions::path(
                "https://elsewhere.example.com/v1/posts?page[number]=3",
            ))
            .unwrap();
        assert_eq!(req.url, "http://localhost:3000/v1/posts?page[number]=3");
    }

    #[test]
    fn path_without_version_is_rejected() {
        let err = client()
            .build_request(&DispatchOptions::path("/posts"))
            .unwrap_err();
        assert_eq!(
            err,
            UsageError::PathMissingVersion {
                path: "/posts".to_string(),
                version: "v1".to_string(),
            }
        );
    }

    #[test]
    fn version_prefix_must_end_at_a_segment() {
        for path in ["/v10/posts", "/v1posts"] {
            let err = client()
                .build_request(&DispatchOptions::path(path))
                .unwrap_err();
            assert!(matches!(err, UsageError::PathMissingVersion { .. }), "{path}");
        }
        for path in ["/v1", "/v1?page[number]=2", "/v1/posts"] {
            assert!(client().build_request(&DispatchOptions::path(path)).is_ok(), "{path}");
        }
    }

    #[test]
    fn endpoint_id_is_escaped() {
        let req = client()
            .build_request(&DispatchOptions::endpoint(
                Endpoint::new("posts").id("a/b?c#d"),
            ))
            .unwrap();
        assert_eq!(req.url, "http://localhost:3000/v1/posts/a%2Fb%3Fc%23d");
    }

    #[test]
    fn missing_target_is_rejected() {
        let err = client()
            .build_request(&DispatchOptions::default())
            .unwrap_err();
        assert_eq!(err, UsageError::MissingTarget);
    }

    #[test]
    fn endpoint_with_id_and_query() {
        let query = Query::new()
            .include("author")
            .filter(Filter::new().terms(7, vec!["1".to_string()]));
        let req = client()
            .build_request(&DispatchOptions::endpoint(
                Endpoint::new("posts").id("42").query(query),
            ))
            .unwrap();
        assert_eq!(
            req.url,
            "http://localhost:3000/v1/posts/42?include=author&filter[terms7]=1"
        );
    }

    #[test]
    fn endpoint_without_query_has_no_question_mark() {
        let req = client()
            .build_request(&DispatchOptions::endpoint(Endpoint::new("categories")))
            .unwrap();
        assert_eq!(req.url, "http://localhost:3000/v1/categories");
    }

    #[test]
    fn public_key_header_is_attached() {
        let config = ClientConfig::new(DOMAIN).with_public_key("pk_test");
        let client = ContentClient::new(
            config,
            Arc::new(StaticTransport::json(200, &json!({"data": []}))),
        );
        let req = client
            .build_request(&DispatchOptions::endpoint(Endpoint::new("posts")))
            .unwrap();
        assert_eq!(req.header("x-public-key"), Some("pk_test"));
    }

    #[test]
    fn parse_response_bad_json() {
        let response = HttpResponse {
            status: 502,
            headers: Vec::new(),
            body: "<html>bad gateway</html>".to_string(),
        };
        let err = client().parse_response::<Value>(&response).unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 502, .. }));
    }

    #[tokio::test]
    async fn dispatch_returns_typed_envelope() {
        let body = json!({
            "data": {"id": 5, "type": "post", "attributes": {"title": "Hello"},
                     "relationships": {"author": {"data": {"id": "9", "type": "author"}}}},
            "included": [{"id": "9", "type": "author", "attributes": {"name": "Ada"}}],
            "links": {"self": "/v1/posts/5"}
        });
        let transport = Arc::new(StaticTransport::json(200, &body));
        let client = client_with(transport.clone());
        let envelope = client.post("5", Query::new()).await.unwrap();
        assert_eq!(envelope.data.kind(), ResourceType::Post);
        let author_ptr = envelope.data.relationships()["author"].pointer().cloned();
        let author = envelope.related(author_ptr.as_ref()).unwrap();
        assert_eq!(author.kind(), ResourceType::Author);
        assert_eq!(
            transport.requests()[0].url,
            "http://localhost:3000/v1/posts/5"
        );
    }

    #[tokio::test]
    async fn included_resource_without_attributes_decodes() {
        let body = json!({
            "data": {"id": "5", "type": "post", "attributes": {"title": "Hello"},
                     "relationships": {"author": {"data": {"id": "9", "type": "author"}}}},
            "included": [{"id": "9", "type": "author"}]
        });
        let client = client_with(Arc::new(StaticTransport::json(200, &body)));
        let envelope = client.post("5", Query::new()).await.unwrap();
        let author_ptr = envelope.data.relationships()["author"].pointer().cloned();
        let author = envelope.related(author_ptr.as_ref()).unwrap();
        assert_eq!(author.id(), "9");
        assert_eq!(author.kind(), ResourceType::Author);
    }

    #[tokio::test]
    async fn observer_runs_before_failure_is_raised() {
        let body = json!({"errors": [{"status": 404, "title": "Not Found", "detail": "gone"}]});
        let client = client_with(Arc::new(StaticTransport::json(404, &body)));
        let seen = Arc::new(Mutex::new(Vec::<u16>::new()));
        let sink = Arc::clone(&seen);
        let err = client
            .dispatch::<Value>(
                DispatchOptions::path("/v1/posts/1")
                    .with_observer(move |r| sink.lock().unwrap().push(r.status)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 404, .. }));
        assert_eq!(*seen.lock().unwrap(), vec![404]);
    }

    #[tokio::test]
    async fn redirect_in_body_is_surfaced() {
        let body = json!({"errors": [{"status": 301, "title": "Moved", "detail": "/v1/posts/2"}]});
        let client = client_with(Arc::new(StaticTransport::json(200, &body)));
        let err = client
            .dispatch::<Value>(DispatchOptions::path("/v1/posts/1"))
            .await
            .unwrap_err();
        match err {
            ClientError::Redirect { status, location } => {
                assert_eq!(status, 301);
                assert_eq!(location, "/v1/posts/2");
            }
            other => panic!("expected Redirect, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn per_call_transport_override() {
        let default = Arc::new(StaticTransport::json(200, &json!({"data": 1})));
        let other = Arc::new(StaticTransport::json(200, &json!({"data": 2})));
        let client = client_with(default.clone());
        let envelope = client
            .dispatch::<Value>(
                DispatchOptions::path("/v1/count").with_transport(other.clone()),
            )
            .await
            .unwrap();
        assert_eq!(envelope.data, json!(2));
        assert!(default.requests().is_empty());
        assert_eq!(other.requests().len(), 1);
    }

    #[tokio::test]
    async fn cancelled_token_is_a_transport_failure() {
        let transport = Arc::new(StaticTransport::json(200, &json!({"data": []})));
        let client = client_with(transport.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = client
            .dispatch::<Value>(DispatchOptions::path("/v1/posts").with_cancel(cancel))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Transport(TransportError::Cancelled)));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn usage_error_skips_the_network() {
        let transport = Arc::new(StaticTransport::json(200, &json!({"data": []})));
        let client = client_with(transport.clone());
        let err = client
            .dispatch::<Value>(DispatchOptions::path("posts"))
            .await
            .unwrap_err();
        assert!(err.is_usage());
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn next_page_stops_without_link() {
        let client = client();
        let last: Envelope<Vec<Resource>> =
            serde_json::from_value(json!({"data": [], "links": {"next": null}})).unwrap();
        let next = client.next_page(&last).await.unwrap();
        assert!(next.is_none());
    }

    #[test]
    fn media_url_uses_media_domain() {
        let config = ClientConfig::new(DOMAIN).with_media_domain("https://cdn.example.com");
        let client = ContentClient::new(
            config,
            Arc::new(StaticTransport::json(200, &json!({}))),
        );
        let resource: Resource = serde_json::from_value(json!({
            "id": "123", "type": "image",
            "attributes": {"mimetype": "image/jpeg", "fingerprints": {"default": "fp"}}
        }))
        .unwrap();
        let url = client
            .media_url(resource.as_media().unwrap(), &MediaUrlOptions::new())
            .unwrap();
        assert_eq!(url, "https://cdn.example.com/v1/123-default/fp/media");
    }
}
