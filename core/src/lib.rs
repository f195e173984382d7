//! Async client core for a JSON:API content service.
//!
//! # Overview
//! Fetches posts, media, categories, authors and terms as typed resource
//! envelopes, derives media asset URLs, and walks relationships in data
//! already fetched.
//!
//! # Design
//! - `ContentClient` holds immutable configuration plus an injected
//!   `Transport`; each dispatch may override the transport, pass a
//!   cancellation token, and observe the raw response.
//! - `build_request` / `parse_response` are the pure halves of a dispatch,
//!   so URL building and error classification test without a network.
//! - Caller mistakes are `UsageError`s, raised before any I/O. Runtime
//!   outcomes are `TransportError`, redirects, and API failures.
//! - `media` and `relations` are synchronous and side-effect free.

pub mod classify;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod media;
pub mod query;
pub mod relations;
pub mod transport;
pub mod types;

pub use client::{ContentClient, DispatchOptions, Endpoint, ResponseObserver};
pub use config::{ClientConfig, ConfigError};
pub use error::{ClientError, TransportError, UsageError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use media::{media_url, Definition, MediaFormat, MediaUrlOptions};
pub use query::encode_query;
pub use relations::{collect_category_ids, resolve_related};
#[cfg(feature = "reqwest")]
pub use transport::ReqwestTransport;
pub use transport::{StaticTransport, Transport};
pub use types::{
    Category, Envelope, Filter, FilterValue, Media, MediaKind, MediaResource, Page, Query,
    RelatedPointer, Relationship, Resource, ResourceType,
};

pub use tokio_util::sync::CancellationToken;
