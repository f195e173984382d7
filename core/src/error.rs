//! Error types for the content API client.
//!
//! # Design
//! Caller bugs and runtime conditions are separate types. `UsageError` is
//! raised before any I/O and means the inputs were wrong; `TransportError`
//! means the network call never produced a response. `ClientError` is what
//! `dispatch` returns and adds the two outcomes decided by the server body:
//! a redirect the caller must follow explicitly, and a plain API failure.

use thiserror::Error;

/// The caller supplied an invalid combination of inputs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    #[error("either a path or an endpoint must be supplied")]
    MissingTarget,

    #[error("path {path:?} must start with /{version}")]
    PathMissingVersion { path: String, version: String },

    #[error("invalid media type {media_type} for the .{ext} extension; only video and audio are playable")]
    InvalidMediaTypeForExtension { media_type: String, ext: String },

    #[error("format '{format}' is not allowed with the .{ext} extension; use 'default' or 'source'")]
    InvalidFormatForExtension { format: String, ext: String },

    #[error("the .{ext} extension requires a definition (hd or sd)")]
    MissingDefinition { ext: String },

    #[error("GIF images must use 'source' format")]
    GifRequiresSource,

    #[error("media {id} has no fingerprint for format '{format}'")]
    MissingFingerprint { id: String, format: String },
}

/// The network call could not complete.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Failed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("request cancelled")]
    Cancelled,
}

impl TransportError {
    /// Wrap any error as the cause of a failed request.
    pub fn failed<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        TransportError::Failed(err.into())
    }
}

/// Everything `ContentClient::dispatch` can fail with.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Usage(#[from] UsageError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server says the resource moved; `location` is where.
    #[error("redirect ({status}) to {location}")]
    Redirect { status: u16, location: String },

    #[error("API error {status}: {title}: {detail}")]
    Api {
        status: u16,
        title: String,
        detail: String,
    },
}

impl ClientError {
    pub fn is_usage(&self) -> bool {
        matches!(self, ClientError::Usage(_))
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self, ClientError::Redirect { .. })
    }

    /// HTTP-style status carried by a redirect or API failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Redirect { status, .. } | ClientError::Api { status, .. } => {
                Some(*status)
            }
            ClientError::Usage(_) | ClientError::Transport(_) => None,
        }
    }
}
