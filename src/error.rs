//! Error types for the navigation runtime and the transclusion engine.
//!
//! Most public entry points recover from these locally (a failed fetch
//! becomes "no content", a bad hash becomes "absent"); the typed errors
//! exist so the recovery sites can log what actually went wrong.

use thiserror::Error;

/// Failures while fetching a page over the network.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Transport-level failure (offline, DNS, CORS, ...)
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-2xx status
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// The request was cancelled by a newer one
    #[error("request aborted")]
    Aborted,

    /// Response was not HTML
    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),

    /// The body could not be parsed into a document
    #[error("parse error: {0}")]
    Parse(String),

    /// A URL could not be built or resolved
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Fetched page carried no content roots
    #[error("no content roots in {0}")]
    EmptyContent(String),
}

impl From<url::ParseError> for FetchError {
    fn from(err: url::ParseError) -> Self {
        FetchError::InvalidUrl(err.to_string())
    }
}

/// Failures while decoding a stacked-notes hash.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HashError {
    #[error("invalid base64: {0}")]
    InvalidBase64(String),

    #[error("decoded hash is not UTF-8")]
    InvalidUtf8,

    #[error("decoded slug contains disallowed characters: {0}")]
    DisallowedCharacters(String),
}

/// Failure surfaced by a host implementation (DOM, history, layout).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("host error: {0}")]
pub struct HostError(pub String);

impl From<String> for HostError {
    fn from(message: String) -> Self {
        HostError(message)
    }
}

impl From<&str> for HostError {
    fn from(message: &str) -> Self {
        HostError(message.to_string())
    }
}

/// Failures on the classic (morph) navigation path. Every variant is
/// converted into a full browser navigation by the router.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NavigationError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("morph failed: {0}")]
    Morph(String),

    #[error(transparent)]
    Host(#[from] HostError),
}

/// Invalid configuration JSON.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures while loading the content index.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IndexError {
    #[error("content index fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("content index is not valid JSON: {0}")]
    Json(String),
}
