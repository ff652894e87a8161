//! Error types for the request builder and response wrapper.
//!
//! # Design
//! Local validation failures (`InvalidArgument`, `MalformedQuery`,
//! `UnsupportedPayload`) are always raised before any socket is opened.
//! Transport failures are passed through untouched in `Network`; nothing in
//! this crate retries them.

use thiserror::Error;

/// Errors returned by `Request` verbs and `Response` body accessors.
#[derive(Debug, Error)]
pub enum RequestError {
    /// An empty URL or method token was supplied.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The query string already present on the URL has a segment with no `=`.
    #[error("malformed query segment: {0:?}")]
    MalformedQuery(String),

    /// The payload shape cannot be used for this verb.
    #[error("unsupported payload type: {0}")]
    UnsupportedPayload(&'static str),

    /// Reading an upload file or a caller-supplied reader failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// DNS, connect, TLS or timeout failure reported by the transport.
    #[error("network error: {0}")]
    Network(#[from] ureq::Error),

    /// The body was requested but there is no response or stream to read.
    #[error("response body stream unavailable")]
    StreamUnavailable,

    /// The response body is not valid JSON for the requested shape.
    #[error("invalid json: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// A payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The installed redirect policy refused to follow a redirect.
    #[error("redirect rejected: {0}")]
    RedirectRejected(String),
}

pub type Result<T> = std::result::Result<T, RequestError>;
