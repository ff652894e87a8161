//! Chainable convenience layer over a blocking HTTP client.
//!
//! # Overview
//! A [`Request`] collects timeouts, headers, cookies, TLS, proxy, redirect
//! and basic-auth settings, then issues GET/POST/PUT/DELETE calls and
//! multipart uploads through a memoized `ureq` agent. Each call returns a
//! [`Response`] with lazy, read-once access to the body.
//!
//! # Design
//! - Payloads are a closed [`Payload`] enum, chosen by `From` conversions at
//!   the call site. Strings and bytes go out verbatim, integers as
//!   big-endian bytes, and mappings as JSON or `k=v&k=v` depending on the
//!   declared content type.
//! - An integer's wire width is its Rust type's width. A bare literal like
//!   `5` is an `i32` (4 bytes); write `5i64` for 8.
//! - Cookies persist across calls only through an explicit [`CookieJar`].
//! - GET and DELETE never send a body; their payload is merged into the
//!   query string.
//! - Sockets, TLS, pooling and retries all belong to `ureq`. Nothing is
//!   retried here.
//! - One `Request` serves one sequential caller.
//!
//! ```no_run
//! use http_request::Request;
//! use serde_json::json;
//!
//! let mut req = Request::new();
//! req.json().set_cookies([("session", "abc")]);
//! let resp = req.post("http://localhost:3000/items", json!({"name": "x"}))?;
//! println!("{} in {}", resp.status_code(), resp.elapsed_time());
//! # Ok::<(), http_request::RequestError>(())
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod jar;
pub mod multipart;
pub mod payload;
pub mod query;
pub mod request;
pub mod response;
pub mod transport;

use std::path::Path;

pub use config::{ProxyResolver, RedirectAttempt, RedirectDecision, RedirectPolicy, RequestConfig};
pub use error::{RequestError, Result};
pub use http::{HttpMethod, PendingRequest};
pub use jar::CookieJar;
pub use payload::{FormEncoding, Integer, Payload};
pub use request::Request;
pub use response::{Cookie, Response};

/// One-off GET with a default `Request`. The payload is merged into the
/// query string.
pub fn get(url: &str, payload: impl Into<Payload>) -> Result<Response> {
    Request::new().get(url, payload)
}

/// One-off POST with a default `Request`. Mappings are sent form-encoded,
/// since no JSON content type is declared.
pub fn post(url: &str, payload: impl Into<Payload>) -> Result<Response> {
    Request::new().post(url, payload)
}

/// One-off PUT with a default `Request`, encoded like [`post`].
pub fn put(url: &str, payload: impl Into<Payload>) -> Result<Response> {
    Request::new().put(url, payload)
}

/// One-off DELETE with a default `Request`. Like GET, the payload goes into
/// the query string and no body is sent.
pub fn delete(url: &str, payload: impl Into<Payload>) -> Result<Response> {
    Request::new().delete(url, payload)
}

/// One-off multipart upload of `file_path` as form field `field`.
pub fn upload(url: &str, file_path: impl AsRef<Path>, field: &str) -> Result<Response> {
    Request::new().upload(url, file_path, field)
}
