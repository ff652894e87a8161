//! Wrapper around a completed exchange.
//!
//! # Design
//! Status and headers are available immediately. The body stream is
//! single-use: the first call to `body()` takes it out of the response,
//! drains it and caches the bytes, so every later accessor sees the same
//! content without touching the network again. The stream is released
//! after that first attempt whether it succeeded or not.

use std::cell::{OnceCell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use ureq::http::header::SET_COOKIE;
use ureq::http::HeaderMap;
use ureq::ResponseExt;

use crate::error::{RequestError, Result};

/// A cookie set by the server on this exchange.
pub type Cookie = cookie::Cookie<'static>;

/// The result of a verb call.
///
/// `Response::default()` stands for "no underlying response": its status is
/// 0 and its body is unavailable.
///
/// A `Response` is `Send`, so it can be handed to another thread, but not
/// `Sync`: the body is drained through interior mutability.
pub struct Response {
    elapsed: Duration,
    url: String,
    status: u16,
    headers: HeaderMap,
    stream: RefCell<Option<Box<dyn Read + Send>>>,
    body: OnceCell<Vec<u8>>,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            elapsed: Duration::ZERO,
            url: String::new(),
            status: 0,
            headers: HeaderMap::new(),
            stream: RefCell::new(None),
            body: OnceCell::new(),
        }
    }
}

impl Response {
    /// The recorded URL is the one the transport finally answered from, so
    /// redirects followed inside the agent are reflected too.
    pub(crate) fn from_http(elapsed: Duration, response: ureq::http::Response<ureq::Body>) -> Self {
        let url = response.get_uri().to_string();
        let (parts, body) = response.into_parts();
        Self::from_parts(
            url,
            elapsed,
            parts.status.as_u16(),
            parts.headers,
            Some(Box::new(body.into_reader())),
        )
    }

    pub(crate) fn from_parts(
        url: String,
        elapsed: Duration,
        status: u16,
        headers: HeaderMap,
        stream: Option<Box<dyn Read + Send>>,
    ) -> Self {
        Self {
            elapsed,
            url,
            status,
            headers,
            stream: RefCell::new(stream),
            body: OnceCell::new(),
        }
    }

    pub fn status_code(&self) -> u16 {
        self.status
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Elapsed time formatted as `"<n>ms"`.
    pub fn elapsed_time(&self) -> String {
        format!("{}ms", self.elapsed.as_millis())
    }

    /// The URL that produced this response, after query resolution and any
    /// redirects that were followed.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Last value of each response header, keyed by lower-case name.
    pub fn headers(&self) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        for (name, value) in &self.headers {
            out.insert(
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            );
        }
        out
    }

    pub fn header_map(&self) -> &HeaderMap {
        &self.headers
    }

    /// Cookies from every `Set-Cookie` header. Unparseable values are skipped.
    pub fn cookies(&self) -> Vec<Cookie> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|s| Cookie::parse(s.to_string()).ok())
            .collect()
    }

    /// Raw body bytes, read from the network at most once.
    pub fn body(&self) -> Result<&[u8]> {
        if let Some(body) = self.body.get() {
            return Ok(body);
        }

        let stream = self.stream.borrow_mut().take();
        let mut stream = stream.ok_or(RequestError::StreamUnavailable)?;
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf)?;
        Ok(self.body.get_or_init(|| buf))
    }

    /// Body as text. A failed read yields an empty string instead of an
    /// error; callers rely on that.
    pub fn content(&self) -> String {
        match self.body() {
            Ok(b) => String::from_utf8_lossy(b).into_owned(),
            Err(e) => {
                log::warn!("reading body of {} failed: {e}", self.url);
                String::new()
            }
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(self.body()?).map_err(RequestError::InvalidJson)
    }

    pub fn unmarshal<T: DeserializeOwned>(&self) -> Result<T> {
        self.json()
    }

    /// Body re-rendered as tab-indented JSON.
    pub fn export_pretty(&self) -> Result<String> {
        let value: Value = self.json()?;
        let mut out = Vec::new();
        let mut ser = serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"\t"));
        value
            .serialize(&mut ser)
            .map_err(|e| RequestError::Serialization(e.to_string()))?;
        String::from_utf8(out).map_err(|e| RequestError::Serialization(e.to_string()))
    }

    /// Release the body stream without reading it. Safe to call repeatedly;
    /// an already cached body stays readable.
    pub fn close(&self) {
        self.stream.borrow_mut().take();
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("url", &self.url)
            .field("elapsed", &self.elapsed)
            .field("headers", &self.headers)
            .field("body_cached", &self.body.get().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::io::{self, Cursor};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use ureq::http::HeaderValue;

    /// Counts `read` calls so tests can prove the stream is drained once.
    struct CountingReader {
        inner: Cursor<Vec<u8>>,
        reads: Arc<AtomicUsize>,
    }

    impl Read for CountingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.read(buf)
        }
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
        }
    }

    fn response_with(body: &[u8]) -> Response {
        Response::from_parts(
            "http://x/".into(),
            Duration::from_millis(12),
            200,
            HeaderMap::new(),
            Some(Box::new(Cursor::new(body.to_vec()))),
        )
    }

    #[test]
    fn default_response_has_no_status_or_body() {
        let resp = Response::default();
        assert_eq!(resp.status_code(), 0);
        assert_eq!(resp.elapsed_time(), "0ms");
        assert!(matches!(resp.body(), Err(RequestError::StreamUnavailable)));
        assert_eq!(resp.content(), "");
    }

    #[test]
    fn body_is_read_once_and_cached() {
        let reads = Arc::new(AtomicUsize::new(0));
        let resp = Response::from_parts(
            "http://x/".into(),
            Duration::ZERO,
            200,
            HeaderMap::new(),
            Some(Box::new(CountingReader {
                inner: Cursor::new(b"hello".to_vec()),
                reads: reads.clone(),
            })),
        );

        let first = resp.body().unwrap().to_vec();
        let after_first = reads.load(Ordering::SeqCst);
        let second = resp.body().unwrap().to_vec();

        assert_eq!(first, b"hello");
        assert_eq!(first, second);
        assert_eq!(reads.load(Ordering::SeqCst), after_first);
    }

    #[test]
    fn failed_read_releases_the_stream() {
        let resp = Response::from_parts(
            "http://x/".into(),
            Duration::ZERO,
            200,
            HeaderMap::new(),
            Some(Box::new(FailingReader)),
        );
        assert!(matches!(resp.body(), Err(RequestError::Io(_))));
        assert!(matches!(resp.body(), Err(RequestError::StreamUnavailable)));
        assert_eq!(resp.content(), "");
    }

    #[test]
    fn close_is_idempotent_and_keeps_cached_body() {
        let resp = response_with(b"abc");
        assert_eq!(resp.body().unwrap(), b"abc");
        resp.close();
        resp.close();
        assert_eq!(resp.content(), "abc");

        let unread = response_with(b"abc");
        unread.close();
        unread.close();
        assert!(matches!(unread.body(), Err(RequestError::StreamUnavailable)));
    }

    #[test]
    fn json_decodes_into_target_shape() {
        #[derive(Deserialize, Debug, PartialEq)]
        struct Item {
            name: String,
        }
        let resp = response_with(br#"{"name":"x"}"#);
        let item: Item = resp.json().unwrap();
        assert_eq!(item, Item { name: "x".into() });
        let again: Item = resp.unmarshal().unwrap();
        assert_eq!(again, item);
    }

    #[test]
    fn invalid_json_is_reported() {
        let resp = response_with(b"not json");
        assert!(matches!(resp.json::<Value>(), Err(RequestError::InvalidJson(_))));
        assert!(matches!(resp.export_pretty(), Err(RequestError::InvalidJson(_))));
    }

    #[test]
    fn export_pretty_uses_tabs() {
        let resp = response_with(br#"{"a":[1]}"#);
        assert_eq!(resp.export_pretty().unwrap(), "{\n\t\"a\": [\n\t\t1\n\t]\n}");
    }

    #[test]
    fn headers_keep_last_value_and_cookies_are_parsed() {
        let mut headers = HeaderMap::new();
        headers.append("x-dup", HeaderValue::from_static("first"));
        headers.append("x-dup", HeaderValue::from_static("last"));
        headers.append(
            SET_COOKIE,
            HeaderValue::from_static("session=abc; Path=/; HttpOnly; Max-Age=60"),
        );
        headers.append(SET_COOKIE, HeaderValue::from_static("theme=dark; Secure"));
        headers.append(SET_COOKIE, HeaderValue::from_static("garbage"));

        let resp = Response::from_parts("http://x/".into(), Duration::ZERO, 204, headers, None);
        assert_eq!(resp.headers().get("x-dup").map(String::as_str), Some("last"));

        let cookies = resp.cookies();
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies[0].name(), "session");
        assert_eq!(cookies[0].value(), "abc");
        assert_eq!(cookies[0].path(), Some("/"));
        assert_eq!(cookies[0].max_age().map(|d| d.whole_seconds()), Some(60));
        assert_eq!(cookies[0].http_only(), Some(true));
        assert_eq!(cookies[0].secure(), None);
        assert_eq!(cookies[1].name(), "theme");
        assert_eq!(cookies[1].secure(), Some(true));
    }

    #[test]
    fn responses_can_move_across_threads() {
        fn assert_send<T: Send>() {}
        assert_send::<Response>();

        let resp = response_with(b"moved");
        let body = std::thread::spawn(move || resp.content()).join().unwrap();
        assert_eq!(body, "moved");
    }

    #[test]
    fn elapsed_time_is_in_milliseconds() {
        assert_eq!(response_with(b"").elapsed_time(), "12ms");
    }
}
