//! The chainable request builder.
//!
//! # Design
//! A `Request` owns its configuration and a memoized transport. Setters
//! mutate the configuration in place and return `&mut Self`, so a builder
//! can be configured in one chain and then reused for many calls. Setters
//! that affect how the transport is built drop the memoized agent; the next
//! call rebuilds it, so configuration changed after the first call is never
//! silently ignored.
//!
//! Every verb call resolves its URL, body and headers into a
//! `PendingRequest` before any I/O, so local validation failures never
//! reach the network.
//!
//! A `Request` serves one sequential caller. It has no internal locking;
//! concurrent callers each build their own instance. A `CookieJar` can be
//! shared between instances.
//!
//! Redirects that leave the original host (or its subdomains) lose the
//! `Authorization`, `WWW-Authenticate` and `Cookie` headers, matching what
//! browsers and Go's client do. Jar cookies are recomputed for every hop.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ureq::http::header::{AUTHORIZATION, COOKIE, LOCATION, WWW_AUTHENTICATE};
use ureq::tls::TlsConfig;
use ureq::{Agent, Body, RequestBuilder, ResponseExt};
use url::Url;

use crate::config::{RedirectAttempt, RedirectDecision, RequestConfig};
use crate::error::{RequestError, Result};
use crate::http::{HttpMethod, PendingRequest};
use crate::jar::CookieJar;
use crate::multipart::MultipartForm;
use crate::payload::{encode_body, FormEncoding, Payload};
use crate::query::build_url;
use crate::response::Response;
use crate::transport::Transport;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(Default)]
pub struct Request {
    config: RequestConfig,
    transport: Transport,
}

impl Request {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    /// Log every call at info level.
    pub fn set_debug(&mut self, enabled: bool) -> &mut Self {
        self.config.debug = enabled;
        self
    }

    pub fn set_disable_connection_reuse(&mut self, disabled: bool) -> &mut Self {
        self.config.disable_connection_reuse = disabled;
        self.transport.invalidate();
        self
    }

    pub fn set_tls_config(&mut self, tls: TlsConfig) -> &mut Self {
        self.config.tls = Some(tls);
        self.transport.invalidate();
        self
    }

    /// Merge `headers` into the configured set. Matching names are
    /// overwritten; an empty input changes nothing.
    pub fn set_headers<I, K, V>(&mut self, headers: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.config.merge_headers(headers);
        self
    }

    pub fn set_cookies<I, K, V>(&mut self, cookies: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.config.merge_cookies(cookies);
        self
    }

    /// Store cookies from every response in `jar` and send matching ones
    /// back. Clones of the jar share storage.
    pub fn set_cookie_jar(&mut self, jar: CookieJar) -> &mut Self {
        self.config.cookie_jar = Some(jar);
        self
    }

    pub fn set_basic_auth(&mut self, username: impl Into<String>, password: impl Into<String>) -> &mut Self {
        self.config.basic_auth = Some((username.into(), password.into()));
        self
    }

    /// Declare a JSON content type, so mapping payloads are sent as JSON.
    pub fn json(&mut self) -> &mut Self {
        self.set_headers([("Content-Type", "application/json")])
    }

    /// Connect and response-header timeout. Zero disables both.
    pub fn set_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.config.timeout = timeout;
        self.transport.invalidate();
        self
    }

    /// Route requests through the proxy URL `resolver` returns for them.
    pub fn set_proxy<F>(&mut self, resolver: F) -> &mut Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.config.proxy = Some(Arc::new(resolver));
        self.transport.invalidate();
        self
    }

    /// Follow redirects manually, asking `policy` before each hop.
    pub fn set_redirect_policy<F>(&mut self, policy: F) -> &mut Self
    where
        F: Fn(&RedirectAttempt<'_>) -> RedirectDecision + Send + Sync + 'static,
    {
        self.config.redirect_policy = Some(Arc::new(policy));
        self.transport.invalidate();
        self
    }

    /// Use a caller-built agent for every call. Timeout, TLS, reuse and
    /// proxy settings are then the agent's own.
    ///
    /// Together with a redirect policy the agent must be built with
    /// `max_redirects(0)`, or every call fails with `InvalidArgument`; an
    /// agent that follows redirects itself would never consult the policy.
    pub fn set_transport(&mut self, agent: Agent) -> &mut Self {
        self.transport.set_custom(agent);
        self
    }

    pub fn set_form_encoding(&mut self, encoding: FormEncoding) -> &mut Self {
        self.config.form_encoding = encoding;
        self
    }

    pub fn get(&mut self, url: &str, payload: impl Into<Payload>) -> Result<Response> {
        self.request(HttpMethod::Get, url, payload.into())
    }

    pub fn post(&mut self, url: &str, payload: impl Into<Payload>) -> Result<Response> {
        self.request(HttpMethod::Post, url, payload.into())
    }

    pub fn put(&mut self, url: &str, payload: impl Into<Payload>) -> Result<Response> {
        self.request(HttpMethod::Put, url, payload.into())
    }

    pub fn delete(&mut self, url: &str, payload: impl Into<Payload>) -> Result<Response> {
        self.request(HttpMethod::Delete, url, payload.into())
    }

    /// POST the file at `file_path` as the multipart form field `field`.
    pub fn upload(&mut self, url: &str, file_path: impl AsRef<Path>, field: &str) -> Result<Response> {
        let start = Instant::now();
        let result = self.prepare_upload(url, file_path.as_ref(), field).and_then(|pending| {
            self.execute(pending, start)
        });
        self.log(HttpMethod::Post, url, "multipart", start, &result);
        result
    }

    fn request(&mut self, method: HttpMethod, url: &str, payload: Payload) -> Result<Response> {
        let start = Instant::now();
        let kind = payload.kind();
        let result = self
            .prepare(method, url, payload)
            .and_then(|pending| self.execute(pending, start));
        self.log(method, url, kind, start, &result);
        result
    }

    /// Resolve URL, body and headers without touching the network.
    fn prepare(&self, method: HttpMethod, url: &str, payload: Payload) -> Result<PendingRequest> {
        require_url(url)?;
        let encoding = self.config.form_encoding;
        let (resolved, body) = if method.sends_body() {
            let body = encode_body(method, payload, self.config.is_json(), encoding)?;
            (url.to_string(), body)
        } else {
            (build_url(url, payload, encoding)?, None)
        };

        let mut pending = PendingRequest::new(method, resolved, body);
        self.apply_headers(&mut pending);
        Ok(pending)
    }

    fn prepare_upload(&self, url: &str, file_path: &Path, field: &str) -> Result<PendingRequest> {
        require_url(url)?;
        let form = MultipartForm::from_file(file_path, field)?;
        let content_type = form.content_type();

        let mut pending = PendingRequest::new(HttpMethod::Post, url, Some(form.into_body()));
        self.apply_headers(&mut pending);
        pending.set_header("Content-Type", &content_type);
        Ok(pending)
    }

    fn apply_headers(&self, pending: &mut PendingRequest) {
        pending.set_header("Content-Type", FORM_CONTENT_TYPE);
        for (name, value) in &self.config.headers {
            pending.set_header(name, value);
        }
        if let Some(cookies) = self.config.cookie_header() {
            let merged = match pending.header("Cookie") {
                Some(existing) => format!("{existing}; {cookies}"),
                None => cookies,
            };
            pending.set_header("Cookie", &merged);
        }
        if let Some((user, password)) = &self.config.basic_auth {
            let token = STANDARD.encode(format!("{user}:{password}"));
            pending.set_header("Authorization", &format!("Basic {token}"));
        }
    }

    fn execute(&mut self, mut pending: PendingRequest, start: Instant) -> Result<Response> {
        let mut history: Vec<String> = Vec::new();
        loop {
            let agent = self.transport.agent_for(&self.config, &pending.url)?;
            let jar = self.config.cookie_jar.as_ref();
            let jar_cookies = jar.and_then(|jar| jar.header_for(&pending.url));
            let response = dispatch(&agent, &pending, jar_cookies.as_deref())?;
            if let Some(jar) = jar {
                jar.store_response(&response.get_uri().to_string(), response.headers());
            }

            let Some(policy) = self.config.redirect_policy.clone() else {
                return Ok(Response::from_http(start.elapsed(), response));
            };
            let status = response.status().as_u16();
            let location = match response.headers().get(LOCATION) {
                Some(value) if is_redirect(status) => value.to_str().ok().map(str::to_string),
                _ => None,
            };
            let Some(location) = location else {
                return Ok(Response::from_http(start.elapsed(), response));
            };

            let next = resolve_location(&pending.url, &location)?;
            history.push(pending.url.clone());
            let attempt = RedirectAttempt {
                status,
                location: &next,
                history: &history,
            };
            match policy(&attempt) {
                RedirectDecision::Follow => {
                    log::debug!("following {status} redirect to {next}");
                    drop(response);
                    redirect(&mut pending, status, next);
                }
                RedirectDecision::Stop => {
                    return Ok(Response::from_http(start.elapsed(), response));
                }
                RedirectDecision::Reject(reason) => {
                    return Err(RequestError::RedirectRejected(reason));
                }
            }
        }
    }

    fn log(&self, method: HttpMethod, url: &str, payload: &str, start: Instant, result: &Result<Response>) {
        if !self.config.debug {
            return;
        }
        let outcome = match result {
            Ok(resp) => format!("status {}", resp.status_code()),
            Err(e) => format!("error: {e}"),
        };
        log::info!(
            "[HttpRequest] {method} {url} headers={:?} cookies={:?} timeout={:?} payload={payload} elapsed={:?} {outcome}",
            self.config.headers,
            self.config.cookies,
            self.config.timeout,
            start.elapsed(),
        );
    }
}

fn require_url(url: &str) -> Result<()> {
    if url.is_empty() {
        return Err(RequestError::InvalidArgument("url is required".to_string()));
    }
    Ok(())
}

/// Send `pending`, appending `jar_cookies` to whatever `Cookie` header it
/// already carries.
fn dispatch(
    agent: &Agent,
    pending: &PendingRequest,
    jar_cookies: Option<&str>,
) -> Result<ureq::http::Response<Body>> {
    let url = pending.url.as_str();
    let body = pending.body.as_deref().unwrap_or(&[]);
    let headers = outgoing_headers(pending, jar_cookies);
    let response = match pending.method {
        HttpMethod::Get => with_headers(agent.get(url), &headers).call(),
        HttpMethod::Delete => with_headers(agent.delete(url), &headers).call(),
        HttpMethod::Post => with_headers(agent.post(url), &headers).send(body),
        HttpMethod::Put => with_headers(agent.put(url), &headers).send(body),
    }?;
    Ok(response)
}

fn outgoing_headers(pending: &PendingRequest, jar_cookies: Option<&str>) -> Vec<(String, String)> {
    let mut headers = pending.headers.clone();
    let Some(stored) = jar_cookies else {
        return headers;
    };
    match headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case("cookie")) {
        Some((_, existing)) => *existing = format!("{existing}; {stored}"),
        None => headers.push(("Cookie".to_string(), stored.to_string())),
    }
    headers
}

fn with_headers<B>(builder: RequestBuilder<B>, headers: &[(String, String)]) -> RequestBuilder<B> {
    headers
        .iter()
        .fold(builder, |b, (name, value)| b.header(name.as_str(), value.as_str()))
}

fn is_redirect(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}

fn resolve_location(current: &str, location: &str) -> Result<String> {
    let base = Url::parse(current)
        .map_err(|e| RequestError::InvalidArgument(format!("cannot resolve redirect from {current}: {e}")))?;
    let next = base
        .join(location)
        .map_err(|e| RequestError::InvalidArgument(format!("bad redirect location {location:?}: {e}")))?;
    Ok(next.to_string())
}

/// 301, 302 and 303 continue as a bodiless GET; 307 and 308 replay the
/// original method and body. Credentials only follow to the same host or
/// one of its subdomains.
fn redirect(pending: &mut PendingRequest, status: u16, next: String) {
    if !same_site(&pending.url, &next) {
        for name in [AUTHORIZATION, WWW_AUTHENTICATE, COOKIE] {
            pending.remove_header(name.as_str());
        }
    }
    pending.url = next;
    if matches!(status, 301 | 302 | 303) {
        pending.method = HttpMethod::Get;
        pending.body = None;
    }
}

/// True when `next` is on the host of `current` or a subdomain of it.
fn same_site(current: &str, next: &str) -> bool {
    let host = |u: &str| Url::parse(u).ok().and_then(|u| u.host_str().map(str::to_ascii_lowercase));
    match (host(current), host(next)) {
        (Some(old), Some(new)) => new == old || new.ends_with(&format!(".{old}")),
        _ => false,
    }
}
