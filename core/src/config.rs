//! Mutable configuration carried by a `Request` builder.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use ureq::tls::TlsConfig;

use crate::jar::CookieJar;
use crate::payload::FormEncoding;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Maps a request URL to the proxy it should go through. `None` means direct.
pub type ProxyResolver = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Decides, hop by hop, whether a redirect is followed.
pub type RedirectPolicy = Arc<dyn Fn(&RedirectAttempt<'_>) -> RedirectDecision + Send + Sync>;

/// A redirect the server asked for, offered to the installed `RedirectPolicy`.
#[derive(Debug, Clone, Copy)]
pub struct RedirectAttempt<'a> {
    /// Status of the 3xx response.
    pub status: u16,
    /// Absolute URL the server points at.
    pub location: &'a str,
    /// URLs already requested in this exchange, oldest first.
    pub history: &'a [String],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectDecision {
    Follow,
    /// Hand the 3xx response back to the caller.
    Stop,
    /// Fail the call with `RequestError::RedirectRejected`.
    Reject(String),
}

#[derive(Clone)]
pub struct RequestConfig {
    pub timeout: Duration,
    pub headers: BTreeMap<String, String>,
    pub cookies: BTreeMap<String, String>,
    /// Persistent jar fed by responses and consulted on every request.
    pub cookie_jar: Option<CookieJar>,
    pub debug: bool,
    pub tls: Option<TlsConfig>,
    pub disable_connection_reuse: bool,
    pub proxy: Option<ProxyResolver>,
    pub redirect_policy: Option<RedirectPolicy>,
    pub basic_auth: Option<(String, String)>,
    pub form_encoding: FormEncoding,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            headers: BTreeMap::new(),
            cookies: BTreeMap::new(),
            cookie_jar: None,
            debug: false,
            tls: None,
            disable_connection_reuse: false,
            proxy: None,
            redirect_policy: None,
            basic_auth: None,
            form_encoding: FormEncoding::Raw,
        }
    }
}

impl RequestConfig {
    /// True when any configured header value mentions `application/json`,
    /// ignoring case.
    pub fn is_json(&self) -> bool {
        self.headers
            .values()
            .any(|v| v.to_ascii_lowercase().contains("application/json"))
    }

    /// Overwrite matching keys and keep the rest. An empty input is a no-op.
    pub fn merge_headers<K, V>(&mut self, headers: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<String>,
    {
        merge(&mut self.headers, headers);
    }

    pub fn merge_cookies<K, V>(&mut self, cookies: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<String>,
    {
        merge(&mut self.cookies, cookies);
    }

    /// `Cookie` request header value, or `None` when no cookies are set.
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        let pairs: Vec<String> = self.cookies.iter().map(|(k, v)| format!("{k}={v}")).collect();
        Some(pairs.join("; "))
    }
}

fn merge<K, V>(target: &mut BTreeMap<String, String>, entries: impl IntoIterator<Item = (K, V)>)
where
    K: Into<String>,
    V: Into<String>,
{
    for (k, v) in entries {
        target.insert(k.into(), v.into());
    }
}

impl fmt::Debug for RequestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestConfig")
            .field("timeout", &self.timeout)
            .field("headers", &self.headers)
            .field("cookies", &self.cookies)
            .field("cookie_jar", &self.cookie_jar)
            .field("debug", &self.debug)
            .field("tls", &self.tls.is_some())
            .field("disable_connection_reuse", &self.disable_connection_reuse)
            .field("proxy", &self.proxy.is_some())
            .field("redirect_policy", &self.redirect_policy.is_some())
            .field("basic_auth", &self.basic_auth.as_ref().map(|(user, _)| user))
            .field("form_encoding", &self.form_encoding)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_headers_are_not_json() {
        assert!(!RequestConfig::default().is_json());
    }

    #[test]
    fn json_detection_is_case_insensitive_on_any_value() {
        let mut config = RequestConfig::default();
        config.merge_headers([("Accept", "text/plain")]);
        assert!(!config.is_json());
        config.merge_headers([("X-Kind", "Application/JSON; charset=utf-8")]);
        assert!(config.is_json());
    }

    #[test]
    fn merge_overwrites_matching_keys_and_keeps_others() {
        let mut config = RequestConfig::default();
        config.merge_headers([("A", "1"), ("B", "2")]);
        config.merge_headers([("B", "3")]);
        config.merge_headers(Vec::<(String, String)>::new());
        assert_eq!(config.headers.get("A").map(String::as_str), Some("1"));
        assert_eq!(config.headers.get("B").map(String::as_str), Some("3"));
    }

    #[test]
    fn cookie_header_joins_pairs() {
        let mut config = RequestConfig::default();
        assert_eq!(config.cookie_header(), None);
        config.merge_cookies([("b", "2"), ("a", "1")]);
        assert_eq!(config.cookie_header().as_deref(), Some("a=1; b=2"));
    }

    #[test]
    fn debug_output_hides_password() {
        let config = RequestConfig {
            basic_auth: Some(("user".into(), "secret".into())),
            ..RequestConfig::default()
        };
        let out = format!("{config:?}");
        assert!(out.contains("user"));
        assert!(!out.contains("secret"));
    }
}
