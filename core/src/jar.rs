//! Persistent cookie storage shared across calls.
//!
//! # Design
//! The jar lives outside the transport so it survives agent rebuilds, is
//! consulted on every redirect hop the builder follows itself, and can be
//! shared by several `Request` instances. Cloning a `CookieJar` clones the
//! handle, not the cookies.

use std::sync::{Arc, Mutex, MutexGuard};

use cookie_store::CookieStore;
use ureq::http::header::SET_COOKIE;
use ureq::http::HeaderMap;
use url::Url;

#[derive(Clone, Default)]
pub struct CookieJar {
    store: Arc<Mutex<CookieStore>>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Cookie` header value for a request to `url`, if any stored cookie
    /// matches it.
    pub fn header_for(&self, url: &str) -> Option<String> {
        let url = Url::parse(url).ok()?;
        let store = self.lock();
        let pairs: Vec<String> = store
            .get_request_values(&url)
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        (!pairs.is_empty()).then(|| pairs.join("; "))
    }

    /// Record every `Set-Cookie` header of a response received from `url`.
    pub fn store_response(&self, url: &str, headers: &HeaderMap) {
        let Ok(url) = Url::parse(url) else {
            return;
        };
        let cookies = headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|s| cookie::Cookie::parse(s.to_string()).ok());
        self.lock().store_response_cookies(cookies, &url);
    }

    pub fn len(&self) -> usize {
        self.lock().iter_any().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, CookieStore> {
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for CookieJar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieJar").field("cookies", &self.len()).finish()
    }
}
