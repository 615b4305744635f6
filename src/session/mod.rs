pub mod cookies;

pub use cookies::{Cookie, CookieJar};

use crate::cache::KvStore;
use crate::observability::{Observer, ObserverEvent};
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, COOKIE};
use reqwest::{Client, RequestBuilder, Url};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// An authenticated HTTP client bound to a cookie jar and a set of default
/// headers. Lives for one run; only the jar is persisted.
pub struct Session {
    client: Client,
    headers: HeaderMap,
    jar: CookieJar,
}

impl Session {
    fn new(headers: &HashMap<String, String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;

        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            let Ok(name) = name.parse::<HeaderName>() else {
                warn!(header = %name, "skipping invalid header name");
                continue;
            };
            let Ok(value) = HeaderValue::from_str(value) else {
                warn!(header = %name, "skipping invalid header value");
                continue;
            };
            header_map.insert(name, value);
        }

        Ok(Self {
            client,
            headers: header_map,
            jar: CookieJar::default(),
        })
    }

    /// Start a POST carrying the session's default headers and cookies.
    pub fn post(&self, url: &str) -> RequestBuilder {
        let mut request = self.client.post(url).headers(self.headers.clone());
        if let Some(cookie) = self.jar.header_value() {
            request = request.header(COOKIE, cookie);
        }
        request
    }

    pub fn jar(&self) -> &CookieJar {
        &self.jar
    }
}

/// Credentials for the panel's form login.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Obtains an authenticated [`Session`], preferring a cached cookie jar over
/// a fresh network login.
pub struct SessionManager {
    store: Arc<dyn KvStore>,
    observer: Arc<dyn Observer>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn KvStore>, observer: Arc<dyn Observer>) -> Self {
        Self { store, observer }
    }

    /// Acquire a session for `login_url`.
    ///
    /// A cached, non-expired jar short-circuits the login entirely (zero
    /// cache writes). Otherwise a form login runs; a non-2xx response or a
    /// transport failure yields `Ok(None)` - no session, caller aborts. On
    /// success the fresh jar is cached under `cache_key` with `ttl_secs`.
    pub async fn acquire(
        &self,
        login_url: &str,
        credentials: &Credentials,
        cache_key: &str,
        headers: &HashMap<String, String>,
        ttl_secs: u64,
    ) -> Result<Option<Session>> {
        let mut session = Session::new(headers)?;

        if let Some(bytes) = self.store.get(cache_key).await? {
            if let Some(jar) = CookieJar::from_bytes(&bytes) {
                if !jar.is_expired() {
                    debug!("cached cookie jar still valid, skipping login");
                    session.jar = jar;
                    self.observer.record_event(&ObserverEvent::SessionReused);
                    return Ok(Some(session));
                }
                debug!("cached cookie jar expired");
            } else {
                warn!("cached cookie jar is corrupt, falling through to login");
            }
        }

        let form = [
            ("username", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
        ];
        let response = match session.post(login_url).form(&form).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "login request failed");
                self.observer.record_event(&ObserverEvent::Error {
                    component: "session".into(),
                    message: e.to_string(),
                });
                return Ok(None);
            }
        };
        if !response.status().is_success() {
            warn!(status = %response.status(), "login rejected");
            self.observer.record_event(&ObserverEvent::Error {
                component: "session".into(),
                message: format!("login rejected with status {}", response.status()),
            });
            return Ok(None);
        }

        let domain = Url::parse(login_url)
            .ok()
            .and_then(|u| u.host_str().map(ToString::to_string))
            .unwrap_or_default();
        let jar = CookieJar::from_response(response.headers(), &domain);

        self.store
            .put(cache_key, jar.to_bytes()?, ttl_secs)
            .await
            .context("Failed to cache login cookies")?;

        session.jar = jar;
        self.observer.record_event(&ObserverEvent::LoginPerformed);
        Ok(Some(session))
    }
}
