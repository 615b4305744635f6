//! Serializable cookie jar.
//!
//! Parsing is intentionally minimal: only the attributes the failover
//! workflow needs survive (`Domain`, `Expires`, `Max-Age`). The jar is the
//! exact shape of the blob cached in the credential store, so changing these
//! fields changes the cache format.

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, SET_COOKIE};
use serde::{Deserialize, Serialize};

/// One cookie as received from the panel's `Set-Cookie` response headers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Cookie {
    /// Cookie name (case-sensitive).
    pub name: String,

    /// Raw cookie value.
    pub value: String,

    /// Domain scoping (host-only if `None`).
    #[serde(default)]
    pub domain: Option<String>,

    /// Expiration as unix seconds. Session cookies have `None` and never
    /// count as expired.
    #[serde(default)]
    pub expires: Option<i64>,
}

/// All cookies belonging to one panel session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CookieJar {
    pub cookies: Vec<Cookie>,
}

impl CookieJar {
    /// Collect every `Set-Cookie` header from a response. Cookies without an
    /// explicit `Domain` attribute are bound to `default_domain`.
    pub fn from_response(headers: &HeaderMap, default_domain: &str) -> Self {
        let mut jar = CookieJar::default();
        for header in headers.get_all(SET_COOKIE) {
            if let Ok(raw) = header.to_str() {
                if let Some(cookie) = parse_set_cookie(raw, default_domain) {
                    jar.upsert(cookie);
                }
            }
        }
        jar
    }

    /// Insert a cookie, replacing any existing cookie with the same name.
    pub fn upsert(&mut self, cookie: Cookie) {
        if let Some(existing) = self.cookies.iter_mut().find(|c| c.name == cookie.name) {
            *existing = cookie;
        } else {
            self.cookies.push(cookie);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// A jar is unusable when it holds no cookies at all, or when *any*
    /// cookie carries an expiry in the past. Cookies without an expiry do
    /// not age.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        if self.cookies.is_empty() {
            return true;
        }
        self.cookies
            .iter()
            .any(|c| c.expires.is_some_and(|ts| ts < now.timestamp()))
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Value for the `Cookie` request header, or `None` when the jar is
    /// empty.
    pub fn header_value(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|c| format!("{}={}", c.name, c.value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Serialize for the credential cache.
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Deserialize a cached blob. Corrupted payloads yield `None` so callers
    /// fall through to a fresh login (cache-miss semantics).
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        serde_json::from_slice(bytes).ok()
    }
}

fn parse_set_cookie(raw: &str, default_domain: &str) -> Option<Cookie> {
    let (name, rest) = raw.split_once('=')?;
    let mut parts = rest.split(';');
    let value = parts.next()?.trim().to_string();

    let mut cookie = Cookie {
        name: name.trim().to_string(),
        value,
        domain: Some(default_domain.to_string()),
        expires: None,
    };

    for part in parts {
        let part = part.trim();
        if let Some((k, v)) = part.split_once('=') {
            match k.to_ascii_lowercase().as_str() {
                "domain" => cookie.domain = Some(v.trim_start_matches('.').to_string()),
                "expires" => {
                    if let Some(ts) = parse_http_date(v.trim()) {
                        cookie.expires = Some(ts);
                    }
                }
                "max-age" => {
                    if let Ok(secs) = v.trim().parse::<i64>() {
                        cookie.expires = Some(Utc::now().timestamp() + secs);
                    }
                }
                _ => {}
            }
        }
    }

    Some(cookie)
}

fn parse_http_date(raw: &str) -> Option<i64> {
    // HTTP dates use "GMT", which the RFC 2822 parser accepts as a zone.
    DateTime::parse_from_rfc2822(raw).ok().map(|t| t.timestamp())
}
