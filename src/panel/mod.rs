pub mod envelope;
pub mod error;

pub use envelope::Envelope;
pub use error::PanelError;

use crate::observability::{Observer, ObserverEvent};
use crate::session::Session;
use envelope::truncated;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

/// Relative endpoint paths, joined onto the configured base URL.
pub mod endpoints {
    pub const LOGIN: &str = "login";
    pub const ONLINE_ROUTES: &str = "panel/api/inbounds/onlines";
    pub const SETTINGS: &str = "panel/xray";
    pub const SETTINGS_UPDATE: &str = "panel/xray/update";
    pub const RESTART: &str = "server/restartXrayService";
}

/// Form field wrapping the settings document on fetch and push.
const SETTINGS_WRAPPER_KEY: &str = "xraySetting";

/// Issues authenticated requests against panel endpoints and unwraps the
/// `{success, obj, msg}` envelope.
pub struct PanelClient {
    base_url: String,
    session: Session,
    observer: Arc<dyn Observer>,
}

impl PanelClient {
    pub fn new(base_url: &str, session: Session, observer: Arc<dyn Observer>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
            observer,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// POST to a panel endpoint and unwrap the JSON envelope.
    ///
    /// Transport failures (connection errors, non-2xx statuses, unreadable
    /// bodies) degrade to `Ok(None)`; envelope-level failures are `Err`.
    /// Callers must handle both branches - an absent result means the panel
    /// never answered, an error means it answered badly.
    pub async fn call(
        &self,
        path: &str,
        form: Option<&[(&str, &str)]>,
    ) -> Result<Option<Value>, PanelError> {
        let url = self.url(path);
        let mut request = self.session.post(&url);
        if let Some(form) = form {
            request = request.form(form);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %url, error = %e, "panel request failed");
                self.observer.record_event(&ObserverEvent::Error {
                    component: "panel".into(),
                    message: e.to_string(),
                });
                return Ok(None);
            }
        };
        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = %status, "panel returned error status");
            self.observer.record_event(&ObserverEvent::Error {
                component: "panel".into(),
                message: format!("status {status} from {url}"),
            });
            return Ok(None);
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(url = %url, error = %e, "failed to read panel response body");
                return Ok(None);
            }
        };

        Envelope::unwrap_body(&body).map(Some)
    }

    /// Routes the panel currently reports online, unfiltered.
    pub async fn fetch_online_routes(&self) -> Result<Option<Vec<String>>, PanelError> {
        let Some(obj) = self.call(endpoints::ONLINE_ROUTES, None).await? else {
            return Ok(None);
        };
        let routes = serde_json::from_value(obj.clone()).map_err(|e| PanelError::Protocol {
            detail: format!("online routes payload: {e}"),
            snippet: truncated(&obj.to_string(), 120),
        })?;
        Ok(Some(routes))
    }

    /// The settings document arrives double-encoded: the envelope's `obj` is
    /// a JSON string whose parsed form holds the settings under the wrapper
    /// key. Returns the inner settings document.
    pub async fn fetch_settings(&self) -> Result<Option<Value>, PanelError> {
        let Some(obj) = self.call(endpoints::SETTINGS, None).await? else {
            return Ok(None);
        };
        let raw = obj.as_str().ok_or_else(|| PanelError::Protocol {
            detail: "settings payload is not a string".into(),
            snippet: truncated(&obj.to_string(), 120),
        })?;
        let doc: Value = serde_json::from_str(raw).map_err(|e| PanelError::Protocol {
            detail: format!("settings document: {e}"),
            snippet: truncated(raw, 120),
        })?;
        let settings = doc
            .get(SETTINGS_WRAPPER_KEY)
            .cloned()
            .ok_or_else(|| PanelError::Protocol {
                detail: format!("settings document has no {SETTINGS_WRAPPER_KEY} key"),
                snippet: truncated(raw, 120),
            })?;
        Ok(Some(settings))
    }

    /// Push a rewritten settings document, form-encoded under the wrapper
    /// key the panel expects, pretty-printed the way its editor does.
    pub async fn push_settings(&self, settings: &Value) -> Result<Option<Value>, PanelError> {
        let payload =
            serde_json::to_string_pretty(settings).map_err(|e| PanelError::Protocol {
                detail: format!("settings serialization: {e}"),
                snippet: String::new(),
            })?;
        self.call(
            endpoints::SETTINGS_UPDATE,
            Some(&[(SETTINGS_WRAPPER_KEY, payload.as_str())]),
        )
        .await
    }

    /// Ask the panel to restart its proxy service. Bodyless POST.
    pub async fn restart_service(&self) -> Result<Option<Value>, PanelError> {
        self.call(endpoints::RESTART, None).await
    }
}
