use super::error::PanelError;
use serde::Deserialize;
use serde_json::Value;

/// How much of a malformed body survives into the error message.
const SNIPPET_LEN: usize = 120;

/// The uniform `{success, obj, msg}` wrapper every panel endpoint responds
/// with (login excepted).
#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(default)]
    pub obj: Value,
    #[serde(default)]
    pub msg: String,
}

impl Envelope {
    /// Unwrap a raw response body into the envelope's payload.
    pub fn unwrap_body(body: &str) -> Result<Value, PanelError> {
        if body.trim().is_empty() {
            return Err(PanelError::EmptyResponse);
        }
        let envelope: Envelope =
            serde_json::from_str(body).map_err(|e| PanelError::Protocol {
                detail: e.to_string(),
                snippet: truncated(body, SNIPPET_LEN),
            })?;
        if envelope.success {
            Ok(envelope.obj)
        } else {
            Err(PanelError::Application(envelope.msg))
        }
    }
}

/// Truncate on a char boundary so multi-byte bodies don't panic.
pub(crate) fn truncated(body: &str, limit: usize) -> String {
    match body.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_returns_obj() {
        let obj = Envelope::unwrap_body(r#"{"success":true,"obj":{"x":1},"msg":""}"#).unwrap();
        assert_eq!(obj, json!({"x": 1}));
    }

    #[test]
    fn success_without_obj_returns_null() {
        let obj = Envelope::unwrap_body(r#"{"success":true,"msg":"ok"}"#).unwrap();
        assert_eq!(obj, Value::Null);
    }

    #[test]
    fn failure_carries_panel_message() {
        let err = Envelope::unwrap_body(r#"{"success":false,"msg":"bad"}"#).unwrap_err();
        match err {
            PanelError::Application(msg) => assert_eq!(msg, "bad"),
            other => panic!("expected Application, got {other:?}"),
        }
    }

    #[test]
    fn empty_body_is_its_own_error() {
        assert!(matches!(
            Envelope::unwrap_body("   \n"),
            Err(PanelError::EmptyResponse)
        ));
    }

    #[test]
    fn non_json_body_reports_protocol_error_with_snippet() {
        let body = "<html><body>504 Gateway Time-out</body></html>";
        let err = Envelope::unwrap_body(body).unwrap_err();
        match err {
            PanelError::Protocol { snippet, .. } => {
                assert!(snippet.contains("504 Gateway Time-out"));
            }
            other => panic!("expected Protocol, got {other:?}"),
        }
    }

    #[test]
    fn long_body_snippet_is_truncated() {
        let body = "x".repeat(500);
        let err = Envelope::unwrap_body(&body).unwrap_err();
        match err {
            PanelError::Protocol { snippet, .. } => {
                assert_eq!(snippet, format!("{}...", "x".repeat(120)));
            }
            other => panic!("expected Protocol, got {other:?}"),
        }
    }

    #[test]
    fn truncation_respects_multibyte_boundaries() {
        let body = "日".repeat(200);
        let snippet = truncated(&body, 120);
        assert!(snippet.ends_with("..."));
        assert_eq!(snippet.chars().filter(|c| *c == '日').count(), 120);
    }
}
