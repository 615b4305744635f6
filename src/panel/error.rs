use thiserror::Error;

/// Application-level failures from the panel API.
///
/// Transport-level failures (connection errors, non-2xx statuses) are *not*
/// represented here: those degrade to an absent result, so call sites must
/// branch on "no response" separately from "bad response".
#[derive(Debug, Error)]
pub enum PanelError {
    #[error("panel returned an empty response body")]
    EmptyResponse,

    #[error("panel response is not valid JSON: {detail} (body: {snippet})")]
    Protocol { detail: String, snippet: String },

    #[error("panel rejected the request: {0}")]
    Application(String),
}
