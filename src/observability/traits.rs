/// Discrete events emitted during a reconciliation run.
///
/// Each variant is a lifecycle point observers can record or forward.
/// Events carry route names and reasons, never credentials or cookies.
#[derive(Debug, Clone)]
pub enum ObserverEvent {
    /// A cached cookie jar was still valid; no login request was made.
    SessionReused,
    /// A fresh login was performed and its cookies were cached.
    LoginPerformed,
    /// The panel reported its online routes; `reachable` is already
    /// intersected with the managed universe.
    RoutesFetched { reachable: Vec<String> },
    /// Routes present now that were absent in the previous run.
    RoutesOnline { routes: Vec<String> },
    /// Routes absent now that were present in the previous run.
    RoutesOffline { routes: Vec<String> },
    /// The run decided no reconciliation is needed.
    NoActionNeeded { reason: String },
    /// The route chosen to carry traffic.
    RouteSelected { route: String },
    /// The rewritten settings document was accepted by the panel.
    SettingsPushed,
    /// The panel acknowledged the proxy service restart.
    ServiceRestarted,
    /// An error occurred in a named component.
    Error { component: String, message: String },
}

/// Sink for run telemetry.
///
/// The components accept an injected observer instead of logging into
/// process-wide state, so runs can be silenced or redirected wholesale.
/// Implementations must be `Send + Sync + 'static` because the observer is
/// shared across async calls via `Arc`.
pub trait Observer: Send + Sync + 'static {
    /// Record a discrete lifecycle event. Called synchronously; avoid
    /// blocking I/O.
    fn record_event(&self, event: &ObserverEvent);

    /// Flush any buffered telemetry. Default is a no-op.
    fn flush(&self) {}

    /// Backend name, for logs and diagnostics.
    fn name(&self) -> &str;
}
