use super::traits::{Observer, ObserverEvent};
use tracing::info;

/// Log-based observer — uses tracing, zero external deps
pub struct LogObserver;

impl LogObserver {
    pub fn new() -> Self {
        Self
    }
}

impl Observer for LogObserver {
    fn record_event(&self, event: &ObserverEvent) {
        match event {
            ObserverEvent::SessionReused => {
                info!("session.reused");
            }
            ObserverEvent::LoginPerformed => {
                info!("session.login");
            }
            ObserverEvent::RoutesFetched { reachable } => {
                info!(reachable = ?reachable, "routes.fetched");
            }
            ObserverEvent::RoutesOnline { routes } => {
                info!(routes = ?routes, "routes.online");
            }
            ObserverEvent::RoutesOffline { routes } => {
                info!(routes = ?routes, "routes.offline");
            }
            ObserverEvent::NoActionNeeded { reason } => {
                info!(reason = %reason, "run.no_action");
            }
            ObserverEvent::RouteSelected { route } => {
                info!(route = %route, "route.selected");
            }
            ObserverEvent::SettingsPushed => {
                info!("settings.pushed");
            }
            ObserverEvent::ServiceRestarted => {
                info!("service.restarted");
            }
            ObserverEvent::Error { component, message } => {
                info!(component = %component, error = %message, "error");
            }
        }
    }

    fn name(&self) -> &str {
        "log"
    }
}
