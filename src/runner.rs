//! One-shot orchestration of the failover workflow.
//!
//! The whole run is sequential: acquire a session, fetch the reachable
//! routes, diff against the cached previous set, and - only when something
//! actionable changed - rewrite the routing rules and restart the proxy.
//! Every failure aborts the run; the external scheduler retries the whole
//! workflow on its next tick, so there is no retry or partial-success
//! continuation here.

use crate::cache::KvStore;
use crate::config::Config;
use crate::detect::{no_action_reason, ChangeDetector};
use crate::observability::{Observer, ObserverEvent};
use crate::panel::{endpoints, PanelClient};
use crate::reconcile::{preferred_route, reconcile};
use crate::session::{Credentials, SessionManager};
use anyhow::{bail, Context, Result};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{error, info};

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Nothing actionable changed; the panel was left untouched.
    NoAction { reason: String },
    /// A reconciliation was needed and `target` would carry the traffic,
    /// but the push and restart were skipped.
    DryRun { target: String },
    /// The panel's routing now prefers `target` and the proxy restarted.
    Reconciled { target: String },
}

pub struct Runner {
    config: Config,
    store: Arc<dyn KvStore>,
    observer: Arc<dyn Observer>,
}

impl Runner {
    pub fn new(config: Config, store: Arc<dyn KvStore>, observer: Arc<dyn Observer>) -> Self {
        Self {
            config,
            store,
            observer,
        }
    }

    /// One full pass. Invoked once per scheduler tick.
    pub async fn run_once(&self, dry_run: bool) -> Result<RunOutcome> {
        let panel = &self.config.panel;
        let cache = &self.config.cache;
        let routes = &self.config.routes;

        // Session: cached cookies or fresh login.
        let manager = SessionManager::new(self.store.clone(), self.observer.clone());
        let login_url = format!(
            "{}/{}",
            panel.base_url.trim_end_matches('/'),
            endpoints::LOGIN
        );
        let credentials = Credentials {
            username: panel.username.clone(),
            password: panel.password.clone(),
        };
        let session = manager
            .acquire(
                &login_url,
                &credentials,
                &cache.cookie_key,
                &panel.headers,
                cache.cookie_ttl_secs,
            )
            .await
            .context("Acquiring panel session")?;
        let Some(session) = session else {
            bail!("Login failed, no panel session");
        };

        let client = PanelClient::new(&panel.base_url, session, self.observer.clone());

        // Reachable set = panel-reported onlines ∩ managed universe.
        let online = client
            .fetch_online_routes()
            .await
            .context("Fetching online routes")?;
        let Some(online) = online else {
            bail!("Panel did not answer the online routes query");
        };
        let current: BTreeSet<String> = online
            .into_iter()
            .filter(|route| routes.universe.contains(route))
            .collect();
        self.observer.record_event(&ObserverEvent::RoutesFetched {
            reachable: current.iter().cloned().collect(),
        });

        // Diff against the cached previous set. The detector persists the
        // current set before we decide anything, so even a no-action run
        // leaves the cache current.
        let detector = ChangeDetector::new(
            self.store.clone(),
            self.observer.clone(),
            &cache.routes_key,
            cache.routes_ttl_secs,
        );
        let delta = detector.detect(&current).await;

        if let Some(reason) = no_action_reason(&delta, &current, routes.universe.len()) {
            info!(reason = %reason, "no reconciliation needed");
            self.observer.record_event(&ObserverEvent::NoActionNeeded {
                reason: reason.to_string(),
            });
            return Ok(RunOutcome::NoAction {
                reason: reason.to_string(),
            });
        }

        let Some(target) = preferred_route(&routes.universe, &current) else {
            bail!("No managed route is currently reachable");
        };
        info!(route = %target, "selected traffic-bearing route");
        self.observer.record_event(&ObserverEvent::RouteSelected {
            route: target.to_string(),
        });

        if dry_run {
            info!(route = %target, "dry run, skipping settings push and restart");
            return Ok(RunOutcome::DryRun {
                target: target.to_string(),
            });
        }

        // Fetch, rewrite, push, restart.
        let settings = client
            .fetch_settings()
            .await
            .context("Fetching routing settings")?;
        let Some(mut settings) = settings else {
            bail!("Panel did not answer the settings query");
        };

        reconcile(
            &mut settings,
            target,
            &routes.users,
            &routes.inbound_tags,
            &routes.universe,
        )?;

        let pushed = client
            .push_settings(&settings)
            .await
            .context("Pushing routing settings")?;
        let restarted = client
            .restart_service()
            .await
            .context("Restarting proxy service")?;

        if pushed.is_none() || restarted.is_none() {
            error!("settings push or service restart got no response");
            bail!("Settings push or service restart got no response");
        }
        self.observer.record_event(&ObserverEvent::SettingsPushed);
        self.observer.record_event(&ObserverEvent::ServiceRestarted);
        info!(route = %target, "routing reconciled and service restarted");

        Ok(RunOutcome::Reconciled {
            target: target.to_string(),
        })
    }
}
