//! Change detection between the current reachable set and the cached one.

use crate::cache::KvStore;
use crate::observability::{Observer, ObserverEvent};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::warn;

/// What changed between the previous run's reachable set and this run's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDelta {
    /// Routes reachable now that were not before.
    pub added: BTreeSet<String>,
    /// Routes no longer reachable.
    pub removed: BTreeSet<String>,
    /// The cached set itself (empty on first run).
    pub previous: BTreeSet<String>,
}

/// Compares against the previous reachable set cached under one key.
pub struct ChangeDetector {
    store: Arc<dyn KvStore>,
    observer: Arc<dyn Observer>,
    key: String,
    ttl_secs: u64,
}

impl ChangeDetector {
    pub fn new(
        store: Arc<dyn KvStore>,
        observer: Arc<dyn Observer>,
        key: &str,
        ttl_secs: u64,
    ) -> Self {
        Self {
            store,
            observer,
            key: key.to_string(),
            ttl_secs,
        }
    }

    /// Load the previous set, persist `current` in its place, and report the
    /// difference.
    ///
    /// The cache write happens before any comparison so the stored state
    /// reflects the latest observation even when the caller exits early.
    /// Store errors and corrupt payloads degrade to an empty previous set;
    /// they never abort the run at this stage.
    pub async fn detect(&self, current: &BTreeSet<String>) -> RouteDelta {
        let previous = match self.store.get(&self.key).await {
            Ok(Some(bytes)) => decode_route_set(&bytes),
            Ok(None) => BTreeSet::new(),
            Err(e) => {
                warn!(error = %e, "failed to load previous reachable set");
                self.observer.record_event(&ObserverEvent::Error {
                    component: "detector".into(),
                    message: e.to_string(),
                });
                BTreeSet::new()
            }
        };

        match serde_json::to_vec(current) {
            Ok(encoded) => {
                if let Err(e) = self.store.put(&self.key, encoded, self.ttl_secs).await {
                    warn!(error = %e, "failed to persist current reachable set");
                    self.observer.record_event(&ObserverEvent::Error {
                        component: "detector".into(),
                        message: e.to_string(),
                    });
                }
            }
            Err(e) => warn!(error = %e, "failed to encode current reachable set"),
        }

        let added: BTreeSet<String> = current.difference(&previous).cloned().collect();
        let removed: BTreeSet<String> = previous.difference(current).cloned().collect();

        if !added.is_empty() {
            self.observer.record_event(&ObserverEvent::RoutesOnline {
                routes: added.iter().cloned().collect(),
            });
        }
        if !removed.is_empty() {
            self.observer.record_event(&ObserverEvent::RoutesOffline {
                routes: removed.iter().cloned().collect(),
            });
        }

        RouteDelta {
            added,
            removed,
            previous,
        }
    }
}

/// Early-exit test: reconciliation is pointless when nothing changed since
/// the last run, or when every managed route is reachable (nothing is
/// failing over, so no preference is needed).
pub fn no_action_reason(
    delta: &RouteDelta,
    current: &BTreeSet<String>,
    universe_len: usize,
) -> Option<&'static str> {
    if !delta.previous.is_empty() && delta.previous == *current {
        return Some("reachable set unchanged");
    }
    if current.len() == universe_len {
        return Some("all managed routes reachable");
    }
    None
}

fn decode_route_set(bytes: &[u8]) -> BTreeSet<String> {
    // Corrupt cache payloads count as a miss, not an error.
    serde_json::from_slice(bytes).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryStore;
    use crate::observability::NoopObserver;

    fn routes(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(ToString::to_string).collect()
    }

    fn detector_with(store: Arc<InMemoryStore>) -> ChangeDetector {
        ChangeDetector::new(store, Arc::new(NoopObserver), "onlines", 60)
    }

    async fn seed(store: &InMemoryStore, names: &[&str]) {
        store
            .put("onlines", serde_json::to_vec(&routes(names)).unwrap(), 60)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn detects_newly_online_route() {
        let store = Arc::new(InMemoryStore::new());
        seed(&store, &["A"]).await;

        let delta = detector_with(store).detect(&routes(&["A", "B"])).await;

        assert_eq!(delta.added, routes(&["B"]));
        assert!(delta.removed.is_empty());
        assert_eq!(delta.previous, routes(&["A"]));
    }

    #[tokio::test]
    async fn detects_newly_offline_route() {
        let store = Arc::new(InMemoryStore::new());
        seed(&store, &["A", "B"]).await;

        let delta = detector_with(store).detect(&routes(&["B"])).await;

        assert!(delta.added.is_empty());
        assert_eq!(delta.removed, routes(&["A"]));
    }

    #[tokio::test]
    async fn unchanged_set_signals_no_action() {
        let store = Arc::new(InMemoryStore::new());
        seed(&store, &["A", "B"]).await;

        let current = routes(&["A", "B"]);
        let delta = detector_with(store).detect(&current).await;

        assert_eq!(
            no_action_reason(&delta, &current, 3),
            Some("reachable set unchanged")
        );
    }

    #[tokio::test]
    async fn full_reachability_signals_no_action_regardless_of_previous() {
        let store = Arc::new(InMemoryStore::new());
        seed(&store, &["A"]).await;

        let current = routes(&["A", "B"]);
        let delta = detector_with(store).detect(&current).await;

        // The set changed, but with universe size 2 and both reachable no
        // failover preference is needed.
        assert_eq!(
            no_action_reason(&delta, &current, 2),
            Some("all managed routes reachable")
        );
    }

    #[tokio::test]
    async fn empty_previous_with_partial_reachability_requires_action() {
        let store = Arc::new(InMemoryStore::new());

        let current = routes(&["A"]);
        let delta = detector_with(store).detect(&current).await;

        assert_eq!(no_action_reason(&delta, &current, 2), None);
    }

    #[tokio::test]
    async fn current_set_is_persisted_even_on_no_action_path() {
        let store = Arc::new(InMemoryStore::new());
        seed(&store, &["A", "B"]).await;

        let current = routes(&["A", "B"]);
        let delta = detector_with(store.clone()).detect(&current).await;
        assert!(no_action_reason(&delta, &current, 3).is_some());

        let stored = store.get("onlines").await.unwrap().unwrap();
        assert_eq!(decode_route_set(&stored), current);
    }

    #[tokio::test]
    async fn corrupt_previous_blob_counts_as_first_run() {
        let store = Arc::new(InMemoryStore::new());
        store
            .put("onlines", b"pickled nonsense".to_vec(), 60)
            .await
            .unwrap();

        let delta = detector_with(store).detect(&routes(&["A"])).await;

        assert!(delta.previous.is_empty());
        assert_eq!(delta.added, routes(&["A"]));
    }
}
