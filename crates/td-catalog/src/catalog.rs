//! The Catalog — aggregates sources into a uniform descriptor view and
//! broadcasts change notifications.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use td_core::event::EventChannel;
use td_core::{Error, Source, SubscriptionId, ToolDescriptor};

/// Payload broadcast on every catalog mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsChanged {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

struct CatalogState {
    by_id: HashMap<String, ToolDescriptor>,
    by_source: HashMap<String, BTreeSet<String>>,
    sources: HashMap<String, Arc<dyn Source>>,
    refresh_subscriptions: HashMap<String, SubscriptionId>,
}

struct Inner {
    state: RwLock<CatalogState>,
    tools_changed: EventChannel<ToolsChanged>,
}

impl Inner {
    /// Apply a source's new descriptor list, diffing against what the
    /// catalog previously held for it, and emit `ToolsChanged` iff the
    /// diff is non-empty.
    async fn handle_refresh(self: &Arc<Self>, source_id: &str, new_descriptors: Vec<ToolDescriptor>) {
        let (added, removed) = {
            let mut state = self.state.write();
            let prev_ids = state.by_source.get(source_id).cloned().unwrap_or_default();
            let new_ids: BTreeSet<String> = new_descriptors.iter().map(|d| d.id.clone()).collect();

            let removed: Vec<String> = prev_ids.difference(&new_ids).cloned().collect();
            let added: Vec<String> = new_ids.difference(&prev_ids).cloned().collect();

            for id in &removed {
                state.by_id.remove(id);
            }
            // Overwrite unchanged ids too, so updated descriptions/schemas
            // take effect even when the id set itself didn't change.
            for descriptor in new_descriptors {
                state.by_id.insert(descriptor.id.clone(), descriptor);
            }
            state.by_source.insert(source_id.to_string(), new_ids);

            (added, removed)
        };

        if !added.is_empty() || !removed.is_empty() {
            tracing::info!(source_id, added = added.len(), removed = removed.len(), "catalog refreshed");
            self.tools_changed.emit(ToolsChanged { added, removed }).await;
        }
    }
}

/// Reactive registry aggregating tool descriptors across sources.
///
/// Cheap to clone — internally `Arc`-shared, mirroring the teacher's
/// shared-state components (`ProcessManager`, `McpManager`).
#[derive(Clone)]
pub struct Catalog {
    inner: Arc<Inner>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(CatalogState {
                    by_id: HashMap::new(),
                    by_source: HashMap::new(),
                    sources: HashMap::new(),
                    refresh_subscriptions: HashMap::new(),
                }),
                tools_changed: EventChannel::new("catalog"),
            }),
        }
    }

    /// Subscribe to `ToolsChanged`. See [`EventChannel::subscribe`].
    pub fn on_tools_changed(&self, handler: td_core::event::Handler<ToolsChanged>) -> SubscriptionId {
        self.inner.tools_changed.subscribe(handler)
    }

    pub fn off_tools_changed(&self, id: SubscriptionId) {
        self.inner.tools_changed.unsubscribe(id);
    }

    /// Register a source. Fails with `SourceAlreadyRegistered` if its id
    /// collides with an already-registered source. Fetches the source's
    /// initial descriptors, inserts them, subscribes to its refresh
    /// channel (if any), then emits `ToolsChanged`. If listing the
    /// source's descriptors fails, no state is mutated.
    pub async fn register(&self, source: Arc<dyn Source>) -> Result<(), Error> {
        let source_id = source.id().to_string();
        {
            let state = self.inner.state.read();
            if state.sources.contains_key(&source_id) {
                return Err(Error::SourceAlreadyRegistered(source_id));
            }
        }

        let descriptors = source.get_descriptors().await?;
        let added: Vec<String> = descriptors.iter().map(|d| d.id.clone()).collect();

        let subscription = {
            let weak_inner: Weak<Inner> = Arc::downgrade(&self.inner);
            let handler_source_id = source_id.clone();
            source.refresh_channel().map(|channel| {
                channel.subscribe(Arc::new(move |new_list: Vec<ToolDescriptor>| {
                    let weak_inner = weak_inner.clone();
                    let handler_source_id = handler_source_id.clone();
                    Box::pin(async move {
                        if let Some(inner) = weak_inner.upgrade() {
                            inner.handle_refresh(&handler_source_id, new_list).await;
                        }
                        Ok(())
                    })
                }))
            })
        };

        {
            let mut state = self.inner.state.write();
            let mut ids = BTreeSet::new();
            for descriptor in descriptors {
                ids.insert(descriptor.id.clone());
                state.by_id.insert(descriptor.id.clone(), descriptor);
            }
            state.by_source.insert(source_id.clone(), ids);
            state.sources.insert(source_id.clone(), source);
            if let Some(subscription) = subscription {
                state.refresh_subscriptions.insert(source_id.clone(), subscription);
            }
        }

        tracing::info!(source_id, tool_count = added.len(), "source registered");
        self.inner
            .tools_changed
            .emit(ToolsChanged {
                added,
                removed: Vec::new(),
            })
            .await;
        Ok(())
    }

    /// Remove a source and its descriptors. No-op if `source_id` is not
    /// registered.
    pub async fn unregister(&self, source_id: &str) {
        let (removed, subscription, source) = {
            let mut state = self.inner.state.write();
            let Some(source) = state.sources.remove(source_id) else {
                return;
            };
            let ids = state.by_source.remove(source_id).unwrap_or_default();
            for id in &ids {
                state.by_id.remove(id);
            }
            let subscription = state.refresh_subscriptions.remove(source_id);
            (ids.into_iter().collect::<Vec<_>>(), subscription, source)
        };

        if let (Some(channel), Some(subscription)) = (source.refresh_channel(), subscription) {
            channel.unsubscribe(subscription);
        }

        tracing::info!(source_id, tool_count = removed.len(), "source unregistered");
        self.inner
            .tools_changed
            .emit(ToolsChanged {
                added: Vec::new(),
                removed,
            })
            .await;
    }

    /// Stable snapshot of every registered descriptor.
    pub fn get_all_descriptors(&self) -> Vec<ToolDescriptor> {
        self.inner.state.read().by_id.values().cloned().collect()
    }

    pub fn get_descriptor(&self, id: &str) -> Option<ToolDescriptor> {
        self.inner.state.read().by_id.get(id).cloned()
    }

    pub fn get_source(&self, source_id: &str) -> Option<Arc<dyn Source>> {
        self.inner.state.read().sources.get(source_id).cloned()
    }

    pub fn descriptors_by_source(&self, source_id: &str) -> Vec<ToolDescriptor> {
        let state = self.inner.state.read();
        state
            .by_source
            .get(source_id)
            .map(|ids| ids.iter().filter_map(|id| state.by_id.get(id).cloned()).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use td_core::tool::FnTool;
    use td_core::SourceKind;
    use td_sources::InMemorySource;

    fn descriptor(source_id: &str, local: &str) -> ToolDescriptor {
        ToolDescriptor {
            id: format!("{source_id}:{local}"),
            name: local.into(),
            description: format!("does {local}"),
            parameters: serde_json::json!({"type": "object"}),
            categories: Default::default(),
            keywords: Default::default(),
            source_kind: SourceKind::InMemory,
            source_id: source_id.into(),
        }
    }

    fn in_memory(source_id: &str, names: &[&str]) -> Arc<dyn Source> {
        let entries = names
            .iter()
            .map(|name| {
                let descriptor = descriptor(source_id, name);
                let tool: td_core::SharedTool =
                    Arc::new(FnTool(|args: serde_json::Value| async move { Ok(args) }));
                (descriptor, tool)
            })
            .collect();
        Arc::new(InMemorySource::new(source_id, entries))
    }

    #[tokio::test]
    async fn register_then_lookup_satisfies_p1_coherence() {
        let catalog = Catalog::new();
        catalog.register(in_memory("a", &["x", "y"])).await.unwrap();
        for descriptor in catalog.get_all_descriptors() {
            assert!(catalog.get_source(&descriptor.source_id).is_some());
            assert_eq!(catalog.get_descriptor(&descriptor.id).unwrap().id, descriptor.id);
        }
    }

    #[tokio::test]
    async fn register_duplicate_id_fails() {
        let catalog = Catalog::new();
        catalog.register(in_memory("a", &["x"])).await.unwrap();
        let err = catalog.register(in_memory("a", &["y"])).await.unwrap_err();
        assert!(matches!(err, Error::SourceAlreadyRegistered(id) if id == "a"));
    }

    #[tokio::test]
    async fn register_emits_tools_changed_with_added_ids() {
        let catalog = Catalog::new();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let seen2 = seen.clone();
        catalog.on_tools_changed(Arc::new(move |event: ToolsChanged| {
            let seen2 = seen2.clone();
            Box::pin(async move {
                seen2.lock().push(event);
                Ok(())
            })
        }));
        catalog.register(in_memory("a", &["x", "y"])).await.unwrap();
        let events = seen.lock();
        assert_eq!(events.len(), 1);
        let mut added = events[0].added.clone();
        added.sort();
        assert_eq!(added, vec!["a:x".to_string(), "a:y".to_string()]);
        assert!(events[0].removed.is_empty());
    }

    #[tokio::test]
    async fn register_then_unregister_is_symmetric_p2() {
        let catalog = Catalog::new();
        let added_ids = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let removed_ids = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let (a2, r2) = (added_ids.clone(), removed_ids.clone());
        catalog.on_tools_changed(Arc::new(move |event: ToolsChanged| {
            let a2 = a2.clone();
            let r2 = r2.clone();
            Box::pin(async move {
                if !event.added.is_empty() {
                    a2.lock().push(event.added);
                }
                if !event.removed.is_empty() {
                    r2.lock().push(event.removed);
                }
                Ok(())
            })
        }));

        catalog.register(in_memory("a", &["x", "y"])).await.unwrap();
        catalog.unregister("a").await;

        assert!(catalog.get_all_descriptors().is_empty());
        assert!(catalog.get_source("a").is_none());
        let mut first_added = added_ids.lock()[0].clone();
        let mut first_removed = removed_ids.lock()[0].clone();
        first_added.sort();
        first_removed.sort();
        assert_eq!(first_added, first_removed);
    }

    #[tokio::test]
    async fn unregister_unknown_source_is_noop() {
        let catalog = Catalog::new();
        catalog.unregister("missing").await; // must not panic
        assert!(catalog.get_all_descriptors().is_empty());
    }

    #[tokio::test]
    async fn two_disjoint_sources_unregister_one_leaves_other_round_trip() {
        let catalog = Catalog::new();
        catalog.register(in_memory("a", &["x"])).await.unwrap();
        catalog.register(in_memory("b", &["y"])).await.unwrap();
        catalog.unregister("a").await;
        let remaining = catalog.get_all_descriptors();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "b:y");
    }

    struct RefreshingSource {
        id: String,
        channel: EventChannel<Vec<ToolDescriptor>>,
        current: parking_lot::Mutex<Vec<ToolDescriptor>>,
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Source for RefreshingSource {
        fn id(&self) -> &str {
            &self.id
        }

        async fn get_descriptors(&self) -> Result<Vec<ToolDescriptor>, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.current.lock().clone())
        }

        async fn get_tool(&self, _id: &str) -> Result<Option<td_core::SharedTool>, Error> {
            Ok(None)
        }

        fn refresh_channel(&self) -> Option<&EventChannel<Vec<ToolDescriptor>>> {
            Some(&self.channel)
        }
    }

    #[tokio::test]
    async fn refresh_diffs_added_and_removed_scenario_4() {
        let catalog = Catalog::new();
        let source = Arc::new(RefreshingSource {
            id: "src".into(),
            channel: EventChannel::new("refreshing"),
            current: parking_lot::Mutex::new(vec![
                descriptor("src", "a"),
                descriptor("src", "b"),
                descriptor("src", "c"),
            ]),
            calls: AtomicUsize::new(0),
        });
        catalog.register(source.clone() as Arc<dyn Source>).await.unwrap();

        let events = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let events2 = events.clone();
        catalog.on_tools_changed(Arc::new(move |event: ToolsChanged| {
            let events2 = events2.clone();
            Box::pin(async move {
                events2.lock().push(event);
                Ok(())
            })
        }));

        let new_list = vec![descriptor("src", "b"), descriptor("src", "c"), descriptor("src", "d")];
        *source.current.lock() = new_list.clone();
        source.channel.emit(new_list).await;

        let events = events.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].added, vec!["src:d".to_string()]);
        assert_eq!(events[0].removed, vec!["src:a".to_string()]);
        assert!(catalog.get_descriptor("src:a").is_none());
    }
}
