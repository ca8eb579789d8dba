//! Lazy materializer: resolves a descriptor id to an executable tool,
//! caching the result and deduplicating concurrent loads of the same id.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use futures_util::future::{BoxFuture, FutureExt, Shared};
use lru::LruCache;
use parking_lot::Mutex;

use td_catalog::Catalog;
use td_core::config::LoaderConfig;
use td_core::{Error, SharedTool};

struct CacheEntry {
    tool: SharedTool,
    inserted_at: Instant,
}

/// A load in progress, shared across every concurrent caller of the same
/// id. `Error` is `Clone` specifically so every co-awaiter can receive it.
type PendingLoad = Shared<BoxFuture<'static, Result<SharedTool, Error>>>;

#[derive(Debug, Clone, Copy)]
pub struct LoaderStats {
    pub cached: usize,
    pub in_flight: usize,
    pub capacity: usize,
}

struct Inner {
    catalog: Catalog,
    ttl: Option<Duration>,
    cache: Mutex<LruCache<String, CacheEntry>>,
    in_flight: Mutex<HashMap<String, PendingLoad>>,
}

impl Inner {
    fn is_expired(&self, entry: &CacheEntry) -> bool {
        self.ttl
            .map(|ttl| entry.inserted_at.elapsed() >= ttl)
            .unwrap_or(false)
    }

    /// Resolve `id` from scratch via the catalog/source chain. Never reads
    /// or writes the cache — that's the caller's job once this settles.
    async fn resolve(self: &Arc<Self>, id: &str) -> Result<SharedTool, Error> {
        let descriptor = self
            .catalog
            .get_descriptor(id)
            .ok_or_else(|| Error::tool_not_found(id))?;
        let source = self
            .catalog
            .get_source(&descriptor.source_id)
            .ok_or_else(|| Error::SourceNotFound(descriptor.source_id.clone()))?;
        match source.get_tool(id).await? {
            Some(tool) => Ok(tool),
            None => Err(Error::tool_not_found_detail(id, "source returned empty")),
        }
    }

    async fn load(self: &Arc<Self>, id: &str) -> Result<SharedTool, Error> {
        {
            let mut cache = self.cache.lock();
            if let Some(entry) = cache.get(id) {
                if !self.is_expired(entry) {
                    return Ok(entry.tool.clone());
                }
                cache.pop(id);
            }
        }

        let pending: PendingLoad = {
            let mut in_flight = self.in_flight.lock();
            if let Some(existing) = in_flight.get(id) {
                existing.clone()
            } else {
                let inner = self.clone();
                let owned_id = id.to_string();
                let future: BoxFuture<'static, Result<SharedTool, Error>> =
                    async move { inner.resolve(&owned_id).await }.boxed();
                let shared = future.shared();
                in_flight.insert(id.to_string(), shared.clone());
                shared
            }
        };

        let result = pending.await;
        // All exit paths — success or failure — drop the in-flight entry,
        // otherwise a failed load would poison every future dedup attempt.
        self.in_flight.lock().remove(id);

        let tool = result?;
        self.cache.lock().put(
            id.to_string(),
            CacheEntry {
                tool: tool.clone(),
                inserted_at: Instant::now(),
            },
        );
        Ok(tool)
    }

    fn evict(&self, id: &str) {
        self.cache.lock().pop(id);
        self.in_flight.lock().remove(id);
    }
}

/// Cheap to clone — internally `Arc`-shared, matching [`Catalog`]'s shape.
#[derive(Clone)]
pub struct Loader {
    inner: Arc<Inner>,
}

impl Loader {
    pub fn new(catalog: Catalog, config: LoaderConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_size).unwrap_or(NonZeroUsize::new(1).unwrap());
        let inner = Arc::new(Inner {
            catalog: catalog.clone(),
            ttl: config.ttl,
            cache: Mutex::new(LruCache::new(capacity)),
            in_flight: Mutex::new(HashMap::new()),
        });

        let weak: Weak<Inner> = Arc::downgrade(&inner);
        catalog.on_tools_changed(Arc::new(move |event: td_catalog::ToolsChanged| {
            let weak = weak.clone();
            Box::pin(async move {
                if let Some(inner) = weak.upgrade() {
                    for id in &event.removed {
                        inner.evict(id);
                    }
                }
                Ok(())
            })
        }));

        Self { inner }
    }

    /// Resolve `id`, consulting the LRU cache first, then any matching
    /// in-flight load, then the catalog/source chain.
    pub async fn load(&self, id: &str) -> Result<SharedTool, Error> {
        self.inner.load(id).await
    }

    /// Best-effort pre-warm: launch every load concurrently, swallowing
    /// individual failures.
    pub async fn warmup(&self, ids: &[String]) {
        let futures = ids.iter().map(|id| self.load(id));
        futures_util::future::join_all(futures).await;
    }

    /// Drop `id` from both the cache and the in-flight map; a subsequent
    /// `load` restarts resolution from scratch.
    pub fn evict(&self, id: &str) {
        self.inner.evict(id);
    }

    pub fn clear(&self) {
        self.inner.cache.lock().clear();
        self.inner.in_flight.lock().clear();
    }

    pub fn stats(&self) -> LoaderStats {
        let cache = self.inner.cache.lock();
        LoaderStats {
            cached: cache.len(),
            in_flight: self.inner.in_flight.lock().len(),
            capacity: cache.cap().get(),
        }
    }
}
