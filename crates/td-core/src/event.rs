//! Generic one-to-many event channel.
//!
//! Unlike `tokio::sync::broadcast` (used elsewhere in this codebase for
//! SSE fan-out), this channel awaits each handler sequentially and isolates
//! handler failures, matching the contract in the spec: subscribers are
//! invoked in registration order, one at a time, and a failing handler
//! never blocks the others or the emitter's caller.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A registered handler. Returning `Err` is logged and swallowed — it
/// never propagates to the emitter.
pub type Handler<T> = Arc<dyn Fn(T) -> BoxFuture<'static, Result<(), String>> + Send + Sync>;

struct Subscription<T> {
    id: u64,
    handler: Handler<T>,
}

/// Token returned by [`EventChannel::subscribe`]; dropping it does nothing —
/// call [`EventChannel::unsubscribe`] explicitly (idempotent, safe to call
/// during an in-flight emission).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

/// One-to-many typed pub/sub channel.
///
/// `component` is used only to label swallowed handler errors in logs.
pub struct EventChannel<T: Clone + Send + 'static> {
    component: &'static str,
    next_id: AtomicU64,
    subscriptions: Mutex<Vec<Subscription<T>>>,
}

impl<T: Clone + Send + 'static> EventChannel<T> {
    pub fn new(component: &'static str) -> Self {
        Self {
            component,
            next_id: AtomicU64::new(0),
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    /// Register a handler; returns a token for [`Self::unsubscribe`].
    /// Handlers are held in registration order.
    pub fn subscribe(&self, handler: Handler<T>) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.subscriptions.lock().push(Subscription { id, handler });
        SubscriptionId(id)
    }

    /// Detach a handler. Idempotent — unsubscribing an unknown or already
    /// removed id is a no-op. Safe to call from within a handler that is
    /// currently running as part of an in-flight `emit`: that emission
    /// already took its snapshot, so only future emissions are affected.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.subscriptions.lock().retain(|s| s.id != id.0);
    }

    /// Detach every handler. Used during teardown.
    pub fn clear(&self) {
        self.subscriptions.lock().clear();
    }

    /// Number of currently registered handlers.
    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.lock().len()
    }

    /// Emit an event: invoke each handler from the registration-order
    /// snapshot taken at the start of this call, sequentially, awaiting
    /// each before starting the next. A handler that errors is logged
    /// (tagged with `component`) and does not stop subsequent handlers.
    pub async fn emit(&self, event: T) {
        // Snapshot handlers under the lock, then release it before awaiting
        // — `unsubscribe` calls made mid-emission only affect this snapshot
        // if taken afterwards, never this one.
        let handlers: Vec<Handler<T>> = {
            let guard = self.subscriptions.lock();
            guard.iter().map(|s| s.handler.clone()).collect()
        };
        for handler in handlers {
            if let Err(err) = (handler)(event.clone()).await {
                tracing::error!(component = self.component, error = %err, "event handler failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn ok_handler<T: Clone + Send + 'static>(
        counter: Arc<AtomicUsize>,
    ) -> Handler<T> {
        Arc::new(move |_event: T| {
            let counter = counter.clone();
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        })
    }

    #[tokio::test]
    async fn handlers_invoked_in_registration_order() {
        let channel: EventChannel<u32> = EventChannel::new("test");
        let order = Arc::new(Mutex::new(Vec::new()));
        for tag in [1, 2, 3] {
            let order = order.clone();
            channel.subscribe(Arc::new(move |_event: u32| {
                let order = order.clone();
                Box::pin(async move {
                    order.lock().push(tag);
                    Ok(())
                })
            }));
        }
        channel.emit(0).await;
        assert_eq!(*order.lock(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn failing_handler_does_not_block_others() {
        let channel: EventChannel<u32> = EventChannel::new("test");
        let counter = Arc::new(AtomicUsize::new(0));
        channel.subscribe(Arc::new(|_event: u32| {
            Box::pin(async move { Err("boom".to_string()) })
        }));
        channel.subscribe(ok_handler(counter.clone()));
        channel.emit(0).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unsubscribe_is_idempotent_and_future_only() {
        let channel: EventChannel<u32> = EventChannel::new("test");
        let counter = Arc::new(AtomicUsize::new(0));
        let id = channel.subscribe(ok_handler(counter.clone()));
        channel.unsubscribe(id);
        channel.unsubscribe(id); // idempotent
        channel.emit(0).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(channel.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn clear_detaches_all_handlers() {
        let channel: EventChannel<u32> = EventChannel::new("test");
        let counter = Arc::new(AtomicUsize::new(0));
        channel.subscribe(ok_handler(counter.clone()));
        channel.subscribe(ok_handler(counter.clone()));
        channel.clear();
        channel.emit(0).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
