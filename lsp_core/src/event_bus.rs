//! Typed, synchronous-publish fan-out to subscribers (spec C6).
//!
//! `publish(event)` invokes every subscriber for that concrete type
//! synchronously on the publishing thread. A panicking subscriber is caught
//! and logged, never allowed to stop the remaining subscribers from being
//! notified.

use std::{
    any::{Any, TypeId},
    panic::AssertUnwindSafe,
    sync::{Arc, RwLock},
};

use dashmap::DashMap;
use tracing::warn;

/// Marker for types that can travel over the bus.
pub trait Event: Any + Send + Sync + 'static {}
impl<T: Any + Send + Sync + 'static> Event for T {}

type Subscriber<E> = Arc<dyn Fn(&E) + Send + Sync>;

#[derive(Default)]
pub struct EventBus {
    subscribers: DashMap<TypeId, Arc<RwLock<Vec<(u64, Box<dyn Any + Send + Sync>)>>>>,
    next_id: std::sync::atomic::AtomicU64,
}

/// Handle returned from `subscribe`; drop or pass to `unsubscribe` to remove.
pub struct SubscriptionId {
    type_id: TypeId,
    id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: DashMap::new(),
            next_id: std::sync::atomic::AtomicU64::new(0),
        }
    }

    pub fn subscribe<E: Event>(&self, callback: impl Fn(&E) + Send + Sync + 'static) -> SubscriptionId {
        let type_id = TypeId::of::<E>();
        let id = self.next_id.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let boxed: Subscriber<E> = Arc::new(callback);
        let entry = self
            .subscribers
            .entry(type_id)
            .or_insert_with(|| Arc::new(RwLock::new(Vec::new())));
        entry.write().unwrap().push((id, Box::new(boxed)));
        SubscriptionId { type_id, id }
    }

    pub fn unsubscribe(&self, subscription: SubscriptionId) {
        if let Some(list) = self.subscribers.get(&subscription.type_id) {
            list.write().unwrap().retain(|(id, _)| *id != subscription.id);
        }
    }

    pub fn publish<E: Event>(&self, event: E) {
        let type_id = TypeId::of::<E>();
        let Some(list) = self.subscribers.get(&type_id) else {
            return;
        };
        let callbacks: Vec<Subscriber<E>> = list
            .read()
            .unwrap()
            .iter()
            .filter_map(|(_, cb)| cb.downcast_ref::<Subscriber<E>>().cloned())
            .collect();
        for callback in callbacks {
            let result = std::panic::catch_unwind(AssertUnwindSafe(|| callback(&event)));
            if result.is_err() {
                warn!("event bus subscriber panicked; swallowed");
            }
        }
    }

    pub fn subscriber_count<E: Event>(&self) -> usize {
        self.subscribers
            .get(&TypeId::of::<E>())
            .map(|l| l.read().unwrap().len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone)]
    struct FileIndexed {
        path: String,
        success: bool,
    }

    #[derive(Debug, Clone)]
    struct WorkspaceIndexed {
        total_files: usize,
    }

    #[test]
    fn dispatches_only_to_subscribers_of_the_concrete_type() {
        let bus = EventBus::new();
        let file_hits = Arc::new(AtomicUsize::new(0));
        let workspace_hits = Arc::new(AtomicUsize::new(0));

        let fh = Arc::clone(&file_hits);
        bus.subscribe::<FileIndexed>(move |_| {
            fh.fetch_add(1, Ordering::SeqCst);
        });
        let wh = Arc::clone(&workspace_hits);
        bus.subscribe::<WorkspaceIndexed>(move |_| {
            wh.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(FileIndexed {
            path: "A.groovy".into(),
            success: true,
        });

        assert_eq!(file_hits.load(Ordering::SeqCst), 1);
        assert_eq!(workspace_hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn panicking_subscriber_does_not_block_others() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));

        bus.subscribe::<FileIndexed>(|_| panic!("boom"));
        let h = Arc::clone(&hits);
        bus.subscribe::<FileIndexed>(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(FileIndexed {
            path: "A.groovy".into(),
            success: false,
        });

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_stops_future_delivery() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let sub = bus.subscribe::<WorkspaceIndexed>(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        bus.unsubscribe(sub);
        bus.publish(WorkspaceIndexed { total_files: 2 });
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
