//! Notification fan-out
//!
//! The pipeline publishes its results through explicit subscriptions: no
//! ambient event bus, no singletons. Subscribing returns a handle; dropping
//! or unsubscribing it detaches the listener. Listeners run outside the
//! subscriber lock, so they may re-enter the pipeline.

use crate::position::PageRange;
use crate::view_source::ViewContentSourceCollection;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

/// The authoritative view window changed.
#[derive(Clone)]
pub struct ViewContentsEvent {
    /// The new view collection. May be not yet valid when published by the
    /// timeout fallback; consumers key on [`range`](ViewContentSourceCollection::range).
    pub collection: Arc<ViewContentSourceCollection>,

    /// Whether the consumer should recompute its layout size.
    pub is_force_resize: bool,

    /// Whether this is the first view of the book.
    pub is_first_of_book: bool,
}

/// An incremental lookahead collection was produced.
#[derive(Clone)]
pub struct NextContentsEvent {
    /// The lookahead collection.
    pub collection: Arc<ViewContentSourceCollection>,

    /// Whether the consumer should recompute its layout size.
    pub is_force_resize: bool,
}

/// A move was requested past the end of the page sequence.
#[derive(Debug, Clone, Copy)]
pub struct PageTerminatedEvent {
    /// -1 for a move before the first page, +1 for a move past the last.
    pub direction: i32,

    /// The range the rejected request asked for.
    pub range: PageRange,
}

type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;
type ListenerMap<E> = Mutex<HashMap<u64, Listener<E>>>;

struct NotifierInner<E> {
    listeners: ListenerMap<E>,
    next_id: Mutex<u64>,
}

/// Fan-out point for one event type
///
/// Clones share the same subscriber set, so a notifier can be handed into a
/// background session while the owner keeps publishing rights.
///
/// # Example
///
/// ```
/// use book_viewer_core::events::Notifier;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let notifier: Notifier<u32> = Notifier::new();
/// let seen = Arc::new(AtomicUsize::new(0));
///
/// let subscription = {
///     let seen = Arc::clone(&seen);
///     notifier.subscribe(move |&event| {
///         seen.store(event as usize, Ordering::Relaxed);
///     })
/// };
///
/// notifier.emit(&7);
/// assert_eq!(seen.load(Ordering::Relaxed), 7);
/// subscription.unsubscribe();
/// ```
pub struct Notifier<E> {
    inner: Arc<NotifierInner<E>>,
}

impl<E> Notifier<E> {
    /// Create a notifier with no subscribers.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(NotifierInner {
                listeners: Mutex::new(HashMap::new()),
                next_id: Mutex::new(0),
            }),
        }
    }

    /// Attach a listener. The returned handle detaches it again.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&E) + Send + Sync + 'static,
        E: 'static,
    {
        let id = {
            let mut next_id = self.inner.next_id.lock().unwrap();
            *next_id += 1;
            *next_id
        };
        self.inner
            .listeners
            .lock()
            .unwrap()
            .insert(id, Arc::new(listener));

        let inner: Weak<NotifierInner<E>> = Arc::downgrade(&self.inner);
        Subscription {
            detach: Some(Box::new(move || {
                if let Some(inner) = inner.upgrade() {
                    inner.listeners.lock().unwrap().remove(&id);
                }
            })),
        }
    }

    /// Publish an event to every subscriber.
    ///
    /// Listeners are invoked outside the subscriber lock.
    pub fn emit(&self, event: &E) {
        let listeners: Vec<Listener<E>> = {
            let map = self.inner.listeners.lock().unwrap();
            map.values().cloned().collect()
        };
        for listener in listeners {
            listener(event);
        }
    }

    /// Number of attached listeners.
    pub fn subscriber_count(&self) -> usize {
        self.inner.listeners.lock().unwrap().len()
    }
}

impl<E> Clone for Notifier<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E> Default for Notifier<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle detaching a listener
///
/// Detaches explicitly via [`unsubscribe`](Self::unsubscribe) or implicitly
/// on drop.
pub struct Subscription {
    detach: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Detach the listener now.
    pub fn unsubscribe(mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_emit_reaches_subscriber() {
        let notifier: Notifier<u32> = Notifier::new();
        let count = Arc::new(AtomicUsize::new(0));

        let _subscription = {
            let count = Arc::clone(&count);
            notifier.subscribe(move |&value| {
                count.fetch_add(value as usize, Ordering::Relaxed);
            })
        };

        notifier.emit(&2);
        notifier.emit(&3);
        assert_eq!(count.load(Ordering::Relaxed), 5);
    }

    #[test]
    fn test_multiple_subscribers() {
        let notifier: Notifier<u32> = Notifier::new();
        let count = Arc::new(AtomicUsize::new(0));

        let subscriptions: Vec<Subscription> = (0..3)
            .map(|_| {
                let count = Arc::clone(&count);
                notifier.subscribe(move |_| {
                    count.fetch_add(1, Ordering::Relaxed);
                })
            })
            .collect();
        assert_eq!(notifier.subscriber_count(), 3);

        notifier.emit(&0);
        assert_eq!(count.load(Ordering::Relaxed), 3);
        drop(subscriptions);
    }

    #[test]
    fn test_unsubscribe_detaches() {
        let notifier: Notifier<u32> = Notifier::new();
        let count = Arc::new(AtomicUsize::new(0));

        let subscription = {
            let count = Arc::clone(&count);
            notifier.subscribe(move |_| {
                count.fetch_add(1, Ordering::Relaxed);
            })
        };

        notifier.emit(&0);
        subscription.unsubscribe();
        notifier.emit(&0);
        assert_eq!(count.load(Ordering::Relaxed), 1);
        assert_eq!(notifier.subscriber_count(), 0);
    }

    #[test]
    fn test_drop_detaches() {
        let notifier: Notifier<u32> = Notifier::new();
        {
            let _subscription = notifier.subscribe(|_| {});
            assert_eq!(notifier.subscriber_count(), 1);
        }
        assert_eq!(notifier.subscriber_count(), 0);
    }

    #[test]
    fn test_clone_shares_subscribers() {
        let notifier: Notifier<u32> = Notifier::new();
        let clone = notifier.clone();
        let count = Arc::new(AtomicUsize::new(0));

        let _subscription = {
            let count = Arc::clone(&count);
            notifier.subscribe(move |_| {
                count.fetch_add(1, Ordering::Relaxed);
            })
        };

        clone.emit(&0);
        assert_eq!(count.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_emit_without_subscribers_is_noop() {
        let notifier: Notifier<u32> = Notifier::new();
        notifier.emit(&1);
    }
}
