// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Event bus
//!
//! Typed publish/subscribe with per-subscriber FIFO delivery.
//!

use crate::{
    Error,
    subscriber::{
        ErrorHook, Filter, Published, Sink, Subscriber, SubscriptionId,
    },
};

use tokio::sync::mpsc::{self, UnboundedSender};
use tokio_util::task::TaskTracker;

use tracing::{Instrument, debug, error};

use std::{
    sync::{
        Arc, PoisonError, RwLock,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};

/// One registered subscription.
struct Subscription<E: Send + 'static> {
    id: SubscriptionId,
    subscriber: Arc<dyn Subscriber<E>>,
    filter: Filter<E>,
    sender: UnboundedSender<Published<E>>,
}

struct Inner<E: Send + 'static> {
    subscriptions: RwLock<Vec<Subscription<E>>>,
    next_id: AtomicU64,
    closed: AtomicBool,
    tracker: TaskTracker,
    error_hook: ErrorHook,
}

/// Typed publish/subscribe bus.
///
/// Each subscription gets its own unbounded queue and consumer task, so
/// `publish` only evaluates filters and enqueues. Delivery to one subscriber
/// follows the order in which the bus observed the publish calls; there is no
/// ordering between different subscribers.
///
/// The bus is cheap to clone; clones share the same subscriptions.
/// Subscribing spawns a Tokio task and must happen inside a runtime.
///
/// ```ignore
/// let bus = EventBus::<String>::new();
/// let id = bus.subscribe_topic(Arc::new(Printer), "greetings");
/// bus.publish("greetings", "hello".to_owned());
/// bus.unsubscribe(&[id]);
/// ```
pub struct EventBus<E: Send + 'static> {
    inner: Arc<Inner<E>>,
}

impl<E: Send + 'static> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E> Default for EventBus<E>
where
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventBus<E>
where
    E: Clone + Send + Sync + 'static,
{
    /// Creates a bus whose subscriber failures are logged.
    pub fn new() -> Self {
        Self::with_error_hook(|id, err| {
            error!("Subscriber {} failed: {}", id, err);
        })
    }

    /// Creates a bus routing subscriber failures to `hook`.
    pub fn with_error_hook<H>(hook: H) -> Self
    where
        H: Fn(SubscriptionId, &Error) + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                subscriptions: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(1),
                closed: AtomicBool::new(false),
                tracker: TaskTracker::new(),
                error_hook: Arc::new(hook),
            }),
        }
    }

    /// Registers a subscriber receiving every message.
    pub fn subscribe(
        &self,
        subscriber: Arc<dyn Subscriber<E>>,
    ) -> Result<SubscriptionId, Error> {
        self.subscribe_filtered(subscriber, |_| true)
    }

    /// Registers a subscriber receiving only messages published under `topic`.
    pub fn subscribe_topic(
        &self,
        subscriber: Arc<dyn Subscriber<E>>,
        topic: &str,
    ) -> Result<SubscriptionId, Error> {
        let topic = topic.to_owned();
        self.subscribe_filtered(subscriber, move |message| {
            message.topic() == Some(topic.as_str())
        })
    }

    /// Registers a subscriber receiving messages accepted by `filter`.
    pub fn subscribe_filtered<F>(
        &self,
        subscriber: Arc<dyn Subscriber<E>>,
        filter: F,
    ) -> Result<SubscriptionId, Error>
    where
        F: Fn(&Published<E>) -> bool + Send + Sync + 'static,
    {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(Error::Closed);
        }
        let id =
            SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = mpsc::unbounded_channel();
        let sink = Sink::new(
            id,
            subscriber.clone(),
            receiver,
            self.inner.error_hook.clone(),
        );
        self.inner.tracker.spawn(sink.run().in_current_span());
        self.write().push(Subscription {
            id,
            subscriber,
            filter: Arc::new(filter),
            sender,
        });
        debug!("Subscription {} registered.", id);
        Ok(id)
    }

    /// Removes the given subscriptions. Returns how many were removed.
    pub fn unsubscribe(&self, ids: &[SubscriptionId]) -> usize {
        self.remove_where(|subscription| ids.contains(&subscription.id))
    }

    /// Removes every subscription registered with this subscriber instance.
    pub fn unsubscribe_subscriber(
        &self,
        subscriber: &Arc<dyn Subscriber<E>>,
    ) -> usize {
        let target = Arc::as_ptr(subscriber) as *const ();
        self.remove_where(|subscription| {
            Arc::as_ptr(&subscription.subscriber) as *const () == target
        })
    }

    /// Publishes `payload` under `topic`. Returns the number of subscriptions
    /// the message was enqueued for.
    pub fn publish(&self, topic: &str, payload: E) -> usize {
        self.dispatch(Published::new(Some(topic.to_owned()), payload))
    }

    /// Publishes `payload` without a topic.
    pub fn publish_no_topic(&self, payload: E) -> usize {
        self.dispatch(Published::new(None, payload))
    }

    pub fn subscriber_count(&self) -> usize {
        self.read().len()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Drops every subscription and refuses new ones. Queued messages are
    /// still delivered.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
        self.write().clear();
        self.inner.tracker.close();
        debug!("Event bus closed.");
    }

    /// Waits for every consumer task to drain after [`close`](Self::close).
    /// Returns `false` if `timeout` elapsed first.
    pub async fn wait_closed(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.inner.tracker.wait())
            .await
            .is_ok()
    }

    fn dispatch(&self, message: Published<E>) -> usize {
        let subscriptions = self.read();
        let mut delivered = 0;
        for subscription in subscriptions.iter() {
            if !(subscription.filter)(&message) {
                continue;
            }
            if subscription.sender.send(message.clone()).is_ok() {
                delivered += 1;
            } else {
                debug!("Subscription {} is gone.", subscription.id);
            }
        }
        delivered
    }

    fn remove_where<P>(&self, predicate: P) -> usize
    where
        P: Fn(&Subscription<E>) -> bool,
    {
        let mut subscriptions = self.write();
        let before = subscriptions.len();
        subscriptions.retain(|subscription| {
            let remove = predicate(subscription);
            if remove {
                debug!("Subscription {} removed.", subscription.id);
            }
            !remove
        });
        before - subscriptions.len()
    }

    fn read(
        &self,
    ) -> std::sync::RwLockReadGuard<'_, Vec<Subscription<E>>> {
        self.inner
            .subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(
        &self,
    ) -> std::sync::RwLockWriteGuard<'_, Vec<Subscription<E>>> {
        self.inner
            .subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    struct Collector(Arc<Mutex<Vec<u32>>>);

    #[async_trait]
    impl Subscriber<u32> for Collector {
        async fn notify(&self, message: Published<u32>) -> Result<(), Error> {
            self.0.lock().await.push(message.into_payload());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_subscribe_and_publish() {
        let bus = EventBus::<u32>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let id = bus.subscribe(Arc::new(Collector(seen.clone()))).unwrap();
        assert_eq!(bus.subscriber_count(), 1);

        assert_eq!(bus.publish("any", 1), 1);
        assert_eq!(bus.publish_no_topic(2), 1);

        assert_eq!(bus.unsubscribe(&[id]), 1);
        assert_eq!(bus.publish("any", 3), 0);

        bus.close();
        assert!(bus.wait_closed(Duration::from_secs(1)).await);
        assert_eq!(*seen.lock().await, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_closed_bus_rejects_subscriptions() {
        let bus = EventBus::<u32>::new();
        bus.close();
        assert!(bus.is_closed());
        let seen = Arc::new(Mutex::new(Vec::new()));
        assert_eq!(
            bus.subscribe(Arc::new(Collector(seen))),
            Err(Error::Closed)
        );
    }

    #[tokio::test]
    async fn test_unsubscribe_by_instance() {
        let bus = EventBus::<u32>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let subscriber: Arc<dyn Subscriber<u32>> =
            Arc::new(Collector(seen.clone()));
        let other: Arc<dyn Subscriber<u32>> = Arc::new(Collector(seen));
        bus.subscribe(subscriber.clone()).unwrap();
        bus.subscribe_topic(subscriber.clone(), "a").unwrap();
        bus.subscribe(other).unwrap();

        assert_eq!(bus.unsubscribe_subscriber(&subscriber), 2);
        assert_eq!(bus.subscriber_count(), 1);
    }
}
