// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! Subscriber side of the event bus.
//!
//! Every subscription owns an unbounded queue and a dedicated consumer task (a
//! [`Sink`]). The bus only enqueues; the sink is the one that invokes the
//! subscriber, so a slow or failing subscriber never holds up a publisher or
//! its siblings.

use crate::error::{Error, panic_message};

use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::mpsc::UnboundedReceiver;

use tracing::debug;

use std::{fmt, panic::AssertUnwindSafe, sync::Arc};

/// Unique token identifying one subscription on a bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub(crate) u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// A message as seen by subscribers: an optional topic plus the payload.
#[derive(Clone, Debug, PartialEq)]
pub struct Published<E> {
    topic: Option<String>,
    payload: E,
}

impl<E> Published<E> {
    pub(crate) fn new(topic: Option<String>, payload: E) -> Self {
        Self { topic, payload }
    }

    /// Topic the message was published under, if any.
    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}

/// Trait for components that process messages published on an [`EventBus`].
///
/// Returning an error (or panicking) is reported through the bus error hook
/// and does not stop the subscription: the next message is delivered normally.
///
/// [`EventBus`]: crate::EventBus
#[async_trait]
pub trait Subscriber<E>: Send + Sync + 'static
where
    E: Send + 'static,
{
    /// Called once per matching message, in publish order.
    async fn notify(&self, message: Published<E>) -> Result<(), Error>;
}

/// Predicate deciding which messages reach a subscription.
pub type Filter<E> = Arc<dyn Fn(&Published<E>) -> bool + Send + Sync>;

/// Callback receiving subscriber failures.
pub type ErrorHook = Arc<dyn Fn(SubscriptionId, &Error) + Send + Sync>;

/// Consumer loop of one subscription.
pub(crate) struct Sink<E: Send + 'static> {
    id: SubscriptionId,
    subscriber: Arc<dyn Subscriber<E>>,
    receiver: UnboundedReceiver<Published<E>>,
    error_hook: ErrorHook,
}

impl<E: Send + 'static> Sink<E> {
    pub(crate) fn new(
        id: SubscriptionId,
        subscriber: Arc<dyn Subscriber<E>>,
        receiver: UnboundedReceiver<Published<E>>,
        error_hook: ErrorHook,
    ) -> Self {
        Self {
            id,
            subscriber,
            receiver,
            error_hook,
        }
    }

    /// Runs until every sender of the subscription queue is gone. Messages
    /// already queued at unsubscribe time are still delivered.
    pub(crate) async fn run(mut self) {
        debug!("Subscription {} is running.", self.id);
        while let Some(message) = self.receiver.recv().await {
            let result = AssertUnwindSafe(self.subscriber.notify(message))
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| {
                    Err(Error::Panic(panic_message(payload.as_ref())))
                });
            if let Err(error) = result {
                (self.error_hook)(self.id, &error);
            }
        }
        debug!("Subscription {} is finished.", self.id);
    }
}
