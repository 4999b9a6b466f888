// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! Delivery, filtering and failure isolation tests for the event bus.

use async_trait::async_trait;
use bus::{Error, EventBus, Published, Subscriber, SubscriptionId};
use tokio::sync::Mutex;
use tracing_test::traced_test;

use std::{sync::Arc, time::Duration};

#[derive(Debug, Clone, PartialEq)]
pub struct Note(pub u32);

// Records every payload it sees.
#[derive(Clone, Default)]
pub struct Recorder {
    pub seen: Arc<Mutex<Vec<u32>>>,
}

#[async_trait]
impl Subscriber<Note> for Recorder {
    async fn notify(&self, message: Published<Note>) -> Result<(), Error> {
        self.seen.lock().await.push(message.payload().0);
        Ok(())
    }
}

// Fails on the first message only, then records.
#[derive(Clone, Default)]
pub struct FlakyRecorder {
    pub seen: Arc<Mutex<Vec<u32>>>,
}

#[async_trait]
impl Subscriber<Note> for FlakyRecorder {
    async fn notify(&self, message: Published<Note>) -> Result<(), Error> {
        if message.payload().0 == 1 {
            return Err(Error::Subscriber("cannot handle 1".to_owned()));
        }
        self.seen.lock().await.push(message.payload().0);
        Ok(())
    }
}

// Panics on the first message only, then records.
#[derive(Clone, Default)]
pub struct PanickingRecorder {
    pub seen: Arc<Mutex<Vec<u32>>>,
}

#[async_trait]
impl Subscriber<Note> for PanickingRecorder {
    async fn notify(&self, message: Published<Note>) -> Result<(), Error> {
        if message.payload().0 == 1 {
            panic!("message one");
        }
        self.seen.lock().await.push(message.payload().0);
        Ok(())
    }
}

async fn drain(bus: &EventBus<Note>) {
    bus.close();
    assert!(bus.wait_closed(Duration::from_secs(2)).await);
}

#[tokio::test]
async fn test_topic_filter_delivers_only_matching() {
    let bus = EventBus::new();
    let recorder = Recorder::default();
    bus.subscribe_topic(Arc::new(recorder.clone()), "a").unwrap();

    bus.publish("a", Note(1));
    bus.publish("b", Note(2));
    bus.publish_no_topic(Note(3));
    bus.publish("a", Note(4));

    drain(&bus).await;
    assert_eq!(*recorder.seen.lock().await, vec![1, 4]);
}

#[tokio::test]
async fn test_custom_filter() {
    let bus = EventBus::new();
    let recorder = Recorder::default();
    bus.subscribe_filtered(Arc::new(recorder.clone()), |message| {
        message.payload().0 % 2 == 0
    })
    .unwrap();

    for value in 0..10 {
        bus.publish_no_topic(Note(value));
    }

    drain(&bus).await;
    assert_eq!(*recorder.seen.lock().await, vec![0, 2, 4, 6, 8]);
}

#[tokio::test]
async fn test_fifo_per_subscriber() {
    let bus = EventBus::new();
    let first = Recorder::default();
    let second = Recorder::default();
    bus.subscribe(Arc::new(first.clone())).unwrap();
    bus.subscribe(Arc::new(second.clone())).unwrap();

    for value in 0..500 {
        bus.publish("n", Note(value));
    }

    drain(&bus).await;
    let expected: Vec<u32> = (0..500).collect();
    assert_eq!(*first.seen.lock().await, expected);
    assert_eq!(*second.seen.lock().await, expected);
}

#[tokio::test]
#[traced_test]
async fn test_failing_subscriber_keeps_receiving() {
    let bus = EventBus::new();
    let flaky = FlakyRecorder::default();
    let healthy = Recorder::default();
    bus.subscribe(Arc::new(flaky.clone())).unwrap();
    bus.subscribe(Arc::new(healthy.clone())).unwrap();

    bus.publish("n", Note(1));
    bus.publish("n", Note(2));

    drain(&bus).await;
    assert_eq!(*flaky.seen.lock().await, vec![2]);
    assert_eq!(*healthy.seen.lock().await, vec![1, 2]);
    assert!(logs_contain("cannot handle 1"));
}

#[tokio::test]
async fn test_panicking_subscriber_is_isolated() {
    let failures: Arc<std::sync::Mutex<Vec<(SubscriptionId, Error)>>> =
        Arc::default();
    let sink = failures.clone();
    let bus = EventBus::with_error_hook(move |id, error| {
        if let Ok(mut failures) = sink.lock() {
            failures.push((id, error.clone()));
        }
    });
    let panicking = PanickingRecorder::default();
    let id = bus.subscribe(Arc::new(panicking.clone())).unwrap();

    bus.publish("n", Note(1));
    bus.publish("n", Note(2));

    drain(&bus).await;
    assert_eq!(*panicking.seen.lock().await, vec![2]);
    let failures = failures.lock().unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, id);
    assert_eq!(failures[0].1, Error::Panic("message one".to_owned()));
}

#[tokio::test]
async fn test_unsubscribe_keeps_queued_messages() {
    let bus = EventBus::new();
    let recorder = Recorder::default();
    let id = bus.subscribe(Arc::new(recorder.clone())).unwrap();

    bus.publish("n", Note(1));
    bus.publish("n", Note(2));
    bus.unsubscribe(&[id]);
    bus.publish("n", Note(3));

    drain(&bus).await;
    assert_eq!(*recorder.seen.lock().await, vec![1, 2]);
}

#[tokio::test]
async fn test_publish_counts_matching_subscriptions() {
    let bus = EventBus::new();
    bus.subscribe_topic(Arc::new(Recorder::default()), "a").unwrap();
    bus.subscribe_topic(Arc::new(Recorder::default()), "a").unwrap();
    bus.subscribe_topic(Arc::new(Recorder::default()), "b").unwrap();

    assert_eq!(bus.publish("a", Note(0)), 2);
    assert_eq!(bus.publish("b", Note(0)), 1);
    assert_eq!(bus.publish("c", Note(0)), 0);
    drain(&bus).await;
}
