// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Event bus
//!
//! A general typed publish/subscribe component. It knows nothing about actors:
//! the actor runtime reuses it for lifecycle notifications, and applications
//! use it for their own events.
//!
//! Delivery model:
//!
//! - every subscription owns an unbounded queue and one consumer task;
//! - `publish` evaluates each subscription filter on the caller's task and
//!   enqueues, it never runs subscriber code;
//! - a subscriber sees messages in the order the bus observed the publish
//!   calls, with no ordering guarantee across subscribers;
//! - a subscriber error or panic is routed to the bus error hook and the
//!   subscriber keeps receiving subsequent messages.
//!
//! ```ignore
//! use bus::{EventBus, Published, Subscriber};
//!
//! struct Audit;
//!
//! #[async_trait]
//! impl Subscriber<String> for Audit {
//!     async fn notify(&self, message: Published<String>) -> Result<(), bus::Error> {
//!         println!("{:?}: {}", message.topic(), message.payload());
//!         Ok(())
//!     }
//! }
//!
//! let bus = EventBus::new();
//! bus.subscribe_topic(Arc::new(Audit), "orders")?;
//! bus.publish("orders", "created".to_owned());
//! ```

mod bus;
mod error;
mod subscriber;

pub use bus::EventBus;
pub use error::{Error, panic_message};
pub use subscriber::{ErrorHook, Filter, Published, Subscriber, SubscriptionId};
