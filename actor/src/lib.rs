// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Troupe Actor System
//!
//! A typed actor runtime. Each actor lives in a cell driven by its own Tokio task, owns its
//! state privately and is reached only through its mailbox. Actors are addressed by
//! hierarchical [`ActorPath`]s, created on demand from registered [`Props`], and supervised
//! individually: a failing handler stops the actor, restarts it in place, or restarts it after
//! an exponential backoff.
//!
//! ## Getting Started
//!
//! ```ignore
//! use actor::{Actor, ActorContext, ActorSystem, Error, Handler, Message, Props, SystemConfig};
//! use async_trait::async_trait;
//! use std::time::Duration;
//!
//! #[derive(Default)]
//! struct Counter {
//!     total: u64,
//! }
//!
//! enum CounterMessage {
//!     Add(u64),
//!     GetTotal,
//! }
//!
//! impl Message for CounterMessage {}
//!
//! #[async_trait]
//! impl Actor for Counter {
//!     type Message = CounterMessage;
//!     type Response = u64;
//! }
//!
//! #[async_trait]
//! impl Handler<Counter> for Counter {
//!     async fn handle(
//!         &mut self,
//!         msg: CounterMessage,
//!         _ctx: &mut ActorContext<Counter>,
//!     ) -> Result<u64, Error> {
//!         if let CounterMessage::Add(n) = msg {
//!             self.total += n;
//!         }
//!         Ok(self.total)
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let system = ActorSystem::new(SystemConfig::default());
//!     system.register_props(Props::new(Counter::default)).await;
//!
//!     let counter = system.actor_of_named::<Counter>("counter").await?;
//!     counter.tell(CounterMessage::Add(2)).await?;
//!     counter.tell(CounterMessage::Add(3)).await?;
//!     let total = counter.ask(CounterMessage::GetTotal, Duration::from_secs(1)).await?;
//!     assert_eq!(total, 5);
//!
//!     system.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Lifecycle Events
//!
//! Every cell reports why it left its receive loop on [`ActorSystem::lifecycle`], an
//! [`EventBus`](bus::EventBus) of [`LifecycleEvent`]s. The system itself subscribes to it to
//! drop stopped cells from its registry; applications may subscribe for monitoring.
//!

mod actor;
mod cell;
mod config;
mod error;
mod lifecycle;
mod mailbox;
mod path;
mod props;
mod supervision;
mod system;

//
// Core Actor Types
//

/// The actor trait: message types, supervision policy and lifecycle hooks.
pub use actor::Actor;

/// Execution context handed to handlers and hooks.
pub use actor::ActorContext;

/// Lifecycle state of an actor cell.
pub use actor::ActorLifecycle;

/// Typed reference used to message an actor.
pub use actor::ActorRef;

/// Identity of an actor: path plus concrete type.
pub use actor::ActorRefId;

/// Type-erased reference returned by path lookups.
pub use actor::AnyActorRef;

/// Message handler implemented by every actor.
pub use actor::Handler;

/// Marker trait for actor messages.
pub use actor::Message;

/// Marker trait for actor responses.
pub use actor::Response;

/// Single-assignment reply slot carried by an `ask`.
pub use mailbox::ReplySlot;

/// Factory recipe registered per actor type.
pub use props::Props;

//
// Error Handling
//

/// Error type of every actor system operation.
pub use error::Error;

//
// Actor Addressing
//

/// Hierarchical actor address.
pub use path::ActorPath;

//
// Supervision and Lifecycle
//

/// Parameters of the exponential restart backoff.
pub use supervision::BackoffPolicy;

/// What happens to an actor whose handler failed.
pub use supervision::SupervisionStrategy;

/// Events published on the system lifecycle bus.
pub use lifecycle::LifecycleEvent;

//
// System Management
//

/// Registry, factory and router of actors.
pub use system::ActorSystem;

/// Settings of an actor system.
pub use config::SystemConfig;
