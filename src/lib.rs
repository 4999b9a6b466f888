// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! Facade of the Troupe framework.
//! Re-exports the actor runtime and the typed event bus it publishes lifecycle events on.

pub use actor::{
    Actor, ActorContext, ActorLifecycle, ActorPath, ActorRef, ActorRefId,
    ActorSystem, AnyActorRef, BackoffPolicy, Error as ActorError, Handler,
    LifecycleEvent, Message, Props, ReplySlot, Response, SupervisionStrategy,
    SystemConfig,
};

pub use bus::{
    Error as BusError, ErrorHook, EventBus, Filter, Published, Subscriber,
    SubscriptionId,
};
