// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Actor
//!
//! The `actor` module provides the `Actor` and `Handler` traits, the execution context handed
//! to them, and the references used to reach a running actor.
//!

use crate::{
    ActorPath, Error,
    mailbox::{Envelope, MailboxSender, ReplySlot},
    supervision::SupervisionStrategy,
    system::{ActorSystem, SystemInner},
};

use async_trait::async_trait;
use tokio::{sync::mpsc::error::SendError, time::Instant};

use tracing::debug;

use std::{
    any::{Any, TypeId, type_name},
    fmt,
    sync::{Arc, Weak},
    time::Duration,
};

/// Identity of one logical actor: its path plus its concrete type.
///
/// Restarts keep the identity; a cell created after a permanent stop shares it too, the two
/// incarnations are told apart by the system only.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ActorRefId {
    path: ActorPath,
    type_id: TypeId,
    type_name: &'static str,
}

impl ActorRefId {
    pub(crate) fn of<A: Actor>(path: ActorPath) -> Self {
        Self {
            path,
            type_id: TypeId::of::<A>(),
            type_name: type_name::<A>(),
        }
    }

    pub fn path(&self) -> &ActorPath {
        &self.path
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for ActorRefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.path, self.type_name)
    }
}

impl fmt::Display for ActorRefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)
    }
}

/// Lifecycle state of an actor cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorLifecycle {
    /// Instance being constructed, `pre_start` not yet completed.
    Starting,
    /// Processing its mailbox.
    Running,
    /// Failed instance discarded, replacement pending.
    Restarting,
    /// Terminal.
    Stopped,
}

/// Marker for actor messages.
///
/// A message type is usually an enum whose variants the handler matches exhaustively.
pub trait Message: Send + 'static {}

/// Marker for actor responses. Any sendable owned value qualifies.
pub trait Response: Send + 'static {}

impl<T: Send + 'static> Response for T {}

/// The actor trait: associated message types, supervision policy and lifecycle hooks.
///
/// Hooks run on the actor's own worker. An error returned from `pre_start` (or from the props
/// constructor) stops the actor for good; errors from the other hooks are logged and otherwise
/// ignored.
///
/// ```ignore
/// #[derive(Default)]
/// struct Counter { total: u64 }
///
/// enum CounterMessage { Add(u64), GetTotal }
/// impl Message for CounterMessage {}
///
/// #[async_trait]
/// impl Actor for Counter {
///     type Message = CounterMessage;
///     type Response = u64;
///
///     fn supervision_strategy() -> SupervisionStrategy {
///         SupervisionStrategy::Restart
///     }
/// }
///
/// #[async_trait]
/// impl Handler<Counter> for Counter {
///     async fn handle(
///         &mut self,
///         msg: CounterMessage,
///         _ctx: &mut ActorContext<Counter>,
///     ) -> Result<u64, Error> {
///         if let CounterMessage::Add(n) = msg {
///             self.total += n;
///         }
///         Ok(self.total)
///     }
/// }
/// ```
#[async_trait]
pub trait Actor: Send + Sized + 'static + Handler<Self> {
    type Message: Message;
    type Response: Response;

    /// Policy applied when `handle` fails. Defaults to [`SupervisionStrategy::Stop`].
    fn supervision_strategy() -> SupervisionStrategy {
        SupervisionStrategy::Stop
    }

    async fn pre_start(
        &mut self,
        _ctx: &mut ActorContext<Self>,
    ) -> Result<(), Error> {
        Ok(())
    }

    async fn post_stop(
        &mut self,
        _ctx: &mut ActorContext<Self>,
    ) -> Result<(), Error> {
        Ok(())
    }

    /// Runs on the failed instance before it is discarded.
    async fn pre_restart(
        &mut self,
        _ctx: &mut ActorContext<Self>,
        _cause: &Error,
    ) -> Result<(), Error> {
        Ok(())
    }

    /// Runs on the replacement instance, after its `pre_start`.
    async fn post_restart(
        &mut self,
        _ctx: &mut ActorContext<Self>,
        _cause: &Error,
    ) -> Result<(), Error> {
        Ok(())
    }
}

/// Message handler.
///
/// The returned value settles the pending `ask` reply, if any. Returning an error (or
/// panicking) fails that reply with the same error and hands the actor to its supervision
/// strategy. A handler that wants to answer later detaches the slot with
/// [`ActorContext::take_reply`].
#[async_trait]
pub trait Handler<A: Actor>: Send {
    async fn handle(
        &mut self,
        msg: A::Message,
        ctx: &mut ActorContext<A>,
    ) -> Result<A::Response, Error>;
}

/// Execution context handed to handlers and hooks.
pub struct ActorContext<A: Actor> {
    system: ActorSystem,
    myself: ActorRef<A>,
    reply: Option<ReplySlot<A::Response>>,
}

impl<A: Actor> ActorContext<A> {
    pub(crate) fn new(system: ActorSystem, myself: ActorRef<A>) -> Self {
        Self {
            system,
            myself,
            reply: None,
        }
    }

    pub fn path(&self) -> &ActorPath {
        self.myself.path()
    }

    pub fn id(&self) -> &ActorRefId {
        self.myself.id()
    }

    /// Reference to this actor.
    pub fn myself(&self) -> ActorRef<A> {
        self.myself.clone()
    }

    pub fn system(&self) -> &ActorSystem {
        &self.system
    }

    /// Creates (or returns) the child `name` of this actor. `name` is a single segment:
    /// blank names and names containing `/` are rejected with [`Error::InvalidPath`].
    pub async fn create_child<C: Actor>(
        &self,
        name: &str,
    ) -> Result<ActorRef<C>, Error> {
        let path = self
            .path()
            .child(name)
            .ok_or_else(|| Error::InvalidPath(name.to_owned()))?;
        self.system.actor_of::<C>(path).await
    }

    /// Live direct children of this actor.
    pub async fn children(&self) -> Vec<AnyActorRef> {
        self.system.children(self.path()).await
    }

    /// Detaches the reply slot of the message being handled. The handler's return value is then
    /// not sent anywhere; whoever holds the slot settles it.
    pub fn take_reply(&mut self) -> Option<ReplySlot<A::Response>> {
        self.reply.take()
    }

    /// Enqueues a PoisonPill to this actor: messages already queued are handled first.
    pub fn stop(&self) -> bool {
        self.myself.tell_stop()
    }

    pub(crate) fn set_reply(&mut self, reply: Option<ReplySlot<A::Response>>) {
        self.reply = reply;
    }
}

/// Typed reference to an actor.
///
/// References stay valid across restarts, which keep the mailbox. When the actor has stopped
/// for good, sending through an old reference reaches a fresh actor created at the same path.
pub struct ActorRef<A: Actor> {
    id: ActorRefId,
    mailbox: MailboxSender<A>,
    system: Weak<SystemInner>,
}

impl<A: Actor> ActorRef<A> {
    pub(crate) fn new(
        id: ActorRefId,
        mailbox: MailboxSender<A>,
        system: Weak<SystemInner>,
    ) -> Self {
        Self {
            id,
            mailbox,
            system,
        }
    }

    pub fn id(&self) -> &ActorRefId {
        &self.id
    }

    pub fn path(&self) -> &ActorPath {
        &self.id.path
    }

    /// True once the cell behind this reference has stopped.
    pub fn is_closed(&self) -> bool {
        self.mailbox.is_closed()
    }

    /// Fire-and-forget send.
    pub async fn tell(&self, message: A::Message) -> Result<(), Error> {
        debug!("Telling message to actor {}.", self.path());
        self.deliver(Envelope::tell(message)).await
    }

    /// Request/response send. Resolves with the handler's reply, with the handler's error if
    /// it failed, or with [`Error::AskTimeout`] once `timeout` elapsed without a reply.
    pub async fn ask(
        &self,
        message: A::Message,
        timeout: Duration,
    ) -> Result<A::Response, Error> {
        debug!("Asking message to actor {}.", self.path());
        let deadline = Instant::now() + timeout;
        let (slot, receiver) = ReplySlot::channel();
        self.deliver(Envelope::ask(message, slot)).await?;
        match tokio::time::timeout_at(deadline, receiver).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => {
                // Slot dropped unsettled: the caller still waits for its deadline.
                tokio::time::sleep_until(deadline).await;
                Err(self.timeout(timeout))
            }
            Err(_) => Err(self.timeout(timeout)),
        }
    }

    /// `ask` with the system's default timeout.
    pub async fn ask_default(
        &self,
        message: A::Message,
    ) -> Result<A::Response, Error> {
        let timeout = match self.system.upgrade() {
            Some(inner) => inner.config().default_ask_timeout,
            None => return Err(Error::ShuttingDown),
        };
        self.ask(message, timeout).await
    }

    /// Enqueues a PoisonPill. Returns `false` if the actor already stopped.
    pub fn tell_stop(&self) -> bool {
        self.mailbox.send(Envelope::PoisonPill).is_ok()
    }

    async fn deliver(&self, envelope: Envelope<A>) -> Result<(), Error> {
        let envelope = match self.mailbox.send(envelope) {
            Ok(()) => return Ok(()),
            Err(SendError(envelope)) => envelope,
        };
        debug!("Actor {} has stopped, addressing a fresh cell.", self.path());
        let system = self
            .system
            .upgrade()
            .map(ActorSystem::from_inner)
            .ok_or(Error::ShuttingDown)?;
        let fresh = system.actor_of::<A>(self.path().clone()).await?;
        fresh.mailbox.send(envelope).map_err(|_| {
            Error::Send(format!("mailbox of {} is closed", self.path()))
        })
    }

    fn timeout(&self, timeout: Duration) -> Error {
        Error::AskTimeout {
            path: self.path().clone(),
            timeout,
        }
    }
}

impl<A: Actor> Clone for ActorRef<A> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            mailbox: self.mailbox.clone(),
            system: self.system.clone(),
        }
    }
}

impl<A: Actor> fmt::Debug for ActorRef<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ActorRef").field(&self.id).finish()
    }
}

/// Type-erased operations on a live actor reference.
trait UntypedRef: Send + Sync {
    fn id(&self) -> &ActorRefId;
    fn tell_stop(&self) -> bool;
    fn is_closed(&self) -> bool;
    fn as_any(&self) -> &dyn Any;
}

impl<A: Actor> UntypedRef for ActorRef<A> {
    fn id(&self) -> &ActorRefId {
        ActorRef::id(self)
    }

    fn tell_stop(&self) -> bool {
        ActorRef::tell_stop(self)
    }

    fn is_closed(&self) -> bool {
        ActorRef::is_closed(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Untyped reference returned by path lookups. Use [`downcast`](Self::downcast) to message it.
#[derive(Clone)]
pub struct AnyActorRef {
    inner: Arc<dyn UntypedRef>,
}

impl AnyActorRef {
    pub(crate) fn new<A: Actor>(actor_ref: ActorRef<A>) -> Self {
        Self {
            inner: Arc::new(actor_ref),
        }
    }

    pub fn id(&self) -> &ActorRefId {
        self.inner.id()
    }

    pub fn path(&self) -> &ActorPath {
        self.inner.id().path()
    }

    pub fn type_name(&self) -> &'static str {
        self.inner.id().type_name()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// Enqueues a PoisonPill. Returns `false` if the actor already stopped.
    pub fn tell_stop(&self) -> bool {
        self.inner.tell_stop()
    }

    /// Typed view of this reference, if the actor is an `A`.
    pub fn downcast<A: Actor>(&self) -> Option<ActorRef<A>> {
        self.inner.as_any().downcast_ref::<ActorRef<A>>().cloned()
    }
}

impl fmt::Debug for AnyActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AnyActorRef").field(self.id()).finish()
    }
}
