// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Actor system
//!
//! The `system` module provides the `ActorSystem` type. The `ActorSystem` is the single source
//! of truth for actor-type registration, actor lifecycle and addressing: it keeps the props of
//! every registered actor type, the directory of live cells keyed by path, and the lifecycle
//! bus on which cells report why they exited.
//!

use crate::{
    Actor, ActorPath, ActorRef, Error,
    actor::{ActorRefId, AnyActorRef},
    cell::ActorCell,
    config::SystemConfig,
    lifecycle::{Guardian, LifecycleEvent},
    mailbox::mailbox,
    props::Props,
};

use bus::EventBus;
use tokio::sync::RwLock;
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use tracing::{Instrument, debug, error, warn};

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};

/// Registry entry of one live cell.
struct CellEntry {
    incarnation: u64,
    actor: AnyActorRef,
}

/// Shared state behind every `ActorSystem` handle.
pub(crate) struct SystemInner {
    config: SystemConfig,
    /// Props by actor type, each boxed as `Props<A>`.
    props: RwLock<HashMap<TypeId, Box<dyn Any + Send + Sync + 'static>>>,
    /// Live cells. A path is bound to at most one actor type at a time.
    cells: RwLock<HashMap<ActorPath, CellEntry>>,
    lifecycle: EventBus<LifecycleEvent>,
    tracker: TaskTracker,
    token: CancellationToken,
    shutting_down: AtomicBool,
    incarnations: AtomicU64,
}

impl SystemInner {
    pub(crate) fn config(&self) -> &SystemConfig {
        &self.config
    }

    /// Removes the entry at `path` if it still belongs to `incarnation`.
    pub(crate) async fn remove_cell(
        &self,
        path: &ActorPath,
        incarnation: u64,
    ) -> bool {
        let mut cells = self.cells.write().await;
        match cells.get(path) {
            Some(entry) if entry.incarnation == incarnation => {
                cells.remove(path);
                true
            }
            _ => false,
        }
    }
}

/// Actor system handle.
///
/// Cheap to clone; every clone addresses the same registry. Creating a system spawns its
/// lifecycle guardian, so it must happen inside a Tokio runtime.
///
/// ```ignore
/// let system = ActorSystem::new(SystemConfig::default());
/// system.register_props(Props::new(Counter::default)).await;
///
/// system.tell_named::<Counter>("counter", CounterMessage::Add(2)).await?;
/// system.tell_named::<Counter>("counter", CounterMessage::Add(3)).await?;
/// let total = system
///     .ask_named::<Counter>("counter", CounterMessage::GetTotal, Duration::from_secs(1))
///     .await?;
/// assert_eq!(total, 5);
///
/// assert!(system.shutdown().await);
/// ```
#[derive(Clone)]
pub struct ActorSystem {
    inner: Arc<SystemInner>,
}

impl Default for ActorSystem {
    fn default() -> Self {
        Self::new(SystemConfig::default())
    }
}

impl ActorSystem {
    /// Creates an actor system.
    pub fn new(config: SystemConfig) -> Self {
        Self::with_token(config, CancellationToken::new())
    }

    /// Creates an actor system interrupted when `token` is cancelled.
    ///
    /// Cancelling the token wakes every worker blocked on its mailbox; those workers stop with
    /// an `InterruptedTermination` event without handling any further message.
    pub fn with_token(config: SystemConfig, token: CancellationToken) -> Self {
        let inner = Arc::new(SystemInner {
            config,
            props: RwLock::new(HashMap::new()),
            cells: RwLock::new(HashMap::new()),
            lifecycle: EventBus::new(),
            tracker: TaskTracker::new(),
            token,
            shutting_down: AtomicBool::new(false),
            incarnations: AtomicU64::new(1),
        });
        let guardian = Arc::new(Guardian::new(Arc::downgrade(&inner)));
        if let Err(err) = inner.lifecycle.subscribe(guardian) {
            error!("Can not subscribe the system guardian: {}", err);
        }
        debug!("Actor system created.");
        ActorSystem { inner }
    }

    pub(crate) fn from_inner(inner: Arc<SystemInner>) -> Self {
        ActorSystem { inner }
    }

    pub fn config(&self) -> &SystemConfig {
        &self.inner.config
    }

    /// The bus on which cells publish their [`LifecycleEvent`]s.
    pub fn lifecycle(&self) -> &EventBus<LifecycleEvent> {
        &self.inner.lifecycle
    }

    /// Root under which bare actor names live, `/user` by default.
    pub fn user_root(&self) -> ActorPath {
        ActorPath::from(self.inner.config.root_guardian.as_str())
    }

    /// Registers the factory of an actor type. Registering the same type again replaces the
    /// previous factory; cells already running keep the one they were created with.
    pub async fn register_props<A: Actor>(&self, props: Props<A>) {
        debug!("Registering props for {}.", Props::<A>::type_name());
        let mut registry = self.inner.props.write().await;
        registry.insert(Props::<A>::type_id(), Box::new(props));
    }

    async fn props<A: Actor>(&self) -> Result<Props<A>, Error> {
        let registry = self.inner.props.read().await;
        registry
            .get(&Props::<A>::type_id())
            .and_then(|any| any.downcast_ref::<Props<A>>().cloned())
            .ok_or_else(|| Error::NotRegistered(Props::<A>::type_name().to_owned()))
    }

    /// Returns the actor of type `A` at `path`, creating it if no live cell is there.
    ///
    /// Concurrent callers racing on the same path all get the same cell.
    ///
    /// # Errors
    ///
    /// - [`Error::NotRegistered`] if `A` has no props.
    /// - [`Error::Exists`] if a live actor of another type owns the path.
    /// - [`Error::InvalidPath`] for the empty path.
    /// - [`Error::ShuttingDown`] once a shutdown started.
    ///
    pub async fn actor_of<A: Actor>(
        &self,
        path: ActorPath,
    ) -> Result<ActorRef<A>, Error> {
        if path.is_empty() {
            return Err(Error::InvalidPath(path.to_string()));
        }
        {
            let cells = self.inner.cells.read().await;
            if let Some(entry) = cells.get(&path) {
                if !entry.actor.is_closed() {
                    return Self::typed(entry, &path);
                }
            }
        }

        let props = self.props::<A>().await?;
        let mut cells = self.inner.cells.write().await;
        if let Some(entry) = cells.get(&path) {
            if !entry.actor.is_closed() {
                return Self::typed(entry, &path);
            }
        }
        if self.inner.shutting_down.load(Ordering::Acquire) {
            return Err(Error::ShuttingDown);
        }

        let incarnation = self.inner.incarnations.fetch_add(1, Ordering::Relaxed);
        let id = ActorRefId::of::<A>(path.clone());
        let (sender, receiver) = mailbox::<A>();
        let actor_ref =
            ActorRef::new(id.clone(), sender, Arc::downgrade(&self.inner));
        let cell = ActorCell::new(
            id,
            incarnation,
            props,
            receiver,
            self.inner.lifecycle.clone(),
            self.inner.token.clone(),
        );
        cells.insert(
            path,
            CellEntry {
                incarnation,
                actor: AnyActorRef::new(actor_ref.clone()),
            },
        );
        self.inner.tracker.spawn(
            cell.run(self.clone(), actor_ref.clone()).in_current_span(),
        );
        Ok(actor_ref)
    }

    /// `actor_of` at `user_root()/name`. `name` must be a single non-blank segment, otherwise
    /// [`Error::InvalidPath`] is returned.
    pub async fn actor_of_named<A: Actor>(
        &self,
        name: &str,
    ) -> Result<ActorRef<A>, Error> {
        let path = self
            .user_root()
            .child(name)
            .ok_or_else(|| Error::InvalidPath(name.to_owned()))?;
        self.actor_of::<A>(path).await
    }

    fn typed<A: Actor>(
        entry: &CellEntry,
        path: &ActorPath,
    ) -> Result<ActorRef<A>, Error> {
        entry
            .actor
            .downcast::<A>()
            .ok_or_else(|| Error::Exists(path.clone()))
    }

    /// Fire-and-forget send through a reference.
    pub async fn tell<A: Actor>(
        &self,
        actor: &ActorRef<A>,
        message: A::Message,
    ) -> Result<(), Error> {
        actor.tell(message).await
    }

    /// Fire-and-forget send to the actor `name` of type `A`, created on demand.
    pub async fn tell_named<A: Actor>(
        &self,
        name: &str,
        message: A::Message,
    ) -> Result<(), Error> {
        let actor = self.actor_of_named::<A>(name).await.inspect_err(|err| {
            warn!("Message to {} dropped: {}", name, err);
        })?;
        actor.tell(message).await
    }

    /// Request/response send through a reference.
    pub async fn ask<A: Actor>(
        &self,
        actor: &ActorRef<A>,
        message: A::Message,
        timeout: Duration,
    ) -> Result<A::Response, Error> {
        actor.ask(message, timeout).await
    }

    /// Request/response send to the actor `name` of type `A`, created on demand.
    pub async fn ask_named<A: Actor>(
        &self,
        name: &str,
        message: A::Message,
        timeout: Duration,
    ) -> Result<A::Response, Error> {
        let actor = self.actor_of_named::<A>(name).await?;
        actor.ask(message, timeout).await
    }

    /// Resolves a path string to the live actor registered there. Malformed strings resolve to
    /// `None`.
    pub async fn actor_selection(&self, path: &str) -> Option<AnyActorRef> {
        let path = ActorPath::parse(path)?;
        let cells = self.inner.cells.read().await;
        cells
            .get(&path)
            .filter(|entry| !entry.actor.is_closed())
            .map(|entry| entry.actor.clone())
    }

    /// Live direct children of `path`, ordered by path.
    pub async fn children(&self, path: &ActorPath) -> Vec<AnyActorRef> {
        let cells = self.inner.cells.read().await;
        let mut children: Vec<AnyActorRef> = cells
            .iter()
            .filter(|(child, entry)| {
                path.is_parent_of(child) && !entry.actor.is_closed()
            })
            .map(|(_, entry)| entry.actor.clone())
            .collect();
        children.sort_by(|a, b| a.path().cmp(b.path()));
        children
    }

    /// True if a live cell is registered at `path`.
    pub async fn is_alive(&self, path: &ActorPath) -> bool {
        let cells = self.inner.cells.read().await;
        cells.get(path).is_some_and(|entry| !entry.actor.is_closed())
    }

    /// Number of live cells.
    pub async fn live_count(&self) -> usize {
        let cells = self.inner.cells.read().await;
        cells.values().filter(|entry| !entry.actor.is_closed()).count()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.inner.shutting_down.load(Ordering::Acquire)
    }

    /// Graceful shutdown.
    ///
    /// Enqueues a PoisonPill to every live actor, so each one finishes the messages queued
    /// before it, then waits for every worker to exit. Returns `false` if `timeout` elapsed
    /// first; workers still draining are left running. No actor is created afterwards.
    pub async fn shutdown_await(&self, timeout: Duration) -> bool {
        let actors: Vec<AnyActorRef> = {
            let cells = self.inner.cells.write().await;
            self.inner.shutting_down.store(true, Ordering::Release);
            cells.values().map(|entry| entry.actor.clone()).collect()
        };
        debug!("Stopping actor system, {} actors.", actors.len());
        for actor in actors {
            actor.tell_stop();
        }
        self.inner.tracker.close();
        let clean = tokio::time::timeout(timeout, self.inner.tracker.wait())
            .await
            .is_ok();
        if clean {
            debug!("Actor system stopped.");
        } else {
            warn!("Actor system shutdown timed out after {:?}.", timeout);
        }
        clean
    }

    /// `shutdown_await` with the configured shutdown timeout.
    pub async fn shutdown(&self) -> bool {
        self.shutdown_await(self.inner.config.shutdown_timeout).await
    }

    /// Interrupts every worker waiting on its mailbox.
    pub fn interrupt(&self) {
        debug!("Interrupting actor system.");
        self.inner.token.cancel();
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    use crate::{ActorContext, Handler, Message};

    use async_trait::async_trait;

    #[derive(Default)]
    struct Echo;

    struct Say(String);

    impl Message for Say {}

    #[async_trait]
    impl Actor for Echo {
        type Message = Say;
        type Response = String;
    }

    #[async_trait]
    impl Handler<Echo> for Echo {
        async fn handle(
            &mut self,
            msg: Say,
            _ctx: &mut ActorContext<Echo>,
        ) -> Result<String, Error> {
            Ok(msg.0)
        }
    }

    #[derive(Default)]
    struct Other;

    #[async_trait]
    impl Actor for Other {
        type Message = Say;
        type Response = String;
    }

    #[async_trait]
    impl Handler<Other> for Other {
        async fn handle(
            &mut self,
            _msg: Say,
            _ctx: &mut ActorContext<Other>,
        ) -> Result<String, Error> {
            Ok(String::new())
        }
    }

    #[tokio::test]
    async fn test_unregistered_type() {
        let system = ActorSystem::default();
        let result = system.actor_of_named::<Echo>("echo").await;
        assert!(matches!(result, Err(Error::NotRegistered(_))));
        assert_eq!(system.live_count().await, 0);
    }

    #[tokio::test]
    async fn test_actor_of_returns_same_cell() {
        let system = ActorSystem::default();
        system.register_props(Props::new(|| Echo)).await;
        let first = system.actor_of_named::<Echo>("echo").await.unwrap();
        let second = system.actor_of_named::<Echo>("echo").await.unwrap();
        assert_eq!(first.id(), second.id());
        assert_eq!(system.live_count().await, 1);
    }

    #[tokio::test]
    async fn test_path_bound_to_one_type() {
        let system = ActorSystem::default();
        system.register_props(Props::new(|| Echo)).await;
        system.register_props(Props::new(|| Other)).await;
        system.actor_of_named::<Echo>("shared").await.unwrap();
        let result = system.actor_of_named::<Other>("shared").await;
        assert_eq!(
            result.unwrap_err(),
            Error::Exists(ActorPath::from("/user/shared"))
        );
    }

    #[tokio::test]
    async fn test_empty_path_is_invalid() {
        let system = ActorSystem::default();
        system.register_props(Props::new(|| Echo)).await;
        let result = system.actor_of::<Echo>(ActorPath::from("/")).await;
        assert!(matches!(result, Err(Error::InvalidPath(_))));
    }

    #[tokio::test]
    async fn test_no_actor_after_shutdown() {
        let system = ActorSystem::default();
        system.register_props(Props::new(|| Echo)).await;
        assert!(system.shutdown_await(Duration::from_secs(1)).await);
        assert!(system.is_shutting_down());
        let result = system.actor_of_named::<Echo>("late").await;
        assert_eq!(result.unwrap_err(), Error::ShuttingDown);
    }
}
