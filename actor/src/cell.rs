// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Actor cell
//!
//! The `ActorCell` is the live runtime wrapper around one actor: it owns the mailbox receiver,
//! the current actor instance and the supervision state, and it drives all of them from a
//! single dedicated Tokio task. Nothing outside that task ever touches the actor instance, so
//! user actor code needs no locking.
//!
//! # State machine
//!
//! ```text
//!            pre_start ok                  handler error, strategy restarts
//! Starting ───────────────► Running ─────────────────────────────► Restarting
//!    │                        │  ▲                                      │
//!    │ constructor or         │  └──────────── new instance, ───────────┘
//!    │ pre_start failed       │                post_restart
//!    ▼                        ▼ PoisonPill, interruption, handler error with Stop,
//! Stopped ◄───────────────────┘ backoff budget exhausted
//! ```
//!
//! Every exit from the receive loop publishes a [`LifecycleEvent`] on the system lifecycle
//! bus. The terminal path always ends with `post_stop` (when an instance exists), closing the
//! mailbox, and a final `Stopped` event which the system guardian uses to drop the registry
//! entry.
//!
//! # Ordering
//!
//! The receive loop takes one envelope at a time. Restarts keep the mailbox, so queued
//! messages survive a restart in their original order. A PoisonPill only terminates the cell
//! once every envelope queued before it has been handled.
//!

use crate::{
    Error,
    actor::{Actor, ActorContext, ActorLifecycle, ActorRef, ActorRefId},
    lifecycle::LifecycleEvent,
    mailbox::{Envelope, MailboxReceiver},
    props::Props,
    supervision::{Directive, Supervisor},
    system::ActorSystem,
};

use bus::{EventBus, panic_message};
use futures::FutureExt;
use tokio::{select, time::Instant};
use tokio_util::sync::CancellationToken;

use tracing::{debug, error, warn};

use std::{future::Future, panic::AssertUnwindSafe, time::Duration};

/// Why the receive loop returned.
enum Exit {
    PoisonPill,
    Interrupted,
    Failed(Error),
}

/// Outcome of a restart attempt.
enum Restart<A> {
    Resumed(A),
    InitFailed(Error),
    Interrupted,
}

/// Runs a hook or handler future, turning a panic into [`Error::Panic`].
async fn guarded<T, F>(future: F) -> Result<T, Error>
where
    F: Future<Output = Result<T, Error>>,
{
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| Err(Error::Panic(panic_message(payload.as_ref()))))
}

pub(crate) struct ActorCell<A: Actor> {
    id: ActorRefId,
    incarnation: u64,
    props: Props<A>,
    lifecycle: ActorLifecycle,
    receiver: MailboxReceiver<A>,
    supervisor: Supervisor,
    events: EventBus<LifecycleEvent>,
    token: CancellationToken,
}

impl<A: Actor> ActorCell<A> {
    pub(crate) fn new(
        id: ActorRefId,
        incarnation: u64,
        props: Props<A>,
        receiver: MailboxReceiver<A>,
        events: EventBus<LifecycleEvent>,
        token: CancellationToken,
    ) -> Self {
        debug!("Creating new actor cell {}.", &id);
        Self {
            id,
            incarnation,
            props,
            lifecycle: ActorLifecycle::Starting,
            receiver,
            supervisor: Supervisor::new(A::supervision_strategy()),
            events,
            token,
        }
    }

    /// Worker body. Returns once the cell is stopped.
    pub(crate) async fn run(mut self, system: ActorSystem, myself: ActorRef<A>) {
        let mut ctx = ActorContext::new(system, myself);

        let mut actor = match self.start(&mut ctx).await {
            Ok(actor) => actor,
            Err(cause) => {
                error!("Actor {} failed to start: {}", &self.id, cause);
                self.publish(LifecycleEvent::InitializationTermination {
                    id: self.id.clone(),
                    cause,
                });
                self.terminate(None, &mut ctx).await;
                return;
            }
        };

        loop {
            self.lifecycle = ActorLifecycle::Running;
            debug!("Actor {} is {:?}.", &self.id, self.lifecycle);
            match self.receive(&mut actor, &mut ctx).await {
                Exit::PoisonPill => {
                    debug!("Actor {} received a poison pill.", &self.id);
                    self.publish(LifecycleEvent::PoisonPillTermination {
                        id: self.id.clone(),
                    });
                    break;
                }
                Exit::Interrupted => {
                    debug!("Actor {} was interrupted.", &self.id);
                    self.publish(LifecycleEvent::InterruptedTermination {
                        id: self.id.clone(),
                    });
                    break;
                }
                Exit::Failed(cause) => {
                    error!("Actor {} failed: {}", &self.id, cause);
                    self.publish(LifecycleEvent::OnMsgTermination {
                        id: self.id.clone(),
                        cause: cause.clone(),
                    });
                    match self.supervisor.on_failure(Instant::now()) {
                        Directive::Stop => break,
                        Directive::Restart(delay) => {
                            match self.restart(actor, cause, delay, &mut ctx).await
                            {
                                Restart::Resumed(fresh) => actor = fresh,
                                Restart::InitFailed(cause) => {
                                    error!(
                                        "Actor {} failed to restart: {}",
                                        &self.id, cause
                                    );
                                    self.publish(
                                        LifecycleEvent::InitializationTermination {
                                            id: self.id.clone(),
                                            cause,
                                        },
                                    );
                                    self.terminate(None, &mut ctx).await;
                                    return;
                                }
                                Restart::Interrupted => {
                                    self.publish(
                                        LifecycleEvent::InterruptedTermination {
                                            id: self.id.clone(),
                                        },
                                    );
                                    self.terminate(None, &mut ctx).await;
                                    return;
                                }
                            }
                        }
                    }
                }
            }
        }

        self.terminate(Some(actor), &mut ctx).await;
    }

    /// Builds an instance through the props and runs `pre_start`.
    async fn start(&mut self, ctx: &mut ActorContext<A>) -> Result<A, Error> {
        self.lifecycle = ActorLifecycle::Starting;
        debug!("Actor {} is starting.", &self.id);
        let mut actor = self.props.produce()?;
        guarded(actor.pre_start(ctx)).await?;
        debug!("Actor {} has started successfully.", &self.id);
        Ok(actor)
    }

    /// Handles envelopes until a PoisonPill, an interruption or a handler failure.
    async fn receive(
        &mut self,
        actor: &mut A,
        ctx: &mut ActorContext<A>,
    ) -> Exit {
        loop {
            let envelope = select! {
                biased;
                _ = self.token.cancelled() => return Exit::Interrupted,
                envelope = self.receiver.recv() => envelope,
            };
            let (payload, reply) = match envelope {
                Some(Envelope::Message { payload, reply }) => (payload, reply),
                Some(Envelope::PoisonPill) => return Exit::PoisonPill,
                None => return Exit::Interrupted,
            };

            ctx.set_reply(reply);
            let result = guarded(actor.handle(payload, ctx)).await;
            let reply = ctx.take_reply();
            match result {
                Ok(response) => {
                    if let Some(mut reply) = reply {
                        reply.reply(response);
                    }
                }
                Err(cause) => {
                    if let Some(mut reply) = reply {
                        reply.fail(cause.clone());
                    }
                    return Exit::Failed(cause);
                }
            }
        }
    }

    /// Replaces a failed instance, keeping the mailbox.
    async fn restart(
        &mut self,
        mut actor: A,
        cause: Error,
        delay: Option<Duration>,
        ctx: &mut ActorContext<A>,
    ) -> Restart<A> {
        self.lifecycle = ActorLifecycle::Restarting;
        if let Err(err) = guarded(actor.pre_restart(ctx, &cause)).await {
            warn!("Actor {} pre_restart failed: {}", &self.id, err);
        }
        drop(actor);

        if let Some(delay) = delay {
            debug!("Backoff for {:?} before restarting {}.", delay, &self.id);
            select! {
                _ = self.token.cancelled() => return Restart::Interrupted,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        let mut actor = match self.start(ctx).await {
            Ok(actor) => actor,
            Err(err) => return Restart::InitFailed(err),
        };
        if let Err(err) = guarded(actor.post_restart(ctx, &cause)).await {
            warn!("Actor {} post_restart failed: {}", &self.id, err);
        }
        debug!(
            "Actor {} restarted, attempt {}.",
            &self.id,
            self.supervisor.failures()
        );
        self.publish(LifecycleEvent::Restarted {
            id: self.id.clone(),
            cause,
            attempt: self.supervisor.failures(),
            delay,
        });
        Restart::Resumed(actor)
    }

    /// Terminal transition.
    async fn terminate(&mut self, actor: Option<A>, ctx: &mut ActorContext<A>) {
        self.lifecycle = ActorLifecycle::Stopped;
        self.receiver.close();
        self.discard_pending();
        if let Some(mut actor) = actor {
            if let Err(err) = guarded(actor.post_stop(ctx)).await {
                error!("Actor {} failed to stop: {}", &self.id, err);
            }
        }
        debug!("Actor {} is terminated.", &self.id);
        self.publish(LifecycleEvent::Stopped {
            id: self.id.clone(),
            incarnation: self.incarnation,
        });
    }

    /// Drops envelopes still queued in the closed mailbox. Pending asks fail right away instead
    /// of waiting for their deadline.
    fn discard_pending(&mut self) {
        let mut dropped = 0;
        while let Ok(envelope) = self.receiver.try_recv() {
            if let Envelope::Message {
                reply: Some(mut reply),
                ..
            } = envelope
            {
                reply.fail(Error::Send(format!("actor {} stopped", self.id)));
            }
            dropped += 1;
        }
        if dropped > 0 {
            debug!("Actor {} discarded {} queued messages.", &self.id, dropped);
        }
    }

    fn publish(&self, event: LifecycleEvent) {
        self.events.publish(event.topic(), event);
    }
}
