// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! Lifecycle events published by cell workers, and the system guardian that consumes them.

use crate::{
    Error,
    actor::ActorRefId,
    system::SystemInner,
};

use async_trait::async_trait;
use bus::{Published, Subscriber};

use tracing::{debug, warn};

use std::{sync::Weak, time::Duration};

/// Why a cell worker left its receive loop, or what happened to the cell afterwards.
///
/// Events are published on the system lifecycle bus under the topic returned by
/// [`LifecycleEvent::topic`].
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    /// A PoisonPill was dequeued.
    PoisonPillTermination { id: ActorRefId },
    /// The handler failed. Supervision decides what follows.
    OnMsgTermination { id: ActorRefId, cause: Error },
    /// The mailbox wait was interrupted.
    InterruptedTermination { id: ActorRefId },
    /// Construction or `pre_start` failed. Never retried.
    InitializationTermination { id: ActorRefId, cause: Error },
    /// A replacement instance is running after a handler failure.
    Restarted {
        id: ActorRefId,
        cause: Error,
        attempt: usize,
        delay: Option<Duration>,
    },
    /// The cell is gone for good. `incarnation` tells cells at the same path apart.
    Stopped { id: ActorRefId, incarnation: u64 },
}

impl LifecycleEvent {
    pub const POISON_PILL: &'static str = "poison-pill";
    pub const ON_MSG: &'static str = "on-msg";
    pub const INTERRUPTED: &'static str = "interrupted";
    pub const INITIALIZATION: &'static str = "initialization";
    pub const RESTARTED: &'static str = "restarted";
    pub const STOPPED: &'static str = "stopped";

    pub fn id(&self) -> &ActorRefId {
        match self {
            LifecycleEvent::PoisonPillTermination { id }
            | LifecycleEvent::OnMsgTermination { id, .. }
            | LifecycleEvent::InterruptedTermination { id }
            | LifecycleEvent::InitializationTermination { id, .. }
            | LifecycleEvent::Restarted { id, .. }
            | LifecycleEvent::Stopped { id, .. } => id,
        }
    }

    /// Bus topic of the event.
    pub fn topic(&self) -> &'static str {
        match self {
            LifecycleEvent::PoisonPillTermination { .. } => Self::POISON_PILL,
            LifecycleEvent::OnMsgTermination { .. } => Self::ON_MSG,
            LifecycleEvent::InterruptedTermination { .. } => Self::INTERRUPTED,
            LifecycleEvent::InitializationTermination { .. } => {
                Self::INITIALIZATION
            }
            LifecycleEvent::Restarted { .. } => Self::RESTARTED,
            LifecycleEvent::Stopped { .. } => Self::STOPPED,
        }
    }
}

/// The system's internal lifecycle subscriber. Drops registry entries of stopped cells.
pub(crate) struct Guardian {
    system: Weak<SystemInner>,
}

impl Guardian {
    pub(crate) fn new(system: Weak<SystemInner>) -> Self {
        Self { system }
    }
}

#[async_trait]
impl Subscriber<LifecycleEvent> for Guardian {
    async fn notify(
        &self,
        message: Published<LifecycleEvent>,
    ) -> Result<(), bus::Error> {
        let event = message.into_payload();
        match &event {
            LifecycleEvent::Stopped { id, incarnation } => {
                if let Some(system) = self.system.upgrade() {
                    if system.remove_cell(id.path(), *incarnation).await {
                        debug!("Actor {} removed from the registry.", id);
                    }
                }
            }
            LifecycleEvent::OnMsgTermination { id, cause }
            | LifecycleEvent::InitializationTermination { id, cause } => {
                warn!("Actor {} failed: {}", id, cause);
            }
            _ => debug!("Lifecycle event: {:?}", event),
        }
        Ok(())
    }
}
