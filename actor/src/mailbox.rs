// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! Mailboxes, envelopes and reply slots.

use crate::{Error, actor::Actor};

use tokio::sync::{mpsc, oneshot};

use tracing::debug;

/// Unit of work queued in a mailbox.
pub(crate) enum Envelope<A: Actor> {
    /// A user message. `reply` is present only for `ask`.
    Message {
        payload: A::Message,
        reply: Option<ReplySlot<A::Response>>,
    },
    /// Graceful termination, processed in FIFO order and never handed to the actor.
    PoisonPill,
}

impl<A: Actor> Envelope<A> {
    pub(crate) fn tell(payload: A::Message) -> Self {
        Envelope::Message {
            payload,
            reply: None,
        }
    }

    pub(crate) fn ask(payload: A::Message, reply: ReplySlot<A::Response>) -> Self {
        Envelope::Message {
            payload,
            reply: Some(reply),
        }
    }
}

/// Mailbox receiver side, owned by the cell worker.
pub(crate) type MailboxReceiver<A> = mpsc::UnboundedReceiver<Envelope<A>>;

/// Mailbox sender side, shared by every reference to the actor.
pub(crate) type MailboxSender<A> = mpsc::UnboundedSender<Envelope<A>>;

/// Creates a new unbounded mailbox. Enqueueing never waits.
pub(crate) fn mailbox<A: Actor>() -> (MailboxSender<A>, MailboxReceiver<A>) {
    mpsc::unbounded_channel()
}

/// Receiving half of a reply slot.
pub(crate) type ReplyReceiver<R> = oneshot::Receiver<Result<R, Error>>;

/// Single-assignment completion slot carried by an `ask`.
///
/// The first call to [`reply`](Self::reply) or [`fail`](Self::fail) settles the slot; later
/// calls are ignored and return `false`. Dropping an unsettled slot leaves the asking side to
/// time out.
#[derive(Debug)]
pub struct ReplySlot<R> {
    sender: Option<oneshot::Sender<Result<R, Error>>>,
}

impl<R> ReplySlot<R> {
    pub(crate) fn channel() -> (Self, ReplyReceiver<R>) {
        let (sender, receiver) = oneshot::channel();
        (
            Self {
                sender: Some(sender),
            },
            receiver,
        )
    }

    /// Settles the slot with a value.
    pub fn reply(&mut self, value: R) -> bool {
        self.settle(Ok(value))
    }

    /// Settles the slot with a failure.
    pub fn fail(&mut self, error: Error) -> bool {
        self.settle(Err(error))
    }

    /// True once the slot has been settled, or the asking side is gone.
    pub fn is_settled(&self) -> bool {
        self.sender.as_ref().map_or(true, |sender| sender.is_closed())
    }

    fn settle(&mut self, result: Result<R, Error>) -> bool {
        match self.sender.take() {
            Some(sender) => {
                if sender.send(result).is_err() {
                    debug!("Reply discarded, the asking side is gone.");
                    false
                } else {
                    true
                }
            }
            None => false,
        }
    }
}
