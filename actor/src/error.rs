// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Errors module
//!

use crate::ActorPath;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::time::Duration;

/// Error type for the actor system.
///
/// Handler failures travel as values of this type: they settle pending `ask` replies and
/// feed the supervision strategy, so the type is `Clone`.
#[derive(Clone, Debug, Error, PartialEq, Serialize, Deserialize)]
pub enum Error {
    /// The actor type has no registered props.
    #[error("Actor type {0} is not registered.")]
    NotRegistered(String),
    /// The path is already bound to a live actor of a different type.
    #[error("Actor {0} exists with a different type.")]
    Exists(ActorPath),
    /// The path can not address an actor.
    #[error("Invalid actor path: '{0}'.")]
    InvalidPath(String),
    /// No reply arrived before the deadline.
    #[error("Ask to {path} timed out after {timeout:?}.")]
    AskTimeout { path: ActorPath, timeout: Duration },
    /// An error occurred while sending a message to an actor.
    #[error("An error occurred while sending a message to actor: {0}.")]
    Send(String),
    /// The constructor or `pre_start` failed.
    #[error("An error occurred while starting an actor: {0}.")]
    Start(String),
    /// A panic was caught at the actor boundary.
    #[error("Actor panicked: {0}")]
    Panic(String),
    /// The system no longer creates actors.
    #[error("The actor system is shutting down.")]
    ShuttingDown,
    /// Error that does not compromise the operation of the system.
    #[error("Error: {0}")]
    Functional(String),
}
