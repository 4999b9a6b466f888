// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Errors module
//!

use thiserror::Error;

use std::any::Any;

/// Error type for the event bus.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum Error {
    /// A subscriber failed while processing a message.
    #[error("Subscriber failed: {0}")]
    Subscriber(String),
    /// A subscriber panicked while processing a message.
    #[error("Subscriber panicked: {0}")]
    Panic(String),
    /// The bus has been closed.
    #[error("The event bus is closed.")]
    Closed,
}

/// Extracts a readable message from a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_owned()
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new("bang".to_owned());
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
