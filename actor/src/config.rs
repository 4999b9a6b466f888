// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! System configuration.

use crate::path::USER_GUARDIAN;

use serde::{Deserialize, Serialize};

use std::time::Duration;

/// Settings of an [`ActorSystem`](crate::ActorSystem).
///
/// Every field has a default, so a partial document deserializes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Timeout used by `ask_default`.
    pub default_ask_timeout: Duration,
    /// Timeout used by `shutdown`.
    pub shutdown_timeout: Duration,
    /// First segment of the paths built from bare actor names.
    pub root_guardian: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            default_ask_timeout: Duration::from_secs(5),
            shutdown_timeout: Duration::from_secs(10),
            root_guardian: USER_GUARDIAN.to_owned(),
        }
    }
}

impl SystemConfig {
    pub fn with_ask_timeout(mut self, timeout: Duration) -> Self {
        self.default_ask_timeout = timeout;
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}
