// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Gateway controller timing configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timing of the gateway lifecycle controller, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Delay before retrying a failed server initialization.
    #[serde(default = "default_init_retry_backoff_ms")]
    pub init_retry_backoff_ms: u64,

    /// Protocol event poll cadence while serving.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Status table refresh cadence while serving.
    #[serde(default = "default_status_interval_ms")]
    pub status_interval_ms: u64,

    /// Time `stop` waits for the controller before aborting it.
    #[serde(default = "default_stop_grace_period_ms")]
    pub stop_grace_period_ms: u64,
}

fn default_init_retry_backoff_ms() -> u64 {
    5000
}

fn default_poll_interval_ms() -> u64 {
    10
}

fn default_status_interval_ms() -> u64 {
    1000
}

fn default_stop_grace_period_ms() -> u64 {
    5000
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            init_retry_backoff_ms: default_init_retry_backoff_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            status_interval_ms: default_status_interval_ms(),
            stop_grace_period_ms: default_stop_grace_period_ms(),
        }
    }
}

impl GatewayConfig {
    pub fn init_retry_backoff(&self) -> Duration {
        Duration::from_millis(self.init_retry_backoff_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms)
    }

    pub fn stop_grace_period(&self) -> Duration {
        Duration::from_millis(self.stop_grace_period_ms)
    }
}
