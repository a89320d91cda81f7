// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Gateway lifecycle controller
//!
//! The gateway serves the register map over Modbus TCP only while a network
//! link is up. A single long-lived task runs the state machine:
//!
//! ```text
//!            start()
//!   Idle ───────────────► AwaitingLink ◄──────────────┐
//!    ▲                      │    ▲                     │ link lost
//!    │                      │    │ init failed,        │
//!    │ stop()               │    │ backoff             │
//!    │                      ▼    │                     │
//!    └────────── Draining ◄──── Serving ───────────────┘
//! ```
//!
//! - **AwaitingLink** waits for station-connected or access-point-started.
//! - Entering **Serving** creates the server, registers the four tables and
//!   starts it. Any failure tears down what was created, waits the retry
//!   backoff and goes back to AwaitingLink.
//! - **Serving** refreshes the status tables every status interval and polls
//!   protocol events, until a stop request or a newly observed disconnect.
//! - **Draining** stops and destroys the server, then re-arms AwaitingLink
//!   after a disconnect or returns to Idle after a stop.

pub mod controller;
pub mod status;

use std::time::Duration;

use enumset::EnumSetType;
use thiserror::Error;

use crate::modbus::TransportConfig;
use crate::signals::SignalBus;

pub use controller::ModbusGateway;
pub use status::StatusRefresher;

/// Lifecycle state published by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GatewayState {
    #[default]
    Idle,
    AwaitingLink,
    Serving,
    Draining,
}

/// Requests and indicators exchanged between the public handle and the task.
#[derive(EnumSetType, Debug)]
pub enum ControlFlag {
    StartRequested,
    StopRequested,
    /// Set while a server instance is started.
    Running,
}

pub type ControlBus = SignalBus<ControlFlag>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("gateway task is already running")]
    AlreadyRunning,

    #[error("{0} is not supported")]
    NotSupported(&'static str),
}

/// Timing and transport settings of the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewaySettings {
    /// Fallback transport. Its port is replaced by the holding register
    /// port when that one is valid.
    pub transport: TransportConfig,
    pub init_retry_backoff: Duration,
    pub poll_interval: Duration,
    pub status_interval: Duration,
    pub stop_grace_period: Duration,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
            init_retry_backoff: Duration::from_secs(5),
            poll_interval: Duration::from_millis(10),
            status_interval: Duration::from_secs(1),
            stop_grace_period: Duration::from_secs(5),
        }
    }
}
