// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Protocol server boundary
//!
//! The gateway controller drives a protocol server through this trait pair.
//! [`ServerBackend::create`] allocates a server bound to a transport, and the
//! returned [`ServerHandle`] goes through `register_region` → `start` →
//! `poll_events`* → `stop` → `destroy`.
//!
//! The production implementation is [`super::tcp::TcpServerBackend`]. Tests
//! plug in their own backend to observe the lifecycle.

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use async_trait::async_trait;
use enumset::{EnumSet, EnumSetType};
use thiserror::Error;

use crate::registers::{RegionKind, SharedRegisterMap};

/// Where the protocol server listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Bind address, `0.0.0.0` to accept on every interface.
    pub address: IpAddr,
    pub port: u16,
    /// Modbus unit identifier announced by this gateway.
    pub unit_id: u8,
}

impl TransportConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: crate::registers::address_map::MODBUS_TCP_PORT,
            unit_id: 1,
        }
    }
}

/// Whether clients may write a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    ReadWrite,
}

/// One register table exposed by the server.
#[derive(Debug, Clone)]
pub struct RegionDescriptor {
    pub kind: RegionKind,
    /// Wire address of the first element of the table.
    pub start_offset: u16,
    pub access: AccessMode,
    pub map: SharedRegisterMap,
}

impl RegionDescriptor {
    /// Describe `kind` starting at wire address 0, with the access mode
    /// the Modbus data model gives that table.
    pub fn for_table(kind: RegionKind, map: SharedRegisterMap) -> Self {
        let access = match kind {
            RegionKind::Coil | RegionKind::Holding => AccessMode::ReadWrite,
            RegionKind::Discrete | RegionKind::Input => AccessMode::ReadOnly,
        };
        Self {
            kind,
            start_offset: 0,
            access,
            map,
        }
    }

    /// Number of bits or words in the table.
    pub fn size(&self) -> u16 {
        self.kind.size()
    }
}

/// Client accesses reported by [`ServerHandle::poll_events`].
#[derive(EnumSetType, Debug)]
pub enum ProtocolEvent {
    HoldingRead,
    HoldingWrite,
    InputRead,
    CoilRead,
    CoilWrite,
    DiscreteRead,
}

pub type ProtocolEvents = EnumSet<ProtocolEvent>;

/// Protocol server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind Modbus listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("failed to register {kind} region: {reason}")]
    RegionRegistration { kind: RegionKind, reason: String },

    #[error("failed to start Modbus server: {0}")]
    Start(String),

    #[error("invalid transport configuration: {0}")]
    InvalidTransport(String),
}

/// Factory for protocol server instances.
#[async_trait]
pub trait ServerBackend: Send + Sync + 'static {
    type Handle: ServerHandle;

    /// Allocate a server bound to `config`. Nothing is served until
    /// [`ServerHandle::start`].
    async fn create(&self, config: &TransportConfig) -> Result<Self::Handle, ServerError>;
}

/// A server instance created by a [`ServerBackend`].
///
/// Dropping a handle must release its transport, even without `stop`.
#[async_trait]
pub trait ServerHandle: Send + 'static {
    /// Expose a table. Only valid before `start`.
    fn register_region(&mut self, region: RegionDescriptor) -> Result<(), ServerError>;

    async fn start(&mut self) -> Result<(), ServerError>;

    /// Take the events in `mask` recorded since the previous poll.
    fn poll_events(&mut self, mask: ProtocolEvents) -> ProtocolEvents;

    /// Stop accepting clients. Sessions still open are refused service.
    async fn stop(&mut self) -> Result<(), ServerError>;

    /// Release every resource held by the instance.
    fn destroy(self);
}
