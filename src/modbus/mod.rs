// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus communication module
//!
//! This module provides the Modbus TCP server side of the gateway, allowing
//! external systems to read link status and write network settings through
//! the shared register map.
//!
//! ## Key Components
//!
//! - [`backend`]: the `ServerBackend` / `ServerHandle` lifecycle contract the
//!   gateway controller drives.
//! - [`GatewayModbusService`]: the request handler mapping function codes to
//!   register tables.
//! - [`TcpServerBackend`]: the `tokio-modbus` TCP implementation.
//!
//! ## Usage
//!
//! ```no_run
//! use rust_modbus_gateway::modbus::{RegionDescriptor, ServerBackend, ServerHandle, TcpServerBackend, TransportConfig};
//! use rust_modbus_gateway::registers::{RegionKind, RegisterMap};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let map = RegisterMap::shared();
//! let mut server = TcpServerBackend.create(&TransportConfig::default()).await?;
//! for kind in RegionKind::ALL {
//!     server.register_region(RegionDescriptor::for_table(kind, map.clone()))?;
//! }
//! server.start().await?;
//! # Ok(())
//! # }
//! ```
//!
//! The register map layout is documented in [`crate::registers`].

pub mod backend;
pub mod modbus_server;
pub mod tcp;

pub use backend::{
    AccessMode, ProtocolEvent, ProtocolEvents, RegionDescriptor, ServerBackend, ServerError,
    ServerHandle, TransportConfig,
};
pub use modbus_server::GatewayModbusService;
pub use tcp::{TcpServerBackend, TcpServerHandle};
