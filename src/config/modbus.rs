// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus TCP server configuration
//!
//! This module defines the transport settings of the gateway's Modbus TCP
//! server. The port configured here is also the fallback used when the TCP
//! port holding register holds an invalid value.

use std::net::{IpAddr, Ipv4Addr};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::modbus::TransportConfig;

/// Configuration for the Modbus TCP server component.
///
/// # Example
///
/// ```
/// use rust_modbus_gateway::config::ModbusConfig;
///
/// let modbus_config = ModbusConfig {
///     enabled: true,
///     port: 1502,
///     address: "0.0.0.0".to_string(),
///     unit_id: 1,
/// };
/// assert_eq!(modbus_config.transport().unwrap().port, 1502);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModbusConfig {
    /// Flag to enable or disable the gateway's Modbus server.
    ///
    /// When disabled the gateway controller is never started and no port
    /// is ever bound, whatever the link state.
    pub enabled: bool,

    /// The TCP port the Modbus server will listen on.
    ///
    /// Either 502, the standard Modbus TCP port, or an unprivileged port
    /// (1024-65535).
    pub port: u16,

    /// The network address the Modbus server will bind to.
    ///
    /// An IPv4/IPv6 address or "localhost". Default is "0.0.0.0", every
    /// interface, so clients reach the gateway over the station link as
    /// well as over the access point.
    pub address: String,

    /// Modbus unit identifier of the gateway.
    #[serde(default = "default_unit_id")]
    pub unit_id: u8,
}

fn default_unit_id() -> u8 {
    1
}

impl Default for ModbusConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 502,
            address: "0.0.0.0".to_string(),
            unit_id: default_unit_id(),
        }
    }
}

impl ModbusConfig {
    /// Resolve the bind address.
    pub fn bind_address(&self) -> Result<IpAddr> {
        if self.address == "localhost" {
            return Ok(IpAddr::V4(Ipv4Addr::LOCALHOST));
        }
        self.address
            .parse()
            .with_context(|| format!("Invalid Modbus bind address: {}", self.address))
    }

    /// Transport used when the holding registers do not override the port.
    pub fn transport(&self) -> Result<TransportConfig> {
        Ok(TransportConfig {
            address: self.bind_address()?,
            port: self.port,
            unit_id: self.unit_id,
        })
    }
}
