// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Wi-Fi network configuration
//!
//! Station credentials and access point settings. At startup these values
//! are copied into the holding registers so Modbus clients read back the
//! running configuration.

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::network::StationConfig;
use crate::registers::WifiMode;

/// Soft access point settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessPointConfig {
    pub ssid: String,

    /// Empty for an open network, otherwise at least 8 characters.
    #[serde(default)]
    pub password: String,

    /// 2.4 GHz channel, 1-13.
    #[serde(default = "default_channel")]
    pub channel: u16,

    /// Maximum associated stations, 1-4.
    #[serde(default = "default_max_clients")]
    pub max_clients: u16,

    /// Gateway address on the access point network.
    #[serde(default = "default_ap_ip")]
    pub ip: Ipv4Addr,
}

fn default_channel() -> u16 {
    1
}

fn default_max_clients() -> u16 {
    4
}

fn default_ap_ip() -> Ipv4Addr {
    Ipv4Addr::new(192, 168, 4, 1)
}

impl Default for AccessPointConfig {
    fn default() -> Self {
        Self {
            ssid: "modbus-gateway".to_string(),
            password: String::new(),
            channel: default_channel(),
            max_clients: default_max_clients(),
            ip: default_ap_ip(),
        }
    }
}

/// Network section of the configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkConfig {
    #[serde(default)]
    pub mode: WifiMode,

    /// Credentials of the network to join in station mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub station: Option<StationConfig>,

    /// Address reported for the station link by the host network manager.
    #[serde(default = "default_station_ip")]
    pub station_ip: Ipv4Addr,

    #[serde(default)]
    pub access_point: AccessPointConfig,

    /// Connect as soon as the daemon starts.
    #[serde(default = "default_auto_connect")]
    pub auto_connect: bool,
}

fn default_station_ip() -> Ipv4Addr {
    Ipv4Addr::LOCALHOST
}

fn default_auto_connect() -> bool {
    true
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            mode: WifiMode::default(),
            station: None,
            station_ip: default_station_ip(),
            access_point: AccessPointConfig::default(),
            auto_connect: default_auto_connect(),
        }
    }
}
