// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Periodic status refresh of the read-only tables
//!
//! The uptime input register counts status ticks while the gateway is
//! serving, one per second at the default status interval. It does not
//! advance while the gateway is idle or waiting for a link, and wraps at
//! 16 bits.

use std::net::Ipv4Addr;

use crate::network::LinkStatus;
use crate::registers::SharedRegisterMap;
use crate::signals::{ConnectivityBus, ConnectivityFlag};

/// Mirrors link state into the discrete inputs and input registers.
#[derive(Debug, Clone)]
pub struct StatusRefresher {
    registers: SharedRegisterMap,
    connectivity: ConnectivityBus,
    link: LinkStatus,
}

impl StatusRefresher {
    pub fn new(registers: SharedRegisterMap, connectivity: ConnectivityBus, link: LinkStatus) -> Self {
        Self {
            registers,
            connectivity,
            link,
        }
    }

    /// One status period elapsed while serving.
    pub fn tick(&self) {
        {
            let mut input = self.registers.input_registers();
            input.sys_uptime_sec = input.sys_uptime_sec.wrapping_add(1);
        }
        self.refresh();
    }

    /// Mirror the bus flags and the link snapshot without counting uptime.
    pub fn refresh(&self) {
        let flags = self.connectivity.peek();
        {
            let mut discrete = self.registers.discrete_inputs();
            discrete.wifi_sta_connected = flags.contains(ConnectivityFlag::StaConnected);
            discrete.wifi_ap_active = flags.contains(ConnectivityFlag::ApStarted);
        }

        let link = self.link.snapshot();
        let mut input = self.registers.input_registers();
        input.wifi_rssi = link.rssi;
        input.set_sta_ip(link.sta_ip.unwrap_or(Ipv4Addr::UNSPECIFIED));
        input.set_ap_ip(link.ap_ip.unwrap_or(Ipv4Addr::UNSPECIFIED));
        input.connected_clients = link.connected_clients;
    }
}
