// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Typed views of the four register tables
//!
//! Every region converts to and from its flat wire image (`Vec<bool>` for bit
//! tables, `Vec<u16>` for word tables). Field placement follows
//! [`super::address_map`].

use std::net::Ipv4Addr;

use super::address_map::{self, coil, discrete, holding, input, TEXT_FIELD_WORDS};
use super::text::TextWords;

/// A table of single-bit values.
pub trait BitRegion {
    /// Number of bits exposed on the wire.
    const COUNT: u16;

    fn to_bits(&self) -> Vec<bool>;

    /// Rebuild the region from a full wire image of `COUNT` bits.
    fn load_bits(&mut self, bits: &[bool]);
}

/// A table of 16-bit words.
pub trait WordRegion {
    /// Number of words exposed on the wire.
    const COUNT: u16;

    fn to_words(&self) -> Vec<u16>;

    /// Rebuild the region from a full wire image of `COUNT` words.
    fn load_words(&mut self, words: &[u16]);
}

fn reserved_bits(reserved: u8, first: u16, bits: &mut [bool]) {
    for (i, bit) in bits.iter_mut().enumerate().skip(first as usize) {
        *bit = reserved & (1 << (i - first as usize)) != 0;
    }
}

fn collect_reserved(bits: &[bool], first: u16) -> u8 {
    bits.iter()
        .skip(first as usize)
        .enumerate()
        .fold(0u8, |acc, (i, b)| if *b { acc | (1 << i) } else { acc })
}

/// Discrete inputs: link status mirrored by the gateway controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscreteInputs {
    pub wifi_sta_connected: bool,
    pub wifi_ap_active: bool,
    pub rtu_link_active: bool,
    /// Bits 3..8 of the packed byte.
    pub reserved: u8,
}

impl BitRegion for DiscreteInputs {
    const COUNT: u16 = discrete::COUNT;

    fn to_bits(&self) -> Vec<bool> {
        let mut bits = vec![false; Self::COUNT as usize];
        bits[discrete::STA_CONNECTED as usize] = self.wifi_sta_connected;
        bits[discrete::AP_ACTIVE as usize] = self.wifi_ap_active;
        bits[discrete::RTU_LINK_ACTIVE as usize] = self.rtu_link_active;
        reserved_bits(self.reserved, discrete::RTU_LINK_ACTIVE + 1, &mut bits);
        bits
    }

    fn load_bits(&mut self, bits: &[bool]) {
        self.wifi_sta_connected = bits[discrete::STA_CONNECTED as usize];
        self.wifi_ap_active = bits[discrete::AP_ACTIVE as usize];
        self.rtu_link_active = bits[discrete::RTU_LINK_ACTIVE as usize];
        self.reserved = collect_reserved(bits, discrete::RTU_LINK_ACTIVE + 1);
    }
}

/// Coils: requests latched by Modbus clients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Coils {
    pub wifi_reconnect_request: bool,
    pub ap_enable_request: bool,
    pub rtu_bridge_enable: bool,
    pub factory_reset_request: bool,
    /// Bits 4..8 of the packed byte, latched as written.
    pub reserved: u8,
}

impl BitRegion for Coils {
    const COUNT: u16 = coil::COUNT;

    fn to_bits(&self) -> Vec<bool> {
        let mut bits = vec![false; Self::COUNT as usize];
        bits[coil::RECONNECT_REQUEST as usize] = self.wifi_reconnect_request;
        bits[coil::AP_ENABLE_REQUEST as usize] = self.ap_enable_request;
        bits[coil::RTU_BRIDGE_ENABLE as usize] = self.rtu_bridge_enable;
        bits[coil::FACTORY_RESET_REQUEST as usize] = self.factory_reset_request;
        reserved_bits(self.reserved, coil::FACTORY_RESET_REQUEST + 1, &mut bits);
        bits
    }

    fn load_bits(&mut self, bits: &[bool]) {
        self.wifi_reconnect_request = bits[coil::RECONNECT_REQUEST as usize];
        self.ap_enable_request = bits[coil::AP_ENABLE_REQUEST as usize];
        self.rtu_bridge_enable = bits[coil::RTU_BRIDGE_ENABLE as usize];
        self.factory_reset_request = bits[coil::FACTORY_RESET_REQUEST as usize];
        self.reserved = collect_reserved(bits, coil::FACTORY_RESET_REQUEST + 1);
    }
}

/// Input registers: runtime status refreshed once per second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputRegisters {
    pub sys_uptime_sec: u16,
    pub wifi_rssi: i16,
    /// IPv4 address as laid out in memory by the network stack
    /// (`u32::from_le_bytes(octets)`), exposed low word first.
    pub sta_ip_addr: u32,
    pub ap_ip_addr: u32,
    pub connected_clients: u16,
    pub rtu_tx_count: u16,
    pub rtu_rx_count: u16,
}

fn ip_to_raw(ip: Ipv4Addr) -> u32 {
    u32::from_le_bytes(ip.octets())
}

fn raw_to_ip(raw: u32) -> Ipv4Addr {
    Ipv4Addr::from(raw.to_le_bytes())
}

impl InputRegisters {
    pub fn set_sta_ip(&mut self, ip: Ipv4Addr) {
        self.sta_ip_addr = ip_to_raw(ip);
    }

    pub fn sta_ip(&self) -> Ipv4Addr {
        raw_to_ip(self.sta_ip_addr)
    }

    pub fn set_ap_ip(&mut self, ip: Ipv4Addr) {
        self.ap_ip_addr = ip_to_raw(ip);
    }

    pub fn ap_ip(&self) -> Ipv4Addr {
        raw_to_ip(self.ap_ip_addr)
    }
}

impl WordRegion for InputRegisters {
    const COUNT: u16 = input::COUNT;

    fn to_words(&self) -> Vec<u16> {
        let mut words = vec![0u16; Self::COUNT as usize];
        words[input::SYS_UPTIME_SEC as usize] = self.sys_uptime_sec;
        words[input::WIFI_RSSI as usize] = self.wifi_rssi as u16;
        words[input::STA_IP_ADDR as usize] = (self.sta_ip_addr & 0xFFFF) as u16;
        words[input::STA_IP_ADDR as usize + 1] = (self.sta_ip_addr >> 16) as u16;
        words[input::AP_IP_ADDR as usize] = (self.ap_ip_addr & 0xFFFF) as u16;
        words[input::AP_IP_ADDR as usize + 1] = (self.ap_ip_addr >> 16) as u16;
        words[input::CONNECTED_CLIENTS as usize] = self.connected_clients;
        words[input::RTU_TX_COUNT as usize] = self.rtu_tx_count;
        words[input::RTU_RX_COUNT as usize] = self.rtu_rx_count;
        words
    }

    fn load_words(&mut self, words: &[u16]) {
        let dword = |at: u16| words[at as usize] as u32 | (words[at as usize + 1] as u32) << 16;
        self.sys_uptime_sec = words[input::SYS_UPTIME_SEC as usize];
        self.wifi_rssi = words[input::WIFI_RSSI as usize] as i16;
        self.sta_ip_addr = dword(input::STA_IP_ADDR);
        self.ap_ip_addr = dword(input::AP_IP_ADDR);
        self.connected_clients = words[input::CONNECTED_CLIENTS as usize];
        self.rtu_tx_count = words[input::RTU_TX_COUNT as usize];
        self.rtu_rx_count = words[input::RTU_RX_COUNT as usize];
    }
}

/// Holding registers: configuration written by clients.
///
/// Numeric fields are stored raw. Use the validating accessors in
/// [`super::validation`] before acting on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoldingRegisters {
    pub wifi_mode: u16,
    pub sta_ssid: TextWords,
    pub sta_pass: TextWords,
    pub ap_ssid: TextWords,
    pub ap_pass: TextWords,
    pub ap_channel: u16,
    pub ap_max_conn: u16,
    pub rtu_slave_addr: u16,
    pub rtu_baudrate: u16,
    pub rtu_parity: u16,
    pub tcp_port: u16,
    pub save_config_request: u16,
}

/// Default wifi mode code (station).
pub const DEFAULT_WIFI_MODE: u16 = 0;
/// Default RTU baud code (9600 bit/s).
pub const DEFAULT_RTU_BAUDRATE: u16 = 1;
/// Default RTU parity code (none).
pub const DEFAULT_RTU_PARITY: u16 = 0;
pub const DEFAULT_AP_CHANNEL: u16 = 1;

impl Default for HoldingRegisters {
    fn default() -> Self {
        Self {
            wifi_mode: DEFAULT_WIFI_MODE,
            sta_ssid: [0; TEXT_FIELD_WORDS],
            sta_pass: [0; TEXT_FIELD_WORDS],
            ap_ssid: [0; TEXT_FIELD_WORDS],
            ap_pass: [0; TEXT_FIELD_WORDS],
            ap_channel: DEFAULT_AP_CHANNEL,
            ap_max_conn: address_map::MAX_AP_CLIENTS,
            rtu_slave_addr: address_map::MIN_RTU_SLAVE_ADDR,
            rtu_baudrate: DEFAULT_RTU_BAUDRATE,
            rtu_parity: DEFAULT_RTU_PARITY,
            tcp_port: address_map::MODBUS_TCP_PORT,
            save_config_request: 0,
        }
    }
}

impl WordRegion for HoldingRegisters {
    const COUNT: u16 = holding::COUNT;

    fn to_words(&self) -> Vec<u16> {
        let mut words = Vec::with_capacity(Self::COUNT as usize);
        words.push(self.wifi_mode);
        words.extend_from_slice(&self.sta_ssid);
        words.extend_from_slice(&self.sta_pass);
        words.extend_from_slice(&self.ap_ssid);
        words.extend_from_slice(&self.ap_pass);
        words.extend_from_slice(&[
            self.ap_channel,
            self.ap_max_conn,
            self.rtu_slave_addr,
            self.rtu_baudrate,
            self.rtu_parity,
            self.tcp_port,
            self.save_config_request,
        ]);
        debug_assert_eq!(words.len(), Self::COUNT as usize);
        words
    }

    fn load_words(&mut self, words: &[u16]) {
        let text = |at: u16| {
            let mut field = [0u16; TEXT_FIELD_WORDS];
            field.copy_from_slice(&words[at as usize..at as usize + TEXT_FIELD_WORDS]);
            field
        };
        self.wifi_mode = words[holding::WIFI_MODE as usize];
        self.sta_ssid = text(holding::STA_SSID);
        self.sta_pass = text(holding::STA_PASS);
        self.ap_ssid = text(holding::AP_SSID);
        self.ap_pass = text(holding::AP_PASS);
        self.ap_channel = words[holding::AP_CHANNEL as usize];
        self.ap_max_conn = words[holding::AP_MAX_CONN as usize];
        self.rtu_slave_addr = words[holding::RTU_SLAVE_ADDR as usize];
        self.rtu_baudrate = words[holding::RTU_BAUDRATE as usize];
        self.rtu_parity = words[holding::RTU_PARITY as usize];
        self.tcp_port = words[holding::TCP_PORT as usize];
        self.save_config_request = words[holding::SAVE_CONFIG_REQUEST as usize];
    }
}
