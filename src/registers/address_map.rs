// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Register address map
//!
//! Word and bit offsets of every field exposed over Modbus. Offsets are
//! zero-based wire addresses; the documented 1-based addresses (00001,
//! 10001, 30001, 40001) are the conventional Modbus notation for offset 0
//! of each table.
//!
//! These values are a wire contract shared with deployed SCADA clients.
//! Never reorder or renumber them.

/// Maximum SSID length in bytes.
pub const MAX_SSID_LENGTH: usize = 32;
/// Maximum password length in bytes.
pub const MAX_PASSWORD_LENGTH: usize = 32;
/// Number of 16-bit words used by one text field.
pub const TEXT_FIELD_WORDS: usize = MAX_SSID_LENGTH / 2;

/// Standard Modbus TCP port.
pub const MODBUS_TCP_PORT: u16 = 502;
pub const MIN_TCP_PORT: u16 = 1024;
pub const MAX_TCP_PORT: u16 = 65535;
pub const MIN_AP_CHANNEL: u16 = 1;
pub const MAX_AP_CHANNEL: u16 = 13;
pub const MAX_AP_CLIENTS: u16 = 4;
pub const MIN_RTU_SLAVE_ADDR: u16 = 1;
pub const MAX_RTU_SLAVE_ADDR: u16 = 247;

/// Conventional 1-based base address of each table.
pub const COIL_BASE_ADDRESS: u32 = 1;
pub const DISCRETE_BASE_ADDRESS: u32 = 10001;
pub const INPUT_BASE_ADDRESS: u32 = 30001;
pub const HOLDING_BASE_ADDRESS: u32 = 40001;

/// Discrete inputs (function code 0x02), read-only.
pub mod discrete {
    pub const STA_CONNECTED: u16 = 0;
    pub const AP_ACTIVE: u16 = 1;
    pub const RTU_LINK_ACTIVE: u16 = 2;
    /// One packed byte, the top five bits are reserved.
    pub const COUNT: u16 = 8;
}

/// Coils (function codes 0x01, 0x05, 0x0F), read/write.
pub mod coil {
    pub const RECONNECT_REQUEST: u16 = 0;
    pub const AP_ENABLE_REQUEST: u16 = 1;
    pub const RTU_BRIDGE_ENABLE: u16 = 2;
    pub const FACTORY_RESET_REQUEST: u16 = 3;
    /// One packed byte, the top four bits are reserved.
    pub const COUNT: u16 = 8;
}

/// Input registers (function code 0x04), read-only.
pub mod input {
    pub const SYS_UPTIME_SEC: u16 = 0;
    pub const WIFI_RSSI: u16 = 1;
    /// Low word first, high word at `STA_IP_ADDR + 1`.
    pub const STA_IP_ADDR: u16 = 2;
    /// Low word first, high word at `AP_IP_ADDR + 1`.
    pub const AP_IP_ADDR: u16 = 4;
    pub const CONNECTED_CLIENTS: u16 = 6;
    pub const RTU_TX_COUNT: u16 = 7;
    pub const RTU_RX_COUNT: u16 = 8;
    pub const COUNT: u16 = 9;
}

/// Holding registers (function codes 0x03, 0x06, 0x10, 0x17), read/write.
pub mod holding {
    use super::TEXT_FIELD_WORDS;

    const TEXT: u16 = TEXT_FIELD_WORDS as u16;

    pub const WIFI_MODE: u16 = 0;
    pub const STA_SSID: u16 = 1;
    pub const STA_PASS: u16 = STA_SSID + TEXT;
    pub const AP_SSID: u16 = STA_PASS + TEXT;
    pub const AP_PASS: u16 = AP_SSID + TEXT;
    pub const AP_CHANNEL: u16 = AP_PASS + TEXT;
    pub const AP_MAX_CONN: u16 = AP_CHANNEL + 1;
    pub const RTU_SLAVE_ADDR: u16 = AP_MAX_CONN + 1;
    pub const RTU_BAUDRATE: u16 = RTU_SLAVE_ADDR + 1;
    pub const RTU_PARITY: u16 = RTU_BAUDRATE + 1;
    pub const TCP_PORT: u16 = RTU_PARITY + 1;
    pub const SAVE_CONFIG_REQUEST: u16 = TCP_PORT + 1;
    pub const COUNT: u16 = SAVE_CONFIG_REQUEST + 1;
}
