// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Range validation for raw holding register values
//!
//! The register map stores whatever a client writes. Consumers go through
//! these accessors before trusting a value.

use serde::{Deserialize, Serialize};

use super::address_map::{
    MAX_AP_CHANNEL, MAX_AP_CLIENTS, MAX_RTU_SLAVE_ADDR, MAX_TCP_PORT, MIN_AP_CHANNEL,
    MIN_RTU_SLAVE_ADDR, MIN_TCP_PORT, MODBUS_TCP_PORT,
};
use super::regions::HoldingRegisters;
use super::text::{decode_text, encode_text};
use super::RegisterError;

/// Wi-Fi operating mode (holding register 40001).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WifiMode {
    #[default]
    Station,
    AccessPoint,
    AccessPointStation,
}

impl WifiMode {
    pub fn code(self) -> u16 {
        match self {
            WifiMode::Station => 0,
            WifiMode::AccessPoint => 1,
            WifiMode::AccessPointStation => 2,
        }
    }
}

impl TryFrom<u16> for WifiMode {
    type Error = RegisterError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(WifiMode::Station),
            1 => Ok(WifiMode::AccessPoint),
            2 => Ok(WifiMode::AccessPointStation),
            _ => Err(RegisterError::InvalidValue {
                field: "wifi_mode",
                value,
            }),
        }
    }
}

/// RTU line speed code (holding register 40069).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtuBaudRate {
    B9600,
    B19200,
    B38400,
    B57600,
    B115200,
}

impl RtuBaudRate {
    pub fn bits_per_second(self) -> u32 {
        match self {
            RtuBaudRate::B9600 => 9_600,
            RtuBaudRate::B19200 => 19_200,
            RtuBaudRate::B38400 => 38_400,
            RtuBaudRate::B57600 => 57_600,
            RtuBaudRate::B115200 => 115_200,
        }
    }
}

impl TryFrom<u16> for RtuBaudRate {
    type Error = RegisterError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(RtuBaudRate::B9600),
            2 => Ok(RtuBaudRate::B19200),
            3 => Ok(RtuBaudRate::B38400),
            4 => Ok(RtuBaudRate::B57600),
            5 => Ok(RtuBaudRate::B115200),
            _ => Err(RegisterError::InvalidValue {
                field: "rtu_baudrate",
                value,
            }),
        }
    }
}

/// RTU parity code (holding register 40070).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtuParity {
    None,
    Odd,
    Even,
}

impl TryFrom<u16> for RtuParity {
    type Error = RegisterError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(RtuParity::None),
            1 => Ok(RtuParity::Odd),
            2 => Ok(RtuParity::Even),
            _ => Err(RegisterError::InvalidValue {
                field: "rtu_parity",
                value,
            }),
        }
    }
}

fn in_range(field: &'static str, value: u16, min: u16, max: u16) -> Result<u16, RegisterError> {
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(RegisterError::InvalidValue { field, value })
    }
}

/// Check a TCP port candidate.
///
/// The standard Modbus port is always accepted. Anything else must be an
/// unprivileged port.
pub fn validate_tcp_port(port: u16) -> Result<u16, RegisterError> {
    if port == MODBUS_TCP_PORT {
        return Ok(port);
    }
    in_range("tcp_port", port, MIN_TCP_PORT, MAX_TCP_PORT)
}

impl HoldingRegisters {
    pub fn wifi_mode(&self) -> Result<WifiMode, RegisterError> {
        WifiMode::try_from(self.wifi_mode)
    }

    pub fn rtu_baudrate(&self) -> Result<RtuBaudRate, RegisterError> {
        RtuBaudRate::try_from(self.rtu_baudrate)
    }

    pub fn rtu_parity(&self) -> Result<RtuParity, RegisterError> {
        RtuParity::try_from(self.rtu_parity)
    }

    pub fn ap_channel(&self) -> Result<u16, RegisterError> {
        in_range("ap_channel", self.ap_channel, MIN_AP_CHANNEL, MAX_AP_CHANNEL)
    }

    pub fn ap_max_clients(&self) -> Result<u16, RegisterError> {
        in_range("ap_max_conn", self.ap_max_conn, 1, MAX_AP_CLIENTS)
    }

    pub fn rtu_slave_address(&self) -> Result<u16, RegisterError> {
        in_range(
            "rtu_slave_addr",
            self.rtu_slave_addr,
            MIN_RTU_SLAVE_ADDR,
            MAX_RTU_SLAVE_ADDR,
        )
    }

    pub fn tcp_port(&self) -> Result<u16, RegisterError> {
        validate_tcp_port(self.tcp_port)
    }

    pub fn station_ssid(&self) -> String {
        decode_text(&self.sta_ssid)
    }

    pub fn station_password(&self) -> String {
        decode_text(&self.sta_pass)
    }

    pub fn ap_ssid(&self) -> String {
        decode_text(&self.ap_ssid)
    }

    pub fn ap_password(&self) -> String {
        decode_text(&self.ap_pass)
    }

    /// Store station credentials. Both fields are checked before either is written.
    pub fn set_station_credentials(&mut self, ssid: &str, password: &str) -> Result<(), RegisterError> {
        let ssid = encode_text(ssid)?;
        let pass = encode_text(password)?;
        self.sta_ssid = ssid;
        self.sta_pass = pass;
        Ok(())
    }

    /// Store access point credentials. Both fields are checked before either is written.
    pub fn set_ap_credentials(&mut self, ssid: &str, password: &str) -> Result<(), RegisterError> {
        let ssid = encode_text(ssid)?;
        let pass = encode_text(password)?;
        self.ap_ssid = ssid;
        self.ap_pass = pass;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_validation() {
        let regs = HoldingRegisters::default();
        assert_eq!(regs.wifi_mode().unwrap(), WifiMode::Station);
        assert_eq!(regs.rtu_baudrate().unwrap().bits_per_second(), 9_600);
        assert_eq!(regs.rtu_parity().unwrap(), RtuParity::None);
        assert_eq!(regs.ap_channel().unwrap(), 1);
        assert_eq!(regs.rtu_slave_address().unwrap(), 1);
        assert_eq!(regs.tcp_port().unwrap(), 502);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let regs = HoldingRegisters {
            wifi_mode: 3,
            rtu_baudrate: 0,
            rtu_parity: 7,
            ap_channel: 14,
            rtu_slave_addr: 248,
            tcp_port: 80,
            ..Default::default()
        };
        assert!(regs.wifi_mode().is_err());
        assert!(regs.rtu_baudrate().is_err());
        assert!(regs.rtu_parity().is_err());
        assert!(regs.ap_channel().is_err());
        assert!(regs.rtu_slave_address().is_err());
        assert!(matches!(
            regs.tcp_port(),
            Err(RegisterError::InvalidValue { field: "tcp_port", value: 80 })
        ));
    }

    #[test]
    fn unprivileged_ports_are_accepted() {
        assert_eq!(validate_tcp_port(1024).unwrap(), 1024);
        assert_eq!(validate_tcp_port(65535).unwrap(), 65535);
        assert!(validate_tcp_port(0).is_err());
    }

    #[test]
    fn credentials_are_all_or_nothing() {
        let mut regs = HoldingRegisters::default();
        regs.set_station_credentials("plant-floor", "secret").unwrap();
        assert!(regs
            .set_station_credentials("other", &"p".repeat(40))
            .is_err());
        assert_eq!(regs.station_ssid(), "plant-floor");
        assert_eq!(regs.station_password(), "secret");
    }
}
