// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! This module provides utility functions for working with configuration
//! settings, including validation and schema management.

use anyhow::{Context, Result};
use log::{debug, warn};

use super::Config;
use crate::registers::{encode_text, validate_tcp_port, WifiMode};

/// Minimum WPA2 passphrase length for a protected access point.
const MIN_AP_PASSWORD_LENGTH: usize = 8;

/// Output the embedded JSON schema to the console.
///
/// This function is called when the `--show-config-schema` flag is provided
/// on the command line. It outputs the full JSON schema for the configuration
/// to stdout, formatted for readability.
///
/// # Example
///
/// ```bash
/// ./rust_modbus_gateway --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    let schema_str = include_str!("../../resources/config.schema.json");

    let schema: serde_json::Value =
        serde_json::from_str(schema_str).context("Failed to parse JSON schema")?;

    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;

    println!("{}", formatted_schema);

    Ok(())
}

/// Check if a string is a valid IP address
///
/// Validates that a string represents a valid IPv4 or IPv6 address,
/// or is one of the special values like "localhost" or "0.0.0.0".
pub fn is_valid_ip_address(addr: &str) -> bool {
    if addr.parse::<std::net::IpAddr>().is_ok() {
        return true;
    }

    matches!(addr, "localhost" | "::" | "::0" | "0.0.0.0")
}

/// Validates the configuration against additional rules that aren't covered by the JSON schema.
///
/// # Validation Rules
///
/// - **Modbus address**: must be an IP address or "localhost"
/// - **Modbus port**: 502 or an unprivileged port (1024-65535), the same rule
///   the gateway applies to the TCP port holding register
/// - **Text fields**: SSIDs and passwords must fit the 32-byte register fields
///   once UTF-8 encoded
/// - **Access point password**: empty (open network) or at least 8 characters
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    debug!("Performing additional validation checks");

    if !is_valid_ip_address(&config.modbus.address) {
        anyhow::bail!("Invalid Modbus bind address: {}", config.modbus.address);
    }

    validate_tcp_port(config.modbus.port)
        .with_context(|| format!("Invalid Modbus port number: {}", config.modbus.port))?;

    if let Some(station) = &config.network.station {
        encode_text(&station.ssid).context("Station SSID does not fit its register field")?;
        encode_text(&station.password)
            .context("Station password does not fit its register field")?;
    } else if config.network.mode != WifiMode::AccessPoint {
        // Just issue a warning but don't block
        warn!("No station credentials configured, the station link will not come up");
    }

    let ap = &config.network.access_point;
    encode_text(&ap.ssid).context("Access point SSID does not fit its register field")?;
    encode_text(&ap.password).context("Access point password does not fit its register field")?;
    if !ap.password.is_empty() && ap.password.len() < MIN_AP_PASSWORD_LENGTH {
        anyhow::bail!(
            "Access point password must be empty or at least {} characters",
            MIN_AP_PASSWORD_LENGTH
        );
    }

    Ok(())
}
