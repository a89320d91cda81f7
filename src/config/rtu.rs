// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus RTU bridge configuration

use serde::{Deserialize, Serialize};

/// Configuration for the serial RTU bridge.
///
/// The bridge is not available yet; enabling it only logs the
/// not-supported result at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RtuConfig {
    #[serde(default)]
    pub enabled: bool,
}
