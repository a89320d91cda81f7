// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus RTU serial bridge
//!
//! Entry points for the serial side of the gateway. The bridge is not
//! implemented: both calls report [`GatewayError::NotSupported`] and leave
//! the register map and every task untouched.

use log::warn;

use crate::gateway::GatewayError;

const RTU_FEATURE: &str = "Modbus RTU";

#[derive(Debug, Clone, Copy, Default)]
pub struct RtuGateway;

impl RtuGateway {
    pub fn new() -> Self {
        Self
    }

    pub fn start(&self) -> Result<(), GatewayError> {
        warn!("Modbus RTU not implemented yet");
        Err(GatewayError::NotSupported(RTU_FEATURE))
    }

    pub fn stop(&self) -> Result<(), GatewayError> {
        warn!("Modbus RTU not implemented yet");
        Err(GatewayError::NotSupported(RTU_FEATURE))
    }
}
