// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Rust Modbus gateway library
//!
//! This library serves a shared register map over Modbus TCP while a Wi-Fi
//! link is available, and tears the server down cleanly when the link goes
//! away.
//!
//! - [`registers`]: the register map shared with Modbus clients
//! - [`signals`]: the level-triggered connectivity flag bus
//! - [`gateway`]: the lifecycle controller
//! - [`modbus`]: the protocol server boundary and its TCP implementation
//! - [`network`]: network events, link status and the host network manager
//! - [`rtu`]: the serial RTU entry points
//! - [`config`] and [`daemon`]: configuration loading and process wiring

pub mod config;
pub mod daemon;
pub mod gateway;
pub mod modbus;
pub mod network;
pub mod registers;
pub mod rtu;
pub mod signals;
