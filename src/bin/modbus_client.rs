// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use tokio_modbus::prelude::*;

use rust_modbus_gateway::registers::{
    BitRegion, DiscreteInputs, HoldingRegisters, InputRegisters, WordRegion,
};

/// Modbus client printing the link status and settings of a gateway
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Modbus server address
    #[clap(long, default_value = "127.0.0.1")]
    address: String,

    /// Modbus server port
    #[clap(long, default_value = "502")]
    port: u16,

    /// Modbus unit identifier
    #[clap(long, default_value = "1")]
    unit_id: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    let args = Args::parse();

    let socket_addr: SocketAddr = format!("{}:{}", args.address, args.port)
        .parse()
        .context("Invalid socket address")?;
    println!("Connecting to Modbus gateway at {}", socket_addr);

    let mut ctx = tcp::connect_slave(socket_addr, Slave(args.unit_id)).await?;

    let mut discrete = DiscreteInputs::default();
    discrete.load_bits(
        &ctx.read_discrete_inputs(0, DiscreteInputs::COUNT)
            .await??,
    );
    let mut input = InputRegisters::default();
    input.load_words(
        &ctx.read_input_registers(0, InputRegisters::COUNT)
            .await??,
    );
    let mut holding = HoldingRegisters::default();
    holding.load_words(
        &ctx.read_holding_registers(0, HoldingRegisters::COUNT)
            .await??,
    );

    println!("Link status:");
    println!("- Station connected: {}", discrete.wifi_sta_connected);
    println!("- Access point active: {}", discrete.wifi_ap_active);
    println!("- Uptime: {} s", input.sys_uptime_sec);
    println!("- RSSI: {} dBm", input.wifi_rssi);
    println!("- Station IP: {}", input.sta_ip());
    println!("- Access point IP: {}", input.ap_ip());
    println!("- Connected clients: {}", input.connected_clients);

    println!("Settings:");
    match holding.wifi_mode() {
        Ok(mode) => println!("- WiFi mode: {:?}", mode),
        Err(e) => println!("- WiFi mode: {}", e),
    }
    println!("- Station SSID: {}", holding.station_ssid());
    println!("- Access point SSID: {}", holding.ap_ssid());
    println!(
        "- Access point channel: {}, max clients: {}",
        holding.ap_channel, holding.ap_max_conn
    );
    println!("- Modbus TCP port: {}", holding.tcp_port);

    Ok(())
}
