// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! End-to-end tests of the daemon: configuration, network process, gateway
//! controller and a Modbus client

mod common;

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use anyhow::Result;
use tokio_modbus::prelude::*;

use common::{eventually, free_port};
use rust_modbus_gateway::config::Config;
use rust_modbus_gateway::daemon::{seed_holding_registers, Daemon};
use rust_modbus_gateway::gateway::GatewayState;
use rust_modbus_gateway::network::StationConfig;
use rust_modbus_gateway::registers::address_map::{discrete, holding};
use rust_modbus_gateway::registers::{
    decode_text, HoldingRegisters, RegisterMap, WifiMode, WordRegion,
};
use rust_modbus_gateway::signals::ConnectivityFlag;

const WAIT: Duration = Duration::from_secs(3);

fn test_config(port: u16) -> Config {
    let mut config = Config::default();
    config.modbus.address = "127.0.0.1".to_string();
    config.modbus.port = port;
    config.network.station = Some(StationConfig {
        ssid: "plant-floor".to_string(),
        password: "secret-pass".to_string(),
    });
    config.gateway.init_retry_backoff_ms = 50;
    config.gateway.status_interval_ms = 20;
    config.gateway.stop_grace_period_ms = 1000;
    config
}

#[tokio::test]
async fn test_daemon_serves_while_station_is_connected() -> Result<()> {
    common::setup();
    let port = free_port();
    let config = test_config(port);
    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));

    let mut daemon = Daemon::new();
    daemon.launch(&config).await?;
    assert!(daemon.wait_for_gateway_state(GatewayState::Serving, WAIT).await);
    assert!(daemon
        .connectivity()
        .peek()
        .contains(ConnectivityFlag::StaConnected));

    let mut ctx = tcp::connect(addr).await?;
    let words = ctx.read_holding_registers(0, HoldingRegisters::COUNT).await??;
    let mut holding = HoldingRegisters::default();
    holding.load_words(&words);
    assert_eq!(holding.station_ssid(), "plant-floor");
    assert_eq!(holding.ap_ssid(), "modbus-gateway");
    assert_eq!(holding.tcp_port, port);

    // Discrete inputs catch up on the next status refresh
    let mut connected = false;
    for _ in 0..50 {
        let bits = ctx.read_discrete_inputs(0, 8).await??;
        if bits[discrete::STA_CONNECTED as usize] {
            connected = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(connected, "station flag never reached the discrete inputs");

    daemon.disconnect().await;
    assert!(daemon.wait_for_gateway_state(GatewayState::AwaitingLink, WAIT).await);
    assert!(tcp::connect(addr).await.is_err());

    daemon.connect().await;
    assert!(daemon.wait_for_gateway_state(GatewayState::Serving, WAIT).await);
    let mut ctx = tcp::connect(addr).await?;
    let ssid = ctx.read_holding_registers(holding::STA_SSID, 16).await??;
    assert_eq!(
        decode_text(&ssid.try_into().expect("sixteen words")),
        "plant-floor"
    );

    daemon.shutdown().await;
    assert_eq!(daemon.gateway_state(), Some(GatewayState::Idle));
    assert!(tcp::connect(addr).await.is_err());
    daemon.join().await?;
    Ok(())
}

#[tokio::test]
async fn test_access_point_mode_serves_without_station() -> Result<()> {
    common::setup();
    let port = free_port();
    let mut config = test_config(port);
    config.network.mode = WifiMode::AccessPoint;
    config.network.station = None;

    let mut daemon = Daemon::new();
    daemon.launch(&config).await?;
    assert!(daemon.wait_for_gateway_state(GatewayState::Serving, WAIT).await);
    let flags = daemon.connectivity().peek();
    assert!(flags.contains(ConnectivityFlag::ApStarted));
    assert!(!flags.contains(ConnectivityFlag::StaConnected));

    daemon.shutdown().await;
    daemon.join().await?;
    Ok(())
}

#[tokio::test]
async fn test_disabled_gateway_never_binds() -> Result<()> {
    common::setup();
    let port = free_port();
    let mut config = test_config(port);
    config.modbus.enabled = false;
    config.rtu.enabled = true;

    let mut daemon = Daemon::new();
    daemon.launch(&config).await?;
    assert_eq!(daemon.gateway_state(), None);
    assert!(!daemon.wait_for_gateway_state(GatewayState::Serving, Duration::from_millis(100)).await);

    // The link still comes up and the port stays free
    let connectivity = daemon.connectivity();
    assert!(
        eventually(WAIT, || connectivity
            .peek()
            .contains(ConnectivityFlag::StaConnected))
        .await
    );
    assert!(std::net::TcpListener::bind(("127.0.0.1", port)).is_ok());

    daemon.shutdown().await;
    daemon.join().await?;
    Ok(())
}

#[test]
fn test_seed_holding_registers() -> Result<()> {
    let mut config = test_config(1502);
    config.network.mode = WifiMode::AccessPointStation;
    config.network.access_point.channel = 6;
    config.network.access_point.password = "ap-password".to_string();

    let registers = RegisterMap::new();
    seed_holding_registers(&config, &registers)?;

    let holding = *registers.holding_registers();
    assert_eq!(holding.wifi_mode()?, WifiMode::AccessPointStation);
    assert_eq!(holding.station_ssid(), "plant-floor");
    assert_eq!(holding.station_password(), "secret-pass");
    assert_eq!(holding.ap_password(), "ap-password");
    assert_eq!(holding.ap_channel, 6);
    assert_eq!(holding.tcp_port()?, 1502);
    Ok(())
}
