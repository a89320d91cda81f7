// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Daemon wiring the gateway components together
//!
//! The daemon owns the process-wide register map and connectivity bus, runs
//! the network process, and drives the gateway controller. Shutdown happens
//! in reverse order: the gateway drains first, then the network process and
//! the heartbeat are told to exit.

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::gateway::{GatewayState, ModbusGateway};
use crate::modbus::TcpServerBackend;
use crate::network::{HostNetworkManager, LinkStatus, NetworkManager, NetworkProcess};
use crate::registers::{RegisterMap, SharedRegisterMap};
use crate::rtu::RtuGateway;
use crate::signals::ConnectivityBus;

/// Interval between two heartbeat log lines.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);

/// Time each background task gets to finish in [`Daemon::join`].
const TASK_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Represents the running gateway and its background tasks
pub struct Daemon {
    tasks: Vec<JoinHandle<Result<()>>>,
    shutdown: watch::Sender<bool>,
    registers: SharedRegisterMap,
    connectivity: ConnectivityBus,
    link: LinkStatus,
    network: Option<Arc<HostNetworkManager>>,
    gateway: Option<ModbusGateway<TcpServerBackend>>,
    rtu: RtuGateway,
}

impl Default for Daemon {
    fn default() -> Self {
        Self::new()
    }
}

impl Daemon {
    /// Create a new daemon instance with a default register map
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        Daemon {
            tasks: Vec::new(),
            shutdown,
            registers: RegisterMap::shared(),
            connectivity: ConnectivityBus::new(),
            link: LinkStatus::new(),
            network: None,
            gateway: None,
            rtu: RtuGateway::new(),
        }
    }

    /// Launch all configured tasks based on configuration
    pub async fn launch(&mut self, config: &Config) -> Result<()> {
        seed_holding_registers(config, &self.registers)?;

        self.start_network_process(config);

        if config.modbus.enabled {
            self.start_gateway(config)?;
        } else {
            info!("Modbus gateway disabled in configuration");
        }

        if config.rtu.enabled {
            if let Err(e) = self.rtu.start() {
                warn!("Modbus RTU bridge unavailable: {}", e);
            }
        }

        self.start_heartbeat();

        if config.network.auto_connect {
            self.connect().await;
        }

        Ok(())
    }

    /// Start the task applying network events to the connectivity bus
    fn start_network_process(&mut self, config: &Config) {
        let (process, events) = NetworkProcess::new(self.connectivity.clone(), self.link.clone());
        let manager = Arc::new(HostNetworkManager::new(
            events,
            config.network.mode,
            config.network.station.clone(),
            config.network.station_ip,
            config.network.access_point.ip,
        ));
        manager.log_status();
        self.network = Some(manager);

        let shutdown = self.shutdown.subscribe();
        self.tasks.push(tokio::spawn(async move {
            process.run(shutdown).await;
            Ok(())
        }));
    }

    /// Start the gateway lifecycle controller
    fn start_gateway(&mut self, config: &Config) -> Result<()> {
        let settings = config
            .gateway_settings()
            .context("Invalid Modbus gateway settings")?;
        info!(
            "Starting Modbus gateway on {} (waiting for WiFi link)",
            settings.transport.socket_addr()
        );

        let mut gateway = ModbusGateway::new(
            TcpServerBackend,
            self.registers.clone(),
            self.connectivity.clone(),
            self.link.clone(),
            settings,
        );
        gateway.start()?;
        self.gateway = Some(gateway);
        Ok(())
    }

    /// Start a heartbeat task that logs link and gateway status periodically
    fn start_heartbeat(&mut self) {
        debug!("Starting heartbeat monitor");

        let mut shutdown = self.shutdown.subscribe();
        let connectivity = self.connectivity.clone();
        let state = self.gateway.as_ref().map(|gateway| gateway.subscribe());
        self.tasks.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(HEARTBEAT_INTERVAL);
            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = ticker.tick() => {
                        let gateway = state.as_ref().map(|rx| *rx.borrow());
                        debug!(
                            "Daemon heartbeat: link {:?}, gateway {:?}",
                            connectivity.peek(),
                            gateway
                        );
                    }
                }
            }
            Ok(())
        }));
    }

    /// Ask the network manager to bring the link up
    pub async fn connect(&self) {
        if let Some(network) = &self.network {
            if let Err(e) = network.connect_async().await {
                warn!("WiFi connection failed: {}", e);
            }
        }
    }

    /// Ask the network manager to drop the station link
    pub async fn disconnect(&self) {
        if let Some(network) = &self.network {
            if let Err(e) = network.disconnect().await {
                warn!("WiFi disconnection failed: {}", e);
            }
        }
    }

    pub fn registers(&self) -> SharedRegisterMap {
        self.registers.clone()
    }

    pub fn connectivity(&self) -> ConnectivityBus {
        self.connectivity.clone()
    }

    /// Current gateway state, `None` when the gateway is disabled.
    pub fn gateway_state(&self) -> Option<GatewayState> {
        self.gateway.as_ref().map(|gateway| gateway.state())
    }

    /// Wait for the gateway to reach `target`.
    pub async fn wait_for_gateway_state(&self, target: GatewayState, timeout: Duration) -> bool {
        match &self.gateway {
            Some(gateway) => gateway.wait_for_state(target, timeout).await,
            None => false,
        }
    }

    /// Stop the gateway, then signal every background task to exit
    pub async fn shutdown(&mut self) {
        info!("Shutting down daemon tasks");
        if let Some(gateway) = self.gateway.as_mut() {
            gateway.stop().await;
        }
        if self.rtu.stop().is_err() {
            debug!("Modbus RTU bridge has nothing to stop");
        }
        self.shutdown.send_replace(true);
    }

    /// Wait for all tasks to complete
    ///
    /// Consumes the daemon and waits for all spawned tasks to finish execution.
    /// This method should be called after `shutdown()` to ensure a clean application exit.
    pub async fn join(self) -> Result<()> {
        for task in self.tasks {
            match tokio::time::timeout(TASK_JOIN_TIMEOUT, task).await {
                Ok(Ok(Ok(()))) => {}
                Ok(Ok(Err(e))) => error!("Task failed: {}", e),
                Ok(Err(e)) => error!("Task panicked: {}", e),
                Err(_) => warn!("Task did not complete within timeout period, may be hung"),
            }
        }
        Ok(())
    }
}

/// Copy the network and transport configuration into the holding registers.
pub fn seed_holding_registers(config: &Config, registers: &RegisterMap) -> Result<()> {
    let ap = &config.network.access_point;
    let mut holding = registers.holding_registers();

    holding.wifi_mode = config.network.mode.code();
    if let Some(station) = &config.network.station {
        holding
            .set_station_credentials(&station.ssid, &station.password)
            .context("Station credentials do not fit the holding registers")?;
    }
    holding
        .set_ap_credentials(&ap.ssid, &ap.password)
        .context("Access point credentials do not fit the holding registers")?;
    holding.ap_channel = ap.channel;
    holding.ap_max_conn = ap.max_clients;
    holding.tcp_port = config.modbus.port;

    debug!("Holding registers seeded from configuration");
    Ok(())
}
