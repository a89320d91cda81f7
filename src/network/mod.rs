// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Network process
//!
//! The network manager reports link changes as [`NetworkEvent`]s on a bounded
//! channel. [`NetworkProcess`] consumes them in order and turns them into
//! connectivity flag transitions on the [`ConnectivityBus`], plus a
//! [`LinkStatus`] snapshot (addresses, RSSI, client count) that the gateway
//! mirrors into the input registers.
//!
//! Station-connected and disconnected are kept mutually exclusive: the
//! opposite flag is always cleared before the new one is set.

pub mod host;

use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, watch};

use crate::signals::{ConnectivityBus, ConnectivityFlag};

pub use host::HostNetworkManager;

/// Capacity of the event channel between the network manager and the process.
pub const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Link notifications from the network manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkEvent {
    /// The station interface obtained an address.
    StaGotIp { ip: Ipv4Addr },
    /// The station interface lost its association.
    StaDisconnected,
    /// The soft access point is up.
    ApStarted { ip: Ipv4Addr },
    /// Number of stations associated to the access point.
    ApClientsChanged(u16),
    /// Station signal strength in dBm.
    SignalStrength(i16),
}

/// Station credentials known to the network manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationConfig {
    pub ssid: String,
    pub password: String,
}

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("no station configuration available")]
    NoStationConfig,

    #[error("network event channel closed")]
    ChannelClosed,
}

/// Boundary to the component that owns the radio.
#[async_trait]
pub trait NetworkManager: Send + Sync {
    /// Begin connecting. Progress is reported through [`NetworkEvent`]s.
    async fn connect_async(&self) -> Result<(), NetworkError>;

    async fn disconnect(&self) -> Result<(), NetworkError>;

    fn station_config(&self) -> Option<StationConfig>;

    /// Log the configured station network.
    fn log_status(&self) {
        match self.station_config() {
            Some(config) => info!("Current WiFi SSID: {}", config.ssid),
            None => info!("No WiFi configuration found"),
        }
    }
}

/// Live link information used by the status refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkSnapshot {
    pub sta_ip: Option<Ipv4Addr>,
    pub ap_ip: Option<Ipv4Addr>,
    pub rssi: i16,
    pub connected_clients: u16,
}

/// Shared, cheaply cloned handle on the current [`LinkSnapshot`].
#[derive(Debug, Clone, Default)]
pub struct LinkStatus {
    inner: Arc<Mutex<LinkSnapshot>>,
}

impl LinkStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> LinkSnapshot {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn update(&self, apply: impl FnOnce(&mut LinkSnapshot)) {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        apply(&mut guard);
    }
}

/// Applies network events to the connectivity bus and link status.
pub struct NetworkProcess {
    events: mpsc::Receiver<NetworkEvent>,
    connectivity: ConnectivityBus,
    link: LinkStatus,
}

impl NetworkProcess {
    /// Create the process and the sender the network manager reports through.
    pub fn new(connectivity: ConnectivityBus, link: LinkStatus) -> (Self, mpsc::Sender<NetworkEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        (
            Self {
                events: rx,
                connectivity,
                link,
            },
            tx,
        )
    }

    /// Apply one event.
    pub fn apply(&self, event: &NetworkEvent) {
        match event {
            NetworkEvent::StaGotIp { ip } => {
                info!("WiFi station connected, IP: {}", ip);
                self.connectivity.clear(ConnectivityFlag::Disconnected);
                self.connectivity.set(ConnectivityFlag::StaConnected);
                let ip = *ip;
                self.link.update(|link| link.sta_ip = Some(ip));
            }
            NetworkEvent::StaDisconnected => {
                warn!("WiFi station disconnected");
                self.connectivity.clear(ConnectivityFlag::StaConnected);
                self.connectivity.set(ConnectivityFlag::Disconnected);
                self.link.update(|link| {
                    link.sta_ip = None;
                    link.rssi = 0;
                });
            }
            NetworkEvent::ApStarted { ip } => {
                info!("WiFi access point started on {}", ip);
                self.connectivity.set(ConnectivityFlag::ApStarted);
                let ip = *ip;
                self.link.update(|link| link.ap_ip = Some(ip));
            }
            NetworkEvent::ApClientsChanged(count) => {
                debug!("Access point clients: {}", count);
                let count = *count;
                self.link.update(|link| link.connected_clients = count);
            }
            NetworkEvent::SignalStrength(rssi) => {
                let rssi = *rssi;
                self.link.update(|link| link.rssi = rssi);
            }
        }
    }

    /// Consume events until every sender is dropped or `shutdown` turns true.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("Network process started");
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                event = self.events.recv() => match event {
                    Some(event) => self.apply(&event),
                    None => break,
                },
            }
        }
        info!("Network process stopped");
    }
}
