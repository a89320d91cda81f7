// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Network manager for hosts without a managed radio
//!
//! The host's own network stack is already up, so connecting only reports
//! the configured addresses as if the link had just come up. This lets the
//! gateway run unchanged on a workstation or in CI.

use std::net::Ipv4Addr;

use async_trait::async_trait;
use log::{debug, info};
use tokio::sync::mpsc;

use super::{NetworkError, NetworkEvent, NetworkManager, StationConfig};
use crate::registers::WifiMode;

/// Host-side [`NetworkManager`].
#[derive(Debug, Clone)]
pub struct HostNetworkManager {
    events: mpsc::Sender<NetworkEvent>,
    mode: WifiMode,
    station: Option<StationConfig>,
    station_ip: Ipv4Addr,
    ap_ip: Ipv4Addr,
}

impl HostNetworkManager {
    pub fn new(
        events: mpsc::Sender<NetworkEvent>,
        mode: WifiMode,
        station: Option<StationConfig>,
        station_ip: Ipv4Addr,
        ap_ip: Ipv4Addr,
    ) -> Self {
        Self {
            events,
            mode,
            station,
            station_ip,
            ap_ip,
        }
    }

    async fn emit(&self, event: NetworkEvent) -> Result<(), NetworkError> {
        debug!("Host network event: {:?}", event);
        self.events
            .send(event)
            .await
            .map_err(|_| NetworkError::ChannelClosed)
    }
}

#[async_trait]
impl NetworkManager for HostNetworkManager {
    async fn connect_async(&self) -> Result<(), NetworkError> {
        info!("Connecting to WiFi...");
        if matches!(self.mode, WifiMode::AccessPoint | WifiMode::AccessPointStation) {
            self.emit(NetworkEvent::ApStarted { ip: self.ap_ip }).await?;
        }
        if matches!(self.mode, WifiMode::Station | WifiMode::AccessPointStation) {
            if self.station.is_none() {
                // Without credentials a station falls back to the access point, if any
                self.emit(NetworkEvent::StaDisconnected).await?;
                return Err(NetworkError::NoStationConfig);
            }
            self.emit(NetworkEvent::StaGotIp {
                ip: self.station_ip,
            })
            .await?;
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), NetworkError> {
        info!("Disconnecting from WiFi...");
        self.emit(NetworkEvent::StaDisconnected).await
    }

    fn station_config(&self) -> Option<StationConfig> {
        self.station.clone()
    }
}
