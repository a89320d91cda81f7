// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Helpers shared by the integration tests

#![allow(dead_code)]

use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use async_trait::async_trait;
use rust_modbus_gateway::gateway::GatewaySettings;
use rust_modbus_gateway::modbus::{
    ProtocolEvents, RegionDescriptor, ServerBackend, ServerError, ServerHandle, TransportConfig,
};
use rust_modbus_gateway::registers::RegionKind;
use rust_modbus_gateway::signals::{ConnectivityBus, ConnectivityFlag};

static INIT: Once = Once::new();

/// Setup logger for tests
pub fn setup() {
    INIT.call_once(|| {
        let _ = env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .try_init();
    });
}

/// A port nothing listens on right now.
pub fn free_port() -> u16 {
    let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    probe.local_addr().unwrap().port()
}

/// Controller settings fast enough for tests.
pub fn fast_settings(port: u16) -> GatewaySettings {
    GatewaySettings {
        transport: TransportConfig {
            address: "127.0.0.1".parse().unwrap(),
            port,
            unit_id: 1,
        },
        init_retry_backoff: Duration::from_millis(50),
        poll_interval: Duration::from_millis(5),
        status_interval: Duration::from_millis(20),
        stop_grace_period: Duration::from_millis(500),
    }
}

/// Station link comes up, the way the network process reports it.
pub fn station_up(bus: &ConnectivityBus) {
    bus.clear(ConnectivityFlag::Disconnected);
    bus.set(ConnectivityFlag::StaConnected);
}

/// Station link goes down, the way the network process reports it.
pub fn station_down(bus: &ConnectivityBus) {
    bus.clear(ConnectivityFlag::StaConnected);
    bus.set(ConnectivityFlag::Disconnected);
}

/// Poll `condition` until it holds or `timeout` elapses.
pub async fn eventually(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

/// Counters shared by a [`FakeBackend`] and every handle it creates.
#[derive(Debug, Default)]
pub struct FakeStats {
    pub create_attempts: AtomicUsize,
    pub created: AtomicUsize,
    pub started: AtomicUsize,
    pub stopped: AtomicUsize,
    pub destroyed: AtomicUsize,
    pub live: AtomicUsize,
    pub max_live: AtomicUsize,
    pub ports: Mutex<Vec<u16>>,
    pub regions: Mutex<Vec<RegionKind>>,
}

impl FakeStats {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn live(&self) -> usize {
        Self::get(&self.live)
    }
}

/// In-memory protocol server recording its lifecycle.
#[derive(Debug, Clone, Default)]
pub struct FakeBackend {
    pub stats: Arc<FakeStats>,
    /// Number of upcoming `create` calls that fail.
    pub failing_creates: Arc<AtomicUsize>,
    /// Make `stop` hang forever.
    pub hang_on_stop: Arc<AtomicBool>,
    /// Time every `create` call takes, in milliseconds.
    pub create_delay_ms: Arc<AtomicU64>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_creates(&self, count: usize) {
        self.failing_creates.store(count, Ordering::SeqCst);
    }

    pub fn delay_creates(&self, delay: Duration) {
        self.create_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }
}

#[async_trait]
impl ServerBackend for FakeBackend {
    type Handle = FakeHandle;

    async fn create(&self, config: &TransportConfig) -> Result<FakeHandle, ServerError> {
        self.stats.create_attempts.fetch_add(1, Ordering::SeqCst);
        self.stats.ports.lock().unwrap().push(config.port);

        let delay = self.create_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let failing = self.failing_creates.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_creates.store(failing - 1, Ordering::SeqCst);
            return Err(ServerError::Bind {
                addr: config.socket_addr(),
                source: io::Error::new(io::ErrorKind::AddrInUse, "injected bind failure"),
            });
        }

        self.stats.created.fetch_add(1, Ordering::SeqCst);
        let live = self.stats.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.max_live.fetch_max(live, Ordering::SeqCst);
        Ok(FakeHandle {
            stats: self.stats.clone(),
            hang_on_stop: self.hang_on_stop.clone(),
            regions: Vec::new(),
        })
    }
}

#[derive(Debug)]
pub struct FakeHandle {
    stats: Arc<FakeStats>,
    hang_on_stop: Arc<AtomicBool>,
    regions: Vec<RegionKind>,
}

#[async_trait]
impl ServerHandle for FakeHandle {
    fn register_region(&mut self, region: RegionDescriptor) -> Result<(), ServerError> {
        self.regions.push(region.kind);
        self.stats.regions.lock().unwrap().push(region.kind);
        Ok(())
    }

    async fn start(&mut self) -> Result<(), ServerError> {
        self.stats.started.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn poll_events(&mut self, _mask: ProtocolEvents) -> ProtocolEvents {
        ProtocolEvents::empty()
    }

    async fn stop(&mut self) -> Result<(), ServerError> {
        if self.hang_on_stop.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.stats.stopped.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn destroy(self) {
        self.stats.destroyed.fetch_add(1, Ordering::SeqCst);
    }
}

impl Drop for FakeHandle {
    fn drop(&mut self) {
        self.stats.live.fetch_sub(1, Ordering::SeqCst);
    }
}
