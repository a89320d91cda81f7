// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! The gateway controller task and its public handle
//!
//! ## Usage
//!
//! ```no_run
//! use rust_modbus_gateway::gateway::{GatewaySettings, ModbusGateway};
//! use rust_modbus_gateway::modbus::TcpServerBackend;
//! use rust_modbus_gateway::network::LinkStatus;
//! use rust_modbus_gateway::registers::RegisterMap;
//! use rust_modbus_gateway::signals::ConnectivityBus;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let bus = ConnectivityBus::new();
//! let mut gateway = ModbusGateway::new(
//!     TcpServerBackend,
//!     RegisterMap::shared(),
//!     bus.clone(),
//!     LinkStatus::new(),
//!     GatewaySettings::default(),
//! );
//! gateway.start()?;
//! // ... the network process sets connectivity flags on `bus` ...
//! gateway.stop().await;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use enumset::EnumSet;
use log::{debug, error, info, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use super::{ControlBus, ControlFlag, GatewayError, GatewaySettings, GatewayState, StatusRefresher};
use crate::modbus::{
    ProtocolEvent, ProtocolEvents, RegionDescriptor, ServerBackend, ServerError, ServerHandle,
    TransportConfig,
};
use crate::network::LinkStatus;
use crate::registers::{RegionKind, SharedRegisterMap};
use crate::signals::{ConnectivityBus, ConnectivityFlag};

/// Why a serving period ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DrainReason {
    Stop,
    LinkLost,
}

/// Everything the controller task needs, shared with the public handle.
struct GatewayContext<B: ServerBackend> {
    backend: B,
    registers: SharedRegisterMap,
    connectivity: ConnectivityBus,
    status: StatusRefresher,
    settings: GatewaySettings,
    state: watch::Sender<GatewayState>,
}

/// Handle on the gateway controller task.
pub struct ModbusGateway<B: ServerBackend> {
    context: Arc<GatewayContext<B>>,
    control: Option<ControlBus>,
    task: Option<JoinHandle<()>>,
}

impl<B: ServerBackend> ModbusGateway<B> {
    pub fn new(
        backend: B,
        registers: SharedRegisterMap,
        connectivity: ConnectivityBus,
        link: LinkStatus,
        settings: GatewaySettings,
    ) -> Self {
        let status = StatusRefresher::new(registers.clone(), connectivity.clone(), link);
        let (state, _) = watch::channel(GatewayState::Idle);
        Self {
            context: Arc::new(GatewayContext {
                backend,
                registers,
                connectivity,
                status,
                settings,
                state,
            }),
            control: None,
            task: None,
        }
    }

    /// Spawn the controller task.
    ///
    /// Returns once the task is scheduled. Fails with
    /// [`GatewayError::AlreadyRunning`] while a previous task is alive.
    pub fn start(&mut self) -> Result<(), GatewayError> {
        if self.is_running() {
            warn!("Modbus gateway start requested while already running");
            return Err(GatewayError::AlreadyRunning);
        }

        let control = ControlBus::new();
        control.clear(ControlFlag::StopRequested);
        control.set(ControlFlag::StartRequested);

        let context = self.context.clone();
        let task_control = control.clone();
        self.task = Some(tokio::spawn(async move {
            context.run(task_control).await;
        }));
        self.control = Some(control);
        info!("Modbus gateway task started");
        Ok(())
    }

    /// Stop the controller task.
    ///
    /// Waits up to the stop grace period for the task to drain and exit, then
    /// aborts it. Calling `stop` on a stopped gateway does nothing.
    pub async fn stop(&mut self) {
        let Some(mut task) = self.task.take() else {
            debug!("Modbus gateway already stopped");
            return;
        };
        if let Some(control) = self.control.take() {
            control.set(ControlFlag::StopRequested);
        }

        let grace = self.context.settings.stop_grace_period;
        match time::timeout(grace, &mut task).await {
            Ok(Ok(())) => info!("Modbus gateway stopped"),
            Ok(Err(e)) => error!("Modbus gateway task failed: {}", e),
            Err(_) => {
                warn!(
                    "Modbus gateway did not stop within {:?}, forcing termination",
                    grace
                );
                task.abort();
                // Dropping the aborted future releases any server handle it held
                let _ = task.await;
            }
        }
        self.context.publish(GatewayState::Idle);
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// True while a server instance is started.
    pub fn is_serving(&self) -> bool {
        self.control
            .as_ref()
            .is_some_and(|control| control.peek().contains(ControlFlag::Running))
    }

    pub fn state(&self) -> GatewayState {
        *self.context.state.borrow()
    }

    /// Subscribe to state transitions.
    pub fn subscribe(&self) -> watch::Receiver<GatewayState> {
        self.context.state.subscribe()
    }

    /// Wait until the controller publishes `target`.
    ///
    /// Returns `false` if `timeout` elapses first.
    pub async fn wait_for_state(&self, target: GatewayState, timeout: Duration) -> bool {
        let mut rx = self.subscribe();
        let reached = time::timeout(timeout, rx.wait_for(|state| *state == target)).await;
        matches!(reached, Ok(Ok(_)))
    }
}

impl<B: ServerBackend> Drop for ModbusGateway<B> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl<B: ServerBackend> GatewayContext<B> {
    fn publish(&self, state: GatewayState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!("Modbus gateway state: {:?} -> {:?}", previous, state);
        }
    }

    async fn run(&self, control: ControlBus) {
        control.wait_any(ControlFlag::StartRequested, None).await;
        control.clear(ControlFlag::StartRequested);

        loop {
            self.publish(GatewayState::AwaitingLink);
            info!("Waiting for WiFi link...");
            let link = tokio::select! {
                biased;
                _ = control.wait_any(ControlFlag::StopRequested, None) => break,
                flags = self.connectivity.wait_any(
                    ConnectivityFlag::StaConnected | ConnectivityFlag::ApStarted,
                    None,
                ) => flags,
            };
            info!("WiFi link available ({:?}), starting Modbus TCP server", link);

            let mut handle = match self.initialize().await {
                Ok(handle) => handle,
                Err(e) => {
                    error!(
                        "Modbus server initialization failed: {}, retrying in {:?}",
                        e, self.settings.init_retry_backoff
                    );
                    tokio::select! {
                        biased;
                        _ = control.wait_any(ControlFlag::StopRequested, None) => break,
                        _ = time::sleep(self.settings.init_retry_backoff) => continue,
                    }
                }
            };

            control.set(ControlFlag::Running);
            self.publish(GatewayState::Serving);
            let reason = self.serve(&mut handle, &control, link).await;

            self.publish(GatewayState::Draining);
            match reason {
                DrainReason::Stop => info!("Stop requested, shutting down Modbus TCP server"),
                DrainReason::LinkLost => warn!("WiFi link lost, shutting down Modbus TCP server"),
            }
            self.teardown(handle).await;
            control.clear(ControlFlag::Running);

            if reason == DrainReason::Stop {
                break;
            }
        }

        self.publish(GatewayState::Idle);
        info!("Modbus gateway task finished");
    }

    /// Transport for the next server instance.
    fn transport(&self) -> TransportConfig {
        let mut transport = self.settings.transport.clone();
        let port = self.registers.holding_registers().tcp_port();
        match port {
            Ok(port) => transport.port = port,
            Err(e) => warn!(
                "Ignoring TCP port from holding registers ({}), using {}",
                e, transport.port
            ),
        }
        transport
    }

    async fn initialize(&self) -> Result<B::Handle, ServerError> {
        let transport = self.transport();
        info!("Initializing Modbus TCP server on {}", transport.socket_addr());
        let mut handle = self.backend.create(&transport).await?;

        for kind in RegionKind::ALL {
            let region = RegionDescriptor::for_table(kind, self.registers.clone());
            if let Err(e) = handle.register_region(region) {
                handle.destroy();
                return Err(e);
            }
        }

        if let Err(e) = handle.start().await {
            if let Err(stop_err) = handle.stop().await {
                warn!("Failed to stop Modbus server after start failure: {}", stop_err);
            }
            handle.destroy();
            return Err(e);
        }
        Ok(handle)
    }

    /// Run one serving period.
    ///
    /// `woke_on` holds the flags that ended the link wait. Changes made while
    /// the server was initializing are compared against it, so a disconnect
    /// during `create` or `start` still drains. A `Disconnected` flag already
    /// present in `woke_on` (station failed, access point up) does not.
    async fn serve(
        &self,
        handle: &mut B::Handle,
        control: &ControlBus,
        woke_on: EnumSet<ConnectivityFlag>,
    ) -> DrainReason {
        let mut last = woke_on;
        let mut poll = time::interval(self.settings.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let period = self.settings.status_interval;
        let mut status = time::interval_at(time::Instant::now() + period, period);
        status.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.status.refresh();

        loop {
            let since = last;
            tokio::select! {
                biased;
                _ = control.wait_any(ControlFlag::StopRequested, None) => return DrainReason::Stop,
                flags = self.connectivity.wait_until(move |current| current != since, None) => {
                    // Only a disconnect seen during this serving period ends it
                    if flags.contains(ConnectivityFlag::Disconnected)
                        && !since.contains(ConnectivityFlag::Disconnected)
                    {
                        return DrainReason::LinkLost;
                    }
                    last = flags;
                }
                _ = status.tick() => self.status.tick(),
                _ = poll.tick() => self.handle_events(handle.poll_events(ProtocolEvents::all())),
            }
        }
    }

    fn handle_events(&self, events: ProtocolEvents) {
        if events.is_empty() {
            return;
        }
        if events.contains(ProtocolEvent::CoilWrite) {
            debug!("Coil requests latched: {:?}", *self.registers.coils());
        }
        if events.contains(ProtocolEvent::HoldingWrite) {
            debug!("Holding registers written by a client");
        }
        debug!("Modbus events: {:?}", events);
    }

    async fn teardown(&self, mut handle: B::Handle) {
        if let Err(e) = handle.stop().await {
            warn!("Failed to stop Modbus server: {}", e);
        }
        handle.destroy();
    }
}
