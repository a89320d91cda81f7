// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus TCP backend built on `tokio-modbus`
//!
//! `create` binds the listener immediately so address conflicts surface as
//! initialization failures. `start` moves the listener into a spawned
//! `tokio-modbus` accept loop. `stop` closes the service gate, ends every
//! client session of the instance and aborts the accept loop, which drops
//! the listener.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, info, warn};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_modbus::server::tcp::{accept_tcp_connection, Server};
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

use super::backend::{
    ProtocolEvents, RegionDescriptor, ServerBackend, ServerError, ServerHandle, TransportConfig,
};
use super::modbus_server::{EventRecorder, GatewayModbusService};

/// Time allowed for an aborted accept loop to unwind.
const ACCEPT_LOOP_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Creates Modbus TCP server instances.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpServerBackend;

#[async_trait]
impl ServerBackend for TcpServerBackend {
    type Handle = TcpServerHandle;

    async fn create(&self, config: &TransportConfig) -> Result<TcpServerHandle, ServerError> {
        if config.port == 0 {
            return Err(ServerError::InvalidTransport(
                "port 0 is not a valid Modbus TCP port".to_string(),
            ));
        }

        let addr = config.socket_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Bind { addr, source })?;
        debug!(
            "Modbus TCP listener bound on {} (unit id {})",
            local_addr, config.unit_id
        );

        Ok(TcpServerHandle {
            listener: Some(listener),
            local_addr,
            regions: Vec::new(),
            events: EventRecorder::default(),
            open: Arc::new(AtomicBool::new(false)),
            sessions: CancellationToken::new(),
            task: None,
        })
    }
}

/// A bound Modbus TCP server.
#[derive(Debug)]
pub struct TcpServerHandle {
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    regions: Vec<RegionDescriptor>,
    events: EventRecorder,
    open: Arc<AtomicBool>,
    /// Cancelled when the instance stops, ends every client session.
    sessions: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl TcpServerHandle {
    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_serving(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

#[async_trait]
impl ServerHandle for TcpServerHandle {
    fn register_region(&mut self, region: RegionDescriptor) -> Result<(), ServerError> {
        if self.listener.is_none() {
            return Err(ServerError::RegionRegistration {
                kind: region.kind,
                reason: "server already started".to_string(),
            });
        }
        if self.regions.iter().any(|r| r.kind == region.kind) {
            return Err(ServerError::RegionRegistration {
                kind: region.kind,
                reason: "table already registered".to_string(),
            });
        }
        debug!(
            "Registering {} region at offset {} ({} entries)",
            region.kind,
            region.start_offset,
            region.size()
        );
        self.regions.push(region);
        Ok(())
    }

    async fn start(&mut self) -> Result<(), ServerError> {
        if self.regions.is_empty() {
            return Err(ServerError::Start("no region registered".to_string()));
        }
        let listener = self
            .listener
            .take()
            .ok_or_else(|| ServerError::Start("server already started".to_string()))?;

        let service = GatewayModbusService::new(
            self.regions.iter().cloned().collect(),
            self.events.clone(),
            self.open.clone(),
        );
        self.open.store(true, Ordering::Release);

        let server = Server::new(listener);
        let sessions = self.sessions.clone();
        let on_connected = move |stream, socket_addr| {
            let service = service.clone();
            let sessions = sessions.clone();
            async move {
                debug!("Modbus client connected from {}", socket_addr);
                accept_tcp_connection(stream, socket_addr, move |_socket_addr| {
                    Ok(Some(service.clone()))
                })
                .map(|accepted| {
                    accepted.map(|(service, stream)| (service, SessionStream::new(stream, &sessions)))
                })
            }
        };
        let on_process_error = |err| {
            error!("Modbus server error: {err}");
        };

        self.task = Some(tokio::spawn(async move {
            if let Err(e) = server.serve(&on_connected, on_process_error).await {
                error!("Modbus server error: {}", e);
            }
        }));

        info!("Modbus TCP server listening on {}", self.local_addr);
        Ok(())
    }

    fn poll_events(&mut self, mask: ProtocolEvents) -> ProtocolEvents {
        self.events.take(mask)
    }

    async fn stop(&mut self) -> Result<(), ServerError> {
        self.open.store(false, Ordering::Release);
        self.sessions.cancel();
        // A handle that was never started still owns its listener
        self.listener.take();

        if let Some(task) = self.task.take() {
            info!("Shutting down Modbus server on {}...", self.local_addr);
            task.abort();
            match tokio::time::timeout(ACCEPT_LOOP_SHUTDOWN_TIMEOUT, task).await {
                Ok(_) => info!("Modbus server shut down successfully"),
                Err(_) => warn!("Modbus server shutdown timed out, forcing termination"),
            }
        }
        Ok(())
    }

    fn destroy(self) {
        debug!("Releasing Modbus server instance on {}", self.local_addr);
    }
}

impl Drop for TcpServerHandle {
    fn drop(&mut self) {
        self.open.store(false, Ordering::Release);
        self.sessions.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Client connection of one server instance.
///
/// Reads return end of stream and writes fail once the instance's session
/// token is cancelled, so the `tokio-modbus` session task exits and drops
/// its service and socket.
struct SessionStream {
    stream: TcpStream,
    token: CancellationToken,
    cancelled: Pin<Box<WaitForCancellationFutureOwned>>,
}

impl SessionStream {
    fn new(stream: TcpStream, token: &CancellationToken) -> Self {
        Self {
            stream,
            token: token.clone(),
            cancelled: Box::pin(token.clone().cancelled_owned()),
        }
    }

    /// Registers the waker with the token while the session is open.
    fn poll_closed(&mut self, cx: &mut Context<'_>) -> bool {
        self.token.is_cancelled() || self.cancelled.as_mut().poll(cx).is_ready()
    }
}

impl AsyncRead for SessionStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.poll_closed(cx) {
            debug!("Server instance stopped, closing client session");
            return Poll::Ready(Ok(()));
        }
        Pin::new(&mut this.stream).poll_read(cx, buf)
    }
}

impl AsyncWrite for SessionStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if this.poll_closed(cx) {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "server instance stopped",
            )));
        }
        Pin::new(&mut this.stream).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().stream).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().stream).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::{RegionKind, RegisterMap};
    use std::net::{IpAddr, Ipv4Addr};

    fn loopback(port: u16) -> TransportConfig {
        TransportConfig {
            address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port,
            unit_id: 1,
        }
    }

    async fn bound_handle() -> TcpServerHandle {
        // Reserve a free port, then hand it to the backend
        let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = probe.local_addr().unwrap().port();
        drop(probe);
        TcpServerBackend.create(&loopback(port)).await.unwrap()
    }

    #[tokio::test]
    async fn port_zero_is_rejected() {
        let err = TcpServerBackend.create(&loopback(0)).await.unwrap_err();
        assert!(matches!(err, ServerError::InvalidTransport(_)));
    }

    #[tokio::test]
    async fn bind_conflict_is_reported() {
        let handle = bound_handle().await;
        let err = TcpServerBackend
            .create(&loopback(handle.local_addr().port()))
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::Bind { .. }));
    }

    #[tokio::test]
    async fn start_requires_a_region() {
        let mut handle = bound_handle().await;
        assert!(matches!(handle.start().await, Err(ServerError::Start(_))));
    }

    #[tokio::test]
    async fn duplicate_region_is_rejected() {
        let map = RegisterMap::shared();
        let mut handle = bound_handle().await;
        handle
            .register_region(RegionDescriptor::for_table(RegionKind::Coil, map.clone()))
            .unwrap();
        let err = handle
            .register_region(RegionDescriptor::for_table(RegionKind::Coil, map))
            .unwrap_err();
        assert!(matches!(err, ServerError::RegionRegistration { .. }));
    }

    #[tokio::test]
    async fn stop_closes_open_sessions() {
        use tokio::io::AsyncReadExt;

        let map = RegisterMap::shared();
        let mut handle = bound_handle().await;
        handle
            .register_region(RegionDescriptor::for_table(RegionKind::Holding, map.clone()))
            .unwrap();
        handle.start().await.unwrap();

        let mut client = TcpStream::connect(handle.local_addr()).await.unwrap();
        // Let the accept loop hand the connection to a session task
        tokio::time::sleep(Duration::from_millis(50)).await;

        handle.stop().await.unwrap();
        handle.destroy();

        let mut buf = [0u8; 16];
        let read = tokio::time::timeout(Duration::from_secs(2), client.read(&mut buf))
            .await
            .expect("session was not closed");
        assert!(matches!(read, Ok(0) | Err(_)));

        // The finished session released its service and regions
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while Arc::strong_count(&map) > 1 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(Arc::strong_count(&map), 1);
    }

    #[tokio::test]
    async fn stop_releases_the_port() {
        let map = RegisterMap::shared();
        let mut handle = bound_handle().await;
        let port = handle.local_addr().port();
        handle
            .register_region(RegionDescriptor::for_table(RegionKind::Holding, map))
            .unwrap();
        handle.start().await.unwrap();
        assert!(handle.is_serving());

        handle.stop().await.unwrap();
        handle.destroy();

        let rebound = TcpServerBackend.create(&loopback(port)).await;
        assert!(rebound.is_ok());
    }
}
