// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Level-triggered signal bus
//!
//! A small set of named flags shared between tasks. Producers set and clear
//! flags; consumers wait until a combination of flags is present. A flag
//! stays set until a producer clears it, so any number of waiters can observe
//! it without consuming it.
//!
//! The bus is a thin layer over a `tokio::sync::watch` channel holding an
//! [`EnumSet`]. A flag set before a scheduling point is visible to every
//! subsequent [`SignalBus::peek`] or wait. Two updates made in quick
//! succession may be coalesced: a waiter is only guaranteed to see the
//! latest value, never every intermediate one.
//!
//! ## Usage
//!
//! ```
//! use rust_modbus_gateway::signals::{ConnectivityBus, ConnectivityFlag};
//!
//! # async fn example() {
//! let bus = ConnectivityBus::new();
//! bus.set(ConnectivityFlag::ApStarted);
//! let seen = bus
//!     .wait_any(ConnectivityFlag::StaConnected | ConnectivityFlag::ApStarted, None)
//!     .await;
//! assert!(seen.contains(ConnectivityFlag::ApStarted));
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use enumset::{EnumSet, EnumSetType};
use tokio::sync::watch;

/// Network link flags published by the network process.
#[derive(EnumSetType, Debug)]
pub enum ConnectivityFlag {
    /// Station interface has an IP address.
    StaConnected,
    /// Soft access point is up.
    ApStarted,
    /// Station interface lost its association.
    Disconnected,
}

/// The process-wide connectivity flag set.
pub type ConnectivityBus = SignalBus<ConnectivityFlag>;

/// A level-triggered flag set that can be cloned and shared across tasks.
#[derive(Debug)]
pub struct SignalBus<F: EnumSetType> {
    state: Arc<watch::Sender<EnumSet<F>>>,
}

impl<F: EnumSetType> Clone for SignalBus<F> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<F: EnumSetType> Default for SignalBus<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: EnumSetType> SignalBus<F> {
    /// Create a bus with every flag cleared.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(EnumSet::empty());
        Self {
            state: Arc::new(tx),
        }
    }

    /// Set `flags`. Waiters are only woken when this changes the set.
    pub fn set(&self, flags: impl Into<EnumSet<F>>) {
        let flags = flags.into();
        self.state.send_if_modified(|current| {
            let before = *current;
            current.insert_all(flags);
            *current != before
        });
    }

    /// Clear `flags`.
    pub fn clear(&self, flags: impl Into<EnumSet<F>>) {
        let flags = flags.into();
        self.state.send_if_modified(|current| {
            let before = *current;
            current.remove_all(flags);
            *current != before
        });
    }

    /// Current flags, without waiting.
    pub fn peek(&self) -> EnumSet<F> {
        *self.state.borrow()
    }

    /// Wait until at least one of `flags` is set.
    ///
    /// Returns the flag set observed when the wait ended. On timeout this is
    /// the current snapshot, which may not intersect `flags`.
    pub async fn wait_any(&self, flags: impl Into<EnumSet<F>>, timeout: Option<Duration>) -> EnumSet<F> {
        let flags = flags.into();
        self.wait_until(move |current| !current.is_disjoint(flags), timeout)
            .await
    }

    /// Wait until every one of `flags` is set.
    ///
    /// Same return convention as [`SignalBus::wait_any`].
    pub async fn wait_all(&self, flags: impl Into<EnumSet<F>>, timeout: Option<Duration>) -> EnumSet<F> {
        let flags = flags.into();
        self.wait_until(move |current| current.is_superset(flags), timeout)
            .await
    }

    /// Wait until `condition` holds for the flag set.
    pub async fn wait_until<P>(&self, mut condition: P, timeout: Option<Duration>) -> EnumSet<F>
    where
        P: FnMut(EnumSet<F>) -> bool,
    {
        let mut rx = self.state.subscribe();
        let wait = async move {
            // The sender lives in `self`, so the channel cannot close while we wait.
            match rx.wait_for(|current| condition(*current)).await {
                Ok(observed) => Some(*observed),
                Err(_) => None,
            }
        };

        let observed = match timeout {
            Some(limit) => tokio::time::timeout(limit, wait).await.ok().flatten(),
            None => wait.await,
        };
        observed.unwrap_or_else(|| self.peek())
    }
}
