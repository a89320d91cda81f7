// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Shared register map
//!
//! The protocol-visible state of the gateway, split into the four Modbus
//! tables. The map is allocated once at startup and shared by reference
//! between the gateway controller (status refresh) and the Modbus server
//! (client requests).
//!
//! ## Locking
//!
//! Each table sits behind its own `Mutex`. One function-code access locks
//! exactly one table for its whole duration, so a multi-register read never
//! observes a half-applied write to the same table.
//!
//! ## Register Map
//!
//! | Table | Address | Count | Access |
//! |-------|---------|-------|--------|
//! | Coils | 00001+ | 8 bits | read/write |
//! | Discrete inputs | 10001+ | 8 bits | read-only |
//! | Input registers | 30001+ | 9 words | read-only |
//! | Holding registers | 40001+ | 72 words | read/write |
//!
//! Field offsets are listed in [`address_map`].

pub mod address_map;
pub mod regions;
pub mod text;
pub mod validation;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;

pub use regions::{BitRegion, Coils, DiscreteInputs, HoldingRegisters, InputRegisters, WordRegion};
pub use text::{decode_text, encode_text, TextWords};
pub use validation::{validate_tcp_port, RtuBaudRate, RtuParity, WifiMode};

/// Errors raised by register access and validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegisterError {
    #[error("{kind} access out of range: address {address}, count {count}, table size {size}")]
    OutOfRange {
        kind: RegionKind,
        address: u16,
        count: usize,
        size: u16,
    },

    #[error("invalid quantity {count} for {kind}")]
    InvalidQuantity { kind: RegionKind, count: usize },

    #[error("{kind} is not a {expected} table")]
    WrongTable {
        kind: RegionKind,
        expected: &'static str,
    },

    #[error("value {value} is not valid for {field}")]
    InvalidValue { field: &'static str, value: u16 },

    #[error("text of {len} bytes exceeds the {capacity}-byte field")]
    TextTooLong { len: usize, capacity: usize },
}

/// The four Modbus tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionKind {
    Coil,
    Discrete,
    Input,
    Holding,
}

impl RegionKind {
    pub const ALL: [RegionKind; 4] = [
        RegionKind::Holding,
        RegionKind::Input,
        RegionKind::Coil,
        RegionKind::Discrete,
    ];

    /// Size of the table in bits or words.
    pub fn size(self) -> u16 {
        match self {
            RegionKind::Coil => Coils::COUNT,
            RegionKind::Discrete => DiscreteInputs::COUNT,
            RegionKind::Input => InputRegisters::COUNT,
            RegionKind::Holding => HoldingRegisters::COUNT,
        }
    }

    pub fn is_bit_table(self) -> bool {
        matches!(self, RegionKind::Coil | RegionKind::Discrete)
    }
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RegionKind::Coil => "coil",
            RegionKind::Discrete => "discrete input",
            RegionKind::Input => "input register",
            RegionKind::Holding => "holding register",
        };
        f.write_str(name)
    }
}

/// Lock a table, recovering the data if a previous holder panicked.
///
/// Table contents are plain values that are always left consistent, so a
/// poisoned lock carries no broken invariant.
fn lock<T>(table: &Mutex<T>) -> MutexGuard<'_, T> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

fn check_range(kind: RegionKind, address: u16, count: usize) -> Result<std::ops::Range<usize>, RegisterError> {
    if count == 0 {
        return Err(RegisterError::InvalidQuantity { kind, count });
    }
    let start = address as usize;
    let end = start + count;
    if end > kind.size() as usize {
        return Err(RegisterError::OutOfRange {
            kind,
            address,
            count,
            size: kind.size(),
        });
    }
    Ok(start..end)
}

/// The shared register map.
#[derive(Debug, Default)]
pub struct RegisterMap {
    coils: Mutex<Coils>,
    discrete: Mutex<DiscreteInputs>,
    input: Mutex<InputRegisters>,
    holding: Mutex<HoldingRegisters>,
}

/// Register map handle shared between tasks.
pub type SharedRegisterMap = Arc<RegisterMap>;

impl RegisterMap {
    /// Create a map holding the documented defaults.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedRegisterMap {
        Arc::new(Self::new())
    }

    pub fn coils(&self) -> MutexGuard<'_, Coils> {
        lock(&self.coils)
    }

    pub fn discrete_inputs(&self) -> MutexGuard<'_, DiscreteInputs> {
        lock(&self.discrete)
    }

    pub fn input_registers(&self) -> MutexGuard<'_, InputRegisters> {
        lock(&self.input)
    }

    pub fn holding_registers(&self) -> MutexGuard<'_, HoldingRegisters> {
        lock(&self.holding)
    }

    /// Read `count` bits starting at `address` from a bit table.
    pub fn read_bits(&self, kind: RegionKind, address: u16, count: u16) -> Result<Vec<bool>, RegisterError> {
        let range = check_range(kind, address, count as usize)?;
        let bits = match kind {
            RegionKind::Coil => self.coils().to_bits(),
            RegionKind::Discrete => self.discrete_inputs().to_bits(),
            _ => {
                return Err(RegisterError::WrongTable {
                    kind,
                    expected: "bit",
                })
            }
        };
        Ok(bits[range].to_vec())
    }

    /// Write consecutive bits starting at `address` into a bit table.
    pub fn write_bits(&self, kind: RegionKind, address: u16, values: &[bool]) -> Result<(), RegisterError> {
        let range = check_range(kind, address, values.len())?;
        match kind {
            RegionKind::Coil => patch_bits(&mut *self.coils(), range, values),
            RegionKind::Discrete => patch_bits(&mut *self.discrete_inputs(), range, values),
            _ => {
                return Err(RegisterError::WrongTable {
                    kind,
                    expected: "bit",
                })
            }
        }
        Ok(())
    }

    /// Read `count` words starting at `address` from a word table.
    pub fn read_words(&self, kind: RegionKind, address: u16, count: u16) -> Result<Vec<u16>, RegisterError> {
        let range = check_range(kind, address, count as usize)?;
        let words = match kind {
            RegionKind::Input => self.input_registers().to_words(),
            RegionKind::Holding => self.holding_registers().to_words(),
            _ => {
                return Err(RegisterError::WrongTable {
                    kind,
                    expected: "word",
                })
            }
        };
        Ok(words[range].to_vec())
    }

    /// Write consecutive words starting at `address` into a word table.
    pub fn write_words(&self, kind: RegionKind, address: u16, values: &[u16]) -> Result<(), RegisterError> {
        let range = check_range(kind, address, values.len())?;
        match kind {
            RegionKind::Input => patch_words(&mut *self.input_registers(), range, values),
            RegionKind::Holding => patch_words(&mut *self.holding_registers(), range, values),
            _ => {
                return Err(RegisterError::WrongTable {
                    kind,
                    expected: "word",
                })
            }
        }
        Ok(())
    }

    /// Write then read holding registers under a single lock (function code 0x17).
    pub fn write_read_holding(
        &self,
        write_address: u16,
        values: &[u16],
        read_address: u16,
        read_count: u16,
    ) -> Result<Vec<u16>, RegisterError> {
        let write = check_range(RegionKind::Holding, write_address, values.len())?;
        let read = check_range(RegionKind::Holding, read_address, read_count as usize)?;
        let mut holding = self.holding_registers();
        patch_words(&mut *holding, write, values);
        Ok(holding.to_words()[read].to_vec())
    }

    /// Apply `(current & and_mask) | (or_mask & !and_mask)` to one holding register
    /// (function code 0x16).
    pub fn mask_write_holding(&self, address: u16, and_mask: u16, or_mask: u16) -> Result<u16, RegisterError> {
        let slot = check_range(RegionKind::Holding, address, 1)?;
        let mut holding = self.holding_registers();
        let mut words = holding.to_words();
        let updated = (words[slot.start] & and_mask) | (or_mask & !and_mask);
        words[slot.start] = updated;
        holding.load_words(&words);
        Ok(updated)
    }
}

fn patch_bits<R: BitRegion>(region: &mut R, range: std::ops::Range<usize>, values: &[bool]) {
    let mut bits = region.to_bits();
    bits[range].copy_from_slice(values);
    region.load_bits(&bits);
}

fn patch_words<R: WordRegion>(region: &mut R, range: std::ops::Range<usize>, values: &[u16]) {
    let mut words = region.to_words();
    words[range].copy_from_slice(values);
    region.load_words(&words);
}
