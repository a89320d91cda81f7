// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus service answering client requests from the shared register map
//!
//! For avoiding confusion with the Modbus master/slave terminology, this module uses
//! the terms "server" and "client" instead. The server is the device that provides data,
//! while the client is the device that requests data.
//!
//! One [`GatewayModbusService`] is cloned into every accepted session of a
//! server instance. All clones share the registered regions, the event
//! accumulator polled by the controller, and an open/closed gate. Stopping the
//! instance closes its sessions at the transport. A request that races the
//! close sees the shut gate and gets `ServerDeviceFailure`.
//!
//! ## Supported function codes
//!
//! | Code | Request | Table |
//! |------|---------|-------|
//! | 0x01 | Read Coils | coils |
//! | 0x02 | Read Discrete Inputs | discrete inputs |
//! | 0x03 | Read Holding Registers | holding |
//! | 0x04 | Read Input Registers | input |
//! | 0x05 | Write Single Coil | coils |
//! | 0x06 | Write Single Register | holding |
//! | 0x0F | Write Multiple Coils | coils |
//! | 0x10 | Write Multiple Registers | holding |
//! | 0x16 | Mask Write Register | holding |
//! | 0x17 | Read/Write Multiple Registers | holding |
//!
//! Any other function code is answered with `IllegalFunction`.

use std::{
    future,
    sync::{
        atomic::{AtomicBool, AtomicU32, Ordering},
        Arc,
    },
};

use log::{debug, error};
use tokio_modbus::prelude::*;

use super::backend::{AccessMode, ProtocolEvent, ProtocolEvents, RegionDescriptor};
use crate::registers::{RegionKind, RegisterError};

/// Events recorded by every session of one server instance.
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    bits: Arc<AtomicU32>,
}

impl EventRecorder {
    pub fn record(&self, event: ProtocolEvent) {
        self.bits
            .fetch_or(ProtocolEvents::only(event).as_u32(), Ordering::AcqRel);
    }

    /// Remove and return the recorded events selected by `mask`.
    pub fn take(&self, mask: ProtocolEvents) -> ProtocolEvents {
        let previous = self.bits.fetch_and(!mask.as_u32(), Ordering::AcqRel);
        ProtocolEvents::from_u32_truncated(previous) & mask
    }
}

/// The Modbus service of one gateway server instance.
#[derive(Debug, Clone)]
pub struct GatewayModbusService {
    regions: Arc<[RegionDescriptor]>,
    events: EventRecorder,
    open: Arc<AtomicBool>,
}

impl tokio_modbus::server::Service for GatewayModbusService {
    type Request = Request<'static>;
    type Response = Response;
    type Exception = ExceptionCode;
    type Future = future::Ready<Result<Self::Response, Self::Exception>>;

    /// Process a Modbus request against the registered regions.
    fn call(&self, req: Self::Request) -> Self::Future {
        debug!("Received Modbus request: {:?}", req);

        if !self.open.load(Ordering::Acquire) {
            debug!("Server instance stopped, refusing request");
            return future::ready(Err(ExceptionCode::ServerDeviceFailure));
        }

        let res = match req {
            Request::ReadCoils(addr, cnt) => self
                .read_bits(RegionKind::Coil, addr, cnt)
                .map(Response::ReadCoils),
            Request::ReadDiscreteInputs(addr, cnt) => self
                .read_bits(RegionKind::Discrete, addr, cnt)
                .map(Response::ReadDiscreteInputs),
            Request::WriteSingleCoil(addr, value) => self
                .write_bits(RegionKind::Coil, addr, std::slice::from_ref(&value))
                .map(|_| Response::WriteSingleCoil(addr, value)),
            Request::WriteMultipleCoils(addr, values) => self
                .write_bits(RegionKind::Coil, addr, &values)
                .map(|_| Response::WriteMultipleCoils(addr, values.len() as u16)),
            Request::ReadInputRegisters(addr, cnt) => self
                .read_words(RegionKind::Input, addr, cnt)
                .map(Response::ReadInputRegisters),
            Request::ReadHoldingRegisters(addr, cnt) => self
                .read_words(RegionKind::Holding, addr, cnt)
                .map(Response::ReadHoldingRegisters),
            Request::WriteSingleRegister(addr, value) => self
                .write_words(RegionKind::Holding, addr, std::slice::from_ref(&value))
                .map(|_| Response::WriteSingleRegister(addr, value)),
            Request::WriteMultipleRegisters(addr, values) => self
                .write_words(RegionKind::Holding, addr, &values)
                .map(|_| Response::WriteMultipleRegisters(addr, values.len() as u16)),
            Request::MaskWriteRegister(addr, and_mask, or_mask) => self
                .mask_write(addr, and_mask, or_mask)
                .map(|_| Response::MaskWriteRegister(addr, and_mask, or_mask)),
            Request::ReadWriteMultipleRegisters(read_addr, cnt, write_addr, values) => self
                .read_write_words(read_addr, cnt, write_addr, &values)
                .map(Response::ReadWriteMultipleRegisters),
            _ => {
                error!(
                    "Exception::IllegalFunction - Unimplemented function code in request: {req:?}"
                );
                Err(ExceptionCode::IllegalFunction)
            }
        };

        if let Err(e) = &res {
            error!("Modbus request error: {:?}", e);
        }

        future::ready(res)
    }
}

impl GatewayModbusService {
    pub fn new(regions: Arc<[RegionDescriptor]>, events: EventRecorder, open: Arc<AtomicBool>) -> Self {
        Self {
            regions,
            events,
            open,
        }
    }

    /// Resolve a wire address into a table offset for `kind`.
    fn region(&self, kind: RegionKind, addr: u16, write: bool) -> Result<(&RegionDescriptor, u16), ExceptionCode> {
        let region = self
            .regions
            .iter()
            .find(|r| r.kind == kind)
            .ok_or(ExceptionCode::IllegalDataAddress)?;
        if write && region.access == AccessMode::ReadOnly {
            return Err(ExceptionCode::IllegalFunction);
        }
        let offset = addr
            .checked_sub(region.start_offset)
            .ok_or(ExceptionCode::IllegalDataAddress)?;
        Ok((region, offset))
    }

    fn read_bits(&self, kind: RegionKind, addr: u16, cnt: u16) -> Result<Vec<bool>, ExceptionCode> {
        let (region, offset) = self.region(kind, addr, false)?;
        let bits = region
            .map
            .read_bits(kind, offset, cnt)
            .map_err(exception_for)?;
        self.events.record(match kind {
            RegionKind::Coil => ProtocolEvent::CoilRead,
            _ => ProtocolEvent::DiscreteRead,
        });
        Ok(bits)
    }

    fn write_bits(&self, kind: RegionKind, addr: u16, values: &[bool]) -> Result<(), ExceptionCode> {
        let (region, offset) = self.region(kind, addr, true)?;
        region
            .map
            .write_bits(kind, offset, values)
            .map_err(exception_for)?;
        self.events.record(ProtocolEvent::CoilWrite);
        Ok(())
    }

    fn read_words(&self, kind: RegionKind, addr: u16, cnt: u16) -> Result<Vec<u16>, ExceptionCode> {
        let (region, offset) = self.region(kind, addr, false)?;
        let words = region
            .map
            .read_words(kind, offset, cnt)
            .map_err(exception_for)?;
        self.events.record(match kind {
            RegionKind::Holding => ProtocolEvent::HoldingRead,
            _ => ProtocolEvent::InputRead,
        });
        Ok(words)
    }

    fn write_words(&self, kind: RegionKind, addr: u16, values: &[u16]) -> Result<(), ExceptionCode> {
        let (region, offset) = self.region(kind, addr, true)?;
        region
            .map
            .write_words(kind, offset, values)
            .map_err(exception_for)?;
        self.events.record(ProtocolEvent::HoldingWrite);
        Ok(())
    }

    fn mask_write(&self, addr: u16, and_mask: u16, or_mask: u16) -> Result<(), ExceptionCode> {
        let (region, offset) = self.region(RegionKind::Holding, addr, true)?;
        region
            .map
            .mask_write_holding(offset, and_mask, or_mask)
            .map_err(exception_for)?;
        self.events.record(ProtocolEvent::HoldingWrite);
        Ok(())
    }

    fn read_write_words(
        &self,
        read_addr: u16,
        cnt: u16,
        write_addr: u16,
        values: &[u16],
    ) -> Result<Vec<u16>, ExceptionCode> {
        let (region, write_offset) = self.region(RegionKind::Holding, write_addr, true)?;
        let read_offset = read_addr
            .checked_sub(region.start_offset)
            .ok_or(ExceptionCode::IllegalDataAddress)?;
        let words = region
            .map
            .write_read_holding(write_offset, values, read_offset, cnt)
            .map_err(exception_for)?;
        self.events.record(ProtocolEvent::HoldingWrite);
        self.events.record(ProtocolEvent::HoldingRead);
        Ok(words)
    }
}

/// Map a register access failure to the Modbus exception a client sees.
pub fn exception_for(err: RegisterError) -> ExceptionCode {
    match err {
        RegisterError::OutOfRange { .. } => ExceptionCode::IllegalDataAddress,
        RegisterError::InvalidQuantity { .. }
        | RegisterError::InvalidValue { .. }
        | RegisterError::TextTooLong { .. } => ExceptionCode::IllegalDataValue,
        RegisterError::WrongTable { .. } => ExceptionCode::IllegalFunction,
    }
}
