// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the bess-modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus server implementation for the BESS simulator
//!
//! For avoiding confusion with the Modbus master/slave terminology, this module uses
//! the terms "server" and "client" instead. The server is the device that provides data,
//! while the client is the device that requests data.
//!
//! The Modbus master is the device that requests data, while the Modbus slave is the device
//! that provides data. In other words, the supervisory controller is here the client and the
//! simulated battery is here the server.
//!
//! All connections share a single data store, and requests are answered whatever
//! unit id they carry.

use std::{future, sync::Arc};

use bytes::Bytes;
use log::{debug, error};
use tokio_modbus::prelude::*;

use super::datastore::{self, SharedDataStore};
use super::device_identification::{self, DeviceIdentification};
use super::register_map::Bank;
use crate::config::IdentityConfig;

/// A Modbus TCP server exposing the simulated battery.
///
/// Cloning is cheap: clones share the same data store, which is how every
/// client connection gets its own service instance over common registers.
///
/// ### Supported function codes
///
/// | Code | Function |
/// |------|----------|
/// | 0x01 | Read Coils |
/// | 0x02 | Read Discrete Inputs |
/// | 0x03 | Read Holding Registers |
/// | 0x04 | Read Input Registers |
/// | 0x05 | Write Single Coil |
/// | 0x06 | Write Single Register |
/// | 0x0F | Write Multiple Coils |
/// | 0x10 | Write Multiple Registers |
/// | 0x11 | Report Server ID |
/// | 0x16 | Mask Write Register |
/// | 0x17 | Read/Write Multiple Registers |
/// | 0x2B | Read Device Identification (MEI 0x0E) |
#[derive(Clone)]
pub struct BessModbusServer {
    store: SharedDataStore,
    identification: Arc<DeviceIdentification>,
    server_id: u8,
}

impl tokio_modbus::server::Service for BessModbusServer {
    type Request = Request<'static>;
    type Response = Response;
    type Exception = ExceptionCode;
    type Future = future::Ready<Result<Self::Response, Self::Exception>>;

    /// Process a Modbus request and provide a response
    ///
    /// Any function code outside the table above returns an IllegalFunction exception.
    fn call(&self, req: Self::Request) -> Self::Future {
        debug!("Received Modbus request: {:?}", req);

        let res = self.handle(req);

        if let Err(e) = &res {
            error!("Modbus request error: {:?}", e);
        }

        future::ready(res)
    }
}

impl BessModbusServer {
    /// Create a server over `store`.
    ///
    /// ### Parameters
    ///
    /// * `store` - Data store shared with the simulator and the other connections
    /// * `identity` - Strings served by the device identification function
    /// * `server_id` - Id returned by Report Server ID
    pub fn new(store: SharedDataStore, identity: &IdentityConfig, server_id: u8) -> Self {
        Self {
            store,
            identification: Arc::new(DeviceIdentification::new(identity)),
            server_id,
        }
    }

    /// Data store backing this server.
    pub fn store(&self) -> &SharedDataStore {
        &self.store
    }

    fn handle(&self, req: Request<'static>) -> Result<Response, ExceptionCode> {
        match req {
            Request::ReadCoils(addr, cnt) => {
                debug!("Reading {} coils starting from address 0x{:04x}", cnt, addr);
                let store = datastore::lock(&self.store)?;
                Ok(Response::ReadCoils(store.read_bits(Bank::Coils, addr, cnt)?))
            }
            Request::ReadDiscreteInputs(addr, cnt) => {
                debug!(
                    "Reading {} discrete inputs starting from address 0x{:04x}",
                    cnt, addr
                );
                let store = datastore::lock(&self.store)?;
                Ok(Response::ReadDiscreteInputs(store.read_bits(
                    Bank::DiscreteInputs,
                    addr,
                    cnt,
                )?))
            }
            Request::ReadHoldingRegisters(addr, cnt) => {
                debug!(
                    "Reading {} holding registers starting from address 0x{:04x}",
                    cnt, addr
                );
                let store = datastore::lock(&self.store)?;
                Ok(Response::ReadHoldingRegisters(store.read_registers(
                    Bank::HoldingRegisters,
                    addr,
                    cnt,
                )?))
            }
            Request::ReadInputRegisters(addr, cnt) => {
                debug!(
                    "Reading {} input registers starting from address 0x{:04x}",
                    cnt, addr
                );
                let store = datastore::lock(&self.store)?;
                Ok(Response::ReadInputRegisters(store.read_registers(
                    Bank::InputRegisters,
                    addr,
                    cnt,
                )?))
            }
            Request::WriteSingleCoil(addr, value) => {
                debug!("Writing {} to coil 0x{:04x}", value, addr);
                let mut store = datastore::lock(&self.store)?;
                store.write_bits(Bank::Coils, addr, std::slice::from_ref(&value))?;
                Ok(Response::WriteSingleCoil(addr, value))
            }
            Request::WriteMultipleCoils(addr, values) => {
                debug!(
                    "Writing {} values to coils starting from address 0x{:04x}",
                    values.len(),
                    addr
                );
                let mut store = datastore::lock(&self.store)?;
                store.write_bits(Bank::Coils, addr, &values)?;
                Ok(Response::WriteMultipleCoils(addr, values.len() as u16))
            }
            Request::WriteSingleRegister(addr, value) => {
                debug!("Writing value {} to holding register 0x{:04x}", value, addr);
                let mut store = datastore::lock(&self.store)?;
                store.write_registers(
                    Bank::HoldingRegisters,
                    addr,
                    std::slice::from_ref(&value),
                )?;
                Ok(Response::WriteSingleRegister(addr, value))
            }
            Request::WriteMultipleRegisters(addr, values) => {
                debug!(
                    "Writing {} values to holding registers starting from address 0x{:04x}",
                    values.len(),
                    addr
                );
                let mut store = datastore::lock(&self.store)?;
                store.write_registers(Bank::HoldingRegisters, addr, &values)?;
                Ok(Response::WriteMultipleRegisters(addr, values.len() as u16))
            }
            Request::MaskWriteRegister(addr, and_mask, or_mask) => {
                debug!(
                    "Mask write on holding register 0x{:04x}: and=0x{:04x} or=0x{:04x}",
                    addr, and_mask, or_mask
                );
                let mut store = datastore::lock(&self.store)?;
                store.mask_write_register(addr, and_mask, or_mask)?;
                Ok(Response::MaskWriteRegister(addr, and_mask, or_mask))
            }
            Request::ReadWriteMultipleRegisters(read_addr, read_cnt, write_addr, values) => {
                debug!(
                    "Read/write: {} values at 0x{:04x}, then {} registers from 0x{:04x}",
                    values.len(),
                    write_addr,
                    read_cnt,
                    read_addr
                );
                if values.is_empty() || values.len() > datastore::MAX_READ_WRITE_REGISTERS as usize
                {
                    return Err(ExceptionCode::IllegalDataValue);
                }
                let mut store = datastore::lock(&self.store)?;
                // Validate the read range before writing so a rejected request changes nothing
                store.read_registers(Bank::HoldingRegisters, read_addr, read_cnt)?;
                store.write_registers(Bank::HoldingRegisters, write_addr, &values)?;
                Ok(Response::ReadWriteMultipleRegisters(store.read_registers(
                    Bank::HoldingRegisters,
                    read_addr,
                    read_cnt,
                )?))
            }
            Request::ReportServerId => {
                debug!("Reporting server id {}", self.server_id);
                Ok(Response::ReportServerId(
                    self.server_id,
                    true,
                    self.identification.product_code().as_bytes().to_vec(),
                ))
            }
            Request::Custom(device_identification::FUNCTION_CODE, data) => {
                debug!("Read device identification: {:02x?}", data);
                let response = self.identification.respond(&data)?;
                Ok(Response::Custom(
                    device_identification::FUNCTION_CODE,
                    Bytes::from(response),
                ))
            }
            _ => {
                error!(
                    "Exception::IllegalFunction - Unimplemented function code in request: {req:?}"
                );
                Err(ExceptionCode::IllegalFunction)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modbus::datastore::DataStore;
    use crate::modbus::register_map::*;
    use std::borrow::Cow;
    use tokio_modbus::server::Service;

    fn server() -> BessModbusServer {
        BessModbusServer::new(
            DataStore::new(5000).into_shared(),
            &IdentityConfig::default(),
            1,
        )
    }

    #[tokio::test]
    async fn test_read_soc() {
        let server = server();
        let response = server
            .call(Request::ReadInputRegisters(IR_SOC, 2))
            .await
            .unwrap();
        assert_eq!(response, Response::ReadInputRegisters(vec![0, 5000]));
    }

    #[tokio::test]
    async fn test_clients_cannot_write_input_registers() {
        // Function 0x06 always targets the holding bank, where 0x2502 is not mapped
        let server = server();
        let result = server.call(Request::WriteSingleRegister(IR_STATE, 1)).await;
        assert_eq!(result, Err(ExceptionCode::IllegalDataAddress));
    }

    #[tokio::test]
    async fn test_mask_write_register() {
        let server = server();
        server
            .call(Request::WriteSingleRegister(HR_COMMAND, 0x0012))
            .await
            .unwrap();
        let response = server
            .call(Request::MaskWriteRegister(HR_COMMAND, 0x00F2, 0x0025))
            .await
            .unwrap();
        assert_eq!(response, Response::MaskWriteRegister(HR_COMMAND, 0x00F2, 0x0025));
        let data = server
            .call(Request::ReadHoldingRegisters(HR_COMMAND, 1))
            .await
            .unwrap();
        assert_eq!(data, Response::ReadHoldingRegisters(vec![0x0017]));
    }

    #[tokio::test]
    async fn test_read_write_multiple_writes_first() {
        let server = server();
        let response = server
            .call(Request::ReadWriteMultipleRegisters(
                HR_P_SETPOINT,
                4,
                HR_Q_SETPOINT,
                Cow::Owned(vec![0x0000, 0x0064]),
            ))
            .await
            .unwrap();
        assert_eq!(
            response,
            Response::ReadWriteMultipleRegisters(vec![0, 0, 0, 0x0064])
        );
    }

    #[tokio::test]
    async fn test_read_write_multiple_rejected_read_writes_nothing() {
        let server = server();
        let result = server
            .call(Request::ReadWriteMultipleRegisters(
                0x0000,
                1,
                HR_P_SETPOINT,
                Cow::Owned(vec![1, 2]),
            ))
            .await;
        assert_eq!(result, Err(ExceptionCode::IllegalDataAddress));
        let data = server
            .call(Request::ReadHoldingRegisters(HR_P_SETPOINT, 2))
            .await
            .unwrap();
        assert_eq!(data, Response::ReadHoldingRegisters(vec![0, 0]));
    }

    #[tokio::test]
    async fn test_read_write_multiple_write_quantity_limit() {
        let server = server();
        let result = server
            .call(Request::ReadWriteMultipleRegisters(
                HR_WATCHDOG,
                2,
                HR_WATCHDOG,
                Cow::Owned(vec![0; 122]),
            ))
            .await;
        assert_eq!(result, Err(ExceptionCode::IllegalDataValue));
    }

    #[tokio::test]
    async fn test_report_server_id() {
        let server = server();
        let response = server.call(Request::ReportServerId).await.unwrap();
        assert_eq!(
            response,
            Response::ReportServerId(1, true, b"BESS-SIM".to_vec())
        );
    }

    #[tokio::test]
    async fn test_device_identification() {
        let server = server();
        let response = server
            .call(Request::Custom(0x2B, Cow::Owned(vec![0x0E, 0x04, 0x01])))
            .await
            .unwrap();
        let expected: Vec<u8> = [0x0E, 0x04, 0x82, 0x00, 0x00, 0x01, 0x01, 0x08]
            .into_iter()
            .chain(b"BESS-SIM".iter().copied())
            .collect();
        assert_eq!(response, Response::Custom(0x2B, Bytes::from(expected)));
    }

    #[tokio::test]
    async fn test_unknown_custom_function() {
        let server = server();
        let result = server.call(Request::Custom(0x41, Cow::Owned(vec![]))).await;
        assert_eq!(result, Err(ExceptionCode::IllegalFunction));
    }

    #[tokio::test]
    async fn test_coils() {
        let server = server();
        server
            .call(Request::WriteMultipleCoils(
                HR_WATCHDOG,
                Cow::Owned(vec![true, false]),
            ))
            .await
            .unwrap();
        let response = server.call(Request::ReadCoils(HR_WATCHDOG, 2)).await.unwrap();
        assert_eq!(response, Response::ReadCoils(vec![true, false]));
        let result = server.call(Request::WriteSingleCoil(0x0010, true)).await;
        assert_eq!(result, Err(ExceptionCode::IllegalDataAddress));
    }

    #[tokio::test]
    async fn test_poisoned_store_reports_device_failure() {
        let server = server();
        let store = server.store().clone();
        let _ = std::thread::spawn(move || {
            let _guard = store.lock().unwrap();
            panic!("poison the lock");
        })
        .join();
        let result = server.call(Request::ReadInputRegisters(IR_SOC, 2)).await;
        assert_eq!(result, Err(ExceptionCode::ServerDeviceFailure));
    }
}
