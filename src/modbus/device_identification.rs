// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the bess-modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Read Device Identification (function 0x2B, MEI type 0x0E)
//!
//! Request data (after the function code):
//!
//! | Byte | Content |
//! |------|---------|
//! | 0 | MEI type, always 0x0E |
//! | 1 | Read device id code (1 basic, 2 regular, 4 individual) |
//! | 2 | Object id |
//!
//! Response data: MEI type, read code, conformity level, more follows,
//! next object id, number of objects, then `id, length, value` per object.

use log::debug;
use tokio_modbus::prelude::ExceptionCode;

use crate::config::IdentityConfig;

/// Function code carrying encapsulated interface transports.
pub const FUNCTION_CODE: u8 = 0x2B;
/// MEI type of the device identification transport.
pub const MEI_READ_DEVICE_ID: u8 = 0x0E;
/// Regular identification, stream and individual access.
pub const CONFORMITY_LEVEL: u8 = 0x82;

/// Room left for objects in a 253 byte PDU once the function code and the
/// six header bytes are accounted for.
const MAX_OBJECTS_LEN: usize = 253 - 1 - 6;

/// Longest object value in bytes, so that any single object fits a response.
pub const MAX_OBJECT_LEN: usize = MAX_OBJECTS_LEN - 2;

/// Read device id codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadCode {
    Basic,
    Regular,
    Individual,
}

impl ReadCode {
    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::Basic),
            0x02 => Some(Self::Regular),
            0x04 => Some(Self::Individual),
            _ => None,
        }
    }

    fn as_byte(&self) -> u8 {
        match self {
            Self::Basic => 0x01,
            Self::Regular => 0x02,
            Self::Individual => 0x04,
        }
    }

    /// Highest object id of the category.
    fn last_object(&self) -> u8 {
        match self {
            Self::Basic => 0x02,
            Self::Regular | Self::Individual => 0x06,
        }
    }
}

/// Identification objects indexed by their object id.
pub struct DeviceIdentification {
    objects: Vec<String>,
}

impl DeviceIdentification {
    pub fn new(identity: &IdentityConfig) -> Self {
        Self {
            objects: vec![
                identity.vendor_name.clone(),
                identity.product_code.clone(),
                identity.major_minor_revision.clone(),
                identity.vendor_url.clone(),
                identity.product_name.clone(),
                identity.model_name.clone(),
                identity.user_application_name.clone(),
            ],
        }
    }

    pub fn product_code(&self) -> &str {
        &self.objects[1]
    }

    /// Value of an object, cut at a char boundary to `MAX_OBJECT_LEN` bytes.
    fn object(&self, id: u8) -> Option<&[u8]> {
        self.objects.get(id as usize).map(|s| {
            let mut end = s.len().min(MAX_OBJECT_LEN);
            while !s.is_char_boundary(end) {
                end -= 1;
            }
            &s.as_bytes()[..end]
        })
    }

    /// Answer a Read Device Identification request.
    ///
    /// `data` is the request PDU without the function code. The returned bytes
    /// are the response PDU without the function code.
    pub fn respond(&self, data: &[u8]) -> Result<Vec<u8>, ExceptionCode> {
        let [mei_type, read_code, object_id] = data else {
            debug!("Malformed device identification request: {:02x?}", data);
            return Err(ExceptionCode::IllegalDataValue);
        };
        if *mei_type != MEI_READ_DEVICE_ID {
            debug!("Unsupported MEI type 0x{:02x}", mei_type);
            return Err(ExceptionCode::IllegalDataValue);
        }
        let read_code = ReadCode::from_byte(*read_code).ok_or(ExceptionCode::IllegalDataValue)?;

        let mut objects = Vec::new();
        let mut more_follows = 0x00;
        let mut next_object_id = 0x00;
        let mut count = 0u8;

        match read_code {
            ReadCode::Individual => {
                let value = self
                    .object(*object_id)
                    .ok_or(ExceptionCode::IllegalDataAddress)?;
                push_object(&mut objects, *object_id, value);
                count = 1;
            }
            ReadCode::Basic | ReadCode::Regular => {
                // Stream access restarts at the first object when the start is out of range
                let first = if *object_id > read_code.last_object() {
                    0x00
                } else {
                    *object_id
                };
                for id in first..=read_code.last_object() {
                    let Some(value) = self.object(id) else {
                        break;
                    };
                    if objects.len() + 2 + value.len() > MAX_OBJECTS_LEN {
                        more_follows = 0xFF;
                        next_object_id = id;
                        break;
                    }
                    push_object(&mut objects, id, value);
                    count += 1;
                }
            }
        }

        let mut response = Vec::with_capacity(6 + objects.len());
        response.extend_from_slice(&[
            MEI_READ_DEVICE_ID,
            read_code.as_byte(),
            CONFORMITY_LEVEL,
            more_follows,
            next_object_id,
            count,
        ]);
        response.extend_from_slice(&objects);
        Ok(response)
    }
}

fn push_object(buf: &mut Vec<u8>, id: u8, value: &[u8]) {
    buf.push(id);
    buf.push(value.len() as u8);
    buf.extend_from_slice(value);
}
