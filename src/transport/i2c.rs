// Copyright 2021 Locha Mesh Developers <contact@locha.io>
//
// Based on the previous work of pyMBoot and the NXP Kinetis Bootloader
// reference manual (MCUBOOTRM).
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! I2C byte port for the serial framing transport.
//!
//! Generic over any `embedded-hal` I2C bus. The MBoot target is an I2C
//! slave, listening on address 0x10 by default; reads of an idle slave
//! yield filler bytes, which the framing layer's start-byte scan skips.

use embedded_hal::i2c::I2c as I2cBus;

use crate::{
    error::{Error, Result},
    transport::{framing::FramingTransport, BytePort},
};

/// Default MBoot I2C slave address.
pub const DEFAULT_SLAVE_ADDRESS: u8 = 0x10;

/// An I2C master bus carrying MBoot framing packets.
pub struct I2c<B> {
    bus: B,
    address: u8,
}

impl<B> I2c<B>
where
    B: I2cBus,
{
    /// Bind to the default slave address.
    pub fn new(bus: B) -> I2c<B> {
        I2c::with_address(bus, DEFAULT_SLAVE_ADDRESS)
    }

    pub fn with_address(bus: B, address: u8) -> I2c<B> {
        log::debug!("opening I2C interface, slave address {:#04x}", address);
        I2c { bus, address }
    }

    /// Wrap the bus into the framing transport the engine consumes.
    pub fn into_transport(self) -> FramingTransport<I2c<B>> {
        FramingTransport::new(self, "I2C")
    }

    fn bus_error<E: core::fmt::Debug>(error: E) -> Error {
        Error::Connection(format!("I2C bus error: {:?}", error))
    }
}

impl<B> BytePort for I2c<B>
where
    B: I2cBus,
{
    fn poll_byte(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        self.bus
            .read(self.address, &mut byte)
            .map_err(Self::bus_error)?;
        Ok(Some(byte[0]))
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.bus.read(self.address, buf).map_err(Self::bus_error)
    }

    fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        self.bus.write(self.address, buf).map_err(Self::bus_error)
    }
}
