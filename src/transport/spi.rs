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

//! SPI byte port for the serial framing transport.
//!
//! Generic over any `embedded-hal` SPI bus, so an FTDI MPSSE HAL (or any
//! other host-side SPI master) can be plugged in. The MBoot target is an
//! SPI slave: reads clock the bus and yield filler bytes until the target
//! queues a frame, which the framing layer's start-byte scan skips.

use embedded_hal::spi::SpiBus;

use crate::{
    error::{Error, Result},
    transport::{framing::FramingTransport, BytePort},
};

/// An SPI master bus carrying MBoot framing packets.
pub struct Spi<B> {
    bus: B,
}

impl<B> Spi<B>
where
    B: SpiBus<u8>,
{
    pub fn new(bus: B) -> Spi<B> {
        log::debug!("opening SPI interface");
        Spi { bus }
    }

    /// Wrap the bus into the framing transport the engine consumes.
    pub fn into_transport(self) -> FramingTransport<Spi<B>> {
        FramingTransport::new(self, "SPI")
    }

    fn bus_error<E: core::fmt::Debug>(error: E) -> Error {
        Error::Connection(format!("SPI bus error: {:?}", error))
    }
}

impl<B> BytePort for Spi<B>
where
    B: SpiBus<u8>,
{
    fn poll_byte(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        self.bus.read(&mut byte).map_err(Self::bus_error)?;
        Ok(Some(byte[0]))
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.bus.read(buf).map_err(Self::bus_error)
    }

    fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        self.bus.write(buf).map_err(Self::bus_error)?;
        self.bus.flush().map_err(Self::bus_error)
    }
}
