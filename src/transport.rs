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

//! # Transport abstraction
//!
//! The engine drives every physical backend through the narrow
//! [`Transport`] trait. The serial backends (UART, SPI-via-FTDI,
//! I2C-via-FTDI) share one framing state machine
//! ([`framing::FramingTransport`]) and differ only in how they obtain
//! their byte stream, expressed by the [`BytePort`] trait. USB-HID speaks
//! reports directly and needs neither framing nor CRC.

use std::time::Duration;

use crate::error::Result;

pub mod framing;
pub mod i2c;
pub mod spi;
pub mod uart;
pub mod usb;

pub use self::framing::FramingTransport;
pub use self::i2c::I2c;
pub use self::spi::Spi;
pub use self::uart::Uart;
pub use self::usb::UsbHid;

/// Timeout of the per-byte start scans on serial transports.
pub const SCAN_TIMEOUT: Duration = Duration::from_secs(1);

/// Progress callback, invoked at data-phase chunk boundaries with
/// `(bytes_transferred, total_bytes)`. Must not block.
pub type Progress = Box<dyn FnMut(usize, usize) + Send>;

/// Engine-facing operations every physical backend implements.
pub trait Transport {
    /// Re-establish the protocol handshake. Serial transports send a ping
    /// and parse the ping response; USB-HID needs none and succeeds
    /// immediately.
    fn ping(&mut self) -> Result<()>;

    /// Send one command payload, block for its response and return the
    /// primary response value.
    ///
    /// `timeout` bounds the wait for the acknowledge/response of this
    /// command only. The response status must equal `status_success`,
    /// otherwise the call fails with the carried status.
    fn write_cmd(
        &mut self,
        payload: &[u8],
        timeout: Duration,
        status_success: u32,
    ) -> Result<u32>;

    /// Run the inbound data phase: collect exactly `length` bytes, then
    /// consume the trailing command response.
    fn read_data(&mut self, length: usize) -> Result<Vec<u8>>;

    /// Run the outbound data phase in chunks of `max_packet_size`, then
    /// consume the trailing command response. Returns the number of bytes
    /// handed to the device.
    fn write_data(&mut self, data: &[u8], max_packet_size: u32) -> Result<usize>;

    /// Raw payload of the most recent command response, for the decoders
    /// of structured properties.
    fn last_cmd_response(&self) -> &[u8];

    /// Install or remove the data-phase progress callback.
    fn set_progress(&mut self, progress: Option<Progress>);

    /// Release the underlying device.
    fn close(&mut self);
}

/// A byte stream a serial framing transport can run on.
///
/// UART implements this over a TTY, SPI and I2C over an FTDI MPSSE bus.
/// Bus-clocked backends return filler bytes when the target has nothing
/// queued; the framing layer scans past them.
pub trait BytePort {
    /// Try to read one byte. `Ok(None)` means nothing arrived before the
    /// port's own poll interval elapsed.
    fn poll_byte(&mut self) -> Result<Option<u8>>;

    /// Read exactly `buf.len()` bytes.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Write all of `buf`.
    fn write_all(&mut self, buf: &[u8]) -> Result<()>;
}
