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

//! UART byte port for the serial framing transport.

use std::{
    ffi::OsStr,
    io::{self, Read, Write},
    time::Duration,
};

use serial::SerialPort;

use crate::{
    error::{Error, Result},
    transport::{framing::FramingTransport, BytePort},
};

/// Poll interval of single-byte reads. The framing layer keeps polling
/// until its own scan deadline expires.
const POLL_TIMEOUT: Duration = Duration::from_millis(50);

impl From<serial::Error> for Error {
    fn from(error: serial::Error) -> Error {
        Error::Connection(error.to_string())
    }
}

/// A TTY carrying MBoot framing packets.
pub struct Uart {
    port: serial::SystemPort,
}

impl Uart {
    /// Open `port` with 8N1 framing, no flow control, at `baudrate`.
    pub fn open<T: AsRef<OsStr> + ?Sized>(
        port: &T,
        baudrate: usize,
    ) -> Result<Uart> {
        let mut port = serial::open(port)?;

        let mut settings = crate::port_settings();
        settings.baud_rate = serial::BaudRate::from_speed(baudrate);
        port.configure(&settings)?;
        port.set_timeout(POLL_TIMEOUT)?;

        log::debug!("opening UART interface at {} baud", baudrate);
        Ok(Uart { port })
    }

    /// Wrap the port into the framing transport the engine consumes.
    pub fn into_transport(self) -> FramingTransport<Uart> {
        FramingTransport::new(self, "UART")
    }
}

impl BytePort for Uart {
    fn poll_byte(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        match self.port.read(&mut byte) {
            Ok(0) => Err(Error::connection("unexpected EOF")),
            Ok(_) => Ok(Some(byte[0])),
            Err(e)
                if e.kind() == io::ErrorKind::TimedOut
                    || e.kind() == io::ErrorKind::WouldBlock =>
            {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.port.read_exact(buf)?;
        Ok(())
    }

    fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        self.port.write_all(buf)?;
        self.port.flush()?;
        Ok(())
    }
}
