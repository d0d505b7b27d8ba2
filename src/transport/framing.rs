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

//! # Serial framing state machine
//!
//! One transaction over any serial byte stream:
//!
//! ```text
//! IDLE -> (write PING) -> AWAIT_PINGR -> READY
//! READY -> (write CMD framing packet) -> AWAIT_ACK
//! AWAIT_ACK -> ACK -> AWAIT_RESPONSE | ABORT/NACK -> FAIL
//! AWAIT_RESPONSE -> (read framing packet, send ACK) -> DONE | data phase
//! ```
//!
//! The ping handshake is re-sent before every command. The inbound data
//! phase treats a CMD-typed packet as a device-initiated abort carrying a
//! status; the outbound phase stops on an ABORT acknowledge and surfaces
//! the status of the trailing command response.

use std::time::{Duration, Instant};

use crate::{
    constants::StatusCode,
    error::{DataMode, Error, Result},
    packet::{
        self, FpType, PingResponse, FRAME_HEADER_LEN, FRAME_START_BYTE,
    },
    transport::{BytePort, Progress, Transport, SCAN_TIMEOUT},
};

/// Framing transport shared by the UART, SPI and I2C backends.
pub struct FramingTransport<P> {
    port: P,
    interface: &'static str,
    scan_timeout: Duration,
    ping_response: Option<PingResponse>,
    last_cmd_response: Vec<u8>,
    progress: Option<Progress>,
}

impl<P> FramingTransport<P>
where
    P: BytePort,
{
    pub fn new(port: P, interface: &'static str) -> Self {
        FramingTransport {
            port,
            interface,
            scan_timeout: SCAN_TIMEOUT,
            ping_response: None,
            last_cmd_response: Vec::new(),
            progress: None,
        }
    }

    /// Protocol information from the most recent ping handshake.
    pub fn ping_response(&self) -> Option<&PingResponse> {
        self.ping_response.as_ref()
    }

    /// Scan single-byte reads for the frame start byte.
    fn find_start_byte(&mut self, timeout: Duration) -> Result<()> {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if let Some(byte) = self.port.poll_byte()? {
                if byte == FRAME_START_BYTE {
                    return Ok(());
                }
                log::trace!(
                    "{}: skipping dummy byte {:#04x}",
                    self.interface,
                    byte
                );
            }
        }
        log::debug!("{}: start byte not found, timed out", self.interface);
        Err(Error::Timeout(timeout))
    }

    fn send_ack(&mut self) -> Result<()> {
        log::trace!("{}-OUT-ACK", self.interface);
        self.port.write_all(&[FRAME_START_BYTE, FpType::Ack as u8])
    }

    /// Wait for the two-byte acknowledge after a write.
    fn receive_ack(&mut self, timeout: Duration, mode: DataMode) -> Result<()> {
        self.find_start_byte(timeout)?;
        let mut ack = [0u8; 1];
        self.port.read_exact(&mut ack)?;
        log::trace!("{}-IN-ACK: {:#04x}", self.interface, ack[0]);
        match FpType::from_u8(ack[0]) {
            Some(FpType::Ack) => Ok(()),
            Some(FpType::Abort) => {
                Err(Error::data(mode, StatusCode::AbortDataPhase as u32))
            }
            // The device NACKs a packet whose CRC it rejected.
            Some(FpType::Nack) => {
                Err(Error::data(mode, StatusCode::InvalidCrc as u32))
            }
            _ => Err(Error::data(mode, StatusCode::InvalidPacketType as u32)),
        }
    }

    /// Read one full framing packet and acknowledge it.
    ///
    /// A CMD packet is let through even when `expected` is DATA; the data
    /// phase uses it to detect a device-initiated abort.
    fn read_packet(&mut self, expected: FpType) -> Result<(FpType, Vec<u8>)> {
        self.find_start_byte(self.scan_timeout)?;
        let mut head = [0u8; FRAME_HEADER_LEN];
        head[0] = FRAME_START_BYTE;
        self.port.read_exact(&mut head[1..])?;
        let header = packet::parse_header(&head)?;

        let mut payload = vec![0u8; usize::from(header.length)];
        self.port.read_exact(&mut payload)?;
        self.send_ack()?;

        if !packet::check_crc(&head, &payload) {
            return Err(Error::data(
                DataMode::Read,
                StatusCode::InvalidCrc as u32,
            ));
        }
        let packet_type = FpType::from_u8(header.packet_type).ok_or_else(|| {
            Error::data(DataMode::Read, StatusCode::InvalidPacketType as u32)
        })?;
        if packet_type != expected && packet_type != FpType::Cmd {
            return Err(Error::data(
                DataMode::Read,
                StatusCode::InvalidPacketType as u32,
            ));
        }
        log::debug!(
            "{}-IN-{:?} [{:02}]: {:02X?}",
            self.interface,
            packet_type,
            payload.len(),
            payload
        );
        Ok((packet_type, payload))
    }

    fn report_progress(&mut self, transferred: usize, total: usize) {
        if let Some(callback) = self.progress.as_mut() {
            callback(transferred, total);
        }
    }
}

impl<P> Transport for FramingTransport<P>
where
    P: BytePort,
{
    fn ping(&mut self) -> Result<()> {
        let ping = [FRAME_START_BYTE, FpType::Ping as u8];
        log::debug!("{}-OUT-PING: {:02X?}", self.interface, ping);
        self.port.write_all(&ping)?;

        // MBoot v3.0+ may front-run the response with dummy bytes after a
        // power cycle.
        self.find_start_byte(self.scan_timeout)?;
        let mut raw = [0u8; PingResponse::LEN];
        raw[0] = FRAME_START_BYTE;
        self.port.read_exact(&mut raw[1..])?;
        log::debug!("{}-IN-PINGR: {:02X?}", self.interface, raw);

        let response = PingResponse::parse(&raw)?;
        log::trace!("{}: protocol {:?}", self.interface, response.version);
        self.ping_response = Some(response);
        Ok(())
    }

    fn write_cmd(
        &mut self,
        payload: &[u8],
        timeout: Duration,
        status_success: u32,
    ) -> Result<u32> {
        self.ping()?;

        let data = packet::encode(FpType::Cmd, payload);
        log::debug!("TX-CMD [{:02}]: {:02X?}", data.len(), data);
        self.port.write_all(&data)?;
        self.receive_ack(timeout, DataMode::Write)?;

        let (_, response) = self.read_packet(FpType::Cmd)?;
        log::debug!("RX-CMD [{:02}]: {:02X?}", response.len(), response);
        let (status, value) = packet::parse_response(&response)?;
        self.last_cmd_response = response;
        log::debug!("status: {:#x}, value: {:#x}", status, value);

        if status != status_success {
            return Err(Error::command(status));
        }
        Ok(value)
    }

    fn read_data(&mut self, length: usize) -> Result<Vec<u8>> {
        let mut data = Vec::with_capacity(length);
        while data.len() < length {
            let (packet_type, payload) = self.read_packet(FpType::Data)?;
            if packet_type == FpType::Cmd {
                // Device-initiated abort carrying a status code.
                let (status, value) = packet::parse_response(&payload)?;
                log::debug!("status: {:#x}, value: {:#x}", status, value);
                self.last_cmd_response = payload;
                return Err(Error::data(DataMode::Read, status));
            }
            data.extend_from_slice(&payload);
            let transferred = data.len().min(length);
            self.report_progress(transferred, length);
        }

        let (_, response) = self.read_packet(FpType::Cmd)?;
        let (status, value) = packet::parse_response(&response)?;
        self.last_cmd_response = response;
        log::debug!("status: {:#x}, value: {:#x}", status, value);
        if status != StatusCode::Success as u32 {
            return Err(Error::data(DataMode::Read, status));
        }

        data.truncate(length);
        log::info!("RX-DATA: successfully received {} bytes", data.len());
        Ok(data)
    }

    fn write_data(&mut self, data: &[u8], max_packet_size: u32) -> Result<usize> {
        if max_packet_size == 0 {
            return Err(Error::generic("max packet size is zero"));
        }

        let mut sent = 0;
        for chunk in data.chunks(max_packet_size as usize) {
            let data_packet = packet::encode(FpType::Data, chunk);
            self.port.write_all(&data_packet)?;
            match self.receive_ack(self.scan_timeout, DataMode::Write) {
                Ok(()) => {}
                Err(error @ Error::Data { .. }) => {
                    // Receiver aborted; the trailing response carries why.
                    log::error!("{}", error);
                    break;
                }
                Err(error) => return Err(error),
            }
            sent += chunk.len();
            self.report_progress(sent, data.len());
        }

        let (_, response) = self.read_packet(FpType::Cmd)?;
        let (status, value) = packet::parse_response(&response)?;
        self.last_cmd_response = response;
        log::debug!("status: {:#x}, value: {:#x}", status, value);
        if status != StatusCode::Success as u32 {
            return Err(Error::data(DataMode::Write, status));
        }

        log::info!("TX-DATA: successfully sent {} bytes", sent);
        Ok(sent)
    }

    fn last_cmd_response(&self) -> &[u8] {
        &self.last_cmd_response
    }

    fn set_progress(&mut self, progress: Option<Progress>) {
        self.progress = progress;
    }

    fn close(&mut self) {
        log::debug!("close {} interface", self.interface);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;

    struct MockPort {
        rx: VecDeque<u8>,
        tx: Vec<u8>,
    }

    impl MockPort {
        fn new(rx: &[u8]) -> MockPort {
            MockPort {
                rx: rx.iter().copied().collect(),
                tx: Vec::new(),
            }
        }
    }

    impl BytePort for MockPort {
        fn poll_byte(&mut self) -> Result<Option<u8>> {
            Ok(self.rx.pop_front())
        }

        fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
            for slot in buf.iter_mut() {
                *slot = self
                    .rx
                    .pop_front()
                    .ok_or_else(|| Error::connection("unexpected EOF"))?;
            }
            Ok(())
        }

        fn write_all(&mut self, buf: &[u8]) -> Result<()> {
            self.tx.extend_from_slice(buf);
            Ok(())
        }
    }

    const PINGR: [u8; 10] =
        [0x5A, 0xA7, 0x00, 0x03, 0x01, 0x50, 0x00, 0x00, 0xFB, 0x40];
    const ACK: [u8; 2] = [0x5A, 0xA1];
    const ABORT: [u8; 2] = [0x5A, 0xA3];
    const TIMEOUT: Duration = Duration::from_secs(5);

    fn transport(rx: Vec<u8>) -> FramingTransport<MockPort> {
        let mut transport = FramingTransport::new(MockPort::new(&rx), "UART");
        transport.scan_timeout = Duration::from_millis(20);
        transport
    }

    #[test]
    fn test_ping_handshake() {
        let mut transport = transport(PINGR.to_vec());
        transport.ping().unwrap();
        assert_eq!(transport.port.tx, [0x5A, 0xA6]);
        let response = transport.ping_response().unwrap();
        assert_eq!(response.version.major, 1);
        assert_eq!(response.version.minor, 3);
        assert_eq!(response.version.name, b'P');
    }

    #[test]
    fn test_ping_skips_dummy_bytes() {
        let mut rx = vec![0x00, 0xFF, 0x00];
        rx.extend_from_slice(&PINGR);
        let mut transport = transport(rx);
        transport.ping().unwrap();
        assert!(transport.ping_response().is_some());
    }

    #[test]
    fn test_write_cmd_get_property() {
        // GetProperty(CurrentVersion) full exchange.
        let mut rx = PINGR.to_vec();
        rx.extend_from_slice(&ACK);
        rx.extend_from_slice(&[
            0x5A, 0xA4, 0x0C, 0x00, 0x65, 0x1C, 0xA7, 0x00, 0x00, 0x02,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x03, 0x4B,
        ]);
        let mut transport = transport(rx);

        let payload = packet::command(
            crate::constants::CommandTag::GetProperty,
            0,
            &[0x01, 0x00],
        );
        let value = transport.write_cmd(&payload, TIMEOUT, 0).unwrap();
        assert_eq!(value, 0x4B03_0000);

        // Ping, command packet, then our ACK of the response.
        let mut expected = vec![0x5A, 0xA6];
        expected.extend_from_slice(&[
            0x5A, 0xA4, 0x0C, 0x00, 0x4B, 0x33, 0x07, 0x00, 0x00, 0x02,
            0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ]);
        expected.extend_from_slice(&ACK);
        assert_eq!(transport.port.tx, expected);
        assert_eq!(transport.last_cmd_response()[0], 0xA7);
    }

    #[test]
    fn test_write_cmd_status_error() {
        // Device answers FlashAlignmentError (101).
        let mut rx = PINGR.to_vec();
        rx.extend_from_slice(&ACK);
        rx.extend_from_slice(&[
            0x5A, 0xA4, 0x0C, 0x00, 0xD4, 0x7D, 0xA0, 0x00, 0x00, 0x02,
            0x65, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ]);
        let mut transport = transport(rx);

        let payload = packet::command(
            crate::constants::CommandTag::FlashEraseRegion,
            0,
            &[0x0001, 0x0F00, 0],
        );
        let error = transport.write_cmd(&payload, TIMEOUT, 0).unwrap_err();
        match error {
            Error::Command { status, name } => {
                assert_eq!(status, 101);
                assert_eq!(name, "FlashAlignmentError");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_write_cmd_response_crc_error() {
        let mut rx = PINGR.to_vec();
        rx.extend_from_slice(&ACK);
        rx.extend_from_slice(&[
            0x5A, 0xA4, 0x0C, 0x00, 0xFF, 0xFF, 0xA0, 0x00, 0x00, 0x02,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ]);
        let mut transport = transport(rx);

        let payload =
            packet::command(crate::constants::CommandTag::Reset, 0, &[]);
        let error = transport.write_cmd(&payload, TIMEOUT, 0).unwrap_err();
        assert_eq!(error.status(), Some(StatusCode::InvalidCrc as u32));
    }

    #[test]
    fn test_write_cmd_nack() {
        let mut rx = PINGR.to_vec();
        rx.extend_from_slice(&[0x5A, 0xA2]);
        let mut transport = transport(rx);

        let payload =
            packet::command(crate::constants::CommandTag::Reset, 0, &[]);
        let error = transport.write_cmd(&payload, TIMEOUT, 0).unwrap_err();
        assert_eq!(error.status(), Some(StatusCode::InvalidCrc as u32));
    }

    #[test]
    fn test_read_data_phase() {
        let mut rx = Vec::new();
        // One DATA packet with four payload bytes.
        rx.extend_from_slice(&[
            0x5A, 0xA5, 0x04, 0x00, 0x46, 0x24, 0xDE, 0xAD, 0xBE, 0xEF,
        ]);
        // Trailing generic response, status success.
        rx.extend_from_slice(&[
            0x5A, 0xA4, 0x0C, 0x00, 0x23, 0x72, 0xA0, 0x00, 0x00, 0x02,
            0x00, 0x00, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00,
        ]);
        let mut transport = transport(rx);

        let mut chunks = Vec::new();
        transport.set_progress(Some(Box::new(move |transferred, total| {
            assert!(transferred <= total);
            chunks.push(transferred);
        })));

        let data = transport.read_data(4).unwrap();
        assert_eq!(data, [0xDE, 0xAD, 0xBE, 0xEF]);
        // One ACK per received packet.
        assert_eq!(transport.port.tx, [0x5A, 0xA1, 0x5A, 0xA1]);
    }

    #[test]
    fn test_read_data_device_abort() {
        // A CMD packet in the middle of the inbound phase carries the
        // abort status.
        let rx = vec![
            0x5A, 0xA4, 0x0C, 0x00, 0x72, 0x7D, 0xA0, 0x00, 0x00, 0x02,
            0x12, 0x27, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];
        let mut transport = transport(rx);

        let error = transport.read_data(16).unwrap_err();
        match error {
            Error::Data { mode, status, .. } => {
                assert_eq!(mode, DataMode::Read);
                assert_eq!(status, 10002);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_write_data_phase() {
        let data = [0x11u8; 64];
        let mut rx = Vec::new();
        rx.extend_from_slice(&ACK);
        rx.extend_from_slice(&ACK);
        // Trailing generic response, status success, value 64.
        rx.extend_from_slice(&[
            0x5A, 0xA4, 0x0C, 0x00, 0x4E, 0xD6, 0xA0, 0x00, 0x00, 0x02,
            0x00, 0x00, 0x00, 0x00, 0x40, 0x00, 0x00, 0x00,
        ]);
        let mut transport = transport(rx);

        let sent = transport.write_data(&data, 32).unwrap();
        assert_eq!(sent, 64);

        // Two 32-byte DATA packets and the final ACK of the response.
        let chunk_packet = packet::encode(FpType::Data, &[0x11; 32]);
        let mut expected = chunk_packet.clone();
        expected.extend_from_slice(&chunk_packet);
        expected.extend_from_slice(&ACK);
        assert_eq!(transport.port.tx, expected);
    }

    #[test]
    fn test_write_data_abort_stops_early() {
        let data = [0x22u8; 64];
        let mut rx = Vec::new();
        rx.extend_from_slice(&ABORT);
        // Trailing response carries the reason.
        rx.extend_from_slice(&[
            0x5A, 0xA4, 0x0C, 0x00, 0x72, 0x7D, 0xA0, 0x00, 0x00, 0x02,
            0x12, 0x27, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ]);
        let mut transport = transport(rx);

        let error = transport.write_data(&data, 32).unwrap_err();
        match error {
            Error::Data { mode, status, .. } => {
                assert_eq!(mode, DataMode::Write);
                assert_eq!(status, 10002);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        // Only the first chunk went out before the abort.
        let first_chunk = packet::encode(FpType::Data, &[0x22; 32]);
        let mut expected = first_chunk;
        expected.extend_from_slice(&ACK);
        assert_eq!(transport.port.tx, expected);
    }

    #[test]
    fn test_find_start_byte_times_out() {
        let mut transport = transport(Vec::new());
        let error = transport.find_start_byte(Duration::from_millis(5));
        assert!(matches!(error, Err(Error::Timeout(_))));
    }

    #[test]
    fn test_write_data_zero_packet_size() {
        let mut transport = transport(Vec::new());
        assert!(transport.write_data(&[0u8; 4], 0).is_err());
    }
}
