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

//! # USB-HID transport
//!
//! MBoot over USB speaks raw HID reports, no framing, no CRC, no ping.
//! A report is `[report_id, 0x00, length:u16le, payload, zero padding]`
//! padded to the report size. Four report IDs split command and data
//! traffic per direction.

use std::time::Duration;

use crate::{
    constants::StatusCode,
    error::{DataMode, Error, Result},
    packet,
    transport::{Progress, Transport},
};

/// Host-to-device command report.
pub const HID_REPORT_CMD_OUT: u8 = 0x01;
/// Host-to-device data report.
pub const HID_REPORT_DATA_OUT: u8 = 0x02;
/// Device-to-host command report.
pub const HID_REPORT_CMD_IN: u8 = 0x03;
/// Device-to-host data report.
pub const HID_REPORT_DATA_IN: u8 = 0x04;

/// Report size negotiated by the KBoot HID descriptor.
const REPORT_SIZE: usize = 36;

/// Payload bytes per data report.
const DATA_CHUNK_SIZE: usize = 0x20;

/// Default wait for an IN report.
const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Encode a HID report around `data`, zero-padded to `report_size`.
fn encode_report(report_id: u8, data: &[u8], report_size: usize) -> Result<Vec<u8>> {
    if data.len() + 4 > report_size {
        return Err(Error::generic(format!(
            "payload of {} bytes does not fit a {} byte report",
            data.len(),
            report_size
        )));
    }
    let mut raw = Vec::with_capacity(report_size);
    raw.push(report_id);
    raw.push(0x00);
    raw.extend_from_slice(&(data.len() as u16).to_le_bytes());
    raw.extend_from_slice(data);
    raw.resize(report_size, 0x00);
    Ok(raw)
}

/// Split a received report into its ID and payload.
fn decode_report(raw: &[u8]) -> Result<(u8, &[u8])> {
    if raw.len() < 4 {
        return Err(Error::generic(format!(
            "short HID report ({} bytes)",
            raw.len()
        )));
    }
    let length = usize::from(u16::from_le_bytes([raw[2], raw[3]]));
    let payload = raw
        .get(4..4 + length)
        .ok_or_else(|| Error::generic("HID report length exceeds report"))?;
    Ok((raw[0], payload))
}

/// Report-level I/O the transport runs on, implemented for `hidapi`
/// devices. The seam keeps the physical HID driver out of the core.
pub trait HidIo {
    fn write_report(&mut self, raw: &[u8]) -> Result<usize>;
    fn read_report(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;
}

impl HidIo for hidapi::HidDevice {
    fn write_report(&mut self, raw: &[u8]) -> Result<usize> {
        hidapi::HidDevice::write(self, raw)
            .map_err(|e| Error::Connection(e.to_string()))
    }

    fn read_report(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        self.read_timeout(buf, timeout.as_millis() as i32)
            .map_err(|e| Error::Connection(e.to_string()))
    }
}

/// USB-HID transport over a KBoot HID device.
pub struct UsbHid<D = hidapi::HidDevice> {
    device: D,
    info: String,
    timeout: Duration,
    last_cmd_response: Vec<u8>,
    progress: Option<Progress>,
}

impl UsbHid {
    /// Open the single HID device matching `vid`/`pid`.
    pub fn open(vid: u16, pid: u16) -> Result<UsbHid> {
        let api = hidapi::HidApi::new()
            .map_err(|e| Error::Connection(e.to_string()))?;
        let device = api.open(vid, pid).map_err(|_| {
            Error::Connection(format!(
                "can not find vid,pid: 0x{:04X}, 0x{:04X}",
                vid, pid
            ))
        })?;
        let product = device
            .get_product_string()
            .ok()
            .flatten()
            .unwrap_or_default();
        log::debug!("opening USB interface");
        Ok(UsbHid {
            device,
            info: format!("{} (0x{:04X}, 0x{:04X})", product, vid, pid),
            timeout: READ_TIMEOUT,
            last_cmd_response: Vec::new(),
            progress: None,
        })
    }
}

impl<D> UsbHid<D>
where
    D: HidIo,
{
    /// Device description for logs and device pickers.
    pub fn info(&self) -> &str {
        &self.info
    }

    fn write_report(&mut self, report_id: u8, data: &[u8]) -> Result<()> {
        let raw = encode_report(report_id, data, REPORT_SIZE)?;
        log::debug!("USB-OUT [{:02}]: {:02X?}", raw.len(), raw);
        self.device.write_report(&raw)?;
        Ok(())
    }

    fn read_report(&mut self, timeout: Duration) -> Result<(u8, Vec<u8>)> {
        let mut raw = [0u8; 64];
        let count = self.device.read_report(&mut raw, timeout)?;
        if count == 0 {
            return Err(Error::Timeout(timeout));
        }
        log::debug!("USB-IN [{:02}]: {:02X?}", count, &raw[..count]);
        let (report_id, payload) = decode_report(&raw[..count])?;
        Ok((report_id, payload.to_vec()))
    }

    fn report_progress(&mut self, transferred: usize, total: usize) {
        if let Some(callback) = self.progress.as_mut() {
            callback(transferred, total);
        }
    }
}

impl<D> Transport for UsbHid<D>
where
    D: HidIo,
{
    /// USB needs no handshake.
    fn ping(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_cmd(
        &mut self,
        payload: &[u8],
        timeout: Duration,
        status_success: u32,
    ) -> Result<u32> {
        self.write_report(HID_REPORT_CMD_OUT, payload)?;

        let (report_id, response) = self.read_report(timeout)?;
        if report_id != HID_REPORT_CMD_IN {
            log::debug!("RX-CMD: unexpected report id {}", report_id);
        }
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
            let (report_id, payload) = self.read_report(self.timeout)?;
            if report_id == HID_REPORT_CMD_IN {
                // A command report inside the data stream is the abort
                // path; it carries the status.
                let (status, value) = packet::parse_response(&payload)?;
                log::debug!("status: {:#x}, value: {:#x}", status, value);
                self.last_cmd_response = payload;
                return Err(Error::data(DataMode::Read, status));
            }
            data.extend_from_slice(&payload);
            let transferred = data.len().min(length);
            self.report_progress(transferred, length);
        }

        let (_, response) = self.read_report(self.timeout)?;
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

    fn write_data(&mut self, data: &[u8], _max_packet_size: u32) -> Result<usize> {
        let mut sent = 0;
        for chunk in data.chunks(DATA_CHUNK_SIZE) {
            self.write_report(HID_REPORT_DATA_OUT, chunk)?;
            sent += chunk.len();
            self.report_progress(sent, data.len());
        }

        let (_, response) = self.read_report(self.timeout)?;
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
        log::debug!("close USB interface");
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::constants::CommandTag;

    struct MockHid {
        incoming: VecDeque<Vec<u8>>,
        written: Vec<Vec<u8>>,
    }

    impl MockHid {
        fn new(incoming: Vec<Vec<u8>>) -> MockHid {
            MockHid {
                incoming: incoming.into(),
                written: Vec::new(),
            }
        }

        fn report(report_id: u8, data: &[u8]) -> Vec<u8> {
            encode_report(report_id, data, REPORT_SIZE).unwrap()
        }
    }

    impl HidIo for MockHid {
        fn write_report(&mut self, raw: &[u8]) -> Result<usize> {
            self.written.push(raw.to_vec());
            Ok(raw.len())
        }

        fn read_report(
            &mut self,
            buf: &mut [u8],
            _timeout: Duration,
        ) -> Result<usize> {
            match self.incoming.pop_front() {
                Some(report) => {
                    buf[..report.len()].copy_from_slice(&report);
                    Ok(report.len())
                }
                None => Ok(0),
            }
        }
    }

    fn transport(incoming: Vec<Vec<u8>>) -> UsbHid<MockHid> {
        UsbHid {
            device: MockHid::new(incoming),
            info: "mock".to_owned(),
            timeout: Duration::from_millis(10),
            last_cmd_response: Vec::new(),
            progress: None,
        }
    }

    #[test]
    fn test_report_codec() {
        let raw = encode_report(
            HID_REPORT_CMD_OUT,
            &[0x07, 0x00, 0x00, 0x02],
            REPORT_SIZE,
        )
        .unwrap();
        assert_eq!(raw.len(), REPORT_SIZE);
        assert_eq!(&raw[..8], &[0x01, 0x00, 0x04, 0x00, 0x07, 0x00, 0x00, 0x02]);
        assert!(raw[8..].iter().all(|&byte| byte == 0));

        let (report_id, payload) = decode_report(&raw).unwrap();
        assert_eq!(report_id, HID_REPORT_CMD_OUT);
        assert_eq!(payload, &[0x07, 0x00, 0x00, 0x02]);

        assert!(encode_report(1, &[0u8; 33], REPORT_SIZE).is_err());
        assert!(decode_report(&[0x03, 0x00]).is_err());
    }

    #[test]
    fn test_read_memory_exchange() {
        // ReadMemory(0x20000000, 4): command response, one data report,
        // final status.
        let incoming = vec![
            MockHid::report(
                HID_REPORT_CMD_IN,
                &[
                    0xA3, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00, 0x04,
                    0x00, 0x00, 0x00,
                ],
            ),
            MockHid::report(HID_REPORT_DATA_IN, &[0xDE, 0xAD, 0xBE, 0xEF]),
            MockHid::report(
                HID_REPORT_CMD_IN,
                &[0xA0, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00],
            ),
        ];
        let mut usb = transport(incoming);

        let payload = packet::command(
            CommandTag::ReadMemory,
            0,
            &[0x2000_0000, 4, 0],
        );
        let value = usb
            .write_cmd(&payload, Duration::from_millis(10), 0)
            .unwrap();
        assert_eq!(value, 4);

        let expected = MockHid::report(
            HID_REPORT_CMD_OUT,
            &[
                0x03, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00, 0x20, 0x04, 0x00,
                0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            ],
        );
        assert_eq!(usb.device.written, [expected]);

        let data = usb.read_data(4).unwrap();
        assert_eq!(data, [0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn test_read_data_abort() {
        // A CMD_IN report interrupting the DATA_IN stream carries the
        // failure status.
        let incoming = vec![MockHid::report(
            HID_REPORT_CMD_IN,
            &[0xA0, 0x00, 0x00, 0x02, 0xE3, 0x27, 0x00, 0x00],
        )];
        let mut usb = transport(incoming);

        let error = usb.read_data(16).unwrap_err();
        match error {
            Error::Data { mode, status, .. } => {
                assert_eq!(mode, DataMode::Read);
                assert_eq!(status, 10211);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_write_data_chunks() {
        // 64 bytes go out as two 32-byte data reports.
        let incoming = vec![MockHid::report(
            HID_REPORT_CMD_IN,
            &[0xA0, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00],
        )];
        let mut usb = transport(incoming);

        let data = [0x55u8; 64];
        let sent = usb.write_data(&data, 32).unwrap();
        assert_eq!(sent, 64);

        assert_eq!(usb.device.written.len(), 2);
        for report in &usb.device.written {
            assert_eq!(report.len(), REPORT_SIZE);
            assert_eq!(report[0], HID_REPORT_DATA_OUT);
            assert_eq!(&report[2..4], &[0x20, 0x00]);
            assert!(report[4..36].iter().all(|&byte| byte == 0x55));
        }
    }

    #[test]
    fn test_read_timeout() {
        let mut usb = transport(Vec::new());
        assert!(matches!(usb.read_data(4), Err(Error::Timeout(_))));
    }
}
