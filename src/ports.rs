// Copyright 2021 Locha Mesh Developers <contact@locha.io>
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

//! Device discovery: serial ports that may carry an MBoot UART bridge and
//! USB-HID devices exposing the KBoot interface.

use std::ffi::OsString;

use crate::error::{Error, Result};

#[cfg(target_os = "linux")]
mod list_linux;

/// USB vendor IDs that commonly front an MBoot target: NXP Kinetis and
/// LPC parts, DAPLink bridges and FTDI cables.
pub const KNOWN_VIDS: &[u16] = &[0x15A2, 0x1FC9, 0x0D28, 0x0403];

/// Information about an available serial port.
#[derive(Debug)]
pub struct PortInfo {
    pub port: OsString,
    pub name: OsString,
    pub usb_info: Option<PortUsbInfo>,
}

impl PortInfo {
    /// List all serial ports on the system.
    #[cfg(target_os = "linux")]
    pub fn list_all() -> Vec<PortInfo> {
        self::list_linux::list_all()
    }

    #[cfg(not(target_os = "linux"))]
    pub fn list_all() -> Vec<PortInfo> {
        Vec::new()
    }

    /// Whether this port hangs off a vendor known to front an MBoot
    /// target.
    pub fn is_candidate(&self) -> bool {
        self.usb_info
            .as_ref()
            .map(|usb| KNOWN_VIDS.contains(&usb.vid))
            .unwrap_or(false)
    }
}

/// Information about USB serial ports.
#[derive(Debug)]
pub struct PortUsbInfo {
    /// Number of interfaces in this device.
    pub num_if: usize,
    /// USB Vendor ID.
    pub vid: u16,
    /// USB Product ID.
    pub pid: u16,
    /// Serial number string.
    pub serial: Option<String>,
    /// Device manufacturer.
    pub manufacturer: Option<String>,
    /// Device product description.
    pub product: Option<String>,
    /// Device product interface.
    pub interface: Option<String>,
}

/// A USB-HID device that may expose the KBoot interface.
#[derive(Debug)]
pub struct HidDeviceInfo {
    pub vid: u16,
    pub pid: u16,
    pub serial: Option<String>,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

impl HidDeviceInfo {
    pub fn description(&self) -> String {
        format!(
            "{} (0x{:04X}, 0x{:04X})",
            self.product.as_deref().unwrap_or("?"),
            self.vid,
            self.pid
        )
    }
}

/// Enumerate USB-HID devices, restricted to [`KNOWN_VIDS`] unless a
/// `vid`/`pid` pair is given.
pub fn list_usb_hid(filter: Option<(u16, u16)>) -> Result<Vec<HidDeviceInfo>> {
    let api = hidapi::HidApi::new()
        .map_err(|e| Error::Connection(e.to_string()))?;

    let mut devices = Vec::new();
    for info in api.device_list() {
        let matches = match filter {
            Some((vid, pid)) => {
                info.vendor_id() == vid && info.product_id() == pid
            }
            None => KNOWN_VIDS.contains(&info.vendor_id()),
        };
        if !matches {
            continue;
        }
        devices.push(HidDeviceInfo {
            vid: info.vendor_id(),
            pid: info.product_id(),
            serial: info.serial_number().map(str::to_owned),
            manufacturer: info.manufacturer_string().map(str::to_owned),
            product: info.product_string().map(str::to_owned),
        });
    }
    Ok(devices)
}
