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

use anyhow::Result;

use mboot::ports::{list_usb_hid, PortInfo};

pub fn list() -> Result<()> {
    let ports = PortInfo::list_all();
    if !ports.is_empty() {
        println!("Serial ports:");
    }
    for port in ports {
        let marker = if port.is_candidate() { "*" } else { "-" };
        match port.usb_info {
            Some(usb_info) => {
                println!(
                    "{} `{}` {:04X}:{:04X} {} {}",
                    marker,
                    port.port.to_string_lossy(),
                    usb_info.vid,
                    usb_info.pid,
                    usb_info.manufacturer.as_deref().unwrap_or(""),
                    usb_info.product.as_deref().unwrap_or(""),
                );
            }
            None => {
                println!("{} `{}`", marker, port.port.to_string_lossy());
            }
        }
    }

    let devices = list_usb_hid(None)?;
    if !devices.is_empty() {
        println!("USB-HID bootloader candidates:");
    }
    for device in devices {
        println!(
            "* {} {}",
            device.description(),
            device.serial.as_deref().unwrap_or("")
        );
    }

    Ok(())
}
