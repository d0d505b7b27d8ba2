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

use std::{
    ffi::OsString,
    fs::{self, File},
    io::{self, BufRead, BufReader},
    path::{Path, PathBuf},
};

use super::{PortInfo, PortUsbInfo};

// MBoot UART bridges show up as CDC-ACM or usb-serial devices; the
// remaining patterns are the usual suspects on desktop machines.
const TTY_PATTERNS: &[&str] = &[
    "/dev/ttyACM*", // usb-serial with CDC-ACM profile (DAPLink, LPC-Link)
    "/dev/ttyUSB*", // usb-serial with own driver (FTDI cables)
    "/dev/ttyS*",   // built-in serial ports
    "/dev/ttyAMA*", // ARM internal port (raspi)
    "/dev/rfcomm*", // BT serial devices
];

fn read_line<P: AsRef<Path>>(path: P) -> io::Result<String> {
    let mut file = BufReader::new(File::open(path)?);
    let mut line = String::new();
    file.read_line(&mut line)?;
    Ok(line.trim().to_owned())
}

fn read_hex_u16<P: AsRef<Path>>(path: P) -> io::Result<u16> {
    let line = read_line(path)?;
    u16::from_str_radix(&line, 16)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn parent(mut path: PathBuf) -> PathBuf {
    path.pop();
    path
}

/// Resolve the USB interface directory a TTY hangs off, if any.
fn usb_interface_dir(device_path: &Path) -> io::Result<Option<PathBuf>> {
    if !device_path.exists() {
        return Ok(None);
    }
    let device = fs::canonicalize(device_path)?;
    let subsystem = fs::canonicalize(device.join("subsystem"))?;
    Ok(match subsystem.file_name().and_then(|name| name.to_str()) {
        // Internal ports are not interesting here.
        Some("platform") => None,
        Some("usb-serial") => Some(parent(device)),
        Some("usb") => Some(device),
        _ => None,
    })
}

fn usb_info(interface_dir: &Path) -> io::Result<PortUsbInfo> {
    let device_dir = parent(interface_dir.to_path_buf());
    Ok(PortUsbInfo {
        num_if: read_line(device_dir.join("bNumInterfaces"))
            .ok()
            .and_then(|line| line.parse().ok())
            .unwrap_or(1),
        vid: read_hex_u16(device_dir.join("idVendor"))?,
        pid: read_hex_u16(device_dir.join("idProduct"))?,
        serial: read_line(device_dir.join("serial")).ok(),
        manufacturer: read_line(device_dir.join("manufacturer")).ok(),
        product: read_line(device_dir.join("product")).ok(),
        interface: read_line(interface_dir.join("interface")).ok(),
    })
}

fn port_info(port: &Path) -> io::Result<Option<PortInfo>> {
    let name = match port.file_name() {
        Some(name) => name.to_owned(),
        None => return Ok(None),
    };
    let device_path = PathBuf::from("/sys/class/tty").join(&name).join("device");

    let usb_info = match usb_interface_dir(&device_path)? {
        Some(interface_dir) => Some(usb_info(&interface_dir)?),
        None if device_path.exists() => return Ok(None),
        None => None,
    };

    Ok(Some(PortInfo {
        port: OsString::from(port),
        name,
        usb_info,
    }))
}

pub fn list_all() -> Vec<PortInfo> {
    let mut available = Vec::new();
    for pattern in TTY_PATTERNS {
        let paths = match glob::glob(pattern) {
            Ok(paths) => paths,
            Err(_) => continue,
        };
        for port in paths.flatten() {
            if let Ok(Some(info)) = port_info(&port) {
                available.push(info);
            }
        }
    }
    available
}
