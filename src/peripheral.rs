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

//! Host-side peripheral selection: which physical interface the engine
//! talks through, the bootloader's peripheral bitmask table and the
//! default speeds used when the caller does not specify one.

/// Physical interface the engine is bound to.
///
/// The numeric assignment is host-local and never reaches the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Interface {
    Uart = 1,
    I2c = 2,
    Spi = 3,
    Usb = 4,
}

impl Interface {
    pub fn name(self) -> &'static str {
        match self {
            Interface::Uart => "UART",
            Interface::I2c => "I2C",
            Interface::Spi => "SPI",
            Interface::Usb => "USB",
        }
    }
}

/// One row of the bootloader peripheral table: name, bit in the
/// `AvailablePeripherals` mask and nominal speed.
pub struct Peripheral {
    pub name: &'static str,
    pub mask: u32,
    pub speed: u32,
}

/// Peripherals reported by the `AvailablePeripherals` property.
pub const PERIPHERALS: &[Peripheral] = &[
    Peripheral { name: "UART", mask: 0x0000_0001, speed: 115_200 },
    Peripheral { name: "I2C-Slave", mask: 0x0000_0002, speed: 400 },
    Peripheral { name: "SPI-Slave", mask: 0x0000_0004, speed: 400 },
    Peripheral { name: "CAN", mask: 0x0000_0008, speed: 500 },
    Peripheral { name: "USB-HID", mask: 0x0000_0010, speed: 12_000_000 },
    Peripheral { name: "USB-CDC", mask: 0x0000_0020, speed: 12_000_000 },
    Peripheral { name: "USB-DFU", mask: 0x0000_0040, speed: 12_000_000 },
];

/// Default speeds per host transport.
pub mod speed {
    /// Baud. The ROM autobauds down to 1200.
    pub const UART: u32 = 57_600;
    /// Hz.
    pub const I2C: u32 = 100_000;
    /// Hz. FTDI MPSSE clocks bottom out around 3 kHz.
    pub const SPI: u32 = 1_000_000;
    /// Full-speed USB, nominal.
    pub const USB: u32 = 12_000_000;
}
