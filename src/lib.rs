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

//! # NXP MCU Bootloader (MBoot/KBoot) host interface library
//!
//! This is a library to talk to the bootloader ROM or flash loader of NXP
//! Kinetis, LPC and i.MX RT microcontrollers: query properties, erase,
//! read, write and configure on-chip and external memories, program
//! one-time-programmable regions, manage keys and reset the target.
//!
//! Four transports are supported: USB-HID, UART, SPI-via-FTDI and
//! I2C-via-FTDI. The serial transports share one framing layer
//! (start byte, CRC-16/XMODEM, ACK/NACK/ABORT handshake); USB speaks raw
//! HID reports.
//!
//! # Example
//!
//! ```no_run
//! use mboot::{McuBoot, PropertyTag};
//!
//! # fn main() -> mboot::Result<()> {
//! let mut mcu = McuBoot::new();
//! mcu.open_uart("/dev/ttyACM0", 57600)?;
//!
//! let version = mcu.get_property(PropertyTag::CurrentVersion, 0)?;
//! println!("bootloader version: {:#010x}", version);
//!
//! let data = mcu.read_memory(0x2000_0000, 64, 0)?;
//! assert_eq!(data.len(), 64);
//! mcu.close();
//! # Ok(())
//! # }
//! ```
//!
//! # See also
//!
//! - MCU Bootloader Reference Manual (MCUBOOTRM), NXP.
//! - `blhost` from the MCUXpresso Secure Provisioning tooling.

use std::{thread, time::Duration};

pub mod constants;
pub mod crc;
pub mod memorytool;
pub mod packet;
pub mod peripheral;
pub mod ports;
pub mod property;
pub mod transport;
pub mod util;

mod error;

pub use self::constants::{
    CommandTag, ExtMemId, KeyOperation, PropertyTag, StatusCode,
};
pub use self::error::{DataMode, Error, Result};
pub use self::memorytool::{Flash, Memory, MemoryBlock};
pub use self::peripheral::Interface;
pub use self::transport::{Progress, Transport};

use self::packet::FLAG_HAS_DATA_PHASE;

/// Default wait for a command response.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default wait for the flash-erase command family, used when no
/// engine-level override is set.
pub const ERASE_TIMEOUT: Duration = Duration::from_secs(300);

/// Fixed length of the blob produced by `GenerateKeyBlob`.
const KEY_BLOB_LEN: u32 = 0x48;

/// Pattern granularity of [`McuBoot::fill_memory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillUnit {
    Word,
    Short,
    Byte,
}

/// Whether [`McuBoot::flash_image`] erases the target region first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EraseMode {
    None,
    Erase,
}

/// One `KeyProvisioning` sub-operation with its arguments.
#[derive(Debug, Clone, Copy)]
pub enum KeyProvisioning<'a> {
    /// Enroll the key provisioning feature.
    Enroll,
    /// Send a plain-text user key of the given type.
    SetUserKey { key_type: u32, key: &'a [u8] },
    /// Let the device generate `key_size` bytes of an intrinsic key.
    SetKey { key_type: u32, key_size: u32 },
    /// Write the active key to a nonvolatile memory.
    WriteKeyNonvolatile { memory_id: u32 },
    /// Load the key from a nonvolatile memory.
    ReadKeyNonvolatile { memory_id: u32 },
    /// Send a whole key store blob.
    WriteKeyStore { key_store: &'a [u8] },
    /// Read the key store back from the bootloader.
    ReadKeyStore,
}

impl KeyProvisioning<'_> {
    fn operation(&self) -> KeyOperation {
        match self {
            KeyProvisioning::Enroll => KeyOperation::Enroll,
            KeyProvisioning::SetUserKey { .. } => KeyOperation::SetUserKey,
            KeyProvisioning::SetKey { .. } => KeyOperation::SetKey,
            KeyProvisioning::WriteKeyNonvolatile { .. } => {
                KeyOperation::WriteKeyNonvolatile
            }
            KeyProvisioning::ReadKeyNonvolatile { .. } => {
                KeyOperation::ReadKeyNonvolatile
            }
            KeyProvisioning::WriteKeyStore { .. } => {
                KeyOperation::WriteKeyStore
            }
            KeyProvisioning::ReadKeyStore => KeyOperation::ReadKeyStore,
        }
    }
}

/// The MBoot command protocol engine.
///
/// Bound to at most one open transport at a time; commands are issued
/// sequentially and each blocks until the whole exchange, data phase
/// included, completes or fails.
pub struct McuBoot {
    itf: Option<Box<dyn Transport>>,
    current_interface: Option<Interface>,
    reopen_usb: Option<(u16, u16)>,
    /// Fail fast on open errors instead of returning a negative result.
    pub cli_mode: bool,
    /// Command-response timeout override. `None` selects the defaults:
    /// [`DEFAULT_TIMEOUT`], or [`ERASE_TIMEOUT`] for the erase family.
    pub timeout: Option<Duration>,
    memory: Option<Memory>,
    flash: Option<Flash>,
}

impl Default for McuBoot {
    fn default() -> Self {
        McuBoot::new()
    }
}

impl McuBoot {
    pub fn new() -> McuBoot {
        McuBoot {
            itf: None,
            current_interface: None,
            reopen_usb: None,
            cli_mode: false,
            timeout: None,
            memory: None,
            flash: None,
        }
    }

    /// Whether a transport is currently open.
    pub fn is_open(&self) -> bool {
        self.itf.is_some()
    }

    /// The interface the engine is bound to, if open.
    pub fn current_interface(&self) -> Option<Interface> {
        self.current_interface
    }

    /// Connect over USB-HID.
    ///
    /// Returns `Ok(false)` (after logging) when no device matches and the
    /// engine is not in CLI mode; in CLI mode enumeration misses fail
    /// fast.
    pub fn open_usb(&mut self, vid: u16, pid: u16) -> Result<bool> {
        match transport::UsbHid::open(vid, pid) {
            Ok(device) => {
                log::info!("Connect: {}", device.info());
                self.itf = Some(Box::new(device));
                self.current_interface = Some(Interface::Usb);
                self.reopen_usb = Some((vid, pid));
                Ok(true)
            }
            Err(error) => {
                if self.cli_mode {
                    return Err(error);
                }
                log::info!("{}", error);
                Ok(false)
            }
        }
    }

    /// Connect over UART.
    pub fn open_uart(&mut self, port: &str, baudrate: usize) -> Result<bool> {
        match transport::Uart::open(port, baudrate) {
            Ok(uart) => {
                log::info!("opened UART {} at {} baud", port, baudrate);
                self.itf = Some(Box::new(uart.into_transport()));
                self.current_interface = Some(Interface::Uart);
                Ok(true)
            }
            Err(error) => {
                log::info!("open UART failed, UART disconnected!");
                if self.cli_mode {
                    return Err(error);
                }
                Ok(false)
            }
        }
    }

    /// Connect over an SPI master bus (typically FTDI MPSSE).
    pub fn open_spi<B>(&mut self, bus: B)
    where
        B: embedded_hal::spi::SpiBus<u8> + 'static,
    {
        self.itf = Some(Box::new(transport::Spi::new(bus).into_transport()));
        self.current_interface = Some(Interface::Spi);
    }

    /// Connect over an I2C master bus (typically FTDI MPSSE), using the
    /// default slave address.
    pub fn open_i2c<B>(&mut self, bus: B)
    where
        B: embedded_hal::i2c::I2c + 'static,
    {
        self.itf = Some(Box::new(transport::I2c::new(bus).into_transport()));
        self.current_interface = Some(Interface::I2c);
    }

    /// Disconnect. Returns whether a transport was open.
    pub fn close(&mut self) -> bool {
        match self.itf.take() {
            Some(mut itf) => {
                itf.close();
                true
            }
            None => false,
        }
    }

    /// Install or remove the data-phase progress callback on the open
    /// transport.
    pub fn set_progress(&mut self, progress: Option<Progress>) {
        if let Some(itf) = self.itf.as_deref_mut() {
            itf.set_progress(progress);
        }
    }

    /// Raw payload of the most recent command response.
    pub fn last_cmd_response(&self) -> &[u8] {
        self.itf
            .as_deref()
            .map(|itf| itf.last_cmd_response())
            .unwrap_or(&[])
    }

    fn itf(&mut self) -> Result<&mut dyn Transport> {
        self.itf
            .as_deref_mut()
            .ok_or_else(|| Error::connection("device not open"))
    }

    fn cmd_timeout(&self) -> Duration {
        self.timeout.unwrap_or(DEFAULT_TIMEOUT)
    }

    fn erase_timeout(&self) -> Duration {
        self.timeout.unwrap_or(ERASE_TIMEOUT)
    }

    fn write_cmd(&mut self, payload: &[u8], timeout: Duration) -> Result<u32> {
        self.write_cmd_expect(payload, timeout, StatusCode::Success as u32)
    }

    fn write_cmd_expect(
        &mut self,
        payload: &[u8],
        timeout: Duration,
        status_success: u32,
    ) -> Result<u32> {
        self.itf()?.write_cmd(payload, timeout, status_success)
    }

    /// Read the RAM and flash ranges from the device properties and cache
    /// them for address validation. Devices without internal memory are
    /// tolerated.
    pub fn get_memory_range(&mut self) -> Result<()> {
        match self.fetch_memory_range() {
            Ok(()) => Ok(()),
            // Some devices have no internal memory.
            Err(Error::Command { .. }) => Ok(()),
            Err(error) => Err(error),
        }
    }

    fn fetch_memory_range(&mut self) -> Result<()> {
        let ram_start = self.get_property(PropertyTag::RamStartAddress, 0)?;
        let ram_size = self.get_property(PropertyTag::RamSize, 0)?;
        self.memory = Some(Memory::with_length(ram_start, ram_size)?);

        let flash_start = self.get_property(PropertyTag::FlashStartAddress, 0)?;
        let flash_size = self.get_property(PropertyTag::FlashSize, 0)?;
        self.flash = Some(Flash::new(flash_start, None, Some(flash_size), None)?);
        Ok(())
    }

    pub fn memory(&self) -> Option<&Memory> {
        self.memory.as_ref()
    }

    pub fn flash(&self) -> Option<&Flash> {
        self.flash.as_ref()
    }

    /// Whether `block` lies in the cached RAM range. Permissive when the
    /// range is unknown.
    pub fn is_in_memory(&self, block: &MemoryBlock) -> bool {
        self.memory
            .as_ref()
            .map(|memory| memory.contains(block))
            .unwrap_or(true)
    }

    /// Whether `block` lies in the cached flash range. Permissive when
    /// the range is unknown.
    pub fn is_in_flash(&self, block: &MemoryBlock) -> bool {
        self.flash
            .as_ref()
            .map(|flash| flash.contains(block))
            .unwrap_or(true)
    }

    /// Collect every property the device supports, decoded for display.
    ///
    /// Properties the device rejects are skipped; transport errors
    /// propagate.
    pub fn get_mcu_info(
        &mut self,
        memory_id: u32,
    ) -> Result<Vec<(&'static str, String)>> {
        let mut info = Vec::new();
        for &tag in PropertyTag::ALL {
            let raw_value = match self.get_property(tag, memory_id) {
                Ok(raw_value) => raw_value,
                Err(Error::Command { .. }) => continue,
                Err(error) => return Err(error),
            };
            let decoded = property::decode_property_value(
                tag,
                raw_value,
                self.last_cmd_response(),
                memory_id,
            );
            info.push((tag.name(), decoded));
        }
        Ok(info)
    }

    /// Decode the `ExternalMemoryAttributes` of one external memory.
    pub fn get_exmemory_info(&mut self, memory_id: u32) -> Result<String> {
        let raw_value = self
            .get_property(PropertyTag::ExternalMemoryAttributes, memory_id)?;
        Ok(property::decode_property_value(
            PropertyTag::ExternalMemoryAttributes,
            raw_value,
            self.last_cmd_response(),
            memory_id,
        ))
    }

    /// Fill an external-memory configuration block into RAM word by word
    /// and hand it to `ConfigureMemory`.
    ///
    /// `config[0]` is the RAM address the block is staged at; the
    /// remaining words are the configuration itself.
    pub fn setup_external_memory(
        &mut self,
        memory_id: u32,
        config: &[u32],
    ) -> Result<()> {
        let (&config_address, words) = config.split_first().ok_or_else(|| {
            Error::generic("external memory configuration is empty")
        })?;
        let mut fill_address = config_address;
        for &word in words {
            self.fill_memory(fill_address, 4, word, FillUnit::Word)?;
            fill_address += 4;
        }
        self.configure_memory(memory_id, config_address)
    }

    /// Erase the complete flash memory without recovering the flash
    /// security section. CommandTag: 0x01
    pub fn flash_erase_all(&mut self, memory_id: u32) -> Result<()> {
        log::info!("TX-CMD: FlashEraseAll [ memoryId = 0x{:X} ]", memory_id);
        let cmd = packet::command(CommandTag::FlashEraseAll, 0, &[memory_id]);
        let timeout = self.erase_timeout();
        self.write_cmd(&cmd, timeout)?;
        Ok(())
    }

    /// Erase the specified range of flash. CommandTag: 0x02
    ///
    /// Internal-flash regions (`memory_id == 0`) are checked against the
    /// range cached by [`McuBoot::get_memory_range`], when one is known.
    pub fn flash_erase_region(
        &mut self,
        start_address: u32,
        length: u32,
        memory_id: u32,
    ) -> Result<()> {
        if memory_id == 0 {
            let block = MemoryBlock::with_length(start_address, length)?;
            if !self.is_in_flash(&block) {
                return Err(Error::Generic(format!(
                    "erase region {} is outside of flash",
                    block
                )));
            }
        }
        log::info!(
            "TX-CMD: FlashEraseRegion [ StartAddr=0x{:08X} | len=0x{:X} | memoryId = 0x{:X} ]",
            start_address,
            length,
            memory_id
        );
        let cmd = packet::command(
            CommandTag::FlashEraseRegion,
            0,
            &[start_address, length, memory_id],
        );
        let timeout = self.erase_timeout();
        self.write_cmd(&cmd, timeout)?;
        Ok(())
    }

    /// Read `length` bytes of MCU memory. CommandTag: 0x03
    pub fn read_memory(
        &mut self,
        start_address: u32,
        length: u32,
        memory_id: u32,
    ) -> Result<Vec<u8>> {
        if length == 0 {
            return Err(Error::generic("data length is zero"));
        }
        log::info!(
            "TX-CMD: ReadMemory [ StartAddr=0x{:08X} | len=0x{:X} | memoryId = 0x{:X} ]",
            start_address,
            length,
            memory_id
        );
        let cmd = packet::command(
            CommandTag::ReadMemory,
            0,
            &[start_address, length, memory_id],
        );
        let timeout = self.cmd_timeout();
        self.write_cmd(&cmd, timeout)?;
        self.itf()?.read_data(length as usize)
    }

    /// Write `data` into MCU memory. CommandTag: 0x04
    ///
    /// Returns the number of bytes handed to the device. The data phase
    /// is chunked by the device's `MaxPacketSize` property.
    pub fn write_memory(
        &mut self,
        start_address: u32,
        data: &[u8],
        memory_id: u32,
    ) -> Result<usize> {
        if data.is_empty() {
            return Err(Error::generic("data length is zero"));
        }
        log::info!(
            "TX-CMD: WriteMemory [ StartAddr=0x{:08X} | len=0x{:X} | memoryId = 0x{:X} ]",
            start_address,
            data.len(),
            memory_id
        );
        let cmd = packet::command(
            CommandTag::WriteMemory,
            0,
            &[start_address, data.len() as u32, memory_id],
        );
        let max_packet_size =
            self.get_property(PropertyTag::MaxPacketSize, memory_id)?;
        let timeout = self.cmd_timeout();
        self.write_cmd(&cmd, timeout)?;
        self.itf()?.write_data(data, max_packet_size)
    }

    /// Fill MCU memory with a pattern. CommandTag: 0x05
    ///
    /// The pattern is replicated across a word according to `unit` and
    /// must fit the unit's range.
    pub fn fill_memory(
        &mut self,
        start_address: u32,
        length: u32,
        pattern: u32,
        unit: FillUnit,
    ) -> Result<()> {
        let word = match unit {
            FillUnit::Word => pattern,
            FillUnit::Short => {
                if pattern > 0xFFFF {
                    return Err(Error::Generic(format!(
                        "pattern 0x{:08X} does not match unit short",
                        pattern
                    )));
                }
                (pattern << 16) | pattern
            }
            FillUnit::Byte => {
                if pattern > 0xFF {
                    return Err(Error::Generic(format!(
                        "pattern 0x{:08X} does not match unit byte",
                        pattern
                    )));
                }
                pattern * 0x0101_0101
            }
        };
        log::info!(
            "TX-CMD: FillMemory [ address=0x{:08X} | len=0x{:X} | pattern=0x{:08X} | unit={:?} ]",
            start_address,
            length,
            word,
            unit
        );
        let cmd = packet::command(
            CommandTag::FillMemory,
            0,
            &[start_address, length, word],
        );
        let timeout = self.cmd_timeout();
        self.write_cmd(&cmd, timeout)?;
        Ok(())
    }

    /// Disable flash security with the 8-byte backdoor key.
    /// CommandTag: 0x06
    ///
    /// See [`util::check_key`] for parsing the textual key forms.
    pub fn flash_security_disable(&mut self, backdoor_key: &[u8; 8]) -> Result<()> {
        log::info!(
            "TX-CMD: FlashSecurityDisable [ backdoor_key = {:02X?} ]",
            backdoor_key
        );
        // Each half of the key goes out word-reversed.
        let low = u32::from_be_bytes([
            backdoor_key[0],
            backdoor_key[1],
            backdoor_key[2],
            backdoor_key[3],
        ]);
        let high = u32::from_be_bytes([
            backdoor_key[4],
            backdoor_key[5],
            backdoor_key[6],
            backdoor_key[7],
        ]);
        let cmd = packet::command(
            CommandTag::FlashSecurityDisable,
            0,
            &[low, high],
        );
        let timeout = self.cmd_timeout();
        self.write_cmd(&cmd, timeout)?;
        Ok(())
    }

    /// Get the raw value of a property. CommandTag: 0x07
    ///
    /// The decoded form is produced by
    /// [`property::decode_property_value`] from the raw value and
    /// [`McuBoot::last_cmd_response`].
    pub fn get_property(
        &mut self,
        prop_tag: PropertyTag,
        memory_id: u32,
    ) -> Result<u32> {
        log::info!(
            "TX-CMD: GetProperty->{} [ PropertyTag: {} | memoryId = 0x{:X} ]",
            prop_tag.name(),
            prop_tag as u8,
            memory_id
        );
        let cmd = packet::command(
            CommandTag::GetProperty,
            0,
            &[u32::from(prop_tag as u8), memory_id],
        );
        let timeout = self.cmd_timeout();
        let raw_value = self.write_cmd(&cmd, timeout)?;
        log::info!(
            "RX-CMD: {} = {}",
            prop_tag.name(),
            property::decode_property_value(
                prop_tag,
                raw_value,
                self.last_cmd_response(),
                memory_id
            )
        );
        Ok(raw_value)
    }

    /// Set the value of a property. CommandTag: 0x0C
    pub fn set_property(
        &mut self,
        prop_tag: PropertyTag,
        value: u32,
        memory_id: u32,
    ) -> Result<()> {
        log::info!(
            "TX-CMD: SetProperty->{} = {} [ memoryId = 0x{:X} ]",
            prop_tag.name(),
            value,
            memory_id
        );
        let cmd = packet::command(
            CommandTag::SetProperty,
            0,
            &[u32::from(prop_tag as u8), value, memory_id],
        );
        let timeout = self.cmd_timeout();
        self.write_cmd(&cmd, timeout)?;
        Ok(())
    }

    /// Send a Secure Binary (SB) file image. CommandTag: 0x08
    pub fn receive_sb_file(&mut self, data: &[u8]) -> Result<usize> {
        if data.is_empty() {
            return Err(Error::generic("data length is zero"));
        }
        log::info!("TX-CMD: ReceiveSBFile [ len={} ]", data.len());
        let cmd = packet::command(
            CommandTag::ReceiveSbFile,
            FLAG_HAS_DATA_PHASE,
            &[data.len() as u32],
        );
        let max_packet_size =
            self.get_property(PropertyTag::MaxPacketSize, 0)?;
        let timeout = self.cmd_timeout();
        self.write_cmd(&cmd, timeout)?;
        self.itf()?.write_data(data, max_packet_size)
    }

    /// Jump to `jump_address` with the argument and stack pointer.
    /// CommandTag: 0x09
    pub fn execute(
        &mut self,
        jump_address: u32,
        argument: u32,
        sp_address: u32,
    ) -> Result<()> {
        log::info!(
            "TX-CMD: Execute [ JumpAddr=0x{:08X} | ARG=0x{:08X} | SP=0x{:08X} ]",
            jump_address,
            argument,
            sp_address
        );
        let cmd = packet::command(
            CommandTag::Execute,
            0,
            &[jump_address, argument, sp_address],
        );
        let timeout = self.cmd_timeout();
        self.write_cmd(&cmd, timeout)?;
        Ok(())
    }

    /// Call the function at `call_address`. CommandTag: 0x0A
    pub fn call(&mut self, call_address: u32, argument: u32) -> Result<()> {
        log::info!(
            "TX-CMD: Call [ CallAddr=0x{:08X} | ARG=0x{:08X} ]",
            call_address,
            argument
        );
        let cmd =
            packet::command(CommandTag::Call, 0, &[call_address, argument]);
        let timeout = self.cmd_timeout();
        self.write_cmd(&cmd, timeout)?;
        Ok(())
    }

    /// Reset the MCU. CommandTag: 0x0B
    ///
    /// Best-effort: the device may drop off the bus before acknowledging,
    /// so transport errors after sending are tolerated. Outside CLI mode
    /// the engine waits out an interface-specific settle delay (and
    /// reopens USB devices, which re-enumerate).
    pub fn reset(&mut self) -> Result<()> {
        log::info!("TX-CMD: Reset MCU");
        if self.itf.is_none() {
            return Err(Error::connection("device not open"));
        }
        let cmd = packet::command(CommandTag::Reset, 0, &[]);
        let timeout = self.cmd_timeout();
        if let Err(error) = self.write_cmd(&cmd, timeout) {
            log::debug!("reset: ignoring {}", error);
        }

        if !self.cli_mode {
            match self.current_interface {
                Some(Interface::Usb) => {
                    self.close();
                    thread::sleep(Duration::from_millis(400));
                    if let Some((vid, pid)) = self.reopen_usb {
                        self.open_usb(vid, pid)?;
                    }
                }
                Some(Interface::Uart) => {
                    thread::sleep(Duration::from_millis(10));
                }
                Some(Interface::Spi) => {
                    thread::sleep(Duration::from_millis(5));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Erase the complete flash and recover the flash security section.
    /// CommandTag: 0x0D
    pub fn flash_erase_all_unsecure(&mut self) -> Result<()> {
        log::info!("TX-CMD: FlashEraseAllUnsecure");
        let cmd = packet::command(CommandTag::FlashEraseAllUnsecure, 0, &[]);
        let timeout = self.erase_timeout();
        self.write_cmd(&cmd, timeout)?;
        Ok(())
    }

    /// Program `byte_count` (4 or 8) bytes into the program-once region.
    /// CommandTag: 0x0E
    pub fn flash_program_once(
        &mut self,
        index: u32,
        byte_count: u32,
        data: &[u8],
    ) -> Result<()> {
        if byte_count != 4 && byte_count != 8 {
            return Err(Error::Generic(format!(
                "invalid byte_count argument: {}",
                byte_count
            )));
        }
        if data.len() as u32 != byte_count {
            return Err(Error::generic("byte_count does not match data"));
        }
        log::info!(
            "TX-CMD: FlashProgramOnce [ Index={} | Data = {:02X?} ]",
            index,
            data
        );
        let mut cmd = packet::command_raw(
            CommandTag::FlashProgramOnce,
            0,
            3,
            &[index, byte_count],
        );
        cmd.extend_from_slice(data);
        let timeout = self.cmd_timeout();
        self.write_cmd(&cmd, timeout)?;
        Ok(())
    }

    /// Read `byte_count` (4 or 8) bytes from the program-once region.
    /// CommandTag: 0x0F
    pub fn flash_read_once(&mut self, index: u32, byte_count: u32) -> Result<u64> {
        if byte_count != 4 && byte_count != 8 {
            return Err(Error::Generic(format!(
                "invalid byte_count argument: {}",
                byte_count
            )));
        }
        log::info!(
            "TX-CMD: FlashReadOnce [ Index={} | len={} ]",
            index,
            byte_count
        );
        let cmd = packet::command(
            CommandTag::FlashReadOnce,
            0,
            &[index, byte_count],
        );
        let timeout = self.cmd_timeout();
        self.write_cmd(&cmd, timeout)?;

        // The value words start at offset 12 of the response.
        let response = self.last_cmd_response();
        let bytes = response
            .get(12..12 + byte_count as usize)
            .ok_or_else(|| Error::generic("short FlashReadOnce response"))?;
        let mut word = [0u8; 8];
        word[..bytes.len()].copy_from_slice(bytes);
        let value = u64::from_le_bytes(word);
        log::info!("Response word: 0x{0:X} ({0})", value);
        Ok(value)
    }

    /// Read one word of the OCOTP field; alias of
    /// [`McuBoot::flash_read_once`] with a 4-byte count.
    pub fn efuse_read_once(&mut self, index: u32) -> Result<u64> {
        self.flash_read_once(index, 4)
    }

    /// Program one word of the OCOTP field; alias of
    /// [`McuBoot::flash_program_once`] with a 4-byte count.
    pub fn efuse_program_once(&mut self, index: u32, word: u32) -> Result<()> {
        self.flash_program_once(index, 4, &word.to_le_bytes())
    }

    /// Read the flash IFR (`option` 0) or flash firmware ID (`option` 1).
    /// CommandTag: 0x10
    ///
    /// The device may report fewer bytes than requested; the returned
    /// buffer is the smaller of the two.
    pub fn flash_read_resource(
        &mut self,
        start_address: u32,
        byte_count: u32,
        option: u32,
    ) -> Result<Vec<u8>> {
        if option > 1 {
            return Err(Error::Generic(format!(
                "invalid option argument: {}",
                option
            )));
        }
        log::info!(
            "TX-CMD: FlashReadResource [ StartAddr=0x{:08X} | len={} ]",
            start_address,
            byte_count
        );
        let cmd = packet::command(
            CommandTag::FlashReadResource,
            0,
            &[start_address, byte_count, option],
        );
        let timeout = self.cmd_timeout();
        let reported = self.write_cmd(&cmd, timeout)?;
        let length = byte_count.min(reported);
        self.itf()?.read_data(length as usize)
    }

    /// Configure an external memory from a staged configuration block.
    /// CommandTag: 0x11
    pub fn configure_memory(&mut self, memory_id: u32, address: u32) -> Result<()> {
        log::info!(
            "TX-CMD: ConfigureMemory [ memoryId=0x{:08X} | Address=0x{:08X} ]",
            memory_id,
            address
        );
        let cmd = packet::command(
            CommandTag::ConfigureMemory,
            0,
            &[memory_id, address],
        );
        let timeout = self.cmd_timeout();
        self.write_cmd(&cmd, timeout)?;
        Ok(())
    }

    /// Validate the backup application at `address` and copy it over the
    /// main application region. CommandTag: 0x12
    ///
    /// The expected completion status is `ReliableUpdateSuccess`, not the
    /// generic success.
    pub fn reliable_update(&mut self, address: u32) -> Result<()> {
        log::info!("TX-CMD: ReliableUpdate [ Address=0x{:08X} ]", address);
        let cmd =
            packet::command(CommandTag::ReliableUpdate, 0, &[address]);
        let timeout = self.cmd_timeout();
        self.write_cmd_expect(
            &cmd,
            timeout,
            StatusCode::ReliableUpdateSuccess as u32,
        )?;
        Ok(())
    }

    /// Wrap a DEK into a key blob. CommandTag: 0x13
    ///
    /// Two steps: the DEK goes out in a data phase, then a second command
    /// with the option parameter set reads the fixed-size blob back.
    pub fn generate_key_blob(&mut self, dek: &[u8]) -> Result<Vec<u8>> {
        if dek.is_empty() {
            return Err(Error::generic("data length is zero"));
        }
        log::info!("TX-CMD: GenerateKeyBlob [ dekLen={} ]", dek.len());
        let cmd = packet::command(
            CommandTag::GenerateKeyBlob,
            FLAG_HAS_DATA_PHASE,
            &[0, dek.len() as u32, 0],
        );
        let max_packet_size =
            self.get_property(PropertyTag::MaxPacketSize, 0)?;
        let timeout = self.cmd_timeout();
        self.write_cmd(&cmd, timeout)?;
        self.itf()?.write_data(dek, max_packet_size)?;

        let cmd = packet::command(
            CommandTag::GenerateKeyBlob,
            0,
            &[0, KEY_BLOB_LEN, 1],
        );
        self.write_cmd(&cmd, timeout)?;
        self.itf()?.read_data(KEY_BLOB_LEN as usize)
    }

    /// Run one `KeyProvisioning` sub-operation. CommandTag: 0x15
    ///
    /// `ReadKeyStore` returns the key store bytes; every other operation
    /// returns `None`.
    pub fn key_provisioning(
        &mut self,
        operation: KeyProvisioning<'_>,
    ) -> Result<Option<Vec<u8>>> {
        let op = operation.operation();
        log::info!("TX-CMD: KeyProvisioning [ operation={} ]", op.name());
        let timeout = self.cmd_timeout();
        match operation {
            KeyProvisioning::Enroll => {
                let cmd = packet::command(
                    CommandTag::KeyProvisioning,
                    0,
                    &[op as u32],
                );
                self.write_cmd(&cmd, timeout)?;
                Ok(None)
            }
            KeyProvisioning::SetUserKey { key_type, key } => {
                let cmd = packet::command(
                    CommandTag::KeyProvisioning,
                    FLAG_HAS_DATA_PHASE,
                    &[op as u32, key_type, key.len() as u32],
                );
                let max_packet_size =
                    self.get_property(PropertyTag::MaxPacketSize, 0)?;
                self.write_cmd(&cmd, timeout)?;
                self.itf()?.write_data(key, max_packet_size)?;
                Ok(None)
            }
            KeyProvisioning::SetKey { key_type, key_size } => {
                let cmd = packet::command(
                    CommandTag::KeyProvisioning,
                    0,
                    &[op as u32, key_type, key_size],
                );
                self.write_cmd(&cmd, timeout)?;
                Ok(None)
            }
            KeyProvisioning::WriteKeyNonvolatile { memory_id }
            | KeyProvisioning::ReadKeyNonvolatile { memory_id } => {
                let cmd = packet::command(
                    CommandTag::KeyProvisioning,
                    0,
                    &[op as u32, memory_id],
                );
                self.write_cmd(&cmd, timeout)?;
                Ok(None)
            }
            KeyProvisioning::WriteKeyStore { key_store } => {
                let cmd = packet::command(
                    CommandTag::KeyProvisioning,
                    FLAG_HAS_DATA_PHASE,
                    &[op as u32, 0, key_store.len() as u32],
                );
                let max_packet_size =
                    self.get_property(PropertyTag::MaxPacketSize, 0)?;
                self.write_cmd(&cmd, timeout)?;
                self.itf()?.write_data(key_store, max_packet_size)?;
                Ok(None)
            }
            KeyProvisioning::ReadKeyStore => {
                let cmd = packet::command(
                    CommandTag::KeyProvisioning,
                    0,
                    &[op as u32],
                );
                let length = self.write_cmd(&cmd, timeout)?;
                let data = self.itf()?.read_data(length as usize)?;
                Ok(Some(data))
            }
        }
    }

    /// Write a firmware image, optionally erasing the covered sectors
    /// first. CommandTag: 0x16
    ///
    /// The caller supplies the raw image bytes and their load address
    /// (self-describing formats are resolved by the file reader in front
    /// of the engine).
    pub fn flash_image(
        &mut self,
        data: &[u8],
        address: u32,
        erase: EraseMode,
        memory_id: u32,
    ) -> Result<usize> {
        if data.is_empty() {
            return Err(Error::generic("data length is zero"));
        }

        if erase == EraseMode::Erase {
            let sector_size =
                self.get_property(PropertyTag::FlashSectorSize, memory_id)?;
            if sector_size == 0 || !sector_size.is_power_of_two() {
                return Err(Error::Generic(format!(
                    "device reports unusable sector size {}",
                    sector_size
                )));
            }
            let erase_length = Flash::align_up(data.len() as u32, sector_size);
            self.flash_erase_region(address, erase_length, memory_id)?;
        }

        log::info!(
            "TX-CMD: FlashImage [ address=0x{:08X} | len=0x{:X} | memoryId = 0x{:X} ]",
            address,
            data.len(),
            memory_id
        );
        let cmd = packet::command(
            CommandTag::WriteMemory,
            0,
            &[address, data.len() as u32, memory_id],
        );
        let max_packet_size =
            self.get_property(PropertyTag::MaxPacketSize, memory_id)?;
        let timeout = self.cmd_timeout();
        self.write_cmd(&cmd, timeout)?;
        self.itf()?.write_data(data, max_packet_size)
    }
}

impl std::fmt::Debug for McuBoot {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt.debug_struct("McuBoot")
            .field("interface", &self.current_interface)
            .field("cli_mode", &self.cli_mode)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Default serial port settings for MBoot UART targets.
///
/// It's recommended to change only the baudrate; the frame format is the
/// same on all devices.
pub fn port_settings() -> serial::PortSettings {
    serial::PortSettings {
        baud_rate: serial::BaudRate::Baud57600,
        char_size: serial::CharSize::Bits8,
        parity: serial::Parity::ParityNone,
        stop_bits: serial::StopBits::Stop1,
        flow_control: serial::FlowControl::FlowNone,
    }
}

#[cfg(test)]
mod tests {
    use std::{
        cell::RefCell,
        collections::VecDeque,
        rc::Rc,
        time::Duration,
    };

    use super::*;

    #[derive(Default)]
    struct MockState {
        /// (payload, timeout, status_success) per issued command.
        sent: Vec<(Vec<u8>, Duration, u32)>,
        /// Response values handed back per command, in order.
        values: VecDeque<u32>,
        /// Requested inbound data-phase lengths.
        reads: Vec<usize>,
        /// (data, max_packet_size) per outbound data phase.
        written: Vec<(Vec<u8>, u32)>,
        /// Source bytes for inbound data phases.
        read_source: Vec<u8>,
        fail_commands: bool,
    }

    struct MockTransport {
        state: Rc<RefCell<MockState>>,
        last_response: Vec<u8>,
    }

    impl Transport for MockTransport {
        fn ping(&mut self) -> Result<()> {
            Ok(())
        }

        fn write_cmd(
            &mut self,
            payload: &[u8],
            timeout: Duration,
            status_success: u32,
        ) -> Result<u32> {
            let mut state = self.state.borrow_mut();
            state.sent.push((payload.to_vec(), timeout, status_success));
            if state.fail_commands {
                return Err(Error::connection("mock transport failure"));
            }
            Ok(state.values.pop_front().unwrap_or(0))
        }

        fn read_data(&mut self, length: usize) -> Result<Vec<u8>> {
            let mut state = self.state.borrow_mut();
            state.reads.push(length);
            Ok(state.read_source[..length].to_vec())
        }

        fn write_data(
            &mut self,
            data: &[u8],
            max_packet_size: u32,
        ) -> Result<usize> {
            let mut state = self.state.borrow_mut();
            state.written.push((data.to_vec(), max_packet_size));
            Ok(data.len())
        }

        fn last_cmd_response(&self) -> &[u8] {
            &self.last_response
        }

        fn set_progress(&mut self, _progress: Option<Progress>) {}

        fn close(&mut self) {}
    }

    fn engine_with(
        state: Rc<RefCell<MockState>>,
        last_response: Vec<u8>,
    ) -> McuBoot {
        McuBoot {
            itf: Some(Box::new(MockTransport {
                state,
                last_response,
            })),
            current_interface: Some(Interface::Uart),
            reopen_usb: None,
            cli_mode: true,
            timeout: None,
            memory: None,
            flash: None,
        }
    }

    fn engine(state: Rc<RefCell<MockState>>) -> McuBoot {
        engine_with(state, Vec::new())
    }

    #[test]
    fn test_get_property_payload() {
        let state = Rc::new(RefCell::new(MockState::default()));
        state.borrow_mut().values.push_back(0x4B03_0000);
        let mut mcu = engine(state.clone());

        let value = mcu.get_property(PropertyTag::CurrentVersion, 0).unwrap();
        assert_eq!(value, 0x4B03_0000);

        let state = state.borrow();
        let (payload, timeout, status_success) = &state.sent[0];
        assert_eq!(
            payload.as_slice(),
            &[
                0x07, 0x00, 0x00, 0x02, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00,
                0x00, 0x00
            ]
        );
        assert_eq!(*timeout, DEFAULT_TIMEOUT);
        assert_eq!(*status_success, 0);
    }

    #[test]
    fn test_erase_timeouts() {
        let state = Rc::new(RefCell::new(MockState::default()));
        let mut mcu = engine(state.clone());

        mcu.flash_erase_all(0).unwrap();
        assert_eq!(state.borrow().sent[0].1, ERASE_TIMEOUT);
        assert_eq!(
            state.borrow().sent[0].0.as_slice(),
            &[0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00]
        );

        // An explicit override beats the erase default.
        mcu.timeout = Some(Duration::from_secs(10));
        mcu.flash_erase_all_unsecure().unwrap();
        assert_eq!(state.borrow().sent[1].1, Duration::from_secs(10));
    }

    #[test]
    fn test_read_memory() {
        let state = Rc::new(RefCell::new(MockState::default()));
        state.borrow_mut().read_source = vec![0xDE, 0xAD, 0xBE, 0xEF];
        let mut mcu = engine(state.clone());

        assert!(mcu.read_memory(0x2000_0000, 0, 0).is_err());

        let data = mcu.read_memory(0x2000_0000, 4, 0).unwrap();
        assert_eq!(data, [0xDE, 0xAD, 0xBE, 0xEF]);
        let state = state.borrow();
        assert_eq!(
            state.sent[0].0.as_slice(),
            &[
                0x03, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00, 0x20, 0x04, 0x00,
                0x00, 0x00, 0x00, 0x00, 0x00, 0x00
            ]
        );
        assert_eq!(state.reads, [4]);
    }

    #[test]
    fn test_write_memory_fetches_packet_size_first() {
        let state = Rc::new(RefCell::new(MockState::default()));
        state.borrow_mut().values.push_back(32); // MaxPacketSize
        let mut mcu = engine(state.clone());

        let data = vec![0x11u8; 64];
        let written = mcu.write_memory(0x2000_0000, &data, 0).unwrap();
        assert_eq!(written, 64);

        let state = state.borrow();
        // GetProperty(MaxPacketSize) goes out before the WriteMemory
        // command.
        assert_eq!(state.sent[0].0[0], CommandTag::GetProperty as u8);
        assert_eq!(state.sent[0].0[4], PropertyTag::MaxPacketSize as u8);
        assert_eq!(state.sent[1].0[0], CommandTag::WriteMemory as u8);
        assert_eq!(state.written, [(data, 32)]);
    }

    #[test]
    fn test_fill_memory_units() {
        let state = Rc::new(RefCell::new(MockState::default()));
        let mut mcu = engine(state.clone());

        mcu.fill_memory(0x2000_0000, 16, 0xAB, FillUnit::Byte).unwrap();
        mcu.fill_memory(0x2000_0000, 8, 0x1234, FillUnit::Short).unwrap();
        mcu.fill_memory(0x2000_0000, 4, 0xDEAD_BEEF, FillUnit::Word)
            .unwrap();

        {
            let state = state.borrow();
            let word =
                |i: usize| &state.sent[i].0[state.sent[i].0.len() - 4..];
            assert_eq!(word(0), &0xABAB_ABABu32.to_le_bytes());
            assert_eq!(word(1), &0x1234_1234u32.to_le_bytes());
            assert_eq!(word(2), &0xDEAD_BEEFu32.to_le_bytes());
        }

        assert!(mcu
            .fill_memory(0, 4, 0x1_0000, FillUnit::Short)
            .is_err());
        assert!(mcu.fill_memory(0, 4, 0x100, FillUnit::Byte).is_err());
    }

    #[test]
    fn test_flash_security_disable_key_order() {
        let state = Rc::new(RefCell::new(MockState::default()));
        let mut mcu = engine(state.clone());

        mcu.flash_security_disable(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        assert_eq!(
            state.borrow().sent[0].0.as_slice(),
            &[
                0x06, 0x00, 0x00, 0x02, // header
                0x04, 0x03, 0x02, 0x01, // key[3..=0]
                0x08, 0x07, 0x06, 0x05, // key[7..=4]
            ]
        );
    }

    #[test]
    fn test_flash_read_once() {
        // Response carries 0x12345678 at offset 12.
        let last_response = vec![
            0xAF, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00, 0x00, 0x04, 0x00,
            0x00, 0x00, 0x78, 0x56, 0x34, 0x12,
        ];
        let state = Rc::new(RefCell::new(MockState::default()));
        let mut mcu = engine_with(state.clone(), last_response);

        assert_eq!(mcu.flash_read_once(0, 4).unwrap(), 0x1234_5678);
        assert!(mcu.flash_read_once(0, 6).is_err());

        let state = state.borrow();
        assert_eq!(
            state.sent[0].0.as_slice(),
            &[
                0x0F, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00, 0x04, 0x00,
                0x00, 0x00
            ]
        );
    }

    #[test]
    fn test_flash_program_once_checks() {
        let state = Rc::new(RefCell::new(MockState::default()));
        let mut mcu = engine(state.clone());

        assert!(mcu.flash_program_once(0, 6, &[0; 6]).is_err());
        assert!(mcu.flash_program_once(0, 4, &[0; 8]).is_err());

        mcu.flash_program_once(0x10, 4, &[0xAA, 0xBB, 0xCC, 0xDD])
            .unwrap();
        assert_eq!(
            state.borrow().sent[0].0.as_slice(),
            &[
                0x0E, 0x00, 0x00, 0x03, 0x10, 0x00, 0x00, 0x00, 0x04, 0x00,
                0x00, 0x00, 0xAA, 0xBB, 0xCC, 0xDD
            ]
        );
    }

    #[test]
    fn test_reliable_update_success_status() {
        let state = Rc::new(RefCell::new(MockState::default()));
        let mut mcu = engine(state.clone());

        mcu.reliable_update(0x0001_0000).unwrap();
        assert_eq!(
            state.borrow().sent[0].2,
            StatusCode::ReliableUpdateSuccess as u32
        );
    }

    #[test]
    fn test_flash_read_resource_short_read() {
        let state = Rc::new(RefCell::new(MockState::default()));
        {
            let mut state = state.borrow_mut();
            state.values.push_back(2); // device reports two bytes
            state.read_source = vec![0xAA; 8];
        }
        let mut mcu = engine(state.clone());

        let data = mcu.flash_read_resource(0, 8, 1).unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(state.borrow().reads, [2]);

        assert!(mcu.flash_read_resource(0, 8, 2).is_err());
    }

    #[test]
    fn test_receive_sb_file_flags() {
        let state = Rc::new(RefCell::new(MockState::default()));
        state.borrow_mut().values.push_back(32); // MaxPacketSize
        let mut mcu = engine(state.clone());

        let image = vec![0u8; 48];
        mcu.receive_sb_file(&image).unwrap();

        let state = state.borrow();
        // Data-phase flag set, length parameter carried.
        let payload = &state.sent[1].0;
        assert_eq!(payload[0], CommandTag::ReceiveSbFile as u8);
        assert_eq!(payload[1], FLAG_HAS_DATA_PHASE);
        assert_eq!(&payload[4..8], &48u32.to_le_bytes());
    }

    #[test]
    fn test_erase_region_gate() {
        let state = Rc::new(RefCell::new(MockState::default()));
        let mut mcu = engine(state.clone());
        mcu.flash = Some(Flash::new(0, None, Some(0x4_0000), None).unwrap());

        // Inside flash: passes through to the device.
        mcu.flash_erase_region(0x1000, 0x1000, 0).unwrap();
        assert_eq!(state.borrow().sent.len(), 1);

        // Outside flash: rejected before anything is sent.
        assert!(mcu.flash_erase_region(0x10_0000, 0x1000, 0).is_err());
        assert_eq!(state.borrow().sent.len(), 1);

        // External memories are never gated.
        mcu.flash_erase_region(0x10_0000, 0x1000, 9).unwrap();
        assert_eq!(state.borrow().sent.len(), 2);
    }

    #[test]
    fn test_get_memory_range() {
        let state = Rc::new(RefCell::new(MockState::default()));
        {
            let mut values = VecDeque::new();
            values.extend([0x1FFF_0000, 0x1_0000, 0x0000_0000, 0x4_0000]);
            state.borrow_mut().values = values;
        }
        let mut mcu = engine(state);

        mcu.get_memory_range().unwrap();
        assert_eq!(mcu.memory().unwrap().start(), 0x1FFF_0000);
        assert_eq!(mcu.flash().unwrap().region().length(), 0x4_0000);

        let inside = MemoryBlock::with_length(0x1000, 0x100).unwrap();
        assert!(mcu.is_in_flash(&inside));
        let outside = MemoryBlock::with_length(0x10_0000, 0x100).unwrap();
        assert!(!mcu.is_in_flash(&outside));
    }

    #[test]
    fn test_key_provisioning() {
        let state = Rc::new(RefCell::new(MockState::default()));
        {
            let mut state = state.borrow_mut();
            state.values.push_back(0); // enroll
            state.values.push_back(16); // read_key_store length
            state.read_source = vec![0x42; 16];
        }
        let mut mcu = engine(state.clone());

        assert!(mcu
            .key_provisioning(KeyProvisioning::Enroll)
            .unwrap()
            .is_none());
        let key_store = mcu
            .key_provisioning(KeyProvisioning::ReadKeyStore)
            .unwrap()
            .unwrap();
        assert_eq!(key_store.len(), 16);

        let state = state.borrow();
        assert_eq!(
            state.sent[0].0.as_slice(),
            &[0x15, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00]
        );
        assert_eq!(
            state.sent[1].0.as_slice(),
            &[0x15, 0x00, 0x00, 0x01, 0x06, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn test_generate_key_blob() {
        let state = Rc::new(RefCell::new(MockState::default()));
        {
            let mut state = state.borrow_mut();
            state.values.push_back(32); // MaxPacketSize
            state.read_source = vec![0x5Au8; KEY_BLOB_LEN as usize];
        }
        let mut mcu = engine(state.clone());

        let dek = vec![0x13u8; 32];
        let blob = mcu.generate_key_blob(&dek).unwrap();
        assert_eq!(blob.len(), KEY_BLOB_LEN as usize);

        let state = state.borrow();
        // Step one carries the data-phase flag and the DEK length.
        let step_one = &state.sent[1].0;
        assert_eq!(step_one[0], CommandTag::GenerateKeyBlob as u8);
        assert_eq!(step_one[1], FLAG_HAS_DATA_PHASE);
        assert_eq!(&step_one[8..12], &32u32.to_le_bytes());
        // Step two selects the blob read with option 1.
        let step_two = &state.sent[2].0;
        assert_eq!(step_two[1], 0);
        assert_eq!(&step_two[8..12], &KEY_BLOB_LEN.to_le_bytes());
        assert_eq!(&step_two[12..16], &1u32.to_le_bytes());
        assert_eq!(state.written[0].0, dek);
    }

    #[test]
    fn test_reset_swallows_transport_errors() {
        let state = Rc::new(RefCell::new(MockState::default()));
        state.borrow_mut().fail_commands = true;
        let mut mcu = engine(state);

        mcu.reset().unwrap();
    }

    #[test]
    fn test_commands_require_open_transport() {
        let mut mcu = McuBoot::new();
        assert!(!mcu.is_open());
        assert!(matches!(
            mcu.get_property(PropertyTag::CurrentVersion, 0),
            Err(Error::Connection(_))
        ));
        assert!(!mcu.close());
    }
}
