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

//! # Property decoding
//!
//! Per-tag decoders turning the raw `GetProperty` value (and, for the
//! structured properties, the raw response payload) into display text.

use crate::{
    constants::{ext_mem_prop, CommandTag, PropertyTag, StatusCode},
    memorytool::MemoryBlock,
    peripheral::PERIPHERALS,
    util::size_fmt,
};

/// Test bit `command_tag` of the `AvailableCommands` mask.
///
/// Reserved tags above 31 can never be reported available.
pub fn is_command_available(command_tag: u8, property_raw_value: u32) -> bool {
    match 1u32.checked_shl(u32::from(command_tag)) {
        Some(bit) => property_raw_value & bit != 0,
        None => false,
    }
}

/// Words of a structured response payload, skipping the 4-byte header and
/// the status word.
fn response_words(last_cmd_response: &[u8]) -> Vec<u32> {
    last_cmd_response[8.min(last_cmd_response.len())..]
        .chunks_exact(4)
        .map(|word| u32::from_le_bytes([word[0], word[1], word[2], word[3]]))
        .collect()
}

/// Decode a property value for display.
///
/// `last_cmd_response` is the raw payload of the response that carried the
/// value; the structured properties (`ReservedRegions`,
/// `UniqueDeviceIdent`, `ExternalMemoryAttributes`) read their extra words
/// from it.
pub fn decode_property_value(
    property_tag: PropertyTag,
    raw_value: u32,
    last_cmd_response: &[u8],
    memory_id: u32,
) -> String {
    match property_tag {
        PropertyTag::CurrentVersion | PropertyTag::TargetVersion => {
            format!(
                "{}.{}.{}",
                (raw_value >> 16) & 0xFF,
                (raw_value >> 8) & 0xFF,
                raw_value & 0xFF
            )
        }
        PropertyTag::AvailablePeripherals => {
            let names: Vec<&str> = PERIPHERALS
                .iter()
                .filter(|peripheral| peripheral.mask & raw_value != 0)
                .map(|peripheral| peripheral.name)
                .collect();
            names.join(", ")
        }
        PropertyTag::CrcCheckStatus
        | PropertyTag::QspiInitStatus
        | PropertyTag::ReliableUpdateStatus => {
            match StatusCode::from_u32(raw_value) {
                Some(code) => code.name().to_owned(),
                None => {
                    format!("Unknown Status Code: 0x{:08X}", raw_value)
                }
            }
        }
        PropertyTag::VerifyWrites => {
            let state = if raw_value != 0 { "ON" } else { "OFF" };
            state.to_owned()
        }
        PropertyTag::ReservedRegions => {
            let words = response_words(last_cmd_response);
            let mut regions = Vec::new();
            for pair in words.chunks_exact(2) {
                if let Ok(block) = MemoryBlock::from_range(pair[0], pair[1]) {
                    if !block.is_empty() {
                        regions.push(block.to_string());
                    }
                }
            }
            regions.join(", ")
        }
        PropertyTag::UniqueDeviceIdent => {
            let words: Vec<String> = response_words(last_cmd_response)
                .iter()
                .map(|word| format!("{:08X}", word))
                .collect();
            words.join(" ")
        }
        PropertyTag::FlashFacSupport => {
            let support = if raw_value != 0 { "SUPPORTED" } else { "UNSUPPORTED" };
            support.to_owned()
        }
        PropertyTag::FlashSecurityState => match raw_value {
            0x0000_0000 | 0x5AA5_5AA5 => "Unlocked".to_owned(),
            0x0000_0001 | 0xC33C_C33C => "Locked".to_owned(),
            _ => format!("Unknown (0x{:08X})", raw_value),
        },
        PropertyTag::AvailableCommands => {
            let names: Vec<&str> = CommandTag::ALL
                .iter()
                .filter(|tag| is_command_available(**tag as u8, raw_value))
                .map(|tag| tag.name())
                .collect();
            names.join(", ")
        }
        PropertyTag::MaxPacketSize
        | PropertyTag::FlashSectorSize
        | PropertyTag::FlashSize
        | PropertyTag::RamSize
        | PropertyTag::FlashAccessSegmentSize
        | PropertyTag::FlashPageSize => size_fmt(u64::from(raw_value), true),
        PropertyTag::RamStartAddress
        | PropertyTag::FlashStartAddress
        | PropertyTag::SystemDeviceIdent => format!("0x{:08X}", raw_value),
        PropertyTag::FlashAccessSegmentCount
        | PropertyTag::FlashBlockCount
        | PropertyTag::ValidateRegions
        | PropertyTag::ListProperties => format!("0x{:X}", raw_value),
        PropertyTag::FlashReadMargin => {
            let margin = match raw_value {
                0 => Some("Normal"),
                1 => Some("User"),
                2 => Some("Factory"),
                _ => None,
            };
            match margin {
                Some(name) => format!("{} (0x{:X})", name, raw_value),
                None => format!("Unknown (0x{:X})", raw_value),
            }
        }
        PropertyTag::ExternalMemoryAttributes if memory_id != 0 => {
            decode_ext_mem_attributes(last_cmd_response, memory_id)
        }
        PropertyTag::IrqNotifierPin => {
            let pin = raw_value & 0xFF;
            let port = (raw_value >> 8) & 0xFF;
            if raw_value & (1 << 31) != 0 {
                format!(
                    "Irq pin is enabled, using GPIO port[{}], pin[{}]",
                    port, pin
                )
            } else {
                "Irq pin is disabled".to_owned()
            }
        }
        PropertyTag::PfrKeystoreUpdateOpt => {
            let option = match raw_value {
                0 => "Key Provisioning",
                1 => "Write Memory",
                _ => "Unknown Option",
            };
            format!("FFR KeyStore Update is {}", option)
        }
        _ => format!("0x{:X}", raw_value),
    }
}

fn decode_ext_mem_attributes(last_cmd_response: &[u8], memory_id: u32) -> String {
    let words = response_words(last_cmd_response);
    if words.len() < 6 {
        return format!("Memory Id: 0x{:X}", memory_id);
    }
    let (prop_tags, start_address, total_size, page_size, sector_size, block_size) =
        (words[0], words[1], words[2], words[3], words[4], words[5]);

    let mut lines = vec![format!("Memory Id: 0x{:X}", memory_id)];
    if prop_tags & ext_mem_prop::START_ADDRESS != 0 {
        lines.push(format!("Start Address: 0x{:08X}", start_address));
    }
    if prop_tags & ext_mem_prop::SIZE_IN_KBYTES != 0 {
        lines.push(format!(
            "Total Size: {}",
            size_fmt(u64::from(total_size) * 1024, true)
        ));
    }
    if prop_tags & ext_mem_prop::PAGE_SIZE != 0 {
        lines.push(format!("Page Size: {}", size_fmt(page_size.into(), true)));
    }
    if prop_tags & ext_mem_prop::SECTOR_SIZE != 0 {
        lines.push(format!(
            "Sector Size: {}",
            size_fmt(sector_size.into(), true)
        ));
    }
    if prop_tags & ext_mem_prop::BLOCK_SIZE != 0 {
        lines.push(format!("Block Size: {}", size_fmt(block_size.into(), true)));
    }
    lines.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_with_words(words: &[u32]) -> Vec<u8> {
        let mut payload = vec![0xA7, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00];
        for word in words {
            payload.extend_from_slice(&word.to_le_bytes());
        }
        payload
    }

    #[test]
    fn test_version_decode() {
        assert_eq!(
            decode_property_value(PropertyTag::CurrentVersion, 0x4B03_0100, &[], 0),
            "3.1.0"
        );
        assert_eq!(
            decode_property_value(PropertyTag::TargetVersion, 0x0002_0100, &[], 0),
            "2.1.0"
        );
    }

    #[test]
    fn test_security_state_decode() {
        for (value, expected) in [
            (0x0000_0000, "Unlocked"),
            (0x5AA5_5AA5, "Unlocked"),
            (0x0000_0001, "Locked"),
            (0xC33C_C33C, "Locked"),
        ] {
            assert_eq!(
                decode_property_value(
                    PropertyTag::FlashSecurityState,
                    value,
                    &[],
                    0
                ),
                expected
            );
        }
        assert_eq!(
            decode_property_value(PropertyTag::FlashSecurityState, 0x1234, &[], 0),
            "Unknown (0x00001234)"
        );
    }

    #[test]
    fn test_available_commands_bits() {
        let mask = (1 << CommandTag::ReadMemory as u8)
            | (1 << CommandTag::WriteMemory as u8)
            | (1 << CommandTag::Reset as u8);
        assert!(is_command_available(CommandTag::ReadMemory as u8, mask));
        assert!(!is_command_available(CommandTag::FillMemory as u8, mask));
        // Reserved tags above bit 31 never match.
        assert!(!is_command_available(0xC1, u32::MAX));

        assert_eq!(
            decode_property_value(PropertyTag::AvailableCommands, mask, &[], 0),
            "ReadMemory, WriteMemory, Reset"
        );
    }

    #[test]
    fn test_available_peripherals() {
        assert_eq!(
            decode_property_value(
                PropertyTag::AvailablePeripherals,
                0x0000_0011,
                &[],
                0
            ),
            "UART, USB-HID"
        );
    }

    #[test]
    fn test_size_and_address_decode() {
        assert_eq!(
            decode_property_value(PropertyTag::MaxPacketSize, 32, &[], 0),
            "32.0 B"
        );
        assert_eq!(
            decode_property_value(PropertyTag::FlashSize, 0x4_0000, &[], 0),
            "256.0 kiB"
        );
        assert_eq!(
            decode_property_value(
                PropertyTag::FlashStartAddress,
                0x2000_0000,
                &[],
                0
            ),
            "0x20000000"
        );
    }

    #[test]
    fn test_reserved_regions_decode() {
        let response = response_with_words(&[
            0x1FFF_F000, 0x2000_0000, // one region
            0x0000_0000, 0x0000_0000, // empty, skipped
        ]);
        let decoded = decode_property_value(
            PropertyTag::ReservedRegions,
            0,
            &response,
            0,
        );
        assert_eq!(
            decoded,
            "start:0x1ffff000 end:0x20000000 length:0x00001000"
        );
    }

    #[test]
    fn test_unique_device_ident_decode() {
        let response = response_with_words(&[0xDEAD_BEEF, 0x0000_0042]);
        assert_eq!(
            decode_property_value(
                PropertyTag::UniqueDeviceIdent,
                0,
                &response,
                0
            ),
            "DEADBEEF 00000042"
        );
    }

    #[test]
    fn test_ext_mem_attributes_decode() {
        let flags = ext_mem_prop::START_ADDRESS
            | ext_mem_prop::SIZE_IN_KBYTES
            | ext_mem_prop::SECTOR_SIZE;
        let response = response_with_words(&[
            flags, 0x6000_0000, 8192, 256, 0x1000, 0x10000,
        ]);
        let decoded = decode_property_value(
            PropertyTag::ExternalMemoryAttributes,
            0,
            &response,
            9,
        );
        assert_eq!(
            decoded,
            "Memory Id: 0x9, Start Address: 0x60000000, Total Size: 8.0 MiB, \
             Sector Size: 4.0 kiB"
        );
    }

    #[test]
    fn test_irq_pin_decode() {
        assert_eq!(
            decode_property_value(
                PropertyTag::IrqNotifierPin,
                0x8000_0203,
                &[],
                0
            ),
            "Irq pin is enabled, using GPIO port[2], pin[3]"
        );
        assert_eq!(
            decode_property_value(PropertyTag::IrqNotifierPin, 0x0203, &[], 0),
            "Irq pin is disabled"
        );
    }
}
