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

//! # Framing and command packet codec
//!
//! The serial transports wrap every command and data payload into a
//! framing packet:
//!
//! ```text
//! [0x5A] [type] [length:u16le] [crc:u16le] [payload ...]
//! ```
//!
//! The CRC is CRC-16/XMODEM over the first four header bytes plus the
//! payload (the CRC field itself is excluded). ACK, NACK, ABORT and PING
//! travel as the bare two-byte form `[0x5A, type]` without length or CRC.

use crate::{
    constants::CommandTag,
    crc::crc16,
    error::{DataMode, Error, Result},
};

/// Start byte of every framing packet.
pub const FRAME_START_BYTE: u8 = 0x5A;

/// Length of a full framing packet header, start byte included.
pub const FRAME_HEADER_LEN: usize = 6;

/// Command flag bit 0: a data phase follows this command.
pub const FLAG_HAS_DATA_PHASE: u8 = 0x01;

/// Framing packet types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FpType {
    Ack = 0xA1,
    Nack = 0xA2,
    Abort = 0xA3,
    Cmd = 0xA4,
    Data = 0xA5,
    Ping = 0xA6,
    PingResponse = 0xA7,
}

impl FpType {
    pub fn from_u8(value: u8) -> Option<FpType> {
        match value {
            0xA1 => Some(FpType::Ack),
            0xA2 => Some(FpType::Nack),
            0xA3 => Some(FpType::Abort),
            0xA4 => Some(FpType::Cmd),
            0xA5 => Some(FpType::Data),
            0xA6 => Some(FpType::Ping),
            0xA7 => Some(FpType::PingResponse),
            _ => None,
        }
    }
}

/// Encode a full framing packet around `payload`.
pub fn encode(packet_type: FpType, payload: &[u8]) -> Vec<u8> {
    let mut packet = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
    packet.push(FRAME_START_BYTE);
    packet.push(packet_type as u8);
    packet.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    let crc = crc16(payload, crc16(&packet, 0));
    packet.extend_from_slice(&crc.to_le_bytes());
    packet.extend_from_slice(payload);
    packet
}

/// Parsed framing packet header.
#[derive(Debug, Clone, Copy)]
pub struct FrameHeader {
    pub packet_type: u8,
    pub length: u16,
    pub crc: u16,
}

/// Parse the six header bytes of a full framing packet.
pub fn parse_header(head: &[u8; FRAME_HEADER_LEN]) -> Result<FrameHeader> {
    if head[0] != FRAME_START_BYTE {
        return Err(Error::generic(format!(
            "invalid framing start byte {:#04x}",
            head[0]
        )));
    }
    Ok(FrameHeader {
        packet_type: head[1],
        length: u16::from_le_bytes([head[2], head[3]]),
        crc: u16::from_le_bytes([head[4], head[5]]),
    })
}

/// Verify the CRC of a received framing packet.
pub fn check_crc(head: &[u8; FRAME_HEADER_LEN], payload: &[u8]) -> bool {
    let header = u16::from_le_bytes([head[4], head[5]]);
    crc16(payload, crc16(&head[..4], 0)) == header
}

/// Decode a framing packet from its header and payload, validating the
/// start byte and CRC.
pub fn decode<'d>(
    head: &[u8; FRAME_HEADER_LEN],
    payload: &'d [u8],
) -> Result<(FpType, &'d [u8])> {
    let header = parse_header(head)?;
    let packet_type = FpType::from_u8(header.packet_type).ok_or_else(|| {
        Error::generic(format!(
            "unknown framing packet type {:#04x}",
            header.packet_type
        ))
    })?;
    if payload.len() != usize::from(header.length) {
        return Err(Error::generic(format!(
            "framing length mismatch: header says {}, payload is {}",
            header.length,
            payload.len()
        )));
    }
    if !check_crc(head, payload) {
        return Err(Error::data(
            DataMode::Read,
            crate::constants::StatusCode::InvalidCrc as u32,
        ));
    }
    Ok((packet_type, payload))
}

/// Protocol version reported by the ping response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolVersion {
    pub bugfix: u8,
    pub minor: u8,
    pub major: u8,
    /// Protocol name mark, `'P'` on current ROMs.
    pub name: u8,
}

/// Decoded `PingResponse` framing packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingResponse {
    pub version: ProtocolVersion,
    pub options: u16,
}

impl PingResponse {
    /// On-wire size of a ping response, start byte included.
    pub const LEN: usize = 10;

    /// Parse the ten raw bytes of a ping response, checking start byte,
    /// packet type and CRC.
    pub fn parse(raw: &[u8; PingResponse::LEN]) -> Result<PingResponse> {
        if raw[0] != FRAME_START_BYTE {
            return Err(Error::generic(format!(
                "invalid ping response start byte {:#04x}",
                raw[0]
            )));
        }
        if raw[1] != FpType::PingResponse as u8 {
            return Err(Error::generic(format!(
                "expected ping response, got packet type {:#04x}",
                raw[1]
            )));
        }
        let crc = u16::from_le_bytes([raw[8], raw[9]]);
        if crc16(&raw[..8], 0) != crc {
            return Err(Error::data(
                DataMode::Read,
                crate::constants::StatusCode::InvalidCrc as u32,
            ));
        }
        Ok(PingResponse {
            version: ProtocolVersion {
                bugfix: raw[2],
                minor: raw[3],
                major: raw[4],
                name: raw[5],
            },
            options: u16::from_le_bytes([raw[6], raw[7]]),
        })
    }
}

/// Build a command packet payload: tag, flags, reserved byte and the
/// little-endian u32 parameters.
pub fn command(tag: CommandTag, flags: u8, params: &[u32]) -> Vec<u8> {
    command_raw(tag, flags, params.len() as u8, params)
}

/// Like [`command`], with an explicit `parameter_count` for the commands
/// that append raw bytes after the u32 parameters.
pub fn command_raw(
    tag: CommandTag,
    flags: u8,
    parameter_count: u8,
    params: &[u32],
) -> Vec<u8> {
    let mut payload = Vec::with_capacity(4 + params.len() * 4);
    payload.push(tag as u8);
    payload.push(flags);
    payload.push(0x00);
    payload.push(parameter_count);
    for param in params {
        payload.extend_from_slice(&param.to_le_bytes());
    }
    payload
}

/// Parse a command response payload into `(status, value)`.
///
/// The status word sits at offset 4; the first value word at offset 8 is
/// zero when the response carries none.
pub fn parse_response(payload: &[u8]) -> Result<(u32, u32)> {
    if payload.len() < 8 {
        return Err(Error::generic(format!(
            "short command response ({} bytes)",
            payload.len()
        )));
    }
    let status = u32::from_le_bytes([
        payload[4], payload[5], payload[6], payload[7],
    ]);
    let value = if payload.len() >= 12 {
        u32::from_le_bytes([payload[8], payload[9], payload[10], payload[11]])
    } else {
        0
    };
    Ok((status, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_get_property() {
        let payload = command(CommandTag::GetProperty, 0, &[0x01, 0x00]);
        let packet = encode(FpType::Cmd, &payload);
        assert_eq!(
            packet,
            [
                0x5A, 0xA4, 0x0C, 0x00, 0x4B, 0x33, 0x07, 0x00, 0x00, 0x02,
                0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00
            ]
        );
    }

    #[test]
    fn test_roundtrip() {
        let payload = command(
            CommandTag::FlashEraseRegion,
            0,
            &[0x2000_0000, 0x1000, 0],
        );
        let packet = encode(FpType::Cmd, &payload);
        let mut head = [0u8; FRAME_HEADER_LEN];
        head.copy_from_slice(&packet[..FRAME_HEADER_LEN]);
        let (packet_type, decoded) =
            decode(&head, &packet[FRAME_HEADER_LEN..]).unwrap();
        assert_eq!(packet_type, FpType::Cmd);
        assert_eq!(decoded, payload.as_slice());
    }

    #[test]
    fn test_decode_rejects_bad_crc() {
        let packet = encode(FpType::Data, &[0xDE, 0xAD, 0xBE, 0xEF]);
        let mut head = [0u8; FRAME_HEADER_LEN];
        head.copy_from_slice(&packet[..FRAME_HEADER_LEN]);
        let mut payload = packet[FRAME_HEADER_LEN..].to_vec();
        payload[0] ^= 0xFF;
        assert!(decode(&head, &payload).is_err());
    }

    #[test]
    fn test_decode_rejects_bad_start_byte() {
        let head = [0x00, 0xA4, 0x00, 0x00, 0x00, 0x00];
        assert!(decode(&head, &[]).is_err());
    }

    #[test]
    fn test_ping_response_parse() {
        let raw = [0x5A, 0xA7, 0x00, 0x03, 0x01, 0x50, 0x00, 0x00, 0xFB, 0x40];
        let response = PingResponse::parse(&raw).unwrap();
        assert_eq!(
            response,
            PingResponse {
                version: ProtocolVersion {
                    bugfix: 0,
                    minor: 3,
                    major: 1,
                    name: b'P',
                },
                options: 0,
            }
        );

        let mut corrupted = raw;
        corrupted[3] = 0x04;
        assert!(PingResponse::parse(&corrupted).is_err());
    }

    #[test]
    fn test_parse_response() {
        // GetProperty response: status 0, value 0x4B030000.
        let payload = [
            0xA7, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x03, 0x4B,
        ];
        assert_eq!(parse_response(&payload).unwrap(), (0, 0x4B03_0000));

        // Status-only response.
        let payload = [0xA0, 0x00, 0x00, 0x01, 0x65, 0x00, 0x00, 0x00];
        assert_eq!(parse_response(&payload).unwrap(), (101, 0));

        assert!(parse_response(&[0xA0, 0x00, 0x00]).is_err());
    }

    #[test]
    fn test_command_raw_count() {
        // FlashProgramOnce packs two u32 params but declares three.
        let payload =
            command_raw(CommandTag::FlashProgramOnce, 0, 3, &[0x10, 4]);
        assert_eq!(payload[..4], [0x0E, 0x00, 0x00, 0x03]);
        assert_eq!(payload.len(), 12);
    }
}
