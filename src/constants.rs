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

//! # Protocol tables
//!
//! Numeric command, property and status tables of the MBoot ROM. The
//! numbers are fixed by the bootloader; the names are only used for
//! logging and user-visible output.

/// MBoot command tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandTag {
    FlashEraseAll = 0x01,
    FlashEraseRegion = 0x02,
    ReadMemory = 0x03,
    WriteMemory = 0x04,
    FillMemory = 0x05,
    FlashSecurityDisable = 0x06,
    GetProperty = 0x07,
    ReceiveSbFile = 0x08,
    Execute = 0x09,
    Call = 0x0A,
    Reset = 0x0B,
    SetProperty = 0x0C,
    FlashEraseAllUnsecure = 0x0D,
    FlashProgramOnce = 0x0E,
    FlashReadOnce = 0x0F,
    FlashReadResource = 0x10,
    ConfigureMemory = 0x11,
    ReliableUpdate = 0x12,
    GenerateKeyBlob = 0x13,
    KeyProvisioning = 0x15,
    FlashImage = 0x16,
    // Reserved commands.
    ConfigureI2c = 0xC1,
    ConfigureSpi = 0xC2,
    ConfigureCan = 0xC3,
}

impl CommandTag {
    /// Every known command tag, in numeric order.
    pub const ALL: &'static [CommandTag] = &[
        CommandTag::FlashEraseAll,
        CommandTag::FlashEraseRegion,
        CommandTag::ReadMemory,
        CommandTag::WriteMemory,
        CommandTag::FillMemory,
        CommandTag::FlashSecurityDisable,
        CommandTag::GetProperty,
        CommandTag::ReceiveSbFile,
        CommandTag::Execute,
        CommandTag::Call,
        CommandTag::Reset,
        CommandTag::SetProperty,
        CommandTag::FlashEraseAllUnsecure,
        CommandTag::FlashProgramOnce,
        CommandTag::FlashReadOnce,
        CommandTag::FlashReadResource,
        CommandTag::ConfigureMemory,
        CommandTag::ReliableUpdate,
        CommandTag::GenerateKeyBlob,
        CommandTag::KeyProvisioning,
        CommandTag::FlashImage,
        CommandTag::ConfigureI2c,
        CommandTag::ConfigureSpi,
        CommandTag::ConfigureCan,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CommandTag::FlashEraseAll => "FlashEraseAll",
            CommandTag::FlashEraseRegion => "FlashEraseRegion",
            CommandTag::ReadMemory => "ReadMemory",
            CommandTag::WriteMemory => "WriteMemory",
            CommandTag::FillMemory => "FillMemory",
            CommandTag::FlashSecurityDisable => "FlashSecurityDisable",
            CommandTag::GetProperty => "GetProperty",
            CommandTag::ReceiveSbFile => "ReceiveSBFile",
            CommandTag::Execute => "Execute",
            CommandTag::Call => "Call",
            CommandTag::Reset => "Reset",
            CommandTag::SetProperty => "SetProperty",
            CommandTag::FlashEraseAllUnsecure => "FlashEraseAllUnsecure",
            CommandTag::FlashProgramOnce => "FlashProgramOnce",
            CommandTag::FlashReadOnce => "FlashReadOnce",
            CommandTag::FlashReadResource => "FlashReadResource",
            CommandTag::ConfigureMemory => "ConfigureMemory",
            CommandTag::ReliableUpdate => "ReliableUpdate",
            CommandTag::GenerateKeyBlob => "GenerateKeyBlob",
            CommandTag::KeyProvisioning => "KeyProvisioning",
            CommandTag::FlashImage => "FlashImage",
            CommandTag::ConfigureI2c => "ConfigureI2c",
            CommandTag::ConfigureSpi => "ConfigureSpi",
            CommandTag::ConfigureCan => "ConfigureCan",
        }
    }

    pub fn from_u8(value: u8) -> Option<CommandTag> {
        CommandTag::ALL.iter().copied().find(|t| *t as u8 == value)
    }
}

/// MBoot property tags, readable with `GetProperty` and partially
/// writable with `SetProperty`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PropertyTag {
    ListProperties = 0x00,
    CurrentVersion = 0x01,
    AvailablePeripherals = 0x02,
    FlashStartAddress = 0x03,
    FlashSize = 0x04,
    FlashSectorSize = 0x05,
    FlashBlockCount = 0x06,
    AvailableCommands = 0x07,
    CrcCheckStatus = 0x08,
    VerifyWrites = 0x0A,
    MaxPacketSize = 0x0B,
    ReservedRegions = 0x0C,
    ValidateRegions = 0x0D,
    RamStartAddress = 0x0E,
    RamSize = 0x0F,
    SystemDeviceIdent = 0x10,
    FlashSecurityState = 0x11,
    UniqueDeviceIdent = 0x12,
    FlashFacSupport = 0x13,
    FlashAccessSegmentSize = 0x14,
    FlashAccessSegmentCount = 0x15,
    FlashReadMargin = 0x16,
    QspiInitStatus = 0x17,
    TargetVersion = 0x18,
    ExternalMemoryAttributes = 0x19,
    ReliableUpdateStatus = 0x1A,
    FlashPageSize = 0x1B,
    IrqNotifierPin = 0x1C,
    PfrKeystoreUpdateOpt = 0x1D,
}

impl PropertyTag {
    /// Every known property tag, in numeric order. `get_mcu_info`
    /// iterates this list.
    pub const ALL: &'static [PropertyTag] = &[
        PropertyTag::ListProperties,
        PropertyTag::CurrentVersion,
        PropertyTag::AvailablePeripherals,
        PropertyTag::FlashStartAddress,
        PropertyTag::FlashSize,
        PropertyTag::FlashSectorSize,
        PropertyTag::FlashBlockCount,
        PropertyTag::AvailableCommands,
        PropertyTag::CrcCheckStatus,
        PropertyTag::VerifyWrites,
        PropertyTag::MaxPacketSize,
        PropertyTag::ReservedRegions,
        PropertyTag::ValidateRegions,
        PropertyTag::RamStartAddress,
        PropertyTag::RamSize,
        PropertyTag::SystemDeviceIdent,
        PropertyTag::FlashSecurityState,
        PropertyTag::UniqueDeviceIdent,
        PropertyTag::FlashFacSupport,
        PropertyTag::FlashAccessSegmentSize,
        PropertyTag::FlashAccessSegmentCount,
        PropertyTag::FlashReadMargin,
        PropertyTag::QspiInitStatus,
        PropertyTag::TargetVersion,
        PropertyTag::ExternalMemoryAttributes,
        PropertyTag::ReliableUpdateStatus,
        PropertyTag::FlashPageSize,
        PropertyTag::IrqNotifierPin,
        PropertyTag::PfrKeystoreUpdateOpt,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PropertyTag::ListProperties => "ListProperties",
            PropertyTag::CurrentVersion => "CurrentVersion",
            PropertyTag::AvailablePeripherals => "AvailablePeripherals",
            PropertyTag::FlashStartAddress => "FlashStartAddress",
            PropertyTag::FlashSize => "FlashSize",
            PropertyTag::FlashSectorSize => "FlashSectorSize",
            PropertyTag::FlashBlockCount => "FlashBlockCount",
            PropertyTag::AvailableCommands => "AvailableCommands",
            PropertyTag::CrcCheckStatus => "CrcCheckStatus",
            PropertyTag::VerifyWrites => "VerifyWrites",
            PropertyTag::MaxPacketSize => "MaxPacketSize",
            PropertyTag::ReservedRegions => "ReservedRegions",
            PropertyTag::ValidateRegions => "ValidateRegions",
            PropertyTag::RamStartAddress => "RAMStartAddress",
            PropertyTag::RamSize => "RAMSize",
            PropertyTag::SystemDeviceIdent => "SystemDeviceIdent",
            PropertyTag::FlashSecurityState => "FlashSecurityState",
            PropertyTag::UniqueDeviceIdent => "UniqueDeviceIdent",
            PropertyTag::FlashFacSupport => "FlashFacSupport",
            PropertyTag::FlashAccessSegmentSize => "FlashAccessSegmentSize",
            PropertyTag::FlashAccessSegmentCount => "FlashAccessSegmentCount",
            PropertyTag::FlashReadMargin => "FlashReadMargin",
            PropertyTag::QspiInitStatus => "QspiInitStatus",
            PropertyTag::TargetVersion => "TargetVersion",
            PropertyTag::ExternalMemoryAttributes => "ExternalMemoryAttributes",
            PropertyTag::ReliableUpdateStatus => "ReliableUpdateStatus",
            PropertyTag::FlashPageSize => "FlashPageSize",
            PropertyTag::IrqNotifierPin => "IrqNotifierPin",
            PropertyTag::PfrKeystoreUpdateOpt => "PfrKeystoreUpdateOpt",
        }
    }

    pub fn from_u8(value: u8) -> Option<PropertyTag> {
        PropertyTag::ALL.iter().copied().find(|t| *t as u8 == value)
    }
}

/// MBoot status codes.
///
/// Group ranges: 0-99 generic, 100-199 flash driver, 200-299 I2C,
/// 300-399 SPI, 400-499 QSPI, 500-599 OTFAD, 10000-10599
/// bootloader/SB/packetizer/property/CRC, 10600 reliable update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum StatusCode {
    Success = 0,
    Fail = 1,
    ReadOnly = 2,
    OutOfRange = 3,
    InvalidArgument = 4,
    Timeout = 5,
    NoTransferInProgress = 6,

    // Flash driver errors.
    FlashSizeError = 100,
    FlashAlignmentError = 101,
    FlashAddressError = 102,
    FlashAccessError = 103,
    FlashProtectionViolation = 104,
    FlashCommandFailure = 105,
    FlashUnknownProperty = 106,
    FlashRegionExecuteOnly = 108,
    FlashExecuteInRamNotReady = 109,
    FlashCommandNotSupported = 111,
    FlashOutOfDateCfpaPage = 132,

    // I2C driver errors.
    I2cSlaveTxUnderrun = 200,
    I2cSlaveRxOverrun = 201,
    I2cArbitrationLost = 202,

    // SPI driver errors.
    SpiSlaveTxUnderrun = 300,
    SpiSlaveRxOverrun = 301,

    // QuadSPI driver errors.
    QspiFlashSizeError = 400,
    QspiFlashAlignmentError = 401,
    QspiFlashAddressError = 402,
    QspiFlashCommandFailure = 403,
    QspiFlashUnknownProperty = 404,
    QspiNotConfigured = 405,
    QspiCommandNotSupported = 406,
    QspiCommandTimeout = 407,
    QspiWriteFailure = 408,

    // OTFAD driver errors.
    OtfadSecurityViolation = 500,
    OtfadLogicallyDisabled = 501,
    OtfadInvalidKey = 502,
    OtfadInvalidKeyBlob = 503,

    // Bootloader errors.
    UnknownCommand = 10000,
    SecurityViolation = 10001,
    AbortDataPhase = 10002,
    PingError = 10003,
    NoResponse = 10004,
    NoResponseExpected = 10005,
    UnsupportedCommand = 10006,

    // SB loader errors.
    RomLdrSectionOverrun = 10100,
    RomLdrSignature = 10101,
    RomLdrSectionLength = 10102,
    RomLdrUnencryptedOnly = 10103,
    RomLdrEofReached = 10104,
    RomLdrChecksum = 10105,
    RomLdrCrc32Error = 10106,
    RomLdrUnknownCommand = 10107,
    RomLdrIdNotFound = 10108,
    RomLdrDataUnderrun = 10109,
    RomLdrJumpReturned = 10110,
    RomLdrCallFailed = 10111,
    RomLdrKeyNotFound = 10112,
    RomLdrSecureOnly = 10113,
    RomLdrResetReturned = 10114,
    RomLdrRollbackBlocked = 10115,
    RomLdrInvalidSectionMacCount = 10116,
    RomLdrUnexpectedCommand = 10117,

    // Memory interface errors.
    MemoryRangeInvalid = 10200,
    MemoryReadFailed = 10201,
    MemoryWriteFailed = 10202,
    MemoryCumulativeWrite = 10203,
    MemoryAppOverlapWithExecuteOnlyRegion = 10204,
    MemoryNotConfigured = 10205,
    MemoryAlignmentError = 10206,
    MemoryVerifyFailed = 10207,
    MemoryWriteProtected = 10208,
    MemoryAddressError = 10209,
    MemoryBlankCheckFailed = 10210,
    MemoryBlankPageReadDisallowed = 10211,
    MemoryProtectedPageReadDisallowed = 10212,
    MemoryFfrSpecRegionWriteBroken = 10213,
    MemoryUnsupportedCommand = 10214,

    // Property store errors.
    UnknownProperty = 10300,
    ReadOnlyProperty = 10301,
    InvalidPropertyValue = 10302,

    // Application CRC check statuses.
    AppCrcCheckPassed = 10400,
    AppCrcCheckFailed = 10401,
    AppCrcCheckInactive = 10402,
    AppCrcCheckInvalid = 10403,
    AppCrcCheckOutOfRange = 10404,

    // Packetizer errors.
    NoPingResponse = 10500,
    InvalidPacketType = 10501,
    InvalidCrc = 10502,
    NoCommandResponse = 10503,

    // Reliable update statuses.
    ReliableUpdateSuccess = 10600,
}

impl StatusCode {
    pub fn from_u32(value: u32) -> Option<StatusCode> {
        use self::StatusCode::*;
        let code = match value {
            0 => Success,
            1 => Fail,
            2 => ReadOnly,
            3 => OutOfRange,
            4 => InvalidArgument,
            5 => Timeout,
            6 => NoTransferInProgress,
            100 => FlashSizeError,
            101 => FlashAlignmentError,
            102 => FlashAddressError,
            103 => FlashAccessError,
            104 => FlashProtectionViolation,
            105 => FlashCommandFailure,
            106 => FlashUnknownProperty,
            108 => FlashRegionExecuteOnly,
            109 => FlashExecuteInRamNotReady,
            111 => FlashCommandNotSupported,
            132 => FlashOutOfDateCfpaPage,
            200 => I2cSlaveTxUnderrun,
            201 => I2cSlaveRxOverrun,
            202 => I2cArbitrationLost,
            300 => SpiSlaveTxUnderrun,
            301 => SpiSlaveRxOverrun,
            400 => QspiFlashSizeError,
            401 => QspiFlashAlignmentError,
            402 => QspiFlashAddressError,
            403 => QspiFlashCommandFailure,
            404 => QspiFlashUnknownProperty,
            405 => QspiNotConfigured,
            406 => QspiCommandNotSupported,
            407 => QspiCommandTimeout,
            408 => QspiWriteFailure,
            500 => OtfadSecurityViolation,
            501 => OtfadLogicallyDisabled,
            502 => OtfadInvalidKey,
            503 => OtfadInvalidKeyBlob,
            10000 => UnknownCommand,
            10001 => SecurityViolation,
            10002 => AbortDataPhase,
            10003 => PingError,
            10004 => NoResponse,
            10005 => NoResponseExpected,
            10006 => UnsupportedCommand,
            10100 => RomLdrSectionOverrun,
            10101 => RomLdrSignature,
            10102 => RomLdrSectionLength,
            10103 => RomLdrUnencryptedOnly,
            10104 => RomLdrEofReached,
            10105 => RomLdrChecksum,
            10106 => RomLdrCrc32Error,
            10107 => RomLdrUnknownCommand,
            10108 => RomLdrIdNotFound,
            10109 => RomLdrDataUnderrun,
            10110 => RomLdrJumpReturned,
            10111 => RomLdrCallFailed,
            10112 => RomLdrKeyNotFound,
            10113 => RomLdrSecureOnly,
            10114 => RomLdrResetReturned,
            10115 => RomLdrRollbackBlocked,
            10116 => RomLdrInvalidSectionMacCount,
            10117 => RomLdrUnexpectedCommand,
            10200 => MemoryRangeInvalid,
            10201 => MemoryReadFailed,
            10202 => MemoryWriteFailed,
            10203 => MemoryCumulativeWrite,
            10204 => MemoryAppOverlapWithExecuteOnlyRegion,
            10205 => MemoryNotConfigured,
            10206 => MemoryAlignmentError,
            10207 => MemoryVerifyFailed,
            10208 => MemoryWriteProtected,
            10209 => MemoryAddressError,
            10210 => MemoryBlankCheckFailed,
            10211 => MemoryBlankPageReadDisallowed,
            10212 => MemoryProtectedPageReadDisallowed,
            10213 => MemoryFfrSpecRegionWriteBroken,
            10214 => MemoryUnsupportedCommand,
            10300 => UnknownProperty,
            10301 => ReadOnlyProperty,
            10302 => InvalidPropertyValue,
            10400 => AppCrcCheckPassed,
            10401 => AppCrcCheckFailed,
            10402 => AppCrcCheckInactive,
            10403 => AppCrcCheckInvalid,
            10404 => AppCrcCheckOutOfRange,
            10500 => NoPingResponse,
            10501 => InvalidPacketType,
            10502 => InvalidCrc,
            10503 => NoCommandResponse,
            10600 => ReliableUpdateSuccess,
            _ => return None,
        };
        Some(code)
    }

    pub fn name(self) -> &'static str {
        use self::StatusCode::*;
        match self {
            Success => "Success",
            Fail => "Fail",
            ReadOnly => "ReadOnly",
            OutOfRange => "OutOfRange",
            InvalidArgument => "InvalidArgument",
            Timeout => "Timeout",
            NoTransferInProgress => "NoTransferInProgress",
            FlashSizeError => "FlashSizeError",
            FlashAlignmentError => "FlashAlignmentError",
            FlashAddressError => "FlashAddressError",
            FlashAccessError => "FlashAccessError",
            FlashProtectionViolation => "FlashProtectionViolation",
            FlashCommandFailure => "FlashCommandFailure",
            FlashUnknownProperty => "FlashUnknownProperty",
            FlashRegionExecuteOnly => "FlashRegionExecuteOnly",
            FlashExecuteInRamNotReady => "FlashExecuteInRamFunctionNotReady",
            FlashCommandNotSupported => "FlashCommandNotSupported",
            FlashOutOfDateCfpaPage => "FlashOutOfDateCfpaPage",
            I2cSlaveTxUnderrun => "I2cSlaveTxUnderrun",
            I2cSlaveRxOverrun => "I2cSlaveRxOverrun",
            I2cArbitrationLost => "I2cArbitrationLost",
            SpiSlaveTxUnderrun => "SpiSlaveTxUnderrun",
            SpiSlaveRxOverrun => "SpiSlaveRxOverrun",
            QspiFlashSizeError => "QspiFlashSizeError",
            QspiFlashAlignmentError => "QspiFlashAlignmentError",
            QspiFlashAddressError => "QspiFlashAddressError",
            QspiFlashCommandFailure => "QspiFlashCommandFailure",
            QspiFlashUnknownProperty => "QspiFlashUnknownProperty",
            QspiNotConfigured => "QspiNotConfigured",
            QspiCommandNotSupported => "QspiCommandNotSupported",
            QspiCommandTimeout => "QspiCommandTimeout",
            QspiWriteFailure => "QspiWriteFailure",
            OtfadSecurityViolation => "OtfadSecurityViolation",
            OtfadLogicallyDisabled => "OtfadLogicallyDisabled",
            OtfadInvalidKey => "OtfadInvalidKey",
            OtfadInvalidKeyBlob => "OtfadInvalidKeyBlob",
            UnknownCommand => "UnknownCommand",
            SecurityViolation => "SecurityViolation",
            AbortDataPhase => "AbortDataPhase",
            PingError => "PingError",
            NoResponse => "NoResponse",
            NoResponseExpected => "NoResponseExpected",
            UnsupportedCommand => "UnsupportedCommand",
            RomLdrSectionOverrun => "RomLdrSectionOverrun",
            RomLdrSignature => "RomLdrSignature",
            RomLdrSectionLength => "RomLdrSectionLength",
            RomLdrUnencryptedOnly => "RomLdrUnencryptedOnly",
            RomLdrEofReached => "RomLdrEOFReached",
            RomLdrChecksum => "RomLdrChecksum",
            RomLdrCrc32Error => "RomLdrCrc32Error",
            RomLdrUnknownCommand => "RomLdrUnknownCommand",
            RomLdrIdNotFound => "RomLdrIdNotFound",
            RomLdrDataUnderrun => "RomLdrDataUnderrun",
            RomLdrJumpReturned => "RomLdrJumpReturned",
            RomLdrCallFailed => "RomLdrCallFailed",
            RomLdrKeyNotFound => "RomLdrKeyNotFound",
            RomLdrSecureOnly => "RomLdrSecureOnly",
            RomLdrResetReturned => "RomLdrResetReturned",
            RomLdrRollbackBlocked => "RomLdrRollbackBlocked",
            RomLdrInvalidSectionMacCount => "RomLdrInvalidSectionMacCount",
            RomLdrUnexpectedCommand => "RomLdrUnexpectedCommand",
            MemoryRangeInvalid => "MemoryRangeInvalid",
            MemoryReadFailed => "MemoryReadFailed",
            MemoryWriteFailed => "MemoryWriteFailed",
            MemoryCumulativeWrite => "MemoryCumulativeWrite",
            MemoryAppOverlapWithExecuteOnlyRegion => {
                "MemoryAppOverlapWithExecuteOnlyRegion"
            }
            MemoryNotConfigured => "MemoryNotConfigured",
            MemoryAlignmentError => "MemoryAlignmentError",
            MemoryVerifyFailed => "MemoryVerifyFailed",
            MemoryWriteProtected => "MemoryWriteProtected",
            MemoryAddressError => "MemoryAddressError",
            MemoryBlankCheckFailed => "MemoryBlankCheckFailed",
            MemoryBlankPageReadDisallowed => "MemoryBlankPageReadDisallowed",
            MemoryProtectedPageReadDisallowed => {
                "MemoryProtectedPageReadDisallowed"
            }
            MemoryFfrSpecRegionWriteBroken => "MemoryFfrSpecRegionWriteBroken",
            MemoryUnsupportedCommand => "MemoryUnsupportedCommand",
            UnknownProperty => "UnknownProperty",
            ReadOnlyProperty => "ReadOnlyProperty",
            InvalidPropertyValue => "InvalidPropertyValue",
            AppCrcCheckPassed => "AppCrcCheckPassed",
            AppCrcCheckFailed => "AppCrcCheckFailed",
            AppCrcCheckInactive => "AppCrcCheckInactive",
            AppCrcCheckInvalid => "AppCrcCheckInvalid",
            AppCrcCheckOutOfRange => "AppCrcCheckOutOfRange",
            NoPingResponse => "NoPingResponse",
            InvalidPacketType => "InvalidPacketType",
            InvalidCrc => "InvalidCRC",
            NoCommandResponse => "NoCommandResponse",
            ReliableUpdateSuccess => "ReliableUpdateSuccess",
        }
    }

    /// Name of a numeric status. Unknown statuses get a synthesized
    /// `ErrorCode = N(0xN)` name.
    pub fn name_of(value: u32) -> String {
        match StatusCode::from_u32(value) {
            Some(code) => code.name().to_owned(),
            None => format!("ErrorCode = {0}({0:#x})", value),
        }
    }

    pub fn is_valid(value: u32) -> bool {
        StatusCode::from_u32(value).is_some()
    }
}

/// External memory IDs understood by `ConfigureMemory`, `GetProperty`
/// and the memory access commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ExtMemId {
    QuadSpi0 = 1,
    SemcNor = 8,
    FlexSpiNor = 9,
    SpifiNor = 10,
    FlashExecuteOnly = 16,
    SemcNand = 256,
    SpiNand = 257,
    SpiNorEeprom = 272,
    I2cNorEeprom = 273,
    SdCard = 288,
    MmcCard = 289,
}

impl ExtMemId {
    pub fn name(self) -> &'static str {
        match self {
            ExtMemId::QuadSpi0 => "Quad SPI Memory 0",
            ExtMemId::SemcNor => "SEMC NOR Memory",
            ExtMemId::FlexSpiNor => "Flex SPI NOR Memory",
            ExtMemId::SpifiNor => "SPIFI NOR Memory",
            ExtMemId::FlashExecuteOnly => {
                "Execute-Only region on internal Flash"
            }
            ExtMemId::SemcNand => "SEMC NAND Memory",
            ExtMemId::SpiNand => "SPI NAND Memory",
            ExtMemId::SpiNorEeprom => "SPI NOR/EEPROM Memory",
            ExtMemId::I2cNorEeprom => "I2C NOR/EEPROM Memory",
            ExtMemId::SdCard => "eSD, SD, SDHC, SDXC Memory Card",
            ExtMemId::MmcCard => "MMC, eMMC Memory Card",
        }
    }

    pub fn from_u32(value: u32) -> Option<ExtMemId> {
        use self::ExtMemId::*;
        match value {
            1 => Some(QuadSpi0),
            8 => Some(SemcNor),
            9 => Some(FlexSpiNor),
            10 => Some(SpifiNor),
            16 => Some(FlashExecuteOnly),
            256 => Some(SemcNand),
            257 => Some(SpiNand),
            272 => Some(SpiNorEeprom),
            273 => Some(I2cNorEeprom),
            288 => Some(SdCard),
            289 => Some(MmcCard),
            _ => None,
        }
    }
}

/// Presence bits of the `ExternalMemoryAttributes` structure.
pub mod ext_mem_prop {
    pub const START_ADDRESS: u32 = 0x0000_0001;
    pub const SIZE_IN_KBYTES: u32 = 0x0000_0002;
    pub const PAGE_SIZE: u32 = 0x0000_0004;
    pub const SECTOR_SIZE: u32 = 0x0000_0008;
    pub const BLOCK_SIZE: u32 = 0x0000_0010;
}

/// Sub-operations of the `KeyProvisioning` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum KeyOperation {
    Enroll = 0,
    SetUserKey = 1,
    SetKey = 2,
    WriteKeyNonvolatile = 3,
    ReadKeyNonvolatile = 4,
    WriteKeyStore = 5,
    ReadKeyStore = 6,
}

impl KeyOperation {
    pub fn name(self) -> &'static str {
        match self {
            KeyOperation::Enroll => "enroll",
            KeyOperation::SetUserKey => "set_user_key",
            KeyOperation::SetKey => "set_key",
            KeyOperation::WriteKeyNonvolatile => "write_key_nonvolatile",
            KeyOperation::ReadKeyNonvolatile => "read_key_nonvolatile",
            KeyOperation::WriteKeyStore => "write_key_store",
            KeyOperation::ReadKeyStore => "read_key_store",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_lookup_roundtrip() {
        for &tag in CommandTag::ALL {
            assert_eq!(CommandTag::from_u8(tag as u8), Some(tag));
        }
        for &tag in PropertyTag::ALL {
            assert_eq!(PropertyTag::from_u8(tag as u8), Some(tag));
        }
        assert_eq!(CommandTag::from_u8(0x17), None);
        assert_eq!(PropertyTag::from_u8(0x09), None);
    }

    #[test]
    fn test_status_names() {
        assert_eq!(
            StatusCode::from_u32(101),
            Some(StatusCode::FlashAlignmentError)
        );
        assert_eq!(StatusCode::name_of(101), "FlashAlignmentError");
        assert_eq!(StatusCode::name_of(10600), "ReliableUpdateSuccess");
        assert_eq!(StatusCode::name_of(4242), "ErrorCode = 4242(0x1092)");
        assert!(StatusCode::is_valid(0));
        assert!(!StatusCode::is_valid(7));
    }

    #[test]
    fn test_ext_mem_ids() {
        assert_eq!(ExtMemId::from_u32(9), Some(ExtMemId::FlexSpiNor));
        assert_eq!(ExtMemId::SdCard as u32, 288);
        assert_eq!(ExtMemId::from_u32(2), None);
    }
}
