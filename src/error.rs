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

use std::{fmt, io, time::Duration};

use crate::constants::StatusCode;

/// Direction of the data phase an error occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataMode {
    Read,
    Write,
}

impl fmt::Display for DataMode {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataMode::Read => fmt.write_str("read"),
            DataMode::Write => fmt.write_str("write"),
        }
    }
}

/// Errors surfaced by the MBoot driver.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Precondition or argument violation, detected before anything was
    /// put on the wire.
    #[error("{0}")]
    Generic(String),

    /// A well-formed response carried a non-success status.
    #[error("command operation break -> {name} ({status})")]
    Command { status: u32, name: String },

    /// A data phase was aborted by the device or violated framing.
    #[error("data {mode} break -> {name} ({status})")]
    Data {
        mode: DataMode,
        status: u32,
        name: String,
    },

    /// The transport is not open or the device dropped off the bus.
    #[error("connection error: {0}")]
    Connection(String),

    /// A blocking read exceeded its deadline.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn generic<S: Into<String>>(msg: S) -> Error {
        Error::Generic(msg.into())
    }

    pub(crate) fn connection<S: Into<String>>(msg: S) -> Error {
        Error::Connection(msg.into())
    }

    pub(crate) fn command(status: u32) -> Error {
        Error::Command {
            status,
            name: StatusCode::name_of(status),
        }
    }

    pub(crate) fn data(mode: DataMode, status: u32) -> Error {
        Error::Data {
            mode,
            status,
            name: StatusCode::name_of(status),
        }
    }

    /// The device status carried by this error, if it has one.
    pub fn status(&self) -> Option<u32> {
        match self {
            Error::Command { status, .. } | Error::Data { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::command(101);
        assert_eq!(
            err.to_string(),
            "command operation break -> FlashAlignmentError (101)"
        );
        assert_eq!(err.status(), Some(101));

        let err = Error::data(DataMode::Read, 10002);
        assert_eq!(err.to_string(), "data read break -> AbortDataPhase (10002)");

        let err = Error::command(4242);
        assert_eq!(
            err.to_string(),
            "command operation break -> ErrorCode = 4242(0x1092) (4242)"
        );
    }
}
