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

//! # Utilities
//!
//! Formatting helpers for decoded properties and the backdoor-key parser
//! used by `flash_security_disable`.

use crate::error::{Error, Result};

/// Convert a byte count to a short human-readable string.
///
/// `use_kibibyte` selects 1024-based units (`kiB`, `MiB`, ...) over
/// 1000-based ones.
pub fn size_fmt(value: u64, use_kibibyte: bool) -> String {
    let (base, suffix) = if use_kibibyte {
        (1024.0, "iB")
    } else {
        (1000.0, "B")
    };
    let mut value = value as f64;
    let mut unit = "B".to_owned();
    for prefix in ['k', 'M', 'G', 'T', 'P'] {
        if value < base {
            break;
        }
        value /= base;
        unit = format!("{}{}", prefix, suffix);
    }
    format!("{:.1} {}", value, unit)
}

/// Parse a flash backdoor key.
///
/// Accepted forms:
///
/// - `S:<8 ASCII chars>` or a bare 8-character string
/// - `X:<16 hex chars>` or a bare 16-character hex string
pub fn check_key(value: &str) -> Result<[u8; 8]> {
    let (hex, body) = match value.split_once(':') {
        Some(("S", body)) => (false, body),
        Some(("X", body)) => (true, body),
        Some(_) => {
            return Err(Error::generic(
                "key type error, use backdoor key as \"ASCII = S:123...8\" \
                 or \"HEX = X:010203...08\"",
            ));
        }
        None => (value.len() == 16, value),
    };

    let mut key = [0u8; 8];
    if hex {
        if body.len() != 16 || !body.is_ascii() {
            return Err(Error::generic(
                "key type error, use 16 HEX chars, such as \"X:010203...08\"",
            ));
        }
        for (i, chunk) in body.as_bytes().chunks(2).enumerate() {
            let chunk = std::str::from_utf8(chunk)
                .map_err(|_| Error::generic("unsupported HEX char in key"))?;
            key[i] = u8::from_str_radix(chunk, 16)
                .map_err(|_| Error::generic("unsupported HEX char in key"))?;
        }
    } else {
        if body.len() != 8 || !body.is_ascii() {
            return Err(Error::generic(
                "key type error, use 8 ASCII chars, such as \"S:12345678\"",
            ));
        }
        key.copy_from_slice(body.as_bytes());
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_fmt() {
        assert_eq!(size_fmt(0, true), "0.0 B");
        assert_eq!(size_fmt(1023, true), "1023.0 B");
        assert_eq!(size_fmt(1024, true), "1.0 kiB");
        assert_eq!(size_fmt(0x4_0000, true), "256.0 kiB");
        assert_eq!(size_fmt(32, true), "32.0 B");
        assert_eq!(size_fmt(1_000_000, false), "1.0 MB");
    }

    #[test]
    fn test_check_key_ascii() {
        assert_eq!(check_key("S:12345678").unwrap(), *b"12345678");
        assert_eq!(check_key("ABCDEFGH").unwrap(), *b"ABCDEFGH");
        assert!(check_key("S:1234").is_err());
    }

    #[test]
    fn test_check_key_hex() {
        assert_eq!(
            check_key("X:0102030405060708").unwrap(),
            [1, 2, 3, 4, 5, 6, 7, 8]
        );
        assert_eq!(
            check_key("FFFFFFFFFFFFFFFE").unwrap(),
            [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE]
        );
        assert!(check_key("X:01020304").is_err());
        assert!(check_key("X:01020304050607ZZ").is_err());
        assert!(check_key("K:0102030405060708").is_err());
    }
}
