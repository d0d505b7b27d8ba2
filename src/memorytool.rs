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

//! # Memory range model
//!
//! Half-open address intervals used to validate addresses before
//! destructive operations are put on the wire.

use std::fmt;

use crate::error::{Error, Result};

/// A half-open memory interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryBlock {
    start: u32,
    end: u32,
}

impl MemoryBlock {
    /// Build a block from `start` and exactly one of `end` or `length`.
    ///
    /// Giving both is accepted only when they agree; giving neither is an
    /// error.
    pub fn new(
        start: u32,
        end: Option<u32>,
        length: Option<u32>,
    ) -> Result<MemoryBlock> {
        let end = match (end, length) {
            (Some(end), None) => end,
            (None, Some(length)) => start
                .checked_add(length)
                .ok_or_else(|| Error::generic("memory block end overflows"))?,
            (Some(end), Some(length)) => {
                if end.checked_sub(start) != Some(length) {
                    return Err(Error::generic(
                        "memory block end and length disagree",
                    ));
                }
                end
            }
            (None, None) => {
                return Err(Error::generic(
                    "memory block needs an end or a length",
                ));
            }
        };
        if end < start {
            return Err(Error::generic("memory block end before start"));
        }
        Ok(MemoryBlock { start, end })
    }

    /// Block covering `length` bytes from `start`.
    pub fn with_length(start: u32, length: u32) -> Result<MemoryBlock> {
        MemoryBlock::new(start, None, Some(length))
    }

    /// Block covering `[start, end)`.
    pub fn from_range(start: u32, end: u32) -> Result<MemoryBlock> {
        MemoryBlock::new(start, Some(end), None)
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    pub fn length(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether `other` lies entirely inside this block.
    pub fn contains(&self, other: &MemoryBlock) -> bool {
        other.start >= self.start && other.end <= self.end
    }

    /// Set-difference `self \ other`, yielding zero, one or two residual
    /// blocks.
    pub fn subtract(&self, other: &MemoryBlock) -> Vec<MemoryBlock> {
        if other.end <= self.start || other.start >= self.end {
            return vec![*self];
        }
        let mut residuals = Vec::with_capacity(2);
        if self.start < other.start {
            residuals.push(MemoryBlock {
                start: self.start,
                end: other.start,
            });
        }
        if other.end < self.end {
            residuals.push(MemoryBlock {
                start: other.end,
                end: self.end,
            });
        }
        residuals
    }
}

impl fmt::Display for MemoryBlock {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            fmt,
            "start:{:#010x} end:{:#010x} length:{:#010x}",
            self.start,
            self.end,
            self.length()
        )
    }
}

/// On-chip RAM range.
pub type Memory = MemoryBlock;

/// On-chip flash range with its erase granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flash {
    region: MemoryBlock,
    sector_size: u32,
}

/// Default flash erase sector, 4 KiB.
pub const DEFAULT_SECTOR_SIZE: u32 = 0x1000;

impl Flash {
    pub fn new(
        start: u32,
        end: Option<u32>,
        length: Option<u32>,
        sector_size: Option<u32>,
    ) -> Result<Flash> {
        Ok(Flash {
            region: MemoryBlock::new(start, end, length)?,
            sector_size: sector_size.unwrap_or(DEFAULT_SECTOR_SIZE),
        })
    }

    pub fn region(&self) -> &MemoryBlock {
        &self.region
    }

    pub fn sector_size(&self) -> u32 {
        self.sector_size
    }

    pub fn contains(&self, other: &MemoryBlock) -> bool {
        self.region.contains(other)
    }

    /// Smallest multiple of `base` (a power of two) not below `number`.
    pub fn align_up(number: u32, base: u32) -> u32 {
        (number + base - 1) & !(base - 1)
    }

    /// Largest multiple of `base` (a power of two) not above `number`.
    pub fn align_down(number: u32, base: u32) -> u32 {
        number & !(base - 1)
    }
}

impl fmt::Display for Flash {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{} sector:{:#x}", self.region, self.sector_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction() {
        let a = MemoryBlock::from_range(0x100, 0x200).unwrap();
        let b = MemoryBlock::with_length(0x100, 0x100).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.length(), 0x100);

        assert!(MemoryBlock::new(0x100, None, None).is_err());
        assert!(MemoryBlock::from_range(0x200, 0x100).is_err());
        assert!(MemoryBlock::with_length(0xFFFF_FFFF, 2).is_err());
        // Agreeing end and length are allowed.
        assert!(MemoryBlock::new(0, Some(16), Some(16)).is_ok());
        assert!(MemoryBlock::new(0, Some(16), Some(8)).is_err());
    }

    #[test]
    fn test_contains() {
        let outer = MemoryBlock::from_range(0, 100).unwrap();
        let inner = MemoryBlock::from_range(50, 90).unwrap();
        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
        assert!(outer.contains(&outer));
    }

    #[test]
    fn test_subtract_inner_hole() {
        let outer = MemoryBlock::from_range(0, 100).unwrap();
        let hole = MemoryBlock::from_range(50, 90).unwrap();
        let residuals = outer.subtract(&hole);
        assert_eq!(
            residuals,
            [
                MemoryBlock::from_range(0, 50).unwrap(),
                MemoryBlock::from_range(90, 100).unwrap(),
            ]
        );
    }

    #[test]
    fn test_subtract_edges() {
        let block = MemoryBlock::from_range(0x1000, 0x2000).unwrap();

        // Disjoint and merely touching blocks leave the block whole.
        let before = MemoryBlock::from_range(0x0000, 0x1000).unwrap();
        assert_eq!(block.subtract(&before), [block]);

        // Overlap at the low edge.
        let low = MemoryBlock::from_range(0x0800, 0x1800).unwrap();
        assert_eq!(
            block.subtract(&low),
            [MemoryBlock::from_range(0x1800, 0x2000).unwrap()]
        );

        // Full cover removes everything.
        let all = MemoryBlock::from_range(0x0000, 0x3000).unwrap();
        assert!(block.subtract(&all).is_empty());
    }

    #[test]
    fn test_subtract_union_invariant() {
        // Residuals plus the intersection must add up to the original.
        let a = MemoryBlock::from_range(10, 60).unwrap();
        let b = MemoryBlock::from_range(30, 40).unwrap();
        let residuals = a.subtract(&b);
        let residual_len: u32 = residuals.iter().map(|r| r.length()).sum();
        assert_eq!(residual_len + b.length(), a.length());
        assert!(residuals.iter().all(|r| r.start() <= r.end()));
    }

    #[test]
    fn test_alignment() {
        assert_eq!(Flash::align_up(0x1001, 0x1000), 0x2000);
        assert_eq!(Flash::align_up(0x1000, 0x1000), 0x1000);
        assert_eq!(Flash::align_up(1, 0x200), 0x200);
        assert_eq!(Flash::align_down(0x1FFF, 0x1000), 0x1000);
        assert_eq!(Flash::align_down(0x1000, 0x1000), 0x1000);

        for x in [0u32, 1, 0x7FF, 0x800, 0x801, 0x12345] {
            let up = Flash::align_up(x, 0x800);
            let down = Flash::align_down(x, 0x800);
            assert!(up >= x && up - x < 0x800 && up % 0x800 == 0);
            assert!(down <= x && x - down < 0x800 && down % 0x800 == 0);
        }
    }

    #[test]
    fn test_flash_defaults() {
        let flash = Flash::new(0, None, Some(0x4_0000), None).unwrap();
        assert_eq!(flash.sector_size(), 0x1000);
        let block = MemoryBlock::from_range(0x1000, 0x2000).unwrap();
        assert!(flash.contains(&block));
    }
}
