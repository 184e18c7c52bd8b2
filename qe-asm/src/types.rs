//! Small value types shared by the opcode table and the VM.
//!
//! Keeps primitive wire types (register ids, immediate widths) in one place
//! rather than scattering raw integers through the opcode definitions.

use std::fmt;

/// Number of lanes processed together by every opcode.
pub const LANES: usize = 16;

/// A base-relative offset into the VM arena (see `qe-vm::alloc`).
///
/// 32 bits, so every VM-visible buffer is addressable by a small immediate.
pub type Displacement = u32;

/// A slot index into the bytecode's value/hash stacks.
pub type Slot = u16;

/// A reference into the bytecode's string/literal dictionary.
pub type DictRef = u16;

/// A reference into one of the bytecode's radix trees.
pub type TreeRef = u16;

/// An interned symbol id (see `qe-storage::symtab`).
pub type SymbolId = u32;

/// A 16-bit lane mask: bit `i` set means lane `i` is live.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LaneMask(pub u16);

impl LaneMask {
    pub const NONE: LaneMask = LaneMask(0);
    pub const ALL: LaneMask = LaneMask(0xffff);

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }
}

impl fmt::Display for LaneMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// Calendar/clock granularity used by timestamp opcodes.
///
/// Spec §4.D lists these as a fixed set the timestamp family of opcodes is
/// parameterized over, rather than one opcode per granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Granularity {
    Micro = 0,
    Milli = 1,
    Second = 2,
    Minute = 3,
    Hour = 4,
    Day = 5,
    Month = 6,
    Year = 7,
}

impl Granularity {
    pub const ALL: [Granularity; 8] = [
        Granularity::Micro,
        Granularity::Milli,
        Granularity::Second,
        Granularity::Minute,
        Granularity::Hour,
        Granularity::Day,
        Granularity::Month,
        Granularity::Year,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Granularity::Micro => "micro",
            Granularity::Milli => "milli",
            Granularity::Second => "second",
            Granularity::Minute => "minute",
            Granularity::Hour => "hour",
            Granularity::Day => "day",
            Granularity::Month => "month",
            Granularity::Year => "year",
        }
    }
}

impl TryFrom<u8> for Granularity {
    type Error = u8;

    fn try_from(v: u8) -> Result<Self, u8> {
        Self::ALL.into_iter().find(|g| *g as u8 == v).ok_or(v)
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lane element kind, used by numeric opcodes that exist in both flavors
/// (`add.f` vs `add.i`, etc).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Lanes {
    Float,
    Int,
}

impl fmt::Display for Lanes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Lanes::Float => "f",
            Lanes::Int => "i",
        })
    }
}
