//! The fifteen typed immediate shapes an opcode's payload can take.
//!
//! Each shape knows its own encoded width and how to format itself for the
//! diagnostic bytecode listing (`dict[5]`, `[32]`, `f64(3.14)`, ...).
//! Keeping width + format + parse together on one enum is what makes the
//! format-then-reparse round trip straightforward to implement and to test.

use std::fmt;

use crate::types::{DictRef, Displacement, Slot};

/// A decoded immediate value, tagged by its shape.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Immediate {
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    /// Same bit width as `U8`/`U16`/`U32`/`U64` but formatted in hex; used
    /// for bitmask-shaped immediates like `checktag`.
    HexU8(u8),
    HexU16(u16),
    HexU32(u32),
    HexU64(u64),
    F64(f64),
    /// A 16-bit reference to a value/hash-stack slot: `[32]`.
    Slot(Slot),
    /// A 16-bit reference into the string/literal dictionary: `dict[5]`.
    Dict(DictRef),
}

impl Immediate {
    /// Encoded width in bytes, fixed per shape.
    pub const fn width(&self) -> usize {
        match self {
            Immediate::I8(_) | Immediate::U8(_) | Immediate::HexU8(_) => 1,
            Immediate::I16(_)
            | Immediate::U16(_)
            | Immediate::HexU16(_)
            | Immediate::Slot(_)
            | Immediate::Dict(_) => 2,
            Immediate::I32(_) | Immediate::U32(_) | Immediate::HexU32(_) => 4,
            Immediate::I64(_)
            | Immediate::U64(_)
            | Immediate::HexU64(_)
            | Immediate::F64(_) => 8,
        }
    }

    pub fn to_le_bytes(self) -> Vec<u8> {
        match self {
            Immediate::I8(v) => v.to_le_bytes().to_vec(),
            Immediate::U8(v) | Immediate::HexU8(v) => v.to_le_bytes().to_vec(),
            Immediate::I16(v) => v.to_le_bytes().to_vec(),
            Immediate::U16(v) | Immediate::HexU16(v) => v.to_le_bytes().to_vec(),
            Immediate::Slot(v) | Immediate::Dict(v) => v.to_le_bytes().to_vec(),
            Immediate::I32(v) => v.to_le_bytes().to_vec(),
            Immediate::U32(v) | Immediate::HexU32(v) => v.to_le_bytes().to_vec(),
            Immediate::I64(v) => v.to_le_bytes().to_vec(),
            Immediate::U64(v) | Immediate::HexU64(v) => v.to_le_bytes().to_vec(),
            Immediate::F64(v) => v.to_bits().to_le_bytes().to_vec(),
        }
    }

    /// Reads the given shape from the front of `bytes`, returning the value
    /// and the number of bytes consumed.
    pub fn read(shape: ImmediateShape, bytes: &[u8]) -> Option<(Immediate, usize)> {
        let w = shape.width();
        if bytes.len() < w {
            return None;
        }
        let v = match shape {
            ImmediateShape::I8 => Immediate::I8(bytes[0] as i8),
            ImmediateShape::U8 => Immediate::U8(bytes[0]),
            ImmediateShape::HexU8 => Immediate::HexU8(bytes[0]),
            ImmediateShape::I16 => Immediate::I16(i16::from_le_bytes([bytes[0], bytes[1]])),
            ImmediateShape::U16 => Immediate::U16(u16::from_le_bytes([bytes[0], bytes[1]])),
            ImmediateShape::HexU16 => Immediate::HexU16(u16::from_le_bytes([bytes[0], bytes[1]])),
            ImmediateShape::Slot => Immediate::Slot(u16::from_le_bytes([bytes[0], bytes[1]])),
            ImmediateShape::Dict => Immediate::Dict(u16::from_le_bytes([bytes[0], bytes[1]])),
            ImmediateShape::I32 => {
                Immediate::I32(i32::from_le_bytes(bytes[0..4].try_into().ok()?))
            }
            ImmediateShape::U32 => {
                Immediate::U32(u32::from_le_bytes(bytes[0..4].try_into().ok()?))
            }
            ImmediateShape::HexU32 => {
                Immediate::HexU32(u32::from_le_bytes(bytes[0..4].try_into().ok()?))
            }
            ImmediateShape::I64 => {
                Immediate::I64(i64::from_le_bytes(bytes[0..8].try_into().ok()?))
            }
            ImmediateShape::U64 => {
                Immediate::U64(u64::from_le_bytes(bytes[0..8].try_into().ok()?))
            }
            ImmediateShape::HexU64 => {
                Immediate::HexU64(u64::from_le_bytes(bytes[0..8].try_into().ok()?))
            }
            ImmediateShape::F64 => Immediate::F64(f64::from_bits(u64::from_le_bytes(
                bytes[0..8].try_into().ok()?,
            ))),
        };
        Some((v, w))
    }

    pub const fn shape(&self) -> ImmediateShape {
        match self {
            Immediate::I8(_) => ImmediateShape::I8,
            Immediate::U8(_) => ImmediateShape::U8,
            Immediate::HexU8(_) => ImmediateShape::HexU8,
            Immediate::I16(_) => ImmediateShape::I16,
            Immediate::U16(_) => ImmediateShape::U16,
            Immediate::HexU16(_) => ImmediateShape::HexU16,
            Immediate::Slot(_) => ImmediateShape::Slot,
            Immediate::Dict(_) => ImmediateShape::Dict,
            Immediate::I32(_) => ImmediateShape::I32,
            Immediate::U32(_) => ImmediateShape::U32,
            Immediate::HexU32(_) => ImmediateShape::HexU32,
            Immediate::I64(_) => ImmediateShape::I64,
            Immediate::U64(_) => ImmediateShape::U64,
            Immediate::HexU64(_) => ImmediateShape::HexU64,
            Immediate::F64(_) => ImmediateShape::F64,
        }
    }

    pub const fn displacement(self) -> Option<Displacement> {
        match self {
            Immediate::U32(v) | Immediate::HexU32(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Immediate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Immediate::I8(v) => write!(f, "{v}"),
            Immediate::U8(v) => write!(f, "{v}"),
            Immediate::I16(v) => write!(f, "{v}"),
            Immediate::U16(v) => write!(f, "{v}"),
            Immediate::I32(v) => write!(f, "{v}"),
            Immediate::U32(v) => write!(f, "{v}"),
            Immediate::I64(v) => write!(f, "{v}"),
            Immediate::U64(v) => write!(f, "{v}"),
            Immediate::HexU8(v) => write!(f, "{v:#04x}"),
            Immediate::HexU16(v) => write!(f, "{v:#06x}"),
            Immediate::HexU32(v) => write!(f, "{v:#010x}"),
            Immediate::HexU64(v) => write!(f, "{v:#018x}"),
            Immediate::F64(v) => write!(f, "f64({v})"),
            Immediate::Slot(v) => write!(f, "[{v}]"),
            Immediate::Dict(v) => write!(f, "dict[{v}]"),
        }
    }
}

/// The shape tag, independent of a concrete value — used by the opcode
/// table to declare what kind of immediate(s) each opcode carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ImmediateShape {
    I8,
    U8,
    HexU8,
    I16,
    U16,
    HexU16,
    I32,
    U32,
    HexU32,
    I64,
    U64,
    HexU64,
    F64,
    Slot,
    Dict,
}

impl ImmediateShape {
    pub const fn width(self) -> usize {
        match self {
            ImmediateShape::I8 | ImmediateShape::U8 | ImmediateShape::HexU8 => 1,
            ImmediateShape::I16
            | ImmediateShape::U16
            | ImmediateShape::HexU16
            | ImmediateShape::Slot
            | ImmediateShape::Dict => 2,
            ImmediateShape::I32 | ImmediateShape::U32 | ImmediateShape::HexU32 => 4,
            ImmediateShape::I64
            | ImmediateShape::U64
            | ImmediateShape::HexU64
            | ImmediateShape::F64 => 8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_shape() {
        let samples = [
            Immediate::I8(-5),
            Immediate::U8(5),
            Immediate::HexU8(0xab),
            Immediate::I16(-1000),
            Immediate::U16(1000),
            Immediate::HexU16(0xbeef),
            Immediate::I32(-100_000),
            Immediate::U32(100_000),
            Immediate::HexU32(0xdead_beef),
            Immediate::I64(-1),
            Immediate::U64(1),
            Immediate::HexU64(0xdead_beef_0000_0001),
            Immediate::F64(3.14159),
            Immediate::Slot(32),
            Immediate::Dict(5),
        ];
        for imm in samples {
            let bytes = imm.to_le_bytes();
            assert_eq!(bytes.len(), imm.width());
            let (back, n) = Immediate::read(imm.shape(), &bytes).unwrap();
            assert_eq!(n, bytes.len());
            assert_eq!(back, imm);
        }
    }

    #[test]
    fn formats_dict_and_slot_and_float() {
        assert_eq!(Immediate::Dict(5).to_string(), "dict[5]");
        assert_eq!(Immediate::Slot(32).to_string(), "[32]");
        assert_eq!(Immediate::F64(3.14).to_string(), "f64(3.14)");
    }
}
