//! The decoded-value model the interpreter's box/unbox, find-symbol, and
//! string/comparison opcodes operate over.
//!
//! `vm/bytecode.go` never decodes values itself — that's the job of
//! hand-written AVX-512 kernels this crate has no access to. What we ground
//! here instead is the *addressing scheme*: a value is a pair of 32-bit
//! arena displacements (offset, length) that the `V` register carries per
//! lane, and opcodes such as `checktag`/`findsym`/`unpack` interpret the
//! bytes at that address through a one-byte tag. The concrete tag encoding
//! below is this crate's own internal wire format for what lives at a
//! displacement — it is internal to the VM, not the on-disk record format
//! `qe-storage` owns, and only the *set* of tags opcodes must distinguish
//! (expression node literal kinds, type tests) is externally constrained.

use std::fmt;

use qe_asm::Displacement;

/// One byte identifying the shape of the payload that follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Tag {
    Null = 0,
    Missing = 1,
    Bool = 2,
    Int = 3,
    Float = 4,
    String = 5,
    Timestamp = 6,
    Struct = 7,
    List = 8,
}

impl Tag {
    pub const ALL: [Tag; 9] = [
        Tag::Null,
        Tag::Missing,
        Tag::Bool,
        Tag::Int,
        Tag::Float,
        Tag::String,
        Tag::Timestamp,
        Tag::Struct,
        Tag::List,
    ];

    /// The bit this tag occupies in a `checktag` mask immediate.
    pub const fn bit(self) -> u16 {
        1u16 << (self as u8)
    }

    fn from_byte(b: u8) -> Option<Tag> {
        Tag::ALL.into_iter().find(|t| *t as u8 == b)
    }
}

/// One field of a decoded struct: its interned symbol id and the
/// (offset, length) of its value, both relative to the same heap the
/// struct itself was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub symbol: u32,
    pub offset: Displacement,
    pub length: Displacement,
}

/// A value decoded from `(offset, length)` bytes in the VM heap.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    Null,
    Missing,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(&'a [u8]),
    /// Microseconds since the Unix epoch.
    Timestamp(i64),
    Struct(Vec<Field>),
    List(Vec<(Displacement, Displacement)>),
}

/// Errors decoding a value from the heap; always `VmError::Corrupt` at the
/// interpreter boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("displacement out of bounds")]
    OutOfBounds,
    #[error("unrecognized value tag {0}")]
    BadTag(u8),
    #[error("truncated payload for tag")]
    Truncated,
}

fn slice<'a>(heap: &'a [u8], off: u32, len: u32) -> Result<&'a [u8], DecodeError> {
    let off = off as usize;
    let len = len as usize;
    heap.get(off..off + len).ok_or(DecodeError::OutOfBounds)
}

/// Reads the one-byte tag at `offset` without decoding the full value;
/// backs `checktag`/`isnull`/`isnotnull`.
pub fn peek_tag(heap: &[u8], offset: Displacement) -> Result<Tag, DecodeError> {
    let b = *heap.get(offset as usize).ok_or(DecodeError::OutOfBounds)?;
    Tag::from_byte(b).ok_or(DecodeError::BadTag(b))
}

/// Decodes the value at `(offset, length)`.
pub fn decode(heap: &[u8], offset: Displacement, length: Displacement) -> Result<Value<'_>, DecodeError> {
    let bytes = slice(heap, offset, length)?;
    let tag = *bytes.first().ok_or(DecodeError::Truncated)?;
    let body = &bytes[1..];
    match Tag::from_byte(tag).ok_or(DecodeError::BadTag(tag))? {
        Tag::Null => Ok(Value::Null),
        Tag::Missing => Ok(Value::Missing),
        Tag::Bool => Ok(Value::Bool(*body.first().ok_or(DecodeError::Truncated)? != 0)),
        Tag::Int => Ok(Value::Int(i64::from_le_bytes(
            body.get(0..8).ok_or(DecodeError::Truncated)?.try_into().unwrap(),
        ))),
        Tag::Float => Ok(Value::Float(f64::from_le_bytes(
            body.get(0..8).ok_or(DecodeError::Truncated)?.try_into().unwrap(),
        ))),
        Tag::String => Ok(Value::String(body)),
        Tag::Timestamp => Ok(Value::Timestamp(i64::from_le_bytes(
            body.get(0..8).ok_or(DecodeError::Truncated)?.try_into().unwrap(),
        ))),
        Tag::Struct => {
            let count = u32::from_le_bytes(body.get(0..4).ok_or(DecodeError::Truncated)?.try_into().unwrap());
            let mut fields = Vec::with_capacity(count as usize);
            let mut p = 4usize;
            for _ in 0..count {
                let rec = body.get(p..p + 12).ok_or(DecodeError::Truncated)?;
                fields.push(Field {
                    symbol: u32::from_le_bytes(rec[0..4].try_into().unwrap()),
                    offset: u32::from_le_bytes(rec[4..8].try_into().unwrap()),
                    length: u32::from_le_bytes(rec[8..12].try_into().unwrap()),
                });
                p += 12;
            }
            Ok(Value::Struct(fields))
        }
        Tag::List => {
            let count = u32::from_le_bytes(body.get(0..4).ok_or(DecodeError::Truncated)?.try_into().unwrap());
            let mut elems = Vec::with_capacity(count as usize);
            let mut p = 4usize;
            for _ in 0..count {
                let rec = body.get(p..p + 8).ok_or(DecodeError::Truncated)?;
                elems.push((
                    u32::from_le_bytes(rec[0..4].try_into().unwrap()),
                    u32::from_le_bytes(rec[4..8].try_into().unwrap()),
                ));
                p += 8;
            }
            Ok(Value::List(elems))
        }
    }
}

/// Walks a decoded struct's fields looking for `symbol`, as `findsym` does.
/// `hint` is the field index to try first (the "hinted-slot" variant);
/// callers fall back to a linear scan when the hint misses.
pub fn find_field(fields: &[Field], symbol: u32, hint: Option<usize>) -> Option<(usize, Field)> {
    if let Some(h) = hint {
        if let Some(f) = fields.get(h) {
            if f.symbol == symbol {
                return Some((h, *f));
            }
        }
    }
    fields.iter().position(|f| f.symbol == symbol).map(|i| (i, fields[i]))
}

/// Encodes a value into the VM's internal tagged wire format, for tests
/// and for `boxvalue`'s scratch-arena projection.
pub fn encode(value: &Value<'_>) -> Vec<u8> {
    let mut out = Vec::new();
    match value {
        Value::Null => out.push(Tag::Null as u8),
        Value::Missing => out.push(Tag::Missing as u8),
        Value::Bool(b) => {
            out.push(Tag::Bool as u8);
            out.push(*b as u8);
        }
        Value::Int(v) => {
            out.push(Tag::Int as u8);
            out.extend_from_slice(&v.to_le_bytes());
        }
        Value::Float(v) => {
            out.push(Tag::Float as u8);
            out.extend_from_slice(&v.to_le_bytes());
        }
        Value::String(s) => {
            out.push(Tag::String as u8);
            out.extend_from_slice(s);
        }
        Value::Timestamp(v) => {
            out.push(Tag::Timestamp as u8);
            out.extend_from_slice(&v.to_le_bytes());
        }
        Value::Struct(fields) => {
            out.push(Tag::Struct as u8);
            out.extend_from_slice(&(fields.len() as u32).to_le_bytes());
            for f in fields {
                out.extend_from_slice(&f.symbol.to_le_bytes());
                out.extend_from_slice(&f.offset.to_le_bytes());
                out.extend_from_slice(&f.length.to_le_bytes());
            }
        }
        Value::List(elems) => {
            out.push(Tag::List as u8);
            out.extend_from_slice(&(elems.len() as u32).to_le_bytes());
            for (o, l) in elems {
                out.extend_from_slice(&o.to_le_bytes());
                out.extend_from_slice(&l.to_le_bytes());
            }
        }
    }
    out
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Tag::Null => "null",
            Tag::Missing => "missing",
            Tag::Bool => "bool",
            Tag::Int => "int",
            Tag::Float => "float",
            Tag::String => "string",
            Tag::Timestamp => "timestamp",
            Tag::Struct => "struct",
            Tag::List => "list",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_scalars() {
        for v in [
            Value::Null,
            Value::Missing,
            Value::Bool(true),
            Value::Int(-42),
            Value::Float(3.5),
            Value::String(b"hi"),
            Value::Timestamp(1_700_000_000_000_000),
        ] {
            let bytes = encode(&v);
            let decoded = decode(&bytes, 0, bytes.len() as u32).unwrap();
            assert_eq!(decoded, v);
        }
    }

    #[test]
    fn struct_round_trips_and_finds_fields() {
        let v = Value::Struct(vec![
            Field { symbol: 10, offset: 0, length: 4 },
            Field { symbol: 11, offset: 4, length: 8 },
        ]);
        let bytes = encode(&v);
        let decoded = decode(&bytes, 0, bytes.len() as u32).unwrap();
        let Value::Struct(fields) = decoded else {
            panic!("expected struct");
        };
        assert_eq!(find_field(&fields, 11, None), Some((1, fields[1])));
        assert_eq!(find_field(&fields, 99, None), None);
        // hinted slot pointing at the wrong index still falls back to scan
        assert_eq!(find_field(&fields, 11, Some(0)), Some((1, fields[1])));
    }

    #[test]
    fn out_of_bounds_is_an_error() {
        let heap = [Tag::Int as u8, 1, 2, 3];
        assert_eq!(decode(&heap, 0, 100), Err(DecodeError::OutOfBounds));
    }

    #[test]
    fn checktag_bits_are_distinct_powers_of_two() {
        let mut seen = 0u16;
        for t in Tag::ALL {
            assert_eq!(seen & t.bit(), 0, "tag bits must be distinct");
            seen |= t.bit();
        }
    }
}
