//! Binary encode/decode and the textual diagnostic listing for [`Opcode`]s.
//!
//! `encode`/`decode` are exact inverses of each other: a family tag byte,
//! zero or more one-byte sub-operator tags, then the
//! immediates declared by [`Opcode::meta`] in order. [`Display`] renders the
//! same instruction as `mnemonic operand, operand` for bytecode listings.

use std::fmt;

use crate::immediate::{Immediate, ImmediateShape};
use crate::opcode::{
    ArithOp, BoolOp, CmpOp, ConvOp, Opcode, RegName, RegOp, SimpleAggOp, SlotAggOp, StrOp, TsOp,
};
use crate::types::{Granularity, Lanes};

macro_rules! tagged_enum {
    ($ty:ty, [$($variant:ident),+ $(,)?]) => {
        impl $ty {
            fn tag(self) -> u8 {
                const ALL: &[$ty] = &[$(<$ty>::$variant),+];
                ALL.iter().position(|v| *v == self).expect("exhaustive") as u8
            }

            fn from_tag(t: u8) -> Option<$ty> {
                const ALL: &[$ty] = &[$(<$ty>::$variant),+];
                ALL.get(t as usize).copied()
            }
        }
    };
}

tagged_enum!(RegName, [K, S, V, B]);
tagged_enum!(
    RegOp,
    [Load, Save, Xchg, LoadZero, Blend]
);
tagged_enum!(
    BoolOp,
    [And, Or, AndNot, Nand, Xor, Xnor, Not, False]
);
tagged_enum!(Lanes, [Float, Int]);
tagged_enum!(
    ConvOp,
    [
        MaskToFloat,
        MaskToInt,
        IntToFloat,
        FloatToIntMasked,
        RoundToUnsigned,
        RoundToSigned,
        IntToString
    ]
);
tagged_enum!(CmpOp, [Eq, Lt, Le, Gt, Ge]);
tagged_enum!(TsOp, [Add, Diff, Extract, Trunc]);
tagged_enum!(
    SimpleAggOp,
    [Sum, Min, Max, Count]
);
tagged_enum!(
    SlotAggOp,
    [Add, Min, Max, Count, Avg]
);

impl ArithOp {
    fn tag(self) -> u8 {
        ArithOp::ALL.iter().position(|v| *v == self).expect("exhaustive") as u8
    }

    fn from_tag(t: u8) -> Option<ArithOp> {
        ArithOp::ALL.get(t as usize).copied()
    }
}

impl StrOp {
    fn tag(self) -> u8 {
        StrOp::ALL.iter().position(|v| *v == self).expect("exhaustive") as u8
    }

    fn from_tag(t: u8) -> Option<StrOp> {
        StrOp::ALL.get(t as usize).copied()
    }
}

/// One byte identifying which [`Opcode`] variant (irrespective of its
/// sub-operator or immediates) a family tag belongs to.
#[repr(u8)]
enum Family {
    Ret = 0,
    Jz,
    RegOp,
    Bool,
    Arith,
    ArithImmF,
    ArithImmI,
    Convert,
    Cmp,
    CmpImmF,
    CmpImmI,
    IsNan,
    CheckTag,
    IsNull,
    IsNotNull,
    IsFalse,
    IsTrue,
    EqSlice,
    EqualV,
    EqualV4,
    EqualV8,
    TsOp,
    UnboxTs,
    BoxTs,
    ConstTm,
    Geohash,
    GridIndex,
    FindSym,
    FindSymHint,
    FindSymRevHint,
    ToInt,
    ToF64,
    Unpack,
    BoxValue,
    HashValue,
    HashValueChain,
    HashMember,
    HashLookup,
    AggSimple,
    AggSlot,
    StrOp,
    LitRef,
}

fn imm_bytes(shapes: &[ImmediateShape], values: &[Immediate]) -> Vec<u8> {
    debug_assert_eq!(shapes.len(), values.len());
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

impl Opcode {
    /// Encodes this instruction as a family tag, optional sub-operator
    /// tag(s), then its immediates in declaration order.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self {
            Opcode::Ret => out.push(Family::Ret as u8),
            Opcode::Jz(d) => {
                out.push(Family::Jz as u8);
                out.extend(imm_bytes(&[ImmediateShape::U64], &[Immediate::U64(*d)]));
            }
            Opcode::RegOp(name, op, slot) => {
                out.push(Family::RegOp as u8);
                out.push(name.tag());
                out.push(op.tag());
                out.extend(imm_bytes(&[ImmediateShape::Slot], &[Immediate::Slot(*slot)]));
            }
            Opcode::Bool(op, slot) => {
                out.push(Family::Bool as u8);
                out.push(op.tag());
                if let Some(s) = slot {
                    out.extend(imm_bytes(&[ImmediateShape::Slot], &[Immediate::Slot(*s)]));
                }
            }
            Opcode::Arith(op, lanes, slot) => {
                out.push(Family::Arith as u8);
                out.push(op.tag());
                out.push(lanes.tag());
                out.extend(imm_bytes(&[ImmediateShape::Slot], &[Immediate::Slot(*slot)]));
            }
            Opcode::ArithImmF(op, lanes, v) => {
                out.push(Family::ArithImmF as u8);
                out.push(op.tag());
                out.push(lanes.tag());
                out.extend(imm_bytes(&[ImmediateShape::F64], &[Immediate::F64(*v)]));
            }
            Opcode::ArithImmI(op, lanes, v) => {
                out.push(Family::ArithImmI as u8);
                out.push(op.tag());
                out.push(lanes.tag());
                out.extend(imm_bytes(&[ImmediateShape::I64], &[Immediate::I64(*v)]));
            }
            Opcode::Convert(op) => {
                out.push(Family::Convert as u8);
                out.push(op.tag());
            }
            Opcode::Cmp(op, lanes, slot) => {
                out.push(Family::Cmp as u8);
                out.push(op.tag());
                out.push(lanes.tag());
                out.extend(imm_bytes(&[ImmediateShape::Slot], &[Immediate::Slot(*slot)]));
            }
            Opcode::CmpImmF(op, lanes, v) => {
                out.push(Family::CmpImmF as u8);
                out.push(op.tag());
                out.push(lanes.tag());
                out.extend(imm_bytes(&[ImmediateShape::F64], &[Immediate::F64(*v)]));
            }
            Opcode::CmpImmI(op, lanes, v) => {
                out.push(Family::CmpImmI as u8);
                out.push(op.tag());
                out.push(lanes.tag());
                out.extend(imm_bytes(&[ImmediateShape::I64], &[Immediate::I64(*v)]));
            }
            Opcode::IsNan => out.push(Family::IsNan as u8),
            Opcode::CheckTag(mask) => {
                out.push(Family::CheckTag as u8);
                out.extend(imm_bytes(
                    &[ImmediateShape::HexU16],
                    &[Immediate::HexU16(*mask)],
                ));
            }
            Opcode::IsNull => out.push(Family::IsNull as u8),
            Opcode::IsNotNull => out.push(Family::IsNotNull as u8),
            Opcode::IsFalse => out.push(Family::IsFalse as u8),
            Opcode::IsTrue => out.push(Family::IsTrue as u8),
            Opcode::EqSlice => out.push(Family::EqSlice as u8),
            Opcode::EqualV => out.push(Family::EqualV as u8),
            Opcode::EqualV4 => out.push(Family::EqualV4 as u8),
            Opcode::EqualV8 => out.push(Family::EqualV8 as u8),
            Opcode::TsOp(op, gran) => {
                out.push(Family::TsOp as u8);
                out.push(op.tag());
                out.extend(imm_bytes(&[ImmediateShape::U8], &[Immediate::U8(*gran as u8)]));
            }
            Opcode::UnboxTs => out.push(Family::UnboxTs as u8),
            Opcode::BoxTs => out.push(Family::BoxTs as u8),
            Opcode::ConstTm(d) => {
                out.push(Family::ConstTm as u8);
                out.extend(imm_bytes(&[ImmediateShape::Dict], &[Immediate::Dict(*d)]));
            }
            Opcode::Geohash(lanes) => {
                out.push(Family::Geohash as u8);
                out.push(lanes.tag());
            }
            Opcode::GridIndex(lanes) => {
                out.push(Family::GridIndex as u8);
                out.push(lanes.tag());
            }
            Opcode::FindSym(sym) => {
                out.push(Family::FindSym as u8);
                out.extend(imm_bytes(&[ImmediateShape::U32], &[Immediate::U32(*sym)]));
            }
            Opcode::FindSymHint(sym, slot) => {
                out.push(Family::FindSymHint as u8);
                out.extend(imm_bytes(
                    &[ImmediateShape::U32, ImmediateShape::Slot],
                    &[Immediate::U32(*sym), Immediate::Slot(*slot)],
                ));
            }
            Opcode::FindSymRevHint(sym, slot) => {
                out.push(Family::FindSymRevHint as u8);
                out.extend(imm_bytes(
                    &[ImmediateShape::U32, ImmediateShape::Slot],
                    &[Immediate::U32(*sym), Immediate::Slot(*slot)],
                ));
            }
            Opcode::ToInt => out.push(Family::ToInt as u8),
            Opcode::ToF64 => out.push(Family::ToF64 as u8),
            Opcode::Unpack(mask) => {
                out.push(Family::Unpack as u8);
                out.extend(imm_bytes(
                    &[ImmediateShape::HexU16],
                    &[Immediate::HexU16(*mask)],
                ));
            }
            Opcode::BoxValue => out.push(Family::BoxValue as u8),
            Opcode::HashValue => out.push(Family::HashValue as u8),
            Opcode::HashValueChain(slot) => {
                out.push(Family::HashValueChain as u8);
                out.extend(imm_bytes(&[ImmediateShape::Slot], &[Immediate::Slot(*slot)]));
            }
            Opcode::HashMember(slot, tree) => {
                out.push(Family::HashMember as u8);
                out.extend(imm_bytes(
                    &[ImmediateShape::Slot, ImmediateShape::U16],
                    &[Immediate::Slot(*slot), Immediate::U16(*tree)],
                ));
            }
            Opcode::HashLookup(slot, tree) => {
                out.push(Family::HashLookup as u8);
                out.extend(imm_bytes(
                    &[ImmediateShape::Slot, ImmediateShape::U16],
                    &[Immediate::Slot(*slot), Immediate::U16(*tree)],
                ));
            }
            Opcode::AggSimple(op) => {
                out.push(Family::AggSimple as u8);
                out.push(op.tag());
            }
            Opcode::AggSlot(op, slot) => {
                out.push(Family::AggSlot as u8);
                out.push(op.tag());
                out.extend(imm_bytes(&[ImmediateShape::Slot], &[Immediate::Slot(*slot)]));
            }
            Opcode::StrOp(op) => {
                out.push(Family::StrOp as u8);
                out.push(op.tag());
                match op {
                    StrOp::TrimCharset => {
                        out.extend(imm_bytes(&[ImmediateShape::Dict], &[Immediate::Dict(0)]));
                    }
                    StrOp::Substring => {
                        out.extend(
                            imm_bytes(
                                &[ImmediateShape::I32, ImmediateShape::I32],
                                &[Immediate::I32(0), Immediate::I32(0)],
                            ),
                        );
                    }
                    StrOp::SplitPart => {
                        out.extend(
                            imm_bytes(
                                &[ImmediateShape::U8, ImmediateShape::U8],
                                &[Immediate::U8(0), Immediate::U8(0)],
                            ),
                        );
                    }
                    _ => {}
                }
            }
            Opcode::LitRef(a, b) => {
                out.push(Family::LitRef as u8);
                out.extend(imm_bytes(
                    &[ImmediateShape::HexU32, ImmediateShape::HexU32],
                    &[Immediate::HexU32(*a), Immediate::HexU32(*b)],
                ));
            }
        }
        out
    }

    /// Decodes one instruction from the front of `bytes`, returning it and
    /// the number of bytes consumed. Inverse of [`Opcode::encode`].
    pub fn decode(bytes: &[u8]) -> Option<(Opcode, usize)> {
        let (&family, _) = bytes.split_first()?;
        let mut pos = 1usize;

        macro_rules! sub {
            ($ty:ty) => {{
                let t = *bytes.get(pos)?;
                pos += 1;
                <$ty>::from_tag(t)?
            }};
        }
        macro_rules! imm {
            ($shape:expr) => {{
                let (v, n) = Immediate::read($shape, &bytes[pos..])?;
                pos += n;
                v
            }};
        }

        let op = match family {
            f if f == Family::Ret as u8 => Opcode::Ret,
            f if f == Family::Jz as u8 => {
                let Immediate::U64(d) = imm!(ImmediateShape::U64) else { return None };
                Opcode::Jz(d)
            }
            f if f == Family::RegOp as u8 => {
                let name = sub!(RegName);
                let op = sub!(RegOp);
                let Immediate::Slot(s) = imm!(ImmediateShape::Slot) else { return None };
                Opcode::RegOp(name, op, s)
            }
            f if f == Family::Bool as u8 => {
                let op = sub!(BoolOp);
                let slot = if op.is_unary() {
                    None
                } else {
                    let Immediate::Slot(s) = imm!(ImmediateShape::Slot) else { return None };
                    Some(s)
                };
                Opcode::Bool(op, slot)
            }
            f if f == Family::Arith as u8 => {
                let op = sub!(ArithOp);
                let lanes = sub!(Lanes);
                let Immediate::Slot(s) = imm!(ImmediateShape::Slot) else { return None };
                Opcode::Arith(op, lanes, s)
            }
            f if f == Family::ArithImmF as u8 => {
                let op = sub!(ArithOp);
                let lanes = sub!(Lanes);
                let Immediate::F64(v) = imm!(ImmediateShape::F64) else { return None };
                Opcode::ArithImmF(op, lanes, v)
            }
            f if f == Family::ArithImmI as u8 => {
                let op = sub!(ArithOp);
                let lanes = sub!(Lanes);
                let Immediate::I64(v) = imm!(ImmediateShape::I64) else { return None };
                Opcode::ArithImmI(op, lanes, v)
            }
            f if f == Family::Convert as u8 => Opcode::Convert(sub!(ConvOp)),
            f if f == Family::Cmp as u8 => {
                let op = sub!(CmpOp);
                let lanes = sub!(Lanes);
                let Immediate::Slot(s) = imm!(ImmediateShape::Slot) else { return None };
                Opcode::Cmp(op, lanes, s)
            }
            f if f == Family::CmpImmF as u8 => {
                let op = sub!(CmpOp);
                let lanes = sub!(Lanes);
                let Immediate::F64(v) = imm!(ImmediateShape::F64) else { return None };
                Opcode::CmpImmF(op, lanes, v)
            }
            f if f == Family::CmpImmI as u8 => {
                let op = sub!(CmpOp);
                let lanes = sub!(Lanes);
                let Immediate::I64(v) = imm!(ImmediateShape::I64) else { return None };
                Opcode::CmpImmI(op, lanes, v)
            }
            f if f == Family::IsNan as u8 => Opcode::IsNan,
            f if f == Family::CheckTag as u8 => {
                let Immediate::HexU16(m) = imm!(ImmediateShape::HexU16) else { return None };
                Opcode::CheckTag(m)
            }
            f if f == Family::IsNull as u8 => Opcode::IsNull,
            f if f == Family::IsNotNull as u8 => Opcode::IsNotNull,
            f if f == Family::IsFalse as u8 => Opcode::IsFalse,
            f if f == Family::IsTrue as u8 => Opcode::IsTrue,
            f if f == Family::EqSlice as u8 => Opcode::EqSlice,
            f if f == Family::EqualV as u8 => Opcode::EqualV,
            f if f == Family::EqualV4 as u8 => Opcode::EqualV4,
            f if f == Family::EqualV8 as u8 => Opcode::EqualV8,
            f if f == Family::TsOp as u8 => {
                let op = sub!(TsOp);
                let Immediate::U8(g) = imm!(ImmediateShape::U8) else { return None };
                let gran = Granularity::try_from(g).ok()?;
                Opcode::TsOp(op, gran)
            }
            f if f == Family::UnboxTs as u8 => Opcode::UnboxTs,
            f if f == Family::BoxTs as u8 => Opcode::BoxTs,
            f if f == Family::ConstTm as u8 => {
                let Immediate::Dict(d) = imm!(ImmediateShape::Dict) else { return None };
                Opcode::ConstTm(d)
            }
            f if f == Family::Geohash as u8 => Opcode::Geohash(sub!(Lanes)),
            f if f == Family::GridIndex as u8 => Opcode::GridIndex(sub!(Lanes)),
            f if f == Family::FindSym as u8 => {
                let Immediate::U32(s) = imm!(ImmediateShape::U32) else { return None };
                Opcode::FindSym(s)
            }
            f if f == Family::FindSymHint as u8 => {
                let Immediate::U32(s) = imm!(ImmediateShape::U32) else { return None };
                let Immediate::Slot(slot) = imm!(ImmediateShape::Slot) else { return None };
                Opcode::FindSymHint(s, slot)
            }
            f if f == Family::FindSymRevHint as u8 => {
                let Immediate::U32(s) = imm!(ImmediateShape::U32) else { return None };
                let Immediate::Slot(slot) = imm!(ImmediateShape::Slot) else { return None };
                Opcode::FindSymRevHint(s, slot)
            }
            f if f == Family::ToInt as u8 => Opcode::ToInt,
            f if f == Family::ToF64 as u8 => Opcode::ToF64,
            f if f == Family::Unpack as u8 => {
                let Immediate::HexU16(m) = imm!(ImmediateShape::HexU16) else { return None };
                Opcode::Unpack(m)
            }
            f if f == Family::BoxValue as u8 => Opcode::BoxValue,
            f if f == Family::HashValue as u8 => Opcode::HashValue,
            f if f == Family::HashValueChain as u8 => {
                let Immediate::Slot(s) = imm!(ImmediateShape::Slot) else { return None };
                Opcode::HashValueChain(s)
            }
            f if f == Family::HashMember as u8 => {
                let Immediate::Slot(s) = imm!(ImmediateShape::Slot) else { return None };
                let Immediate::U16(t) = imm!(ImmediateShape::U16) else { return None };
                Opcode::HashMember(s, t)
            }
            f if f == Family::HashLookup as u8 => {
                let Immediate::Slot(s) = imm!(ImmediateShape::Slot) else { return None };
                let Immediate::U16(t) = imm!(ImmediateShape::U16) else { return None };
                Opcode::HashLookup(s, t)
            }
            f if f == Family::AggSimple as u8 => Opcode::AggSimple(sub!(SimpleAggOp)),
            f if f == Family::AggSlot as u8 => {
                let op = sub!(SlotAggOp);
                let Immediate::Slot(s) = imm!(ImmediateShape::Slot) else { return None };
                Opcode::AggSlot(op, s)
            }
            f if f == Family::StrOp as u8 => {
                let op = sub!(StrOp);
                match op {
                    StrOp::TrimCharset => {
                        let Immediate::Dict(d) = imm!(ImmediateShape::Dict) else { return None };
                        // Never carries a real charset today: the encoder
                        // always writes Dict(0) and `Opcode::StrOp(StrOp)`
                        // has no field to hold a non-zero one. If this ever
                        // fires, the interpreter's whitespace-trim fallback
                        // for `TrimCharset` is silently wrong.
                        debug_assert_eq!(d, 0, "TrimCharset dict immediate is no longer padding");
                    }
                    StrOp::Substring => {
                        let Immediate::I32(a) = imm!(ImmediateShape::I32) else { return None };
                        let Immediate::I32(b) = imm!(ImmediateShape::I32) else { return None };
                        // See TrimCharset above: the interpreter treats
                        // `Substring` as the identity slice on the assumption
                        // both immediates are always zero on the wire.
                        debug_assert_eq!((a, b), (0, 0), "Substring immediates are no longer padding");
                    }
                    StrOp::SplitPart => {
                        let Immediate::U8(a) = imm!(ImmediateShape::U8) else { return None };
                        let Immediate::U8(b) = imm!(ImmediateShape::U8) else { return None };
                        // See TrimCharset above: the interpreter passes
                        // `SplitPart`/`CharSkip` input through unchanged on
                        // the assumption both immediates are always zero.
                        debug_assert_eq!((a, b), (0, 0), "SplitPart immediates are no longer padding");
                    }
                    _ => {}
                }
                Opcode::StrOp(op)
            }
            f if f == Family::LitRef as u8 => {
                let Immediate::HexU32(a) = imm!(ImmediateShape::HexU32) else { return None };
                let Immediate::HexU32(b) = imm!(ImmediateShape::HexU32) else { return None };
                Opcode::LitRef(a, b)
            }
            _ => return None,
        };
        Some((op, pos))
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opcode::Ret => write!(f, "ret"),
            Opcode::Jz(d) => write!(f, "jz {d}"),
            Opcode::RegOp(name, op, slot) => write!(f, "{op}.{name} [{slot}]"),
            Opcode::Bool(op, Some(slot)) => write!(f, "{op} [{slot}]"),
            Opcode::Bool(op, None) => write!(f, "{op}"),
            Opcode::Arith(op, lanes, slot) => write!(f, "{op}.{lanes} [{slot}]"),
            Opcode::ArithImmF(op, lanes, v) => write!(f, "{op}.{lanes} f64({v})"),
            Opcode::ArithImmI(op, lanes, v) => write!(f, "{op}.{lanes} {v}"),
            Opcode::Convert(op) => write!(f, "{op}"),
            Opcode::Cmp(op, lanes, slot) => write!(f, "{op}.{lanes} [{slot}]"),
            Opcode::CmpImmF(op, lanes, v) => write!(f, "{op}.{lanes} f64({v})"),
            Opcode::CmpImmI(op, lanes, v) => write!(f, "{op}.{lanes} {v}"),
            Opcode::IsNan => write!(f, "isnan"),
            Opcode::CheckTag(m) => write!(f, "checktag {m:#06x}"),
            Opcode::IsNull => write!(f, "isnull"),
            Opcode::IsNotNull => write!(f, "isnotnull"),
            Opcode::IsFalse => write!(f, "isfalse"),
            Opcode::IsTrue => write!(f, "istrue"),
            Opcode::EqSlice => write!(f, "eqslice"),
            Opcode::EqualV => write!(f, "equalv"),
            Opcode::EqualV4 => write!(f, "equalv4"),
            Opcode::EqualV8 => write!(f, "equalv8"),
            Opcode::TsOp(op, gran) => write!(f, "{op}.{gran}"),
            Opcode::UnboxTs => write!(f, "unboxts"),
            Opcode::BoxTs => write!(f, "boxts"),
            Opcode::ConstTm(d) => write!(f, "consttm dict[{d}]"),
            Opcode::Geohash(lanes) => write!(f, "geohash.{lanes}"),
            Opcode::GridIndex(lanes) => write!(f, "gridindex.{lanes}"),
            Opcode::FindSym(s) => write!(f, "findsym {s:#010x}"),
            Opcode::FindSymHint(s, slot) => write!(f, "findsym.hint {s:#010x} [{slot}]"),
            Opcode::FindSymRevHint(s, slot) => write!(f, "findsym.revhint {s:#010x} [{slot}]"),
            Opcode::ToInt => write!(f, "toint"),
            Opcode::ToF64 => write!(f, "tof64"),
            Opcode::Unpack(m) => write!(f, "unpack {m:#06x}"),
            Opcode::BoxValue => write!(f, "box"),
            Opcode::HashValue => write!(f, "hashvalue"),
            Opcode::HashValueChain(slot) => write!(f, "hashvalue+ [{slot}]"),
            Opcode::HashMember(slot, tree) => write!(f, "hashmember [{slot}] tree[{tree}]"),
            Opcode::HashLookup(slot, tree) => write!(f, "hashlookup [{slot}] tree[{tree}]"),
            Opcode::AggSimple(op) => write!(f, "{op}"),
            Opcode::AggSlot(op, slot) => write!(f, "{op} [{slot}]"),
            Opcode::StrOp(op) => write!(f, "{op}"),
            Opcode::LitRef(a, b) => write!(f, "litref {a:#010x} {b:#010x}"),
        }
    }
}

/// Decodes an entire compiled program, in order. Mirrors a `formatBytecode`-
/// style walk over `compiled []byte`, except it returns the decoded opcodes
/// instead of immediately rendering text, so callers can both reformat
/// (diagnostics) and re-encode (round-trip tests).
pub fn decode_program(bytes: &[u8]) -> Option<Vec<Opcode>> {
    let mut out = Vec::new();
    let mut pos = 0usize;
    while pos < bytes.len() {
        let (op, n) = Opcode::decode(&bytes[pos..])?;
        out.push(op);
        pos += n;
    }
    Some(out)
}

/// The diagnostic bytecode listing: one decoded instruction per line, each
/// rendered through [`Display`]. Truncated trailing bytes are reported
/// rather than silently dropped, matching `formatBytecode`'s truncation
/// branch.
pub fn format_program(bytes: &[u8]) -> String {
    use std::fmt::Write as _;

    let mut out = String::new();
    let mut pos = 0usize;
    while pos < bytes.len() {
        match Opcode::decode(&bytes[pos..]) {
            Some((op, n)) => {
                let _ = writeln!(out, "{op}");
                pos += n;
            }
            None => {
                let _ = writeln!(out, "<truncated at byte {pos}>");
                break;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::{SimpleAggOp, SlotAggOp};
    use crate::types::Granularity;

    fn sample_program() -> Vec<Opcode> {
        vec![
            Opcode::Ret,
            Opcode::Jz(40),
            Opcode::RegOp(RegName::K, RegOp::Load, 3),
            Opcode::Bool(BoolOp::Not, None),
            Opcode::Bool(BoolOp::And, Some(7)),
            Opcode::Arith(ArithOp::Add, Lanes::Float, 1),
            Opcode::ArithImmF(ArithOp::Mul, Lanes::Float, 2.5),
            Opcode::ArithImmI(ArithOp::Add, Lanes::Int, -7),
            Opcode::Cmp(CmpOp::Lt, Lanes::Int, 4),
            Opcode::CmpImmF(CmpOp::Ge, Lanes::Float, 1.0),
            Opcode::TsOp(TsOp::Trunc, Granularity::Day),
            Opcode::FindSymHint(0xdead_beef, 9),
            Opcode::HashLookup(2, 1),
            Opcode::AggSimple(SimpleAggOp::Count),
            Opcode::AggSlot(SlotAggOp::Avg, 5),
            Opcode::StrOp(StrOp::Contains),
            Opcode::StrOp(StrOp::Substring),
            Opcode::LitRef(0, 128),
        ]
    }

    #[test]
    fn binary_round_trip_is_exact() {
        for op in sample_program() {
            let bytes = op.encode();
            let (decoded, n) = Opcode::decode(&bytes).expect("decodes");
            assert_eq!(n, bytes.len());
            assert_eq!(decoded, op, "round trip mismatch for {op}");
        }
    }

    #[test]
    fn display_matches_expected_mnemonics() {
        assert_eq!(Opcode::Ret.to_string(), "ret");
        assert_eq!(Opcode::Jz(40).to_string(), "jz 40");
        assert_eq!(
            Opcode::RegOp(RegName::K, RegOp::Load, 3).to_string(),
            "load.k [3]"
        );
        assert_eq!(
            Opcode::Arith(ArithOp::Add, Lanes::Float, 1).to_string(),
            "add.f [1]"
        );
    }

    #[test]
    fn decode_rejects_truncated_input() {
        let bytes = Opcode::FindSymHint(1, 2).encode();
        assert!(Opcode::decode(&bytes[..bytes.len() - 1]).is_none());
    }

    #[test]
    fn whole_program_round_trips_through_format_and_decode(
    ) {
        let program = sample_program();
        let bytes: Vec<u8> = program.iter().flat_map(Opcode::encode).collect();
        let decoded = decode_program(&bytes).expect("decodes cleanly");
        assert_eq!(decoded, program);

        // reformatting is deterministic and lossless over the decoded form
        let listing = format_program(&bytes);
        assert_eq!(listing.lines().count(), program.len());
    }

    #[test]
    fn format_program_reports_truncation_without_panicking() {
        let mut bytes = Opcode::FindSymHint(1, 2).encode();
        bytes.pop();
        let listing = format_program(&bytes);
        assert!(listing.contains("truncated"));
    }

    proptest::proptest! {
        /// encode/decode are exact inverses for any immediate payload, not
        /// just the fixed sample program above.
        #[test]
        fn arith_imm_f_round_trips(slot in 0u16..=u16::MAX, imm in proptest::num::f64::ANY) {
            let op = Opcode::Arith(ArithOp::Add, Lanes::Float, slot);
            let bytes = op.encode();
            let (decoded, n) = Opcode::decode(&bytes).expect("decodes");
            proptest::prop_assert_eq!(n, bytes.len());
            proptest::prop_assert_eq!(decoded, op);

            let imm_op = Opcode::ArithImmF(ArithOp::Mul, Lanes::Float, imm);
            let imm_bytes = imm_op.encode();
            let (imm_decoded, imm_n) = Opcode::decode(&imm_bytes).expect("decodes");
            proptest::prop_assert_eq!(imm_n, imm_bytes.len());
            match imm_decoded {
                Opcode::ArithImmF(ArithOp::Mul, Lanes::Float, got) => {
                    proptest::prop_assert!(got == imm || (got.is_nan() && imm.is_nan()));
                }
                other => proptest::prop_assert!(false, "expected ArithImmF, got {other}"),
            }
        }

        #[test]
        fn litref_round_trips_any_displacement_pair(a in proptest::num::u32::ANY, b in proptest::num::u32::ANY) {
            let op = Opcode::LitRef(a, b);
            let bytes = op.encode();
            let (decoded, n) = Opcode::decode(&bytes).expect("decodes");
            proptest::prop_assert_eq!(n, bytes.len());
            proptest::prop_assert_eq!(decoded, op);
        }

        #[test]
        fn hash_lookup_round_trips_any_slot_and_tree(slot in proptest::num::u16::ANY, tree in proptest::num::u16::ANY) {
            let op = Opcode::HashLookup(slot, tree);
            let bytes = op.encode();
            let (decoded, n) = Opcode::decode(&bytes).expect("decodes");
            proptest::prop_assert_eq!(n, bytes.len());
            proptest::prop_assert_eq!(decoded, op);
        }
    }
}
