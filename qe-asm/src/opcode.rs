//! The opcode table.
//!
//! Every opcode declares, via [`RegSet`] flags, which of the implicit typed
//! registers `{K, S, V, B, H, L}` it reads and writes, and via
//! [`OpMeta::immediates`] the ordered list of [`ImmediateShape`]s its payload
//! carries. Opcodes that differ only by lane type (`add.f`/`add.i`) or by
//! operand shape (`eq`/`eqi`) are represented as one [`Opcode`] variant
//! parameterized by a small sub-enum rather than one flat enum arm each — an
//! `OpcodeRepr`/`Opcode` split shows the same kind of grouping for its
//! `ADD`/`ADDI` pairs, just with the parameterization done by hand per
//! mnemonic instead of by sub-enum. Either encoding produces the same number
//! of distinguishable, round-trippable instructions.

use std::fmt;

use bitflags::bitflags;

use crate::immediate::ImmediateShape;
use crate::types::{DictRef, Displacement, Granularity, Lanes, Slot, SymbolId, TreeRef};

bitflags! {
    /// Which of the implicit registers an opcode reads/writes.
    #[derive(Default)]
    pub struct RegSet: u8 {
        const K = 0b0000_0001;
        const S = 0b0000_0010;
        const V = 0b0000_0100;
        const B = 0b0000_1000;
        const H = 0b0001_0000;
        const L = 0b0010_0000;
    }
}

impl fmt::Display for RegSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (bit, name) in [
            (RegSet::K, "K"),
            (RegSet::S, "S"),
            (RegSet::V, "V"),
            (RegSet::B, "B"),
            (RegSet::H, "H"),
            (RegSet::L, "L"),
        ] {
            if self.contains(bit) {
                if !first {
                    write!(f, ",")?;
                }
                write!(f, "{name}")?;
                first = false;
            }
        }
        if first {
            write!(f, "-")?;
        }
        Ok(())
    }
}

/// Broad grouping used only for documentation/listing purposes; carries no
/// behavior of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Control,
    RegisterMove,
    BooleanMask,
    Arithmetic,
    Conversion,
    Comparison,
    TypeTest,
    SliceEquality,
    Timestamp,
    Geo,
    FindSymbol,
    BoxUnbox,
    Hash,
    Aggregate,
    String,
    Literal,
}

/// The four registers that support load/save/xchg/zero/blend to a stack
/// slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RegName {
    K,
    S,
    V,
    B,
}

impl RegName {
    const fn flag(self) -> RegSet {
        match self {
            RegName::K => RegSet::K,
            RegName::S => RegSet::S,
            RegName::V => RegSet::V,
            RegName::B => RegSet::B,
        }
    }
}

impl fmt::Display for RegName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RegName::K => "k",
            RegName::S => "s",
            RegName::V => "v",
            RegName::B => "b",
        })
    }
}

/// A spill/restore operation on one of the four movable registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RegOp {
    Load,
    Save,
    Xchg,
    /// Load, zeroing lanes outside the current mask.
    LoadZero,
    /// Load, blending with the current register value under the mask.
    Blend,
}

impl fmt::Display for RegOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RegOp::Load => "load",
            RegOp::Save => "save",
            RegOp::Xchg => "xchg",
            RegOp::LoadZero => "loadz",
            RegOp::Blend => "blend",
        })
    }
}

/// Lane-mask boolean combinators, operating on `K`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BoolOp {
    And,
    Or,
    AndNot,
    Nand,
    Xor,
    Xnor,
    Not,
    False,
}

impl BoolOp {
    /// `Not` and `False` are unary: they take no second mask operand.
    pub const fn is_unary(self) -> bool {
        matches!(self, BoolOp::Not | BoolOp::False)
    }
}

impl fmt::Display for BoolOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BoolOp::And => "and",
            BoolOp::Or => "or",
            BoolOp::AndNot => "andnot",
            BoolOp::Nand => "nand",
            BoolOp::Xor => "xor",
            BoolOp::Xnor => "xnor",
            BoolOp::Not => "not",
            BoolOp::False => "false",
        })
    }
}

/// Arithmetic/transcendental lane operations, available over float and int
/// lanes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ArithOp {
    Add,
    Sub,
    RSub,
    Mul,
    Div,
    RDiv,
    Mod,
    RMod,
    Min,
    Max,
    Abs,
    Neg,
    Sign,
    Square,
    Sqrt,
    Cbrt,
    Round,
    RoundEven,
    Trunc,
    Floor,
    Ceil,
    Sin,
    Cos,
    Tan,
    Exp,
    Ln,
}

impl ArithOp {
    pub const ALL: [ArithOp; 26] = [
        ArithOp::Add,
        ArithOp::Sub,
        ArithOp::RSub,
        ArithOp::Mul,
        ArithOp::Div,
        ArithOp::RDiv,
        ArithOp::Mod,
        ArithOp::RMod,
        ArithOp::Min,
        ArithOp::Max,
        ArithOp::Abs,
        ArithOp::Neg,
        ArithOp::Sign,
        ArithOp::Square,
        ArithOp::Sqrt,
        ArithOp::Cbrt,
        ArithOp::Round,
        ArithOp::RoundEven,
        ArithOp::Trunc,
        ArithOp::Floor,
        ArithOp::Ceil,
        ArithOp::Sin,
        ArithOp::Cos,
        ArithOp::Tan,
        ArithOp::Exp,
        ArithOp::Ln,
    ];

    /// Unary ops read only one lane register; binary ops read two operands
    /// (the lane register plus a stack slot or immediate).
    pub const fn is_unary(self) -> bool {
        matches!(
            self,
            ArithOp::Abs
                | ArithOp::Neg
                | ArithOp::Sign
                | ArithOp::Square
                | ArithOp::Sqrt
                | ArithOp::Cbrt
                | ArithOp::Round
                | ArithOp::RoundEven
                | ArithOp::Trunc
                | ArithOp::Floor
                | ArithOp::Ceil
                | ArithOp::Sin
                | ArithOp::Cos
                | ArithOp::Tan
                | ArithOp::Exp
                | ArithOp::Ln
        )
    }
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ArithOp::Add => "add",
            ArithOp::Sub => "sub",
            ArithOp::RSub => "rsub",
            ArithOp::Mul => "mul",
            ArithOp::Div => "div",
            ArithOp::RDiv => "rdiv",
            ArithOp::Mod => "mod",
            ArithOp::RMod => "rmod",
            ArithOp::Min => "min",
            ArithOp::Max => "max",
            ArithOp::Abs => "abs",
            ArithOp::Neg => "neg",
            ArithOp::Sign => "sign",
            ArithOp::Square => "square",
            ArithOp::Sqrt => "sqrt",
            ArithOp::Cbrt => "cbrt",
            ArithOp::Round => "round",
            ArithOp::RoundEven => "roundeven",
            ArithOp::Trunc => "trunc",
            ArithOp::Floor => "floor",
            ArithOp::Ceil => "ceil",
            ArithOp::Sin => "sin",
            ArithOp::Cos => "cos",
            ArithOp::Tan => "tan",
            ArithOp::Exp => "exp",
            ArithOp::Ln => "ln",
        })
    }
}

/// Mask/float/int conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConvOp {
    MaskToFloat,
    MaskToInt,
    IntToFloat,
    /// Float to int, updating `K` to clear lanes that didn't convert exactly.
    FloatToIntMasked,
    RoundToUnsigned,
    RoundToSigned,
    IntToString,
}

impl fmt::Display for ConvOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConvOp::MaskToFloat => "cvt.k2f",
            ConvOp::MaskToInt => "cvt.k2i",
            ConvOp::IntToFloat => "cvt.i2f",
            ConvOp::FloatToIntMasked => "cvt.f2i.m",
            ConvOp::RoundToUnsigned => "cvt.round.u",
            ConvOp::RoundToSigned => "cvt.round.s",
            ConvOp::IntToString => "cvt.i2s",
        })
    }
}

/// Comparison operators; each has a declared `inverse` used by the planner
/// to swap operand order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CmpOp {
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    pub const fn inverse(self) -> CmpOp {
        match self {
            CmpOp::Eq => CmpOp::Eq,
            CmpOp::Lt => CmpOp::Gt,
            CmpOp::Le => CmpOp::Ge,
            CmpOp::Gt => CmpOp::Lt,
            CmpOp::Ge => CmpOp::Le,
        }
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CmpOp::Eq => "eq",
            CmpOp::Lt => "lt",
            CmpOp::Le => "le",
            CmpOp::Gt => "gt",
            CmpOp::Ge => "ge",
        })
    }
}

/// Timestamp arithmetic/extraction, parameterized by [`Granularity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TsOp {
    Add,
    Diff,
    Extract,
    Trunc,
}

impl fmt::Display for TsOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TsOp::Add => "ts.add",
            TsOp::Diff => "ts.diff",
            TsOp::Extract => "ts.extract",
            TsOp::Trunc => "ts.trunc",
        })
    }
}

/// Simple (ungrouped) aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SimpleAggOp {
    Sum,
    Min,
    Max,
    Count,
}

impl fmt::Display for SimpleAggOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SimpleAggOp::Sum => "sum",
            SimpleAggOp::Min => "min",
            SimpleAggOp::Max => "max",
            SimpleAggOp::Count => "count",
        })
    }
}

/// Hash-bucket-keyed (slotted/grouped) aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SlotAggOp {
    Add,
    Min,
    Max,
    Count,
    /// Carried as `(sum, count)`, divided at materialization.
    Avg,
}

impl fmt::Display for SlotAggOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SlotAggOp::Add => "slotadd",
            SlotAggOp::Min => "slotmin",
            SlotAggOp::Max => "slotmax",
            SlotAggOp::Count => "slotcount",
            SlotAggOp::Avg => "slotavg",
        })
    }
}

/// String predicates and transforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StrOp {
    Equal,
    EqualCi,
    EqualUtf8Ci,
    Contains,
    Prefix,
    Suffix,
    Match,
    TrimWhitespace,
    /// Trim against a 4-character set given by a dictionary reference.
    TrimCharset,
    TrimPrefix,
    TrimSuffix,
    Substring,
    SplitPart,
    CharSkip,
}

impl StrOp {
    pub const ALL: [StrOp; 14] = [
        StrOp::Equal,
        StrOp::EqualCi,
        StrOp::EqualUtf8Ci,
        StrOp::Contains,
        StrOp::Prefix,
        StrOp::Suffix,
        StrOp::Match,
        StrOp::TrimWhitespace,
        StrOp::TrimCharset,
        StrOp::TrimPrefix,
        StrOp::TrimSuffix,
        StrOp::Substring,
        StrOp::SplitPart,
        StrOp::CharSkip,
    ];
}

impl fmt::Display for StrOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StrOp::Equal => "str.eq",
            StrOp::EqualCi => "str.eqci",
            StrOp::EqualUtf8Ci => "str.equtf8ci",
            StrOp::Contains => "str.contains",
            StrOp::Prefix => "str.prefix",
            StrOp::Suffix => "str.suffix",
            StrOp::Match => "str.match",
            StrOp::TrimWhitespace => "str.trim.ws",
            StrOp::TrimCharset => "str.trim.set",
            StrOp::TrimPrefix => "str.trim.prefix",
            StrOp::TrimSuffix => "str.trim.suffix",
            StrOp::Substring => "str.substring",
            StrOp::SplitPart => "str.splitpart",
            StrOp::CharSkip => "str.charskip",
        })
    }
}

/// One instruction. See module docs for why related opcodes are grouped
/// behind a sub-enum parameter instead of one flat variant per mnemonic.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Opcode {
    Ret,
    /// Skip `imm` bytes forward if `K == 0`.
    Jz(u64),

    RegOp(RegName, RegOp, Slot),

    Bool(BoolOp, Option<Slot>),

    Arith(ArithOp, Lanes, Slot),
    ArithImmF(ArithOp, Lanes, f64),
    ArithImmI(ArithOp, Lanes, i64),

    Convert(ConvOp),

    Cmp(CmpOp, Lanes, Slot),
    CmpImmF(CmpOp, Lanes, f64),
    CmpImmI(CmpOp, Lanes, i64),

    IsNan,
    CheckTag(u16),
    IsNull,
    IsNotNull,
    IsFalse,
    IsTrue,

    EqSlice,
    EqualV,
    EqualV4,
    EqualV8,

    TsOp(TsOp, Granularity),
    UnboxTs,
    BoxTs,
    ConstTm(DictRef),

    Geohash(Lanes),
    GridIndex(Lanes),

    FindSym(SymbolId),
    FindSymHint(SymbolId, Slot),
    FindSymRevHint(SymbolId, Slot),

    ToInt,
    ToF64,
    Unpack(u16),
    BoxValue,

    HashValue,
    HashValueChain(Slot),
    HashMember(Slot, TreeRef),
    HashLookup(Slot, TreeRef),

    AggSimple(SimpleAggOp),
    AggSlot(SlotAggOp, Slot),

    StrOp(StrOp),

    LitRef(Displacement, Displacement),
}

/// Static metadata for one opcode: category, register flags, immediate
/// shapes (in encoding order), mnemonic text, and inverse (if any).
pub struct OpMeta {
    pub category: Category,
    pub reads: RegSet,
    pub writes: RegSet,
    pub immediates: &'static [ImmediateShape],
    pub inverse: Option<CmpOp>,
}

impl Opcode {
    /// Static metadata used by the compiler, interpreter, and formatter.
    pub fn meta(&self) -> OpMeta {
        use Category::*;
        use ImmediateShape as Im;

        match self {
            Opcode::Ret => OpMeta {
                category: Control,
                reads: RegSet::empty(),
                writes: RegSet::empty(),
                immediates: &[],
                inverse: None,
            },
            Opcode::Jz(_) => OpMeta {
                category: Control,
                reads: RegSet::K,
                writes: RegSet::empty(),
                immediates: &[Im::U64],
                inverse: None,
            },
            Opcode::RegOp(name, _, _) => OpMeta {
                category: RegisterMove,
                reads: name.flag(),
                writes: name.flag(),
                immediates: &[Im::Slot],
                inverse: None,
            },
            Opcode::Bool(op, _) => OpMeta {
                category: BooleanMask,
                reads: RegSet::K,
                writes: RegSet::K,
                immediates: if op.is_unary() { &[] } else { &[Im::Slot] },
                inverse: None,
            },
            Opcode::Arith(_, _, _) => OpMeta {
                category: Arithmetic,
                reads: (RegSet::K | RegSet::S),
                writes: RegSet::S,
                immediates: &[Im::Slot],
                inverse: None,
            },
            Opcode::ArithImmF(_, _, _) => OpMeta {
                category: Arithmetic,
                reads: (RegSet::K | RegSet::S),
                writes: RegSet::S,
                immediates: &[Im::F64],
                inverse: None,
            },
            Opcode::ArithImmI(_, _, _) => OpMeta {
                category: Arithmetic,
                reads: (RegSet::K | RegSet::S),
                writes: RegSet::S,
                immediates: &[Im::I64],
                inverse: None,
            },
            Opcode::Convert(_) => OpMeta {
                category: Conversion,
                reads: (RegSet::K | RegSet::S),
                writes: (RegSet::S | RegSet::K),
                immediates: &[],
                inverse: None,
            },
            Opcode::Cmp(op, _, _) => OpMeta {
                category: Comparison,
                reads: (RegSet::K | RegSet::S),
                writes: RegSet::K,
                immediates: &[Im::Slot],
                inverse: Some(op.inverse()),
            },
            Opcode::CmpImmF(op, _, _) => OpMeta {
                category: Comparison,
                reads: (RegSet::K | RegSet::S),
                writes: RegSet::K,
                immediates: &[Im::F64],
                inverse: Some(op.inverse()),
            },
            Opcode::CmpImmI(op, _, _) => OpMeta {
                category: Comparison,
                reads: (RegSet::K | RegSet::S),
                writes: RegSet::K,
                immediates: &[Im::I64],
                inverse: Some(op.inverse()),
            },
            Opcode::IsNan | Opcode::IsNull | Opcode::IsNotNull | Opcode::IsFalse | Opcode::IsTrue => {
                OpMeta {
                    category: TypeTest,
                    reads: (RegSet::K | RegSet::V),
                    writes: RegSet::K,
                    immediates: &[],
                    inverse: None,
                }
            }
            Opcode::CheckTag(_) => OpMeta {
                category: TypeTest,
                reads: (RegSet::K | RegSet::V),
                writes: RegSet::K,
                immediates: &[Im::HexU16],
                inverse: None,
            },
            Opcode::EqSlice | Opcode::EqualV => OpMeta {
                category: SliceEquality,
                reads: (RegSet::K | RegSet::V),
                writes: RegSet::K,
                immediates: &[],
                inverse: None,
            },
            Opcode::EqualV4 | Opcode::EqualV8 => OpMeta {
                category: SliceEquality,
                reads: (RegSet::K | RegSet::V),
                writes: RegSet::K,
                immediates: &[],
                inverse: None,
            },
            Opcode::TsOp(_, _) => OpMeta {
                category: Timestamp,
                reads: (RegSet::K | RegSet::S),
                writes: RegSet::S,
                immediates: &[Im::U8],
                inverse: None,
            },
            Opcode::UnboxTs | Opcode::BoxTs => OpMeta {
                category: Timestamp,
                reads: (RegSet::K | RegSet::V),
                writes: (RegSet::S | RegSet::V),
                immediates: &[],
                inverse: None,
            },
            Opcode::ConstTm(_) => OpMeta {
                category: Timestamp,
                reads: RegSet::K,
                writes: RegSet::S,
                immediates: &[Im::Dict],
                inverse: None,
            },
            Opcode::Geohash(_) | Opcode::GridIndex(_) => OpMeta {
                category: Geo,
                reads: (RegSet::K | RegSet::S),
                writes: RegSet::S,
                immediates: &[Im::F64],
                inverse: None,
            },
            Opcode::FindSym(_) => OpMeta {
                category: FindSymbol,
                reads: (RegSet::K | RegSet::B),
                writes: (RegSet::K | RegSet::V),
                immediates: &[Im::U32],
                inverse: None,
            },
            Opcode::FindSymHint(_, _) | Opcode::FindSymRevHint(_, _) => OpMeta {
                category: FindSymbol,
                reads: (RegSet::K | RegSet::B),
                writes: (RegSet::K | RegSet::V),
                immediates: &[Im::U32, Im::Slot],
                inverse: None,
            },
            Opcode::ToInt | Opcode::ToF64 => OpMeta {
                category: BoxUnbox,
                reads: (RegSet::K | RegSet::V),
                writes: RegSet::S,
                immediates: &[],
                inverse: None,
            },
            Opcode::Unpack(_) => OpMeta {
                category: BoxUnbox,
                reads: (RegSet::K | RegSet::V),
                writes: (RegSet::K | RegSet::S),
                immediates: &[Im::HexU16],
                inverse: None,
            },
            Opcode::BoxValue => OpMeta {
                category: BoxUnbox,
                reads: (RegSet::K | RegSet::S),
                writes: RegSet::V,
                immediates: &[],
                inverse: None,
            },
            Opcode::HashValue => OpMeta {
                category: Hash,
                reads: (RegSet::K | RegSet::V),
                writes: RegSet::H,
                immediates: &[],
                inverse: None,
            },
            Opcode::HashValueChain(_) => OpMeta {
                category: Hash,
                reads: (RegSet::K | RegSet::V | RegSet::H),
                writes: RegSet::H,
                immediates: &[Im::Slot],
                inverse: None,
            },
            Opcode::HashMember(_, _) => OpMeta {
                category: Hash,
                reads: (RegSet::K | RegSet::H),
                writes: RegSet::K,
                immediates: &[Im::Slot, Im::U16],
                inverse: None,
            },
            Opcode::HashLookup(_, _) => OpMeta {
                category: Hash,
                reads: (RegSet::K | RegSet::H),
                writes: (RegSet::K | RegSet::V | RegSet::L),
                immediates: &[Im::Slot, Im::U16],
                inverse: None,
            },
            Opcode::AggSimple(_) => OpMeta {
                category: Aggregate,
                reads: (RegSet::K | RegSet::S),
                writes: RegSet::empty(),
                immediates: &[],
                inverse: None,
            },
            Opcode::AggSlot(_, _) => OpMeta {
                category: Aggregate,
                reads: (RegSet::K | RegSet::S | RegSet::L),
                writes: RegSet::empty(),
                immediates: &[Im::Slot],
                inverse: None,
            },
            Opcode::StrOp(op) => OpMeta {
                category: String,
                reads: (RegSet::K | RegSet::V),
                writes: if matches!(
                    op,
                    StrOp::Equal
                        | StrOp::EqualCi
                        | StrOp::EqualUtf8Ci
                        | StrOp::Contains
                        | StrOp::Prefix
                        | StrOp::Suffix
                        | StrOp::Match
                ) {
                    RegSet::K
                } else {
                    RegSet::V
                },
                immediates: match op {
                    StrOp::TrimCharset => &[Im::Dict],
                    StrOp::Substring => &[Im::I32, Im::I32],
                    StrOp::SplitPart => &[Im::U8, Im::U8],
                    _ => &[],
                },
                inverse: None,
            },
            Opcode::LitRef(_, _) => OpMeta {
                category: Literal,
                reads: RegSet::empty(),
                writes: RegSet::V,
                immediates: &[Im::HexU32, Im::HexU32],
                inverse: None,
            },
        }
    }
}
