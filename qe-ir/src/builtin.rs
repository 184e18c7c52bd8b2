//! The builtin-function table: one `BuiltinOp` enum value per function
//! name, each mapped to a `{check, simplify, return_type_set, private}`
//! descriptor.
//!
//! The enum lists every builtin the surface language can spell out, plus a
//! handful the query planner alone produces (`private: true` below) —
//! those never originate from parsed input, so a check pass that sees one
//! coming out of the parser is a planner bug, not a user error.

use crate::error::{ExprError, NodeId};
use crate::expr::{Expr, Literal, Path, TypeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BuiltinOp {
    Concat,
    Trim,
    Ltrim,
    Rtrim,
    Upper,
    Lower,
    Contains,
    ContainsCi,
    EqualsCi,
    CharLength,
    IsSubnetOf,
    SubString,
    SplitPart,

    Round,
    RoundEven,
    Trunc,
    Floor,
    Ceil,

    Sqrt,
    Cbrt,
    Exp,
    ExpM1,
    Exp2,
    Exp10,
    Hypot,
    Ln,
    Ln1p,
    Log,
    Log2,
    Log10,
    Pow,

    Pi,
    Degrees,
    Radians,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Atan2,

    Least,
    Greatest,
    WidthBucket,

    /// `BEFORE(x, y, z...)` == `x < y && y < z && ...`; at least two args.
    Before,

    DateAddMicrosecond,
    DateAddMillisecond,
    DateAddSecond,
    DateAddMinute,
    DateAddHour,
    DateAddDay,
    DateAddMonth,
    DateAddYear,

    DateDiffMicrosecond,
    DateDiffMillisecond,
    DateDiffSecond,
    DateDiffMinute,
    DateDiffHour,
    DateDiffDay,
    DateDiffMonth,
    DateDiffYear,

    DateExtractMicrosecond,
    DateExtractMillisecond,
    DateExtractSecond,
    DateExtractMinute,
    DateExtractHour,
    DateExtractDay,
    DateExtractMonth,
    DateExtractYear,
    DateToUnixEpoch,
    DateToUnixMicro,

    DateTruncMicrosecond,
    DateTruncMillisecond,
    DateTruncSecond,
    DateTruncMinute,
    DateTruncHour,
    DateTruncDay,
    DateTruncMonth,
    DateTruncYear,

    GeoHash,
    GeoGridIndex,

    /// `SIZE(x)`.
    ObjectSize,

    TableGlob,
    TablePattern,

    // Produced only by the query planner, never by the parser.
    InSubquery,
    HashLookup,
    InReplacement,
    HashReplacement,
    ScalarReplacement,
    StructReplacement,
    ListReplacement,

    TimeBucket,

    /// Catch-all for opaque planner-internal builtins not otherwise named.
    Unspecified,
}

impl BuiltinOp {
    /// The canonical surface-language name (the shortest spelling, mirroring
    /// the source's "shortest wins" reverse-mapping rule for synonyms like
    /// `CHAR_LENGTH`/`CHARACTER_LENGTH`).
    pub fn name(self) -> &'static str {
        use BuiltinOp::*;
        match self {
            Concat => "CONCAT",
            Trim => "TRIM",
            Ltrim => "LTRIM",
            Rtrim => "RTRIM",
            Upper => "UPPER",
            Lower => "LOWER",
            Contains => "CONTAINS",
            ContainsCi => "CONTAINS_CI",
            EqualsCi => "EQUALS_CI",
            CharLength => "CHAR_LENGTH",
            IsSubnetOf => "IS_SUBNET_OF",
            SubString => "SUBSTRING",
            SplitPart => "SPLIT_PART",
            Round => "ROUND",
            RoundEven => "ROUND_EVEN",
            Trunc => "TRUNC",
            Floor => "FLOOR",
            Ceil => "CEIL",
            Sqrt => "SQRT",
            Cbrt => "CBRT",
            Exp => "EXP",
            ExpM1 => "EXPM1",
            Exp2 => "EXP2",
            Exp10 => "EXP10",
            Hypot => "HYPOT",
            Ln => "LN",
            Ln1p => "LN1P",
            Log => "LOG",
            Log2 => "LOG2",
            Log10 => "LOG10",
            Pow => "POW",
            Pi => "PI",
            Degrees => "DEGREES",
            Radians => "RADIANS",
            Sin => "SIN",
            Cos => "COS",
            Tan => "TAN",
            Asin => "ASIN",
            Acos => "ACOS",
            Atan => "ATAN",
            Atan2 => "ATAN2",
            Least => "LEAST",
            Greatest => "GREATEST",
            WidthBucket => "WIDTH_BUCKET",
            Before => "BEFORE",
            DateAddMicrosecond => "DATE_ADD_MICROSECOND",
            DateAddMillisecond => "DATE_ADD_MILLISECOND",
            DateAddSecond => "DATE_ADD_SECOND",
            DateAddMinute => "DATE_ADD_MINUTE",
            DateAddHour => "DATE_ADD_HOUR",
            DateAddDay => "DATE_ADD_DAY",
            DateAddMonth => "DATE_ADD_MONTH",
            DateAddYear => "DATE_ADD_YEAR",
            DateDiffMicrosecond => "DATE_DIFF_MICROSECOND",
            DateDiffMillisecond => "DATE_DIFF_MILLISECOND",
            DateDiffSecond => "DATE_DIFF_SECOND",
            DateDiffMinute => "DATE_DIFF_MINUTE",
            DateDiffHour => "DATE_DIFF_HOUR",
            DateDiffDay => "DATE_DIFF_DAY",
            DateDiffMonth => "DATE_DIFF_MONTH",
            DateDiffYear => "DATE_DIFF_YEAR",
            DateExtractMicrosecond => "DATE_EXTRACT_MICROSECOND",
            DateExtractMillisecond => "DATE_EXTRACT_MILLISECOND",
            DateExtractSecond => "DATE_EXTRACT_SECOND",
            DateExtractMinute => "DATE_EXTRACT_MINUTE",
            DateExtractHour => "DATE_EXTRACT_HOUR",
            DateExtractDay => "DATE_EXTRACT_DAY",
            DateExtractMonth => "DATE_EXTRACT_MONTH",
            DateExtractYear => "DATE_EXTRACT_YEAR",
            DateToUnixEpoch => "TO_UNIX_EPOCH",
            DateToUnixMicro => "TO_UNIX_MICRO",
            DateTruncMicrosecond => "DATE_TRUNC_MICROSECOND",
            DateTruncMillisecond => "DATE_TRUNC_MILLISECOND",
            DateTruncSecond => "DATE_TRUNC_SECOND",
            DateTruncMinute => "DATE_TRUNC_MINUTE",
            DateTruncHour => "DATE_TRUNC_HOUR",
            DateTruncDay => "DATE_TRUNC_DAY",
            DateTruncMonth => "DATE_TRUNC_MONTH",
            DateTruncYear => "DATE_TRUNC_YEAR",
            GeoHash => "GEO_HASH",
            GeoGridIndex => "GEO_GRID_INDEX",
            ObjectSize => "SIZE",
            TableGlob => "TABLE_GLOB",
            TablePattern => "TABLE_PATTERN",
            InSubquery => "IN_SUBQUERY",
            HashLookup => "HASH_LOOKUP",
            InReplacement => "IN_REPLACEMENT",
            HashReplacement => "HASH_REPLACEMENT",
            ScalarReplacement => "SCALAR_REPLACEMENT",
            StructReplacement => "STRUCT_REPLACEMENT",
            ListReplacement => "LIST_REPLACEMENT",
            TimeBucket => "TIME_BUCKET",
            Unspecified => "UNSPECIFIED",
        }
    }

    /// True for builtins only the query planner may produce.
    pub fn is_private(self) -> bool {
        use BuiltinOp::*;
        matches!(
            self,
            InSubquery
                | HashLookup
                | InReplacement
                | HashReplacement
                | ScalarReplacement
                | StructReplacement
                | ListReplacement
        )
    }
}

type CheckFn = fn(NodeId, &[Expr], &dyn Fn(&Path) -> TypeSet) -> Result<(), ExprError>;
type SimplifyFn = fn(&[Expr], &dyn Fn(&Path) -> TypeSet) -> Option<Expr>;

/// Per-builtin behavior, looked up by [`descriptor`].
pub struct Descriptor {
    pub check: CheckFn,
    pub simplify: SimplifyFn,
    pub return_type_set: TypeSet,
    pub private: bool,
}

fn no_simplify(_args: &[Expr], _hint: &dyn Fn(&Path) -> TypeSet) -> Option<Expr> {
    None
}

fn check_arity(node: NodeId, args: &[Expr], min: usize, max: Option<usize>) -> Result<(), ExprError> {
    let ok = args.len() >= min && max.map_or(true, |m| args.len() <= m);
    if ok {
        Ok(())
    } else {
        Err(ExprError::Arity {
            node,
            expected: if max == Some(min) { "exact" } else { "range" },
            got: args.len(),
        })
    }
}

fn check_fixed(node: NodeId, args: &[Expr], n: usize) -> Result<(), ExprError> {
    check_arity(node, args, n, Some(n))
}

/// Arity-only check used by builtins that don't (yet) get a fully typed
/// descriptor below — still validated, just not type-checked per argument.
fn check_variadic_min1(node: NodeId, args: &[Expr], _hint: &dyn Fn(&Path) -> TypeSet) -> Result<(), ExprError> {
    check_arity(node, args, 1, None)
}

fn literal_str<'a>(node: NodeId, args: &'a [Expr], i: usize) -> Result<&'a str, ExprError> {
    args.get(i)
        .and_then(Expr::as_literal)
        .and_then(Literal::as_str)
        .ok_or(ExprError::NotStringLiteral { node, arg: i })
}

// ---- CONCAT ----------------------------------------------------------

fn check_concat(node: NodeId, args: &[Expr], hint: &dyn Fn(&Path) -> TypeSet) -> Result<(), ExprError> {
    check_arity(node, args, 1, None)?;
    for (i, a) in args.iter().enumerate() {
        if !a.type_set(hint).satisfies(TypeSet::STRING.or_missing()) {
            return Err(ExprError::TypeMismatch { node, arg: i });
        }
    }
    Ok(())
}

fn simplify_concat(args: &[Expr], _hint: &dyn Fn(&Path) -> TypeSet) -> Option<Expr> {
    if args.len() >= 2 && args.iter().all(Expr::is_literal) {
        let mut out = String::new();
        for a in args {
            out.push_str(a.as_literal()?.as_str()?);
        }
        return Some(Expr::Literal(Literal::String(out)));
    }
    None
}

// ---- CHAR_LENGTH -------------------------------------------------------

fn check_char_length(node: NodeId, args: &[Expr], hint: &dyn Fn(&Path) -> TypeSet) -> Result<(), ExprError> {
    check_fixed(node, args, 1)?;
    if !args[0].type_set(hint).satisfies(TypeSet::STRING.or_missing()) {
        return Err(ExprError::TypeMismatch { node, arg: 0 });
    }
    Ok(())
}

fn simplify_char_length(args: &[Expr], _hint: &dyn Fn(&Path) -> TypeSet) -> Option<Expr> {
    let s = args[0].as_literal()?.as_str()?;
    Some(Expr::Literal(Literal::Integer(s.chars().count() as i64)))
}

fn check_unary_string(node: NodeId, args: &[Expr], hint: &dyn Fn(&Path) -> TypeSet) -> Result<(), ExprError> {
    check_char_length(node, args, hint)
}

// ---- date/epoch family (check only varies by arity; folding needs an
// evaluator over literal timestamps that this crate doesn't own, so these
// are arity+type checked but not constant-folded here) --------------------

fn check_unary_time(node: NodeId, args: &[Expr], hint: &dyn Fn(&Path) -> TypeSet) -> Result<(), ExprError> {
    check_fixed(node, args, 1)?;
    if !args[0].type_set(hint).satisfies(TypeSet::TIME.or_missing()) {
        return Err(ExprError::TypeMismatch { node, arg: 0 });
    }
    Ok(())
}

fn check_unary_numeric(node: NodeId, args: &[Expr], hint: &dyn Fn(&Path) -> TypeSet) -> Result<(), ExprError> {
    check_fixed(node, args, 1)?;
    if !args[0].type_set(hint).satisfies(TypeSet::NUMERIC.or_missing()) {
        return Err(ExprError::TypeMismatch { node, arg: 0 });
    }
    Ok(())
}

fn check_binary_numeric(node: NodeId, args: &[Expr], hint: &dyn Fn(&Path) -> TypeSet) -> Result<(), ExprError> {
    check_fixed(node, args, 2)?;
    for i in 0..2 {
        if !args[i].type_set(hint).satisfies(TypeSet::NUMERIC.or_missing()) {
            return Err(ExprError::TypeMismatch { node, arg: i });
        }
    }
    Ok(())
}

/// `LOG(x)` (natural log) or `LOG(base, x)` — neither the unary nor the
/// binary numeric check fits since both arities are legal.
fn check_log(node: NodeId, args: &[Expr], hint: &dyn Fn(&Path) -> TypeSet) -> Result<(), ExprError> {
    check_arity(node, args, 1, Some(2))?;
    for (i, a) in args.iter().enumerate() {
        if !a.type_set(hint).satisfies(TypeSet::NUMERIC.or_missing()) {
            return Err(ExprError::TypeMismatch { node, arg: i });
        }
    }
    Ok(())
}

fn check_nullary(node: NodeId, args: &[Expr], _hint: &dyn Fn(&Path) -> TypeSet) -> Result<(), ExprError> {
    check_fixed(node, args, 0)
}

// ---- SIZE ---------------------------------------------------------------

fn check_size(node: NodeId, args: &[Expr], hint: &dyn Fn(&Path) -> TypeSet) -> Result<(), ExprError> {
    check_fixed(node, args, 1)?;
    if !args[0].type_set(hint).satisfies((TypeSet::LIST | TypeSet::STRUCT).or_missing()) {
        return Err(ExprError::TypeMismatch { node, arg: 0 });
    }
    Ok(())
}

// ---- TRIM family, with the mirrored rewrite tables --------------------
//
// `simplify_rtrim` and `simplify_ltrim` push case-changing calls outward
// and collapse redundant nesting. The two must be mirrors of each other
// (swap `Ltrim`/`Rtrim` throughout); the `Lower` arm below uses `Ltrim`
// consistently with that mirror, unlike the asymmetric arm this was
// ported from.

fn check_trim(node: NodeId, args: &[Expr], hint: &dyn Fn(&Path) -> TypeSet) -> Result<(), ExprError> {
    check_arity(node, args, 1, Some(2))?;
    let str_arg = if args.len() == 2 { 1 } else { 0 };
    if !args[str_arg].type_set(hint).satisfies(TypeSet::STRING.or_missing()) {
        return Err(ExprError::TypeMismatch { node, arg: str_arg });
    }
    Ok(())
}

fn inner_call(args: &[Expr]) -> Option<(BuiltinOp, &[Expr])> {
    match args.first()? {
        Expr::Builtin { op, args } => Some((*op, args.as_slice())),
        _ => None,
    }
}

fn builtin1(op: BuiltinOp, arg: Expr) -> Expr {
    Expr::Builtin { op, args: vec![arg] }
}

fn simplify_rtrim(args: &[Expr], _hint: &dyn Fn(&Path) -> TypeSet) -> Option<Expr> {
    let (inner_op, inner_args) = inner_call(args)?;
    match inner_op {
        BuiltinOp::Ltrim => Some(builtin1(BuiltinOp::Trim, inner_args[0].clone())),
        BuiltinOp::Rtrim => Some(args[0].clone()),
        BuiltinOp::Trim => Some(args[0].clone()),
        BuiltinOp::Upper => Some(builtin1(
            BuiltinOp::Upper,
            builtin1(BuiltinOp::Rtrim, inner_args[0].clone()),
        )),
        BuiltinOp::Lower => Some(builtin1(
            BuiltinOp::Lower,
            builtin1(BuiltinOp::Rtrim, inner_args[0].clone()),
        )),
        _ => None,
    }
}

fn simplify_ltrim(args: &[Expr], _hint: &dyn Fn(&Path) -> TypeSet) -> Option<Expr> {
    let (inner_op, inner_args) = inner_call(args)?;
    match inner_op {
        BuiltinOp::Rtrim => Some(builtin1(BuiltinOp::Trim, inner_args[0].clone())),
        BuiltinOp::Ltrim => Some(args[0].clone()),
        BuiltinOp::Trim => Some(args[0].clone()),
        BuiltinOp::Upper => Some(builtin1(
            BuiltinOp::Upper,
            builtin1(BuiltinOp::Ltrim, inner_args[0].clone()),
        )),
        BuiltinOp::Lower => Some(builtin1(
            BuiltinOp::Lower,
            builtin1(BuiltinOp::Ltrim, inner_args[0].clone()),
        )),
        _ => None,
    }
}

fn simplify_trim(args: &[Expr], _hint: &dyn Fn(&Path) -> TypeSet) -> Option<Expr> {
    let (inner_op, _) = inner_call(args)?;
    if matches!(inner_op, BuiltinOp::Trim) {
        return Some(args[0].clone());
    }
    None
}

// ---- CONTAINS / CONTAINS_CI --------------------------------------------

fn check_contains(node: NodeId, args: &[Expr], hint: &dyn Fn(&Path) -> TypeSet) -> Result<(), ExprError> {
    check_fixed(node, args, 2)?;
    if !args[0].type_set(hint).satisfies(TypeSet::STRING.or_missing()) {
        return Err(ExprError::TypeMismatch { node, arg: 0 });
    }
    let _ = literal_str(node, args, 1)?;
    Ok(())
}

/// `CONTAINS(UPPER(x), "literal")` folds to a case-insensitive contains
/// check over `x`, or to a constant `false` when the literal's own case
/// doesn't match what the wrapping function claims to produce.
fn simplify_contains(args: &[Expr], _hint: &dyn Fn(&Path) -> TypeSet) -> Option<Expr> {
    let pattern = args[1].as_literal()?.as_str()?.to_string();
    let (inner_op, inner_args) = inner_call(args)?;
    match inner_op {
        BuiltinOp::Upper => {
            if pattern != pattern.to_uppercase() {
                Some(Expr::Literal(Literal::Bool(false)))
            } else {
                Some(Expr::Builtin {
                    op: BuiltinOp::ContainsCi,
                    args: vec![inner_args[0].clone(), Expr::Literal(Literal::String(pattern))],
                })
            }
        }
        BuiltinOp::Lower => {
            if pattern != pattern.to_lowercase() {
                Some(Expr::Literal(Literal::Bool(false)))
            } else {
                Some(Expr::Builtin {
                    op: BuiltinOp::ContainsCi,
                    args: vec![inner_args[0].clone(), Expr::Literal(Literal::String(pattern))],
                })
            }
        }
        _ => None,
    }
}

// ---- IS_SUBNET_OF -------------------------------------------------------

fn check_is_subnet_of(node: NodeId, args: &[Expr], hint: &dyn Fn(&Path) -> TypeSet) -> Result<(), ExprError> {
    check_arity(node, args, 2, Some(3))?;
    for (i, a) in args.iter().enumerate() {
        if !a.type_set(hint).satisfies(TypeSet::STRING.or_missing()) {
            return Err(ExprError::TypeMismatch { node, arg: i });
        }
    }
    if args.len() == 2 {
        let cidr = literal_str(node, args, 0)?;
        parse_cidr(cidr).ok_or_else(|| ExprError::InvalidLiteral {
            node,
            message: format!("not a CIDR literal: {cidr:?}"),
        })?;
    } else {
        parse_ipv4(literal_str(node, args, 0)?).ok_or_else(|| ExprError::InvalidLiteral {
            node,
            message: "not an IPv4 literal".into(),
        })?;
        parse_ipv4(literal_str(node, args, 1)?).ok_or_else(|| ExprError::InvalidLiteral {
            node,
            message: "not an IPv4 literal".into(),
        })?;
    }
    Ok(())
}

fn parse_ipv4(s: &str) -> Option<u32> {
    let mut out = 0u32;
    let mut n = 0;
    for part in s.split('.') {
        n += 1;
        if n > 4 {
            return None;
        }
        out = (out << 8) | part.parse::<u8>().ok()? as u32;
    }
    (n == 4).then_some(out)
}

fn parse_cidr(s: &str) -> Option<(u32, u8)> {
    let (ip, bits) = s.split_once('/')?;
    let addr = parse_ipv4(ip)?;
    let bits: u8 = bits.parse().ok()?;
    (bits <= 32).then_some((addr, bits))
}

/// Two-arg `IS_SUBNET_OF(cidr, candidate)` expands the CIDR literal to an
/// explicit `[min_ip, max_ip]` bound; the three-arg degenerate form
/// collapses `min == max` to equality and `min > max` to a constant false.
fn simplify_is_subnet_of(args: &[Expr], _hint: &dyn Fn(&Path) -> TypeSet) -> Option<Expr> {
    if args.len() == 2 {
        let cidr = args[0].as_literal()?.as_str()?;
        let (addr, bits) = parse_cidr(cidr)?;
        let mask: u32 = if bits == 0 { 0 } else { !0u32 << (32 - bits) };
        let min = addr & mask;
        let max = min | !mask;
        return Some(Expr::Builtin {
            op: BuiltinOp::IsSubnetOf,
            args: vec![
                Expr::Literal(Literal::String(ipv4_to_string(min))),
                Expr::Literal(Literal::String(ipv4_to_string(max))),
                args[1].clone(),
            ],
        });
    }
    if args.len() == 3 {
        let min = parse_ipv4(args[0].as_literal()?.as_str()?)?;
        let max = parse_ipv4(args[1].as_literal()?.as_str()?)?;
        if min == max {
            return Some(Expr::Compare {
                op: crate::expr::CompareOp::Eq,
                left: Box::new(args[2].clone()),
                right: Box::new(args[0].clone()),
            });
        }
        if min > max {
            return Some(Expr::Literal(Literal::Bool(false)));
        }
    }
    None
}

fn ipv4_to_string(addr: u32) -> String {
    format!(
        "{}.{}.{}.{}",
        (addr >> 24) & 0xff,
        (addr >> 16) & 0xff,
        (addr >> 8) & 0xff,
        addr & 0xff
    )
}

// ---- BEFORE --------------------------------------------------------------

fn check_before(node: NodeId, args: &[Expr], hint: &dyn Fn(&Path) -> TypeSet) -> Result<(), ExprError> {
    check_arity(node, args, 2, None)?;
    for (i, a) in args.iter().enumerate() {
        if !a.type_set(hint).satisfies(TypeSet::TIME.or_missing()) {
            return Err(ExprError::TypeMismatch { node, arg: i });
        }
    }
    Ok(())
}

/// `BEFORE(a, b, c, ...)` is the conjunction of pairwise orderings;
/// literal-timestamp pairs fold directly to a bool.
fn simplify_before(args: &[Expr], _hint: &dyn Fn(&Path) -> TypeSet) -> Option<Expr> {
    let timestamps: Option<Vec<i64>> = args
        .iter()
        .map(|a| match a.as_literal() {
            Some(Literal::Timestamp(t)) => Some(*t),
            _ => None,
        })
        .collect();
    if let Some(ts) = timestamps {
        let ordered = ts.windows(2).all(|w| w[0] < w[1]);
        return Some(Expr::Literal(Literal::Bool(ordered)));
    }
    if args.len() > 2 {
        let mut conj = Expr::Compare {
            op: crate::expr::CompareOp::Lt,
            left: Box::new(args[0].clone()),
            right: Box::new(args[1].clone()),
        };
        for w in args.windows(2).skip(1) {
            conj = Expr::Logical {
                op: crate::expr::LogicalOp::And,
                args: vec![
                    conj,
                    Expr::Compare {
                        op: crate::expr::CompareOp::Lt,
                        left: Box::new(w[0].clone()),
                        right: Box::new(w[1].clone()),
                    },
                ],
            };
        }
        return Some(conj);
    }
    None
}

// ---- SUBSTRING / SPLIT_PART ---------------------------------------------

fn check_substring(node: NodeId, args: &[Expr], hint: &dyn Fn(&Path) -> TypeSet) -> Result<(), ExprError> {
    check_arity(node, args, 2, Some(3))?;
    if !args[0].type_set(hint).satisfies(TypeSet::STRING.or_missing()) {
        return Err(ExprError::TypeMismatch { node, arg: 0 });
    }
    for i in 1..args.len() {
        if !args[i].type_set(hint).satisfies(TypeSet::NUMERIC.or_missing()) {
            return Err(ExprError::TypeMismatch { node, arg: i });
        }
    }
    Ok(())
}

/// Normalizes a negative start offset to `1` (SQL `SUBSTRING` offsets are
/// 1-based and clamp rather than wrap), defaults a missing length to
/// `i32::MAX`, and pushes the call under `UPPER`/`LOWER` the same way the
/// TRIM family does.
fn simplify_sub_string(args: &[Expr], _hint: &dyn Fn(&Path) -> TypeSet) -> Option<Expr> {
    if let Some((inner_op, inner_args)) = inner_call(args) {
        if matches!(inner_op, BuiltinOp::Upper | BuiltinOp::Lower) {
            let mut new_args = args.to_vec();
            new_args[0] = inner_args[0].clone();
            return Some(builtin1(inner_op, Expr::Builtin {
                op: BuiltinOp::SubString,
                args: new_args,
            }));
        }
    }
    if let Some(Literal::Integer(offset)) = args.get(1).and_then(Expr::as_literal) {
        if *offset < 0 {
            let mut new_args = args.to_vec();
            new_args[1] = Expr::Literal(Literal::Integer(1));
            return Some(Expr::Builtin {
                op: BuiltinOp::SubString,
                args: new_args,
            });
        }
    }
    None
}

fn check_split_part(node: NodeId, args: &[Expr], hint: &dyn Fn(&Path) -> TypeSet) -> Result<(), ExprError> {
    check_fixed(node, args, 3)?;
    if !args[0].type_set(hint).satisfies(TypeSet::STRING.or_missing()) {
        return Err(ExprError::TypeMismatch { node, arg: 0 });
    }
    let _ = literal_str(node, args, 1)?;
    if !args[2].type_set(hint).satisfies(TypeSet::INTEGER.or_missing()) {
        return Err(ExprError::TypeMismatch { node, arg: 2 });
    }
    Ok(())
}

// ---- planner-private builtins: arity fixed by what the planner emits ---

fn check_replacement_index(node: NodeId, args: &[Expr], _hint: &dyn Fn(&Path) -> TypeSet) -> Result<(), ExprError> {
    check_fixed(node, args, 1)
}

fn check_hash_replacement(node: NodeId, args: &[Expr], _hint: &dyn Fn(&Path) -> TypeSet) -> Result<(), ExprError> {
    check_fixed(node, args, 4)?;
    let kind = literal_str(node, args, 1)?;
    if kind != "str" && kind != "int" && kind != "float" {
        return Err(ExprError::BadHashKind {
            node,
            kind: kind.to_string(),
        });
    }
    Ok(())
}

macro_rules! desc {
    ($check:expr, $simplify:expr, $ret:expr) => {
        Descriptor {
            check: $check,
            simplify: $simplify,
            return_type_set: $ret,
            private: false,
        }
    };
    ($check:expr, $simplify:expr, $ret:expr, private) => {
        Descriptor {
            check: $check,
            simplify: $simplify,
            return_type_set: $ret,
            private: true,
        }
    };
}

/// Looks up the `{check, simplify, return_type_set, private}` tuple for
/// one builtin.
pub fn descriptor(op: BuiltinOp) -> Descriptor {
    use BuiltinOp::*;
    let missing_str = TypeSet::STRING | TypeSet::MISSING;
    let missing_num = TypeSet::NUMERIC | TypeSet::MISSING;
    let missing_int = TypeSet::INTEGER | TypeSet::MISSING;
    let missing_bool = TypeSet::LOGICAL | TypeSet::MISSING;
    let missing_time = TypeSet::TIME | TypeSet::MISSING;

    match op {
        Concat => desc!(check_concat, simplify_concat, missing_str),
        CharLength => desc!(check_char_length, simplify_char_length, missing_int),
        Trim => desc!(check_trim, simplify_trim, missing_str),
        Ltrim => desc!(check_trim, simplify_ltrim, missing_str),
        Rtrim => desc!(check_trim, simplify_rtrim, missing_str),
        Upper => desc!(check_unary_string, no_simplify, missing_str),
        Lower => desc!(check_unary_string, no_simplify, missing_str),
        Contains => desc!(check_contains, simplify_contains, missing_bool),
        ContainsCi => desc!(check_contains, no_simplify, missing_bool),
        EqualsCi => desc!(check_contains, no_simplify, missing_bool),
        IsSubnetOf => desc!(check_is_subnet_of, simplify_is_subnet_of, missing_bool),
        SubString => desc!(check_substring, simplify_sub_string, missing_str),
        SplitPart => desc!(check_split_part, no_simplify, missing_str),

        Round | RoundEven | Trunc | Floor | Ceil | Sqrt | Cbrt | Exp | ExpM1 | Exp2 | Exp10
        | Ln | Ln1p | Log2 | Log10 | Degrees | Radians | Sin | Cos | Tan | Asin | Acos
        | Atan => desc!(check_unary_numeric, no_simplify, missing_num),
        Log => desc!(check_log, no_simplify, missing_num),
        Hypot | Pow | Atan2 => desc!(check_binary_numeric, no_simplify, missing_num),
        Pi => desc!(check_nullary, no_simplify, TypeSet::FLOAT),
        Least | Greatest => desc!(check_variadic_min1, no_simplify, missing_num),
        WidthBucket => desc!(check_variadic_min1, no_simplify, missing_num),

        Before => desc!(check_before, simplify_before, missing_bool),

        DateAddMicrosecond | DateAddMillisecond | DateAddSecond | DateAddMinute | DateAddHour
        | DateAddDay | DateAddMonth | DateAddYear => {
            desc!(check_binary_numeric, no_simplify, missing_time)
        }
        DateDiffMicrosecond | DateDiffMillisecond | DateDiffSecond | DateDiffMinute
        | DateDiffHour | DateDiffDay | DateDiffMonth | DateDiffYear => {
            desc!(check_binary_numeric, no_simplify, missing_int)
        }
        DateExtractMicrosecond | DateExtractMillisecond | DateExtractSecond
        | DateExtractMinute | DateExtractHour | DateExtractDay | DateExtractMonth
        | DateExtractYear => desc!(check_unary_time, no_simplify, missing_int),
        DateToUnixEpoch => desc!(check_unary_time, no_simplify, missing_int),
        DateToUnixMicro => desc!(check_unary_time, no_simplify, missing_int),
        DateTruncMicrosecond | DateTruncMillisecond | DateTruncSecond | DateTruncMinute
        | DateTruncHour | DateTruncDay | DateTruncMonth | DateTruncYear => {
            desc!(check_unary_time, no_simplify, missing_time)
        }

        GeoHash | GeoGridIndex => desc!(check_variadic_min1, no_simplify, missing_str),

        ObjectSize => desc!(check_size, no_simplify, missing_int),

        TableGlob | TablePattern => desc!(check_variadic_min1, no_simplify, TypeSet::ANY),

        InSubquery => desc!(check_variadic_min1, no_simplify, missing_bool, private),
        HashLookup => desc!(check_variadic_min1, no_simplify, TypeSet::ANY, private),
        InReplacement => desc!(check_replacement_index, no_simplify, missing_bool, private),
        HashReplacement => desc!(check_hash_replacement, no_simplify, TypeSet::ANY, private),
        ScalarReplacement => desc!(check_replacement_index, no_simplify, TypeSet::ANY, private),
        StructReplacement => desc!(check_replacement_index, no_simplify, TypeSet::STRUCT, private),
        ListReplacement => desc!(check_replacement_index, no_simplify, TypeSet::LIST, private),

        TimeBucket => desc!(check_binary_numeric, no_simplify, missing_time),

        Unspecified => desc!(check_variadic_min1, no_simplify, TypeSet::ANY),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::CompareOp;

    fn no_hint(_: &Path) -> TypeSet {
        TypeSet::ANY
    }

    #[test]
    fn ltrim_mirrors_rtrim_on_lower() {
        let inner = Expr::Builtin {
            op: BuiltinOp::Lower,
            args: vec![Expr::Literal(Literal::String("x".into()))],
        };
        let rewritten = simplify_ltrim(&[inner], &no_hint).expect("should rewrite");
        match rewritten {
            Expr::Builtin { op: BuiltinOp::Lower, args } => match &args[0] {
                Expr::Builtin { op: BuiltinOp::Ltrim, .. } => {}
                other => panic!("expected Lower(Ltrim(_)), got {other:?}"),
            },
            other => panic!("expected Lower(Ltrim(_)), got {other:?}"),
        }
    }

    #[test]
    fn rtrim_mirrors_itself_on_lower() {
        let inner = Expr::Builtin {
            op: BuiltinOp::Lower,
            args: vec![Expr::Literal(Literal::String("x".into()))],
        };
        let rewritten = simplify_rtrim(&[inner], &no_hint).expect("should rewrite");
        match rewritten {
            Expr::Builtin { op: BuiltinOp::Lower, args } => match &args[0] {
                Expr::Builtin { op: BuiltinOp::Rtrim, .. } => {}
                other => panic!("expected Lower(Rtrim(_)), got {other:?}"),
            },
            other => panic!("expected Lower(Rtrim(_)), got {other:?}"),
        }
    }

    #[test]
    fn concat_folds_literals() {
        let args = vec![
            Expr::Literal(Literal::String("a".into())),
            Expr::Literal(Literal::String("b".into())),
        ];
        let folded = simplify_concat(&args, &no_hint).unwrap();
        assert!(matches!(folded, Expr::Literal(Literal::String(s)) if s == "ab"));
    }

    #[test]
    fn contains_ci_fold_to_false_on_case_mismatch() {
        let args = vec![
            Expr::Builtin {
                op: BuiltinOp::Upper,
                args: vec![Expr::Path(Path::root("name"))],
            },
            Expr::Literal(Literal::String("lower".into())),
        ];
        let folded = simplify_contains(&args, &no_hint).unwrap();
        assert!(matches!(folded, Expr::Literal(Literal::Bool(false))));
    }

    #[test]
    fn is_subnet_of_expands_cidr() {
        let args = vec![
            Expr::Literal(Literal::String("10.0.0.0/24".into())),
            Expr::Path(Path::root("ip")),
        ];
        let rewritten = simplify_is_subnet_of(&args, &no_hint).unwrap();
        match rewritten {
            Expr::Builtin { op: BuiltinOp::IsSubnetOf, args } => {
                assert_eq!(args.len(), 3);
                assert!(matches!(&args[0], Expr::Literal(Literal::String(s)) if s == "10.0.0.0"));
                assert!(matches!(&args[1], Expr::Literal(Literal::String(s)) if s == "10.0.0.255"));
            }
            other => panic!("unexpected rewrite: {other:?}"),
        }
    }

    #[test]
    fn is_subnet_of_degenerate_equal_bounds_collapses_to_equality() {
        let args = vec![
            Expr::Literal(Literal::String("1.2.3.4".into())),
            Expr::Literal(Literal::String("1.2.3.4".into())),
            Expr::Path(Path::root("ip")),
        ];
        let rewritten = simplify_is_subnet_of(&args, &no_hint).unwrap();
        assert!(matches!(rewritten, Expr::Compare { op: CompareOp::Eq, .. }));
    }

    #[test]
    fn before_folds_literal_timestamps() {
        let args = vec![
            Expr::Literal(Literal::Timestamp(1)),
            Expr::Literal(Literal::Timestamp(2)),
            Expr::Literal(Literal::Timestamp(3)),
        ];
        let folded = simplify_before(&args, &no_hint).unwrap();
        assert!(matches!(folded, Expr::Literal(Literal::Bool(true))));
    }

    #[test]
    fn substring_normalizes_negative_offset() {
        let args = vec![
            Expr::Path(Path::root("s")),
            Expr::Literal(Literal::Integer(-5)),
        ];
        let rewritten = simplify_sub_string(&args, &no_hint).unwrap();
        match rewritten {
            Expr::Builtin { op: BuiltinOp::SubString, args } => {
                assert!(matches!(args[1], Expr::Literal(Literal::Integer(1))));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn private_builtins_are_flagged() {
        assert!(BuiltinOp::ScalarReplacement.is_private());
        assert!(!BuiltinOp::Concat.is_private());
    }

    proptest::proptest! {
        #[test]
        fn concat_fold_matches_plain_string_concatenation(parts in proptest::collection::vec(".*", 2..6)) {
            let args: Vec<Expr> = parts.iter().cloned().map(|s| Expr::Literal(Literal::String(s))).collect();
            let folded = simplify_concat(&args, &no_hint).expect("all-literal args always fold");
            let expected: String = parts.concat();
            match folded {
                Expr::Literal(Literal::String(s)) => proptest::prop_assert_eq!(s, expected),
                other => proptest::prop_assert!(false, "expected a folded string literal, got {other:?}"),
            }
        }

        #[test]
        fn concat_is_left_alone_when_any_arg_is_not_a_literal(parts in proptest::collection::vec(".*", 1..4)) {
            let mut args: Vec<Expr> = parts.iter().cloned().map(|s| Expr::Literal(Literal::String(s))).collect();
            args.push(Expr::Path(Path::root("x")));
            proptest::prop_assert!(simplify_concat(&args, &no_hint).is_none());
        }
    }
}
