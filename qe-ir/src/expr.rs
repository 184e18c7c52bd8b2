//! Expression nodes and their type sets.
//!
//! Mirrors the node-plus-metadata shape `qe-asm` uses for instructions: a
//! small tagged enum carries the shape, and a side table (here,
//! `Builtin::descriptor`) carries the behavior (check/simplify) so the
//! enum itself stays a plain data description.

use std::fmt;

use crate::builtin::BuiltinOp;
use crate::error::{ExprError, NodeId};

bitflags::bitflags! {
    /// The set of value kinds an expression could evaluate to.
    ///
    /// `MISSING` is tracked separately from `NULL`: a struct field that is
    /// absent (`MISSING`) is not the same as one present with a null value.
    /// Builtins that can observe an absent argument propagate `MISSING`
    /// through their return type set.
    #[derive(Default)]
    pub struct TypeSet: u16 {
        const INTEGER  = 1 << 0;
        const UNSIGNED = 1 << 1;
        const FLOAT    = 1 << 2;
        const STRING   = 1 << 3;
        const TIME     = 1 << 4;
        const LIST     = 1 << 5;
        const STRUCT   = 1 << 6;
        const LOGICAL  = 1 << 7;
        const NULL     = 1 << 8;
        const MISSING  = 1 << 9;

        const NUMERIC = Self::INTEGER.bits | Self::UNSIGNED.bits | Self::FLOAT.bits;
        const ANY = Self::INTEGER.bits | Self::UNSIGNED.bits | Self::FLOAT.bits
            | Self::STRING.bits | Self::TIME.bits | Self::LIST.bits | Self::STRUCT.bits
            | Self::LOGICAL.bits | Self::NULL.bits | Self::MISSING.bits;
    }
}

impl TypeSet {
    /// Whether `self` could satisfy a position that requires `required`.
    pub fn satisfies(self, required: TypeSet) -> bool {
        self.intersects(required)
    }

    /// `self` with `MISSING` folded in, used whenever an argument position
    /// could itself be absent.
    pub fn or_missing(self) -> TypeSet {
        self | TypeSet::MISSING
    }
}

/// A dotted field-access path, e.g. `a.b.c`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path(pub Vec<String>);

impl Path {
    pub fn root(name: impl Into<String>) -> Path {
        Path(vec![name.into()])
    }

    pub fn first(&self) -> &str {
        self.0[0].as_str()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

/// Literal values a constant-folded expression can reduce to.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Unsigned(u64),
    Float(f64),
    /// Exact rational, kept unreduced (numerator, denominator) the way a
    /// parser would hand it off before any simplification pass touches it.
    Rational(i64, i64),
    /// Microseconds since the Unix epoch.
    Timestamp(i64),
    String(String),
    Bool(bool),
    Null,
    Missing,
}

impl Literal {
    pub fn type_set(&self) -> TypeSet {
        match self {
            Literal::Integer(_) => TypeSet::INTEGER,
            Literal::Unsigned(_) => TypeSet::UNSIGNED,
            Literal::Float(_) => TypeSet::FLOAT,
            Literal::Rational(_, _) => TypeSet::FLOAT,
            Literal::Timestamp(_) => TypeSet::TIME,
            Literal::String(_) => TypeSet::STRING,
            Literal::Bool(_) => TypeSet::LOGICAL,
            Literal::Null => TypeSet::NULL,
            Literal::Missing => TypeSet::MISSING,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::String(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Concat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn inverse(self) -> CompareOp {
        match self {
            CompareOp::Eq => CompareOp::Ne,
            CompareOp::Ne => CompareOp::Eq,
            CompareOp::Lt => CompareOp::Ge,
            CompareOp::Le => CompareOp::Gt,
            CompareOp::Gt => CompareOp::Le,
            CompareOp::Ge => CompareOp::Lt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOp {
    Sum,
    Min,
    Max,
    Count,
    CountDistinct,
    Avg,
    Earliest,
    Latest,
}

/// Distinguishes the two replacement-node kinds a `Trace` input is spliced
/// back into its parent's expressions as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplacementKind {
    /// `SCALAR_REPLACEMENT(i)`: the i-th input Trace yields exactly one row
    /// with one column, substituted as a scalar.
    Scalar,
    /// `IN_REPLACEMENT(i)`: the i-th input Trace's column values form the
    /// right-hand set of an `IN` membership test.
    In,
}

/// One arm of a `CASE` expression.
#[derive(Debug, Clone)]
pub struct CaseArm {
    pub when: Box<Expr>,
    pub then: Box<Expr>,
}

/// A typed expression node.
///
/// Each variant is a plain data shape; the behavior attached
/// to a node (type set, check, simplify) lives in [`Expr::type_set`],
/// [`Expr::check`], and [`Expr::simplify`] for the fixed shapes, and in
/// [`crate::builtin::descriptor`] for [`Expr::Builtin`].
#[derive(Debug, Clone)]
pub enum Expr {
    Path(Path),
    Literal(Literal),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        args: Vec<Expr>,
    },
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Aggregate {
        op: AggregateOp,
        arg: Option<Box<Expr>>,
        filter: Option<Box<Expr>>,
    },
    Builtin {
        op: BuiltinOp,
        args: Vec<Expr>,
    },
    Case {
        arms: Vec<CaseArm>,
        default: Option<Box<Expr>>,
    },
    /// A correlated or uncorrelated subquery result spliced into this
    /// expression tree; `index` is a position into the owning `Trace`'s
    /// `Inputs`.
    Replacement {
        kind: ReplacementKind,
        index: usize,
    },
}

impl Expr {
    /// Infers this node's type set given a schema hint for `Path` leaves.
    ///
    /// `hint` answers "what type set does this path resolve to", supplied
    /// by the caller (the `Trace` builder has the scope information; a
    /// bare `Expr` does not).
    pub fn type_set(&self, hint: &dyn Fn(&Path) -> TypeSet) -> TypeSet {
        match self {
            Expr::Path(p) => hint(p),
            Expr::Literal(lit) => lit.type_set(),
            Expr::Binary { left, right, .. } => {
                (left.type_set(hint) | right.type_set(hint)) & TypeSet::NUMERIC.or_missing()
            }
            Expr::Logical { .. } => TypeSet::LOGICAL | TypeSet::MISSING,
            Expr::Compare { .. } => TypeSet::LOGICAL | TypeSet::MISSING,
            Expr::Aggregate { op, .. } => match op {
                AggregateOp::Count | AggregateOp::CountDistinct => TypeSet::INTEGER,
                _ => TypeSet::NUMERIC | TypeSet::NULL,
            },
            Expr::Builtin { op, .. } => crate::builtin::descriptor(*op).return_type_set,
            Expr::Case { arms, default } => {
                let mut set = default
                    .as_ref()
                    .map(|e| e.type_set(hint))
                    .unwrap_or(TypeSet::NULL);
                for arm in arms {
                    set |= arm.then.type_set(hint);
                }
                set
            }
            Expr::Replacement { .. } => TypeSet::ANY,
        }
    }

    /// Arity and argument-type validation (the `check` phase).
    ///
    /// Only `Builtin` nodes route through the per-opcode descriptor; the
    /// other shapes have fixed arity baked into the Rust type itself, so
    /// there is nothing to check beyond recursing into children.
    pub fn check(&self, id: NodeId, hint: &dyn Fn(&Path) -> TypeSet) -> Result<(), ExprError> {
        match self {
            Expr::Builtin { op, args } => {
                let desc = crate::builtin::descriptor(*op);
                (desc.check)(id, args, hint)
            }
            Expr::Binary { left, right, .. } => {
                left.check(id, hint)?;
                right.check(id, hint)
            }
            Expr::Logical { args, .. } => {
                for a in args {
                    a.check(id, hint)?;
                }
                Ok(())
            }
            Expr::Compare { left, right, .. } => {
                left.check(id, hint)?;
                right.check(id, hint)
            }
            Expr::Aggregate { arg, filter, .. } => {
                if let Some(a) = arg {
                    a.check(id, hint)?;
                }
                if let Some(f) = filter {
                    f.check(id, hint)?;
                }
                Ok(())
            }
            Expr::Case { arms, default } => {
                for arm in arms {
                    arm.when.check(id, hint)?;
                    arm.then.check(id, hint)?;
                }
                if let Some(d) = default {
                    d.check(id, hint)?;
                }
                Ok(())
            }
            Expr::Path(_) | Expr::Literal(_) | Expr::Replacement { .. } => Ok(()),
        }
    }

    /// One rewrite step (the `simplify` phase); `None` means already in
    /// normal form. Callers fixpoint this over the tree.
    pub fn simplify(&self, hint: &dyn Fn(&Path) -> TypeSet) -> Option<Expr> {
        match self {
            Expr::Builtin { op, args } => (crate::builtin::descriptor(*op).simplify)(args, hint),
            _ => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Expr::Literal(_))
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Expr::Literal(l) => Some(l),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_compare_ops() -> [CompareOp; 6] {
        use CompareOp::*;
        [Eq, Ne, Lt, Le, Gt, Ge]
    }

    #[test]
    fn inverse_is_an_involution() {
        for op in all_compare_ops() {
            assert_eq!(op.inverse().inverse(), op);
        }
    }

    #[test]
    fn inverse_has_no_fixed_point() {
        for op in all_compare_ops() {
            assert_ne!(op.inverse(), op);
        }
    }

    proptest::proptest! {
        #[test]
        fn path_display_round_trips_through_segments(
            segments in proptest::collection::vec("[a-z][a-z0-9_]{0,8}", 1..5),
        ) {
            let joined = segments.join(".");
            let path = Path(segments);
            proptest::prop_assert_eq!(path.to_string(), joined);
        }
    }
}
