//! The query IR: typed expressions with builtin simplification (spec
//! §4.B), and the Trace tree they get built into.
//!
//! This crate owns everything between a parsed query and the bytecode
//! compiler (`qe-vm`): it never touches bytes, only typed trees.

pub mod builder;
pub mod builtin;
pub mod dump;
pub mod error;
pub mod expr;
pub mod postcheck;
pub mod range;
pub mod scope;
pub mod trace;

pub use builder::union_map;
pub use builtin::{descriptor, BuiltinOp, Descriptor};
pub use error::{ExprError, NodeId, PlanError};
pub use expr::{
    AggregateOp, BinaryOp, CaseArm, CompareOp, Expr, Literal, LogicalOp, Path, ReplacementKind,
    TypeSet,
};
pub use range::{union as union_time_ranges, TimeRange};
pub use trace::{AggKind, Binding, IterTable, OrderKey, Step, Trace};
