//! Errors attached to expression and trace-construction nodes.

use thiserror::Error;

/// An opaque handle identifying the expression node an error is attached
/// to. Real node identity (arena index, source span) is the caller's
/// business; this crate only needs something `Copy` to thread through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

#[derive(Debug, Error)]
pub enum ExprError {
    #[error("node {node:?}: expected {expected} argument(s), got {got}")]
    Arity {
        node: NodeId,
        expected: &'static str,
        got: usize,
    },
    #[error("node {node:?}: argument {arg} must be a literal")]
    NotLiteral { node: NodeId, arg: usize },
    #[error("node {node:?}: argument {arg} must be a string literal")]
    NotStringLiteral { node: NodeId, arg: usize },
    #[error("node {node:?}: bad kind string {kind:?} in HASH_REPLACEMENT")]
    BadHashKind { node: NodeId, kind: String },
    #[error("node {node:?}: argument {arg} has no type in common with the required set")]
    TypeMismatch { node: NodeId, arg: usize },
    #[error("node {node:?}: {message}")]
    InvalidLiteral { node: NodeId, message: String },
}

/// Errors accumulated while building a `Trace`.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("unresolved path {path}")]
    UnresolvedPath { path: String },
    #[error(transparent)]
    Expr(#[from] ExprError),
    #[error("ORDER BY over an unbounded input is not allowed without a LIMIT")]
    UnboundedOrder,
    #[error("a terminal step cannot have children")]
    TerminalStepHasChild,
}
