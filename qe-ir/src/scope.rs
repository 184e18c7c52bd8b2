//! Scope resolution: walking a Step chain upward to resolve a `Path`,
//! grounded in `pir.go`'s per-Step `get(name)` methods and `table.strip`'s
//! free-variable accumulation.
//!
//! Only `IterTable`, `IterValue`, `Bind`, and `Aggregate` steps do
//! anything but forward to their parent — every other Step is
//! "transparent" for name resolution, matching the source's default
//! `parented.get` behavior.

use crate::error::PlanError;
use crate::expr::{Expr, Path};
use crate::trace::Step;

/// What a single-segment lookup resolved to.
pub enum Resolution {
    /// Resolved inside this Step's own chain (the bound expression).
    Bound(Expr),
    /// `*` was referenced; the caller should mark schema inference as
    /// "everything is live" rather than pruning columns.
    Wildcard,
    /// Not found anywhere up the chain. At the leaf `IterTable`, this
    /// becomes either a correlated free-variable (if `have_parent`) or a
    /// hard error.
    Unresolved,
}

/// Resolves `name` (the first segment of a `Path`) against `step` and
/// everything above it.
pub fn get(step: &mut Step, name: &str) -> Resolution {
    if name == "*" {
        mark_wildcard(step);
        return Resolution::Wildcard;
    }
    match step {
        Step::IterTable(table) => {
            let result = table.bind.as_deref();
            if result.is_none() || result == Some(name) {
                // Table is unqualified, or the name matches its alias:
                // this is a direct column reference into the table.
                return Resolution::Bound(Expr::Path(Path::root(name)));
            }
            if table.have_parent {
                table.outer.push(name.to_string());
                Resolution::Unresolved
            } else {
                Resolution::Unresolved
            }
        }
        Step::IterValue { bind, parent, .. } => {
            if bind == name {
                Resolution::Bound(Expr::Path(Path::root(name)))
            } else {
                get(parent, name)
            }
        }
        Step::Bind { bindings, complete, parent, .. } => {
            if let Some(b) = bindings.iter().rev().find(|b| b.result == name) {
                return Resolution::Bound(b.expr.clone());
            }
            if !*complete {
                get(parent, name)
            } else {
                Resolution::Unresolved
            }
        }
        Step::Aggregate { group_by, aggregates, complete, parent, .. } => {
            if let Some((_, b)) = aggregates.iter().rev().find(|(_, b)| b.result == name) {
                return Resolution::Bound(b.expr.clone());
            }
            if let Some(b) = group_by.iter().rev().find(|b| b.result == name) {
                return Resolution::Bound(b.expr.clone());
            }
            if !*complete {
                get(parent, name)
            } else {
                // Aggregation steps do not preserve the input binding set.
                Resolution::Unresolved
            }
        }
        Step::UnionMap { child, .. } => child
            .final_bindings()
            .iter()
            .rev()
            .find(|b| b.result == name)
            .map(|b| Resolution::Bound(b.expr.clone()))
            .unwrap_or(Resolution::Unresolved),
        // Filter, Distinct, Order, Limit, OutputPart, OutputIndex,
        // NoOutput, DummyOutput: transparent, forward to parent.
        other => match other.parent() {
            Some(_) => get(parent_mut(other), name),
            None => Resolution::Unresolved,
        },
    }
}

fn parent_mut(step: &mut Step) -> &mut Step {
    use Step::*;
    match step {
        Filter { parent, .. }
        | Distinct { parent, .. }
        | Order { parent, .. }
        | Limit { parent, .. }
        | OutputPart { parent, .. }
        | OutputIndex { parent, .. }
        | NoOutput { parent }
        | DummyOutput { parent } => parent,
        _ => unreachable!("parent_mut called on a non-transparent Step"),
    }
}

fn mark_wildcard(step: &mut Step) {
    match step {
        Step::IterTable(t) => t.star = true,
        Step::IterValue { star, parent, .. } => {
            *star = true;
            // '*' also captures everything visible upstream.
            mark_wildcard(parent);
        }
        Step::Bind { star, .. } => *star = true,
        _ => {}
    }
}

/// Resolves a full dotted `Path` against the current Step chain.
///
/// Only the first segment participates in scope lookup (matching the
/// source's `p.First`); anything beyond that is treated as a field access
/// on whatever the first segment resolved to, which we can only carry
/// through untouched when the whole path resolves to a raw table column
/// (the common case — a struct-valued binding accessed by dotted path
/// would need a richer path algebra than this crate's simplified `Expr`
/// tree provides).
pub fn resolve_path(step: &mut Step, path: &Path) -> Result<Expr, PlanError> {
    match get(step, path.first()) {
        Resolution::Bound(Expr::Path(_)) if path.0.len() > 1 => Ok(Expr::Path(path.clone())),
        Resolution::Bound(e) => Ok(e),
        Resolution::Wildcard => Ok(Expr::Path(path.clone())),
        Resolution::Unresolved => Err(PlanError::UnresolvedPath {
            path: path.to_string(),
        }),
    }
}

/// Free variables accumulated on `step`'s `IterTable` leaf (if any),
/// walking down through transparent steps — used by the builder to report
/// correlated references after a sub-trace finishes.
pub fn collect_outer(step: &Step) -> Vec<String> {
    match step {
        Step::IterTable(t) => t.outer.clone(),
        other => other.parent().map(collect_outer).unwrap_or_default(),
    }
}
