//! The mandatory post-construction check rule,
//! grounded in `plan/pir/postcheck.go`: after a Trace is fully built, a
//! fixed rule list runs once. Only one rule is mandatory here — rejecting
//! `ORDER BY` over unbounded input — matching the source's `rules`
//! slice holding exactly `checkSortSize`.

use crate::error::PlanError;
use crate::trace::Step;

/// A coarse upper bound on how many rows a Step chain can produce,
/// ordered so `Cardinality::Unbounded` is the top of the lattice. The
/// exact thresholds below `SizeColumnCardinality` don't matter for the
/// one rule that consults this — only whether a chain crosses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Cardinality {
    /// Exactly one row (e.g. a non-grouped `Aggregate`).
    Scalar,
    /// Bounded by a `Limit` or a configured size-column estimate.
    SizeColumnCardinality,
    /// No known bound — an `IterTable` with no `Limit` above it.
    Unbounded,
}

/// Computes the cardinality class of the Step chain rooted at `step`.
pub fn class(step: &Step) -> Cardinality {
    match step {
        Step::IterTable(_) => Cardinality::Unbounded,
        Step::Aggregate { group_by, parent, .. } => {
            if group_by.is_empty() {
                Cardinality::Scalar
            } else {
                class(parent)
            }
        }
        Step::Limit { count: Some(_), .. } => Cardinality::SizeColumnCardinality,
        Step::Limit { count: None, parent, .. } => class(parent),
        Step::Distinct { parent, .. }
        | Step::Filter { parent, .. }
        | Step::Bind { parent, .. }
        | Step::Order { parent, .. }
        | Step::OutputPart { parent, .. }
        | Step::OutputIndex { parent, .. }
        | Step::IterValue { parent, .. }
        | Step::NoOutput { parent }
        | Step::DummyOutput { parent } => class(parent),
        Step::UnionMap { child, .. } => child.top().map(class).unwrap_or(Cardinality::Unbounded),
    }
}

/// Runs the post-check rule list against a finished Trace.
pub fn run(top: &Step) -> Result<(), PlanError> {
    check_sort_size(top)
}

fn check_sort_size(top: &Step) -> Result<(), PlanError> {
    if let Step::Order { parent, .. } = top {
        let card = class(parent);
        if card > Cardinality::SizeColumnCardinality {
            tracing::debug!(?card, "rejecting ORDER BY over unbounded input");
            return Err(PlanError::UnboundedOrder);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Path;

    #[test]
    fn order_over_unbounded_iter_table_is_rejected() {
        let table = Step::IterTable(crate::trace::IterTable::new(Path::root("events"), false));
        let order = Step::Order {
            parent: Box::new(table),
            keys: vec![],
        };
        assert!(matches!(run(&order), Err(PlanError::UnboundedOrder)));
    }

    #[test]
    fn order_after_limit_is_allowed() {
        let table = Step::IterTable(crate::trace::IterTable::new(Path::root("events"), false));
        let limited = Step::Limit {
            parent: Box::new(table),
            count: Some(100),
            offset: 0,
        };
        let order = Step::Order {
            parent: Box::new(limited),
            keys: vec![],
        };
        assert!(run(&order).is_ok());
    }
}
