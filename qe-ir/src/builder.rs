//! The streaming Trace builder, grounded in `pir.go`'s
//! `Trace.Begin`/`Where`/`Iterate`/`Distinct`/`Bind`/`Aggregate`/`Order`/
//! `LimitOffset`/`Into` methods.
//!
//! Each method here mirrors one of those: install a new Step on top of
//! the current head, walk its expressions (resolving `Path` nodes against
//! the scope rules in [`crate::scope`]), then promote the new Step to
//! head — or surface the errors accumulated while walking.

use crate::error::PlanError;
use crate::expr::{CaseArm, Expr, Literal, Path};
use crate::scope;
use crate::trace::{AggKind, Binding, IterTable, OrderKey, Step, Trace};

/// Replaces every `Path` leaf in `expr` with its scope resolution,
/// pushing any resolution failure into `errors` rather than stopping
/// early — so a single `Bind` with several bad references reports all of
/// them in one pass, matching the source's `err []error` accumulation.
fn walk_resolve(step: &mut Step, expr: &Expr, errors: &mut Vec<PlanError>) -> Expr {
    match expr {
        Expr::Path(p) => match scope::resolve_path(step, p) {
            Ok(e) => e,
            Err(e) => {
                errors.push(e);
                expr.clone()
            }
        },
        Expr::Literal(_) | Expr::Replacement { .. } => expr.clone(),
        Expr::Binary { op, left, right } => Expr::Binary {
            op: *op,
            left: Box::new(walk_resolve(step, left, errors)),
            right: Box::new(walk_resolve(step, right, errors)),
        },
        Expr::Logical { op, args } => Expr::Logical {
            op: *op,
            args: args.iter().map(|a| walk_resolve(step, a, errors)).collect(),
        },
        Expr::Compare { op, left, right } => Expr::Compare {
            op: *op,
            left: Box::new(walk_resolve(step, left, errors)),
            right: Box::new(walk_resolve(step, right, errors)),
        },
        Expr::Aggregate { op, arg, filter } => Expr::Aggregate {
            op: *op,
            arg: arg.as_ref().map(|a| Box::new(walk_resolve(step, a, errors))),
            filter: filter.as_ref().map(|f| Box::new(walk_resolve(step, f, errors))),
        },
        Expr::Builtin { op, args } => Expr::Builtin {
            op: *op,
            args: args.iter().map(|a| walk_resolve(step, a, errors)).collect(),
        },
        Expr::Case { arms, default } => Expr::Case {
            arms: arms
                .iter()
                .map(|arm| CaseArm {
                    when: Box::new(walk_resolve(step, &arm.when, errors)),
                    then: Box::new(walk_resolve(step, &arm.then, errors)),
                })
                .collect(),
            default: default.as_ref().map(|d| Box::new(walk_resolve(step, d, errors))),
        },
    }
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

impl Trace {
    /// Installs the leaf `IterTable` Step.
    pub fn begin(&mut self, table: Path) {
        self.top = Some(Step::IterTable(IterTable::new(table, self.has_parent)));
    }

    /// Sets the alias the leaf table is bound to, e.g. for `FROM t AS x`.
    pub fn bind_table_alias(&mut self, alias: impl Into<String>) {
        if let Some(Step::IterTable(t)) = &mut self.top {
            t.bind = Some(alias.into());
        }
    }

    fn take_top(&mut self) -> Result<Step, Vec<PlanError>> {
        match &self.top {
            Some(t) if t.is_terminal() => Err(vec![PlanError::TerminalStepHasChild]),
            Some(_) => Ok(self.top.take().unwrap()),
            None => Err(vec![PlanError::TerminalStepHasChild]),
        }
    }

    fn push(&mut self, new_top: Step) -> Result<(), Vec<PlanError>> {
        if !self.errors.is_empty() {
            return Err(std::mem::take(&mut self.errors));
        }
        self.top = Some(new_top);
        Ok(())
    }

    /// `WHERE predicate`.
    pub fn where_(&mut self, predicate: Expr) -> Result<(), Vec<PlanError>> {
        let mut top = self.take_top()?;
        let mut errors = Vec::new();
        let resolved = walk_resolve(&mut top, &predicate, &mut errors);
        self.errors.extend(errors);
        self.push(Step::Filter {
            parent: Box::new(top),
            predicate: resolved,
        })
    }

    /// An implicit iteration over a value expression (an `Iterate` step);
    /// walked against the *current* head rather than a newly installed
    /// one, so the iterated value can't see its own binding.
    pub fn iterate(&mut self, bind: Binding) -> Result<(), Vec<PlanError>> {
        let mut top = self.take_top()?;
        let mut errors = Vec::new();
        let value = walk_resolve(&mut top, &bind.expr, &mut errors);
        self.errors.extend(errors);
        self.final_bindings.push(Binding::new(value.clone(), bind.result.clone()));
        self.push(Step::IterValue {
            parent: Box::new(top),
            value,
            bind: bind.result,
            star: false,
        })
    }

    /// `DISTINCT` over a set of bindings.
    pub fn distinct(&mut self, binds: Vec<Binding>) -> Result<(), Vec<PlanError>> {
        let mut top = self.take_top()?;
        let mut errors = Vec::new();
        let mut columns = Vec::with_capacity(binds.len());
        let mut resolved = Vec::with_capacity(binds.len());
        for b in binds {
            let e = walk_resolve(&mut top, &b.expr, &mut errors);
            columns.push(e.clone());
            resolved.push(Binding::new(e, b.result));
        }
        self.errors.extend(errors);
        self.final_bindings = resolved;
        self.push(Step::Distinct {
            parent: Box::new(top),
            columns,
        })
    }

    /// Marks the current head as referenced via `*` without changing it
    /// (`BindStar`).
    pub fn bind_star(&mut self) {
        if let Some(top) = &mut self.top {
            let _ = scope::get(top, "*");
        }
    }

    /// A projection (`Bind`). Each binding is walked against the
    /// pre-existing head; the whole list becomes the new head's complete
    /// output schema.
    pub fn bind(&mut self, binds: Vec<Binding>) -> Result<(), Vec<PlanError>> {
        let mut top = self.take_top()?;
        let mut errors = Vec::new();
        let mut bindings = Vec::with_capacity(binds.len());
        for b in binds {
            let e = walk_resolve(&mut top, &b.expr, &mut errors);
            bindings.push(Binding::new(e, b.result));
        }
        self.errors.extend(errors);
        self.final_bindings = bindings.clone();
        self.push(Step::Bind {
            parent: Box::new(top),
            bindings,
            complete: true,
            star: false,
        })
    }

    /// `GROUP BY ... aggregates` (an `Aggregate` step). The output
    /// schema is exactly the grouping columns followed by the aggregate
    /// results — an `Aggregate` never forwards unresolved names to its
    /// parent once built (never forwards).
    pub fn aggregate(
        &mut self,
        groups: Vec<Binding>,
        aggs: Vec<(AggKind, Binding)>,
    ) -> Result<(), Vec<PlanError>> {
        let mut top = self.take_top()?;
        let mut errors = Vec::new();
        let mut group_by = Vec::with_capacity(groups.len());
        let mut final_bindings = Vec::with_capacity(groups.len() + aggs.len());
        for g in groups {
            let e = walk_resolve(&mut top, &g.expr, &mut errors);
            let b = Binding::new(e, g.result);
            final_bindings.push(b.clone());
            group_by.push(b);
        }
        let mut aggregates = Vec::with_capacity(aggs.len());
        for (kind, a) in aggs {
            let e = walk_resolve(&mut top, &a.expr, &mut errors);
            let b = Binding::new(e, a.result);
            final_bindings.push(b.clone());
            aggregates.push((kind, b));
        }
        self.errors.extend(errors);
        self.final_bindings = final_bindings;
        self.push(Step::Aggregate {
            parent: Box::new(top),
            group_by,
            aggregates,
            complete: true,
        })
    }

    /// `ORDER BY` (an `Order` step); doesn't change the output schema.
    pub fn order(&mut self, keys: Vec<(Expr, bool)>) -> Result<(), Vec<PlanError>> {
        let mut top = self.take_top()?;
        let mut errors = Vec::new();
        let resolved: Vec<OrderKey> = keys
            .into_iter()
            .map(|(column, descending)| OrderKey {
                column: walk_resolve(&mut top, &column, &mut errors),
                descending,
            })
            .collect();
        self.errors.extend(errors);
        self.push(Step::Order {
            parent: Box::new(top),
            keys: resolved,
        })
    }

    /// `LIMIT`/`OFFSET` (a `LimitOffset` step); no expressions to walk.
    pub fn limit_offset(&mut self, count: Option<u64>, offset: u64) -> Result<(), Vec<PlanError>> {
        let top = self.take_top()?;
        self.push(Step::Limit {
            parent: Box::new(top),
            count,
            offset,
        })
    }

    /// `INTO basepath` (an `Into` step): synthesizes an `OutputPart`
    /// then an `OutputIndex`, producing a single `table_name` binding.
    pub fn into_part(&mut self, basepath: &str) -> Result<(), Vec<PlanError>> {
        let top = self.take_top()?;
        let part = Step::OutputPart {
            parent: Box::new(top),
            basename: basepath.to_string(),
        };
        let table_name = basename(basepath).to_string();
        let index = Step::OutputIndex {
            parent: Box::new(part),
            basename: basepath.to_string(),
        };
        self.final_bindings = vec![Binding::new(Expr::Literal(Literal::String(table_name)), "table_name")];
        self.push(index)
    }

    /// Runs the mandatory post-construction check.
    pub fn finish(&self) -> Result<(), PlanError> {
        match &self.top {
            Some(top) => crate::postcheck::run(top),
            None => Ok(()),
        }
    }
}

/// Builds a `UnionMap` Trace fanning `child` out over partitions of
/// `inner`. The child's final
/// bindings become the new Trace's output schema, and `inner` is marked
/// `Partitioned`.
pub fn union_map(child: Trace, mut inner: IterTable) -> Trace {
    inner.partitioned = true;
    let final_bindings = child.final_bindings().to_vec();
    let mut t = Trace::new(false);
    t.final_bindings = final_bindings;
    t.top = Some(Step::UnionMap {
        inner: Box::new(inner),
        child: Box::new(child),
    });
    t
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::CompareOp;

    fn literal_query() -> Trace {
        let mut t = Trace::new(false);
        t.begin(Path::root("events"));
        t
    }

    #[test]
    fn iterate_resolves_against_table_columns() {
        let mut t = literal_query();
        t.iterate(Binding::new(Expr::Path(Path::root("events")), "e")).unwrap();
        assert_eq!(t.final_bindings().len(), 1);
    }

    #[test]
    fn where_then_bind_tracks_final_schema() {
        let mut t = literal_query();
        t.where_(Expr::Compare {
            op: CompareOp::Gt,
            left: Box::new(Expr::Path(Path::root("amount"))),
            right: Box::new(Expr::Literal(Literal::Integer(0))),
        })
        .unwrap();
        t.bind(vec![Binding::new(Expr::Path(Path::root("amount")), "amount")])
            .unwrap();
        assert_eq!(t.final_bindings()[0].result, "amount");
    }

    #[test]
    fn into_part_produces_table_name_binding() {
        let mut t = literal_query();
        t.into_part("db/x/y").unwrap();
        assert_eq!(t.final_bindings().len(), 1);
        assert_eq!(t.final_bindings()[0].result, "table_name");
        assert!(matches!(
            &t.final_bindings()[0].expr,
            Expr::Literal(Literal::String(s)) if s == "y"
        ));
    }

    #[test]
    fn pushing_onto_a_terminal_step_fails() {
        let mut t = literal_query();
        t.limit_offset(Some(1), 0).unwrap();
        // synthesize a terminal NoOutput on top, then try to extend it
        let top = t.top.take().unwrap();
        t.top = Some(Step::NoOutput { parent: Box::new(top) });
        let err = t.limit_offset(Some(1), 0).unwrap_err();
        assert!(matches!(err[0], PlanError::TerminalStepHasChild));
    }

    #[test]
    fn union_map_inherits_child_final_bindings() {
        let mut child = literal_query();
        child
            .bind(vec![Binding::new(Expr::Path(Path::root("amount")), "amount")])
            .unwrap();
        let inner = IterTable::new(Path::root("events"), false);
        let fanned = union_map(child, inner);
        assert_eq!(fanned.final_bindings()[0].result, "amount");
        match fanned.top().unwrap() {
            Step::UnionMap { inner, .. } => assert!(inner.partitioned),
            _ => panic!("expected UnionMap"),
        }
    }
}
