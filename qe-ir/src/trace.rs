//! The Trace IR: a tree of linear Step chains, grounded in
//! `plan/pir/pir.go`'s `Trace`/`table`/`Step` types.
//!
//! Each Step owns its parent (an inverted singly-linked chain from the
//! final Step back to the leaf `IterTable`), matching the source's
//! `parented.par Step` field — except here the parent is owned (`Box`)
//! rather than an interface pointer, since nothing else in this crate
//! needs to alias into the middle of a chain.

use crate::expr::{Expr, Path};

/// One output column binding: an expression and the name it is bound to.
#[derive(Debug, Clone)]
pub struct Binding {
    pub expr: Expr,
    pub result: String,
}

impl Binding {
    pub fn new(expr: Expr, result: impl Into<String>) -> Binding {
        Binding {
            expr,
            result: result.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggKind {
    Sum,
    Min,
    Max,
    Count,
    CountDistinct,
    Avg,
}

#[derive(Debug, Clone)]
pub struct OrderKey {
    pub column: Expr,
    pub descending: bool,
}

/// The leaf Step: iteration over a stored table.
///
/// Carries the bookkeeping the source calls `table`: the alias this Step
/// is bound to (`Bind`, `None` when the table is unqualified), the set of
/// column `references` pruned schema inference can use, whether `*` was
/// ever requested, and — when this Trace is itself the child of another
/// (`have_parent`) — the `outer` list of names that free-variable lookups
/// fell through to the enclosing Trace's scope instead of erroring.
#[derive(Debug, Clone)]
pub struct IterTable {
    pub table: Path,
    pub bind: Option<String>,
    pub filter: Option<Expr>,
    pub star: bool,
    pub have_parent: bool,
    pub outer: Vec<String>,
    pub references: Vec<Path>,
    pub partitioned: bool,
}

impl IterTable {
    pub fn new(table: Path, have_parent: bool) -> IterTable {
        IterTable {
            table,
            bind: None,
            filter: None,
            star: false,
            have_parent,
            outer: Vec::new(),
            references: Vec::new(),
            partitioned: false,
        }
    }
}

/// One node in a Trace's Step chain.
#[derive(Debug, Clone)]
pub enum Step {
    IterTable(IterTable),
    IterValue {
        parent: Box<Step>,
        value: Expr,
        bind: String,
        star: bool,
    },
    Filter {
        parent: Box<Step>,
        predicate: Expr,
    },
    Distinct {
        parent: Box<Step>,
        columns: Vec<Expr>,
    },
    Bind {
        parent: Box<Step>,
        bindings: Vec<Binding>,
        complete: bool,
        star: bool,
    },
    Aggregate {
        parent: Box<Step>,
        group_by: Vec<Binding>,
        aggregates: Vec<(AggKind, Binding)>,
        complete: bool,
    },
    Order {
        parent: Box<Step>,
        keys: Vec<OrderKey>,
    },
    Limit {
        parent: Box<Step>,
        count: Option<u64>,
        offset: u64,
    },
    OutputPart {
        parent: Box<Step>,
        basename: String,
    },
    OutputIndex {
        parent: Box<Step>,
        basename: String,
    },
    /// Terminal: fans a child Trace out over partitions of `inner`. Like
    /// the source's `UnionMap`, this has no `parent` slot of its own — it
    /// stands in as the top of whichever Trace owns it.
    UnionMap {
        inner: Box<IterTable>,
        child: Box<Trace>,
    },
    /// Terminal: produces no rows (e.g. a statically-false filter pruned
    /// the whole plan).
    NoOutput { parent: Box<Step> },
    /// Terminal: a placeholder output used while a Trace is mid-construction.
    DummyOutput { parent: Box<Step> },
}

impl Step {
    /// Terminal Steps refuse to become another Step's parent.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Step::UnionMap { .. } | Step::NoOutput { .. } | Step::DummyOutput { .. })
    }

    pub fn parent(&self) -> Option<&Step> {
        use Step::*;
        match self {
            IterTable(_) | UnionMap { .. } => None,
            IterValue { parent, .. }
            | Filter { parent, .. }
            | Distinct { parent, .. }
            | Bind { parent, .. }
            | Aggregate { parent, .. }
            | Order { parent, .. }
            | Limit { parent, .. }
            | OutputPart { parent, .. }
            | OutputIndex { parent, .. }
            | NoOutput { parent }
            | DummyOutput { parent } => Some(parent),
        }
    }
}

/// A tree of linear Step chains.
///
/// `inputs` holds the sub-traces this Trace's expressions reference via
/// `SCALAR_REPLACEMENT(i)`/`IN_REPLACEMENT(i)`; they may be
/// executed in any order relative to each other.
pub struct Trace {
    pub inputs: Vec<Trace>,
    pub(crate) top: Option<Step>,
    pub(crate) final_bindings: Vec<Binding>,
    pub(crate) errors: Vec<crate::error::PlanError>,
    pub(crate) has_parent: bool,
}

impl Trace {
    pub fn new(has_parent: bool) -> Trace {
        Trace {
            inputs: Vec::new(),
            top: None,
            final_bindings: Vec::new(),
            errors: Vec::new(),
            has_parent,
        }
    }

    /// The output schema of this Trace: stable after each successful push.
    pub fn final_bindings(&self) -> &[Binding] {
        &self.final_bindings
    }

    /// The most recently completed Step, or `None` before `begin`.
    pub fn top(&self) -> Option<&Step> {
        self.top.as_ref()
    }

    pub fn errors(&self) -> &[crate::error::PlanError] {
        &self.errors
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}
