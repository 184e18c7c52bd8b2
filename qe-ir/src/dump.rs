//! A deterministic, parent-first textual dump of a Step chain, modeled on
//! `pir.go`'s `describe` methods — diagnostics only, never re-parsed.

use std::fmt::Write as _;

use crate::trace::Step;

/// Renders `step` and its ancestors, one line per Step, leaf first.
pub fn dump(step: &Step) -> String {
    let mut lines = Vec::new();
    collect(step, &mut lines);
    lines.join("\n")
}

fn collect(step: &Step, lines: &mut Vec<String>) {
    if let Some(parent) = step.parent() {
        collect(parent, lines);
    }
    if let Step::UnionMap { inner, child } = step {
        let mut line = String::new();
        write!(line, "UNION MAP {}", inner.table).unwrap();
        lines.push(line);
        let inner_dump = child.top().map(dump).unwrap_or_default();
        for l in inner_dump.lines() {
            lines.push(format!("\t{l}"));
        }
        return;
    }
    lines.push(describe(step));
}

fn describe(step: &Step) -> String {
    match step {
        Step::IterTable(t) => format!("ITERATE {}{}", t.table, t.bind.as_deref().map(|b| format!(" AS {b}")).unwrap_or_default()),
        Step::IterValue { bind, .. } => format!("ITERATE VALUE AS {bind}"),
        Step::Filter { predicate, .. } => format!("FILTER {predicate:?}"),
        Step::Distinct { columns, .. } => format!("DISTINCT {} column(s)", columns.len()),
        Step::Bind { bindings, .. } => {
            let names: Vec<&str> = bindings.iter().map(|b| b.result.as_str()).collect();
            format!("PROJECT {}", names.join(", "))
        }
        Step::Aggregate { group_by, aggregates, .. } => {
            if group_by.is_empty() {
                format!("AGGREGATE {} metric(s)", aggregates.len())
            } else {
                format!(
                    "AGGREGATE {} metric(s) BY {} group(s)",
                    aggregates.len(),
                    group_by.len()
                )
            }
        }
        Step::Order { keys, .. } => format!("ORDER BY {} key(s)", keys.len()),
        Step::Limit { count, offset, .. } => match count {
            Some(c) => format!("LIMIT {c} OFFSET {offset}"),
            None => format!("OFFSET {offset}"),
        },
        Step::OutputPart { basename, .. } => format!("OUTPUT PART {basename}"),
        Step::OutputIndex { basename, .. } => format!("OUTPUT INDEX {basename}"),
        Step::UnionMap { .. } => unreachable!("handled in collect"),
        Step::NoOutput { .. } => "NO OUTPUT".to_string(),
        Step::DummyOutput { .. } => "DUMMY OUTPUT".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Path;
    use crate::trace::IterTable;

    #[test]
    fn dump_is_parent_first() {
        let table = Step::IterTable(IterTable::new(Path::root("events"), false));
        let limit = Step::Limit {
            parent: Box::new(table),
            count: Some(10),
            offset: 0,
        };
        let out = dump(&limit);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("ITERATE"));
        assert!(lines[1].starts_with("LIMIT"));
    }
}
