//! Tree helpers over the request model: qualified-name rendering and
//! recursive traversal predicates used by the lowerers and validators.

use crate::model::{Filter, LogicalFilter, Target};

/// How a qualified column reference should be rendered against a relation
/// environment. Most clauses use dot syntax (`relation.column`); `ORDER BY`
/// over an embedded relation's column needs PostgREST's parenthesis syntax
/// instead (spec.md §4.6).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QualifiedNameStyle {
    Dot,
    Parenthesis,
}

/// Render `relation.column` (or `relation(column)`) for a column that has
/// been routed into an embedded target, or just `column` when `relation`
/// is `None` (already the primary relation's own column).
pub fn render_qualified_name(
    relation: Option<&str>,
    column: &str,
    style: QualifiedNameStyle,
) -> String {
    match relation {
        None => column.to_string(),
        Some(rel) => match style {
            QualifiedNameStyle::Dot => format!("{rel}.{column}"),
            QualifiedNameStyle::Parenthesis => format!("{rel}({column})"),
        },
    }
}

/// Does every `Target` in the tree (recursing into embedded targets)
/// satisfy `predicate`?
pub fn every_target(targets: &[Target], predicate: &impl Fn(&Target) -> bool) -> bool {
    targets.iter().all(|t| {
        if !predicate(t) {
            return false;
        }
        match t {
            Target::Embedded(e) => every_target(&e.targets, predicate),
            _ => true,
        }
    })
}

/// Does at least one `Target` in the tree (recursing into embedded
/// targets) satisfy `predicate`?
pub fn some_target(targets: &[Target], predicate: &impl Fn(&Target) -> bool) -> bool {
    targets.iter().any(|t| {
        predicate(t)
            || match t {
                Target::Embedded(e) => some_target(&e.targets, predicate),
                _ => false,
            }
    })
}

/// Does at least one leaf `ColumnFilter` anywhere in the filter tree
/// (recursing through `LogicalFilter` children) satisfy `predicate`?
pub fn some_filter(filter: &Filter, predicate: &impl Fn(&crate::model::ColumnFilter) -> bool) -> bool {
    match filter {
        Filter::Column(c) => predicate(c),
        Filter::Logical(LogicalFilter { children, .. }) => {
            children.iter().any(|c| some_filter(c, predicate))
        }
    }
}

/// Flatten a filter tree into its leaf `ColumnFilter`s, depth-first,
/// left-to-right: useful for validators that only care about which
/// columns are referenced, not the boolean structure connecting them.
pub fn flatten_filters(filter: &Filter) -> Vec<&crate::model::ColumnFilter> {
    let mut out = Vec::new();
    flatten_filters_into(filter, &mut out);
    out
}

fn flatten_filters_into<'a>(filter: &'a Filter, out: &mut Vec<&'a crate::model::ColumnFilter>) {
    match filter {
        Filter::Column(c) => out.push(c),
        Filter::Logical(LogicalFilter { children, .. }) => {
            for child in children {
                flatten_filters_into(child, out);
            }
        }
    }
}
