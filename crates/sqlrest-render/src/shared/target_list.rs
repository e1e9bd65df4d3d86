//! PostgREST `select=` target-list syntax (spec.md §6, §9): the textual
//! form columns, aggregates, and embedded resources take once lowered.

use sqlrest_core::model::{AggregateTarget, ColumnTarget, EmbeddedTarget, JoinType, Target};

/// Render a full projection list, comma-joined, in target-list order.
pub fn render_targets(targets: &[Target]) -> String {
    targets.iter().map(render_target).collect::<Vec<_>>().join(",")
}

/// True when `targets` is exactly the bare `*` projection PostgREST treats
/// as "no `select` parameter at all".
pub fn is_bare_star(targets: &[Target]) -> bool {
    matches!(
        targets,
        [Target::Column(ColumnTarget { column, alias: None, cast: None })] if column == "*"
    )
}

fn render_target(target: &Target) -> String {
    match target {
        Target::Column(column) => render_column(column),
        Target::Aggregate(aggregate) => render_aggregate(aggregate),
        Target::Embedded(embedded) => render_embedded(embedded),
    }
}

fn render_column(column: &ColumnTarget) -> String {
    let mut out = String::new();
    if let Some(alias) = &column.alias {
        out.push_str(alias);
        out.push(':');
    }
    out.push_str(&column.column);
    if let Some(cast) = &column.cast {
        out.push_str("::");
        out.push_str(cast);
    }
    out
}

fn render_aggregate(aggregate: &AggregateTarget) -> String {
    let mut out = String::new();
    if let Some(alias) = &aggregate.alias {
        out.push_str(alias);
        out.push(':');
    }
    match &aggregate.column {
        Some(column) => {
            out.push_str(column);
            if let Some(input_cast) = &aggregate.input_cast {
                out.push_str("::");
                out.push_str(input_cast);
            }
            out.push('.');
            out.push_str(aggregate.function_name.as_str());
            out.push_str("()");
        }
        None => {
            out.push_str(aggregate.function_name.as_str());
            out.push_str("()");
        }
    }
    if let Some(output_cast) = &aggregate.output_cast {
        out.push_str("::");
        out.push_str(output_cast);
    }
    out
}

/// Spread targets (`flatten == true`) render with PostgREST's `...`
/// prefix and drop any alias, spreading lifts the embedded columns
/// directly into the parent, and an alias on the embed itself has nothing
/// left to attach to.
fn render_embedded(embedded: &EmbeddedTarget) -> String {
    let mut out = String::new();
    if embedded.flatten {
        out.push_str("...");
    } else if let Some(alias) = &embedded.alias {
        out.push_str(alias);
        out.push(':');
    }
    out.push_str(&embedded.relation);
    if embedded.join_type == JoinType::Inner {
        out.push_str("!inner");
    }
    out.push('(');
    out.push_str(&render_targets(&embedded.targets));
    out.push(')');
    out
}
