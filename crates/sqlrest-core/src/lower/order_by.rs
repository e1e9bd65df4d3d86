//! `ORDER BY` lowering (spec.md §4.6).

use pg_query::protobuf::{Node, SortByDir, SortByNulls};
use pg_query::NodeEnum;

use crate::error::{Error, Result};
use crate::helpers::{render_qualified_name, QualifiedNameStyle};
use crate::lower::select::lower_column_or_json_path;
use crate::model::{Sort, SortDirection, SortNulls};
use crate::pgast::node_enum;
use crate::relations::RelationsEnv;

pub fn lower_order_by(sort_clause: &[Node], env: &RelationsEnv) -> Result<Vec<Sort>> {
    sort_clause
        .iter()
        .map(|n| lower_sort_item(n, env))
        .collect()
}

fn lower_sort_item(node: &Node, env: &RelationsEnv) -> Result<Sort> {
    let NodeEnum::SortBy(sort_by) = node
        .node
        .as_ref()
        .ok_or_else(|| Error::unsupported("malformed ORDER BY item"))?
    else {
        return Err(Error::unsupported("malformed ORDER BY item"));
    };

    let expr = node_enum(&sort_by.node)
        .ok_or_else(|| Error::unsupported("ORDER BY item has no expression"))?;
    let (relation, column) = lower_column_or_json_path(expr)?;
    let relation = normalize_relation(relation, env)?;

    let style = if relation.is_some() {
        QualifiedNameStyle::Parenthesis
    } else {
        QualifiedNameStyle::Dot
    };
    let rendered = render_qualified_name(relation.as_deref(), &column, style);

    let direction = match sort_by.sortby_dir() {
        SortByDir::SortbyAsc => Some(SortDirection::Asc),
        SortByDir::SortbyDesc => Some(SortDirection::Desc),
        _ => None,
    };
    let nulls = match sort_by.sortby_nulls() {
        SortByNulls::SortbyNullsFirst => Some(SortNulls::First),
        SortByNulls::SortbyNullsLast => Some(SortNulls::Last),
        _ => None,
    };

    Ok(Sort {
        column: rendered,
        direction,
        nulls,
    })
}

fn normalize_relation(relation: Option<String>, env: &RelationsEnv) -> Result<Option<String>> {
    match relation {
        None => Ok(None),
        Some(r) if r == env.primary.reference() => Ok(None),
        Some(r) if env.contains_reference(&r) => Ok(Some(r)),
        Some(r) => Err(Error::unsupported_with_hint(
            format!("`{r}` does not refer to a joined relation"),
            "Did you forget to join that relation or alias it to something else?",
        )),
    }
}
