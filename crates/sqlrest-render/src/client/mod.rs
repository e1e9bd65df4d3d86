//! Client-code renderer (spec.md §4.8): emits source text for a fluent
//! PostgREST client, the way a developer would hand-write the call chain
//! for the lowered request.

use sqlrest_core::model::{
    ColumnFilter, ColumnFilterOperator, Filter, FilterValue, Limit, LogicalFilter, Scalar, Select,
    Sort, SortDirection, SortNulls,
};
use sqlrest_core::{Error, Result};
use tracing::instrument;

use crate::config::{ClientVariant, RenderConfig};
use crate::shared::{is_bare_star, render_filter_child, render_targets};

const RENDERER: &str = "client";

#[instrument(skip_all, fields(from = %select.from))]
pub fn render_client(select: &Select, config: &RenderConfig) -> Result<String> {
    match config.client_variant {
        ClientVariant::PostgrestJs => render_postgrest_js(select),
    }
}

fn render_postgrest_js(select: &Select) -> Result<String> {
    let mut lines = vec![format!(".from('{}')", select.from)];

    if !is_bare_star(&select.targets) {
        lines.push(format!(".select('{}')", render_targets(&select.targets)));
    }

    if let Some(filter) = &select.filter {
        lines.extend(render_filter_calls(filter));
    }

    for sort in &select.sorts {
        lines.push(render_order_call(sort));
    }

    if let Some(call) = render_limit_call(select.limit.as_ref())? {
        lines.push(call);
    }

    Ok(lines.join("\n"))
}

fn render_limit_call(limit: Option<&Limit>) -> Result<Option<String>> {
    match limit {
        None | Some(Limit { count: None, offset: None }) => Ok(None),
        Some(Limit { count: Some(count), offset: None }) => Ok(Some(format!(".limit({count})"))),
        Some(Limit { count: Some(count), offset: Some(offset) }) => {
            Ok(Some(format!(".range({offset}, {})", offset + count)))
        }
        Some(Limit { count: None, offset: Some(_) }) => Err(Error::render(
            RENDERER,
            "an OFFSET without a LIMIT has no equivalent client call",
        )),
    }
}

/// A top-level, non-negated `and` chains as one method call per child,
/// matching the client library's default AND-by-chaining semantics.
/// Everything else, `or`, or a negated `and`, collapses to a single
/// `.or(...)` call carrying the raw PostgREST filter string, since the
/// client has no dedicated method for those shapes.
fn render_filter_calls(filter: &Filter) -> Vec<String> {
    match filter {
        Filter::Logical(LogicalFilter { operator: sqlrest_core::model::LogicalOperator::And, negate: false, children }) => {
            children.iter().flat_map(render_filter_calls).collect()
        }
        Filter::Column(column) => vec![render_column_call(column)],
        Filter::Logical(logical) => {
            let body = logical
                .children
                .iter()
                .map(|child| render_filter_child(child, false))
                .collect::<Vec<_>>()
                .join(",");
            vec![format!(".or('{body}')")]
        }
    }
}

fn render_column_call(column: &ColumnFilter) -> String {
    if matches!(
        column.operator,
        ColumnFilterOperator::Fts | ColumnFilterOperator::Plfts | ColumnFilterOperator::Phfts | ColumnFilterOperator::Wfts
    ) {
        return render_text_search_call(column);
    }

    if column.negate {
        format!(".not('{}', '{}', {})", column.column, column.operator.as_str(), render_value_literal(&column.value))
    } else {
        format!(".{}('{}', {})", method_name(column.operator), column.column, render_value_literal(&column.value))
    }
}

fn method_name(operator: ColumnFilterOperator) -> &'static str {
    operator.as_str()
}

fn render_text_search_call(column: &ColumnFilter) -> String {
    let FilterValue::Fts { query, config } = &column.value else {
        unreachable!("full-text operators always carry an Fts value")
    };
    let type_name = match column.operator {
        ColumnFilterOperator::Plfts => "plain",
        ColumnFilterOperator::Phfts => "phrase",
        ColumnFilterOperator::Wfts => "websearch",
        _ => "default",
    };
    let mut options = format!("type: '{type_name}'");
    if let Some(config) = config {
        options.push_str(&format!(", config: '{config}'"));
    }
    let method = if column.negate { "not" } else { "textSearch" };
    if column.negate {
        format!(".not('{}', 'fts', '{}')", column.column, query)
    } else {
        format!(".{method}('{}', '{}', {{ {} }})", column.column, query, options)
    }
}

fn render_value_literal(value: &FilterValue) -> String {
    match value {
        FilterValue::Null => "null".to_string(),
        FilterValue::Scalar(scalar) => render_scalar_literal(scalar),
        FilterValue::List(items) => {
            format!("[{}]", items.iter().map(render_scalar_literal).collect::<Vec<_>>().join(", "))
        }
        FilterValue::Fts { .. } => unreachable!("fts values render through render_text_search_call"),
    }
}

fn render_scalar_literal(scalar: &Scalar) -> String {
    match scalar {
        Scalar::Number(_) => scalar.render(),
        Scalar::String(_) => format!("'{}'", scalar.render()),
    }
}

fn render_order_call(sort: &Sort) -> String {
    let mut options = Vec::new();
    if let Some(direction) = sort.direction {
        options.push(format!("ascending: {}", matches!(direction, SortDirection::Asc)));
    }
    if let Some(nulls) = sort.nulls {
        options.push(format!("nullsFirst: {}", matches!(nulls, SortNulls::First)));
    }
    if options.is_empty() {
        format!(".order('{}')", sort.column)
    } else {
        format!(".order('{}', {{ {} }})", sort.column, options.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlrest_core::model::{ColumnTarget, Target};

    fn select_star(from: &str) -> Select {
        Select {
            from: from.to_string(),
            targets: vec![Target::Column(ColumnTarget::simple("*"))],
            filter: None,
            sorts: Vec::new(),
            limit: None,
        }
    }

    #[test]
    fn bare_select_renders_only_from() {
        let rendered = render_client(&select_star("books"), &RenderConfig::default()).unwrap();
        assert_eq!(rendered, ".from('books')");
    }

    #[test]
    fn column_filter_renders_eq_method() {
        let mut select = select_star("books");
        select.filter = Some(Filter::Column(ColumnFilter {
            column: "genre".into(),
            operator: ColumnFilterOperator::Eq,
            negate: false,
            value: FilterValue::Scalar(Scalar::String("scifi".into())),
        }));
        let rendered = render_client(&select, &RenderConfig::default()).unwrap();
        assert!(rendered.contains(".eq('genre', 'scifi')"));
    }

    #[test]
    fn negated_column_filter_uses_not_call() {
        let mut select = select_star("books");
        select.filter = Some(Filter::Column(ColumnFilter {
            column: "genre".into(),
            operator: ColumnFilterOperator::Eq,
            negate: true,
            value: FilterValue::Scalar(Scalar::String("scifi".into())),
        }));
        let rendered = render_client(&select, &RenderConfig::default()).unwrap();
        assert!(rendered.contains(".not('genre', 'eq', 'scifi')"));
    }

    #[test]
    fn offset_without_limit_is_a_render_error() {
        let mut select = select_star("books");
        select.limit = Some(Limit { count: None, offset: Some(5) });
        let err = render_client(&select, &RenderConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Render { .. }));
    }

    #[test]
    fn limit_and_offset_renders_range_call() {
        let mut select = select_star("books");
        select.limit = Some(Limit { count: Some(10), offset: Some(20) });
        let rendered = render_client(&select, &RenderConfig::default()).unwrap();
        assert!(rendered.contains(".range(20, 30)"));
    }
}
