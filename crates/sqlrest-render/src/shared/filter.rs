//! PostgREST filter-value syntax (spec.md §6): `[not.]op.value`,
//! `op.(a,b,c)` for `in`, `op[(config)].query` for full-text search, and
//! `[not.]operator=(child,child,...)` for logical combinators.

use sqlrest_core::model::{ColumnFilter, ColumnFilterOperator, Filter, FilterValue, LogicalFilter, Scalar};

/// Render a single filter's operator+value portion, e.g. `gt.4`,
/// `not.in.(1,2,3)`, `fts(english).cats`. Does not include the column name
/// or parameter key, callers prepend that per their own shape.
pub fn render_filter_value(
    operator: ColumnFilterOperator,
    negate: bool,
    value: &FilterValue,
    url_safe: bool,
) -> String {
    let prefix = if negate { "not." } else { "" };
    match value {
        FilterValue::Null => format!("{prefix}{}.null", operator.as_str()),
        FilterValue::Scalar(scalar) => {
            format!("{prefix}{}.{}", operator.as_str(), render_scalar(scalar, operator, url_safe))
        }
        FilterValue::List(items) => {
            format!("{prefix}{}.({})", operator.as_str(), render_in_list(items))
        }
        FilterValue::Fts { query, config } => match config {
            Some(config) => format!("{prefix}{}({config}).{query}", operator.as_str()),
            None => format!("{prefix}{}.{query}", operator.as_str()),
        },
    }
}

/// LIKE/ILIKE patterns carry SQL's `%`/`_` wildcards; PostgREST's own
/// wildcard is `*`, and reserves `%`/`_` for literal characters that would
/// otherwise need percent-encoding in every request. `url_safe` decides
/// whether that translation happens.
fn render_scalar(scalar: &Scalar, operator: ColumnFilterOperator, url_safe: bool) -> String {
    let rendered = scalar.render();
    if url_safe && matches!(operator, ColumnFilterOperator::Like | ColumnFilterOperator::Ilike) {
        rendered.replace('%', "*")
    } else {
        rendered
    }
}

fn render_in_list(items: &[Scalar]) -> String {
    items
        .iter()
        .map(|item| {
            let rendered = item.render();
            if rendered.contains(',') {
                format!("\"{rendered}\"")
            } else {
                rendered
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Render one child of a logical combinator: `column.op.value` for column
/// filters, or a nested `[not.]operator(...)` for logical children.
pub fn render_filter_child(filter: &Filter, url_safe: bool) -> String {
    match filter {
        Filter::Column(ColumnFilter { column, operator, negate, value }) => {
            format!("{column}.{}", render_filter_value(*operator, *negate, value, url_safe))
        }
        Filter::Logical(logical) => render_logical_filter(logical, url_safe),
    }
}

/// Render a logical combinator as `[not.]operator(child,child,...)`, the
/// form used both for the top-level `or=`/`and=` parameter value and for
/// logicals nested inside another logical's children.
pub fn render_logical_filter(logical: &LogicalFilter, url_safe: bool) -> String {
    let prefix = if logical.negate { "not." } else { "" };
    let children = logical
        .children
        .iter()
        .map(|child| render_filter_child(child, url_safe))
        .collect::<Vec<_>>()
        .join(",");
    format!("{prefix}{}({children})", logical.operator.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlrest_core::model::LogicalOperator;

    #[test]
    fn scalar_value_renders_operator_dot_value() {
        let rendered = render_filter_value(
            ColumnFilterOperator::Gt,
            false,
            &FilterValue::Scalar(Scalar::Number(4.0)),
            true,
        );
        assert_eq!(rendered, "gt.4");
    }

    #[test]
    fn negated_value_prefixes_not() {
        let rendered = render_filter_value(
            ColumnFilterOperator::Eq,
            true,
            &FilterValue::Scalar(Scalar::Number(1.0)),
            true,
        );
        assert_eq!(rendered, "not.eq.1");
    }

    #[test]
    fn like_wildcard_translates_to_asterisk_when_url_safe() {
        let rendered = render_filter_value(
            ColumnFilterOperator::Like,
            false,
            &FilterValue::Scalar(Scalar::String("%foo%".into())),
            true,
        );
        assert_eq!(rendered, "like.*foo*");
    }

    #[test]
    fn like_wildcard_kept_literal_when_not_url_safe() {
        let rendered = render_filter_value(
            ColumnFilterOperator::Like,
            false,
            &FilterValue::Scalar(Scalar::String("%foo%".into())),
            false,
        );
        assert_eq!(rendered, "like.%foo%");
    }

    #[test]
    fn in_list_quotes_elements_containing_commas() {
        let rendered = render_filter_value(
            ColumnFilterOperator::In,
            false,
            &FilterValue::List(vec![Scalar::String("a,b".into()), Scalar::Number(2.0)]),
            true,
        );
        assert_eq!(rendered, "in.(\"a,b\",2)");
    }

    #[test]
    fn fts_value_includes_config_in_parens() {
        let rendered = render_filter_value(
            ColumnFilterOperator::Fts,
            false,
            &FilterValue::Fts { query: "cats".into(), config: Some("english".into()) },
            true,
        );
        assert_eq!(rendered, "fts(english).cats");
    }

    #[test]
    fn logical_filter_joins_children_with_commas() {
        let logical = LogicalFilter {
            operator: LogicalOperator::Or,
            negate: false,
            children: vec![
                Filter::Column(ColumnFilter {
                    column: "rating".into(),
                    operator: ColumnFilterOperator::Gt,
                    negate: false,
                    value: FilterValue::Scalar(Scalar::Number(4.0)),
                }),
                Filter::Column(ColumnFilter {
                    column: "title".into(),
                    operator: ColumnFilterOperator::Ilike,
                    negate: false,
                    value: FilterValue::Scalar(Scalar::String("%foo%".into())),
                }),
            ],
        };
        assert_eq!(render_logical_filter(&logical, true), "or(rating.gt.4,title.ilike.*foo*)");
    }
}
