//! HTTP request renderer (spec.md §4.8): turns a lowered `Select` into the
//! method, path, and query parameters a PostgREST server expects.

use http::Method;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tracing::instrument;

use sqlrest_core::model::{Filter, LogicalOperator, Select, Sort, SortDirection, SortNulls};
use sqlrest_core::Result;

use crate::config::RenderConfig;
use crate::shared::{is_bare_star, render_filter_child, render_filter_value, render_targets};

/// Characters PostgREST's own query-string syntax uses structurally and
/// that a client is expected to leave unescaped: `* ( ) , : ! > - [ ]`.
/// Everything else non-alphanumeric is percent-encoded.
const QUERY_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'*')
    .remove(b'(')
    .remove(b')')
    .remove(b',')
    .remove(b':')
    .remove(b'!')
    .remove(b'>')
    .remove(b'-')
    .remove(b'[')
    .remove(b']');

/// A rendered HTTP request. `params` keeps insertion order and allows
/// repeated keys (PostgREST itself allows e.g. two `order=` filters to be
/// sent, one per sort key, though this renderer always combines sorts into
/// a single `order` param), a plain vector models that better than a map.
#[derive(Clone, Debug, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub path: String,
    pub params: Vec<(String, String)>,
    /// `path` plus the percent-encoded query string, ready to append to a
    /// host.
    pub full_path: String,
}

#[instrument(skip_all, fields(from = %select.from))]
pub fn render_http(select: &Select, config: &RenderConfig) -> Result<HttpRequest> {
    let path = format!("/{}", select.from);
    let mut params = Vec::new();

    if !is_bare_star(&select.targets) {
        params.push(("select".to_string(), render_targets(&select.targets)));
    }

    if let Some(filter) = &select.filter {
        params.extend(flatten_top_level(filter, config.url_safe));
    }

    if !select.sorts.is_empty() {
        params.push(("order".to_string(), render_order(&select.sorts)));
    }

    if let Some(limit) = &select.limit {
        if let Some(count) = limit.count {
            params.push(("limit".to_string(), count.to_string()));
        }
        if let Some(offset) = limit.offset {
            params.push(("offset".to_string(), offset.to_string()));
        }
    }

    let full_path = build_full_path(&path, &params);

    Ok(HttpRequest { method: Method::GET, path, params, full_path })
}

/// A top-level, non-negated `and` is PostgREST's default combinator
/// between query parameters, so it flattens into sibling `key=value`
/// pairs instead of a single `and=(...)` parameter. Anything else,
/// a top-level `or`, or a negated `and`, becomes its own parameter.
fn flatten_top_level(filter: &Filter, url_safe: bool) -> Vec<(String, String)> {
    match filter {
        Filter::Logical(logical) if logical.operator == LogicalOperator::And && !logical.negate => {
            logical.children.iter().flat_map(|child| flatten_top_level(child, url_safe)).collect()
        }
        Filter::Column(column) => {
            vec![(column.column.clone(), render_filter_value(column.operator, column.negate, &column.value, url_safe))]
        }
        Filter::Logical(logical) => {
            let key = if logical.negate {
                format!("not.{}", logical.operator.as_str())
            } else {
                logical.operator.as_str().to_string()
            };
            let children = logical
                .children
                .iter()
                .map(|child| render_filter_child(child, url_safe))
                .collect::<Vec<_>>()
                .join(",");
            vec![(key, format!("({children})"))]
        }
    }
}

fn render_order(sorts: &[Sort]) -> String {
    sorts
        .iter()
        .map(|sort| {
            let mut out = sort.column.clone();
            if let Some(direction) = sort.direction {
                out.push('.');
                out.push_str(match direction {
                    SortDirection::Asc => "asc",
                    SortDirection::Desc => "desc",
                });
            }
            if let Some(nulls) = sort.nulls {
                out.push_str(match nulls {
                    SortNulls::First => ".nullsfirst",
                    SortNulls::Last => ".nullslast",
                });
            }
            out
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn build_full_path(path: &str, params: &[(String, String)]) -> String {
    if params.is_empty() {
        return path.to_string();
    }
    let query = params
        .iter()
        .map(|(key, value)| format!("{}={}", encode(key), encode(value)))
        .collect::<Vec<_>>()
        .join("&");
    format!("{path}?{query}")
}

fn encode(value: &str) -> String {
    utf8_percent_encode(value, QUERY_SAFE).to_string()
}
