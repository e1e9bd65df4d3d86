//! The request model: a compact, renderer-agnostic intermediate
//! representation shaped by PostgREST's capabilities, not SQL's.
//!
//! Values here are constructed during lowering, consumed by a renderer, and
//! never mutated afterward.

use serde::{Deserialize, Serialize};

/// Top-level parsed statement. Only `Select` is implemented; the type stays
/// open so a future `Insert`/`Update`/`Delete` variant can be added without
/// breaking callers that already match exhaustively on today's variants
/// through a wildcard arm.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    Select(Select),
}

/// A lowered `SELECT` statement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Select {
    /// Primary relation name (as written, before alias resolution).
    pub from: String,
    pub targets: Vec<Target>,
    pub filter: Option<Filter>,
    pub sorts: Vec<Sort>,
    pub limit: Option<Limit>,
}

// ============================================================================
// Targets
// ============================================================================

/// A single projection item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Target {
    Column(ColumnTarget),
    Aggregate(AggregateTarget),
    Embedded(EmbeddedTarget),
}

/// A plain column projection, possibly a JSON-path expression, possibly
/// cast. `column == "*"` is a valid, meaningful value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnTarget {
    pub column: String,
    pub alias: Option<String>,
    pub cast: Option<String>,
}

impl ColumnTarget {
    pub fn simple(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            alias: None,
            cast: None,
        }
    }
}

/// An aggregate function call. `column` is absent only for bare `count()`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregateTarget {
    pub function_name: AggregateFunction,
    pub column: Option<String>,
    pub alias: Option<String>,
    pub input_cast: Option<String>,
    pub output_cast: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateFunction {
    Avg,
    Count,
    Sum,
    Min,
    Max,
}

impl AggregateFunction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Avg => "avg",
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Max => "max",
        }
    }

    /// Parse a bare SQL function name, case-insensitively. Returns `None`
    /// for anything that isn't one of the five aggregates PostgREST
    /// recognizes.
    pub fn from_sql_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "avg" => Some(Self::Avg),
            "count" => Some(Self::Count),
            "sum" => Some(Self::Sum),
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            _ => None,
        }
    }
}

/// A joined relation, represented as a nested projection node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedTarget {
    pub relation: String,
    pub alias: Option<String>,
    pub join_type: JoinType,
    pub targets: Vec<Target>,
    /// Spread mode: when true, PostgREST's `...relation(...)` syntax lifts
    /// these columns into the parent rather than nesting them under
    /// `relation`. Defaults to `true`, see spec.md §9 "Default
    /// `flatten = true`".
    pub flatten: bool,
    pub joined_columns: JoinedColumns,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinType {
    Inner,
    Left,
}

/// One side of an equi-join qualifier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinColumn {
    pub relation: String,
    pub column: String,
}

/// The canonicalized equi-join pair: `left` is always the parent side,
/// `right` is always the newly joined relation, independent of the order
/// the user wrote the qualifier in. See spec.md §9 "Canonical join
/// ordering".
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinedColumns {
    pub left: JoinColumn,
    pub right: JoinColumn,
}

// ============================================================================
// Filters
// ============================================================================

/// A `WHERE`-clause predicate, lowered into PostgREST's filter shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    Column(ColumnFilter),
    Logical(LogicalFilter),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnFilter {
    pub column: String,
    pub operator: ColumnFilterOperator,
    pub negate: bool,
    pub value: FilterValue,
}

/// The operator-dependent value carried by a `ColumnFilter`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Scalar(Scalar),
    List(Vec<Scalar>),
    Null,
    Fts { query: String, config: Option<String> },
}

/// A constant value extracted from the SQL text. PostgREST's query string
/// is untyped, so both variants ultimately render as plain text, the
/// distinction is kept because some operators only accept one kind
/// (spec.md §4.4's BETWEEN numeric-swap rule needs to tell strings and
/// numbers apart).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    String(String),
    Number(f64),
}

impl Scalar {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::String(_) => None,
        }
    }

    pub fn render(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnFilterOperator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    Ilike,
    Match,
    Imatch,
    Is,
    In,
    Fts,
    Plfts,
    Phfts,
    Wfts,
}

impl ColumnFilterOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Like => "like",
            Self::Ilike => "ilike",
            Self::Match => "match",
            Self::Imatch => "imatch",
            Self::Is => "is",
            Self::In => "in",
            Self::Fts => "fts",
            Self::Plfts => "plfts",
            Self::Phfts => "phfts",
            Self::Wfts => "wfts",
        }
    }
}

/// A boolean combinator over child filters. There is deliberately no `Not`
/// variant: negation is folded into the single child's `negate` field
/// during lowering (spec.md §4.4, §9). This sum type cannot represent a
/// `not` node even by construction error.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogicalFilter {
    pub operator: LogicalOperator,
    pub negate: bool,
    pub children: Vec<Filter>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOperator {
    And,
    Or,
}

impl LogicalOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

// ============================================================================
// Sorting
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sort {
    pub column: String,
    pub direction: Option<SortDirection>,
    pub nulls: Option<SortNulls>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortNulls {
    First,
    Last,
}

// ============================================================================
// Pagination
// ============================================================================

/// `LIMIT`/`OFFSET`. At least one of `count`/`offset` is set whenever a
/// `Limit` value exists at all: an absent limit is `None`, not
/// `Some(Limit { count: None, offset: None })`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Limit {
    pub count: Option<i64>,
    pub offset: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn aggregate_function_round_trips_through_sql_name() {
        assert_eq!(AggregateFunction::from_sql_name("COUNT"), Some(AggregateFunction::Count));
        assert_eq!(AggregateFunction::from_sql_name("Sum"), Some(AggregateFunction::Sum));
        assert_eq!(AggregateFunction::from_sql_name("median"), None);
    }

    #[test]
    fn scalar_renders_integral_numbers_without_trailing_zero() {
        assert_eq!(Scalar::Number(4.0).render(), "4");
        assert_eq!(Scalar::Number(4.5).render(), "4.5");
        assert_eq!(Scalar::String("cheese".into()).render(), "cheese");
    }

    #[test]
    fn column_target_simple_has_no_alias_or_cast() {
        let t = ColumnTarget::simple("title");
        assert_eq!(t.column, "title");
        assert!(t.alias.is_none());
        assert!(t.cast.is_none());
    }
}
