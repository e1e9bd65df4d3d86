//! The semantic lowering pass: converts a parsed PostgreSQL `SELECT` into
//! `sqlrest`'s renderer-agnostic request model, enforcing the cross-clause
//! invariants PostgREST's surface demands along the way.
//!
//! Control flow is strictly linear: parse (via `pg_query`) -> lower (this
//! crate) -> render (`sqlrest-render`). No shared mutable state, no
//! concurrency.

pub mod dispatch;
pub mod error;
pub mod helpers;
pub mod lower;
pub mod model;
pub mod pgast;
pub mod relations;

pub use dispatch::process_sql;
pub use error::{Error, Result};
pub use model::Statement;

/// Common imports for crates consuming `sqlrest-core`.
pub mod prelude {
    pub use crate::dispatch::process_sql;
    pub use crate::error::{Error, Result};
    pub use crate::model::{
        AggregateFunction, AggregateTarget, ColumnFilter, ColumnFilterOperator, ColumnTarget,
        EmbeddedTarget, Filter, FilterValue, JoinColumn, JoinType, JoinedColumns, Limit,
        LogicalFilter, LogicalOperator, Scalar, Select, Sort, SortDirection, SortNulls, Statement,
        Target,
    };
}
