//! Statement dispatcher (spec.md §4.1): the single public entry point that
//! demands exactly one parsed statement and routes it by kind.

use pg_query::protobuf::{RawStmt, SelectStmt};
use pg_query::NodeEnum;
use tracing::{debug, instrument};

use crate::error::{parsing_error, Error, Result};
use crate::lower::{from, group_by, limit, order_by, select, where_clause};
use crate::model::{Select, Statement};
use crate::pgast::node_enum;

/// Parse `sql` and lower it into a [`Statement`]. Only `SELECT` is
/// implemented; `INSERT`/`UPDATE`/`DELETE`/`EXPLAIN` fail as
/// [`Error::Unimplemented`], everything else as [`Error::Unsupported`].
#[instrument(skip(sql), fields(sql_len = sql.len()))]
pub fn process_sql(sql: &str) -> Result<Statement> {
    let parsed = pg_query::parse(sql).map_err(|e| parsing_error(e.to_string(), None))?;
    let stmts = &parsed.protobuf.stmts;
    debug!(statement_count = stmts.len(), "parsed SQL text");

    match stmts.len() {
        0 => Err(Error::unsupported("expected a statement, but received none")),
        1 => lower_statement(&stmts[0]),
        _ => Err(Error::unsupported(
            "expected a single statement, but received multiple",
        )),
    }
}

fn lower_statement(raw: &RawStmt) -> Result<Statement> {
    let node = node_enum(&raw.stmt).ok_or_else(|| Error::unsupported("empty statement"))?;
    match node {
        NodeEnum::SelectStmt(s) => lower_select(s).map(Statement::Select),
        NodeEnum::InsertStmt(_) => Err(Error::unimplemented("INSERT is not yet supported")),
        NodeEnum::UpdateStmt(_) => Err(Error::unimplemented("UPDATE is not yet supported")),
        NodeEnum::DeleteStmt(_) => Err(Error::unimplemented("DELETE is not yet supported")),
        NodeEnum::ExplainStmt(_) => Err(Error::unimplemented("EXPLAIN is not yet supported")),
        _ => Err(Error::unsupported("only SELECT statements are supported")),
    }
}

#[instrument(skip_all)]
fn lower_select(s: &SelectStmt) -> Result<Select> {
    if s.with_clause.is_some() {
        return Err(Error::unsupported("WITH (common table expressions) is not supported"));
    }
    if !s.distinct_clause.is_empty() {
        return Err(Error::unsupported("DISTINCT is not supported"));
    }
    if s.having_clause.is_some() {
        return Err(Error::unsupported("HAVING is not supported"));
    }
    if s.from_clause.len() != 1 {
        return Err(Error::unsupported(
            "FROM must name exactly one relation or join",
        ));
    }

    let from_item = s.from_clause[0]
        .node
        .as_ref()
        .ok_or_else(|| Error::unsupported("malformed FROM item"))?;
    let env = from::lower_from(from_item)?;

    let targets = select::lower_projection(&s.target_list, &env)?;

    let filter = match node_enum(&s.where_clause) {
        Some(node) => Some(where_clause::lower_where(node)?),
        None => None,
    };

    group_by::validate_group_by(&s.group_clause, &env, &targets)?;

    let sorts = order_by::lower_order_by(&s.sort_clause, &env)?;
    let limit = limit::lower_limit(&s.limit_count, &s.limit_offset)?;

    Ok(Select {
        from: env.primary.name.clone(),
        targets,
        filter,
        sorts,
        limit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn select_star_lowers_with_no_filter_sorts_or_limit() {
        let statement = process_sql("select * from books").unwrap();
        let Statement::Select(select) = statement;
        assert_eq!(select.from, "books");
        assert!(select.filter.is_none());
        assert!(select.sorts.is_empty());
        assert!(select.limit.is_none());
    }

    #[test]
    fn insert_is_unimplemented_not_unsupported() {
        let err = process_sql("insert into books (title) values ('x')").unwrap_err();
        assert!(matches!(err, Error::Unimplemented { .. }));
    }

    #[test]
    fn empty_source_is_unsupported() {
        let err = process_sql("").unwrap_err();
        assert!(matches!(err, Error::Unsupported { .. }));
    }

    #[test]
    fn multiple_statements_are_unsupported() {
        let err = process_sql("select * from books; select * from authors").unwrap_err();
        assert!(matches!(err, Error::Unsupported { .. }));
    }

    #[test]
    fn with_clause_is_unsupported() {
        let err = process_sql("with recent as (select * from books) select * from recent")
            .unwrap_err();
        assert!(matches!(err, Error::Unsupported { .. }));
    }

    #[test]
    fn joined_select_flattens_embedded_target_by_default() {
        let statement = process_sql(
            "select a.title, b.name from books a inner join authors b on a.author_id = b.id",
        )
        .unwrap();
        let Statement::Select(select) = statement;
        assert_eq!(select.targets.len(), 2);
    }

    #[test]
    fn group_by_without_aggregate_is_rejected() {
        let err = process_sql("select genre from books group by genre").unwrap_err();
        assert!(matches!(err, Error::Unsupported { .. }));
    }

    #[test]
    fn group_by_missing_select_target_is_rejected_with_message() {
        let err = process_sql("select count() from books group by genre").unwrap_err();
        assert!(err
            .to_string()
            .contains("must also exist as a select target"));
    }
}
