//! `FROM`/`JOIN` lowering (spec.md §4.2).
//!
//! Builds the [`RelationsEnv`] every other clause lowerer resolves against.
//! Joins are lowered recursively, left-first: the left side (itself
//! possibly another join) is lowered first, then the right side, which
//! must be a bare relation, is validated and appended.

use pg_query::protobuf::{JoinExpr, JoinType as PgJoinType, Node, RangeVar};
use pg_query::NodeEnum;

use crate::error::{Error, Result};
use crate::model::{EmbeddedTarget, JoinColumn, JoinType, JoinedColumns};
use crate::pgast::{a_expr_operator_name, column_ref_fields_to_string, node_enum, node_enum_ref};
use crate::relations::RelationsEnv;

/// Lower the single element of a `FROM` list into a [`RelationsEnv`].
/// Multiple `FROM` items are rejected by the caller before this is reached
/// (spec.md §4.2: "A `FROM` containing more than one element... fails
/// unsupported").
pub fn lower_from(item: &NodeEnum) -> Result<RelationsEnv> {
    match item {
        NodeEnum::RangeVar(rv) => Ok(bare_relation(rv)),
        NodeEnum::JoinExpr(join) => lower_join(join),
        _ => Err(Error::unsupported(
            "only plain table references and joins are supported in FROM",
        )),
    }
}

fn bare_relation(rv: &RangeVar) -> RelationsEnv {
    let alias = rv.alias.as_ref().map(|a| a.aliasname.clone());
    RelationsEnv::bare(rv.relname.clone(), alias)
}

fn lower_join(join: &JoinExpr) -> Result<RelationsEnv> {
    let larg = node_enum(&join.larg)
        .ok_or_else(|| Error::unsupported("join is missing its left-hand side"))?;
    let mut env = lower_from(larg)?;

    let rarg = node_enum(&join.rarg)
        .ok_or_else(|| Error::unsupported("join is missing its right-hand side"))?;
    let NodeEnum::RangeVar(rv) = rarg else {
        return Err(Error::unsupported(
            "the right-hand side of a join must be a plain table reference",
        ));
    };
    let relation = rv.relname.clone();
    let alias = rv.alias.as_ref().map(|a| a.aliasname.clone());

    let join_type = map_join_type(join.jointype())?;

    let quals = node_enum(&join.quals).ok_or_else(|| {
        Error::unsupported(format!("join on `{relation}` is missing an ON clause"))
    })?;
    let joined_columns = lower_join_qualifier(quals, &env, &relation)?;

    env.joined.push(EmbeddedTarget {
        relation,
        alias,
        join_type,
        targets: Vec::new(),
        flatten: true,
        joined_columns,
    });

    Ok(env)
}

fn map_join_type(jointype: PgJoinType) -> Result<JoinType> {
    match jointype {
        PgJoinType::JoinInner => Ok(JoinType::Inner),
        PgJoinType::JoinLeft => Ok(JoinType::Left),
        other => Err(Error::unsupported(format!(
            "join type {other:?} has no PostgREST equivalent, only INNER and LEFT joins are supported"
        ))),
    }
}

/// Lower a join's `ON` qualifier into a canonical [`JoinedColumns`] pair:
/// `left` is always the parent side, `right` is always the newly joined
/// relation (spec.md §4.2, §9 "Canonical join ordering").
fn lower_join_qualifier(
    quals: &NodeEnum,
    env: &RelationsEnv,
    new_relation: &str,
) -> Result<JoinedColumns> {
    let NodeEnum::AExpr(a_expr) = quals else {
        return Err(Error::unsupported(
            "join qualifier must be a single equality comparison",
        ));
    };

    let op = a_expr_operator_name(&a_expr.name)
        .ok_or_else(|| Error::unsupported("join qualifier has no operator"))?;
    if op != "=" {
        return Err(Error::unsupported(format!(
            "join qualifier must use `=`, found `{op}`"
        )));
    }

    let lexpr = node_enum(&a_expr.lexpr)
        .ok_or_else(|| Error::unsupported("join qualifier is missing its left operand"))?;
    let rexpr = node_enum(&a_expr.rexpr)
        .ok_or_else(|| Error::unsupported("join qualifier is missing its right operand"))?;

    let left_col = column_ref_to_join_column(lexpr)?;
    let right_col = column_ref_to_join_column(rexpr)?;

    for col in [&left_col, &right_col] {
        if col.relation != new_relation && !env.contains_reference(&col.relation) {
            return Err(Error::unsupported(format!(
                "join qualifier references unknown relation `{}`",
                col.relation
            )));
        }
    }

    if left_col.relation == right_col.relation {
        return Err(Error::unsupported(
            "join qualifier comparing two columns of the same relation is not supported",
        ));
    }

    let left_is_new = left_col.relation == new_relation;
    let right_is_new = right_col.relation == new_relation;
    if left_is_new == right_is_new {
        return Err(Error::unsupported(
            "join qualifier must reference a column from the joined table",
        ));
    }

    let (parent, joined) = if right_is_new {
        (left_col, right_col)
    } else {
        (right_col, left_col)
    };

    Ok(JoinedColumns {
        left: parent,
        right: joined,
    })
}

fn column_ref_to_join_column(node: &NodeEnum) -> Result<JoinColumn> {
    let NodeEnum::ColumnRef(column_ref) = node else {
        return Err(Error::unsupported(
            "join qualifier operands must be column references",
        ));
    };

    let segments = string_segments(&column_ref.fields)?;
    match segments.as_slice() {
        [relation, column] => Ok(JoinColumn {
            relation: relation.clone(),
            column: column.clone(),
        }),
        _ => {
            let rendered = column_ref_fields_to_string(&column_ref.fields).unwrap_or_default();
            Err(Error::unsupported(format!(
                "join qualifier columns must be relation-qualified, e.g. `a.id`, found `{rendered}`"
            )))
        }
    }
}

fn string_segments(fields: &[Node]) -> Result<Vec<String>> {
    fields
        .iter()
        .map(|f| match node_enum_ref(f) {
            Some(NodeEnum::String(s)) => Ok(s.sval.clone()),
            _ => Err(Error::unsupported(
                "join qualifier columns must be plain identifiers",
            )),
        })
        .collect()
}
