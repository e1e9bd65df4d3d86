//! Thin helpers over `pg_query`'s protobuf-generated parse tree.
//!
//! `pg_query` hands back the tagged tree spec.md §6 names almost verbatim
//! (`SelectStmt`, `RangeVar`, `JoinExpr`, `ResTarget`, `ColumnRef`, `A_Expr`,
//! `A_Const`, `BoolExpr`, `NullTest`, `FuncCall`, `TypeCast`, `SortBy`) as
//! protobuf message types nested inside a `NodeEnum` tagged union. Every
//! lowerer in `lower/` borrows these helpers rather than destructuring
//! `NodeEnum` directly, so the one place that knows the exact protobuf
//! shape is this file.

use pg_query::protobuf::{a_const, AConst, Node};
use pg_query::NodeEnum;

use crate::error::Error;
use crate::model::Scalar;

/// Unwrap a boxed, optional protobuf `Node` down to its `NodeEnum`.
pub fn node_enum(node: &Option<Box<Node>>) -> Option<&NodeEnum> {
    node.as_ref().and_then(|n| n.node.as_ref())
}

/// Same as [`node_enum`] but for an unboxed optional `Node` (used for
/// repeated fields, which pg_query doesn't box).
pub fn node_enum_ref(node: &Node) -> Option<&NodeEnum> {
    node.node.as_ref()
}

/// A `ColumnRef`/`A_Expr` name list entry, or any other place PostgreSQL's
/// grammar stores a bare identifier as a one-element `String` node list.
pub fn as_plain_string(node_enum: &NodeEnum) -> Option<&str> {
    match node_enum {
        NodeEnum::String(s) => Some(s.sval.as_str()),
        _ => None,
    }
}

/// Render a `ColumnRef.fields` list to the dotted name PostgreSQL printed
/// it as, e.g. `["a", "title"]` -> `"a.title"`. A trailing `A_Star` renders
/// as `*`.
pub fn column_ref_fields_to_string(fields: &[Node]) -> Option<String> {
    let mut parts = Vec::with_capacity(fields.len());
    for field in fields {
        match field.node.as_ref()? {
            NodeEnum::String(s) => parts.push(s.sval.clone()),
            NodeEnum::AStar(_) => parts.push("*".to_string()),
            _ => return None,
        }
    }
    Some(parts.join("."))
}

/// Extract the operator name from an `A_Expr`'s `name` list (normally a
/// single-element list, e.g. `["="]`, `["->"]`, `["~~"]`).
pub fn a_expr_operator_name(name: &[Node]) -> Option<&str> {
    let first = name.first()?;
    match first.node.as_ref()? {
        NodeEnum::String(s) => Some(s.sval.as_str()),
        _ => None,
    }
}

/// Extract a function name from a `FuncCall.funcname` list, taking the
/// last segment (functions may be schema-qualified, e.g.
/// `pg_catalog.to_tsquery`).
pub fn func_call_name(funcname: &[Node]) -> Option<&str> {
    funcname.last().and_then(|n| match n.node.as_ref() {
        Some(NodeEnum::String(s)) => Some(s.sval.as_str()),
        _ => None,
    })
}

/// Extract a Rust-side [`Scalar`] from an `A_Const` node, if it holds a
/// string or numeric literal. Returns `Ok(None)` for `A_Const { isnull:
/// true, .. }` (SQL `NULL`), and `Err` for anything that isn't a constant
/// at all.
pub fn extract_const(node_enum: &NodeEnum) -> Result<Option<Scalar>, Error> {
    let NodeEnum::AConst(c) = node_enum else {
        return Err(Error::unsupported("expected a constant value"));
    };
    Ok(extract_const_value(c))
}

fn extract_const_value(c: &AConst) -> Option<Scalar> {
    if c.isnull {
        return None;
    }
    match c.val.as_ref()? {
        a_const::Val::Ival(i) => Some(Scalar::Number(i.ival as f64)),
        a_const::Val::Fval(f) => f.fval.parse::<f64>().ok().map(Scalar::Number),
        a_const::Val::Sval(s) => Some(Scalar::String(s.sval.clone())),
        a_const::Val::Boolval(b) => Some(Scalar::String(b.boolval.to_string())),
        a_const::Val::Bsval(b) => Some(Scalar::String(b.bsval.clone())),
    }
}

/// Is this node a bare `NULL` constant (`A_Const { isnull: true }`)?
pub fn is_null_const(node_enum: &NodeEnum) -> bool {
    matches!(node_enum, NodeEnum::AConst(c) if c.isnull)
}

/// Canonicalize a `TypeName.names` list into the cast name PostgREST
/// expects, per spec.md §4.3 pass 1: `pg_catalog.int2/int4/int8/float8`
/// rewrite to `smallint/int/bigint/float`; anything else schema-qualified
/// (more than one name segment) is unsupported; an unqualified name passes
/// through verbatim.
pub fn canonicalize_cast_name(names: &[Node]) -> Result<String, Error> {
    let segments: Vec<&str> = names
        .iter()
        .filter_map(|n| n.node.as_ref())
        .filter_map(as_plain_string)
        .collect();

    match segments.as_slice() {
        [name] => Ok(name.to_string()),
        [schema, name] if *schema == "pg_catalog" => Ok(match *name {
            "int2" => "smallint",
            "int4" => "int",
            "int8" => "bigint",
            "float8" => "float",
            other => other,
        }
        .to_string()),
        [schema, name] => Err(Error::unsupported(format!(
            "schema-qualified cast `{schema}.{name}` is not supported"
        ))),
        _ => Err(Error::unsupported("malformed cast type name")),
    }
}
