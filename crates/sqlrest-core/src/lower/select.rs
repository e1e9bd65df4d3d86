//! Projection-list lowering (spec.md §4.3).
//!
//! Three passes over a flat SQL target list: lower each item in isolation,
//! route prefixed items into the embedded target they belong to, then nest
//! embedded targets into a tree keyed by `joinedColumns.left.relation`.

use pg_query::protobuf::{FuncCall, Node, ResTarget, TypeCast};
use pg_query::NodeEnum;

use crate::error::Error;
use crate::error::Result;
use crate::model::{AggregateFunction, AggregateTarget, ColumnTarget, EmbeddedTarget, Target};
use crate::pgast::{canonicalize_cast_name, extract_const, func_call_name, node_enum};
use crate::relations::RelationsEnv;
use crate::model::Scalar;

/// A single projection item after pass 1, still carrying the relation
/// prefix pass 2 routes on. Never part of the output model.
struct RawTarget {
    relation: Option<String>,
    target: Target,
}

pub fn lower_projection(target_list: &[Node], env: &RelationsEnv) -> Result<Vec<Target>> {
    let mut raw = Vec::with_capacity(target_list.len());
    for item in target_list {
        let res_target = match item.node.as_ref() {
            Some(NodeEnum::ResTarget(rt)) => rt.as_ref(),
            _ => return Err(Error::unsupported("malformed select item")),
        };
        raw.push(lower_projection_item(res_target)?);
    }

    let (top_level, joined) = route_targets(env, raw)?;
    let nested = nest_embeds(env.primary.reference(), joined)?;

    let mut targets = top_level;
    targets.extend(nested.into_iter().map(Target::Embedded));
    Ok(targets)
}

// ============================================================================
// Pass 1: per-item lowering
// ============================================================================

fn lower_projection_item(res_target: &ResTarget) -> Result<RawTarget> {
    let val = node_enum(&res_target.val)
        .ok_or_else(|| Error::unsupported("select item has no expression"))?;

    let (relation, mut target) = match val {
        NodeEnum::TypeCast(tc) => lower_cast(tc)?,
        NodeEnum::FuncCall(fc) => lower_aggregate(fc, None)?,
        NodeEnum::ColumnRef(_) | NodeEnum::AExpr(_) => {
            let (relation, column) = lower_column_or_json_path(val)?;
            (
                relation,
                Target::Column(ColumnTarget {
                    column,
                    alias: None,
                    cast: None,
                }),
            )
        }
        _ => {
            return Err(Error::unsupported(
                "expressions not supported as targets, only columns, JSON paths, casts and aggregates may be projected",
            ))
        }
    };

    if !res_target.name.is_empty() {
        let alias = res_target.name.clone();
        match &mut target {
            Target::Column(c) => c.alias = Some(alias),
            Target::Aggregate(a) => a.alias = Some(alias),
            Target::Embedded(_) => unreachable!("embedded targets are never produced by pass 1"),
        }
    }

    Ok(RawTarget { relation, target })
}

fn lower_cast(tc: &TypeCast) -> Result<(Option<String>, Target)> {
    let names = tc
        .type_name
        .as_ref()
        .map(|t| t.names.as_slice())
        .unwrap_or(&[]);
    let cast = canonicalize_cast_name(names)?;

    let inner = node_enum(&tc.arg).ok_or_else(|| Error::unsupported("cast is missing its operand"))?;
    match inner {
        NodeEnum::FuncCall(fc) => lower_aggregate(fc, Some(cast)),
        other => {
            let (relation, column) = lower_column_or_json_path(other)?;
            Ok((
                relation,
                Target::Column(ColumnTarget {
                    column,
                    alias: None,
                    cast: Some(cast),
                }),
            ))
        }
    }
}

fn lower_aggregate(fc: &FuncCall, output_cast: Option<String>) -> Result<(Option<String>, Target)> {
    let name = func_call_name(&fc.funcname)
        .ok_or_else(|| Error::unsupported("aggregate call is missing a function name"))?;
    let function_name = AggregateFunction::from_sql_name(name).ok_or_else(|| {
        Error::unsupported(format!("`{name}` is not a supported aggregate function"))
    })?;

    if fc.args.is_empty() {
        if function_name != AggregateFunction::Count {
            return Err(Error::unsupported(format!(
                "`{name}()` requires a column argument"
            )));
        }
        return Ok((
            None,
            Target::Aggregate(AggregateTarget {
                function_name,
                column: None,
                alias: None,
                input_cast: None,
                output_cast,
            }),
        ));
    }
    if fc.args.len() > 1 {
        return Err(Error::unsupported(
            "aggregate functions take at most one argument",
        ));
    }

    let arg = fc.args[0]
        .node
        .as_ref()
        .ok_or_else(|| Error::unsupported("aggregate argument is malformed"))?;

    let (relation, column, input_cast) = match arg {
        NodeEnum::TypeCast(inner_cast) => {
            let inner = node_enum(&inner_cast.arg)
                .ok_or_else(|| Error::unsupported("cast is missing its operand"))?;
            let (relation, column) = lower_column_or_json_path(inner)?;
            let names = inner_cast
                .type_name
                .as_ref()
                .map(|t| t.names.as_slice())
                .unwrap_or(&[]);
            let cast = canonicalize_cast_name(names)?;
            (relation, column, Some(cast))
        }
        other => {
            let (relation, column) = lower_column_or_json_path(other)?;
            (relation, column, None)
        }
    };

    Ok((
        relation,
        Target::Aggregate(AggregateTarget {
            function_name,
            column: Some(column),
            alias: None,
            input_cast,
            output_cast,
        }),
    ))
}

pub(crate) fn lower_column_or_json_path(node: &NodeEnum) -> Result<(Option<String>, String)> {
    match node {
        NodeEnum::ColumnRef(cr) => lower_column_ref(&cr.fields),
        NodeEnum::AExpr(a) => lower_json_path(a),
        _ => Err(Error::unsupported(
            "expressions not supported as targets, only columns, JSON paths, casts and aggregates may be projected",
        )),
    }
}

fn lower_column_ref(fields: &[Node]) -> Result<(Option<String>, String)> {
    let parts = string_or_star_segments(fields)?;
    match parts.as_slice() {
        [col] => Ok((None, col.clone())),
        [rel, col] => Ok((Some(rel.clone()), col.clone())),
        _ => Err(Error::unsupported(
            "column reference has more qualifiers than `relation.column`",
        )),
    }
}

fn string_or_star_segments(fields: &[Node]) -> Result<Vec<String>> {
    fields
        .iter()
        .map(|f| match f.node.as_ref() {
            Some(NodeEnum::String(s)) => Ok(s.sval.clone()),
            Some(NodeEnum::AStar(_)) => Ok("*".to_string()),
            _ => Err(Error::unsupported(
                "column reference segment is not a plain identifier",
            )),
        })
        .collect()
}

fn lower_json_path(a: &pg_query::protobuf::AExpr) -> Result<(Option<String>, String)> {
    let op = crate::pgast::a_expr_operator_name(&a.name)
        .ok_or_else(|| Error::unsupported("malformed JSON path operator"))?;
    if op != "->" && op != "->>" {
        return Err(Error::unsupported(
            "expressions not supported as targets, only columns, JSON paths, casts and aggregates may be projected",
        ));
    }

    let lexpr = node_enum(&a.lexpr).ok_or_else(json_path_error)?;
    let (relation, base) = match lexpr {
        NodeEnum::ColumnRef(cr) => lower_column_ref(&cr.fields)?,
        NodeEnum::AExpr(inner) => lower_json_path(inner)?,
        _ => return Err(json_path_error()),
    };

    let rexpr = node_enum(&a.rexpr).ok_or_else(json_path_error)?;
    let literal = json_path_literal(rexpr)?;

    Ok((relation, format!("{base}{op}{literal}")))
}

fn json_path_literal(node: &NodeEnum) -> Result<String> {
    let value = extract_const(node).map_err(|_| json_path_error())?;
    match value {
        Some(Scalar::String(s)) => Ok(format!("'{s}'")),
        Some(Scalar::Number(n)) => Ok(Scalar::Number(n).render()),
        None => Err(json_path_error()),
    }
}

fn json_path_error() -> Error {
    Error::unsupported_with_hint(
        "expressions not supported as targets, only columns, JSON paths, casts and aggregates may be projected",
        "Did you forget to quote a JSON path?",
    )
}

// ============================================================================
// Pass 2: relation routing
// ============================================================================

fn route_targets(
    env: &RelationsEnv,
    raw: Vec<RawTarget>,
) -> Result<(Vec<Target>, Vec<EmbeddedTarget>)> {
    let mut joined = env.joined.clone();
    let mut top_level = Vec::new();

    for RawTarget { relation, target } in raw {
        match relation {
            None => top_level.push(target),
            Some(rel) if rel == env.primary.reference() => top_level.push(target),
            Some(rel) => {
                let embed = find_embed_mut(&mut joined, &rel).ok_or_else(|| {
                    Error::unsupported_with_hint(
                        format!("`{rel}` does not refer to a joined relation"),
                        "Did you forget to join that relation or alias it to something else?",
                    )
                })?;
                embed.targets.push(target);
            }
        }
    }

    Ok((top_level, joined))
}

fn find_embed_mut<'a>(joined: &'a mut [EmbeddedTarget], name: &str) -> Option<&'a mut EmbeddedTarget> {
    joined.iter_mut().find(|t| t.alias.as_deref().unwrap_or(&t.relation) == name)
}

// ============================================================================
// Pass 3: embedding nesting
// ============================================================================

fn nest_embeds(primary_ref: &str, joined: Vec<EmbeddedTarget>) -> Result<Vec<EmbeddedTarget>> {
    let mut top = Vec::new();
    let mut pending: Vec<(String, EmbeddedTarget)> = Vec::new();

    for embed in joined {
        let parent_ref = embed.joined_columns.left.relation.clone();
        if parent_ref == primary_ref {
            top.push(embed);
        } else {
            pending.push((parent_ref, embed));
        }
    }

    while !pending.is_empty() {
        let mut remaining = Vec::new();
        let mut progressed = false;

        for (parent_ref, child) in pending {
            if let Some(parent) = find_embed_in_tree(&mut top, &parent_ref) {
                parent.targets.push(Target::Embedded(child));
                progressed = true;
            } else {
                remaining.push((parent_ref, child));
            }
        }

        if !progressed {
            return Err(Error::unsupported(
                "join references a relation that was never joined",
            ));
        }
        pending = remaining;
    }

    Ok(top)
}

fn find_embed_in_tree<'a>(
    embeds: &'a mut [EmbeddedTarget],
    name: &str,
) -> Option<&'a mut EmbeddedTarget> {
    for embed in embeds.iter_mut() {
        if embed.alias.as_deref().unwrap_or(&embed.relation) == name {
            return Some(embed);
        }
    }
    for embed in embeds.iter_mut() {
        for t in embed.targets.iter_mut() {
            if let Target::Embedded(nested) = t {
                if let Some(found) = find_embed_in_tree(std::slice::from_mut(nested), name) {
                    return Some(found);
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{JoinColumn, JoinType, JoinedColumns};
    use pg_query::protobuf::{
        AExpr, AExprKind, AStar, AConst, ColumnRef, Integer, String as PgString, TypeName,
        a_const,
    };
    use pretty_assertions::assert_eq;

    fn col_node(relation: Option<&str>, column: &str) -> Node {
        let mut fields = Vec::new();
        if let Some(rel) = relation {
            fields.push(Node {
                node: Some(NodeEnum::String(PgString { sval: rel.to_string() })),
            });
        }
        fields.push(Node {
            node: Some(NodeEnum::String(PgString {
                sval: column.to_string(),
            })),
        });
        Node {
            node: Some(NodeEnum::ColumnRef(Box::new(ColumnRef {
                fields,
                ..Default::default()
            }))),
        }
    }

    fn star_node(relation: Option<&str>) -> Node {
        let mut fields = Vec::new();
        if let Some(rel) = relation {
            fields.push(Node {
                node: Some(NodeEnum::String(PgString { sval: rel.to_string() })),
            });
        }
        fields.push(Node {
            node: Some(NodeEnum::AStar(AStar {})),
        });
        Node {
            node: Some(NodeEnum::ColumnRef(Box::new(ColumnRef {
                fields,
                ..Default::default()
            }))),
        }
    }

    fn res_target(alias: &str, val: Node) -> ResTarget {
        ResTarget {
            name: alias.to_string(),
            val: Some(Box::new(val)),
            ..Default::default()
        }
    }

    fn bare_env() -> RelationsEnv {
        RelationsEnv::bare("books", None)
    }

    fn joined_env() -> RelationsEnv {
        let mut env = RelationsEnv::bare("books", Some("a".into()));
        env.joined.push(EmbeddedTarget {
            relation: "authors".into(),
            alias: Some("b".into()),
            join_type: JoinType::Inner,
            targets: Vec::new(),
            flatten: true,
            joined_columns: JoinedColumns {
                left: JoinColumn {
                    relation: "a".into(),
                    column: "author_id".into(),
                },
                right: JoinColumn {
                    relation: "b".into(),
                    column: "id".into(),
                },
            },
        });
        env
    }

    #[test]
    fn star_target_lowers_to_single_column() {
        let targets = lower_projection(
            &[Node {
                node: Some(NodeEnum::ResTarget(Box::new(res_target("", star_node(None))))),
            }],
            &bare_env(),
        )
        .unwrap();
        assert_eq!(targets, vec![Target::Column(ColumnTarget::simple("*"))]);
    }

    #[test]
    fn aliased_column_keeps_alias() {
        let targets = lower_projection(
            &[Node {
                node: Some(NodeEnum::ResTarget(Box::new(res_target(
                    "renamed",
                    col_node(None, "title"),
                )))),
            }],
            &bare_env(),
        )
        .unwrap();
        match &targets[0] {
            Target::Column(c) => {
                assert_eq!(c.column, "title");
                assert_eq!(c.alias.as_deref(), Some("renamed"));
            }
            other => panic!("expected column target, got {other:?}"),
        }
    }

    #[test]
    fn bare_count_stays_at_top_level() {
        let call = NodeEnum::FuncCall(Box::new(FuncCall {
            funcname: vec![Node {
                node: Some(NodeEnum::String(PgString { sval: "count".into() })),
            }],
            ..Default::default()
        }));
        let targets = lower_projection(
            &[Node {
                node: Some(NodeEnum::ResTarget(Box::new(res_target(
                    "",
                    Node { node: Some(call) },
                )))),
            }],
            &bare_env(),
        )
        .unwrap();
        match &targets[0] {
            Target::Aggregate(a) => {
                assert_eq!(a.function_name, AggregateFunction::Count);
                assert!(a.column.is_none());
            }
            other => panic!("expected aggregate target, got {other:?}"),
        }
    }

    #[test]
    fn prefixed_column_is_routed_into_embedded_target() {
        let targets = lower_projection(
            &[
                Node {
                    node: Some(NodeEnum::ResTarget(Box::new(res_target(
                        "",
                        col_node(Some("a"), "title"),
                    )))),
                },
                Node {
                    node: Some(NodeEnum::ResTarget(Box::new(res_target(
                        "",
                        col_node(Some("b"), "name"),
                    )))),
                },
            ],
            &joined_env(),
        )
        .unwrap();

        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0], Target::Column(ColumnTarget::simple("title")));
        match &targets[1] {
            Target::Embedded(e) => {
                assert_eq!(e.relation, "authors");
                assert_eq!(e.targets, vec![Target::Column(ColumnTarget::simple("name"))]);
            }
            other => panic!("expected embedded target, got {other:?}"),
        }
    }

    #[test]
    fn unknown_prefix_is_unsupported() {
        let err = lower_projection(
            &[Node {
                node: Some(NodeEnum::ResTarget(Box::new(res_target(
                    "",
                    col_node(Some("c"), "x"),
                )))),
            }],
            &joined_env(),
        )
        .unwrap_err();
        assert!(err.hint().unwrap().contains("join that relation"));
    }

    #[test]
    fn json_path_chain_renders_verbatim() {
        let inner = NodeEnum::AExpr(Box::new(AExpr {
            kind: AExprKind::AexprOp as i32,
            name: vec![Node {
                node: Some(NodeEnum::String(PgString { sval: "->".into() })),
            }],
            lexpr: Some(Box::new(col_node(None, "meta"))),
            rexpr: Some(Box::new(Node {
                node: Some(NodeEnum::AConst(Box::new(AConst {
                    isnull: false,
                    val: Some(a_const::Val::Sval(PgString { sval: "a".into() })),
                    ..Default::default()
                }))),
            })),
            ..Default::default()
        }));
        let outer = NodeEnum::AExpr(Box::new(AExpr {
            kind: AExprKind::AexprOp as i32,
            name: vec![Node {
                node: Some(NodeEnum::String(PgString { sval: "->>".into() })),
            }],
            lexpr: Some(Box::new(Node { node: Some(inner) })),
            rexpr: Some(Box::new(Node {
                node: Some(NodeEnum::AConst(Box::new(AConst {
                    isnull: false,
                    val: Some(a_const::Val::Sval(PgString { sval: "b".into() })),
                    ..Default::default()
                }))),
            })),
            ..Default::default()
        }));

        let targets = lower_projection(
            &[Node {
                node: Some(NodeEnum::ResTarget(Box::new(res_target(
                    "",
                    Node { node: Some(outer) },
                )))),
            }],
            &bare_env(),
        )
        .unwrap();
        assert_eq!(
            targets[0],
            Target::Column(ColumnTarget::simple("meta->'a'->>'b'"))
        );
    }

    #[test]
    fn pg_catalog_cast_is_canonicalized() {
        let cast = NodeEnum::TypeCast(Box::new(TypeCast {
            arg: Some(Box::new(col_node(None, "id"))),
            type_name: Some(TypeName {
                names: vec![
                    Node {
                        node: Some(NodeEnum::String(PgString { sval: "pg_catalog".into() })),
                    },
                    Node {
                        node: Some(NodeEnum::String(PgString { sval: "int4".into() })),
                    },
                ],
                ..Default::default()
            }),
            ..Default::default()
        }));
        let targets = lower_projection(
            &[Node {
                node: Some(NodeEnum::ResTarget(Box::new(res_target(
                    "",
                    Node { node: Some(cast) },
                )))),
            }],
            &bare_env(),
        )
        .unwrap();
        match &targets[0] {
            Target::Column(c) => assert_eq!(c.cast.as_deref(), Some("int")),
            other => panic!("expected column target, got {other:?}"),
        }
    }

    #[test]
    fn cast_column_in_aggregate_sets_input_cast() {
        let cast = NodeEnum::TypeCast(Box::new(TypeCast {
            arg: Some(Box::new(col_node(None, "price"))),
            type_name: Some(TypeName {
                names: vec![Node {
                    node: Some(NodeEnum::String(PgString { sval: "int".into() })),
                }],
                ..Default::default()
            }),
            ..Default::default()
        }));
        let call = NodeEnum::FuncCall(Box::new(FuncCall {
            funcname: vec![Node {
                node: Some(NodeEnum::String(PgString { sval: "sum".into() })),
            }],
            args: vec![Node { node: Some(cast) }],
            ..Default::default()
        }));
        let targets = lower_projection(
            &[Node {
                node: Some(NodeEnum::ResTarget(Box::new(res_target(
                    "",
                    Node { node: Some(call) },
                )))),
            }],
            &bare_env(),
        )
        .unwrap();
        match &targets[0] {
            Target::Aggregate(a) => {
                assert_eq!(a.column.as_deref(), Some("price"));
                assert_eq!(a.input_cast.as_deref(), Some("int"));
            }
            other => panic!("expected aggregate target, got {other:?}"),
        }
    }

    #[test]
    fn literal_projection_is_unsupported() {
        let lit = NodeEnum::AConst(Box::new(AConst {
            isnull: false,
            val: Some(a_const::Val::Ival(Integer { ival: 1 })),
            ..Default::default()
        }));
        let err = lower_projection(
            &[Node {
                node: Some(NodeEnum::ResTarget(Box::new(res_target(
                    "",
                    Node { node: Some(lit) },
                )))),
            }],
            &bare_env(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Unsupported { .. }));
    }
}
