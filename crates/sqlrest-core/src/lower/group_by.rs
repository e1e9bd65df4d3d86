//! `GROUP BY` validation (spec.md §4.5).
//!
//! Runs on the already-lowered projection list; it never mutates it. Checks
//! invariants 3 and 4 from spec.md §3: every non-aggregate projection must
//! appear in the group list (and vice versa), and a non-empty `GROUP BY`
//! requires at least one aggregate projection.

use pg_query::protobuf::Node;

use crate::error::{Error, Result};
use crate::helpers::{render_qualified_name, some_target, QualifiedNameStyle};
use crate::lower::select::lower_column_or_json_path;
use crate::model::Target;
use crate::pgast::node_enum_ref;
use crate::relations::RelationsEnv;

pub fn validate_group_by(group_clause: &[Node], env: &RelationsEnv, targets: &[Target]) -> Result<()> {
    if group_clause.is_empty() {
        return Ok(());
    }

    if !some_target(targets, &|t| matches!(t, Target::Aggregate(_))) {
        return Err(Error::unsupported(
            "GROUP BY requires at least one aggregate projection",
        ));
    }

    let group_items = group_clause
        .iter()
        .map(|n| {
            let ne = node_enum_ref(n)
                .ok_or_else(|| Error::unsupported("malformed GROUP BY item"))?;
            let (relation, column) = lower_column_or_json_path(ne)?;
            let relation = normalize_relation(relation, env)?;
            Ok((relation, column))
        })
        .collect::<Result<Vec<(Option<String>, String)>>>()?;

    let projected = collect_non_aggregate_columns(targets, None);

    for (relation, column) in &projected {
        let present = group_items
            .iter()
            .any(|(r, c)| r == relation && c == column);
        if !present {
            let name = render_qualified_name(relation.as_deref(), column, QualifiedNameStyle::Dot);
            return Err(Error::unsupported(format!(
                "every non-aggregate projection must appear in GROUP BY, missing `{name}`"
            )));
        }
    }

    for (relation, column) in &group_items {
        let present = projected
            .iter()
            .any(|(r, c)| r == relation && c == column);
        if !present {
            return Err(Error::unsupported(
                "Every group by column must also exist as a select target",
            ));
        }
    }

    Ok(())
}

fn normalize_relation(relation: Option<String>, env: &RelationsEnv) -> Result<Option<String>> {
    match relation {
        None => Ok(None),
        Some(r) if r == env.primary.reference() => Ok(None),
        Some(r) if RelationsEnv::find_by_reference(&env.joined, &r).is_some() => Ok(Some(r)),
        Some(r) => Err(Error::unsupported_with_hint(
            format!("`{r}` does not refer to a joined relation"),
            "Did you forget to join that relation or alias it to something else?",
        )),
    }
}

fn collect_non_aggregate_columns(
    targets: &[Target],
    relation_ctx: Option<&str>,
) -> Vec<(Option<String>, String)> {
    let mut out = Vec::new();
    for t in targets {
        match t {
            Target::Column(c) => out.push((relation_ctx.map(str::to_string), c.column.clone())),
            Target::Aggregate(_) => {}
            Target::Embedded(e) => {
                let reference = e.alias.clone().unwrap_or_else(|| e.relation.clone());
                out.extend(collect_non_aggregate_columns(&e.targets, Some(&reference)));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AggregateFunction, AggregateTarget, ColumnTarget, EmbeddedTarget, JoinColumn, JoinType, JoinedColumns};
    use pg_query::protobuf::{ColumnRef, Node, String as PgString};

    fn col_node(name: &str) -> Node {
        Node {
            node: Some(pg_query::NodeEnum::ColumnRef(Box::new(ColumnRef {
                fields: vec![Node {
                    node: Some(pg_query::NodeEnum::String(PgString { sval: name.to_string() })),
                }],
                ..Default::default()
            }))),
        }
    }

    fn prefixed_col_node(relation: &str, name: &str) -> Node {
        Node {
            node: Some(pg_query::NodeEnum::ColumnRef(Box::new(ColumnRef {
                fields: vec![
                    Node {
                        node: Some(pg_query::NodeEnum::String(PgString { sval: relation.to_string() })),
                    },
                    Node {
                        node: Some(pg_query::NodeEnum::String(PgString { sval: name.to_string() })),
                    },
                ],
                ..Default::default()
            }))),
        }
    }

    fn env() -> RelationsEnv {
        RelationsEnv::bare("books", None)
    }

    #[test]
    fn empty_group_by_is_always_valid() {
        assert!(validate_group_by(&[], &env(), &[]).is_ok());
    }

    #[test]
    fn group_by_without_aggregate_is_unsupported() {
        let targets = vec![Target::Column(ColumnTarget::simple("genre"))];
        let group = vec![col_node("genre")];
        assert!(validate_group_by(&group, &env(), &targets).is_err());
    }

    #[test]
    fn valid_group_by_with_matching_select() {
        let targets = vec![
            Target::Column(ColumnTarget::simple("genre")),
            Target::Aggregate(AggregateTarget {
                function_name: AggregateFunction::Count,
                column: None,
                alias: None,
                input_cast: None,
                output_cast: None,
            }),
        ];
        let group = vec![col_node("genre")];
        assert!(validate_group_by(&group, &env(), &targets).is_ok());
    }

    #[test]
    fn missing_select_target_for_group_column_is_unsupported() {
        let targets = vec![Target::Aggregate(AggregateTarget {
            function_name: AggregateFunction::Count,
            column: None,
            alias: None,
            input_cast: None,
            output_cast: None,
        })];
        let group = vec![col_node("genre")];
        let err = validate_group_by(&group, &env(), &targets).unwrap_err();
        assert!(err.to_string().contains("must also exist as a select target"));
    }

    #[test]
    fn missing_group_entry_for_projected_column_is_unsupported() {
        let targets = vec![
            Target::Column(ColumnTarget::simple("genre")),
            Target::Column(ColumnTarget::simple("publisher")),
            Target::Aggregate(AggregateTarget {
                function_name: AggregateFunction::Count,
                column: None,
                alias: None,
                input_cast: None,
                output_cast: None,
            }),
        ];
        let group = vec![col_node("genre")];
        assert!(validate_group_by(&group, &env(), &targets).is_err());
    }

    #[test]
    fn group_by_prefix_referencing_unknown_relation_is_unsupported() {
        let targets = vec![
            Target::Column(ColumnTarget::simple("genre")),
            Target::Aggregate(AggregateTarget {
                function_name: AggregateFunction::Count,
                column: None,
                alias: None,
                input_cast: None,
                output_cast: None,
            }),
        ];
        let group = vec![prefixed_col_node("publishers", "genre")];
        let err = validate_group_by(&group, &env(), &targets).unwrap_err();
        assert!(err.hint().unwrap().contains("join that relation"));
    }

    #[test]
    fn group_by_prefix_referencing_joined_relation_is_accepted() {
        let mut joined_env = env();
        joined_env.joined.push(EmbeddedTarget {
            relation: "authors".into(),
            alias: None,
            join_type: JoinType::Left,
            targets: vec![Target::Column(ColumnTarget::simple("name"))],
            flatten: true,
            joined_columns: JoinedColumns {
                left: JoinColumn { relation: "books".into(), column: "author_id".into() },
                right: JoinColumn { relation: "authors".into(), column: "id".into() },
            },
        });
        let targets = vec![
            Target::Embedded(EmbeddedTarget {
                relation: "authors".into(),
                alias: None,
                join_type: JoinType::Left,
                targets: vec![Target::Column(ColumnTarget::simple("name"))],
                flatten: true,
                joined_columns: JoinedColumns {
                    left: JoinColumn { relation: "books".into(), column: "author_id".into() },
                    right: JoinColumn { relation: "authors".into(), column: "id".into() },
                },
            }),
            Target::Aggregate(AggregateTarget {
                function_name: AggregateFunction::Count,
                column: None,
                alias: None,
                input_cast: None,
                output_cast: None,
            }),
        ];
        let group = vec![prefixed_col_node("authors", "name")];
        assert!(validate_group_by(&group, &joined_env, &targets).is_ok());
    }
}
