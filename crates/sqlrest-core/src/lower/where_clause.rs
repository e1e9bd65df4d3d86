//! `WHERE` lowering (spec.md §4.4).
//!
//! Three node shapes are recognised: binary expression, null test, boolean
//! combinator. `NOT_EXPR` is folded into its single child's `negate` field
//! during lowering: no `not` `LogicalFilter` is ever produced.

use pg_query::protobuf::{AExpr, AExprKind, BoolExpr, BoolExprType, NullTest, NullTestType};
use pg_query::NodeEnum;

use crate::error::{Error, Result};
use crate::helpers::{render_qualified_name, QualifiedNameStyle};
use crate::lower::select::lower_column_or_json_path;
use crate::model::{ColumnFilter, ColumnFilterOperator, Filter, FilterValue, LogicalFilter, LogicalOperator, Scalar};
use crate::pgast::{a_expr_operator_name, extract_const, func_call_name, is_null_const, node_enum, node_enum_ref};

pub fn lower_where(node: &NodeEnum) -> Result<Filter> {
    match node {
        NodeEnum::BoolExpr(b) => lower_bool_expr(b),
        NodeEnum::NullTest(nt) => lower_null_test(nt),
        NodeEnum::AExpr(a) => lower_a_expr(a),
        _ => Err(Error::unsupported("unsupported expression in WHERE clause")),
    }
}

fn where_column(node: &NodeEnum) -> Result<String> {
    let (relation, column) = lower_column_or_json_path(node)?;
    Ok(render_qualified_name(relation.as_deref(), &column, QualifiedNameStyle::Dot))
}

// ============================================================================
// Boolean combinators
// ============================================================================

fn lower_bool_expr(b: &BoolExpr) -> Result<Filter> {
    match b.boolop() {
        BoolExprType::AndExpr => lower_logical(b, LogicalOperator::And),
        BoolExprType::OrExpr => lower_logical(b, LogicalOperator::Or),
        BoolExprType::NotExpr => {
            if b.args.len() != 1 {
                return Err(Error::unsupported("NOT must have exactly one operand"));
            }
            let arg = b.args[0]
                .node
                .as_ref()
                .ok_or_else(|| Error::unsupported("malformed NOT operand"))?;
            Ok(fold_negation(lower_where(arg)?))
        }
    }
}

fn lower_logical(b: &BoolExpr, operator: LogicalOperator) -> Result<Filter> {
    let children = b
        .args
        .iter()
        .map(|n| {
            n.node
                .as_ref()
                .ok_or_else(|| Error::unsupported("malformed boolean operand"))
                .and_then(lower_where)
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Filter::Logical(LogicalFilter {
        operator,
        negate: false,
        children,
    }))
}

fn fold_negation(filter: Filter) -> Filter {
    match filter {
        Filter::Column(mut c) => {
            c.negate = true;
            Filter::Column(c)
        }
        Filter::Logical(mut l) => {
            l.negate = true;
            Filter::Logical(l)
        }
    }
}

// ============================================================================
// Null test
// ============================================================================

fn lower_null_test(nt: &NullTest) -> Result<Filter> {
    let arg = node_enum(&nt.arg)
        .ok_or_else(|| Error::unsupported("IS NULL test is missing its operand"))?;
    let column = where_column(arg)?;
    let negate = matches!(nt.nulltesttype(), NullTestType::IsNotNull);
    Ok(Filter::Column(ColumnFilter {
        column,
        operator: ColumnFilterOperator::Is,
        negate,
        value: FilterValue::Null,
    }))
}

// ============================================================================
// Binary expressions: comparisons, LIKE/ILIKE, IN, BETWEEN
// ============================================================================

fn lower_a_expr(a: &AExpr) -> Result<Filter> {
    match a.kind() {
        AExprKind::AexprOp => lower_op(a),
        AExprKind::AexprLike => lower_pattern(a, ColumnFilterOperator::Like),
        AExprKind::AexprIlike => lower_pattern(a, ColumnFilterOperator::Ilike),
        AExprKind::AexprIn => lower_in(a),
        AExprKind::AexprBetween => lower_between(a, false, false),
        AExprKind::AexprNotBetween => lower_between(a, false, true),
        AExprKind::AexprBetweenSym => lower_between(a, true, false),
        AExprKind::AexprNotBetweenSym => lower_between(a, true, true),
        other => Err(Error::unsupported(format!(
            "operator kind {other:?} is not supported in WHERE"
        ))),
    }
}

fn operands(a: &AExpr) -> Result<(&NodeEnum, &NodeEnum)> {
    let lexpr = node_enum(&a.lexpr)
        .ok_or_else(|| Error::unsupported("WHERE expression is missing its left operand"))?;
    let rexpr = node_enum(&a.rexpr)
        .ok_or_else(|| Error::unsupported("WHERE expression is missing its right operand"))?;
    Ok((lexpr, rexpr))
}

fn lower_op(a: &AExpr) -> Result<Filter> {
    let op = a_expr_operator_name(&a.name)
        .ok_or_else(|| Error::unsupported("WHERE operator is missing its symbol"))?;
    let (lexpr, rexpr) = operands(a)?;

    if op == "@@" {
        return lower_fts(lexpr, rexpr);
    }

    let operator = match op {
        "=" => ColumnFilterOperator::Eq,
        "<>" => ColumnFilterOperator::Neq,
        ">" => ColumnFilterOperator::Gt,
        ">=" => ColumnFilterOperator::Gte,
        "<" => ColumnFilterOperator::Lt,
        "<=" => ColumnFilterOperator::Lte,
        "~" => ColumnFilterOperator::Match,
        "~*" => ColumnFilterOperator::Imatch,
        other => {
            return Err(Error::unsupported(format!(
                "operator `{other}` is not supported in WHERE"
            )))
        }
    };

    let column = where_column(lexpr)?;
    let value = scalar_constant(rexpr)?;
    Ok(Filter::Column(ColumnFilter {
        column,
        operator,
        negate: false,
        value: FilterValue::Scalar(value),
    }))
}

fn scalar_constant(node: &NodeEnum) -> Result<Scalar> {
    if is_null_const(node) {
        return Err(Error::unsupported_with_hint(
            "NULL is not a valid operand for this comparison",
            "Did you mean `IS NULL`/`IS NOT NULL`?",
        ));
    }
    match extract_const(node) {
        Ok(Some(value)) => Ok(value),
        _ => Err(Error::unsupported_with_hint(
            "right-hand side of a WHERE comparison must be a constant",
            "Did you forget to wrap your value in single quotes?",
        )),
    }
}

fn lower_pattern(a: &AExpr, base_operator: ColumnFilterOperator) -> Result<Filter> {
    let op = a_expr_operator_name(&a.name).unwrap_or_default();
    let negate = op.starts_with('!');
    let (lexpr, rexpr) = operands(a)?;
    let column = where_column(lexpr)?;
    let value = string_constant(rexpr)?;
    Ok(Filter::Column(ColumnFilter {
        column,
        operator: base_operator,
        negate,
        value: FilterValue::Scalar(Scalar::String(value)),
    }))
}

fn string_constant(node: &NodeEnum) -> Result<String> {
    match extract_const(node) {
        Ok(Some(Scalar::String(s))) => Ok(s),
        _ => Err(Error::unsupported(
            "right-hand side must be a string constant",
        )),
    }
}

fn lower_in(a: &AExpr) -> Result<Filter> {
    let op = a_expr_operator_name(&a.name).unwrap_or_default();
    let negate = op.starts_with('!');
    let (lexpr, rexpr) = operands(a)?;
    let column = where_column(lexpr)?;

    let NodeEnum::List(list) = rexpr else {
        return Err(Error::unsupported(
            "IN right-hand side must be a list of constants",
        ));
    };
    let values = list
        .items
        .iter()
        .map(|n| {
            let ne = node_enum_ref(n)
                .ok_or_else(|| Error::unsupported("malformed IN list item"))?;
            match extract_const(ne) {
                Ok(Some(value)) => Ok(value),
                _ => Err(Error::unsupported("IN list items must be constants")),
            }
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Filter::Column(ColumnFilter {
        column,
        operator: ColumnFilterOperator::In,
        negate,
        value: FilterValue::List(values),
    }))
}

// ============================================================================
// Full-text search
// ============================================================================

fn lower_fts(lexpr: &NodeEnum, rexpr: &NodeEnum) -> Result<Filter> {
    let column = match lexpr {
        NodeEnum::FuncCall(fc) => {
            let name = func_call_name(&fc.funcname).unwrap_or_default();
            if name != "to_tsvector" || fc.args.len() != 1 {
                return Err(Error::unsupported(
                    "left-hand side of @@ must be a column or to_tsvector(column)",
                ));
            }
            let arg = fc.args[0]
                .node
                .as_ref()
                .ok_or_else(|| Error::unsupported("to_tsvector is missing its argument"))?;
            where_column(arg)?
        }
        _ => where_column(lexpr)?,
    };

    let NodeEnum::FuncCall(fc) = rexpr else {
        return Err(Error::unsupported(
            "right-hand side of @@ must call to_tsquery/plainto_tsquery/phraseto_tsquery/websearch_to_tsquery",
        ));
    };
    let fn_name = func_call_name(&fc.funcname)
        .ok_or_else(|| Error::unsupported("full-text search call is missing a function name"))?;
    let operator = match fn_name {
        "to_tsquery" => ColumnFilterOperator::Fts,
        "plainto_tsquery" => ColumnFilterOperator::Plfts,
        "phraseto_tsquery" => ColumnFilterOperator::Phfts,
        "websearch_to_tsquery" => ColumnFilterOperator::Wfts,
        other => {
            return Err(Error::unsupported(format!(
                "`{other}` is not a supported full-text search function"
            )))
        }
    };

    let (config, query) = match fc.args.len() {
        1 => {
            let arg = fc.args[0]
                .node
                .as_ref()
                .ok_or_else(|| Error::unsupported("malformed full-text search argument"))?;
            (None, fts_string_arg(arg)?)
        }
        2 => {
            let cfg = fc.args[0]
                .node
                .as_ref()
                .ok_or_else(|| Error::unsupported("malformed full-text search argument"))?;
            let query = fc.args[1]
                .node
                .as_ref()
                .ok_or_else(|| Error::unsupported("malformed full-text search argument"))?;
            (Some(fts_string_arg(cfg)?), fts_string_arg(query)?)
        }
        _ => {
            return Err(Error::unsupported(format!(
                "`{fn_name}` takes 1 or 2 arguments"
            )))
        }
    };

    Ok(Filter::Column(ColumnFilter {
        column,
        operator,
        negate: false,
        value: FilterValue::Fts { query, config },
    }))
}

fn fts_string_arg(node: &NodeEnum) -> Result<String> {
    match extract_const(node) {
        Ok(Some(Scalar::String(s))) => Ok(s),
        _ => Err(Error::unsupported(
            "full-text search arguments must be string constants",
        )),
    }
}

// ============================================================================
// BETWEEN
// ============================================================================

fn lower_between(a: &AExpr, symmetric: bool, negate: bool) -> Result<Filter> {
    let (lexpr, rexpr) = operands(a)?;
    let column = where_column(lexpr)?;

    let NodeEnum::List(list) = rexpr else {
        return Err(Error::unsupported(
            "BETWEEN right-hand side must be two bounds",
        ));
    };
    if list.items.len() != 2 {
        return Err(Error::unsupported("BETWEEN requires exactly two bounds"));
    }
    let lower_bound = extract_bound(&list.items[0])?;
    let upper_bound = extract_bound(&list.items[1])?;

    let (lower_bound, upper_bound) = if symmetric {
        match (lower_bound.as_number(), upper_bound.as_number()) {
            (Some(l), Some(u)) if l > u => (upper_bound, lower_bound),
            (Some(_), Some(_)) => (lower_bound, upper_bound),
            _ => {
                return Err(Error::unsupported(
                    "BETWEEN SYMMETRIC requires numeric bounds",
                ))
            }
        }
    } else {
        (lower_bound, upper_bound)
    };

    let children = vec![
        Filter::Column(ColumnFilter {
            column: column.clone(),
            operator: ColumnFilterOperator::Gte,
            negate: false,
            value: FilterValue::Scalar(lower_bound),
        }),
        Filter::Column(ColumnFilter {
            column,
            operator: ColumnFilterOperator::Lte,
            negate: false,
            value: FilterValue::Scalar(upper_bound),
        }),
    ];

    Ok(Filter::Logical(LogicalFilter {
        operator: LogicalOperator::And,
        negate,
        children,
    }))
}

fn extract_bound(node: &pg_query::protobuf::Node) -> Result<Scalar> {
    let ne = node_enum_ref(node)
        .ok_or_else(|| Error::unsupported("malformed BETWEEN bound"))?;
    match extract_const(ne) {
        Ok(Some(value)) => Ok(value),
        _ => Err(Error::unsupported("BETWEEN bounds must be constants")),
    }
}
