//! `LIMIT`/`OFFSET` lowering (spec.md §4.7).

use pg_query::protobuf::Node;

use crate::error::{Error, Result};
use crate::model::{Limit, Scalar};
use crate::pgast::{extract_const, node_enum};

pub fn lower_limit(
    limit_count: &Option<Box<Node>>,
    limit_offset: &Option<Box<Node>>,
) -> Result<Option<Limit>> {
    let count = extract_limit_value(limit_count, "LIMIT")?;
    let offset = extract_limit_value(limit_offset, "OFFSET")?;

    if count.is_none() && offset.is_none() {
        Ok(None)
    } else {
        Ok(Some(Limit { count, offset }))
    }
}

/// `limitCount`/`limitOffset` must be integer constants when present. The
/// parser's convention of representing a literal `0` as "value absent" is
/// normalised back to `0` here, the clause is still present, just with a
/// degenerate constant.
fn extract_limit_value(node: &Option<Box<Node>>, clause: &str) -> Result<Option<i64>> {
    let Some(node_enum) = node_enum(node) else {
        return Ok(None);
    };
    match extract_const(node_enum)? {
        Some(Scalar::Number(n)) => Ok(Some(n as i64)),
        Some(Scalar::String(_)) => Err(Error::unsupported(format!(
            "{clause} must be an integer constant"
        ))),
        None => Ok(Some(0)),
    }
}
