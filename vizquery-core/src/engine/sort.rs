//! The sort stage (spec §4.5 stage 4): stable sort over a compound
//! `ORDER BY` key, nulls first in ASC and last in DESC.

use std::cmp::Ordering;

use crate::ast::{SortDirection, SortSpec};
use crate::collator::Collator;
use crate::error::QueryResult;
use crate::table::{ColumnDescription, Row};
use crate::value::Value;

use super::eval::eval_column;

/// Nulls-first-ASC comparison that routes TEXT through `collator` and
/// every other type through `Value::compare`'s natural order (spec §4.1).
fn compare_for_sort(a: &Value, b: &Value, collator: &dyn Collator) -> QueryResult<Ordering> {
    match (a, b) {
        (Value::Text(x), Value::Text(y)) => Ok(match (x.is_empty(), y.is_empty()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => collator.compare(x, y),
        }),
        _ => a.compare(b),
    }
}

pub fn run_sort(
    specs: &[SortSpec],
    rows: &[Row],
    columns: &[ColumnDescription],
    collator: &dyn Collator,
) -> QueryResult<Vec<Row>> {
    if specs.is_empty() {
        return Ok(rows.to_vec());
    }

    let mut keyed = Vec::with_capacity(rows.len());
    for row in rows {
        let mut key = Vec::with_capacity(specs.len());
        for spec in specs {
            key.push(eval_column(&spec.column, row, columns)?);
        }
        keyed.push((key, row.clone()));
    }

    // `sort_by` is stable, so rows comparing equal on every key keep their
    // original relative order.
    let mut err = None;
    keyed.sort_by(|(a, _), (b, _)| {
        for (i, spec) in specs.iter().enumerate() {
            let ord = match compare_for_sort(&a[i], &b[i], collator) {
                Ok(ord) => ord,
                Err(e) => {
                    err.get_or_insert(e);
                    Ordering::Equal
                }
            };
            let ord = if spec.direction == SortDirection::Desc {
                ord.reverse()
            } else {
                ord
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });

    if let Some(e) = err {
        return Err(e);
    }
    Ok(keyed.into_iter().map(|(_, row)| row).collect())
}
