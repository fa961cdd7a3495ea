//! Row-level evaluation of an `AbstractColumn` against a table's current
//! schema. `Aggregation` columns are looked up by their structural id,
//! since by the time they're evaluated here the group/pivot stage has
//! already materialized them as ordinary columns (spec §4.5 stage 2→3).

use crate::ast::AbstractColumn;
use crate::error::{ErrorKey, QueryError, QueryResult};
use crate::table::{ColumnDescription, Row};
use crate::value::Value;

use super::scalarfn::apply_scalar_function;

fn lookup<'a>(id: &str, row: &'a Row, columns: &[ColumnDescription]) -> QueryResult<&'a Value> {
    let idx = columns
        .iter()
        .position(|c| c.id == id)
        .or_else(|| columns.iter().position(|c| c.id.eq_ignore_ascii_case(id)))
        .ok_or_else(|| QueryError::invalid(ErrorKey::NoColumn, format!("no column {id}")))?;
    Ok(&row[idx].value)
}

pub fn eval_column(
    column: &AbstractColumn,
    row: &Row,
    columns: &[ColumnDescription],
) -> QueryResult<Value> {
    match column {
        AbstractColumn::Simple(id) => lookup(id, row, columns).cloned(),
        AbstractColumn::Constant(v) => Ok(v.clone()),
        AbstractColumn::Aggregation { .. } => lookup(&column.id(), row, columns).cloned(),
        AbstractColumn::ScalarFunctionCall { function, args } => {
            let mut values = Vec::with_capacity(args.len());
            for a in args {
                values.push(eval_column(a, row, columns)?);
            }
            apply_scalar_function(*function, &values)
        }
    }
}
