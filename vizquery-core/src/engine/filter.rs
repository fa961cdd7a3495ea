//! Filter evaluation (spec §4.3). Comparisons are false whenever either
//! operand is null — null propagation never produces "unknown", and
//! `ColumnIsNull` is the only way to match a null cell.

use std::cmp::Ordering;

use regex::Regex;

use crate::ast::{AbstractColumn, BoolOp, CompareOp, Filter};
use crate::error::{ErrorKey, QueryError, QueryResult};
use crate::table::{ColumnDescription, Row};
use crate::value::Value;

use super::eval::eval_column;

fn like_to_regex(pattern: &str) -> QueryResult<Regex> {
    let mut out = String::from("(?s)^");
    for c in pattern.chars() {
        match c {
            '%' => out.push_str(".*"),
            '_' => out.push('.'),
            _ => out.push_str(&regex::escape(&c.to_string())),
        }
    }
    out.push('$');
    Regex::new(&out).map_err(|e| QueryError::invalid(ErrorKey::ParseError, e.to_string()))
}

fn compare_values(a: &Value, b: &Value, op: CompareOp) -> QueryResult<bool> {
    if a.is_null() || b.is_null() {
        return Ok(false);
    }
    match op {
        CompareOp::Eq => Ok(a.equals(b)),
        CompareOp::Ne => Ok(!a.equals(b)),
        CompareOp::Lt => Ok(a.compare(b)? == Ordering::Less),
        CompareOp::Gt => Ok(a.compare(b)? == Ordering::Greater),
        CompareOp::Le => Ok(a.compare(b)? != Ordering::Greater),
        CompareOp::Ge => Ok(a.compare(b)? != Ordering::Less),
        CompareOp::Contains | CompareOp::StartsWith | CompareOp::EndsWith | CompareOp::Like | CompareOp::Matches => {
            let (Value::Text(s), Value::Text(p)) = (a, b) else {
                return Err(QueryError::invalid(
                    ErrorKey::TypeMismatch,
                    "text operator applied to a non-text value",
                ));
            };
            Ok(match op {
                CompareOp::Contains => s.contains(p.as_str()),
                CompareOp::StartsWith => s.starts_with(p.as_str()),
                CompareOp::EndsWith => s.ends_with(p.as_str()),
                CompareOp::Like => like_to_regex(p)?.is_match(s),
                CompareOp::Matches => Regex::new(p)
                    .map_err(|e| QueryError::invalid(ErrorKey::ParseError, e.to_string()))?
                    .is_match(s),
                _ => unreachable!(),
            })
        }
    }
}

pub fn eval_filter(
    filter: &Filter,
    row: &Row,
    columns: &[ColumnDescription],
) -> QueryResult<bool> {
    match filter {
        Filter::ColumnValue { column, value, op } => {
            let actual = eval_column(column, row, columns)?;
            compare_values(&actual, value, *op)
        }
        Filter::ColumnColumn { lhs, rhs, op } => {
            let l = eval_column(lhs, row, columns)?;
            let r = eval_column(rhs, row, columns)?;
            compare_values(&l, &r, *op)
        }
        Filter::ColumnIsNull(column) => Ok(eval_column(column, row, columns)?.is_null()),
        Filter::Compound { op, children } => match op {
            BoolOp::And => {
                for c in children {
                    if !eval_filter(c, row, columns)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            BoolOp::Or => {
                for c in children {
                    if eval_filter(c, row, columns)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        },
        Filter::Negation(inner) => Ok(!eval_filter(inner, row, columns)?),
    }
}

/// Filters the table's rows, preserving relative order (spec §4.5 stage 1).
pub fn run_filter(
    filter: Option<&Filter>,
    rows: &[Row],
    columns: &[ColumnDescription],
) -> QueryResult<Vec<Row>> {
    let Some(filter) = filter else {
        return Ok(rows.to_vec());
    };
    let mut out = Vec::new();
    for row in rows {
        if eval_filter(filter, row, columns)? {
            out.push(row.clone());
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Cell, ColumnDescription};
    use crate::value::ValueType;

    fn columns() -> Vec<ColumnDescription> {
        vec![ColumnDescription::new("population", ValueType::Number)]
    }

    #[test]
    fn null_operands_never_match() {
        let row = vec![Cell::new(Value::null(ValueType::Number))];
        let f = Filter::ColumnValue {
            column: AbstractColumn::simple("population"),
            value: Value::number(1.0),
            op: CompareOp::Eq,
        };
        assert!(!eval_filter(&f, &row, &columns()).unwrap());
    }

    #[test]
    fn empty_and_is_true_empty_or_is_false() {
        let row = vec![Cell::new(Value::number(1.0))];
        let and = Filter::Compound { op: BoolOp::And, children: vec![] };
        let or = Filter::Compound { op: BoolOp::Or, children: vec![] };
        assert!(eval_filter(&and, &row, &columns()).unwrap());
        assert!(!eval_filter(&or, &row, &columns()).unwrap());
    }

    #[test]
    fn like_wildcard_matches() {
        let row = vec![Cell::new(Value::text("hello world"))];
        let cols = vec![ColumnDescription::new("population", ValueType::Text)];
        let f = Filter::ColumnValue {
            column: AbstractColumn::simple("population"),
            value: Value::text("hel%rld"),
            op: CompareOp::Like,
        };
        assert!(eval_filter(&f, &row, &cols).unwrap());
    }
}
