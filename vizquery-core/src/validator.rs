//! Two-pass query validation (spec §4.2): structural rules that depend
//! only on the AST's shape, then schema rules checked against a table.

use std::collections::HashSet;

use crate::ast::{AbstractColumn, AggregationOp, Filter, Query, ScalarFunction};
use crate::error::{ErrorKey, QueryError, QueryResult};
use crate::table::Table;
use crate::value::ValueType;

fn filter_columns<'a>(filter: &'a Filter, out: &mut Vec<&'a AbstractColumn>) {
    match filter {
        Filter::ColumnValue { column, .. } => out.push(column),
        Filter::ColumnColumn { lhs, rhs, .. } => {
            out.push(lhs);
            out.push(rhs);
        }
        Filter::ColumnIsNull(column) => out.push(column),
        Filter::Compound { children, .. } => {
            for c in children {
                filter_columns(c, out);
            }
        }
        Filter::Negation(inner) => filter_columns(inner, out),
    }
}

fn assert_no_duplicates(cols: &[AbstractColumn]) -> QueryResult<()> {
    let mut seen = HashSet::new();
    for col in cols {
        let id = col.id();
        if !seen.insert(id.clone()) {
            return Err(QueryError::invalid(
                ErrorKey::ColumnOnlyOnce,
                format!("column {id} appears more than once"),
            ));
        }
    }
    Ok(())
}

/// Structural validation: table-independent shape rules (spec §4.2a).
pub fn validate_structural(query: &Query) -> QueryResult<()> {
    if let Some(selection) = &query.selection {
        assert_no_duplicates(selection)?;

        // R1: a (simple-column) id may not appear both aggregated and
        // non-aggregated in SELECT.
        let mut aggregated_ids = HashSet::new();
        let mut plain_ids = HashSet::new();
        for col in selection {
            match col {
                AbstractColumn::Aggregation { inner, .. } => {
                    aggregated_ids.insert(inner.id());
                }
                AbstractColumn::Simple(id) => {
                    plain_ids.insert(id.clone());
                }
                _ => {}
            }
        }
        for id in &plain_ids {
            if aggregated_ids.contains(id) {
                return Err(QueryError::invalid(
                    ErrorKey::SelectWithAndWithoutAgg,
                    format!("column {id} is both aggregated and plain in SELECT"),
                ));
            }
        }

        let has_agg = selection.iter().any(AbstractColumn::contains_aggregation);

        if has_agg {
            // R2: every non-aggregated selected column must appear in GROUP BY.
            let group_ids: HashSet<String> = query.group.iter().map(AbstractColumn::id).collect();
            for col in selection {
                if !col.contains_aggregation() && !group_ids.contains(&col.id()) {
                    return Err(QueryError::invalid(
                        ErrorKey::AddColToGroupByOrAgg,
                        format!("column {} must be in GROUP BY or aggregated", col.id()),
                    ));
                }
            }

            // R8: ORDER BY columns must appear in SELECT when SELECT aggregates.
            let select_ids: HashSet<String> = selection.iter().map(AbstractColumn::id).collect();
            for spec in &query.sort {
                if !select_ids.contains(&spec.column.id()) {
                    return Err(QueryError::invalid(
                        ErrorKey::ColInOrderMustBeInSelect,
                        format!("ORDER BY column {} must appear in SELECT", spec.column.id()),
                    ));
                }
            }

            // R7: pivot forbids aggregations in ORDER BY; no pivot allows
            // only aggregations that are also selected (already implied by
            // R8 but kept distinct for a precise error key).
            if !query.pivot.is_empty() {
                for spec in &query.sort {
                    if spec.column.contains_aggregation() {
                        return Err(QueryError::invalid(
                            ErrorKey::NoAggInOrderWhenPivot,
                            format!("ORDER BY may not aggregate when PIVOT is set: {}", spec.column.id()),
                        ));
                    }
                }
            } else {
                for spec in &query.sort {
                    if spec.column.contains_aggregation() && !select_ids.contains(&spec.column.id()) {
                        return Err(QueryError::invalid(
                            ErrorKey::AggInOrderNotInSelect,
                            format!("ORDER BY aggregation {} not in SELECT", spec.column.id()),
                        ));
                    }
                }
            }
        }
    }

    // R3/R5: GROUP BY, PIVOT, WHERE may not contain aggregated columns.
    for col in &query.group {
        if col.contains_aggregation() {
            return Err(QueryError::invalid(
                ErrorKey::CannotBeInGroupBy,
                format!("aggregation {} cannot appear in GROUP BY", col.id()),
            ));
        }
    }
    for col in &query.pivot {
        if col.contains_aggregation() {
            return Err(QueryError::invalid(
                ErrorKey::CannotBeInPivot,
                format!("aggregation {} cannot appear in PIVOT", col.id()),
            ));
        }
    }
    if let Some(filter) = &query.filter {
        let mut cols = Vec::new();
        filter_columns(filter, &mut cols);
        for col in cols {
            if col.contains_aggregation() {
                return Err(QueryError::invalid(
                    ErrorKey::CannotBeInWhere,
                    format!("aggregation {} cannot appear in WHERE", col.id()),
                ));
            }
        }
    }

    // R4: GROUP BY and PIVOT column sets must be disjoint.
    let group_ids: HashSet<String> = query.group.iter().map(AbstractColumn::id).collect();
    for col in &query.pivot {
        if group_ids.contains(&col.id()) {
            return Err(QueryError::invalid(
                ErrorKey::NoColInGroupAndPivot,
                format!("column {} in both GROUP BY and PIVOT", col.id()),
            ));
        }
    }

    assert_no_duplicates(&query.group)?;
    assert_no_duplicates(&query.pivot)?;

    // R6: LABEL / FORMAT may only reference selected columns (when a
    // selection is present at all; an absent SELECT means "all columns").
    if let Some(selection) = &query.selection {
        let select_ids: HashSet<String> = selection.iter().map(AbstractColumn::id).collect();
        for id in query.labels.keys() {
            if !select_ids.contains(id) {
                return Err(QueryError::invalid(
                    ErrorKey::LabelColNotInSelect,
                    format!("LABEL column {id} not in SELECT"),
                ));
            }
        }
        for id in query.user_format_options.keys() {
            if !select_ids.contains(id) {
                return Err(QueryError::invalid(
                    ErrorKey::FormatColNotInSelect,
                    format!("FORMAT column {id} not in SELECT"),
                ));
            }
        }
    }

    // R: GROUP BY / PIVOT without any aggregation in SELECT is meaningless.
    if !query.group.is_empty() && !query.has_aggregation_in_select() {
        return Err(QueryError::invalid(
            ErrorKey::CannotGroupWithoutAgg,
            "GROUP BY requires an aggregation in SELECT",
        ));
    }
    if !query.pivot.is_empty() && !query.has_aggregation_in_select() {
        return Err(QueryError::invalid(
            ErrorKey::CannotPivotWithoutAgg,
            "PIVOT requires an aggregation in SELECT",
        ));
    }

    // R10: paging bounds.
    if let Some(skipping) = query.row_skipping {
        if skipping == 0 {
            return Err(QueryError::invalid(ErrorKey::InvalidSkipping, "row skipping must be >= 1"));
        }
    }

    Ok(())
}

fn aggregation_type_ok(op: AggregationOp, ty: ValueType) -> QueryResult<()> {
    match op {
        AggregationOp::Sum | AggregationOp::Avg => {
            if ty != ValueType::Number {
                return Err(QueryError::invalid(
                    ErrorKey::AvgSumOnlyNumeric,
                    format!("{} requires NUMBER, got {ty}", op.name()),
                ));
            }
        }
        AggregationOp::Min | AggregationOp::Max => {
            if ty == ValueType::Boolean {
                return Err(QueryError::invalid(
                    ErrorKey::InvalidAggType,
                    format!("{} requires an ordered, non-boolean type", op.name()),
                ));
            }
        }
        AggregationOp::Count => {}
    }
    Ok(())
}

fn scalar_function_return_type(function: ScalarFunction, arg_types: &[ValueType]) -> QueryResult<ValueType> {
    use ScalarFunction::*;
    let err = |msg: String| {
        Err(QueryError::invalid(ErrorKey::InvalidAggType, msg))
    };
    match function {
        Now => Ok(ValueType::DateTime),
        ToDate => match arg_types {
            [ValueType::Number] | [ValueType::DateTime] => Ok(ValueType::Date),
            _ => err(format!("toDate expects a NUMBER or DATETIME, got {arg_types:?}")),
        },
        Year | Month | Day | Quarter | DayOfWeek => match arg_types {
            [ValueType::Date] | [ValueType::DateTime] => Ok(ValueType::Number),
            _ => err(format!("{} expects a DATE/DATETIME argument", function.name())),
        },
        Hour | Minute | Second | Millisecond => match arg_types {
            [ValueType::DateTime] | [ValueType::TimeOfDay] => Ok(ValueType::Number),
            _ => err(format!("{} expects a DATETIME/TIMEOFDAY argument", function.name())),
        },
        Lower | Upper => match arg_types {
            [ValueType::Text] => Ok(ValueType::Text),
            _ => err(format!("{} expects a TEXT argument", function.name())),
        },
        Difference | Quotient | Sum | Product => match arg_types {
            [ValueType::Number, ValueType::Number] => Ok(ValueType::Number),
            _ => err(format!("{} expects two NUMBER arguments", function.name())),
        },
        Concat => {
            if arg_types.iter().all(|t| *t == ValueType::Text) {
                Ok(ValueType::Text)
            } else {
                err("concat expects TEXT arguments".to_string())
            }
        }
        DateDiff => match arg_types {
            [ValueType::Date, ValueType::Date] => Ok(ValueType::Number),
            _ => err("datediff expects two DATE arguments".to_string()),
        },
    }
}

/// Resolves a column's value type against `table`, recursing through
/// aggregations and scalar functions (spec §4.2b).
pub fn resolve_column_type(column: &AbstractColumn, table: &Table) -> QueryResult<ValueType> {
    match column {
        AbstractColumn::Simple(id) => {
            let idx = table.get_column_index_ci(id).ok_or_else(|| {
                QueryError::invalid(ErrorKey::NoColumn, format!("no column {id}"))
            })?;
            Ok(table.columns()[idx].value_type)
        }
        AbstractColumn::Aggregation { inner, op } => {
            let ty = resolve_column_type(inner, table)?;
            aggregation_type_ok(*op, ty)?;
            Ok(match op {
                AggregationOp::Count => ValueType::Number,
                _ => ty,
            })
        }
        AbstractColumn::ScalarFunctionCall { function, args } => {
            let mut arg_types = Vec::with_capacity(args.len());
            for a in args {
                arg_types.push(resolve_column_type(a, table)?);
            }
            if let Some(arity) = function.arity() {
                if arity != arg_types.len() {
                    return Err(QueryError::invalid(
                        ErrorKey::InvalidAggType,
                        format!("{} expects {arity} arguments, got {}", function.name(), arg_types.len()),
                    ));
                }
            }
            scalar_function_return_type(*function, &arg_types)
        }
        AbstractColumn::Constant(v) => Ok(v.value_type()),
    }
}

/// Schema validation against a concrete table (spec §4.2b).
pub fn validate_schema(query: &Query, table: &Table) -> QueryResult<()> {
    if let Some(selection) = &query.selection {
        for col in selection {
            resolve_column_type(col, table)?;
        }
    }
    for col in &query.group {
        resolve_column_type(col, table)?;
    }
    for col in &query.pivot {
        resolve_column_type(col, table)?;
    }
    for spec in &query.sort {
        resolve_column_type(&spec.column, table)?;
    }
    if let Some(filter) = &query.filter {
        validate_filter_schema(filter, table)?;
    }
    Ok(())
}

fn validate_filter_schema(filter: &Filter, table: &Table) -> QueryResult<()> {
    match filter {
        Filter::ColumnValue { column, value, .. } => {
            let ty = resolve_column_type(column, table)?;
            if ty != value.value_type() {
                return Err(QueryError::invalid(
                    ErrorKey::TypeMismatch,
                    format!("filter on {} expects {ty}, got {}", column.id(), value.value_type()),
                ));
            }
            Ok(())
        }
        Filter::ColumnColumn { lhs, rhs, .. } => {
            let lt = resolve_column_type(lhs, table)?;
            let rt = resolve_column_type(rhs, table)?;
            if lt != rt {
                return Err(QueryError::invalid(
                    ErrorKey::TypeMismatch,
                    format!("cannot compare {} ({lt}) with {} ({rt})", lhs.id(), rhs.id()),
                ));
            }
            Ok(())
        }
        Filter::ColumnIsNull(column) => resolve_column_type(column, table).map(|_| ()),
        Filter::Compound { children, .. } => {
            for c in children {
                validate_filter_schema(c, table)?;
            }
            Ok(())
        }
        Filter::Negation(inner) => validate_filter_schema(inner, table),
    }
}

/// Run both validation passes.
pub fn validate(query: &Query, table: &Table) -> QueryResult<()> {
    validate_structural(query)?;
    validate_schema(query, table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::ColumnDescription;

    fn table() -> Table {
        let mut t = Table::new();
        t.add_column(ColumnDescription::new("name", ValueType::Text));
        t.add_column(ColumnDescription::new("population", ValueType::Number));
        t.add_column(ColumnDescription::new("vegetarian", ValueType::Boolean));
        t
    }

    #[test]
    fn agg_requires_non_agg_cols_in_group_by() {
        let q = Query {
            selection: Some(vec![
                AbstractColumn::simple("name"),
                AbstractColumn::aggregation(AbstractColumn::simple("population"), AggregationOp::Sum),
            ]),
            ..Query::empty()
        };
        let err = validate_structural(&q).unwrap_err();
        assert_eq!(err.key(), ErrorKey::AddColToGroupByOrAgg);
    }

    #[test]
    fn min_max_rejects_boolean() {
        let q = Query {
            selection: Some(vec![AbstractColumn::aggregation(
                AbstractColumn::simple("vegetarian"),
                AggregationOp::Max,
            )]),
            ..Query::empty()
        };
        let err = validate_schema(&q, &table()).unwrap_err();
        assert_eq!(err.key(), ErrorKey::InvalidAggType);
    }

    #[test]
    fn sum_requires_numeric() {
        let q = Query {
            selection: Some(vec![AbstractColumn::aggregation(
                AbstractColumn::simple("name"),
                AggregationOp::Sum,
            )]),
            ..Query::empty()
        };
        let err = validate_schema(&q, &table()).unwrap_err();
        assert_eq!(err.key(), ErrorKey::AvgSumOnlyNumeric);
    }

    #[test]
    fn group_and_pivot_must_be_disjoint() {
        let q = Query {
            selection: Some(vec![AbstractColumn::aggregation(
                AbstractColumn::simple("population"),
                AggregationOp::Sum,
            )]),
            group: vec![AbstractColumn::simple("name")],
            pivot: vec![AbstractColumn::simple("name")],
            ..Query::empty()
        };
        let err = validate_structural(&q).unwrap_err();
        assert_eq!(err.key(), ErrorKey::NoColInGroupAndPivot);
    }

    #[test]
    fn unknown_column_is_rejected() {
        let q = Query {
            selection: Some(vec![AbstractColumn::simple("nope")]),
            ..Query::empty()
        };
        let err = validate_schema(&q, &table()).unwrap_err();
        assert_eq!(err.key(), ErrorKey::NoColumn);
    }
}
