//! The in-process query engine (spec §4.5): orchestrates the ten-stage
//! pipeline over a validated `Query` and an input `Table`.

mod aggregate;
mod eval;
mod filter;
mod format;
mod scalarfn;
mod sort;

use crate::ast::{AbstractColumn, Query};
use crate::collator::{Collator, OrdinalCollator};
use crate::error::{ErrorKey, QueryError, QueryResult};
use crate::table::{Cell, ColumnDescription, Row, Table};
use crate::validator::validate;

use eval::eval_column;
use scalarfn::apply_scalar_function;

/// Collects the distinct `Aggregation` subexpressions reachable from
/// `cols`, in first-seen order, including those nested inside scalar
/// function calls (e.g. `difference(sum(a), sum(b))`).
fn collect_aggregations(cols: &[AbstractColumn]) -> Vec<AbstractColumn> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    fn walk(col: &AbstractColumn, seen: &mut std::collections::HashSet<String>, out: &mut Vec<AbstractColumn>) {
        match col {
            AbstractColumn::Aggregation { .. } => {
                if seen.insert(col.id()) {
                    out.push(col.clone());
                }
            }
            AbstractColumn::ScalarFunctionCall { args, .. } => {
                for a in args {
                    walk(a, seen, out);
                }
            }
            AbstractColumn::Simple(_) | AbstractColumn::Constant(_) => {}
        }
    }
    for c in cols {
        walk(c, &mut seen, &mut out);
    }
    out
}

/// Ensures `col` exists as a materialized column (by id) in `columns`,
/// recursively materializing scalar-function and constant columns that
/// the group/pivot/aggregate stage could not have produced (spec §4.5
/// stage 3). Returns the column's resolved type.
fn ensure_materialized(
    col: &AbstractColumn,
    rows: &mut [Row],
    columns: &mut Vec<ColumnDescription>,
) -> QueryResult<()> {
    let id = col.id();
    if columns.iter().any(|c| c.id == id) {
        return Ok(());
    }
    match col {
        AbstractColumn::Simple(_) => Err(QueryError::invalid(
            ErrorKey::NoColumn,
            format!("no column {id}"),
        )),
        AbstractColumn::Aggregation { .. } => Err(QueryError::Internal {
            detail: format!("aggregation column {id} missing after the group/pivot stage"),
        }),
        AbstractColumn::Constant(v) => {
            columns.push(ColumnDescription::new(id, v.value_type()));
            for row in rows.iter_mut() {
                row.push(Cell::new(v.clone()));
            }
            Ok(())
        }
        AbstractColumn::ScalarFunctionCall { function, args } => {
            for a in args {
                ensure_materialized(a, rows, columns)?;
            }
            let ty = scalarfn::return_type(*function);
            columns.push(ColumnDescription::new(id, ty));
            for row in rows.iter_mut() {
                let mut arg_values = Vec::with_capacity(args.len());
                for a in args {
                    arg_values.push(eval_column(a, row, columns)?);
                }
                let value = apply_scalar_function(*function, &arg_values)?;
                row.push(Cell::new(value));
            }
            Ok(())
        }
    }
}

/// Reorders/drops columns (and their cells) to match `selection`; `None`
/// keeps every current column in its current order (spec §4.5 stage 7).
fn project(
    selection: Option<&[AbstractColumn]>,
    rows: Vec<Row>,
    columns: Vec<ColumnDescription>,
) -> QueryResult<(Vec<Row>, Vec<ColumnDescription>)> {
    let Some(selection) = selection else {
        return Ok((rows, columns));
    };
    let indices: Vec<usize> = selection
        .iter()
        .map(|c| {
            columns
                .iter()
                .position(|col| col.id == c.id())
                .ok_or_else(|| QueryError::invalid(ErrorKey::NoColumn, format!("no column {}", c.id())))
        })
        .collect::<QueryResult<_>>()?;

    let new_columns: Vec<ColumnDescription> = indices.iter().map(|&i| columns[i].clone()).collect();
    let new_rows: Vec<Row> = rows
        .into_iter()
        .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
        .collect();
    Ok((new_rows, new_columns))
}

fn apply_labels(columns: &mut [ColumnDescription], labels: &std::collections::BTreeMap<String, String>) {
    for col in columns.iter_mut() {
        if let Some(label) = labels.get(&col.id) {
            col.label = label.clone();
        }
    }
}

/// `noFormat` strips every `formattedValue`. `noValues` keeps only the
/// formatted value where one exists (the raw value is reset to its
/// type's canonical null so the table's type invariant holds); a cell
/// with no formatted value is left with its raw value, since there is
/// nothing else to emit (spec §4.5 stage 10).
fn apply_options(table: &mut Table, no_format: bool, no_values: bool) {
    if !no_format && !no_values {
        return;
    }
    let columns = table.columns().to_vec();
    let locale = table.locale().clone();
    let mut out = Table::with_locale(locale);
    for c in &columns {
        out.add_column(c.clone());
    }
    for row in table.rows() {
        let new_row: Row = row
            .iter()
            .zip(&columns)
            .map(|(cell, col)| {
                let mut cell = cell.clone();
                if no_values {
                    if cell.formatted_value.is_some() {
                        cell.value = crate::value::Value::null(col.value_type);
                    }
                }
                if no_format {
                    cell.formatted_value = None;
                }
                cell
            })
            .collect();
        out.add_row(new_row).expect("row shape unchanged by options stage");
    }
    for w in table.warnings() {
        out.push_warning(w.kind, w.message.clone());
    }
    *out.properties_mut() = table.properties().clone();
    *table = out;
}

/// Runs the full ten-stage pipeline (spec §4.5) against a validated
/// query and table, using the ordinal collator for TEXT ordering.
pub fn execute(query: &Query, table: &Table) -> QueryResult<Table> {
    execute_with_collator(query, table, &OrdinalCollator)
}

/// As `execute`, with an explicit TEXT collator (spec §4.1).
pub fn execute_with_collator(query: &Query, table: &Table, collator: &dyn Collator) -> QueryResult<Table> {
    execute_with_collator_checked(query, table, collator, &|| false)
}

fn check_cancelled(is_cancelled: &dyn Fn() -> bool) -> QueryResult<()> {
    if is_cancelled() {
        Err(QueryError::Cancelled)
    } else {
        Ok(())
    }
}

/// As `execute_with_collator`, additionally polling `is_cancelled`
/// between the Filter, Aggregation, Sort and Pagination stages (spec
/// §5); a caller with no cancellation source passes `&|| false`.
pub fn execute_with_collator_checked(
    query: &Query,
    table: &Table,
    collator: &dyn Collator,
    is_cancelled: &dyn Fn() -> bool,
) -> QueryResult<Table> {
    validate(query, table)?;
    log::debug!("executing query over {} input rows", table.row_count());

    // Stage 1: filter.
    let filtered = filter::run_filter(query.filter.as_ref(), table.rows(), table.columns())?;
    check_cancelled(is_cancelled)?;

    // Stage 2: group + pivot + aggregate. An aggregation nested inside a
    // scalar function (e.g. `difference(sum(a), sum(b))`) still needs
    // this stage to run even with no GROUP BY/PIVOT and no top-level
    // aggregation column, so the gate checks the whole selection tree
    // rather than `Query::has_aggregation_in_select`'s top-level-only
    // check.
    let needs_aggregation = !query.group.is_empty()
        || !query.pivot.is_empty()
        || query
            .selection
            .as_ref()
            .is_some_and(|cols| cols.iter().any(AbstractColumn::contains_aggregation));

    let (mut rows, mut columns) = if needs_aggregation {
        let agg_items = query
            .selection
            .as_ref()
            .map(|s| collect_aggregations(s))
            .unwrap_or_default();
        let aggregated = aggregate::run_aggregation(
            &query.group,
            &query.pivot,
            &agg_items,
            &filtered,
            table.columns(),
        )?;
        (aggregated.rows().to_vec(), aggregated.columns().to_vec())
    } else {
        (filtered, table.columns().to_vec())
    };
    check_cancelled(is_cancelled)?;

    // Stage 3: calculated columns.
    if let Some(selection) = &query.selection {
        for col in selection {
            ensure_materialized(col, &mut rows, &mut columns)?;
        }
    }

    // Stage 4: sort.
    rows = sort::run_sort(&query.sort, &rows, &columns, collator)?;
    check_cancelled(is_cancelled)?;

    // Stage 5: skipping.
    if let Some(k) = query.row_skipping {
        rows = rows.into_iter().step_by(k).collect();
    }

    // Stage 6: offset / limit.
    if let Some(offset) = query.row_offset {
        rows = rows.into_iter().skip(offset).collect();
    }
    if let Some(limit) = query.row_limit {
        rows.truncate(limit);
    }
    check_cancelled(is_cancelled)?;

    // Stage 7: selection projection.
    let (rows, columns) = project(query.selection.as_deref(), rows, columns)?;

    let mut out = Table::with_locale(table.locale().clone());
    for c in columns {
        out.add_column(c);
    }
    for r in rows {
        out.add_row(r)?;
    }
    *out.properties_mut() = table.properties().clone();

    // Stage 8: labels.
    {
        let mut cols = out.columns().to_vec();
        apply_labels(&mut cols, &query.labels);
        let mut relabeled = Table::with_locale(out.locale().clone());
        for c in cols {
            relabeled.add_column(c);
        }
        for r in out.rows().to_vec() {
            relabeled.add_row(r)?;
        }
        *relabeled.properties_mut() = out.properties().clone();
        out = relabeled;
    }

    // Stage 9: formats.
    format::run_format(&mut out, &query.user_format_options);

    // Stage 10: options.
    apply_options(&mut out, query.options.no_format, query.options.no_values);

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{AggregationOp, CompareOp, Filter, SortDirection, SortSpec};
    use crate::table::Cell;
    use crate::value::{Value, ValueType};

    fn sample_table() -> Table {
        let mut t = Table::new();
        t.add_column(ColumnDescription::new("name", ValueType::Text));
        t.add_column(ColumnDescription::new("population", ValueType::Number));
        t.add_column(ColumnDescription::new("vegetarian", ValueType::Boolean));
        t.add_row(vec![
            Cell::new(Value::text("Sloth")),
            Cell::new(Value::number(300.0)),
            Cell::new(Value::boolean(true)),
        ])
        .unwrap();
        t.add_row(vec![
            Cell::new(Value::text("Tiger")),
            Cell::new(Value::number(80.0)),
            Cell::new(Value::boolean(false)),
        ])
        .unwrap();
        t.add_row(vec![
            Cell::new(Value::text("Panda")),
            Cell::new(Value::number(100.0)),
            Cell::new(Value::boolean(true)),
        ])
        .unwrap();
        t
    }

    #[test]
    fn empty_query_is_identity() {
        let t = sample_table();
        let out = execute(&Query::empty(), &t).unwrap();
        assert_eq!(out.row_count(), t.row_count());
        assert_eq!(out.columns(), t.columns());
    }

    #[test]
    fn filter_group_sum_and_sort_pipeline() {
        let t = sample_table();
        let q = Query {
            selection: Some(vec![
                AbstractColumn::simple("vegetarian"),
                AbstractColumn::aggregation(AbstractColumn::simple("population"), AggregationOp::Sum),
            ]),
            group: vec![AbstractColumn::simple("vegetarian")],
            sort: vec![SortSpec {
                column: AbstractColumn::simple("vegetarian"),
                direction: SortDirection::Desc,
            }],
            ..Query::empty()
        };
        let out = execute(&q, &t).unwrap();
        assert_eq!(out.row_count(), 2);
        assert_eq!(out.rows()[0][0].value, Value::boolean(true));
        assert_eq!(out.rows()[0][1].value, Value::number(400.0));
    }

    #[test]
    fn false_filter_yields_empty_table_same_schema() {
        let t = sample_table();
        let q = Query {
            filter: Some(Filter::ColumnValue {
                column: AbstractColumn::simple("population"),
                value: Value::number(-1.0),
                op: CompareOp::Lt,
            }),
            ..Query::empty()
        };
        let out = execute(&q, &t).unwrap();
        assert_eq!(out.row_count(), 0);
        assert_eq!(out.columns(), t.columns());
    }

    #[test]
    fn limit_and_offset_apply_after_sort() {
        let t = sample_table();
        let q = Query {
            sort: vec![SortSpec {
                column: AbstractColumn::simple("population"),
                direction: SortDirection::Asc,
            }],
            row_offset: Some(1),
            row_limit: Some(1),
            ..Query::empty()
        };
        let out = execute(&q, &t).unwrap();
        assert_eq!(out.row_count(), 1);
        assert_eq!(out.rows()[0][0].value, Value::text("Panda"));
    }

    #[test]
    fn labels_rename_selected_columns() {
        let t = sample_table();
        let mut labels = std::collections::BTreeMap::new();
        labels.insert("population".to_string(), "Population (k)".to_string());
        let q = Query {
            selection: Some(vec![AbstractColumn::simple("population")]),
            labels,
            ..Query::empty()
        };
        let out = execute(&q, &t).unwrap();
        assert_eq!(out.columns()[0].label, "Population (k)");
    }

    #[test]
    fn tripped_cancellation_token_stops_the_pipeline() {
        let t = sample_table();
        let err = execute_with_collator_checked(&Query::empty(), &t, &OrdinalCollator, &|| true)
            .unwrap_err();
        assert!(matches!(err, QueryError::Cancelled));
    }

    #[test]
    fn aggregation_nested_in_scalar_function_triggers_the_aggregate_stage() {
        // `difference(sum(a), sum(b))` with no GROUP BY/PIVOT and no
        // top-level aggregation column: needs_aggregation must still
        // fire, or the inner sums are never materialized and stage 3
        // fails looking them up.
        let t = sample_table();
        let sum_population = AbstractColumn::aggregation(AbstractColumn::simple("population"), AggregationOp::Sum);
        let q = Query {
            selection: Some(vec![AbstractColumn::ScalarFunctionCall {
                function: crate::ast::ScalarFunction::Difference,
                args: vec![sum_population.clone(), sum_population],
            }]),
            ..Query::empty()
        };
        let out = execute(&q, &t).unwrap();
        assert_eq!(out.row_count(), 1);
        assert_eq!(out.rows()[0][0].value, Value::number(0.0));
    }

    #[test]
    fn execute_with_collator_accepts_case_insensitive_collator() {
        let t = sample_table();
        let q = Query {
            sort: vec![SortSpec {
                column: AbstractColumn::simple("name"),
                direction: SortDirection::Asc,
            }],
            ..Query::empty()
        };
        let out = execute_with_collator(&q, &t, &crate::collator::CaseInsensitiveCollator).unwrap();
        assert_eq!(out.rows()[0][0].value, Value::text("Panda"));
    }
}
