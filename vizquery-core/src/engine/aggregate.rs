//! The group/pivot/aggregate stage (spec §4.5 stage 2, §4.6): a
//! two-level map `groupKey → (pivotKey → accumulators[])`.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use crate::ast::{AbstractColumn, AggregationOp};
use crate::error::QueryResult;
use crate::table::{Cell, ColumnDescription, Row, Table};
use crate::value::{Value, ValueType};

use super::eval::eval_column;

/// A tuple of values compared/hashed by `Value::equals`/`hash_value`,
/// making it usable as a group or pivot key.
#[derive(Debug, Clone)]
struct Tuple(Vec<Value>);

impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len() && self.0.iter().zip(&other.0).all(|(a, b)| a.equals(b))
    }
}
impl Eq for Tuple {}
impl Hash for Tuple {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for v in &self.0 {
            state.write_u64(v.hash_value());
        }
    }
}

fn compare_tuples(a: &Tuple, b: &Tuple) -> Ordering {
    for (x, y) in a.0.iter().zip(&b.0) {
        // Same-typed by construction (both come from the same columns);
        // nulls-first total order per spec §4.1/§4.5.
        match x.compare(y) {
            Ok(Ordering::Equal) => continue,
            Ok(ord) => return ord,
            Err(_) => return Ordering::Equal,
        }
    }
    Ordering::Equal
}

#[derive(Debug, Clone)]
enum Accumulator {
    Min(Option<Value>),
    Max(Option<Value>),
    Sum(f64, bool),
    Avg(f64, usize),
    Count(usize),
}

impl Accumulator {
    fn new(op: AggregationOp) -> Self {
        match op {
            AggregationOp::Min => Accumulator::Min(None),
            AggregationOp::Max => Accumulator::Max(None),
            AggregationOp::Sum => Accumulator::Sum(0.0, false),
            AggregationOp::Avg => Accumulator::Avg(0.0, 0),
            AggregationOp::Count => Accumulator::Count(0),
        }
    }

    fn accumulate(&mut self, value: &Value) {
        if value.is_null() {
            return;
        }
        match self {
            Accumulator::Min(slot) => {
                if slot.as_ref().is_none_or(|cur| value.compare(cur).unwrap() == Ordering::Less) {
                    *slot = Some(value.clone());
                }
            }
            Accumulator::Max(slot) => {
                if slot.as_ref().is_none_or(|cur| value.compare(cur).unwrap() == Ordering::Greater) {
                    *slot = Some(value.clone());
                }
            }
            Accumulator::Sum(total, seen) => {
                if let Value::Number(Some(n)) = value {
                    *total += n;
                    *seen = true;
                }
            }
            Accumulator::Avg(total, count) => {
                if let Value::Number(Some(n)) = value {
                    *total += n;
                    *count += 1;
                }
            }
            Accumulator::Count(n) => *n += 1,
        }
    }

    fn result(&self, ty: ValueType) -> Value {
        match self {
            Accumulator::Min(slot) | Accumulator::Max(slot) => {
                slot.clone().unwrap_or_else(|| Value::null(ty))
            }
            Accumulator::Sum(total, seen) => {
                if *seen {
                    Value::number(*total)
                } else {
                    Value::Number(None)
                }
            }
            Accumulator::Avg(total, count) => {
                if *count > 0 {
                    Value::number(*total / *count as f64)
                } else {
                    Value::Number(None)
                }
            }
            Accumulator::Count(n) => Value::number(*n as f64),
        }
    }
}

trait OptionIsNoneOr<T> {
    fn is_none_or(&self, f: impl FnOnce(&T) -> bool) -> bool;
}
impl<T> OptionIsNoneOr<T> for Option<T> {
    fn is_none_or(&self, f: impl FnOnce(&T) -> bool) -> bool {
        match self {
            None => true,
            Some(v) => f(v),
        }
    }
}

fn agg_result_type(op: AggregationOp, inner_ty: ValueType) -> ValueType {
    match op {
        AggregationOp::Count => ValueType::Number,
        _ => inner_ty,
    }
}

fn pivot_key_csv(values: &[Value]) -> String {
    values
        .iter()
        .map(|v| v.to_query_literal().map(|s| s.trim_matches('\'').to_string()).unwrap_or_default())
        .collect::<Vec<_>>()
        .join(",")
}

/// Runs the group/pivot/aggregate stage. `agg_items` are the
/// `AggregationColumn` entries drawn from `SELECT`, in declared order.
pub fn run_aggregation(
    group_cols: &[AbstractColumn],
    pivot_cols: &[AbstractColumn],
    agg_items: &[AbstractColumn],
    rows: &[Row],
    columns: &[ColumnDescription],
) -> QueryResult<Table> {
    let agg_ops: Vec<(AggregationOp, ValueType)> = agg_items
        .iter()
        .map(|c| {
            let AbstractColumn::Aggregation { inner, op } = c else {
                unreachable!("agg_items must only contain Aggregation columns")
            };
            let inner_ty = resolve_inner_type(inner, columns);
            (*op, agg_result_type(*op, inner_ty))
        })
        .collect();

    let mut groups: HashMap<Tuple, HashMap<Tuple, Vec<Accumulator>>> = HashMap::new();
    let mut all_pivot_keys: Vec<Tuple> = Vec::new();

    for row in rows {
        let mut group_values = Vec::with_capacity(group_cols.len());
        for c in group_cols {
            group_values.push(eval_column(c, row, columns)?);
        }
        let mut pivot_values = Vec::with_capacity(pivot_cols.len());
        for c in pivot_cols {
            pivot_values.push(eval_column(c, row, columns)?);
        }
        let group_key = Tuple(group_values);
        let pivot_key = Tuple(pivot_values);

        if !all_pivot_keys.contains(&pivot_key) {
            all_pivot_keys.push(pivot_key.clone());
        }

        let inner = groups.entry(group_key).or_default();
        let accs = inner.entry(pivot_key).or_insert_with(|| {
            agg_ops.iter().map(|(op, _)| Accumulator::new(*op)).collect()
        });
        for (acc, item) in accs.iter_mut().zip(agg_items) {
            let AbstractColumn::Aggregation { inner, .. } = item else {
                unreachable!()
            };
            let value = eval_column(inner, row, columns)?;
            acc.accumulate(&value);
        }
    }

    let mut group_keys: Vec<Tuple> = groups.keys().cloned().collect();
    group_keys.sort_by(compare_tuples);
    all_pivot_keys.sort_by(compare_tuples);

    let mut out = Table::new();
    for c in group_cols {
        let ty = resolve_inner_type(c, columns);
        out.add_column(ColumnDescription::new(c.id(), ty));
    }

    if pivot_cols.is_empty() {
        for (item, (_, ty)) in agg_items.iter().zip(&agg_ops) {
            out.add_column(ColumnDescription::new(item.id(), *ty));
        }
    } else {
        for pivot_key in &all_pivot_keys {
            let csv = pivot_key_csv(&pivot_key.0);
            for (item, (_, ty)) in agg_items.iter().zip(&agg_ops) {
                let id = format!("{csv}-{}", item.id());
                let label = if agg_items.len() == 1 {
                    csv.clone()
                } else {
                    format!("{csv}, {}", item.id())
                };
                out.add_column(ColumnDescription::new(id, *ty).with_label(label));
            }
        }
    }

    for group_key in &group_keys {
        let mut cells: Vec<Cell> = group_key.0.iter().cloned().map(Cell::new).collect();
        let inner = &groups[group_key];

        if pivot_cols.is_empty() {
            let empty_key = Tuple(Vec::new());
            match inner.get(&empty_key) {
                Some(accs) => {
                    for (acc, (_, ty)) in accs.iter().zip(&agg_ops) {
                        cells.push(Cell::new(acc.result(*ty)));
                    }
                }
                None => {
                    for (_, ty) in &agg_ops {
                        cells.push(Cell::new(Value::null(*ty)));
                    }
                }
            }
        } else {
            for pivot_key in &all_pivot_keys {
                match inner.get(pivot_key) {
                    Some(accs) => {
                        for (acc, (_, ty)) in accs.iter().zip(&agg_ops) {
                            cells.push(Cell::new(acc.result(*ty)));
                        }
                    }
                    None => {
                        for (op, ty) in &agg_ops {
                            let empty = Accumulator::new(*op);
                            cells.push(Cell::new(empty.result(*ty)));
                        }
                    }
                }
            }
        }

        out.add_row(cells)?;
    }

    Ok(out)
}

fn resolve_inner_type(col: &AbstractColumn, columns: &[ColumnDescription]) -> ValueType {
    match col {
        AbstractColumn::Simple(id) => columns
            .iter()
            .find(|c| &c.id == id)
            .map(|c| c.value_type)
            .unwrap_or(ValueType::Text),
        AbstractColumn::Aggregation { inner, op } => agg_result_type(*op, resolve_inner_type(inner, columns)),
        AbstractColumn::Constant(v) => v.value_type(),
        AbstractColumn::ScalarFunctionCall { function, .. } => super::scalarfn::return_type(*function),
    }
}
