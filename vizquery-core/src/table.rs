//! The table model: `ColumnDescription`, `Cell`, `Row` and `Table`
//! (spec §3, §4.1).

use std::collections::{BTreeMap, HashMap};

use crate::collator::Locale;
use crate::error::{ErrorKey, QueryError, QueryResult};
use crate::value::{Value, ValueType};

pub type CustomProperties = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescription {
    pub id: String,
    pub value_type: ValueType,
    pub label: String,
    pub pattern: String,
    pub custom_properties: CustomProperties,
}

impl ColumnDescription {
    pub fn new(id: impl Into<String>, value_type: ValueType) -> Self {
        let id = id.into();
        ColumnDescription {
            label: id.clone(),
            id,
            value_type,
            pattern: String::new(),
            custom_properties: BTreeMap::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub value: Value,
    pub formatted_value: Option<String>,
    pub custom_properties: CustomProperties,
}

impl Cell {
    pub fn new(value: Value) -> Self {
        Cell {
            value,
            formatted_value: None,
            custom_properties: BTreeMap::new(),
        }
    }

    pub fn with_formatted(mut self, formatted: impl Into<String>) -> Self {
        self.formatted_value = Some(formatted.into());
        self
    }

    /// The value used for display ordering: the formatted string when
    /// present, else the cell's underlying value literal (spec §4.1
    /// `distinct_values`).
    pub fn display_key(&self) -> String {
        self.formatted_value.clone().unwrap_or_else(|| {
            self.value
                .to_query_literal()
                .unwrap_or_default()
        })
    }
}

pub type Row = Vec<Cell>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    IllegalFormattingPatterns,
    DataTruncated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

/// An ordered column schema plus ordered rows. Mutable during
/// construction (`add_column`/`add_row`); the engine treats it as
/// immutable and always produces a new `Table` (spec §4.1, §5).
#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: Vec<ColumnDescription>,
    rows: Vec<Row>,
    index: HashMap<String, usize>,
    warnings: Vec<Warning>,
    properties: CustomProperties,
    locale: Locale,
}

impl Table {
    pub fn new() -> Self {
        Table::default()
    }

    pub fn with_locale(locale: Locale) -> Self {
        Table {
            locale,
            ..Table::default()
        }
    }

    pub fn columns(&self) -> &[ColumnDescription] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn properties(&self) -> &CustomProperties {
        &self.properties
    }

    pub fn properties_mut(&mut self) -> &mut CustomProperties {
        &mut self.properties
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    pub fn push_warning(&mut self, kind: WarningKind, message: impl Into<String>) {
        self.warnings.push(Warning {
            kind,
            message: message.into(),
        });
    }

    pub fn add_column(&mut self, desc: ColumnDescription) -> usize {
        let idx = self.columns.len();
        self.index.insert(desc.id.clone(), idx);
        self.columns.push(desc);
        idx
    }

    /// O(1) lookup against the id-to-index map maintained by `add_column`.
    /// Case-sensitive: the spec fixes internal storage lookup to be
    /// case-sensitive (§9 open question), distinct from the
    /// case-insensitive match the validator performs on user input.
    pub fn get_column_index(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Case-insensitive variant used when resolving user-supplied column
    /// references (spec §9: `isColumnRequested`-style matching).
    pub fn get_column_index_ci(&self, id: &str) -> Option<usize> {
        if let Some(&idx) = self.index.get(id) {
            return Some(idx);
        }
        self.columns
            .iter()
            .position(|c| c.id.eq_ignore_ascii_case(id))
    }

    pub fn add_row(&mut self, row: Row) -> QueryResult<()> {
        if row.len() != self.columns.len() {
            return Err(QueryError::invalid(
                ErrorKey::TypeMismatch,
                format!(
                    "row has {} cells but table has {} columns",
                    row.len(),
                    self.columns.len()
                ),
            ));
        }
        for (cell, col) in row.iter().zip(self.columns.iter()) {
            if cell.value.value_type() != col.value_type {
                return Err(QueryError::invalid(
                    ErrorKey::TypeMismatch,
                    format!(
                        "column {} expects {} but got {}",
                        col.id,
                        col.value_type,
                        cell.value.value_type()
                    ),
                ));
            }
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Deduplicated, sorted distinct values of a column, ordered by the
    /// cell's display key (formatted value if present, else the value
    /// itself) per spec §4.1.
    pub fn distinct_values(&self, col_id: &str) -> QueryResult<Vec<Value>> {
        let idx = self.get_column_index(col_id).ok_or_else(|| {
            QueryError::invalid(ErrorKey::NoColumn, format!("no column {col_id}"))
        })?;
        let mut seen: Vec<(String, Value)> = Vec::new();
        for row in &self.rows {
            let cell = &row[idx];
            let key = cell.display_key();
            if !seen.iter().any(|(k, _)| k == &key) {
                seen.push((key, cell.value.clone()));
            }
        }
        seen.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(seen.into_iter().map(|(_, v)| v).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> Table {
        let mut t = Table::new();
        t.add_column(ColumnDescription::new("name", ValueType::Text));
        t.add_column(ColumnDescription::new("population", ValueType::Number));
        t.add_row(vec![Cell::new(Value::text("Sloth")), Cell::new(Value::number(300.0))])
            .unwrap();
        t.add_row(vec![Cell::new(Value::text("Tiger")), Cell::new(Value::number(80.0))])
            .unwrap();
        t
    }

    #[test]
    fn column_index_is_case_sensitive_by_default() {
        let t = sample_table();
        assert_eq!(t.get_column_index("name"), Some(0));
        assert_eq!(t.get_column_index("Name"), None);
        assert_eq!(t.get_column_index_ci("Name"), Some(0));
    }

    #[test]
    fn add_row_rejects_type_mismatch() {
        let mut t = sample_table();
        let err = t.add_row(vec![Cell::new(Value::number(1.0)), Cell::new(Value::number(1.0))]);
        assert!(err.is_err());
    }

    #[test]
    fn distinct_values_dedupes_and_sorts() {
        let mut t = Table::new();
        t.add_column(ColumnDescription::new("v", ValueType::Number));
        for n in [3.0, 1.0, 3.0, 2.0] {
            t.add_row(vec![Cell::new(Value::number(n))]).unwrap();
        }
        let values = t.distinct_values("v").unwrap();
        assert_eq!(values.len(), 3);
    }
}
