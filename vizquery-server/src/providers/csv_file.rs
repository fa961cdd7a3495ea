//! A CSV-file-backed `DataProvider` (spec §6), grounded on the
//! teacher's `--csv table_name:file_path` loading convention in
//! `datafusion-postgres-cli`: the file is read once at construction
//! time and kept as an in-memory `Table`.

use std::path::Path;

use async_trait::async_trait;
use vizquery_core::{Capabilities, Cell, ColumnDescription, ErrorKey, Query, QueryError, QueryResult, Table, Value, ValueType};

use crate::context::RequestContext;
use crate::provider::DataProvider;

fn infer_column_type(values: &[&str]) -> ValueType {
    if values.iter().all(|v| v.is_empty() || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("false")) {
        return ValueType::Boolean;
    }
    if values.iter().all(|v| v.is_empty() || v.parse::<f64>().is_ok()) {
        return ValueType::Number;
    }
    ValueType::Text
}

fn cell_for(raw: &str, ty: ValueType) -> QueryResult<Cell> {
    if raw.is_empty() {
        return Ok(Cell::new(Value::null(ty)));
    }
    let value = match ty {
        ValueType::Text => Value::text(raw),
        ValueType::Number => Value::number(raw.parse::<f64>().map_err(|e| {
            QueryError::invalid(ErrorKey::TypeMismatch, format!("'{raw}' is not a number: {e}"))
        })?),
        ValueType::Boolean => Value::boolean(raw.eq_ignore_ascii_case("true")),
        other => {
            return Err(QueryError::Internal {
                detail: format!("CSV inference never produces {other}"),
            })
        }
    };
    Ok(Cell::new(value))
}

/// Reads `path` into a `Table`, inferring each column's `ValueType`
/// from whether every non-empty cell parses as a boolean or a number,
/// falling back to TEXT.
pub fn load_csv(path: &Path) -> QueryResult<Table> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| QueryError::Internal {
        detail: format!("failed to open {}: {e}", path.display()),
    })?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| QueryError::Internal {
            detail: format!("failed to read header row: {e}"),
        })?
        .iter()
        .map(str::to_string)
        .collect();

    let records: Vec<csv::StringRecord> = reader
        .records()
        .collect::<Result<_, _>>()
        .map_err(|e| QueryError::Internal {
            detail: format!("failed to read row: {e}"),
        })?;

    let mut table = Table::new();
    let types: Vec<ValueType> = (0..headers.len())
        .map(|col| {
            let values: Vec<&str> = records.iter().map(|r| r.get(col).unwrap_or("")).collect();
            infer_column_type(&values)
        })
        .collect();

    for (id, ty) in headers.iter().zip(&types) {
        table.add_column(ColumnDescription::new(id.clone(), *ty));
    }

    for record in &records {
        let row = record
            .iter()
            .zip(&types)
            .map(|(raw, ty)| cell_for(raw, *ty))
            .collect::<QueryResult<Vec<_>>>()?;
        table.add_row(row)?;
    }

    Ok(table)
}

#[derive(Debug, Clone)]
pub struct CsvProvider {
    table: Table,
}

impl CsvProvider {
    pub fn open(path: impl AsRef<Path>) -> QueryResult<Self> {
        Ok(CsvProvider {
            table: load_csv(path.as_ref())?,
        })
    }
}

#[async_trait]
impl DataProvider for CsvProvider {
    fn capabilities(&self) -> Capabilities {
        Capabilities::None
    }

    async fn generate(&self, _provider_query: &Query, _ctx: &RequestContext) -> QueryResult<Table> {
        Ok(self.table.clone())
    }
}
