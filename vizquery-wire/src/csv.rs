//! CSV and TSV-Excel rendering of a `Table` (spec §6). Both only render
//! a successful table; callers route error `Response`s to `json` (or a
//! plain-text body) before reaching here.

use vizquery_core::Table;

use crate::display::cell_display;

fn write_rows(table: &Table, delimiter: u8) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());
    let labels: Vec<&str> = table.columns().iter().map(|c| c.label.as_str()).collect();
    writer.write_record(&labels)?;
    for row in table.rows() {
        let cells: Vec<String> = row.iter().map(cell_display).collect();
        writer.write_record(&cells)?;
    }
    writer.into_inner().map_err(|e| e.into_error())
}

/// Comma-delimited, RFC-4180-ish quoting, CRLF line endings, UTF-8,
/// first row is labels.
pub fn render_csv(table: &Table) -> Result<Vec<u8>, csv::Error> {
    write_rows(table, b',')
}

/// Tab-delimited, UTF-16LE with BOM (what Excel expects for a
/// double-clickable TSV download).
///
/// `encoding_rs`'s `UTF_16LE` encoding is decode-only per the WHATWG
/// Encoding Standard — its `Encoder` targets UTF-8 regardless of label,
/// so the code units are written out by hand instead.
pub fn render_tsv_excel(table: &Table) -> Result<Vec<u8>, csv::Error> {
    let utf8 = write_rows(table, b'\t')?;
    let text = String::from_utf8(utf8).expect("csv writer only emits valid UTF-8");
    let mut out = Vec::with_capacity(2 + text.len() * 2);
    out.extend_from_slice(&[0xFF, 0xFE]); // UTF-16LE BOM
    for unit in text.encode_utf16() {
        out.extend_from_slice(&unit.to_le_bytes());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vizquery_core::{Cell, ColumnDescription, Value, ValueType};

    fn sample_table() -> Table {
        let mut t = Table::new();
        t.add_column(ColumnDescription::new("name", ValueType::Text).with_label("Name"));
        t.add_column(ColumnDescription::new("population", ValueType::Number));
        t.add_row(vec![Cell::new(Value::text("Sloth")), Cell::new(Value::number(300.0))])
            .unwrap();
        t
    }

    #[test]
    fn csv_first_row_is_labels_and_uses_crlf() {
        let bytes = render_csv(&sample_table()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("Name,population\r\n"));
        assert!(text.contains("Sloth,300\r\n"));
    }

    #[test]
    fn tsv_excel_starts_with_utf16le_bom() {
        let bytes = render_tsv_excel(&sample_table()).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xFE]);
    }

    #[test]
    fn tsv_excel_uses_tab_delimiter() {
        let bytes = render_tsv_excel(&sample_table()).unwrap();
        let (decoded, _, _) = encoding_rs::UTF_16LE.decode(&bytes[2..]);
        assert!(decoded.contains("Name\tpopulation"));
    }
}
