//! The format stage (spec §4.5 stage 9): attach a pattern to referenced
//! columns and recompute `formattedValue` per cell. A pattern that fails
//! to parse or apply degrades to a warning rather than failing the query
//! (spec §4.7).

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::table::{Cell, ColumnDescription, Row, Table, WarningKind};
use crate::value::{DateValue, Value};

fn format_number(n: f64, pattern: &str) -> Result<String, String> {
    let decimals = match pattern.split_once('.') {
        Some((_, frac)) => frac.chars().filter(|c| *c == '0' || *c == '#').count(),
        None => 0,
    };
    let grouped = pattern.contains(',');
    let body = format!("{:.*}", decimals, n.abs());
    let body = if grouped { group_thousands(&body) } else { body };
    Ok(if n.is_sign_negative() && n != 0.0 {
        format!("-{body}")
    } else {
        body
    })
}

/// Splits a pattern into `'literal'`/format-spec runs; `''` inside a
/// quoted run is a literal single quote, matching the quoting convention
/// of DecimalFormat-style patterns (spec §4.5's `format` clause).
fn quoted_segments(pattern: &str) -> Vec<(bool, String)> {
    let mut out = Vec::new();
    let mut in_quote = false;
    let mut buf = String::new();
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\'' {
            if chars.peek() == Some(&'\'') {
                buf.push('\'');
                chars.next();
                continue;
            }
            out.push((in_quote, std::mem::take(&mut buf)));
            in_quote = !in_quote;
            continue;
        }
        buf.push(c);
    }
    out.push((in_quote, buf));
    out
}

/// Applies a number pattern that may carry quoted literal text around
/// the digit spec (e.g. `'$'#'k'` on `100` yields `$100k`).
fn apply_number_pattern(n: f64, pattern: &str) -> Result<String, String> {
    let segments = quoted_segments(pattern);
    let format_spec: String = segments.iter().filter(|(literal, _)| !literal).map(|(_, s)| s.as_str()).collect();
    let body = format_number(n, &format_spec)?;

    let mut out = String::new();
    let mut inserted = false;
    for (literal, text) in &segments {
        if *literal {
            out.push_str(text);
        } else if !inserted {
            out.push_str(&body);
            inserted = true;
        }
    }
    if !inserted {
        out.push_str(&body);
    }
    Ok(out)
}

fn group_thousands(s: &str) -> String {
    let (int_part, rest) = s.split_once('.').map(|(a, b)| (a, Some(b))).unwrap_or((s, None));
    let bytes = int_part.as_bytes();
    let mut out = String::new();
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 && (bytes.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(*b as char);
    }
    if let Some(rest) = rest {
        out.push('.');
        out.push_str(rest);
    }
    out
}

fn to_naive_date(d: &DateValue) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(d.year, d.month as u32 + 1, d.day as u32)
}

/// Applies a `chrono`-style strftime pattern to a date/datetime/time value.
fn format_temporal(value: &Value, pattern: &str) -> Result<String, String> {
    match value {
        Value::Date(Some(d)) => {
            let nd = to_naive_date(d).ok_or("invalid calendar date")?;
            Ok(nd.format(pattern).to_string())
        }
        Value::DateTime(Some(dt)) => {
            let nd = to_naive_date(&dt.date).ok_or("invalid calendar date")?;
            let ndt = nd
                .and_hms_milli_opt(dt.hour as u32, dt.minute as u32, dt.second as u32, dt.millisecond as u32)
                .ok_or("invalid time of day")?;
            Ok(ndt.format(pattern).to_string())
        }
        Value::TimeOfDay(Some(t)) => {
            let nd = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
            let ndt = nd
                .and_hms_milli_opt(t.hour as u32, t.minute as u32, t.second as u32, t.millisecond as u32)
                .ok_or("invalid time of day")?;
            Ok(ndt.format(pattern).to_string())
        }
        _ => Err("not a temporal value".to_string()),
    }
}

fn format_one(value: &Value, pattern: &str) -> Result<String, String> {
    if value.is_null() {
        return Err("cannot format a null value".to_string());
    }
    match value {
        Value::Number(Some(n)) => apply_number_pattern(*n, pattern),
        Value::Date(_) | Value::DateTime(_) | Value::TimeOfDay(_) => format_temporal(value, pattern),
        Value::Text(s) => Ok(s.clone()),
        Value::Boolean(Some(b)) => Ok(b.to_string()),
        _ => unreachable!("is_null already handled the null payloads"),
    }
}

/// Runs the format stage in place, recording a warning the first time any
/// pattern fails to apply (spec §4.5 stage 9, §4.7).
pub fn run_format(table: &mut Table, patterns: &BTreeMap<String, String>) {
    if patterns.is_empty() {
        return;
    }

    let targets: Vec<(usize, String)> = patterns
        .iter()
        .filter_map(|(id, pattern)| {
            table
                .get_column_index(id)
                .or_else(|| table.columns().iter().position(|c| c.id.eq_ignore_ascii_case(id)))
                .map(|idx| (idx, pattern.clone()))
        })
        .collect();

    let mut any_failure = false;
    let mut new_rows: Vec<Row> = Vec::with_capacity(table.rows().len());
    for row in table.rows() {
        let mut row = row.clone();
        for (idx, pattern) in &targets {
            let cell: &mut Cell = &mut row[*idx];
            match format_one(&cell.value, pattern) {
                Ok(formatted) => cell.formatted_value = Some(formatted),
                Err(detail) => {
                    log::warn!("format pattern {pattern:?} failed: {detail}");
                    any_failure = true;
                }
            }
        }
        new_rows.push(row);
    }

    let mut out_columns: Vec<ColumnDescription> = table.columns().to_vec();
    for (idx, pattern) in &targets {
        out_columns[*idx].pattern = pattern.clone();
    }

    *table = rebuild(table, out_columns, new_rows);

    if any_failure {
        table.push_warning(
            WarningKind::IllegalFormattingPatterns,
            "one or more cells could not be formatted with the requested pattern",
        );
    }
}

fn rebuild(table: &Table, columns: Vec<ColumnDescription>, rows: Vec<Row>) -> Table {
    let mut out = Table::with_locale(table.locale().clone());
    for c in columns {
        out.add_column(c);
    }
    for r in rows {
        out.add_row(r).expect("row shape unchanged by formatting");
    }
    for w in table.warnings() {
        out.push_warning(w.kind, w.message.clone());
    }
    *out.properties_mut() = table.properties().clone();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueType;

    fn table_with_number(n: f64) -> Table {
        let mut t = Table::new();
        t.add_column(ColumnDescription::new("population", ValueType::Number));
        t.add_row(vec![Cell::new(Value::number(n))]).unwrap();
        t
    }

    #[test]
    fn quoted_literals_wrap_the_digit_spec() {
        let mut t = table_with_number(100.0);
        let mut patterns = BTreeMap::new();
        patterns.insert("population".to_string(), "'$'#'k'".to_string());
        run_format(&mut t, &patterns);
        assert_eq!(t.rows()[0][0].formatted_value.as_deref(), Some("$100k"));
    }

    #[test]
    fn decimal_pattern_controls_fraction_digits() {
        let mut t = table_with_number(1234.5);
        let mut patterns = BTreeMap::new();
        patterns.insert("population".to_string(), "#,##0.00".to_string());
        run_format(&mut t, &patterns);
        assert_eq!(t.rows()[0][0].formatted_value.as_deref(), Some("1,234.50"));
    }

    #[test]
    fn null_cell_fails_format_and_warns() {
        let mut t = Table::new();
        t.add_column(ColumnDescription::new("population", ValueType::Number));
        t.add_row(vec![Cell::new(Value::null(ValueType::Number))]).unwrap();
        let mut patterns = BTreeMap::new();
        patterns.insert("population".to_string(), "0.00".to_string());
        run_format(&mut t, &patterns);
        assert!(t.rows()[0][0].formatted_value.is_none());
        assert_eq!(t.warnings().len(), 1);
        assert_eq!(t.warnings()[0].kind, WarningKind::IllegalFormattingPatterns);
    }

    #[test]
    fn date_pattern_uses_strftime_tokens() {
        let mut t = Table::new();
        t.add_column(ColumnDescription::new("d", ValueType::Date));
        t.add_row(vec![Cell::new(Value::Date(Some(DateValue::new(2024, 0, 1).unwrap())))])
            .unwrap();
        let mut patterns = BTreeMap::new();
        patterns.insert("d".to_string(), "%Y-%m-%d".to_string());
        run_format(&mut t, &patterns);
        assert_eq!(t.rows()[0][0].formatted_value.as_deref(), Some("2024-01-01"));
    }
}
