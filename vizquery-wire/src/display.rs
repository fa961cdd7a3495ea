//! Plain-text cell rendering shared by the CSV and HTML renderers: the
//! formatted value when present, else a raw unquoted rendering of the
//! underlying value (distinct from `Value::to_query_literal`, which
//! quotes text and is meant to be re-parsed, not displayed).

use vizquery_core::{Cell, Value};

fn raw_value_display(value: &Value) -> String {
    match value {
        Value::Text(s) => s.clone(),
        Value::Number(Some(n)) => {
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                format!("{n}")
            }
        }
        Value::Number(None) => String::new(),
        Value::Boolean(Some(b)) => b.to_string(),
        Value::Boolean(None) => String::new(),
        Value::Date(Some(d)) => format!("{:04}-{:02}-{:02}", d.year, d.month + 1, d.day),
        Value::DateTime(Some(dt)) => format!(
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:03}",
            dt.date.year, dt.date.month + 1, dt.date.day, dt.hour, dt.minute, dt.second, dt.millisecond
        ),
        Value::TimeOfDay(Some(t)) => format!("{:02}:{:02}:{:02}.{:03}", t.hour, t.minute, t.second, t.millisecond),
        Value::Date(None) | Value::DateTime(None) | Value::TimeOfDay(None) => String::new(),
    }
}

pub fn cell_display(cell: &Cell) -> String {
    cell.formatted_value
        .clone()
        .unwrap_or_else(|| raw_value_display(&cell.value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use vizquery_core::ValueType;

    #[test]
    fn text_value_is_unquoted() {
        let cell = Cell::new(Value::text("Sloth"));
        assert_eq!(cell_display(&cell), "Sloth");
    }

    #[test]
    fn integral_number_has_no_trailing_zero() {
        let cell = Cell::new(Value::number(300.0));
        assert_eq!(cell_display(&cell), "300");
    }

    #[test]
    fn null_value_displays_as_empty_string() {
        let cell = Cell::new(Value::null(ValueType::Number));
        assert_eq!(cell_display(&cell), "");
    }

    #[test]
    fn formatted_value_wins_over_raw_value() {
        let cell = Cell::new(Value::number(100.0)).with_formatted("$100k");
        assert_eq!(cell_display(&cell), "$100k");
    }
}
