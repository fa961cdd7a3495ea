//! `Value` and `ValueType`: the tagged scalar value union (spec §3, §4.1).

use std::cmp::Ordering;
use std::fmt;

use crate::error::{ErrorKey, QueryError, QueryResult};

/// Closed set of cell types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueType {
    Text,
    Number,
    Boolean,
    Date,
    DateTime,
    TimeOfDay,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValueType::Text => "text",
            ValueType::Number => "number",
            ValueType::Boolean => "boolean",
            ValueType::Date => "date",
            ValueType::DateTime => "datetime",
            ValueType::TimeOfDay => "timeofday",
        };
        f.write_str(s)
    }
}

/// A calendar date. Month is 0-based (0 = January) per spec §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DateValue {
    pub year: i32,
    pub month: u8,
    pub day: u8,
}

/// A GMT date + time-of-day with millisecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DateTimeValue {
    pub date: DateValue,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub millisecond: u16,
}

/// A time of day with millisecond precision, no calendar date attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeOfDayValue {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub millisecond: u16,
}

fn check_gmt_date(year: i32, month: u8, day: u8) -> QueryResult<()> {
    if month > 11 {
        return Err(QueryError::invalid(
            ErrorKey::TypeMismatch,
            format!("month {month} out of range 0..11"),
        ));
    }
    if day == 0 || day > 31 {
        return Err(QueryError::invalid(
            ErrorKey::TypeMismatch,
            format!("day {day} out of range 1..31"),
        ));
    }
    let _ = year;
    Ok(())
}

fn check_time(hour: u8, minute: u8, second: u8, millisecond: u16) -> QueryResult<()> {
    if hour > 23 || minute > 59 || second > 59 || millisecond > 999 {
        return Err(QueryError::invalid(
            ErrorKey::TypeMismatch,
            "time component out of range",
        ));
    }
    Ok(())
}

impl DateValue {
    /// Construct a GMT calendar date. Rejects out-of-range fields rather
    /// than normalizing them (spec §9 open question).
    pub fn new(year: i32, month: u8, day: u8) -> QueryResult<Self> {
        check_gmt_date(year, month, day)?;
        Ok(DateValue { year, month, day })
    }
}

impl DateTimeValue {
    pub fn new(
        year: i32,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
        millisecond: u16,
    ) -> QueryResult<Self> {
        check_gmt_date(year, month, day)?;
        check_time(hour, minute, second, millisecond)?;
        Ok(DateTimeValue {
            date: DateValue { year, month, day },
            hour,
            minute,
            second,
            millisecond,
        })
    }
}

impl TimeOfDayValue {
    pub fn new(hour: u8, minute: u8, second: u8, millisecond: u16) -> QueryResult<Self> {
        check_time(hour, minute, second, millisecond)?;
        Ok(TimeOfDayValue {
            hour,
            minute,
            second,
            millisecond,
        })
    }
}

/// A tagged scalar value. Each type carries exactly one canonical null
/// (spec §3): `Text("")`, `Number(None)`, `Boolean(None)`, and a `None`
/// payload for the calendar types. Equality/compare/hash are defined only
/// within a type; see `Value::compare`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Number(Option<f64>),
    Boolean(Option<bool>),
    Date(Option<DateValue>),
    DateTime(Option<DateTimeValue>),
    TimeOfDay(Option<TimeOfDayValue>),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Text(_) => ValueType::Text,
            Value::Number(_) => ValueType::Number,
            Value::Boolean(_) => ValueType::Boolean,
            Value::Date(_) => ValueType::Date,
            Value::DateTime(_) => ValueType::DateTime,
            Value::TimeOfDay(_) => ValueType::TimeOfDay,
        }
    }

    /// The canonical null for `ty`.
    pub fn null(ty: ValueType) -> Value {
        match ty {
            ValueType::Text => Value::Text(String::new()),
            ValueType::Number => Value::Number(None),
            ValueType::Boolean => Value::Boolean(None),
            ValueType::Date => Value::Date(None),
            ValueType::DateTime => Value::DateTime(None),
            ValueType::TimeOfDay => Value::TimeOfDay(None),
        }
    }

    pub fn is_null(&self) -> bool {
        match self {
            Value::Text(s) => s.is_empty(),
            Value::Number(v) => v.is_none(),
            Value::Boolean(v) => v.is_none(),
            Value::Date(v) => v.is_none(),
            Value::DateTime(v) => v.is_none(),
            Value::TimeOfDay(v) => v.is_none(),
        }
    }

    pub fn text(s: impl Into<String>) -> Value {
        Value::Text(s.into())
    }

    pub fn number(n: f64) -> Value {
        Value::Number(Some(n))
    }

    pub fn boolean(b: bool) -> Value {
        Value::Boolean(Some(b))
    }

    /// Total order within a type; nulls sort strictly below non-nulls
    /// (spec §3, §4.1). Cross-type comparisons are a `TypeMismatch`.
    pub fn compare(&self, other: &Value) -> QueryResult<Ordering> {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => Ok(a.cmp(b)),
            (Value::Number(a), Value::Number(b)) => Ok(compare_option(*a, *b, |x, y| {
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            })),
            (Value::Boolean(a), Value::Boolean(b)) => Ok(compare_option(*a, *b, Ord::cmp)),
            (Value::Date(a), Value::Date(b)) => Ok(compare_option(*a, *b, Ord::cmp)),
            (Value::DateTime(a), Value::DateTime(b)) => Ok(compare_option(*a, *b, Ord::cmp)),
            (Value::TimeOfDay(a), Value::TimeOfDay(b)) => Ok(compare_option(*a, *b, Ord::cmp)),
            _ => Err(QueryError::TypeMismatch {
                detail: format!(
                    "cannot compare {} with {}",
                    self.value_type(),
                    other.value_type()
                ),
            }),
        }
    }

    pub fn equals(&self, other: &Value) -> bool {
        matches!(self.compare(other), Ok(Ordering::Equal))
    }

    /// Hash consistent with `equals`: null always hashes to 0, and a
    /// numerically-equal float/integer pair hash equal (spec §4.1).
    pub fn hash_value(&self) -> u64 {
        use std::hash::{Hash, Hasher};
        if self.is_null() {
            return 0;
        }
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        match self {
            Value::Text(s) => s.hash(&mut hasher),
            Value::Number(Some(n)) => {
                // Canonicalize -0.0 and integral floats so 1.0 and 1 hash equal.
                let bits = if *n == 0.0 { 0.0_f64 } else { *n };
                bits.to_bits().hash(&mut hasher)
            }
            Value::Boolean(Some(b)) => b.hash(&mut hasher),
            Value::Date(Some(d)) => d.hash(&mut hasher),
            Value::DateTime(Some(d)) => d.hash(&mut hasher),
            Value::TimeOfDay(Some(t)) => t.hash(&mut hasher),
            _ => unreachable!("is_null() already handled the null payloads"),
        }
        hasher.finish()
    }

    /// A string the grammar would parse back into an equal value. Fails
    /// on null (spec §4.1).
    pub fn to_query_literal(&self) -> QueryResult<String> {
        if self.is_null() {
            return Err(QueryError::invalid(
                ErrorKey::ParseError,
                "null has no query literal",
            ));
        }
        Ok(match self {
            Value::Text(s) => format!("'{}'", s.replace('\'', "\\'")),
            Value::Number(Some(n)) => format_number_literal(*n),
            Value::Boolean(Some(b)) => b.to_string(),
            Value::Date(Some(d)) => format!("date '{:04}-{:02}-{:02}'", d.year, d.month + 1, d.day),
            Value::DateTime(Some(dt)) => format!(
                "datetime '{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:03}'",
                dt.date.year,
                dt.date.month + 1,
                dt.date.day,
                dt.hour,
                dt.minute,
                dt.second,
                dt.millisecond
            ),
            Value::TimeOfDay(Some(t)) => format!(
                "timeofday '{:02}:{:02}:{:02}.{:03}'",
                t.hour, t.minute, t.second, t.millisecond
            ),
            _ => unreachable!(),
        })
    }
}

fn format_number_literal(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

fn compare_option<T, F>(a: Option<T>, b: Option<T>, cmp: F) -> Ordering
where
    F: FnOnce(T, T) -> Ordering,
{
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => cmp(x, y),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_sorts_below_non_null() {
        let null = Value::null(ValueType::Number);
        let five = Value::number(5.0);
        assert_eq!(null.compare(&five).unwrap(), Ordering::Less);
        assert_eq!(five.compare(&null).unwrap(), Ordering::Greater);
    }

    #[test]
    fn cross_type_compare_errors() {
        let t = Value::text("a");
        let n = Value::number(1.0);
        assert!(t.compare(&n).is_err());
    }

    #[test]
    fn hash_matches_equality() {
        let a = Value::number(1.0);
        let b = Value::Number(Some(1.0));
        assert!(a.equals(&b));
        assert_eq!(a.hash_value(), b.hash_value());
    }

    #[test]
    fn null_hashes_to_zero() {
        assert_eq!(Value::null(ValueType::Text).hash_value(), 0);
        assert_eq!(Value::null(ValueType::Boolean).hash_value(), 0);
    }

    #[test]
    fn query_literal_roundtrips_numbers_and_text() {
        let n = Value::number(42.0);
        assert_eq!(n.to_query_literal().unwrap(), "42");
        let t = Value::text("hi");
        assert_eq!(t.to_query_literal().unwrap(), "'hi'");
    }

    #[test]
    fn null_has_no_query_literal() {
        assert!(Value::null(ValueType::Date).to_query_literal().is_err());
    }

    #[test]
    fn rejects_out_of_range_calendar_fields() {
        assert!(DateValue::new(2024, 12, 1).is_err());
        assert!(DateValue::new(2024, 0, 32).is_err());
    }
}
