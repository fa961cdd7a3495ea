//! Evaluation of the fixed scalar-function catalog (spec §3). Unless
//! documented otherwise a function returns null when any argument is
//! null; `quotient` is the one documented deviation (division by zero
//! yields null rather than erroring).

use chrono::{Datelike, NaiveDate, TimeZone, Timelike, Utc, Weekday};

use crate::ast::ScalarFunction;
use crate::error::{ErrorKey, QueryError, QueryResult};
use crate::value::{DateTimeValue, DateValue, Value, ValueType};

fn to_naive_date(d: &DateValue) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(d.year, d.month as u32 + 1, d.day as u32)
}

fn number_of(v: &Value) -> QueryResult<f64> {
    match v {
        Value::Number(Some(n)) => Ok(*n),
        _ => Err(QueryError::RuntimeEvaluation {
            function: "scalar".into(),
            detail: "expected a non-null NUMBER".into(),
        }),
    }
}

fn text_of(v: &Value) -> QueryResult<&str> {
    match v {
        Value::Text(s) if !s.is_empty() => Ok(s.as_str()),
        Value::Text(_) => Ok(""),
        _ => Err(QueryError::RuntimeEvaluation {
            function: "scalar".into(),
            detail: "expected a TEXT value".into(),
        }),
    }
}

fn date_of(v: &Value) -> Option<DateValue> {
    match v {
        Value::Date(Some(d)) => Some(*d),
        Value::DateTime(Some(dt)) => Some(dt.date),
        _ => None,
    }
}

fn time_of(v: &Value) -> Option<(u8, u8, u8, u16)> {
    match v {
        Value::DateTime(Some(dt)) => Some((dt.hour, dt.minute, dt.second, dt.millisecond)),
        Value::TimeOfDay(Some(t)) => Some((t.hour, t.minute, t.second, t.millisecond)),
        _ => None,
    }
}

pub(crate) fn return_type(function: ScalarFunction) -> ValueType {
    use ScalarFunction::*;
    match function {
        Now => ValueType::DateTime,
        ToDate => ValueType::Date,
        Year | Month | Day | Quarter | DayOfWeek | Hour | Minute | Second | Millisecond => {
            ValueType::Number
        }
        Lower | Upper | Concat => ValueType::Text,
        Difference | Quotient | Sum | Product | DateDiff => ValueType::Number,
    }
}

pub fn apply_scalar_function(function: ScalarFunction, args: &[Value]) -> QueryResult<Value> {
    if function != ScalarFunction::Now && args.iter().any(Value::is_null) {
        return Ok(Value::null(return_type(function)));
    }

    let err = |detail: String| {
        Err(QueryError::RuntimeEvaluation {
            function: function.name().to_string(),
            detail,
        })
    };

    match function {
        ScalarFunction::Now => {
            let now = Utc::now();
            Ok(Value::DateTime(Some(DateTimeValue {
                date: DateValue {
                    year: now.year(),
                    month: now.month0() as u8,
                    day: now.day() as u8,
                },
                hour: now.hour() as u8,
                minute: now.minute() as u8,
                second: now.second() as u8,
                millisecond: (now.timestamp_subsec_millis()) as u16,
            })))
        }
        ScalarFunction::ToDate => match date_of(&args[0]) {
            Some(d) => Ok(Value::Date(Some(d))),
            None => match &args[0] {
                Value::Number(Some(millis)) => {
                    let dt = Utc.timestamp_millis_opt(*millis as i64).single();
                    match dt {
                        Some(dt) => Ok(Value::Date(Some(DateValue {
                            year: dt.year(),
                            month: dt.month0() as u8,
                            day: dt.day() as u8,
                        }))),
                        None => err("millisecond value out of range".into()),
                    }
                }
                _ => err("toDate expects a NUMBER or DATE/DATETIME".into()),
            },
        },
        ScalarFunction::Year => date_of(&args[0])
            .map(|d| Value::number(d.year as f64))
            .ok_or_else(|| QueryError::RuntimeEvaluation {
                function: function.name().into(),
                detail: "expected a DATE/DATETIME".into(),
            }),
        ScalarFunction::Month => date_of(&args[0])
            .map(|d| Value::number(d.month as f64))
            .ok_or_else(|| QueryError::RuntimeEvaluation {
                function: function.name().into(),
                detail: "expected a DATE/DATETIME".into(),
            }),
        ScalarFunction::Day => date_of(&args[0])
            .map(|d| Value::number(d.day as f64))
            .ok_or_else(|| QueryError::RuntimeEvaluation {
                function: function.name().into(),
                detail: "expected a DATE/DATETIME".into(),
            }),
        ScalarFunction::Quarter => date_of(&args[0])
            .map(|d| Value::number((d.month as f64 / 3.0).floor() + 1.0))
            .ok_or_else(|| QueryError::RuntimeEvaluation {
                function: function.name().into(),
                detail: "expected a DATE/DATETIME".into(),
            }),
        ScalarFunction::DayOfWeek => {
            let d = date_of(&args[0]).ok_or_else(|| QueryError::RuntimeEvaluation {
                function: function.name().into(),
                detail: "expected a DATE/DATETIME".into(),
            })?;
            let nd = to_naive_date(&d).ok_or_else(|| QueryError::RuntimeEvaluation {
                function: function.name().into(),
                detail: "invalid calendar date".into(),
            })?;
            let n = match nd.weekday() {
                Weekday::Sun => 1,
                Weekday::Mon => 2,
                Weekday::Tue => 3,
                Weekday::Wed => 4,
                Weekday::Thu => 5,
                Weekday::Fri => 6,
                Weekday::Sat => 7,
            };
            Ok(Value::number(n as f64))
        }
        ScalarFunction::Hour => time_of(&args[0])
            .map(|(h, _, _, _)| Value::number(h as f64))
            .ok_or_else(|| QueryError::RuntimeEvaluation {
                function: function.name().into(),
                detail: "expected a DATETIME/TIMEOFDAY".into(),
            }),
        ScalarFunction::Minute => time_of(&args[0])
            .map(|(_, m, _, _)| Value::number(m as f64))
            .ok_or_else(|| QueryError::RuntimeEvaluation {
                function: function.name().into(),
                detail: "expected a DATETIME/TIMEOFDAY".into(),
            }),
        ScalarFunction::Second => time_of(&args[0])
            .map(|(_, _, s, _)| Value::number(s as f64))
            .ok_or_else(|| QueryError::RuntimeEvaluation {
                function: function.name().into(),
                detail: "expected a DATETIME/TIMEOFDAY".into(),
            }),
        ScalarFunction::Millisecond => time_of(&args[0])
            .map(|(_, _, _, ms)| Value::number(ms as f64))
            .ok_or_else(|| QueryError::RuntimeEvaluation {
                function: function.name().into(),
                detail: "expected a DATETIME/TIMEOFDAY".into(),
            }),
        ScalarFunction::Lower => Ok(Value::text(text_of(&args[0])?.to_lowercase())),
        ScalarFunction::Upper => Ok(Value::text(text_of(&args[0])?.to_uppercase())),
        ScalarFunction::Difference => Ok(Value::number(number_of(&args[0])? - number_of(&args[1])?)),
        ScalarFunction::Sum => Ok(Value::number(number_of(&args[0])? + number_of(&args[1])?)),
        ScalarFunction::Product => Ok(Value::number(number_of(&args[0])? * number_of(&args[1])?)),
        ScalarFunction::Quotient => {
            let denom = number_of(&args[1])?;
            if denom == 0.0 {
                return Ok(Value::Number(None));
            }
            Ok(Value::number(number_of(&args[0])? / denom))
        }
        ScalarFunction::Concat => {
            let mut out = String::new();
            for a in args {
                out.push_str(text_of(a)?);
            }
            Ok(Value::text(out))
        }
        ScalarFunction::DateDiff => {
            let a = date_of(&args[0]).and_then(|d| to_naive_date(&d));
            let b = date_of(&args[1]).and_then(|d| to_naive_date(&d));
            match (a, b) {
                (Some(a), Some(b)) => Ok(Value::number((a - b).num_days() as f64)),
                _ => err("datediff expects two DATE arguments".into()),
            }
        }
    }
}
