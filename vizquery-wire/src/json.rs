//! JSON/JSONP rendering of a `Response` (spec §6).

use serde::Serialize;
use serde_json::{json, Value as Json};

use vizquery_core::{Cell, ColumnDescription, Table, Value};

use crate::envelope::TqxParams;
use crate::response::{Response, Status};

const VERSION: &str = "0.6";

fn status_str(status: &Status) -> &'static str {
    match status {
        Status::Ok => "ok",
        Status::Warning => "warning",
        Status::Error => "error",
    }
}

fn value_to_json(value: &Value) -> Json {
    if value.is_null() {
        return Json::Null;
    }
    match value {
        Value::Text(s) => json!(s),
        Value::Number(Some(n)) => serde_json::Number::from_f64(*n)
            .map(Json::Number)
            .unwrap_or(Json::Null),
        Value::Boolean(Some(b)) => json!(b),
        Value::Date(Some(d)) => json!(format!("Date({},{},{})", d.year, d.month, d.day)),
        Value::DateTime(Some(dt)) => json!(format!(
            "Date({},{},{},{},{},{},{})",
            dt.date.year, dt.date.month, dt.date.day, dt.hour, dt.minute, dt.second, dt.millisecond
        )),
        Value::TimeOfDay(Some(t)) => {
            json!(format!("Date(0,0,0,{},{},{},{})", t.hour, t.minute, t.second, t.millisecond))
        }
        _ => unreachable!("is_null() already handled every null payload"),
    }
}

fn cell_to_json(cell: &Cell) -> Json {
    let mut obj = serde_json::Map::new();
    obj.insert("v".to_string(), value_to_json(&cell.value));
    if let Some(formatted) = &cell.formatted_value {
        obj.insert("f".to_string(), json!(formatted));
    }
    if !cell.custom_properties.is_empty() {
        obj.insert("p".to_string(), json!(cell.custom_properties));
    }
    Json::Object(obj)
}

fn column_to_json(col: &ColumnDescription) -> Json {
    json!({
        "id": col.id,
        "label": col.label,
        "type": col.value_type.to_string(),
        "pattern": col.pattern,
    })
}

fn table_to_json(table: &Table) -> Json {
    let cols: Vec<Json> = table.columns().iter().map(column_to_json).collect();
    let rows: Vec<Json> = table
        .rows()
        .iter()
        .map(|row| json!({ "c": row.iter().map(cell_to_json).collect::<Vec<_>>() }))
        .collect();
    let mut obj = serde_json::Map::new();
    obj.insert("cols".to_string(), json!(cols));
    obj.insert("rows".to_string(), json!(rows));
    if !table.properties().is_empty() {
        obj.insert("p".to_string(), json!(table.properties()));
    }
    Json::Object(obj)
}

#[derive(Serialize)]
struct WireErrorJson<'a> {
    reason: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detailed_message: Option<&'a str>,
}

/// Builds the envelope as a `serde_json::Value` so both the bare-JSON
/// and JSONP renderers can reuse the same construction.
pub fn to_envelope(response: &Response) -> Json {
    let mut obj = serde_json::Map::new();
    obj.insert("version".to_string(), json!(VERSION));
    if let Some(req_id) = &response.req_id {
        obj.insert("reqId".to_string(), json!(req_id));
    }
    obj.insert("status".to_string(), json!(status_str(&response.status)));
    if let Some(sig) = &response.sig {
        obj.insert("sig".to_string(), json!(sig));
    }
    if !response.errors.is_empty() {
        let errors: Vec<WireErrorJson> = response
            .errors
            .iter()
            .map(|e| WireErrorJson {
                reason: e.reason.as_str(),
                message: &e.message,
                detailed_message: e.detailed_message.as_deref(),
            })
            .collect();
        obj.insert("errors".to_string(), json!(errors));
    }
    if !response.warnings.is_empty() {
        let warnings: Vec<WireErrorJson> = response
            .warnings
            .iter()
            .map(|w| WireErrorJson {
                reason: w.reason.as_str(),
                message: &w.message,
                detailed_message: w.detailed_message.as_deref(),
            })
            .collect();
        obj.insert("warnings".to_string(), json!(warnings));
    }
    if let Some(table) = &response.table {
        obj.insert("table".to_string(), table_to_json(table));
    }
    Json::Object(obj)
}

/// Renders the bare JSON body (used when `out:json` and the request is
/// same-origin, per spec §6).
pub fn render_json(response: &Response) -> String {
    serde_json::to_string(&to_envelope(response)).expect("envelope serializes to valid JSON")
}

/// Renders `<handler>(<envelope>);` (used for `out:jsonp`, and
/// transparently for `out:json` without `X-DataSource-Auth`).
pub fn render_jsonp(response: &Response, tqx: &TqxParams) -> String {
    format!("{}({});", tqx.response_handler(), render_json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use vizquery_core::ValueType;

    fn ok_response() -> Response {
        let mut t = Table::new();
        t.add_column(ColumnDescription::new("name", ValueType::Text));
        t.add_row(vec![Cell::new(Value::text("Sloth"))]).unwrap();
        crate::response::from_table(t, Some("7".to_string()), None)
    }

    #[test]
    fn json_envelope_has_version_status_and_table() {
        let json = to_envelope(&ok_response());
        assert_eq!(json["version"], "0.6");
        assert_eq!(json["status"], "ok");
        assert_eq!(json["reqId"], "7");
        assert_eq!(json["table"]["rows"][0]["c"][0]["v"], "Sloth");
    }

    #[test]
    fn null_number_cell_emits_null_value() {
        let mut t = Table::new();
        t.add_column(ColumnDescription::new("n", ValueType::Number));
        t.add_row(vec![Cell::new(Value::null(ValueType::Number))]).unwrap();
        let resp = crate::response::from_table(t, None, None);
        let json = to_envelope(&resp);
        assert!(json["table"]["rows"][0]["c"][0]["v"].is_null());
    }

    #[test]
    fn date_value_serializes_with_zero_based_month() {
        let mut t = Table::new();
        t.add_column(ColumnDescription::new("d", ValueType::Date));
        let date = vizquery_core::DateValue::new(2024, 0, 1).unwrap();
        t.add_row(vec![Cell::new(Value::Date(Some(date)))]).unwrap();
        let resp = crate::response::from_table(t, None, None);
        let json = to_envelope(&resp);
        assert_eq!(json["table"]["rows"][0]["c"][0]["v"], "Date(2024,0,1)");
    }

    #[test]
    fn jsonp_wraps_with_response_handler() {
        let tqx = crate::envelope::parse_tqx("");
        let body = render_jsonp(&ok_response(), &tqx);
        assert!(body.starts_with("google.visualization.Query.setResponse("));
        assert!(body.ends_with(");"));
    }
}
