//! The response envelope (spec §6): `status`, `sig`, `errors`/`warnings`,
//! and the `table` payload, independent of which wire format it's
//! ultimately rendered into.

use vizquery_core::{QueryError, Table, WarningKind};

use crate::messages::{rewrite_user_not_authenticated, MessageBundle};
use crate::reason::Reason;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Ok,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireError {
    pub reason: Reason,
    pub message: String,
    pub detailed_message: Option<String>,
}

/// The full response, still wire-format-agnostic; `vizquery-wire`'s
/// `json`/`csv`/`html` modules each render one of these.
#[derive(Debug, Clone)]
pub struct Response {
    pub req_id: Option<String>,
    pub status: Status,
    pub sig: Option<String>,
    pub errors: Vec<WireError>,
    pub warnings: Vec<WireError>,
    pub table: Option<Table>,
}

fn warning_reason(kind: WarningKind) -> Reason {
    match kind {
        WarningKind::IllegalFormattingPatterns => Reason::IllegalFormattingPatterns,
        WarningKind::DataTruncated => Reason::DataTruncated,
    }
}

/// Builds a successful (or `not_modified`) response from a finished
/// `Table`. `client_sig` is the `sig` the client already has, if any
/// (spec §6's `tqx` `sig` key); if it matches the freshly computed
/// signature the response short-circuits to `not_modified`.
pub fn from_table(table: Table, req_id: Option<String>, client_sig: Option<&str>) -> Response {
    let sig = vizquery_core::compute_signature(&table);
    if client_sig == Some(sig.as_str()) {
        return Response {
            req_id,
            status: Status::Error,
            sig: Some(sig),
            errors: vec![WireError {
                reason: Reason::NotModified,
                message: "Data not modified".to_string(),
                detailed_message: None,
            }],
            warnings: Vec::new(),
            table: None,
        };
    }

    let warnings = table
        .warnings()
        .iter()
        .map(|w| WireError {
            reason: warning_reason(w.kind),
            message: w.message.clone(),
            detailed_message: None,
        })
        .collect::<Vec<_>>();
    let status = if warnings.is_empty() { Status::Ok } else { Status::Warning };

    Response {
        req_id,
        status,
        sig: Some(sig),
        errors: Vec::new(),
        warnings,
        table: Some(table),
    }
}

/// Builds an error response from a `vizquery-core` validation/evaluation
/// failure, using `bundle` to render the localized message.
pub fn from_query_error(err: &QueryError, req_id: Option<String>, bundle: &MessageBundle) -> Response {
    let key = err.key();
    let detail = match err {
        QueryError::InvalidQuery { detail, .. } => detail.clone(),
        QueryError::TypeMismatch { detail } => detail.clone(),
        QueryError::RuntimeEvaluation { detail, .. } => detail.clone(),
        QueryError::Internal { detail } => detail.clone(),
        QueryError::Cancelled => "query cancelled".to_string(),
    };
    let message = bundle.message(key, &detail);
    Response {
        req_id,
        status: Status::Error,
        sig: None,
        errors: vec![WireError {
            reason: Reason::from(key),
            message,
            detailed_message: Some(detail),
        }],
        warnings: Vec::new(),
        table: None,
    }
}

/// Builds a server-level error response (access control, transport,
/// timeout) that has no `vizquery_core::ErrorKey` counterpart.
pub fn error(
    reason: Reason,
    message: impl Into<String>,
    detailed_message: Option<String>,
    req_id: Option<String>,
    bundle: &MessageBundle,
) -> Response {
    let detailed_message = if reason == Reason::UserNotAuthenticated {
        detailed_message.map(|d| rewrite_user_not_authenticated(&d, bundle))
    } else {
        detailed_message
    };
    Response {
        req_id,
        status: Status::Error,
        sig: None,
        errors: vec![WireError {
            reason,
            message: message.into(),
            detailed_message,
        }],
        warnings: Vec::new(),
        table: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vizquery_core::{Cell, ColumnDescription, ErrorKey, Value, ValueType};

    fn sample_table() -> Table {
        let mut t = Table::new();
        t.add_column(ColumnDescription::new("name", ValueType::Text));
        t.add_row(vec![Cell::new(Value::text("Sloth"))]).unwrap();
        t
    }

    #[test]
    fn matching_client_sig_yields_not_modified() {
        let t = sample_table();
        let sig = vizquery_core::compute_signature(&t);
        let resp = from_table(t, Some("1".to_string()), Some(sig.as_str()));
        assert_eq!(resp.status, Status::Error);
        assert_eq!(resp.errors[0].reason, Reason::NotModified);
        assert!(resp.table.is_none());
    }

    #[test]
    fn fresh_table_yields_ok_with_signature() {
        let t = sample_table();
        let resp = from_table(t, None, None);
        assert_eq!(resp.status, Status::Ok);
        assert!(resp.sig.is_some());
        assert!(resp.table.is_some());
    }

    #[test]
    fn query_error_renders_localized_message() {
        let err = QueryError::invalid(ErrorKey::NoColumn, "population");
        let bundle = MessageBundle::default();
        let resp = from_query_error(&err, None, &bundle);
        assert_eq!(resp.status, Status::Error);
        assert!(resp.errors[0].message.contains("population"));
        assert_eq!(resp.errors[0].reason, Reason::InvalidQuery);
    }
}
