//! The wire error taxonomy (spec §6/§7): a closed set of `reason`
//! strings, independent of `vizquery_core::ErrorKey` (which only covers
//! query validation; the rest come from the server's access-control and
//! transport layer).

use std::fmt;

use vizquery_core::ErrorKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reason {
    AccessDenied,
    UserNotAuthenticated,
    UnsupportedQueryOperation,
    InvalidQuery,
    InvalidRequest,
    InternalError,
    NotSupported,
    DataTruncated,
    NotModified,
    Timeout,
    IllegalFormattingPatterns,
    Other,
}

impl Reason {
    pub fn as_str(self) -> &'static str {
        match self {
            Reason::AccessDenied => "access_denied",
            Reason::UserNotAuthenticated => "user_not_authenticated",
            Reason::UnsupportedQueryOperation => "unsupported_query_operation",
            Reason::InvalidQuery => "invalid_query",
            Reason::InvalidRequest => "invalid_request",
            Reason::InternalError => "internal_error",
            Reason::NotSupported => "not_supported",
            Reason::DataTruncated => "data_truncated",
            Reason::NotModified => "not_modified",
            Reason::Timeout => "timeout",
            Reason::IllegalFormattingPatterns => "illegal_formatting_patterns",
            Reason::Other => "other",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `vizquery_core::QueryError` only ever reflects query validation or
/// evaluation failures; everything else on the wire (`access_denied`,
/// `timeout`, ...) is constructed directly by `vizquery-server`.
impl From<ErrorKey> for Reason {
    fn from(key: ErrorKey) -> Self {
        match key {
            ErrorKey::TypeMismatch => Reason::InvalidQuery,
            ErrorKey::IllegalFormattingPatterns => Reason::IllegalFormattingPatterns,
            ErrorKey::InternalError => Reason::InternalError,
            _ => Reason::InvalidQuery,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_mismatch_maps_to_invalid_query() {
        assert_eq!(Reason::from(ErrorKey::TypeMismatch).as_str(), "invalid_query");
    }

    #[test]
    fn internal_error_key_maps_to_internal_error_reason() {
        assert_eq!(Reason::from(ErrorKey::InternalError).as_str(), "internal_error");
    }
}
