//! The closed error taxonomy for query validation and execution.
//!
//! `ErrorKey` enumerates the message-bundle keys from spec §7; `QueryError`
//! is the error type every fallible operation in this crate returns.

use std::fmt;

/// Message-bundle key. Each variant corresponds to one entry in the
/// localized message bundle consulted by `vizquery-wire`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKey {
    NoColumn,
    AvgSumOnlyNumeric,
    InvalidAggType,
    ParseError,
    CannotBeInGroupBy,
    CannotBeInPivot,
    CannotBeInWhere,
    SelectWithAndWithoutAgg,
    ColAggNotInSelect,
    CannotGroupWithoutAgg,
    CannotPivotWithoutAgg,
    AggInSelectNoPivot,
    FormatColNotInSelect,
    LabelColNotInSelect,
    AddColToGroupByOrAgg,
    AggInOrderNotInSelect,
    NoAggInOrderWhenPivot,
    ColInOrderMustBeInSelect,
    NoColInGroupAndPivot,
    InvalidOffset,
    InvalidSkipping,
    ColumnOnlyOnce,
    TypeMismatch,
    IllegalFormattingPatterns,
    InternalError,
}

impl ErrorKey {
    /// Stable name, used as the message-bundle lookup key.
    pub fn name(self) -> &'static str {
        match self {
            ErrorKey::NoColumn => "NO_COLUMN",
            ErrorKey::AvgSumOnlyNumeric => "AVG_SUM_ONLY_NUMERIC",
            ErrorKey::InvalidAggType => "INVALID_AGG_TYPE",
            ErrorKey::ParseError => "PARSE_ERROR",
            ErrorKey::CannotBeInGroupBy => "CANNOT_BE_IN_GROUP_BY",
            ErrorKey::CannotBeInPivot => "CANNOT_BE_IN_PIVOT",
            ErrorKey::CannotBeInWhere => "CANNOT_BE_IN_WHERE",
            ErrorKey::SelectWithAndWithoutAgg => "SELECT_WITH_AND_WITHOUT_AGG",
            ErrorKey::ColAggNotInSelect => "COL_AGG_NOT_IN_SELECT",
            ErrorKey::CannotGroupWithoutAgg => "CANNOT_GROUP_WITHOUT_AGG",
            ErrorKey::CannotPivotWithoutAgg => "CANNOT_PIVOT_WITHOUT_AGG",
            ErrorKey::AggInSelectNoPivot => "AGG_IN_SELECT_NO_PIVOT",
            ErrorKey::FormatColNotInSelect => "FORMAT_COL_NOT_IN_SELECT",
            ErrorKey::LabelColNotInSelect => "LABEL_COL_NOT_IN_SELECT",
            ErrorKey::AddColToGroupByOrAgg => "ADD_COL_TO_GROUP_BY_OR_AGG",
            ErrorKey::AggInOrderNotInSelect => "AGG_IN_ORDER_NOT_IN_SELECT",
            ErrorKey::NoAggInOrderWhenPivot => "NO_AGG_IN_ORDER_WHEN_PIVOT",
            ErrorKey::ColInOrderMustBeInSelect => "COL_IN_ORDER_MUST_BE_IN_SELECT",
            ErrorKey::NoColInGroupAndPivot => "NO_COL_IN_GROUP_AND_PIVOT",
            ErrorKey::InvalidOffset => "INVALID_OFFSET",
            ErrorKey::InvalidSkipping => "INVALID_SKIPPING",
            ErrorKey::ColumnOnlyOnce => "COLUMN_ONLY_ONCE",
            ErrorKey::TypeMismatch => "TYPE_MISMATCH",
            ErrorKey::IllegalFormattingPatterns => "ILLEGAL_FORMATTING_PATTERNS",
            ErrorKey::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Every fallible operation in `vizquery-core` returns this.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// Structural or schema validation failure (spec §4.2, §7).
    #[error("invalid query [{key}]: {detail}")]
    InvalidQuery { key: ErrorKey, detail: String },

    /// `Value::compare`/`equals` across mismatched types (spec §4.1).
    #[error("type mismatch: {detail}")]
    TypeMismatch { detail: String },

    /// A scalar function failed at evaluation time (spec §4.7).
    #[error("error evaluating {function}: {detail}")]
    RuntimeEvaluation { function: String, detail: String },

    /// Anything else, surfaced as `internal_error` on the wire.
    #[error("internal error: {detail}")]
    Internal { detail: String },

    /// The caller's cancellation token tripped between pipeline stages
    /// (spec §5). Callers that care about distinguishing this from a
    /// generic internal error match on the variant directly rather than
    /// going through `key()`.
    #[error("query cancelled")]
    Cancelled,
}

impl QueryError {
    pub fn invalid(key: ErrorKey, detail: impl Into<String>) -> Self {
        QueryError::InvalidQuery {
            key,
            detail: detail.into(),
        }
    }

    pub fn key(&self) -> ErrorKey {
        match self {
            QueryError::InvalidQuery { key, .. } => *key,
            QueryError::TypeMismatch { .. } => ErrorKey::TypeMismatch,
            QueryError::RuntimeEvaluation { .. } => ErrorKey::InternalError,
            QueryError::Internal { .. } => ErrorKey::InternalError,
            QueryError::Cancelled => ErrorKey::InternalError,
        }
    }
}

pub type QueryResult<T> = Result<T, QueryError>;
