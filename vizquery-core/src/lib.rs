//! Tabular query engine: typed values, the table model, the query AST,
//! the structural/schema validator, the capability-based splitter and
//! the in-process execution engine.
//!
//! This crate has no I/O and no async entry points; `vizquery-server`
//! wires it to a transport and a `DataProvider` collaborator.

pub mod ast;
pub mod capabilities;
pub mod collator;
pub mod engine;
pub mod error;
pub mod signature;
pub mod splitter;
pub mod table;
pub mod validator;
pub mod value;

pub use ast::{AbstractColumn, AggregationOp, BoolOp, CompareOp, Filter, Query, QueryOptions, ScalarFunction, SortDirection, SortSpec};
pub use capabilities::Capabilities;
pub use collator::{CaseInsensitiveCollator, Collator, Locale, OrdinalCollator};
pub use engine::{execute, execute_with_collator, execute_with_collator_checked};
pub use error::{ErrorKey, QueryError, QueryResult};
pub use signature::compute_signature;
pub use splitter::split_query;
pub use table::{Cell, ColumnDescription, CustomProperties, Row, Table, Warning, WarningKind};
pub use validator::validate;
pub use value::{DateTimeValue, DateValue, TimeOfDayValue, Value, ValueType};
