//! The query AST (spec §3): selection, filter, group, pivot, sort,
//! labels, formats, options, paging. Every clause is an independent,
//! structurally-equal value.

use std::collections::BTreeMap;

use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregationOp {
    Min,
    Max,
    Sum,
    Avg,
    Count,
}

impl AggregationOp {
    pub fn name(self) -> &'static str {
        match self {
            AggregationOp::Min => "min",
            AggregationOp::Max => "max",
            AggregationOp::Sum => "sum",
            AggregationOp::Avg => "avg",
            AggregationOp::Count => "count",
        }
    }
}

/// The fixed scalar-function catalog (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarFunction {
    Now,
    ToDate,
    Year,
    Month,
    Day,
    Quarter,
    DayOfWeek,
    Hour,
    Minute,
    Second,
    Millisecond,
    Lower,
    Upper,
    Difference,
    Quotient,
    Sum,
    Product,
    Concat,
    DateDiff,
}

impl ScalarFunction {
    pub fn name(self) -> &'static str {
        match self {
            ScalarFunction::Now => "now",
            ScalarFunction::ToDate => "toDate",
            ScalarFunction::Year => "year",
            ScalarFunction::Month => "month",
            ScalarFunction::Day => "day",
            ScalarFunction::Quarter => "quarter",
            ScalarFunction::DayOfWeek => "dayOfWeek",
            ScalarFunction::Hour => "hour",
            ScalarFunction::Minute => "minute",
            ScalarFunction::Second => "second",
            ScalarFunction::Millisecond => "millisecond",
            ScalarFunction::Lower => "lower",
            ScalarFunction::Upper => "upper",
            ScalarFunction::Difference => "difference",
            ScalarFunction::Quotient => "quotient",
            ScalarFunction::Sum => "sum",
            ScalarFunction::Product => "product",
            ScalarFunction::Concat => "concat",
            ScalarFunction::DateDiff => "datediff",
        }
    }

    /// Declared arity; `None` means variadic (`concat`).
    pub fn arity(self) -> Option<usize> {
        match self {
            ScalarFunction::Now => Some(0),
            ScalarFunction::ToDate
            | ScalarFunction::Year
            | ScalarFunction::Month
            | ScalarFunction::Day
            | ScalarFunction::Quarter
            | ScalarFunction::DayOfWeek
            | ScalarFunction::Hour
            | ScalarFunction::Minute
            | ScalarFunction::Second
            | ScalarFunction::Millisecond
            | ScalarFunction::Lower
            | ScalarFunction::Upper => Some(1),
            ScalarFunction::Difference
            | ScalarFunction::Quotient
            | ScalarFunction::Sum
            | ScalarFunction::Product
            | ScalarFunction::DateDiff => Some(2),
            ScalarFunction::Concat => None,
        }
    }

    /// `true` for the arithmetic functions that use infix literal form
    /// (`a - b`) rather than call form (`fn(a, b)`).
    pub fn is_infix(self) -> bool {
        matches!(
            self,
            ScalarFunction::Difference | ScalarFunction::Quotient | ScalarFunction::Sum | ScalarFunction::Product
        )
    }
}

/// `SimpleColumn(id) | AggregationColumn | ScalarFunctionColumn |
/// ConstantColumn` (spec §3). Each has a structural `id()`.
#[derive(Debug, Clone, PartialEq)]
pub enum AbstractColumn {
    Simple(String),
    Aggregation {
        inner: Box<AbstractColumn>,
        op: AggregationOp,
    },
    ScalarFunctionCall {
        function: ScalarFunction,
        args: Vec<AbstractColumn>,
    },
    Constant(Value),
}

impl AbstractColumn {
    pub fn simple(id: impl Into<String>) -> Self {
        AbstractColumn::Simple(id.into())
    }

    pub fn aggregation(inner: AbstractColumn, op: AggregationOp) -> Self {
        AbstractColumn::Aggregation {
            inner: Box::new(inner),
            op,
        }
    }

    /// Structural id used both for display-column identity and engine
    /// bookkeeping (spec §3), e.g. `max-population`, `concat-a-b`.
    pub fn id(&self) -> String {
        match self {
            AbstractColumn::Simple(id) => id.clone(),
            AbstractColumn::Aggregation { inner, op } => format!("{}-{}", op.name(), inner.id()),
            AbstractColumn::ScalarFunctionCall { function, args } => {
                let arg_ids: Vec<String> = args.iter().map(AbstractColumn::id).collect();
                format!("{}-{}", function.name(), arg_ids.join("-"))
            }
            AbstractColumn::Constant(v) => format!("constant-{}", v.to_query_literal().unwrap_or_default()),
        }
    }

    pub fn is_aggregation(&self) -> bool {
        matches!(self, AbstractColumn::Aggregation { .. })
    }

    pub fn is_scalar_function(&self) -> bool {
        matches!(self, AbstractColumn::ScalarFunctionCall { .. })
    }

    /// Columns an aggregation's scope transitively depends on; used by
    /// structural validation and the splitter.
    pub fn contains_aggregation(&self) -> bool {
        match self {
            AbstractColumn::Simple(_) | AbstractColumn::Constant(_) => false,
            AbstractColumn::Aggregation { .. } => true,
            AbstractColumn::ScalarFunctionCall { args, .. } => {
                args.iter().any(AbstractColumn::contains_aggregation)
            }
        }
    }

    pub fn contains_scalar_function(&self) -> bool {
        match self {
            AbstractColumn::Simple(_) | AbstractColumn::Constant(_) => false,
            AbstractColumn::ScalarFunctionCall { .. } => true,
            AbstractColumn::Aggregation { inner, .. } => inner.contains_scalar_function(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Contains,
    StartsWith,
    EndsWith,
    Like,
    Matches,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoolOp {
    And,
    Or,
}

/// The filter tree (spec §4.3).
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    ColumnValue {
        column: AbstractColumn,
        value: Value,
        op: CompareOp,
    },
    ColumnColumn {
        lhs: AbstractColumn,
        rhs: AbstractColumn,
        op: CompareOp,
    },
    ColumnIsNull(AbstractColumn),
    Compound {
        op: BoolOp,
        children: Vec<Filter>,
    },
    Negation(Box<Filter>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortSpec {
    pub column: AbstractColumn,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    pub no_format: bool,
    pub no_values: bool,
}

/// An immutable query: every clause is optional and independent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub selection: Option<Vec<AbstractColumn>>,
    pub filter: Option<Filter>,
    pub group: Vec<AbstractColumn>,
    pub pivot: Vec<AbstractColumn>,
    pub sort: Vec<SortSpec>,
    pub row_limit: Option<usize>,
    pub row_offset: Option<usize>,
    pub row_skipping: Option<usize>,
    pub labels: BTreeMap<String, String>,
    pub user_format_options: BTreeMap<String, String>,
    pub options: QueryOptions,
}

impl Query {
    pub fn empty() -> Self {
        Query::default()
    }

    pub fn is_empty(&self) -> bool {
        self == &Query::default()
    }

    pub fn has_aggregation_in_select(&self) -> bool {
        self.selection
            .as_ref()
            .is_some_and(|cols| cols.iter().any(AbstractColumn::is_aggregation))
    }
}
