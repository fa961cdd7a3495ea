//! Provider capability levels (spec §4.4).

/// What a `DataProvider` declares it can execute natively. Ordered from
/// least to most capable; see spec §4.4 for the exact guarantee table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Capabilities {
    /// Returns only the base table unmodified.
    None,
    /// `NONE` + choose the subset (and order) of simple columns.
    Select,
    /// `SELECT` + sort by simple columns + limit/offset.
    SortAndPagination,
    /// `SELECT` + filter + group + sort + limit/offset (no pivot, no
    /// scalar functions, no skipping).
    Sql,
    /// The entire query.
    All,
}
