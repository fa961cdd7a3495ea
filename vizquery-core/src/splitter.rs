//! The query splitter (spec §4.4): factors a query into a
//! provider-executable prefix `Qp` and an in-process completion `Qc`
//! such that `completion(provider(Qp, T)) ≡ query(Q, T)` for any table
//! `T` the provider could produce.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::ast::{AbstractColumn, AggregationOp, Query};
use crate::capabilities::Capabilities;

fn any_scalar_function(query: &Query) -> bool {
    if let Some(selection) = &query.selection {
        if selection.iter().any(AbstractColumn::contains_scalar_function) {
            return true;
        }
    }
    if query.group.iter().any(AbstractColumn::contains_scalar_function) {
        return true;
    }
    if query.pivot.iter().any(AbstractColumn::contains_scalar_function) {
        return true;
    }
    if query
        .sort
        .iter()
        .any(|s| s.column.contains_scalar_function())
    {
        return true;
    }
    if let Some(filter) = &query.filter {
        return filter_has_scalar_function(filter);
    }
    false
}

fn filter_has_scalar_function(filter: &crate::ast::Filter) -> bool {
    use crate::ast::Filter::*;
    match filter {
        ColumnValue { column, .. } | ColumnIsNull(column) => column.contains_scalar_function(),
        ColumnColumn { lhs, rhs, .. } => {
            lhs.contains_scalar_function() || rhs.contains_scalar_function()
        }
        Compound { children, .. } => children.iter().any(filter_has_scalar_function),
        Negation(inner) => filter_has_scalar_function(inner),
    }
}

fn dedup_columns(cols: impl IntoIterator<Item = AbstractColumn>) -> Vec<AbstractColumn> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for c in cols {
        if seen.insert(c.id()) {
            out.push(c);
        }
    }
    out
}

fn rewrite_keys(
    map: &BTreeMap<String, String>,
    mapping: &HashMap<String, String>,
) -> BTreeMap<String, String> {
    map.iter()
        .map(|(k, v)| (mapping.get(k).cloned().unwrap_or_else(|| k.clone()), v.clone()))
        .collect()
}

/// Split `query` given a provider's declared `capabilities`.
pub fn split_query(query: &Query, capabilities: Capabilities) -> (Option<Query>, Query) {
    match capabilities {
        Capabilities::None => (None, query.clone()),
        Capabilities::All => (Some(query.clone()), Query::empty()),
        _ if any_scalar_function(query) => (None, query.clone()),
        Capabilities::Select => split_select(query),
        Capabilities::SortAndPagination => split_sort_and_pagination(query),
        Capabilities::Sql => split_sql(query),
    }
}

fn all_simple(cols: &[AbstractColumn]) -> bool {
    cols.iter().all(|c| matches!(c, AbstractColumn::Simple(_)))
}

/// `SELECT` capability: only a bare column projection can be pushed.
fn split_select(query: &Query) -> (Option<Query>, Query) {
    let pushable_selection = query
        .selection
        .as_ref()
        .is_some_and(|cols| all_simple(cols));

    let nothing_else_requested = query.filter.is_none()
        && query.group.is_empty()
        && query.pivot.is_empty()
        && query.sort.is_empty()
        && query.row_limit.is_none()
        && query.row_offset.is_none()
        && query.row_skipping.is_none();

    if !pushable_selection || !nothing_else_requested {
        return (None, query.clone());
    }

    let qp = Query {
        selection: query.selection.clone(),
        ..Query::empty()
    };
    let qc = Query {
        labels: query.labels.clone(),
        user_format_options: query.user_format_options.clone(),
        options: query.options.clone(),
        ..Query::empty()
    };
    (Some(qp), qc)
}

/// `SORT_AND_PAGINATION` capability: `SELECT` + sort by simple columns +
/// limit/offset.
fn split_sort_and_pagination(query: &Query) -> (Option<Query>, Query) {
    let pushable_selection = query
        .selection
        .as_ref()
        .is_none_or_true_all_simple();

    let sort_is_simple = query
        .sort
        .iter()
        .all(|s| matches!(s.column, AbstractColumn::Simple(_)));

    let supported = pushable_selection
        && sort_is_simple
        && query.filter.is_none()
        && query.group.is_empty()
        && query.pivot.is_empty()
        && query.row_skipping.is_none();

    if !supported {
        return (None, query.clone());
    }

    let qp = Query {
        selection: query.selection.clone(),
        sort: query.sort.clone(),
        row_limit: query.row_limit,
        row_offset: query.row_offset,
        ..Query::empty()
    };
    let qc = Query {
        labels: query.labels.clone(),
        user_format_options: query.user_format_options.clone(),
        options: query.options.clone(),
        ..Query::empty()
    };
    (Some(qp), qc)
}

/// `SQL` capability: `SELECT` + filter + group + sort + limit/offset, no
/// pivot and no skipping. `PIVOT` gets the special group-union-pivot
/// pushdown described in spec §4.4.
fn split_sql(query: &Query) -> (Option<Query>, Query) {
    if !query.pivot.is_empty() {
        return split_sql_with_pivot(query);
    }

    let can_push_paging = query.row_skipping.is_none();

    let mut qp = Query {
        selection: query.selection.clone(),
        filter: query.filter.clone(),
        group: query.group.clone(),
        sort: query.sort.clone(),
        ..Query::empty()
    };
    if can_push_paging {
        qp.row_limit = query.row_limit;
        qp.row_offset = query.row_offset;
    }

    let qc = Query {
        row_limit: if can_push_paging { None } else { query.row_limit },
        row_offset: if can_push_paging { None } else { query.row_offset },
        row_skipping: query.row_skipping,
        labels: query.labels.clone(),
        user_format_options: query.user_format_options.clone(),
        options: query.options.clone(),
        ..Query::empty()
    };
    (Some(qp), qc)
}

fn split_sql_with_pivot(query: &Query) -> (Option<Query>, Query) {
    let group_and_pivot = dedup_columns(
        query
            .group
            .iter()
            .cloned()
            .chain(query.pivot.iter().cloned()),
    );

    let agg_cols: Vec<&AbstractColumn> = query
        .selection
        .as_ref()
        .map(|cols| cols.iter().filter(|c| c.is_aggregation()).collect())
        .unwrap_or_default();

    let mut qp_selection = group_and_pivot.clone();
    qp_selection.extend(agg_cols.iter().map(|c| (*c).clone()));

    let qp = Query {
        selection: Some(qp_selection),
        filter: query.filter.clone(),
        group: group_and_pivot,
        ..Query::empty()
    };

    let mut mapping: HashMap<String, String> = HashMap::new();
    let mut qc_selection = Vec::new();
    for col in query.group.iter().chain(query.pivot.iter()) {
        qc_selection.push(col.clone());
    }
    for col in agg_cols {
        let flattened_id = col.id();
        let condensed = AbstractColumn::aggregation(
            AbstractColumn::simple(flattened_id.clone()),
            AggregationOp::Min,
        );
        mapping.insert(col.id(), condensed.id());
        qc_selection.push(condensed);
    }

    let qc = Query {
        selection: Some(qc_selection),
        group: query.group.clone(),
        pivot: query.pivot.clone(),
        sort: query.sort.clone(),
        row_limit: query.row_limit,
        row_offset: query.row_offset,
        row_skipping: query.row_skipping,
        labels: rewrite_keys(&query.labels, &mapping),
        user_format_options: rewrite_keys(&query.user_format_options, &mapping),
        options: query.options.clone(),
    };
    (Some(qp), qc)
}

trait OptionAllSimple {
    fn is_none_or_true_all_simple(&self) -> bool;
}

impl OptionAllSimple for Option<&Vec<AbstractColumn>> {
    fn is_none_or_true_all_simple(&self) -> bool {
        match self {
            None => true,
            Some(cols) => all_simple(cols),
        }
    }
}
