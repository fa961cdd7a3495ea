//! Request orchestration (spec §6): parse → validate (inside the
//! engine) → split → provider → engine → wire response. This is the
//! "assemble envelope, call core, render" layer `vizquery-server` keeps
//! thin, matching the teacher's posture of delegating wire-protocol
//! concerns to a dedicated crate and its own code to orchestration.

use vizquery_core::collator::OrdinalCollator;
use vizquery_core::{split_query, ErrorKey, Query, QueryError, Table};
use vizquery_wire::{self, MessageBundle, Reason, Response, TqxParams};

use crate::context::RequestContext;
use crate::options::ServerOptions;
use crate::provider::DataProvider;

/// Rebuilds `table` with at most `max_rows` rows, pushing a
/// `data_truncated` warning when rows were dropped; a no-op otherwise.
fn truncate_to_max_rows(table: Table, max_rows: usize) -> Table {
    if table.row_count() <= max_rows {
        return table;
    }
    let mut out = Table::with_locale(table.locale().clone());
    for c in table.columns() {
        out.add_column(c.clone());
    }
    for row in table.rows().iter().take(max_rows).cloned() {
        out.add_row(row).expect("row shape unchanged by truncation");
    }
    out.push_warning(
        vizquery_core::WarningKind::DataTruncated,
        format!("result truncated to {max_rows} rows"),
    );
    *out.properties_mut() = table.properties().clone();
    out
}

/// Whether `reason` requires a same-origin request per spec §6's "a
/// same-origin check applies for non-CSV/TSV/HTML output" rule.
fn out_requires_same_origin(out: vizquery_wire::OutputFormat) -> bool {
    use vizquery_wire::OutputFormat::*;
    matches!(out, Json | Jsonp)
}

/// Applies spec §6's same-origin coercion/rejection to a parsed `tqx`.
/// Returns `Err` (an access-denied response) when the request must be
/// rejected outright.
fn enforce_same_origin(mut tqx: TqxParams, same_origin: bool, bundle: &MessageBundle) -> Result<TqxParams, (Response, TqxParams)> {
    if same_origin {
        return Ok(tqx);
    }
    if tqx.out == vizquery_wire::OutputFormat::Json {
        tqx.out = vizquery_wire::OutputFormat::Jsonp;
    }
    if out_requires_same_origin(tqx.out) && tqx.response_handler.is_none() {
        let response = vizquery_wire::error(
            Reason::AccessDenied,
            bundle.message(ErrorKey::InternalError, "cross-origin request requires a responseHandler"),
            None,
            tqx.req_id.clone(),
            bundle,
        );
        return Err((response, tqx));
    }
    Ok(tqx)
}

/// Runs one `tq`/`tqx` request against `provider` end to end and
/// renders the result in the format `tqx` selected.
pub async fn handle_query(
    provider: &dyn DataProvider,
    tq: &str,
    tqx_raw: &str,
    same_origin: bool,
    opts: &ServerOptions,
    bundle: &MessageBundle,
) -> (TqxParams, Vec<u8>) {
    let tqx = vizquery_wire::parse_tqx(tqx_raw);
    let tqx = match enforce_same_origin(tqx, same_origin, bundle) {
        Ok(tqx) => tqx,
        Err((response, tqx)) => {
            let body = vizquery_wire::render(&response, &tqx);
            return (tqx, body);
        }
    };

    let query = match vizquery_lang::parse(tq) {
        Ok(q) => q,
        Err(err) => {
            let response = vizquery_wire::from_query_error(&err, tqx.req_id.clone(), bundle);
            let body = vizquery_wire::render(&response, &tqx);
            return (tqx, body);
        }
    };

    let response = run_pipeline(provider, &query, &tqx, opts, bundle).await;
    let body = vizquery_wire::render(&response, &tqx);
    (tqx, body)
}

async fn run_pipeline(
    provider: &dyn DataProvider,
    query: &Query,
    tqx: &TqxParams,
    opts: &ServerOptions,
    bundle: &MessageBundle,
) -> Response {
    let ctx = RequestContext::new(
        vizquery_core::collator::Locale::new(opts.default_locale().clone()),
        *opts.max_rows(),
    );

    let (provider_query, completion_query) = split_query(query, provider.capabilities());
    let provider_query = provider_query.unwrap_or_else(Query::empty);

    let base_table = match provider.generate(&provider_query, &ctx).await {
        Ok(t) => t,
        Err(err) => return error_response(&err, tqx, bundle),
    };
    let base_table = truncate_to_max_rows(base_table, ctx.max_rows());

    let is_cancelled = ctx.is_cancelled();
    let result = vizquery_core::execute_with_collator_checked(
        &completion_query,
        &base_table,
        &OrdinalCollator,
        &is_cancelled,
    );

    match result {
        Ok(table) => vizquery_wire::from_table(table, tqx.req_id.clone(), tqx.sig.as_deref()),
        Err(err) => error_response(&err, tqx, bundle),
    }
}

fn error_response(err: &QueryError, tqx: &TqxParams, bundle: &MessageBundle) -> Response {
    if matches!(err, QueryError::Cancelled) {
        return vizquery_wire::error(
            Reason::Timeout,
            bundle.message(ErrorKey::InternalError, "request cancelled"),
            None,
            tqx.req_id.clone(),
            bundle,
        );
    }
    vizquery_wire::from_query_error(err, tqx.req_id.clone(), bundle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use vizquery_core::{Capabilities, Cell, ColumnDescription, QueryResult, Value, ValueType};

    struct StaticProvider;

    #[async_trait]
    impl DataProvider for StaticProvider {
        fn capabilities(&self) -> Capabilities {
            Capabilities::None
        }

        async fn generate(&self, _provider_query: &Query, _ctx: &RequestContext) -> QueryResult<Table> {
            let mut t = Table::new();
            t.add_column(ColumnDescription::new("name", ValueType::Text));
            t.add_row(vec![Cell::new(Value::text("Sloth"))])?;
            Ok(t)
        }
    }

    #[tokio::test]
    async fn empty_query_renders_the_base_table_as_json() {
        let opts = ServerOptions::new();
        let bundle = MessageBundle::default();
        let (_, bytes) = handle_query(&StaticProvider, "", "out:json", true, &opts, &bundle).await;
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("Sloth"));
    }

    #[tokio::test]
    async fn cross_origin_json_without_handler_is_rejected() {
        let opts = ServerOptions::new();
        let bundle = MessageBundle::default();
        let (_, bytes) = handle_query(&StaticProvider, "", "out:json", false, &opts, &bundle).await;
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("access_denied"));
    }

    #[tokio::test]
    async fn cross_origin_jsonp_with_handler_succeeds() {
        let opts = ServerOptions::new();
        let bundle = MessageBundle::default();
        let (tqx, bytes) = handle_query(
            &StaticProvider,
            "",
            "out:json;responseHandler:myCallback",
            false,
            &opts,
            &bundle,
        )
        .await;
        assert_eq!(tqx.out, vizquery_wire::OutputFormat::Jsonp);
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("myCallback("));
    }

    #[tokio::test]
    async fn malformed_query_renders_a_parse_error() {
        let opts = ServerOptions::new();
        let bundle = MessageBundle::default();
        let (_, bytes) = handle_query(&StaticProvider, "SELECT (((", "out:json", true, &opts, &bundle).await;
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("\"status\":\"error\""));
    }
}
