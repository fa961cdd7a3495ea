//! The `warp`-based HTTP transport (spec §6 ADDED), grounded on
//! `seafowl`'s `filters()`/`run_server()` shape: a small set of routes
//! built from `warp::Filter` combinators, `.with(cors)`, served by
//! `warp::serve(...).run(addr)`.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use log::{info, warn};
use vizquery_wire::{MessageBundle, OutputFormat, TqxParams};
use warp::{Filter, Reply};

use crate::options::ServerOptions;
use crate::orchestrate::handle_query;
use crate::provider::DataProvider;

const AUTH_HEADER: &str = "X-DataSource-Auth";

fn content_type_for(tqx: &TqxParams) -> &'static str {
    match tqx.out {
        OutputFormat::Json => "application/json; charset=utf-8",
        OutputFormat::Jsonp => "text/javascript; charset=utf-8",
        OutputFormat::Csv => "text/csv; charset=utf-8",
        OutputFormat::TsvExcel => "text/tab-separated-values; charset=utf-16le",
        OutputFormat::Html => "text/html; charset=utf-8",
    }
}

async fn gviz_query(
    params: HashMap<String, String>,
    auth_header: Option<String>,
    provider: Arc<dyn DataProvider>,
    opts: Arc<ServerOptions>,
    bundle: Arc<MessageBundle>,
) -> Result<impl Reply, std::convert::Infallible> {
    let tq = params.get("tq").cloned().unwrap_or_default();
    let tqx_raw = params.get("tqx").cloned().unwrap_or_default();
    let same_origin = auth_header.is_some();

    let (tqx, body) = handle_query(provider.as_ref(), &tq, &tqx_raw, same_origin, &opts, &bundle).await;

    let mut reply = warp::reply::with_header(body, "Content-Type", content_type_for(&tqx)).into_response();
    if tqx.out == OutputFormat::Csv || tqx.out == OutputFormat::TsvExcel {
        let disposition = format!("attachment; filename=\"{}\"", tqx.csv_file_name());
        reply = warp::reply::with_header(reply, "Content-Disposition", disposition).into_response();
    }
    Ok(reply)
}

/// Builds the routing filter for a `DataProvider`; a single `GET /gviz`
/// endpoint reading `tq`/`tqx` query parameters and the
/// `X-DataSource-Auth` same-origin marker header, per spec §6.
pub fn filters(
    provider: Arc<dyn DataProvider>,
    opts: Arc<ServerOptions>,
    bundle: Arc<MessageBundle>,
) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec![AUTH_HEADER, "Content-Type"])
        .allow_methods(vec!["GET"]);

    warp::path("gviz")
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .and(warp::header::optional::<String>(AUTH_HEADER))
        .and(warp::any().map(move || provider.clone()))
        .and(warp::any().map(move || opts.clone()))
        .and(warp::any().map(move || bundle.clone()))
        .then(gviz_query)
        .with(cors)
}

/// Runs the HTTP server until the process is killed; mirrors the
/// teacher's `serve`/`serve_with_handlers` pair one level up (there is
/// no auth-manager layering to offer here, so one `serve` is enough).
pub async fn serve(provider: Arc<dyn DataProvider>, opts: ServerOptions) -> Result<(), std::io::Error> {
    let opts = Arc::new(opts);
    let bundle = Arc::new(MessageBundle::for_locale(opts.default_locale()));
    let routes = filters(provider, opts.clone(), bundle);

    let addr: SocketAddr = format!("{}:{}", opts.host(), opts.port())
        .parse()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("{e}")))?;

    info!("Listening on {addr}");
    warp::serve(routes).run(addr).await;
    warn!("HTTP server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use vizquery_core::{Capabilities, Cell, ColumnDescription, Query, QueryResult, Table, Value, ValueType};
    use warp::http::StatusCode;
    use warp::test::request;

    use crate::context::RequestContext;

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
    async fn gviz_endpoint_returns_json_table() {
        let provider: Arc<dyn DataProvider> = Arc::new(StaticProvider);
        let opts = Arc::new(ServerOptions::new());
        let bundle = Arc::new(MessageBundle::default());
        let handler = filters(provider, opts, bundle);

        let resp = request()
            .method("GET")
            .path("/gviz?tq=&tqx=out:json")
            .header(AUTH_HEADER, "1")
            .reply(&handler)
            .await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert!(String::from_utf8_lossy(resp.body()).contains("Sloth"));
    }

    #[tokio::test]
    async fn csv_request_sets_download_headers() {
        let provider: Arc<dyn DataProvider> = Arc::new(StaticProvider);
        let opts = Arc::new(ServerOptions::new());
        let bundle = Arc::new(MessageBundle::default());
        let handler = filters(provider, opts, bundle);

        let resp = request()
            .method("GET")
            .path("/gviz?tq=&tqx=out:csv;outFileName:animals")
            .header(AUTH_HEADER, "1")
            .reply(&handler)
            .await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get("Content-Type").unwrap(), "text/csv; charset=utf-8");
        assert_eq!(
            resp.headers().get("Content-Disposition").unwrap(),
            "attachment; filename=\"animals.csv\""
        );
    }
}
