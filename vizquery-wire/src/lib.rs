//! Wire-format rendering for vizquery (spec §6): the `tqx` envelope, the
//! JSON/JSONP/CSV/TSV-Excel/HTML output shapes, the error taxonomy, the
//! message bundle, and the response signature (re-exported from
//! `vizquery-core`, where it's computed).

mod csv;
mod display;
mod envelope;
mod html;
mod json;
mod messages;
mod reason;
mod response;

pub use envelope::{parse_tqx, OutputFormat, TqxParams, DEFAULT_RESPONSE_HANDLER};
pub use json::{render_json, render_jsonp, to_envelope};
pub use messages::MessageBundle;
pub use reason::Reason;
pub use response::{error, from_query_error, from_table, Response, Status, WireError};

pub use csv::{render_csv, render_tsv_excel};
pub use html::render_html;

/// Renders `response` into the wire format requested by `tqx`. Only
/// `json`/`jsonp` carry the full envelope (status, errors, signature);
/// CSV/TSV/HTML render the table body alone, per spec §6, and fall back
/// to a one-line plain-text error body if `response` has no table (e.g.
/// a validation failure surfaced while the client asked for CSV).
pub fn render(response: &Response, tqx: &TqxParams) -> Vec<u8> {
    match tqx.out {
        OutputFormat::Json => render_json(response).into_bytes(),
        OutputFormat::Jsonp => render_jsonp(response, tqx).into_bytes(),
        OutputFormat::Csv | OutputFormat::TsvExcel | OutputFormat::Html => match &response.table {
            Some(table) => match tqx.out {
                OutputFormat::Csv => render_csv(table).unwrap_or_default(),
                OutputFormat::TsvExcel => render_tsv_excel(table).unwrap_or_default(),
                OutputFormat::Html => render_html(table).into_bytes(),
                OutputFormat::Json | OutputFormat::Jsonp => unreachable!(),
            },
            None => response
                .errors
                .first()
                .map(|e| e.message.clone())
                .unwrap_or_else(|| "error".to_string())
                .into_bytes(),
        },
    }
}
