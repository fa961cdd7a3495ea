//! The `DataProvider` collaborator contract, request orchestration and
//! HTTP transport for vizquery (spec §6): wires `vizquery-core` and
//! `vizquery-lang` to a `warp` transport the way the teacher wires
//! `datafusion` to `pgwire`.

mod context;
mod http;
mod options;
mod orchestrate;
mod provider;
pub mod providers;

pub use context::RequestContext;
pub use http::{filters, serve};
pub use options::ServerOptions;
pub use orchestrate::handle_query;
pub use provider::DataProvider;
