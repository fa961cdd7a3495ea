//! The `DataProvider` collaborator contract (spec §6).

use async_trait::async_trait;
use vizquery_core::{Capabilities, Query, QueryResult, Table};

use crate::context::RequestContext;

/// A source of tabular data. `capabilities()` declares what subset of a
/// query the provider can execute itself; `generate` is handed the
/// provider-executable prefix `Qp` (per `vizquery_core::split_query`)
/// and returns the table the engine then runs the completion `Qc` over.
#[async_trait]
pub trait DataProvider: Send + Sync {
    fn capabilities(&self) -> Capabilities;

    async fn generate(&self, provider_query: &Query, ctx: &RequestContext) -> QueryResult<Table>;
}
