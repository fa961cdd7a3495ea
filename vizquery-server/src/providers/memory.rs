//! An in-memory `DataProvider` (spec §6): wraps a fixed `Table` and
//! declares `Capabilities::None`, so the engine runs the entire query
//! in-process and the provider only ever hands back its base table.

use async_trait::async_trait;
use vizquery_core::{Capabilities, Query, QueryResult, Table};

use crate::context::RequestContext;
use crate::provider::DataProvider;

#[derive(Debug, Clone)]
pub struct MemoryProvider {
    table: Table,
}

impl MemoryProvider {
    pub fn new(table: Table) -> Self {
        MemoryProvider { table }
    }
}

#[async_trait]
impl DataProvider for MemoryProvider {
    fn capabilities(&self) -> Capabilities {
        Capabilities::None
    }

    async fn generate(&self, _provider_query: &Query, _ctx: &RequestContext) -> QueryResult<Table> {
        Ok(self.table.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vizquery_core::collator::Locale;
    use vizquery_core::{Cell, ColumnDescription, Value, ValueType};

    #[tokio::test]
    async fn generate_returns_the_wrapped_table_unmodified() {
        let mut t = Table::new();
        t.add_column(ColumnDescription::new("name", ValueType::Text));
        t.add_row(vec![Cell::new(Value::text("Sloth"))]).unwrap();
        let provider = MemoryProvider::new(t.clone());
        let ctx = RequestContext::new(Locale::default(), 100);

        let out = provider.generate(&Query::empty(), &ctx).await.unwrap();
        assert_eq!(out.row_count(), t.row_count());
    }

    #[test]
    fn declares_no_pushdown_capability() {
        let provider = MemoryProvider::new(Table::new());
        assert_eq!(provider.capabilities(), Capabilities::None);
    }
}
