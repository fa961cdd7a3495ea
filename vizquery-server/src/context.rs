//! `RequestContext` (spec §5/§6): the per-request collaborator state
//! passed to `DataProvider::generate` — deadline, cancellation and
//! locale.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use vizquery_core::collator::Locale;

/// Carried through one request. `DataProvider` implementations must
/// respect `cancellation`; the engine itself polls it between stages
/// via `is_cancelled`.
#[derive(Debug, Clone)]
pub struct RequestContext {
    cancellation: CancellationToken,
    locale: Locale,
    max_rows: usize,
}

impl RequestContext {
    pub fn new(locale: Locale, max_rows: usize) -> Self {
        RequestContext {
            cancellation: CancellationToken::new(),
            locale,
            max_rows,
        }
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    pub fn max_rows(&self) -> usize {
        self.max_rows
    }

    /// A closure suitable for `vizquery_core::execute_with_collator_checked`;
    /// the core crate stays free of any async-runtime dependency, so the
    /// token is adapted into a plain predicate at the call site.
    pub fn is_cancelled(&self) -> impl Fn() -> bool + '_ {
        move || self.cancellation.is_cancelled()
    }

    /// Cancels the request after `timeout`, independent of the caller
    /// awaiting the provider; spawned once per request in `orchestrate`.
    pub fn cancel_after(&self, timeout: Duration) {
        let token = self.cancellation.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            token.cancel();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_context_is_not_cancelled() {
        let ctx = RequestContext::new(Locale::default(), 1000);
        assert!(!(ctx.is_cancelled())());
    }

    #[test]
    fn cancel_token_trips_predicate() {
        let ctx = RequestContext::new(Locale::default(), 1000);
        ctx.cancellation().cancel();
        assert!((ctx.is_cancelled())());
    }
}
