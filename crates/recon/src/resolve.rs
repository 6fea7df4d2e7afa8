use std::sync::atomic::{AtomicUsize, Ordering};

use crate::cache::ResolutionCache;
use crate::catalog::CountryCatalog;
use crate::codes::normalize_code;
use crate::matcher::{CountryMatch, CountryQuery, STRATEGY_CHAIN};
use crate::ANOMALY_TARGET;

/// Outcome of reconciling one athlete-source country.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(CountryMatch),
    /// Every strategy failed. Not an error: the enricher decides what to do.
    Unresolved,
}

impl Resolution {
    pub fn matched(&self) -> Option<&CountryMatch> {
        match self {
            Self::Resolved(m) => Some(m),
            Self::Unresolved => None,
        }
    }
}

/// Walks the strategy chain for each distinct GDP-source code and memoizes
/// the outcome in `C`.
pub struct Reconciler<'p, C> {
    catalog: &'p CountryCatalog,
    threshold: f64,
    cache: C,
    fuzzy_invocations: AtomicUsize,
}

impl<'p, C: ResolutionCache> Reconciler<'p, C> {
    pub fn new(catalog: &'p CountryCatalog, threshold: f64, cache: C) -> Self {
        Self {
            catalog,
            threshold,
            cache,
            fuzzy_invocations: AtomicUsize::new(0),
        }
    }

    /// Resolve `query`, consulting the cache first. The flag is true when this
    /// call walked the chain rather than hitting the cache.
    pub fn resolve(&self, query: &CountryQuery<'_>) -> (Resolution, bool) {
        self.cache
            .get_or_resolve(&cache_key(query), || self.walk_chain(query))
    }

    fn walk_chain(&self, query: &CountryQuery<'_>) -> Resolution {
        for strategy in STRATEGY_CHAIN {
            if strategy.is_fuzzy() {
                self.fuzzy_invocations.fetch_add(1, Ordering::Relaxed);
            }
            if let Some(found) = strategy.attempt(self.catalog, query, self.threshold) {
                if strategy.is_fuzzy() {
                    log::info!(
                        target: ANOMALY_TARGET,
                        "fuzzy match: '{}' ({}) resolved to {} '{}' (score {:.2})",
                        query.name,
                        query.gdp_code,
                        found.record.alpha_3,
                        found.record.name,
                        found.score
                    );
                }
                return Resolution::Resolved(found);
            }
        }
        Resolution::Unresolved
    }

    /// Number of times the fuzzy strategy ran in this reconciler.
    pub fn fuzzy_invocations(&self) -> usize {
        self.fuzzy_invocations.load(Ordering::Relaxed)
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }
}

/// Codes key the cache. Rows without a code fall back to their name so that
/// distinct code-less countries do not share one entry.
fn cache_key(query: &CountryQuery<'_>) -> String {
    let code = normalize_code(query.gdp_code);
    if code.is_empty() {
        format!("#{}", query.name.trim().to_lowercase())
    } else {
        code
    }
}
