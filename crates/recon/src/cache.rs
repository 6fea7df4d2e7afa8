//! Per-run memo of country resolutions, keyed by GDP-source code.
//!
//! Entries are written once and never recomputed. The local cache serves the
//! sequential pipeline; the shared cache lets sharded workers resolve each
//! code at most once between them.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::resolve::Resolution;

pub trait ResolutionCache {
    /// Cached outcome for `key`, computing it with `resolve` on a miss.
    /// The flag is true when this call did the computation.
    fn get_or_resolve<F>(&self, key: &str, resolve: F) -> (Resolution, bool)
    where
        F: FnOnce() -> Resolution;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Single-threaded cache. No locking.
#[derive(Debug, Default)]
pub struct LocalResolutionCache {
    entries: RefCell<HashMap<String, Resolution>>,
}

impl LocalResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResolutionCache for LocalResolutionCache {
    fn get_or_resolve<F>(&self, key: &str, resolve: F) -> (Resolution, bool)
    where
        F: FnOnce() -> Resolution,
    {
        if let Some(hit) = self.entries.borrow().get(key) {
            return (hit.clone(), false);
        }
        let resolution = resolve();
        self.entries
            .borrow_mut()
            .insert(key.to_string(), resolution.clone());
        (resolution, true)
    }

    fn len(&self) -> usize {
        self.entries.borrow().len()
    }
}

/// Cache shared by scoped worker threads. The map lock is held only while
/// fetching a key's cell; the cell itself blocks concurrent callers until the
/// first one has finished resolving.
#[derive(Debug, Default)]
pub struct SharedResolutionCache {
    cells: Mutex<HashMap<String, Arc<OnceCell<Resolution>>>>,
}

impl SharedResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn cell(&self, key: &str) -> Arc<OnceCell<Resolution>> {
        let mut cells = self.cells.lock();
        Arc::clone(cells.entry(key.to_string()).or_default())
    }
}

impl ResolutionCache for SharedResolutionCache {
    fn get_or_resolve<F>(&self, key: &str, resolve: F) -> (Resolution, bool)
    where
        F: FnOnce() -> Resolution,
    {
        let cell = self.cell(key);
        let mut fresh = false;
        let resolution = cell
            .get_or_init(|| {
                fresh = true;
                resolve()
            })
            .clone();
        (resolution, fresh)
    }

    fn len(&self) -> usize {
        self.cells
            .lock()
            .values()
            .filter(|cell| cell.get().is_some())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn local_cache_computes_once() {
        let cache = LocalResolutionCache::new();
        let calls = AtomicUsize::new(0);
        for expected_fresh in [true, false, false] {
            let (resolution, fresh) = cache.get_or_resolve("BIR", || {
                calls.fetch_add(1, Ordering::SeqCst);
                Resolution::Unresolved
            });
            assert_eq!(resolution, Resolution::Unresolved);
            assert_eq!(fresh, expected_fresh);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn shared_cache_computes_once_across_threads() {
        let cache = SharedResolutionCache::new();
        let calls = AtomicUsize::new(0);
        let fresh_count = AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for key in ["BIR", "XYZ", "BIR"] {
                        let (_, fresh) = cache.get_or_resolve(key, || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            Resolution::Unresolved
                        });
                        if fresh {
                            fresh_count.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                });
            }
        });

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(fresh_count.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 2);
    }
}
