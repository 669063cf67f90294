//! Statement cache keyed by generated query text; shared by every caller
//! of one handler.

use crate::obs::sink::{self, MetricsEvent, SharedSink};
use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
};

///
/// CacheStats
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub evictions: usize,
    pub size: usize,
}

///
/// StatementCache
///
/// Bounded map from query text to a prepared handle. Eviction drops the
/// oldest insertion, not the least recently used entry. Handles are never
/// prepared while the lock is held.
///

pub struct StatementCache<H> {
    capacity: usize,
    inner: Mutex<CacheInner<H>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
    evictions: AtomicUsize,
    sink: Option<SharedSink>,
}

struct CacheInner<H> {
    entries: HashMap<String, Arc<H>>,
    order: VecDeque<String>,
}

impl<H> StatementCache<H> {
    /// Cache holding at most `capacity` handles (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
            evictions: AtomicUsize::new(0),
            sink: None,
        }
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Option<SharedSink>) -> Self {
        self.sink = sink;
        self
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Cached handle for `text`, without preparing on a miss.
    #[must_use]
    pub fn get(&self, text: &str) -> Option<Arc<H>> {
        self.lock().entries.get(text).cloned()
    }

    /// Return the cached handle for `text`, or prepare, cache and return a
    /// new one. A failed prepare caches nothing.
    pub fn get_or_prepare<E>(
        &self,
        text: &str,
        prepare: impl FnOnce(&str) -> Result<H, E>,
    ) -> Result<Arc<H>, E> {
        if let Some(handle) = self.get(text) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            sink::emit(self.sink.as_ref(), MetricsEvent::CacheHit);

            return Ok(handle);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        sink::emit(self.sink.as_ref(), MetricsEvent::CacheMiss);

        let prepared = Arc::new(prepare(text)?);

        Ok(self.insert(text, prepared))
    }

    // Another caller may have raced us to the same text; first insert wins.
    fn insert(&self, text: &str, handle: Arc<H>) -> Arc<H> {
        let mut evicted = 0;
        let handle = {
            let mut inner = self.lock();
            if let Some(existing) = inner.entries.get(text) {
                return Arc::clone(existing);
            }

            inner.entries.insert(text.to_string(), Arc::clone(&handle));
            inner.order.push_back(text.to_string());

            while inner.entries.len() > self.capacity {
                let Some(oldest) = inner.order.pop_front() else {
                    break;
                };
                inner.entries.remove(&oldest);
                evicted += 1;
            }

            handle
        };

        if evicted > 0 {
            self.evictions.fetch_add(evicted, Ordering::Relaxed);
            for _ in 0..evicted {
                sink::emit(self.sink.as_ref(), MetricsEvent::CacheEvict);
            }
        }

        handle
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Stats are best-effort; relaxed ordering is sufficient.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            size: self.len(),
        }
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheInner<H>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::{convert::Infallible, sync::atomic::AtomicU64, thread};

    fn prepare_counting(counter: &AtomicU64) -> impl FnOnce(&str) -> Result<String, Infallible> + '_ {
        move |text| {
            counter.fetch_add(1, Ordering::Relaxed);
            Ok(format!("prepared:{text}"))
        }
    }

    #[test]
    fn repeated_text_reuses_handle() {
        let cache = StatementCache::new(4);
        let prepares = AtomicU64::new(0);

        let a = cache.get_or_prepare("SELECT 1", prepare_counting(&prepares)).unwrap();
        let b = cache.get_or_prepare("SELECT 1", prepare_counting(&prepares)).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(prepares.load(Ordering::Relaxed), 1);
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                evictions: 0,
                size: 1
            }
        );
    }

    #[test]
    fn eviction_drops_oldest_insertion_not_lru() {
        let cache = StatementCache::new(2);
        let prepares = AtomicU64::new(0);

        cache.get_or_prepare("a", prepare_counting(&prepares)).unwrap();
        cache.get_or_prepare("b", prepare_counting(&prepares)).unwrap();
        // touching "a" does not protect it
        cache.get_or_prepare("a", prepare_counting(&prepares)).unwrap();
        cache.get_or_prepare("c", prepare_counting(&prepares)).unwrap();

        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn failed_prepare_is_not_cached() {
        let cache: StatementCache<String> = StatementCache::new(2);

        let err = cache.get_or_prepare("bad", |_| Err::<String, _>("syntax error"));
        assert_eq!(err.unwrap_err(), "syntax error");
        assert!(cache.is_empty());
    }

    #[test]
    fn concurrent_callers_share_one_cache() {
        let cache = Arc::new(StatementCache::new(8));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..32 {
                        let text = format!("q{}", i % 16);
                        cache
                            .get_or_prepare(&text, |t| Ok::<_, Infallible>(t.to_string()))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(cache.len() <= 8);
    }

    proptest! {
        #[test]
        fn never_exceeds_capacity(capacity in 1usize..16, texts in proptest::collection::vec("[a-e]{1,3}", 0..64)) {
            let cache = StatementCache::new(capacity);
            for text in &texts {
                cache.get_or_prepare(text, |t| Ok::<_, Infallible>(t.len())).unwrap();
                prop_assert!(cache.len() <= capacity);
            }
        }
    }
}
