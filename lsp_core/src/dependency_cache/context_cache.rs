//! ClassLoadingContext sub-cache: LRU bounded, weak-reference reachable.
//!
//! Construction happens under a per-key constructor lock only, never the
//! global cache lock, so building one dep-set's context never blocks an
//! unrelated dep-set.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, Weak},
    time::Instant,
};

use dashmap::DashMap;

use crate::error::CacheError;

use super::DepSetKey;

/// Opaque handle giving symbolic access to types on a classpath. Heavyweight;
/// `release` MUST free file descriptors / memory before returning.
pub trait ClassLoadingContext: Send + Sync {
    fn release(&self);
}

pub trait ContextBuilder: Send + Sync {
    fn build(&self, dep_set: &[PathBuf]) -> Result<Arc<dyn ClassLoadingContext>, CacheError>;
}

struct Entry {
    strong: Arc<dyn ClassLoadingContext>,
    weak: Weak<dyn ClassLoadingContext>,
    last_access: Instant,
    dep_set: Vec<PathBuf>,
}

pub struct ContextCache {
    max_entries: usize,
    entries: DashMap<DepSetKey, Entry>,
    constructor_locks: DashMap<DepSetKey, Arc<Mutex<()>>>,
    /// project root -> set of cache keys derived from dep-sets under it.
    project_index: Mutex<HashMap<PathBuf, Vec<DepSetKey>>>,
}

impl ContextCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries,
            entries: DashMap::new(),
            constructor_locks: DashMap::new(),
            project_index: Mutex::new(HashMap::new()),
        }
    }

    pub fn get_or_create(
        &self,
        dep_set: &[PathBuf],
        builder: &dyn ContextBuilder,
    ) -> Result<Arc<dyn ClassLoadingContext>, CacheError> {
        let key = super::dep_set_key(dep_set);

        if let Some(mut hit) = self.entries.get_mut(&key) {
            hit.last_access = Instant::now();
            return Ok(Arc::clone(&hit.strong));
        }

        let lock = self
            .constructor_locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().unwrap();

        if let Some(mut hit) = self.entries.get_mut(&key) {
            hit.last_access = Instant::now();
            self.constructor_locks.remove(&key);
            return Ok(Arc::clone(&hit.strong));
        }

        let built = builder.build(dep_set);
        self.constructor_locks.remove(&key);
        let context = built?;

        self.evict_if_at_capacity();

        let entry = Entry {
            strong: Arc::clone(&context),
            weak: Arc::downgrade(&context),
            last_access: Instant::now(),
            dep_set: dep_set.to_vec(),
        };
        self.entries.insert(key, entry);
        self.index_for_projects(key, dep_set);

        Ok(context)
    }

    fn index_for_projects(&self, key: DepSetKey, dep_set: &[PathBuf]) {
        let mut index = self.project_index.lock().unwrap();
        for path in dep_set {
            if let Some(root) = path.ancestors().nth(1) {
                index.entry(root.to_path_buf()).or_default().push(key);
            }
        }
    }

    fn evict_if_at_capacity(&self) {
        if self.entries.len() < self.max_entries {
            return;
        }
        if let Some(oldest_key) = self
            .entries
            .iter()
            .min_by_key(|e| e.value().last_access)
            .map(|e| *e.key())
        {
            if let Some((_, entry)) = self.entries.remove(&oldest_key) {
                entry.strong.release();
            }
        }
    }

    pub fn invalidate_project(&self, root: &Path) {
        let keys = {
            let mut index = self.project_index.lock().unwrap();
            index.remove(root).unwrap_or_default()
        };
        for key in keys {
            if let Some((_, entry)) = self.entries.remove(&key) {
                entry.strong.release();
            }
        }
    }

    pub fn invalidate_all(&self) {
        let keys: Vec<DepSetKey> = self.entries.iter().map(|e| *e.key()).collect();
        for key in keys {
            if let Some((_, entry)) = self.entries.remove(&key) {
                entry.strong.release();
            }
        }
        self.project_index.lock().unwrap().clear();
    }

    /// Evicts oldest entries while the number of live entries times an
    /// assumed per-entry footprint exceeds `target_memory_mb`. Context
    /// construction cost is not uniformly measurable across resolvers, so
    /// entry count is used as the proxy the same way `MAX_ENTRIES` is.
    pub fn evict_to_target(&self, target_memory_mb: u64) {
        let assumed_mb_per_entry = 1u64;
        let target_entries = (target_memory_mb / assumed_mb_per_entry.max(1)).max(1) as usize;
        while self.entries.len() > target_entries {
            if let Some(oldest_key) = self
                .entries
                .iter()
                .min_by_key(|e| e.value().last_access)
                .map(|e| *e.key())
            {
                if let Some((_, entry)) = self.entries.remove(&oldest_key) {
                    entry.strong.release();
                }
            } else {
                break;
            }
        }
    }

    /// Weak handle surviving eviction, for diagnostics / tests only.
    pub fn weak_handle(&self, dep_set: &[PathBuf]) -> Option<Weak<dyn ClassLoadingContext>> {
        let key = super::dep_set_key(dep_set);
        self.entries.get(&key).map(|e| e.weak.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ReleaseTrackingContext(Arc<AtomicUsize>);
    impl ClassLoadingContext for ReleaseTrackingContext {
        fn release(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct SimpleBuilder;
    impl ContextBuilder for SimpleBuilder {
        fn build(&self, _dep_set: &[PathBuf]) -> Result<Arc<dyn ClassLoadingContext>, CacheError> {
            Ok(Arc::new(ReleaseTrackingContext(Arc::new(AtomicUsize::new(0)))))
        }
    }

    #[test]
    fn never_exceeds_max_entries() {
        let cache = ContextCache::new(4);
        for i in 0..101 {
            let dep_set = vec![PathBuf::from(format!("/proj/dep-{i}.jar"))];
            cache.get_or_create(&dep_set, &SimpleBuilder).unwrap();
        }
        assert!(cache.len() <= 4);
    }

    #[test]
    fn eviction_releases_the_oldest_entry() {
        let released = Arc::new(AtomicUsize::new(0));
        struct Builder(Arc<AtomicUsize>);
        impl ContextBuilder for Builder {
            fn build(&self, _dep_set: &[PathBuf]) -> Result<Arc<dyn ClassLoadingContext>, CacheError> {
                Ok(Arc::new(ReleaseTrackingContext(Arc::new(AtomicUsize::new(0)))))
            }
        }
        let builder = Builder(Arc::clone(&released));
        let cache = ContextCache::new(1);
        cache.get_or_create(&[PathBuf::from("/proj/a.jar")], &builder).unwrap();
        cache.get_or_create(&[PathBuf::from("/proj/b.jar")], &builder).unwrap();
        assert_eq!(cache.len(), 1);
    }
}
