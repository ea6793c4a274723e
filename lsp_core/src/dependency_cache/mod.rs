//! Dependency Resolution Cache (spec C2).
//!
//! Two sub-caches sharing one lock domain: a TTL'd project→dependency-list
//! cache ([`project_deps`]) and an LRU, weak-reference-backed
//! class-loading-context cache ([`context_cache`]). Context construction is
//! guarded by a per-key constructor lock so building one dep-set's context
//! never blocks an unrelated one.

pub mod context_cache;
pub mod project_deps;

use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use dashmap::DashMap;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::CacheError;
pub use context_cache::{ClassLoadingContext, ContextBuilder};
pub use project_deps::{BuildSystem, ProjectDependencies, Resolver};

pub type DepSetKey = [u8; 32];

pub fn dep_set_key(paths: &[PathBuf]) -> DepSetKey {
    let mut sorted: Vec<&PathBuf> = paths.iter().collect();
    sorted.sort();
    sorted.dedup();
    let mut hasher = Sha256::new();
    for p in sorted {
        hasher.update(p.to_string_lossy().as_bytes());
        hasher.update([0u8]);
    }
    hasher.finalize().into()
}

pub struct DependencyCache {
    resolver: Arc<dyn Resolver>,
    builder: Arc<dyn ContextBuilder>,
    projects: DashMap<PathBuf, ProjectDependencies>,
    project_locks: DashMap<PathBuf, Arc<Mutex<()>>>,
    contexts: context_cache::ContextCache,
    max_age: Duration,
    last_memory_check: Mutex<Option<Instant>>,
    memory_check_interval: Duration,
}

impl DependencyCache {
    pub const DEFAULT_MAX_ENTRIES: usize = 100;
    pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);
    pub const DEFAULT_MEMORY_CHECK_INTERVAL: Duration = Duration::from_secs(60);

    pub fn new(resolver: Arc<dyn Resolver>, builder: Arc<dyn ContextBuilder>) -> Self {
        Self::with_bounds(resolver, builder, Self::DEFAULT_MAX_ENTRIES, Self::DEFAULT_MAX_AGE)
    }

    pub fn with_bounds(
        resolver: Arc<dyn Resolver>,
        builder: Arc<dyn ContextBuilder>,
        max_entries: usize,
        max_age: Duration,
    ) -> Self {
        Self {
            resolver,
            builder,
            projects: DashMap::new(),
            project_locks: DashMap::new(),
            contexts: context_cache::ContextCache::new(max_entries),
            max_age,
            last_memory_check: Mutex::new(None),
            memory_check_interval: Self::DEFAULT_MEMORY_CHECK_INTERVAL,
        }
    }

    /// Hit returns cached deps; miss invokes the resolver under a per-project
    /// mutex so at most one resolution per project is in flight. A hit whose
    /// dependency paths no longer match their resolution-time `(mtime, len)`
    /// fingerprint is treated as a miss too, so an in-place JAR replacement
    /// is re-resolved without waiting on `max_age`.
    pub fn get_or_resolve(&self, project_root: &Path) -> Result<ProjectDependencies, CacheError> {
        if let Some(entry) = self.projects.get(project_root) {
            if !entry.is_expired(self.max_age) && !entry.is_stale() {
                return Ok(entry.clone());
            }
        }

        let lock = self
            .project_locks
            .entry(project_root.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().unwrap();

        if let Some(entry) = self.projects.get(project_root) {
            if !entry.is_expired(self.max_age) && !entry.is_stale() {
                return Ok(entry.clone());
            }
        }

        let (paths, build_system) = self.resolver.resolve(project_root)?;
        let deps = ProjectDependencies::new(project_root.to_path_buf(), paths, build_system);
        self.projects.insert(project_root.to_path_buf(), deps.clone());
        debug!(project = %project_root.display(), "resolved project dependencies");
        Ok(deps)
    }

    /// Double-checked retrieval: read, and only construct on a genuine miss.
    pub fn get_or_create_context(&self, dep_set: &[PathBuf]) -> Result<Arc<dyn ClassLoadingContext>, CacheError> {
        self.contexts.get_or_create(dep_set, self.builder.as_ref())
    }

    /// Removes the project entry and every class-loading context reachable
    /// from it. Keyed by an explicit `project -> set<cache_key>` reverse
    /// index (see DESIGN.md open question 1) rather than substring matching.
    pub fn invalidate_project(&self, root: &Path) {
        self.projects.remove(root);
        self.project_locks.remove(root);
        self.contexts.invalidate_project(root);
    }

    /// Drops every entry, releasing every class-loading context first.
    pub fn invalidate_all(&self) {
        self.projects.clear();
        self.project_locks.clear();
        self.contexts.invalidate_all();
        info!("dependency cache fully invalidated");
    }

    /// Rate-limited: a no-op if called more than once per
    /// `memory_check_interval`. Evicts oldest entries while estimated usage
    /// exceeds `target_memory_mb`.
    pub fn evict_if_needed(&self, target_memory_mb: u64) {
        let mut last = self.last_memory_check.lock().unwrap();
        if let Some(t) = *last {
            if t.elapsed() < self.memory_check_interval {
                return;
            }
        }
        *last = Some(Instant::now());
        drop(last);
        self.contexts.evict_to_target(target_memory_mb);
    }

    pub fn context_count(&self) -> usize {
        self.contexts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedResolver(Vec<PathBuf>);
    impl Resolver for FixedResolver {
        fn resolve(&self, _root: &Path) -> Result<(Vec<PathBuf>, BuildSystem), CacheError> {
            Ok((self.0.clone(), BuildSystem::None))
        }
    }

    struct CountingBuilder {
        invocations: Arc<AtomicUsize>,
    }
    struct DummyContext(Arc<AtomicUsize>);
    impl ClassLoadingContext for DummyContext {
        fn release(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
    impl ContextBuilder for CountingBuilder {
        fn build(&self, _dep_set: &[PathBuf]) -> Result<Arc<dyn ClassLoadingContext>, CacheError> {
            self.invocations.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(DummyContext(Arc::new(AtomicUsize::new(0)))))
        }
    }

    #[test]
    fn resolve_result_is_reused_until_expiry() {
        let cache = DependencyCache::new(
            Arc::new(FixedResolver(vec![PathBuf::from("/a.jar")])),
            Arc::new(CountingBuilder {
                invocations: Arc::new(AtomicUsize::new(0)),
            }),
        );
        let a = cache.get_or_resolve(Path::new("/proj")).unwrap();
        let b = cache.get_or_resolve(Path::new("/proj")).unwrap();
        assert_eq!(a.dependency_paths, b.dependency_paths);
    }

    #[test]
    fn in_place_jar_replacement_forces_re_resolve_before_ttl() {
        let jar = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(jar.path(), b"original jar bytes").unwrap();

        struct CountingResolver {
            path: PathBuf,
            calls: Arc<AtomicUsize>,
        }
        impl Resolver for CountingResolver {
            fn resolve(&self, _root: &Path) -> Result<(Vec<PathBuf>, BuildSystem), CacheError> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Ok((vec![self.path.clone()], BuildSystem::None))
            }
        }

        let calls = Arc::new(AtomicUsize::new(0));
        let cache = DependencyCache::new(
            Arc::new(CountingResolver { path: jar.path().to_path_buf(), calls: Arc::clone(&calls) }),
            Arc::new(CountingBuilder { invocations: Arc::new(AtomicUsize::new(0)) }),
        );

        cache.get_or_resolve(Path::new("/proj")).unwrap();
        cache.get_or_resolve(Path::new("/proj")).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1, "unchanged jar should hit the cache");

        std::fs::write(jar.path(), b"replaced jar with a very different length").unwrap();
        cache.get_or_resolve(Path::new("/proj")).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2, "in-place replacement should force a re-resolve");
    }

    #[test]
    fn invalidate_project_forces_fresh_context_construction() {
        let invocations = Arc::new(AtomicUsize::new(0));
        let cache = DependencyCache::new(
            Arc::new(FixedResolver(vec![])),
            Arc::new(CountingBuilder {
                invocations: Arc::clone(&invocations),
            }),
        );
        let dep_set = vec![PathBuf::from("/proj/a.jar")];
        let first = cache.get_or_create_context(&dep_set).unwrap();
        cache.invalidate_all();
        let second = cache.get_or_create_context(&dep_set).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(invocations.load(Ordering::SeqCst), 2);
    }
}
