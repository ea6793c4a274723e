//! ProjectDeps sub-cache: project root -> resolved dependency paths.
//!
//! Entries expire after `MAX_AGE_MS` (default 24h, see [`super::DependencyCache::DEFAULT_MAX_AGE`])
//! or when the caller observes a build-descriptor change and calls
//! [`super::DependencyCache::invalidate_project`].

use std::{
    path::{Path, PathBuf},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use sha2::{Digest, Sha256};

use crate::error::CacheError;

/// Hashes the sorted-unique path list together with each path's current
/// `(mtime, len)`, so an external JAR replaced in place (same path, new
/// bytes) changes the fingerprint even though the path itself did not.
/// Paths that can't be stat'd (already removed, permission denied) hash as
/// `(0, 0)`, which still differs from a real file's fingerprint.
fn content_fingerprint(paths: &[PathBuf]) -> [u8; 32] {
    let mut sorted: Vec<&PathBuf> = paths.iter().collect();
    sorted.sort();
    sorted.dedup();
    let mut hasher = Sha256::new();
    for p in sorted {
        hasher.update(p.to_string_lossy().as_bytes());
        hasher.update([0u8]);
        let (mtime_secs, len) = std::fs::metadata(p)
            .map(|m| {
                let secs = m
                    .modified()
                    .ok()
                    .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                    .map(|d| d.as_secs())
                    .unwrap_or(0);
                (secs, m.len())
            })
            .unwrap_or((0, 0));
        hasher.update(mtime_secs.to_le_bytes());
        hasher.update(len.to_le_bytes());
    }
    hasher.finalize().into()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildSystem {
    Gradle,
    Maven,
    None,
}

/// External dependency resolver capability. `CacheError` is the only error
/// surfaced to callers; cache mechanics themselves never fail.
pub trait Resolver: Send + Sync {
    fn resolve(&self, project_root: &Path) -> Result<(Vec<PathBuf>, BuildSystem), CacheError>;
}

#[derive(Debug, Clone)]
pub struct ProjectDependencies {
    pub project_root: PathBuf,
    pub dependency_paths: Vec<PathBuf>,
    pub build_system: BuildSystem,
    pub resolved_at: SystemTime,
    /// Fingerprint of the dependency path list's `(path, mtime, len)` tuples
    /// at resolution time, compared against the current on-disk fingerprint
    /// by [`Self::is_stale`] so an in-place JAR replacement is caught without
    /// waiting on `MAX_AGE_MS` (see DESIGN.md open question 2).
    pub content_hash: [u8; 32],
}

impl ProjectDependencies {
    pub fn new(project_root: PathBuf, dependency_paths: Vec<PathBuf>, build_system: BuildSystem) -> Self {
        let content_hash = content_fingerprint(&dependency_paths);
        Self {
            project_root,
            dependency_paths,
            build_system,
            resolved_at: SystemTime::now(),
            content_hash,
        }
    }

    pub fn is_expired(&self, max_age: Duration) -> bool {
        self.resolved_at
            .elapsed()
            .map(|elapsed| elapsed > max_age)
            .unwrap_or(false)
    }

    /// True if any dependency path's current `(mtime, len)` no longer
    /// matches what was observed at resolution time.
    pub fn is_stale(&self) -> bool {
        content_fingerprint(&self.dependency_paths) != self.content_hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_entry_is_not_expired() {
        let deps = ProjectDependencies::new(PathBuf::from("/proj"), vec![], BuildSystem::None);
        assert!(!deps.is_expired(Duration::from_secs(60)));
    }

    #[test]
    fn zero_max_age_expires_immediately() {
        let deps = ProjectDependencies::new(PathBuf::from("/proj"), vec![], BuildSystem::None);
        std::thread::sleep(Duration::from_millis(2));
        assert!(deps.is_expired(Duration::from_millis(1)));
    }

    #[test]
    fn content_hash_changes_when_paths_differ() {
        let a = ProjectDependencies::new(PathBuf::from("/p"), vec![PathBuf::from("/a.jar")], BuildSystem::None);
        let b = ProjectDependencies::new(PathBuf::from("/p"), vec![PathBuf::from("/b.jar")], BuildSystem::None);
        assert_ne!(a.content_hash, b.content_hash);
    }

    #[test]
    fn is_stale_detects_in_place_jar_replacement() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"original jar bytes").unwrap();

        let deps =
            ProjectDependencies::new(PathBuf::from("/proj"), vec![file.path().to_path_buf()], BuildSystem::None);
        assert!(!deps.is_stale());

        std::fs::write(file.path(), b"replaced jar with a very different length").unwrap();
        assert!(deps.is_stale());
    }

    #[test]
    fn is_stale_is_false_when_nothing_on_disk_changed() {
        let deps = ProjectDependencies::new(PathBuf::from("/proj"), vec![PathBuf::from("/a.jar")], BuildSystem::None);
        assert!(!deps.is_stale());
    }
}
