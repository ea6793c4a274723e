//! Indexer (C4): initial workspace scan, incremental single-file updates,
//! and dependency-jar class-file symbol synthesis (spec §4.4).
//!
//! Grounded on `server/src/indexer.rs`'s original shape (`WalkDir` +
//! `classfile-parser`/`zip` jar handling), rewired onto the Parse Cache (C1),
//! Dependency Cache (C2), and `groovy::symbols::extract_symbols` rather than
//! the teacher's own cross-language FQN/`dfs` walker.

use std::{
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Instant,
};

use classfile_parser::{ClassAccessFlags, class_parser, constant_info::ConstantInfo};
use groovy::{groovy_support::GroovySupport, symbols::extract_symbols};
use lsp_core::{
    build_tools::{BuildToolResolver, PathContextBuilder},
    dependency_cache::DependencyCache,
    error::{IndexError, ParseError},
    event_bus::EventBus,
    language_support::LanguageSupport,
    parse_cache::ParseCache,
    symbols::{ExtractedSymbol, SymbolKind},
};
use tracing::{debug, warn};
use walkdir::WalkDir;
use zip::ZipArchive;

use crate::{
    constants::{is_build_descriptor, is_groovy_family, is_indexable},
    repo::Repository,
};

/// Spec §3 `FileIndexedEvent`.
#[derive(Debug, Clone)]
pub struct FileIndexedEvent {
    pub path: String,
    pub success: bool,
    pub symbol_count: usize,
}

/// Spec §3 `WorkspaceIndexedEvent`.
#[derive(Debug, Clone)]
pub struct WorkspaceIndexedEvent {
    pub workspace_path: String,
    pub total_files: usize,
    pub total_symbols: usize,
    pub duration_ms: u128,
}

pub struct Indexer {
    repo: Arc<Repository>,
    parse_cache: Arc<ParseCache>,
    dependency_cache: Arc<DependencyCache>,
    groovy: Arc<GroovySupport>,
    event_bus: Arc<EventBus>,
}

impl Indexer {
    pub fn new(repo: Arc<Repository>, event_bus: Arc<EventBus>) -> Self {
        let groovy = Arc::new(GroovySupport::new());
        let groovy_for_parse = Arc::clone(&groovy);
        let parse_cache = Arc::new(ParseCache::new(
            ParseCache::DEFAULT_CAPACITY,
            move |bytes, name| {
                let source = std::str::from_utf8(bytes).map_err(|e| ParseError::Io {
                    source_name: name.to_string(),
                    message: e.to_string(),
                })?;
                groovy_for_parse
                    .parse_str(source)
                    .map(|(tree, _)| tree)
                    .ok_or_else(|| ParseError::Syntax {
                        source_name: name.to_string(),
                        message: "parser produced no tree".to_string(),
                    })
            },
        ));
        let dependency_cache = Arc::new(DependencyCache::new(
            Arc::new(BuildToolResolver),
            Arc::new(PathContextBuilder),
        ));

        Self {
            repo,
            parse_cache,
            dependency_cache,
            groovy,
            event_bus,
        }
    }

    pub fn dependency_cache(&self) -> &Arc<DependencyCache> {
        &self.dependency_cache
    }

    pub fn parse_cache(&self) -> &Arc<ParseCache> {
        &self.parse_cache
    }

    /// Initial full scan (spec §4.4). `cancel` is polled between files; a
    /// per-file parse is never cancelled mid-flight (it runs under C1's
    /// shared-parse discipline).
    pub async fn index_workspace(
        &self,
        workspace_root: &Path,
        cancel: &AtomicBool,
    ) -> Result<(), IndexError> {
        let start = Instant::now();

        let deps = self
            .dependency_cache
            .get_or_resolve(workspace_root)
            .map_err(|e| IndexError::Query(e.to_string()))?;

        let files: Vec<PathBuf> = WalkDir::new(workspace_root)
            .into_iter()
            .filter_entry(|e| !is_excluded(e))
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.path().to_path_buf())
            .filter(|p| is_indexable(p))
            .collect();

        let mut total_symbols = 0usize;
        let mut scanned = 0usize;
        for path in &files {
            if cancel.load(Ordering::SeqCst) {
                debug!(scanned, total = files.len(), "initial scan cancelled");
                break;
            }
            total_symbols += self.index_file(path).await;
            scanned += 1;
        }

        for dep_path in &deps.dependency_paths {
            if dep_path.extension().and_then(|e| e.to_str()) == Some("jar") {
                if let Err(e) = self.index_jar(dep_path).await {
                    warn!(jar = %dep_path.display(), error = %e, "failed to index dependency jar");
                }
            }
        }

        self.event_bus.publish(WorkspaceIndexedEvent {
            workspace_path: workspace_root.display().to_string(),
            total_files: scanned,
            total_symbols,
            duration_ms: start.elapsed().as_millis(),
        });

        Ok(())
    }

    /// Incremental single-file update (spec §4.4).
    pub async fn update_file(&self, workspace_root: &Path, path: &Path) -> Result<(), IndexError> {
        let path_str = path.to_string_lossy().to_string();

        if !path.exists() {
            self.repo.remove_file(&path_str).await?;
            return Ok(());
        }

        let is_descriptor = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(is_build_descriptor)
            .unwrap_or(false);
        if is_descriptor {
            self.dependency_cache.invalidate_project(workspace_root);
            let cancel = AtomicBool::new(false);
            return self.index_workspace(workspace_root, &cancel).await;
        }

        if is_indexable(path) {
            let count = self.index_file(path).await;
            self.event_bus.publish(FileIndexedEvent {
                path: path_str,
                success: true,
                symbol_count: count,
            });
        }

        Ok(())
    }

    /// Parses, extracts, and persists symbols for one workspace file.
    /// Returns the number of symbols written (0 on any failure, which is
    /// surfaced as `FileIndexedEvent{success: false}` rather than aborting
    /// the caller).
    async fn index_file(&self, path: &Path) -> usize {
        let path_str = path.to_string_lossy().to_string();

        if !is_groovy_family(path) {
            // Java/Gradle/build-descriptor files are tracked (so descriptor
            // changes still trigger re-index) but produce no symbols: Java
            // and Kotlin cross-language support is out of scope (DESIGN.md).
            if let Err(e) = self.repo.put_file(&path_str, vec![]).await {
                warn!(file = %path.display(), error = %e, "put_file failed");
                self.event_bus.publish(FileIndexedEvent {
                    path: path_str,
                    success: false,
                    symbol_count: 0,
                });
            }
            return 0;
        }

        let source = match tokio::fs::read_to_string(path).await {
            Ok(s) => s,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "failed to read file");
                self.event_bus.publish(FileIndexedEvent {
                    path: path_str,
                    success: false,
                    symbol_count: 0,
                });
                return 0;
            }
        };

        let artifact = match self.parse_cache.parse(source.as_bytes(), &path_str) {
            Ok(a) => a,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "parse failed");
                self.event_bus.publish(FileIndexedEvent {
                    path: path_str,
                    success: false,
                    symbol_count: 0,
                });
                return 0;
            }
        };

        let symbols = extract_symbols(&self.groovy, &artifact.tree, &source);
        let count = symbols.len();
        if let Err(e) = self.repo.put_file(&path_str, symbols).await {
            warn!(file = %path.display(), error = %e, "put_file failed");
            self.event_bus.publish(FileIndexedEvent {
                path: path_str,
                success: false,
                symbol_count: 0,
            });
            return 0;
        }
        count
    }

    /// Enumerates class-file entries in `jar_path` and synthesises one CLASS
    /// (or INTERFACE/ENUM) symbol per public top-level class at
    /// `(line=0, column=0)` (spec §4.4 step 4). Method/field-level extraction
    /// from dependency jars stays out of scope (DESIGN.md open question 3).
    async fn index_jar(&self, jar_path: &Path) -> anyhow::Result<()> {
        let owned = jar_path.to_path_buf();
        let for_blocking = owned.clone();
        let symbols =
            tokio::task::spawn_blocking(move || extract_jar_symbols(&for_blocking)).await??;
        if !symbols.is_empty() {
            let key = owned.to_string_lossy().to_string();
            self.repo.put_file(&key, symbols).await?;
        }
        Ok(())
    }
}

fn is_excluded(entry: &walkdir::DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| matches!(s, "build" | "target" | ".gradle" | ".git" | "out" | "bin" | ".groovy-lsp"))
        .unwrap_or(false)
}

fn should_skip_jar(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    name.ends_with("-tests.jar") || name.ends_with("-test.jar") || name.ends_with("-javadoc.jar")
}

fn extract_jar_symbols(jar_path: &Path) -> anyhow::Result<Vec<ExtractedSymbol>> {
    use std::io::Read;

    if should_skip_jar(jar_path) {
        return Ok(vec![]);
    }

    let file = std::fs::File::open(jar_path)?;
    let mut archive = ZipArchive::new(file)?;
    let mut symbols = Vec::new();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();
        if !name.ends_with(".class") || name.ends_with("module-info.class") || name.contains('$') {
            continue;
        }
        let mut buffer = Vec::new();
        entry.read_to_end(&mut buffer)?;
        drop(entry);

        let Ok((_, class)) = class_parser(&buffer) else {
            continue;
        };
        if !class.access_flags.contains(ClassAccessFlags::PUBLIC) {
            continue;
        }
        let Ok(class_name) = get_class_name(&class.const_pool, class.this_class) else {
            continue;
        };
        let class_name = class_name.replace('/', ".");

        let package_name = class_name.rfind('.').map(|i| class_name[..i].to_string());
        let short_name = class_name
            .rfind('.')
            .map(|i| class_name[i + 1..].to_string())
            .unwrap_or_else(|| class_name.clone());

        let kind = if class.access_flags.contains(ClassAccessFlags::INTERFACE) {
            SymbolKind::Interface
        } else if class.access_flags.contains(ClassAccessFlags::ENUM) {
            SymbolKind::Enum
        } else {
            SymbolKind::Class
        };

        let mut sym = ExtractedSymbol::new(short_name, kind, 0, 0);
        sym.modifiers = class_access_to_modifiers(class.access_flags);
        sym.package_name = package_name;
        symbols.push(sym);
    }

    Ok(symbols)
}

fn get_utf8(pool: &[ConstantInfo], index: u16) -> anyhow::Result<String> {
    match &pool[(index - 1) as usize] {
        ConstantInfo::Utf8(s) => Ok(s.utf8_string.clone()),
        _ => Err(anyhow::anyhow!("not a UTF8 constant")),
    }
}

fn get_class_name(pool: &[ConstantInfo], index: u16) -> anyhow::Result<String> {
    match &pool[(index - 1) as usize] {
        ConstantInfo::Class(c) => get_utf8(pool, c.name_index),
        _ => Err(anyhow::anyhow!("not a Class constant")),
    }
}

fn class_access_to_modifiers(flags: ClassAccessFlags) -> Vec<String> {
    let mut mods = Vec::new();
    if flags.contains(ClassAccessFlags::PUBLIC) {
        mods.push("public".to_string());
    }
    if flags.contains(ClassAccessFlags::FINAL) {
        mods.push("final".to_string());
    }
    if flags.contains(ClassAccessFlags::ABSTRACT) {
        mods.push("abstract".to_string());
    }
    mods
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use tempfile::tempdir;

    async fn new_indexer() -> (Indexer, Arc<Repository>) {
        let repo = Arc::new(Repository::open_in_memory().await.unwrap());
        let bus = Arc::new(EventBus::new());
        (Indexer::new(Arc::clone(&repo), bus), repo)
    }

    #[tokio::test]
    async fn indexes_a_small_workspace() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("A.groovy"), "class A { def m() {} }").unwrap();
        std::fs::write(
            dir.path().join("B.groovy"),
            "class B extends A { String s }",
        )
        .unwrap();

        let (indexer, repo) = new_indexer().await;
        let cancel = AtomicBool::new(false);
        indexer.index_workspace(dir.path(), &cancel).await.unwrap();

        let a_path = dir.path().join("A.groovy").to_string_lossy().to_string();
        let rows = repo.get_file(&a_path).await.unwrap();
        assert!(rows.iter().any(|r| r.name == "A"));
        assert!(rows.iter().any(|r| r.name == "m"));
    }

    #[tokio::test]
    async fn update_file_removes_deleted_files() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("A.groovy");
        std::fs::write(&file, "class A {}").unwrap();

        let (indexer, repo) = new_indexer().await;
        indexer.update_file(dir.path(), &file).await.unwrap();
        assert!(!repo.get_file(&file.to_string_lossy()).await.unwrap().is_empty());

        std::fs::remove_file(&file).unwrap();
        indexer.update_file(dir.path(), &file).await.unwrap();
        assert!(repo.get_file(&file.to_string_lossy()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_groovy_indexable_files_are_tracked_without_symbols() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("Main.java");
        std::fs::write(&file, "public class Main {}").unwrap();

        let (indexer, repo) = new_indexer().await;
        indexer.update_file(dir.path(), &file).await.unwrap();
        assert!(repo.get_file(&file.to_string_lossy()).await.unwrap().is_empty());
    }
}
