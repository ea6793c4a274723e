pub mod gradle;
pub mod no_build_tool;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Result;

use crate::{
    build_tools::{gradle::GradleHandler, no_build_tool::NoBuildTool},
    dependency_cache::{BuildSystem, ClassLoadingContext, ContextBuilder, Resolver},
    error::CacheError,
};

#[derive(Debug, Clone, PartialEq)]
pub enum BuildTool {
    Gradle,
    Maven,
}

pub fn get_build_tool(root: &Path) -> Arc<dyn BuildToolHandler> {
    let providers: Vec<Arc<dyn BuildToolHandler>> = vec![Arc::new(GradleHandler)];
    providers
        .into_iter()
        .find(|p| p.is_project(root))
        .unwrap_or_else(|| Arc::new(NoBuildTool))
}

pub trait BuildToolHandler: Send + Sync {
    fn is_project(&self, root: &Path) -> bool;
    fn get_dependency_paths(&self, root: &Path) -> Result<Vec<(PathBuf, Option<PathBuf>)>>;
    fn get_jdk_dependency_path(&self, root: &Path) -> Result<Option<PathBuf>> {
        let _ = root;
        Ok(None)
    }
    fn build_system(&self) -> BuildSystem {
        BuildSystem::None
    }
}

/// Adapts the autodetecting [`BuildToolHandler`] chain to the Dependency
/// Cache's `Resolver` capability (spec §4.2 `get_or_resolve`). Bytecode jars
/// and their matched `-sources.jar` (when present) both become classpath
/// entries; JDK sources are appended the same way `server::indexer` used to
/// thread them through by hand.
pub struct BuildToolResolver;

impl Resolver for BuildToolResolver {
    fn resolve(&self, project_root: &Path) -> Result<(Vec<PathBuf>, BuildSystem), CacheError> {
        let handler = get_build_tool(project_root);
        let deps = handler
            .get_dependency_paths(project_root)
            .map_err(|e| CacheError(e.to_string()))?;

        let mut paths: Vec<PathBuf> = Vec::new();
        for (bytecode, source) in deps {
            paths.push(bytecode);
            if let Some(src) = source {
                paths.push(src);
            }
        }
        if let Ok(Some(jdk_src)) = handler.get_jdk_dependency_path(project_root) {
            paths.push(jdk_src);
        }

        Ok((paths, handler.build_system()))
    }
}

/// A classpath entry set, held open for symbolic (never: loaded-class)
/// access. Constructing one is cheap — it is just the resolved path list —
/// since concrete type resolution over it is the external `infer()` service
/// this crate treats as a black box (spec §1 non-goals).
pub struct PathClassLoadingContext {
    pub paths: Vec<PathBuf>,
}

impl ClassLoadingContext for PathClassLoadingContext {
    fn release(&self) {}
}

pub struct PathContextBuilder;

impl ContextBuilder for PathContextBuilder {
    fn build(&self, dep_set: &[PathBuf]) -> Result<Arc<dyn ClassLoadingContext>, CacheError> {
        Ok(Arc::new(PathClassLoadingContext {
            paths: dep_set.to_vec(),
        }))
    }
}
