//! Indexable extensions and build descriptors (spec §4.4 initial scan step 2).

pub const INDEXABLE_EXTENSIONS: &[&str] = &["groovy", "gvy", "gy", "gsh", "java", "gradle", "kts"];

/// Extensions whose symbols this implementation actually extracts (Groovy
/// family); the rest of `INDEXABLE_EXTENSIONS` is walked and recorded but
/// produces no symbols, since Java/Kotlin support is out of scope (DESIGN.md).
pub const GROOVY_EXTENSIONS: &[&str] = &["groovy", "gvy", "gy", "gsh"];

pub const BUILD_DESCRIPTORS: &[&str] = &[
    "build.gradle",
    "build.gradle.kts",
    "settings.gradle",
    "settings.gradle.kts",
    "pom.xml",
];

pub fn is_build_descriptor(file_name: &str) -> bool {
    BUILD_DESCRIPTORS.contains(&file_name)
}

pub fn extension_of(path: &std::path::Path) -> Option<&str> {
    path.extension().and_then(|e| e.to_str())
}

pub fn is_indexable(path: &std::path::Path) -> bool {
    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        if is_build_descriptor(name) {
            return true;
        }
    }
    extension_of(path)
        .map(|ext| INDEXABLE_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

pub fn is_groovy_family(path: &std::path::Path) -> bool {
    extension_of(path)
        .map(|ext| GROOVY_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}
