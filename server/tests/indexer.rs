use std::sync::{Arc, atomic::AtomicBool};

use lsp_core::{event_bus::EventBus, symbols::SymbolKind};
use server::{Indexer, Repository};
use tempfile::TempDir;

async fn open_repo(root: &std::path::Path) -> Arc<Repository> {
    Arc::new(Repository::open(root).await.expect("failed to open symbol index"))
}

#[tokio::test(flavor = "multi_thread")]
async fn index_workspace_finds_class_and_method_symbols() {
    let root = TempDir::new().unwrap();
    std::fs::write(
        root.path().join("User.groovy"),
        "package com.example\n\nclass User {\n    String name\n\n    String greet() {\n        return \"hi, \" + name\n    }\n}\n",
    )
    .unwrap();

    let repo = open_repo(root.path()).await;
    let indexer = Indexer::new(Arc::clone(&repo), Arc::new(EventBus::new()));
    indexer.index_workspace(root.path(), &AtomicBool::new(false)).await.expect("scan failed");

    let file_path = root.path().join("User.groovy").to_string_lossy().to_string();
    let symbols = repo.get_file(&file_path).await.expect("get_file failed");

    assert!(symbols.iter().any(|s| s.name == "User" && s.kind() == SymbolKind::Class));
    assert!(symbols.iter().any(|s| s.name == "greet" && s.kind() == SymbolKind::Method));
    assert!(symbols.iter().any(|s| s.name == "name" && s.kind() == SymbolKind::Field));
}

#[tokio::test(flavor = "multi_thread")]
async fn index_workspace_skips_excluded_directories() {
    let root = TempDir::new().unwrap();
    std::fs::create_dir_all(root.path().join("build")).unwrap();
    std::fs::write(root.path().join("build/Generated.groovy"), "class Generated {}\n").unwrap();
    std::fs::write(root.path().join("Real.groovy"), "class Real {}\n").unwrap();

    let repo = open_repo(root.path()).await;
    let indexer = Indexer::new(Arc::clone(&repo), Arc::new(EventBus::new()));
    indexer.index_workspace(root.path(), &AtomicBool::new(false)).await.expect("scan failed");

    let mut results = repo.search_prefix("Gen");
    use futures::StreamExt;
    assert!(results.next().await.is_none(), "build/ output should not be indexed");

    let real_path = root.path().join("Real.groovy").to_string_lossy().to_string();
    assert!(!repo.get_file(&real_path).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn update_file_reindexes_after_edit() {
    let root = TempDir::new().unwrap();
    let file = root.path().join("Widget.groovy");
    std::fs::write(&file, "class Widget {\n    String a\n}\n").unwrap();

    let repo = open_repo(root.path()).await;
    let indexer = Indexer::new(Arc::clone(&repo), Arc::new(EventBus::new()));
    indexer.index_workspace(root.path(), &AtomicBool::new(false)).await.expect("scan failed");

    std::fs::write(&file, "class Widget {\n    String a\n    String b\n}\n").unwrap();
    indexer.update_file(root.path(), &file).await.expect("update_file failed");

    let symbols = repo.get_file(&file.to_string_lossy()).await.expect("get_file failed");
    assert!(symbols.iter().any(|s| s.name == "a"));
    assert!(symbols.iter().any(|s| s.name == "b"));
}
