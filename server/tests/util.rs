use std::path::Path;

use tempfile::TempDir;
use tower_lsp::{
    ClientSocket, LanguageServer, LspService,
    lsp_types::{
        DidOpenTextDocumentParams, InitializeParams, InitializedParams, Position, TextDocumentItem, Url,
        WorkspaceFolder,
    },
};

use server::Backend;

pub struct TestServer {
    pub backend: Backend,
    pub root: TempDir,
    _socket: ClientSocket,
}

impl TestServer {
    /// Writes `files` (path relative to the workspace root, contents) to a
    /// fresh temp directory, then runs the server's full `initialize` /
    /// `initialized` sequence (including the synchronous initial scan)
    /// against it.
    pub async fn new(files: &[(&str, &str)]) -> Self {
        let root = TempDir::new().expect("failed to create temp workspace");
        for (rel_path, contents) in files {
            let full = root.path().join(rel_path);
            if let Some(parent) = full.parent() {
                std::fs::create_dir_all(parent).expect("failed to create fixture dir");
            }
            std::fs::write(&full, contents).expect("failed to write fixture file");
        }

        let (service, socket) = LspService::new(Backend::new);
        let backend = service.inner().clone();

        let root_uri = Url::from_directory_path(root.path()).expect("cannot build root URI");
        let init_params = InitializeParams {
            root_uri: Some(root_uri.clone()),
            workspace_folders: Some(vec![WorkspaceFolder {
                uri: root_uri,
                name: "test".to_string(),
            }]),
            ..Default::default()
        };
        backend.initialize(init_params).await.expect("initialize failed");
        backend.initialized(InitializedParams {}).await;

        Self { backend, root, _socket: socket }
    }

    pub fn file_uri(&self, rel_path: &str) -> Url {
        Url::from_file_path(self.root.path().join(rel_path)).expect("cannot build file URI")
    }

    /// Opens `rel_path` in the Document Store the way a client's `didOpen`
    /// notification would, so `hover`/`definition`/`completion` can parse it.
    pub async fn open(&self, rel_path: &str, text: &str) {
        self.backend
            .did_open(DidOpenTextDocumentParams {
                text_document: TextDocumentItem {
                    uri: self.file_uri(rel_path),
                    language_id: "groovy".to_string(),
                    version: 1,
                    text: text.to_string(),
                },
            })
            .await;
    }

    pub fn path(&self, rel_path: &str) -> std::path::PathBuf {
        self.root.path().join(rel_path)
    }
}

pub fn read_fixture(root: &Path, rel_path: &str) -> String {
    std::fs::read_to_string(root.join(rel_path)).expect("failed to read fixture back")
}

/// Position of the first character of `needle`'s first occurrence in `text`.
/// Locating positions this way (rather than hand-counted line/column
/// literals) keeps fixtures readable without the tests drifting out of sync
/// with them.
pub fn position_of(text: &str, needle: &str) -> Position {
    let idx = text.find(needle).unwrap_or_else(|| panic!("{needle:?} not found in fixture"));
    position_at_byte(text, idx)
}

/// Position immediately after `needle`'s first occurrence in `text`.
pub fn position_after(text: &str, needle: &str) -> Position {
    let idx = text.find(needle).unwrap_or_else(|| panic!("{needle:?} not found in fixture"));
    position_at_byte(text, idx + needle.len())
}

fn position_at_byte(text: &str, idx: usize) -> Position {
    let mut line = 0u32;
    let mut col = 0u32;
    for ch in text[..idx].chars() {
        if ch == '\n' {
            line += 1;
            col = 0;
        } else {
            col += 1;
        }
    }
    Position { line, character: col }
}
