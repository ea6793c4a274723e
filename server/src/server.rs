//! Request Dispatcher (C7) / Service Router (C8) glue.
//!
//! `tower-lsp` supplies the JSON-RPC framing, method routing, and the
//! automatic `$/cancelRequest`-driven task abort (spec §4.7); `Backend`
//! binds each LSP method onto the Document Store (C5), Parse Cache (C1),
//! Dependency Cache (C2), and Symbol Index (C3) the way spec §4.8 describes.
//! Grounded on the teacher's `server/src/server.rs` `Backend` shape, with
//! the teacher's own multi-language FQN/inheritance resolution chain
//! dropped — this crate treats type inference as the external, shallow
//! service the spec's non-goals describe (DESIGN.md).

use std::{
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use futures::StreamExt;
use groovy::GroovySupport;
use lsp_core::{
    dependency_cache::DependencyCache,
    document_store::{DocumentStore, Position as DsPosition, Range as DsRange, TextEdit as DsTextEdit},
    error::DocumentError,
    event_bus::EventBus,
    language_support::LanguageSupport,
    lsp_error, lsp_info, lsp_logging,
    ts_helper::get_node_at_position,
};
use tokio::sync::RwLock;
use tower_lsp::{LanguageServer, jsonrpc::Result, lsp_types::*};
use tracing::{debug, warn};

use crate::{
    Indexer, Repository,
    indexer::{FileIndexedEvent, WorkspaceIndexedEvent},
    lsp_convert::{AsLspHover, AsLspLocation, symbol_kind_to_completion, symbol_kind_to_lsp},
    models::symbol::SymbolRow,
};

/// `0.7 * max_memory` target for the Dependency Cache's periodic memory
/// check (spec §4.2 `evict_if_needed`); approximated as a fixed budget since
/// this crate has no portable "process max memory" primitive to sample.
const DEPENDENCY_CACHE_TARGET_MB: u64 = 358;

const WORKSPACE_SYMBOL_CAP: usize = 1000;

pub struct Backend {
    pub client: tower_lsp::Client,
    workspace_root: Arc<RwLock<Option<PathBuf>>>,
    doc_store: Arc<DocumentStore>,
    event_bus: Arc<EventBus>,
    repo: Arc<RwLock<Option<Arc<Repository>>>>,
    indexer: Arc<RwLock<Option<Arc<Indexer>>>>,
    groovy: Arc<GroovySupport>,
    stopping: Arc<AtomicBool>,
}

impl Backend {
    pub fn new(client: tower_lsp::Client) -> Self {
        lsp_logging::init_logging_service(client.clone());
        Self {
            client,
            workspace_root: Arc::new(RwLock::new(None)),
            doc_store: Arc::new(DocumentStore::new()),
            event_bus: Arc::new(EventBus::new()),
            repo: Arc::new(RwLock::new(None)),
            indexer: Arc::new(RwLock::new(None)),
            groovy: Arc::new(GroovySupport::new()),
            stopping: Arc::new(AtomicBool::new(false)),
        }
    }

    fn uri_to_path(uri: &Url) -> Option<PathBuf> {
        uri.to_file_path().ok()
    }

    fn language_of(path: &Path) -> &'static str {
        if crate::constants::is_groovy_family(path) {
            "groovy"
        } else {
            "text"
        }
    }

    /// Snapshot + single-flight parse for an open document (spec §4.1/§4.8
    /// `completion`/`hover`/`definition` suspension point).
    async fn parse_uri(&self, uri: &Url) -> Option<(String, tree_sitter::Tree)> {
        let snapshot = self.doc_store.snapshot(uri.as_str()).ok()?;
        let indexer_guard = self.indexer.read().await;
        let indexer = indexer_guard.as_ref()?;
        let artifact = indexer.parse_cache().parse(snapshot.text.as_bytes(), uri.as_str()).ok()?;
        Some((snapshot.text.to_string(), artifact.tree.clone()))
    }

    /// Best-effort lookup of the symbol whose name equals `name`, preferring
    /// a hit in `preferred_file` (the file the request originated from) over
    /// the first workspace-wide match.
    async fn find_symbol_by_name(&self, name: &str, preferred_file: Option<&str>) -> Option<SymbolRow> {
        let repo = self.repo.read().await.clone()?;
        let mut stream = repo.search_prefix(name);
        let mut fallback: Option<SymbolRow> = None;
        while let Some(row) = stream.next().await {
            let Ok(row) = row else { continue };
            if row.name != name {
                continue;
            }
            if let Some(file) = preferred_file {
                if row.file_path == file {
                    return Some(row);
                }
            }
            if fallback.is_none() {
                fallback = Some(row);
            }
        }
        fallback
    }

    async fn all_symbols_named(&self, name: &str) -> Vec<SymbolRow> {
        let Some(repo) = self.repo.read().await.clone() else {
            return vec![];
        };
        let mut stream = repo.search_prefix(name);
        let mut out = Vec::new();
        while let Some(row) = stream.next().await {
            if let Ok(row) = row {
                if row.name == name {
                    out.push(row);
                }
            }
        }
        out
    }

    fn ident_at(&self, text: &str, tree: &tree_sitter::Tree, position: Position) -> Option<(String, Option<String>)> {
        self.groovy.find_ident_at_position(tree, text, &position)
    }

    /// Runs the initial full scan and wires the periodic dependency-cache
    /// memory monitor (spec §5 "memory checks run on a background timer
    /// every 5 minutes").
    async fn start_indexing(&self, root: PathBuf) {
        let repo = match Repository::open(&root).await {
            Ok(r) => Arc::new(r),
            Err(e) => {
                lsp_error!("failed to open symbol index: {e}");
                std::process::exit(1);
            }
        };
        *self.repo.write().await = Some(Arc::clone(&repo));

        let indexer = Arc::new(Indexer::new(Arc::clone(&repo), Arc::clone(&self.event_bus)));
        *self.indexer.write().await = Some(Arc::clone(&indexer));

        {
            let dep_cache = Arc::clone(indexer.dependency_cache());
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(DependencyCache::DEFAULT_MEMORY_CHECK_INTERVAL);
                loop {
                    ticker.tick().await;
                    dep_cache.evict_if_needed(DEPENDENCY_CACHE_TARGET_MB);
                }
            });
        }

        {
            let client = self.client.clone();
            self.event_bus.subscribe::<WorkspaceIndexedEvent>(move |ev| {
                let msg = format!(
                    "indexed workspace: {} files, {} symbols in {}ms",
                    ev.total_files, ev.total_symbols, ev.duration_ms
                );
                let client = client.clone();
                tokio::spawn(async move {
                    client.log_message(MessageType::INFO, msg).await;
                });
            });
            let client = self.client.clone();
            self.event_bus.subscribe::<FileIndexedEvent>(move |ev| {
                if !ev.success {
                    let client = client.clone();
                    let path = ev.path.clone();
                    tokio::spawn(async move {
                        client.log_message(MessageType::WARNING, format!("failed to index {path}")).await;
                    });
                }
            });
        }

        lsp_info!("indexing workspace {}", root.display());
        let cancel = AtomicBool::new(false);
        if let Err(e) = indexer.index_workspace(&root, &cancel).await {
            lsp_error!("initial scan failed: {e}");
        }
    }

    async fn reindex_file(&self, path: &Path) {
        let root = self.workspace_root.read().await.clone();
        let indexer = self.indexer.read().await.clone();
        if let (Some(root), Some(indexer)) = (root, indexer) {
            if let Err(e) = indexer.update_file(&root, path).await {
                warn!(file = %path.display(), error = %e, "update_file failed");
            }
        }
    }
}

fn to_ds_position(p: Position) -> DsPosition {
    DsPosition { line: p.line, character: p.character }
}

fn to_ds_range(r: Range) -> DsRange {
    DsRange { start: to_ds_position(r.start), end: to_ds_position(r.end) }
}

fn document_symbol_tree(rows: Vec<SymbolRow>) -> Vec<DocumentSymbol> {
    #[allow(deprecated)]
    fn to_symbol(row: &SymbolRow, rows: &[SymbolRow]) -> DocumentSymbol {
        let children: Vec<DocumentSymbol> = rows
            .iter()
            .filter(|r| r.container_id == Some(row.id))
            .map(|r| to_symbol(r, rows))
            .collect();
        DocumentSymbol {
            name: row.name.clone(),
            detail: row.return_type.clone(),
            kind: symbol_kind_to_lsp(row.kind()),
            tags: None,
            deprecated: None,
            range: Range {
                start: Position { line: row.line as u32, character: row.column as u32 },
                end: Position { line: row.line_end as u32, character: row.column_end as u32 },
            },
            selection_range: Range {
                start: Position { line: row.line as u32, character: row.column as u32 },
                end: Position { line: row.line_end as u32, character: row.column_end as u32 },
            },
            children: if children.is_empty() { None } else { Some(children) },
        }
    }
    rows.iter().filter(|r| r.container_id.is_none()).map(|r| to_symbol(r, &rows)).collect()
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let workspace_root = params
            .root_uri
            .and_then(|uri| uri.to_file_path().ok())
            .or_else(|| {
                params
                    .workspace_folders
                    .and_then(|folders| folders.into_iter().next())
                    .and_then(|folder| folder.uri.to_file_path().ok())
            });

        let Some(root) = workspace_root else {
            return Err(tower_lsp::jsonrpc::Error::invalid_params("no workspace root provided"));
        };
        *self.workspace_root.write().await = Some(root);

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::INCREMENTAL)),
                definition_provider: Some(OneOf::Left(true)),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                completion_provider: Some(CompletionOptions::default()),
                document_symbol_provider: Some(OneOf::Left(true)),
                workspace_symbol_provider: Some(OneOf::Left(true)),
                rename_provider: Some(OneOf::Right(RenameOptions {
                    prepare_provider: Some(true),
                    work_done_progress_options: Default::default(),
                })),
                references_provider: Some(OneOf::Left(true)),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "groovy-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        let Some(root) = self.workspace_root.read().await.clone() else {
            return;
        };
        self.start_indexing(root).await;
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        let path = Self::uri_to_path(&uri);
        let language = path.as_deref().map(Self::language_of).unwrap_or("text");
        if let Err(e) = self.doc_store.open(
            uri.as_str(),
            params.text_document.version as i64,
            params.text_document.text,
            language,
        ) {
            debug!(uri = %uri, error = %e, "didOpen rejected");
        }
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let edits: Vec<DsTextEdit> = params
            .content_changes
            .into_iter()
            .map(|c| DsTextEdit { range: c.range.map(to_ds_range), text: c.text })
            .collect();
        if let Err(DocumentError::StaleVersion { uri, incoming, current }) =
            self.doc_store.change(uri.as_str(), params.text_document.version as i64, &edits)
        {
            debug!(uri, incoming, current, "stale didChange notification ignored");
        }
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        if let Some(path) = Self::uri_to_path(&params.text_document.uri) {
            self.reindex_file(&path).await;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.doc_store.close(params.text_document.uri.as_str());
    }

    async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) {
        for change in params.changes {
            if let Some(path) = Self::uri_to_path(&change.uri) {
                self.reindex_file(&path).await;
            }
        }
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;

        let Some((text, tree)) = self.parse_uri(&uri).await else {
            return Ok(None);
        };

        let prefix = line_prefix_at(&text, position);
        let mut items = Vec::new();

        for keyword in groovy::constants::GROOVY_KEYWORDS {
            if keyword.starts_with(&prefix) {
                items.push(CompletionItem {
                    label: keyword.to_string(),
                    kind: Some(CompletionItemKind::KEYWORD),
                    ..Default::default()
                });
            }
        }

        for import in self.groovy.get_imports(&tree, &text) {
            let short = import.trim_end_matches(".*").rsplit('.').next().unwrap_or(&import);
            if short.starts_with(&prefix) {
                items.push(CompletionItem {
                    label: short.to_string(),
                    detail: Some(import.clone()),
                    kind: Some(CompletionItemKind::MODULE),
                    ..Default::default()
                });
            }
        }

        if !prefix.is_empty() {
            if let Some(repo) = self.repo.read().await.clone() {
                let mut stream = repo.search_prefix(&prefix);
                let mut count = 0usize;
                while let Some(row) = stream.next().await {
                    let Ok(row) = row else { continue };
                    items.push(CompletionItem {
                        label: row.name.clone(),
                        kind: Some(symbol_kind_to_completion(row.kind())),
                        detail: row.return_type.clone(),
                        ..Default::default()
                    });
                    count += 1;
                    if count >= 200 {
                        break;
                    }
                }
            }
        }

        Ok(Some(CompletionResponse::Array(items)))
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;
        let path = Self::uri_to_path(&uri);

        let Some((text, tree)) = self.parse_uri(&uri).await else {
            return Ok(None);
        };

        let Some((name, _qualifier)) = self.ident_at(&text, &tree, position) else {
            return Ok(None);
        };

        let preferred = path.as_ref().map(|p| p.to_string_lossy().to_string());
        let Some(row) = self.find_symbol_by_name(&name, preferred.as_deref()).await else {
            return Ok(None);
        };

        Ok(row.as_lsp_hover())
    }

    async fn goto_definition(&self, params: GotoDefinitionParams) -> Result<Option<GotoDefinitionResponse>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;
        let path = Self::uri_to_path(&uri);

        let Some((text, tree)) = self.parse_uri(&uri).await else {
            return Ok(None);
        };
        let Some((name, _qualifier)) = self.ident_at(&text, &tree, position) else {
            return Ok(None);
        };

        let preferred = path.as_ref().map(|p| p.to_string_lossy().to_string());
        let Some(row) = self.find_symbol_by_name(&name, preferred.as_deref()).await else {
            return Ok(None);
        };

        Ok(row.as_lsp_location().map(GotoDefinitionResponse::Scalar))
    }

    async fn document_symbol(&self, params: DocumentSymbolParams) -> Result<Option<DocumentSymbolResponse>> {
        let Some(path) = Self::uri_to_path(&params.text_document.uri) else {
            return Ok(None);
        };
        let Some(repo) = self.repo.read().await.clone() else {
            return Ok(None);
        };
        let rows = repo
            .get_file(&path.to_string_lossy())
            .await
            .map_err(|e| tower_lsp::jsonrpc::Error::invalid_params(e.to_string()))?;
        if rows.is_empty() {
            return Ok(None);
        }
        Ok(Some(DocumentSymbolResponse::Nested(document_symbol_tree(rows))))
    }

    #[allow(deprecated)]
    async fn symbol(&self, params: WorkspaceSymbolParams) -> Result<Option<Vec<SymbolInformation>>> {
        let Some(repo) = self.repo.read().await.clone() else {
            return Ok(Some(vec![]));
        };
        let mut stream = repo.search_prefix(&params.query);
        let mut out = Vec::new();
        while let Some(row) = stream.next().await {
            let Ok(row) = row else { continue };
            let Some(location) = row.as_lsp_location() else { continue };
            out.push(SymbolInformation {
                name: row.name.clone(),
                kind: symbol_kind_to_lsp(row.kind()),
                tags: None,
                deprecated: None,
                location,
                container_name: row.container_name.clone(),
            });
            if out.len() >= WORKSPACE_SYMBOL_CAP {
                break;
            }
        }
        Ok(Some(out))
    }

    async fn prepare_rename(&self, params: TextDocumentPositionParams) -> Result<Option<PrepareRenameResponse>> {
        let uri = params.text_document.uri;
        let position = params.position;
        let Some((text, tree)) = self.parse_uri(&uri).await else {
            return Ok(None);
        };
        let node = get_node_at_position(&tree, &text, &position);
        let Some(node) = node else { return Ok(None) };
        let range = self.groovy.get_ident_range(&node);
        Ok(range.map(PrepareRenameResponse::Range))
    }

    async fn rename(&self, params: RenameParams) -> Result<Option<WorkspaceEdit>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;
        let new_name = params.new_name;

        let Some((text, tree)) = self.parse_uri(&uri).await else {
            return Ok(None);
        };
        let Some((name, _qualifier)) = self.ident_at(&text, &tree, position) else {
            return Ok(None);
        };

        let targets = self.all_symbols_named(&name).await;
        if targets.is_empty() {
            return Ok(None);
        }

        let mut changes: std::collections::HashMap<Url, Vec<TextEdit>> = std::collections::HashMap::new();
        for row in targets {
            let Some(target_uri) = Url::from_file_path(&row.file_path).ok() else { continue };
            let edit = TextEdit {
                range: Range {
                    start: Position { line: row.line as u32, character: row.column as u32 },
                    end: Position { line: row.line_end as u32, character: row.column_end as u32 },
                },
                new_text: new_name.clone(),
            };
            changes.entry(target_uri).or_default().push(edit);
        }

        Ok(Some(WorkspaceEdit { changes: Some(changes), ..Default::default() }))
    }

    async fn references(&self, params: ReferenceParams) -> Result<Option<Vec<Location>>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;

        let Some((text, tree)) = self.parse_uri(&uri).await else {
            return Ok(None);
        };
        let Some((name, _qualifier)) = self.ident_at(&text, &tree, position) else {
            return Ok(None);
        };

        let locations: Vec<Location> =
            self.all_symbols_named(&name).await.iter().filter_map(|row| row.as_lsp_location()).collect();
        if locations.is_empty() { Ok(None) } else { Ok(Some(locations)) }
    }

    async fn did_change_configuration(&self, _: DidChangeConfigurationParams) {
        debug!("workspace/didChangeConfiguration received; no server-side settings are consumed");
    }

    /// No formatter rule catalogue is part of this core (spec non-goal); the
    /// method is bound so the wire protocol's minimum method set (§6) is
    /// satisfied, but it never produces edits.
    async fn formatting(&self, _: DocumentFormattingParams) -> Result<Option<Vec<TextEdit>>> {
        Ok(None)
    }

    /// No quick-fix rule catalogue is part of this core (spec non-goal); see
    /// `formatting` above.
    async fn code_action(&self, _: CodeActionParams) -> Result<Option<CodeActionResponse>> {
        Ok(None)
    }

    async fn shutdown(&self) -> Result<()> {
        self.stopping.store(true, Ordering::SeqCst);
        if let Some(indexer) = self.indexer.read().await.as_ref() {
            indexer.dependency_cache().invalidate_all();
        }
        if let Some(repo) = self.repo.read().await.as_ref() {
            if let Err(e) = repo.close().await {
                warn!(error = %e, "error closing symbol index on shutdown");
            }
        }
        // Gives any in-flight worker-pool tasks a moment to observe the
        // stopping flag before the process exits (spec §5 shutdown order).
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(())
    }
}

/// Identifier characters typed immediately before `position` on its line,
/// used as the completion prefix (spec §4.8 "gather candidates").
fn line_prefix_at(text: &str, position: Position) -> String {
    let Some(line) = text.lines().nth(position.line as usize) else {
        return String::new();
    };
    let chars: Vec<char> = line.chars().collect();
    let end = (position.character as usize).min(chars.len());
    let mut start = end;
    while start > 0 && (chars[start - 1].is_alphanumeric() || chars[start - 1] == '_') {
        start -= 1;
    }
    chars[start..end].iter().collect()
}
