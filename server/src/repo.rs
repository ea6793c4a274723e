//! Symbol Index (C3): transactional forward/inverted symbol store, single
//! writer enforced by an OS-level file lock.
//!
//! Grounded on the teacher's (un-compiled) `src/core/persistence.rs` schema
//! shape, ported onto the teacher's compiled `sqlx`/SQLite stack. The cache
//! directory convention is the spec's `<workspace>/.groovy-lsp/index/`, not
//! the teacher's `dirs::cache_dir()`.

use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
    pin::Pin,
    time::Duration,
};

use fs2::FileExt;
use futures::{Stream, StreamExt};
use lsp_core::{error::IndexError, symbols::ExtractedSymbol};
use sqlx::{
    Row,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    types::Json,
};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::models::symbol::SymbolRow;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS symbols (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    file_path TEXT NOT NULL,
    name TEXT NOT NULL,
    kind TEXT NOT NULL,
    line INTEGER NOT NULL,
    column INTEGER NOT NULL,
    line_end INTEGER NOT NULL,
    column_end INTEGER NOT NULL,
    container_id INTEGER,
    container_name TEXT,
    modifiers TEXT NOT NULL,
    annotations TEXT NOT NULL,
    documentation TEXT,
    return_type TEXT,
    parameters TEXT NOT NULL,
    extends TEXT,
    implements TEXT NOT NULL,
    package_name TEXT
);
CREATE INDEX IF NOT EXISTS idx_symbols_file ON symbols(file_path);
CREATE INDEX IF NOT EXISTS idx_symbols_name ON symbols(name, file_path, line);

CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

fn query_err(e: sqlx::Error) -> IndexError {
    IndexError::Query(e.to_string())
}

/// Persistent, crash-safe mapping from workspace file paths to the symbols
/// they declare, with an inverted name-prefix lookup (spec §4.3).
pub struct Repository {
    pool: sqlx::SqlitePool,
    lock_file: std::fs::File,
}

impl Repository {
    /// Opens (creating if absent) the index under `<workspace_root>/.groovy-lsp/index/`.
    /// Retries lock acquisition for 30s before giving up with `IndexError::Locked`
    /// (spec §7 propagation policy).
    pub async fn open(workspace_root: &Path) -> Result<Self, IndexError> {
        let index_dir = workspace_root.join(".groovy-lsp").join("index");
        if index_dir.exists() && !index_dir.is_dir() {
            return Err(IndexError::LocationConflict(index_dir.display().to_string()));
        }
        fs::create_dir_all(&index_dir)?;

        let lock_path = index_dir.join(".lock");
        let lock_file = OpenOptions::new().create(true).write(true).open(&lock_path)?;

        let deadline = tokio::time::Instant::now() + Duration::from_secs(30);
        loop {
            match lock_file.try_lock_exclusive() {
                Ok(()) => break,
                Err(_) if tokio::time::Instant::now() < deadline => {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                }
                Err(_) => return Err(IndexError::Locked),
            }
        }

        let db_path = index_dir.join("symbols.db");
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .journal_mode(SqliteJournalMode::Wal)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(query_err)?;

        sqlx::query(SCHEMA_SQL).execute(&pool).await.map_err(query_err)?;
        info!(index = %index_dir.display(), "symbol index opened");

        Ok(Self { pool, lock_file })
    }

    /// In-memory index, for tests that don't want filesystem fixtures.
    #[cfg(test)]
    pub async fn open_in_memory() -> Result<Self, IndexError> {
        let options = SqliteConnectOptions::new().filename(":memory:").create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(query_err)?;
        sqlx::query(SCHEMA_SQL).execute(&pool).await.map_err(query_err)?;
        let lock_file = tempfile::NamedTempFile::new()?.into_file();
        Ok(Self { pool, lock_file })
    }

    /// Atomically replaces the complete symbol set for `file_path` (spec §4.3
    /// write discipline): delete-then-insert in a single transaction.
    /// Containers (CLASS/INTERFACE/TRAIT/ENUM) are inserted first in the
    /// extractor's own emission order, so each member symbol can resolve its
    /// `container` name to the just-inserted row id within this batch.
    pub async fn put_file(&self, file_path: &str, symbols: Vec<ExtractedSymbol>) -> Result<(), IndexError> {
        let mut tx = self.pool.begin().await.map_err(query_err)?;
        sqlx::query("DELETE FROM symbols WHERE file_path = ?")
            .bind(file_path)
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;

        let mut container_ids: HashMap<String, i64> = HashMap::new();
        for sym in symbols {
            let container_id = sym.container.as_ref().and_then(|c| container_ids.get(c).copied());
            let result = sqlx::query(
                "INSERT INTO symbols (file_path, name, kind, line, column, line_end, column_end, \
                 container_id, container_name, modifiers, annotations, documentation, return_type, \
                 parameters, extends, implements, package_name) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(file_path)
            .bind(&sym.name)
            .bind(sym.kind.as_str())
            .bind(sym.line as i64)
            .bind(sym.column as i64)
            .bind(sym.line_end as i64)
            .bind(sym.column_end as i64)
            .bind(container_id)
            .bind(&sym.container)
            .bind(Json(&sym.modifiers))
            .bind(Json(&sym.annotations))
            .bind(&sym.documentation)
            .bind(&sym.return_type)
            .bind(Json(&sym.parameters))
            .bind(&sym.extends)
            .bind(Json(&sym.implements))
            .bind(&sym.package_name)
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;

            if matches!(
                sym.kind,
                lsp_core::symbols::SymbolKind::Class
                    | lsp_core::symbols::SymbolKind::Interface
                    | lsp_core::symbols::SymbolKind::Trait
                    | lsp_core::symbols::SymbolKind::Enum
            ) {
                container_ids.insert(sym.name.clone(), result.last_insert_rowid());
            }
        }

        tx.commit().await.map_err(query_err)?;
        debug!(file = file_path, "put_file committed");
        Ok(())
    }

    pub async fn remove_file(&self, file_path: &str) -> Result<(), IndexError> {
        sqlx::query("DELETE FROM symbols WHERE file_path = ?")
            .bind(file_path)
            .execute(&self.pool)
            .await
            .map_err(query_err)?;
        Ok(())
    }

    pub async fn get_file(&self, file_path: &str) -> Result<Vec<SymbolRow>, IndexError> {
        sqlx::query_as::<_, SymbolRow>(
            "SELECT * FROM symbols WHERE file_path = ? ORDER BY line, column",
        )
        .bind(file_path)
        .fetch_all(&self.pool)
        .await
        .map_err(query_err)
    }

    /// Every symbol whose `name` starts with `prefix`, case-sensitive,
    /// ordered `(name, file, line)`. `GLOB` (not `LIKE`) is used because
    /// SQLite's `LIKE` is case-insensitive for ASCII by default.
    pub fn search_prefix<'a>(
        &'a self,
        prefix: &str,
    ) -> Pin<Box<dyn Stream<Item = Result<SymbolRow, IndexError>> + Send + 'a>> {
        let pattern = format!("{}*", prefix.replace(['[', ']', '*', '?'], ""));
        let stream = sqlx::query_as::<_, SymbolRow>(
            "SELECT * FROM symbols WHERE name GLOB ? ORDER BY name, file_path, line",
        )
        .bind(pattern)
        .fetch(&self.pool)
        .map(|r| r.map_err(query_err));
        Box::pin(stream)
    }

    /// Flushes pending writes and releases the single-writer lock. Idempotent.
    pub async fn close(&self) -> Result<(), IndexError> {
        self.pool.close().await;
        let _ = FileExt::unlock(&self.lock_file);
        if cfg!(windows) {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        Ok(())
    }

    pub async fn symbol_count(&self) -> Result<i64, IndexError> {
        let row = sqlx::query("SELECT COUNT(*) as c FROM symbols")
            .fetch_one(&self.pool)
            .await
            .map_err(query_err)?;
        Ok(row.get::<i64, _>("c"))
    }
}
