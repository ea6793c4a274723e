//! In-memory authoritative copy of open documents (spec C5).
//!
//! Writes are serialised per-uri; reads are lock-free against whatever
//! snapshot is current. The store never lets a lower document version win:
//! once a `(uri, version)` pair has been observed, any operation naming an
//! older version for that uri is rejected.

use std::sync::{Arc, RwLock};

use dashmap::DashMap;

use crate::error::DocumentError;

/// A single half-open `[start, end)` text edit, line/column addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    /// `None` means "whole document replace".
    pub range: Option<Range>,
    pub text: String,
}

#[derive(Debug, Clone)]
struct DocumentEntry {
    version: i64,
    language: String,
    text: String,
}

/// Immutable point-in-time view of a document, safe to read without a lock.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub version: i64,
    pub text: Arc<str>,
}

pub struct DocumentStore {
    documents: DashMap<String, Arc<RwLock<DocumentEntry>>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self {
            documents: DashMap::new(),
        }
    }

    /// Installs a new entry. Rejects if a higher version already exists.
    pub fn open(&self, uri: &str, version: i64, text: String, language: &str) -> Result<(), DocumentError> {
        if let Some(existing) = self.documents.get(uri) {
            let current = existing.read().unwrap().version;
            if current >= version {
                return Err(DocumentError::StaleVersion {
                    uri: uri.to_string(),
                    incoming: version,
                    current,
                });
            }
        }
        self.documents.insert(
            uri.to_string(),
            Arc::new(RwLock::new(DocumentEntry {
                version,
                language: language.to_string(),
                text,
            })),
        );
        Ok(())
    }

    /// Applies `edits` in order; final version = `version`. Rejects stale versions.
    pub fn change(&self, uri: &str, version: i64, edits: &[TextEdit]) -> Result<(), DocumentError> {
        let entry = self
            .documents
            .get(uri)
            .ok_or_else(|| DocumentError::UnknownUri(uri.to_string()))?;
        let mut guard = entry.write().unwrap();
        if version <= guard.version {
            return Err(DocumentError::StaleVersion {
                uri: uri.to_string(),
                incoming: version,
                current: guard.version,
            });
        }
        for edit in edits {
            apply_edit(&mut guard.text, edit);
        }
        guard.version = version;
        Ok(())
    }

    /// Removes the entry. Requests already holding a snapshot may still
    /// observe the last-known content.
    pub fn close(&self, uri: &str) {
        self.documents.remove(uri);
    }

    /// Returns an immutable snapshot for a request to operate on.
    pub fn snapshot(&self, uri: &str) -> Result<Snapshot, DocumentError> {
        let entry = self
            .documents
            .get(uri)
            .ok_or_else(|| DocumentError::UnknownUri(uri.to_string()))?;
        let guard = entry.read().unwrap();
        Ok(Snapshot {
            version: guard.version,
            text: Arc::from(guard.text.as_str()),
        })
    }

    pub fn language(&self, uri: &str) -> Option<String> {
        self.documents.get(uri).map(|e| e.read().unwrap().language.clone())
    }

    pub fn is_open(&self, uri: &str) -> bool {
        self.documents.contains_key(uri)
    }
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

fn apply_edit(text: &mut String, edit: &TextEdit) {
    let Some(range) = &edit.range else {
        *text = edit.text.clone();
        return;
    };
    let start = offset_for(text, &range.start);
    let end = offset_for(text, &range.end);
    text.replace_range(start..end, &edit.text);
}

fn offset_for(text: &str, pos: &Position) -> usize {
    let mut line = 0u32;
    let mut offset = 0usize;
    for (idx, ch) in text.char_indices() {
        if line == pos.line {
            let mut col = 0u32;
            let mut o = idx;
            for c in text[idx..].chars() {
                if c == '\n' || col == pos.character {
                    break;
                }
                col += 1;
                o += c.len_utf8();
            }
            return o;
        }
        if ch == '\n' {
            line += 1;
        }
        offset = idx + ch.len_utf8();
    }
    offset
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_open_with_non_increasing_version() {
        let store = DocumentStore::new();
        store.open("a.groovy", 2, "class A {}".into(), "groovy").unwrap();
        let err = store.open("a.groovy", 1, "class A {}".into(), "groovy").unwrap_err();
        assert!(matches!(err, DocumentError::StaleVersion { .. }));
    }

    #[test]
    fn rejects_stale_change() {
        let store = DocumentStore::new();
        store.open("a.groovy", 1, "class A {}".into(), "groovy").unwrap();
        store
            .change("a.groovy", 2, &[TextEdit { range: None, text: "class A { def m(){} }".into() }])
            .unwrap();
        let err = store
            .change("a.groovy", 2, &[TextEdit { range: None, text: "stale".into() }])
            .unwrap_err();
        assert!(matches!(err, DocumentError::StaleVersion { .. }));
    }

    #[test]
    fn snapshot_after_change_reflects_highest_version() {
        let store = DocumentStore::new();
        store.open("a.groovy", 1, "hello".into(), "groovy").unwrap();
        store
            .change("a.groovy", 2, &[TextEdit { range: None, text: "world".into() }])
            .unwrap();
        let snap = store.snapshot("a.groovy").unwrap();
        assert_eq!(snap.version, 2);
        assert_eq!(&*snap.text, "world");
    }

    #[test]
    fn close_removes_entry() {
        let store = DocumentStore::new();
        store.open("a.groovy", 1, "x".into(), "groovy").unwrap();
        store.close("a.groovy");
        assert!(store.snapshot("a.groovy").is_err());
    }

    #[test]
    fn incremental_edit_applies_range_replace() {
        let store = DocumentStore::new();
        store.open("a.groovy", 1, "class A {}".into(), "groovy").unwrap();
        store
            .change(
                "a.groovy",
                2,
                &[TextEdit {
                    range: Some(Range {
                        start: Position { line: 0, character: 6 },
                        end: Position { line: 0, character: 7 },
                    }),
                    text: "B".into(),
                }],
            )
            .unwrap();
        assert_eq!(&*store.snapshot("a.groovy").unwrap().text, "class B {}");
    }
}
