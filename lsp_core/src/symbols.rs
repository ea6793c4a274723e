//! Shared symbol extraction vocabulary (spec §3 `Symbol`).
//!
//! Per-language crates (e.g. `groovy`) walk their own parse tree and produce
//! `ExtractedSymbol`s in this shape; the indexer (C4) persists them into the
//! Symbol Index (C3) without needing to know anything about tree-sitter.

use std::fmt::{self, Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Class,
    Interface,
    Trait,
    Method,
    Field,
    Property,
    Local,
    Parameter,
    Import,
    Package,
    Annotation,
    Enum,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Class => "CLASS",
            SymbolKind::Interface => "INTERFACE",
            SymbolKind::Trait => "TRAIT",
            SymbolKind::Method => "METHOD",
            SymbolKind::Field => "FIELD",
            SymbolKind::Property => "PROPERTY",
            SymbolKind::Local => "LOCAL",
            SymbolKind::Parameter => "PARAMETER",
            SymbolKind::Import => "IMPORT",
            SymbolKind::Package => "PACKAGE",
            SymbolKind::Annotation => "ANNOTATION",
            SymbolKind::Enum => "ENUM",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "CLASS" => SymbolKind::Class,
            "INTERFACE" => SymbolKind::Interface,
            "TRAIT" => SymbolKind::Trait,
            "METHOD" => SymbolKind::Method,
            "FIELD" => SymbolKind::Field,
            "PROPERTY" => SymbolKind::Property,
            "LOCAL" => SymbolKind::Local,
            "PARAMETER" => SymbolKind::Parameter,
            "IMPORT" => SymbolKind::Import,
            "PACKAGE" => SymbolKind::Package,
            "ANNOTATION" => SymbolKind::Annotation,
            "ENUM" => SymbolKind::Enum,
            _ => return None,
        })
    }
}

impl Display for SymbolKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A symbol as produced by a language's extractor, before it is written to
/// the Symbol Index. `container` names the enclosing declaration's short
/// name (e.g. a method's owning class); the indexer resolves it to a stable
/// container id at write time.
#[derive(Debug, Clone)]
pub struct ExtractedSymbol {
    pub name: String,
    pub kind: SymbolKind,
    pub line: u32,
    pub column: u32,
    pub line_end: u32,
    pub column_end: u32,
    pub container: Option<String>,
    pub modifiers: Vec<String>,
    pub annotations: Vec<String>,
    pub documentation: Option<String>,
    pub return_type: Option<String>,
    pub parameters: Vec<(String, Option<String>, Option<String>)>,
    pub extends: Option<String>,
    pub implements: Vec<String>,
    pub package_name: Option<String>,
}

impl ExtractedSymbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind, line: u32, column: u32) -> Self {
        Self {
            name: name.into(),
            kind,
            line,
            column,
            line_end: line,
            column_end: column,
            container: None,
            modifiers: Vec::new(),
            annotations: Vec::new(),
            documentation: None,
            return_type: None,
            parameters: Vec::new(),
            extends: None,
            implements: Vec::new(),
            package_name: None,
        }
    }
}
