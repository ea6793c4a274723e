//! Conversions between the Symbol Index's internal vocabulary and the wire
//! types `tower-lsp` expects (spec §4.8 Service Router responses).

use lsp_core::symbols::SymbolKind;
use tower_lsp::lsp_types::{CompletionItemKind, Hover, Location, SymbolKind as LspSymbolKind};

pub trait AsLspLocation {
    fn as_lsp_location(&self) -> Option<Location>;
}

pub trait AsLspHover {
    fn as_lsp_hover(&self) -> Option<Hover>;
}

/// Maps the Symbol Index's kind vocabulary onto the closest LSP
/// `SymbolKind`; there is no dedicated LSP kind for TRAIT or ANNOTATION, so
/// both fall back to their nearest structural analogue.
pub fn symbol_kind_to_lsp(kind: SymbolKind) -> LspSymbolKind {
    match kind {
        SymbolKind::Class => LspSymbolKind::CLASS,
        SymbolKind::Interface => LspSymbolKind::INTERFACE,
        SymbolKind::Trait => LspSymbolKind::INTERFACE,
        SymbolKind::Method => LspSymbolKind::METHOD,
        SymbolKind::Field => LspSymbolKind::FIELD,
        SymbolKind::Property => LspSymbolKind::PROPERTY,
        SymbolKind::Local => LspSymbolKind::VARIABLE,
        SymbolKind::Parameter => LspSymbolKind::VARIABLE,
        SymbolKind::Import => LspSymbolKind::NAMESPACE,
        SymbolKind::Package => LspSymbolKind::PACKAGE,
        SymbolKind::Annotation => LspSymbolKind::CLASS,
        SymbolKind::Enum => LspSymbolKind::ENUM,
    }
}

pub fn symbol_kind_to_completion(kind: SymbolKind) -> CompletionItemKind {
    match kind {
        SymbolKind::Class => CompletionItemKind::CLASS,
        SymbolKind::Interface => CompletionItemKind::INTERFACE,
        SymbolKind::Trait => CompletionItemKind::INTERFACE,
        SymbolKind::Method => CompletionItemKind::METHOD,
        SymbolKind::Field => CompletionItemKind::FIELD,
        SymbolKind::Property => CompletionItemKind::PROPERTY,
        SymbolKind::Local => CompletionItemKind::VARIABLE,
        SymbolKind::Parameter => CompletionItemKind::VARIABLE,
        SymbolKind::Import => CompletionItemKind::MODULE,
        SymbolKind::Package => CompletionItemKind::MODULE,
        SymbolKind::Annotation => CompletionItemKind::CLASS,
        SymbolKind::Enum => CompletionItemKind::ENUM,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trait_and_interface_share_the_same_lsp_kind() {
        assert_eq!(symbol_kind_to_lsp(SymbolKind::Trait), symbol_kind_to_lsp(SymbolKind::Interface));
    }
}
