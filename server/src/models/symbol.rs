//! The Symbol Index's (C3) row shape (spec §3 `Symbol`) and its LSP-facing
//! conversions. Language crates produce `lsp_core::symbols::ExtractedSymbol`;
//! `SymbolRow` is what comes back out of storage, carrying the file path and
//! the stable row id that other symbols in the same file reference as
//! `container_id`.

use lsp_core::symbols::SymbolKind;
use sqlx::{FromRow, types::Json};
use tower_lsp::lsp_types::{
    Hover, HoverContents, Location, MarkupContent, MarkupKind, Position, Range, Url,
};

use crate::lsp_convert::{AsLspHover, AsLspLocation};

pub type Parameter = (String, Option<String>, Option<String>);

#[derive(Debug, Clone, FromRow, PartialEq)]
pub struct SymbolRow {
    pub id: i64,
    pub file_path: String,
    pub name: String,
    pub kind: String,
    pub line: i64,
    pub column: i64,
    pub line_end: i64,
    pub column_end: i64,
    pub container_id: Option<i64>,
    pub container_name: Option<String>,

    #[sqlx(json)]
    pub modifiers: Json<Vec<String>>,
    #[sqlx(json)]
    pub annotations: Json<Vec<String>>,
    pub documentation: Option<String>,
    pub return_type: Option<String>,
    #[sqlx(json)]
    pub parameters: Json<Vec<Parameter>>,
    pub extends: Option<String>,
    #[sqlx(json)]
    pub implements: Json<Vec<String>>,
    pub package_name: Option<String>,
}

impl SymbolRow {
    pub fn kind(&self) -> SymbolKind {
        SymbolKind::from_str(&self.kind).unwrap_or(SymbolKind::Local)
    }
}

impl AsLspLocation for SymbolRow {
    fn as_lsp_location(&self) -> Option<Location> {
        let uri = Url::from_file_path(&self.file_path).ok()?;
        Some(Location {
            uri,
            range: Range {
                start: Position {
                    line: self.line as u32,
                    character: self.column as u32,
                },
                end: Position {
                    line: self.line_end as u32,
                    character: self.column_end as u32,
                },
            },
        })
    }
}

impl AsLspHover for SymbolRow {
    fn as_lsp_hover(&self) -> Option<Hover> {
        let mut parts = Vec::new();
        parts.push("```groovy".to_string());
        if let Some(pkg) = &self.package_name {
            if !pkg.is_empty() {
                parts.push(format!("package {}", pkg));
                parts.push(String::new());
            }
        }
        for annotation in self.annotations.iter() {
            if !annotation.is_empty() {
                parts.push(annotation.clone());
            }
        }

        let modifiers = self.modifiers.join(" ");
        let mut signature = String::new();
        if !modifiers.is_empty() {
            signature.push_str(&modifiers);
            signature.push(' ');
        }
        let keyword = match self.kind() {
            SymbolKind::Class => Some("class"),
            SymbolKind::Interface => Some("interface"),
            SymbolKind::Trait => Some("trait"),
            SymbolKind::Enum => Some("enum"),
            _ => None,
        };
        if let Some(kw) = keyword {
            signature.push_str(kw);
            signature.push(' ');
        }
        if matches!(self.kind(), SymbolKind::Method | SymbolKind::Field | SymbolKind::Property) {
            if let Some(ret) = &self.return_type {
                signature.push_str(ret);
                signature.push(' ');
            }
        }
        signature.push_str(&self.name);
        if matches!(self.kind(), SymbolKind::Class | SymbolKind::Interface | SymbolKind::Trait) {
            if let Some(extends) = &self.extends {
                signature.push_str(&format!(" extends {}", extends));
            }
            if !self.implements.is_empty() {
                signature.push_str(&format!(" implements {}", self.implements.join(", ")));
            }
        }
        parts.push(signature);

        if self.kind() == SymbolKind::Method && !self.parameters.is_empty() {
            let format_param = |p: &Parameter| {
                let mut s = match &p.1 {
                    Some(t) => format!("{} {}", t, p.0),
                    None => p.0.clone(),
                };
                if let Some(default) = &p.2 {
                    s.push_str(&format!(" = {}", default));
                }
                s
            };
            if self.parameters.len() > 3 {
                parts.push("(".to_string());
                for p in self.parameters.iter() {
                    parts.push(format!("    {},", format_param(p)));
                }
                parts.push(")".to_string());
            } else {
                parts.push(format!(
                    "({})",
                    self.parameters.iter().map(format_param).collect::<Vec<_>>().join(", ")
                ));
            }
        }

        if self.documentation.is_some() {
            parts.push(String::new());
            parts.push("---".to_string());
        }
        parts.push("```".to_string());
        if let Some(doc) = &self.documentation {
            if !doc.is_empty() {
                parts.push(doc.clone());
            }
        }

        Some(Hover {
            contents: HoverContents::Markup(MarkupContent {
                kind: MarkupKind::Markdown,
                value: parts.join("\n"),
            }),
            range: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(kind: SymbolKind) -> SymbolRow {
        SymbolRow {
            id: 1,
            file_path: "/ws/A.groovy".into(),
            name: "A".into(),
            kind: kind.as_str().to_string(),
            line: 0,
            column: 6,
            line_end: 0,
            column_end: 7,
            container_id: None,
            container_name: None,
            modifiers: Json(vec![]),
            annotations: Json(vec![]),
            documentation: None,
            return_type: None,
            parameters: Json(vec![]),
            extends: None,
            implements: Json(vec![]),
            package_name: None,
        }
    }

    #[test]
    fn hover_renders_class_keyword() {
        let hover = row(SymbolKind::Class).as_lsp_hover().unwrap();
        match hover.contents {
            HoverContents::Markup(m) => assert!(m.value.contains("class A")),
            _ => panic!("expected markup"),
        }
    }

    #[test]
    fn location_uses_ident_range() {
        let loc = row(SymbolKind::Class).as_lsp_location().unwrap();
        assert_eq!(loc.range.start.character, 6);
    }
}
