//! Symbol extraction for Groovy source (spec §4.4 "Symbol extraction rules").
//!
//! Walks a parsed tree top-down, producing one [`ExtractedSymbol`] per
//! declaration. Class/interface/trait/enum bodies recurse with the
//! declaration's short name threaded through as `container`; annotations on
//! a declaration are recorded verbatim as `ANNOTATION` symbols rather than
//! interpreted (`@TypeChecked`/`@CompileStatic` included).

use lsp_core::{
    language_support::LanguageSupport,
    node_types::NodeType,
    symbols::{ExtractedSymbol, SymbolKind},
};
use tower_lsp::lsp_types::Range;
use tree_sitter::{Node, Tree};

use crate::groovy_support::GroovySupport;

pub fn extract_symbols(support: &GroovySupport, tree: &Tree, source: &str) -> Vec<ExtractedSymbol> {
    let mut out = Vec::new();

    if let Some(package_name) = support.get_package_name(tree, source) {
        if let Some(node) = find_first(tree.root_node(), "package_declaration") {
            let mut sym = ExtractedSymbol::new(
                package_name,
                SymbolKind::Package,
                node.start_position().row as u32,
                node.start_position().column as u32,
            );
            sym.line_end = node.end_position().row as u32;
            sym.column_end = node.end_position().column as u32;
            out.push(sym);
        }
    }

    for node in children_of_kind(tree.root_node(), "import_declaration") {
        if let Some(text) = node.utf8_text(source.as_bytes()).ok() {
            let name = text.strip_prefix("import ").unwrap_or(text).trim_end_matches(';').to_string();
            let mut sym = ExtractedSymbol::new(
                name,
                SymbolKind::Import,
                node.start_position().row as u32,
                node.start_position().column as u32,
            );
            sym.line_end = node.end_position().row as u32;
            sym.column_end = node.end_position().column as u32;
            out.push(sym);
        }
    }

    walk(support, tree.root_node(), source, None, &mut out);
    out
}

fn walk(
    support: &GroovySupport,
    node: Node,
    source: &str,
    container: Option<&str>,
    out: &mut Vec<ExtractedSymbol>,
) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "class_declaration" | "interface_declaration" | "trait_declaration"
            | "enum_declaration" | "function_declaration" | "method_declaration" => {
                if let Some((sym, annotations)) = extract_declaration(support, &child, source, container) {
                    let is_container = matches!(
                        child.kind(),
                        "class_declaration" | "interface_declaration" | "trait_declaration" | "enum_declaration"
                    );
                    let name = sym.name.clone();
                    out.push(sym);
                    out.extend(annotations);
                    if is_container {
                        if let Some(body) = child.children(&mut child.walk()).find(|c| c.kind() == "class_body") {
                            walk(support, body, source, Some(&name), out);
                        }
                    }
                    continue;
                }
            }
            "field_declaration" => {
                if let Some((sym, annotations)) = extract_field(support, &child, source, container) {
                    out.push(sym);
                    out.extend(annotations);
                }
                continue;
            }
            "local_variable_declaration" | "variable_declaration" if container.is_none() => {
                out.extend(extract_locals(&child, source));
                continue;
            }
            _ => {}
        }
        walk(support, child, source, container, out);
    }
}

fn extract_declaration(
    support: &GroovySupport,
    node: &Node,
    source: &str,
    container: Option<&str>,
) -> Option<(ExtractedSymbol, Vec<ExtractedSymbol>)> {
    let kind = match node.kind() {
        "class_declaration" => SymbolKind::Class,
        "interface_declaration" => SymbolKind::Interface,
        "trait_declaration" => SymbolKind::Trait,
        "enum_declaration" => SymbolKind::Enum,
        "function_declaration" | "method_declaration" => SymbolKind::Method,
        _ => return None,
    };
    // get_short_name only covers kinds get_type() recognizes (no trait_declaration);
    // the `name` field is present on every declaration kind handled here, so read it directly.
    let name_node = node.child_by_field_name("name")?;
    let name = name_node.utf8_text(source.as_bytes()).ok()?.to_string();

    let ident_range = support.get_ident_range(node);
    let (line, column) = ident_range
        .map(|r| (r.start.line, r.start.character))
        .unwrap_or((node.start_position().row as u32, node.start_position().column as u32));

    let mut sym = ExtractedSymbol::new(name.clone(), kind, line, column);
    if let Some(r) = ident_range {
        sym.line_end = r.end.line;
        sym.column_end = r.end.character;
    } else {
        sym.line_end = node.end_position().row as u32;
        sym.column_end = node.end_position().column as u32;
    }
    sym.container = container.map(String::from);
    sym.modifiers = support.get_modifiers(node, source);
    sym.documentation = support.get_documentation(node, source);
    sym.extends = support.get_extends(node, source);
    sym.implements = support.get_implements(node, source);
    sym.return_type = support.get_return(node, source);
    sym.parameters = support.get_parameters(node, source).unwrap_or_default();

    // annotations are never interpreted (spec §4.4); recorded both as a
    // convenience list on the decorated declaration (for hover rendering)
    // and, below, as their own ANNOTATION symbols so they're visible to
    // search_prefix/documentSymbol/workspace-symbol.
    let occurrences = support.get_annotations_with_range(node, source);
    sym.annotations = occurrences.iter().map(|(n, _)| n.clone()).collect();
    let annotations = annotation_symbols(occurrences, &name);

    Some((sym, annotations))
}

fn annotation_symbols(occurrences: Vec<(String, Range)>, container: &str) -> Vec<ExtractedSymbol> {
    occurrences
        .into_iter()
        .map(|(name, range)| {
            let mut sym =
                ExtractedSymbol::new(name, SymbolKind::Annotation, range.start.line, range.start.character);
            sym.line_end = range.end.line;
            sym.column_end = range.end.character;
            sym.container = Some(container.to_string());
            sym
        })
        .collect()
}

fn extract_field(
    support: &GroovySupport,
    node: &Node,
    source: &str,
    container: Option<&str>,
) -> Option<(ExtractedSymbol, Vec<ExtractedSymbol>)> {
    if support.get_type(node).map(|t| matches!(t, NodeType::Field)).unwrap_or(false) {
        let name = support.get_short_name(node, source)?;
        let ident_range = support.get_ident_range(node);
        let (line, column) = ident_range
            .map(|r| (r.start.line, r.start.character))
            .unwrap_or((node.start_position().row as u32, node.start_position().column as u32));

        let modifiers = support.get_modifiers(node, source);
        // Groovy: a field with no explicit visibility modifier is a property
        // with an implicit getter/setter generated by the compiler.
        let has_visibility = modifiers.iter().any(|m| {
            matches!(m.as_str(), "public" | "private" | "protected")
        });
        let kind = if has_visibility { SymbolKind::Field } else { SymbolKind::Property };

        let mut sym = ExtractedSymbol::new(name.clone(), kind, line, column);
        if let Some(r) = ident_range {
            sym.line_end = r.end.line;
            sym.column_end = r.end.character;
        } else {
            sym.line_end = node.end_position().row as u32;
            sym.column_end = node.end_position().column as u32;
        }
        sym.container = container.map(String::from);
        sym.modifiers = modifiers;
        let occurrences = support.get_annotations_with_range(node, source);
        sym.annotations = occurrences.iter().map(|(n, _)| n.clone()).collect();
        sym.documentation = support.get_documentation(node, source);
        sym.return_type = support.get_return(node, source);
        let annotations = annotation_symbols(occurrences, &name);
        return Some((sym, annotations));
    }
    None
}

fn extract_locals(node: &Node, source: &str) -> Vec<ExtractedSymbol> {
    let mut out = Vec::new();
    let mut cursor = node.walk();
    for declarator in node.children(&mut cursor).filter(|n| n.kind() == "variable_declarator") {
        if let Some(name_node) = declarator.child_by_field_name("name") {
            if let Ok(name) = name_node.utf8_text(source.as_bytes()) {
                let mut sym = ExtractedSymbol::new(
                    name.to_string(),
                    SymbolKind::Local,
                    name_node.start_position().row as u32,
                    name_node.start_position().column as u32,
                );
                sym.line_end = name_node.end_position().row as u32;
                sym.column_end = name_node.end_position().column as u32;
                out.push(sym);
            }
        }
    }
    out
}

fn children_of_kind<'a>(node: Node<'a>, kind: &'static str) -> Vec<Node<'a>> {
    let mut result = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == kind {
            result.push(child);
        }
    }
    result
}

fn find_first<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
    if node.kind() == kind {
        return Some(node);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(found) = find_first(child, kind) {
            return Some(found);
        }
    }
    None
}
