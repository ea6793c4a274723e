use tower_lsp::{
    LanguageServer,
    lsp_types::{HoverContents, HoverParams, MarkupContent, TextDocumentIdentifier, TextDocumentPositionParams, WorkDoneProgressParams},
};

mod util;
use util::{TestServer, position_of};

const WIDGET_SRC: &str = "package com.acme\n\nclass Widget {\n    String name\n}\n";

#[tokio::test(flavor = "multi_thread")]
async fn hover_over_class_declaration_returns_markdown_signature() {
    let server = TestServer::new(&[("src/Widget.groovy", WIDGET_SRC)]).await;
    server.open("src/Widget.groovy", WIDGET_SRC).await;

    let params = HoverParams {
        text_document_position_params: TextDocumentPositionParams {
            text_document: TextDocumentIdentifier { uri: server.file_uri("src/Widget.groovy") },
            position: position_of(WIDGET_SRC, "Widget {"),
        },
        work_done_progress_params: WorkDoneProgressParams::default(),
    };

    let result = server.backend.hover(params).await.expect("hover request failed");
    let hover = result.expect("expected a hover result for a known class");

    match hover.contents {
        HoverContents::Markup(MarkupContent { value, .. }) => {
            assert!(value.contains("class Widget"), "hover body was: {value}");
            assert!(value.contains("package com.acme"), "hover body was: {value}");
        }
        other => panic!("expected markup hover contents, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn hover_over_unknown_identifier_returns_none() {
    let server = TestServer::new(&[("src/Widget.groovy", WIDGET_SRC)]).await;
    server.open("src/Widget.groovy", WIDGET_SRC).await;

    let params = HoverParams {
        text_document_position_params: TextDocumentPositionParams {
            text_document: TextDocumentIdentifier { uri: server.file_uri("src/Widget.groovy") },
            position: position_of(WIDGET_SRC, "}"),
        },
        work_done_progress_params: WorkDoneProgressParams::default(),
    };

    let result = server.backend.hover(params).await.expect("hover request failed");
    assert!(result.is_none());
}
