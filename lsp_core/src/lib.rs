pub mod build_tools;
pub mod dependency_cache;
pub mod document_store;
pub mod error;
pub mod event_bus;
pub mod language_support;
pub mod languages;
pub mod lsp_logging;
pub mod node_types;
pub mod parse_cache;
pub mod symbols;
pub mod ts_helper;

pub use dependency_cache::DependencyCache;
pub use document_store::DocumentStore;
pub use event_bus::EventBus;
pub use parse_cache::ParseCache;
