pub mod constants;
pub mod indexer;
pub mod lsp_convert;
pub mod models;
pub mod repo;
pub mod server;

pub use indexer::Indexer;
pub use repo::Repository;
pub use server::Backend;
