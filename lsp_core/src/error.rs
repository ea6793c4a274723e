use thiserror::Error;

/// Failure modes for Parse Cache (C1) fills.
#[derive(Debug, Error, Clone)]
pub enum ParseError {
    #[error("parser panicked while parsing {source_name}")]
    Internal { source_name: String },
    #[error("syntax error in {source_name}: {message}")]
    Syntax { source_name: String, message: String },
    #[error("could not read source for {source_name}: {message}")]
    Io { source_name: String, message: String },
}

/// Failure modes surfaced by the Symbol Index (C3).
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("I/O failure in symbol index: {0}")]
    Io(#[from] std::io::Error),
    #[error("symbol index storage is corrupt: {0}")]
    Corrupt(String),
    #[error("symbol index is held by another process")]
    Locked,
    #[error("index path exists and is not a directory: {0}")]
    LocationConflict(String),
    #[error("symbol index query failed: {0}")]
    Query(String),
}

/// Dependency Cache (C2) only surfaces errors from the underlying resolver;
/// cache mechanics themselves never fail.
#[derive(Debug, Error, Clone)]
#[error("dependency resolution failed: {0}")]
pub struct CacheError(pub String);

/// Document Store (C5) failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("stale version for {uri}: incoming {incoming}, current {current}")]
    StaleVersion {
        uri: String,
        incoming: i64,
        current: i64,
    },
    #[error("unknown document uri: {0}")]
    UnknownUri(String),
}

/// Request Dispatcher (C7) / JSON-RPC error taxonomy.
#[derive(Debug, Error, Clone)]
pub enum DispatchError {
    #[error("parse error: {0}")]
    Parse(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("method not found: {0}")]
    MethodNotFound(String),
    #[error("invalid params: {0}")]
    InvalidParams(String),
    #[error("internal error: {0}")]
    Internal(String),
    #[error("request cancelled")]
    Cancelled,
}

impl DispatchError {
    /// JSON-RPC 2.0 error codes, plus the LSP-defined `RequestCancelled` (-32800).
    pub fn code(&self) -> i64 {
        match self {
            DispatchError::Parse(_) => -32700,
            DispatchError::InvalidRequest(_) => -32600,
            DispatchError::MethodNotFound(_) => -32601,
            DispatchError::InvalidParams(_) => -32602,
            DispatchError::Internal(_) => -32603,
            DispatchError::Cancelled => -32800,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_maps_to_request_cancelled_code() {
        assert_eq!(DispatchError::Cancelled.code(), -32800);
    }

    #[test]
    fn internal_maps_to_json_rpc_internal_error() {
        assert_eq!(DispatchError::Internal("boom".into()).code(), -32603);
    }
}
