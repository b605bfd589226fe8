// ⚠️ Error taxonomy
// One enum per pipeline stage so callers can tell fatal import errors from
// relay errors that should be redelivered.

use std::path::PathBuf;

use thiserror::Error;

/// Literal scanner failures (fatal to an import run).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("marker not found: {0}")]
    NotFound(String),
    #[error("unterminated array literal starting at byte {start}")]
    Unterminated { start: usize },
}

/// Literal interpreter failures (fatal to an import run).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LiteralError {
    #[error("literal is not an array (found {0})")]
    InvalidLiteral(&'static str),
    #[error("cannot evaluate literal at offset {offset}: {message}")]
    EvalError { offset: usize, message: String },
    #[error("literal evaluation exceeded {budget_ms} ms")]
    EvalTimeout { budget_ms: u128 },
}

/// Document store round-trip failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("store returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("cannot decode store response: {0}")]
    Decode(String),
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("injected failure on commit #{0}")]
    Injected(usize),
}

/// Batch persistence failures. Batches committed before the failure stay
/// committed; the counters say how far the run got.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("batch size must be between 1 and {max}, got {size}")]
    BatchSize { size: usize, max: usize },
    #[error("clearing collection failed after deleting {deleted} documents: {source}")]
    Clear {
        deleted: usize,
        #[source]
        source: StoreError,
    },
    #[error("writing failed after {written}/{total} records: {source}")]
    Write {
        written: usize,
        total: usize,
        #[source]
        source: StoreError,
    },
}

/// Relay delivery failures. Both kinds should be redelivered upstream.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("relay endpoint HTTP {}: {body}", .status.map_or_else(|| "unreachable".to_string(), |s| s.to_string()))]
    Transport { status: Option<u16>, body: String },
    #[error("relay endpoint reported failure: {0}")]
    Application(String),
    #[error("cannot build relay client: {0}")]
    Client(String),
}

/// Configuration failures (fatal at startup).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing env: {0}")]
    MissingEnv(&'static str),
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Everything that can abort an import run.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("source file not found: {0}")]
    SourceMissing(PathBuf),
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Literal(#[from] LiteralError),
    #[error("no items parsed; check the catalogData structure in {0}")]
    Empty(PathBuf),
    #[error(transparent)]
    Persist(#[from] PersistError),
}
