// Price Sync - Core Library
// Catalog import (HTML source → document store) and the change relay
// (store events → spreadsheet endpoint), shared by both binaries.

pub mod error;
pub mod config;
pub mod value;
pub mod scanner;        // Literal Scanner
pub mod literal;        // Literal Interpreter
pub mod catalog;        // Catalog Normalizer
pub mod store;          // Document store backends
pub mod persistence;    // Batch Persistence Engine
pub mod import;
pub mod relay;          // Change Relay

#[cfg(feature = "server")]
pub mod server;

#[cfg(test)]
mod testutil;

// Re-export commonly used types
pub use error::{
    ConfigError, ImportError, LiteralError, PersistError, RelayError, ScanError, StoreError,
};
pub use config::{resolve_project, FirestoreConfig, RelayConfig};
pub use value::Value;
pub use scanner::{scan_array_literal, scan_catalog, LiteralSpan, CATALOG_MARKER};
pub use literal::{parse_literal, LiteralBudget};
pub use catalog::{flatten_catalog, price_record_id, PriceRecord};
pub use store::{
    DocRef, DocumentStore, Fields, FirestoreStore, MemoryStore, SqliteStore, WriteBatch, WriteOp,
};
pub use persistence::{
    clear_collection, persist_records, write_records, PersistOptions, PersistReport,
    PRICE_COLLECTION, WRITE_BATCH_SIZE,
};
pub use import::{run_import, ImportOptions, ImportReport};
pub use relay::{
    ChangeEvent, ChangeRelay, OrderPayload, RelayAction, RelayClient, RelayOutcome, RelayRequest,
    RelaySink,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
