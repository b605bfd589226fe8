// 📥 Import pipeline
// source file → scanner → literal interpreter → normalizer → batch writes

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::info;

use crate::catalog::{flatten_catalog, PriceRecord};
use crate::error::ImportError;
use crate::literal::{parse_literal, LiteralBudget};
use crate::persistence::{persist_records, PersistOptions, PRICE_COLLECTION};
use crate::scanner::scan_catalog;
use crate::store::DocumentStore;
use crate::value::Value;

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub source: PathBuf,
    pub collection: String,
    pub persist: PersistOptions,
    pub budget: LiteralBudget,
}

impl ImportOptions {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        ImportOptions {
            source: source.into(),
            collection: PRICE_COLLECTION.to_string(),
            persist: PersistOptions::default(),
            budget: LiteralBudget::default(),
        }
    }
}

/// What one import run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    /// SHA-256 of the extracted literal; unchanged digest means unchanged catalog.
    pub source_digest: String,
    pub parsed: usize,
    pub deleted: usize,
    pub written: usize,
}

/// Parsed catalog plus the digest of the literal it came from.
#[derive(Debug, Clone)]
pub struct LoadedCatalog {
    pub entries: Vec<Value>,
    pub digest: String,
}

/// Extract and interpret the catalog literal from an HTML document.
pub fn load_catalog_from_text(text: &str, budget: &LiteralBudget) -> Result<LoadedCatalog, ImportError> {
    let span = scan_catalog(text)?;
    let literal = span.slice(text);

    let mut hasher = Sha256::new();
    hasher.update(literal.as_bytes());
    let digest = format!("{:x}", hasher.finalize());

    let entries = parse_literal(literal, budget)?;
    Ok(LoadedCatalog { entries, digest })
}

pub fn load_catalog(path: &Path, budget: &LiteralBudget) -> Result<LoadedCatalog, ImportError> {
    if !path.exists() {
        return Err(ImportError::SourceMissing(path.to_path_buf()));
    }
    let text = fs::read_to_string(path).map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_catalog_from_text(&text, budget)
}

/// Read, normalize and fail on an empty result, without touching a store.
pub fn prepare_records(options: &ImportOptions) -> Result<(Vec<PriceRecord>, String), ImportError> {
    info!(source = %options.source.display(), "reading catalog");
    let catalog = load_catalog(&options.source, &options.budget)?;
    let records = flatten_catalog(&catalog.entries);
    info!(parsed = records.len(), digest = %catalog.digest, "parsed items");

    if records.is_empty() {
        return Err(ImportError::Empty(options.source.clone()));
    }
    Ok((records, catalog.digest))
}

/// Full import run. Parsing completes before the store is touched, so a bad
/// source never clears the collection.
pub fn run_import<S>(store: &mut S, options: &ImportOptions) -> Result<ImportReport, ImportError>
where
    S: DocumentStore + ?Sized,
{
    let (records, source_digest) = prepare_records(options)?;
    let persisted = persist_records(store, &options.collection, &records, &options.persist)?;
    info!(
        deleted = persisted.deleted,
        written = persisted.written,
        "import done"
    );

    Ok(ImportReport {
        source_digest,
        parsed: records.len(),
        deleted: persisted.deleted,
        written: persisted.written,
    })
}
