// 💾 Batch Persistence Engine
// Writes normalized price records with bounded, sequential batch commits.
// An optional clear phase runs to completion before the first write.

use tracing::info;

use crate::catalog::PriceRecord;
use crate::error::PersistError;
use crate::store::{DocRef, DocumentStore, WriteBatch};

/// Collection holding price items.
pub const PRICE_COLLECTION: &str = "priceItems";

/// Writes per commit; stays under the backend's 500-write ceiling.
pub const WRITE_BATCH_SIZE: usize = 450;

/// Ids fetched (and deleted) per clear page.
pub const CLEAR_PAGE_SIZE: usize = 300;

/// Hard per-commit limit of the remote store.
pub const MAX_BATCH_SIZE: usize = 500;

/// Field refreshed with the store's commit time on every write.
pub const UPDATED_AT_FIELD: &str = "updatedAt";

#[derive(Debug, Clone)]
pub struct PersistOptions {
    pub clear: bool,
    pub batch_size: usize,
    pub clear_page_size: usize,
}

impl Default for PersistOptions {
    fn default() -> Self {
        PersistOptions {
            clear: false,
            batch_size: WRITE_BATCH_SIZE,
            clear_page_size: CLEAR_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistReport {
    pub deleted: usize,
    pub written: usize,
    pub batches: usize,
}

fn check_batch_size(size: usize) -> Result<(), PersistError> {
    if size == 0 || size > MAX_BATCH_SIZE {
        return Err(PersistError::BatchSize {
            size,
            max: MAX_BATCH_SIZE,
        });
    }
    Ok(())
}

/// Delete every document in `collection`, one page per commit, until a page
/// comes back empty. Returns the number of documents deleted.
pub fn clear_collection<S>(
    store: &mut S,
    collection: &str,
    page_size: usize,
) -> Result<usize, PersistError>
where
    S: DocumentStore + ?Sized,
{
    check_batch_size(page_size)?;
    let mut deleted = 0;

    loop {
        let ids = store
            .list_ids(collection, page_size)
            .map_err(|source| PersistError::Clear { deleted, source })?;
        if ids.is_empty() {
            break;
        }

        let mut batch = WriteBatch::new();
        for id in &ids {
            batch.delete(DocRef::new(collection, id.as_str()));
        }
        store
            .commit(batch)
            .map_err(|source| PersistError::Clear { deleted, source })?;

        deleted += ids.len();
        info!(collection, deleted, "cleared page");
    }

    Ok(deleted)
}

/// Merge-upsert `records` in chunks of `batch_size`. Records sharing an id
/// land in encounter order, so the last one wins.
pub fn write_records<S>(
    store: &mut S,
    collection: &str,
    records: &[PriceRecord],
    batch_size: usize,
) -> Result<PersistReport, PersistError>
where
    S: DocumentStore + ?Sized,
{
    check_batch_size(batch_size)?;
    let total = records.len();
    let mut report = PersistReport::default();

    for chunk in records.chunks(batch_size) {
        let mut batch = WriteBatch::new();
        for record in chunk {
            batch.set_merge(
                DocRef::new(collection, record.id.as_str()),
                record.to_fields(),
                Some(UPDATED_AT_FIELD),
            );
        }
        store.commit(batch).map_err(|source| PersistError::Write {
            written: report.written,
            total,
            source,
        })?;

        report.written += chunk.len();
        report.batches += 1;
        info!(collection, written = report.written, total, "wrote batch");
    }

    Ok(report)
}

/// Clear (when asked) and then write. The two phases never interleave.
pub fn persist_records<S>(
    store: &mut S,
    collection: &str,
    records: &[PriceRecord],
    options: &PersistOptions,
) -> Result<PersistReport, PersistError>
where
    S: DocumentStore + ?Sized,
{
    check_batch_size(options.batch_size)?;

    let deleted = if options.clear {
        info!(collection, "clearing existing documents");
        clear_collection(store, collection, options.clear_page_size)?
    } else {
        0
    };

    let report = write_records(store, collection, records, options.batch_size)?;
    Ok(PersistReport { deleted, ..report })
}
