//! ACID-durable document table backed by redb.
//!
//! Records are bincode-encoded under their `u64` id. A small `meta` table
//! holds the id counter so ids are never reused, even after deletions.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};

use crate::error::StoreError;
use crate::store::{DocumentRecord, MetadataUpdate, NewDocument, StoreResult};

/// Document id → bincode-encoded [`DocumentRecord`].
const DOCUMENTS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("documents");

/// Counters and other small scalars.
const META_TABLE: TableDefinition<&str, u64> = TableDefinition::new("meta");

const NEXT_ID_KEY: &str = "next_id";

fn redb_err<E: Display>(op: &'static str) -> impl FnOnce(E) -> StoreError {
    move |e| StoreError::Redb {
        message: format!("{op} failed: {e}"),
    }
}

fn encode(record: &DocumentRecord) -> StoreResult<Vec<u8>> {
    bincode::serialize(record).map_err(|e| StoreError::Serialization {
        message: e.to_string(),
    })
}

fn decode(bytes: &[u8]) -> StoreResult<DocumentRecord> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Serialization {
        message: e.to_string(),
    })
}

/// Document store using redb.
///
/// All writes go through transactions. Reads use MVCC snapshots, so the
/// store can be shared across threads behind an `Arc`.
#[derive(Clone)]
pub struct DocumentStore {
    db: Arc<Database>,
}

impl DocumentStore {
    /// Open or create the database file, creating parent directories.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Io { source: e })?;
        }
        let db = Database::create(path).map_err(|e| StoreError::Redb {
            message: format!("failed to open redb at {}: {e}", path.display()),
        })?;

        // Create tables up front so read transactions never see them missing.
        let txn = db.begin_write().map_err(redb_err("begin_write"))?;
        {
            txn.open_table(DOCUMENTS_TABLE)
                .map_err(redb_err("open_table"))?;
            txn.open_table(META_TABLE).map_err(redb_err("open_table"))?;
        }
        txn.commit().map_err(redb_err("commit"))?;

        tracing::debug!(path = %path.display(), "document store opened");
        Ok(Self { db: Arc::new(db) })
    }

    /// Insert a document stamped with the current time.
    pub fn insert(&self, doc: NewDocument) -> StoreResult<DocumentRecord> {
        self.insert_at(doc, Utc::now())
    }

    /// Insert a document with an explicit creation time.
    pub fn insert_at(&self, doc: NewDocument, created_at: DateTime<Utc>) -> StoreResult<DocumentRecord> {
        let txn = self.db.begin_write().map_err(redb_err("begin_write"))?;
        let record = {
            let mut meta = txn.open_table(META_TABLE).map_err(redb_err("open_table"))?;
            let id = meta
                .get(NEXT_ID_KEY)
                .map_err(redb_err("get"))?
                .map(|g| g.value())
                .unwrap_or(1);
            meta.insert(NEXT_ID_KEY, id + 1)
                .map_err(redb_err("insert"))?;

            let record = DocumentRecord {
                id,
                filename: doc.filename,
                original_filename: doc.original_filename,
                file_path: doc.file_path,
                file_type: doc.file_type,
                file_size: doc.file_size,
                predicted_category: doc.predicted_category,
                confidence_score: doc.confidence_score,
                category_scores: doc.category_scores,
                created_at,
                updated_at: None,
                title: None,
                description: None,
                tags: Vec::new(),
                token_count: doc.token_count,
                num_chunks: doc.num_chunks,
            };
            let bytes = encode(&record)?;
            let mut docs = txn
                .open_table(DOCUMENTS_TABLE)
                .map_err(redb_err("open_table"))?;
            docs.insert(id, bytes.as_slice())
                .map_err(redb_err("insert"))?;
            record
        };
        txn.commit().map_err(redb_err("commit"))?;
        Ok(record)
    }

    /// Fetch one document. `Ok(None)` if absent.
    pub fn get(&self, id: u64) -> StoreResult<Option<DocumentRecord>> {
        let txn = self.db.begin_read().map_err(redb_err("begin_read"))?;
        let table = txn
            .open_table(DOCUMENTS_TABLE)
            .map_err(redb_err("open_table"))?;
        let guard = table.get(id).map_err(redb_err("get"))?;
        guard.map(|g| decode(g.value())).transpose()
    }

    /// Every document, id ascending.
    pub fn all(&self) -> StoreResult<Vec<DocumentRecord>> {
        self.scan(0, usize::MAX)
    }

    /// Every document, newest first. Ties on `created_at` go to the higher id.
    pub fn list_recent(&self) -> StoreResult<Vec<DocumentRecord>> {
        let mut docs = self.all()?;
        docs.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(docs)
    }

    /// A window of documents in id order.
    pub fn page(&self, skip: usize, limit: usize) -> StoreResult<Vec<DocumentRecord>> {
        self.scan(skip, limit)
    }

    fn scan(&self, skip: usize, limit: usize) -> StoreResult<Vec<DocumentRecord>> {
        let txn = self.db.begin_read().map_err(redb_err("begin_read"))?;
        let table = txn
            .open_table(DOCUMENTS_TABLE)
            .map_err(redb_err("open_table"))?;
        let mut docs = Vec::new();
        for entry in table.iter().map_err(redb_err("iter"))?.skip(skip).take(limit) {
            let (_, value) = entry.map_err(redb_err("iter"))?;
            docs.push(decode(value.value())?);
        }
        Ok(docs)
    }

    pub fn count(&self) -> StoreResult<u64> {
        let txn = self.db.begin_read().map_err(redb_err("begin_read"))?;
        let table = txn
            .open_table(DOCUMENTS_TABLE)
            .map_err(redb_err("open_table"))?;
        table.len().map_err(redb_err("len"))
    }

    /// Documents per predicted category. Unclassified documents are not counted.
    pub fn category_distribution(&self) -> StoreResult<BTreeMap<String, u64>> {
        let mut dist = BTreeMap::new();
        for doc in self.all()? {
            if let Some(category) = doc.predicted_category {
                *dist.entry(category).or_insert(0) += 1;
            }
        }
        Ok(dist)
    }

    /// Apply a metadata edit. Returns the updated record, or `None` if absent.
    pub fn update_metadata(
        &self,
        id: u64,
        update: &MetadataUpdate,
    ) -> StoreResult<Option<DocumentRecord>> {
        let txn = self.db.begin_write().map_err(redb_err("begin_write"))?;
        let updated = {
            let mut table = txn
                .open_table(DOCUMENTS_TABLE)
                .map_err(redb_err("open_table"))?;
            let existing = table
                .get(id)
                .map_err(redb_err("get"))?
                .map(|g| decode(g.value()))
                .transpose()?;
            match existing {
                Some(mut record) => {
                    update.apply(&mut record);
                    record.updated_at = Some(Utc::now());
                    let bytes = encode(&record)?;
                    table
                        .insert(id, bytes.as_slice())
                        .map_err(redb_err("insert"))?;
                    Some(record)
                }
                None => None,
            }
        };
        txn.commit().map_err(redb_err("commit"))?;
        Ok(updated)
    }

    /// Delete a document. Returns the removed record, or `None` if absent.
    pub fn remove(&self, id: u64) -> StoreResult<Option<DocumentRecord>> {
        let txn = self.db.begin_write().map_err(redb_err("begin_write"))?;
        let removed = {
            let mut table = txn
                .open_table(DOCUMENTS_TABLE)
                .map_err(redb_err("open_table"))?;
            let result = table.remove(id).map_err(redb_err("remove"))?;
            result.map(|g| decode(g.value())).transpose()?
        };
        txn.commit().map_err(redb_err("commit"))?;
        Ok(removed)
    }
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore").finish()
    }
}
