//! File-backed table engine with serialized read-modify-write semantics.
//!
//! Each [`Table`] owns one backing file holding a JSON array of records and
//! one async mutex. Reads parse the file fresh on every call and never take
//! the lock; mutations acquire the lock, read everything, mutate in memory,
//! and rewrite the whole file through a sibling temp file and an atomic
//! rename. Writers therefore serialize in acquisition order, and readers
//! only ever observe a fully written file.
//!
//! This trades throughput for zero external dependencies and is intended
//! for a single process; two processes sharing a data directory will race.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use super::record::{Record, RecordMeta};

/// Errors raised by the table engine.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing file could not be read or replaced.
    #[error("storage i/o failed for {path}: {source}")]
    Io {
        /// Backing file involved in the failure.
        path: PathBuf,
        /// Underlying i/o error.
        #[source]
        source: std::io::Error,
    },
    /// The backing file exists but cannot be parsed. Fatal for the
    /// collection until fixed externally.
    #[error("backing file {path} is corrupt: {source}")]
    Corrupt {
        /// Backing file that failed to parse.
        path: PathBuf,
        /// Parse failure reported by the decoder.
        #[source]
        source: serde_json::Error,
    },
}

/// Result alias for table operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// One keyed collection of records persisted in a single file.
pub struct Table<T> {
    path: PathBuf,
    write_lock: Mutex<()>,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> Table<T> {
    /// Bind a table to its backing file. The file is created lazily on the
    /// first mutation; a missing file reads as an empty collection.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
            _record: PhantomData,
        }
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse the backing file fresh and return every record.
    ///
    /// Never fails for a missing file: "no data yet" is a valid state.
    pub async fn read_all(&self) -> StoreResult<Vec<T>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        serde_json::from_slice(&bytes).map_err(|source| {
            warn!(path = %self.path.display(), %source, "backing file failed to parse");
            StoreError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })
    }

    /// Look a record up by id.
    pub async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<T>> {
        Ok(self.read_all().await?.into_iter().find(|r| r.id() == id))
    }

    /// Return every record matching the predicate, in storage order.
    pub async fn find<P>(&self, predicate: P) -> StoreResult<Vec<T>>
    where
        P: Fn(&T) -> bool,
    {
        Ok(self
            .read_all()
            .await?
            .into_iter()
            .filter(|r| predicate(r))
            .collect())
    }

    /// Return the first record matching the predicate.
    pub async fn find_one<P>(&self, predicate: P) -> StoreResult<Option<T>>
    where
        P: Fn(&T) -> bool,
    {
        Ok(self.read_all().await?.into_iter().find(|r| predicate(r)))
    }

    /// Number of records currently stored.
    pub async fn count(&self) -> StoreResult<usize> {
        Ok(self.read_all().await?.len())
    }

    /// Persist a new record assembled from `draft`, assigning its id and
    /// stamping both timestamps. Returns the full created record.
    pub async fn create(&self, draft: T::Draft) -> StoreResult<T> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.read_all().await?;
        let record = T::from_draft(RecordMeta::stamp(chrono::Utc::now()), draft);
        records.push(record.clone());
        self.write_all(&records).await?;
        Ok(record)
    }

    /// Persist a batch of new records in one lock acquisition and one
    /// file rewrite.
    pub async fn create_many(&self, drafts: Vec<T::Draft>) -> StoreResult<Vec<T>> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.read_all().await?;
        let now = chrono::Utc::now();
        let created: Vec<T> = drafts
            .into_iter()
            .map(|draft| T::from_draft(RecordMeta::stamp(now), draft))
            .collect();
        records.extend(created.iter().cloned());
        self.write_all(&records).await?;
        Ok(created)
    }

    /// Apply `mutate` to the record with the given id and rewrite the
    /// collection. `updated_at` is refreshed even for a no-op mutator.
    ///
    /// Returns `None` when the id is unknown; whether that is an error is
    /// the caller's decision.
    pub async fn update<F>(&self, id: Uuid, mutate: F) -> StoreResult<Option<T>>
    where
        F: FnOnce(&mut T),
    {
        let _guard = self.write_lock.lock().await;
        let mut records = self.read_all().await?;
        let Some(record) = records.iter_mut().find(|r| r.id() == id) else {
            return Ok(None);
        };
        mutate(record);
        record.meta_mut().touch(chrono::Utc::now());
        let updated = record.clone();
        self.write_all(&records).await?;
        Ok(Some(updated))
    }

    /// Remove the record with the given id. Returns `false` when the id is
    /// unknown, leaving the collection untouched.
    pub async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.read_all().await?;
        let before = records.len();
        records.retain(|r| r.id() != id);
        if records.len() == before {
            return Ok(false);
        }
        self.write_all(&records).await?;
        Ok(true)
    }

    /// Run one read-mutate-rewrite cycle over the whole collection under a
    /// single lock acquisition. Batch operations (chapter reorder) use this
    /// so every change lands in one file replace.
    ///
    /// The closure is responsible for refreshing `updated_at` on the
    /// records it changes.
    pub async fn with_records<F, R>(&self, apply: F) -> StoreResult<R>
    where
        F: FnOnce(&mut Vec<T>) -> R,
    {
        let _guard = self.write_lock.lock().await;
        let mut records = self.read_all().await?;
        let outcome = apply(&mut records);
        self.write_all(&records).await?;
        Ok(outcome)
    }

    /// Rewrite the backing file wholesale. Callers hold the write lock.
    async fn write_all(&self, records: &[T]) -> StoreResult<()> {
        let bytes = serde_json::to_vec_pretty(records).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        let tmp = self.path.with_extension("tmp");
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        tokio::fs::write(&tmp, &bytes).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(io_err)?;
        debug!(path = %self.path.display(), records = records.len(), "collection rewritten");
        Ok(())
    }
}

#[cfg(test)]
#[path = "table_tests.rs"]
mod tests;
