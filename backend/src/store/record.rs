//! Record identity and lifecycle metadata shared by every collection.
//!
//! The table engine, not the caller, assigns identifiers and stamps
//! timestamps: entities are handed to [`crate::store::Table::create`] as a
//! draft and come back as a full record.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity and lifecycle stamps carried by every stored record.
///
/// ## Invariants
/// - `id` is unique within its collection and stable for the record's
///   lifetime.
/// - `created_at` never changes after creation.
/// - `updated_at` is refreshed on every write, including no-op updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMeta {
    /// Opaque unique identifier, generated at creation.
    pub id: Uuid,
    /// Creation timestamp, immutable.
    pub created_at: DateTime<Utc>,
    /// Last-modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl RecordMeta {
    /// Mint fresh metadata for a record created at `now`.
    pub fn stamp(now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Refresh the modification timestamp.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

/// A homogeneous entity persisted by a [`crate::store::Table`].
///
/// Implementations pair the stored shape with a `Draft` carrying the
/// caller-supplied fields; `from_draft` fills in everything derived.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Caller-supplied fields for a new record.
    type Draft: Send;

    /// Assemble a full record from freshly minted metadata and a draft.
    fn from_draft(meta: RecordMeta, draft: Self::Draft) -> Self;

    /// Lifecycle metadata.
    fn meta(&self) -> &RecordMeta;

    /// Mutable lifecycle metadata, used by the table to refresh stamps.
    fn meta_mut(&mut self) -> &mut RecordMeta;

    /// Record identifier.
    fn id(&self) -> Uuid {
        self.meta().id
    }
}
