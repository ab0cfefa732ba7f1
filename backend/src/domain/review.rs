//! Book review record.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::{Record, RecordMeta};

/// One user's review of one book.
///
/// ## Invariants
/// - At most one review per (book, user) pair.
/// - `rating` is within 1..=5.
/// - `user_name` is a denormalised snapshot taken at creation; it does not
///   follow later renames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    /// Identity and lifecycle stamps.
    #[serde(flatten)]
    pub meta: RecordMeta,
    /// Reviewed book.
    pub book_id: Uuid,
    /// Reviewing user.
    pub user_id: Uuid,
    /// Reviewer display name at review time.
    #[serde(default)]
    pub user_name: String,
    /// Star rating, 1..=5.
    pub rating: u8,
    /// Free-text comment.
    #[serde(default)]
    pub comment: String,
}

/// Caller-supplied fields for a new review.
#[derive(Debug, Clone)]
pub struct ReviewDraft {
    /// Reviewed book.
    pub book_id: Uuid,
    /// Reviewing user.
    pub user_id: Uuid,
    /// Reviewer display name snapshot.
    pub user_name: String,
    /// Star rating, 1..=5.
    pub rating: u8,
    /// Free-text comment.
    pub comment: String,
}

impl Record for Review {
    type Draft = ReviewDraft;

    fn from_draft(meta: RecordMeta, draft: ReviewDraft) -> Self {
        Self {
            meta,
            book_id: draft.book_id,
            user_id: draft.user_id,
            user_name: draft.user_name,
            rating: draft.rating,
            comment: draft.comment,
        }
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }
}
