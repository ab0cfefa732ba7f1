//! Book catalogue record.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::{Record, RecordMeta};

/// A catalogued book.
///
/// ## Invariants
/// - `total_copies >= 1`.
/// - `0 <= available_copies <= total_copies`; the count only moves through
///   checkout (-1), checkin (+1 capped), or a total-copies edit which
///   re-bases it by the same delta, floored at zero.
/// - `rating` and `rating_count` are derived from reviews and only written
///   by the review aggregation path (`0.0` / `0` when unreviewed).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Identity and lifecycle stamps.
    #[serde(flatten)]
    pub meta: RecordMeta,
    /// Book title.
    pub title: String,
    /// Book author.
    pub author: String,
    /// ISBN, free-form.
    #[serde(default)]
    pub isbn: String,
    /// Genre label; "Uncategorized" when the caller supplied none.
    #[serde(default)]
    pub genre: String,
    /// Publication year, if known.
    #[serde(default)]
    pub publish_year: Option<i32>,
    /// Publisher name.
    #[serde(default)]
    pub publisher: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Cover image URL.
    #[serde(default)]
    pub cover_url: String,
    /// Copies owned by the library.
    pub total_copies: u32,
    /// Copies currently on the shelf.
    pub available_copies: u32,
    /// Mean review rating rounded to one decimal, `0.0` when unreviewed.
    #[serde(default)]
    pub rating: f64,
    /// Number of reviews behind `rating`.
    #[serde(default)]
    pub rating_count: u32,
    /// User who added the book.
    pub added_by: Uuid,
}

/// Caller-supplied fields for a new book.
#[derive(Debug, Clone)]
pub struct BookDraft {
    /// Book title.
    pub title: String,
    /// Book author.
    pub author: String,
    /// ISBN, free-form.
    pub isbn: String,
    /// Genre label.
    pub genre: String,
    /// Publication year, if known.
    pub publish_year: Option<i32>,
    /// Publisher name.
    pub publisher: String,
    /// Free-text description.
    pub description: String,
    /// Cover image URL.
    pub cover_url: String,
    /// Copies owned; new books start fully available.
    pub total_copies: u32,
    /// User adding the book.
    pub added_by: Uuid,
}

impl Record for Book {
    type Draft = BookDraft;

    fn from_draft(meta: RecordMeta, draft: BookDraft) -> Self {
        Self {
            meta,
            title: draft.title,
            author: draft.author,
            isbn: draft.isbn,
            genre: draft.genre,
            publish_year: draft.publish_year,
            publisher: draft.publisher,
            description: draft.description,
            cover_url: draft.cover_url,
            total_copies: draft.total_copies,
            available_copies: draft.total_copies,
            rating: 0.0,
            rating_count: 0,
            added_by: draft.added_by,
        }
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }
}
