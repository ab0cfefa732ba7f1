//! Book chapter record.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::{Record, RecordMeta};

/// One chapter of a book, ordered by `chapter_number`.
///
/// ## Invariants
/// - `chapter_number` is the ordering key within a book and defaults to
///   `existing chapter count + 1` when omitted at creation. An explicitly
///   supplied number is stored as given; collisions are not rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    /// Identity and lifecycle stamps.
    #[serde(flatten)]
    pub meta: RecordMeta,
    /// Owning book. A weak reference: deleting the book does not cascade
    /// here, readers tolerate the orphan.
    pub book_id: Uuid,
    /// Ordering key within the book.
    pub chapter_number: u32,
    /// Chapter title.
    pub title: String,
    /// Short summary.
    #[serde(default)]
    pub summary: String,
    /// Full chapter text.
    #[serde(default)]
    pub content: String,
    /// User who added the chapter.
    pub added_by: Uuid,
}

/// Caller-supplied fields for a new chapter, numbering already resolved.
#[derive(Debug, Clone)]
pub struct ChapterDraft {
    /// Owning book.
    pub book_id: Uuid,
    /// Ordering key within the book.
    pub chapter_number: u32,
    /// Chapter title.
    pub title: String,
    /// Short summary.
    pub summary: String,
    /// Full chapter text.
    pub content: String,
    /// User adding the chapter.
    pub added_by: Uuid,
}

impl Record for Chapter {
    type Draft = ChapterDraft;

    fn from_draft(meta: RecordMeta, draft: ChapterDraft) -> Self {
        Self {
            meta,
            book_id: draft.book_id,
            chapter_number: draft.chapter_number,
            title: draft.title,
            summary: draft.summary,
            content: draft.content,
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
