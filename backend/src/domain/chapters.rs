//! Chapter management: auto-numbering, bulk import, and reordering.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::store::{Record, Table};

use super::book::Book;
use super::chapter::{Chapter, ChapterDraft};
use super::error::Error;
use super::user::Actor;

/// Caller input for a single new chapter.
#[derive(Debug, Clone)]
pub struct NewChapter {
    /// Owning book.
    pub book_id: Uuid,
    /// Explicit number; defaults to the book's chapter count plus one.
    pub chapter_number: Option<u32>,
    /// Chapter title, required.
    pub title: String,
    /// Short summary.
    pub summary: String,
    /// Full chapter text.
    pub content: String,
}

/// One entry of a bulk chapter import.
#[derive(Debug, Clone, Default)]
pub struct BulkChapterItem {
    /// Explicit number; defaults to the next slot in the sequence.
    pub chapter_number: Option<u32>,
    /// Title; defaults to "Chapter N" for its slot.
    pub title: Option<String>,
    /// Short summary.
    pub summary: String,
    /// Full chapter text.
    pub content: String,
}

/// Partial edit of a chapter. `None` fields keep their prior value.
#[derive(Debug, Clone, Default)]
pub struct ChapterPatch {
    /// New number.
    pub chapter_number: Option<u32>,
    /// New title.
    pub title: Option<String>,
    /// New summary.
    pub summary: Option<String>,
    /// New content.
    pub content: Option<String>,
}

/// One (chapter, number) assignment of a reorder batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterPlacement {
    /// Chapter to renumber.
    pub id: Uuid,
    /// Its new number.
    pub chapter_number: u32,
}

/// A book's chapters in reading order, with the book title for headers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterList {
    /// Chapters sorted by number.
    pub chapters: Vec<Chapter>,
    /// Owning book's title.
    pub book_title: String,
}

/// One chapter with book context for display. The book fields are `None`
/// when the book has since been deleted (references never cascade).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterView {
    /// The chapter.
    pub chapter: Chapter,
    /// Owning book's title, if the book still exists.
    pub book_title: Option<String>,
    /// Owning book's author, if the book still exists.
    pub book_author: Option<String>,
}

/// Chapter operations over the chapters and books collections.
#[derive(Clone)]
pub struct ChapterService {
    chapters: Arc<Table<Chapter>>,
    books: Arc<Table<Book>>,
}

impl ChapterService {
    /// Create the service over its collections.
    pub fn new(chapters: Arc<Table<Chapter>>, books: Arc<Table<Book>>) -> Self {
        Self { chapters, books }
    }

    /// A book's chapters sorted by number.
    pub async fn list_for_book(&self, book_id: Uuid) -> Result<ChapterList, Error> {
        let book = self
            .books
            .find_by_id(book_id)
            .await?
            .ok_or_else(|| Error::not_found("Book not found"))?;
        let mut chapters = self.chapters.find(|c| c.book_id == book_id).await?;
        chapters.sort_by_key(|c| c.chapter_number);
        Ok(ChapterList {
            chapters,
            book_title: book.title,
        })
    }

    /// One chapter with full content and book context.
    pub async fn get(&self, chapter_id: Uuid) -> Result<ChapterView, Error> {
        let chapter = self
            .chapters
            .find_by_id(chapter_id)
            .await?
            .ok_or_else(|| Error::not_found("Chapter not found"))?;
        let book = self.books.find_by_id(chapter.book_id).await?;
        Ok(ChapterView {
            chapter,
            book_title: book.as_ref().map(|b| b.title.clone()),
            book_author: book.map(|b| b.author),
        })
    }

    /// Add a chapter. Staff only. An omitted number defaults to the book's
    /// current chapter count plus one; an explicit number is stored as
    /// given, collisions and all.
    pub async fn create(&self, actor: &Actor, new: NewChapter) -> Result<Chapter, Error> {
        if !actor.is_staff() {
            return Err(Error::forbidden("Only staff may add chapters"));
        }
        if new.title.trim().is_empty() {
            return Err(Error::validation("Chapter title is required"));
        }
        self.books
            .find_by_id(new.book_id)
            .await?
            .ok_or_else(|| Error::not_found("Book not found"))?;
        let number = match new.chapter_number {
            Some(number) => number,
            None => next_number(self.count_for_book(new.book_id).await?),
        };
        let chapter = self
            .chapters
            .create(ChapterDraft {
                book_id: new.book_id,
                chapter_number: number,
                title: new.title,
                summary: new.summary,
                content: new.content,
                added_by: actor.id,
            })
            .await?;
        debug!(chapter_id = %chapter.id(), book_id = %new.book_id, number, "chapter added");
        Ok(chapter)
    }

    /// Bulk-import chapters for one book in a single store write. Numbering
    /// continues from the book's current count; each item may override its
    /// slot explicitly.
    pub async fn create_bulk(
        &self,
        actor: &Actor,
        book_id: Uuid,
        items: Vec<BulkChapterItem>,
    ) -> Result<Vec<Chapter>, Error> {
        if !actor.is_staff() {
            return Err(Error::forbidden("Only staff may add chapters"));
        }
        if items.is_empty() {
            return Err(Error::validation("Chapters array must not be empty"));
        }
        self.books
            .find_by_id(book_id)
            .await?
            .ok_or_else(|| Error::not_found("Book not found"))?;
        let base = next_number(self.count_for_book(book_id).await?);
        let drafts = items
            .into_iter()
            .enumerate()
            .map(|(offset, item)| {
                let slot = base + offset as u32;
                ChapterDraft {
                    book_id,
                    chapter_number: item.chapter_number.unwrap_or(slot),
                    title: item
                        .title
                        .filter(|t| !t.trim().is_empty())
                        .unwrap_or_else(|| format!("Chapter {slot}")),
                    summary: item.summary,
                    content: item.content,
                    added_by: actor.id,
                }
            })
            .collect();
        Ok(self.chapters.create_many(drafts).await?)
    }

    /// Edit a chapter. Staff only.
    pub async fn update(
        &self,
        actor: &Actor,
        chapter_id: Uuid,
        patch: ChapterPatch,
    ) -> Result<Chapter, Error> {
        if !actor.is_staff() {
            return Err(Error::forbidden("Only staff may edit chapters"));
        }
        self.chapters
            .update(chapter_id, move |chapter| {
                if let Some(number) = patch.chapter_number {
                    chapter.chapter_number = number;
                }
                if let Some(title) = patch.title {
                    chapter.title = title;
                }
                if let Some(summary) = patch.summary {
                    chapter.summary = summary;
                }
                if let Some(content) = patch.content {
                    chapter.content = content;
                }
            })
            .await?
            .ok_or_else(|| Error::not_found("Chapter not found"))
    }

    /// Remove a chapter. Staff only.
    pub async fn delete(&self, actor: &Actor, chapter_id: Uuid) -> Result<(), Error> {
        if !actor.is_staff() {
            return Err(Error::forbidden("Only staff may delete chapters"));
        }
        if self.chapters.delete(chapter_id).await? {
            Ok(())
        } else {
            Err(Error::not_found("Chapter not found"))
        }
    }

    /// Renumber a batch of one book's chapters in a single read-rewrite
    /// cycle under the chapters lock, then return the book's chapters in
    /// their new order. Numbers are applied verbatim: no uniqueness check
    /// across the batch. Placements naming unknown chapter ids are
    /// silently skipped.
    pub async fn reorder(
        &self,
        actor: &Actor,
        book_id: Uuid,
        placements: Vec<ChapterPlacement>,
    ) -> Result<Vec<Chapter>, Error> {
        if !actor.is_staff() {
            return Err(Error::forbidden("Only staff may reorder chapters"));
        }
        let now = Utc::now();
        let mut chapters = self
            .chapters
            .with_records(move |records| {
                for placement in &placements {
                    if let Some(chapter) = records.iter_mut().find(|c| c.id() == placement.id) {
                        chapter.chapter_number = placement.chapter_number;
                        chapter.meta.touch(now);
                    }
                }
                records
                    .iter()
                    .filter(|c| c.book_id == book_id)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .await?;
        chapters.sort_by_key(|c| c.chapter_number);
        Ok(chapters)
    }

    /// Number of chapters currently recorded for one book.
    async fn count_for_book(&self, book_id: Uuid) -> Result<usize, Error> {
        Ok(self.chapters.find(|c| c.book_id == book_id).await?.len())
    }
}

/// Default number for the next chapter of a book with `existing` chapters.
fn next_number(existing: usize) -> u32 {
    existing as u32 + 1
}

#[cfg(test)]
#[path = "chapters_tests.rs"]
mod tests;
