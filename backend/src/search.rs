//! Free-text content search across books and chapters.
//!
//! Everything is scored in memory against a fresh read of the two
//! collections: field-specific containment matches with fixed relevance
//! weights, an occurrence bonus for chapter full-text hits, and snippet
//! extraction around the first match. There is no index; at this store's
//! scale a scan per query is the design.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Book, Chapter, Error, Page, PageRequest};
use crate::store::{Record, Table};

/// Shortest accepted query, in characters.
pub const MIN_QUERY_CHARS: usize = 2;

/// Characters of context kept on each side of a snippet's match.
const SNIPPET_CONTEXT: usize = 120;

/// Which record sets a search touches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchScope {
    /// Books, chapter metadata, and chapter content.
    #[default]
    All,
    /// Book-level fields only.
    Books,
    /// Chapter titles and summaries only.
    Chapters,
    /// Chapter full text only.
    Content,
}

/// What kind of record a hit came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitKind {
    /// A book-level field matched.
    Book,
    /// A chapter title or summary matched.
    Chapter,
    /// Only the chapter full text matched.
    Content,
}

/// The field a hit matched in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchField {
    /// Book title.
    Title,
    /// Book author.
    Author,
    /// Book ISBN.
    Isbn,
    /// Book genre.
    Genre,
    /// Book description or publisher.
    Description,
    /// Chapter title.
    ChapterTitle,
    /// Chapter summary.
    ChapterSummary,
    /// Chapter full text.
    ChapterContent,
}

/// Search input.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Query string; trimmed, minimum [`MIN_QUERY_CHARS`] characters.
    pub query: String,
    /// Record sets to scan.
    pub scope: SearchScope,
    /// Page selection.
    pub page: PageRequest,
}

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    /// Record set the hit came from.
    #[serde(rename = "type")]
    pub kind: HitKind,
    /// Book the hit belongs to.
    pub book_id: Uuid,
    /// Book title.
    pub book_title: String,
    /// Book author.
    pub book_author: String,
    /// Book genre.
    pub book_genre: String,
    /// Matched chapter, for chapter and content hits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapter_id: Option<Uuid>,
    /// Matched chapter's number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapter_number: Option<u32>,
    /// Matched chapter's title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapter_title: Option<String>,
    /// Field the hit matched in.
    pub match_in: MatchField,
    /// Context around the first match.
    pub snippet: String,
    /// Context around the first full-text match, when a chapter hit also
    /// matched in its content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_snippet: Option<String>,
    /// Full-text occurrence count, for content matches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occurrences: Option<usize>,
    /// Ranking weight; higher sorts first.
    pub relevance: u32,
}

/// Aggregate counters over the full (pre-pagination) result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchStats {
    /// Book-level hits.
    pub book_hits: usize,
    /// Chapter title/summary hits.
    pub chapter_hits: usize,
    /// Content-only hits.
    pub content_hits: usize,
    /// Distinct books across all hits.
    pub unique_books: usize,
}

/// Search output: one page of ranked hits plus aggregate counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    /// The requested page of hits, relevance descending.
    #[serde(flatten)]
    pub page: Page<SearchHit>,
    /// Counters over the full result set.
    pub stats: SearchStats,
    /// The trimmed query that was executed.
    pub query: String,
}

/// Ranked free-text search over the books and chapters collections.
#[derive(Clone)]
pub struct SearchService {
    books: Arc<Table<Book>>,
    chapters: Arc<Table<Chapter>>,
}

impl SearchService {
    /// Create the service over its collections.
    pub fn new(books: Arc<Table<Book>>, chapters: Arc<Table<Chapter>>) -> Self {
        Self { books, chapters }
    }

    /// Execute a search. Results are appended in scan order (books, then
    /// chapters, then content-only) and stably sorted by relevance, so
    /// equal scores keep that order.
    pub async fn search(&self, request: SearchRequest) -> Result<SearchResponse, Error> {
        let query = request.query.trim().to_owned();
        if query.chars().count() < MIN_QUERY_CHARS {
            return Err(Error::validation(format!(
                "Search query must be at least {MIN_QUERY_CHARS} characters"
            )));
        }
        let needle = query.to_lowercase();
        let scope = request.scope;

        let books = self.books.read_all().await?;
        let chapters = self.chapters.read_all().await?;
        let mut hits: Vec<SearchHit> = Vec::new();

        if matches!(scope, SearchScope::All | SearchScope::Books) {
            for book in &books {
                if let Some(hit) = match_book(book, &needle) {
                    hits.push(hit);
                }
            }
        }

        if matches!(scope, SearchScope::All | SearchScope::Chapters) {
            for chapter in &chapters {
                // Orphaned chapters (book deleted, no cascade) are skipped.
                let Some(book) = books.iter().find(|b| b.id() == chapter.book_id) else {
                    continue;
                };
                if let Some(hit) = match_chapter(chapter, book, &needle) {
                    hits.push(hit);
                }
            }
        }

        if matches!(scope, SearchScope::All | SearchScope::Content) {
            for chapter in &chapters {
                let Some(book) = books.iter().find(|b| b.id() == chapter.book_id) else {
                    continue;
                };
                if !chapter.content.to_lowercase().contains(&needle) {
                    continue;
                }
                let occurrences = chapter.content.to_lowercase().matches(&needle).count();
                let merged = hits
                    .iter()
                    .position(|h| h.kind == HitKind::Chapter && h.chapter_id == Some(chapter.id()));
                if let Some(index) = merged {
                    // The chapter already matched on title/summary: fold the
                    // content match into the same row instead of duplicating.
                    let existing = &mut hits[index];
                    existing.content_snippet = Some(snippet(&chapter.content, &needle));
                    existing.occurrences = Some(occurrences);
                    existing.relevance += occurrence_bonus(occurrences);
                } else {
                    hits.push(SearchHit {
                        kind: HitKind::Content,
                        book_id: chapter.book_id,
                        book_title: book.title.clone(),
                        book_author: book.author.clone(),
                        book_genre: book.genre.clone(),
                        chapter_id: Some(chapter.id()),
                        chapter_number: Some(chapter.chapter_number),
                        chapter_title: Some(chapter.title.clone()),
                        match_in: MatchField::ChapterContent,
                        snippet: snippet(&chapter.content, &needle),
                        content_snippet: None,
                        occurrences: Some(occurrences),
                        relevance: 40 + occurrence_bonus(occurrences),
                    });
                }
            }
        }

        hits.sort_by(|a, b| b.relevance.cmp(&a.relevance));

        let stats = SearchStats {
            book_hits: hits.iter().filter(|h| h.kind == HitKind::Book).count(),
            chapter_hits: hits.iter().filter(|h| h.kind == HitKind::Chapter).count(),
            content_hits: hits.iter().filter(|h| h.kind == HitKind::Content).count(),
            unique_books: hits.iter().map(|h| h.book_id).collect::<HashSet<_>>().len(),
        };

        Ok(SearchResponse {
            page: Page::slice(hits, request.page),
            stats,
            query,
        })
    }
}

fn occurrence_bonus(occurrences: usize) -> u32 {
    u32::try_from(occurrences).unwrap_or(u32::MAX).saturating_mul(2)
}

fn match_book(book: &Book, needle: &str) -> Option<SearchHit> {
    let fields = [
        &book.title,
        &book.author,
        &book.isbn,
        &book.genre,
        &book.description,
        &book.publisher,
    ];
    let matched = fields
        .into_iter()
        .find(|f| f.to_lowercase().contains(needle))?;

    // Snippet from the first matching field in scan order; the reported
    // field follows a fixed priority, publisher folding into description.
    let match_in = if book.title.to_lowercase().contains(needle) {
        MatchField::Title
    } else if book.author.to_lowercase().contains(needle) {
        MatchField::Author
    } else if book.isbn.to_lowercase().contains(needle) {
        MatchField::Isbn
    } else if book.genre.to_lowercase().contains(needle) {
        MatchField::Genre
    } else {
        MatchField::Description
    };

    Some(SearchHit {
        kind: HitKind::Book,
        book_id: book.id(),
        book_title: book.title.clone(),
        book_author: book.author.clone(),
        book_genre: book.genre.clone(),
        chapter_id: None,
        chapter_number: None,
        chapter_title: None,
        match_in,
        snippet: snippet(matched, needle),
        content_snippet: None,
        occurrences: None,
        relevance: match match_in {
            MatchField::Title => 100,
            MatchField::Author => 90,
            _ => 50,
        },
    })
}

fn match_chapter(chapter: &Chapter, book: &Book, needle: &str) -> Option<SearchHit> {
    let title_match = chapter.title.to_lowercase().contains(needle);
    let summary_match = chapter.summary.to_lowercase().contains(needle);
    if !title_match && !summary_match {
        return None;
    }
    let (match_in, field, relevance) = if title_match {
        (MatchField::ChapterTitle, &chapter.title, 80)
    } else {
        (MatchField::ChapterSummary, &chapter.summary, 60)
    };
    Some(SearchHit {
        kind: HitKind::Chapter,
        book_id: chapter.book_id,
        book_title: book.title.clone(),
        book_author: book.author.clone(),
        book_genre: book.genre.clone(),
        chapter_id: Some(chapter.id()),
        chapter_number: Some(chapter.chapter_number),
        chapter_title: Some(chapter.title.clone()),
        match_in,
        snippet: snippet(field, needle),
        content_snippet: None,
        occurrences: None,
        relevance,
    })
}

/// Context around the first case-insensitive occurrence of `needle_lower`
/// in `text`, with ellipsis markers where text was cut. Falls back to the
/// leading [`SNIPPET_CONTEXT`]·2 characters when the needle is absent.
fn snippet(text: &str, needle_lower: &str) -> String {
    let Some(start) = find_ci(text, needle_lower) else {
        let lead: String = text.chars().take(SNIPPET_CONTEXT * 2).collect();
        return if text.chars().count() > SNIPPET_CONTEXT * 2 {
            format!("{lead}...")
        } else {
            lead
        };
    };
    let match_end = start + ci_match_len(&text[start..], needle_lower);
    let prefix = &text[..start];
    let suffix = &text[match_end..];

    let before: String = {
        let tail: Vec<char> = prefix.chars().rev().take(SNIPPET_CONTEXT).collect();
        tail.into_iter().rev().collect()
    };
    let after: String = suffix.chars().take(SNIPPET_CONTEXT).collect();

    let mut out = String::new();
    if prefix.chars().count() > SNIPPET_CONTEXT {
        out.push_str("...");
    }
    out.push_str(&before);
    out.push_str(&text[start..match_end]);
    out.push_str(&after);
    if suffix.chars().count() > SNIPPET_CONTEXT {
        out.push_str("...");
    }
    out
}

/// Byte offset of the first case-insensitive occurrence of `needle_lower`
/// in `haystack`, scanning char boundaries so non-ASCII case folds stay
/// safe.
fn find_ci(haystack: &str, needle_lower: &str) -> Option<usize> {
    if needle_lower.is_empty() {
        return Some(0);
    }
    haystack
        .char_indices()
        .map(|(i, _)| i)
        .find(|&i| starts_with_ci(&haystack[i..], needle_lower))
}

fn starts_with_ci(text: &str, needle_lower: &str) -> bool {
    let mut folded = text.chars().flat_map(char::to_lowercase);
    needle_lower.chars().all(|n| folded.next() == Some(n))
}

/// Byte length of the prefix of `text` whose lowercase form equals
/// `needle_lower`. Callers have already established the match via
/// [`find_ci`].
fn ci_match_len(text: &str, needle_lower: &str) -> usize {
    let mut remaining = needle_lower.chars().peekable();
    for (i, c) in text.char_indices() {
        if remaining.peek().is_none() {
            return i;
        }
        for lc in c.to_lowercase() {
            if remaining.next_if_eq(&lc).is_none() {
                return i;
            }
        }
    }
    text.len()
}

#[cfg(test)]
#[path = "search_tests.rs"]
mod tests;
