//! Ranking, merging, and snippet behaviour of the search service.

use std::sync::Arc;

use tempfile::TempDir;
use uuid::Uuid;

use crate::domain::{BookDraft, ChapterDraft, ErrorCode, PageRequest};
use crate::store::Library;

use super::*;

struct Fixture {
    _dir: TempDir,
    library: Library,
    service: SearchService,
}

async fn fixture() -> Fixture {
    let dir = tempfile::tempdir().expect("tempdir");
    let library = Library::open(dir.path()).expect("open library");
    let service = SearchService::new(Arc::clone(&library.books), Arc::clone(&library.chapters));
    Fixture {
        _dir: dir,
        library,
        service,
    }
}

async fn seed_book(library: &Library, title: &str, description: &str) -> Book {
    library
        .books
        .create(BookDraft {
            title: title.to_owned(),
            author: "Naomi Novik".to_owned(),
            isbn: String::new(),
            genre: "Fantasy".to_owned(),
            publish_year: None,
            publisher: String::new(),
            description: description.to_owned(),
            cover_url: String::new(),
            total_copies: 1,
            added_by: Uuid::new_v4(),
        })
        .await
        .expect("seed book")
}

async fn seed_chapter(
    library: &Library,
    book_id: Uuid,
    title: &str,
    summary: &str,
    content: &str,
) -> Chapter {
    library
        .chapters
        .create(ChapterDraft {
            book_id,
            chapter_number: 1,
            title: title.to_owned(),
            summary: summary.to_owned(),
            content: content.to_owned(),
            added_by: Uuid::new_v4(),
        })
        .await
        .expect("seed chapter")
}

fn request(query: &str) -> SearchRequest {
    SearchRequest {
        query: query.to_owned(),
        scope: SearchScope::All,
        page: PageRequest::default(),
    }
}

#[tokio::test]
async fn queries_shorter_than_two_characters_are_rejected() {
    let fx = fixture().await;
    let err = fx
        .service
        .search(request(" a "))
        .await
        .expect_err("too short");
    assert_eq!(err.code, ErrorCode::Validation);
    assert_eq!(err.message, "Search query must be at least 2 characters");
}

#[tokio::test]
async fn hits_rank_title_over_description_over_content() {
    let fx = fixture().await;
    seed_book(&fx.library, "Dragonhaven", "A zoo memoir.").await;
    let hidden = seed_book(
        &fx.library,
        "The Hidden Palace",
        "Deep below the city a dragon sleeps.",
    )
    .await;
    seed_chapter(
        &fx.library,
        hidden.meta.id,
        "Under the Streets",
        "The descent begins.",
        "The dragon stirred. The dragon breathed. The dragon slept on.",
    )
    .await;

    let response = fx.service.search(request("dragon")).await.expect("search");
    let hits = &response.page.items;
    assert_eq!(hits.len(), 3);

    assert_eq!(hits[0].kind, HitKind::Book);
    assert_eq!(hits[0].match_in, MatchField::Title);
    assert_eq!(hits[0].relevance, 100);
    assert_eq!(hits[0].book_title, "Dragonhaven");

    assert_eq!(hits[1].kind, HitKind::Book);
    assert_eq!(hits[1].match_in, MatchField::Description);
    assert_eq!(hits[1].relevance, 50);

    assert_eq!(hits[2].kind, HitKind::Content);
    assert_eq!(hits[2].match_in, MatchField::ChapterContent);
    assert_eq!(hits[2].occurrences, Some(3));
    assert_eq!(hits[2].relevance, 46);
    assert_eq!(hits[2].chapter_title.as_deref(), Some("Under the Streets"));

    assert_eq!(response.stats.book_hits, 2);
    assert_eq!(response.stats.chapter_hits, 0);
    assert_eq!(response.stats.content_hits, 1);
    assert_eq!(response.stats.unique_books, 2);
}

#[tokio::test]
async fn matching_is_case_insensitive() {
    let fx = fixture().await;
    seed_book(&fx.library, "Spinning Silver", "Miryem turns SILVER to gold.").await;

    let response = fx.service.search(request("silver")).await.expect("search");
    assert_eq!(response.page.items.len(), 1);
    assert_eq!(response.page.items[0].match_in, MatchField::Title);
}

#[tokio::test]
async fn content_match_folds_into_an_existing_chapter_hit() {
    let fx = fixture().await;
    let book = seed_book(&fx.library, "Uprooted", "The Wood takes people.").await;
    seed_chapter(
        &fx.library,
        book.meta.id,
        "The Wood-Queen",
        "A meeting in the trees.",
        "The wood-queen waited. The wood-queen watched.",
    )
    .await;

    let response = fx
        .service
        .search(request("wood-queen"))
        .await
        .expect("search");
    let hits = &response.page.items;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].kind, HitKind::Chapter);
    assert_eq!(hits[0].match_in, MatchField::ChapterTitle);
    // Title weight plus two occurrences in the content.
    assert_eq!(hits[0].relevance, 84);
    assert_eq!(hits[0].occurrences, Some(2));
    assert!(hits[0].content_snippet.is_some());

    assert_eq!(response.stats.chapter_hits, 1);
    assert_eq!(response.stats.content_hits, 0);
}

#[tokio::test]
async fn summary_matches_rank_below_title_matches() {
    let fx = fixture().await;
    let book = seed_book(&fx.library, "A Deadly Education", "Scholomance, year one.").await;
    seed_chapter(
        &fx.library,
        book.meta.id,
        "Orientation",
        "El meets the maleficaria for the first time.",
        "",
    )
    .await;

    let response = fx
        .service
        .search(request("maleficaria"))
        .await
        .expect("search");
    assert_eq!(response.page.items.len(), 1);
    assert_eq!(response.page.items[0].match_in, MatchField::ChapterSummary);
    assert_eq!(response.page.items[0].relevance, 60);
}

#[tokio::test]
async fn chapters_of_deleted_books_are_skipped() {
    let fx = fixture().await;
    seed_chapter(
        &fx.library,
        Uuid::new_v4(),
        "Orphaned",
        "An orphaned chapter.",
        "orphaned content everywhere",
    )
    .await;

    let response = fx
        .service
        .search(request("orphaned"))
        .await
        .expect("search");
    assert!(response.page.items.is_empty());
    assert_eq!(response.stats.unique_books, 0);
}

#[tokio::test]
async fn scope_restricts_which_collections_are_scanned() {
    let fx = fixture().await;
    let book = seed_book(&fx.library, "The Golden Enclaves", "Enclave politics.").await;
    seed_chapter(
        &fx.library,
        book.meta.id,
        "Enclave Gates",
        "",
        "enclave upon enclave",
    )
    .await;

    let books_only = fx
        .service
        .search(SearchRequest {
            scope: SearchScope::Books,
            ..request("enclave")
        })
        .await
        .expect("search");
    assert_eq!(books_only.page.items.len(), 1);
    assert_eq!(books_only.page.items[0].kind, HitKind::Book);

    let content_only = fx
        .service
        .search(SearchRequest {
            scope: SearchScope::Content,
            ..request("enclave")
        })
        .await
        .expect("search");
    assert_eq!(content_only.page.items.len(), 1);
    assert_eq!(content_only.page.items[0].kind, HitKind::Content);
    assert_eq!(content_only.page.items[0].occurrences, Some(2));
}

#[tokio::test]
async fn results_paginate_after_ranking() {
    let fx = fixture().await;
    seed_book(&fx.library, "Temeraire", "A dragon of the Corps.").await;
    seed_book(&fx.library, "Throne of Jade", "The dragon sails to China.").await;
    seed_book(&fx.library, "Black Powder War", "Overland with the dragon.").await;

    let response = fx
        .service
        .search(SearchRequest {
            page: PageRequest {
                page: 2,
                per_page: 2,
            },
            ..request("dragon")
        })
        .await
        .expect("search");
    assert_eq!(response.page.total, 3);
    assert_eq!(response.page.total_pages, 2);
    assert_eq!(response.page.items.len(), 1);
    assert_eq!(response.stats.book_hits, 3);
}

#[test]
fn snippets_mark_trimmed_context_with_ellipses() {
    let padding = "lorem ipsum dolor sit amet ".repeat(20);
    let text = format!("{padding}THE NEEDLE{padding}");
    let out = snippet(&text, "the needle");

    assert!(out.starts_with("..."));
    assert!(out.ends_with("..."));
    assert!(out.contains("THE NEEDLE"));
    // 120 characters of context each side plus the match and markers.
    assert!(out.chars().count() <= 120 * 2 + "THE NEEDLE".len() + 6);
}

#[test]
fn short_texts_are_returned_whole() {
    assert_eq!(snippet("a dragon sleeps", "dragon"), "a dragon sleeps");
}

#[test]
fn absent_needles_fall_back_to_the_leading_context() {
    let text = "x".repeat(500);
    let out = snippet(&text, "missing");
    assert_eq!(out.chars().count(), 240 + 3);
    assert!(out.ends_with("..."));
}
