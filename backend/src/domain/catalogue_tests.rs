//! Catalogue and review-aggregation scenarios against a real store.

use std::sync::Arc;

use rstest::rstest;
use tempfile::TempDir;
use uuid::Uuid;

use crate::domain::chapter::ChapterDraft;
use crate::domain::error::ErrorCode;
use crate::domain::user::{AuthProvider, Role, UserDraft};
use crate::store::Library;

use super::*;

struct Fixture {
    _dir: TempDir,
    library: Library,
    service: CatalogueService,
}

async fn fixture() -> Fixture {
    let dir = tempfile::tempdir().expect("tempdir");
    let library = Library::open(dir.path()).expect("open library");
    let service = CatalogueService::new(
        Arc::clone(&library.books),
        Arc::clone(&library.reviews),
        Arc::clone(&library.users),
    );
    Fixture {
        _dir: dir,
        library,
        service,
    }
}

async fn seed_member(library: &Library, name: &str) -> Actor {
    let user = library
        .users
        .create(UserDraft {
            name: name.to_owned(),
            email: format!("{}@example.com", name.to_lowercase()),
            password_hash: "hash".to_owned(),
            role: Role::Member,
            provider: AuthProvider::Local,
            provider_id: None,
            avatar: None,
            theme: "light".to_owned(),
        })
        .await
        .expect("seed member");
    Actor {
        id: user.id(),
        role: Role::Member,
    }
}

fn staff() -> Actor {
    Actor {
        id: Uuid::new_v4(),
        role: Role::Librarian,
    }
}

fn admin() -> Actor {
    Actor {
        id: Uuid::new_v4(),
        role: Role::Admin,
    }
}

fn new_book(title: &str, author: &str) -> NewBook {
    NewBook {
        title: title.to_owned(),
        author: author.to_owned(),
        ..NewBook::default()
    }
}

#[tokio::test]
async fn create_applies_defaults_and_starts_fully_available() {
    let fx = fixture().await;
    let book = fx
        .service
        .create_book(&staff(), new_book("Piranesi", "Susanna Clarke"))
        .await
        .expect("create");

    assert_eq!(book.genre, "Uncategorized");
    assert_eq!(book.total_copies, 1);
    assert_eq!(book.available_copies, 1);
    assert_eq!(book.rating, 0.0);
    assert_eq!(book.rating_count, 0);
}

#[rstest]
#[case("", "Susanna Clarke")]
#[case("Piranesi", "")]
#[case("   ", "Susanna Clarke")]
#[tokio::test]
async fn create_requires_title_and_author(#[case] title: &str, #[case] author: &str) {
    let fx = fixture().await;
    let err = fx
        .service
        .create_book(&staff(), new_book(title, author))
        .await
        .expect_err("must be rejected");
    assert_eq!(err.code, ErrorCode::Validation);
}

#[tokio::test]
async fn create_rejects_members_and_zero_copies() {
    let fx = fixture().await;
    let member = seed_member(&fx.library, "Member").await;

    let err = fx
        .service
        .create_book(&member, new_book("Any", "One"))
        .await
        .expect_err("members cannot add books");
    assert_eq!(err.code, ErrorCode::Forbidden);

    let mut zero = new_book("Any", "One");
    zero.total_copies = Some(0);
    let err = fx
        .service
        .create_book(&staff(), zero)
        .await
        .expect_err("zero copies");
    assert_eq!(err.code, ErrorCode::Validation);
}

#[tokio::test]
async fn raising_total_copies_rebases_availability_by_the_delta() {
    let fx = fixture().await;
    let mut spec = new_book("The Ten Thousand Doors", "Alix E. Harrow");
    spec.total_copies = Some(3);
    let book = fx.service.create_book(&staff(), spec).await.expect("create");

    // Two copies out.
    fx.library
        .books
        .update(book.id(), |b| b.available_copies = 1)
        .await
        .expect("update")
        .expect("present");

    let grown = fx
        .service
        .update_book(
            &staff(),
            book.id(),
            BookPatch {
                total_copies: Some(5),
                ..BookPatch::default()
            },
        )
        .await
        .expect("update");
    assert_eq!(grown.total_copies, 5);
    assert_eq!(grown.available_copies, 3);
}

#[tokio::test]
async fn shrinking_total_copies_floors_availability_at_zero() {
    let fx = fixture().await;
    let mut spec = new_book("Starling House", "Alix E. Harrow");
    spec.total_copies = Some(5);
    let book = fx.service.create_book(&staff(), spec).await.expect("create");

    fx.library
        .books
        .update(book.id(), |b| b.available_copies = 3)
        .await
        .expect("update")
        .expect("present");

    let shrunk = fx
        .service
        .update_book(
            &staff(),
            book.id(),
            BookPatch {
                total_copies: Some(1),
                ..BookPatch::default()
            },
        )
        .await
        .expect("update");
    assert_eq!(shrunk.total_copies, 1);
    assert_eq!(shrunk.available_copies, 0);
}

#[tokio::test]
async fn patch_keeps_unmentioned_fields_and_clears_year_explicitly() {
    let fx = fixture().await;
    let mut spec = new_book("The Once and Future Witches", "Alix E. Harrow");
    spec.publish_year = Some(2020);
    let book = fx.service.create_book(&staff(), spec).await.expect("create");

    let patched = fx
        .service
        .update_book(
            &staff(),
            book.id(),
            BookPatch {
                genre: Some("Historical Fantasy".to_owned()),
                publish_year: Some(None),
                ..BookPatch::default()
            },
        )
        .await
        .expect("update");
    assert_eq!(patched.title, book.title);
    assert_eq!(patched.genre, "Historical Fantasy");
    assert!(patched.publish_year.is_none());
}

#[tokio::test]
async fn delete_is_admin_only_and_does_not_cascade() {
    let fx = fixture().await;
    let book = fx
        .service
        .create_book(&staff(), new_book("Orphan Maker", "Nobody"))
        .await
        .expect("create");
    fx.library
        .chapters
        .create(ChapterDraft {
            book_id: book.id(),
            chapter_number: 1,
            title: "One".to_owned(),
            summary: String::new(),
            content: String::new(),
            added_by: Uuid::new_v4(),
        })
        .await
        .expect("seed chapter");

    let err = fx
        .service
        .delete_book(&staff(), book.id())
        .await
        .expect_err("staff cannot delete");
    assert_eq!(err.code, ErrorCode::Forbidden);

    fx.service
        .delete_book(&admin(), book.id())
        .await
        .expect("admin delete");

    // The chapter keeps its dangling reference.
    let orphans = fx
        .library
        .chapters
        .find(|c| c.book_id == book.id())
        .await
        .expect("find");
    assert_eq!(orphans.len(), 1);
}

#[tokio::test]
async fn two_reviews_average_to_one_decimal() {
    let fx = fixture().await;
    let book = fx
        .service
        .create_book(&staff(), new_book("The Spear Cuts Through Water", "Simon Jimenez"))
        .await
        .expect("create");
    let alice = seed_member(&fx.library, "Alice").await;
    let bob = seed_member(&fx.library, "Bob").await;

    fx.service
        .add_review(&alice, book.id(), 4, "Lovely".to_owned())
        .await
        .expect("first review");
    fx.service
        .add_review(&bob, book.id(), 5, "Stunning".to_owned())
        .await
        .expect("second review");

    let shelf = fx.service.get(book.id()).await.expect("get");
    assert_eq!(shelf.book.rating, 4.5);
    assert_eq!(shelf.book.rating_count, 2);
    assert_eq!(shelf.reviews.len(), 2);
    assert_eq!(shelf.reviews[0].user_name, "Alice");
}

#[tokio::test]
async fn second_review_by_the_same_user_leaves_aggregates_untouched() {
    let fx = fixture().await;
    let book = fx
        .service
        .create_book(&staff(), new_book("Vita Nostra", "Marina Dyachenko"))
        .await
        .expect("create");
    let alice = seed_member(&fx.library, "Alice").await;

    fx.service
        .add_review(&alice, book.id(), 4, String::new())
        .await
        .expect("first review");
    let err = fx
        .service
        .add_review(&alice, book.id(), 1, "changed my mind".to_owned())
        .await
        .expect_err("one review per user per book");
    assert_eq!(err.code, ErrorCode::Duplicate);

    let shelf = fx.service.get(book.id()).await.expect("get");
    assert_eq!(shelf.book.rating, 4.0);
    assert_eq!(shelf.book.rating_count, 1);
}

#[tokio::test]
async fn rating_mean_rounds_to_one_decimal() {
    let fx = fixture().await;
    let book = fx
        .service
        .create_book(&staff(), new_book("Ninth House", "Leigh Bardugo"))
        .await
        .expect("create");
    for (name, rating) in [("Alice", 4), ("Bob", 4), ("Cora", 5)] {
        let reviewer = seed_member(&fx.library, name).await;
        fx.service
            .add_review(&reviewer, book.id(), rating, String::new())
            .await
            .expect("review");
    }

    let shelf = fx.service.get(book.id()).await.expect("get");
    // 13 / 3 = 4.333..., rounded to one decimal.
    assert_eq!(shelf.book.rating, 4.3);
    assert_eq!(shelf.book.rating_count, 3);
}

#[rstest]
#[case(0)]
#[case(6)]
#[tokio::test]
async fn out_of_range_ratings_are_rejected(#[case] rating: u8) {
    let fx = fixture().await;
    let book = fx
        .service
        .create_book(&staff(), new_book("Hell Bent", "Leigh Bardugo"))
        .await
        .expect("create");
    let alice = seed_member(&fx.library, "Alice").await;

    let err = fx
        .service
        .add_review(&alice, book.id(), rating, String::new())
        .await
        .expect_err("out of range");
    assert_eq!(err.code, ErrorCode::Validation);
}

#[tokio::test]
async fn reviewer_name_snapshot_falls_back_to_unknown() {
    let fx = fixture().await;
    let book = fx
        .service
        .create_book(&staff(), new_book("Some Book", "Some Author"))
        .await
        .expect("create");
    let ghost = Actor {
        id: Uuid::new_v4(),
        role: Role::Member,
    };

    let review = fx
        .service
        .add_review(&ghost, book.id(), 3, String::new())
        .await
        .expect("review");
    assert_eq!(review.user_name, "Unknown");
}

#[tokio::test]
async fn list_filters_sorts_and_reports_distinct_genres() {
    let fx = fixture().await;
    for (title, author, genre) in [
        ("Gideon the Ninth", "Tamsyn Muir", "Science Fiction"),
        ("Harrow the Ninth", "Tamsyn Muir", "Science Fiction"),
        ("The Goblin Emperor", "Katherine Addison", "Fantasy"),
    ] {
        let mut spec = new_book(title, author);
        spec.genre = Some(genre.to_owned());
        fx.service.create_book(&staff(), spec).await.expect("create");
    }

    let listing = fx
        .service
        .list(BookQuery {
            genre: Some("science fiction".to_owned()),
            sort: BookSort::Title,
            ..BookQuery::default()
        })
        .await
        .expect("list");
    assert_eq!(listing.page.total, 2);
    assert_eq!(listing.page.items[0].title, "Gideon the Ninth");
    assert_eq!(listing.genres, ["Fantasy", "Science Fiction"]);

    let searched = fx
        .service
        .list(BookQuery {
            q: Some("goblin".to_owned()),
            ..BookQuery::default()
        })
        .await
        .expect("list");
    assert_eq!(searched.page.total, 1);
    assert_eq!(searched.page.items[0].author, "Katherine Addison");
}

#[tokio::test]
async fn list_can_exclude_books_with_nothing_on_the_shelf() {
    let fx = fixture().await;
    let gone = fx
        .service
        .create_book(&staff(), new_book("All Out", "Busy Author"))
        .await
        .expect("create");
    fx.service
        .create_book(&staff(), new_book("On Shelf", "Idle Author"))
        .await
        .expect("create");
    fx.library
        .books
        .update(gone.id(), |b| b.available_copies = 0)
        .await
        .expect("update")
        .expect("present");

    let listing = fx
        .service
        .list(BookQuery {
            available_only: true,
            ..BookQuery::default()
        })
        .await
        .expect("list");
    assert_eq!(listing.page.total, 1);
    assert_eq!(listing.page.items[0].title, "On Shelf");
}

#[tokio::test]
async fn stats_sum_checked_out_copies_across_titles() {
    let fx = fixture().await;
    let mut spec = new_book("Counted", "Author");
    spec.total_copies = Some(4);
    let book = fx.service.create_book(&staff(), spec).await.expect("create");
    fx.library
        .books
        .update(book.id(), |b| b.available_copies = 1)
        .await
        .expect("update")
        .expect("present");
    fx.service
        .create_book(&staff(), new_book("Untouched", "Author"))
        .await
        .expect("create");

    let stats = fx.service.stats().await.expect("stats");
    assert_eq!(stats.total, 2);
    assert_eq!(stats.available, 2);
    assert_eq!(stats.checked_out, 3);
    assert_eq!(stats.genres.get("Uncategorized"), Some(&2));
    assert_eq!(stats.top_rated.len(), 2);
    assert_eq!(stats.recently_added.len(), 2);
}
