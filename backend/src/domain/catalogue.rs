//! Catalogue: book management, listing, and review aggregation.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::store::{Record, Table};

use super::book::{Book, BookDraft};
use super::error::Error;
use super::page::{Page, PageRequest};
use super::review::{Review, ReviewDraft};
use super::user::{Actor, User};

/// Caller input for a new catalogue entry. Only title and author are
/// required; everything else has a serviceable default.
#[derive(Debug, Clone, Default)]
pub struct NewBook {
    /// Book title, required.
    pub title: String,
    /// Book author, required.
    pub author: String,
    /// ISBN.
    pub isbn: String,
    /// Genre; defaults to "Uncategorized".
    pub genre: Option<String>,
    /// Publication year.
    pub publish_year: Option<i32>,
    /// Publisher name.
    pub publisher: String,
    /// Free-text description.
    pub description: String,
    /// Cover image URL.
    pub cover_url: String,
    /// Copies owned; defaults to 1, must be at least 1.
    pub total_copies: Option<u32>,
}

/// Partial edit of a book. `None` fields keep their prior value.
#[derive(Debug, Clone, Default)]
pub struct BookPatch {
    /// New title.
    pub title: Option<String>,
    /// New author.
    pub author: Option<String>,
    /// New ISBN.
    pub isbn: Option<String>,
    /// New genre.
    pub genre: Option<String>,
    /// New publication year (outer `None` keeps, `Some(None)` clears).
    pub publish_year: Option<Option<i32>>,
    /// New publisher.
    pub publisher: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New cover URL.
    pub cover_url: Option<String>,
    /// New copy count; re-bases `available_copies` by the same delta,
    /// floored at zero.
    pub total_copies: Option<u32>,
}

/// Sort orders for book listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookSort {
    /// Alphabetical by title.
    Title,
    /// Alphabetical by author.
    Author,
    /// Most recent publication year first.
    Year,
    /// Highest rating first.
    Rating,
    /// Most recently added first.
    #[default]
    Newest,
}

/// Book listing filter; all criteria conjunctive, `None` means "any".
#[derive(Debug, Clone, Default)]
pub struct BookQuery {
    /// Free-text filter over title/author/isbn/genre/description.
    pub q: Option<String>,
    /// Exact genre (case-insensitive).
    pub genre: Option<String>,
    /// Author substring (case-insensitive).
    pub author: Option<String>,
    /// Exact publication year.
    pub year: Option<i32>,
    /// Only books with a copy on the shelf.
    pub available_only: bool,
    /// Sort order.
    pub sort: BookSort,
    /// Page selection.
    pub page: PageRequest,
}

/// One page of books plus the distinct genre list for filter widgets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookListing {
    /// The requested page.
    #[serde(flatten)]
    pub page: Page<Book>,
    /// Every distinct genre in the catalogue, sorted.
    pub genres: Vec<String>,
}

/// A book with its reviews.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookWithReviews {
    /// The book.
    pub book: Book,
    /// Its reviews, in storage order.
    pub reviews: Vec<Review>,
}

/// Aggregate catalogue counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogueStats {
    /// Catalogued titles.
    pub total: usize,
    /// Titles with at least one copy on the shelf.
    pub available: usize,
    /// Copies currently out across all titles.
    pub checked_out: u64,
    /// Title count per genre.
    pub genres: BTreeMap<String, usize>,
    /// Five highest-rated titles.
    pub top_rated: Vec<Book>,
    /// Five most recently added titles.
    pub recently_added: Vec<Book>,
}

/// Book and review operations over the books, reviews, and users
/// collections.
#[derive(Clone)]
pub struct CatalogueService {
    books: Arc<Table<Book>>,
    reviews: Arc<Table<Review>>,
    users: Arc<Table<User>>,
}

impl CatalogueService {
    /// Create the service over its collections.
    pub fn new(
        books: Arc<Table<Book>>,
        reviews: Arc<Table<Review>>,
        users: Arc<Table<User>>,
    ) -> Self {
        Self {
            books,
            reviews,
            users,
        }
    }

    /// Add a book to the catalogue. Staff only. New books start fully
    /// available with zeroed rating aggregates.
    pub async fn create_book(&self, actor: &Actor, new: NewBook) -> Result<Book, Error> {
        if !actor.is_staff() {
            return Err(Error::forbidden("Only staff may add books"));
        }
        if new.title.trim().is_empty() || new.author.trim().is_empty() {
            return Err(Error::validation("Title and author are required"));
        }
        let total_copies = new.total_copies.unwrap_or(1);
        if total_copies == 0 {
            return Err(Error::validation("Total copies must be at least 1"));
        }
        let book = self
            .books
            .create(BookDraft {
                title: new.title,
                author: new.author,
                isbn: new.isbn,
                genre: new
                    .genre
                    .filter(|g| !g.trim().is_empty())
                    .unwrap_or_else(|| "Uncategorized".to_owned()),
                publish_year: new.publish_year,
                publisher: new.publisher,
                description: new.description,
                cover_url: new.cover_url,
                total_copies,
                added_by: actor.id,
            })
            .await?;
        debug!(book_id = %book.id(), title = %book.title, "book catalogued");
        Ok(book)
    }

    /// Edit a book. Staff only. Changing `total_copies` re-bases
    /// `available_copies` by the same delta, floored at zero.
    pub async fn update_book(
        &self,
        actor: &Actor,
        book_id: Uuid,
        patch: BookPatch,
    ) -> Result<Book, Error> {
        if !actor.is_staff() {
            return Err(Error::forbidden("Only staff may edit books"));
        }
        if patch.total_copies == Some(0) {
            return Err(Error::validation("Total copies must be at least 1"));
        }
        self.books
            .update(book_id, move |book| apply_book_patch(book, patch))
            .await?
            .ok_or_else(|| Error::not_found("Book not found"))
    }

    /// Remove a book from the catalogue. Admin only.
    ///
    /// Deliberately does not cascade: chapters, reviews, and transactions
    /// keep their dangling `book_id` and readers render "Unknown".
    pub async fn delete_book(&self, actor: &Actor, book_id: Uuid) -> Result<(), Error> {
        if !actor.is_admin() {
            return Err(Error::forbidden("Only admins may delete books"));
        }
        if self.books.delete(book_id).await? {
            Ok(())
        } else {
            Err(Error::not_found("Book not found"))
        }
    }

    /// Fetch a book with its reviews.
    pub async fn get(&self, book_id: Uuid) -> Result<BookWithReviews, Error> {
        let book = self
            .books
            .find_by_id(book_id)
            .await?
            .ok_or_else(|| Error::not_found("Book not found"))?;
        let reviews = self.reviews.find(|r| r.book_id == book_id).await?;
        Ok(BookWithReviews { book, reviews })
    }

    /// List books with filtering, sorting, and pagination.
    pub async fn list(&self, query: BookQuery) -> Result<BookListing, Error> {
        let all = self.books.read_all().await?;
        let mut genres: Vec<String> = all
            .iter()
            .map(|b| b.genre.clone())
            .filter(|g| !g.is_empty())
            .collect();
        genres.sort();
        genres.dedup();

        let mut books = all;
        if let Some(q) = query.q.as_deref().map(str::to_lowercase) {
            books.retain(|b| {
                [&b.title, &b.author, &b.isbn, &b.genre, &b.description]
                    .into_iter()
                    .any(|field| field.to_lowercase().contains(&q))
            });
        }
        if let Some(genre) = query.genre.as_deref() {
            books.retain(|b| b.genre.eq_ignore_ascii_case(genre));
        }
        if let Some(author) = query.author.as_deref().map(str::to_lowercase) {
            books.retain(|b| b.author.to_lowercase().contains(&author));
        }
        if let Some(year) = query.year {
            books.retain(|b| b.publish_year == Some(year));
        }
        if query.available_only {
            books.retain(|b| b.available_copies > 0);
        }

        match query.sort {
            BookSort::Title => books.sort_by(|a, b| a.title.cmp(&b.title)),
            BookSort::Author => books.sort_by(|a, b| a.author.cmp(&b.author)),
            BookSort::Year => books.sort_by(|a, b| b.publish_year.cmp(&a.publish_year)),
            BookSort::Rating => {
                books.sort_by(|a, b| b.rating.partial_cmp(&a.rating).unwrap_or(std::cmp::Ordering::Equal));
            }
            BookSort::Newest => books.sort_by(|a, b| b.meta.created_at.cmp(&a.meta.created_at)),
        }

        Ok(BookListing {
            page: Page::slice(books, query.page),
            genres,
        })
    }

    /// Aggregate catalogue counters.
    pub async fn stats(&self) -> Result<CatalogueStats, Error> {
        let books = self.books.read_all().await?;
        let total = books.len();
        let available = books.iter().filter(|b| b.available_copies > 0).count();
        let checked_out = books
            .iter()
            .map(|b| u64::from(b.total_copies - b.available_copies.min(b.total_copies)))
            .sum();
        let mut genres = BTreeMap::new();
        for book in &books {
            if !book.genre.is_empty() {
                *genres.entry(book.genre.clone()).or_insert(0) += 1;
            }
        }

        let mut top_rated = books.clone();
        top_rated.sort_by(|a, b| b.rating.partial_cmp(&a.rating).unwrap_or(std::cmp::Ordering::Equal));
        top_rated.truncate(5);

        let mut recently_added = books;
        recently_added.sort_by(|a, b| b.meta.created_at.cmp(&a.meta.created_at));
        recently_added.truncate(5);

        Ok(CatalogueStats {
            total,
            available,
            checked_out,
            genres,
            top_rated,
            recently_added,
        })
    }

    /// Review a book and fold the rating into the book's aggregate.
    ///
    /// Preconditions: the book exists; `rating` is within 1..=5; the actor
    /// has not already reviewed this book. On success the book's `rating`
    /// becomes the mean of all its reviews rounded to one decimal and
    /// `rating_count` the review count. If the aggregate write fails the
    /// freshly created review is deleted so the two collections cannot
    /// drift.
    pub async fn add_review(
        &self,
        actor: &Actor,
        book_id: Uuid,
        rating: u8,
        comment: String,
    ) -> Result<Review, Error> {
        self.books
            .find_by_id(book_id)
            .await?
            .ok_or_else(|| Error::not_found("Book not found"))?;
        if !(1..=5).contains(&rating) {
            return Err(Error::validation("Rating must be between 1 and 5"));
        }
        let already = self
            .reviews
            .find_one(|r| r.book_id == book_id && r.user_id == actor.id)
            .await?;
        if already.is_some() {
            return Err(Error::duplicate("You have already reviewed this book"));
        }

        let user_name = self
            .users
            .find_by_id(actor.id)
            .await?
            .map_or_else(|| "Unknown".to_owned(), |u| u.name);
        let review = self
            .reviews
            .create(ReviewDraft {
                book_id,
                user_id: actor.id,
                user_name,
                rating,
                comment,
            })
            .await?;

        match self.recompute_rating(book_id).await {
            Ok(()) => Ok(review),
            Err(err) => {
                if let Err(undo_err) = self.reviews.delete(review.id()).await {
                    warn!(review_id = %review.id(), %undo_err, "failed to void review after aggregate write failure");
                } else {
                    warn!(review_id = %review.id(), "review compensated: voided after aggregate write failure");
                }
                Err(err)
            }
        }
    }

    async fn recompute_rating(&self, book_id: Uuid) -> Result<(), Error> {
        let ratings: Vec<u8> = self
            .reviews
            .find(|r| r.book_id == book_id)
            .await?
            .into_iter()
            .map(|r| r.rating)
            .collect();
        let count = ratings.len();
        let mean = if count == 0 {
            0.0
        } else {
            let sum: u32 = ratings.iter().map(|&r| u32::from(r)).sum();
            f64::from(sum) / count as f64
        };
        let rounded = (mean * 10.0).round() / 10.0;
        self.books
            .update(book_id, |book| {
                book.rating = rounded;
                book.rating_count = count as u32;
            })
            .await?
            .ok_or_else(|| Error::not_found("Book not found"))?;
        Ok(())
    }
}

fn apply_book_patch(book: &mut Book, patch: BookPatch) {
    if let Some(title) = patch.title {
        book.title = title;
    }
    if let Some(author) = patch.author {
        book.author = author;
    }
    if let Some(isbn) = patch.isbn {
        book.isbn = isbn;
    }
    if let Some(genre) = patch.genre {
        book.genre = genre;
    }
    if let Some(publish_year) = patch.publish_year {
        book.publish_year = publish_year;
    }
    if let Some(publisher) = patch.publisher {
        book.publisher = publisher;
    }
    if let Some(description) = patch.description {
        book.description = description;
    }
    if let Some(cover_url) = patch.cover_url {
        book.cover_url = cover_url;
    }
    if let Some(total_copies) = patch.total_copies {
        let delta = i64::from(total_copies) - i64::from(book.total_copies);
        let rebased = i64::from(book.available_copies) + delta;
        book.available_copies = u32::try_from(rebased.max(0)).unwrap_or(u32::MAX);
        book.total_copies = total_copies;
    }
}

#[cfg(test)]
#[path = "catalogue_tests.rs"]
mod tests;
