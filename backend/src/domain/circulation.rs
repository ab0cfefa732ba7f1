//! Circulation: checkout, checkin, and loan queries.
//!
//! This is where the cross-collection invariants live. Every mutating
//! operation checks its preconditions synchronously, first failure wins,
//! before any write. The two dependent writes (transaction, then book
//! copy count) are not atomic across collections; checkout compensates by
//! voiding the transaction when the book write fails, and checkin restores
//! the transaction's prior state.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::store::{Record, Table};

use super::book::Book;
use super::error::Error;
use super::page::{Page, PageRequest};
use super::transaction::{LoanStatus, Transaction, TransactionDraft};
use super::user::{Actor, Role, User};

/// Most `Active` loans a single user may hold.
pub const MAX_ACTIVE_LOANS: usize = 5;

/// Loan period applied when the caller supplies no due date.
pub const DEFAULT_LOAN_DAYS: i64 = 14;

/// Staff-mediated checkout input.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    /// Book to borrow.
    pub book_id: Uuid,
    /// Borrowing user.
    pub user_id: Uuid,
    /// Due date; defaults to [`DEFAULT_LOAN_DAYS`] from now.
    pub due_date: Option<DateTime<Utc>>,
    /// Free-form notes.
    pub notes: Option<String>,
}

/// Checkin input.
#[derive(Debug, Clone)]
pub struct CheckinRequest {
    /// Loan being returned.
    pub transaction_id: Uuid,
    /// Return note, appended to the loan's notes.
    pub notes: Option<String>,
}

/// Loan list filter. All criteria are conjunctive; `None` means "any".
#[derive(Debug, Clone, Default)]
pub struct LoanFilter {
    /// Restrict to one loan state.
    pub status: Option<LoanStatus>,
    /// Restrict to one borrower.
    pub user_id: Option<Uuid>,
    /// Restrict to one book.
    pub book_id: Option<Uuid>,
    /// Page selection.
    pub page: PageRequest,
}

/// A loan enriched with book and borrower snapshots for display. Orphaned
/// references (book or user since deleted) render as "Unknown".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanView {
    /// The underlying loan record.
    #[serde(flatten)]
    pub transaction: Transaction,
    /// Title of the borrowed book.
    pub book_title: String,
    /// Author of the borrowed book.
    pub book_author: String,
    /// Borrower display name.
    pub user_name: String,
    /// Borrower email.
    pub user_email: String,
}

/// Aggregate circulation counters plus the ten most recent loans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CirculationStats {
    /// Loans currently out.
    pub active: usize,
    /// Active loans past their due date.
    pub overdue: usize,
    /// Loans already returned.
    pub returned: usize,
    /// All loans ever recorded.
    pub total: usize,
    /// Ten most recent loans, newest first.
    pub recent: Vec<LoanView>,
}

/// Checkout/checkin/loan-query service over the transactions, books, and
/// users collections.
#[derive(Clone)]
pub struct CirculationService {
    transactions: Arc<Table<Transaction>>,
    books: Arc<Table<Book>>,
    users: Arc<Table<User>>,
}

impl CirculationService {
    /// Create the service over its three collections.
    pub fn new(
        transactions: Arc<Table<Transaction>>,
        books: Arc<Table<Book>>,
        users: Arc<Table<User>>,
    ) -> Self {
        Self {
            transactions,
            books,
            users,
        }
    }

    /// Staff-mediated checkout of `book_id` to `user_id`.
    ///
    /// Preconditions, in order, first failure wins: actor is staff; the
    /// book exists; a copy is available; the borrower exists; the borrower
    /// holds fewer than [`MAX_ACTIVE_LOANS`] active loans; the borrower
    /// does not already have this book out.
    pub async fn checkout(
        &self,
        actor: &Actor,
        request: CheckoutRequest,
    ) -> Result<Transaction, Error> {
        if !actor.is_staff() {
            return Err(Error::forbidden("Only staff may process checkouts"));
        }
        self.perform_checkout(
            actor,
            request.book_id,
            request.user_id,
            request.due_date,
            request.notes.unwrap_or_default(),
        )
        .await
    }

    /// Member self-service checkout: the actor borrows for themselves.
    /// Same preconditions and effects as [`Self::checkout`] minus the
    /// staff gate.
    pub async fn self_checkout(&self, actor: &Actor, book_id: Uuid) -> Result<Transaction, Error> {
        self.perform_checkout(actor, book_id, actor.id, None, "Self-checkout".to_owned())
            .await
    }

    async fn perform_checkout(
        &self,
        actor: &Actor,
        book_id: Uuid,
        user_id: Uuid,
        due_date: Option<DateTime<Utc>>,
        notes: String,
    ) -> Result<Transaction, Error> {
        let book = self
            .books
            .find_by_id(book_id)
            .await?
            .ok_or_else(|| Error::not_found("Book not found"))?;
        if book.available_copies == 0 {
            return Err(Error::capacity_exceeded("No copies available for checkout"));
        }
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| Error::not_found("User not found"))?;

        let active = self
            .transactions
            .find(|t| t.user_id == user_id && t.status == LoanStatus::Active)
            .await?;
        if active.len() >= MAX_ACTIVE_LOANS {
            return Err(Error::limit_exceeded(format!(
                "User has reached maximum checkout limit ({MAX_ACTIVE_LOANS} books)"
            )));
        }
        if active.iter().any(|t| t.book_id == book_id) {
            return Err(Error::duplicate("User already has this book checked out"));
        }

        let now = Utc::now();
        let transaction = self
            .transactions
            .create(TransactionDraft {
                book_id,
                user_id,
                checkout_date: now,
                due_date: due_date.unwrap_or(now + Duration::days(DEFAULT_LOAN_DAYS)),
                notes,
                processed_by: actor.id,
            })
            .await?;

        // Second dependent write. If it fails, void the transaction so the
        // copy count and the loan ledger cannot drift apart.
        let decremented = self
            .books
            .update(book_id, |b| {
                b.available_copies = b.available_copies.saturating_sub(1);
            })
            .await;
        match decremented {
            Ok(Some(_)) => {
                debug!(%book_id, %user_id, transaction_id = %transaction.id(), "checkout recorded");
                Ok(transaction)
            }
            Ok(None) => {
                self.void_transaction(transaction.id()).await;
                Err(Error::not_found("Book not found"))
            }
            Err(err) => {
                self.void_transaction(transaction.id()).await;
                Err(err.into())
            }
        }
    }

    /// Delete a transaction created by a checkout whose book write failed.
    /// Best-effort: a failure here is the unrecoverable drift case the
    /// compensation exists to narrow, so it is logged, not propagated.
    async fn void_transaction(&self, transaction_id: Uuid) {
        if let Err(err) = self.transactions.delete(transaction_id).await {
            warn!(%transaction_id, %err, "failed to void transaction after checkout compensation");
        } else {
            warn!(%transaction_id, "checkout compensated: transaction voided after book write failure");
        }
    }

    /// Return a borrowed book.
    ///
    /// The loan must exist and be `Active`. Marks it returned, stamps the
    /// return date, appends the return note, then puts the copy back on
    /// the shelf (capped at the book's total; a since-deleted book is
    /// tolerated, there is no cascade to restore).
    pub async fn checkin(
        &self,
        actor: &Actor,
        request: CheckinRequest,
    ) -> Result<Transaction, Error> {
        if !actor.is_staff() {
            return Err(Error::forbidden("Only staff may process checkins"));
        }
        let previous = self
            .transactions
            .find_by_id(request.transaction_id)
            .await?
            .ok_or_else(|| Error::not_found("Transaction not found"))?;
        if previous.status == LoanStatus::Returned {
            return Err(Error::validation("Book already returned"));
        }

        let updated = self
            .transactions
            .update(request.transaction_id, |t| {
                t.status = LoanStatus::Returned;
                t.return_date = Some(Utc::now());
                if let Some(note) = &request.notes {
                    t.notes = format!("{} | Return note: {note}", t.notes);
                }
            })
            .await?
            .ok_or_else(|| Error::not_found("Transaction not found"))?;

        let restocked = self
            .books
            .update(previous.book_id, |b| {
                b.available_copies = b.available_copies.saturating_add(1).min(b.total_copies);
            })
            .await;
        match restocked {
            // A missing book is fine: the book was deleted while the loan
            // was out, nothing to restock.
            Ok(_) => Ok(updated),
            Err(err) => {
                self.restore_transaction(&previous).await;
                Err(err.into())
            }
        }
    }

    /// Put a loan back into its pre-checkin state after the book restock
    /// failed. Best-effort, mirror of [`Self::void_transaction`].
    async fn restore_transaction(&self, previous: &Transaction) {
        let prior = previous.clone();
        let restored = self
            .transactions
            .update(previous.id(), move |t| {
                t.status = prior.status;
                t.return_date = prior.return_date;
                t.notes = prior.notes;
            })
            .await;
        match restored {
            Ok(_) => {
                warn!(transaction_id = %previous.id(), "checkin compensated: loan restored after book write failure");
            }
            Err(err) => {
                warn!(transaction_id = %previous.id(), %err, "failed to restore loan after checkin compensation");
            }
        }
    }

    /// List loans newest-first with display enrichment. Members only ever
    /// see their own loans regardless of the filter.
    pub async fn list(&self, actor: &Actor, filter: LoanFilter) -> Result<Page<LoanView>, Error> {
        let mut loans = self.transactions.read_all().await?;
        if actor.role == Role::Member {
            loans.retain(|t| t.user_id == actor.id);
        }
        if let Some(status) = filter.status {
            loans.retain(|t| t.status == status);
        }
        if let Some(user_id) = filter.user_id {
            loans.retain(|t| t.user_id == user_id);
        }
        if let Some(book_id) = filter.book_id {
            loans.retain(|t| t.book_id == book_id);
        }
        loans.sort_by(|a, b| b.meta.created_at.cmp(&a.meta.created_at));

        let page = Page::slice(loans, filter.page);
        let books = self.books.read_all().await?;
        let users = self.users.read_all().await?;
        Ok(page.map(|t| enrich(t, &books, &users)))
    }

    /// Aggregate counters plus the ten most recent loans.
    pub async fn stats(&self) -> Result<CirculationStats, Error> {
        let mut loans = self.transactions.read_all().await?;
        let now = Utc::now();
        let active = loans
            .iter()
            .filter(|t| t.status == LoanStatus::Active)
            .count();
        let overdue = loans
            .iter()
            .filter(|t| t.status == LoanStatus::Active && t.due_date < now)
            .count();
        let returned = loans
            .iter()
            .filter(|t| t.status == LoanStatus::Returned)
            .count();
        let total = loans.len();

        loans.sort_by(|a, b| b.meta.created_at.cmp(&a.meta.created_at));
        loans.truncate(10);
        let books = self.books.read_all().await?;
        let users = self.users.read_all().await?;
        let recent = loans
            .into_iter()
            .map(|t| enrich(t, &books, &users))
            .collect();

        Ok(CirculationStats {
            active,
            overdue,
            returned,
            total,
            recent,
        })
    }
}

fn enrich(transaction: Transaction, books: &[Book], users: &[User]) -> LoanView {
    let book = books.iter().find(|b| b.id() == transaction.book_id);
    let user = users.iter().find(|u| u.id() == transaction.user_id);
    let unknown = || "Unknown".to_owned();
    LoanView {
        book_title: book.map_or_else(unknown, |b| b.title.clone()),
        book_author: book.map_or_else(unknown, |b| b.author.clone()),
        user_name: user.map_or_else(unknown, |u| u.name.clone()),
        user_email: user.map_or_else(unknown, |u| u.email.clone()),
        transaction,
    }
}

#[cfg(test)]
#[path = "circulation_tests.rs"]
mod tests;
