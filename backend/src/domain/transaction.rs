//! Loan (checkout/checkin) record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::{Record, RecordMeta};

/// Lifecycle state of a loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    /// Checked out, not yet returned.
    Active,
    /// Returned to the shelf.
    Returned,
}

/// Kind of transaction. Only checkouts exist today; the discriminant is
/// persisted so the stored shape stays self-describing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// A borrow with a due date.
    #[default]
    Checkout,
}

/// One checkout of one book by one user.
///
/// ## Invariants
/// - At most one `Active` transaction per (book, user) pair.
/// - A user holds at most [`crate::domain::MAX_ACTIVE_LOANS`] `Active`
///   transactions at a time.
/// - `return_date` is set exactly when `status` becomes `Returned`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Identity and lifecycle stamps.
    #[serde(flatten)]
    pub meta: RecordMeta,
    /// Borrowed book.
    pub book_id: Uuid,
    /// Borrowing user.
    pub user_id: Uuid,
    /// Transaction kind.
    #[serde(rename = "type", default)]
    pub kind: TransactionKind,
    /// When the checkout happened.
    pub checkout_date: DateTime<Utc>,
    /// When the book is due back.
    pub due_date: DateTime<Utc>,
    /// When the book came back, once returned.
    #[serde(default)]
    pub return_date: Option<DateTime<Utc>>,
    /// Loan state.
    pub status: LoanStatus,
    /// Free-form notes, appended to on checkin.
    #[serde(default)]
    pub notes: String,
    /// Staff member (or the borrower, for self-checkout) who processed it.
    pub processed_by: Uuid,
}

/// Caller-supplied fields for a new loan.
#[derive(Debug, Clone)]
pub struct TransactionDraft {
    /// Borrowed book.
    pub book_id: Uuid,
    /// Borrowing user.
    pub user_id: Uuid,
    /// When the checkout happened.
    pub checkout_date: DateTime<Utc>,
    /// When the book is due back.
    pub due_date: DateTime<Utc>,
    /// Free-form notes.
    pub notes: String,
    /// Who processed the checkout.
    pub processed_by: Uuid,
}

impl Record for Transaction {
    type Draft = TransactionDraft;

    fn from_draft(meta: RecordMeta, draft: TransactionDraft) -> Self {
        Self {
            meta,
            book_id: draft.book_id,
            user_id: draft.user_id,
            kind: TransactionKind::Checkout,
            checkout_date: draft.checkout_date,
            due_date: draft.due_date,
            return_date: None,
            status: LoanStatus::Active,
            notes: draft.notes,
            processed_by: draft.processed_by,
        }
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }
}
