//! Domain entities and the consistency rules layered over the store.
//!
//! Purpose: strongly typed records for the five collections, the error
//! taxonomy consumers map to their transport, and the services enforcing
//! every invariant that spans more than one collection or needs
//! read-then-conditionally-write logic. Dependencies point one way:
//! consumers call the services here, the services call the record store,
//! and nothing calls back out.

pub mod book;
pub mod catalogue;
pub mod chapter;
pub mod chapters;
pub mod circulation;
pub mod directory;
pub mod error;
pub mod page;
pub mod review;
pub mod transaction;
pub mod user;

pub use self::book::{Book, BookDraft};
pub use self::catalogue::{
    BookListing, BookPatch, BookQuery, BookSort, BookWithReviews, CatalogueService,
    CatalogueStats, NewBook,
};
pub use self::chapter::{Chapter, ChapterDraft};
pub use self::chapters::{
    BulkChapterItem, ChapterList, ChapterPatch, ChapterPlacement, ChapterService, ChapterView,
    NewChapter,
};
pub use self::circulation::{
    CheckinRequest, CheckoutRequest, CirculationService, CirculationStats, DEFAULT_LOAN_DAYS,
    LoanFilter, LoanView, MAX_ACTIVE_LOANS,
};
pub use self::directory::{
    BorrowStats, DirectoryService, NewUser, UserBrief, UserProfile, UserQuery, UserSummary,
};
pub use self::error::{Error, ErrorCode};
pub use self::page::{Page, PageRequest};
pub use self::review::{Review, ReviewDraft};
pub use self::transaction::{LoanStatus, Transaction, TransactionDraft, TransactionKind};
pub use self::user::{Actor, AuthProvider, Role, User, UserDraft};

/// Convenient result alias for domain operations.
pub type DomainResult<T> = Result<T, Error>;
