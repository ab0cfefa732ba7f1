//! The five collection instances backing the application.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::domain::{Book, Chapter, Review, Transaction, User};

use super::table::{StoreError, StoreResult, Table};

/// Every collection the core persists, each with its own backing file and
/// its own writer lock. There is deliberately no cross-collection lock;
/// multi-collection operations order their writes instead (see the
/// circulation and catalogue services).
#[derive(Clone)]
pub struct Library {
    /// Book catalogue.
    pub books: Arc<Table<Book>>,
    /// User accounts.
    pub users: Arc<Table<User>>,
    /// Checkout/checkin loan records.
    pub transactions: Arc<Table<Transaction>>,
    /// Book reviews.
    pub reviews: Arc<Table<Review>>,
    /// Book chapters.
    pub chapters: Arc<Table<Chapter>>,
}

impl Library {
    /// Open (creating if needed) a data directory and bind one table per
    /// collection inside it.
    pub fn open(data_dir: impl AsRef<Path>) -> StoreResult<Self> {
        let dir = data_dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|source| StoreError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        info!(data_dir = %dir.display(), "library store opened");
        let file = |name: &str| -> PathBuf { dir.join(name) };
        Ok(Self {
            books: Arc::new(Table::new(file("books.json"))),
            users: Arc::new(Table::new(file("users.json"))),
            transactions: Arc::new(Table::new(file("transactions.json"))),
            reviews: Arc::new(Table::new(file("reviews.json"))),
            chapters: Arc::new(Table::new(file("chapters.json"))),
        })
    }
}
