//! Record store: durable, queryable persistence for homogeneous
//! collections with per-collection write serialization.
//!
//! Public surface:
//! - [`Table`], the generic file-backed table engine.
//! - [`Record`] and [`RecordMeta`], the stored-entity contract and stamps.
//! - [`Library`], the five collection instances used by the domain.
//! - [`StoreError`], i/o and corruption failures.

pub mod library;
pub mod record;
pub mod table;

pub use self::library::Library;
pub use self::record::{Record, RecordMeta};
pub use self::table::{StoreError, StoreResult, Table};
