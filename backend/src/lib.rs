//! Biblio: a small library-management core over flat-file storage.
//!
//! The crate is layered bottom-up: [`store`] persists typed record
//! collections as JSON files with serialized writes, [`domain`] holds the
//! entities and the services enforcing every cross-record rule, and
//! [`search`] ranks free-text matches across books and chapters. Transport
//! concerns (HTTP, auth, sessions) live with consumers of this crate.

pub mod domain;
pub mod search;
pub mod store;
