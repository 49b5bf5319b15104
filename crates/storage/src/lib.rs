//! Storage collaborator for the audio-export pipeline
//!
//! The CRUD persistence layer proper lives outside this codebase; the
//! pipeline only needs a book lookup and an ordered chapter-range fetch.
//! `MemoryBookStore` backs tests and the default single-user wiring.

mod books;

pub use books::{BookStore, MemoryBookStore};

use thiserror::Error;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage backend error: {0}")]
    Backend(String),
}
