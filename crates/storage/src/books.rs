//! Book store trait and in-memory implementation

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use readtome_core::{Book, Chapter};

use crate::StorageError;

/// Read access to the book/chapter collections.
///
/// `find_chapters_by_range` returns chapters with
/// `start_num <= chapter_number <= end_num`, ordered by chapter number.
/// Missing chapters inside the range are simply absent from the result.
#[async_trait]
pub trait BookStore: Send + Sync {
    async fn find_book_by_id(&self, book_id: &str) -> Result<Option<Book>, StorageError>;

    async fn find_chapters_by_range(
        &self,
        book_id: &str,
        start_num: u32,
        end_num: u32,
    ) -> Result<Vec<Chapter>, StorageError>;
}

/// In-memory book store.
#[derive(Default)]
pub struct MemoryBookStore {
    books: RwLock<HashMap<String, Book>>,
    chapters: RwLock<HashMap<String, Vec<Chapter>>>,
}

impl MemoryBookStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a book with its chapters, replacing any existing entry.
    pub fn insert_book(&self, book: Book, mut chapters: Vec<Chapter>) {
        chapters.sort_by_key(|c| c.chapter_number);
        self.chapters.write().insert(book.id.clone(), chapters);
        self.books.write().insert(book.id.clone(), book);
    }
}

#[async_trait]
impl BookStore for MemoryBookStore {
    async fn find_book_by_id(&self, book_id: &str) -> Result<Option<Book>, StorageError> {
        Ok(self.books.read().get(book_id).cloned())
    }

    async fn find_chapters_by_range(
        &self,
        book_id: &str,
        start_num: u32,
        end_num: u32,
    ) -> Result<Vec<Chapter>, StorageError> {
        let chapters = self.chapters.read();
        let Some(all) = chapters.get(book_id) else {
            return Ok(Vec::new());
        };
        Ok(all
            .iter()
            .filter(|c| c.chapter_number >= start_num && c.chapter_number <= end_num)
            .cloned()
            .collect())
    }
}
