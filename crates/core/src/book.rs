//! Book and chapter value types
//!
//! These mirror the documents held by the storage collaborator. Only the
//! fields the audio-export pipeline reads are modelled here.

use serde::{Deserialize, Serialize};

/// A book in the library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    /// Opaque storage identifier
    pub id: String,

    /// Display title, used to derive the download filename
    pub title: String,
}

impl Book {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

/// One chapter of a book.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chapter {
    /// 1-based position within the book
    pub chapter_number: u32,

    /// Chapter title; may be empty for untitled chapters
    pub title: String,

    /// Raw chapter body handed to the synthesis pipeline
    pub content: String,
}

impl Chapter {
    pub fn new(chapter_number: u32, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            chapter_number,
            title: title.into(),
            content: content.into(),
        }
    }

    /// Display title, falling back to "Chapter N" for untitled chapters.
    pub fn display_title(&self) -> String {
        if self.title.trim().is_empty() {
            format!("Chapter {}", self.chapter_number)
        } else {
            self.title.clone()
        }
    }
}
