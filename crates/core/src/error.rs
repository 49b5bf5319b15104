//! Error taxonomy for the audio-export pipeline
//!
//! Validation and not-found failures are cheap and surface before any provider
//! call. Synthesis failures may arrive minutes into a job and abort the whole
//! export; no partial file is ever delivered.

use serde::Serialize;
use thiserror::Error;

/// Request-level validation failure. Surfaced as a structured 400 body;
/// synthesis is never attempted.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("startChapterNumber and chapterCount are required")]
    MissingRange,

    #[error("startChapterNumber must be a positive integer")]
    BadStartChapter,

    #[error("chapterCount must be a positive integer")]
    BadChapterCount,

    #[error("Some chapters exceed the maximum character limit for audio synthesis")]
    ChaptersTooLong {
        max_characters: usize,
        chapters: Vec<ChapterTooLong>,
    },
}

/// Per-chapter detail attached to a length-limit rejection.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterTooLong {
    pub chapter_number: u32,
    pub title: String,
    pub characters: usize,
}

/// Secondary-provider session acquisition failure.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("session page fetch failed with status {0}")]
    PageFetch(u16),

    #[error("anti-forgery token not found in page")]
    TokenMissing,

    #[error("no cookies received")]
    CookiesMissing,

    #[error("session transport error: {0}")]
    Transport(String),
}

/// Unrecovered provider/network failure during synthesis.
///
/// `Session` and `Response` carry their local taxonomy through to the caller;
/// by the time one of these escapes a provider client, its bounded retries
/// (if any) are already exhausted.
#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error("synthesis request failed with status {0}")]
    HttpStatus(u16),

    #[error("provider transport error: {0}")]
    Transport(String),

    #[error("session error: {0}")]
    Session(#[from] SessionError),

    #[error("malformed provider response: {0}")]
    Response(String),

    #[error("exhausted retries")]
    RetriesExhausted,
}

impl SynthesisError {
    /// Malformed JSON envelope or missing fields from a provider. Not retried.
    pub fn response(msg: impl Into<String>) -> Self {
        SynthesisError::Response(msg.into())
    }
}
