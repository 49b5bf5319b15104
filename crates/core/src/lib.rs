//! Core types for the Read To Me backend
//!
//! This crate provides foundational types used across all other crates:
//! - Book and chapter value types
//! - TTS request configuration
//! - Error taxonomy

pub mod book;
pub mod error;
pub mod tts;

pub use book::{Book, Chapter};
pub use error::{ChapterTooLong, SessionError, SynthesisError, ValidationError};
pub use tts::{ProviderChoice, TtsConfig};
