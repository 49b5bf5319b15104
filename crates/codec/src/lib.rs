//! MP3 stream stitching support
//!
//! Each provider call returns a standalone MP3 file carrying its own ID3v2 tag
//! and a Xing/Info VBR header whose frame/byte counts describe only that chunk.
//! Naive concatenation of N such files yields a stream whose header claims the
//! duration of chunk 1, and most players trust it for the seek range. This
//! crate strips per-chunk metadata before concatenation and neutralizes any
//! survivors afterwards so players fall back to file size ÷ bitrate.
//!
//! All parsing is pure and never fails: a malformed header is "not a frame"
//! and the caller resynchronizes one byte later. A chunk that never parses is
//! passed through untouched rather than aborting the job.

pub mod finalize;
pub mod frame;
pub mod sanitize;

#[cfg(test)]
pub(crate) mod testutil;

pub use finalize::finalize_post_concat;
pub use frame::{frame_size, id3v2_size, is_xing_or_info_frame};
pub use sanitize::strip_chunk;
