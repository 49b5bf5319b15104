//! Per-chunk sanitizer
//!
//! Runs on every synthesized chunk before concatenation, removing the
//! metadata that would otherwise make players truncate playback at the end
//! of chunk 1.

use crate::frame::{frame_size, id3v2_size, is_xing_or_info_frame};

/// Strip the leading ID3v2 tag and the first Xing/Info metadata frame from
/// one complete synthesized MP3, leaving only real audio frames.
///
/// If no valid frame sync is ever found the input is returned unchanged;
/// audio data is never dropped on a parse failure. Idempotent: a second pass
/// finds nothing left to remove.
pub fn strip_chunk(buf: &[u8]) -> Vec<u8> {
    let mut cursor = id3v2_size(buf, 0);

    // Scan forward byte-by-byte for the next valid frame sync.
    while cursor < buf.len() {
        let size = frame_size(buf, cursor);
        if size == 0 {
            cursor += 1;
            continue;
        }

        if is_xing_or_info_frame(buf, cursor) {
            // Skip the whole metadata frame; real audio starts after it.
            let after = (cursor + size).min(buf.len());
            return buf[after..].to_vec();
        }

        return buf[cursor..].to_vec();
    }

    tracing::debug!(len = buf.len(), "no frame sync found, leaving chunk as-is");
    buf.to_vec()
}
