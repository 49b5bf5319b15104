//! Post-concatenation safety net
//!
//! Normally finds nothing: every chunk is stripped before concatenation. It
//! exists for chunks that could not be pre-sanitized and for parsing edge
//! cases. Frame alignment is ambiguous across concatenated chunks at this
//! point, so the pass deliberately works on raw byte patterns instead of
//! re-parsing frame boundaries.

/// Bytes zeroed after each marker: covers the Xing frame's flags,
/// frame-count, byte-count, 100-byte TOC and quality fields.
const ZERO_WINDOW: usize = 120;

/// Neutralize any residual Xing/Info markers in a fully assembled buffer so
/// no player can interpret stale per-chunk frame/byte counts.
pub fn finalize_post_concat(mut buf: Vec<u8>) -> Vec<u8> {
    let mut found = 0usize;
    let mut i = 0;
    while i + 4 <= buf.len() {
        if &buf[i..i + 4] == b"Xing" || &buf[i..i + 4] == b"Info" {
            let end = (i + 4 + ZERO_WINDOW).min(buf.len());
            for b in &mut buf[i..end] {
                *b = 0;
            }
            found += 1;
            i = end;
        } else {
            i += 1;
        }
    }

    if found > 0 {
        tracing::warn!(markers = found, "zeroed residual VBR headers after concat");
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_buffer_is_untouched() {
        let buf = vec![0xAAu8; 2048];
        assert_eq!(finalize_post_concat(buf.clone()), buf);
    }

    #[test]
    fn test_marker_and_window_zeroed() {
        let mut buf = vec![0xAAu8; 1024];
        buf[300..304].copy_from_slice(b"Xing");

        let out = finalize_post_concat(buf);
        // Marker plus the trailing window are gone.
        assert!(out[300..304 + ZERO_WINDOW].iter().all(|&b| b == 0));
        // Audio on either side survives.
        assert_eq!(out[299], 0xAA);
        assert_eq!(out[304 + ZERO_WINDOW], 0xAA);
        assert!(!out.windows(4).any(|w| w == b"Xing" || w == b"Info"));
    }

    #[test]
    fn test_multiple_markers_zeroed() {
        let mut buf = vec![0xAAu8; 4096];
        buf[100..104].copy_from_slice(b"Xing");
        buf[2000..2004].copy_from_slice(b"Info");

        let out = finalize_post_concat(buf);
        assert!(!out.windows(4).any(|w| w == b"Xing" || w == b"Info"));
    }

    #[test]
    fn test_marker_near_end_clamps_window() {
        let mut buf = vec![0xAAu8; 64];
        buf[60..64].copy_from_slice(b"Info");

        let out = finalize_post_concat(buf);
        assert_eq!(out.len(), 64);
        assert!(out[60..].iter().all(|&b| b == 0));
    }
}
