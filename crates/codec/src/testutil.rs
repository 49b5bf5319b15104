//! Synthetic MP3 fixtures shared by codec tests.

/// MPEG1 Layer III, 128 kbps, 44100 Hz, no padding; 417-byte frames.
pub const FRAME_HEADER: [u8; 4] = [0xFF, 0xFB, 0x90, 0x00];
pub const FRAME_LEN: usize = 417;

/// One audio frame with its payload filled by `fill` (must not be 0xFF, so
/// payloads never alias a frame sync).
pub fn audio_frame(fill: u8) -> Vec<u8> {
    assert_ne!(fill, 0xFF);
    let mut frame = vec![fill; FRAME_LEN];
    frame[..4].copy_from_slice(&FRAME_HEADER);
    frame
}

/// A Xing metadata frame: zero-filled payload with the marker at the offset
/// used by MPEG1 stereo encoders (36 bytes from the frame start).
pub fn xing_frame() -> Vec<u8> {
    let mut frame = vec![0u8; FRAME_LEN];
    frame[..4].copy_from_slice(&FRAME_HEADER);
    frame[36..40].copy_from_slice(b"Xing");
    frame
}

/// An ID3v2 tag with a `body_len`-byte zero body (total 10 + body_len bytes).
pub fn id3_tag(body_len: usize) -> Vec<u8> {
    assert!(body_len < (1 << 28));
    let mut tag = vec![0u8; 10 + body_len];
    tag[..3].copy_from_slice(b"ID3");
    tag[3] = 0x04;
    tag[6] = ((body_len >> 21) & 0x7F) as u8;
    tag[7] = ((body_len >> 14) & 0x7F) as u8;
    tag[8] = ((body_len >> 7) & 0x7F) as u8;
    tag[9] = (body_len & 0x7F) as u8;
    tag
}
