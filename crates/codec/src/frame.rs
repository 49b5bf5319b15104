//! MPEG frame header codec
//!
//! Pure functions over a byte buffer and offset. Nothing here allocates or
//! performs I/O; frame boundaries and tag sizes are recomputed by scanning,
//! never cached.

/// MPEG version bits (header bits 19-20).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Version {
    Mpeg1,
    Mpeg2,
    Mpeg25,
}

/// Layer bits (header bits 17-18).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layer {
    I,
    II,
    III,
}

/// Size in bytes of an ID3v2 tag beginning at `offset`, or 0 if the "ID3"
/// magic is absent or the buffer is too short for a tag header.
///
/// The tag size is a synchsafe integer (four 7-bit bytes) at offset+6..=9;
/// the total tag length is the 10-byte header plus the decoded size.
pub fn id3v2_size(buf: &[u8], offset: usize) -> usize {
    if buf.len() < offset + 10 {
        return 0;
    }
    if &buf[offset..offset + 3] != b"ID3" {
        return 0;
    }

    let b = &buf[offset + 6..offset + 10];
    let size = ((b[0] as usize & 0x7F) << 21)
        | ((b[1] as usize & 0x7F) << 14)
        | ((b[2] as usize & 0x7F) << 7)
        | (b[3] as usize & 0x7F);

    10 + size
}

/// Size in bytes of the MPEG audio frame whose header starts at `offset`, or
/// 0 if `offset` is not a valid frame-sync point.
///
/// Reserved version/layer bits, the free and bad bitrate indices (0, 15) and
/// the reserved sample-rate index (3) are all rejected as "not a frame" so
/// the caller can advance one byte and resynchronize.
pub fn frame_size(buf: &[u8], offset: usize) -> usize {
    if buf.len() < offset + 4 {
        return 0;
    }

    // Frame sync: 11 set bits across the first two bytes.
    if buf[offset] != 0xFF || buf[offset + 1] & 0xE0 != 0xE0 {
        return 0;
    }

    let version = match (buf[offset + 1] >> 3) & 0x03 {
        0b00 => Version::Mpeg25,
        0b10 => Version::Mpeg2,
        0b11 => Version::Mpeg1,
        _ => return 0, // reserved
    };

    let layer = match (buf[offset + 1] >> 1) & 0x03 {
        0b01 => Layer::III,
        0b10 => Layer::II,
        0b11 => Layer::I,
        _ => return 0, // reserved
    };

    let bitrate_index = (buf[offset + 2] >> 4) & 0x0F;
    if bitrate_index == 0 || bitrate_index == 15 {
        return 0; // free-format / bad
    }

    let samplerate_index = (buf[offset + 2] >> 2) & 0x03;
    if samplerate_index == 3 {
        return 0; // reserved
    }

    let bitrate_kbps = bitrate(version, layer, bitrate_index);
    let samplerate = sample_rate(version, samplerate_index);
    let padding = ((buf[offset + 2] >> 1) & 0x01) as usize;

    match layer {
        Layer::I => (12 * bitrate_kbps * 1000 / samplerate + padding) * 4,
        Layer::II | Layer::III => {
            let samples_per_frame = match (version, layer) {
                (Version::Mpeg2 | Version::Mpeg25, Layer::III) => 576,
                _ => 1152,
            };
            samples_per_frame * bitrate_kbps * 1000 / (8 * samplerate) + padding
        }
    }
}

/// True if the frame starting at `offset` carries a Xing or Info VBR marker.
///
/// The 4-byte ASCII marker is searched from offset+4 up to the frame's
/// computed end, capped to the remaining buffer length. Returns false when
/// `offset` is not a valid frame-sync point.
pub fn is_xing_or_info_frame(buf: &[u8], offset: usize) -> bool {
    let size = frame_size(buf, offset);
    if size == 0 {
        return false;
    }

    let start = offset + 4;
    let end = (offset + size).min(buf.len());
    if start + 4 > end {
        return false;
    }

    buf[start..end]
        .windows(4)
        .any(|w| w == b"Xing" || w == b"Info")
}

/// Bitrate in kbps from the standard MPEG tables.
fn bitrate(version: Version, layer: Layer, index: u8) -> usize {
    // index is already validated to 1..=14
    let i = (index - 1) as usize;
    match (version, layer) {
        (Version::Mpeg1, Layer::I) => {
            [32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448][i]
        }
        (Version::Mpeg1, Layer::II) => {
            [32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384][i]
        }
        (Version::Mpeg1, Layer::III) => {
            [32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320][i]
        }
        (Version::Mpeg2 | Version::Mpeg25, Layer::I) => {
            [32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256][i]
        }
        (Version::Mpeg2 | Version::Mpeg25, Layer::II | Layer::III) => {
            [8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160][i]
        }
    }
}

/// Sample rate in Hz.
fn sample_rate(version: Version, index: u8) -> usize {
    // index is already validated to 0..=2
    let i = index as usize;
    match version {
        Version::Mpeg1 => [44100, 48000, 32000][i],
        Version::Mpeg2 => [22050, 24000, 16000][i],
        Version::Mpeg25 => [11025, 12000, 8000][i],
    }
}
