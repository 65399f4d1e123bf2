//! Stream demuxer: split one renderer stdout buffer into image records.
//!
//! When no output directory is used, `pdftoppm` writes every page of its
//! range back-to-back on stdout. The formats it emits there are simple
//! enough that record boundaries can be found without decoding pixels:
//!
//! | Format  | Boundary |
//! |---------|----------|
//! | PPM/PGM | 3-line ASCII header announces the exact pixel byte count |
//! | JPEG    | each image ends with the EOI marker `FF D9` |
//! | PNG     | each image ends 8 bytes after the start of its `IEND` chunk |
//!
//! Every function here is pure and returns byte ranges into the input, so
//! the caller decides whether to decode, copy or discard each record.
//! Malformed input is an error, never a shortened list.

use crate::error::DemuxError;
use crate::format::ImageFormat;
use std::ops::Range;

/// Bytes scanned for a PNM header; poppler headers are far shorter.
const PNM_HEADER_WINDOW: usize = 40;

/// JPEG End-Of-Image marker.
const JPEG_EOI: [u8; 2] = [0xFF, 0xD9];

/// PNG terminal chunk type.
const PNG_IEND: &[u8; 4] = b"IEND";

/// `IEND` type (4 bytes) plus its CRC (4 bytes).
const PNG_IEND_TAIL: usize = 8;

/// Split `data` according to `format`.
pub fn split(format: ImageFormat, data: &[u8]) -> Result<Vec<Range<usize>>, DemuxError> {
    format.demux(data)
}

/// Borrow each record as a slice of `data`.
pub fn slices<'a>(data: &'a [u8], records: &'a [Range<usize>]) -> impl Iterator<Item = &'a [u8]> {
    records.iter().map(move |r| &data[r.clone()])
}

/// Split concatenated binary PNM images (`P6` with `channels = 3`, `P5`
/// with `channels = 1`).
pub fn split_pnm(data: &[u8], channels: usize) -> Result<Vec<Range<usize>>, DemuxError> {
    let mut records = Vec::new();
    let mut offset = 0;

    while offset < data.len() {
        let header = parse_pnm_header(data, offset)?;
        let pixels = header
            .width
            .checked_mul(header.height)
            .and_then(|n| n.checked_mul(channels))
            .and_then(|n| n.checked_mul(header.bytes_per_sample))
            .ok_or_else(|| DemuxError::InvalidHeader {
                offset,
                line: format!("{} {}", header.width, header.height),
            })?;
        let needed = header.len + pixels;
        let available = data.len() - offset;
        if needed > available {
            return Err(DemuxError::Truncated {
                offset,
                needed,
                available,
            });
        }
        records.push(offset..offset + needed);
        offset += needed;
    }

    Ok(records)
}

/// Split concatenated JPEG images on their EOI markers.
///
/// One record per marker; bytes after the last marker belong to no image
/// and are dropped.
pub fn split_jpeg(data: &[u8]) -> Result<Vec<Range<usize>>, DemuxError> {
    let mut records = Vec::new();
    let mut start = 0;
    let mut pos = 0;

    while pos + JPEG_EOI.len() <= data.len() {
        if data[pos..pos + JPEG_EOI.len()] == JPEG_EOI {
            let end = pos + JPEG_EOI.len();
            records.push(start..end);
            start = end;
            pos = end;
        } else {
            pos += 1;
        }
    }

    Ok(records)
}

/// Split concatenated PNG images at the end of each `IEND` chunk.
pub fn split_png(data: &[u8]) -> Result<Vec<Range<usize>>, DemuxError> {
    let mut records = Vec::new();
    let mut offset = 0;

    while offset < data.len() {
        let rest = &data[offset..];
        let marker = find(rest, PNG_IEND).ok_or(DemuxError::MissingIend { offset })?;
        let needed = marker + PNG_IEND_TAIL;
        if needed > rest.len() {
            return Err(DemuxError::Truncated {
                offset,
                needed,
                available: rest.len(),
            });
        }
        records.push(offset..offset + needed);
        offset += needed;
    }

    Ok(records)
}

// ── Internal helpers ─────────────────────────────────────────────────────

struct PnmHeader {
    /// Header length in bytes, including the three newlines.
    len: usize,
    width: usize,
    height: usize,
    bytes_per_sample: usize,
}

fn parse_pnm_header(data: &[u8], offset: usize) -> Result<PnmHeader, DemuxError> {
    let window_end = (offset + PNM_HEADER_WINDOW).min(data.len());
    let window = &data[offset..window_end];

    let mut lines: Vec<&[u8]> = Vec::with_capacity(3);
    let mut line_start = 0;
    for (i, &b) in window.iter().enumerate() {
        if b == b'\n' {
            lines.push(&window[line_start..i]);
            line_start = i + 1;
            if lines.len() == 3 {
                break;
            }
        }
    }
    if lines.len() < 3 {
        return Err(DemuxError::MissingHeader { offset });
    }
    let len = line_start;

    let invalid = |line: &[u8]| DemuxError::InvalidHeader {
        offset,
        line: String::from_utf8_lossy(line).into_owned(),
    };

    let size = std::str::from_utf8(lines[1]).map_err(|_| invalid(lines[1]))?;
    let mut dims = size.split_ascii_whitespace().map(str::parse::<usize>);
    let (width, height) = match (dims.next(), dims.next(), dims.next()) {
        (Some(Ok(w)), Some(Ok(h)), None) => (w, h),
        _ => return Err(invalid(lines[1])),
    };

    let maxval = std::str::from_utf8(lines[2])
        .ok()
        .and_then(|s| s.trim().parse::<u32>().ok())
        .ok_or_else(|| invalid(lines[2]))?;
    let bytes_per_sample = if maxval > 255 { 2 } else { 1 };

    Ok(PnmHeader {
        len,
        width,
        height,
        bytes_per_sample,
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pnm(magic: &str, width: usize, height: usize, channels: usize, fill: u8) -> Vec<u8> {
        let mut out = format!("{magic}\n{width} {height}\n255\n").into_bytes();
        out.extend(std::iter::repeat(fill).take(width * height * channels));
        out
    }

    /// Minimal JPEG-shaped record: SOI, a payload, EOI.
    fn jpeg(payload: &[u8]) -> Vec<u8> {
        let mut out = vec![0xFF, 0xD8];
        out.extend_from_slice(payload);
        out.extend_from_slice(&JPEG_EOI);
        out
    }

    /// PNG-shaped record: signature, a fake IHDR body, IEND with CRC.
    fn png(tag: u8) -> Vec<u8> {
        let mut out = b"\x89PNG\r\n\x1a\n".to_vec();
        out.extend_from_slice(&[0, 0, 0, 1, b'I', b'H', b'D', b'R', tag, 1, 2, 3, 4]);
        out.extend_from_slice(&[0, 0, 0, 0]);
        out.extend_from_slice(b"IEND");
        out.extend_from_slice(&[0xAE, 0x42, 0x60, 0x82]);
        out
    }

    fn concat(records: &[Vec<u8>]) -> Vec<u8> {
        records.iter().flatten().copied().collect()
    }

    fn assert_splits_back(records: &[Vec<u8>], split: impl Fn(&[u8]) -> Result<Vec<Range<usize>>, DemuxError>) {
        let data = concat(records);
        let ranges = split(&data).expect("well-formed buffer");
        let parts: Vec<&[u8]> = slices(&data, &ranges).collect();
        assert_eq!(parts.len(), records.len());
        for (part, original) in parts.iter().zip(records) {
            assert_eq!(*part, original.as_slice());
        }
    }

    #[test]
    fn ppm_records_come_back_byte_identical() {
        for n in [0usize, 1, 5] {
            let records: Vec<Vec<u8>> = (0..n).map(|i| pnm("P6", 3 + i, 2, 3, i as u8)).collect();
            assert_splits_back(&records, |d| split_pnm(d, 3));
        }
    }

    #[test]
    fn pgm_uses_one_channel() {
        let records = vec![pnm("P5", 4, 4, 1, 7), pnm("P5", 2, 9, 1, 8)];
        assert_splits_back(&records, |d| split_pnm(d, 1));
    }

    #[test]
    fn pixel_bytes_that_look_like_newlines_do_not_confuse_header() {
        let records = vec![pnm("P6", 2, 2, 3, b'\n'), pnm("P6", 1, 1, 3, b'\n')];
        assert_splits_back(&records, |d| split_pnm(d, 3));
    }

    #[test]
    fn sixteen_bit_pnm() {
        let mut record = b"P6\n2 1\n65535\n".to_vec();
        record.extend(std::iter::repeat(0u8).take(2 * 3 * 2));
        assert_splits_back(&[record.clone(), record], |d| split_pnm(d, 3));
    }

    #[test]
    fn pnm_missing_header_fails() {
        assert_eq!(
            split_pnm(b"P6\n3 2", 3),
            Err(DemuxError::MissingHeader { offset: 0 })
        );
    }

    #[test]
    fn pnm_bad_dimensions_fail() {
        let err = split_pnm(b"P6\nthree 2\n255\n\0\0\0", 3).unwrap_err();
        assert!(matches!(err, DemuxError::InvalidHeader { offset: 0, .. }));
        let err = split_pnm(b"P6\n3\n255\n\0\0\0", 3).unwrap_err();
        assert!(matches!(err, DemuxError::InvalidHeader { .. }));
    }

    #[test]
    fn pnm_truncated_pixels_fail() {
        let mut data = pnm("P6", 2, 2, 3, 0);
        let full = data.len();
        data.extend_from_slice(&pnm("P6", 2, 2, 3, 0)[..20]);
        match split_pnm(&data, 3) {
            Err(DemuxError::Truncated { offset, .. }) => assert_eq!(offset, full),
            other => panic!("expected truncation, got {other:?}"),
        }
    }

    #[test]
    fn jpeg_records_come_back_byte_identical() {
        for n in [0usize, 1, 5] {
            let records: Vec<Vec<u8>> = (0..n).map(|i| jpeg(&[i as u8; 16])).collect();
            assert_splits_back(&records, split_jpeg);
        }
    }

    #[test]
    fn jpeg_without_eoi_yields_nothing() {
        assert!(split_jpeg(&[0xFF, 0xD8, 1, 2, 3]).unwrap().is_empty());
        assert!(split_jpeg(&[]).unwrap().is_empty());
    }

    #[test]
    fn jpeg_trailing_bytes_are_dropped() {
        let mut data = jpeg(b"abc");
        let len = data.len();
        data.extend_from_slice(b"junk");
        assert_eq!(split_jpeg(&data).unwrap(), vec![0..len]);
    }

    #[test]
    fn png_records_come_back_byte_identical() {
        for n in [0usize, 1, 5] {
            let records: Vec<Vec<u8>> = (0..n).map(|i| png(i as u8)).collect();
            assert_splits_back(&records, split_png);
        }
    }

    #[test]
    fn png_without_iend_fails() {
        let mut data = png(1);
        let first = data.len();
        data.extend_from_slice(b"\x89PNG\r\n\x1a\nno end");
        assert_eq!(
            split_png(&data),
            Err(DemuxError::MissingIend { offset: first })
        );
    }

    #[test]
    fn png_missing_crc_fails() {
        let mut data = png(1);
        data.truncate(data.len() - 2);
        assert!(matches!(split_png(&data), Err(DemuxError::Truncated { .. })));
    }

    #[test]
    fn split_dispatches_on_format() {
        let data = concat(&[png(1), png(2)]);
        assert_eq!(split(ImageFormat::Png, &data).unwrap().len(), 2);
        assert!(split(ImageFormat::Tiff, &data).is_err());
    }
}
