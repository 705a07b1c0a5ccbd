//! BIFF8 Unicode string encoding and decoding.
//!
//! BIFF8 strings have a complex encoding:
//! - Header: char_count (1 or 2 bytes) + flags (1 byte)
//! - Flags bit 0 (`fHighByte`): 0 = compressed Latin-1, 1 = uncompressed UTF-16LE
//! - Flags bit 2 (`fExtSt`): extended string data follows (Asian phonetic)
//! - Flags bit 3 (`fRichSt`): rich text run array follows
//! - If fRichSt: 2-byte run count follows the flags
//! - If fExtSt: 4-byte extended data size follows
//! - Then the character data
//! - Then the rich text runs (4 bytes each) if fRichSt
//! - Then the extended data if fExtSt
//!
//! In SST records, strings can span CONTINUE records. The CONTINUE record
//! can change the encoding (compressed ↔ uncompressed) mid-string via a
//! new flags byte at the start of the continuation.

use super::parser::{read_bytes, read_u16, read_u32, read_u8};
use super::records::MAX_RECORD_DATA_SIZE;
use super::writer::{put_u16, put_u32, put_u8};
use crate::error::{XlsError, XlsResult};

const HIGH_BYTE: u8 = 0x01;
const EXT_ST: u8 = 0x04;
const RICH_ST: u8 = 0x08;

/// A string together with the encoding it was (or will be) stored in.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XlString {
    pub text: String,
    /// `true` when stored as UTF-16LE, `false` for compressed Latin-1.
    pub wide: bool,
}

impl XlString {
    /// Picks the compressed form whenever every character fits in one byte.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let wide = text.chars().any(|c| c as u32 > 0xFF);
        XlString { text, wide }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Number of UTF-16 code units (what BIFF8 calls the character count).
    pub fn char_count(&self) -> usize {
        self.text.encode_utf16().count()
    }

    /// Byte length of the character data alone.
    pub fn data_len(&self) -> usize {
        if self.wide {
            self.char_count() * 2
        } else {
            self.char_count()
        }
    }
}

impl From<&str> for XlString {
    fn from(s: &str) -> Self {
        XlString::new(s)
    }
}

impl std::fmt::Display for XlString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// A shared-string-table entry, with its formatting runs and phonetic data.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UnicodeString {
    pub string: XlString,
    /// Formatting runs as `(first_char, font_index)`.
    pub runs: Vec<(u16, u16)>,
    /// Raw extended (phonetic) data.
    pub ext: Vec<u8>,
}

impl UnicodeString {
    pub fn new(text: impl Into<String>) -> Self {
        UnicodeString {
            string: XlString::new(text),
            runs: Vec::new(),
            ext: Vec::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.string.text
    }

    fn flags(&self) -> u8 {
        let mut flags = 0;
        if self.string.wide {
            flags |= HIGH_BYTE;
        }
        if !self.runs.is_empty() {
            flags |= RICH_ST;
        }
        if !self.ext.is_empty() {
            flags |= EXT_ST;
        }
        flags
    }

    fn header_len(&self) -> usize {
        3 + if self.runs.is_empty() { 0 } else { 2 } + if self.ext.is_empty() { 0 } else { 4 }
    }
}

// ── Plain (non-SST) strings ─────────────────────────────────────────────

/// Read a BIFF8 "short" string (1-byte length prefix, used in BOUNDSHEET etc.).
pub fn read_short_string(data: &[u8], offset: &mut usize) -> XlsResult<XlString> {
    let char_count = read_u8(data, offset)? as usize;
    let flags = read_u8(data, offset)?;
    read_character_data(data, offset, char_count, flags)
}

/// Read a BIFF8 Unicode string with a 2-byte length prefix (used in LABEL,
/// FORMAT etc.). Rich runs and extended data are skipped.
///
/// This does NOT handle CONTINUE boundaries, see [`read_sst`].
pub fn read_unicode_string(data: &[u8], offset: &mut usize) -> XlsResult<XlString> {
    let char_count = read_u16(data, offset)? as usize;
    let flags = read_u8(data, offset)?;

    let run_count = if flags & RICH_ST != 0 { read_u16(data, offset)? } else { 0 };
    let ext_size = if flags & EXT_ST != 0 { read_u32(data, offset)? } else { 0 };

    let text = read_character_data(data, offset, char_count, flags)?;
    *offset += run_count as usize * 4 + ext_size as usize;
    Ok(text)
}

/// Read character data (no header) given char_count and flags byte.
pub fn read_character_data(
    data: &[u8],
    offset: &mut usize,
    char_count: usize,
    flags: u8,
) -> XlsResult<XlString> {
    let wide = flags & HIGH_BYTE != 0;
    let byte_len = if wide { char_count * 2 } else { char_count };
    if *offset + byte_len > data.len() {
        return Err(XlsError::Parse(format!(
            "string data too short: need {} bytes at offset {}, have {}",
            byte_len,
            *offset,
            data.len().saturating_sub(*offset)
        )));
    }
    let raw = &data[*offset..*offset + byte_len];
    *offset += byte_len;
    Ok(XlString {
        text: decode_chars(raw, wide)?,
        wide,
    })
}

fn decode_chars(raw: &[u8], wide: bool) -> XlsResult<String> {
    if wide {
        let units: Vec<u16> = raw
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        String::from_utf16(&units).map_err(|e| XlsError::Parse(format!("invalid UTF-16 string: {e}")))
    } else {
        Ok(raw.iter().map(|&b| b as char).collect())
    }
}

/// Append the character data for `s` in its own encoding.
pub fn write_character_data(out: &mut Vec<u8>, s: &XlString) {
    if s.wide {
        for unit in s.text.encode_utf16() {
            put_u16(out, unit);
        }
    } else {
        out.extend(s.text.chars().map(|c| c as u32 as u8));
    }
}

/// 1-byte length, flags, characters.
pub fn write_short_string(out: &mut Vec<u8>, s: &XlString) {
    put_u8(out, s.char_count() as u8);
    put_u8(out, if s.wide { HIGH_BYTE } else { 0 });
    write_character_data(out, s);
}

/// 2-byte length, flags, characters.
pub fn write_unicode_string(out: &mut Vec<u8>, s: &XlString) {
    put_u16(out, s.char_count() as u16);
    put_u8(out, if s.wide { HIGH_BYTE } else { 0 });
    write_character_data(out, s);
}

// ── Shared string table ─────────────────────────────────────────────────

/// Decoded SST body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SstContents {
    pub total_refs: u32,
    pub strings: Vec<UnicodeString>,
}

/// Parse the SST body, honouring the CONTINUE layout: character data that
/// crosses a continue boundary resumes with a fresh flags byte.
pub fn read_sst(data: &[u8], continue_offsets: &[usize]) -> XlsResult<SstContents> {
    let mut offset = 0;
    let total_refs = read_u32(data, &mut offset)?;
    let unique_count = read_u32(data, &mut offset)? as usize;

    let mut strings = Vec::with_capacity(unique_count.min(data.len() / 3));
    for i in 0..unique_count {
        match read_sst_entry(data, &mut offset, continue_offsets) {
            Ok(s) => strings.push(s),
            Err(e) => {
                // Some producers write a short SST; keep what decoded.
                log::warn!("SST parse error at string {i}/{unique_count}: {e}");
                break;
            }
        }
    }
    Ok(SstContents { total_refs, strings })
}

fn read_sst_entry(
    data: &[u8],
    offset: &mut usize,
    continue_offsets: &[usize],
) -> XlsResult<UnicodeString> {
    let char_count = read_u16(data, offset)? as usize;
    let mut flags = read_u8(data, offset)?;
    let run_count = if flags & RICH_ST != 0 { read_u16(data, offset)? } else { 0 };
    let ext_size = if flags & EXT_ST != 0 { read_u32(data, offset)? } else { 0 };

    let first_wide = flags & HIGH_BYTE != 0;
    let mut units: Vec<u16> = Vec::with_capacity(char_count);
    let mut any_wide = first_wide;
    while units.len() < char_count {
        let boundary = continue_offsets
            .iter()
            .copied()
            .find(|&b| b > *offset)
            .unwrap_or(data.len());
        let wide = flags & HIGH_BYTE != 0;
        let width = if wide { 2 } else { 1 };
        let available = (boundary - *offset) / width;
        let take = available.min(char_count - units.len());
        if take == 0 && boundary >= data.len() {
            return Err(XlsError::Parse(format!(
                "SST string truncated at offset {offset}, {} of {char_count} chars read",
                units.len()
            )));
        }
        let raw = read_bytes(data, offset, take * width)?;
        if wide {
            units.extend(raw.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]])));
        } else {
            units.extend(raw.iter().map(|&b| b as u16));
        }
        if units.len() < char_count {
            // Landed on a continue boundary mid-string.
            flags = read_u8(data, offset)?;
            any_wide |= flags & HIGH_BYTE != 0;
        }
    }

    let text = String::from_utf16(&units)
        .map_err(|e| XlsError::Parse(format!("invalid UTF-16 string: {e}")))?;

    let mut runs = Vec::with_capacity(run_count as usize);
    for _ in 0..run_count {
        let pos = read_u16(data, offset)?;
        let font = read_u16(data, offset)?;
        runs.push((pos, font));
    }
    let ext = read_bytes(data, offset, ext_size as usize)?;

    Ok(UnicodeString {
        string: XlString {
            text,
            wide: any_wide,
        },
        runs,
        ext,
    })
}

/// Builder for a logical record body that tracks where CONTINUE records
/// must begin.
#[derive(Debug, Default)]
pub struct ContinuableBody {
    pub body: Vec<u8>,
    pub boundaries: Vec<usize>,
    chunk_start: usize,
}

impl ContinuableBody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes still free in the current physical record.
    pub fn remaining(&self) -> usize {
        MAX_RECORD_DATA_SIZE - (self.body.len() - self.chunk_start)
    }

    /// Offset of the next byte within the current physical record body.
    pub fn offset_in_chunk(&self) -> usize {
        self.body.len() - self.chunk_start
    }

    pub fn start_continue(&mut self) {
        self.chunk_start = self.body.len();
        self.boundaries.push(self.body.len());
    }

    /// Write bytes that may be split anywhere.
    pub fn write_splittable(&mut self, mut bytes: &[u8]) {
        while !bytes.is_empty() {
            if self.remaining() == 0 {
                self.start_continue();
            }
            let n = self.remaining().min(bytes.len());
            self.body.extend_from_slice(&bytes[..n]);
            bytes = &bytes[n..];
        }
    }

    /// Write bytes that must stay in one physical record.
    pub fn write_atomic(&mut self, bytes: &[u8]) {
        if self.remaining() < bytes.len() {
            self.start_continue();
        }
        self.body.extend_from_slice(bytes);
    }
}

/// Position of one string inside an encoded SST, used for EXTSST buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SstStringPosition {
    /// Offset from the start of the serialized SST record (headers included).
    pub stream_pos: usize,
    /// Offset within the physical record the string starts in, header included.
    pub record_pos: u16,
}

/// Encode an SST body, splitting strings across CONTINUE boundaries the way
/// Excel does. Returns the body, its continue boundaries and the position of
/// every string.
pub fn write_sst(contents: &SstContents) -> (ContinuableBody, Vec<SstStringPosition>) {
    let mut w = ContinuableBody::new();
    let mut header = Vec::with_capacity(8);
    put_u32(&mut header, contents.total_refs);
    put_u32(&mut header, contents.strings.len() as u32);
    w.write_atomic(&header);

    let mut positions = Vec::with_capacity(contents.strings.len());
    for s in &contents.strings {
        let char_width = if s.string.wide { 2 } else { 1 };
        // Header plus at least one character must fit.
        if w.remaining() < s.header_len() + char_width {
            w.start_continue();
        }
        let record_pos = (w.offset_in_chunk() + 4) as u16;
        let stream_pos = w.body.len() + 4 * (w.boundaries.len() + 1);
        positions.push(SstStringPosition {
            stream_pos,
            record_pos,
        });

        let mut head = Vec::with_capacity(9);
        put_u16(&mut head, s.string.char_count() as u16);
        put_u8(&mut head, s.flags());
        if !s.runs.is_empty() {
            put_u16(&mut head, s.runs.len() as u16);
        }
        if !s.ext.is_empty() {
            put_u32(&mut head, s.ext.len() as u32);
        }
        w.body.extend_from_slice(&head);

        let mut chars = Vec::with_capacity(s.string.data_len());
        write_character_data(&mut chars, &s.string);
        let mut rest = &chars[..];
        while !rest.is_empty() {
            if w.remaining() < char_width {
                w.start_continue();
                put_u8(&mut w.body, if s.string.wide { HIGH_BYTE } else { 0 });
            }
            let n = (w.remaining() / char_width * char_width).min(rest.len());
            w.body.extend_from_slice(&rest[..n]);
            rest = &rest[n..];
        }

        for &(pos, font) in &s.runs {
            let mut run = Vec::with_capacity(4);
            put_u16(&mut run, pos);
            put_u16(&mut run, font);
            w.write_atomic(&run);
        }
        w.write_splittable(&s.ext);
    }
    (w, positions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_compressed_string() {
        // 3-char compressed string "ABC"
        let data = [0x03, 0x00, 0x00, b'A', b'B', b'C'];
        let mut offset = 0;
        let s = read_unicode_string(&data, &mut offset).unwrap();
        assert_eq!(s.as_str(), "ABC");
        assert!(!s.wide);
        assert_eq!(offset, 6);
    }

    #[test]
    fn test_read_wide_string() {
        // 2-char UTF-16 string "Hi"
        let data = [0x02, 0x00, 0x01, b'H', 0x00, b'i', 0x00];
        let mut offset = 0;
        let s = read_unicode_string(&data, &mut offset).unwrap();
        assert_eq!(s.as_str(), "Hi");
        assert!(s.wide);
        assert_eq!(offset, 7);

        let mut out = Vec::new();
        write_unicode_string(&mut out, &s);
        assert_eq!(out, data.to_vec());
    }

    #[test]
    fn test_read_short_string() {
        let data = [0x02, 0x00, b'O', b'K'];
        let mut offset = 0;
        let s = read_short_string(&data, &mut offset).unwrap();
        assert_eq!(s.as_str(), "OK");
        let mut out = Vec::new();
        write_short_string(&mut out, &s);
        assert_eq!(out, data.to_vec());
    }

    #[test]
    fn test_xlstring_picks_encoding() {
        assert!(!XlString::new("Sheet1").wide);
        assert!(XlString::new("Лист1").wide);
    }

    #[test]
    fn test_sst_string_split_across_continue() {
        // "ABCD": "AB" compressed in the first chunk, "CD" wide in the continue.
        let mut buf = Vec::new();
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.extend_from_slice(&[0x04, 0x00, 0x00, b'A', b'B']);
        let boundary = buf.len();
        buf.extend_from_slice(&[0x01, b'C', 0x00, b'D', 0x00]);

        let sst = read_sst(&buf, &[boundary]).unwrap();
        assert_eq!(sst.strings.len(), 1);
        assert_eq!(sst.strings[0].text(), "ABCD");
    }

    #[test]
    fn test_sst_round_trip_with_runs() {
        let mut rich = UnicodeString::new("bold");
        rich.runs = vec![(0, 5), (2, 6)];
        let contents = SstContents {
            total_refs: 3,
            strings: vec![UnicodeString::new("A"), rich, UnicodeString::new("Ω")],
        };
        let (w, positions) = write_sst(&contents);
        assert!(w.boundaries.is_empty());
        assert_eq!(positions[0].stream_pos, 12);
        assert_eq!(positions[0].record_pos, 12);
        let back = read_sst(&w.body, &w.boundaries).unwrap();
        assert_eq!(back, contents);
    }

    #[test]
    fn test_sst_long_string_is_continued() {
        let long = "x".repeat(MAX_RECORD_DATA_SIZE + 100);
        let contents = SstContents {
            total_refs: 1,
            strings: vec![UnicodeString::new(long.clone())],
        };
        let (w, _) = write_sst(&contents);
        assert_eq!(w.boundaries, vec![MAX_RECORD_DATA_SIZE]);
        let back = read_sst(&w.body, &w.boundaries).unwrap();
        assert_eq!(back.strings[0].text(), long);
    }
}
