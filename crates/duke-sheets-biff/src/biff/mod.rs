//! Physical BIFF8 records.
//!
//! Each record is a 2-byte type and a 2-byte body length followed by the
//! body. A body longer than 8224 bytes spills into CONTINUE records. They
//! are merged on read, and the offsets at which they started are kept so
//! the record can be written back with the same physical layout.

pub mod parser;
pub mod records;
pub mod strings;
pub mod writer;

use crate::error::{XlsError, XlsResult};
use std::io::{Cursor, ErrorKind, Read, Seek};

/// One logical record, its CONTINUE bodies appended to `data`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BiffRecord {
    pub record_type: u16,
    pub data: Vec<u8>,
    /// Offsets into `data` at which each merged CONTINUE body started.
    pub continue_offsets: Vec<usize>,
    /// Where the header sat in the stream.
    pub stream_offset: u64,
}

impl BiffRecord {
    pub fn new(record_type: u16, data: Vec<u8>) -> Self {
        BiffRecord {
            record_type,
            data,
            continue_offsets: Vec::new(),
            stream_offset: 0,
        }
    }

    /// The body split back into its physical pieces.
    pub fn chunks(&self) -> Vec<&[u8]> {
        let mut out = Vec::with_capacity(self.continue_offsets.len() + 1);
        let mut start = 0;
        for &end in &self.continue_offsets {
            out.push(&self.data[start..end]);
            start = end;
        }
        out.push(&self.data[start..]);
        out
    }
}

/// Split a workbook stream into records, folding each CONTINUE body into
/// the record before it. A CONTINUE with nothing before it is dropped.
pub fn read_all_records<R: Read + Seek>(stream: &mut R) -> XlsResult<Vec<BiffRecord>> {
    let mut records: Vec<BiffRecord> = Vec::new();
    loop {
        let stream_offset = stream.stream_position()?;
        let mut header = [0u8; 4];
        if let Err(e) = stream.read_exact(&mut header) {
            if e.kind() == ErrorKind::UnexpectedEof {
                return Ok(records);
            }
            return Err(e.into());
        }
        let mut at = 0;
        let sid = parser::read_u16(&header, &mut at)?;
        let len = parser::read_u16(&header, &mut at)?;
        let mut body = vec![0u8; usize::from(len)];
        stream.read_exact(&mut body)?;

        match (sid, records.last_mut()) {
            (records::CONTINUE, Some(prev)) => {
                prev.continue_offsets.push(prev.data.len());
                prev.data.append(&mut body);
            }
            (records::CONTINUE, None) => {
                log::warn!("dropping orphan CONTINUE at offset {stream_offset}");
            }
            _ => records.push(BiffRecord {
                stream_offset,
                ..BiffRecord::new(sid, body)
            }),
        }
    }
}

/// [`read_all_records`] over an in-memory stream.
pub fn read_records_from_bytes(bytes: &[u8]) -> XlsResult<Vec<BiffRecord>> {
    read_all_records(&mut Cursor::new(bytes))
}

/// Write a merged record back out, re-splitting at its continue offsets.
pub fn write_record(out: &mut Vec<u8>, record: &BiffRecord) {
    writer::write_with_continues(out, record.record_type, &record.data, &record.continue_offsets);
}

/// `(version, substream kind)` from a BOF body.
pub fn parse_bof(data: &[u8]) -> XlsResult<(u16, u16)> {
    if data.len() < 4 {
        return Err(XlsError::InvalidFormat(format!(
            "BOF body is {} bytes, need at least 4",
            data.len()
        )));
    }
    let mut at = 0;
    Ok((parser::read_u16(data, &mut at)?, parser::read_u16(data, &mut at)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_continue_is_merged_and_remembered() {
        let bytes = [
            0xFC, 0x00, 0x02, 0x00, 0xAA, 0xBB, // SST, 2 bytes
            0x3C, 0x00, 0x01, 0x00, 0xCC, // CONTINUE, 1 byte
            0x0A, 0x00, 0x00, 0x00, // EOF
        ];
        let recs = read_records_from_bytes(&bytes).unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].data, vec![0xAA, 0xBB, 0xCC]);
        assert_eq!(recs[0].continue_offsets, vec![2]);
        assert_eq!(recs[0].chunks(), vec![&[0xAA, 0xBB][..], &[0xCC][..]]);
        assert_eq!(recs[1].stream_offset, 11);

        let mut out = Vec::new();
        for r in &recs {
            write_record(&mut out, r);
        }
        assert_eq!(out, bytes.to_vec());
    }

    #[test]
    fn test_orphan_continue_is_dropped() {
        let bytes = [0x3C, 0x00, 0x01, 0x00, 0xCC, 0x0A, 0x00, 0x00, 0x00];
        let recs = read_records_from_bytes(&bytes).unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].record_type, records::EOF);
    }

    #[test]
    fn test_parse_bof() {
        let (v, dt) = parse_bof(&[0x00, 0x06, 0x10, 0x00]).unwrap();
        assert_eq!(v, records::BIFF8_VERSION);
        assert_eq!(dt, records::BOF_WORKSHEET);
        assert!(parse_bof(&[0x00]).is_err());
    }
}
