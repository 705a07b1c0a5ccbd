//! SST (shared string table) and its EXTSST hash index.

use crate::biff::parser::{read_u16, read_u32};
use crate::biff::records::SST;
use crate::biff::strings::{read_sst, write_sst, SstContents, SstStringPosition, UnicodeString};
use crate::biff::writer::{put_u16, put_u32, size_with_continues, write_with_continues};
use crate::error::XlsResult;

/// Smallest EXTSST bucket size Excel writes.
const MIN_STRINGS_PER_BUCKET: usize = 8;
const MAX_BUCKETS: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SstRecord {
    pub contents: SstContents,
}

impl SstRecord {
    pub fn read(data: &[u8], continue_offsets: &[usize]) -> XlsResult<Self> {
        Ok(SstRecord {
            contents: read_sst(data, continue_offsets)?,
        })
    }

    pub fn len(&self) -> usize {
        self.contents.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.strings.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&UnicodeString> {
        self.contents.strings.get(index)
    }

    /// Add a string, reusing an identical existing entry. Counts one reference.
    pub fn add_string(&mut self, s: UnicodeString) -> u32 {
        self.contents.total_refs += 1;
        if let Some(i) = self.contents.strings.iter().position(|e| *e == s) {
            return i as u32;
        }
        self.contents.strings.push(s);
        (self.contents.strings.len() - 1) as u32
    }

    /// Serialize and report where each string landed.
    pub fn serialize_with_positions(&self, out: &mut Vec<u8>) -> Vec<SstStringPosition> {
        let (w, positions) = write_sst(&self.contents);
        write_with_continues(out, SST, &w.body, &w.boundaries);
        positions
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        self.serialize_with_positions(out);
    }

    pub fn record_size(&self) -> usize {
        let (w, _) = write_sst(&self.contents);
        size_with_continues(w.body.len(), &w.boundaries)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExtSstBucket {
    /// Absolute stream offset of the bucket's first string.
    pub stream_pos: u32,
    /// Offset of that string inside its physical record.
    pub record_pos: u16,
    pub reserved: u16,
}

/// EXTSST: one bucket entry per `strings_per_bucket` strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtSstRecord {
    pub strings_per_bucket: u16,
    pub buckets: Vec<ExtSstBucket>,
}

impl Default for ExtSstRecord {
    fn default() -> Self {
        ExtSstRecord {
            strings_per_bucket: MIN_STRINGS_PER_BUCKET as u16,
            buckets: Vec::new(),
        }
    }
}

impl ExtSstRecord {
    pub fn read(data: &[u8]) -> XlsResult<Self> {
        let mut o = 0;
        let strings_per_bucket = read_u16(data, &mut o)?;
        let mut buckets = Vec::with_capacity(data.len().saturating_sub(2) / 8);
        while o + 8 <= data.len() {
            buckets.push(ExtSstBucket {
                stream_pos: read_u32(data, &mut o)?,
                record_pos: read_u16(data, &mut o)?,
                reserved: read_u16(data, &mut o)?,
            });
        }
        Ok(ExtSstRecord {
            strings_per_bucket,
            buckets,
        })
    }

    pub fn write_body(&self, out: &mut Vec<u8>) {
        put_u16(out, self.strings_per_bucket);
        for b in &self.buckets {
            put_u32(out, b.stream_pos);
            put_u16(out, b.record_pos);
            put_u16(out, b.reserved);
        }
    }

    /// Bucket size for a table of `n` strings.
    pub fn strings_per_bucket_for(n: usize) -> usize {
        MIN_STRINGS_PER_BUCKET.max(n.div_ceil(MAX_BUCKETS))
    }

    /// Serialized size once regenerated for `n` strings.
    pub fn size_for(n: usize) -> usize {
        let per = Self::strings_per_bucket_for(n);
        4 + 2 + 8 * n.div_ceil(per)
    }

    /// Rebuild from SST string positions; `sst_offset` is the SST record's
    /// absolute stream offset.
    pub fn from_positions(sst_offset: usize, positions: &[SstStringPosition]) -> Self {
        let per = Self::strings_per_bucket_for(positions.len());
        let buckets = positions
            .iter()
            .step_by(per)
            .map(|p| ExtSstBucket {
                stream_pos: (sst_offset + p.stream_pos) as u32,
                record_pos: p.record_pos,
                reserved: 0,
            })
            .collect();
        ExtSstRecord {
            strings_per_bucket: per as u16,
            buckets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_string_dedupes() {
        let mut sst = SstRecord::default();
        assert_eq!(sst.add_string(UnicodeString::new("a")), 0);
        assert_eq!(sst.add_string(UnicodeString::new("b")), 1);
        assert_eq!(sst.add_string(UnicodeString::new("a")), 0);
        assert_eq!(sst.len(), 2);
        assert_eq!(sst.contents.total_refs, 3);
    }

    #[test]
    fn test_extsst_buckets() {
        let mut sst = SstRecord::default();
        for i in 0..20 {
            sst.add_string(UnicodeString::new(format!("s{i}")));
        }
        let mut out = Vec::new();
        let positions = sst.serialize_with_positions(&mut out);
        assert_eq!(out.len(), sst.record_size());
        let ext = ExtSstRecord::from_positions(100, &positions);
        assert_eq!(ext.strings_per_bucket, 8);
        assert_eq!(ext.buckets.len(), 3);
        assert_eq!(ext.buckets[0].stream_pos, 112);
        let mut body = Vec::new();
        ext.write_body(&mut body);
        assert_eq!(body.len() + 4, ExtSstRecord::size_for(20));
    }

    #[test]
    fn test_bucket_size_grows() {
        assert_eq!(ExtSstRecord::strings_per_bucket_for(0), 8);
        assert_eq!(ExtSstRecord::strings_per_bucket_for(1024), 8);
        assert_eq!(ExtSstRecord::strings_per_bucket_for(1025), 9);
    }
}
