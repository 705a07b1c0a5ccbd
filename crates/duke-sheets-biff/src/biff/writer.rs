//! Little-endian write helpers and physical record framing.

use super::records::{CONTINUE, MAX_RECORD_DATA_SIZE};

#[inline]
pub fn put_u8(out: &mut Vec<u8>, v: u8) {
    out.push(v);
}

#[inline]
pub fn put_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

#[inline]
pub fn put_i16(out: &mut Vec<u8>, v: i16) {
    out.extend_from_slice(&v.to_le_bytes());
}

#[inline]
pub fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

#[inline]
pub fn put_i32(out: &mut Vec<u8>, v: i32) {
    out.extend_from_slice(&v.to_le_bytes());
}

#[inline]
pub fn put_f64(out: &mut Vec<u8>, v: f64) {
    out.extend_from_slice(&v.to_le_bytes());
}

/// Write one physical record (header + body). The body must fit in one record.
pub fn write_physical(out: &mut Vec<u8>, sid: u16, body: &[u8]) {
    debug_assert!(body.len() <= MAX_RECORD_DATA_SIZE);
    put_u16(out, sid);
    put_u16(out, body.len() as u16);
    out.extend_from_slice(body);
}

/// Write a logical record, splitting the body at `boundaries` (offsets where the
/// original CONTINUE records started). Any chunk still larger than the record
/// limit is split further.
pub fn write_with_continues(out: &mut Vec<u8>, sid: u16, body: &[u8], boundaries: &[usize]) {
    let mut cuts: Vec<usize> = boundaries
        .iter()
        .copied()
        .filter(|&b| b > 0 && b < body.len())
        .collect();
    cuts.sort_unstable();
    cuts.dedup();

    let mut start = 0usize;
    let mut first = true;
    for end in cuts.into_iter().chain(std::iter::once(body.len())) {
        let mut chunk_start = start;
        loop {
            let chunk_end = end.min(chunk_start + MAX_RECORD_DATA_SIZE);
            let id = if first { sid } else { CONTINUE };
            write_physical(out, id, &body[chunk_start..chunk_end]);
            first = false;
            chunk_start = chunk_end;
            if chunk_start >= end {
                break;
            }
        }
        start = end;
    }
}

/// Serialized size of a logical record written by [`write_with_continues`].
pub fn size_with_continues(body_len: usize, boundaries: &[usize]) -> usize {
    let mut cuts: Vec<usize> = boundaries
        .iter()
        .copied()
        .filter(|&b| b > 0 && b < body_len)
        .collect();
    cuts.sort_unstable();
    cuts.dedup();

    let mut total = 0usize;
    let mut start = 0usize;
    for end in cuts.into_iter().chain(std::iter::once(body_len)) {
        let len = end - start;
        let chunks = if len == 0 {
            1
        } else {
            len.div_ceil(MAX_RECORD_DATA_SIZE)
        };
        total += chunks * 4 + len;
        start = end;
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_body_is_one_record() {
        let mut out = Vec::new();
        write_with_continues(&mut out, 0x0203, &[1, 2, 3], &[]);
        assert_eq!(out, vec![0x03, 0x02, 0x03, 0x00, 1, 2, 3]);
        assert_eq!(size_with_continues(3, &[]), out.len());
    }

    #[test]
    fn test_long_body_is_split_into_continue() {
        let body = vec![0xAB; MAX_RECORD_DATA_SIZE + 10];
        let mut out = Vec::new();
        write_with_continues(&mut out, 0x00FC, &body, &[]);
        assert_eq!(out.len(), body.len() + 8);
        let second = 4 + MAX_RECORD_DATA_SIZE;
        assert_eq!(&out[second..second + 4], &[0x3C, 0x00, 10, 0]);
        assert_eq!(size_with_continues(body.len(), &[]), out.len());
    }

    #[test]
    fn test_boundaries_are_preserved() {
        let mut out = Vec::new();
        write_with_continues(&mut out, 0x01B6, &[1, 2, 3, 4], &[2]);
        assert_eq!(out, vec![0xB6, 0x01, 2, 0, 1, 2, 0x3C, 0, 2, 0, 3, 4]);
    }
}
