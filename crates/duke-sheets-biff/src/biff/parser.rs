//! Low-level binary parsing helpers for BIFF8 record bodies.
//!
//! All multi-byte integers in BIFF8 are little-endian. Every reader takes the
//! body slice plus a cursor (`offset`) that is advanced past the value.

use crate::error::{XlsError, XlsResult};

#[inline]
fn need(data: &[u8], offset: usize, n: usize) -> XlsResult<()> {
    if offset.checked_add(n).map_or(true, |end| end > data.len()) {
        return Err(XlsError::Parse(format!(
            "unexpected end of data at offset {offset}, need {n} bytes, have {}",
            data.len().saturating_sub(offset)
        )));
    }
    Ok(())
}

#[inline]
pub fn read_u8(data: &[u8], offset: &mut usize) -> XlsResult<u8> {
    read_array::<1>(data, offset).map(|[b]| b)
}

#[inline]
pub fn read_u16(data: &[u8], offset: &mut usize) -> XlsResult<u16> {
    read_array(data, offset).map(u16::from_le_bytes)
}

#[inline]
pub fn read_u32(data: &[u8], offset: &mut usize) -> XlsResult<u32> {
    read_array(data, offset).map(u32::from_le_bytes)
}

#[inline]
pub fn read_i16(data: &[u8], offset: &mut usize) -> XlsResult<i16> {
    read_array(data, offset).map(i16::from_le_bytes)
}

#[inline]
pub fn read_i32(data: &[u8], offset: &mut usize) -> XlsResult<i32> {
    read_array(data, offset).map(i32::from_le_bytes)
}

/// IEEE 754 double.
#[inline]
pub fn read_f64(data: &[u8], offset: &mut usize) -> XlsResult<f64> {
    read_array(data, offset).map(f64::from_le_bytes)
}

/// `N` bytes as an array; the integer readers are built on this.
#[inline]
pub fn read_array<const N: usize>(data: &[u8], offset: &mut usize) -> XlsResult<[u8; N]> {
    need(data, *offset, N)?;
    let mut out = [0u8; N];
    out.copy_from_slice(&data[*offset..*offset + N]);
    *offset += N;
    Ok(out)
}

/// Read `len` raw bytes.
#[inline]
pub fn read_bytes(data: &[u8], offset: &mut usize, len: usize) -> XlsResult<Vec<u8>> {
    need(data, *offset, len)?;
    let v = data[*offset..*offset + len].to_vec();
    *offset += len;
    Ok(v)
}

/// Everything from `offset` to the end of the body.
#[inline]
pub fn read_remaining(data: &[u8], offset: &mut usize) -> Vec<u8> {
    let start = (*offset).min(data.len());
    *offset = data.len();
    data[start..].to_vec()
}

/// Decode a 32-bit RK number. Bit 0 means "divide by 100". Bit 1 selects
/// a signed 30-bit integer in bits 2..31; otherwise bits 2..31 are the top
/// of an f64 whose low 34 bits are zero.
#[inline]
pub fn decode_rk(rk: u32) -> f64 {
    let value = if rk & 0x02 != 0 {
        f64::from((rk as i32) >> 2)
    } else {
        f64::from_bits(u64::from(rk & !0x03) << 32)
    };
    if rk & 0x01 != 0 {
        value / 100.0
    } else {
        value
    }
}

#[inline]
pub fn read_rk(data: &[u8], offset: &mut usize) -> XlsResult<f64> {
    read_u32(data, offset).map(decode_rk)
}
