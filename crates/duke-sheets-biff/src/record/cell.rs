//! Row and cell records of the row-block region.

use crate::biff::parser::{read_array, read_f64, read_remaining, read_u16, read_u32, read_u8};
use crate::biff::strings::{read_unicode_string, write_unicode_string, XlString};
use crate::biff::writer::{put_f64, put_u16, put_u32, put_u8};
use crate::error::{XlsError, XlsResult};

/// `fShrFmla` in FORMULA grbit.
pub const FORMULA_SHARED: u16 = 0x0008;
/// First token of a shared/array/table follower formula.
pub const PTG_EXP: u8 = 0x01;
/// First token of a data-table follower formula.
pub const PTG_TBL: u8 = 0x02;

/// Range of cells with 8-bit columns (RefU), used by SHRFMLA/ARRAY/TABLE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRangeAddress8 {
    pub first_row: u16,
    pub last_row: u16,
    pub first_col: u8,
    pub last_col: u8,
}

impl CellRangeAddress8 {
    pub fn read(data: &[u8], offset: &mut usize) -> XlsResult<Self> {
        Ok(CellRangeAddress8 {
            first_row: read_u16(data, offset)?,
            last_row: read_u16(data, offset)?,
            first_col: read_u8(data, offset)?,
            last_col: read_u8(data, offset)?,
        })
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        put_u16(out, self.first_row);
        put_u16(out, self.last_row);
        put_u8(out, self.first_col);
        put_u8(out, self.last_col);
    }

    pub fn contains(&self, row: u16, col: u16) -> bool {
        row >= self.first_row
            && row <= self.last_row
            && col >= self.first_col as u16
            && col <= self.last_col as u16
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumberRecord {
    pub row: u16,
    pub col: u16,
    pub xf: u16,
    pub value: f64,
}

impl NumberRecord {
    pub fn read(data: &[u8]) -> XlsResult<Self> {
        let mut o = 0;
        Ok(NumberRecord {
            row: read_u16(data, &mut o)?,
            col: read_u16(data, &mut o)?,
            xf: read_u16(data, &mut o)?,
            value: read_f64(data, &mut o)?,
        })
    }

    pub fn write_body(&self, out: &mut Vec<u8>) {
        put_u16(out, self.row);
        put_u16(out, self.col);
        put_u16(out, self.xf);
        put_f64(out, self.value);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RkRecord {
    pub row: u16,
    pub col: u16,
    pub xf: u16,
    pub rk: u32,
}

impl RkRecord {
    pub fn read(data: &[u8]) -> XlsResult<Self> {
        let mut o = 0;
        Ok(RkRecord {
            row: read_u16(data, &mut o)?,
            col: read_u16(data, &mut o)?,
            xf: read_u16(data, &mut o)?,
            rk: read_u32(data, &mut o)?,
        })
    }

    pub fn write_body(&self, out: &mut Vec<u8>) {
        put_u16(out, self.row);
        put_u16(out, self.col);
        put_u16(out, self.xf);
        put_u32(out, self.rk);
    }

    pub fn value(&self) -> f64 {
        crate::biff::parser::decode_rk(self.rk)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSstRecord {
    pub row: u16,
    pub col: u16,
    pub xf: u16,
    pub sst_index: u32,
}

impl LabelSstRecord {
    pub fn read(data: &[u8]) -> XlsResult<Self> {
        let mut o = 0;
        Ok(LabelSstRecord {
            row: read_u16(data, &mut o)?,
            col: read_u16(data, &mut o)?,
            xf: read_u16(data, &mut o)?,
            sst_index: read_u32(data, &mut o)?,
        })
    }

    pub fn write_body(&self, out: &mut Vec<u8>) {
        put_u16(out, self.row);
        put_u16(out, self.col);
        put_u16(out, self.xf);
        put_u32(out, self.sst_index);
    }
}

/// Inline string cell. Excel only reads these; it writes LABELSST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelRecord {
    pub row: u16,
    pub col: u16,
    pub xf: u16,
    pub text: XlString,
}

impl LabelRecord {
    pub fn read(data: &[u8]) -> XlsResult<Self> {
        let mut o = 0;
        Ok(LabelRecord {
            row: read_u16(data, &mut o)?,
            col: read_u16(data, &mut o)?,
            xf: read_u16(data, &mut o)?,
            text: read_unicode_string(data, &mut o)?,
        })
    }

    pub fn write_body(&self, out: &mut Vec<u8>) {
        put_u16(out, self.row);
        put_u16(out, self.col);
        put_u16(out, self.xf);
        write_unicode_string(out, &self.text);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlankRecord {
    pub row: u16,
    pub col: u16,
    pub xf: u16,
}

impl BlankRecord {
    pub fn read(data: &[u8]) -> XlsResult<Self> {
        let mut o = 0;
        Ok(BlankRecord {
            row: read_u16(data, &mut o)?,
            col: read_u16(data, &mut o)?,
            xf: read_u16(data, &mut o)?,
        })
    }

    pub fn write_body(&self, out: &mut Vec<u8>) {
        put_u16(out, self.row);
        put_u16(out, self.col);
        put_u16(out, self.xf);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoolErrRecord {
    pub row: u16,
    pub col: u16,
    pub xf: u16,
    /// Boolean (0/1) or error code.
    pub value: u8,
    pub is_error: bool,
}

impl BoolErrRecord {
    pub fn read(data: &[u8]) -> XlsResult<Self> {
        let mut o = 0;
        Ok(BoolErrRecord {
            row: read_u16(data, &mut o)?,
            col: read_u16(data, &mut o)?,
            xf: read_u16(data, &mut o)?,
            value: read_u8(data, &mut o)?,
            is_error: read_u8(data, &mut o)? != 0,
        })
    }

    pub fn write_body(&self, out: &mut Vec<u8>) {
        put_u16(out, self.row);
        put_u16(out, self.col);
        put_u16(out, self.xf);
        put_u8(out, self.value);
        put_u8(out, self.is_error as u8);
    }
}

/// FORMULA cell. The token array is kept opaque: `formula` holds the
/// `cce` length, the `rgce` tokens and any trailing `rgcb` data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormulaRecord {
    pub row: u16,
    pub col: u16,
    pub xf: u16,
    /// Cached result, 8 bytes (a double, or a typed special value).
    pub result: [u8; 8],
    pub options: u16,
    pub reserved: u32,
    pub formula: Vec<u8>,
}

impl FormulaRecord {
    pub fn new(row: u16, col: u16, xf: u16, tokens: &[u8]) -> Self {
        let mut formula = Vec::with_capacity(tokens.len() + 2);
        put_u16(&mut formula, tokens.len() as u16);
        formula.extend_from_slice(tokens);
        FormulaRecord {
            row,
            col,
            xf,
            result: [0; 8],
            options: 0,
            reserved: 0,
            formula,
        }
    }

    pub fn read(data: &[u8]) -> XlsResult<Self> {
        let mut o = 0;
        let row = read_u16(data, &mut o)?;
        let col = read_u16(data, &mut o)?;
        let xf = read_u16(data, &mut o)?;
        let result = read_array::<8>(data, &mut o)?;
        let options = read_u16(data, &mut o)?;
        let reserved = read_u32(data, &mut o)?;
        let formula = read_remaining(data, &mut o);
        if formula.len() < 2 {
            return Err(XlsError::Parse("FORMULA record without token array".into()));
        }
        Ok(FormulaRecord {
            row,
            col,
            xf,
            result,
            options,
            reserved,
            formula,
        })
    }

    pub fn write_body(&self, out: &mut Vec<u8>) {
        put_u16(out, self.row);
        put_u16(out, self.col);
        put_u16(out, self.xf);
        out.extend_from_slice(&self.result);
        put_u16(out, self.options);
        put_u32(out, self.reserved);
        out.extend_from_slice(&self.formula);
    }

    /// The `rgce` token bytes.
    pub fn tokens(&self) -> &[u8] {
        let cce = u16::from_le_bytes([self.formula[0], self.formula[1]]) as usize;
        let end = (2 + cce).min(self.formula.len());
        &self.formula[2..end]
    }

    pub fn is_shared(&self) -> bool {
        self.options & FORMULA_SHARED != 0
    }

    pub fn set_shared(&mut self, shared: bool) {
        if shared {
            self.options |= FORMULA_SHARED;
        } else {
            self.options &= !FORMULA_SHARED;
        }
    }

    /// Anchor cell named by a leading PtgExp/PtgTbl token, if any.
    pub fn exp_reference(&self) -> Option<(u16, u16)> {
        let t = self.tokens();
        if t.len() >= 5 && (t[0] == PTG_EXP || t[0] == PTG_TBL) {
            Some((
                u16::from_le_bytes([t[1], t[2]]),
                u16::from_le_bytes([t[3], t[4]]),
            ))
        } else {
            None
        }
    }

    /// A cached string result is stored in a following STRING record.
    pub fn has_string_result(&self) -> bool {
        self.result[0] == 0x00 && self.result[6] == 0xFF && self.result[7] == 0xFF
    }
}

/// MULRK is expanded to RK cells on read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MulRkRecord {
    pub row: u16,
    pub first_col: u16,
    /// `(xf, rk)` per column starting at `first_col`.
    pub cells: Vec<(u16, u32)>,
}

impl MulRkRecord {
    pub fn read(data: &[u8]) -> XlsResult<Self> {
        if data.len() < 6 || (data.len() - 6) % 6 != 0 {
            return Err(XlsError::Parse(format!("bad MULRK length {}", data.len())));
        }
        let mut o = 0;
        let row = read_u16(data, &mut o)?;
        let first_col = read_u16(data, &mut o)?;
        let n = (data.len() - 6) / 6;
        let mut cells = Vec::with_capacity(n);
        for _ in 0..n {
            let xf = read_u16(data, &mut o)?;
            let rk = read_u32(data, &mut o)?;
            cells.push((xf, rk));
        }
        Ok(MulRkRecord {
            row,
            first_col,
            cells,
        })
    }

    pub fn write_body(&self, out: &mut Vec<u8>) {
        put_u16(out, self.row);
        put_u16(out, self.first_col);
        for &(xf, rk) in &self.cells {
            put_u16(out, xf);
            put_u32(out, rk);
        }
        put_u16(out, self.last_col());
    }

    pub fn last_col(&self) -> u16 {
        self.first_col + self.cells.len().saturating_sub(1) as u16
    }

    pub fn expand(&self) -> impl Iterator<Item = RkRecord> + '_ {
        self.cells.iter().enumerate().map(move |(i, &(xf, rk))| RkRecord {
            row: self.row,
            col: self.first_col + i as u16,
            xf,
            rk,
        })
    }
}

/// MULBLANK is expanded to BLANK cells on read and rebuilt on write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MulBlankRecord {
    pub row: u16,
    pub first_col: u16,
    pub xfs: Vec<u16>,
}

impl MulBlankRecord {
    pub fn read(data: &[u8]) -> XlsResult<Self> {
        if data.len() < 6 || data.len() % 2 != 0 {
            return Err(XlsError::Parse(format!("bad MULBLANK length {}", data.len())));
        }
        let mut o = 0;
        let row = read_u16(data, &mut o)?;
        let first_col = read_u16(data, &mut o)?;
        let n = (data.len() - 6) / 2;
        let mut xfs = Vec::with_capacity(n);
        for _ in 0..n {
            xfs.push(read_u16(data, &mut o)?);
        }
        Ok(MulBlankRecord {
            row,
            first_col,
            xfs,
        })
    }

    pub fn write_body(&self, out: &mut Vec<u8>) {
        put_u16(out, self.row);
        put_u16(out, self.first_col);
        for &xf in &self.xfs {
            put_u16(out, xf);
        }
        put_u16(out, self.last_col());
    }

    pub fn last_col(&self) -> u16 {
        self.first_col + self.xfs.len().saturating_sub(1) as u16
    }

    pub fn expand(&self) -> impl Iterator<Item = BlankRecord> + '_ {
        self.xfs.iter().enumerate().map(move |(i, &xf)| BlankRecord {
            row: self.row,
            col: self.first_col + i as u16,
            xf,
        })
    }
}

/// Cached string result of the preceding FORMULA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringRecord {
    pub text: XlString,
}

impl StringRecord {
    pub fn read(data: &[u8]) -> XlsResult<Self> {
        let mut o = 0;
        Ok(StringRecord {
            text: read_unicode_string(data, &mut o)?,
        })
    }

    pub fn write_body(&self, out: &mut Vec<u8>) {
        write_unicode_string(out, &self.text);
    }
}

/// SHRFMLA: formula shared by a range of FORMULA cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedFormulaRecord {
    pub range: CellRangeAddress8,
    pub reserved: u8,
    /// Number of cells using this formula.
    pub use_count: u8,
    pub formula: Vec<u8>,
}

impl SharedFormulaRecord {
    pub fn read(data: &[u8]) -> XlsResult<Self> {
        let mut o = 0;
        Ok(SharedFormulaRecord {
            range: CellRangeAddress8::read(data, &mut o)?,
            reserved: read_u8(data, &mut o)?,
            use_count: read_u8(data, &mut o)?,
            formula: read_remaining(data, &mut o),
        })
    }

    pub fn write_body(&self, out: &mut Vec<u8>) {
        self.range.write(out);
        put_u8(out, self.reserved);
        put_u8(out, self.use_count);
        out.extend_from_slice(&self.formula);
    }
}

/// ARRAY: array formula anchored at the top-left cell of its range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayRecord {
    pub range: CellRangeAddress8,
    pub options: u16,
    pub reserved: u32,
    pub formula: Vec<u8>,
}

impl ArrayRecord {
    pub fn read(data: &[u8]) -> XlsResult<Self> {
        let mut o = 0;
        Ok(ArrayRecord {
            range: CellRangeAddress8::read(data, &mut o)?,
            options: read_u16(data, &mut o)?,
            reserved: read_u32(data, &mut o)?,
            formula: read_remaining(data, &mut o),
        })
    }

    pub fn write_body(&self, out: &mut Vec<u8>) {
        self.range.write(out);
        put_u16(out, self.options);
        put_u32(out, self.reserved);
        out.extend_from_slice(&self.formula);
    }
}

/// TABLE: what-if data table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRecord {
    pub range: CellRangeAddress8,
    /// Flags and input cell references.
    pub body: Vec<u8>,
}

impl TableRecord {
    pub fn read(data: &[u8]) -> XlsResult<Self> {
        let mut o = 0;
        Ok(TableRecord {
            range: CellRangeAddress8::read(data, &mut o)?,
            body: read_remaining(data, &mut o),
        })
    }

    pub fn write_body(&self, out: &mut Vec<u8>) {
        self.range.write(out);
        out.extend_from_slice(&self.body);
    }
}

// ── ROW ─────────────────────────────────────────────────────────────────

pub const ROW_OUTLINE_MASK: u16 = 0x0007;
pub const ROW_COLLAPSED: u16 = 0x0010;
pub const ROW_ZERO_HEIGHT: u16 = 0x0020;
pub const ROW_BAD_FONT_HEIGHT: u16 = 0x0040;
pub const ROW_FORMATTED: u16 = 0x0080;
/// Always set by Excel.
pub const ROW_ALWAYS: u16 = 0x0100;
/// Default height with the "default" flag, 0xFF in twips.
pub const ROW_DEFAULT_HEIGHT: u16 = 0x00FF;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowRecord {
    pub row: u16,
    pub first_col: u16,
    /// One past the last column with a cell.
    pub last_col: u16,
    /// Height in twips; bit 15 set means default height.
    pub height: u16,
    pub optimize: u16,
    pub reserved: u16,
    pub options: u16,
    /// XF index in the low 12 bits plus thick-border flags.
    pub xf_options: u16,
}

impl RowRecord {
    pub fn new(row: u16) -> Self {
        RowRecord {
            row,
            first_col: 0,
            last_col: 0,
            height: ROW_DEFAULT_HEIGHT,
            optimize: 0,
            reserved: 0,
            options: ROW_ALWAYS,
            xf_options: 0x000F,
        }
    }

    pub fn read(data: &[u8]) -> XlsResult<Self> {
        let mut o = 0;
        Ok(RowRecord {
            row: read_u16(data, &mut o)?,
            first_col: read_u16(data, &mut o)?,
            last_col: read_u16(data, &mut o)?,
            height: read_u16(data, &mut o)?,
            optimize: read_u16(data, &mut o)?,
            reserved: read_u16(data, &mut o)?,
            options: read_u16(data, &mut o)?,
            xf_options: read_u16(data, &mut o)?,
        })
    }

    pub fn write_body(&self, out: &mut Vec<u8>) {
        put_u16(out, self.row);
        put_u16(out, self.first_col);
        put_u16(out, self.last_col);
        put_u16(out, self.height);
        put_u16(out, self.optimize);
        put_u16(out, self.reserved);
        put_u16(out, self.options);
        put_u16(out, self.xf_options);
    }

    pub fn outline_level(&self) -> u16 {
        self.options & ROW_OUTLINE_MASK
    }

    pub fn set_outline_level(&mut self, level: u16) {
        self.options = (self.options & !ROW_OUTLINE_MASK) | (level & ROW_OUTLINE_MASK);
    }

    pub fn is_collapsed(&self) -> bool {
        self.options & ROW_COLLAPSED != 0
    }

    pub fn set_collapsed(&mut self, v: bool) {
        set_flag(&mut self.options, ROW_COLLAPSED, v);
    }

    pub fn is_zero_height(&self) -> bool {
        self.options & ROW_ZERO_HEIGHT != 0
    }

    pub fn set_zero_height(&mut self, v: bool) {
        set_flag(&mut self.options, ROW_ZERO_HEIGHT, v);
    }

    pub fn set_height(&mut self, twips: u16) {
        self.height = twips & 0x7FFF;
        self.options |= ROW_BAD_FONT_HEIGHT;
    }
}

fn set_flag(field: &mut u16, mask: u16, v: bool) {
    if v {
        *field |= mask;
    } else {
        *field &= !mask;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formula_exp_reference() {
        // PtgExp pointing at B3 (row 2, col 1)
        let mut f = FormulaRecord::new(5, 1, 15, &[PTG_EXP, 2, 0, 1, 0]);
        f.set_shared(true);
        assert!(f.is_shared());
        assert_eq!(f.exp_reference(), Some((2, 1)));

        let mut body = Vec::new();
        f.write_body(&mut body);
        assert_eq!(FormulaRecord::read(&body).unwrap(), f);
    }

    #[test]
    fn test_formula_plain_has_no_exp() {
        // =1 (PtgInt 1)
        let f = FormulaRecord::new(0, 0, 15, &[0x1E, 1, 0]);
        assert_eq!(f.exp_reference(), None);
        assert_eq!(f.tokens(), &[0x1E, 1, 0]);
    }

    #[test]
    fn test_mulrk_expand() {
        let m = MulRkRecord {
            row: 4,
            first_col: 2,
            cells: vec![(15, (1 << 2) | 2), (16, (2 << 2) | 2)],
        };
        let mut body = Vec::new();
        m.write_body(&mut body);
        assert_eq!(&body[body.len() - 2..], &[3, 0]);
        let cells: Vec<_> = MulRkRecord::read(&body).unwrap().expand().collect();
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[1].col, 3);
        assert_eq!(cells[1].value(), 2.0);
    }

    #[test]
    fn test_mulblank_rejects_odd_length() {
        assert!(MulBlankRecord::read(&[0, 0, 0, 0, 0, 0, 0]).is_err());
    }

    #[test]
    fn test_row_flags() {
        let mut r = RowRecord::new(3);
        r.set_outline_level(2);
        r.set_collapsed(true);
        assert_eq!(r.outline_level(), 2);
        assert!(r.is_collapsed());
        r.set_collapsed(false);
        assert_eq!(r.options, ROW_ALWAYS | 2);
    }
}
