//! Worksheet structure records: dimensions, view settings, column info,
//! merged cells, page setup, conditional formatting and validation headers.

use crate::biff::parser::{read_f64, read_u16, read_u32, read_u8};
use crate::biff::strings::{read_unicode_string, write_unicode_string, XlString};
use crate::biff::writer::{put_f64, put_u16, put_u32, put_u8};
use crate::error::{XlsError, XlsResult};

use super::cell::CellRangeAddress8;

/// Range of cells with 16-bit columns (Ref8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRangeAddress {
    pub first_row: u16,
    pub last_row: u16,
    pub first_col: u16,
    pub last_col: u16,
}

impl CellRangeAddress {
    pub const ENCODED_SIZE: usize = 8;

    pub fn new(first_row: u16, last_row: u16, first_col: u16, last_col: u16) -> Self {
        CellRangeAddress {
            first_row,
            last_row,
            first_col,
            last_col,
        }
    }

    pub fn read(data: &[u8], offset: &mut usize) -> XlsResult<Self> {
        Ok(CellRangeAddress {
            first_row: read_u16(data, offset)?,
            last_row: read_u16(data, offset)?,
            first_col: read_u16(data, offset)?,
            last_col: read_u16(data, offset)?,
        })
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        put_u16(out, self.first_row);
        put_u16(out, self.last_row);
        put_u16(out, self.first_col);
        put_u16(out, self.last_col);
    }

    pub fn contains(&self, row: u16, col: u16) -> bool {
        (self.first_row..=self.last_row).contains(&row)
            && (self.first_col..=self.last_col).contains(&col)
    }
}

fn read_ranges(data: &[u8], offset: &mut usize, count: usize) -> XlsResult<Vec<CellRangeAddress>> {
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        out.push(CellRangeAddress::read(data, offset)?);
    }
    Ok(out)
}

fn exhausted(data: &[u8], offset: usize, what: &str) -> XlsResult<()> {
    if offset != data.len() {
        return Err(XlsError::Parse(format!(
            "{what}: {} unexpected trailing bytes",
            data.len() - offset
        )));
    }
    Ok(())
}

// ── Used range ──────────────────────────────────────────────────────────

/// DIMENSIONS. `last_row` and `last_col` are one past the last used cell.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DimensionsRecord {
    pub first_row: u32,
    pub last_row: u32,
    pub first_col: u16,
    pub last_col: u16,
    pub reserved: u16,
}

impl DimensionsRecord {
    pub fn read(data: &[u8]) -> XlsResult<Self> {
        let mut o = 0;
        let r = DimensionsRecord {
            first_row: read_u32(data, &mut o)?,
            last_row: read_u32(data, &mut o)?,
            first_col: read_u16(data, &mut o)?,
            last_col: read_u16(data, &mut o)?,
            reserved: read_u16(data, &mut o)?,
        };
        exhausted(data, o, "DIMENSIONS")?;
        Ok(r)
    }

    pub fn write_body(&self, out: &mut Vec<u8>) {
        put_u32(out, self.first_row);
        put_u32(out, self.last_row);
        put_u16(out, self.first_col);
        put_u16(out, self.last_col);
        put_u16(out, self.reserved);
    }

    /// Widen the row extent to include `row`. Never shrinks.
    pub fn include_row(&mut self, row: u32) {
        if self.last_row <= self.first_row {
            self.first_row = row;
            self.last_row = row + 1;
            return;
        }
        if row < self.first_row {
            self.first_row = row;
        }
        if row + 1 > self.last_row {
            self.last_row = row + 1;
        }
    }

    /// Widen the column extent to include `col`. Never shrinks.
    pub fn include_col(&mut self, col: u16) {
        if self.last_col <= self.first_col {
            self.first_col = col;
            self.last_col = col.saturating_add(1);
            return;
        }
        if col < self.first_col {
            self.first_col = col;
        }
        if col.saturating_add(1) > self.last_col {
            self.last_col = col.saturating_add(1);
        }
    }
}

// ── View settings ───────────────────────────────────────────────────────

pub mod window2 {
    pub const DISPLAY_FORMULAS: u16 = 0x0001;
    pub const DISPLAY_GRIDLINES: u16 = 0x0002;
    pub const DISPLAY_ROW_COL_HEADINGS: u16 = 0x0004;
    pub const FREEZE_PANES: u16 = 0x0008;
    pub const DISPLAY_ZEROS: u16 = 0x0010;
    pub const DEFAULT_HEADER_COLOR: u16 = 0x0020;
    pub const ARABIC: u16 = 0x0040;
    pub const DISPLAY_GUTS: u16 = 0x0080;
    pub const FREEZE_NO_SPLIT: u16 = 0x0100;
    pub const SELECTED: u16 = 0x0200;
    pub const ACTIVE: u16 = 0x0400;
    pub const PAGE_BREAK_PREVIEW: u16 = 0x0800;
}

/// Zoom fields present in worksheet WINDOW2 records (absent for chart sheets).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Window2Zoom {
    pub page_break_zoom: u16,
    pub normal_zoom: u16,
    pub reserved: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window2Record {
    pub options: u16,
    pub top_row: u16,
    pub left_col: u16,
    pub header_color: u32,
    pub zoom: Option<Window2Zoom>,
}

impl Default for Window2Record {
    fn default() -> Self {
        Window2Record {
            options: 0x06B6,
            top_row: 0,
            left_col: 0,
            header_color: 0x40,
            zoom: Some(Window2Zoom::default()),
        }
    }
}

impl Window2Record {
    pub fn read(data: &[u8]) -> XlsResult<Self> {
        let mut o = 0;
        let options = read_u16(data, &mut o)?;
        let top_row = read_u16(data, &mut o)?;
        let left_col = read_u16(data, &mut o)?;
        let header_color = read_u32(data, &mut o)?;
        let zoom = if data.len() >= 18 {
            Some(Window2Zoom {
                page_break_zoom: read_u16(data, &mut o)?,
                normal_zoom: read_u16(data, &mut o)?,
                reserved: read_u32(data, &mut o)?,
            })
        } else {
            None
        };
        exhausted(data, o, "WINDOW2")?;
        Ok(Window2Record {
            options,
            top_row,
            left_col,
            header_color,
            zoom,
        })
    }

    pub fn write_body(&self, out: &mut Vec<u8>) {
        put_u16(out, self.options);
        put_u16(out, self.top_row);
        put_u16(out, self.left_col);
        put_u32(out, self.header_color);
        if let Some(z) = &self.zoom {
            put_u16(out, z.page_break_zoom);
            put_u16(out, z.normal_zoom);
            put_u32(out, z.reserved);
        }
    }

    pub fn has(&self, flag: u16) -> bool {
        self.options & flag != 0
    }

    pub fn set(&mut self, flag: u16, on: bool) {
        if on {
            self.options |= flag;
        } else {
            self.options &= !flag;
        }
    }
}

pub const PANE_LOWER_RIGHT: u16 = 0;
pub const PANE_UPPER_RIGHT: u16 = 1;
pub const PANE_LOWER_LEFT: u16 = 2;
pub const PANE_UPPER_LEFT: u16 = 3;

/// PANE. For frozen panes `x`/`y` count columns/rows, for split panes they
/// are in twips.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PaneRecord {
    pub x: u16,
    pub y: u16,
    pub top_row: u16,
    pub left_col: u16,
    pub active_pane: u16,
}

impl PaneRecord {
    pub fn read(data: &[u8]) -> XlsResult<Self> {
        let mut o = 0;
        let r = PaneRecord {
            x: read_u16(data, &mut o)?,
            y: read_u16(data, &mut o)?,
            top_row: read_u16(data, &mut o)?,
            left_col: read_u16(data, &mut o)?,
            active_pane: read_u16(data, &mut o)?,
        };
        exhausted(data, o, "PANE")?;
        Ok(r)
    }

    pub fn write_body(&self, out: &mut Vec<u8>) {
        put_u16(out, self.x);
        put_u16(out, self.y);
        put_u16(out, self.top_row);
        put_u16(out, self.left_col);
        put_u16(out, self.active_pane);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionRecord {
    pub pane: u8,
    pub active_row: u16,
    pub active_col: u16,
    pub active_ref: u16,
    pub refs: Vec<CellRangeAddress8>,
}

impl SelectionRecord {
    pub fn new(pane: u8, row: u16, col: u16) -> Self {
        SelectionRecord {
            pane,
            active_row: row,
            active_col: col,
            active_ref: 0,
            refs: vec![CellRangeAddress8 {
                first_row: row,
                last_row: row,
                first_col: col as u8,
                last_col: col as u8,
            }],
        }
    }

    pub fn read(data: &[u8]) -> XlsResult<Self> {
        let mut o = 0;
        let pane = read_u8(data, &mut o)?;
        let active_row = read_u16(data, &mut o)?;
        let active_col = read_u16(data, &mut o)?;
        let active_ref = read_u16(data, &mut o)?;
        let n = read_u16(data, &mut o)? as usize;
        let mut refs = Vec::with_capacity(n);
        for _ in 0..n {
            refs.push(CellRangeAddress8::read(data, &mut o)?);
        }
        exhausted(data, o, "SELECTION")?;
        Ok(SelectionRecord {
            pane,
            active_row,
            active_col,
            active_ref,
            refs,
        })
    }

    pub fn write_body(&self, out: &mut Vec<u8>) {
        put_u8(out, self.pane);
        put_u16(out, self.active_row);
        put_u16(out, self.active_col);
        put_u16(out, self.active_ref);
        put_u16(out, self.refs.len() as u16);
        for r in &self.refs {
            r.write(out);
        }
    }
}

// ── Row / column defaults ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultRowHeightRecord {
    pub options: u16,
    pub height: u16,
}

impl Default for DefaultRowHeightRecord {
    fn default() -> Self {
        DefaultRowHeightRecord {
            options: 0,
            height: 0x00FF,
        }
    }
}

impl DefaultRowHeightRecord {
    pub fn read(data: &[u8]) -> XlsResult<Self> {
        let mut o = 0;
        Ok(DefaultRowHeightRecord {
            options: read_u16(data, &mut o)?,
            height: read_u16(data, &mut o)?,
        })
    }

    pub fn write_body(&self, out: &mut Vec<u8>) {
        put_u16(out, self.options);
        put_u16(out, self.height);
    }
}

/// GUTS: outline gutter sizes and maximum outline levels (+1).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GutsRecord {
    pub left_row_gutter: u16,
    pub top_col_gutter: u16,
    pub row_level_max: u16,
    pub col_level_max: u16,
}

impl GutsRecord {
    pub fn read(data: &[u8]) -> XlsResult<Self> {
        let mut o = 0;
        Ok(GutsRecord {
            left_row_gutter: read_u16(data, &mut o)?,
            top_col_gutter: read_u16(data, &mut o)?,
            row_level_max: read_u16(data, &mut o)?,
            col_level_max: read_u16(data, &mut o)?,
        })
    }

    pub fn write_body(&self, out: &mut Vec<u8>) {
        put_u16(out, self.left_row_gutter);
        put_u16(out, self.top_col_gutter);
        put_u16(out, self.row_level_max);
        put_u16(out, self.col_level_max);
    }
}

pub const COLINFO_HIDDEN: u16 = 0x0001;
pub const COLINFO_OUTLINE_SHIFT: u16 = 8;
pub const COLINFO_OUTLINE_MASK: u16 = 0x0700;
pub const COLINFO_COLLAPSED: u16 = 0x1000;

/// COLINFO for an inclusive column range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfoRecord {
    pub first_col: u16,
    pub last_col: u16,
    /// Width in 1/256 of a character.
    pub width: u16,
    pub xf: u16,
    pub options: u16,
    pub reserved: u16,
}

impl ColumnInfoRecord {
    pub fn new(first_col: u16, last_col: u16) -> Self {
        ColumnInfoRecord {
            first_col,
            last_col,
            width: 2275,
            xf: 0x0F,
            options: 0,
            reserved: 2,
        }
    }

    pub fn read(data: &[u8]) -> XlsResult<Self> {
        let mut o = 0;
        let first_col = read_u16(data, &mut o)?;
        let last_col = read_u16(data, &mut o)?;
        let width = read_u16(data, &mut o)?;
        let xf = read_u16(data, &mut o)?;
        let options = read_u16(data, &mut o)?;
        // Some producers omit the trailing reserved field, or write one byte.
        let reserved = match data.len() - o {
            0 => 0,
            1 => read_u8(data, &mut o)? as u16,
            _ => read_u16(data, &mut o)?,
        };
        exhausted(data, o, "COLINFO")?;
        Ok(ColumnInfoRecord {
            first_col,
            last_col,
            width,
            xf,
            options,
            reserved,
        })
    }

    pub fn write_body(&self, out: &mut Vec<u8>) {
        put_u16(out, self.first_col);
        put_u16(out, self.last_col);
        put_u16(out, self.width);
        put_u16(out, self.xf);
        put_u16(out, self.options);
        put_u16(out, self.reserved);
    }

    pub fn is_hidden(&self) -> bool {
        self.options & COLINFO_HIDDEN != 0
    }

    pub fn set_hidden(&mut self, v: bool) {
        if v {
            self.options |= COLINFO_HIDDEN;
        } else {
            self.options &= !COLINFO_HIDDEN;
        }
    }

    pub fn outline_level(&self) -> u16 {
        (self.options & COLINFO_OUTLINE_MASK) >> COLINFO_OUTLINE_SHIFT
    }

    pub fn set_outline_level(&mut self, level: u16) {
        self.options = (self.options & !COLINFO_OUTLINE_MASK)
            | ((level << COLINFO_OUTLINE_SHIFT) & COLINFO_OUTLINE_MASK);
    }

    pub fn is_collapsed(&self) -> bool {
        self.options & COLINFO_COLLAPSED != 0
    }

    pub fn set_collapsed(&mut self, v: bool) {
        if v {
            self.options |= COLINFO_COLLAPSED;
        } else {
            self.options &= !COLINFO_COLLAPSED;
        }
    }

    pub fn contains(&self, col: u16) -> bool {
        (self.first_col..=self.last_col).contains(&col)
    }

    /// Same formatting, so adjacent ranges may be merged.
    pub fn format_matches(&self, other: &ColumnInfoRecord) -> bool {
        self.width == other.width && self.xf == other.xf && self.options == other.options
    }
}

// ── Merged cells ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MergeCellsRecord {
    pub ranges: Vec<CellRangeAddress>,
}

impl MergeCellsRecord {
    pub fn read(data: &[u8]) -> XlsResult<Self> {
        let mut o = 0;
        let n = read_u16(data, &mut o)? as usize;
        let ranges = read_ranges(data, &mut o, n)?;
        Ok(MergeCellsRecord { ranges })
    }

    pub fn write_body(&self, out: &mut Vec<u8>) {
        put_u16(out, self.ranges.len() as u16);
        for r in &self.ranges {
            r.write(out);
        }
    }
}

// ── Page settings ───────────────────────────────────────────────────────

/// HEADER or FOOTER. An empty body means no text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HeaderFooterRecord {
    pub text: Option<XlString>,
}

impl HeaderFooterRecord {
    pub fn read(data: &[u8]) -> XlsResult<Self> {
        if data.is_empty() {
            return Ok(HeaderFooterRecord { text: None });
        }
        let mut o = 0;
        let text = read_unicode_string(data, &mut o)?;
        exhausted(data, o, "HEADER/FOOTER")?;
        Ok(HeaderFooterRecord { text: Some(text) })
    }

    pub fn write_body(&self, out: &mut Vec<u8>) {
        if let Some(t) = &self.text {
            write_unicode_string(out, t);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageBreak {
    pub main: u16,
    pub sub_from: u16,
    pub sub_to: u16,
}

/// HORIZONTALPAGEBREAKS / VERTICALPAGEBREAKS.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageBreakRecord {
    pub breaks: Vec<PageBreak>,
}

impl PageBreakRecord {
    pub fn read(data: &[u8]) -> XlsResult<Self> {
        let mut o = 0;
        let n = read_u16(data, &mut o)? as usize;
        let mut breaks = Vec::with_capacity(n);
        for _ in 0..n {
            breaks.push(PageBreak {
                main: read_u16(data, &mut o)?,
                sub_from: read_u16(data, &mut o)?,
                sub_to: read_u16(data, &mut o)?,
            });
        }
        Ok(PageBreakRecord { breaks })
    }

    pub fn write_body(&self, out: &mut Vec<u8>) {
        put_u16(out, self.breaks.len() as u16);
        for b in &self.breaks {
            put_u16(out, b.main);
            put_u16(out, b.sub_from);
            put_u16(out, b.sub_to);
        }
    }

    /// Insert or replace the break at `main`, keeping breaks sorted.
    pub fn add_break(&mut self, main: u16, sub_from: u16, sub_to: u16) {
        let b = PageBreak {
            main,
            sub_from,
            sub_to,
        };
        match self.breaks.binary_search_by_key(&main, |b| b.main) {
            Ok(i) => self.breaks[i] = b,
            Err(i) => self.breaks.insert(i, b),
        }
    }

    pub fn remove_break(&mut self, main: u16) {
        self.breaks.retain(|b| b.main != main);
    }

    pub fn get_break(&self, main: u16) -> Option<&PageBreak> {
        self.breaks.iter().find(|b| b.main == main)
    }
}

pub fn read_margin(data: &[u8]) -> XlsResult<f64> {
    let mut o = 0;
    read_f64(data, &mut o)
}

pub fn write_margin(out: &mut Vec<u8>, value: f64) {
    put_f64(out, value);
}

// ── Conditional formatting / data validation ────────────────────────────

/// CFHEADER: the cell ranges a group of CFRULE records applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CfHeaderRecord {
    pub num_rules: u16,
    /// `fToughRecalc` in bit 0, record id in the remaining bits.
    pub flags: u16,
    pub enclosing: CellRangeAddress,
    pub ranges: Vec<CellRangeAddress>,
}

impl CfHeaderRecord {
    pub fn new(ranges: Vec<CellRangeAddress>, num_rules: u16) -> Self {
        let enclosing = enclosing_range(&ranges);
        CfHeaderRecord {
            num_rules,
            flags: 0,
            enclosing,
            ranges,
        }
    }

    pub fn read(data: &[u8]) -> XlsResult<Self> {
        let mut o = 0;
        let num_rules = read_u16(data, &mut o)?;
        let flags = read_u16(data, &mut o)?;
        let enclosing = CellRangeAddress::read(data, &mut o)?;
        let n = read_u16(data, &mut o)? as usize;
        let ranges = read_ranges(data, &mut o, n)?;
        exhausted(data, o, "CFHEADER")?;
        Ok(CfHeaderRecord {
            num_rules,
            flags,
            enclosing,
            ranges,
        })
    }

    pub fn write_body(&self, out: &mut Vec<u8>) {
        put_u16(out, self.num_rules);
        put_u16(out, self.flags);
        self.enclosing.write(out);
        put_u16(out, self.ranges.len() as u16);
        for r in &self.ranges {
            r.write(out);
        }
    }
}

fn enclosing_range(ranges: &[CellRangeAddress]) -> CellRangeAddress {
    let mut it = ranges.iter();
    let Some(first) = it.next() else {
        return CellRangeAddress::new(0, 0, 0, 0);
    };
    it.fold(*first, |acc, r| CellRangeAddress {
        first_row: acc.first_row.min(r.first_row),
        last_row: acc.last_row.max(r.last_row),
        first_col: acc.first_col.min(r.first_col),
        last_col: acc.last_col.max(r.last_col),
    })
}

/// DVAL: header of the data validation table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DvalRecord {
    pub options: u16,
    pub horiz_pos: u32,
    pub vert_pos: u32,
    /// Object id of the drop-down, or 0xFFFFFFFF.
    pub object_id: u32,
    pub dv_count: u32,
}

impl Default for DvalRecord {
    fn default() -> Self {
        DvalRecord {
            options: 0,
            horiz_pos: 0,
            vert_pos: 0,
            object_id: 0xFFFF_FFFF,
            dv_count: 0,
        }
    }
}

impl DvalRecord {
    pub fn read(data: &[u8]) -> XlsResult<Self> {
        let mut o = 0;
        let r = DvalRecord {
            options: read_u16(data, &mut o)?,
            horiz_pos: read_u32(data, &mut o)?,
            vert_pos: read_u32(data, &mut o)?,
            object_id: read_u32(data, &mut o)?,
            dv_count: read_u32(data, &mut o)?,
        };
        exhausted(data, o, "DVAL")?;
        Ok(r)
    }

    pub fn write_body(&self, out: &mut Vec<u8>) {
        put_u16(out, self.options);
        put_u32(out, self.horiz_pos);
        put_u32(out, self.vert_pos);
        put_u32(out, self.object_id);
        put_u32(out, self.dv_count);
    }
}

// ── Derived row-block index ─────────────────────────────────────────────

/// INDEX. Regenerated on every write.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndexRecord {
    pub reserved: u32,
    pub first_row: u32,
    /// One past the last row.
    pub last_row: u32,
    /// Stream offset of DEFCOLWIDTH.
    pub def_col_width_pos: u32,
    /// Stream offsets of each DBCELL.
    pub dbcells: Vec<u32>,
}

impl IndexRecord {
    pub fn read(data: &[u8]) -> XlsResult<Self> {
        let mut o = 0;
        let reserved = read_u32(data, &mut o)?;
        let first_row = read_u32(data, &mut o)?;
        let last_row = read_u32(data, &mut o)?;
        let def_col_width_pos = read_u32(data, &mut o)?;
        let mut dbcells = Vec::with_capacity((data.len() - o) / 4);
        while o + 4 <= data.len() {
            dbcells.push(read_u32(data, &mut o)?);
        }
        Ok(IndexRecord {
            reserved,
            first_row,
            last_row,
            def_col_width_pos,
            dbcells,
        })
    }

    pub fn write_body(&self, out: &mut Vec<u8>) {
        put_u32(out, self.reserved);
        put_u32(out, self.first_row);
        put_u32(out, self.last_row);
        put_u32(out, self.def_col_width_pos);
        for &p in &self.dbcells {
            put_u32(out, p);
        }
    }

    /// Serialized size of an INDEX with `blocks` DBCELL entries.
    pub fn size_for_blocks(blocks: usize) -> usize {
        4 + 16 + 4 * blocks
    }
}

/// DBCELL. Regenerated on every write.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DbCellRecord {
    /// Distance back to the first ROW of the block.
    pub row_offset: u32,
    /// Offsets from the start of each row's first cell.
    pub cell_offsets: Vec<u16>,
}

impl DbCellRecord {
    pub fn read(data: &[u8]) -> XlsResult<Self> {
        let mut o = 0;
        let row_offset = read_u32(data, &mut o)?;
        let mut cell_offsets = Vec::with_capacity((data.len() - o) / 2);
        while o + 2 <= data.len() {
            cell_offsets.push(read_u16(data, &mut o)?);
        }
        Ok(DbCellRecord {
            row_offset,
            cell_offsets,
        })
    }

    pub fn write_body(&self, out: &mut Vec<u8>) {
        put_u32(out, self.row_offset);
        for &c in &self.cell_offsets {
            put_u16(out, c);
        }
    }
}

// ── Comments ────────────────────────────────────────────────────────────

pub const NOTE_VISIBLE: u16 = 0x0002;

/// NOTE: cell comment anchor, linked to a drawing object by shape id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteRecord {
    pub row: u16,
    pub col: u16,
    pub flags: u16,
    pub shape_id: u16,
    pub author: XlString,
    /// Excel pads the record with one zero byte.
    pub padding: Option<u8>,
}

impl NoteRecord {
    pub fn read(data: &[u8]) -> XlsResult<Self> {
        let mut o = 0;
        let row = read_u16(data, &mut o)?;
        let col = read_u16(data, &mut o)?;
        let flags = read_u16(data, &mut o)?;
        let shape_id = read_u16(data, &mut o)?;
        let author = read_unicode_string(data, &mut o)?;
        let padding = if o < data.len() {
            Some(read_u8(data, &mut o)?)
        } else {
            None
        };
        exhausted(data, o, "NOTE")?;
        Ok(NoteRecord {
            row,
            col,
            flags,
            shape_id,
            author,
            padding,
        })
    }

    pub fn write_body(&self, out: &mut Vec<u8>) {
        put_u16(out, self.row);
        put_u16(out, self.col);
        put_u16(out, self.flags);
        put_u16(out, self.shape_id);
        write_unicode_string(out, &self.author);
        if let Some(p) = self.padding {
            put_u8(out, p);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions_widen_only() {
        let mut d = DimensionsRecord::default();
        d.include_row(5);
        d.include_col(3);
        assert_eq!((d.first_row, d.last_row, d.first_col, d.last_col), (5, 6, 3, 4));
        d.include_row(2);
        d.include_col(10);
        assert_eq!((d.first_row, d.last_row, d.first_col, d.last_col), (2, 6, 3, 11));
        d.include_row(4);
        assert_eq!((d.first_row, d.last_row), (2, 6));
    }

    #[test]
    fn test_window2_chart_sheet_layout() {
        let body = [0xB6, 0x06, 0, 0, 0, 0, 0x40, 0, 0, 0];
        let w = Window2Record::read(&body).unwrap();
        assert!(w.zoom.is_none());
        assert!(w.has(window2::ACTIVE));
        let mut out = Vec::new();
        w.write_body(&mut out);
        assert_eq!(out, body.to_vec());
    }

    #[test]
    fn test_colinfo_outline_bits() {
        let mut c = ColumnInfoRecord::new(1, 4);
        c.set_outline_level(3);
        c.set_hidden(true);
        assert_eq!(c.outline_level(), 3);
        assert_eq!(c.options, 0x0301);
        assert!(c.contains(4));
        assert!(!c.contains(5));
    }

    #[test]
    fn test_page_breaks_sorted() {
        let mut p = PageBreakRecord::default();
        p.add_break(10, 0, 255);
        p.add_break(3, 0, 255);
        p.add_break(10, 0, 100);
        assert_eq!(p.breaks.iter().map(|b| b.main).collect::<Vec<_>>(), vec![3, 10]);
        assert_eq!(p.get_break(10).map(|b| b.sub_to), Some(100));
        p.remove_break(3);
        assert_eq!(p.breaks.len(), 1);
    }

    #[test]
    fn test_note_round_trip() {
        let n = NoteRecord {
            row: 1,
            col: 2,
            flags: NOTE_VISIBLE,
            shape_id: 1025,
            author: XlString::new("me"),
            padding: Some(0),
        };
        let mut body = Vec::new();
        n.write_body(&mut body);
        assert_eq!(NoteRecord::read(&body).unwrap(), n);
    }

    #[test]
    fn test_cfheader_enclosing_range() {
        let h = CfHeaderRecord::new(
            vec![CellRangeAddress::new(1, 2, 1, 1), CellRangeAddress::new(5, 6, 0, 3)],
            1,
        );
        assert_eq!(h.enclosing, CellRangeAddress::new(1, 6, 0, 3));
    }
}
