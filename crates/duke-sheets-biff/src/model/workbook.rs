//! Workbook-globals substream model.
//!
//! Fonts, formats, XFs, styles and the sheet directory are plain records in
//! the [`WorkbookRecordList`]; the link table and the drawing group are
//! owned here and written at their placements.

use log::{debug, warn};

use crate::aggregates::protection::xor_password_verifier;
use crate::aggregates::{RecordAggregate, RecordSerializer, RecordVisitor};
use crate::biff::records::*;
use crate::biff::strings::{write_unicode_string, UnicodeString, XlString};
use crate::drawing::DrawingManager;
use crate::error::{XlsError, XlsResult};
use crate::escher::EscherRecord;
use crate::model::link_table::{
    is_link_table_record, ExternalSheet, LinkTable, NameXRef, UdfFinder,
};
use crate::model::record_list::{Anchor, WorkbookItem, WorkbookRecordList};
use crate::model::sheet::Sheet;
use crate::record::workbook::{
    default_formats, PALETTE_FIRST_COLOR, PALETTE_LAST_COLOR, SHEET_HIDDEN, SHEET_VERY_HIDDEN,
    SHEET_VISIBLE,
};
use crate::record::{
    BofRecord, BoundSheetRecord, ExtSstRecord, ExtendedFormatRecord, FileSharingRecord,
    FontRecord, FormatRecord, NameRecord, PaletteRecord, Record, SstRecord, StyleRecord,
    TabIdRecord, Window1Record,
};
use crate::stream::RecordStream;

/// First FORMAT index available to custom number formats.
pub const FIRST_USER_DEFINED_FORMAT_INDEX: u16 = 164;

/// Longest sheet name Excel accepts.
pub const MAX_SHEET_NAME_LENGTH: usize = 31;

/// WRITEACCESS bodies are padded with spaces to this length.
const WRITE_ACCESS_LENGTH: usize = 112;

/// Logical font indexes skip 4.
fn font_physical_index(logical: u16) -> XlsResult<usize> {
    match logical {
        4 => Err(XlsError::invalid_argument("there is no font with index 4")),
        i if i < 4 => Ok(i as usize),
        i => Ok(i as usize - 1),
    }
}

fn font_logical_index(physical: usize) -> u16 {
    if physical <= 3 {
        physical as u16
    } else {
        physical as u16 + 1
    }
}

fn raw(sid: u16, data: &[u8]) -> Record {
    Record::raw(sid, data.to_vec())
}

fn write_access_body(username: &str) -> Vec<u8> {
    let mut body = Vec::with_capacity(WRITE_ACCESS_LENGTH);
    write_unicode_string(&mut body, &XlString::new(username));
    if body.len() < WRITE_ACCESS_LENGTH {
        body.resize(WRITE_ACCESS_LENGTH, b' ');
    }
    body
}

/// Check a sheet name the way Excel does.
pub fn validate_sheet_name(name: &str) -> XlsResult<()> {
    let len = name.chars().count();
    if len == 0 || len > MAX_SHEET_NAME_LENGTH {
        return Err(XlsError::invalid_argument(format!(
            "sheet name '{name}' must be 1 to {MAX_SHEET_NAME_LENGTH} characters"
        )));
    }
    if let Some(c) = name.chars().find(|c| matches!(c, '/' | '\\' | '?' | '*' | ']' | '[' | ':')) {
        return Err(XlsError::invalid_argument(format!(
            "sheet name '{name}' contains '{c}'"
        )));
    }
    if name.starts_with('\'') || name.ends_with('\'') {
        return Err(XlsError::invalid_argument(format!(
            "sheet name '{name}' starts or ends with an apostrophe"
        )));
    }
    Ok(())
}

/// Settings for a new workbook's globals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkbookOptions {
    /// Name of the single initial sheet.
    pub first_sheet_name: String,
    /// Written into WRITEACCESS.
    pub username: String,
    /// CODEPAGE value; 1200 is UTF-16.
    pub codepage: u16,
    pub date_1904: bool,
}

impl Default for WorkbookOptions {
    fn default() -> Self {
        WorkbookOptions {
            first_sheet_name: "Sheet1".to_string(),
            username: String::new(),
            codepage: 1200,
            date_1904: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Workbook {
    list: WorkbookRecordList,
    link_table: Option<LinkTable>,
    drawing_manager: Option<DrawingManager>,
    /// Highest FORMAT index seen.
    max_format_index: u16,
}

impl Workbook {
    /// Globals of a new workbook with one sheet, "Sheet1".
    pub fn new() -> Self {
        Self::with_options(&WorkbookOptions::default())
    }

    pub fn with_options(options: &WorkbookOptions) -> Self {
        let mut wb = Workbook::default();
        let mut push = |r: Record| wb.list.push(r.into());
        push(Record::Bof(BofRecord::new(BOF_WORKBOOK_GLOBALS)));
        push(raw(INTERFACEHDR, &[0xB0, 0x04]));
        push(raw(MMS, &[0, 0]));
        push(raw(INTERFACEEND, &[]));
        push(Record::raw(WRITEACCESS, write_access_body(&options.username)));
        push(raw(CODEPAGE, &options.codepage.to_le_bytes()));
        push(raw(DSF, &[0, 0]));
        push(Record::TabId(TabIdRecord { ids: vec![0] }));
        push(raw(FNGROUPCOUNT, &[0x0E, 0]));
        push(raw(WINDOWPROTECT, &[0, 0]));
        push(Record::Protect(0));
        push(Record::Password(0));
        push(raw(PROT4REV, &[0, 0]));
        push(raw(PASSWORD4REV, &[0, 0]));
        push(Record::Window1(Window1Record::default()));
        push(Record::Backup(0));
        push(raw(HIDEOBJ, &[0, 0]));
        push(Record::DateMode(options.date_1904 as u16));
        push(raw(PRECISION, &[1, 0]));
        push(raw(REFRESHALL, &[0, 0]));
        push(raw(BOOKBOOL, &[0, 0]));
        for _ in 0..4 {
            push(Record::Font(FontRecord::default()));
        }
        for f in default_formats() {
            push(Record::Format(f));
        }
        for xf in ExtendedFormatRecord::defaults() {
            push(Record::Xf(xf));
        }
        for s in StyleRecord::defaults() {
            push(Record::Style(s));
        }
        push(raw(USESELFS, &[1, 0]));
        push(Record::BoundSheet(BoundSheetRecord::new(
            options.first_sheet_name.as_str(),
        )));
        push(raw(COUNTRY, &[1, 0, 1, 0]));
        push(Record::Sst(SstRecord::default()));
        push(Record::ExtSst(ExtSstRecord::default()));
        push(Record::Eof);
        wb.max_format_index = wb.formats().map(|f| f.index).max().unwrap_or(0);
        wb
    }

    /// Read the globals substream, BOF through EOF.
    pub fn from_stream(rs: &mut RecordStream) -> XlsResult<Self> {
        let mut wb = Workbook::default();
        match rs.next()? {
            Record::Bof(bof) if bof.kind == BOF_WORKBOOK_GLOBALS => {
                if bof.version != BIFF8_VERSION {
                    return Err(XlsError::UnsupportedVersion(format!(
                        "BIFF version 0x{:04X}",
                        bof.version
                    )));
                }
                wb.list.push(Record::Bof(bof).into());
            }
            Record::Bof(bof) => {
                return Err(XlsError::structural(
                    BOF,
                    format!("expected workbook globals BOF, found type 0x{:04X}", bof.kind),
                ))
            }
            other => return Err(XlsError::structural(other.sid(), "BOF record expected")),
        }

        loop {
            let Some(sid) = rs.peek_next_sid() else {
                return Err(XlsError::structural(EOF, "workbook globals end without EOF"));
            };

            if is_link_table_record(sid) {
                let before = rs.count_read();
                match wb.link_table.as_mut() {
                    Some(lt) => {
                        warn!("link table record 0x{sid:04X} after the link table");
                        lt.add_late_records(rs)?;
                    }
                    None => {
                        let lt = LinkTable::read(rs)?;
                        if lt.records_absorbed() > 0 {
                            debug!("link table absorbed {} records", lt.records_absorbed());
                            wb.link_table = Some(lt);
                            wb.list.push(WorkbookItem::LinkTable);
                        }
                    }
                }
                if rs.count_read() == before {
                    // Orphan EXTERNNAME, XCT or CRN with no SUPBOOK before it.
                    warn!("keeping stray link table record 0x{sid:04X}");
                    wb.list.push(rs.next()?.into());
                }
                continue;
            }

            let rec = rs.next()?;
            if let Record::Format(f) = &rec {
                wb.max_format_index = wb.max_format_index.max(f.index);
            }
            let done = matches!(rec, Record::Eof);
            wb.list.push(rec.into());
            if done {
                break;
            }
        }
        debug!(
            "workbook globals: {} items, {} sheets, {} fonts, {} XFs",
            wb.list.len(),
            wb.num_sheets(),
            wb.num_fonts(),
            wb.num_ex_formats()
        );
        Ok(wb)
    }

    pub fn record_list(&self) -> &WorkbookRecordList {
        &self.list
    }

    fn records_of<'a, T: 'a>(
        &'a self,
        pick: impl Fn(&'a Record) -> Option<&'a T> + 'a,
    ) -> impl Iterator<Item = &'a T> + 'a {
        self.list.records().filter_map(pick)
    }

    /// Position in the list of the `n`th record with `sid`.
    fn nth_pos(&self, sid: u16, n: usize) -> Option<usize> {
        self.list
            .items()
            .iter()
            .enumerate()
            .filter(|(_, i)| i.sid() == Some(sid))
            .nth(n)
            .map(|(p, _)| p)
    }

    fn eof_pos(&self) -> usize {
        self.list
            .find_first_sid(EOF)
            .unwrap_or(self.list.len())
    }

    // ── Fonts ───────────────────────────────────────────────────────────

    pub fn num_fonts(&self) -> usize {
        self.fonts().count()
    }

    fn fonts(&self) -> impl Iterator<Item = &FontRecord> {
        self.records_of(|r| match r {
            Record::Font(f) => Some(f),
            _ => None,
        })
    }

    /// Font by logical index. Index 4 never exists.
    pub fn font_at(&self, index: u16) -> Option<&FontRecord> {
        let p = font_physical_index(index).ok()?;
        self.fonts().nth(p)
    }

    pub fn font_at_mut(&mut self, index: u16) -> Option<&mut FontRecord> {
        let p = font_physical_index(index).ok()?;
        let pos = self.nth_pos(FONT, p)?;
        match self.list.get_mut(pos)? {
            WorkbookItem::Record(Record::Font(f)) => Some(f),
            _ => None,
        }
    }

    /// Logical index of the first font with the same properties.
    pub fn font_index(&self, font: &FontRecord) -> Option<u16> {
        self.fonts()
            .position(|f| f.same_properties(font))
            .map(font_logical_index)
    }

    /// Append a font after the last one and return its logical index.
    pub fn create_new_font(&mut self, font: FontRecord) -> u16 {
        let physical = self.num_fonts();
        let fallback = self
            .list
            .find_first_sid(FORMAT)
            .or_else(|| self.list.find_first_sid(XF))
            .unwrap_or_else(|| self.eof_pos());
        self.list
            .insert_after(Anchor::Font, fallback, Record::Font(font).into());
        font_logical_index(physical)
    }

    pub fn remove_font(&mut self, index: u16) -> XlsResult<FontRecord> {
        let p = font_physical_index(index)?;
        let pos = self
            .nth_pos(FONT, p)
            .ok_or_else(|| XlsError::invalid_argument(format!("no font with index {index}")))?;
        match self.list.remove(pos) {
            Some(WorkbookItem::Record(Record::Font(f))) => Ok(f),
            _ => Err(XlsError::invalid_state("font position held another record")),
        }
    }

    // ── Extended formats and styles ─────────────────────────────────────

    fn ex_formats(&self) -> impl Iterator<Item = &ExtendedFormatRecord> {
        self.records_of(|r| match r {
            Record::Xf(x) => Some(x),
            _ => None,
        })
    }

    pub fn num_ex_formats(&self) -> usize {
        self.ex_formats().count()
    }

    pub fn ex_format_at(&self, index: usize) -> Option<&ExtendedFormatRecord> {
        self.ex_formats().nth(index)
    }

    pub fn ex_format_at_mut(&mut self, index: usize) -> Option<&mut ExtendedFormatRecord> {
        let pos = self.nth_pos(XF, index)?;
        match self.list.get_mut(pos)? {
            WorkbookItem::Record(Record::Xf(x)) => Some(x),
            _ => None,
        }
    }

    /// Append a plain cell XF and return its index.
    pub fn create_cell_xf(&mut self) -> u16 {
        let index = self.num_ex_formats();
        let fallback = self.eof_pos();
        self.list.insert_after(
            Anchor::Xf,
            fallback,
            Record::Xf(ExtendedFormatRecord::cell()).into(),
        );
        index as u16
    }

    pub fn remove_ex_format(&mut self, index: usize) -> XlsResult<ExtendedFormatRecord> {
        let pos = self
            .nth_pos(XF, index)
            .ok_or_else(|| XlsError::invalid_argument(format!("no XF with index {index}")))?;
        match self.list.remove(pos) {
            Some(WorkbookItem::Record(Record::Xf(x))) => Ok(x),
            _ => Err(XlsError::invalid_state("XF position held another record")),
        }
    }

    /// STYLE record of a style XF, `None` when no style uses it.
    pub fn style_record(&self, xf_index: u16) -> Option<&StyleRecord> {
        self.records_of(|r| match r {
            Record::Style(s) => Some(s),
            _ => None,
        })
        .find(|s| s.xf_index() == xf_index)
    }

    /// Add a user-defined style for a style XF.
    pub fn create_style_record(&mut self, xf_index: u16, name: &str) -> XlsResult<()> {
        if self.style_record(xf_index).is_some() {
            return Err(XlsError::invalid_argument(format!(
                "XF {xf_index} already has a style"
            )));
        }
        let fallback = self.list.cursor(Anchor::Xf).map_or(self.eof_pos(), |c| c + 1);
        self.list.insert_after(
            Anchor::Style,
            fallback,
            Record::Style(StyleRecord::user(xf_index, name)).into(),
        );
        Ok(())
    }

    // ── Number formats ──────────────────────────────────────────────────

    fn formats(&self) -> impl Iterator<Item = &FormatRecord> {
        self.records_of(|r| match r {
            Record::Format(f) => Some(f),
            _ => None,
        })
    }

    pub fn format_string(&self, index: u16) -> Option<&str> {
        self.formats()
            .find(|f| f.index == index)
            .map(|f| f.format.as_str())
    }

    /// Index of a FORMAT record with this text. With `create`, a missing
    /// format is added at the next custom index.
    pub fn format_index(&mut self, format: &str, create: bool) -> Option<u16> {
        if let Some(f) = self.formats().find(|f| f.format.as_str() == format) {
            return Some(f.index);
        }
        if !create {
            return None;
        }
        let index = if self.max_format_index >= FIRST_USER_DEFINED_FORMAT_INDEX {
            self.max_format_index + 1
        } else {
            FIRST_USER_DEFINED_FORMAT_INDEX
        };
        self.max_format_index = index;
        let fallback = self.list.cursor(Anchor::Font).map_or(self.eof_pos(), |c| c + 1);
        self.list.insert_after(
            Anchor::Format,
            fallback,
            Record::Format(FormatRecord::new(index, format)).into(),
        );
        Some(index)
    }

    // ── Sheet directory ─────────────────────────────────────────────────

    fn bound_sheets(&self) -> impl Iterator<Item = &BoundSheetRecord> {
        self.records_of(|r| match r {
            Record::BoundSheet(b) => Some(b),
            _ => None,
        })
    }

    fn bound_sheet_mut(&mut self, index: usize) -> XlsResult<&mut BoundSheetRecord> {
        let pos = self
            .nth_pos(BOUNDSHEET, index)
            .ok_or_else(|| XlsError::invalid_argument(format!("no sheet with index {index}")))?;
        match self.list.get_mut(pos) {
            Some(WorkbookItem::Record(Record::BoundSheet(b))) => Ok(b),
            _ => Err(XlsError::invalid_state("BOUNDSHEET position held another record")),
        }
    }

    pub fn num_sheets(&self) -> usize {
        self.bound_sheets().count()
    }

    pub fn sheet_name(&self, index: usize) -> Option<&str> {
        self.bound_sheets().nth(index).map(|b| b.name.as_str())
    }

    /// Case-insensitive lookup.
    pub fn sheet_index(&self, name: &str) -> Option<usize> {
        let name = name.to_lowercase();
        self.bound_sheets()
            .position(|b| b.name.as_str().to_lowercase() == name)
    }

    fn check_new_sheet_name(&self, name: &str, except: Option<usize>) -> XlsResult<()> {
        validate_sheet_name(name)?;
        match self.sheet_index(name) {
            Some(i) if Some(i) != except => Err(XlsError::invalid_argument(format!(
                "the workbook already contains a sheet named '{name}'"
            ))),
            _ => Ok(()),
        }
    }

    /// Add a BOUNDSHEET after the last one. Returns the sheet index.
    pub fn create_bound_sheet(&mut self, name: &str) -> XlsResult<usize> {
        self.check_new_sheet_name(name, None)?;
        let index = self.num_sheets();
        let fallback = self.list.cursor(Anchor::Country).unwrap_or_else(|| self.eof_pos());
        self.list.insert_after(
            Anchor::BoundSheet,
            fallback,
            Record::BoundSheet(BoundSheetRecord::new(name)).into(),
        );
        self.sheets_changed();
        Ok(index)
    }

    pub fn set_sheet_name(&mut self, index: usize, name: &str) -> XlsResult<()> {
        self.check_new_sheet_name(name, Some(index))?;
        self.bound_sheet_mut(index)?.name = XlString::new(name);
        Ok(())
    }

    /// 0 visible, 1 hidden, 2 very hidden.
    pub fn set_sheet_hidden(&mut self, index: usize, hidden: u8) -> XlsResult<()> {
        if !matches!(hidden, SHEET_VISIBLE | SHEET_HIDDEN | SHEET_VERY_HIDDEN) {
            return Err(XlsError::invalid_argument(format!(
                "sheet visibility {hidden} is not 0, 1 or 2"
            )));
        }
        self.bound_sheet_mut(index)?.visibility = hidden;
        Ok(())
    }

    pub fn sheet_visibility(&self, index: usize) -> Option<u8> {
        self.bound_sheets().nth(index).map(|b| b.visibility)
    }

    /// Move the sheet named `name` to position `to`.
    pub fn set_sheet_order(&mut self, name: &str, to: usize) -> XlsResult<()> {
        let from = self
            .sheet_index(name)
            .ok_or_else(|| XlsError::not_found(format!("sheet '{name}'")))?;
        if to >= self.num_sheets() {
            return Err(XlsError::invalid_argument(format!(
                "sheet position {to} is out of range"
            )));
        }
        if from == to {
            return Ok(());
        }
        let pos = self
            .nth_pos(BOUNDSHEET, from)
            .ok_or_else(|| XlsError::invalid_state("BOUNDSHEET vanished"))?;
        let item = self
            .list
            .remove(pos)
            .ok_or_else(|| XlsError::invalid_state("BOUNDSHEET vanished"))?;
        let at = match self.nth_pos(BOUNDSHEET, to) {
            Some(p) => p,
            None => self.list.cursor(Anchor::BoundSheet).map_or(pos, |c| c + 1),
        };
        self.list.insert(at, item);
        Ok(())
    }

    /// Drop a sheet from the directory, the tab ids and the link table.
    pub fn remove_sheet(&mut self, index: usize) -> XlsResult<()> {
        let pos = self
            .nth_pos(BOUNDSHEET, index)
            .ok_or_else(|| XlsError::invalid_argument(format!("no sheet with index {index}")))?;
        self.list.remove(pos);
        if let Some(lt) = self.link_table.as_mut() {
            lt.remove_sheet(index as u16);
        }
        self.sheets_changed();
        Ok(())
    }

    /// Stream offset of a sheet's BOF, patched before writing.
    pub fn set_sheet_bof(&mut self, index: usize, position: u32) -> XlsResult<()> {
        self.bound_sheet_mut(index)?.position = position;
        Ok(())
    }

    pub fn sheet_bof(&self, index: usize) -> Option<u32> {
        self.bound_sheets().nth(index).map(|b| b.position)
    }

    /// Resync TABID and the internal SUPBOOK with the sheet count.
    fn sheets_changed(&mut self) {
        let n = self.num_sheets();
        for r in self.list.records_mut() {
            if let Record::TabId(t) = r {
                t.ids = (0..n as u16).collect();
            }
        }
        if let Some(lt) = self.link_table.as_mut() {
            lt.set_num_internal_sheets(n as u16);
        }
    }

    // ── Palette ─────────────────────────────────────────────────────────

    pub fn custom_palette(&self) -> Option<&PaletteRecord> {
        self.records_of(|r| match r {
            Record::Palette(p) => Some(p),
            _ => None,
        })
        .next()
    }

    /// Override a palette colour (8..=63), creating the PALETTE if needed.
    pub fn set_color_at_index(&mut self, index: u16, r: u8, g: u8, b: u8) -> XlsResult<()> {
        if !(PALETTE_FIRST_COLOR..=PALETTE_LAST_COLOR).contains(&index) {
            return Err(XlsError::invalid_argument(format!(
                "palette index {index} is outside {PALETTE_FIRST_COLOR}..={PALETTE_LAST_COLOR}"
            )));
        }
        if self.custom_palette().is_none() {
            let fallback = self.list.cursor(Anchor::Xf).map_or(self.eof_pos(), |c| c + 1);
            let after = if self.list.cursor(Anchor::Style).is_some() {
                Anchor::Style
            } else {
                Anchor::Xf
            };
            self.list
                .insert_after(after, fallback, Record::Palette(PaletteRecord::default()).into());
        }
        for rec in self.list.records_mut() {
            if let Record::Palette(p) = rec {
                p.set_color(index, r, g, b);
                break;
            }
        }
        Ok(())
    }

    // ── Shared strings ──────────────────────────────────────────────────

    fn sst(&self) -> Option<&SstRecord> {
        self.records_of(|r| match r {
            Record::Sst(s) => Some(s),
            _ => None,
        })
        .next()
    }

    /// Add a string (deduplicated) and return its SST index. A missing SST
    /// and EXTSST are created before EOF.
    pub fn add_sst_string(&mut self, string: UnicodeString) -> u32 {
        if self.sst().is_none() {
            let at = self
                .list
                .find_first_sid(EXTSST)
                .unwrap_or_else(|| self.eof_pos());
            self.list.insert(at, Record::Sst(SstRecord::default()).into());
            if self.list.find_first_sid(EXTSST).is_none() {
                let at = self.eof_pos();
                self.list
                    .insert(at, Record::ExtSst(ExtSstRecord::default()).into());
            }
        }
        self.list
            .records_mut()
            .find_map(|r| match r {
                Record::Sst(sst) => Some(sst),
                _ => None,
            })
            .map_or(0, |sst| sst.add_string(string))
    }

    pub fn sst_string(&self, index: u32) -> Option<&UnicodeString> {
        self.sst()?.get(index as usize)
    }

    pub fn num_unique_strings(&self) -> usize {
        self.sst().map_or(0, SstRecord::len)
    }

    // ── Link table ──────────────────────────────────────────────────────

    pub fn link_table(&self) -> Option<&LinkTable> {
        self.link_table.as_ref()
    }

    /// The link table, created after COUNTRY on first use.
    pub fn link_table_mut(&mut self) -> &mut LinkTable {
        if self.link_table.is_none() {
            let fallback = self
                .list
                .find_first_sid(SST)
                .unwrap_or_else(|| self.eof_pos());
            self.list
                .insert_after(Anchor::Country, fallback, WorkbookItem::LinkTable);
            self.link_table = Some(LinkTable::new(self.num_sheets() as u16));
        }
        self.link_table.get_or_insert_with(LinkTable::default)
    }

    pub fn check_extern_sheet(&mut self, sheet_index: u16) -> XlsResult<u16> {
        self.link_table_mut().check_extern_sheet(sheet_index)
    }

    pub fn external_sheet_index(
        &mut self,
        workbook: &str,
        first_sheet: &str,
        last_sheet: &str,
    ) -> XlsResult<u16> {
        self.link_table_mut()
            .external_sheet_index(workbook, first_sheet, last_sheet)
    }

    pub fn external_sheet(&self, sheet_ref: u16) -> Option<ExternalSheet> {
        self.link_table.as_ref()?.external_sheet(sheet_ref)
    }

    pub fn first_sheet_index_from_extern_sheet_index(&self, sheet_ref: u16) -> Option<i16> {
        self.link_table
            .as_ref()?
            .first_internal_sheet_index_for_ext_index(sheet_ref)
    }

    pub fn name_x_ptg(
        &mut self,
        name: &str,
        sheet_ref: Option<u16>,
        udf: &dyn UdfFinder,
    ) -> XlsResult<Option<NameXRef>> {
        self.link_table_mut().name_x_ptg(name, sheet_ref, udf)
    }

    pub fn resolve_name_x_text(&self, sheet_ref: u16, name_index: u16) -> Option<&str> {
        self.link_table
            .as_ref()?
            .resolve_name_x_text(sheet_ref, name_index)
    }

    // ── Defined names ───────────────────────────────────────────────────

    pub fn num_names(&self) -> usize {
        self.link_table.as_ref().map_or(0, LinkTable::num_names)
    }

    pub fn name_record(&self, index: usize) -> Option<&NameRecord> {
        self.link_table.as_ref()?.name_record(index)
    }

    pub fn create_name(&mut self, name: NameRecord) -> usize {
        self.link_table_mut().add_name(name)
    }

    /// Add built-in name `code` for the 1-based `sheet_number`.
    pub fn create_builtin_name(&mut self, code: u8, sheet_number: u16) -> XlsResult<usize> {
        if self.find_builtin_name(code, sheet_number).is_some() {
            return Err(XlsError::invalid_argument(format!(
                "built-in name {code} already exists for sheet {sheet_number}"
            )));
        }
        Ok(self
            .link_table_mut()
            .add_name(NameRecord::new_builtin(code, sheet_number)))
    }

    pub fn find_builtin_name(&self, code: u8, sheet_number: u16) -> Option<&NameRecord> {
        self.link_table
            .as_ref()?
            .find_builtin_name(code, sheet_number)
    }

    pub fn remove_name(&mut self, index: usize) -> Option<NameRecord> {
        self.link_table.as_mut()?.remove_name(index)
    }

    // ── Drawing group ───────────────────────────────────────────────────

    pub fn drawing_manager(&self) -> Option<&DrawingManager> {
        self.drawing_manager.as_ref()
    }

    pub fn drawing_manager_mut(&mut self) -> Option<&mut DrawingManager> {
        self.drawing_manager.as_mut()
    }

    /// Build the drawing manager from the MSODRAWINGGROUP records, which
    /// are replaced by one placement. Returns whether a drawing group
    /// exists.
    pub fn find_drawing_group(&mut self) -> XlsResult<bool> {
        if self.drawing_manager.is_some() {
            return Ok(true);
        }
        let Some(start) = self.list.find_first_sid(MSODRAWINGGROUP) else {
            return Ok(false);
        };
        let mut data = Vec::new();
        let mut end = start;
        while let Some(WorkbookItem::Record(Record::Raw(r))) = self.list.get(end) {
            if r.sid != MSODRAWINGGROUP {
                break;
            }
            data.extend_from_slice(&r.data);
            end += 1;
        }
        let dm = DrawingManager::from_bytes(&data)?;
        for pos in (start..end).rev() {
            self.list.remove(pos);
        }
        self.list.insert(start, WorkbookItem::DrawingGroup);
        self.drawing_manager = Some(dm);
        Ok(true)
    }

    /// The drawing manager, created before the SST if the workbook has no
    /// drawing group.
    pub fn create_drawing_group_if_absent(&mut self) -> XlsResult<&mut DrawingManager> {
        if !self.find_drawing_group()? {
            let at = self
                .list
                .find_first_sid(SST)
                .unwrap_or_else(|| self.eof_pos());
            self.list.insert(at, WorkbookItem::DrawingGroup);
            self.drawing_manager = Some(DrawingManager::new());
        }
        self.drawing_manager
            .as_mut()
            .ok_or_else(|| XlsError::invalid_state("drawing group was not created"))
    }

    /// Add a picture to the BLIP store; returns its 1-based index.
    pub fn add_bse_record(&mut self, bse: EscherRecord) -> XlsResult<usize> {
        self.create_drawing_group_if_absent()?.add_bse(bse)
    }

    /// Give a cloned sheet's drawing its own drawing id and shape ids.
    pub fn clone_drawings(&mut self, sheet: &mut Sheet) -> XlsResult<()> {
        if !self.find_drawing_group()? {
            return Ok(());
        }
        let dm = self
            .drawing_manager
            .as_mut()
            .ok_or_else(|| XlsError::invalid_state("drawing group vanished"))?;
        if !sheet.aggregate_drawing_records(dm, false)? {
            return Ok(());
        }
        match sheet.drawing_mut() {
            Some(d) => d.reassign_ids(dm),
            None => Ok(()),
        }
    }

    // ── Protection and flags ────────────────────────────────────────────

    fn first_record_mut(&mut self, sid: u16) -> Option<&mut Record> {
        self.list.records_mut().find(|r| r.sid() == sid)
    }

    /// Reserve write access: FILESHARING with the password verifier and
    /// WRITEPROT after BOF.
    pub fn write_protect_workbook(&mut self, password: &str, username: &str) {
        let sharing = FileSharingRecord {
            read_only: 1,
            password: xor_password_verifier(password),
            username: XlString::new(username),
        };
        match self.first_record_mut(FILESHARING) {
            Some(r) => *r = Record::FileSharing(sharing),
            None => {
                let at = self.list.find_first_sid(WRITEACCESS).map_or(1, |p| p + 1);
                self.list.insert(at, Record::FileSharing(sharing).into());
            }
        }
        if self.list.find_first_sid(WRITEPROT).is_none() {
            self.list.insert(1, raw(WRITEPROT, &[]).into());
        }
        if let Some(r) = self.first_record_mut(WRITEACCESS) {
            *r = Record::raw(WRITEACCESS, write_access_body(username));
        }
    }

    pub fn unwrite_protect_workbook(&mut self) {
        for sid in [FILESHARING, WRITEPROT] {
            if let Some(pos) = self.list.find_first_sid(sid) {
                self.list.remove(pos);
            }
        }
    }

    pub fn is_write_protected(&self) -> bool {
        self.list.find_first_sid(WRITEPROT).is_some()
    }

    pub fn file_sharing(&self) -> Option<&FileSharingRecord> {
        self.records_of(|r| match r {
            Record::FileSharing(f) => Some(f),
            _ => None,
        })
        .next()
    }

    pub fn is_using_1904_date_windowing(&self) -> bool {
        self.list
            .records()
            .any(|r| matches!(r, Record::DateMode(1)))
    }

    pub fn set_date_1904(&mut self, on: bool) {
        if let Some(r) = self.first_record_mut(DATEMODE) {
            *r = Record::DateMode(on as u16);
        }
    }

    pub fn window_one(&self) -> Option<&Window1Record> {
        self.records_of(|r| match r {
            Record::Window1(w) => Some(w),
            _ => None,
        })
        .next()
    }

    pub fn window_one_mut(&mut self) -> Option<&mut Window1Record> {
        match self.first_record_mut(WINDOW1)? {
            Record::Window1(w) => Some(w),
            _ => None,
        }
    }

    // ── Serialization ───────────────────────────────────────────────────

    fn visit_item(&self, item: &WorkbookItem, visitor: &mut dyn RecordVisitor) -> XlsResult<()> {
        match item {
            WorkbookItem::Record(r) => visitor.visit_record(r),
            WorkbookItem::LinkTable => self
                .link_table
                .as_ref()
                .ok_or_else(|| XlsError::invalid_state("placement for missing link table"))?
                .visit_contained_records(visitor),
            WorkbookItem::DrawingGroup => visitor.visit_record(
                &self
                    .drawing_manager
                    .as_ref()
                    .ok_or_else(|| XlsError::invalid_state("placement for missing drawing group"))?
                    .to_record(),
            ),
        }
        Ok(())
    }

    /// All records in write order. EXTSST is written as stored.
    pub fn records(&self) -> XlsResult<Vec<Record>> {
        let mut out: Vec<Record> = Vec::with_capacity(self.list.len());
        for item in self.list.items() {
            self.visit_item(item, &mut out)?;
        }
        Ok(out)
    }

    /// Serialized size. Depends only on the contents, not on BOUNDSHEET
    /// positions.
    pub fn serialized_size(&self) -> XlsResult<usize> {
        let strings = self.sst().map(SstRecord::len);
        Ok(self
            .records()?
            .iter()
            .map(|r| match (r, strings) {
                (Record::ExtSst(_), Some(n)) => ExtSstRecord::size_for(n),
                (other, _) => other.record_size(),
            })
            .sum())
    }

    /// Write the globals starting at stream offset `offset`, regenerating
    /// EXTSST from where the SST strings land.
    pub fn serialize(&self, offset: usize, out: &mut Vec<u8>) -> XlsResult<usize> {
        let start = out.len();
        let mut positions = Vec::new();
        let mut sst_offset = None;
        for rec in self.records()? {
            match &rec {
                Record::Sst(sst) => {
                    sst_offset = Some(offset + out.len() - start);
                    positions = sst.serialize_with_positions(out);
                }
                Record::ExtSst(_) => {
                    let regenerated = match sst_offset {
                        Some(at) => Record::ExtSst(ExtSstRecord::from_positions(at, &positions)),
                        None => rec.clone(),
                    };
                    regenerated.serialize(out);
                }
                _ => RecordSerializer { out: &mut *out }.visit_record(&rec),
            }
        }
        Ok(out.len() - start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::workbook::BUILTIN_PRINT_AREA;
    use pretty_assertions::assert_eq;

    fn reread(wb: &Workbook) -> Workbook {
        Workbook::from_stream(&mut RecordStream::new(wb.records().unwrap())).unwrap()
    }

    #[test]
    fn test_new_workbook_scenario() {
        let wb = Workbook::new();
        assert_eq!(wb.num_sheets(), 1);
        assert_eq!(wb.sheet_name(0), Some("Sheet1"));
        assert_eq!(wb.num_fonts(), 4);
        for i in [0, 1, 2, 3] {
            assert!(wb.font_at(i).is_some());
        }
        assert!(wb.font_at(4).is_none());
        assert_eq!(wb.num_ex_formats(), 21);
        let recs = wb.records().unwrap();
        assert_eq!(recs.iter().filter(|r| r.sid() == EOF).count(), 1);
        assert_eq!(recs.last().map(Record::sid), Some(EOF));
        assert_eq!(recs.first().map(Record::sid), Some(BOF));
    }

    #[test]
    fn test_with_options() {
        let wb = Workbook::with_options(&WorkbookOptions {
            first_sheet_name: "Data".to_string(),
            date_1904: true,
            ..WorkbookOptions::default()
        });
        assert_eq!(wb.sheet_name(0), Some("Data"));
        assert!(wb.is_using_1904_date_windowing());
    }

    #[test]
    fn test_font_index_skips_four() {
        let mut wb = Workbook::new();
        let mut f = FontRecord::default();
        f.height = 400;
        assert_eq!(wb.create_new_font(f.clone()), 5);
        assert_eq!(wb.font_index(&f), Some(5));
        assert_eq!(wb.font_at(5).map(|f| f.height), Some(400));
        assert!(matches!(wb.remove_font(4), Err(XlsError::InvalidArgument(_))));
        assert_eq!(wb.remove_font(5).unwrap().height, 400);
        assert_eq!(wb.num_fonts(), 4);
    }

    #[test]
    fn test_new_font_lands_after_last_font() {
        let mut wb = Workbook::new();
        wb.create_new_font(FontRecord::default());
        let items = wb.record_list().items();
        let last_font = items.iter().rposition(|i| i.sid() == Some(FONT)).unwrap();
        assert_eq!(items[last_font + 1].sid(), Some(FORMAT));
        assert_eq!(wb.record_list().cursor(Anchor::Font), Some(last_font));
    }

    #[test]
    fn test_cell_xf_and_styles() {
        let mut wb = Workbook::new();
        assert_eq!(wb.create_cell_xf(), 21);
        assert_eq!(wb.num_ex_formats(), 22);
        assert!(wb.style_record(0).is_some());
        assert!(wb.style_record(21).is_none());
        wb.create_style_record(21, "Mine").unwrap();
        assert!(wb.style_record(21).is_some());
        assert!(wb.create_style_record(21, "Again").is_err());
    }

    #[test]
    fn test_custom_format_indexes_start_at_164() {
        let mut wb = Workbook::new();
        assert_eq!(wb.format_index("0.000", false), None);
        assert_eq!(wb.format_index("0.000", true), Some(164));
        assert_eq!(wb.format_index("0.0000", true), Some(165));
        assert_eq!(wb.format_index("0.000", true), Some(164));
        assert_eq!(wb.format_string(165), Some("0.0000"));
    }

    #[test]
    fn test_sheet_directory() {
        let mut wb = Workbook::new();
        assert_eq!(wb.create_bound_sheet("Data").unwrap(), 1);
        assert!(matches!(
            wb.create_bound_sheet("DATA"),
            Err(XlsError::InvalidArgument(_))
        ));
        assert!(wb.create_bound_sheet("a/b").is_err());
        assert_eq!(wb.sheet_index("data"), Some(1));
        wb.set_sheet_name(1, "Summary").unwrap();
        assert_eq!(wb.sheet_name(1), Some("Summary"));

        wb.set_sheet_hidden(1, 2).unwrap();
        assert_eq!(wb.sheet_visibility(1), Some(2));
        assert!(matches!(
            wb.set_sheet_hidden(1, 3),
            Err(XlsError::InvalidArgument(_))
        ));

        wb.set_sheet_order("Summary", 0).unwrap();
        assert_eq!(wb.sheet_name(0), Some("Summary"));
        assert_eq!(wb.sheet_name(1), Some("Sheet1"));

        wb.remove_sheet(0).unwrap();
        assert_eq!(wb.num_sheets(), 1);
        let tab_ids = wb
            .record_list()
            .records()
            .find_map(|r| match r {
                Record::TabId(t) => Some(t.ids.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(tab_ids, vec![0]);
    }

    #[test]
    fn test_palette() {
        let mut wb = Workbook::new();
        assert!(wb.custom_palette().is_none());
        wb.set_color_at_index(8, 1, 2, 3).unwrap();
        assert_eq!(wb.custom_palette().unwrap().color(8), Some([1, 2, 3]));
        assert!(matches!(
            wb.set_color_at_index(64, 0, 0, 0),
            Err(XlsError::InvalidArgument(_))
        ));
        assert!(wb.set_color_at_index(7, 0, 0, 0).is_err());
    }

    #[test]
    fn test_sst_strings() {
        let mut wb = Workbook::new();
        assert_eq!(wb.add_sst_string(UnicodeString::new("x")), 0);
        assert_eq!(wb.add_sst_string(UnicodeString::new("y")), 1);
        assert_eq!(wb.add_sst_string(UnicodeString::new("x")), 0);
        assert_eq!(wb.sst_string(1).map(UnicodeString::text), Some("y"));
        assert_eq!(wb.num_unique_strings(), 2);
    }

    #[test]
    fn test_link_table_created_after_country() {
        let mut wb = Workbook::new();
        let r = wb.check_extern_sheet(0).unwrap();
        assert_eq!(wb.check_extern_sheet(0).unwrap(), r);
        let country = wb.record_list().find_first_sid(COUNTRY).unwrap();
        assert_eq!(
            wb.record_list().get(country + 1),
            Some(&WorkbookItem::LinkTable)
        );
        wb.create_builtin_name(BUILTIN_PRINT_AREA, 1).unwrap();
        assert!(wb.create_builtin_name(BUILTIN_PRINT_AREA, 1).is_err());

        let back = reread(&wb);
        assert_eq!(back.num_names(), 1);
        assert_eq!(back.records().unwrap(), wb.records().unwrap());
    }

    #[test]
    fn test_drawing_group_round_trip() {
        let mut wb = Workbook::new();
        {
            let dm = wb.create_drawing_group_if_absent().unwrap();
            dm.create_dg_record();
        }
        let mut back = reread(&wb);
        assert!(back.find_drawing_group().unwrap());
        assert_eq!(back.drawing_manager(), wb.drawing_manager());
        let sst = back.record_list().find_first_sid(SST).unwrap();
        assert_eq!(
            back.record_list().get(sst - 1),
            Some(&WorkbookItem::DrawingGroup)
        );
    }

    #[test]
    fn test_write_protect() {
        let mut wb = Workbook::new();
        wb.write_protect_workbook("secret", "alice");
        assert!(wb.is_write_protected());
        let fs = wb.file_sharing().unwrap();
        assert_eq!(fs.read_only, 1);
        assert_eq!(fs.password, xor_password_verifier("secret"));
        wb.unwrite_protect_workbook();
        assert!(!wb.is_write_protected());
        assert!(wb.file_sharing().is_none());
    }

    #[test]
    fn test_serialize_matches_size() {
        let mut wb = Workbook::new();
        for i in 0..20 {
            wb.add_sst_string(UnicodeString::new(format!("s{i}")));
        }
        let mut out = Vec::new();
        let n = wb.serialize(0, &mut out).unwrap();
        assert_eq!(n, wb.serialized_size().unwrap());
    }

    #[test]
    fn test_wrong_bof_is_structural() {
        let recs = vec![Record::Bof(BofRecord::worksheet()), Record::Eof];
        assert!(matches!(
            Workbook::from_stream(&mut RecordStream::new(recs)),
            Err(XlsError::Structural { sid: BOF, .. })
        ));
    }

    #[test]
    fn test_missing_eof_is_structural() {
        let recs = vec![Record::Bof(BofRecord::new(BOF_WORKBOOK_GLOBALS))];
        assert!(matches!(
            Workbook::from_stream(&mut RecordStream::new(recs)),
            Err(XlsError::Structural { sid: EOF, .. })
        ));
    }
}
