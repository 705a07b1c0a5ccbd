//! A whole BIFF8 workbook stream: the globals substream followed by one
//! substream per BOUNDSHEET.

use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

use log::{debug, warn};

use crate::biff::read_records_from_bytes;
use crate::biff::records::{BOF, BOF_WORKSHEET, BOUNDSHEET, EOF};
use crate::container;
use crate::error::{XlsError, XlsResult};
use crate::model::{Sheet, Workbook};
use crate::record::{decode_all, Record};
use crate::stream::RecordStream;

/// One top-level substream after the globals.
#[derive(Debug, Clone, PartialEq)]
pub enum SheetStream {
    Worksheet(Sheet),
    /// Chart sheets, macro sheets and VB modules, written back as read.
    Opaque(Vec<Record>),
}

impl SheetStream {
    fn serialized_size(&self) -> XlsResult<usize> {
        match self {
            SheetStream::Worksheet(s) => s.serialized_size(),
            SheetStream::Opaque(records) => Ok(records.iter().map(Record::record_size).sum()),
        }
    }

    fn serialize(&self, offset: usize, out: &mut Vec<u8>) -> XlsResult<usize> {
        match self {
            SheetStream::Worksheet(s) => s.serialize(offset, out),
            SheetStream::Opaque(records) => {
                let start = out.len();
                for r in records {
                    r.serialize(out);
                }
                Ok(out.len() - start)
            }
        }
    }
}

/// Read one non-worksheet substream, nested BOF/EOF pairs included.
fn read_opaque(rs: &mut RecordStream) -> XlsResult<Vec<Record>> {
    let mut records = Vec::new();
    let mut depth = 0usize;
    loop {
        let rec = rs
            .next()
            .map_err(|_| XlsError::structural(EOF, "substream ended without EOF"))?;
        match rec.sid() {
            BOF => depth += 1,
            EOF => depth = depth.saturating_sub(1),
            _ => {}
        }
        records.push(rec);
        if depth == 0 {
            return Ok(records);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BiffDocument {
    workbook: Workbook,
    sheets: Vec<SheetStream>,
}

impl Default for BiffDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl BiffDocument {
    /// A new document with one empty worksheet.
    pub fn new() -> Self {
        Self::from_workbook(Workbook::new())
    }

    /// Pair fresh globals with one empty worksheet per BOUNDSHEET.
    pub fn from_workbook(workbook: Workbook) -> Self {
        let sheets = (0..workbook.num_sheets())
            .map(|_| SheetStream::Worksheet(Sheet::create_sheet()))
            .collect();
        BiffDocument { workbook, sheets }
    }

    /// Parse a decoded record list.
    pub fn from_records(records: Vec<Record>) -> XlsResult<Self> {
        let mut rs = RecordStream::new(records);
        let workbook = Workbook::from_stream(&mut rs)?;
        let mut sheets = Vec::with_capacity(workbook.num_sheets());

        while let Some(next) = rs.peek_next() {
            if next.sid() != BOF {
                warn!(
                    "ignoring {} records after the last substream, starting with 0x{:04X}",
                    rs.remaining(),
                    next.sid()
                );
                break;
            }
            let sheet = match next.bof_kind() {
                Some(BOF_WORKSHEET) => SheetStream::Worksheet(Sheet::from_stream(&mut rs)?),
                _ => SheetStream::Opaque(read_opaque(&mut rs)?),
            };
            sheets.push(sheet);
        }

        if sheets.len() != workbook.num_sheets() {
            return Err(XlsError::structural(
                BOUNDSHEET,
                format!(
                    "{} BOUNDSHEET records but {} sheet substreams",
                    workbook.num_sheets(),
                    sheets.len()
                ),
            ));
        }
        debug!("document: {} sheet substreams", sheets.len());
        Ok(BiffDocument { workbook, sheets })
    }

    /// Parse the raw bytes of a workbook stream.
    pub fn from_stream_bytes(bytes: &[u8]) -> XlsResult<Self> {
        let physical = read_records_from_bytes(bytes)?;
        Self::from_records(decode_all(&physical))
    }

    /// Open an OLE2 compound file.
    pub fn open<R: Read + Seek>(reader: R) -> XlsResult<Self> {
        Self::from_stream_bytes(&container::read_workbook_stream(reader)?)
    }

    pub fn open_file<P: AsRef<Path>>(path: P) -> XlsResult<Self> {
        Self::from_stream_bytes(&container::read_workbook_stream_from_file(path)?)
    }

    pub fn workbook(&self) -> &Workbook {
        &self.workbook
    }

    pub fn workbook_mut(&mut self) -> &mut Workbook {
        &mut self.workbook
    }

    pub fn num_sheets(&self) -> usize {
        self.sheets.len()
    }

    pub fn sheet_streams(&self) -> &[SheetStream] {
        &self.sheets
    }

    /// Worksheet at `index`; `None` for chart and macro sheets.
    pub fn sheet(&self, index: usize) -> Option<&Sheet> {
        match self.sheets.get(index)? {
            SheetStream::Worksheet(s) => Some(s),
            SheetStream::Opaque(_) => None,
        }
    }

    pub fn sheet_mut(&mut self, index: usize) -> Option<&mut Sheet> {
        match self.sheets.get_mut(index)? {
            SheetStream::Worksheet(s) => Some(s),
            SheetStream::Opaque(_) => None,
        }
    }

    /// Both the sheet and the workbook globals it draws on.
    pub fn sheet_and_workbook_mut(&mut self, index: usize) -> Option<(&mut Sheet, &mut Workbook)> {
        match self.sheets.get_mut(index)? {
            SheetStream::Worksheet(s) => Some((s, &mut self.workbook)),
            SheetStream::Opaque(_) => None,
        }
    }

    // ── Sheet directory ─────────────────────────────────────────────────

    /// One substream per BOUNDSHEET. Edits made through [`Self::workbook_mut`]
    /// can break this.
    fn check_sheet_count(&self) -> XlsResult<()> {
        let directory = self.workbook.num_sheets();
        if directory != self.sheets.len() {
            return Err(XlsError::invalid_state(format!(
                "{directory} BOUNDSHEET records but {} sheet substreams",
                self.sheets.len()
            )));
        }
        Ok(())
    }

    /// Append an empty worksheet. Returns its index.
    pub fn create_sheet(&mut self, name: &str) -> XlsResult<usize> {
        self.check_sheet_count()?;
        let index = self.workbook.create_bound_sheet(name)?;
        self.sheets
            .insert(index, SheetStream::Worksheet(Sheet::create_sheet()));
        Ok(index)
    }

    /// Append a copy of worksheet `index` named `name`, with its drawing
    /// given fresh ids.
    pub fn clone_sheet(&mut self, index: usize, name: &str) -> XlsResult<usize> {
        self.check_sheet_count()?;
        let mut copy = self
            .sheet(index)
            .cloned()
            .ok_or_else(|| XlsError::invalid_argument(format!("no worksheet with index {index}")))?;
        let new_index = self.workbook.create_bound_sheet(name)?;
        if let Err(e) = self.workbook.clone_drawings(&mut copy) {
            self.workbook.remove_sheet(new_index)?;
            return Err(e);
        }
        self.sheets.insert(new_index, SheetStream::Worksheet(copy));
        Ok(new_index)
    }

    pub fn remove_sheet(&mut self, index: usize) -> XlsResult<()> {
        self.check_sheet_count()?;
        if index >= self.sheets.len() {
            return Err(XlsError::invalid_argument(format!(
                "no sheet with index {index}"
            )));
        }
        self.workbook.remove_sheet(index)?;
        self.sheets.remove(index);
        Ok(())
    }

    pub fn set_sheet_order(&mut self, name: &str, to: usize) -> XlsResult<()> {
        self.check_sheet_count()?;
        let from = self
            .workbook
            .sheet_index(name)
            .ok_or_else(|| XlsError::not_found(format!("sheet '{name}'")))?;
        if to >= self.sheets.len() || from >= self.sheets.len() {
            return Err(XlsError::invalid_argument(format!(
                "sheet position {to} is out of range"
            )));
        }
        self.workbook.set_sheet_order(name, to)?;
        let sheet = self.sheets.remove(from);
        self.sheets.insert(to, sheet);
        Ok(())
    }

    // ── Writing ─────────────────────────────────────────────────────────

    /// Serialize the workbook stream. BOUNDSHEET positions are patched
    /// first so every sheet BOF offset is correct.
    pub fn to_stream_bytes(&mut self) -> XlsResult<Vec<u8>> {
        self.check_sheet_count()?;
        let mut pos = self.workbook.serialized_size()?;
        for (i, sheet) in self.sheets.iter().enumerate() {
            self.workbook.set_sheet_bof(i, pos as u32)?;
            pos += sheet.serialized_size()?;
        }

        let mut out = Vec::with_capacity(pos);
        self.workbook.serialize(0, &mut out)?;
        for sheet in &self.sheets {
            let offset = out.len();
            sheet.serialize(offset, &mut out)?;
        }
        if out.len() != pos {
            return Err(XlsError::invalid_state(format!(
                "wrote {} bytes, expected {pos}",
                out.len()
            )));
        }
        Ok(out)
    }

    /// Write as an OLE2 compound file.
    pub fn save<W: Read + Write + Seek>(&mut self, writer: W) -> XlsResult<W> {
        let data = self.to_stream_bytes()?;
        container::write_workbook_stream(writer, &data)
    }

    pub fn to_bytes(&mut self) -> XlsResult<Vec<u8>> {
        Ok(self.save(Cursor::new(Vec::new()))?.into_inner())
    }

    pub fn save_file<P: AsRef<Path>>(&mut self, path: P) -> XlsResult<()> {
        let data = self.to_stream_bytes()?;
        container::write_workbook_stream_to_file(path, &data)
    }
}
