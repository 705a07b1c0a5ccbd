//! External references: SUPBOOK blocks, the EXTERNSHEET table and defined
//! names.
//!
//! An EXTERNSHEET entry (`ref`) names a SUPBOOK by index and a sheet range
//! inside it. Formula tokens store ref indexes, so an entry never moves once
//! allocated.

use log::{debug, warn};

use crate::aggregates::{RecordAggregate, RecordVisitor};
use crate::biff::records::{CRN, EXTERNNAME, EXTERNSHEET, NAME, NAMECMT, SUPBOOK, XCT};
use crate::error::{XlsError, XlsResult};
use crate::record::workbook::RefSubRecord;
use crate::record::{
    ExternNameRecord, ExternSheetRecord, NameRecord, Record, SupBookRecord,
};
use crate::stream::RecordStream;

/// Sheet index EXTERNSHEET uses for add-in function entries.
const ADD_IN_SHEET: i16 = -2;

/// Sheet index of a reference whose sheet was deleted.
const DELETED_SHEET: i16 = -1;

/// Decides whether an unknown function name is a user-defined function.
pub trait UdfFinder {
    fn find_function(&self, name: &str) -> bool;
}

impl<F: Fn(&str) -> bool> UdfFinder for F {
    fn find_function(&self, name: &str) -> bool {
        self(name)
    }
}

/// Operands of a PtgNameX token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameXRef {
    /// EXTERNSHEET index.
    pub sheet_ref: u16,
    /// 0-based index into the book's EXTERNNAME list.
    pub name_index: u16,
}

/// Workbook and sheet names an EXTERNSHEET entry points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalSheet {
    pub workbook: String,
    pub first_sheet: String,
    /// Set for a sheet range.
    pub last_sheet: Option<String>,
}

/// One SUPBOOK with the EXTERNNAME and cached-value records after it.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalBookBlock {
    supbook: SupBookRecord,
    extern_names: Vec<ExternNameRecord>,
    /// XCT/CRN cache, kept as read.
    cached_values: Vec<Record>,
}

impl ExternalBookBlock {
    pub fn new(supbook: SupBookRecord) -> Self {
        ExternalBookBlock {
            supbook,
            extern_names: Vec::new(),
            cached_values: Vec::new(),
        }
    }

    fn read(rs: &mut RecordStream) -> XlsResult<Self> {
        let supbook = match rs.next()? {
            Record::SupBook(sb) => sb,
            other => {
                return Err(XlsError::structural(
                    other.sid(),
                    "undecodable SUPBOOK record",
                ))
            }
        };
        let mut block = ExternalBookBlock::new(supbook);
        while let Some(rec) = rs.next_if_sid(EXTERNNAME) {
            match rec {
                Record::ExternName(n) => block.extern_names.push(n),
                _ => return Err(XlsError::structural(EXTERNNAME, "undecodable EXTERNNAME")),
            }
        }
        while matches!(rs.peek_next_sid(), Some(XCT | CRN)) {
            block.cached_values.push(rs.next()?);
        }
        Ok(block)
    }

    pub fn supbook(&self) -> &SupBookRecord {
        &self.supbook
    }

    pub fn extern_names(&self) -> &[ExternNameRecord] {
        &self.extern_names
    }

    /// Case-insensitive search of the external names.
    pub fn index_of_name(&self, name: &str) -> Option<usize> {
        self.extern_names
            .iter()
            .position(|n| n.name.as_str().eq_ignore_ascii_case(name))
    }

    pub fn add_extern_name(&mut self, rec: ExternNameRecord) -> usize {
        self.extern_names.push(rec);
        self.extern_names.len() - 1
    }

    fn visit(&self, visitor: &mut dyn RecordVisitor) {
        visitor.visit_record(&Record::SupBook(self.supbook.clone()));
        for n in &self.extern_names {
            visitor.visit_record(&Record::ExternName(n.clone()));
        }
        for r in &self.cached_values {
            visitor.visit_record(r);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LinkTable {
    books: Vec<ExternalBookBlock>,
    extern_sheet: Option<ExternSheetRecord>,
    names: Vec<NameRecord>,
    /// NAMECMT records, kept as read after the names.
    name_comments: Vec<Record>,
    records_absorbed: usize,
}

/// Sids the link table absorbs from the globals stream.
pub fn is_link_table_record(sid: u16) -> bool {
    matches!(
        sid,
        SUPBOOK | EXTERNNAME | XCT | CRN | EXTERNSHEET | NAME | NAMECMT
    )
}

impl LinkTable {
    /// Table for a new workbook: the internal SUPBOOK and an empty
    /// EXTERNSHEET.
    pub fn new(num_sheets: u16) -> Self {
        LinkTable {
            books: vec![ExternalBookBlock::new(SupBookRecord::internal(num_sheets))],
            extern_sheet: Some(ExternSheetRecord::default()),
            ..Default::default()
        }
    }

    /// Consume the SUPBOOK blocks, EXTERNSHEET and NAME run at the head of
    /// `rs`.
    pub fn read(rs: &mut RecordStream) -> XlsResult<Self> {
        let start = rs.count_read();
        let mut table = LinkTable::default();
        while rs.peek_next_sid() == Some(SUPBOOK) {
            table.books.push(ExternalBookBlock::read(rs)?);
        }
        while let Some(rec) = rs.next_if_sid(EXTERNSHEET) {
            let Record::ExternSheet(es) = rec else {
                return Err(XlsError::structural(EXTERNSHEET, "undecodable EXTERNSHEET"));
            };
            match table.extern_sheet.as_mut() {
                Some(existing) => {
                    warn!("second EXTERNSHEET record, merging {} refs", es.refs.len());
                    existing.refs.extend(es.refs);
                }
                None => table.extern_sheet = Some(es),
            }
        }
        loop {
            match rs.peek_next_sid() {
                Some(NAME) => match rs.next()? {
                    Record::Name(n) => table.names.push(n),
                    _ => return Err(XlsError::structural(NAME, "undecodable NAME record")),
                },
                Some(NAMECMT) => table.name_comments.push(rs.next()?),
                _ => break,
            }
        }
        table.records_absorbed = rs.count_read() - start;
        debug!(
            "link table: {} books, {} refs, {} names",
            table.books.len(),
            table.num_refs(),
            table.names.len()
        );
        Ok(table)
    }

    /// Records consumed by [`LinkTable::read`].
    pub fn records_absorbed(&self) -> usize {
        self.records_absorbed
    }

    /// Absorb link-table records that turn up after the first run.
    pub fn add_late_records(&mut self, rs: &mut RecordStream) -> XlsResult<()> {
        let late = LinkTable::read(rs)?;
        self.books.extend(late.books);
        if let Some(es) = late.extern_sheet {
            match self.extern_sheet.as_mut() {
                Some(existing) => existing.refs.extend(es.refs),
                None => self.extern_sheet = Some(es),
            }
        }
        self.names.extend(late.names);
        self.name_comments.extend(late.name_comments);
        self.records_absorbed += late.records_absorbed;
        Ok(())
    }

    pub fn books(&self) -> &[ExternalBookBlock] {
        &self.books
    }

    pub fn num_refs(&self) -> usize {
        self.extern_sheet.as_ref().map_or(0, |e| e.refs.len())
    }

    fn extern_sheet_mut(&mut self) -> &mut ExternSheetRecord {
        self.extern_sheet.get_or_insert_with(ExternSheetRecord::default)
    }

    fn internal_book_index(&self) -> XlsResult<u16> {
        let mut internal = self
            .books
            .iter()
            .enumerate()
            .filter(|(_, b)| b.supbook.is_internal());
        match (internal.next(), internal.next()) {
            (Some((i, _)), None) => Ok(i as u16),
            (None, _) => Err(XlsError::invalid_state("no internal SUPBOOK record")),
            (Some(_), Some(_)) => Err(XlsError::invalid_state(
                "more than one internal SUPBOOK record",
            )),
        }
    }

    /// Keep the internal SUPBOOK's sheet count in step with the workbook.
    pub fn set_num_internal_sheets(&mut self, num_sheets: u16) {
        for b in &mut self.books {
            if b.supbook.is_internal() {
                b.supbook.num_sheets = num_sheets;
            }
        }
    }

    fn find_or_add_ref(&mut self, book: u16, first: i16, last: i16) -> XlsResult<u16> {
        let es = self.extern_sheet_mut();
        if let Some(i) = es.find_ref(book, first, last) {
            return Ok(i as u16);
        }
        es.add_ref(book, first, last);
        es.find_ref(book, first, last)
            .map(|i| i as u16)
            .ok_or_else(|| {
                XlsError::invalid_state(format!(
                    "EXTERNSHEET has no entry for book {book} sheets {first}..={last}"
                ))
            })
    }

    /// EXTERNSHEET index for a local sheet, allocated on first use.
    pub fn check_extern_sheet(&mut self, sheet_index: u16) -> XlsResult<u16> {
        let book = self.internal_book_index()?;
        let sheet = sheet_index as i16;
        self.find_or_add_ref(book, sheet, sheet)
    }

    /// EXTERNSHEET index for sheets of another workbook.
    pub fn external_sheet_index(
        &mut self,
        workbook: &str,
        first_sheet: &str,
        last_sheet: &str,
    ) -> XlsResult<u16> {
        let (book, block) = self
            .books
            .iter()
            .enumerate()
            .find(|(_, b)| b.supbook.url() == Some(workbook))
            .ok_or_else(|| XlsError::not_found(format!("external workbook '{workbook}'")))?;
        let sheet_pos = |name: &str| {
            block
                .supbook
                .sheet_names()
                .iter()
                .position(|s| s.as_str() == name)
                .map(|i| i as i16)
                .ok_or_else(|| {
                    XlsError::not_found(format!("sheet '{name}' in workbook '{workbook}'"))
                })
        };
        let first = sheet_pos(first_sheet)?;
        let last = sheet_pos(last_sheet)?;
        self.find_or_add_ref(book as u16, first, last)
    }

    pub fn ref_at(&self, sheet_ref: u16) -> Option<&RefSubRecord> {
        self.extern_sheet.as_ref()?.refs.get(sheet_ref as usize)
    }

    /// Workbook and sheet names of an external reference. `None` for refs
    /// into this workbook or add-ins.
    pub fn external_sheet(&self, sheet_ref: u16) -> Option<ExternalSheet> {
        let r = self.ref_at(sheet_ref)?;
        let sb = &self.books.get(r.book as usize)?.supbook;
        let url = sb.url()?;
        let names = sb.sheet_names();
        let first = names.get(usize::try_from(r.first_sheet).ok()?)?;
        let last = if r.last_sheet != r.first_sheet {
            usize::try_from(r.last_sheet)
                .ok()
                .and_then(|i| names.get(i))
                .map(|s| s.as_str().to_string())
        } else {
            None
        };
        Some(ExternalSheet {
            workbook: url.to_string(),
            first_sheet: first.as_str().to_string(),
            last_sheet: last,
        })
    }

    /// First local sheet of a ref, `None` for unknown refs.
    pub fn first_internal_sheet_index_for_ext_index(&self, sheet_ref: u16) -> Option<i16> {
        self.ref_at(sheet_ref).map(|r| r.first_sheet)
    }

    pub fn last_internal_sheet_index_for_ext_index(&self, sheet_ref: u16) -> Option<i16> {
        self.ref_at(sheet_ref).map(|r| r.last_sheet)
    }

    fn find_ref_index_from_book(&self, book: usize) -> Option<u16> {
        self.extern_sheet
            .as_ref()?
            .refs
            .iter()
            .position(|r| r.book as usize == book)
            .map(|i| i as u16)
    }

    /// Operands for a PtgNameX naming `name`. Known external names come
    /// first; failing that, a name `udf` accepts is registered as an add-in
    /// function. `sheet_ref` restricts the match to one EXTERNSHEET entry.
    pub fn name_x_ptg(
        &mut self,
        name: &str,
        sheet_ref: Option<u16>,
        udf: &dyn UdfFinder,
    ) -> XlsResult<Option<NameXRef>> {
        for (book, block) in self.books.iter().enumerate() {
            let Some(name_index) = block.index_of_name(name) else {
                continue;
            };
            let Some(this_ref) = self.find_ref_index_from_book(book) else {
                continue;
            };
            if sheet_ref.is_none() || sheet_ref == Some(this_ref) {
                return Ok(Some(NameXRef {
                    sheet_ref: this_ref,
                    name_index: name_index as u16,
                }));
            }
        }
        if !udf.find_function(name) {
            return Ok(None);
        }
        self.add_name_x_ptg(name).map(Some)
    }

    /// Register `name` as an add-in function.
    fn add_name_x_ptg(&mut self, name: &str) -> XlsResult<NameXRef> {
        let book = match self.books.iter().position(|b| b.supbook.is_add_in()) {
            Some(i) => i,
            None => {
                self.books
                    .push(ExternalBookBlock::new(SupBookRecord::add_in()));
                self.books.len() - 1
            }
        };
        let name_index = self.books[book].add_extern_name(ExternNameRecord::add_in_function(name));
        let sheet_ref = self.find_or_add_ref(book as u16, ADD_IN_SHEET, ADD_IN_SHEET)?;
        Ok(NameXRef {
            sheet_ref,
            name_index: name_index as u16,
        })
    }

    fn extern_name_for(&self, sheet_ref: u16, name_index: u16) -> Option<&ExternNameRecord> {
        let r = self.ref_at(sheet_ref)?;
        self.books
            .get(r.book as usize)?
            .extern_names
            .get(name_index as usize)
    }

    pub fn resolve_name_x_text(&self, sheet_ref: u16, name_index: u16) -> Option<&str> {
        self.extern_name_for(sheet_ref, name_index)
            .map(|n| n.name.as_str())
    }

    pub fn resolve_name_x_ix(&self, sheet_ref: u16, name_index: u16) -> Option<u16> {
        self.extern_name_for(sheet_ref, name_index).map(|n| n.ix)
    }

    // ── Defined names ───────────────────────────────────────────────────

    pub fn num_names(&self) -> usize {
        self.names.len()
    }

    pub fn name_record(&self, index: usize) -> Option<&NameRecord> {
        self.names.get(index)
    }

    pub fn name_record_mut(&mut self, index: usize) -> Option<&mut NameRecord> {
        self.names.get_mut(index)
    }

    pub fn names(&self) -> impl Iterator<Item = &NameRecord> {
        self.names.iter()
    }

    pub fn add_name(&mut self, name: NameRecord) -> usize {
        self.names.push(name);
        self.names.len() - 1
    }

    pub fn remove_name(&mut self, index: usize) -> Option<NameRecord> {
        (index < self.names.len()).then(|| self.names.remove(index))
    }

    /// Built-in name `code` scoped to the 1-based `sheet_number`.
    pub fn find_builtin_name(&self, code: u8, sheet_number: u16) -> Option<&NameRecord> {
        self.names
            .iter()
            .find(|n| n.builtin_code() == Some(code) && n.sheet_number == sheet_number)
    }

    /// Case-insensitive lookup of a user name in a scope (0 = workbook).
    pub fn find_name(&self, name: &str, sheet_number: u16) -> Option<usize> {
        self.names.iter().position(|n| {
            n.sheet_number == sheet_number && n.name_text().eq_ignore_ascii_case(name)
        })
    }

    /// Shift references and name scopes after local sheet `sheet_index` is
    /// deleted. A ref to only that sheet becomes a deleted-sheet ref; a
    /// range over it loses one sheet.
    pub fn remove_sheet(&mut self, sheet_index: u16) {
        let deleted = sheet_index as i16;
        let internal = self.internal_book_index().ok();
        if let (Some(book), Some(es)) = (internal, self.extern_sheet.as_mut()) {
            for r in es.refs.iter_mut().filter(|r| r.book == book && r.first_sheet >= 0) {
                if r.first_sheet == deleted && r.last_sheet == deleted {
                    r.first_sheet = DELETED_SHEET;
                    r.last_sheet = DELETED_SHEET;
                    continue;
                }
                if r.first_sheet > deleted {
                    r.first_sheet -= 1;
                }
                if r.last_sheet >= deleted {
                    r.last_sheet -= 1;
                }
            }
        }
        let scope = sheet_index + 1;
        for n in &mut self.names {
            if n.sheet_number == scope {
                n.sheet_number = 0;
            } else if n.sheet_number > scope {
                n.sheet_number -= 1;
            }
        }
    }
}

impl RecordAggregate for LinkTable {
    fn visit_contained_records(&self, visitor: &mut dyn RecordVisitor) {
        for b in &self.books {
            b.visit(visitor);
        }
        if let Some(es) = &self.extern_sheet {
            visitor.visit_record(&Record::ExternSheet(es.clone()));
        }
        for n in &self.names {
            visitor.visit_record(&Record::Name(n.clone()));
        }
        for c in &self.name_comments {
            visitor.visit_record(c);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::workbook::BUILTIN_PRINT_AREA;
    use pretty_assertions::assert_eq;

    fn no_udf(_: &str) -> bool {
        false
    }

    fn external_table() -> LinkTable {
        let mut lt = LinkTable::new(3);
        lt.books.push(ExternalBookBlock::new(SupBookRecord::external(
            "other.xls",
            &["Data", "Summary"],
        )));
        lt
    }

    #[test]
    fn test_check_extern_sheet_is_idempotent() {
        let mut lt = LinkTable::new(3);
        let a = lt.check_extern_sheet(1).unwrap();
        let b = lt.check_extern_sheet(1).unwrap();
        let c = lt.check_extern_sheet(2).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(lt.num_refs(), 2);
    }

    #[test]
    fn test_check_extern_sheet_needs_one_internal_book() {
        let mut lt = LinkTable::default();
        assert!(matches!(lt.check_extern_sheet(0), Err(XlsError::InvalidState(_))));

        let mut lt = LinkTable::new(1);
        lt.books.push(ExternalBookBlock::new(SupBookRecord::internal(1)));
        assert!(matches!(lt.check_extern_sheet(0), Err(XlsError::InvalidState(_))));
    }

    #[test]
    fn test_external_sheet_index() {
        let mut lt = external_table();
        let r = lt.external_sheet_index("other.xls", "Data", "Summary").unwrap();
        assert_eq!(
            lt.external_sheet_index("other.xls", "Data", "Summary").unwrap(),
            r
        );
        assert_eq!(
            lt.external_sheet(r),
            Some(ExternalSheet {
                workbook: "other.xls".into(),
                first_sheet: "Data".into(),
                last_sheet: Some("Summary".into()),
            })
        );
        assert!(matches!(
            lt.external_sheet_index("missing.xls", "Data", "Data"),
            Err(XlsError::NotFound(_))
        ));
        assert!(matches!(
            lt.external_sheet_index("other.xls", "Nope", "Nope"),
            Err(XlsError::NotFound(_))
        ));
    }

    #[test]
    fn test_internal_refs_have_no_external_sheet() {
        let mut lt = LinkTable::new(2);
        let r = lt.check_extern_sheet(1).unwrap();
        assert_eq!(lt.external_sheet(r), None);
        assert_eq!(lt.first_internal_sheet_index_for_ext_index(r), Some(1));
        assert_eq!(lt.first_internal_sheet_index_for_ext_index(99), None);
    }

    #[test]
    fn test_name_x_ptg_registers_udf() {
        let mut lt = LinkTable::new(1);
        assert_eq!(lt.name_x_ptg("MYFUNC", None, &no_udf).unwrap(), None);

        let udf = |n: &str| n == "MYFUNC";
        let x = lt.name_x_ptg("MYFUNC", None, &udf).unwrap().unwrap();
        assert_eq!(x.name_index, 0);
        assert_eq!(lt.resolve_name_x_text(x.sheet_ref, x.name_index), Some("MYFUNC"));
        assert_eq!(lt.resolve_name_x_ix(x.sheet_ref, x.name_index), Some(0));

        // Found again without the resolver, case-insensitively.
        let again = lt.name_x_ptg("myfunc", None, &no_udf).unwrap();
        assert_eq!(again, Some(x));
        assert_eq!(lt.books().len(), 2);
        let r = lt.ref_at(x.sheet_ref).unwrap();
        assert_eq!((r.first_sheet, r.last_sheet), (ADD_IN_SHEET, ADD_IN_SHEET));
    }

    #[test]
    fn test_read_absorbs_the_run() {
        let mut es = ExternSheetRecord::default();
        es.add_ref(0, 0, 0);
        let recs = vec![
            Record::SupBook(SupBookRecord::internal(1)),
            Record::SupBook(SupBookRecord::add_in()),
            Record::ExternName(ExternNameRecord::add_in_function("F")),
            Record::ExternSheet(es),
            Record::Name(NameRecord::new_builtin(BUILTIN_PRINT_AREA, 1)),
            Record::Eof,
        ];
        let mut rs = RecordStream::new(recs.clone());
        let lt = LinkTable::read(&mut rs).unwrap();
        assert_eq!(lt.records_absorbed(), 5);
        assert_eq!(rs.peek_next_sid(), Some(crate::biff::records::EOF));
        assert!(lt.find_builtin_name(BUILTIN_PRINT_AREA, 1).is_some());

        let mut out: Vec<Record> = Vec::new();
        lt.visit_contained_records(&mut out);
        assert_eq!(out, recs[..5].to_vec());
    }

    #[test]
    fn test_remove_sheet_shifts_refs_and_scopes() {
        let mut lt = LinkTable::new(3);
        let r0 = lt.check_extern_sheet(0).unwrap();
        let r1 = lt.check_extern_sheet(1).unwrap();
        let r2 = lt.check_extern_sheet(2).unwrap();
        lt.add_name(NameRecord::new("a", 2));
        lt.add_name(NameRecord::new("b", 3));
        lt.remove_sheet(1);
        assert_eq!(lt.first_internal_sheet_index_for_ext_index(r0), Some(0));
        assert_eq!(lt.first_internal_sheet_index_for_ext_index(r1), Some(DELETED_SHEET));
        assert_eq!(lt.first_internal_sheet_index_for_ext_index(r2), Some(1));
        assert_eq!(lt.name_record(0).unwrap().sheet_number, 0);
        assert_eq!(lt.name_record(1).unwrap().sheet_number, 2);
    }

    #[test]
    fn test_remove_sheet_shrinks_spanning_ranges() {
        let mut lt = LinkTable::new(4);
        let single = lt.check_extern_sheet(0).unwrap();
        let book = lt.internal_book_index().unwrap();
        let span = |first_sheet, last_sheet| RefSubRecord {
            book,
            first_sheet,
            last_sheet,
        };
        if let Some(es) = lt.extern_sheet.as_mut() {
            es.refs.extend([span(0, 2), span(1, 3), span(2, 3)]);
        }
        fn range(lt: &LinkTable, r: u16) -> (i16, i16) {
            (
                lt.first_internal_sheet_index_for_ext_index(r).unwrap(),
                lt.last_internal_sheet_index_for_ext_index(r).unwrap(),
            )
        }
        lt.remove_sheet(1);
        assert_eq!(range(&lt, single), (0, 0));
        assert_eq!(range(&lt, single + 1), (0, 1));
        assert_eq!(range(&lt, single + 2), (1, 2));
        assert_eq!(range(&lt, single + 3), (1, 2));

        lt.remove_sheet(0);
        assert_eq!(range(&lt, single), (DELETED_SHEET, DELETED_SHEET));
        assert_eq!(range(&lt, single + 1), (0, 0));
    }

    #[test]
    fn test_names() {
        let mut lt = LinkTable::new(1);
        assert_eq!(lt.add_name(NameRecord::new("Total", 0)), 0);
        assert_eq!(lt.find_name("TOTAL", 0), Some(0));
        assert_eq!(lt.find_name("TOTAL", 1), None);
        assert!(lt.remove_name(5).is_none());
        assert!(lt.remove_name(0).is_some());
        assert_eq!(lt.num_names(), 0);
    }
}
