//! Writing a document and reading it back reproduces the same bytes.

use crate::{document_with_cells, number, reread_sheet, worksheet_records};
use duke_sheets_biff::aggregates::CellValue;
use duke_sheets_biff::biff::records::{
    ARRAY, BLANK, BOF, DBCELL, DIMENSION, EOF, FORMULA, INDEX, MULBLANK, MULRK, RK, SHRFMLA,
    STRING, TABLE,
};
use duke_sheets_biff::biff::strings::XlString;
use duke_sheets_biff::record::{
    ArrayRecord, BlankRecord, BofRecord, CellRangeAddress8, FormulaRecord, MulRkRecord, Record,
    RowRecord, SharedFormulaRecord, StringRecord, TableRecord, Window2Record,
};
use duke_sheets_biff::{BiffDocument, RecordStream, Sheet, Workbook};
use pretty_assertions::assert_eq;

const UNKNOWN_SID: u16 = 0x0999;

fn one_column(row: u16, last_row: u16) -> CellRangeAddress8 {
    CellRangeAddress8 {
        first_row: row,
        last_row,
        first_col: 0,
        last_col: 0,
    }
}

/// A worksheet whose row region holds every kind of cell record a file
/// from Excel can carry, plus one record type nothing models.
fn mixed_cell_sheet() -> Vec<Record> {
    let mut text = FormulaRecord::new(2, 0, 15, &[0x1E, 1, 0]);
    text.result = [0, 0, 0, 0, 0, 0, 0xFF, 0xFF];
    let mut anchor = FormulaRecord::new(3, 0, 15, &[0x01, 3, 0, 0, 0]);
    anchor.set_shared(true);
    let mut follower = FormulaRecord::new(4, 0, 15, &[0x01, 3, 0, 0, 0]);
    follower.set_shared(true);

    let mut recs = vec![Record::Bof(BofRecord::worksheet())];
    recs.extend((0..7).map(|r| Record::Row(RowRecord::new(r))));
    recs.extend([
        Record::MulRk(MulRkRecord {
            row: 0,
            first_col: 0,
            cells: vec![(15, (1 << 2) | 0x02), (15, (2 << 2) | 0x02)],
        }),
        Record::Blank(BlankRecord { row: 1, col: 0, xf: 15 }),
        Record::Blank(BlankRecord { row: 1, col: 1, xf: 15 }),
        Record::Formula(text),
        Record::FormulaString(StringRecord {
            text: XlString::new("cached"),
        }),
        Record::Formula(anchor),
        Record::SharedFormula(SharedFormulaRecord {
            range: one_column(3, 4),
            reserved: 0,
            use_count: 2,
            formula: vec![3, 0, 0x1E, 1, 0],
        }),
        Record::Formula(follower),
        Record::Formula(FormulaRecord::new(5, 0, 15, &[0x01, 5, 0, 0, 0])),
        Record::Array(ArrayRecord {
            range: one_column(5, 5),
            options: 0,
            reserved: 0,
            formula: vec![3, 0, 0x1E, 2, 0],
        }),
        Record::Formula(FormulaRecord::new(6, 0, 15, &[0x02, 6, 0, 0, 0])),
        Record::Table(TableRecord {
            range: one_column(6, 6),
            body: vec![0; 6],
        }),
        Record::raw(UNKNOWN_SID, vec![1, 2, 3]),
        Record::Window2(Window2Record::default()),
        Record::Eof,
    ]);
    recs
}

fn count(recs: &[Record], sid: u16) -> usize {
    recs.iter().filter(|r| r.sid() == sid).count()
}

fn sid_after_formula(recs: &[Record], row: u16) -> Option<u16> {
    let at = recs
        .iter()
        .position(|r| matches!(r, Record::Formula(f) if f.row == row && f.col == 0))?;
    recs.get(at + 1).map(Record::sid)
}

#[test]
fn test_new_document_bytes_are_stable() {
    let mut doc = document_with_cells(&[(0, 0), (0, 3), (5, 1), (70, 2)]);
    let first = doc.to_stream_bytes().unwrap();
    let mut back = BiffDocument::from_stream_bytes(&first).unwrap();
    let second = back.to_stream_bytes().unwrap();
    assert_eq!(first.len(), second.len());
    assert_eq!(first, second);
}

#[test]
fn test_mutated_sheet_survives_round_trip() {
    let mut doc = BiffDocument::new();
    {
        let sheet = doc.sheet_mut(0).unwrap();
        sheet.add_value_record(number(2, 2, 42.0)).unwrap();
        sheet.add_merged_region(0, 0, 1, 3).unwrap();
        sheet.create_freeze_pane(1, 1, 1, 1).unwrap();
        sheet.set_column_width(3, 4000);
        sheet.group_row_range(4, 6, true).unwrap();
        sheet
            .protection_block()
            .unwrap()
            .protect_sheet(Some("pw"), true, false);
        sheet.page_settings().unwrap().set_header("&CTitle");
    }
    let bytes = doc.to_stream_bytes().unwrap();
    let back = BiffDocument::from_stream_bytes(&bytes).unwrap();
    let sheet = back.sheet(0).unwrap();

    assert!(matches!(
        sheet.value_at(2, 2),
        Some(duke_sheets_biff::aggregates::CellValue::Number(n)) if n.value == 42.0
    ));
    assert_eq!(sheet.num_merged_regions(), 1);
    assert!(sheet.pane_information().unwrap().frozen);
    assert_eq!(sheet.column_width(3), 4000);
    assert!(sheet.protection().unwrap().is_sheet_protected());
    assert_eq!(
        sheet.page_settings_block().unwrap().header_text(),
        Some("&CTitle")
    );
    assert_eq!(
        back.sheet(0).unwrap().records().unwrap(),
        doc.sheet(0).unwrap().records().unwrap()
    );
}

#[test]
fn test_sheet_read_from_fixture_records() {
    let recs = worksheet_records(&[(1, 1), (1, 4), (3, 0)]);
    let sheet = Sheet::from_stream(&mut RecordStream::new(recs)).unwrap();
    let out = sheet.records().unwrap();
    assert_eq!(out.first().map(Record::sid), Some(BOF));
    assert_eq!(out.last().map(Record::sid), Some(EOF));
    assert_eq!(out.get(1).map(Record::sid), Some(INDEX));
    assert!(out.iter().any(|r| r.sid() == DIMENSION));
    assert_eq!(sheet.rows().num_cells(), 3);
}

#[test]
fn test_globals_record_list_round_trip() {
    let wb = Workbook::new();
    let recs = wb.records().unwrap();
    let back = Workbook::from_stream(&mut RecordStream::new(recs.clone())).unwrap();
    assert_eq!(back.records().unwrap(), recs);
}

#[test]
fn test_mixed_cell_records_keep_membership() {
    let sheet = Sheet::from_stream(&mut RecordStream::new(mixed_cell_sheet())).unwrap();
    let out = sheet.records().unwrap();

    assert_eq!(count(&out, FORMULA), 5);
    for sid in [SHRFMLA, ARRAY, TABLE, STRING, UNKNOWN_SID, DBCELL] {
        assert_eq!(count(&out, sid), 1, "sid {sid:#06x}");
    }
    // MULRK comes back as one RK per cell, the BLANK pair as one MULBLANK.
    assert_eq!((count(&out, MULRK), count(&out, RK)), (0, 2));
    assert_eq!((count(&out, BLANK), count(&out, MULBLANK)), (0, 1));

    // Group records follow the FORMULA of their first cell.
    for (row, sid) in [(2, STRING), (3, SHRFMLA), (5, ARRAY), (6, TABLE)] {
        assert_eq!(sid_after_formula(&out, row), Some(sid), "row {row}");
    }

    assert!(matches!(sheet.value_at(0, 1), Some(CellValue::Rk(rk)) if rk.value() == 2.0));
    assert!(matches!(
        sheet.value_at(2, 0),
        Some(CellValue::Formula(f)) if f.string.is_some()
    ));
    assert!(sheet.rows().shared_value_at(4, 0).is_some());
    assert!(sheet.rows().shared_value_at(5, 0).is_some());
    assert!(sheet.rows().shared_value_at(6, 0).is_some());

    assert_eq!(reread_sheet(&sheet).records().unwrap(), out);
}

#[test]
fn test_mixed_cell_records_keep_their_bytes() {
    let mut records = Workbook::new().records().unwrap();
    records.extend(mixed_cell_sheet());
    let mut doc = BiffDocument::from_records(records).unwrap();
    let first = doc.to_stream_bytes().unwrap();
    let mut back = BiffDocument::from_stream_bytes(&first).unwrap();
    assert_eq!(back.to_stream_bytes().unwrap(), first);
    assert_eq!(
        back.sheet(0).unwrap().records().unwrap(),
        doc.sheet(0).unwrap().records().unwrap()
    );
}
