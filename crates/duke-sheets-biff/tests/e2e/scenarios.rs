//! The behaviours a caller relies on, one scenario each.

use duke_sheets_biff::aggregates::row_blocks::RowBlocksReader;
use duke_sheets_biff::biff::records::{EOF, MERGECELLS, SHRFMLA};
use duke_sheets_biff::record::{
    CellRangeAddress8, NumberRecord, Record, RowRecord, SharedFormulaRecord, Window2Record,
};
use duke_sheets_biff::{RecordStream, Sheet, Workbook, XlsError};
use pretty_assertions::assert_eq;

#[test]
fn test_empty_workbook() {
    let wb = Workbook::new();
    assert_eq!(wb.num_sheets(), 1);
    assert_eq!(wb.sheet_name(0), Some("Sheet1"));
    for i in [0u16, 1, 2, 3] {
        assert!(wb.font_at(i).is_some(), "font {i}");
    }
    assert!(wb.font_at(4).is_none());
    assert!(wb.font_at(5).is_none());

    let mut wb = wb;
    let idx = wb.create_new_font(Default::default());
    assert_eq!(idx, 5);
    assert!(wb.font_at(5).is_some());

    let eofs = wb
        .records()
        .unwrap()
        .iter()
        .filter(|r| r.sid() == EOF)
        .count();
    assert_eq!(eofs, 1);
}

#[test]
fn test_merged_region_validation() {
    let mut sheet = Sheet::create_sheet();
    assert_eq!(sheet.add_merged_region(1, 1, 3, 3).unwrap(), 0);
    assert_eq!(sheet.num_merged_regions(), 1);
    assert!(matches!(
        sheet.add_merged_region(5, 5, 4, 4),
        Err(XlsError::InvalidArgument(_))
    ));
    assert_eq!(sheet.num_merged_regions(), 1);
}

#[test]
fn test_merged_regions_split_across_records() {
    let mut sheet = Sheet::create_sheet();
    for i in 0..1028u16 {
        sheet.add_merged_region(i, 0, i, 1).unwrap();
    }
    let records = sheet.records().unwrap();
    let merged: Vec<&Record> = records.iter().filter(|r| r.sid() == MERGECELLS).collect();
    assert_eq!(merged.len(), 2);
    assert_eq!(crate::reread_sheet(&sheet).num_merged_regions(), 1028);
}

#[test]
fn test_shared_formula_without_formula() {
    let recs = vec![
        Record::Row(RowRecord::new(0)),
        Record::Number(NumberRecord {
            row: 0,
            col: 0,
            xf: 15,
            value: 1.0,
        }),
        Record::SharedFormula(SharedFormulaRecord {
            range: CellRangeAddress8 {
                first_row: 0,
                last_row: 1,
                first_col: 0,
                last_col: 0,
            },
            reserved: 0,
            use_count: 2,
            formula: vec![0, 0],
        }),
        Record::Window2(Window2Record::default()),
    ];
    match RowBlocksReader::read(&mut RecordStream::new(recs)) {
        Err(XlsError::Structural { sid, .. }) => assert_eq!(sid, SHRFMLA),
        other => panic!("expected a structural error, got {other:?}"),
    }
}

#[test]
fn test_dimensions_track_cells() {
    let mut sheet = Sheet::create_sheet();
    sheet.add_value_record(crate::number(7, 3, 0.0)).unwrap();
    let d = sheet.dimensions().unwrap();
    assert_eq!((d.first_row, d.last_row, d.first_col, d.last_col), (7, 8, 3, 4));
}

#[test]
fn test_row_range_rejects_reversed_bounds() {
    let mut sheet = Sheet::create_sheet();
    assert!(matches!(
        sheet.group_row_range(5, 2, true),
        Err(XlsError::InvalidArgument(_))
    ));
}
