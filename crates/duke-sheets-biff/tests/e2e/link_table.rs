//! External references and defined names through the workbook.

use duke_sheets_biff::record::workbook::BUILTIN_PRINT_AREA;
use duke_sheets_biff::record::NameRecord;
use duke_sheets_biff::{BiffDocument, RecordStream, Workbook, XlsError};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

proptest! {
    #[test]
    fn prop_extern_sheet_is_idempotent(sheets in prop::collection::vec(0u16..3, 1..20)) {
        let mut wb = Workbook::new();
        wb.create_bound_sheet("B").unwrap();
        wb.create_bound_sheet("C").unwrap();
        for &s in &sheets {
            let a = wb.check_extern_sheet(s).unwrap();
            let b = wb.check_extern_sheet(s).unwrap();
            prop_assert_eq!(a, b);
            prop_assert_eq!(wb.first_sheet_index_from_extern_sheet_index(a), Some(s as i16));
        }
    }
}

#[test]
fn test_names_survive_round_trip() {
    let mut doc = BiffDocument::new();
    doc.create_sheet("Data").unwrap();
    let wb = doc.workbook_mut();
    wb.create_builtin_name(BUILTIN_PRINT_AREA, 2).unwrap();
    wb.create_name(NameRecord::new("Total", 0));
    let r = wb.check_extern_sheet(1).unwrap();

    let bytes = doc.to_stream_bytes().unwrap();
    let back = BiffDocument::from_stream_bytes(&bytes).unwrap();
    let wb = back.workbook();
    assert_eq!(wb.num_names(), 2);
    assert!(wb.find_builtin_name(BUILTIN_PRINT_AREA, 2).is_some());
    assert_eq!(wb.first_sheet_index_from_extern_sheet_index(r), Some(1));
}

#[test]
fn test_removing_a_sheet_rescopes_names() {
    let mut doc = BiffDocument::new();
    doc.create_sheet("B").unwrap();
    doc.create_sheet("C").unwrap();
    let wb = doc.workbook_mut();
    wb.create_name(NameRecord::new("OnB", 2));
    wb.create_name(NameRecord::new("OnC", 3));
    let ref_c = wb.check_extern_sheet(2).unwrap();

    doc.remove_sheet(1).unwrap();
    let wb = doc.workbook();
    assert_eq!(wb.name_record(0).unwrap().sheet_number, 0);
    assert_eq!(wb.name_record(1).unwrap().sheet_number, 2);
    assert_eq!(wb.first_sheet_index_from_extern_sheet_index(ref_c), Some(1));
}

#[test]
fn test_udf_name_registers_add_in_book() {
    let mut wb = Workbook::new();
    let is_udf = |name: &str| name.eq_ignore_ascii_case("MYFUNC");
    let r = wb.name_x_ptg("MyFunc", None, &is_udf).unwrap().unwrap();
    assert_eq!(wb.resolve_name_x_text(r.sheet_ref, r.name_index), Some("MyFunc"));
    assert_eq!(wb.name_x_ptg("Other", None, &is_udf).unwrap(), None);

    let back = Workbook::from_stream(&mut RecordStream::new(wb.records().unwrap())).unwrap();
    assert_eq!(back.resolve_name_x_text(r.sheet_ref, r.name_index), Some("MyFunc"));
}

#[test]
fn test_unknown_external_book() {
    let mut wb = Workbook::new();
    assert!(matches!(
        wb.external_sheet_index("other.xls", "Sheet1", "Sheet1"),
        Err(XlsError::NotFound(_))
    ));
}
