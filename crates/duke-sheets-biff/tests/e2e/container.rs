//! Compound file round trips on disk.

use crate::document_with_cells;
use duke_sheets_biff::container::{read_workbook_stream_from_file, write_workbook_stream_to_file};
use duke_sheets_biff::BiffDocument;
use pretty_assertions::assert_eq;

#[test]
fn test_save_and_open_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("book.xls");

    let mut doc = document_with_cells(&[(0, 0), (1, 1)]);
    doc.create_sheet("Second").unwrap();
    doc.save_file(&path).unwrap();

    let mut back = BiffDocument::open_file(&path).unwrap();
    assert_eq!(back.num_sheets(), 2);
    assert_eq!(back.workbook().sheet_name(1), Some("Second"));
    assert_eq!(back.sheet(0).unwrap().rows().num_cells(), 2);
    assert_eq!(back.to_stream_bytes().unwrap(), doc.to_stream_bytes().unwrap());
}

#[test]
fn test_raw_stream_file_round_trip() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let data = vec![7u8; 10_000];
    write_workbook_stream_to_file(file.path(), &data).unwrap();
    assert_eq!(read_workbook_stream_from_file(file.path()).unwrap(), data);
}
