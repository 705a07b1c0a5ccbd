//! Common fixtures for the BIFF8 model E2E tests.

use duke_sheets_biff::aggregates::CellValue;
use duke_sheets_biff::drawing::{Shape, ShapeAnchor, ShapeStyle};
use duke_sheets_biff::record::{BofRecord, NumberRecord, Record, RowRecord, Window2Record};
use duke_sheets_biff::{BiffDocument, Sheet};

pub fn number(row: u16, col: u16, value: f64) -> CellValue {
    CellValue::Number(NumberRecord {
        row,
        col,
        xf: 15,
        value,
    })
}

/// A minimal worksheet substream holding one number per `(row, col)`.
pub fn worksheet_records(cells: &[(u16, u16)]) -> Vec<Record> {
    let mut recs = vec![Record::Bof(BofRecord::worksheet())];
    let mut rows: Vec<u16> = cells.iter().map(|&(r, _)| r).collect();
    rows.sort_unstable();
    rows.dedup();
    recs.extend(rows.iter().map(|&r| Record::Row(RowRecord::new(r))));
    recs.extend(cells.iter().map(|&(row, col)| {
        Record::Number(NumberRecord {
            row,
            col,
            xf: 15,
            value: (row as f64) * 1000.0 + col as f64,
        })
    }));
    recs.push(Record::Window2(Window2Record::default()));
    recs.push(Record::Eof);
    recs
}

/// A new document whose first sheet holds `cells`.
pub fn document_with_cells(cells: &[(u16, u16)]) -> BiffDocument {
    let mut doc = BiffDocument::new();
    if let Some(sheet) = doc.sheet_mut(0) {
        for &(row, col) in cells {
            sheet
                .add_value_record(number(row, col, 1.0))
                .expect("fixture cell");
        }
    }
    doc
}

/// Write a sheet, dropping the derived INDEX, and read it back.
pub fn reread_sheet(sheet: &Sheet) -> Sheet {
    let mut recs = sheet.records().expect("flatten sheet");
    recs.retain(|r| r.sid() != duke_sheets_biff::biff::records::INDEX);
    Sheet::from_stream(&mut duke_sheets_biff::RecordStream::new(recs)).expect("reread sheet")
}

pub fn textbox(row: u16) -> Shape {
    Shape::Textbox {
        anchor: ShapeAnchor {
            row1: row,
            row2: row + 2,
            col2: 2,
            ..ShapeAnchor::default()
        },
        style: ShapeStyle::default(),
        text: format!("box {row}"),
        margins: [0; 4],
    }
}
