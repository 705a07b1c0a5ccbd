//! Splits the row/cell region of a sheet stream before the rows are built.

use crate::biff::records::{ARRAY, FORMULA, MERGECELLS, SHRFMLA, TABLE};
use crate::error::{XlsError, XlsResult};
use crate::ordering::is_end_of_row_block;
use crate::record::{ArrayRecord, Record, SharedFormulaRecord, TableRecord};
use crate::stream::RecordStream;

use super::shared_values::SharedValueManager;

/// Records of one row block region, sorted by role.
#[derive(Debug, Default)]
pub struct RowBlocksReader {
    plain: Vec<Record>,
    shared: Vec<SharedFormulaRecord>,
    first_cells: Vec<(u16, u16)>,
    arrays: Vec<ArrayRecord>,
    tables: Vec<TableRecord>,
    merged: Vec<Record>,
}

fn malformed(sid: u16) -> XlsError {
    XlsError::structural(sid, "malformed record in row block")
}

impl RowBlocksReader {
    /// Consume records up to the first row-block terminator.
    pub fn read(rs: &mut RecordStream) -> XlsResult<Self> {
        let mut reader = RowBlocksReader::default();
        // Cell of the previous record when it was a FORMULA.
        let mut prev: Option<(u16, u16)> = None;
        loop {
            let sid = rs.peek_next_sid().ok_or_else(|| {
                XlsError::structural(FORMULA, "failed to find end of row/cell records")
            })?;
            if is_end_of_row_block(sid)? {
                break;
            }
            let rec = rs.next()?;
            let this = match &rec {
                Record::Formula(f) => Some((f.row, f.col)),
                _ => None,
            };
            match sid {
                MERGECELLS => reader.merged.push(rec),
                SHRFMLA => {
                    let Some((row, col)) = prev else {
                        return Err(XlsError::structural(
                            SHRFMLA,
                            "shared formula record should follow a FORMULA record",
                        ));
                    };
                    let Record::SharedFormula(r) = rec else {
                        return Err(malformed(SHRFMLA));
                    };
                    reader.first_cells.push((row, col));
                    reader.shared.push(r);
                }
                ARRAY => match rec {
                    Record::Array(r) => reader.arrays.push(r),
                    _ => return Err(malformed(ARRAY)),
                },
                TABLE => match rec {
                    Record::Table(r) => reader.tables.push(r),
                    _ => return Err(malformed(TABLE)),
                },
                _ => reader.plain.push(rec),
            }
            prev = this;
        }
        log::trace!(
            "row block: {} plain, {} shared, {} array, {} table records",
            reader.plain.len(),
            reader.shared.len(),
            reader.arrays.len(),
            reader.tables.len()
        );
        Ok(reader)
    }

    /// MERGECELLS records some producers put among the cells.
    pub fn loose_merged_cells(&self) -> &[Record] {
        &self.merged
    }

    pub fn plain_records(&self) -> &[Record] {
        &self.plain
    }

    /// Split into the resolver, the plain records and the stray MERGECELLS.
    pub fn into_parts(self) -> XlsResult<(SharedValueManager, Vec<Record>, Vec<Record>)> {
        let svm =
            SharedValueManager::create(self.shared, self.first_cells, self.arrays, self.tables)?;
        Ok((svm, self.plain, self.merged))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biff::records::WINDOW2;
    use crate::record::{CellRangeAddress8, FormulaRecord, NumberRecord, RowRecord};

    fn shrfmla() -> Record {
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
        })
    }

    #[test]
    fn test_shrfmla_without_formula_is_structural() {
        let mut rs = RecordStream::new(vec![
            Record::Row(RowRecord::new(0)),
            Record::Number(NumberRecord {
                row: 0,
                col: 0,
                xf: 15,
                value: 1.0,
            }),
            shrfmla(),
            Record::Window2(Default::default()),
        ]);
        match RowBlocksReader::read(&mut rs) {
            Err(XlsError::Structural { sid, .. }) => assert_eq!(sid, SHRFMLA),
            other => panic!("expected structural error, got {other:?}"),
        }
    }

    #[test]
    fn test_classifies_records() {
        let mut f = FormulaRecord::new(0, 0, 15, &[0x01, 0, 0, 0, 0]);
        f.set_shared(true);
        let mut rs = RecordStream::new(vec![
            Record::Row(RowRecord::new(0)),
            Record::Formula(f),
            shrfmla(),
            Record::MergeCells(Default::default()),
            Record::Window2(Default::default()),
        ]);
        let reader = RowBlocksReader::read(&mut rs).unwrap();
        assert_eq!(rs.peek_next_sid(), Some(WINDOW2));
        assert_eq!(reader.plain_records().len(), 2);
        assert_eq!(reader.loose_merged_cells().len(), 1);
        let (svm, _, _) = reader.into_parts().unwrap();
        assert!(svm.shared_formula((0, 0)).is_some());
    }

    #[test]
    fn test_eof_in_row_block() {
        let mut rs = RecordStream::new(vec![Record::Row(RowRecord::new(0)), Record::Eof]);
        assert!(RowBlocksReader::read(&mut rs).is_err());
    }
}
