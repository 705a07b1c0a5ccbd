use crate::biff::records::MERGECELLS;
use crate::error::{XlsError, XlsResult};
use crate::record::{CellRangeAddress, MergeCellsRecord, Record};
use crate::stream::RecordStream;

use super::{RecordAggregate, RecordVisitor};

/// Most ranges Excel puts in one MERGECELLS record.
pub const MAX_MERGED_REGIONS_PER_RECORD: usize = 1027;

/// All merged regions of a sheet, written as one or more MERGECELLS.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedCellsTable {
    ranges: Vec<CellRangeAddress>,
}

impl MergedCellsTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume a run of MERGECELLS records.
    pub fn read(&mut self, rs: &mut RecordStream) -> XlsResult<()> {
        while let Some(rec) = rs.next_if_sid(MERGECELLS) {
            self.add_record(rec)?;
        }
        Ok(())
    }

    /// Merge a MERGECELLS record found out of place.
    pub fn add_record(&mut self, rec: Record) -> XlsResult<()> {
        match rec {
            Record::MergeCells(m) => {
                self.ranges.extend(m.ranges);
                Ok(())
            }
            other => Err(XlsError::structural(
                other.sid(),
                "malformed MERGECELLS record",
            )),
        }
    }

    /// Add a region (0-based, inclusive). Returns its index.
    pub fn add_area(
        &mut self,
        first_row: u16,
        first_col: u16,
        last_row: u16,
        last_col: u16,
    ) -> XlsResult<usize> {
        if last_row < first_row {
            return Err(XlsError::invalid_argument(format!(
                "merged region last row {last_row} is before first row {first_row}"
            )));
        }
        if last_col < first_col {
            return Err(XlsError::invalid_argument(format!(
                "merged region last column {last_col} is before first column {first_col}"
            )));
        }
        self.ranges
            .push(CellRangeAddress::new(first_row, last_row, first_col, last_col));
        Ok(self.ranges.len() - 1)
    }

    /// Out of range is a no-op.
    pub fn remove(&mut self, index: usize) {
        if index < self.ranges.len() {
            self.ranges.remove(index);
        }
    }

    pub fn get(&self, index: usize) -> Option<&CellRangeAddress> {
        self.ranges.get(index)
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CellRangeAddress> {
        self.ranges.iter()
    }
}

impl RecordAggregate for MergedCellsTable {
    fn visit_contained_records(&self, visitor: &mut dyn RecordVisitor) {
        for chunk in self.ranges.chunks(MAX_MERGED_REGIONS_PER_RECORD) {
            visitor.visit_record(&Record::MergeCells(MergeCellsRecord {
                ranges: chunk.to_vec(),
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_area_validates() {
        let mut t = MergedCellsTable::new();
        assert_eq!(t.add_area(1, 1, 3, 3).unwrap(), 0);
        assert!(matches!(
            t.add_area(5, 5, 4, 4),
            Err(XlsError::InvalidArgument(_))
        ));
        assert_eq!(t.len(), 1);
        assert_eq!(t.get(0), Some(&CellRangeAddress::new(1, 3, 1, 3)));
        assert_eq!(t.get(1), None);
    }

    #[test]
    fn test_remove_out_of_range_is_noop() {
        let mut t = MergedCellsTable::new();
        t.add_area(0, 0, 1, 1).unwrap();
        t.remove(7);
        assert_eq!(t.len(), 1);
        t.remove(0);
        assert!(t.is_empty());
    }

    #[test]
    fn test_splits_into_records_of_1027() {
        let mut t = MergedCellsTable::new();
        for i in 0..2000u16 {
            t.add_area(i, 0, i, 1).unwrap();
        }
        let recs = t.records();
        assert_eq!(recs.len(), 2);
        match (&recs[0], &recs[1]) {
            (Record::MergeCells(a), Record::MergeCells(b)) => {
                assert_eq!(a.ranges.len(), 1027);
                assert_eq!(b.ranges.len(), 973);
            }
            other => panic!("unexpected records {other:?}"),
        }
    }

    #[test]
    fn test_read_run() {
        let mut rs = RecordStream::new(vec![
            Record::MergeCells(MergeCellsRecord {
                ranges: vec![CellRangeAddress::new(0, 1, 0, 1)],
            }),
            Record::MergeCells(MergeCellsRecord {
                ranges: vec![CellRangeAddress::new(2, 3, 0, 1)],
            }),
            Record::Eof,
        ]);
        let mut t = MergedCellsTable::new();
        t.read(&mut rs).unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(rs.count_read(), 2);
    }
}
