//! Formulas stored once for a group of cells: shared formulas (SHRFMLA),
//! array formulas (ARRAY) and data tables (TABLE).
//!
//! Follower FORMULA cells carry a PtgExp token naming the group's first
//! cell. The group record is written right after that first cell's FORMULA.

use crate::biff::records::SHRFMLA;
use crate::error::{XlsError, XlsResult};
use crate::record::{ArrayRecord, CellRangeAddress8, Record, SharedFormulaRecord, TableRecord};

/// The definition a cell inherits from its group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SharedValue<'a> {
    Shared(&'a SharedFormulaRecord),
    Array(&'a ArrayRecord),
    Table(&'a TableRecord),
}

impl SharedValue<'_> {
    pub fn range(&self) -> CellRangeAddress8 {
        match self {
            SharedValue::Shared(r) => r.range,
            SharedValue::Array(r) => r.range,
            SharedValue::Table(r) => r.range,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SharedFormulaGroup {
    /// Cell whose FORMULA the SHRFMLA followed in the stream.
    first_cell: (u16, u16),
    record: SharedFormulaRecord,
}

fn is_first_cell(range: &CellRangeAddress8, row: u16, col: u16) -> bool {
    range.first_row == row && range.first_col as u16 == col
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SharedValueManager {
    shared: Vec<SharedFormulaGroup>,
    arrays: Vec<ArrayRecord>,
    tables: Vec<TableRecord>,
}

impl SharedValueManager {
    pub fn empty() -> Self {
        Self::default()
    }

    /// `first_cells[i]` is the cell of the FORMULA that preceded
    /// `shared[i]` in the stream.
    pub fn create(
        shared: Vec<SharedFormulaRecord>,
        first_cells: Vec<(u16, u16)>,
        arrays: Vec<ArrayRecord>,
        tables: Vec<TableRecord>,
    ) -> XlsResult<Self> {
        if shared.len() != first_cells.len() {
            return Err(XlsError::invalid_argument(format!(
                "{} shared formulas but {} first cells",
                shared.len(),
                first_cells.len()
            )));
        }
        let shared = shared
            .into_iter()
            .zip(first_cells)
            .map(|(record, first_cell)| SharedFormulaGroup { first_cell, record })
            .collect();
        Ok(SharedValueManager {
            shared,
            arrays,
            tables,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.shared.is_empty() && self.arrays.is_empty() && self.tables.is_empty()
    }

    pub fn shared_formula(&self, first_cell: (u16, u16)) -> Option<&SharedFormulaRecord> {
        self.shared
            .iter()
            .find(|g| g.first_cell == first_cell)
            .map(|g| &g.record)
    }

    /// Check that a shared-formula cell pointing at `first_cell` has a group.
    pub fn link_shared_formula(&self, first_cell: (u16, u16)) -> XlsResult<&SharedFormulaRecord> {
        self.shared_formula(first_cell).ok_or_else(|| {
            XlsError::structural(
                SHRFMLA,
                format!(
                    "no shared formula record for first cell R{}C{}",
                    first_cell.0, first_cell.1
                ),
            )
        })
    }

    /// Group anchored at `(row, col)`, keyed the way follower PtgExp tokens
    /// name it.
    pub fn resolve_exp(&self, row: u16, col: u16) -> Option<SharedValue<'_>> {
        if let Some(r) = self.shared_formula((row, col)) {
            return Some(SharedValue::Shared(r));
        }
        if let Some(a) = self.arrays.iter().find(|a| is_first_cell(&a.range, row, col)) {
            return Some(SharedValue::Array(a));
        }
        self.tables
            .iter()
            .find(|t| is_first_cell(&t.range, row, col))
            .map(SharedValue::Table)
    }

    /// Group whose range covers `(row, col)`.
    pub fn covering(&self, row: u16, col: u16) -> Option<SharedValue<'_>> {
        if let Some(g) = self.shared.iter().find(|g| g.record.range.contains(row, col)) {
            return Some(SharedValue::Shared(&g.record));
        }
        if let Some(a) = self.arrays.iter().find(|a| a.range.contains(row, col)) {
            return Some(SharedValue::Array(a));
        }
        self.tables
            .iter()
            .find(|t| t.range.contains(row, col))
            .map(SharedValue::Table)
    }

    /// The group record written after the FORMULA at `(row, col)`, if that
    /// cell is a group's first cell.
    pub fn record_for_first_cell(&self, row: u16, col: u16) -> Option<Record> {
        if let Some(r) = self.shared_formula((row, col)) {
            return Some(Record::SharedFormula(r.clone()));
        }
        if let Some(a) = self.arrays.iter().find(|a| is_first_cell(&a.range, row, col)) {
            return Some(Record::Array(a.clone()));
        }
        self.tables
            .iter()
            .find(|t| is_first_cell(&t.range, row, col))
            .map(|t| Record::Table(t.clone()))
    }

    /// Take out the ARRAY and TABLE records whose first cell fails
    /// `has_formula`. Nothing else would write them.
    pub fn take_unanchored(&mut self, has_formula: impl Fn(u16, u16) -> bool) -> Vec<Record> {
        let mut out = Vec::new();
        let (kept, lost): (Vec<_>, Vec<_>) = std::mem::take(&mut self.arrays)
            .into_iter()
            .partition(|a| has_formula(a.range.first_row, a.range.first_col as u16));
        self.arrays = kept;
        out.extend(lost.into_iter().map(Record::Array));
        let (kept, lost): (Vec<_>, Vec<_>) = std::mem::take(&mut self.tables)
            .into_iter()
            .partition(|t| has_formula(t.range.first_row, t.range.first_col as u16));
        self.tables = kept;
        out.extend(lost.into_iter().map(Record::Table));
        out
    }

    pub fn is_anchor(&self, row: u16, col: u16) -> bool {
        self.resolve_exp(row, col).is_some()
    }

    pub fn add_array_formula(&mut self, record: ArrayRecord) -> XlsResult<()> {
        let r = record.range;
        if self.arrays.iter().any(|a| a.range.contains(r.first_row, r.first_col as u16)) {
            return Err(XlsError::invalid_argument(format!(
                "array formula at R{}C{} overlaps an existing one",
                r.first_row, r.first_col
            )));
        }
        self.arrays.push(record);
        Ok(())
    }

    /// Remove the array formula covering `(row, col)`; returns its range.
    pub fn remove_array_formula(&mut self, row: u16, col: u16) -> Option<CellRangeAddress8> {
        let i = self.arrays.iter().position(|a| a.range.contains(row, col))?;
        Some(self.arrays.remove(i).range)
    }

    pub fn num_shared_formulas(&self) -> usize {
        self.shared.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biff::records::{ARRAY, TABLE};

    fn range(r0: u16, r1: u16, c0: u8, c1: u8) -> CellRangeAddress8 {
        CellRangeAddress8 {
            first_row: r0,
            last_row: r1,
            first_col: c0,
            last_col: c1,
        }
    }

    fn manager() -> SharedValueManager {
        let shr = SharedFormulaRecord {
            range: range(0, 9, 1, 1),
            reserved: 0,
            use_count: 10,
            formula: vec![3, 0, 0x1E, 1, 0],
        };
        let arr = ArrayRecord {
            range: range(20, 21, 0, 0),
            options: 0,
            reserved: 0,
            formula: vec![0, 0],
        };
        SharedValueManager::create(vec![shr], vec![(0, 1)], vec![arr], vec![]).unwrap()
    }

    #[test]
    fn test_first_cell_lookup() {
        let svm = manager();
        assert!(matches!(svm.record_for_first_cell(0, 1), Some(Record::SharedFormula(_))));
        assert!(svm.record_for_first_cell(1, 1).is_none());
        assert!(matches!(svm.record_for_first_cell(20, 0), Some(Record::Array(_))));
        assert!(svm.is_anchor(0, 1));
    }

    #[test]
    fn test_link_and_cover() {
        let svm = manager();
        assert!(svm.link_shared_formula((0, 1)).is_ok());
        assert!(matches!(
            svm.link_shared_formula((5, 5)),
            Err(XlsError::Structural { sid: SHRFMLA, .. })
        ));
        assert!(matches!(svm.covering(5, 1), Some(SharedValue::Shared(_))));
        assert!(matches!(svm.covering(21, 0), Some(SharedValue::Array(_))));
        assert!(svm.covering(30, 0).is_none());
    }

    #[test]
    fn test_array_add_remove() {
        let mut svm = manager();
        let dup = ArrayRecord {
            range: range(21, 22, 0, 0),
            options: 0,
            reserved: 0,
            formula: vec![0, 0],
        };
        assert!(svm.add_array_formula(dup).is_err());
        assert_eq!(svm.remove_array_formula(21, 0), Some(range(20, 21, 0, 0)));
        assert_eq!(svm.remove_array_formula(21, 0), None);
    }

    #[test]
    fn test_take_unanchored_groups() {
        let mut svm = manager();
        svm.tables.push(TableRecord {
            range: range(30, 31, 2, 3),
            body: vec![0; 8],
        });
        let taken = svm.take_unanchored(|row, col| (row, col) == (20, 0));
        assert_eq!(taken.iter().map(Record::sid).collect::<Vec<_>>(), vec![TABLE]);
        assert!(svm.resolve_exp(20, 0).is_some());
        assert!(svm.resolve_exp(30, 2).is_none());

        let taken = svm.take_unanchored(|_, _| false);
        assert_eq!(taken.iter().map(Record::sid).collect::<Vec<_>>(), vec![ARRAY]);
        assert_eq!(svm.num_shared_formulas(), 1);
    }
}
