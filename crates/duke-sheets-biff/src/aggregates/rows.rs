//! ROW records and the cells under them, written in blocks of 32 rows with
//! a regenerated DBCELL after each block.

use std::collections::BTreeMap;

use log::{debug, warn};

use crate::error::{XlsError, XlsResult};
use crate::ordering::is_row_block_record;
use crate::record::{
    BlankRecord, CellRangeAddress8, DbCellRecord, DimensionsRecord, MulBlankRecord, Record,
    RowRecord,
};

use super::row_blocks::RowBlocksReader;
use super::shared_values::{SharedValue, SharedValueManager};
use super::value_records::{CellValue, FormulaCell};
use super::{RecordAggregate, RecordVisitor};

/// Rows per DBCELL block.
pub const ROWS_PER_BLOCK: usize = 32;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowRecordsAggregate {
    rows: BTreeMap<u16, RowRecord>,
    cells: BTreeMap<(u16, u16), CellValue>,
    shared: SharedValueManager,
    /// Records found in the row region that are not rows or cells.
    unknown: Vec<Record>,
}

impl RowRecordsAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_reader(reader: RowBlocksReader) -> XlsResult<Self> {
        let (svm, plain, _) = reader.into_parts()?;
        Self::from_parts(svm, plain)
    }

    /// Build from the plain records of a row region and its group resolver.
    pub fn from_parts(shared: SharedValueManager, plain: Vec<Record>) -> XlsResult<Self> {
        let mut agg = RowRecordsAggregate {
            shared,
            ..Default::default()
        };
        let mut it = plain.into_iter().peekable();
        while let Some(rec) = it.next() {
            match rec {
                Record::Row(r) => {
                    let row = r.row;
                    if agg.rows.insert(row, r).is_some() {
                        warn!("second ROW record for row {row} replaces the first");
                    }
                }
                // Regenerated on write.
                Record::DbCell(_) => {}
                Record::MulRk(m) => {
                    for rk in m.expand() {
                        agg.cells.insert((rk.row, rk.col), CellValue::Rk(rk));
                    }
                }
                Record::MulBlank(m) => {
                    for b in m.expand() {
                        agg.cells.insert((b.row, b.col), CellValue::Blank(b));
                    }
                }
                Record::Formula(formula) => {
                    let mut cell = FormulaCell::new(formula);
                    if matches!(it.peek(), Some(Record::FormulaString(_))) {
                        if let Some(Record::FormulaString(s)) = it.next() {
                            cell.string = Some(s);
                        }
                    }
                    agg.link_formula(&mut cell)?;
                    let key = (cell.formula.row, cell.formula.col);
                    agg.cells.insert(key, CellValue::Formula(cell));
                }
                Record::FormulaString(s) => {
                    warn!("STRING record without a preceding FORMULA");
                    agg.unknown.push(Record::FormulaString(s));
                }
                rec => match CellValue::from_record(rec) {
                    Ok(cell) => {
                        agg.cells.insert((cell.row(), cell.col()), cell);
                    }
                    Err(other) => {
                        let sid = other.sid();
                        if is_row_block_record(sid) {
                            return Err(XlsError::structural(sid, "malformed cell record"));
                        }
                        debug!("keeping {sid:#06x} found among the cell records");
                        agg.unknown.push(other);
                    }
                },
            }
        }
        let cells = &agg.cells;
        let orphans = agg.shared.take_unanchored(|row, col| {
            matches!(cells.get(&(row, col)), Some(CellValue::Formula(_)))
        });
        if !orphans.is_empty() {
            warn!(
                "{} ARRAY/TABLE records have no FORMULA at their first cell",
                orphans.len()
            );
            agg.unknown.extend(orphans);
        }
        Ok(agg)
    }

    fn link_formula(&self, cell: &mut FormulaCell) -> XlsResult<()> {
        if !cell.formula.is_shared() {
            return Ok(());
        }
        match cell.formula.exp_reference() {
            Some(first) => {
                self.shared.link_shared_formula(first)?;
            }
            None => {
                debug!(
                    "clearing shared flag on R{}C{} with no PtgExp",
                    cell.formula.row, cell.formula.col
                );
                cell.formula.set_shared(false);
            }
        }
        Ok(())
    }

    pub fn insert_row(&mut self, row: RowRecord) {
        self.rows.insert(row.row, row);
    }

    pub fn get_row(&self, row: u16) -> Option<&RowRecord> {
        self.rows.get(&row)
    }

    pub fn get_row_mut(&mut self, row: u16) -> Option<&mut RowRecord> {
        self.rows.get_mut(&row)
    }

    /// Remove a ROW and every cell in it.
    pub fn remove_row(&mut self, row: u16) -> XlsResult<Option<RowRecord>> {
        let cols: Vec<u16> = self.cells_in_row(row).map(CellValue::col).collect();
        if let Some(&col) = cols.iter().find(|&&c| self.is_group_anchor(row, c)) {
            return Err(anchor_error(row, col));
        }
        for col in cols {
            self.cells.remove(&(row, col));
        }
        Ok(self.rows.remove(&row))
    }

    pub fn rows(&self) -> impl Iterator<Item = &RowRecord> {
        self.rows.values()
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn first_row_num(&self) -> Option<u16> {
        self.row_numbers().first().copied()
    }

    pub fn last_row_num(&self) -> Option<u16> {
        self.row_numbers().last().copied()
    }

    /// Add or replace the cell at the value's coordinate.
    pub fn insert_cell(&mut self, cell: CellValue) -> XlsResult<()> {
        let (row, col) = (cell.row(), cell.col());
        if let CellValue::Formula(f) = &cell {
            if let Some(first) = f.shared_anchor() {
                if self.shared.shared_formula(first).is_none() {
                    return Err(XlsError::invalid_argument(format!(
                        "R{row}C{col} refers to a missing shared formula at R{}C{}",
                        first.0, first.1
                    )));
                }
            }
        } else if self.is_group_anchor(row, col) {
            return Err(anchor_error(row, col));
        }
        self.cells.insert((row, col), cell);
        Ok(())
    }

    pub fn get_cell(&self, row: u16, col: u16) -> Option<&CellValue> {
        self.cells.get(&(row, col))
    }

    pub fn get_cell_mut(&mut self, row: u16, col: u16) -> Option<&mut CellValue> {
        self.cells.get_mut(&(row, col))
    }

    /// Remove a cell. The first cell of a shared-formula, array or table
    /// group cannot be removed while its group exists.
    pub fn remove_cell(&mut self, row: u16, col: u16) -> XlsResult<Option<CellValue>> {
        if self.is_group_anchor(row, col) {
            return Err(anchor_error(row, col));
        }
        Ok(self.cells.remove(&(row, col)))
    }

    fn is_group_anchor(&self, row: u16, col: u16) -> bool {
        matches!(self.cells.get(&(row, col)), Some(CellValue::Formula(_)))
            && self.shared.is_anchor(row, col)
    }

    pub fn cells(&self) -> impl Iterator<Item = &CellValue> {
        self.cells.values()
    }

    pub fn cells_in_row(&self, row: u16) -> impl Iterator<Item = &CellValue> {
        self.cells.range((row, 0)..=(row, u16::MAX)).map(|(_, c)| c)
    }

    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn unknown_records(&self) -> &[Record] {
        &self.unknown
    }

    pub fn shared_values(&self) -> &SharedValueManager {
        &self.shared
    }

    pub fn shared_values_mut(&mut self) -> &mut SharedValueManager {
        &mut self.shared
    }

    /// The group definition a formula cell uses, if any.
    pub fn shared_value_at(&self, row: u16, col: u16) -> Option<SharedValue<'_>> {
        match self.cells.get(&(row, col)) {
            Some(CellValue::Formula(f)) => match f.formula.exp_reference() {
                Some((r, c)) => self.shared.resolve_exp(r, c),
                None => None,
            },
            _ => None,
        }
    }

    /// Drop the array formula covering `(row, col)` and blank its cells.
    pub fn remove_array_formula(
        &mut self,
        row: u16,
        col: u16,
    ) -> XlsResult<CellRangeAddress8> {
        let range = self.shared.remove_array_formula(row, col).ok_or_else(|| {
            XlsError::invalid_argument(format!("R{row}C{col} is not part of an array formula"))
        })?;
        for r in range.first_row..=range.last_row {
            for c in range.first_col as u16..=range.last_col as u16 {
                if let Some(cell) = self.cells.get_mut(&(r, c)) {
                    if matches!(cell, CellValue::Formula(_)) {
                        *cell = CellValue::Blank(BlankRecord {
                            row: r,
                            col: c,
                            xf: cell.xf(),
                        });
                    }
                }
            }
        }
        Ok(range)
    }

    /// DIMENSIONS covering every row and cell.
    pub fn create_dimensions(&self) -> DimensionsRecord {
        let mut dims = DimensionsRecord::default();
        let rows = self.row_numbers();
        if let (Some(&first), Some(&last)) = (rows.first(), rows.last()) {
            dims.first_row = first as u32;
            dims.last_row = last as u32 + 1;
        }
        let first_col = self.cells.keys().map(|&(_, c)| c).min();
        let last_col = self.cells.keys().map(|&(_, c)| c).max();
        if let (Some(first), Some(last)) = (first_col, last_col) {
            dims.first_col = first;
            dims.last_col = last + 1;
        }
        dims
    }

    /// Sorted union of row numbers with a ROW record or a cell.
    fn row_numbers(&self) -> Vec<u16> {
        let mut rows: Vec<u16> = self.rows.keys().copied().collect();
        rows.extend(self.cells.keys().map(|&(r, _)| r));
        rows.sort_unstable();
        rows.dedup();
        rows
    }

    /// Cell records of one row with runs of blanks folded into MULBLANK.
    fn row_cell_records(&self, row: u16) -> Vec<Record> {
        let cells: Vec<&CellValue> = self.cells_in_row(row).collect();
        let mut out: Vec<Record> = Vec::new();
        let mut i = 0;
        while i < cells.len() {
            let first = cells[i];
            let mut n = 0;
            while i + n < cells.len()
                && cells[i + n].is_blank()
                && cells[i + n].col() as usize == first.col() as usize + n
            {
                n += 1;
            }
            if n > 1 {
                out.push(Record::MulBlank(MulBlankRecord {
                    row,
                    first_col: first.col(),
                    xfs: cells[i..i + n].iter().map(|c| c.xf()).collect(),
                }));
                i += n;
            } else {
                first.visit(&self.shared, &mut out);
                i += 1;
            }
        }
        out
    }
}

fn anchor_error(row: u16, col: u16) -> XlsError {
    XlsError::invalid_state(format!(
        "R{row}C{col} is the first cell of a formula group"
    ))
}

impl RecordAggregate for RowRecordsAggregate {
    fn visit_contained_records(&self, visitor: &mut dyn RecordVisitor) {
        let rows = self.row_numbers();
        for block in rows.chunks(ROWS_PER_BLOCK) {
            let mut rows_size = 0usize;
            let mut first_row_size = None;
            for r in block {
                if let Some(row) = self.rows.get(r) {
                    let rec = Record::Row(row.clone());
                    let size = rec.record_size();
                    first_row_size.get_or_insert(size);
                    rows_size += size;
                    visitor.visit_record(&rec);
                }
            }

            // The first offset runs from the second ROW to the first cell,
            // later ones cover the previous row's cells.
            let mut pos = rows_size;
            let mut next_offset = rows_size.saturating_sub(first_row_size.unwrap_or(0));
            let mut cell_offsets = Vec::new();
            for &r in block {
                let recs = self.row_cell_records(r);
                if recs.is_empty() {
                    continue;
                }
                let size: usize = recs.iter().map(Record::record_size).sum();
                for rec in &recs {
                    visitor.visit_record(rec);
                }
                cell_offsets.push(next_offset as u16);
                next_offset = size;
                pos += size;
            }
            visitor.visit_record(&Record::DbCell(DbCellRecord {
                row_offset: pos as u32,
                cell_offsets,
            }));
        }
        for rec in &self.unknown {
            visitor.visit_record(rec);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biff::records::{BLANK, DBCELL, FORMULA, MULBLANK, NUMBER, ROW, SHRFMLA, STRING};
    use crate::biff::strings::XlString;
    use crate::record::{
        ArrayRecord, FormulaRecord, MulRkRecord, NumberRecord, SharedFormulaRecord, StringRecord,
    };

    fn number(row: u16, col: u16, value: f64) -> CellValue {
        CellValue::Number(NumberRecord {
            row,
            col,
            xf: 15,
            value,
        })
    }

    fn blank(row: u16, col: u16) -> CellValue {
        CellValue::Blank(BlankRecord { row, col, xf: 15 })
    }

    fn sids(agg: &RowRecordsAggregate) -> Vec<u16> {
        agg.records().iter().map(Record::sid).collect()
    }

    #[test]
    fn test_empty_writes_nothing() {
        assert!(RowRecordsAggregate::new().records().is_empty());
    }

    #[test]
    fn test_one_block_layout() {
        let mut agg = RowRecordsAggregate::new();
        agg.insert_row(RowRecord::new(0));
        agg.insert_row(RowRecord::new(1));
        agg.insert_cell(number(0, 0, 1.0)).unwrap();
        agg.insert_cell(number(1, 0, 2.0)).unwrap();
        assert_eq!(sids(&agg), vec![ROW, ROW, NUMBER, NUMBER, DBCELL]);

        let recs = agg.records();
        let Some(Record::DbCell(db)) = recs.last() else {
            panic!("expected DBCELL last");
        };
        let number_size = recs[2].record_size();
        assert_eq!(db.row_offset as usize, 2 * 20 + 2 * number_size);
        assert_eq!(db.cell_offsets, vec![20, number_size as u16]);
    }

    #[test]
    fn test_blocks_of_32_rows() {
        let mut agg = RowRecordsAggregate::new();
        for r in 0..40 {
            agg.insert_row(RowRecord::new(r));
            agg.insert_cell(number(r, 0, r as f64)).unwrap();
        }
        let recs = agg.records();
        let dbcells: Vec<&DbCellRecord> = recs
            .iter()
            .filter_map(|r| match r {
                Record::DbCell(d) => Some(d),
                _ => None,
            })
            .collect();
        assert_eq!(dbcells.len(), 2);
        assert_eq!(dbcells[0].cell_offsets.len(), 32);
        assert_eq!(dbcells[1].cell_offsets.len(), 8);
    }

    #[test]
    fn test_blank_runs_coalesce() {
        let mut agg = RowRecordsAggregate::new();
        agg.insert_row(RowRecord::new(0));
        for c in [1, 2, 3, 5] {
            agg.insert_cell(blank(0, c)).unwrap();
        }
        assert_eq!(sids(&agg), vec![ROW, MULBLANK, BLANK, DBCELL]);
    }

    #[test]
    fn test_read_expands_and_attaches_string() {
        let mut f = FormulaRecord::new(0, 1, 15, &[0x1E, 1, 0]);
        f.result = [0, 0, 0, 0, 0, 0, 0xFF, 0xFF];
        let plain = vec![
            Record::Row(RowRecord::new(0)),
            Record::MulRk(MulRkRecord {
                row: 0,
                first_col: 3,
                cells: vec![(15, 2), (15, 4)],
            }),
            Record::Formula(f),
            Record::FormulaString(StringRecord {
                text: XlString::new("x"),
            }),
            Record::DbCell(DbCellRecord::default()),
        ];
        let agg = RowRecordsAggregate::from_parts(SharedValueManager::empty(), plain).unwrap();
        assert_eq!(agg.num_cells(), 3);
        assert!(matches!(
            agg.get_cell(0, 1),
            Some(CellValue::Formula(FormulaCell { string: Some(_), .. }))
        ));
        assert_eq!(sids(&agg)[..3], [ROW, FORMULA, STRING]);
    }

    #[test]
    fn test_shared_formula_without_group_is_structural() {
        let mut f = FormulaRecord::new(1, 0, 15, &[0x01, 0, 0, 0, 0]);
        f.set_shared(true);
        let err =
            RowRecordsAggregate::from_parts(SharedValueManager::empty(), vec![Record::Formula(f)])
                .unwrap_err();
        assert!(matches!(err, XlsError::Structural { sid: SHRFMLA, .. }));
    }

    #[test]
    fn test_group_anchor_cannot_be_removed() {
        let shr = SharedFormulaRecord {
            range: CellRangeAddress8 {
                first_row: 0,
                last_row: 1,
                first_col: 0,
                last_col: 0,
            },
            reserved: 0,
            use_count: 2,
            formula: vec![0x1E, 1, 0],
        };
        let svm = SharedValueManager::create(vec![shr], vec![(0, 0)], vec![], vec![]).unwrap();
        let mut anchor = FormulaRecord::new(0, 0, 15, &[0x01, 0, 0, 0, 0]);
        anchor.set_shared(true);
        let mut follower = FormulaRecord::new(1, 0, 15, &[0x01, 0, 0, 0, 0]);
        follower.set_shared(true);
        let mut agg = RowRecordsAggregate::from_parts(
            svm,
            vec![Record::Formula(anchor), Record::Formula(follower)],
        )
        .unwrap();

        assert!(matches!(agg.remove_cell(0, 0), Err(XlsError::InvalidState(_))));
        assert!(agg.shared_value_at(1, 0).is_some());
        assert_eq!(sids(&agg), vec![FORMULA, SHRFMLA, FORMULA, DBCELL]);
        assert!(agg.remove_cell(1, 0).unwrap().is_some());
    }

    #[test]
    fn test_array_without_formula_is_kept() {
        let arr = ArrayRecord {
            range: CellRangeAddress8 {
                first_row: 4,
                last_row: 5,
                first_col: 1,
                last_col: 1,
            },
            options: 0,
            reserved: 0,
            formula: vec![3, 0, 0x1E, 7, 0],
        };
        let svm = SharedValueManager::create(vec![], vec![], vec![arr.clone()], vec![]).unwrap();
        let agg = RowRecordsAggregate::from_parts(svm, vec![Record::Row(RowRecord::new(4))])
            .unwrap();
        assert_eq!(agg.records().last(), Some(&Record::Array(arr)));
    }

    #[test]
    fn test_repeated_row_keeps_the_last() {
        let mut second = RowRecord::new(3);
        second.height = 500;
        let plain = vec![Record::Row(RowRecord::new(3)), Record::Row(second.clone())];
        let agg = RowRecordsAggregate::from_parts(SharedValueManager::empty(), plain).unwrap();
        assert_eq!(agg.records()[0], Record::Row(second));
    }

    #[test]
    fn test_dimensions_cover_rows_and_cells() {
        let mut agg = RowRecordsAggregate::new();
        agg.insert_row(RowRecord::new(2));
        agg.insert_cell(number(5, 3, 1.0)).unwrap();
        let d = agg.create_dimensions();
        assert_eq!((d.first_row, d.last_row, d.first_col, d.last_col), (2, 6, 3, 4));
        assert_eq!(agg.first_row_num(), Some(2));
        assert_eq!(agg.last_row_num(), Some(5));
    }
}
