use crate::biff::records::COLINFO;
use crate::error::{XlsError, XlsResult};
use crate::record::{ColumnInfoRecord, Record};
use crate::stream::RecordStream;

use super::{RecordAggregate, RecordVisitor};

/// Highest outline level Excel supports.
pub const MAX_OUTLINE_LEVEL: u16 = 7;

/// Field changes for [`ColumnInfoTable::set_column`]; `None` leaves a field
/// alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnUpdate {
    pub xf: Option<u16>,
    pub width: Option<u16>,
    pub level: Option<u16>,
    pub hidden: Option<bool>,
    pub collapsed: Option<bool>,
}

impl ColumnUpdate {
    fn apply(&self, ci: &mut ColumnInfoRecord) {
        if let Some(xf) = self.xf {
            ci.xf = xf;
        }
        if let Some(w) = self.width {
            ci.width = w;
        }
        if let Some(l) = self.level {
            ci.set_outline_level(l);
        }
        if let Some(h) = self.hidden {
            ci.set_hidden(h);
        }
        if let Some(c) = self.collapsed {
            ci.set_collapsed(c);
        }
    }

    fn changes(&self, ci: &ColumnInfoRecord) -> bool {
        self.xf.is_some_and(|v| v != ci.xf)
            || self.width.is_some_and(|v| v != ci.width)
            || self.level.is_some_and(|v| v != ci.outline_level())
            || self.hidden.is_some_and(|v| v != ci.is_hidden())
            || self.collapsed.is_some_and(|v| v != ci.is_collapsed())
    }
}

/// Sorted, non-overlapping COLINFO ranges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnInfoTable {
    records: Vec<ColumnInfoRecord>,
}

impl ColumnInfoTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(rs: &mut RecordStream) -> XlsResult<Self> {
        let mut records: Vec<ColumnInfoRecord> = Vec::new();
        let mut in_order = true;
        while let Some(rec) = rs.next_if_sid(COLINFO) {
            let Record::ColumnInfo(ci) = rec else {
                return Err(XlsError::structural(COLINFO, "malformed COLINFO record"));
            };
            if records.last().is_some_and(|p| p.first_col > ci.first_col) {
                in_order = false;
            }
            records.push(ci);
        }
        if !in_order {
            records.sort_by_key(|c| (c.first_col, c.last_col));
        }
        Ok(ColumnInfoTable { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ColumnInfoRecord> {
        self.records.get(index)
    }

    pub fn find_column_info(&self, col: u16) -> Option<&ColumnInfoRecord> {
        self.records.iter().find(|c| c.contains(col))
    }

    pub fn max_outline_level(&self) -> u16 {
        self.records
            .iter()
            .map(ColumnInfoRecord::outline_level)
            .max()
            .unwrap_or(0)
    }

    /// Apply `update` to one column, splitting or merging ranges as needed.
    pub fn set_column(&mut self, col: u16, update: ColumnUpdate) {
        let mut k = 0;
        let mut found = None;
        while k < self.records.len() {
            let ci = &self.records[k];
            if ci.contains(col) {
                found = Some(k);
                break;
            }
            if ci.first_col > col {
                break;
            }
            k += 1;
        }

        let Some(k) = found else {
            let mut nci = ColumnInfoRecord::new(col, col);
            update.apply(&mut nci);
            self.records.insert(k, nci);
            self.attempt_merge(k);
            return;
        };

        if !update.changes(&self.records[k]) {
            return;
        }

        let ci = &mut self.records[k];
        if ci.first_col == col && ci.last_col == col {
            update.apply(ci);
            self.attempt_merge(k);
            return;
        }

        if ci.first_col == col || ci.last_col == col {
            let mut at = k;
            if ci.first_col == col {
                ci.first_col = col + 1;
            } else {
                ci.last_col = col - 1;
                at += 1;
            }
            let mut nci = ci.clone();
            nci.first_col = col;
            nci.last_col = col;
            update.apply(&mut nci);
            self.records.insert(at, nci);
            self.attempt_merge(at);
            return;
        }

        // Split into three.
        let last = ci.last_col;
        ci.last_col = col - 1;
        let mut mid = ci.clone();
        let mut end = ci.clone();
        mid.first_col = col;
        mid.last_col = col;
        update.apply(&mut mid);
        end.first_col = col + 1;
        end.last_col = last;
        self.records.insert(k + 1, mid);
        self.records.insert(k + 2, end);
    }

    fn attempt_merge(&mut self, ix: usize) {
        if ix + 1 < self.records.len() && self.merge_pair(ix) {
            self.records.remove(ix + 1);
        }
        if ix > 0 && self.merge_pair(ix - 1) {
            self.records.remove(ix);
        }
    }

    /// Fold `records[ix + 1]` into `records[ix]` when adjacent with the same
    /// format.
    fn merge_pair(&mut self, ix: usize) -> bool {
        let (a, b) = (&self.records[ix], &self.records[ix + 1]);
        if a.last_col.checked_add(1) == Some(b.first_col) && a.format_matches(b) {
            self.records[ix].last_col = self.records[ix + 1].last_col;
            return true;
        }
        false
    }

    /// Raise (or lower) the outline level of every column in the range.
    pub fn group_column_range(&mut self, from: u16, to: u16, indent: bool) {
        for col in from..=to {
            let level = match self.find_column_info(col) {
                Some(ci) => {
                    let l = ci.outline_level();
                    let l = if indent { l + 1 } else { l.saturating_sub(1) };
                    l.min(MAX_OUTLINE_LEVEL)
                }
                None => 1,
            };
            self.set_column(
                col,
                ColumnUpdate {
                    level: Some(level),
                    ..Default::default()
                },
            );
        }
    }
}

impl RecordAggregate for ColumnInfoTable {
    fn visit_contained_records(&self, visitor: &mut dyn RecordVisitor) {
        for ci in &self.records {
            visitor.visit_record(&Record::ColumnInfo(ci.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn width(w: u16) -> ColumnUpdate {
        ColumnUpdate {
            width: Some(w),
            ..Default::default()
        }
    }

    fn ranges(t: &ColumnInfoTable) -> Vec<(u16, u16, u16)> {
        t.records
            .iter()
            .map(|c| (c.first_col, c.last_col, c.width))
            .collect()
    }

    #[test]
    fn test_adjacent_same_format_merges() {
        let mut t = ColumnInfoTable::new();
        t.set_column(2, width(1000));
        t.set_column(3, width(1000));
        t.set_column(1, width(1000));
        assert_eq!(ranges(&t), vec![(1, 3, 1000)]);
    }

    #[test]
    fn test_split_middle_into_three() {
        let mut t = ColumnInfoTable::new();
        for c in 0..5 {
            t.set_column(c, width(500));
        }
        t.set_column(2, width(900));
        assert_eq!(ranges(&t), vec![(0, 1, 500), (2, 2, 900), (3, 4, 500)]);
        t.set_column(4, width(900));
        assert_eq!(
            ranges(&t),
            vec![(0, 1, 500), (2, 2, 900), (3, 3, 500), (4, 4, 900)]
        );
        t.set_column(3, width(900));
        assert_eq!(ranges(&t), vec![(0, 1, 500), (2, 4, 900)]);
    }

    #[test]
    fn test_unchanged_is_noop() {
        let mut t = ColumnInfoTable::new();
        t.set_column(0, width(500));
        t.set_column(1, width(500));
        t.set_column(0, width(500));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_grouping_levels() {
        let mut t = ColumnInfoTable::new();
        t.group_column_range(1, 3, true);
        assert_eq!(t.max_outline_level(), 1);
        t.group_column_range(2, 2, true);
        assert_eq!(t.max_outline_level(), 2);
        assert_eq!(t.find_column_info(2).map(|c| c.outline_level()), Some(2));
        t.group_column_range(2, 2, false);
        t.group_column_range(1, 3, false);
        assert_eq!(t.max_outline_level(), 0);
    }

    #[test]
    fn test_read_sorts() {
        let mut rs = RecordStream::new(vec![
            Record::ColumnInfo(ColumnInfoRecord::new(5, 6)),
            Record::ColumnInfo(ColumnInfoRecord::new(0, 1)),
        ]);
        let t = ColumnInfoTable::read(&mut rs).unwrap();
        assert_eq!(t.get(0).map(|c| c.first_col), Some(0));
    }
}
