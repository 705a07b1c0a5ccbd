use crate::error::{XlsError, XlsResult};
use crate::record::{
    BlankRecord, BoolErrRecord, FormulaRecord, LabelRecord, LabelSstRecord, NumberRecord, Record,
    RkRecord, StringRecord,
};

use super::shared_values::SharedValueManager;
use super::RecordVisitor;

/// A FORMULA cell with its cached string result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormulaCell {
    pub formula: FormulaRecord,
    pub string: Option<StringRecord>,
}

impl FormulaCell {
    pub fn new(formula: FormulaRecord) -> Self {
        FormulaCell {
            formula,
            string: None,
        }
    }

    /// Group anchor this cell follows, for shared formulas.
    pub fn shared_anchor(&self) -> Option<(u16, u16)> {
        if self.formula.is_shared() {
            self.formula.exp_reference()
        } else {
            None
        }
    }

    /// FORMULA, then the group record if this is a group's first cell, then
    /// the cached STRING.
    pub fn visit(&self, svm: &SharedValueManager, visitor: &mut dyn RecordVisitor) {
        visitor.visit_record(&Record::Formula(self.formula.clone()));
        if let Some(group) = svm.record_for_first_cell(self.formula.row, self.formula.col) {
            visitor.visit_record(&group);
        }
        if let Some(s) = &self.string {
            if self.formula.has_string_result() {
                visitor.visit_record(&Record::FormulaString(s.clone()));
            }
        }
    }
}

/// One cell value in the row block.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number(NumberRecord),
    Rk(RkRecord),
    LabelSst(LabelSstRecord),
    Label(LabelRecord),
    Blank(BlankRecord),
    BoolErr(BoolErrRecord),
    Formula(FormulaCell),
}

impl CellValue {
    /// Convert a single-cell record. Anything else is handed back.
    pub fn from_record(rec: Record) -> Result<CellValue, Record> {
        Ok(match rec {
            Record::Number(r) => CellValue::Number(r),
            Record::Rk(r) => CellValue::Rk(r),
            Record::LabelSst(r) => CellValue::LabelSst(r),
            Record::Label(r) => CellValue::Label(r),
            Record::Blank(r) => CellValue::Blank(r),
            Record::BoolErr(r) => CellValue::BoolErr(r),
            Record::Formula(r) => CellValue::Formula(FormulaCell::new(r)),
            other => return Err(other),
        })
    }

    pub fn try_from_record(rec: Record) -> XlsResult<CellValue> {
        CellValue::from_record(rec)
            .map_err(|r| XlsError::structural(r.sid(), "expected a cell value record"))
    }

    pub fn row(&self) -> u16 {
        match self {
            CellValue::Number(r) => r.row,
            CellValue::Rk(r) => r.row,
            CellValue::LabelSst(r) => r.row,
            CellValue::Label(r) => r.row,
            CellValue::Blank(r) => r.row,
            CellValue::BoolErr(r) => r.row,
            CellValue::Formula(f) => f.formula.row,
        }
    }

    pub fn col(&self) -> u16 {
        match self {
            CellValue::Number(r) => r.col,
            CellValue::Rk(r) => r.col,
            CellValue::LabelSst(r) => r.col,
            CellValue::Label(r) => r.col,
            CellValue::Blank(r) => r.col,
            CellValue::BoolErr(r) => r.col,
            CellValue::Formula(f) => f.formula.col,
        }
    }

    pub fn xf(&self) -> u16 {
        match self {
            CellValue::Number(r) => r.xf,
            CellValue::Rk(r) => r.xf,
            CellValue::LabelSst(r) => r.xf,
            CellValue::Label(r) => r.xf,
            CellValue::Blank(r) => r.xf,
            CellValue::BoolErr(r) => r.xf,
            CellValue::Formula(f) => f.formula.xf,
        }
    }

    pub fn set_xf(&mut self, xf: u16) {
        match self {
            CellValue::Number(r) => r.xf = xf,
            CellValue::Rk(r) => r.xf = xf,
            CellValue::LabelSst(r) => r.xf = xf,
            CellValue::Label(r) => r.xf = xf,
            CellValue::Blank(r) => r.xf = xf,
            CellValue::BoolErr(r) => r.xf = xf,
            CellValue::Formula(f) => f.formula.xf = xf,
        }
    }

    /// Move the cell to another coordinate.
    pub fn set_position(&mut self, row: u16, col: u16) {
        let (r, c) = match self {
            CellValue::Number(x) => (&mut x.row, &mut x.col),
            CellValue::Rk(x) => (&mut x.row, &mut x.col),
            CellValue::LabelSst(x) => (&mut x.row, &mut x.col),
            CellValue::Label(x) => (&mut x.row, &mut x.col),
            CellValue::Blank(x) => (&mut x.row, &mut x.col),
            CellValue::BoolErr(x) => (&mut x.row, &mut x.col),
            CellValue::Formula(f) => (&mut f.formula.row, &mut f.formula.col),
        };
        *r = row;
        *c = col;
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, CellValue::Blank(_))
    }

    pub fn visit(&self, svm: &SharedValueManager, visitor: &mut dyn RecordVisitor) {
        let rec = match self {
            CellValue::Formula(f) => return f.visit(svm, visitor),
            CellValue::Number(r) => Record::Number(r.clone()),
            CellValue::Rk(r) => Record::Rk(r.clone()),
            CellValue::LabelSst(r) => Record::LabelSst(r.clone()),
            CellValue::Label(r) => Record::Label(r.clone()),
            CellValue::Blank(r) => Record::Blank(r.clone()),
            CellValue::BoolErr(r) => Record::BoolErr(r.clone()),
        };
        visitor.visit_record(&rec);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biff::records::{FORMULA, STRING};
    use crate::biff::strings::XlString;

    #[test]
    fn test_from_record() {
        let cell = CellValue::from_record(Record::Blank(BlankRecord { row: 3, col: 4, xf: 15 }))
            .unwrap();
        assert_eq!((cell.row(), cell.col(), cell.xf()), (3, 4, 15));
        assert!(cell.is_blank());
        assert!(CellValue::from_record(Record::Eof).is_err());
        assert!(CellValue::try_from_record(Record::Eof).is_err());
    }

    #[test]
    fn test_formula_writes_string_only_for_string_result() {
        let mut f = FormulaRecord::new(0, 0, 15, &[0x1E, 1, 0]);
        let cell = FormulaCell {
            formula: f.clone(),
            string: Some(StringRecord {
                text: XlString::new("x"),
            }),
        };
        let mut out: Vec<Record> = Vec::new();
        cell.visit(&SharedValueManager::empty(), &mut out);
        assert_eq!(out.len(), 1);

        f.result = [0, 0, 0, 0, 0, 0, 0xFF, 0xFF];
        let cell = FormulaCell {
            formula: f,
            string: cell.string,
        };
        let mut out: Vec<Record> = Vec::new();
        cell.visit(&SharedValueManager::empty(), &mut out);
        let sids: Vec<u16> = out.iter().map(Record::sid).collect();
        assert_eq!(sids, vec![FORMULA, STRING]);
    }
}
