//! Record aggregates: logical features that own a contiguous run of records.
//!
//! Each aggregate is built by consuming its run from a [`RecordStream`] and
//! flattened back to records through [`RecordVisitor`] when the sheet is
//! written. Members come out in canonical order, which need not be the
//! order they were read in.
//!
//! [`RecordStream`]: crate::stream::RecordStream

pub mod column_info;
pub mod conditional_formatting;
pub mod data_validity;
pub mod merged_cells;
pub mod page_settings;
pub mod protection;
pub mod row_blocks;
pub mod rows;
pub mod shared_values;
pub mod value_records;

pub use column_info::ColumnInfoTable;
pub use conditional_formatting::{CfGroup, ConditionalFormattingTable};
pub use data_validity::DataValidityTable;
pub use merged_cells::MergedCellsTable;
pub use page_settings::{Margin, PageSettingsBlock};
pub use protection::WorksheetProtectionBlock;
pub use row_blocks::RowBlocksReader;
pub use rows::RowRecordsAggregate;
pub use shared_values::SharedValueManager;
pub use value_records::{CellValue, FormulaCell};

use crate::record::Record;

/// Receives the records of an aggregate in write order.
pub trait RecordVisitor {
    fn visit_record(&mut self, record: &Record);
}

/// Collects cloned records, mostly for inspection and tests.
impl RecordVisitor for Vec<Record> {
    fn visit_record(&mut self, record: &Record) {
        self.push(record.clone());
    }
}

/// Sums serialized sizes without writing anything.
#[derive(Debug, Default)]
pub struct SizeCounter {
    pub total: usize,
}

impl RecordVisitor for SizeCounter {
    fn visit_record(&mut self, record: &Record) {
        self.total += record.record_size();
    }
}

/// Writes each record's physical bytes.
#[derive(Debug)]
pub struct RecordSerializer<'a> {
    pub out: &'a mut Vec<u8>,
}

impl RecordVisitor for RecordSerializer<'_> {
    fn visit_record(&mut self, record: &Record) {
        record.serialize(self.out);
    }
}

/// Common shape of every aggregate.
pub trait RecordAggregate {
    fn visit_contained_records(&self, visitor: &mut dyn RecordVisitor);

    /// Serialized size of all contained records.
    fn record_size(&self) -> usize {
        let mut c = SizeCounter::default();
        self.visit_contained_records(&mut c);
        c.total
    }

    fn records(&self) -> Vec<Record> {
        let mut v = Vec::new();
        self.visit_contained_records(&mut v);
        v
    }
}
