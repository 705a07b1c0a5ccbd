//! # duke-sheets-biff
//!
//! BIFF8 record stream model for duke-sheets.
//!
//! Reads the decoded records of an `.xls` workbook stream into mutable
//! workbook and sheet models, and writes them back in the order Excel
//! expects. Records the models do not interpret pass through untouched.

pub mod aggregates;
pub mod biff;
pub mod container;
pub mod document;
pub mod drawing;
pub mod error;
pub mod escher;
pub mod model;
pub mod ordering;
pub mod record;
pub mod stream;

pub use document::{BiffDocument, SheetStream};
pub use error::{XlsError, XlsResult};
pub use model::{LinkTable, Sheet, Workbook, WorkbookOptions};
pub use record::Record;
pub use stream::RecordStream;
