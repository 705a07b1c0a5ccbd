//! Mutable models over the record streams: workbook globals, sheets and
//! the link table.

pub mod link_table;
pub mod record_list;
pub mod sheet;
pub mod workbook;

pub use link_table::{ExternalBookBlock, ExternalSheet, LinkTable, NameXRef, UdfFinder};
pub use record_list::{Anchor, WorkbookItem, WorkbookRecordList};
pub use sheet::{PaneInformation, Sheet};
pub use workbook::{Workbook, WorkbookOptions};
