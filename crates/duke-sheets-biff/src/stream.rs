//! Forward-only cursor over decoded records.

use std::collections::VecDeque;

use crate::error::{XlsError, XlsResult};
use crate::record::Record;

/// Single-pass record reader used while building sheet and workbook models.
///
/// The only rewind is [`RecordStream::unread`], which hands one record back
/// so a substream reader can start at its BOF.
#[derive(Debug, Default)]
pub struct RecordStream {
    records: VecDeque<Record>,
    count_read: usize,
}

impl RecordStream {
    pub fn new(records: Vec<Record>) -> Self {
        RecordStream {
            records: records.into(),
            count_read: 0,
        }
    }

    pub fn has_next(&self) -> bool {
        !self.records.is_empty()
    }

    /// Sid of the next record, `None` when exhausted.
    pub fn peek_next_sid(&self) -> Option<u16> {
        self.records.front().map(Record::sid)
    }

    /// Look at the next record without consuming it.
    pub fn peek_next(&self) -> Option<&Record> {
        self.records.front()
    }

    pub fn next(&mut self) -> XlsResult<Record> {
        let rec = self.records.pop_front().ok_or(XlsError::EndOfStream)?;
        self.count_read += 1;
        Ok(rec)
    }

    /// Consume the next record if it has the given sid.
    pub fn next_if_sid(&mut self, sid: u16) -> Option<Record> {
        if self.peek_next_sid() == Some(sid) {
            self.count_read += 1;
            self.records.pop_front()
        } else {
            None
        }
    }

    /// Number of records consumed so far.
    pub fn count_read(&self) -> usize {
        self.count_read
    }

    /// Put back the record just read.
    pub fn unread(&mut self, record: Record) {
        self.count_read = self.count_read.saturating_sub(1);
        self.records.push_front(record);
    }

    pub fn remaining(&self) -> usize {
        self.records.len()
    }
}

impl From<Vec<Record>> for RecordStream {
    fn from(records: Vec<Record>) -> Self {
        RecordStream::new(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biff::records::*;

    #[test]
    fn test_peek_and_next() {
        let mut rs = RecordStream::new(vec![Record::DefColWidth(8), Record::Eof]);
        assert!(rs.has_next());
        assert_eq!(rs.peek_next_sid(), Some(DEFCOLWIDTH));
        assert_eq!(rs.peek_next(), Some(&Record::DefColWidth(8)));
        assert_eq!(rs.count_read(), 0);
        assert_eq!(rs.next().unwrap(), Record::DefColWidth(8));
        assert!(rs.next_if_sid(BOF).is_none());
        assert_eq!(rs.next_if_sid(EOF), Some(Record::Eof));
        assert_eq!(rs.count_read(), 2);
        assert!(!rs.has_next());
        assert_eq!(rs.peek_next_sid(), None);
        assert!(matches!(rs.next(), Err(XlsError::EndOfStream)));
    }

    #[test]
    fn test_unread_restores_position_and_count() {
        let mut rs = RecordStream::new(vec![Record::Eof]);
        let r = rs.next().unwrap();
        rs.unread(r);
        assert_eq!(rs.count_read(), 0);
        assert_eq!(rs.peek_next_sid(), Some(EOF));
    }
}
