use crate::biff::records::{DV, DVAL};
use crate::error::{XlsError, XlsResult};
use crate::record::{DvalRecord, Record};
use crate::stream::RecordStream;

use super::{RecordAggregate, RecordVisitor};

/// DVAL and the DV records it governs. DV bodies are opaque.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataValidityTable {
    header: DvalRecord,
    validations: Vec<Record>,
}

impl DataValidityTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(rs: &mut RecordStream) -> XlsResult<Self> {
        let header = match rs.next()? {
            Record::Dval(h) => h,
            other => {
                return Err(XlsError::structural(
                    other.sid(),
                    "expected a well-formed DVAL record",
                ))
            }
        };
        let mut validations = Vec::new();
        while let Some(dv) = rs.next_if_sid(DV) {
            validations.push(dv);
        }
        if header.dv_count as usize != validations.len() {
            log::debug!(
                "DVAL declares {} validations, found {}",
                header.dv_count,
                validations.len()
            );
        }
        Ok(DataValidityTable {
            header,
            validations,
        })
    }

    pub fn header(&self) -> &DvalRecord {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut DvalRecord {
        &mut self.header
    }

    pub fn add_validation(&mut self, dv: Record) -> XlsResult<usize> {
        if dv.sid() != DV {
            return Err(XlsError::invalid_argument(format!(
                "record 0x{:04X} is not a DV",
                dv.sid()
            )));
        }
        self.validations.push(dv);
        Ok(self.validations.len() - 1)
    }

    pub fn validation(&self, index: usize) -> Option<&Record> {
        self.validations.get(index)
    }

    pub fn remove_validation(&mut self, index: usize) -> Option<Record> {
        (index < self.validations.len()).then(|| self.validations.remove(index))
    }

    pub fn len(&self) -> usize {
        self.validations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validations.is_empty()
    }
}

impl RecordAggregate for DataValidityTable {
    fn visit_contained_records(&self, visitor: &mut dyn RecordVisitor) {
        let mut header = self.header.clone();
        header.dv_count = self.validations.len() as u32;
        visitor.visit_record(&Record::Dval(header));
        for dv in &self.validations {
            visitor.visit_record(dv);
        }
    }
}
