use crate::biff::records::{CFHEADER, CFHEADER12, CFRULE, CFRULE12};
use crate::error::{XlsError, XlsResult};
use crate::record::{CellRangeAddress, CfHeaderRecord, Record};
use crate::stream::RecordStream;

use super::{RecordAggregate, RecordVisitor};

/// Rule limit per CFHEADER in the BIFF8 format.
pub const MAX_RULES_PER_GROUP: usize = 3;

fn rule_sid_for(header_sid: u16) -> u16 {
    if header_sid == CFHEADER12 {
        CFRULE12
    } else {
        CFRULE
    }
}

/// One CFHEADER (or CFHEADER12) and the rules that follow it.
///
/// Rule bodies are opaque; the header's rule count is rewritten on output.
#[derive(Debug, Clone, PartialEq)]
pub struct CfGroup {
    header: Record,
    rules: Vec<Record>,
}

impl CfGroup {
    pub fn new(ranges: Vec<CellRangeAddress>, rules: Vec<Record>) -> XlsResult<Self> {
        if ranges.is_empty() {
            return Err(XlsError::invalid_argument(
                "conditional format needs at least one range",
            ));
        }
        if rules.is_empty() || rules.len() > MAX_RULES_PER_GROUP {
            return Err(XlsError::invalid_argument(format!(
                "conditional format needs 1 to {MAX_RULES_PER_GROUP} rules, got {}",
                rules.len()
            )));
        }
        if let Some(bad) = rules.iter().find(|r| r.sid() != CFRULE) {
            return Err(XlsError::invalid_argument(format!(
                "record 0x{:04X} is not a CFRULE",
                bad.sid()
            )));
        }
        let header = CfHeaderRecord::new(ranges, rules.len() as u16);
        Ok(CfGroup {
            header: Record::CfHeader(header),
            rules,
        })
    }

    fn read(rs: &mut RecordStream) -> XlsResult<Self> {
        let header = rs.next()?;
        let rule_sid = rule_sid_for(header.sid());
        let mut rules = Vec::new();
        while let Some(rule) = rs.next_if_sid(rule_sid) {
            rules.push(rule);
        }
        if rules.len() > MAX_RULES_PER_GROUP {
            log::warn!(
                "conditional format has {} rules; Excel 97-2003 reads at most {MAX_RULES_PER_GROUP}",
                rules.len()
            );
        }
        Ok(CfGroup { header, rules })
    }

    pub fn header(&self) -> &Record {
        &self.header
    }

    /// Ranges of a BIFF8 header; empty for CFHEADER12.
    pub fn ranges(&self) -> &[CellRangeAddress] {
        match &self.header {
            Record::CfHeader(h) => &h.ranges,
            _ => &[],
        }
    }

    pub fn rules(&self) -> &[Record] {
        &self.rules
    }

    pub fn num_rules(&self) -> usize {
        self.rules.len()
    }

    pub fn add_rule(&mut self, rule: Record) -> XlsResult<()> {
        if self.rules.len() >= MAX_RULES_PER_GROUP {
            return Err(XlsError::invalid_argument(format!(
                "no more than {MAX_RULES_PER_GROUP} rules per conditional format"
            )));
        }
        self.check_rule(&rule)?;
        self.rules.push(rule);
        Ok(())
    }

    pub fn set_rule(&mut self, index: usize, rule: Record) -> XlsResult<()> {
        self.check_rule(&rule)?;
        let slot = self.rules.get_mut(index).ok_or_else(|| {
            XlsError::invalid_argument(format!("rule index {index} out of range"))
        })?;
        *slot = rule;
        Ok(())
    }

    fn check_rule(&self, rule: &Record) -> XlsResult<()> {
        let want = rule_sid_for(self.header.sid());
        if rule.sid() != want {
            return Err(XlsError::invalid_argument(format!(
                "expected rule record 0x{want:04X}, got 0x{:04X}",
                rule.sid()
            )));
        }
        Ok(())
    }

    fn visit(&self, visitor: &mut dyn RecordVisitor) {
        match &self.header {
            Record::CfHeader(h) if h.num_rules as usize != self.rules.len() => {
                let mut h = h.clone();
                h.num_rules = self.rules.len() as u16;
                visitor.visit_record(&Record::CfHeader(h));
            }
            header => visitor.visit_record(header),
        }
        for r in &self.rules {
            visitor.visit_record(r);
        }
    }
}

/// All conditional formats of a sheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionalFormattingTable {
    groups: Vec<CfGroup>,
}

impl ConditionalFormattingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_header_sid(sid: u16) -> bool {
        sid == CFHEADER || sid == CFHEADER12
    }

    /// Consume consecutive header/rule groups.
    pub fn read(&mut self, rs: &mut RecordStream) -> XlsResult<()> {
        while rs.peek_next_sid().is_some_and(Self::is_header_sid) {
            self.groups.push(CfGroup::read(rs)?);
        }
        Ok(())
    }

    pub fn add(&mut self, group: CfGroup) -> usize {
        self.groups.push(group);
        self.groups.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&CfGroup> {
        self.groups.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut CfGroup> {
        self.groups.get_mut(index)
    }

    pub fn remove(&mut self, index: usize) -> XlsResult<CfGroup> {
        if index >= self.groups.len() {
            return Err(XlsError::invalid_argument(format!(
                "conditional format index {index} outside 0..{}",
                self.groups.len()
            )));
        }
        Ok(self.groups.remove(index))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl RecordAggregate for ConditionalFormattingTable {
    fn visit_contained_records(&self, visitor: &mut dyn RecordVisitor) {
        for g in &self.groups {
            g.visit(visitor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biff::records::EOF;

    fn rule() -> Record {
        Record::raw(CFRULE, vec![1, 3, 0, 0, 0, 0])
    }

    #[test]
    fn test_group_limits() {
        let range = vec![CellRangeAddress::new(0, 4, 0, 0)];
        assert!(CfGroup::new(range.clone(), vec![]).is_err());
        assert!(CfGroup::new(range.clone(), vec![rule(); 4]).is_err());
        assert!(CfGroup::new(vec![], vec![rule()]).is_err());
        let mut g = CfGroup::new(range, vec![rule(), rule()]).unwrap();
        g.add_rule(rule()).unwrap();
        assert!(g.add_rule(rule()).is_err());
        assert_eq!(g.num_rules(), 3);
    }

    #[test]
    fn test_header_count_synced_on_write() {
        let mut t = ConditionalFormattingTable::new();
        let mut g = CfGroup::new(vec![CellRangeAddress::new(1, 2, 3, 4)], vec![rule()]).unwrap();
        g.add_rule(rule()).unwrap();
        t.add(g);
        let recs = t.records();
        assert_eq!(recs.len(), 3);
        match &recs[0] {
            Record::CfHeader(h) => {
                assert_eq!(h.num_rules, 2);
                assert_eq!(h.enclosing, CellRangeAddress::new(1, 2, 3, 4));
            }
            other => panic!("expected CFHEADER, got {other:?}"),
        }
    }

    #[test]
    fn test_read_groups() {
        let h = Record::CfHeader(CfHeaderRecord::new(vec![CellRangeAddress::new(0, 0, 0, 0)], 1));
        let mut rs = RecordStream::new(vec![h.clone(), rule(), h, rule(), rule(), Record::Eof]);
        let mut t = ConditionalFormattingTable::new();
        t.read(&mut rs).unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.get(1).map(CfGroup::num_rules), Some(2));
        assert_eq!(rs.peek_next_sid(), Some(EOF));
        assert!(t.remove(5).is_err());
        assert!(t.remove(0).is_ok());
    }
}
