use crate::biff::records::{OBJPROTECT, PASSWORD, PROTECT, SCENPROTECT};
use crate::error::{XlsError, XlsResult};
use crate::record::Record;
use crate::stream::RecordStream;

use super::{RecordAggregate, RecordVisitor};

/// Legacy 16-bit XOR password verifier stored in PASSWORD records.
pub fn xor_password_verifier(password: &str) -> u16 {
    // Excel hashes the low byte of each character.
    let bytes: Vec<u8> = password.chars().map(|c| (c as u32 & 0xFF) as u8).collect();
    if bytes.is_empty() {
        return 0;
    }
    let rotate = |h: u16| ((h >> 14) & 0x01) | ((h << 1) & 0x7FFF);
    let mut hash: u16 = 0;
    for &b in bytes.iter().rev() {
        hash = rotate(hash) ^ b as u16;
    }
    rotate(hash) ^ 0xCE4B ^ bytes.len() as u16
}

/// PROTECT, OBJPROTECT, SCENPROTECT and PASSWORD of a worksheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorksheetProtectionBlock {
    protect: Option<u16>,
    obj_protect: Option<u16>,
    scen_protect: Option<u16>,
    password: Option<u16>,
}

impl WorksheetProtectionBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_component_record(sid: u16) -> bool {
        matches!(sid, PROTECT | OBJPROTECT | SCENPROTECT | PASSWORD)
    }

    pub fn read(rs: &mut RecordStream) -> XlsResult<Self> {
        let mut block = WorksheetProtectionBlock::default();
        block.add_late_records(rs)?;
        Ok(block)
    }

    /// Absorb components, rejecting any already present.
    pub fn add_late_records(&mut self, rs: &mut RecordStream) -> XlsResult<()> {
        while rs.peek_next_sid().is_some_and(Self::is_component_record) {
            let rec = rs.next()?;
            let sid = rec.sid();
            let (slot, value) = match rec {
                Record::Protect(v) => (&mut self.protect, v),
                Record::ObjProtect(v) => (&mut self.obj_protect, v),
                Record::ScenProtect(v) => (&mut self.scen_protect, v),
                Record::Password(v) => (&mut self.password, v),
                _ => return Err(XlsError::structural(sid, "malformed protection record")),
            };
            if slot.is_some() {
                return Err(XlsError::structural(
                    sid,
                    "duplicate record in worksheet protection block",
                ));
            }
            *slot = Some(value);
        }
        Ok(())
    }

    /// Protect the sheet with `password`, or lift protection with `None`.
    /// Object and scenario protection are only ever switched on here.
    pub fn protect_sheet(&mut self, password: Option<&str>, objects: bool, scenarios: bool) {
        let Some(password) = password else {
            *self = WorksheetProtectionBlock::default();
            return;
        };
        self.protect = Some(1);
        self.password = Some(xor_password_verifier(password));
        if self.obj_protect.is_none() && objects {
            self.obj_protect = Some(1);
        }
        if self.scen_protect.is_none() && scenarios {
            self.scen_protect = Some(1);
        }
    }

    pub fn is_sheet_protected(&self) -> bool {
        self.protect.unwrap_or(0) != 0
    }

    pub fn is_object_protected(&self) -> bool {
        self.obj_protect.unwrap_or(0) != 0
    }

    pub fn is_scenario_protected(&self) -> bool {
        self.scen_protect.unwrap_or(0) != 0
    }

    pub fn password_hash(&self) -> Option<u16> {
        self.password
    }

    pub fn is_empty(&self) -> bool {
        self.protect.is_none()
            && self.obj_protect.is_none()
            && self.scen_protect.is_none()
            && self.password.is_none()
    }
}

impl RecordAggregate for WorksheetProtectionBlock {
    fn visit_contained_records(&self, visitor: &mut dyn RecordVisitor) {
        let recs = [
            self.protect.map(Record::Protect),
            self.obj_protect.map(Record::ObjProtect),
            self.scen_protect.map(Record::ScenProtect),
            self.password.map(Record::Password),
        ];
        for r in recs.iter().flatten() {
            visitor.visit_record(r);
        }
    }
}
