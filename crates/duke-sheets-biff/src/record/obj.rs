//! OBJ and TXO: the BIFF halves of drawing objects.

use crate::biff::parser::{read_array, read_bytes, read_remaining, read_u16, read_u32, read_u8};
use crate::biff::records::{CONTINUE, MAX_RECORD_DATA_SIZE, TXO};
use crate::biff::strings::{write_character_data, XlString};
use crate::biff::writer::{put_u16, put_u32, write_physical};
use crate::error::{XlsError, XlsResult};

// ── OBJ subrecord ids ───────────────────────────────────────────────────
pub const FT_END: u16 = 0x0000;
pub const FT_CF: u16 = 0x0007;
pub const FT_PIO_GRBIT: u16 = 0x0008;
pub const FT_SBS: u16 = 0x000C;
pub const FT_NTS: u16 = 0x000D;
pub const FT_LBS_DATA: u16 = 0x0013;
pub const FT_CMO: u16 = 0x0015;

// ── Common object types (`ot`) ──────────────────────────────────────────
pub const OT_GROUP: u16 = 0x00;
pub const OT_LINE: u16 = 0x01;
pub const OT_RECTANGLE: u16 = 0x02;
pub const OT_OVAL: u16 = 0x03;
pub const OT_TEXT: u16 = 0x06;
pub const OT_PICTURE: u16 = 0x08;
pub const OT_COMBO_BOX: u16 = 0x14;
pub const OT_COMMENT: u16 = 0x19;
pub const OT_MICROSOFT_OFFICE_DRAWING: u16 = 0x1E;

pub const CMO_LOCKED: u16 = 0x0001;
pub const CMO_PRINTABLE: u16 = 0x0010;
pub const CMO_AUTOFILL: u16 = 0x2000;
pub const CMO_AUTOLINE: u16 = 0x4000;

/// ftCmo: type, id and flags of the object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonObjectData {
    pub object_type: u16,
    pub object_id: u16,
    pub options: u16,
    pub reserved: [u8; 12],
}

impl CommonObjectData {
    pub fn new(object_type: u16, object_id: u16, options: u16) -> Self {
        CommonObjectData {
            object_type,
            object_id,
            options,
            reserved: [0; 12],
        }
    }

    pub fn is_autofill(&self) -> bool {
        self.options & CMO_AUTOFILL != 0
    }

    pub fn set_autofill(&mut self, on: bool) {
        if on {
            self.options |= CMO_AUTOFILL;
        } else {
            self.options &= !CMO_AUTOFILL;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubRecord {
    Common(CommonObjectData),
    End,
    /// Any other subrecord. `declared_len` is written in place of the real
    /// length (ftLbsData declares a placeholder size).
    Other {
        sid: u16,
        declared_len: u16,
        data: Vec<u8>,
    },
}

impl SubRecord {
    pub fn other(sid: u16, data: Vec<u8>) -> Self {
        SubRecord::Other {
            sid,
            declared_len: data.len() as u16,
            data,
        }
    }

    pub fn sid(&self) -> u16 {
        match self {
            SubRecord::Common(_) => FT_CMO,
            SubRecord::End => FT_END,
            SubRecord::Other { sid, .. } => *sid,
        }
    }

    fn write(&self, out: &mut Vec<u8>) {
        match self {
            SubRecord::Common(c) => {
                put_u16(out, FT_CMO);
                put_u16(out, 18);
                put_u16(out, c.object_type);
                put_u16(out, c.object_id);
                put_u16(out, c.options);
                out.extend_from_slice(&c.reserved);
            }
            SubRecord::End => {
                put_u16(out, FT_END);
                put_u16(out, 0);
            }
            SubRecord::Other {
                sid,
                declared_len,
                data,
            } => {
                put_u16(out, *sid);
                put_u16(out, *declared_len);
                out.extend_from_slice(data);
            }
        }
    }
}

/// OBJ: subrecord list starting with ftCmo and ending with ftEnd.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObjRecord {
    pub subrecords: Vec<SubRecord>,
    /// Bytes after ftEnd (some producers pad).
    pub trailing: Vec<u8>,
}

impl ObjRecord {
    pub fn new(common: CommonObjectData) -> Self {
        ObjRecord {
            subrecords: vec![SubRecord::Common(common), SubRecord::End],
            trailing: Vec::new(),
        }
    }

    pub fn read(data: &[u8]) -> XlsResult<Self> {
        let mut o = 0;
        let mut subrecords = Vec::new();
        while o < data.len() {
            if data.len() - o < 4 {
                break;
            }
            let sid = read_u16(data, &mut o)?;
            let len = read_u16(data, &mut o)?;
            match sid {
                FT_END => {
                    subrecords.push(SubRecord::End);
                    break;
                }
                FT_CMO if len == 18 => {
                    let object_type = read_u16(data, &mut o)?;
                    let object_id = read_u16(data, &mut o)?;
                    let options = read_u16(data, &mut o)?;
                    let reserved = read_array::<12>(data, &mut o)?;
                    subrecords.push(SubRecord::Common(CommonObjectData {
                        object_type,
                        object_id,
                        options,
                        reserved,
                    }));
                }
                FT_LBS_DATA => {
                    // Declared length is a placeholder; data runs up to ftEnd.
                    let end = if data.len() >= o + 4 && data[data.len() - 4..] == [0, 0, 0, 0] {
                        data.len() - 4
                    } else {
                        data.len()
                    };
                    let n = end.saturating_sub(o);
                    let payload = read_bytes(data, &mut o, n)?;
                    subrecords.push(SubRecord::Other {
                        sid,
                        declared_len: len,
                        data: payload,
                    });
                }
                _ => {
                    let payload = read_bytes(data, &mut o, len as usize)?;
                    subrecords.push(SubRecord::Other {
                        sid,
                        declared_len: len,
                        data: payload,
                    });
                }
            }
        }
        let trailing = read_remaining(data, &mut o);
        if !matches!(subrecords.first(), Some(SubRecord::Common(_))) {
            return Err(XlsError::Parse("OBJ record does not start with ftCmo".into()));
        }
        Ok(ObjRecord {
            subrecords,
            trailing,
        })
    }

    pub fn write_body(&self, out: &mut Vec<u8>) {
        for s in &self.subrecords {
            s.write(out);
        }
        out.extend_from_slice(&self.trailing);
    }

    pub fn common(&self) -> Option<&CommonObjectData> {
        self.subrecords.iter().find_map(|s| match s {
            SubRecord::Common(c) => Some(c),
            _ => None,
        })
    }

    pub fn common_mut(&mut self) -> Option<&mut CommonObjectData> {
        self.subrecords.iter_mut().find_map(|s| match s {
            SubRecord::Common(c) => Some(c),
            _ => None,
        })
    }

    /// Insert before the trailing ftEnd.
    pub fn add_subrecord(&mut self, sub: SubRecord) {
        let at = match self.subrecords.last() {
            Some(SubRecord::End) => self.subrecords.len() - 1,
            _ => self.subrecords.len(),
        };
        self.subrecords.insert(at, sub);
    }
}

// ── TXO ─────────────────────────────────────────────────────────────────

pub const TXO_HALIGN_LEFT: u16 = 1 << 1;
pub const TXO_VALIGN_TOP: u16 = 1 << 4;

/// One formatting run of a text object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxoRun {
    pub pos: u16,
    pub font: u16,
    pub reserved: u32,
}

/// TXO: text of a textbox/comment. The text and its runs live in the
/// following CONTINUE records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxoRecord {
    pub options: u16,
    pub rotation: u16,
    pub reserved: [u8; 6],
    pub reserved2: u32,
    /// Optional ObjFmla bytes after the fixed header.
    pub formula: Vec<u8>,
    pub text: XlString,
    pub runs: Vec<TxoRun>,
}

impl TxoRecord {
    pub fn new(text: &str, options: u16) -> Self {
        let text = XlString::new(text);
        let len = text.char_count() as u16;
        TxoRecord {
            options,
            rotation: 0,
            reserved: [0; 6],
            reserved2: 0,
            formula: Vec::new(),
            text,
            runs: vec![
                TxoRun {
                    pos: 0,
                    font: 0,
                    reserved: 0,
                },
                TxoRun {
                    pos: len,
                    font: 0,
                    reserved: 0,
                },
            ],
        }
    }

    pub fn read(data: &[u8], continue_offsets: &[usize]) -> XlsResult<Self> {
        let base_end = continue_offsets.first().copied().unwrap_or(data.len());
        let base = &data[..base_end];
        let mut o = 0;
        let options = read_u16(base, &mut o)?;
        let rotation = read_u16(base, &mut o)?;
        let reserved = read_array::<6>(base, &mut o)?;
        let cch = read_u16(base, &mut o)? as usize;
        let cb_runs = read_u16(base, &mut o)? as usize;
        let reserved2 = read_u32(base, &mut o)?;
        let formula = read_remaining(base, &mut o);

        let mut o = base_end;
        let mut units: Vec<u16> = Vec::with_capacity(cch);
        let mut wide_any = false;
        while units.len() < cch {
            let chunk_end = continue_offsets
                .iter()
                .copied()
                .find(|&b| b > o)
                .unwrap_or(data.len());
            let flags = read_u8(data, &mut o)?;
            let wide = flags & 0x01 != 0;
            wide_any |= wide;
            let width = if wide { 2 } else { 1 };
            let take = ((chunk_end - o) / width).min(cch - units.len());
            if take == 0 {
                return Err(XlsError::Parse("TXO text truncated".into()));
            }
            let raw = read_bytes(data, &mut o, take * width)?;
            if wide {
                units.extend(raw.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]])));
            } else {
                units.extend(raw.iter().map(|&b| b as u16));
            }
            // Text and runs never share a physical record.
            o = chunk_end;
        }
        let text = String::from_utf16(&units)
            .map_err(|e| XlsError::Parse(format!("invalid UTF-16 in TXO: {e}")))?;

        let mut runs = Vec::with_capacity(cb_runs / 8);
        if cch > 0 {
            let end = (o + cb_runs).min(data.len());
            while o + 8 <= end {
                runs.push(TxoRun {
                    pos: read_u16(data, &mut o)?,
                    font: read_u16(data, &mut o)?,
                    reserved: read_u32(data, &mut o)?,
                });
            }
        }

        Ok(TxoRecord {
            options,
            rotation,
            reserved,
            reserved2,
            formula,
            text: XlString {
                text,
                wide: wide_any,
            },
            runs,
        })
    }

    /// Write the TXO and its text/run CONTINUE records.
    pub fn serialize(&self, out: &mut Vec<u8>) {
        let cch = self.text.char_count();
        let mut base = Vec::with_capacity(18 + self.formula.len());
        put_u16(&mut base, self.options);
        put_u16(&mut base, self.rotation);
        base.extend_from_slice(&self.reserved);
        put_u16(&mut base, cch as u16);
        put_u16(&mut base, if cch > 0 { (self.runs.len() * 8) as u16 } else { 0 });
        put_u32(&mut base, self.reserved2);
        base.extend_from_slice(&self.formula);
        write_physical(out, TXO, &base);

        if cch == 0 {
            return;
        }

        let mut chars = Vec::with_capacity(self.text.data_len());
        write_character_data(&mut chars, &self.text);
        let width = if self.text.wide { 2 } else { 1 };
        let per_chunk = (MAX_RECORD_DATA_SIZE - 1) / width * width;
        for piece in chars.chunks(per_chunk) {
            let mut body = Vec::with_capacity(piece.len() + 1);
            body.push(self.text.wide as u8);
            body.extend_from_slice(piece);
            write_physical(out, CONTINUE, &body);
        }

        let mut runs = Vec::with_capacity(self.runs.len() * 8);
        for r in &self.runs {
            put_u16(&mut runs, r.pos);
            put_u16(&mut runs, r.font);
            put_u32(&mut runs, r.reserved);
        }
        for piece in runs.chunks(MAX_RECORD_DATA_SIZE) {
            write_physical(out, CONTINUE, piece);
        }
        if runs.is_empty() {
            write_physical(out, CONTINUE, &[]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biff::read_records_from_bytes;

    #[test]
    fn test_obj_round_trip_with_lbs_data() {
        let mut obj = ObjRecord::new(CommonObjectData::new(OT_COMBO_BOX, 1, 0x2011));
        obj.add_subrecord(SubRecord::other(FT_SBS, vec![0; 20]));
        obj.add_subrecord(SubRecord::Other {
            sid: FT_LBS_DATA,
            declared_len: 0x1FEE,
            data: vec![0, 0, 8, 0, 0, 0, 1, 3],
        });
        let mut body = Vec::new();
        obj.write_body(&mut body);
        let back = ObjRecord::read(&body).unwrap();
        assert_eq!(back, obj);
        assert_eq!(back.common().map(|c| c.object_type), Some(OT_COMBO_BOX));
    }

    #[test]
    fn test_obj_requires_cmo() {
        assert!(ObjRecord::read(&[0, 0, 0, 0]).is_err());
    }

    #[test]
    fn test_txo_round_trip() {
        let txo = TxoRecord::new("Hello", TXO_HALIGN_LEFT | TXO_VALIGN_TOP);
        let mut out = Vec::new();
        txo.serialize(&mut out);
        let recs = read_records_from_bytes(&out).unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].continue_offsets.len(), 2);
        let back = TxoRecord::read(&recs[0].data, &recs[0].continue_offsets).unwrap();
        assert_eq!(back, txo);
        assert_eq!(back.runs[1].pos, 5);
    }

    #[test]
    fn test_empty_txo_has_no_continues() {
        let mut txo = TxoRecord::new("", 0);
        txo.runs.clear();
        let mut out = Vec::new();
        txo.serialize(&mut out);
        assert_eq!(out.len(), 4 + 18);
        let recs = read_records_from_bytes(&out).unwrap();
        assert_eq!(TxoRecord::read(&recs[0].data, &[]).unwrap(), txo);
    }
}
