//! Decoded BIFF8 records.
//!
//! [`Record`] has one variant per record type the model inspects or mutates.
//! Every other record type decodes to [`Record::Raw`] and is written back
//! unmodified, with its original CONTINUE layout.

pub mod cell;
pub mod obj;
pub mod sheet;
pub mod sst;
pub mod workbook;

pub use cell::{
    ArrayRecord, BlankRecord, BoolErrRecord, CellRangeAddress8, FormulaRecord, LabelRecord,
    LabelSstRecord, MulBlankRecord, MulRkRecord, NumberRecord, RkRecord, RowRecord,
    SharedFormulaRecord, StringRecord, TableRecord,
};
pub use obj::{CommonObjectData, ObjRecord, SubRecord, TxoRecord, TxoRun};
pub use sheet::{
    CellRangeAddress, CfHeaderRecord, ColumnInfoRecord, DbCellRecord, DefaultRowHeightRecord,
    DimensionsRecord, DvalRecord, GutsRecord, HeaderFooterRecord, IndexRecord, MergeCellsRecord,
    NoteRecord, PageBreakRecord, PaneRecord, SelectionRecord, Window2Record,
};
pub use sst::{ExtSstRecord, SstRecord};
pub use workbook::{
    BofRecord, BoundSheetRecord, ExtendedFormatRecord, ExternNameRecord, ExternSheetRecord,
    FileSharingRecord, FontRecord, FormatRecord, NameRecord, PaletteRecord, StyleRecord,
    SupBookRecord, TabIdRecord, Window1Record,
};

use crate::biff::records::*;
use crate::biff::writer::{size_with_continues, write_with_continues};
use crate::biff::{parse_bof, BiffRecord};
use crate::error::{XlsError, XlsResult};

/// A record type this crate does not model; kept byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub sid: u16,
    pub data: Vec<u8>,
    pub continue_offsets: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    // Stream structure
    Bof(BofRecord),
    Eof,
    Index(IndexRecord),
    DbCell(DbCellRecord),

    // Sheet structure
    Dimensions(DimensionsRecord),
    Window2(Window2Record),
    Pane(PaneRecord),
    Selection(SelectionRecord),
    DefColWidth(u16),
    DefaultRowHeight(DefaultRowHeightRecord),
    Guts(GutsRecord),
    WsBool(u16),
    ColumnInfo(ColumnInfoRecord),
    MergeCells(MergeCellsRecord),

    // Rows and cells
    Row(RowRecord),
    Number(NumberRecord),
    Rk(RkRecord),
    LabelSst(LabelSstRecord),
    Label(LabelRecord),
    Blank(BlankRecord),
    BoolErr(BoolErrRecord),
    Formula(FormulaRecord),
    MulRk(MulRkRecord),
    MulBlank(MulBlankRecord),
    FormulaString(StringRecord),
    SharedFormula(SharedFormulaRecord),
    Array(ArrayRecord),
    Table(TableRecord),

    // Protection
    Protect(u16),
    ObjProtect(u16),
    ScenProtect(u16),
    Password(u16),

    // Page settings
    Header(HeaderFooterRecord),
    Footer(HeaderFooterRecord),
    HCenter(u16),
    VCenter(u16),
    LeftMargin(f64),
    RightMargin(f64),
    TopMargin(f64),
    BottomMargin(f64),
    HorizontalPageBreaks(PageBreakRecord),
    VerticalPageBreaks(PageBreakRecord),

    // Conditional formatting / validation headers
    CfHeader(CfHeaderRecord),
    Dval(DvalRecord),

    // Drawing objects
    Obj(ObjRecord),
    Txo(TxoRecord),
    Note(NoteRecord),

    // Workbook globals
    BoundSheet(BoundSheetRecord),
    Font(FontRecord),
    Format(FormatRecord),
    Xf(ExtendedFormatRecord),
    Style(StyleRecord),
    Sst(SstRecord),
    ExtSst(ExtSstRecord),
    TabId(TabIdRecord),
    Palette(PaletteRecord),
    FileSharing(FileSharingRecord),
    Window1(Window1Record),
    DateMode(u16),
    Backup(u16),
    SupBook(SupBookRecord),
    ExternSheet(ExternSheetRecord),
    ExternName(ExternNameRecord),
    Name(NameRecord),

    Raw(RawRecord),
}

fn single_u16(data: &[u8]) -> XlsResult<u16> {
    if data.len() != 2 {
        return Err(XlsError::Parse(format!("expected 2-byte body, got {}", data.len())));
    }
    Ok(u16::from_le_bytes([data[0], data[1]]))
}

impl Record {
    /// A raw record with a single-chunk body.
    pub fn raw(sid: u16, data: Vec<u8>) -> Record {
        Record::Raw(RawRecord {
            sid,
            data,
            continue_offsets: Vec::new(),
        })
    }

    /// Decode a physical record. Bodies a typed decoder rejects are kept raw.
    pub fn decode(biff: &BiffRecord) -> Record {
        match Self::decode_typed(biff) {
            Ok(Some(r)) => r,
            Ok(None) => Self::raw_from(biff),
            Err(e) => {
                log::debug!(
                    "keeping {} (0x{:04X}) at offset {} raw: {e}",
                    record_name(biff.record_type),
                    biff.record_type,
                    biff.stream_offset
                );
                Self::raw_from(biff)
            }
        }
    }

    fn raw_from(biff: &BiffRecord) -> Record {
        Record::Raw(RawRecord {
            sid: biff.record_type,
            data: biff.data.clone(),
            continue_offsets: biff.continue_offsets.clone(),
        })
    }

    fn decode_typed(biff: &BiffRecord) -> XlsResult<Option<Record>> {
        let d = &biff.data[..];
        // SST, TXO and EXTERNSHEET decode across CONTINUE data; any other
        // continued record stays raw to keep its layout.
        let continued = !biff.continue_offsets.is_empty();
        let r = match biff.record_type {
            SST => Record::Sst(SstRecord::read(d, &biff.continue_offsets)?),
            TXO => Record::Txo(TxoRecord::read(d, &biff.continue_offsets)?),
            EXTERNSHEET => Record::ExternSheet(ExternSheetRecord::read(d)?),
            _ if continued => return Ok(None),
            BOF => Record::Bof(BofRecord::read(d)?),
            EOF => Record::Eof,
            INDEX => Record::Index(IndexRecord::read(d)?),
            DBCELL => Record::DbCell(DbCellRecord::read(d)?),
            DIMENSION => Record::Dimensions(DimensionsRecord::read(d)?),
            WINDOW2 => Record::Window2(Window2Record::read(d)?),
            PANE => Record::Pane(PaneRecord::read(d)?),
            SELECTION => Record::Selection(SelectionRecord::read(d)?),
            DEFCOLWIDTH => Record::DefColWidth(single_u16(d)?),
            DEFAULTROWHEIGHT => Record::DefaultRowHeight(DefaultRowHeightRecord::read(d)?),
            GUTS => Record::Guts(GutsRecord::read(d)?),
            WSBOOL => Record::WsBool(single_u16(d)?),
            COLINFO => Record::ColumnInfo(ColumnInfoRecord::read(d)?),
            MERGECELLS => Record::MergeCells(MergeCellsRecord::read(d)?),
            ROW => Record::Row(RowRecord::read(d)?),
            NUMBER => Record::Number(NumberRecord::read(d)?),
            RK => Record::Rk(RkRecord::read(d)?),
            LABELSST => Record::LabelSst(LabelSstRecord::read(d)?),
            LABEL => Record::Label(LabelRecord::read(d)?),
            BLANK => Record::Blank(BlankRecord::read(d)?),
            BOOLERR => Record::BoolErr(BoolErrRecord::read(d)?),
            FORMULA => Record::Formula(FormulaRecord::read(d)?),
            MULRK => Record::MulRk(MulRkRecord::read(d)?),
            MULBLANK => Record::MulBlank(MulBlankRecord::read(d)?),
            STRING => Record::FormulaString(StringRecord::read(d)?),
            SHRFMLA => Record::SharedFormula(SharedFormulaRecord::read(d)?),
            ARRAY => Record::Array(ArrayRecord::read(d)?),
            TABLE => Record::Table(TableRecord::read(d)?),
            PROTECT => Record::Protect(single_u16(d)?),
            OBJPROTECT => Record::ObjProtect(single_u16(d)?),
            SCENPROTECT => Record::ScenProtect(single_u16(d)?),
            PASSWORD => Record::Password(single_u16(d)?),
            HEADER => Record::Header(HeaderFooterRecord::read(d)?),
            FOOTER => Record::Footer(HeaderFooterRecord::read(d)?),
            HCENTER => Record::HCenter(single_u16(d)?),
            VCENTER => Record::VCenter(single_u16(d)?),
            LEFTMARGIN => Record::LeftMargin(sheet::read_margin(d)?),
            RIGHTMARGIN => Record::RightMargin(sheet::read_margin(d)?),
            TOPMARGIN => Record::TopMargin(sheet::read_margin(d)?),
            BOTTOMMARGIN => Record::BottomMargin(sheet::read_margin(d)?),
            HORIZONTALPAGEBREAKS => Record::HorizontalPageBreaks(PageBreakRecord::read(d)?),
            VERTICALPAGEBREAKS => Record::VerticalPageBreaks(PageBreakRecord::read(d)?),
            CFHEADER => Record::CfHeader(CfHeaderRecord::read(d)?),
            DVAL => Record::Dval(DvalRecord::read(d)?),
            OBJ => Record::Obj(ObjRecord::read(d)?),
            NOTE => Record::Note(NoteRecord::read(d)?),
            BOUNDSHEET => Record::BoundSheet(BoundSheetRecord::read(d)?),
            FONT => Record::Font(FontRecord::read(d)?),
            FORMAT => Record::Format(FormatRecord::read(d)?),
            XF => Record::Xf(ExtendedFormatRecord::read(d)?),
            STYLE => Record::Style(StyleRecord::read(d)?),
            EXTSST => Record::ExtSst(ExtSstRecord::read(d)?),
            TABID => Record::TabId(TabIdRecord::read(d)?),
            PALETTE => Record::Palette(PaletteRecord::read(d)?),
            FILESHARING => Record::FileSharing(FileSharingRecord::read(d)?),
            WINDOW1 => Record::Window1(Window1Record::read(d)?),
            DATEMODE => Record::DateMode(single_u16(d)?),
            BACKUP => Record::Backup(single_u16(d)?),
            SUPBOOK => Record::SupBook(SupBookRecord::read(d)?),
            EXTERNNAME => Record::ExternName(ExternNameRecord::read(d)?),
            NAME => Record::Name(NameRecord::read(d)?),
            _ => return Ok(None),
        };
        Ok(Some(r))
    }

    pub fn sid(&self) -> u16 {
        match self {
            Record::Bof(_) => BOF,
            Record::Eof => EOF,
            Record::Index(_) => INDEX,
            Record::DbCell(_) => DBCELL,
            Record::Dimensions(_) => DIMENSION,
            Record::Window2(_) => WINDOW2,
            Record::Pane(_) => PANE,
            Record::Selection(_) => SELECTION,
            Record::DefColWidth(_) => DEFCOLWIDTH,
            Record::DefaultRowHeight(_) => DEFAULTROWHEIGHT,
            Record::Guts(_) => GUTS,
            Record::WsBool(_) => WSBOOL,
            Record::ColumnInfo(_) => COLINFO,
            Record::MergeCells(_) => MERGECELLS,
            Record::Row(_) => ROW,
            Record::Number(_) => NUMBER,
            Record::Rk(_) => RK,
            Record::LabelSst(_) => LABELSST,
            Record::Label(_) => LABEL,
            Record::Blank(_) => BLANK,
            Record::BoolErr(_) => BOOLERR,
            Record::Formula(_) => FORMULA,
            Record::MulRk(_) => MULRK,
            Record::MulBlank(_) => MULBLANK,
            Record::FormulaString(_) => STRING,
            Record::SharedFormula(_) => SHRFMLA,
            Record::Array(_) => ARRAY,
            Record::Table(_) => TABLE,
            Record::Protect(_) => PROTECT,
            Record::ObjProtect(_) => OBJPROTECT,
            Record::ScenProtect(_) => SCENPROTECT,
            Record::Password(_) => PASSWORD,
            Record::Header(_) => HEADER,
            Record::Footer(_) => FOOTER,
            Record::HCenter(_) => HCENTER,
            Record::VCenter(_) => VCENTER,
            Record::LeftMargin(_) => LEFTMARGIN,
            Record::RightMargin(_) => RIGHTMARGIN,
            Record::TopMargin(_) => TOPMARGIN,
            Record::BottomMargin(_) => BOTTOMMARGIN,
            Record::HorizontalPageBreaks(_) => HORIZONTALPAGEBREAKS,
            Record::VerticalPageBreaks(_) => VERTICALPAGEBREAKS,
            Record::CfHeader(_) => CFHEADER,
            Record::Dval(_) => DVAL,
            Record::Obj(_) => OBJ,
            Record::Txo(_) => TXO,
            Record::Note(_) => NOTE,
            Record::BoundSheet(_) => BOUNDSHEET,
            Record::Font(_) => FONT,
            Record::Format(_) => FORMAT,
            Record::Xf(_) => XF,
            Record::Style(_) => STYLE,
            Record::Sst(_) => SST,
            Record::ExtSst(_) => EXTSST,
            Record::TabId(_) => TABID,
            Record::Palette(_) => PALETTE,
            Record::FileSharing(_) => FILESHARING,
            Record::Window1(_) => WINDOW1,
            Record::DateMode(_) => DATEMODE,
            Record::Backup(_) => BACKUP,
            Record::SupBook(_) => SUPBOOK,
            Record::ExternSheet(_) => EXTERNSHEET,
            Record::ExternName(_) => EXTERNNAME,
            Record::Name(_) => NAME,
            Record::Raw(r) => r.sid,
        }
    }

    /// Body bytes of single-body records.
    fn write_body(&self, out: &mut Vec<u8>) {
        use crate::biff::writer::put_u16;
        match self {
            Record::Bof(r) => r.write_body(out),
            Record::Eof => {}
            Record::Index(r) => r.write_body(out),
            Record::DbCell(r) => r.write_body(out),
            Record::Dimensions(r) => r.write_body(out),
            Record::Window2(r) => r.write_body(out),
            Record::Pane(r) => r.write_body(out),
            Record::Selection(r) => r.write_body(out),
            Record::DefColWidth(v)
            | Record::WsBool(v)
            | Record::Protect(v)
            | Record::ObjProtect(v)
            | Record::ScenProtect(v)
            | Record::Password(v)
            | Record::HCenter(v)
            | Record::VCenter(v)
            | Record::DateMode(v)
            | Record::Backup(v) => put_u16(out, *v),
            Record::DefaultRowHeight(r) => r.write_body(out),
            Record::Guts(r) => r.write_body(out),
            Record::ColumnInfo(r) => r.write_body(out),
            Record::MergeCells(r) => r.write_body(out),
            Record::Row(r) => r.write_body(out),
            Record::Number(r) => r.write_body(out),
            Record::Rk(r) => r.write_body(out),
            Record::LabelSst(r) => r.write_body(out),
            Record::Label(r) => r.write_body(out),
            Record::Blank(r) => r.write_body(out),
            Record::BoolErr(r) => r.write_body(out),
            Record::Formula(r) => r.write_body(out),
            Record::MulRk(r) => r.write_body(out),
            Record::MulBlank(r) => r.write_body(out),
            Record::FormulaString(r) => r.write_body(out),
            Record::SharedFormula(r) => r.write_body(out),
            Record::Array(r) => r.write_body(out),
            Record::Table(r) => r.write_body(out),
            Record::Header(r) | Record::Footer(r) => r.write_body(out),
            Record::LeftMargin(v)
            | Record::RightMargin(v)
            | Record::TopMargin(v)
            | Record::BottomMargin(v) => sheet::write_margin(out, *v),
            Record::HorizontalPageBreaks(r) | Record::VerticalPageBreaks(r) => r.write_body(out),
            Record::CfHeader(r) => r.write_body(out),
            Record::Dval(r) => r.write_body(out),
            Record::Obj(r) => r.write_body(out),
            Record::Note(r) => r.write_body(out),
            Record::BoundSheet(r) => r.write_body(out),
            Record::Font(r) => r.write_body(out),
            Record::Format(r) => r.write_body(out),
            Record::Xf(r) => r.write_body(out),
            Record::Style(r) => r.write_body(out),
            Record::ExtSst(r) => r.write_body(out),
            Record::TabId(r) => r.write_body(out),
            Record::Palette(r) => r.write_body(out),
            Record::FileSharing(r) => r.write_body(out),
            Record::Window1(r) => r.write_body(out),
            Record::SupBook(r) => r.write_body(out),
            Record::ExternSheet(r) => r.write_body(out),
            Record::ExternName(r) => r.write_body(out),
            Record::Name(r) => r.write_body(out),
            Record::Raw(r) => out.extend_from_slice(&r.data),
            // Multi-record layouts are written by `serialize`.
            Record::Sst(_) | Record::Txo(_) => {}
        }
    }

    /// Append the physical record(s), CONTINUE records included.
    pub fn serialize(&self, out: &mut Vec<u8>) {
        match self {
            Record::Sst(r) => r.serialize(out),
            Record::Txo(r) => r.serialize(out),
            Record::Raw(r) => write_with_continues(out, r.sid, &r.data, &r.continue_offsets),
            _ => {
                let mut body = Vec::new();
                self.write_body(&mut body);
                write_with_continues(out, self.sid(), &body, &[]);
            }
        }
    }

    /// Serialized size in bytes, headers and continuations included.
    pub fn record_size(&self) -> usize {
        match self {
            Record::Sst(r) => r.record_size(),
            Record::Raw(r) => size_with_continues(r.data.len(), &r.continue_offsets),
            Record::Txo(_) => {
                let mut out = Vec::new();
                self.serialize(&mut out);
                out.len()
            }
            _ => {
                let mut body = Vec::new();
                self.write_body(&mut body);
                size_with_continues(body.len(), &[])
            }
        }
    }

    /// Substream type if this is a BOF, typed or raw.
    pub fn bof_kind(&self) -> Option<u16> {
        match self {
            Record::Bof(b) => Some(b.kind),
            Record::Raw(r) if r.sid == BOF => parse_bof(&r.data).ok().map(|(_, dt)| dt),
            _ => None,
        }
    }
}

/// Decode a whole stream of physical records.
pub fn decode_all(records: &[BiffRecord]) -> Vec<Record> {
    records.iter().map(Record::decode).collect()
}

/// Serialize a slice of records back to bytes.
pub fn serialize_all(records: &[Record]) -> Vec<u8> {
    let mut out = Vec::new();
    for r in records {
        r.serialize(&mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biff::read_records_from_bytes;

    fn round_trip(r: &Record) -> Record {
        let bytes = serialize_all(std::slice::from_ref(r));
        assert_eq!(bytes.len(), r.record_size());
        let recs = read_records_from_bytes(&bytes).unwrap();
        assert_eq!(recs.len(), 1);
        Record::decode(&recs[0])
    }

    #[test]
    fn test_typed_records_round_trip() {
        let samples = vec![
            Record::Bof(BofRecord::worksheet()),
            Record::Eof,
            Record::Dimensions(DimensionsRecord {
                first_row: 0,
                last_row: 4,
                first_col: 1,
                last_col: 3,
                reserved: 0,
            }),
            Record::Window2(Window2Record::default()),
            Record::DefColWidth(8),
            Record::Number(NumberRecord {
                row: 1,
                col: 2,
                xf: 15,
                value: 1.5,
            }),
            Record::LeftMargin(0.75),
            Record::Font(FontRecord::default()),
            Record::Name(NameRecord::new("MyName", 0)),
        ];
        for r in &samples {
            assert_eq!(&round_trip(r), r);
        }
    }

    #[test]
    fn test_unknown_sid_is_raw() {
        let biff = BiffRecord::new(0x0862, vec![1, 2, 3]);
        let r = Record::decode(&biff);
        assert!(matches!(r, Record::Raw(_)));
        assert_eq!(r.sid(), SHEETEXT);
        assert_eq!(r.record_size(), 7);
    }

    #[test]
    fn test_malformed_typed_body_is_kept_raw() {
        let biff = BiffRecord::new(DEFCOLWIDTH, vec![1, 2, 3]);
        let r = Record::decode(&biff);
        assert!(matches!(r, Record::Raw(_)));
        assert_eq!(r.sid(), DEFCOLWIDTH);
    }

    #[test]
    fn test_raw_bof_kind() {
        let r = Record::raw(BOF, vec![0x00, 0x06, 0x20, 0x00]);
        assert_eq!(r.bof_kind(), Some(BOF_CHART));
    }
}
