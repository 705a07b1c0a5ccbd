//! Page settings block: breaks, header/footer, centring, margins, printer
//! setup. Excel tolerates the components in any order on read; they are
//! written back in one canonical order.

use crate::biff::records::*;
use crate::biff::strings::XlString;
use crate::biff::writer::{put_f64, put_u16};
use crate::error::{XlsError, XlsResult};
use crate::ordering::is_page_settings_component;
use crate::record::{HeaderFooterRecord, PageBreakRecord, Record};
use crate::stream::RecordStream;

use super::{RecordAggregate, RecordVisitor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Margin {
    Left,
    Right,
    Top,
    Bottom,
}

impl Margin {
    fn slot(self) -> usize {
        self as usize
    }

    pub fn sid(self) -> u16 {
        match self {
            Margin::Left => LEFTMARGIN,
            Margin::Right => RIGHTMARGIN,
            Margin::Top => TOPMARGIN,
            Margin::Bottom => BOTTOMMARGIN,
        }
    }

    /// Inches Excel assumes when the record is absent.
    pub fn default_value(self) -> f64 {
        match self {
            Margin::Left | Margin::Right => 0.75,
            Margin::Top | Margin::Bottom => 1.0,
        }
    }

    const ALL: [Margin; 4] = [Margin::Left, Margin::Right, Margin::Top, Margin::Bottom];
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageSettingsBlock {
    row_breaks: Option<PageBreakRecord>,
    column_breaks: Option<PageBreakRecord>,
    header: Option<HeaderFooterRecord>,
    footer: Option<HeaderFooterRecord>,
    h_center: Option<u16>,
    v_center: Option<u16>,
    margins: [Option<f64>; 4],
    pls: Vec<Record>,
    print_setup: Option<Record>,
    print_size: Option<Record>,
    header_footer: Option<Record>,
    bitmap: Option<Record>,
}

/// SETUP body Excel writes for a new sheet: letter paper, 100%, portrait,
/// 300 dpi, half-inch header and footer margins, one copy.
fn default_print_setup() -> Record {
    let mut b = Vec::with_capacity(34);
    for v in [1u16, 100, 1, 1, 1, 2, 300, 300] {
        put_u16(&mut b, v);
    }
    put_f64(&mut b, 0.5);
    put_f64(&mut b, 0.5);
    put_u16(&mut b, 1);
    Record::raw(SETUP, b)
}

fn duplicate(sid: u16) -> XlsError {
    XlsError::structural(
        sid,
        format!("duplicate {} in page settings block", record_label(sid)),
    )
}

fn malformed(sid: u16) -> XlsError {
    XlsError::structural(sid, "malformed page settings record")
}

fn record_label(sid: u16) -> String {
    match record_name(sid) {
        "record" => format!("record 0x{sid:04X}"),
        name => name.to_string(),
    }
}

fn put_once<T>(slot: &mut Option<T>, value: T, sid: u16) -> XlsResult<()> {
    if slot.is_some() {
        return Err(duplicate(sid));
    }
    *slot = Some(value);
    Ok(())
}

impl PageSettingsBlock {
    /// Block for a new sheet: empty breaks, empty header and footer, no
    /// centring, default print setup.
    pub fn create_default() -> Self {
        PageSettingsBlock {
            row_breaks: Some(PageBreakRecord::default()),
            column_breaks: Some(PageBreakRecord::default()),
            header: Some(HeaderFooterRecord {
                text: Some(XlString::new("")),
            }),
            footer: Some(HeaderFooterRecord {
                text: Some(XlString::new("")),
            }),
            h_center: Some(0),
            v_center: Some(0),
            print_setup: Some(default_print_setup()),
            ..Default::default()
        }
    }

    pub fn is_component_record(sid: u16) -> bool {
        is_page_settings_component(sid)
    }

    /// Consume the run of components at the head of the stream.
    pub fn read(rs: &mut RecordStream) -> XlsResult<Self> {
        let mut block = PageSettingsBlock::default();
        while block.read_a_record(rs)? {}
        Ok(block)
    }

    /// Components that turn up after other records were read; a component
    /// already present is still a structural error.
    pub fn add_late_records(&mut self, rs: &mut RecordStream) -> XlsResult<()> {
        while self.read_a_record(rs)? {}
        Ok(())
    }

    fn read_a_record(&mut self, rs: &mut RecordStream) -> XlsResult<bool> {
        let Some(sid) = rs.peek_next_sid() else {
            return Ok(false);
        };
        if !is_page_settings_component(sid) {
            return Ok(false);
        }
        let rec = rs.next()?;
        match rec {
            Record::HorizontalPageBreaks(r) => put_once(&mut self.row_breaks, r, sid)?,
            Record::VerticalPageBreaks(r) => put_once(&mut self.column_breaks, r, sid)?,
            Record::Header(r) => put_once(&mut self.header, r, sid)?,
            Record::Footer(r) => put_once(&mut self.footer, r, sid)?,
            Record::HCenter(v) => put_once(&mut self.h_center, v, sid)?,
            Record::VCenter(v) => put_once(&mut self.v_center, v, sid)?,
            Record::LeftMargin(v)
            | Record::RightMargin(v)
            | Record::TopMargin(v)
            | Record::BottomMargin(v) => {
                let m = Margin::ALL
                    .into_iter()
                    .find(|m| m.sid() == sid)
                    .ok_or_else(|| malformed(sid))?;
                put_once(&mut self.margins[m.slot()], v, sid)?;
            }
            other => match sid {
                PLS => self.pls.push(other),
                SETUP => put_once(&mut self.print_setup, other, sid)?,
                PRINTSIZE => put_once(&mut self.print_size, other, sid)?,
                HEADERFOOTER => put_once(&mut self.header_footer, other, sid)?,
                BITMAP => put_once(&mut self.bitmap, other, sid)?,
                _ => return Err(malformed(sid)),
            },
        }
        Ok(true)
    }

    // ── Margins ─────────────────────────────────────────────────────────

    pub fn margin(&self, m: Margin) -> f64 {
        self.margins[m.slot()].unwrap_or_else(|| m.default_value())
    }

    pub fn set_margin(&mut self, m: Margin, inches: f64) {
        self.margins[m.slot()] = Some(inches);
    }

    // ── Header / footer ─────────────────────────────────────────────────

    pub fn header_text(&self) -> Option<&str> {
        self.header.as_ref()?.text.as_ref().map(|t| t.text.as_str())
    }

    pub fn set_header(&mut self, text: &str) {
        self.header = Some(HeaderFooterRecord {
            text: Some(XlString::new(text)),
        });
    }

    pub fn footer_text(&self) -> Option<&str> {
        self.footer.as_ref()?.text.as_ref().map(|t| t.text.as_str())
    }

    pub fn set_footer(&mut self, text: &str) {
        self.footer = Some(HeaderFooterRecord {
            text: Some(XlString::new(text)),
        });
    }

    // ── Centring ────────────────────────────────────────────────────────

    pub fn h_center(&self) -> bool {
        self.h_center.unwrap_or(0) != 0
    }

    pub fn set_h_center(&mut self, on: bool) {
        self.h_center = Some(on as u16);
    }

    pub fn v_center(&self) -> bool {
        self.v_center.unwrap_or(0) != 0
    }

    pub fn set_v_center(&mut self, on: bool) {
        self.v_center = Some(on as u16);
    }

    // ── Page breaks ─────────────────────────────────────────────────────

    /// Break below `row`, spanning columns `from_col..=to_col`.
    pub fn set_row_break(&mut self, row: u16, from_col: u16, to_col: u16) {
        self.row_breaks
            .get_or_insert_with(PageBreakRecord::default)
            .add_break(row, from_col, to_col);
    }

    pub fn remove_row_break(&mut self, row: u16) {
        if let Some(b) = &mut self.row_breaks {
            b.remove_break(row);
        }
    }

    pub fn is_row_broken(&self, row: u16) -> bool {
        self.row_breaks
            .as_ref()
            .is_some_and(|b| b.get_break(row).is_some())
    }

    pub fn row_breaks(&self) -> Vec<u16> {
        self.row_breaks
            .as_ref()
            .map(|b| b.breaks.iter().map(|b| b.main).collect())
            .unwrap_or_default()
    }

    /// Break right of `col`, spanning rows `from_row..=to_row`.
    pub fn set_column_break(&mut self, col: u16, from_row: u16, to_row: u16) {
        self.column_breaks
            .get_or_insert_with(PageBreakRecord::default)
            .add_break(col, from_row, to_row);
    }

    pub fn remove_column_break(&mut self, col: u16) {
        if let Some(b) = &mut self.column_breaks {
            b.remove_break(col);
        }
    }

    pub fn is_column_broken(&self, col: u16) -> bool {
        self.column_breaks
            .as_ref()
            .is_some_and(|b| b.get_break(col).is_some())
    }

    pub fn column_breaks(&self) -> Vec<u16> {
        self.column_breaks
            .as_ref()
            .map(|b| b.breaks.iter().map(|b| b.main).collect())
            .unwrap_or_default()
    }

    /// The SETUP record, if any.
    pub fn print_setup(&self) -> Option<&Record> {
        self.print_setup.as_ref()
    }
}

fn visit_if_present(rec: Option<Record>, visitor: &mut dyn RecordVisitor) {
    if let Some(r) = rec {
        visitor.visit_record(&r);
    }
}

impl RecordAggregate for PageSettingsBlock {
    fn visit_contained_records(&self, visitor: &mut dyn RecordVisitor) {
        visit_if_present(
            self.row_breaks.clone().map(Record::HorizontalPageBreaks),
            visitor,
        );
        visit_if_present(
            self.column_breaks.clone().map(Record::VerticalPageBreaks),
            visitor,
        );
        visit_if_present(self.header.clone().map(Record::Header), visitor);
        visit_if_present(self.footer.clone().map(Record::Footer), visitor);
        visit_if_present(self.h_center.map(Record::HCenter), visitor);
        visit_if_present(self.v_center.map(Record::VCenter), visitor);
        for m in Margin::ALL {
            let rec = self.margins[m.slot()].map(|v| match m {
                Margin::Left => Record::LeftMargin(v),
                Margin::Right => Record::RightMargin(v),
                Margin::Top => Record::TopMargin(v),
                Margin::Bottom => Record::BottomMargin(v),
            });
            visit_if_present(rec, visitor);
        }
        for pls in &self.pls {
            visitor.visit_record(pls);
        }
        for r in [
            &self.print_setup,
            &self.print_size,
            &self.header_footer,
            &self.bitmap,
        ]
        .into_iter()
        .flatten()
        {
            visitor.visit_record(r);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_order() {
        let mut rs = RecordStream::new(vec![
            Record::TopMargin(1.5),
            Record::Footer(HeaderFooterRecord::default()),
            Record::raw(SETUP, vec![0; 34]),
            Record::HCenter(1),
            Record::Window2(Default::default()),
        ]);
        let block = PageSettingsBlock::read(&mut rs).unwrap();
        assert_eq!(rs.peek_next_sid(), Some(WINDOW2));
        let sids: Vec<u16> = block.records().iter().map(Record::sid).collect();
        assert_eq!(sids, vec![FOOTER, HCENTER, TOPMARGIN, SETUP]);
        assert_eq!(block.margin(Margin::Top), 1.5);
        assert_eq!(block.margin(Margin::Left), 0.75);
        assert!(block.h_center());
    }

    #[test]
    fn test_duplicate_is_structural() {
        let mut rs = RecordStream::new(vec![Record::HCenter(0), Record::HCenter(1)]);
        match PageSettingsBlock::read(&mut rs) {
            Err(XlsError::Structural { sid, .. }) => assert_eq!(sid, HCENTER),
            other => panic!("expected structural error, got {other:?}"),
        }
    }

    #[test]
    fn test_late_records() {
        let mut rs = RecordStream::new(vec![Record::HCenter(0)]);
        let mut block = PageSettingsBlock::read(&mut rs).unwrap();
        let mut late = RecordStream::new(vec![Record::VCenter(1), Record::raw(PLS, vec![1, 2])]);
        block.add_late_records(&mut late).unwrap();
        assert!(block.v_center());
        let mut again = RecordStream::new(vec![Record::HCenter(1)]);
        assert!(block.add_late_records(&mut again).is_err());
    }

    #[test]
    fn test_default_block_and_breaks() {
        let mut block = PageSettingsBlock::create_default();
        assert_eq!(block.header_text(), Some(""));
        block.set_row_break(10, 0, 255);
        block.set_row_break(3, 0, 255);
        assert_eq!(block.row_breaks(), vec![3, 10]);
        block.remove_row_break(3);
        assert!(!block.is_row_broken(3));
        assert!(block.is_row_broken(10));
        let sids: Vec<u16> = block.records().iter().map(Record::sid).collect();
        assert_eq!(
            sids,
            vec![
                HORIZONTALPAGEBREAKS,
                VERTICALPAGEBREAKS,
                HEADER,
                FOOTER,
                HCENTER,
                VCENTER,
                SETUP
            ]
        );
    }
}
