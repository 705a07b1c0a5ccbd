//! Where records and aggregates belong inside a worksheet stream.
//!
//! Excel refuses files whose sheet records are out of order, so every table
//! created after parse must be inserted at a position derived from anchor
//! records already in the list. All functions here are pure scans over the
//! sheet's item list.

use crate::biff::records::*;
use crate::error::{XlsError, XlsResult};
use crate::record::Record;

/// Aggregates a sheet keeps outside its flat record list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateKind {
    RowRecords,
    ColumnInfo,
    MergedCells,
    ConditionalFormatting,
    DataValidity,
    PageSettings,
    Protection,
    Drawing,
}

/// One entry of a sheet's ordered item list: a plain record, or the slot
/// where an aggregate's records are flattened on write.
#[derive(Debug, Clone, PartialEq)]
pub enum SheetItem {
    Record(Record),
    Aggregate(AggregateKind),
}

impl SheetItem {
    /// Sid of a plain record.
    pub fn sid(&self) -> Option<u16> {
        match self {
            SheetItem::Record(r) => Some(r.sid()),
            SheetItem::Aggregate(_) => None,
        }
    }

    pub fn is_sid(&self, sid: u16) -> bool {
        self.sid() == Some(sid)
    }

    pub fn aggregate(&self) -> Option<AggregateKind> {
        match self {
            SheetItem::Aggregate(k) => Some(*k),
            SheetItem::Record(_) => None,
        }
    }
}

impl From<Record> for SheetItem {
    fn from(r: Record) -> Self {
        SheetItem::Record(r)
    }
}

pub fn find_sid(items: &[SheetItem], sid: u16) -> Option<usize> {
    items.iter().position(|i| i.is_sid(sid))
}

pub fn find_aggregate(items: &[SheetItem], kind: AggregateKind) -> Option<usize> {
    items.iter().position(|i| i.aggregate() == Some(kind))
}

fn dimensions_index(items: &[SheetItem]) -> XlsResult<usize> {
    find_sid(items, DIMENSION)
        .ok_or_else(|| XlsError::structural(DIMENSION, "DIMENSIONS record not found"))
}

fn is_calc_settings(sid: u16) -> bool {
    matches!(
        sid,
        UNCALCED | CALCCOUNT | CALCMODE | PRECISION | REFMODE | DELTA | ITERATION | DATEMODE
            | SAVERECALC
    )
}

fn is_page_settings_prior(item: &SheetItem) -> bool {
    match item.sid() {
        Some(sid) => {
            is_calc_settings(sid)
                || matches!(
                    sid,
                    BOF | INDEX
                        | PRINTHEADERS
                        | PRINTGRIDLINES
                        | GRIDSET
                        | GUTS
                        | DEFAULTROWHEIGHT
                        | WSBOOL
                )
        }
        None => false,
    }
}

fn is_guts_prior(item: &SheetItem) -> bool {
    match item.sid() {
        Some(sid) => {
            is_calc_settings(sid)
                || matches!(sid, BOF | INDEX | PRINTHEADERS | PRINTGRIDLINES | GRIDSET)
        }
        None => false,
    }
}

fn is_protection_subsequent(item: &SheetItem) -> bool {
    match item {
        SheetItem::Aggregate(AggregateKind::ColumnInfo) => true,
        SheetItem::Record(r) => matches!(r.sid(), DEFCOLWIDTH | UNCALCED | SORT | DIMENSION),
        SheetItem::Aggregate(_) => false,
    }
}

fn is_view_settings(sid: u16) -> bool {
    matches!(sid, WINDOW2 | SCL | PANE | SELECTION | STANDARDWIDTH)
}

/// Scan back from DIMENSIONS to the first record matching `is_prior`; the
/// insert position is just after it.
fn insert_after_prior_before_dimensions(
    items: &[SheetItem],
    is_prior: fn(&SheetItem) -> bool,
    what: &str,
) -> XlsResult<usize> {
    let dim = dimensions_index(items)?;
    items[..dim]
        .iter()
        .rposition(is_prior)
        .map(|i| i + 1)
        .ok_or_else(|| XlsError::structural(DIMENSION, format!("no insert position for {what}")))
}

/// Protection block goes right before the DEFCOLWIDTH / COLINFO / SORT run
/// that precedes DIMENSIONS.
pub fn protection_block_insert_pos(items: &[SheetItem]) -> XlsResult<usize> {
    let dim = dimensions_index(items)?;
    let mut i = dim;
    while i > 0 {
        i -= 1;
        if !is_protection_subsequent(&items[i]) {
            return Ok(i + 1);
        }
    }
    Err(XlsError::structural(
        DIMENSION,
        "no insert position for protection block",
    ))
}

pub fn page_settings_insert_pos(items: &[SheetItem]) -> XlsResult<usize> {
    insert_after_prior_before_dimensions(items, is_page_settings_prior, "page settings block")
}

pub fn guts_insert_pos(items: &[SheetItem]) -> XlsResult<usize> {
    insert_after_prior_before_dimensions(items, is_guts_prior, "GUTS")
}

/// Scan from the end (EOF excluded) for the last view settings record.
pub fn merged_cells_insert_pos(items: &[SheetItem]) -> XlsResult<usize> {
    let end = items.len().saturating_sub(1);
    items[..end]
        .iter()
        .rposition(|i| i.sid().is_some_and(is_view_settings))
        .map(|i| i + 1)
        .ok_or_else(|| XlsError::structural(WINDOW2, "no WINDOW2 to anchor merged cells table"))
}

pub fn conditional_formatting_insert_pos(items: &[SheetItem]) -> XlsResult<usize> {
    let end = items.len().saturating_sub(1);
    for i in (0..end).rev() {
        match &items[i] {
            SheetItem::Aggregate(AggregateKind::MergedCells) => return Ok(i + 1),
            SheetItem::Aggregate(_) => continue,
            SheetItem::Record(r) => {
                let sid = r.sid();
                if is_view_settings(sid)
                    || matches!(
                        sid,
                        FEAT | FEATHEADR
                            | TXO
                            | SHEETEXT
                            | LABELRANGES
                            | HLINK
                            | QSI
                            | PHONETICPR
                            | QUICKTIP
                    )
                {
                    return Ok(i + 1);
                }
            }
        }
    }
    Err(XlsError::structural(
        WINDOW2,
        "no insert position for conditional formatting table",
    ))
}

fn is_dv_prior(item: &SheetItem) -> bool {
    match item {
        SheetItem::Aggregate(AggregateKind::MergedCells)
        | SheetItem::Aggregate(AggregateKind::ConditionalFormatting) => true,
        SheetItem::Aggregate(_) => false,
        SheetItem::Record(r) => {
            let sid = r.sid();
            is_view_settings(sid)
                || matches!(sid, LABELRANGES | PHONETICPR | HLINK | QUICKTIP | CODENAME)
        }
    }
}

fn is_dv_subsequent(item: &SheetItem) -> bool {
    matches!(
        item.sid(),
        Some(SHEETEXT | SHEETPROTECTION | RANGEPROTECTION | FEAT11 | HEADERFOOTER | PLV_MAC | EOF)
    )
}

/// Scan back from EOF past the records that must follow the DV table,
/// stopping at the first record that must precede it.
pub fn data_validity_insert_pos(items: &[SheetItem]) -> XlsResult<usize> {
    let last = items
        .len()
        .checked_sub(1)
        .filter(|&i| items[i].is_sid(EOF))
        .ok_or_else(|| XlsError::structural(EOF, "last sheet record should be EOF"))?;
    let mut i = last;
    while i > 0 {
        i -= 1;
        let item = &items[i];
        if is_dv_prior(item) {
            if !is_dv_subsequent(&items[i + 1]) {
                return Err(XlsError::structural(
                    items[i + 1].sid().unwrap_or(DVAL),
                    "unexpected record after data validity anchor",
                ));
            }
            return Ok(i + 1);
        }
        if !is_dv_subsequent(item) {
            return Err(XlsError::structural(
                item.sid().unwrap_or(DVAL),
                "unexpected record while looking for data validity insert position",
            ));
        }
    }
    Ok(0)
}

/// New drawing layer replaces the first MSODRAWING, or goes before WINDOW2.
pub fn drawing_insert_pos(items: &[SheetItem]) -> XlsResult<usize> {
    find_sid(items, MSODRAWING)
        .or_else(|| find_sid(items, WINDOW2))
        .ok_or_else(|| XlsError::structural(WINDOW2, "no insert position for drawing layer"))
}

/// Insert position for a newly created aggregate of `kind`.
pub fn insert_pos_for(kind: AggregateKind, items: &[SheetItem]) -> XlsResult<usize> {
    match kind {
        AggregateKind::Protection => protection_block_insert_pos(items),
        AggregateKind::PageSettings => page_settings_insert_pos(items),
        AggregateKind::MergedCells => merged_cells_insert_pos(items),
        AggregateKind::ConditionalFormatting => conditional_formatting_insert_pos(items),
        AggregateKind::DataValidity => data_validity_insert_pos(items),
        AggregateKind::Drawing => drawing_insert_pos(items),
        AggregateKind::ColumnInfo => dimensions_index(items),
        AggregateKind::RowRecords => dimensions_index(items).map(|i| i + 1),
    }
}

/// Records that make up the row/cell region.
pub fn is_row_block_record(sid: u16) -> bool {
    matches!(
        sid,
        ROW | BLANK
            | BOOLERR
            | FORMULA
            | LABEL
            | LABELSST
            | NUMBER
            | RK
            | ARRAY
            | SHRFMLA
            | TABLE
            | MULRK
            | MULBLANK
    )
}

pub fn is_page_settings_component(sid: u16) -> bool {
    matches!(
        sid,
        HORIZONTALPAGEBREAKS
            | VERTICALPAGEBREAKS
            | HEADER
            | FOOTER
            | HCENTER
            | VCENTER
            | LEFTMARGIN
            | RIGHTMARGIN
            | TOPMARGIN
            | BOTTOMMARGIN
            | PLS
            | SETUP
            | BITMAP
            | PRINTSIZE
            | HEADERFOOTER
    )
}

/// Does `sid` end the row block? EOF inside the row block means WINDOW2 is
/// missing.
pub fn is_end_of_row_block(sid: u16) -> XlsResult<bool> {
    match sid {
        SXVIEW | MSODRAWING | MSODRAWINGSELECTION | OBJ | TXO | COLINFO | GUTS | WINDOW1
        | WINDOW2 | DVAL => Ok(true),
        EOF => Err(XlsError::structural(
            EOF,
            "found EOF before WINDOW2 was encountered",
        )),
        _ => Ok(is_page_settings_component(sid)),
    }
}
