//! Worksheet substream model.
//!
//! A [`Sheet`] is an ordered list of [`SheetItem`]s: plain records plus one
//! placement entry per aggregate. Aggregates live in their own fields and
//! are flattened at their placement when the sheet is written.
//!
//! Reading goes `ExpectBof -> ReadingBody -> Done`: the first record must be
//! a worksheet BOF, the body is dispatched record by record, and EOF ends the
//! substream. WINDOW2 is mandatory; a missing DIMENSIONS is synthesized.

use log::{debug, warn};

use crate::aggregates::column_info::ColumnUpdate;
use crate::aggregates::shared_values::SharedValue;
use crate::aggregates::{
    CellValue, ColumnInfoTable, ConditionalFormattingTable, DataValidityTable, MergedCellsTable,
    PageSettingsBlock, RecordAggregate, RecordSerializer, RecordVisitor, RowBlocksReader,
    RowRecordsAggregate, WorksheetProtectionBlock,
};
use crate::biff::records::*;
use crate::drawing::aggregate::is_drawing_layer_record;
use crate::drawing::{DrawingAggregate, DrawingManager, Shape};
use crate::error::{XlsError, XlsResult};
use crate::ordering::{
    find_aggregate, find_sid, guts_insert_pos, insert_pos_for, is_row_block_record,
    AggregateKind, SheetItem,
};
use crate::record::sheet::{window2, PANE_LOWER_RIGHT, PANE_UPPER_LEFT};
use crate::record::{
    BofRecord, CellRangeAddress, DefaultRowHeightRecord, DimensionsRecord, GutsRecord,
    IndexRecord, PaneRecord, Record, RowRecord, SelectionRecord, Window2Record,
};
use crate::stream::RecordStream;

/// Highest row outline level.
const MAX_ROW_OUTLINE_LEVEL: u16 = 7;

/// Default column width in characters.
const DEFAULT_COLUMN_WIDTH: u16 = 8;

/// Pane layout read back from PANE and WINDOW2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaneInformation {
    /// Columns (frozen) or twips (split) left of the vertical split.
    pub x: u16,
    /// Rows (frozen) or twips (split) above the horizontal split.
    pub y: u16,
    pub top_row: u16,
    pub left_col: u16,
    pub active_pane: u16,
    pub frozen: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadState {
    ExpectBof,
    ReadingBody,
    Done,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sheet {
    items: Vec<SheetItem>,
    rows: RowRecordsAggregate,
    column_info: ColumnInfoTable,
    merged: MergedCellsTable,
    conditional_formatting: Option<ConditionalFormattingTable>,
    data_validity: Option<DataValidityTable>,
    page_settings: Option<PageSettingsBlock>,
    protection: Option<WorksheetProtectionBlock>,
    drawing: Option<DrawingAggregate>,
    uncalced: bool,
}

fn raw_u16(sid: u16, value: u16) -> SheetItem {
    SheetItem::Record(Record::raw(sid, value.to_le_bytes().to_vec()))
}

fn dimensions_in(items: &mut [SheetItem]) -> XlsResult<&mut DimensionsRecord> {
    items
        .iter_mut()
        .find_map(|i| match i {
            SheetItem::Record(Record::Dimensions(d)) => Some(d),
            _ => None,
        })
        .ok_or_else(|| XlsError::invalid_state("sheet has no DIMENSIONS record"))
}

fn window2_in(items: &mut [SheetItem]) -> XlsResult<&mut Window2Record> {
    items
        .iter_mut()
        .find_map(|i| match i {
            SheetItem::Record(Record::Window2(w)) => Some(w),
            _ => None,
        })
        .ok_or_else(|| XlsError::invalid_state("sheet has no WINDOW2 record"))
}

fn selection_in(items: &mut [SheetItem]) -> Option<&mut SelectionRecord> {
    items.iter_mut().find_map(|i| match i {
        SheetItem::Record(Record::Selection(s)) => Some(s),
        _ => None,
    })
}

impl Sheet {
    /// A new empty worksheet as Excel writes it.
    pub fn create_sheet() -> Self {
        let items = vec![
            SheetItem::Record(Record::Bof(BofRecord::worksheet())),
            raw_u16(CALCMODE, 1),
            raw_u16(CALCCOUNT, 100),
            raw_u16(REFMODE, 1),
            raw_u16(ITERATION, 0),
            SheetItem::Record(Record::raw(DELTA, 0.001f64.to_le_bytes().to_vec())),
            raw_u16(SAVERECALC, 1),
            raw_u16(PRINTHEADERS, 0),
            raw_u16(PRINTGRIDLINES, 0),
            raw_u16(GRIDSET, 1),
            SheetItem::Record(Record::Guts(GutsRecord::default())),
            SheetItem::Record(Record::DefaultRowHeight(DefaultRowHeightRecord::default())),
            SheetItem::Record(Record::WsBool(0x04C1)),
            SheetItem::Aggregate(AggregateKind::PageSettings),
            SheetItem::Aggregate(AggregateKind::Protection),
            SheetItem::Record(Record::DefColWidth(DEFAULT_COLUMN_WIDTH)),
            SheetItem::Aggregate(AggregateKind::ColumnInfo),
            SheetItem::Record(Record::Dimensions(DimensionsRecord::default())),
            SheetItem::Aggregate(AggregateKind::RowRecords),
            SheetItem::Record(Record::Window2(Window2Record::default())),
            SheetItem::Record(Record::Selection(SelectionRecord::new(
                PANE_UPPER_LEFT as u8,
                0,
                0,
            ))),
            SheetItem::Aggregate(AggregateKind::MergedCells),
            SheetItem::Record(Record::Eof),
        ];
        Sheet {
            items,
            page_settings: Some(PageSettingsBlock::create_default()),
            protection: Some(WorksheetProtectionBlock::new()),
            ..Default::default()
        }
    }

    /// Read one worksheet substream, BOF through EOF.
    pub fn from_stream(rs: &mut RecordStream) -> XlsResult<Self> {
        let mut sheet = Sheet::default();
        let mut state = ReadState::ExpectBof;
        let mut have_window2 = false;

        while state != ReadState::Done {
            let Some(sid) = rs.peek_next_sid() else {
                return Err(XlsError::structural(
                    if state == ReadState::ExpectBof { BOF } else { EOF },
                    "sheet substream ended early",
                ));
            };

            if state == ReadState::ExpectBof {
                if sid != BOF {
                    return Err(XlsError::structural(sid, "BOF record expected"));
                }
                let bof = rs.next()?;
                match bof.bof_kind() {
                    Some(BOF_WORKSHEET) => {}
                    Some(kind) => {
                        return Err(XlsError::structural(
                            BOF,
                            format!("unsupported BOF type 0x{kind:04X} for a worksheet"),
                        ))
                    }
                    None => return Err(XlsError::structural(BOF, "malformed BOF record")),
                }
                sheet.items.push(bof.into());
                state = ReadState::ReadingBody;
                continue;
            }

            if ConditionalFormattingTable::is_header_sid(sid) {
                match sheet.conditional_formatting.as_mut() {
                    Some(cf) => cf.read(rs)?,
                    None => {
                        let mut cf = ConditionalFormattingTable::new();
                        cf.read(rs)?;
                        sheet.conditional_formatting = Some(cf);
                        sheet.push_aggregate(AggregateKind::ConditionalFormatting);
                    }
                }
                continue;
            }

            if sid == DVAL {
                if sheet.data_validity.is_some() {
                    return Err(XlsError::structural(DVAL, "second data validity table"));
                }
                sheet.data_validity = Some(DataValidityTable::read(rs)?);
                sheet.push_aggregate(AggregateKind::DataValidity);
                continue;
            }

            if is_row_block_record(sid) {
                if find_aggregate(&sheet.items, AggregateKind::RowRecords).is_some() {
                    return Err(XlsError::structural(
                        sid,
                        "row/cell records found in the wrong place",
                    ));
                }
                let reader = RowBlocksReader::read(rs)?;
                let (svm, plain, loose) = reader.into_parts()?;
                if !loose.is_empty() {
                    warn!("{} MERGECELLS records inside the row block", loose.len());
                }
                for rec in loose {
                    sheet.merged.add_record(rec)?;
                }
                sheet.rows = RowRecordsAggregate::from_parts(svm, plain)?;
                sheet.push_aggregate(AggregateKind::RowRecords);
                continue;
            }

            if sid == USERSVIEWBEGIN {
                // Custom views carry their own page settings; keep them as is.
                loop {
                    let rec = rs.next()?;
                    let end = rec.sid() == USERSVIEWEND;
                    sheet.items.push(rec.into());
                    if end {
                        break;
                    }
                }
                continue;
            }

            if PageSettingsBlock::is_component_record(sid) {
                match sheet.page_settings.as_mut() {
                    Some(ps) => {
                        warn!("page settings record 0x{sid:04X} after the block was read");
                        ps.add_late_records(rs)?;
                    }
                    None => {
                        sheet.page_settings = Some(PageSettingsBlock::read(rs)?);
                        sheet.push_aggregate(AggregateKind::PageSettings);
                    }
                }
                continue;
            }

            if WorksheetProtectionBlock::is_component_record(sid) {
                match sheet.protection.as_mut() {
                    Some(p) => p.add_late_records(rs)?,
                    None => {
                        sheet.protection = Some(WorksheetProtectionBlock::read(rs)?);
                        sheet.push_aggregate(AggregateKind::Protection);
                    }
                }
                continue;
            }

            match sid {
                MERGECELLS => {
                    sheet.merged.read(rs)?;
                    if find_aggregate(&sheet.items, AggregateKind::MergedCells).is_none() {
                        sheet.push_aggregate(AggregateKind::MergedCells);
                    }
                }
                COLINFO => {
                    if find_aggregate(&sheet.items, AggregateKind::ColumnInfo).is_some() {
                        return Err(XlsError::structural(
                            COLINFO,
                            "column info records are not contiguous",
                        ));
                    }
                    sheet.column_info = ColumnInfoTable::read(rs)?;
                    sheet.push_aggregate(AggregateKind::ColumnInfo);
                }
                BOF => {
                    // Embedded chart substream, kept record for record.
                    loop {
                        let rec = rs.next()?;
                        let end = rec.sid() == EOF;
                        sheet.items.push(rec.into());
                        if end {
                            break;
                        }
                    }
                }
                // Regenerated on write.
                INDEX => {
                    rs.next()?;
                }
                UNCALCED => {
                    rs.next()?;
                    sheet.uncalced = true;
                }
                DIMENSION => {
                    let rec = rs.next()?;
                    if find_aggregate(&sheet.items, AggregateKind::ColumnInfo).is_none() {
                        sheet.push_aggregate(AggregateKind::ColumnInfo);
                    }
                    sheet.items.push(rec.into());
                }
                WINDOW2 => {
                    have_window2 = true;
                    sheet.items.push(rs.next()?.into());
                }
                EOF => {
                    sheet.items.push(rs.next()?.into());
                    state = ReadState::Done;
                }
                _ => sheet.items.push(rs.next()?.into()),
            }
        }

        if !have_window2 {
            return Err(XlsError::structural(WINDOW2, "WINDOW2 was not found"));
        }
        sheet.finish_read()?;
        debug!(
            "sheet read: {} items, {} rows, {} cells",
            sheet.items.len(),
            sheet.rows.num_rows(),
            sheet.rows.num_cells()
        );
        Ok(sheet)
    }

    fn push_aggregate(&mut self, kind: AggregateKind) {
        self.items.push(SheetItem::Aggregate(kind));
    }

    /// Synthesize DIMENSIONS if needed and give every always-present
    /// aggregate a placement.
    fn finish_read(&mut self) -> XlsResult<()> {
        if find_sid(&self.items, DIMENSION).is_none() {
            if self.rows.num_rows() > 0 || self.rows.num_cells() > 0 {
                warn!("DIMENSIONS record not found even though row/cell records are present");
            } else {
                warn!("DIMENSIONS record not found, synthesizing one");
            }
            // Ahead of the cells, or a reread would take it for a cell record.
            let at = match find_aggregate(&self.items, AggregateKind::RowRecords) {
                Some(rows) => rows,
                None => find_sid(&self.items, WINDOW2)
                    .ok_or_else(|| XlsError::structural(WINDOW2, "WINDOW2 was not found"))?,
            };
            let dims = self.rows.create_dimensions();
            self.items.insert(at, Record::Dimensions(dims).into());
        }
        for kind in [
            AggregateKind::ColumnInfo,
            AggregateKind::RowRecords,
            AggregateKind::MergedCells,
        ] {
            self.place_aggregate(kind)?;
        }
        Ok(())
    }

    fn place_aggregate(&mut self, kind: AggregateKind) -> XlsResult<()> {
        if find_aggregate(&self.items, kind).is_none() {
            let at = insert_pos_for(kind, &self.items)?;
            self.items.insert(at, SheetItem::Aggregate(kind));
        }
        Ok(())
    }

    pub fn items(&self) -> &[SheetItem] {
        &self.items
    }

    /// Index of the first plain record with `sid`.
    pub fn find_first_record_loc(&self, sid: u16) -> Option<usize> {
        find_sid(&self.items, sid)
    }

    pub fn find_first_record(&self, sid: u16) -> Option<&Record> {
        self.items.iter().find_map(|i| match i {
            SheetItem::Record(r) if r.sid() == sid => Some(r),
            _ => None,
        })
    }

    pub fn is_uncalced(&self) -> bool {
        self.uncalced
    }

    pub fn set_uncalced(&mut self, uncalced: bool) {
        self.uncalced = uncalced;
    }

    pub fn dimensions(&self) -> Option<&DimensionsRecord> {
        self.items.iter().find_map(|i| match i {
            SheetItem::Record(Record::Dimensions(d)) => Some(d),
            _ => None,
        })
    }

    pub fn window2(&self) -> Option<&Window2Record> {
        self.items.iter().find_map(|i| match i {
            SheetItem::Record(Record::Window2(w)) => Some(w),
            _ => None,
        })
    }

    // ── Rows and cells ──────────────────────────────────────────────────

    pub fn rows(&self) -> &RowRecordsAggregate {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut RowRecordsAggregate {
        &mut self.rows
    }

    /// Add or replace a ROW record, widening DIMENSIONS.
    pub fn add_row(&mut self, row: RowRecord) -> XlsResult<()> {
        let dims = dimensions_in(&mut self.items)?;
        dims.include_row(row.row as u32);
        self.rows.insert_row(row);
        Ok(())
    }

    pub fn get_row(&self, row: u16) -> Option<&RowRecord> {
        self.rows.get_row(row)
    }

    pub fn get_row_mut(&mut self, row: u16) -> Option<&mut RowRecord> {
        self.rows.get_row_mut(row)
    }

    /// Remove a row and its cells. DIMENSIONS is left alone.
    pub fn remove_row(&mut self, row: u16) -> XlsResult<Option<RowRecord>> {
        self.rows.remove_row(row)
    }

    /// Add a cell, creating its ROW if needed and widening DIMENSIONS and
    /// the row's column extent.
    pub fn add_value_record(&mut self, cell: CellValue) -> XlsResult<()> {
        let (row, col) = (cell.row(), cell.col());
        let dims = dimensions_in(&mut self.items)?;
        self.rows.insert_cell(cell)?;
        dims.include_row(row as u32);
        dims.include_col(col);

        if self.rows.get_row(row).is_none() {
            self.rows.insert_row(RowRecord::new(row));
        }
        if let Some(r) = self.rows.get_row_mut(row) {
            if r.last_col <= r.first_col {
                r.first_col = col;
                r.last_col = col.saturating_add(1);
            } else {
                r.first_col = r.first_col.min(col);
                r.last_col = r.last_col.max(col.saturating_add(1));
            }
        }
        Ok(())
    }

    pub fn remove_value_record(&mut self, row: u16, col: u16) -> XlsResult<Option<CellValue>> {
        self.rows.remove_cell(row, col)
    }

    /// Swap in a new value at the cell's coordinate. Bounds are unchanged.
    pub fn replace_value_record(&mut self, cell: CellValue) -> XlsResult<()> {
        self.rows.insert_cell(cell)
    }

    pub fn value_at(&self, row: u16, col: u16) -> Option<&CellValue> {
        self.rows.get_cell(row, col)
    }

    /// The shared formula, array or table a formula cell belongs to.
    pub fn shared_formula_at(&self, row: u16, col: u16) -> Option<SharedValue<'_>> {
        self.rows.shared_value_at(row, col)
    }

    // ── Columns ─────────────────────────────────────────────────────────

    pub fn column_info(&self) -> &ColumnInfoTable {
        &self.column_info
    }

    fn default_column_width_slot(&mut self) -> XlsResult<&mut u16> {
        self.items
            .iter_mut()
            .find_map(|i| match i {
                SheetItem::Record(Record::DefColWidth(w)) => Some(w),
                _ => None,
            })
            .ok_or_else(|| XlsError::invalid_state("sheet has no DEFCOLWIDTH record"))
    }

    /// Default width in characters, from DEFCOLWIDTH.
    pub fn default_column_width(&self) -> u16 {
        self.items
            .iter()
            .find_map(|i| match i {
                SheetItem::Record(Record::DefColWidth(w)) => Some(*w),
                _ => None,
            })
            .unwrap_or(DEFAULT_COLUMN_WIDTH)
    }

    pub fn set_default_column_width(&mut self, width: u16) -> XlsResult<()> {
        *self.default_column_width_slot()? = width;
        Ok(())
    }

    /// Width in 1/256 of a character.
    pub fn column_width(&self, col: u16) -> u16 {
        match self.column_info.find_column_info(col) {
            Some(ci) => ci.width,
            None => self.default_column_width().saturating_mul(256),
        }
    }

    pub fn set_column_width(&mut self, col: u16, width: u16) {
        self.column_info.set_column(
            col,
            ColumnUpdate {
                width: Some(width),
                ..Default::default()
            },
        );
    }

    pub fn is_column_hidden(&self, col: u16) -> bool {
        self.column_info
            .find_column_info(col)
            .is_some_and(|ci| ci.is_hidden())
    }

    pub fn set_column_hidden(&mut self, col: u16, hidden: bool) {
        self.column_info.set_column(
            col,
            ColumnUpdate {
                hidden: Some(hidden),
                ..Default::default()
            },
        );
    }

    pub fn set_column(&mut self, col: u16, update: ColumnUpdate) {
        self.column_info.set_column(col, update);
    }

    // ── Outline grouping ────────────────────────────────────────────────

    fn guts_mut(&mut self) -> XlsResult<&mut GutsRecord> {
        if find_sid(&self.items, GUTS).is_none() {
            let at = guts_insert_pos(&self.items)?;
            self.items
                .insert(at, Record::Guts(GutsRecord::default()).into());
        }
        self.items
            .iter_mut()
            .find_map(|i| match i {
                SheetItem::Record(Record::Guts(g)) => Some(g),
                _ => None,
            })
            .ok_or_else(|| XlsError::invalid_state("GUTS record is not decodable"))
    }

    /// Indent (or outdent) the outline level of columns `from..=to`.
    pub fn group_column_range(&mut self, from: u16, to: u16, indent: bool) -> XlsResult<()> {
        if to < from {
            return Err(XlsError::invalid_argument(format!(
                "column range {from}..={to} is reversed"
            )));
        }
        // Resolve GUTS before touching the columns.
        self.guts_mut()?;
        self.column_info.group_column_range(from, to, indent);
        let max = self.column_info.max_outline_level();
        let guts = self.guts_mut()?;
        guts.col_level_max = max + 1;
        guts.top_col_gutter = if max == 0 { 0 } else { 29 + 12 * (max - 1) };
        Ok(())
    }

    /// Indent (or outdent) the outline level of rows `from..=to`, creating
    /// missing rows.
    pub fn group_row_range(&mut self, from: u16, to: u16, indent: bool) -> XlsResult<()> {
        if to < from {
            return Err(XlsError::invalid_argument(format!(
                "row range {from}..={to} is reversed"
            )));
        }
        self.guts_mut()?;
        for r in from..=to {
            if self.rows.get_row(r).is_none() {
                self.add_row(RowRecord::new(r))?;
            }
            if let Some(row) = self.rows.get_row_mut(r) {
                let level = row.outline_level();
                let level = if indent {
                    (level + 1).min(MAX_ROW_OUTLINE_LEVEL)
                } else {
                    level.saturating_sub(1)
                };
                row.set_outline_level(level);
            }
        }
        let max = self.rows.rows().map(RowRecord::outline_level).max().unwrap_or(0);
        let guts = self.guts_mut()?;
        guts.row_level_max = max + 1;
        guts.left_row_gutter = 29 + 12 * max;
        Ok(())
    }

    // ── Panes ───────────────────────────────────────────────────────────

    fn take_pane(&mut self) {
        if let Some(at) = find_sid(&self.items, PANE) {
            self.items.remove(at);
        }
    }

    /// Freeze the top `row_split` rows and left `col_split` columns. Both
    /// zero removes the freeze.
    pub fn create_freeze_pane(
        &mut self,
        col_split: u16,
        row_split: u16,
        top_row: u16,
        left_col: u16,
    ) -> XlsResult<()> {
        let at = find_sid(&self.items, WINDOW2)
            .ok_or_else(|| XlsError::invalid_state("sheet has no WINDOW2 record"))?;
        self.take_pane();
        if col_split == 0 && row_split == 0 {
            let w2 = window2_in(&mut self.items)?;
            w2.set(window2::FREEZE_PANES, false);
            w2.set(window2::FREEZE_NO_SPLIT, false);
            if let Some(sel) = selection_in(&mut self.items) {
                sel.pane = PANE_UPPER_LEFT as u8;
            }
            return Ok(());
        }

        let mut pane = PaneRecord {
            x: col_split,
            y: row_split,
            top_row,
            left_col,
            active_pane: PANE_LOWER_RIGHT,
        };
        if row_split == 0 {
            pane.top_row = 0;
            pane.active_pane = 1;
        } else if col_split == 0 {
            pane.left_col = 0;
            pane.active_pane = 2;
        }
        let active = pane.active_pane;
        let w2_at = find_sid(&self.items, WINDOW2).unwrap_or(at);
        self.items.insert(w2_at + 1, Record::Pane(pane).into());

        let w2 = window2_in(&mut self.items)?;
        w2.set(window2::FREEZE_PANES, true);
        w2.set(window2::FREEZE_NO_SPLIT, true);
        if let Some(sel) = selection_in(&mut self.items) {
            sel.pane = active as u8;
        }
        Ok(())
    }

    /// Split the window at `x`/`y` twips.
    pub fn create_split_pane(
        &mut self,
        x: u16,
        y: u16,
        top_row: u16,
        left_col: u16,
        active_pane: u16,
    ) -> XlsResult<()> {
        if active_pane > PANE_UPPER_LEFT {
            return Err(XlsError::invalid_argument(format!(
                "active pane {active_pane} is not 0..=3"
            )));
        }
        if find_sid(&self.items, WINDOW2).is_none() {
            return Err(XlsError::invalid_state("sheet has no WINDOW2 record"));
        }
        self.take_pane();
        let w2_at = find_sid(&self.items, WINDOW2)
            .ok_or_else(|| XlsError::invalid_state("sheet has no WINDOW2 record"))?;
        let pane = PaneRecord {
            x,
            y,
            top_row,
            left_col,
            active_pane,
        };
        self.items.insert(w2_at + 1, Record::Pane(pane).into());

        let w2 = window2_in(&mut self.items)?;
        w2.set(window2::FREEZE_PANES, false);
        w2.set(window2::FREEZE_NO_SPLIT, false);
        if let Some(sel) = selection_in(&mut self.items) {
            sel.pane = PANE_LOWER_RIGHT as u8;
        }
        Ok(())
    }

    pub fn pane_information(&self) -> Option<PaneInformation> {
        let pane = self.items.iter().find_map(|i| match i {
            SheetItem::Record(Record::Pane(p)) => Some(p),
            _ => None,
        })?;
        let frozen = self
            .window2()
            .is_some_and(|w| w.has(window2::FREEZE_PANES));
        Some(PaneInformation {
            x: pane.x,
            y: pane.y,
            top_row: pane.top_row,
            left_col: pane.left_col,
            active_pane: pane.active_pane,
            frozen,
        })
    }

    // ── Merged regions ──────────────────────────────────────────────────

    pub fn merged_cells(&self) -> &MergedCellsTable {
        &self.merged
    }

    /// Merge a region (inclusive bounds). Returns its index.
    pub fn add_merged_region(
        &mut self,
        first_row: u16,
        first_col: u16,
        last_row: u16,
        last_col: u16,
    ) -> XlsResult<usize> {
        self.merged.add_area(first_row, first_col, last_row, last_col)
    }

    /// Out-of-range indexes are ignored.
    pub fn remove_merged_region(&mut self, index: usize) {
        self.merged.remove(index);
    }

    pub fn merged_region_at(&self, index: usize) -> Option<&CellRangeAddress> {
        self.merged.get(index)
    }

    pub fn num_merged_regions(&self) -> usize {
        self.merged.len()
    }

    // ── Lazily created blocks ───────────────────────────────────────────

    pub fn page_settings_block(&self) -> Option<&PageSettingsBlock> {
        self.page_settings.as_ref()
    }

    /// The page settings block, created at its ordered position if absent.
    pub fn page_settings(&mut self) -> XlsResult<&mut PageSettingsBlock> {
        if self.page_settings.is_none() {
            let at = insert_pos_for(AggregateKind::PageSettings, &self.items)?;
            self.items
                .insert(at, SheetItem::Aggregate(AggregateKind::PageSettings));
        }
        Ok(self
            .page_settings
            .get_or_insert_with(PageSettingsBlock::create_default))
    }

    pub fn protection(&self) -> Option<&WorksheetProtectionBlock> {
        self.protection.as_ref()
    }

    pub fn protection_block(&mut self) -> XlsResult<&mut WorksheetProtectionBlock> {
        if self.protection.is_none() {
            let at = insert_pos_for(AggregateKind::Protection, &self.items)?;
            self.items
                .insert(at, SheetItem::Aggregate(AggregateKind::Protection));
        }
        Ok(self
            .protection
            .get_or_insert_with(WorksheetProtectionBlock::new))
    }

    pub fn conditional_formatting_table(&self) -> Option<&ConditionalFormattingTable> {
        self.conditional_formatting.as_ref()
    }

    pub fn conditional_formatting(&mut self) -> XlsResult<&mut ConditionalFormattingTable> {
        if self.conditional_formatting.is_none() {
            let at = insert_pos_for(AggregateKind::ConditionalFormatting, &self.items)?;
            self.items
                .insert(at, SheetItem::Aggregate(AggregateKind::ConditionalFormatting));
        }
        Ok(self
            .conditional_formatting
            .get_or_insert_with(ConditionalFormattingTable::new))
    }

    pub fn data_validity(&self) -> Option<&DataValidityTable> {
        self.data_validity.as_ref()
    }

    pub fn data_validity_table(&mut self) -> XlsResult<&mut DataValidityTable> {
        if self.data_validity.is_none() {
            let at = insert_pos_for(AggregateKind::DataValidity, &self.items)?;
            self.items
                .insert(at, SheetItem::Aggregate(AggregateKind::DataValidity));
        }
        Ok(self
            .data_validity
            .get_or_insert_with(DataValidityTable::new))
    }

    // ── Drawing ─────────────────────────────────────────────────────────

    pub fn drawing(&self) -> Option<&DrawingAggregate> {
        self.drawing.as_ref()
    }

    pub fn drawing_mut(&mut self) -> Option<&mut DrawingAggregate> {
        self.drawing.as_mut()
    }

    /// Gather the sheet's drawing records into one aggregate. With `create`
    /// an empty drawing is made when the sheet has none. Returns whether
    /// the sheet has a drawing afterwards.
    pub fn aggregate_drawing_records(
        &mut self,
        dm: &mut DrawingManager,
        create: bool,
    ) -> XlsResult<bool> {
        if self.drawing.is_some() {
            return Ok(true);
        }
        let Some(start) = find_sid(&self.items, MSODRAWING) else {
            if !create {
                return Ok(false);
            }
            let at = insert_pos_for(AggregateKind::Drawing, &self.items)?;
            self.drawing = Some(DrawingAggregate::create_patriarch(dm));
            self.items
                .insert(at, SheetItem::Aggregate(AggregateKind::Drawing));
            return Ok(true);
        };

        let mut end = start;
        while end < self.items.len() {
            match self.items[end].sid() {
                Some(sid) if is_drawing_layer_record(sid) => end += 1,
                Some(BOF) => {
                    let close = self.items[end..]
                        .iter()
                        .position(|i| i.is_sid(EOF))
                        .map(|k| end + k)
                        .ok_or_else(|| {
                            XlsError::structural(BOF, "chart substream has no EOF")
                        })?;
                    end = close + 1;
                }
                _ => break,
            }
        }

        let run: Vec<Record> = self.items[start..end]
            .iter()
            .filter_map(|i| match i {
                SheetItem::Record(r) => Some(r.clone()),
                SheetItem::Aggregate(_) => None,
            })
            .collect();
        let notes: Vec<Record> = self
            .items
            .iter()
            .filter_map(|i| match i {
                SheetItem::Record(r @ Record::Note(_)) => Some(r.clone()),
                _ => None,
            })
            .collect();
        let drawing = DrawingAggregate::read(run, notes)?;

        self.items.splice(
            start..end,
            [SheetItem::Aggregate(AggregateKind::Drawing)],
        );
        self.items.retain(|i| !i.is_sid(NOTE));
        self.drawing = Some(drawing);
        Ok(true)
    }

    /// Add a shape, creating the drawing first if the sheet has none.
    pub fn add_shape(&mut self, dm: &mut DrawingManager, shape: &Shape) -> XlsResult<u32> {
        shape.validate()?;
        self.aggregate_drawing_records(dm, true)?;
        let drawing = self
            .drawing
            .as_mut()
            .ok_or_else(|| XlsError::invalid_state("drawing was not created"))?;
        drawing.add_shape(shape, dm)
    }

    // ── Serialization ───────────────────────────────────────────────────

    fn visit_aggregate(
        &self,
        kind: AggregateKind,
        visitor: &mut dyn RecordVisitor,
    ) -> XlsResult<()> {
        let agg: Option<&dyn RecordAggregate> = match kind {
            AggregateKind::RowRecords => Some(&self.rows),
            AggregateKind::ColumnInfo => Some(&self.column_info),
            AggregateKind::MergedCells => Some(&self.merged),
            AggregateKind::ConditionalFormatting => self
                .conditional_formatting
                .as_ref()
                .map(|a| a as &dyn RecordAggregate),
            AggregateKind::DataValidity => {
                self.data_validity.as_ref().map(|a| a as &dyn RecordAggregate)
            }
            AggregateKind::PageSettings => {
                self.page_settings.as_ref().map(|a| a as &dyn RecordAggregate)
            }
            AggregateKind::Protection => {
                self.protection.as_ref().map(|a| a as &dyn RecordAggregate)
            }
            AggregateKind::Drawing => self.drawing.as_ref().map(|a| a as &dyn RecordAggregate),
        };
        let agg = agg.ok_or_else(|| {
            XlsError::invalid_state(format!("placement for missing {kind:?} aggregate"))
        })?;
        agg.visit_contained_records(visitor);
        Ok(())
    }

    /// All records in write order, without the INDEX record.
    pub fn records(&self) -> XlsResult<Vec<Record>> {
        let mut out: Vec<Record> = Vec::with_capacity(self.items.len() + self.rows.num_cells());
        for (i, item) in self.items.iter().enumerate() {
            match item {
                SheetItem::Record(r) => out.push(r.clone()),
                SheetItem::Aggregate(kind) => self.visit_aggregate(*kind, &mut out)?,
            }
            if i == 0 && self.uncalced {
                out.push(Record::raw(UNCALCED, vec![0, 0]));
            }
        }
        Ok(out)
    }

    /// Write the substream starting at stream offset `offset`. INDEX goes
    /// after BOF (and UNCALCED) and points at every DBCELL. Returns the
    /// number of bytes written.
    pub fn serialize(&self, offset: usize, out: &mut Vec<u8>) -> XlsResult<usize> {
        let records = self.records()?;
        let index_at = if self.uncalced { 2 } else { 1 };
        let blocks = records.iter().filter(|r| r.sid() == DBCELL).count();

        let mut index = IndexRecord::default();
        if let (Some(first), Some(last)) = (self.rows.first_row_num(), self.rows.last_row_num()) {
            index.first_row = first as u32;
            index.last_row = last as u32 + 1;
        }
        let mut pos = offset;
        for (i, r) in records.iter().enumerate() {
            if i == index_at {
                pos += IndexRecord::size_for_blocks(blocks);
            }
            match r.sid() {
                DBCELL => index.dbcells.push(pos as u32),
                DEFCOLWIDTH if index.def_col_width_pos == 0 => {
                    index.def_col_width_pos = pos as u32
                }
                _ => {}
            }
            pos += r.record_size();
        }

        let start = out.len();
        let index = Record::Index(index);
        let mut writer = RecordSerializer { out };
        for (i, r) in records.iter().enumerate() {
            if i == index_at {
                writer.visit_record(&index);
            }
            writer.visit_record(r);
        }
        Ok(writer.out.len() - start)
    }

    /// Serialized size including the INDEX record.
    pub fn serialized_size(&self) -> XlsResult<usize> {
        let records = self.records()?;
        let blocks = records.iter().filter(|r| r.sid() == DBCELL).count();
        Ok(records.iter().map(Record::record_size).sum::<usize>()
            + IndexRecord::size_for_blocks(blocks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drawing::{ShapeAnchor, ShapeStyle};
    use crate::record::{NumberRecord, RowRecord};
    use pretty_assertions::assert_eq;

    fn number(row: u16, col: u16) -> CellValue {
        CellValue::Number(NumberRecord {
            row,
            col,
            xf: 15,
            value: 1.0,
        })
    }

    fn sids(sheet: &Sheet) -> Vec<u16> {
        sheet.records().unwrap().iter().map(Record::sid).collect()
    }

    fn reread(sheet: &Sheet) -> Sheet {
        let mut recs = sheet.records().unwrap();
        // INDEX is dropped on read anyway; start from the flattened list.
        recs.retain(|r| r.sid() != INDEX);
        Sheet::from_stream(&mut RecordStream::new(recs)).unwrap()
    }

    #[test]
    fn test_create_sheet_layout() {
        let sheet = Sheet::create_sheet();
        let s = sids(&sheet);
        assert_eq!(s.first(), Some(&BOF));
        assert_eq!(s.last(), Some(&EOF));
        let pos = |sid| s.iter().position(|&x| x == sid).unwrap();
        assert!(pos(HEADER) < pos(DEFCOLWIDTH));
        assert!(pos(DEFCOLWIDTH) < pos(DIMENSION));
        assert!(pos(DIMENSION) < pos(WINDOW2));
        assert!(pos(WINDOW2) < pos(SELECTION));
    }

    #[test]
    fn test_round_trip_of_new_sheet() {
        let mut sheet = Sheet::create_sheet();
        sheet.add_value_record(number(3, 2)).unwrap();
        sheet.add_merged_region(0, 0, 1, 1).unwrap();
        let back = reread(&sheet);
        assert_eq!(back.records().unwrap(), sheet.records().unwrap());
    }

    #[test]
    fn test_missing_window2_is_structural() {
        let recs = vec![
            Record::Bof(BofRecord::worksheet()),
            Record::Dimensions(DimensionsRecord::default()),
            Record::Eof,
        ];
        assert!(matches!(
            Sheet::from_stream(&mut RecordStream::new(recs)),
            Err(XlsError::Structural { sid: WINDOW2, .. })
        ));
    }

    #[test]
    fn test_first_record_must_be_bof() {
        let recs = vec![Record::Window2(Window2Record::default()), Record::Eof];
        assert!(matches!(
            Sheet::from_stream(&mut RecordStream::new(recs)),
            Err(XlsError::Structural { .. })
        ));
    }

    #[test]
    fn test_missing_dimensions_is_synthesized_before_the_cells() {
        let recs = vec![
            Record::Bof(BofRecord::worksheet()),
            Record::Row(RowRecord::new(4)),
            Record::Number(NumberRecord {
                row: 4,
                col: 2,
                xf: 15,
                value: 2.0,
            }),
            Record::Window2(Window2Record::default()),
            Record::Eof,
        ];
        let sheet = Sheet::from_stream(&mut RecordStream::new(recs)).unwrap();
        let dims = sheet.dimensions().unwrap();
        assert_eq!((dims.first_row, dims.last_row), (4, 5));
        assert_eq!((dims.first_col, dims.last_col), (2, 3));
        let dim_at = sheet.find_first_record_loc(DIMENSION).unwrap();
        let rows_at = find_aggregate(&sheet.items, AggregateKind::RowRecords).unwrap();
        let w2_at = sheet.find_first_record_loc(WINDOW2).unwrap();
        assert!(dim_at < rows_at && rows_at < w2_at);

        let out = sheet.records().unwrap();
        let back = Sheet::from_stream(&mut RecordStream::new(out.clone())).unwrap();
        assert_eq!(back.records().unwrap(), out);
        assert_eq!(out.iter().filter(|r| r.sid() == DIMENSION).count(), 1);
    }

    #[test]
    fn test_dimensions_only_widen() {
        let mut sheet = Sheet::create_sheet();
        sheet.add_value_record(number(10, 5)).unwrap();
        sheet.add_value_record(number(2, 7)).unwrap();
        sheet.remove_value_record(10, 5).unwrap();
        let d = sheet.dimensions().unwrap();
        assert_eq!((d.first_row, d.last_row, d.first_col, d.last_col), (2, 11, 5, 8));
        let row = sheet.get_row(10).unwrap();
        assert_eq!((row.first_col, row.last_col), (5, 6));
    }

    #[test]
    fn test_merged_regions() {
        let mut sheet = Sheet::create_sheet();
        assert_eq!(sheet.add_merged_region(1, 1, 3, 3).unwrap(), 0);
        assert!(matches!(
            sheet.add_merged_region(5, 5, 4, 4),
            Err(XlsError::InvalidArgument(_))
        ));
        assert_eq!(sheet.num_merged_regions(), 1);
        sheet.remove_merged_region(7);
        assert_eq!(sheet.num_merged_regions(), 1);
        assert!(sheet.merged_region_at(1).is_none());
    }

    #[test]
    fn test_freeze_pane() {
        let mut sheet = Sheet::create_sheet();
        sheet.create_freeze_pane(0, 2, 2, 0).unwrap();
        let p = sheet.pane_information().unwrap();
        assert_eq!((p.x, p.y, p.active_pane, p.frozen), (0, 2, 2, true));
        let w2 = sheet.find_first_record_loc(WINDOW2).unwrap();
        assert_eq!(sheet.find_first_record_loc(PANE), Some(w2 + 1));

        sheet.create_freeze_pane(0, 0, 0, 0).unwrap();
        assert!(sheet.pane_information().is_none());
        assert!(!sheet.window2().unwrap().has(window2::FREEZE_PANES));
    }

    #[test]
    fn test_split_pane() {
        let mut sheet = Sheet::create_sheet();
        sheet.create_split_pane(2000, 1000, 3, 1, 0).unwrap();
        let p = sheet.pane_information().unwrap();
        assert_eq!((p.x, p.y, p.top_row, p.left_col), (2000, 1000, 3, 1));
        assert!(!p.frozen);
        assert!(sheet.create_split_pane(0, 0, 0, 0, 9).is_err());
    }

    #[test]
    fn test_group_rows_updates_guts() {
        let mut sheet = Sheet::create_sheet();
        sheet.group_row_range(2, 4, true).unwrap();
        sheet.group_row_range(3, 3, true).unwrap();
        assert_eq!(sheet.get_row(3).unwrap().outline_level(), 2);
        let Some(Record::Guts(g)) = sheet.find_first_record(GUTS) else {
            panic!("no GUTS");
        };
        assert_eq!((g.row_level_max, g.left_row_gutter), (3, 53));
    }

    #[test]
    fn test_group_columns_updates_guts() {
        let mut sheet = Sheet::create_sheet();
        sheet.group_column_range(1, 3, true).unwrap();
        let Some(Record::Guts(g)) = sheet.find_first_record(GUTS) else {
            panic!("no GUTS");
        };
        assert_eq!((g.col_level_max, g.top_col_gutter), (2, 29));
    }

    #[test]
    fn test_column_width_defaults() {
        let mut sheet = Sheet::create_sheet();
        assert_eq!(sheet.column_width(4), 8 * 256);
        sheet.set_column_width(4, 5000);
        assert_eq!(sheet.column_width(4), 5000);
        sheet.set_column_hidden(4, true);
        assert!(sheet.is_column_hidden(4));
        assert_eq!(sheet.column_width(4), 5000);
    }

    #[test]
    fn test_lazy_blocks_are_placed_once() {
        let mut sheet = Sheet::create_sheet();
        sheet.conditional_formatting().unwrap();
        sheet.conditional_formatting().unwrap();
        sheet.data_validity_table().unwrap();
        let count = |k| {
            sheet
                .items()
                .iter()
                .filter(|i| i.aggregate() == Some(k))
                .count()
        };
        assert_eq!(count(AggregateKind::ConditionalFormatting), 1);
        assert_eq!(count(AggregateKind::DataValidity), 1);
        let merged = find_aggregate(sheet.items(), AggregateKind::MergedCells).unwrap();
        let cf = find_aggregate(sheet.items(), AggregateKind::ConditionalFormatting).unwrap();
        let dv = find_aggregate(sheet.items(), AggregateKind::DataValidity).unwrap();
        assert!(merged < cf && cf < dv);
    }

    #[test]
    fn test_serialize_index_points_at_dbcells() {
        let mut sheet = Sheet::create_sheet();
        for r in 0..40 {
            sheet.add_value_record(number(r, 0)).unwrap();
        }
        let offset = 1000;
        let mut out = Vec::new();
        let n = sheet.serialize(offset, &mut out).unwrap();
        assert_eq!(n, out.len());
        assert_eq!(n, sheet.serialized_size().unwrap());

        let physical = crate::biff::read_all_records(&mut std::io::Cursor::new(&out)).unwrap();
        assert_eq!(physical[1].record_type, INDEX);
        let Record::Index(index) = Record::decode(&physical[1]) else {
            panic!("INDEX did not decode");
        };
        assert_eq!((index.first_row, index.last_row), (0, 40));
        let dbcells: Vec<u32> = physical
            .iter()
            .filter(|r| r.record_type == DBCELL)
            .map(|r| (offset as u64 + r.stream_offset) as u32)
            .collect();
        assert_eq!(index.dbcells, dbcells);
    }

    #[test]
    fn test_uncalced_is_written_after_bof() {
        let mut sheet = Sheet::create_sheet();
        sheet.set_uncalced(true);
        let s = sids(&sheet);
        assert_eq!(&s[..2], &[BOF, UNCALCED]);
        assert!(reread(&sheet).is_uncalced());
    }

    #[test]
    fn test_add_shape_creates_drawing_before_window2() {
        let mut dm = DrawingManager::new();
        let mut sheet = Sheet::create_sheet();
        let shape = Shape::Textbox {
            anchor: ShapeAnchor::default(),
            style: ShapeStyle::default(),
            text: "x".into(),
            margins: [0; 4],
        };
        let id = sheet.add_shape(&mut dm, &shape).unwrap();
        assert_eq!(id, 1025);
        let d = find_aggregate(sheet.items(), AggregateKind::Drawing).unwrap();
        assert!(d < sheet.find_first_record_loc(WINDOW2).unwrap());

        // Reading it back and re-aggregating yields the same drawing.
        let mut back = reread(&sheet);
        assert!(back.aggregate_drawing_records(&mut dm, false).unwrap());
        assert_eq!(back.drawing().unwrap().shape_ids(), vec![1024, 1025]);
    }

    #[test]
    fn test_no_drawing_without_create() {
        let mut dm = DrawingManager::new();
        let mut sheet = Sheet::create_sheet();
        assert!(!sheet.aggregate_drawing_records(&mut dm, false).unwrap());
        assert!(sheet.drawing().is_none());
    }
}
