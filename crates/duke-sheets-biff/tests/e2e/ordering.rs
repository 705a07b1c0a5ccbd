//! Property tests: whatever mutations are applied, the written sheet keeps
//! Excel's record order, and DIMENSIONS only ever grows.

use duke_sheets_biff::biff::records::*;
use duke_sheets_biff::record::Record;
use duke_sheets_biff::Sheet;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Cell(u16, u16),
    Merge(u16, u16),
    Freeze(u16, u16),
    ColumnWidth(u16, u16),
    GroupRows(u16, u16),
    Protect,
    Header,
    ConditionalFormatting,
    DataValidity,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u16..300, 0u16..50).prop_map(|(r, c)| Op::Cell(r, c)),
        (0u16..300, 0u16..50).prop_map(|(r, c)| Op::Merge(r, c)),
        (0u16..10, 0u16..10).prop_map(|(r, c)| Op::Freeze(r, c)),
        (0u16..50, 100u16..9000).prop_map(|(c, w)| Op::ColumnWidth(c, w)),
        (0u16..200, 0u16..5).prop_map(|(r, n)| Op::GroupRows(r, n)),
        Just(Op::Protect),
        Just(Op::Header),
        Just(Op::ConditionalFormatting),
        Just(Op::DataValidity),
    ]
}

fn apply(sheet: &mut Sheet, op: &Op) {
    match *op {
        Op::Cell(r, c) => sheet.add_value_record(crate::number(r, c, 1.0)).unwrap(),
        Op::Merge(r, c) => {
            sheet.add_merged_region(r, c, r + 1, c + 1).unwrap();
        }
        Op::Freeze(r, c) => sheet.create_freeze_pane(c, r, r, c).unwrap(),
        Op::ColumnWidth(c, w) => sheet.set_column_width(c, w),
        Op::GroupRows(r, n) => sheet.group_row_range(r, r + n, true).unwrap(),
        Op::Protect => sheet
            .protection_block()
            .unwrap()
            .protect_sheet(None, true, true),
        Op::Header => sheet.page_settings().unwrap().set_header("h"),
        Op::ConditionalFormatting => {
            sheet.conditional_formatting().unwrap();
        }
        Op::DataValidity => {
            sheet.data_validity_table().unwrap();
        }
    }
}

fn first(sids: &[u16], sid: u16) -> Option<usize> {
    sids.iter().position(|&s| s == sid)
}

fn last(sids: &[u16], sid: u16) -> Option<usize> {
    sids.iter().rposition(|&s| s == sid)
}

/// `a` (when present) comes before `b` (when present).
fn before(sids: &[u16], a: u16, b: u16) -> bool {
    match (last(sids, a), first(sids, b)) {
        (Some(x), Some(y)) => x < y,
        _ => true,
    }
}

proptest! {
    #[test]
    fn prop_record_order_is_kept(ops in prop::collection::vec(op(), 0..40)) {
        let mut sheet = Sheet::create_sheet();
        for op in &ops {
            apply(&mut sheet, op);
        }
        let sids: Vec<u16> = sheet.records().unwrap().iter().map(Record::sid).collect();

        prop_assert_eq!(sids.first(), Some(&BOF));
        prop_assert_eq!(sids.last(), Some(&EOF));
        prop_assert_eq!(sids.iter().filter(|&&s| s == EOF).count(), 1);
        prop_assert_eq!(sids.iter().filter(|&&s| s == DIMENSION).count(), 1);
        prop_assert!(before(&sids, PROTECT, DEFCOLWIDTH));
        prop_assert!(before(&sids, WSBOOL, HEADER));
        prop_assert!(before(&sids, HEADER, DEFCOLWIDTH));
        prop_assert!(before(&sids, DEFCOLWIDTH, DIMENSION));
        prop_assert!(before(&sids, DIMENSION, ROW));
        prop_assert!(before(&sids, ROW, WINDOW2));
        prop_assert!(before(&sids, NUMBER, WINDOW2));
        prop_assert!(before(&sids, WINDOW2, SELECTION));
        prop_assert!(before(&sids, SELECTION, MERGECELLS));
        prop_assert!(before(&sids, WINDOW2, PANE));
    }

    #[test]
    fn prop_dimensions_only_grow(cells in prop::collection::vec((0u16..2000, 0u16..200), 1..60)) {
        let mut sheet = Sheet::create_sheet();
        let mut prev: Option<(u32, u32, u16, u16)> = None;
        for &(r, c) in &cells {
            sheet.add_value_record(crate::number(r, c, 0.0)).unwrap();
            let d = sheet.dimensions().unwrap();
            let now = (d.first_row, d.last_row, d.first_col, d.last_col);
            prop_assert!(now.0 <= r as u32 && (r as u32) < now.1);
            prop_assert!(now.2 <= c && c < now.3);
            if let Some(p) = prev {
                prop_assert!(now.0 <= p.0 && now.1 >= p.1);
                prop_assert!(now.2 <= p.2 && now.3 >= p.3);
            }
            prev = Some(now);
        }
        for &(r, c) in &cells {
            sheet.remove_value_record(r, c).unwrap();
        }
        let d = sheet.dimensions().unwrap();
        let p = prev.unwrap();
        prop_assert_eq!((d.first_row, d.last_row, d.first_col, d.last_col), p);
    }
}
