//! Shapes through the workbook drawing group.

use std::collections::HashSet;

use crate::textbox;
use duke_sheets_biff::drawing::DrawingManager;
use duke_sheets_biff::BiffDocument;
use pretty_assertions::assert_eq;

fn add_textboxes(doc: &mut BiffDocument, sheet: usize, n: u16) -> Vec<u32> {
    let (sheet, wb) = doc.sheet_and_workbook_mut(sheet).unwrap();
    let dm = wb.create_drawing_group_if_absent().unwrap();
    (0..n)
        .map(|i| sheet.add_shape(dm, &textbox(i * 3)).unwrap())
        .collect()
}

#[test]
fn test_1025_shape_ids_open_a_second_cluster() {
    let mut dm = DrawingManager::new();
    let mut dg = dm.create_dg_record();
    let ids: Vec<u32> = (0..1025).map(|_| dm.allocate_shape_id(&mut dg)).collect();
    assert_eq!(ids[1024], ids[0] + 1024);
    assert_eq!(dm.dgg().clusters.len(), 2);
}

#[test]
fn test_shape_ids_unique_across_sheets() {
    let mut doc = BiffDocument::new();
    doc.create_sheet("Two").unwrap();
    let mut ids = add_textboxes(&mut doc, 0, 5);
    ids.extend(add_textboxes(&mut doc, 1, 5));
    let unique: HashSet<u32> = ids.iter().copied().collect();
    assert_eq!(unique.len(), ids.len());
}

#[test]
fn test_cloned_sheet_gets_fresh_ids() {
    let mut doc = BiffDocument::new();
    add_textboxes(&mut doc, 0, 3);
    let copy = doc.clone_sheet(0, "Copy").unwrap();
    assert_eq!(copy, 1);

    let original: HashSet<u32> = doc.sheet(0).unwrap().drawing().unwrap().shape_ids().into_iter().collect();
    let cloned: HashSet<u32> = doc.sheet(1).unwrap().drawing().unwrap().shape_ids().into_iter().collect();
    assert_eq!(original.len(), cloned.len());
    assert!(original.is_disjoint(&cloned));
}

#[test]
fn test_drawing_survives_write_and_read() {
    let mut doc = BiffDocument::new();
    let ids = add_textboxes(&mut doc, 0, 2);
    let bytes = doc.to_stream_bytes().unwrap();

    let mut back = BiffDocument::from_stream_bytes(&bytes).unwrap();
    let (sheet, wb) = back.sheet_and_workbook_mut(0).unwrap();
    assert!(wb.find_drawing_group().unwrap());
    let dm = wb.drawing_manager_mut().unwrap();
    assert!(sheet.aggregate_drawing_records(dm, false).unwrap());
    let read_ids = sheet.drawing().unwrap().shape_ids();
    for id in ids {
        assert!(read_ids.contains(&id));
    }
}
