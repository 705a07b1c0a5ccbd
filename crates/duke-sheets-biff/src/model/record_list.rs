//! The workbook-globals record list and its positional cursors.
//!
//! Each cursor holds the index of the last item of one kind (the last FONT,
//! the last XF, ...). Every insert and remove goes through this list so the
//! cursors shift in the same step as the items.

use crate::biff::records::*;
use crate::record::Record;

/// One entry of the globals list.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkbookItem {
    Record(Record),
    /// Placement of the SUPBOOK/EXTERNSHEET/NAME run.
    LinkTable,
    /// Placement of the MSODRAWINGGROUP record.
    DrawingGroup,
}

impl WorkbookItem {
    pub fn sid(&self) -> Option<u16> {
        match self {
            WorkbookItem::Record(r) => Some(r.sid()),
            _ => None,
        }
    }

    pub fn record(&self) -> Option<&Record> {
        match self {
            WorkbookItem::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn record_mut(&mut self) -> Option<&mut Record> {
        match self {
            WorkbookItem::Record(r) => Some(r),
            _ => None,
        }
    }
}

impl From<Record> for WorkbookItem {
    fn from(r: Record) -> Self {
        WorkbookItem::Record(r)
    }
}

/// Kinds of item the list keeps a cursor for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Protect,
    Backup,
    Font,
    Format,
    Xf,
    Style,
    Palette,
    BoundSheet,
    Country,
    LinkTable,
    DrawingGroup,
    Sst,
    TabId,
}

impl Anchor {
    const ALL: [Anchor; 13] = [
        Anchor::Protect,
        Anchor::Backup,
        Anchor::Font,
        Anchor::Format,
        Anchor::Xf,
        Anchor::Style,
        Anchor::Palette,
        Anchor::BoundSheet,
        Anchor::Country,
        Anchor::LinkTable,
        Anchor::DrawingGroup,
        Anchor::Sst,
        Anchor::TabId,
    ];

    fn slot(self) -> usize {
        self as usize
    }

    /// Anchor tracking records with `sid`, if any.
    pub fn for_sid(sid: u16) -> Option<Anchor> {
        Some(match sid {
            PROTECT => Anchor::Protect,
            BACKUP => Anchor::Backup,
            FONT => Anchor::Font,
            FORMAT => Anchor::Format,
            XF => Anchor::Xf,
            STYLE => Anchor::Style,
            PALETTE => Anchor::Palette,
            BOUNDSHEET => Anchor::BoundSheet,
            COUNTRY => Anchor::Country,
            SST => Anchor::Sst,
            TABID => Anchor::TabId,
            _ => return None,
        })
    }

    pub fn matches(self, item: &WorkbookItem) -> bool {
        match (self, item) {
            (Anchor::LinkTable, WorkbookItem::LinkTable) => true,
            (Anchor::DrawingGroup, WorkbookItem::DrawingGroup) => true,
            (_, WorkbookItem::Record(r)) => Anchor::for_sid(r.sid()) == Some(self),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorkbookRecordList {
    items: Vec<WorkbookItem>,
    cursors: [Option<usize>; Anchor::ALL.len()],
}

impl WorkbookRecordList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[WorkbookItem] {
        &self.items
    }

    pub fn get(&self, pos: usize) -> Option<&WorkbookItem> {
        self.items.get(pos)
    }

    pub fn get_mut(&mut self, pos: usize) -> Option<&mut WorkbookItem> {
        self.items.get_mut(pos)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut WorkbookItem> {
        self.items.iter_mut()
    }

    /// Index of the last item of `anchor`'s kind.
    pub fn cursor(&self, anchor: Anchor) -> Option<usize> {
        self.cursors[anchor.slot()]
    }

    /// Append, moving the item's cursor onto it.
    pub fn push(&mut self, item: WorkbookItem) {
        let pos = self.items.len();
        let anchor = Anchor::ALL.iter().copied().find(|a| a.matches(&item));
        self.items.push(item);
        if let Some(a) = anchor {
            self.cursors[a.slot()] = Some(pos);
        }
    }

    /// Insert at `pos`, shifting every cursor at or after it. If the item
    /// lands right after the last item of its kind it becomes the new last.
    pub fn insert(&mut self, pos: usize, item: WorkbookItem) {
        let pos = pos.min(self.items.len());
        let anchor = Anchor::ALL.iter().copied().find(|a| a.matches(&item));
        self.items.insert(pos, item);
        for c in self.cursors.iter_mut().flatten() {
            if *c >= pos {
                *c += 1;
            }
        }
        if let Some(a) = anchor {
            let slot = &mut self.cursors[a.slot()];
            match *slot {
                Some(c) if c > pos => {}
                _ => *slot = Some(pos),
            }
        }
    }

    /// Insert after the last item of `anchor`'s kind, or at `fallback`.
    pub fn insert_after(&mut self, anchor: Anchor, fallback: usize, item: WorkbookItem) -> usize {
        let pos = self.cursor(anchor).map_or(fallback, |c| c + 1);
        self.insert(pos, item);
        pos
    }

    /// Remove the item at `pos`, shifting cursors back. A cursor left on an
    /// item of another kind is cleared.
    pub fn remove(&mut self, pos: usize) -> Option<WorkbookItem> {
        if pos >= self.items.len() {
            return None;
        }
        let removed = self.items.remove(pos);
        for (slot, anchor) in Anchor::ALL.iter().enumerate() {
            let Some(c) = self.cursors[slot] else {
                continue;
            };
            let moved = if c >= pos { c.checked_sub(1) } else { Some(c) };
            self.cursors[slot] = moved.filter(|&m| {
                self.items
                    .get(m)
                    .is_some_and(|item| anchor.matches(item))
            });
        }
        Some(removed)
    }

    pub fn find_first_sid(&self, sid: u16) -> Option<usize> {
        self.items.iter().position(|i| i.sid() == Some(sid))
    }

    pub fn find_first(&self, anchor: Anchor) -> Option<usize> {
        self.items.iter().position(|i| anchor.matches(i))
    }

    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.items.iter().filter_map(WorkbookItem::record)
    }

    pub fn records_mut(&mut self) -> impl Iterator<Item = &mut Record> {
        self.items.iter_mut().filter_map(WorkbookItem::record_mut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FontRecord;

    fn font() -> WorkbookItem {
        Record::Font(FontRecord::default()).into()
    }

    fn list() -> WorkbookRecordList {
        let mut l = WorkbookRecordList::new();
        l.push(Record::Eof.into());
        l.push(font());
        l.push(font());
        l.push(Record::raw(COUNTRY, vec![1, 0, 1, 0]).into());
        l.push(Record::Eof.into());
        l
    }

    #[test]
    fn test_insert_shifts_cursors() {
        let mut l = list();
        assert_eq!(l.cursor(Anchor::Font), Some(2));
        assert_eq!(l.cursor(Anchor::Country), Some(3));
        l.insert(0, Record::raw(MMS, vec![0, 0]).into());
        assert_eq!(l.cursor(Anchor::Font), Some(3));
        assert_eq!(l.cursor(Anchor::Country), Some(4));
    }

    #[test]
    fn test_insert_after_last_of_kind() {
        let mut l = list();
        let pos = l.insert_after(Anchor::Font, 0, font());
        assert_eq!(pos, 3);
        assert_eq!(l.cursor(Anchor::Font), Some(3));
        assert_eq!(l.cursor(Anchor::Country), Some(4));
    }

    #[test]
    fn test_remove_shifts_and_clears() {
        let mut l = list();
        l.remove(2);
        assert_eq!(l.cursor(Anchor::Font), Some(1));
        assert_eq!(l.cursor(Anchor::Country), Some(2));
        l.remove(1);
        assert_eq!(l.cursor(Anchor::Font), None);
        assert_eq!(l.cursor(Anchor::Country), Some(1));
        assert!(l.remove(99).is_none());
    }

    #[test]
    fn test_placements_have_cursors() {
        let mut l = list();
        l.insert(4, WorkbookItem::LinkTable);
        assert_eq!(l.cursor(Anchor::LinkTable), Some(4));
        l.insert(4, WorkbookItem::DrawingGroup);
        assert_eq!(l.cursor(Anchor::LinkTable), Some(5));
        assert_eq!(l.cursor(Anchor::DrawingGroup), Some(4));
    }
}
