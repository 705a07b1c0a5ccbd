//! Drawing layer: the workbook-wide drawing group, per-sheet drawings and
//! the shape translators.
//!
//! Shape ids are handed out in clusters of 1024. Cluster `n` (1-based, in
//! Dgg order) owns ids `n * 1024 ..= n * 1024 + 1023`.

pub mod aggregate;
pub mod shapes;

pub use aggregate::DrawingAggregate;
pub use shapes::{translate, Shape, ShapeAnchor, ShapeStyle, TranslatedShape};

use crate::biff::records::MSODRAWINGGROUP;
use crate::error::{XlsError, XlsResult};
use crate::escher::{
    bump_bse_ref_count, parse_records, properties::pid, record_type, DgRecord, DggRecord,
    EscherProperty, EscherRecord, OptRecord,
};
use crate::record::{RawRecord, Record};

/// Shape ids per cluster.
pub const SHAPES_PER_CLUSTER: u32 = 1024;

/// Owns the MSODRAWINGGROUP tree: the Dgg record, the BLIP store and the
/// default shape properties.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawingManager {
    dgg: DggRecord,
    /// DggContainer children other than the Dgg itself.
    rest: Vec<EscherRecord>,
}

impl Default for DrawingManager {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawingManager {
    /// A drawing group as Excel writes it for a workbook with no pictures.
    pub fn new() -> Self {
        let mut opt = OptRecord::new();
        opt.set(EscherProperty::simple(pid::SIZE_TEXT_TO_FIT_SHAPE, 0x0008_0008));
        opt.set(EscherProperty::simple(pid::FILL_COLOR, 0x0800_0041));
        opt.set(EscherProperty::simple(pid::LINE_COLOR, 0x0800_0040));
        let mut colors = Vec::with_capacity(16);
        for c in [0x0800_000Du32, 0x0800_000C, 0x0800_0017, 0x1000_00F7] {
            colors.extend_from_slice(&c.to_le_bytes());
        }
        DrawingManager {
            dgg: DggRecord::default(),
            rest: vec![
                EscherRecord::Opt(opt),
                EscherRecord::atom(record_type::SPLIT_MENU_COLORS, 0x0040, colors),
            ],
        }
    }

    /// Build from the concatenated MSODRAWINGGROUP bodies.
    pub fn from_bytes(data: &[u8]) -> XlsResult<Self> {
        let container = parse_records(data)?
            .into_iter()
            .find(|r| r.record_id() == record_type::DGG_CONTAINER)
            .ok_or_else(|| XlsError::structural(MSODRAWINGGROUP, "no DggContainer"))?;
        Self::from_container(container)
    }

    pub fn from_container(container: EscherRecord) -> XlsResult<Self> {
        let EscherRecord::Container { children, .. } = container else {
            return Err(XlsError::structural(
                MSODRAWINGGROUP,
                "drawing group is not a container",
            ));
        };
        let mut dgg = None;
        let mut rest = Vec::with_capacity(children.len());
        for child in children {
            match child {
                EscherRecord::Dgg(d) if dgg.is_none() => dgg = Some(d),
                other => rest.push(other),
            }
        }
        let dgg = dgg.ok_or_else(|| {
            XlsError::structural(MSODRAWINGGROUP, "drawing group has no Dgg record")
        })?;
        log::debug!(
            "drawing group: {} clusters, shape id max {}",
            dgg.clusters.len(),
            dgg.shape_id_max
        );
        Ok(DrawingManager { dgg, rest })
    }

    pub fn dgg(&self) -> &DggRecord {
        &self.dgg
    }

    pub fn dgg_mut(&mut self) -> &mut DggRecord {
        &mut self.dgg
    }

    /// New drawing descriptor with the next unused drawing id and an empty
    /// cluster registered for it.
    pub fn create_dg_record(&mut self) -> DgRecord {
        let dg_id = self.find_new_drawing_group_id();
        self.dgg.add_cluster(dg_id as u32, 0);
        self.increment_drawings_saved();
        DgRecord::new(dg_id)
    }

    /// Lowest drawing id no cluster uses.
    pub fn find_new_drawing_group_id(&self) -> u16 {
        let mut id: u16 = 1;
        while self
            .dgg
            .clusters
            .iter()
            .any(|c| c.drawing_group_id == id as u32)
        {
            id += 1;
        }
        id
    }

    pub fn increment_drawings_saved(&mut self) {
        self.dgg.drawings_saved += 1;
    }

    /// Next shape id for the drawing `dg`, opening a new cluster when the
    /// drawing's clusters are full.
    pub fn allocate_shape_id(&mut self, dg: &mut DgRecord) -> u32 {
        let dg_id = dg.drawing_id() as u32;
        self.dgg.num_shapes_saved += 1;

        let slot = self
            .dgg
            .clusters
            .iter()
            .position(|c| c.drawing_group_id == dg_id && c.num_shapes_used < SHAPES_PER_CLUSTER);
        let index = match slot {
            Some(i) => i,
            None => {
                self.dgg.add_cluster(dg_id, 0);
                self.dgg.clusters.len() - 1
            }
        };
        let cluster = &mut self.dgg.clusters[index];
        let shape_id = (index as u32 + 1) * SHAPES_PER_CLUSTER + cluster.num_shapes_used;
        cluster.num_shapes_used += 1;

        dg.num_shapes += 1;
        dg.last_shape_id = shape_id;
        self.dgg.shape_id_max = self.dgg.shape_id_max.max(shape_id + 1);
        shape_id
    }

    fn bstore_mut(&mut self) -> Option<&mut EscherRecord> {
        self.rest
            .iter_mut()
            .find(|r| r.record_id() == record_type::BSTORE_CONTAINER)
    }

    /// BLIP store entries in index order.
    pub fn bse_records(&self) -> &[EscherRecord] {
        self.rest
            .iter()
            .find(|r| r.record_id() == record_type::BSTORE_CONTAINER)
            .map(EscherRecord::children)
            .unwrap_or(&[])
    }

    /// Append a BSE atom and return its 1-based picture index.
    pub fn add_bse(&mut self, bse: EscherRecord) -> XlsResult<usize> {
        if bse.record_id() != record_type::BSE {
            return Err(XlsError::invalid_argument(format!(
                "expected a BSE record, got 0x{:04X}",
                bse.record_id()
            )));
        }
        if self.bstore_mut().is_none() {
            // The BLIP store sits right after the Dgg.
            self.rest
                .insert(0, EscherRecord::container(record_type::BSTORE_CONTAINER, Vec::new()));
        }
        let children = self
            .bstore_mut()
            .and_then(EscherRecord::children_mut)
            .ok_or_else(|| XlsError::invalid_state("BLIP store is not a container"))?;
        children.push(bse);
        let count = children.len();
        if let Some(EscherRecord::Container { options, .. }) = self.bstore_mut() {
            *options = (*options & 0x000F) | ((count as u16) << 4);
        }
        Ok(count)
    }

    /// Add one reference to the picture with the 1-based index `index`.
    pub fn bump_picture_ref(&mut self, index: usize) -> bool {
        let Some(children) = self.bstore_mut().and_then(EscherRecord::children_mut) else {
            return false;
        };
        match index.checked_sub(1).and_then(|i| children.get_mut(i)) {
            Some(bse) => bump_bse_ref_count(bse),
            None => false,
        }
    }

    /// The DggContainer with the current Dgg.
    pub fn to_container(&self) -> EscherRecord {
        let mut children = Vec::with_capacity(self.rest.len() + 1);
        children.push(EscherRecord::Dgg(self.dgg.clone()));
        children.extend(self.rest.iter().cloned());
        EscherRecord::container(record_type::DGG_CONTAINER, children)
    }

    /// The MSODRAWINGGROUP record. Bodies over the record limit continue
    /// in CONTINUE records.
    pub fn to_record(&self) -> Record {
        let mut data = Vec::new();
        self.to_container().serialize(&mut data);
        Record::Raw(RawRecord {
            sid: MSODRAWINGGROUP,
            data,
            continue_offsets: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bse(ref_count: u32) -> EscherRecord {
        let mut data = vec![0u8; 36];
        data[24..28].copy_from_slice(&ref_count.to_le_bytes());
        EscherRecord::atom(record_type::BSE, 0x0062, data)
    }

    #[test]
    fn test_create_dg_records() {
        let mut dm = DrawingManager::new();
        let dg1 = dm.create_dg_record();
        let dg2 = dm.create_dg_record();
        assert_eq!(dg1.drawing_id(), 1);
        assert_eq!(dg2.drawing_id(), 2);
        assert_eq!(dm.dgg().drawings_saved, 2);
        assert_eq!(dm.dgg().clusters.len(), 2);
    }

    #[test]
    fn test_1025_shapes_open_a_second_cluster() {
        let mut dm = DrawingManager::new();
        let mut dg = dm.create_dg_record();
        let ids: Vec<u32> = (0..1025).map(|_| dm.allocate_shape_id(&mut dg)).collect();
        assert_eq!(ids[0], 1024);
        assert_eq!(ids[1023], 2047);
        assert_eq!(ids[1024], 2048);
        assert_eq!(dm.dgg().clusters.len(), 2);
        assert_eq!(dm.dgg().clusters[1].num_shapes_used, 1);
        assert_eq!(dm.dgg().shape_id_max, 2049);
        assert_eq!(dg.num_shapes, 1025);
        assert_eq!(dg.last_shape_id, 2048);
    }

    #[test]
    fn test_interleaved_drawings_get_distinct_ids() {
        let mut dm = DrawingManager::new();
        let mut a = dm.create_dg_record();
        let mut b = dm.create_dg_record();
        let x = dm.allocate_shape_id(&mut a);
        let y = dm.allocate_shape_id(&mut b);
        let z = dm.allocate_shape_id(&mut a);
        assert_eq!((x, y, z), (1024, 2048, 1025));
    }

    #[test]
    fn test_container_round_trip() {
        let mut dm = DrawingManager::new();
        let mut dg = dm.create_dg_record();
        dm.allocate_shape_id(&mut dg);
        assert_eq!(dm.add_bse(bse(1)).unwrap(), 1);
        let Record::Raw(raw) = dm.to_record() else {
            panic!("expected a raw MSODRAWINGGROUP");
        };
        let back = DrawingManager::from_bytes(&raw.data).unwrap();
        assert_eq!(back, dm);
        assert_eq!(back.bse_records().len(), 1);
    }

    #[test]
    fn test_bump_picture_ref() {
        let mut dm = DrawingManager::new();
        dm.add_bse(bse(1)).unwrap();
        assert!(dm.bump_picture_ref(1));
        assert_eq!(crate::escher::bse_ref_count(&dm.bse_records()[0]), Some(2));
        assert!(!dm.bump_picture_ref(2));
        assert!(!dm.bump_picture_ref(0));
    }

    #[test]
    fn test_missing_dgg_is_structural() {
        let empty = EscherRecord::container(record_type::DGG_CONTAINER, Vec::new());
        assert!(matches!(
            DrawingManager::from_container(empty),
            Err(XlsError::Structural { sid: MSODRAWINGGROUP, .. })
        ));
    }
}
