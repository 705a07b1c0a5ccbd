//! A sheet's drawing: the escher tree spread over MSODRAWING records, the
//! OBJ/TXO records (and chart substreams) attached to its shapes, and the
//! NOTE records of its comments.
//!
//! The tree is stored parsed. `attached[i]` holds the BIFF records that
//! follow the i-th ClientData or ClientTextbox atom in tree order; on write
//! the tree is split into one MSODRAWING after each of those atoms.

use crate::biff::records::{CONTINUE, MSODRAWING, OBJ, TXO};
use crate::error::{XlsError, XlsResult};
use crate::escher::{
    parse_records, properties::pid, record_type, shape_type, DgRecord, EscherRecord, ShapeFlags,
    SpRecord,
};
use crate::aggregates::{RecordAggregate, RecordVisitor};
use crate::record::{NoteRecord, RawRecord, Record};

use super::shapes::{translate, Shape};
use super::DrawingManager;

fn is_client_anchor(record_id: u16) -> bool {
    record_id == record_type::CLIENT_DATA || record_id == record_type::CLIENT_TEXTBOX
}

/// Whether `sid` belongs to the run of records a drawing is read from.
pub fn is_drawing_layer_record(sid: u16) -> bool {
    matches!(sid, MSODRAWING | OBJ | TXO | CONTINUE)
}

fn count_client_anchors(records: &[EscherRecord]) -> usize {
    let mut n = 0;
    for r in records {
        r.walk(&mut |e| {
            if is_client_anchor(e.record_id()) {
                n += 1;
            }
        });
    }
    n
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DrawingAggregate {
    records: Vec<EscherRecord>,
    attached: Vec<Vec<Record>>,
    notes: Vec<NoteRecord>,
}

impl DrawingAggregate {
    /// An empty drawing: the DgContainer with the patriarch group shape.
    pub fn create_patriarch(dm: &mut DrawingManager) -> Self {
        let mut dg = dm.create_dg_record();
        let shape_id = dm.allocate_shape_id(&mut dg);
        let mut spgr = Vec::with_capacity(16);
        for v in [0u32, 0, 1023, 255] {
            spgr.extend_from_slice(&v.to_le_bytes());
        }
        let patriarch = EscherRecord::container(
            record_type::SP_CONTAINER,
            vec![
                EscherRecord::atom(record_type::SPGR, 0x0001, spgr),
                EscherRecord::Sp(SpRecord::new(
                    shape_type::NOT_PRIMITIVE,
                    shape_id,
                    ShapeFlags::GROUP | ShapeFlags::PATRIARCH,
                )),
            ],
        );
        let dg_container = EscherRecord::container(
            record_type::DG_CONTAINER,
            vec![
                EscherRecord::Dg(dg),
                EscherRecord::container(record_type::SPGR_CONTAINER, vec![patriarch]),
            ],
        );
        DrawingAggregate {
            records: vec![dg_container],
            attached: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// Build from the drawing run (MSODRAWING, OBJ, TXO and any chart
    /// substreams between them) and the sheet's NOTE records.
    pub fn read(run: Vec<Record>, notes: Vec<Record>) -> XlsResult<Self> {
        let mut buf: Vec<u8> = Vec::new();
        // Records following the drawing bytes written so far.
        let mut pending: Vec<(usize, Vec<Record>)> = Vec::new();
        for rec in run {
            match rec {
                Record::Raw(raw) if raw.sid == MSODRAWING || raw.sid == CONTINUE => {
                    buf.extend_from_slice(&raw.data)
                }
                other => match pending.last_mut() {
                    Some((at, recs)) if *at == buf.len() => recs.push(other),
                    _ => pending.push((buf.len(), vec![other])),
                },
            }
        }

        let records = parse_records(&buf)?;
        let mut ends = Vec::new();
        let mut out = Vec::with_capacity(buf.len());
        for r in &records {
            r.serialize_tracking(&mut out, &mut |id, end| {
                if is_client_anchor(id) {
                    ends.push(end);
                }
            });
        }
        if out.len() != buf.len() {
            log::warn!(
                "drawing re-encodes to {} bytes, read {}",
                out.len(),
                buf.len()
            );
        }

        let mut attached = vec![Vec::new(); ends.len()];
        for (at, recs) in pending {
            let i = ends.iter().rposition(|&e| e <= at).ok_or_else(|| {
                XlsError::structural(
                    recs.first().map_or(OBJ, Record::sid),
                    "drawing object record before any shape anchor",
                )
            })?;
            attached[i].extend(recs);
        }

        let notes = notes
            .into_iter()
            .map(|r| match r {
                Record::Note(n) => Ok(n),
                other => Err(XlsError::structural(other.sid(), "malformed NOTE record")),
            })
            .collect::<XlsResult<Vec<_>>>()?;

        log::debug!(
            "drawing: {} escher bytes, {} client anchors, {} notes",
            buf.len(),
            attached.len(),
            notes.len()
        );
        Ok(DrawingAggregate {
            records,
            attached,
            notes,
        })
    }

    pub fn escher_records(&self) -> &[EscherRecord] {
        &self.records
    }

    pub fn escher_records_mut(&mut self) -> &mut [EscherRecord] {
        &mut self.records
    }

    pub fn notes(&self) -> &[NoteRecord] {
        &self.notes
    }

    /// Records attached to the i-th client anchor.
    pub fn attached(&self, index: usize) -> Option<&[Record]> {
        self.attached.get(index).map(Vec::as_slice)
    }

    pub fn dg(&self) -> Option<&DgRecord> {
        self.records
            .iter()
            .find_map(|r| r.find(record_type::DG))
            .and_then(EscherRecord::as_dg)
    }

    pub fn dg_mut(&mut self) -> Option<&mut DgRecord> {
        self.records
            .iter_mut()
            .find_map(|r| r.find_mut(record_type::DG))
            .and_then(EscherRecord::as_dg_mut)
    }

    /// Shape ids of every Sp record in the drawing.
    pub fn shape_ids(&self) -> Vec<u32> {
        let mut ids = Vec::new();
        for r in &self.records {
            r.walk(&mut |e| {
                if let Some(sp) = e.as_sp() {
                    ids.push(sp.shape_id);
                }
            });
        }
        ids
    }

    /// Translate `shape`, give it a fresh id and append it to the top group.
    pub fn add_shape(&mut self, shape: &Shape, dm: &mut DrawingManager) -> XlsResult<u32> {
        let mut dg = *self
            .dg()
            .ok_or_else(|| XlsError::invalid_state("drawing has no Dg record"))?;
        let Some(top) = self
            .records
            .iter()
            .position(|r| r.record_id() == record_type::DG_CONTAINER)
        else {
            return Err(XlsError::invalid_state("drawing has no DgContainer"));
        };
        let dg_children = self.records[top].children();
        let Some(spgr_at) = dg_children
            .iter()
            .position(|r| r.record_id() == record_type::SPGR_CONTAINER)
        else {
            return Err(XlsError::invalid_state("drawing has no SpgrContainer"));
        };
        // The new shape goes last in the group; its anchors follow every
        // anchor up to and including the group.
        let insert_at = count_client_anchors(&self.records[..top])
            + count_client_anchors(&dg_children[..=spgr_at]);

        shape.validate()?;
        let shape_id = dm.allocate_shape_id(&mut dg);
        let translated = translate(shape, shape_id)?;

        let spgr = self.records[top]
            .children_mut()
            .and_then(|c| c.get_mut(spgr_at))
            .and_then(EscherRecord::children_mut)
            .ok_or_else(|| XlsError::invalid_state("SpgrContainer is not a container"))?;
        spgr.push(translated.sp_container);

        let mut groups = vec![vec![Record::Obj(translated.obj)]];
        if let Some(txo) = translated.txo {
            groups.push(vec![Record::Txo(txo)]);
        }
        for (k, g) in groups.into_iter().enumerate() {
            self.attached.insert(insert_at + k, g);
        }
        if let Some(note) = translated.note {
            self.notes.push(note);
        }
        if let Some(slot) = self.dg_mut() {
            *slot = dg;
        }
        Ok(shape_id)
    }

    /// Give the drawing a new drawing id and fresh shape ids, and count one
    /// more reference on every picture it shows. OBJ object ids are scoped
    /// to their sheet and NOTE records point at them, so they are kept.
    pub fn reassign_ids(&mut self, dm: &mut DrawingManager) -> XlsResult<()> {
        let mut dg = *self
            .dg()
            .ok_or_else(|| XlsError::invalid_state("drawing has no Dg record"))?;
        let new_id = dm.find_new_drawing_group_id();
        dm.dgg_mut().add_cluster(new_id as u32, 0);
        dm.increment_drawings_saved();
        dg.options = (dg.options & 0x000F) | (new_id << 4);

        let mut pictures = Vec::new();
        for r in &mut self.records {
            r.walk_mut(&mut |e| match e {
                EscherRecord::Sp(sp) => {
                    sp.shape_id = dm.allocate_shape_id(&mut dg);
                    // Same shapes, new ids.
                    dg.num_shapes -= 1;
                }
                EscherRecord::Opt(opt) => {
                    if let Some(p) = opt.get(pid::BLIP_TO_DISPLAY) {
                        pictures.push(p.value as usize);
                    }
                }
                _ => {}
            });
        }
        for index in pictures {
            if !dm.bump_picture_ref(index) {
                log::warn!("picture index {index} has no BLIP store entry");
            }
        }
        if let Some(slot) = self.dg_mut() {
            *slot = dg;
        }
        Ok(())
    }
}

impl RecordAggregate for DrawingAggregate {
    fn visit_contained_records(&self, visitor: &mut dyn RecordVisitor) {
        let mut buf = Vec::new();
        let mut cuts = Vec::new();
        for r in &self.records {
            r.serialize_tracking(&mut buf, &mut |id, end| {
                if is_client_anchor(id) {
                    cuts.push(end);
                }
            });
        }
        let mut start = 0;
        for (i, &end) in cuts.iter().enumerate() {
            visitor.visit_record(&msodrawing(&buf[start..end]));
            for rec in self.attached.get(i).into_iter().flatten() {
                visitor.visit_record(rec);
            }
            start = end;
        }
        if start < buf.len() {
            visitor.visit_record(&msodrawing(&buf[start..]));
        }
        for note in &self.notes {
            visitor.visit_record(&Record::Note(note.clone()));
        }
    }
}

fn msodrawing(data: &[u8]) -> Record {
    Record::Raw(RawRecord {
        sid: MSODRAWING,
        data: data.to_vec(),
        continue_offsets: Vec::new(),
    })
}
