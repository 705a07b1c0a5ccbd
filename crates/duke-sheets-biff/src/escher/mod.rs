//! Escher (Office Drawing) record tree.
//!
//! Worksheets carry their drawing layer as a single escher tree spread over
//! MSODRAWING records; the workbook globals carry the drawing group in
//! MSODRAWINGGROUP. Every escher record has an 8-byte header:
//!
//! - `ver_inst: u16` low 4 bits version, high 12 bits instance
//! - `record_type: u16`
//! - `length: u32` body length (for containers, the children's total size)
//!
//! The tree here is owned and mutable; the records the model edits (Dgg, Dg,
//! Sp, Opt, ClientAnchor) are typed, everything else stays an opaque atom.

pub mod properties;

use bitflags::bitflags;

use crate::biff::parser::{read_bytes, read_u16, read_u32};
use crate::biff::writer::{put_u16, put_u32};
use crate::error::{XlsError, XlsResult};

pub use properties::{EscherProperty, OptRecord};

pub const HEADER_SIZE: usize = 8;

/// Escher record types.
pub mod record_type {
    pub const DGG_CONTAINER: u16 = 0xF000;
    pub const BSTORE_CONTAINER: u16 = 0xF001;
    pub const DG_CONTAINER: u16 = 0xF002;
    pub const SPGR_CONTAINER: u16 = 0xF003;
    pub const SP_CONTAINER: u16 = 0xF004;
    pub const DGG: u16 = 0xF006;
    pub const BSE: u16 = 0xF007;
    pub const DG: u16 = 0xF008;
    pub const SPGR: u16 = 0xF009;
    pub const SP: u16 = 0xF00A;
    pub const OPT: u16 = 0xF00B;
    pub const CLIENT_TEXTBOX: u16 = 0xF00D;
    pub const CHILD_ANCHOR: u16 = 0xF00F;
    pub const CLIENT_ANCHOR: u16 = 0xF010;
    pub const CLIENT_DATA: u16 = 0xF011;
    pub const SPLIT_MENU_COLORS: u16 = 0xF11E;
}

/// Shape types written into the Sp record instance.
pub mod shape_type {
    pub const NOT_PRIMITIVE: u16 = 0;
    pub const RECTANGLE: u16 = 1;
    pub const ELLIPSE: u16 = 3;
    pub const LINE: u16 = 20;
    pub const PICTURE_FRAME: u16 = 75;
    pub const HOST_CONTROL: u16 = 201;
    pub const TEXT_BOX: u16 = 202;
}

bitflags! {
    /// Sp record flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShapeFlags: u32 {
        const GROUP = 0x0001;
        const CHILD = 0x0002;
        const PATRIARCH = 0x0004;
        const DELETED = 0x0008;
        const OLE_SHAPE = 0x0010;
        const HAVE_MASTER = 0x0020;
        const FLIP_H = 0x0040;
        const FLIP_V = 0x0080;
        const CONNECTOR = 0x0100;
        const HAVE_ANCHOR = 0x0200;
        const BACKGROUND = 0x0400;
        const HAVE_SPT = 0x0800;
    }
}

#[inline]
fn ver_inst(version: u16, instance: u16) -> u16 {
    (version & 0x000F) | (instance << 4)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileIdCluster {
    pub drawing_group_id: u32,
    /// Shape ids already used from this cluster.
    pub num_shapes_used: u32,
}

/// Drawing group record: global shape id bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DggRecord {
    pub options: u16,
    pub shape_id_max: u32,
    pub num_shapes_saved: u32,
    pub drawings_saved: u32,
    pub clusters: Vec<FileIdCluster>,
}

impl Default for DggRecord {
    fn default() -> Self {
        DggRecord {
            options: 0x0000,
            shape_id_max: 1024,
            num_shapes_saved: 0,
            drawings_saved: 0,
            clusters: Vec::new(),
        }
    }
}

impl DggRecord {
    fn read(options: u16, data: &[u8]) -> XlsResult<Self> {
        let mut o = 0;
        let shape_id_max = read_u32(data, &mut o)?;
        // Stored as cluster count + 1.
        let declared = read_u32(data, &mut o)?;
        let num_shapes_saved = read_u32(data, &mut o)?;
        let drawings_saved = read_u32(data, &mut o)?;
        let n = (data.len() - o) / 8;
        if declared as usize != n + 1 {
            log::debug!("Dgg declares {} clusters, body holds {n}", declared.saturating_sub(1));
        }
        let mut clusters = Vec::with_capacity(n);
        for _ in 0..n {
            clusters.push(FileIdCluster {
                drawing_group_id: read_u32(data, &mut o)?,
                num_shapes_used: read_u32(data, &mut o)?,
            });
        }
        if o != data.len() {
            return Err(XlsError::Parse("trailing bytes in Dgg record".into()));
        }
        Ok(DggRecord {
            options,
            shape_id_max,
            num_shapes_saved,
            drawings_saved,
            clusters,
        })
    }

    fn write_data(&self, out: &mut Vec<u8>) {
        put_u32(out, self.shape_id_max);
        put_u32(out, self.clusters.len() as u32 + 1);
        put_u32(out, self.num_shapes_saved);
        put_u32(out, self.drawings_saved);
        for c in &self.clusters {
            put_u32(out, c.drawing_group_id);
            put_u32(out, c.num_shapes_used);
        }
    }

    /// Register a cluster for `dg_id`.
    pub fn add_cluster(&mut self, dg_id: u32, num_shapes_used: u32) {
        self.clusters.push(FileIdCluster {
            drawing_group_id: dg_id,
            num_shapes_used,
        });
    }
}

/// Per-drawing record. The instance holds the drawing id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DgRecord {
    pub options: u16,
    pub num_shapes: u32,
    pub last_shape_id: u32,
}

impl DgRecord {
    pub fn new(drawing_id: u16) -> Self {
        DgRecord {
            options: ver_inst(0, drawing_id),
            num_shapes: 0,
            last_shape_id: u32::MAX,
        }
    }

    pub fn drawing_id(&self) -> u16 {
        self.options >> 4
    }

    fn read(options: u16, data: &[u8]) -> XlsResult<Self> {
        let mut o = 0;
        let num_shapes = read_u32(data, &mut o)?;
        let last_shape_id = read_u32(data, &mut o)?;
        if o != data.len() {
            return Err(XlsError::Parse("trailing bytes in Dg record".into()));
        }
        Ok(DgRecord {
            options,
            num_shapes,
            last_shape_id,
        })
    }
}

/// Shape record. The instance holds the shape type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpRecord {
    pub options: u16,
    pub shape_id: u32,
    pub flags: ShapeFlags,
}

impl SpRecord {
    pub fn new(shape_type: u16, shape_id: u32, flags: ShapeFlags) -> Self {
        SpRecord {
            options: ver_inst(2, shape_type),
            shape_id,
            flags,
        }
    }

    pub fn shape_type(&self) -> u16 {
        self.options >> 4
    }

    fn read(options: u16, data: &[u8]) -> XlsResult<Self> {
        let mut o = 0;
        let shape_id = read_u32(data, &mut o)?;
        let flags = ShapeFlags::from_bits_retain(read_u32(data, &mut o)?);
        if o != data.len() {
            return Err(XlsError::Parse("trailing bytes in Sp record".into()));
        }
        Ok(SpRecord {
            options,
            shape_id,
            flags,
        })
    }
}

/// Cell-relative anchor of a top-level shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClientAnchorRecord {
    pub options: u16,
    pub flag: u16,
    pub col1: u16,
    pub dx1: u16,
    pub row1: u16,
    pub dy1: u16,
    pub col2: u16,
    pub dx2: u16,
    pub row2: u16,
    pub dy2: u16,
}

impl ClientAnchorRecord {
    fn read(options: u16, data: &[u8]) -> XlsResult<Self> {
        if data.len() != 18 {
            return Err(XlsError::Parse(format!(
                "ClientAnchor is {} bytes, expected 18",
                data.len()
            )));
        }
        let mut o = 0;
        Ok(ClientAnchorRecord {
            options,
            flag: read_u16(data, &mut o)?,
            col1: read_u16(data, &mut o)?,
            dx1: read_u16(data, &mut o)?,
            row1: read_u16(data, &mut o)?,
            dy1: read_u16(data, &mut o)?,
            col2: read_u16(data, &mut o)?,
            dx2: read_u16(data, &mut o)?,
            row2: read_u16(data, &mut o)?,
            dy2: read_u16(data, &mut o)?,
        })
    }

    fn write_data(&self, out: &mut Vec<u8>) {
        for v in [
            self.flag, self.col1, self.dx1, self.row1, self.dy1, self.col2, self.dx2, self.row2,
            self.dy2,
        ] {
            put_u16(out, v);
        }
    }
}

/// Offset of the reference count inside a BSE body.
const BSE_REF_COUNT_OFFSET: usize = 24;

#[derive(Debug, Clone, PartialEq)]
pub enum EscherRecord {
    Container {
        options: u16,
        record_id: u16,
        children: Vec<EscherRecord>,
    },
    Dgg(DggRecord),
    Dg(DgRecord),
    Sp(SpRecord),
    Opt(OptRecord),
    ClientAnchor(ClientAnchorRecord),
    Atom {
        options: u16,
        record_id: u16,
        data: Vec<u8>,
    },
}

impl EscherRecord {
    pub fn container(record_id: u16, children: Vec<EscherRecord>) -> Self {
        EscherRecord::Container {
            options: 0x000F,
            record_id,
            children,
        }
    }

    pub fn atom(record_id: u16, options: u16, data: Vec<u8>) -> Self {
        EscherRecord::Atom {
            options,
            record_id,
            data,
        }
    }

    /// Parse one record at `offset`, advancing it.
    pub fn parse(data: &[u8], offset: &mut usize) -> XlsResult<Self> {
        let options = read_u16(data, offset)?;
        let record_id = read_u16(data, offset)?;
        let len = read_u32(data, offset)? as usize;
        if (options & 0x000F) == 0x000F {
            let end = offset
                .checked_add(len)
                .filter(|&e| e <= data.len())
                .ok_or_else(|| {
                    XlsError::Parse(format!(
                        "escher container 0x{record_id:04X} overruns its data"
                    ))
                })?;
            let children = parse_records(&data[*offset..end])?;
            *offset = end;
            return Ok(EscherRecord::Container {
                options,
                record_id,
                children,
            });
        }
        let body = read_bytes(data, offset, len)?;
        let typed = match record_id {
            record_type::DGG => DggRecord::read(options, &body).map(EscherRecord::Dgg),
            record_type::DG => DgRecord::read(options, &body).map(EscherRecord::Dg),
            record_type::SP => SpRecord::read(options, &body).map(EscherRecord::Sp),
            record_type::OPT => OptRecord::read(options, &body).map(EscherRecord::Opt),
            record_type::CLIENT_ANCHOR => {
                ClientAnchorRecord::read(options, &body).map(EscherRecord::ClientAnchor)
            }
            _ => return Ok(EscherRecord::atom(record_id, options, body)),
        };
        Ok(typed.unwrap_or_else(|e| {
            log::debug!("keeping escher record 0x{record_id:04X} opaque: {e}");
            EscherRecord::atom(record_id, options, body)
        }))
    }

    pub fn record_id(&self) -> u16 {
        match self {
            EscherRecord::Container { record_id, .. } | EscherRecord::Atom { record_id, .. } => {
                *record_id
            }
            EscherRecord::Dgg(_) => record_type::DGG,
            EscherRecord::Dg(_) => record_type::DG,
            EscherRecord::Sp(_) => record_type::SP,
            EscherRecord::Opt(_) => record_type::OPT,
            EscherRecord::ClientAnchor(_) => record_type::CLIENT_ANCHOR,
        }
    }

    pub fn options(&self) -> u16 {
        match self {
            EscherRecord::Container { options, .. } | EscherRecord::Atom { options, .. } => {
                *options
            }
            EscherRecord::Dgg(r) => r.options,
            EscherRecord::Dg(r) => r.options,
            EscherRecord::Sp(r) => r.options,
            EscherRecord::Opt(r) => r.options(),
            EscherRecord::ClientAnchor(r) => r.options,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, EscherRecord::Container { .. })
    }

    pub fn children(&self) -> &[EscherRecord] {
        match self {
            EscherRecord::Container { children, .. } => children,
            _ => &[],
        }
    }

    /// Children of a container; `None` for atoms.
    pub fn children_mut(&mut self) -> Option<&mut Vec<EscherRecord>> {
        match self {
            EscherRecord::Container { children, .. } => Some(children),
            _ => None,
        }
    }

    pub fn child(&self, record_id: u16) -> Option<&EscherRecord> {
        self.children().iter().find(|c| c.record_id() == record_id)
    }

    pub fn child_mut(&mut self, record_id: u16) -> Option<&mut EscherRecord> {
        self.children_mut()?
            .iter_mut()
            .find(|c| c.record_id() == record_id)
    }

    /// Depth-first search including `self`.
    pub fn find(&self, record_id: u16) -> Option<&EscherRecord> {
        if self.record_id() == record_id {
            return Some(self);
        }
        self.children().iter().find_map(|c| c.find(record_id))
    }

    pub fn find_mut(&mut self, record_id: u16) -> Option<&mut EscherRecord> {
        if self.record_id() == record_id {
            return Some(self);
        }
        match self {
            EscherRecord::Container { children, .. } => {
                children.iter_mut().find_map(|c| c.find_mut(record_id))
            }
            _ => None,
        }
    }

    /// Visit every record depth-first, parents before children.
    pub fn walk<F: FnMut(&EscherRecord)>(&self, f: &mut F) {
        f(self);
        for c in self.children() {
            c.walk(f);
        }
    }

    pub fn walk_mut<F: FnMut(&mut EscherRecord)>(&mut self, f: &mut F) {
        f(self);
        if let EscherRecord::Container { children, .. } = self {
            for c in children {
                c.walk_mut(f);
            }
        }
    }

    pub fn as_sp(&self) -> Option<&SpRecord> {
        match self {
            EscherRecord::Sp(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_sp_mut(&mut self) -> Option<&mut SpRecord> {
        match self {
            EscherRecord::Sp(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_dg(&self) -> Option<&DgRecord> {
        match self {
            EscherRecord::Dg(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_dg_mut(&mut self) -> Option<&mut DgRecord> {
        match self {
            EscherRecord::Dg(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_dgg_mut(&mut self) -> Option<&mut DggRecord> {
        match self {
            EscherRecord::Dgg(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_dgg(&self) -> Option<&DggRecord> {
        match self {
            EscherRecord::Dgg(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_opt(&self) -> Option<&OptRecord> {
        match self {
            EscherRecord::Opt(r) => Some(r),
            _ => None,
        }
    }

    fn data_len(&self) -> usize {
        match self {
            EscherRecord::Container { children, .. } => children.iter().map(Self::size).sum(),
            EscherRecord::Atom { data, .. } => data.len(),
            EscherRecord::Dgg(r) => 16 + 8 * r.clusters.len(),
            EscherRecord::Dg(_) | EscherRecord::Sp(_) => 8,
            EscherRecord::Opt(r) => r.data_len(),
            EscherRecord::ClientAnchor(_) => 18,
        }
    }

    /// Serialized size including the header.
    pub fn size(&self) -> usize {
        HEADER_SIZE + self.data_len()
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        self.serialize_tracking(out, &mut |_, _| {});
    }

    /// Serialize, reporting each record's id and its end offset in `out`.
    pub fn serialize_tracking<F: FnMut(u16, usize)>(&self, out: &mut Vec<u8>, on_end: &mut F) {
        put_u16(out, self.options());
        put_u16(out, self.record_id());
        put_u32(out, self.data_len() as u32);
        match self {
            EscherRecord::Container { children, .. } => {
                for c in children {
                    c.serialize_tracking(out, on_end);
                }
            }
            EscherRecord::Atom { data, .. } => out.extend_from_slice(data),
            EscherRecord::Dgg(r) => r.write_data(out),
            EscherRecord::Dg(r) => {
                put_u32(out, r.num_shapes);
                put_u32(out, r.last_shape_id);
            }
            EscherRecord::Sp(r) => {
                put_u32(out, r.shape_id);
                put_u32(out, r.flags.bits());
            }
            EscherRecord::Opt(r) => r.write_data(out),
            EscherRecord::ClientAnchor(r) => r.write_data(out),
        }
        on_end(self.record_id(), out.len());
    }
}

/// Parse consecutive records filling `data`.
pub fn parse_records(data: &[u8]) -> XlsResult<Vec<EscherRecord>> {
    let mut out = Vec::new();
    let mut off = 0;
    while off + HEADER_SIZE <= data.len() {
        out.push(EscherRecord::parse(data, &mut off)?);
    }
    if off != data.len() {
        log::debug!("ignoring {} stray bytes after escher records", data.len() - off);
    }
    Ok(out)
}

pub fn serialize_records(records: &[EscherRecord]) -> Vec<u8> {
    let mut out = Vec::new();
    for r in records {
        r.serialize(&mut out);
    }
    out
}

/// Reference count of a BSE atom's BLIP.
pub fn bse_ref_count(bse: &EscherRecord) -> Option<u32> {
    match bse {
        EscherRecord::Atom {
            record_id: record_type::BSE,
            data,
            ..
        } => {
            let mut o = BSE_REF_COUNT_OFFSET;
            read_u32(data, &mut o).ok()
        }
        _ => None,
    }
}

/// Increment a BSE atom's reference count. Returns false if `bse` is not a
/// well-formed BSE.
pub fn bump_bse_ref_count(bse: &mut EscherRecord) -> bool {
    let Some(count) = bse_ref_count(bse) else {
        return false;
    };
    if let EscherRecord::Atom { data, .. } = bse {
        let bytes = count.wrapping_add(1).to_le_bytes();
        data[BSE_REF_COUNT_OFFSET..BSE_REF_COUNT_OFFSET + 4].copy_from_slice(&bytes);
        return true;
    }
    false
}
