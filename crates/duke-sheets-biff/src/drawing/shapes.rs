//! Shape translators: a shape description plus its shape id become an
//! SpContainer, an OBJ record and, for text shapes, a TXO record.

use crate::biff::strings::XlString;
use crate::error::{XlsError, XlsResult};
use crate::escher::{
    properties::{pid, SHAPE_PATH_COMPLEX},
    record_type, shape_type, ClientAnchorRecord, EscherProperty, EscherRecord, OptRecord,
    ShapeFlags, SpRecord,
};
use crate::record::obj::{
    FT_CF, FT_LBS_DATA, FT_NTS, FT_PIO_GRBIT, FT_SBS, OT_COMBO_BOX, OT_COMMENT, OT_LINE,
    OT_MICROSOFT_OFFICE_DRAWING, OT_OVAL, OT_PICTURE, OT_RECTANGLE, OT_TEXT, TXO_HALIGN_LEFT,
    TXO_VALIGN_TOP,
};
use crate::record::{CommonObjectData, NoteRecord, ObjRecord, SubRecord, TxoRecord};

use super::SHAPES_PER_CLUSTER;

/// Locked, printable, autofill, autoline.
const CMO_DEFAULT_OPTIONS: u16 = 0x6011;
const CMO_COMBO_BOX_OPTIONS: u16 = 0x2011;

const NOTE_VISIBLE: u16 = 0x0002;
const NOTE_HIDDEN: u16 = 0x0000;

pub const LINE_COLOR_DEFAULT: u32 = 0x0800_0040;
pub const FILL_COLOR_DEFAULT: u32 = 0x0800_0009;
/// One point, in EMUs.
pub const LINE_WIDTH_DEFAULT: u32 = 9525;

/// Cell-relative placement of a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShapeAnchor {
    /// 0 move and size with cells, 2 move only, 3 neither.
    pub anchor_type: u16,
    pub col1: u16,
    pub dx1: u16,
    pub row1: u16,
    pub dy1: u16,
    pub col2: u16,
    pub dx2: u16,
    pub row2: u16,
    pub dy2: u16,
}

impl ShapeAnchor {
    pub fn cells(col1: u16, row1: u16, col2: u16, row2: u16) -> Self {
        ShapeAnchor {
            col1,
            row1,
            col2,
            row2,
            ..Default::default()
        }
    }

    fn to_record(self) -> ClientAnchorRecord {
        ClientAnchorRecord {
            options: 0,
            flag: self.anchor_type,
            col1: self.col1,
            dx1: self.dx1,
            row1: self.row1,
            dy1: self.dy1,
            col2: self.col2,
            dx2: self.dx2,
            row2: self.row2,
            dy2: self.dy2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineStyle {
    #[default]
    Solid,
    DashSys,
    DotSys,
    DashDotSys,
    DashDotDotSys,
    DotGel,
    DashGel,
    LongDashGel,
    DashDotGel,
    LongDashDotGel,
    LongDashDotDotGel,
    None,
}

impl LineStyle {
    fn value(self) -> u32 {
        match self {
            LineStyle::Solid => 0,
            LineStyle::DashSys => 1,
            LineStyle::DotSys => 2,
            LineStyle::DashDotSys => 3,
            LineStyle::DashDotDotSys => 4,
            LineStyle::DotGel => 5,
            LineStyle::DashGel => 6,
            LineStyle::LongDashGel => 7,
            LineStyle::DashDotGel => 8,
            LineStyle::LongDashDotGel => 9,
            LineStyle::LongDashDotDotGel => 10,
            LineStyle::None => u32::MAX,
        }
    }
}

/// Line and fill settings shared by every shape kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeStyle {
    pub line_color: u32,
    pub line_width: u32,
    pub line_style: LineStyle,
    pub fill_color: u32,
    pub no_fill: bool,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
}

impl Default for ShapeStyle {
    fn default() -> Self {
        ShapeStyle {
            line_color: LINE_COLOR_DEFAULT,
            line_width: LINE_WIDTH_DEFAULT,
            line_style: LineStyle::Solid,
            fill_color: FILL_COLOR_DEFAULT,
            no_fill: false,
            flip_horizontal: false,
            flip_vertical: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimpleKind {
    Rectangle,
    Oval,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Line {
        anchor: ShapeAnchor,
        style: ShapeStyle,
    },
    SimpleFilled {
        anchor: ShapeAnchor,
        style: ShapeStyle,
        kind: SimpleKind,
    },
    Textbox {
        anchor: ShapeAnchor,
        style: ShapeStyle,
        text: String,
        /// Left, top, right, bottom, in EMUs.
        margins: [u32; 4],
    },
    Comment {
        anchor: ShapeAnchor,
        style: ShapeStyle,
        text: String,
        row: u16,
        col: u16,
        author: String,
        visible: bool,
    },
    Picture {
        anchor: ShapeAnchor,
        style: ShapeStyle,
        /// 1-based index into the workbook's BLIP store.
        picture_index: u32,
    },
    Polygon {
        anchor: ShapeAnchor,
        style: ShapeStyle,
        /// Size of the coordinate space the points live in.
        width: u32,
        height: u32,
        points: Vec<(i16, i16)>,
    },
    ComboBox {
        anchor: ShapeAnchor,
    },
}

impl Shape {
    pub fn anchor(&self) -> &ShapeAnchor {
        match self {
            Shape::Line { anchor, .. }
            | Shape::SimpleFilled { anchor, .. }
            | Shape::Textbox { anchor, .. }
            | Shape::Comment { anchor, .. }
            | Shape::Picture { anchor, .. }
            | Shape::Polygon { anchor, .. }
            | Shape::ComboBox { anchor } => anchor,
        }
    }

    /// Reject descriptions no translation exists for.
    pub fn validate(&self) -> XlsResult<()> {
        match self {
            Shape::Polygon { points, .. } if points.is_empty() => {
                Err(XlsError::invalid_argument("polygon needs at least one point"))
            }
            Shape::Polygon { points, .. } if points.len() * 2 + 4 > u16::MAX as usize => {
                Err(XlsError::invalid_argument(format!(
                    "polygon has too many points ({})",
                    points.len()
                )))
            }
            Shape::Picture { picture_index, .. } if *picture_index == 0 => {
                Err(XlsError::invalid_argument("picture indexes start at 1"))
            }
            Shape::Textbox { text, .. } | Shape::Comment { text, .. }
                if text.encode_utf16().count() > i16::MAX as usize =>
            {
                Err(XlsError::invalid_argument("shape text is too long"))
            }
            _ => Ok(()),
        }
    }
}

/// The record pair (plus text and note) for one shape.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedShape {
    pub sp_container: EscherRecord,
    pub obj: ObjRecord,
    pub txo: Option<TxoRecord>,
    pub note: Option<NoteRecord>,
}

/// Properties every shape carries, line and fill included.
fn add_standard_options(style: &ShapeStyle, opt: &mut OptRecord) {
    let no_fill_hit = if style.no_fill { 0x0011_0000 } else { 0x0001_0000 };
    let no_draw_dash = if style.line_style == LineStyle::None {
        0x0008_0000
    } else {
        0x0008_0008
    };
    for (id, value) in [
        (pid::SIZE_TEXT_TO_FIT_SHAPE, 0x0008_0000),
        (pid::FILL_NO_FILL_HIT_TEST, no_fill_hit),
        (pid::FILL_COLOR, style.fill_color),
        (pid::GROUP_SHAPE_PRINT, 0x0008_0000),
        (pid::LINE_COLOR, style.line_color),
        (pid::LINE_WIDTH, style.line_width),
        (pid::LINE_DASHING, style.line_style.value()),
        (pid::LINE_NO_DRAW_DASH, no_draw_dash),
    ] {
        opt.set(EscherProperty::simple(id, value));
    }
    if style.line_style != LineStyle::Solid {
        opt.set(EscherProperty::simple(pid::LINE_END_CAP_STYLE, 0));
    }
    opt.sort();
}

fn sp_container(
    spt: u16,
    shape_id: u32,
    style: Option<&ShapeStyle>,
    opt: OptRecord,
    anchor: &ShapeAnchor,
    textbox: bool,
) -> EscherRecord {
    let mut flags = ShapeFlags::HAVE_ANCHOR | ShapeFlags::HAVE_SPT;
    if let Some(s) = style {
        flags.set(ShapeFlags::FLIP_H, s.flip_horizontal);
        flags.set(ShapeFlags::FLIP_V, s.flip_vertical);
    }
    let mut children = vec![
        EscherRecord::Sp(SpRecord::new(spt, shape_id, flags)),
        EscherRecord::Opt(opt),
        EscherRecord::ClientAnchor(anchor.to_record()),
        EscherRecord::atom(record_type::CLIENT_DATA, 0, Vec::new()),
    ];
    if textbox {
        children.push(EscherRecord::atom(record_type::CLIENT_TEXTBOX, 0, Vec::new()));
    }
    EscherRecord::container(record_type::SP_CONTAINER, children)
}

fn object_id(shape_id: u32) -> u16 {
    shape_id.saturating_sub(SHAPES_PER_CLUSTER) as u16
}

fn obj_record(object_type: u16, shape_id: u32, options: u16) -> ObjRecord {
    ObjRecord::new(CommonObjectData::new(object_type, object_id(shape_id), options))
}

fn textbox_options(style: &ShapeStyle, margins: &[u32; 4]) -> OptRecord {
    let mut opt = OptRecord::new();
    let [left, top, right, bottom] = *margins;
    for (id, value) in [
        (pid::TEXT_ID, 0),
        (pid::WRAP_TEXT, 0),
        (pid::ANCHOR_TEXT, 0),
        (pid::GROUP_SHAPE_PRINT, 0x0008_0000),
        (pid::TEXT_LEFT, left),
        (pid::TEXT_RIGHT, right),
        (pid::TEXT_BOTTOM, bottom),
        (pid::TEXT_TOP, top),
    ] {
        opt.set(EscherProperty::simple(id, value));
    }
    add_standard_options(style, &mut opt);
    opt
}

fn polygon_vertices(points: &[(i16, i16)]) -> EscherProperty {
    let mut elements = Vec::with_capacity((points.len() + 1) * 4);
    // The first point is repeated to close the path.
    for &(x, y) in points.iter().chain(points.first()) {
        elements.extend_from_slice(&x.to_le_bytes());
        elements.extend_from_slice(&y.to_le_bytes());
    }
    EscherProperty::array(pid::VERTICES, points.len() as u16 + 1, 0xFFF0, &elements)
}

fn polygon_segments(n: usize) -> EscherProperty {
    let count = n * 2 + 4;
    let mut elements = Vec::with_capacity(count * 2);
    elements.extend_from_slice(&[0x00, 0x40, 0x00, 0xAC]);
    for _ in 0..n {
        elements.extend_from_slice(&[0x01, 0x00, 0x00, 0xAC]);
    }
    elements.extend_from_slice(&[0x01, 0x60, 0x00, 0x80]);
    EscherProperty::array(pid::SEGMENT_INFO, count as u16, 2, &elements)
}

fn lbs_data() -> SubRecord {
    let mut data = Vec::with_capacity(20);
    // cbFmla, cLines, iSel
    data.extend_from_slice(&[0, 0, 0, 0, 0, 0]);
    // flags, idEdit
    data.extend_from_slice(&[0x01, 0x03, 0, 0]);
    // drop data: wStyle, cLine, dxMin, empty string, padding
    data.extend_from_slice(&[0x02, 0, 0x08, 0, 0, 0, 0, 0, 0, 0]);
    SubRecord::Other {
        sid: FT_LBS_DATA,
        declared_len: 0x1FEE,
        data,
    }
}

/// Build the records for `shape` with the already allocated `shape_id`.
pub fn translate(shape: &Shape, shape_id: u32) -> XlsResult<TranslatedShape> {
    shape.validate()?;
    let translated = match shape {
        Shape::Line { anchor, style } => {
            let mut opt = OptRecord::new();
            opt.set(EscherProperty::simple(pid::SHAPE_PATH, SHAPE_PATH_COMPLEX));
            opt.set(EscherProperty::simple(pid::GEOMETRY_FILL_OK, 0x0001_0000));
            opt.set(EscherProperty::simple(pid::FILL_NO_FILL_HIT_TEST, 0x0010_0000));
            add_standard_options(style, &mut opt);
            TranslatedShape {
                sp_container: sp_container(
                    shape_type::LINE,
                    shape_id,
                    Some(style),
                    opt,
                    anchor,
                    false,
                ),
                obj: obj_record(OT_LINE, shape_id, CMO_DEFAULT_OPTIONS),
                txo: None,
                note: None,
            }
        }
        Shape::SimpleFilled {
            anchor,
            style,
            kind,
        } => {
            let (spt, ot) = match kind {
                SimpleKind::Rectangle => (shape_type::RECTANGLE, OT_RECTANGLE),
                SimpleKind::Oval => (shape_type::ELLIPSE, OT_OVAL),
            };
            let mut opt = OptRecord::new();
            add_standard_options(style, &mut opt);
            TranslatedShape {
                sp_container: sp_container(spt, shape_id, Some(style), opt, anchor, false),
                obj: obj_record(ot, shape_id, CMO_DEFAULT_OPTIONS),
                txo: None,
                note: None,
            }
        }
        Shape::Textbox {
            anchor,
            style,
            text,
            margins,
        } => TranslatedShape {
            sp_container: sp_container(
                shape_type::TEXT_BOX,
                shape_id,
                Some(style),
                textbox_options(style, margins),
                anchor,
                true,
            ),
            obj: obj_record(OT_TEXT, shape_id, CMO_DEFAULT_OPTIONS),
            txo: Some(TxoRecord::new(text, TXO_HALIGN_LEFT | TXO_VALIGN_TOP)),
            note: None,
        },
        Shape::Comment {
            anchor,
            style,
            text,
            row,
            col,
            author,
            visible,
        } => {
            let mut opt = textbox_options(style, &[0; 4]);
            for id in [
                pid::TEXT_LEFT,
                pid::TEXT_RIGHT,
                pid::TEXT_TOP,
                pid::TEXT_BOTTOM,
                pid::GROUP_SHAPE_PRINT,
                pid::FILL_BACK_COLOR,
                pid::LINE_COLOR,
            ] {
                opt.remove(id);
            }
            let print = if *visible { 0x000A_0000 } else { 0x000A_0002 };
            opt.set(EscherProperty::simple(pid::GROUP_SHAPE_PRINT, print));
            opt.set(EscherProperty::simple(pid::SHADOW_OBSCURED, 0x0003_0003));
            opt.set(EscherProperty::simple(pid::SHADOW_COLOR, 0));
            opt.sort();

            let mut obj = obj_record(OT_COMMENT, shape_id, CMO_DEFAULT_OPTIONS);
            let cmo_at = obj
                .subrecords
                .iter()
                .position(|s| matches!(s, SubRecord::Common(_)))
                .unwrap_or(0);
            if let Some(cmo) = obj.common_mut() {
                cmo.set_autofill(false);
            }
            obj.subrecords
                .insert(cmo_at + 1, SubRecord::other(FT_NTS, vec![0; 22]));

            let note = NoteRecord {
                row: *row,
                col: *col,
                flags: if *visible { NOTE_VISIBLE } else { NOTE_HIDDEN },
                shape_id: object_id(shape_id),
                author: XlString::new(author),
                padding: Some(0),
            };
            TranslatedShape {
                sp_container: sp_container(
                    shape_type::TEXT_BOX,
                    shape_id,
                    Some(style),
                    opt,
                    anchor,
                    true,
                ),
                obj,
                txo: Some(TxoRecord::new(text, TXO_HALIGN_LEFT | TXO_VALIGN_TOP)),
                note: Some(note),
            }
        }
        Shape::Picture {
            anchor,
            style,
            picture_index,
        } => {
            let mut opt = OptRecord::new();
            opt.set(EscherProperty::simple(pid::LOCK_AGAINST_GROUPING, 0x0080_0080));
            opt.set(EscherProperty::blip(pid::BLIP_TO_DISPLAY, *picture_index));
            add_standard_options(style, &mut opt);
            let mut obj = obj_record(OT_PICTURE, shape_id, CMO_DEFAULT_OPTIONS);
            obj.add_subrecord(SubRecord::other(FT_CF, vec![0xFF, 0xFF]));
            obj.add_subrecord(SubRecord::other(FT_PIO_GRBIT, vec![0x01, 0x00]));
            TranslatedShape {
                sp_container: sp_container(
                    shape_type::PICTURE_FRAME,
                    shape_id,
                    Some(style),
                    opt,
                    anchor,
                    false,
                ),
                obj,
                txo: None,
                note: None,
            }
        }
        Shape::Polygon {
            anchor,
            style,
            width,
            height,
            points,
        } => {
            let mut opt = OptRecord::new();
            opt.set(EscherProperty::simple(pid::GEOMETRY_RIGHT, *width));
            opt.set(EscherProperty::simple(pid::GEOMETRY_BOTTOM, *height));
            opt.set(EscherProperty::simple(pid::SHAPE_PATH, SHAPE_PATH_COMPLEX));
            opt.set(polygon_vertices(points));
            opt.set(polygon_segments(points.len()));
            opt.set(EscherProperty::simple(pid::GEOMETRY_FILL_OK, 0x0001_0001));
            opt.set(EscherProperty::simple(pid::LINE_START_ARROWHEAD, 0));
            opt.set(EscherProperty::simple(pid::LINE_END_ARROWHEAD, 0));
            opt.set(EscherProperty::simple(pid::LINE_END_CAP_STYLE, 0));
            add_standard_options(style, &mut opt);
            TranslatedShape {
                sp_container: sp_container(
                    shape_type::NOT_PRIMITIVE,
                    shape_id,
                    Some(style),
                    opt,
                    anchor,
                    false,
                ),
                obj: obj_record(OT_MICROSOFT_OFFICE_DRAWING, shape_id, CMO_DEFAULT_OPTIONS),
                txo: None,
                note: None,
            }
        }
        Shape::ComboBox { anchor } => {
            let mut opt = OptRecord::new();
            opt.set(EscherProperty::simple(pid::LOCK_AGAINST_GROUPING, 0x0104_0104));
            opt.set(EscherProperty::simple(pid::SIZE_TEXT_TO_FIT_SHAPE, 0x0008_0008));
            opt.set(EscherProperty::simple(pid::LINE_NO_DRAW_DASH, 0x0008_0000));
            opt.set(EscherProperty::simple(pid::GROUP_SHAPE_PRINT, 0x0002_0000));
            let mut obj = obj_record(OT_COMBO_BOX, shape_id, CMO_COMBO_BOX_OPTIONS);
            obj.add_subrecord(SubRecord::other(FT_SBS, vec![0; 20]));
            obj.add_subrecord(lbs_data());
            let combo_anchor = ShapeAnchor {
                anchor_type: 1,
                ..*anchor
            };
            TranslatedShape {
                sp_container: sp_container(
                    shape_type::HOST_CONTROL,
                    shape_id,
                    None,
                    opt,
                    &combo_anchor,
                    false,
                ),
                obj,
                txo: None,
                note: None,
            }
        }
    };
    Ok(translated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::obj::FT_CMO;

    fn opt_of(t: &TranslatedShape) -> &OptRecord {
        t.sp_container
            .child(record_type::OPT)
            .and_then(EscherRecord::as_opt)
            .unwrap()
    }

    fn sub_sids(obj: &ObjRecord) -> Vec<u16> {
        obj.subrecords.iter().map(SubRecord::sid).collect()
    }

    #[test]
    fn test_rectangle() {
        let shape = Shape::SimpleFilled {
            anchor: ShapeAnchor::cells(1, 1, 3, 4),
            style: ShapeStyle::default(),
            kind: SimpleKind::Rectangle,
        };
        let t = translate(&shape, 1026).unwrap();
        let sp = t.sp_container.child(record_type::SP).and_then(EscherRecord::as_sp).unwrap();
        assert_eq!(sp.shape_id, 1026);
        assert_eq!(sp.shape_type(), shape_type::RECTANGLE);
        assert_eq!(sp.flags.bits(), 0x0A00);
        let cmo = t.obj.common().unwrap();
        assert_eq!((cmo.object_type, cmo.object_id, cmo.options), (OT_RECTANGLE, 2, 0x6011));
        let ids: Vec<u16> = opt_of(&t).properties.iter().map(|p| p.property_number()).collect();
        assert_eq!(ids, vec![0xBF, 0x181, 0x1BF, 0x1C0, 0x1CB, 0x1CE, 0x1FF, 0x3BF]);
        assert!(t.txo.is_none() && t.note.is_none());
    }

    #[test]
    fn test_comment() {
        let shape = Shape::Comment {
            anchor: ShapeAnchor::cells(2, 0, 4, 3),
            style: ShapeStyle::default(),
            text: "note".into(),
            row: 0,
            col: 1,
            author: "me".into(),
            visible: false,
        };
        let t = translate(&shape, 1025).unwrap();
        assert_eq!(sub_sids(&t.obj), vec![FT_CMO, FT_NTS, 0]);
        assert!(!t.obj.common().unwrap().is_autofill());
        let opt = opt_of(&t);
        for gone in [pid::TEXT_LEFT, pid::TEXT_TOP, pid::LINE_COLOR] {
            assert!(opt.get(gone).is_none());
        }
        assert_eq!(opt.get(pid::GROUP_SHAPE_PRINT).map(|p| p.value), Some(0x000A_0002));
        assert_eq!(opt.get(pid::SHADOW_OBSCURED).map(|p| p.value), Some(0x0003_0003));
        let note = t.note.unwrap();
        assert_eq!((note.row, note.col, note.flags, note.shape_id), (0, 1, 0, 1));
        assert!(t
            .sp_container
            .child(record_type::CLIENT_TEXTBOX)
            .is_some());
    }

    #[test]
    fn test_polygon_blobs() {
        let shape = Shape::Polygon {
            anchor: ShapeAnchor::default(),
            style: ShapeStyle::default(),
            width: 100,
            height: 100,
            points: vec![(0, 0), (10, 0), (10, 10)],
        };
        let t = translate(&shape, 1025).unwrap();
        let opt = opt_of(&t);
        let vertices = opt.get(pid::VERTICES).unwrap();
        assert!(vertices.is_complex());
        let data = vertices.complex.as_deref().unwrap();
        assert_eq!(&data[..6], &[4, 0, 4, 0, 0xF0, 0xFF]);
        // Closing point repeats the first.
        assert_eq!(&data[data.len() - 4..], &[0, 0, 0, 0]);

        let segments = opt.get(pid::SEGMENT_INFO).unwrap().complex.as_deref().unwrap();
        assert_eq!(&segments[..6], &[10, 0, 10, 0, 2, 0]);
        assert_eq!(&segments[6..10], &[0x00, 0x40, 0x00, 0xAC]);
        assert_eq!(&segments[segments.len() - 4..], &[0x01, 0x60, 0x00, 0x80]);
        assert_eq!(segments.len(), 6 + 10 * 2);
    }

    #[test]
    fn test_picture_and_combo_box() {
        let pic = Shape::Picture {
            anchor: ShapeAnchor::default(),
            style: ShapeStyle::default(),
            picture_index: 3,
        };
        let t = translate(&pic, 1030).unwrap();
        assert_eq!(sub_sids(&t.obj), vec![FT_CMO, FT_CF, FT_PIO_GRBIT, 0]);
        let blip = opt_of(&t).get(pid::BLIP_TO_DISPLAY).unwrap();
        assert!(blip.is_blip_id());
        assert_eq!(blip.value, 3);

        let combo = translate(&Shape::ComboBox { anchor: ShapeAnchor::default() }, 1031).unwrap();
        assert_eq!(sub_sids(&combo.obj), vec![FT_CMO, FT_SBS, FT_LBS_DATA, 0]);
        assert_eq!(combo.obj.common().unwrap().options, 0x2011);
        let sp = combo.sp_container.child(record_type::SP).and_then(EscherRecord::as_sp).unwrap();
        assert_eq!(sp.shape_type(), shape_type::HOST_CONTROL);
    }

    #[test]
    fn test_invalid_shapes() {
        let empty = Shape::Polygon {
            anchor: ShapeAnchor::default(),
            style: ShapeStyle::default(),
            width: 1,
            height: 1,
            points: Vec::new(),
        };
        assert!(matches!(translate(&empty, 1025), Err(XlsError::InvalidArgument(_))));
        let pic = Shape::Picture {
            anchor: ShapeAnchor::default(),
            style: ShapeStyle::default(),
            picture_index: 0,
        };
        assert!(pic.validate().is_err());
    }
}
