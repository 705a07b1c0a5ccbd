//! Workbook-globals records: BOF, sheet directory, fonts, formats, XFs,
//! styles, palette, window and external-reference records.

use crate::biff::parser::{read_i16, read_remaining, read_u16, read_u32, read_u8};
use crate::biff::records::{BIFF8_VERSION, BOF_WORKSHEET};
use crate::biff::strings::{
    read_character_data, read_short_string, read_unicode_string, write_character_data,
    write_short_string, write_unicode_string, XlString,
};
use crate::biff::writer::{put_i16, put_u16, put_u32, put_u8};
use crate::error::{XlsError, XlsResult};

// ── BOF ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BofRecord {
    pub version: u16,
    /// Substream type (`BOF_WORKBOOK_GLOBALS`, `BOF_WORKSHEET`, ...).
    pub kind: u16,
    pub build: u16,
    pub year: u16,
    pub history: u32,
    pub required_version: u32,
}

impl BofRecord {
    pub fn new(kind: u16) -> Self {
        BofRecord {
            version: BIFF8_VERSION,
            kind,
            build: 0x10D3,
            year: 0x07CC,
            history: 0x41,
            required_version: 0x06,
        }
    }

    pub fn worksheet() -> Self {
        Self::new(BOF_WORKSHEET)
    }

    pub fn read(data: &[u8]) -> XlsResult<Self> {
        if data.len() != 16 {
            return Err(XlsError::Parse(format!("BOF length {} is not BIFF8", data.len())));
        }
        let mut o = 0;
        Ok(BofRecord {
            version: read_u16(data, &mut o)?,
            kind: read_u16(data, &mut o)?,
            build: read_u16(data, &mut o)?,
            year: read_u16(data, &mut o)?,
            history: read_u32(data, &mut o)?,
            required_version: read_u32(data, &mut o)?,
        })
    }

    pub fn write_body(&self, out: &mut Vec<u8>) {
        put_u16(out, self.version);
        put_u16(out, self.kind);
        put_u16(out, self.build);
        put_u16(out, self.year);
        put_u32(out, self.history);
        put_u32(out, self.required_version);
    }
}

// ── Sheet directory ─────────────────────────────────────────────────────

pub const SHEET_VISIBLE: u8 = 0;
pub const SHEET_HIDDEN: u8 = 1;
pub const SHEET_VERY_HIDDEN: u8 = 2;

/// BOUNDSHEET: name, visibility and stream offset of one sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundSheetRecord {
    /// Absolute stream offset of the sheet's BOF, patched on write.
    pub position: u32,
    pub visibility: u8,
    pub sheet_type: u8,
    pub name: XlString,
}

impl BoundSheetRecord {
    pub fn new(name: &str) -> Self {
        BoundSheetRecord {
            position: 0,
            visibility: SHEET_VISIBLE,
            sheet_type: 0,
            name: XlString::new(name),
        }
    }

    pub fn read(data: &[u8]) -> XlsResult<Self> {
        let mut o = 0;
        Ok(BoundSheetRecord {
            position: read_u32(data, &mut o)?,
            visibility: read_u8(data, &mut o)?,
            sheet_type: read_u8(data, &mut o)?,
            name: read_short_string(data, &mut o)?,
        })
    }

    pub fn write_body(&self, out: &mut Vec<u8>) {
        put_u32(out, self.position);
        put_u8(out, self.visibility);
        put_u8(out, self.sheet_type);
        write_short_string(out, &self.name);
    }
}

// ── Fonts / formats / XF / styles ───────────────────────────────────────

pub const FONT_ITALIC: u16 = 0x0002;
pub const FONT_STRIKEOUT: u16 = 0x0008;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontRecord {
    /// Height in twips.
    pub height: u16,
    pub options: u16,
    pub color: u16,
    pub weight: u16,
    pub escapement: u16,
    pub underline: u8,
    pub family: u8,
    pub charset: u8,
    pub reserved: u8,
    pub name: XlString,
}

impl Default for FontRecord {
    fn default() -> Self {
        FontRecord {
            height: 200,
            options: 0,
            color: 0x7FFF,
            weight: 400,
            escapement: 0,
            underline: 0,
            family: 0,
            charset: 0,
            reserved: 0,
            name: XlString::new("Arial"),
        }
    }
}

impl FontRecord {
    pub fn read(data: &[u8]) -> XlsResult<Self> {
        let mut o = 0;
        Ok(FontRecord {
            height: read_u16(data, &mut o)?,
            options: read_u16(data, &mut o)?,
            color: read_u16(data, &mut o)?,
            weight: read_u16(data, &mut o)?,
            escapement: read_u16(data, &mut o)?,
            underline: read_u8(data, &mut o)?,
            family: read_u8(data, &mut o)?,
            charset: read_u8(data, &mut o)?,
            reserved: read_u8(data, &mut o)?,
            name: read_short_string(data, &mut o)?,
        })
    }

    pub fn write_body(&self, out: &mut Vec<u8>) {
        put_u16(out, self.height);
        put_u16(out, self.options);
        put_u16(out, self.color);
        put_u16(out, self.weight);
        put_u16(out, self.escapement);
        put_u8(out, self.underline);
        put_u8(out, self.family);
        put_u8(out, self.charset);
        put_u8(out, self.reserved);
        write_short_string(out, &self.name);
    }

    /// Same visible attributes (ignores the reserved byte and name encoding).
    pub fn same_properties(&self, other: &FontRecord) -> bool {
        self.height == other.height
            && self.options == other.options
            && self.color == other.color
            && self.weight == other.weight
            && self.escapement == other.escapement
            && self.underline == other.underline
            && self.family == other.family
            && self.charset == other.charset
            && self.name.text == other.name.text
    }
}

/// FORMAT: number format string for index `index`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatRecord {
    pub index: u16,
    pub format: XlString,
}

impl FormatRecord {
    pub fn new(index: u16, format: &str) -> Self {
        FormatRecord {
            index,
            format: XlString::new(format),
        }
    }

    pub fn read(data: &[u8]) -> XlsResult<Self> {
        let mut o = 0;
        Ok(FormatRecord {
            index: read_u16(data, &mut o)?,
            format: read_unicode_string(data, &mut o)?,
        })
    }

    pub fn write_body(&self, out: &mut Vec<u8>) {
        put_u16(out, self.index);
        write_unicode_string(out, &self.format);
    }
}

/// `fStyle` in the XF type/protection field.
pub const XF_STYLE: u16 = 0x0004;

/// XF (extended format), kept as its packed option words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedFormatRecord {
    pub font_index: u16,
    pub format_index: u16,
    /// Locked/hidden/style flags and parent XF index (bits 4..15).
    pub cell_options: u16,
    pub alignment_options: u16,
    pub indention_options: u16,
    pub border_options: u16,
    pub palette_options: u16,
    pub adtl_palette_options: u32,
    pub fill_palette_options: u16,
}

impl ExtendedFormatRecord {
    /// Plain cell XF inheriting from the Normal style.
    pub fn cell() -> Self {
        ExtendedFormatRecord {
            font_index: 0,
            format_index: 0,
            cell_options: 0x0001,
            alignment_options: 0,
            indention_options: 0,
            border_options: 0,
            palette_options: 0,
            adtl_palette_options: 0,
            fill_palette_options: 0x20C0,
        }
    }

    fn style(font_index: u16, format_index: u16, indention_options: u16) -> Self {
        ExtendedFormatRecord {
            font_index,
            format_index,
            cell_options: 0xFFF5,
            alignment_options: 0x0020,
            indention_options,
            border_options: 0,
            palette_options: 0,
            adtl_palette_options: 0,
            fill_palette_options: 0x20C0,
        }
    }

    /// The 21 XF records every new workbook starts with.
    pub fn defaults() -> Vec<Self> {
        let mut out = Vec::with_capacity(21);
        out.push(Self::style(0, 0, 0));
        for font in [1, 1, 2, 2] {
            out.push(Self::style(font, 0, 0xF400));
        }
        for _ in 5..15 {
            out.push(Self::style(0, 0, 0xF400));
        }
        let mut normal = Self::cell();
        normal.alignment_options = 0x0020;
        out.push(normal);
        for fmt in [0x2B, 0x29, 0x2C, 0x2A, 0x09] {
            out.push(Self::style(1, fmt, 0xF800));
        }
        out
    }

    pub fn read(data: &[u8]) -> XlsResult<Self> {
        if data.len() != 20 {
            return Err(XlsError::Parse(format!("XF length {} is not BIFF8", data.len())));
        }
        let mut o = 0;
        Ok(ExtendedFormatRecord {
            font_index: read_u16(data, &mut o)?,
            format_index: read_u16(data, &mut o)?,
            cell_options: read_u16(data, &mut o)?,
            alignment_options: read_u16(data, &mut o)?,
            indention_options: read_u16(data, &mut o)?,
            border_options: read_u16(data, &mut o)?,
            palette_options: read_u16(data, &mut o)?,
            adtl_palette_options: read_u32(data, &mut o)?,
            fill_palette_options: read_u16(data, &mut o)?,
        })
    }

    pub fn write_body(&self, out: &mut Vec<u8>) {
        put_u16(out, self.font_index);
        put_u16(out, self.format_index);
        put_u16(out, self.cell_options);
        put_u16(out, self.alignment_options);
        put_u16(out, self.indention_options);
        put_u16(out, self.border_options);
        put_u16(out, self.palette_options);
        put_u32(out, self.adtl_palette_options);
        put_u16(out, self.fill_palette_options);
    }

    pub fn is_style_xf(&self) -> bool {
        self.cell_options & XF_STYLE != 0
    }

    pub fn parent_index(&self) -> u16 {
        self.cell_options >> 4
    }
}

const STYLE_BUILTIN: u16 = 0x8000;

/// STYLE: either a built-in style id or a user-defined name, for one style XF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleRecord {
    /// XF index in the low 12 bits, built-in flag in bit 15.
    pub xf: u16,
    pub builtin: Option<(u8, u8)>,
    pub name: Option<XlString>,
}

impl StyleRecord {
    pub fn builtin(xf_index: u16, style_id: u8, level: u8) -> Self {
        StyleRecord {
            xf: (xf_index & 0x0FFF) | STYLE_BUILTIN,
            builtin: Some((style_id, level)),
            name: None,
        }
    }

    pub fn user(xf_index: u16, name: &str) -> Self {
        StyleRecord {
            xf: xf_index & 0x0FFF,
            builtin: None,
            name: Some(XlString::new(name)),
        }
    }

    /// The six STYLE records of a new workbook.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::builtin(0x10, 3, 0xFF),
            Self::builtin(0x11, 6, 0xFF),
            Self::builtin(0x12, 4, 0xFF),
            Self::builtin(0x13, 7, 0xFF),
            Self::builtin(0x00, 0, 0xFF),
            Self::builtin(0x14, 5, 0xFF),
        ]
    }

    pub fn xf_index(&self) -> u16 {
        self.xf & 0x0FFF
    }

    pub fn read(data: &[u8]) -> XlsResult<Self> {
        let mut o = 0;
        let xf = read_u16(data, &mut o)?;
        if xf & STYLE_BUILTIN != 0 {
            let id = read_u8(data, &mut o)?;
            let level = read_u8(data, &mut o)?;
            Ok(StyleRecord {
                xf,
                builtin: Some((id, level)),
                name: None,
            })
        } else {
            Ok(StyleRecord {
                xf,
                builtin: None,
                name: Some(read_unicode_string(data, &mut o)?),
            })
        }
    }

    pub fn write_body(&self, out: &mut Vec<u8>) {
        put_u16(out, self.xf);
        if let Some((id, level)) = self.builtin {
            put_u8(out, id);
            put_u8(out, level);
        } else if let Some(name) = &self.name {
            write_unicode_string(out, name);
        }
    }
}

/// The eight FORMAT records of a new workbook.
pub fn default_formats() -> Vec<FormatRecord> {
    vec![
        FormatRecord::new(5, "\"$\"#,##0_);\\(\"$\"#,##0\\)"),
        FormatRecord::new(6, "\"$\"#,##0_);[Red]\\(\"$\"#,##0\\)"),
        FormatRecord::new(7, "\"$\"#,##0.00_);\\(\"$\"#,##0.00\\)"),
        FormatRecord::new(8, "\"$\"#,##0.00_);[Red]\\(\"$\"#,##0.00\\)"),
        FormatRecord::new(0x2A, "_(\"$\"* #,##0_);_(\"$\"* \\(#,##0\\);_(\"$\"* \"-\"_);_(@_)"),
        FormatRecord::new(0x29, "_(* #,##0_);_(* \\(#,##0\\);_(* \"-\"_);_(@_)"),
        FormatRecord::new(
            0x2C,
            "_(\"$\"* #,##0.00_);_(\"$\"* \\(#,##0.00\\);_(\"$\"* \"-\"??_);_(@_)",
        ),
        FormatRecord::new(0x2B, "_(* #,##0.00_);_(* \\(#,##0.00\\);_(* \"-\"??_);_(@_)"),
    ]
}

// ── Tab ids / palette / window ──────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TabIdRecord {
    pub ids: Vec<u16>,
}

impl TabIdRecord {
    pub fn read(data: &[u8]) -> XlsResult<Self> {
        let mut o = 0;
        let mut ids = Vec::with_capacity(data.len() / 2);
        while o + 2 <= data.len() {
            ids.push(read_u16(data, &mut o)?);
        }
        Ok(TabIdRecord { ids })
    }

    pub fn write_body(&self, out: &mut Vec<u8>) {
        for &id in &self.ids {
            put_u16(out, id);
        }
    }
}

/// First palette index that can be customised.
pub const PALETTE_FIRST_COLOR: u16 = 8;
/// Last palette index.
pub const PALETTE_LAST_COLOR: u16 = 63;

const DEFAULT_PALETTE: [u32; 56] = [
    0x000000, 0xFFFFFF, 0xFF0000, 0x00FF00, 0x0000FF, 0xFFFF00, 0xFF00FF, 0x00FFFF, //
    0x800000, 0x008000, 0x000080, 0x808000, 0x800080, 0x008080, 0xC0C0C0, 0x808080, //
    0x9999FF, 0x993366, 0xFFFFCC, 0xCCFFFF, 0x660066, 0xFF8080, 0x0066CC, 0xCCCCFF, //
    0x000080, 0xFF00FF, 0xFFFF00, 0x00FFFF, 0x800080, 0x800000, 0x008080, 0x0000FF, //
    0x00CCFF, 0xCCFFFF, 0xCCFFCC, 0xFFFF99, 0x99CCFF, 0xFF99CC, 0xCC99FF, 0xFFCC99, //
    0x3366FF, 0x33CCCC, 0x99CC00, 0xFFCC00, 0xFF9900, 0xFF6600, 0x666699, 0x969696, //
    0x003366, 0x339966, 0x003300, 0x333300, 0x993300, 0x993366, 0x333399, 0x333333, //
];

/// PALETTE: colours for indices 8..=63 as `[r, g, b, 0]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteRecord {
    pub colors: Vec<[u8; 4]>,
}

impl Default for PaletteRecord {
    fn default() -> Self {
        PaletteRecord {
            colors: DEFAULT_PALETTE
                .iter()
                .map(|&c| [(c >> 16) as u8, (c >> 8) as u8, c as u8, 0])
                .collect(),
        }
    }
}

impl PaletteRecord {
    pub fn read(data: &[u8]) -> XlsResult<Self> {
        let mut o = 0;
        let n = read_u16(data, &mut o)? as usize;
        let mut colors = Vec::with_capacity(n);
        for _ in 0..n {
            colors.push([
                read_u8(data, &mut o)?,
                read_u8(data, &mut o)?,
                read_u8(data, &mut o)?,
                read_u8(data, &mut o)?,
            ]);
        }
        Ok(PaletteRecord { colors })
    }

    pub fn write_body(&self, out: &mut Vec<u8>) {
        put_u16(out, self.colors.len() as u16);
        for c in &self.colors {
            out.extend_from_slice(c);
        }
    }

    pub fn color(&self, index: u16) -> Option<[u8; 3]> {
        let i = index.checked_sub(PALETTE_FIRST_COLOR)? as usize;
        self.colors.get(i).map(|c| [c[0], c[1], c[2]])
    }

    /// Caller validates the index range.
    pub fn set_color(&mut self, index: u16, r: u8, g: u8, b: u8) {
        let i = (index - PALETTE_FIRST_COLOR) as usize;
        if i >= self.colors.len() {
            self.colors.resize(i + 1, [0, 0, 0, 0]);
        }
        self.colors[i] = [r, g, b, 0];
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window1Record {
    pub h_pos: u16,
    pub v_pos: u16,
    pub width: u16,
    pub height: u16,
    pub options: u16,
    pub active_sheet: u16,
    pub first_visible_tab: u16,
    pub num_selected_tabs: u16,
    pub tab_width_ratio: u16,
}

impl Default for Window1Record {
    fn default() -> Self {
        Window1Record {
            h_pos: 0x168,
            v_pos: 0x10E,
            width: 0x3A5C,
            height: 0x23BE,
            options: 0x38,
            active_sheet: 0,
            first_visible_tab: 0,
            num_selected_tabs: 1,
            tab_width_ratio: 0x258,
        }
    }
}

impl Window1Record {
    pub fn read(data: &[u8]) -> XlsResult<Self> {
        let mut o = 0;
        Ok(Window1Record {
            h_pos: read_u16(data, &mut o)?,
            v_pos: read_u16(data, &mut o)?,
            width: read_u16(data, &mut o)?,
            height: read_u16(data, &mut o)?,
            options: read_u16(data, &mut o)?,
            active_sheet: read_u16(data, &mut o)?,
            first_visible_tab: read_u16(data, &mut o)?,
            num_selected_tabs: read_u16(data, &mut o)?,
            tab_width_ratio: read_u16(data, &mut o)?,
        })
    }

    pub fn write_body(&self, out: &mut Vec<u8>) {
        put_u16(out, self.h_pos);
        put_u16(out, self.v_pos);
        put_u16(out, self.width);
        put_u16(out, self.height);
        put_u16(out, self.options);
        put_u16(out, self.active_sheet);
        put_u16(out, self.first_visible_tab);
        put_u16(out, self.num_selected_tabs);
        put_u16(out, self.tab_width_ratio);
    }
}

/// FILESHARING: write-reservation password and the reserving user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSharingRecord {
    pub read_only: u16,
    pub password: u16,
    pub username: XlString,
}

impl FileSharingRecord {
    pub fn read(data: &[u8]) -> XlsResult<Self> {
        let mut o = 0;
        Ok(FileSharingRecord {
            read_only: read_u16(data, &mut o)?,
            password: read_u16(data, &mut o)?,
            username: read_unicode_string(data, &mut o)?,
        })
    }

    pub fn write_body(&self, out: &mut Vec<u8>) {
        put_u16(out, self.read_only);
        put_u16(out, self.password);
        write_unicode_string(out, &self.username);
    }
}

// ── External references ─────────────────────────────────────────────────

const SUPBOOK_INTERNAL: u16 = 0x0401;
const SUPBOOK_ADD_IN: u16 = 0x3A01;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupBookKind {
    /// This workbook's own sheets.
    Internal,
    /// Add-in functions.
    AddIn,
    /// Another workbook (or OLE/DDE link) by URL.
    External {
        url: XlString,
        sheet_names: Vec<XlString>,
    },
}

/// SUPBOOK: header of one external-book block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupBookRecord {
    pub num_sheets: u16,
    pub kind: SupBookKind,
}

impl SupBookRecord {
    pub fn internal(num_sheets: u16) -> Self {
        SupBookRecord {
            num_sheets,
            kind: SupBookKind::Internal,
        }
    }

    pub fn add_in() -> Self {
        SupBookRecord {
            num_sheets: 1,
            kind: SupBookKind::AddIn,
        }
    }

    pub fn external(url: &str, sheet_names: &[&str]) -> Self {
        SupBookRecord {
            num_sheets: sheet_names.len() as u16,
            kind: SupBookKind::External {
                url: XlString::new(url),
                sheet_names: sheet_names.iter().map(|s| XlString::new(*s)).collect(),
            },
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self.kind, SupBookKind::Internal)
    }

    pub fn is_add_in(&self) -> bool {
        matches!(self.kind, SupBookKind::AddIn)
    }

    pub fn url(&self) -> Option<&str> {
        match &self.kind {
            SupBookKind::External { url, .. } => Some(url.as_str()),
            _ => None,
        }
    }

    pub fn sheet_names(&self) -> &[XlString] {
        match &self.kind {
            SupBookKind::External { sheet_names, .. } => sheet_names,
            _ => &[],
        }
    }

    pub fn read(data: &[u8]) -> XlsResult<Self> {
        let mut o = 0;
        let num_sheets = read_u16(data, &mut o)?;
        let cch = read_u16(data, &mut o)?;
        if data.len() == 4 {
            let kind = match cch {
                SUPBOOK_INTERNAL => SupBookKind::Internal,
                SUPBOOK_ADD_IN => SupBookKind::AddIn,
                other => {
                    return Err(XlsError::Parse(format!("unknown SUPBOOK marker 0x{other:04X}")))
                }
            };
            return Ok(SupBookRecord { num_sheets, kind });
        }
        let flags = read_u8(data, &mut o)?;
        let url = read_character_data(data, &mut o, cch as usize, flags)?;
        let mut sheet_names = Vec::with_capacity(num_sheets as usize);
        for _ in 0..num_sheets {
            sheet_names.push(read_unicode_string(data, &mut o)?);
        }
        Ok(SupBookRecord {
            num_sheets,
            kind: SupBookKind::External { url, sheet_names },
        })
    }

    pub fn write_body(&self, out: &mut Vec<u8>) {
        put_u16(out, self.num_sheets);
        match &self.kind {
            SupBookKind::Internal => put_u16(out, SUPBOOK_INTERNAL),
            SupBookKind::AddIn => put_u16(out, SUPBOOK_ADD_IN),
            SupBookKind::External { url, sheet_names } => {
                write_unicode_string(out, url);
                for s in sheet_names {
                    write_unicode_string(out, s);
                }
            }
        }
    }
}

/// One EXTERNSHEET entry: a SUPBOOK index and a sheet range within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefSubRecord {
    pub book: u16,
    pub first_sheet: i16,
    pub last_sheet: i16,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExternSheetRecord {
    pub refs: Vec<RefSubRecord>,
}

impl ExternSheetRecord {
    pub fn read(data: &[u8]) -> XlsResult<Self> {
        let mut o = 0;
        let n = read_u16(data, &mut o)? as usize;
        let mut refs = Vec::with_capacity(n);
        for _ in 0..n {
            refs.push(RefSubRecord {
                book: read_u16(data, &mut o)?,
                first_sheet: read_i16(data, &mut o)?,
                last_sheet: read_i16(data, &mut o)?,
            });
        }
        Ok(ExternSheetRecord { refs })
    }

    pub fn write_body(&self, out: &mut Vec<u8>) {
        put_u16(out, self.refs.len() as u16);
        for r in &self.refs {
            put_u16(out, r.book);
            put_i16(out, r.first_sheet);
            put_i16(out, r.last_sheet);
        }
    }

    /// Index of an existing entry for exactly this triple.
    pub fn find_ref(&self, book: u16, first: i16, last: i16) -> Option<usize> {
        self.refs
            .iter()
            .position(|r| r.book == book && r.first_sheet == first && r.last_sheet == last)
    }

    pub fn add_ref(&mut self, book: u16, first: i16, last: i16) -> usize {
        self.refs.push(RefSubRecord {
            book,
            first_sheet: first,
            last_sheet: last,
        });
        self.refs.len() - 1
    }
}

/// Token bytes of a `#REF!` formula: `cce` = 2, PtgErr(#REF!).
pub const REF_ERROR_FORMULA: [u8; 4] = [0x02, 0x00, 0x1C, 0x17];

/// EXTERNNAME: an external defined name or add-in function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternNameRecord {
    pub options: u16,
    /// Sheet index for document names, otherwise reserved.
    pub ix: u16,
    pub reserved: u16,
    pub name: XlString,
    /// Definition (`cce` + tokens) or DDE/OLE payload, opaque.
    pub tail: Vec<u8>,
}

impl ExternNameRecord {
    /// Add-in function entry whose definition is `#REF!`.
    pub fn add_in_function(name: &str) -> Self {
        ExternNameRecord {
            options: 0,
            ix: 0,
            reserved: 0,
            name: XlString::new(name),
            tail: REF_ERROR_FORMULA.to_vec(),
        }
    }

    pub fn read(data: &[u8]) -> XlsResult<Self> {
        let mut o = 0;
        let options = read_u16(data, &mut o)?;
        let ix = read_u16(data, &mut o)?;
        let reserved = read_u16(data, &mut o)?;
        let name = read_short_string(data, &mut o)?;
        let tail = read_remaining(data, &mut o);
        Ok(ExternNameRecord {
            options,
            ix,
            reserved,
            name,
            tail,
        })
    }

    pub fn write_body(&self, out: &mut Vec<u8>) {
        put_u16(out, self.options);
        put_u16(out, self.ix);
        put_u16(out, self.reserved);
        write_short_string(out, &self.name);
        out.extend_from_slice(&self.tail);
    }
}

pub const NAME_HIDDEN: u16 = 0x0001;
pub const NAME_FUNCTION: u16 = 0x0002;
pub const NAME_BUILTIN: u16 = 0x0020;

pub const BUILTIN_CONSOLIDATE_AREA: u8 = 0x00;
pub const BUILTIN_AUTO_OPEN: u8 = 0x01;
pub const BUILTIN_AUTO_CLOSE: u8 = 0x02;
pub const BUILTIN_EXTRACT: u8 = 0x03;
pub const BUILTIN_DATABASE: u8 = 0x04;
pub const BUILTIN_CRITERIA: u8 = 0x05;
pub const BUILTIN_PRINT_AREA: u8 = 0x06;
pub const BUILTIN_PRINT_TITLES: u8 = 0x07;
pub const BUILTIN_RECORDER: u8 = 0x08;
pub const BUILTIN_DATA_FORM: u8 = 0x09;
pub const BUILTIN_AUTO_ACTIVATE: u8 = 0x0A;
pub const BUILTIN_AUTO_DEACTIVATE: u8 = 0x0B;
pub const BUILTIN_SHEET_TITLE: u8 = 0x0C;
pub const BUILTIN_FILTER_DB: u8 = 0x0D;

/// Display name of a built-in name code.
pub fn builtin_name_text(code: u8) -> &'static str {
    match code {
        BUILTIN_CONSOLIDATE_AREA => "Consolidate_Area",
        BUILTIN_AUTO_OPEN => "Auto_Open",
        BUILTIN_AUTO_CLOSE => "Auto_Close",
        BUILTIN_EXTRACT => "Extract",
        BUILTIN_DATABASE => "Database",
        BUILTIN_CRITERIA => "Criteria",
        BUILTIN_PRINT_AREA => "Print_Area",
        BUILTIN_PRINT_TITLES => "Print_Titles",
        BUILTIN_RECORDER => "Recorder",
        BUILTIN_DATA_FORM => "Data_Form",
        BUILTIN_AUTO_ACTIVATE => "Auto_Activate",
        BUILTIN_AUTO_DEACTIVATE => "Auto_Deactivate",
        BUILTIN_SHEET_TITLE => "Sheet_Title",
        BUILTIN_FILTER_DB => "_FilterDatabase",
        _ => "Unknown",
    }
}

/// NAME: a defined name. Built-in names store a one-character code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameRecord {
    pub options: u16,
    pub keyboard_shortcut: u8,
    pub reserved: u16,
    /// 1-based sheet index for sheet-scoped names, 0 for workbook scope.
    pub sheet_number: u16,
    /// Lengths of the custom menu, description, help and status texts.
    pub text_lengths: [u8; 4],
    pub name: XlString,
    /// `rgce` token bytes, opaque.
    pub formula: Vec<u8>,
    /// Menu/description/help/status texts, opaque.
    pub trailing: Vec<u8>,
}

impl NameRecord {
    pub fn new(name: &str, sheet_number: u16) -> Self {
        NameRecord {
            options: 0,
            keyboard_shortcut: 0,
            reserved: 0,
            sheet_number,
            text_lengths: [0; 4],
            name: XlString::new(name),
            formula: Vec::new(),
            trailing: Vec::new(),
        }
    }

    pub fn new_builtin(code: u8, sheet_number: u16) -> Self {
        let mut n = Self::new("", sheet_number);
        n.options = NAME_BUILTIN;
        n.name = XlString {
            text: (code as char).to_string(),
            wide: false,
        };
        n
    }

    pub fn is_builtin(&self) -> bool {
        self.options & NAME_BUILTIN != 0
    }

    pub fn is_hidden(&self) -> bool {
        self.options & NAME_HIDDEN != 0
    }

    pub fn is_function(&self) -> bool {
        self.options & NAME_FUNCTION != 0
    }

    pub fn builtin_code(&self) -> Option<u8> {
        if self.is_builtin() {
            self.name.text.chars().next().map(|c| c as u32 as u8)
        } else {
            None
        }
    }

    /// Human-readable name, resolving built-in codes.
    pub fn name_text(&self) -> String {
        match self.builtin_code() {
            Some(code) => builtin_name_text(code).to_string(),
            None => self.name.text.clone(),
        }
    }

    pub fn read(data: &[u8]) -> XlsResult<Self> {
        let mut o = 0;
        let options = read_u16(data, &mut o)?;
        let keyboard_shortcut = read_u8(data, &mut o)?;
        let cch = read_u8(data, &mut o)? as usize;
        let cce = read_u16(data, &mut o)? as usize;
        let reserved = read_u16(data, &mut o)?;
        let sheet_number = read_u16(data, &mut o)?;
        let text_lengths = [
            read_u8(data, &mut o)?,
            read_u8(data, &mut o)?,
            read_u8(data, &mut o)?,
            read_u8(data, &mut o)?,
        ];
        let flags = read_u8(data, &mut o)?;
        let name = read_character_data(data, &mut o, cch, flags)?;
        let formula = crate::biff::parser::read_bytes(data, &mut o, cce)?;
        let trailing = read_remaining(data, &mut o);
        Ok(NameRecord {
            options,
            keyboard_shortcut,
            reserved,
            sheet_number,
            text_lengths,
            name,
            formula,
            trailing,
        })
    }

    pub fn write_body(&self, out: &mut Vec<u8>) {
        put_u16(out, self.options);
        put_u8(out, self.keyboard_shortcut);
        put_u8(out, self.name.char_count() as u8);
        put_u16(out, self.formula.len() as u16);
        put_u16(out, self.reserved);
        put_u16(out, self.sheet_number);
        out.extend_from_slice(&self.text_lengths);
        put_u8(out, self.name.wide as u8);
        write_character_data(out, &self.name);
        out.extend_from_slice(&self.formula);
        out.extend_from_slice(&self.trailing);
    }
}
