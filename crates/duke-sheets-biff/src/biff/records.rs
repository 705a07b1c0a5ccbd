//! BIFF8 record type constants.
//!
//! Reference: [MS-XLS] §2.3, Record Enumeration

// ── Stream structure ────────────────────────────────────────────────────
pub const BOF: u16 = 0x0809;
pub const EOF: u16 = 0x000A;
pub const CONTINUE: u16 = 0x003C;
pub const INDEX: u16 = 0x020B; // Row block index (derived, regenerated on write)
pub const DBCELL: u16 = 0x00D7; // Row block cell offsets (derived, regenerated on write)

// ── Workbook globals ────────────────────────────────────────────────────
pub const INTERFACEHDR: u16 = 0x00E1;
pub const MMS: u16 = 0x00C1;
pub const INTERFACEEND: u16 = 0x00E2;
pub const WRITEACCESS: u16 = 0x005C;
pub const CODEPAGE: u16 = 0x0042; // Code page (should be 1200 = UTF-16 for BIFF8)
pub const DSF: u16 = 0x0161;
pub const TABID: u16 = 0x013D; // Sheet tab ids
pub const FNGROUPCOUNT: u16 = 0x009C;
pub const WINDOWPROTECT: u16 = 0x0019;
pub const PROT4REV: u16 = 0x01AF;
pub const PASSWORD4REV: u16 = 0x01BC;
pub const WINDOW1: u16 = 0x003D;
pub const BACKUP: u16 = 0x0040;
pub const HIDEOBJ: u16 = 0x008D;
pub const DATEMODE: u16 = 0x0022; // 1900 vs 1904 date system (a.k.a. DATE1904)
pub const PRECISION: u16 = 0x000E;
pub const REFRESHALL: u16 = 0x01B7;
pub const BOOKBOOL: u16 = 0x00DA;
pub const FONT: u16 = 0x0031; // Font definition
pub const FORMAT: u16 = 0x041E; // Number format string
pub const XF: u16 = 0x00E0; // Extended Format (cell format record)
pub const STYLE: u16 = 0x0293; // Named cell style
pub const PALETTE: u16 = 0x0092; // Custom color palette (overrides default 56)
pub const USESELFS: u16 = 0x0160;
pub const BOUNDSHEET: u16 = 0x0085; // Sheet name, type, visibility, stream offset
pub const COUNTRY: u16 = 0x008C;
pub const SUPBOOK: u16 = 0x01AE; // External (or internal) workbook reference
pub const EXTERNNAME: u16 = 0x0023;
pub const EXTERNSHEET: u16 = 0x0017;
pub const XCT: u16 = 0x0059; // Cached external sheet header
pub const CRN: u16 = 0x005A; // Cached external cell values
pub const NAME: u16 = 0x0018; // Defined name
pub const NAMECMT: u16 = 0x0894; // Defined name comment
pub const MSODRAWINGGROUP: u16 = 0x00EB;
pub const SST: u16 = 0x00FC; // Shared String Table
pub const EXTSST: u16 = 0x00FF; // Extended SST (hash table)
pub const WRITEPROT: u16 = 0x0086;
pub const FILESHARING: u16 = 0x005B;
pub const QUICKTIP: u16 = 0x0800; // Hyperlink tooltip

// ── Calc settings block ─────────────────────────────────────────────────
pub const UNCALCED: u16 = 0x005E;
pub const CALCCOUNT: u16 = 0x000C;
pub const CALCMODE: u16 = 0x000D;
pub const REFMODE: u16 = 0x000F;
pub const DELTA: u16 = 0x0010;
pub const ITERATION: u16 = 0x0011;
pub const SAVERECALC: u16 = 0x005F;

// ── Cell records ────────────────────────────────────────────────────────
pub const DIMENSION: u16 = 0x0200; // Used range (first/last row/col)
pub const LABELSST: u16 = 0x00FD; // Cell containing SST string index
pub const LABEL: u16 = 0x0204; // Cell with inline string (rare in BIFF8)
pub const NUMBER: u16 = 0x0203; // Cell with IEEE 754 double
pub const RK: u16 = 0x027E; // Cell with compressed number (RK encoding)
pub const MULRK: u16 = 0x00BD; // Multiple RK values in one row
pub const BLANK: u16 = 0x0201; // Empty cell with formatting
pub const MULBLANK: u16 = 0x00BE; // Multiple blanks with formatting
pub const BOOLERR: u16 = 0x0205; // Boolean or error cell
pub const FORMULA: u16 = 0x0006; // Formula cell with cached result
pub const STRING: u16 = 0x0207; // Cached string result for preceding FORMULA
pub const RSTRING: u16 = 0x00D6; // Rich-text inline string (rare)
pub const ARRAY: u16 = 0x0221; // Array formula
pub const SHRFMLA: u16 = 0x04BC; // Shared formula
pub const TABLE: u16 = 0x0236; // Data table

// ── Sheet structure ─────────────────────────────────────────────────────
pub const PRINTHEADERS: u16 = 0x002A;
pub const PRINTGRIDLINES: u16 = 0x002B;
pub const GRIDSET: u16 = 0x0082;
pub const GUTS: u16 = 0x0080; // Outline gutter sizes
pub const WSBOOL: u16 = 0x0081;
pub const ROW: u16 = 0x0208; // Row height, visibility, default format
pub const COLINFO: u16 = 0x007D; // Column width, visibility, default format
pub const DEFCOLWIDTH: u16 = 0x0055; // Default column width
pub const DEFAULTROWHEIGHT: u16 = 0x0225; // Default row height
pub const STANDARDWIDTH: u16 = 0x0099;
pub const SORT: u16 = 0x0090;
pub const MERGECELLS: u16 = 0x00E5; // Merged cell ranges
pub const WINDOW2: u16 = 0x023E; // Sheet view settings (freeze panes, etc.)
pub const SCL: u16 = 0x00A0; // Zoom
pub const PANE: u16 = 0x0041; // Pane split position
pub const SELECTION: u16 = 0x001D; // Selected cell range
pub const HLINK: u16 = 0x01B8; // Hyperlink
pub const SHEETEXT: u16 = 0x0862;
pub const SHEETPROTECTION: u16 = 0x0867;
pub const FEATHEADR: u16 = 0x0867;
pub const FEAT: u16 = 0x0868;
pub const RANGEPROTECTION: u16 = 0x0868;
pub const FEATHEADR11: u16 = 0x0871;
pub const FEAT11: u16 = 0x0872;
pub const LABELRANGES: u16 = 0x015F;
pub const QSI: u16 = 0x01AD;
pub const PHONETICPR: u16 = 0x00EF;
pub const PLV_MAC: u16 = 0x08C8;
pub const CODENAME: u16 = 0x01BA;
pub const SXVIEW: u16 = 0x00B0;
pub const USERSVIEWBEGIN: u16 = 0x01AA;
pub const USERSVIEWEND: u16 = 0x01AB;

// ── Worksheet protection block ──────────────────────────────────────────
pub const PROTECT: u16 = 0x0012;
pub const PASSWORD: u16 = 0x0013;
pub const OBJPROTECT: u16 = 0x0063;
pub const SCENPROTECT: u16 = 0x00DD;

// ── Page settings block ─────────────────────────────────────────────────
pub const HORIZONTALPAGEBREAKS: u16 = 0x001B;
pub const VERTICALPAGEBREAKS: u16 = 0x001A;
pub const HEADER: u16 = 0x0014;
pub const FOOTER: u16 = 0x0015;
pub const HCENTER: u16 = 0x0083;
pub const VCENTER: u16 = 0x0084;
pub const LEFTMARGIN: u16 = 0x0026;
pub const RIGHTMARGIN: u16 = 0x0027;
pub const TOPMARGIN: u16 = 0x0028;
pub const BOTTOMMARGIN: u16 = 0x0029;
pub const PLS: u16 = 0x004D; // Printer driver settings (often continued)
pub const SETUP: u16 = 0x00A1;
pub const BITMAP: u16 = 0x00E9; // Background picture
pub const PRINTSIZE: u16 = 0x0033;
pub const HEADERFOOTER: u16 = 0x089C;

// ── Conditional formatting / data validation ────────────────────────────
pub const CFHEADER: u16 = 0x01B0;
pub const CFRULE: u16 = 0x01B1;
pub const CFHEADER12: u16 = 0x0879;
pub const CFRULE12: u16 = 0x087A;
pub const DVAL: u16 = 0x01B2;
pub const DV: u16 = 0x01BE;

// ── Drawing layer ───────────────────────────────────────────────────────
pub const MSODRAWING: u16 = 0x00EC;
pub const MSODRAWINGSELECTION: u16 = 0x00ED;
pub const OBJ: u16 = 0x005D;
pub const TXO: u16 = 0x01B6;
pub const NOTE: u16 = 0x001C;

// ── BOF subtypes (the `dt` field) ───────────────────────────────────────
pub const BOF_WORKBOOK_GLOBALS: u16 = 0x0005;
pub const BOF_VB_MODULE: u16 = 0x0006;
pub const BOF_WORKSHEET: u16 = 0x0010;
pub const BOF_CHART: u16 = 0x0020;
pub const BOF_MACRO: u16 = 0x0040;
pub const BOF_WORKSPACE: u16 = 0x0100;

/// BIFF version we support.
pub const BIFF8_VERSION: u16 = 0x0600;

/// Largest record body before a CONTINUE record is required.
pub const MAX_RECORD_DATA_SIZE: usize = 8224;

/// Short display name for diagnostics.
pub fn record_name(sid: u16) -> &'static str {
    match sid {
        BOF => "BOF",
        EOF => "EOF",
        CONTINUE => "CONTINUE",
        INDEX => "INDEX",
        DBCELL => "DBCELL",
        DIMENSION => "DIMENSIONS",
        WINDOW2 => "WINDOW2",
        ROW => "ROW",
        FORMULA => "FORMULA",
        SHRFMLA => "SHRFMLA",
        ARRAY => "ARRAY",
        TABLE => "TABLE",
        MERGECELLS => "MERGECELLS",
        CFHEADER => "CFHEADER",
        DVAL => "DVAL",
        DV => "DV",
        MSODRAWING => "MSODRAWING",
        OBJ => "OBJ",
        TXO => "TXO",
        NOTE => "NOTE",
        BOUNDSHEET => "BOUNDSHEET",
        FONT => "FONT",
        XF => "XF",
        SUPBOOK => "SUPBOOK",
        EXTERNSHEET => "EXTERNSHEET",
        EXTERNNAME => "EXTERNNAME",
        NAME => "NAME",
        SST => "SST",
        _ => "record",
    }
}
