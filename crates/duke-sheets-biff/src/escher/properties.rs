//! Escher shape properties (the Opt record).
//!
//! Each property is a 6-byte header: a 14-bit id plus `fBid` (0x4000) and
//! `fComplex` (0x8000) flags, and a 32-bit value. For complex properties the
//! value is the length of variable data that follows all headers, in the
//! same order as the headers.

use crate::biff::parser::{read_bytes, read_u16, read_u32};
use crate::biff::writer::{put_u16, put_u32};
use crate::error::{XlsError, XlsResult};

pub const IS_BLIP_ID: u16 = 0x4000;
pub const IS_COMPLEX: u16 = 0x8000;
pub const PROPERTY_ID_MASK: u16 = 0x3FFF;

/// Property ids used by the shape translators.
pub mod pid {
    pub const LOCK_AGAINST_GROUPING: u16 = 0x007F;
    pub const TEXT_ID: u16 = 0x0080;
    pub const TEXT_LEFT: u16 = 0x0081;
    pub const TEXT_TOP: u16 = 0x0082;
    pub const TEXT_RIGHT: u16 = 0x0083;
    pub const TEXT_BOTTOM: u16 = 0x0084;
    pub const WRAP_TEXT: u16 = 0x0085;
    pub const ANCHOR_TEXT: u16 = 0x0087;
    pub const SIZE_TEXT_TO_FIT_SHAPE: u16 = 0x00BF;
    pub const BLIP_TO_DISPLAY: u16 = 0x0104;
    pub const GEOMETRY_RIGHT: u16 = 0x0142;
    pub const GEOMETRY_BOTTOM: u16 = 0x0143;
    pub const SHAPE_PATH: u16 = 0x0144;
    pub const VERTICES: u16 = 0x0145;
    pub const SEGMENT_INFO: u16 = 0x0146;
    pub const GEOMETRY_FILL_OK: u16 = 0x017F;
    pub const FILL_COLOR: u16 = 0x0181;
    pub const FILL_BACK_COLOR: u16 = 0x0183;
    pub const FILL_NO_FILL_HIT_TEST: u16 = 0x01BF;
    pub const LINE_COLOR: u16 = 0x01C0;
    pub const LINE_WIDTH: u16 = 0x01CB;
    pub const LINE_DASHING: u16 = 0x01CE;
    pub const LINE_START_ARROWHEAD: u16 = 0x01D0;
    pub const LINE_END_ARROWHEAD: u16 = 0x01D1;
    pub const LINE_END_CAP_STYLE: u16 = 0x01D7;
    pub const LINE_NO_DRAW_DASH: u16 = 0x01FF;
    pub const SHADOW_COLOR: u16 = 0x0201;
    pub const SHADOW_OBSCURED: u16 = 0x023F;
    pub const GROUP_SHAPE_PRINT: u16 = 0x03BF;
}

/// Shape path value for a free-form path.
pub const SHAPE_PATH_COMPLEX: u32 = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscherProperty {
    /// Full id including the `fBid`/`fComplex` flags.
    pub id: u16,
    pub value: u32,
    /// Variable-length data of a complex property.
    pub complex: Option<Vec<u8>>,
}

impl EscherProperty {
    pub fn simple(id: u16, value: u32) -> Self {
        EscherProperty {
            id: id & !IS_COMPLEX,
            value,
            complex: None,
        }
    }

    /// A property referencing a BLIP by index.
    pub fn blip(id: u16, value: u32) -> Self {
        EscherProperty::simple(id | IS_BLIP_ID, value)
    }

    pub fn complex(id: u16, data: Vec<u8>) -> Self {
        EscherProperty {
            id: id | IS_COMPLEX,
            value: data.len() as u32,
            complex: Some(data),
        }
    }

    /// Array property: 6-byte header (count, allocated count, element size)
    /// followed by the elements.
    pub fn array(id: u16, count: u16, element_size: u16, elements: &[u8]) -> Self {
        let mut data = Vec::with_capacity(6 + elements.len());
        put_u16(&mut data, count);
        put_u16(&mut data, count);
        put_u16(&mut data, element_size);
        data.extend_from_slice(elements);
        EscherProperty::complex(id, data)
    }

    pub fn property_number(&self) -> u16 {
        self.id & PROPERTY_ID_MASK
    }

    pub fn is_complex(&self) -> bool {
        self.id & IS_COMPLEX != 0
    }

    pub fn is_blip_id(&self) -> bool {
        self.id & IS_BLIP_ID != 0
    }
}

/// Property table of a shape. The record instance holds the property count.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OptRecord {
    pub version: u16,
    pub properties: Vec<EscherProperty>,
}

impl OptRecord {
    pub fn new() -> Self {
        OptRecord {
            version: 3,
            properties: Vec::new(),
        }
    }

    pub fn read(options: u16, data: &[u8]) -> XlsResult<Self> {
        let count = (options >> 4) as usize;
        let mut o = 0;
        let mut headers = Vec::with_capacity(count);
        for _ in 0..count {
            let id = read_u16(data, &mut o)?;
            let value = read_u32(data, &mut o)?;
            headers.push((id, value));
        }
        let mut properties = Vec::with_capacity(count);
        for (id, value) in headers {
            let complex = if id & IS_COMPLEX != 0 {
                let len = value as usize;
                if o + len > data.len() {
                    return Err(XlsError::Parse(format!(
                        "complex escher property 0x{id:04X} overruns Opt record"
                    )));
                }
                Some(read_bytes(data, &mut o, len)?)
            } else {
                None
            };
            properties.push(EscherProperty { id, value, complex });
        }
        if o != data.len() {
            return Err(XlsError::Parse("trailing bytes in Opt record".into()));
        }
        Ok(OptRecord {
            version: options & 0x000F,
            properties,
        })
    }

    pub fn options(&self) -> u16 {
        ((self.properties.len() as u16) << 4) | (self.version & 0x000F)
    }

    pub fn write_data(&self, out: &mut Vec<u8>) {
        for p in &self.properties {
            put_u16(out, p.id);
            put_u32(out, p.value);
        }
        for p in &self.properties {
            if let Some(c) = &p.complex {
                out.extend_from_slice(c);
            }
        }
    }

    pub fn data_len(&self) -> usize {
        self.properties
            .iter()
            .map(|p| 6 + p.complex.as_ref().map_or(0, Vec::len))
            .sum()
    }

    pub fn get(&self, number: u16) -> Option<&EscherProperty> {
        self.properties
            .iter()
            .find(|p| p.property_number() == number & PROPERTY_ID_MASK)
    }

    pub fn get_mut(&mut self, number: u16) -> Option<&mut EscherProperty> {
        self.properties
            .iter_mut()
            .find(|p| p.property_number() == number & PROPERTY_ID_MASK)
    }

    /// Replace any property with the same number, else append.
    pub fn set(&mut self, prop: EscherProperty) {
        match self.get_mut(prop.property_number()) {
            Some(existing) => *existing = prop,
            None => self.properties.push(prop),
        }
    }

    pub fn remove(&mut self, number: u16) -> Option<EscherProperty> {
        let i = self
            .properties
            .iter()
            .position(|p| p.property_number() == number & PROPERTY_ID_MASK)?;
        Some(self.properties.remove(i))
    }

    /// Order properties by number, as Excel writes them.
    pub fn sort(&mut self) {
        self.properties.sort_by_key(EscherProperty::property_number);
    }
}
