//! OLE2 compound file boundary: the BIFF8 stream lives in `/Workbook`
//! (`/Book` in older files).

use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

use log::debug;

use crate::error::{XlsError, XlsResult};

const WORKBOOK_STREAM: &str = "/Workbook";
const BOOK_STREAM: &str = "/Book";

/// Read the workbook stream out of a compound file.
pub fn read_workbook_stream<R: Read + Seek>(reader: R) -> XlsResult<Vec<u8>> {
    let mut cfb = cfb::CompoundFile::open(reader)?;

    let stream_path = if cfb.exists(WORKBOOK_STREAM) {
        WORKBOOK_STREAM
    } else if cfb.exists(BOOK_STREAM) {
        BOOK_STREAM
    } else {
        return Err(XlsError::InvalidFormat(
            "no Workbook or Book stream found in CFB".into(),
        ));
    };

    let mut data = Vec::new();
    cfb.open_stream(stream_path)?.read_to_end(&mut data)?;
    debug!("{stream_path}: {} bytes", data.len());
    Ok(data)
}

pub fn read_workbook_stream_from_file<P: AsRef<Path>>(path: P) -> XlsResult<Vec<u8>> {
    let file = std::fs::File::open(path.as_ref())?;
    read_workbook_stream(file)
}

/// Write `data` as the `/Workbook` stream of a new compound file.
pub fn write_workbook_stream<W: Read + Write + Seek>(writer: W, data: &[u8]) -> XlsResult<W> {
    let mut cfb = cfb::CompoundFile::create(writer)?;
    {
        let mut stream = cfb.create_stream(WORKBOOK_STREAM)?;
        stream.write_all(data)?;
    }
    cfb.flush()?;
    Ok(cfb.into_inner())
}

/// In-memory compound file holding `data` as the workbook stream.
pub fn workbook_stream_to_bytes(data: &[u8]) -> XlsResult<Vec<u8>> {
    Ok(write_workbook_stream(Cursor::new(Vec::new()), data)?.into_inner())
}

pub fn write_workbook_stream_to_file<P: AsRef<Path>>(path: P, data: &[u8]) -> XlsResult<()> {
    let file = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path.as_ref())?;
    write_workbook_stream(file, data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_round_trip_in_memory() {
        let data: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        let bytes = workbook_stream_to_bytes(&data).unwrap();
        assert_eq!(read_workbook_stream(Cursor::new(bytes)).unwrap(), data);
    }

    #[test]
    fn test_missing_workbook_stream() {
        let mut cfb = cfb::CompoundFile::create(Cursor::new(Vec::new())).unwrap();
        cfb.create_stream("/Other").unwrap().write_all(b"x").unwrap();
        cfb.flush().unwrap();
        let bytes = cfb.into_inner().into_inner();
        assert!(matches!(
            read_workbook_stream(Cursor::new(bytes)),
            Err(XlsError::InvalidFormat(_))
        ));
    }
}
