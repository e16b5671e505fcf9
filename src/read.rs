use std::io::{self, Cursor};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use ndarray::Array2;

use crate::error::FcsError;
use crate::metadata::{DataRepresentation, Endianness, Metadata};

fn read_uint(cursor: &mut Cursor<&[u8]>, nbytes: usize, order: Endianness) -> io::Result<u64> {
    match order {
        Endianness::Little => cursor.read_uint::<LittleEndian>(nbytes),
        Endianness::Big => cursor.read_uint::<BigEndian>(nbytes),
    }
}

fn read_f32(cursor: &mut Cursor<&[u8]>, order: Endianness) -> io::Result<f32> {
    match order {
        Endianness::Little => cursor.read_f32::<LittleEndian>(),
        Endianness::Big => cursor.read_f32::<BigEndian>(),
    }
}

fn read_f64(cursor: &mut Cursor<&[u8]>, order: Endianness) -> io::Result<f64> {
    match order {
        Endianness::Little => cursor.read_f64::<LittleEndian>(),
        Endianness::Big => cursor.read_f64::<BigEndian>(),
    }
}

fn decode_packed_integer(
    data: &[u8],
    meta: &Metadata,
    matrix: &mut Array2<f64>,
) -> Result<(), FcsError> {
    let mut cursor = Cursor::new(data);
    for event in 0..meta.events {
        for (index, channel) in meta.channels.iter().enumerate() {
            let nbytes = channel.bits.div_ceil(8);
            if nbytes == 0 || nbytes > 8 {
                cursor.set_position(cursor.position() + nbytes as u64);
                continue;
            }
            let raw = read_uint(&mut cursor, nbytes, meta.byte_order)?;
            // The format requires decoded values to be masked against
            // range - 1 so padding bits above the channel width drop out.
            let value = if channel.range >= 1.0 {
                raw & (channel.range as u64).wrapping_sub(1)
            } else {
                raw
            };
            matrix[[index, event]] = value as f64;
        }
    }
    Ok(())
}

fn decode_float(
    data: &[u8],
    meta: &Metadata,
    matrix: &mut Array2<f64>,
    double: bool,
) -> Result<(), FcsError> {
    let mut cursor = Cursor::new(data);
    for event in 0..meta.events {
        for index in 0..meta.parameters {
            let value = if double {
                read_f64(&mut cursor, meta.byte_order)?
            } else {
                read_f32(&mut cursor, meta.byte_order)? as f64
            };
            matrix[[index, event]] = value;
        }
    }
    Ok(())
}

fn decode_ascii(data: &[u8], meta: &Metadata, matrix: &mut Array2<f64>) {
    let mut pos = 0usize;
    for event in 0..meta.events {
        for (index, channel) in meta.channels.iter().enumerate() {
            let width = channel.bits;
            if width == 0 || pos + width > data.len() {
                continue;
            }
            let field = &data[pos..pos + width];
            pos += width;
            let value = std::str::from_utf8(field)
                .ok()
                .and_then(|s| s.trim().parse::<f64>().ok())
                .unwrap_or(0.0);
            matrix[[index, event]] = value;
        }
    }
}

/// Decode the DATA segment into a `(parameters, events)` matrix.
///
/// Dispatches on the declared representation and byte order. An empty DATA
/// range or a zero event count yields a zero-column matrix rather than an
/// error; an unrecognized representation tag is fatal.
pub fn read_event_matrix(data: &[u8], meta: &Metadata) -> Result<Array2<f64>, FcsError> {
    if data.is_empty() || meta.events == 0 || meta.parameters == 0 {
        return Ok(Array2::zeros((meta.parameters, 0)));
    }

    let representation = meta
        .representation
        .ok_or_else(|| FcsError::UnsupportedDataType(meta.datatype_tag.clone()))?;

    let mut matrix = Array2::zeros((meta.parameters, meta.events));
    match representation {
        DataRepresentation::PackedInteger => decode_packed_integer(data, meta, &mut matrix)?,
        DataRepresentation::Float => decode_float(data, meta, &mut matrix, false)?,
        DataRepresentation::Double => decode_float(data, meta, &mut matrix, true)?,
        DataRepresentation::Ascii => decode_ascii(data, meta, &mut matrix),
    }
    Ok(matrix)
}
