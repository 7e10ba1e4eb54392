//! Reading and writing arrays in the numpy npy format.
//!
//! The npy format is described [here][spec]. Only the subset required to
//! exchange spectra with numpy is supported: version 1 headers, little-endian
//! `f8` values, and C-order layout.
//!
//! [spec]: https://numpy.org/neps/nep-0001-npy-format.html

use std::io;

use super::{Array, Shape};

/// The npy magic number.
pub(crate) const MAGIC: [u8; 6] = *b"\x93NUMPY";

const DESCR: &str = "<f8";
const HEADER_ALIGN: usize = 64;

/// Reads an f64 array in npy format from a reader.
///
/// The stream is assumed to be positioned at the start.
pub fn read_array<R>(reader: &mut R) -> io::Result<Array<f64>>
where
    R: io::BufRead,
{
    let dict = read_header(reader)?;
    let shape = parse_dict(&dict)?;

    let mut values = vec![0.0; shape.elements()];
    let mut buf = [0; 8];
    for value in values.iter_mut() {
        reader.read_exact(&mut buf)?;
        *value = f64::from_le_bytes(buf);
    }

    Array::new(values, shape)
        .map_err(|_| invalid_data("npy shape does not fit values"))
}

/// Writes an f64 array in npy format to a writer.
pub fn write_array<W>(writer: &mut W, array: &Array<f64>) -> io::Result<()>
where
    W: io::Write,
{
    let shape = array.shape();
    let mut dims = String::new();
    for v in shape.iter() {
        dims.push_str(&format!("{v}, "));
    }

    let dict = format!("{{'descr': '{DESCR}', 'fortran_order': False, 'shape': ({dims}), }}");

    // Magic, version, and header length precede the dict; the whole header is
    // padded with spaces to a multiple of 64 bytes and terminated by a newline
    let unpadded = MAGIC.len() + 2 + 2 + dict.len() + 1;
    let padding = (HEADER_ALIGN - unpadded % HEADER_ALIGN) % HEADER_ALIGN;
    let header_len = dict.len() + padding + 1;

    let header_len =
        u16::try_from(header_len).map_err(|_| invalid_data("npy header too long"))?;

    writer.write_all(&MAGIC)?;
    writer.write_all(&[1, 0])?;
    writer.write_all(&header_len.to_le_bytes())?;
    writer.write_all(dict.as_bytes())?;
    writer.write_all(&vec![b' '; padding])?;
    writer.write_all(b"\n")?;

    for v in array.iter() {
        writer.write_all(&v.to_le_bytes())?;
    }

    Ok(())
}

fn read_header<R>(reader: &mut R) -> io::Result<String>
where
    R: io::BufRead,
{
    let mut magic = [0; 6];
    reader.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(invalid_data("missing npy magic number"));
    }

    let mut version = [0; 2];
    reader.read_exact(&mut version)?;
    if version[0] != 1 {
        return Err(invalid_data("unsupported npy version"));
    }

    let mut len = [0; 2];
    reader.read_exact(&mut len)?;

    let mut dict = vec![0; usize::from(u16::from_le_bytes(len))];
    reader.read_exact(&mut dict)?;

    String::from_utf8(dict).map_err(|_| invalid_data("npy header not valid utf-8"))
}

fn parse_dict(dict: &str) -> io::Result<Shape> {
    if !dict.contains(&format!("'{DESCR}'")) {
        return Err(invalid_data("only little-endian f8 npy values supported"));
    }

    if dict.contains("'fortran_order': True") {
        return Err(invalid_data("Fortran order not supported when reading npy"));
    }

    let (_, rest) = dict
        .split_once('(')
        .ok_or_else(|| invalid_data("npy header missing shape"))?;
    let (dims, _) = rest
        .split_once(')')
        .ok_or_else(|| invalid_data("npy header missing shape"))?;

    dims.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<usize>()
                .map_err(|_| invalid_data("invalid npy shape"))
        })
        .collect::<io::Result<Vec<_>>>()
        .map(Shape)
}

fn invalid_data(msg: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}
