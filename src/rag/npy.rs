//! Minimal reader for NumPy `.npy` files holding a 2-D float matrix.
//!
//! Supports format versions 1.0, 2.0 and 3.0, `f4`/`f8` in either byte order and
//! C or Fortran layout. The result is always a standard-layout `Array2<f32>`.

use ndarray::{Array2, ShapeBuilder};
use thiserror::Error;

const MAGIC: &[u8] = b"\x93NUMPY";

#[derive(Debug, Error, PartialEq)]
pub enum NpyError {
    #[error("missing NUMPY magic string")]
    BadMagic,
    #[error("unsupported format version {0}.{1}")]
    UnsupportedVersion(u8, u8),
    #[error("file truncated inside {0}")]
    Truncated(&'static str),
    #[error("header is not valid text")]
    HeaderEncoding,
    #[error("header missing or invalid '{0}' entry")]
    HeaderField(&'static str),
    #[error("unsupported dtype '{0}', expected a 4 or 8 byte float")]
    UnsupportedDtype(String),
    #[error("expected a 2-D array, got shape {0:?}")]
    NotMatrix(Vec<usize>),
    #[error("shape {0:?} is too large to address")]
    ShapeOverflow(Vec<usize>),
    #[error("data section has {found} bytes, expected {expected}")]
    DataLength { expected: usize, found: usize },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum FloatKind {
    F32,
    F64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ByteOrder {
    Little,
    Big,
}

#[derive(Debug, PartialEq)]
struct Header {
    kind: FloatKind,
    order: ByteOrder,
    fortran_order: bool,
    shape: Vec<usize>,
}

pub fn read_matrix(bytes: &[u8]) -> Result<Array2<f32>, NpyError> {
    if bytes.len() < MAGIC.len() + 2 || &bytes[..MAGIC.len()] != MAGIC {
        return Err(NpyError::BadMagic);
    }
    let major = bytes[6];
    let minor = bytes[7];

    let (header_len, header_start) = match major {
        1 => {
            let raw = bytes.get(8..10).ok_or(NpyError::Truncated("header length"))?;
            (u16::from_le_bytes([raw[0], raw[1]]) as usize, 10)
        }
        2 | 3 => {
            let raw = bytes.get(8..12).ok_or(NpyError::Truncated("header length"))?;
            (
                u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize,
                12,
            )
        }
        _ => return Err(NpyError::UnsupportedVersion(major, minor)),
    };

    let header_end = header_start + header_len;
    let header_bytes = bytes
        .get(header_start..header_end)
        .ok_or(NpyError::Truncated("header"))?;
    let header_text = std::str::from_utf8(header_bytes).map_err(|_| NpyError::HeaderEncoding)?;
    let header = parse_header(header_text)?;

    let (rows, cols) = match header.shape.as_slice() {
        [rows, cols] => (*rows, *cols),
        other => return Err(NpyError::NotMatrix(other.to_vec())),
    };

    let data = &bytes[header_end..];
    let width = match header.kind {
        FloatKind::F32 => 4,
        FloatKind::F64 => 8,
    };
    let expected = rows
        .checked_mul(cols)
        .and_then(|n| n.checked_mul(width))
        .ok_or_else(|| NpyError::ShapeOverflow(header.shape.clone()))?;
    if data.len() != expected {
        return Err(NpyError::DataLength {
            expected,
            found: data.len(),
        });
    }

    let values: Vec<f32> = match (header.kind, header.order) {
        (FloatKind::F32, ByteOrder::Little) => data
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
        (FloatKind::F32, ByteOrder::Big) => data
            .chunks_exact(4)
            .map(|c| f32::from_be_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
        (FloatKind::F64, ByteOrder::Little) => data
            .chunks_exact(8)
            .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]) as f32)
            .collect(),
        (FloatKind::F64, ByteOrder::Big) => data
            .chunks_exact(8)
            .map(|c| f64::from_be_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]) as f32)
            .collect(),
    };

    let matrix = if header.fortran_order {
        Array2::from_shape_vec((rows, cols).f(), values)
    } else {
        Array2::from_shape_vec((rows, cols), values)
    }
    .map_err(|_| NpyError::DataLength {
        expected,
        found: data.len(),
    })?;

    Ok(matrix.as_standard_layout().into_owned())
}

fn parse_header(text: &str) -> Result<Header, NpyError> {
    let descr = quoted_value(text, "descr").ok_or(NpyError::HeaderField("descr"))?;
    let (order, kind) = parse_descr(descr)?;

    let fortran_raw =
        raw_value(text, "fortran_order").ok_or(NpyError::HeaderField("fortran_order"))?;
    let fortran_order = if fortran_raw.starts_with("True") {
        true
    } else if fortran_raw.starts_with("False") {
        false
    } else {
        return Err(NpyError::HeaderField("fortran_order"));
    };

    let shape_raw = raw_value(text, "shape").ok_or(NpyError::HeaderField("shape"))?;
    let shape = parse_shape(shape_raw).ok_or(NpyError::HeaderField("shape"))?;

    Ok(Header {
        kind,
        order,
        fortran_order,
        shape,
    })
}

fn parse_descr(descr: &str) -> Result<(ByteOrder, FloatKind), NpyError> {
    let unsupported = || NpyError::UnsupportedDtype(descr.to_string());
    let mut chars = descr.chars();
    let order = match chars.next() {
        Some('<') => ByteOrder::Little,
        Some('>') => ByteOrder::Big,
        Some('=') if cfg!(target_endian = "big") => ByteOrder::Big,
        Some('=') => ByteOrder::Little,
        _ => return Err(unsupported()),
    };
    let kind = match chars.as_str() {
        "f4" => FloatKind::F32,
        "f8" => FloatKind::F64,
        _ => return Err(unsupported()),
    };
    Ok((order, kind))
}

/// Text following `'key':`, with leading whitespace removed.
fn raw_value<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    let pattern_single = format!("'{}':", key);
    let pattern_double = format!("\"{}\":", key);
    let (pos, len) = text
        .find(&pattern_single)
        .map(|p| (p, pattern_single.len()))
        .or_else(|| text.find(&pattern_double).map(|p| (p, pattern_double.len())))?;
    Some(text[pos + len..].trim_start())
}

fn quoted_value<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    let rest = raw_value(text, key)?;
    let quote = rest.chars().next().filter(|c| *c == '\'' || *c == '"')?;
    let rest = &rest[1..];
    let end = rest.find(quote)?;
    Some(&rest[..end])
}

fn parse_shape(raw: &str) -> Option<Vec<usize>> {
    let inner = raw.strip_prefix('(')?;
    let end = inner.find(')')?;
    inner[..end]
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| part.trim_end_matches('L').parse::<usize>().ok())
        .collect()
}

#[cfg(test)]
pub(crate) fn encode_f32(rows: &[Vec<f32>]) -> Vec<u8> {
    let cols = rows.first().map(|r| r.len()).unwrap_or(0);
    let dict = format!(
        "{{'descr': '<f4', 'fortran_order': False, 'shape': ({}, {}), }}",
        rows.len(),
        cols
    );
    let unpadded = MAGIC.len() + 2 + 2 + dict.len() + 1;
    let padding = (64 - unpadded % 64) % 64;
    let header = format!("{}{}\n", dict, " ".repeat(padding));

    let mut out = Vec::new();
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&(header.len() as u16).to_le_bytes());
    out.extend_from_slice(header.as_bytes());
    for row in rows {
        for value in row {
            out.extend_from_slice(&value.to_le_bytes());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_header(dict: &str, data: &[u8]) -> Vec<u8> {
        let header = format!("{}\n", dict);
        let mut out = Vec::new();
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&[1, 0]);
        out.extend_from_slice(&(header.len() as u16).to_le_bytes());
        out.extend_from_slice(header.as_bytes());
        out.extend_from_slice(data);
        out
    }

    #[test]
    fn reads_little_endian_f32_matrix() {
        let bytes = encode_f32(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
        let m = read_matrix(&bytes).unwrap();
        assert_eq!(m.shape(), &[2, 3]);
        assert_eq!(m[[1, 2]], 6.0);
        assert_eq!(m[[0, 1]], 2.0);
    }

    #[test]
    fn header_is_64_byte_aligned_in_test_encoder() {
        let bytes = encode_f32(&[vec![1.0]]);
        let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
        assert_eq!((10 + header_len) % 64, 0);
    }

    #[test]
    fn reads_f64_and_downcasts() {
        let data: Vec<u8> = [0.5_f64, -1.25]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let bytes = with_header(
            "{'descr': '<f8', 'fortran_order': False, 'shape': (1, 2), }",
            &data,
        );
        let m = read_matrix(&bytes).unwrap();
        assert_eq!(m[[0, 0]], 0.5);
        assert_eq!(m[[0, 1]], -1.25);
    }

    #[test]
    fn reads_big_endian() {
        let data: Vec<u8> = [7.0_f32, 8.0].iter().flat_map(|v| v.to_be_bytes()).collect();
        let bytes = with_header(
            "{'descr': '>f4', 'fortran_order': False, 'shape': (2, 1), }",
            &data,
        );
        let m = read_matrix(&bytes).unwrap();
        assert_eq!(m[[0, 0]], 7.0);
        assert_eq!(m[[1, 0]], 8.0);
    }

    #[test]
    fn fortran_order_is_transposed_into_rows() {
        // column-major [[1, 2], [3, 4]] is stored as 1, 3, 2, 4
        let data: Vec<u8> = [1.0_f32, 3.0, 2.0, 4.0]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let bytes = with_header(
            "{'descr': '<f4', 'fortran_order': True, 'shape': (2, 2), }",
            &data,
        );
        let m = read_matrix(&bytes).unwrap();
        assert_eq!(m.row(0).to_vec(), vec![1.0, 2.0]);
        assert_eq!(m.row(1).to_vec(), vec![3.0, 4.0]);
        assert!(m.is_standard_layout());
    }

    #[test]
    fn empty_matrix_is_allowed() {
        let bytes = with_header(
            "{'descr': '<f4', 'fortran_order': False, 'shape': (0, 384), }",
            &[],
        );
        let m = read_matrix(&bytes).unwrap();
        assert_eq!(m.shape(), &[0, 384]);
    }

    #[test]
    fn rejects_bad_magic() {
        assert_eq!(read_matrix(b"not numpy at all"), Err(NpyError::BadMagic));
    }

    #[test]
    fn rejects_integer_dtype() {
        let bytes = with_header(
            "{'descr': '<i8', 'fortran_order': False, 'shape': (1, 1), }",
            &[0; 8],
        );
        assert_eq!(
            read_matrix(&bytes),
            Err(NpyError::UnsupportedDtype("<i8".to_string()))
        );
    }

    #[test]
    fn rejects_one_dimensional_shape() {
        let bytes = with_header(
            "{'descr': '<f4', 'fortran_order': False, 'shape': (3,), }",
            &[0; 12],
        );
        assert_eq!(read_matrix(&bytes), Err(NpyError::NotMatrix(vec![3])));
    }

    #[test]
    fn rejects_shape_that_overflows_byte_count() {
        let bytes = with_header(
            "{'descr': '<f4', 'fortran_order': False, 'shape': (4611686018427387904, 4611686018427387904), }",
            &[0; 16],
        );
        assert_eq!(
            read_matrix(&bytes),
            Err(NpyError::ShapeOverflow(vec![
                4_611_686_018_427_387_904,
                4_611_686_018_427_387_904
            ]))
        );
    }

    #[test]
    fn rejects_truncated_data() {
        let bytes = with_header(
            "{'descr': '<f4', 'fortran_order': False, 'shape': (2, 2), }",
            &[0; 12],
        );
        assert_eq!(
            read_matrix(&bytes),
            Err(NpyError::DataLength {
                expected: 16,
                found: 12
            })
        );
    }
}
