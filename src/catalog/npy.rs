//! Minimal reader/writer for NumPy `.npy` files holding a 2-D float matrix.
//!
//! Only what the catalog needs: little-endian `f4`/`f8` in C order on read,
//! `<f4` version 1.0 on write.

use ndarray::{Array2, ArrayView2};

const MAGIC: &[u8] = b"\x93NUMPY";
/// Total header length (magic + version + length field + dict) is padded to this.
const HEADER_ALIGN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dtype {
    F32,
    F64,
}

impl Dtype {
    fn size(self) -> usize {
        match self {
            Self::F32 => 4,
            Self::F64 => 8,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
struct Header {
    dtype: Dtype,
    fortran_order: bool,
    shape: Vec<usize>,
}

/// Decode a complete `.npy` file into an `[N, D]` matrix.
///
/// `f8` data is narrowed to `f32`. A 1-D shape of `(0,)` is read as an empty
/// `[0, 0]` matrix, which is what NumPy writes for an empty embedding list.
pub fn decode(bytes: &[u8]) -> Result<Array2<f32>, String> {
    let (header, data) = split_header(bytes)?;

    if header.fortran_order {
        return Err("fortran_order arrays are not supported".into());
    }

    let (rows, cols) = match header.shape.as_slice() {
        [rows, cols] => (*rows, *cols),
        [0] => (0, 0),
        other => return Err(format!("expected a 2-D matrix, found shape {other:?}")),
    };

    let expected_len = rows
        .checked_mul(cols)
        .and_then(|n| n.checked_mul(header.dtype.size()))
        .ok_or_else(|| format!("shape ({rows}, {cols}) overflows"))?;
    if data.len() != expected_len {
        return Err(format!(
            "data section is {} bytes, shape ({rows}, {cols}) needs {expected_len}",
            data.len()
        ));
    }

    let values: Vec<f32> = match header.dtype {
        Dtype::F32 => data
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
        Dtype::F64 => data
            .chunks_exact(8)
            .map(|c| {
                f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]) as f32
            })
            .collect(),
    };

    Array2::from_shape_vec((rows, cols), values).map_err(|e| e.to_string())
}

/// Encode a matrix as a version 1.0 `.npy` file with `<f4` dtype.
pub fn encode(matrix: ArrayView2<'_, f32>) -> Vec<u8> {
    let (rows, cols) = matrix.dim();
    let mut dict = format!(
        "{{'descr': '<f4', 'fortran_order': False, 'shape': ({rows}, {cols}), }}"
    );

    // magic(6) + version(2) + header_len(2) + dict + '\n'
    let unpadded = MAGIC.len() + 2 + 2 + dict.len() + 1;
    let padding = (HEADER_ALIGN - unpadded % HEADER_ALIGN) % HEADER_ALIGN;
    dict.extend(std::iter::repeat(' ').take(padding));
    dict.push('\n');

    let mut out = Vec::with_capacity(MAGIC.len() + 4 + dict.len() + rows * cols * 4);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&(dict.len() as u16).to_le_bytes());
    out.extend_from_slice(dict.as_bytes());
    // `iter()` walks in logical (row-major) order regardless of memory layout.
    for value in matrix.iter() {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

fn split_header(bytes: &[u8]) -> Result<(Header, &[u8]), String> {
    if bytes.len() < MAGIC.len() + 2 || &bytes[..MAGIC.len()] != MAGIC {
        return Err("missing NUMPY magic string".into());
    }
    let major = bytes[MAGIC.len()];
    let rest = &bytes[MAGIC.len() + 2..];

    let (header_len, rest) = match major {
        1 => {
            if rest.len() < 2 {
                return Err("truncated header length".into());
            }
            (u16::from_le_bytes([rest[0], rest[1]]) as usize, &rest[2..])
        }
        2 | 3 => {
            if rest.len() < 4 {
                return Err("truncated header length".into());
            }
            (
                u32::from_le_bytes([rest[0], rest[1], rest[2], rest[3]]) as usize,
                &rest[4..],
            )
        }
        other => return Err(format!("unsupported format version {other}")),
    };

    if rest.len() < header_len {
        return Err("truncated header".into());
    }
    let text = std::str::from_utf8(&rest[..header_len])
        .map_err(|_| "header is not valid UTF-8".to_string())?;

    Ok((parse_header(text)?, &rest[header_len..]))
}

fn parse_header(text: &str) -> Result<Header, String> {
    let descr = quoted_value(text, "descr")?;
    let dtype = match descr {
        "<f4" => Dtype::F32,
        "<f8" => Dtype::F64,
        other => return Err(format!("unsupported dtype '{other}', expected '<f4' or '<f8'")),
    };

    let fortran_order = match raw_value(text, "fortran_order")? {
        v if v.starts_with("True") => true,
        v if v.starts_with("False") => false,
        _ => return Err("fortran_order must be True or False".into()),
    };

    let shape_text = raw_value(text, "shape")?;
    let inner = shape_text
        .strip_prefix('(')
        .and_then(|s| s.split(')').next())
        .ok_or_else(|| "shape must be a tuple".to_string())?;
    let shape = inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<usize>()
                .map_err(|_| format!("invalid shape dimension '{s}'"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Header {
        dtype,
        fortran_order,
        shape,
    })
}

/// Text following `'key':`, with leading whitespace stripped.
fn raw_value<'a>(text: &'a str, key: &str) -> Result<&'a str, String> {
    let needle_single = format!("'{key}'");
    let needle_double = format!("\"{key}\"");
    let start = text
        .find(&needle_single)
        .map(|i| i + needle_single.len())
        .or_else(|| text.find(&needle_double).map(|i| i + needle_double.len()))
        .ok_or_else(|| format!("header is missing '{key}'"))?;
    let after_key = text[start..].trim_start();
    let value = after_key
        .strip_prefix(':')
        .ok_or_else(|| format!("malformed entry for '{key}'"))?;
    Ok(value.trim_start())
}

fn quoted_value<'a>(text: &'a str, key: &str) -> Result<&'a str, String> {
    let value = raw_value(text, key)?;
    let quote = value
        .chars()
        .next()
        .filter(|c| *c == '\'' || *c == '"')
        .ok_or_else(|| format!("'{key}' must be a string"))?;
    let body = &value[1..];
    let end = body
        .find(quote)
        .ok_or_else(|| format!("unterminated string for '{key}'"))?;
    Ok(&body[..end])
}
