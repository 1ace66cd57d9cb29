//! Little-endian column pages.
//!
//! One page holds one column's values for one cluster of rows:
//!
//! ```text
//! magic "TPAG" | version u8 | type code u8 | rows u32 LE | values (LE, packed)
//! ```
//!
//! No compression, no alignment padding.

use std::error::Error;
use std::fmt;
use std::ops::Range;

use tether_core::{AdoptError, Element, ElementType};

use crate::column::{ColumnBuf, ColumnData, ColumnElement};

/// Magic bytes at the start of every page.
pub const PAGE_MAGIC: [u8; 4] = *b"TPAG";

/// Current page format version.
pub const PAGE_VERSION: u8 = 1;

/// Size of the fixed page header in bytes.
pub const PAGE_HEADER_LEN: usize = 10;

/// Errors decoding a page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CodecError {
    /// The page ended early.
    Truncated {
        /// Bytes the page should have.
        needed: usize,
        /// Bytes it has.
        available: usize,
    },
    /// The page does not start with [`PAGE_MAGIC`].
    InvalidMagic,
    /// The page was written by an unknown format version.
    UnsupportedVersion {
        /// The version found.
        found: u8,
    },
    /// The page holds a different element type than the column.
    TypeMismatch {
        /// The column's element type.
        expected: ElementType,
        /// The type code found in the page.
        found: u8,
    },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated { needed, available } => {
                write!(f, "page truncated: need {needed} bytes, have {available}")
            }
            Self::InvalidMagic => write!(f, "invalid page magic"),
            Self::UnsupportedVersion { found } => write!(f, "unsupported page version {found}"),
            Self::TypeMismatch { expected, found } => {
                write!(f, "page type code {found} does not match column type {expected}")
            }
        }
    }
}

impl Error for CodecError {}

// ── Primitive writers ───────────────────────────────────────────

fn write_u8(out: &mut Vec<u8>, v: u8) {
    out.push(v);
}

fn write_u32_le(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

// ── Primitive readers ───────────────────────────────────────────

fn take<'a>(bytes: &mut &'a [u8], n: usize) -> Result<&'a [u8], CodecError> {
    if bytes.len() < n {
        return Err(CodecError::Truncated {
            needed: n,
            available: bytes.len(),
        });
    }
    let (head, tail) = bytes.split_at(n);
    *bytes = tail;
    Ok(head)
}

fn read_u8(bytes: &mut &[u8]) -> Result<u8, CodecError> {
    Ok(take(bytes, 1)?[0])
}

fn read_u32_le(bytes: &mut &[u8]) -> Result<u32, CodecError> {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(take(bytes, 4)?);
    Ok(u32::from_le_bytes(buf))
}

// ── Pages ───────────────────────────────────────────────────────

/// Encode rows `rows` of `data` as one page.
///
/// Callers keep clusters below `u32::MAX` rows.
pub fn encode_page(data: &ColumnData, rows: Range<usize>) -> Result<Vec<u8>, AdoptError> {
    let kind = data.element_type();
    let mut out = Vec::with_capacity(PAGE_HEADER_LEN + rows.len() * kind.itemsize());
    out.extend_from_slice(&PAGE_MAGIC);
    write_u8(&mut out, PAGE_VERSION);
    write_u8(&mut out, kind.code());
    write_u32_le(&mut out, rows.len() as u32);
    each_column!(data, buf => {
        for row in rows {
            buf.get(row)?.write_le(&mut out);
        }
    });
    Ok(out)
}

fn decode_values<T: Element>(body: &[u8], rows: usize) -> Result<Vec<T>, CodecError> {
    let width = T::TYPE.itemsize();
    let needed = rows * width;
    if body.len() < needed {
        return Err(CodecError::Truncated {
            needed: PAGE_HEADER_LEN + needed,
            available: PAGE_HEADER_LEN + body.len(),
        });
    }
    Ok(body[..needed]
        .chunks_exact(width)
        .filter_map(T::read_le)
        .collect())
}

fn append<T: ColumnElement>(out: &mut ColumnData, body: &[u8], rows: usize) -> Result<(), CodecError> {
    let values = decode_values::<T>(body, rows)?;
    let found = T::TYPE.code();
    let expected = out.element_type();
    match T::unwrap_mut(out) {
        Some(ColumnBuf::Owned(v)) => {
            v.extend_from_slice(&values);
            Ok(())
        }
        _ => Err(CodecError::TypeMismatch { expected, found }),
    }
}

/// Decode one page and append its values to `out`.
///
/// `out` must be an owned column; the page's type code must match it.
/// Returns the number of rows appended.
pub fn decode_page(page: &[u8], out: &mut ColumnData) -> Result<usize, CodecError> {
    let mut bytes = page;
    if take(&mut bytes, PAGE_MAGIC.len())? != PAGE_MAGIC {
        return Err(CodecError::InvalidMagic);
    }
    let version = read_u8(&mut bytes)?;
    if version != PAGE_VERSION {
        return Err(CodecError::UnsupportedVersion { found: version });
    }
    let code = read_u8(&mut bytes)?;
    let expected = out.element_type();
    let kind = ElementType::from_code(code)
        .filter(|&k| k == expected)
        .ok_or(CodecError::TypeMismatch { expected, found: code })?;
    let rows = read_u32_le(&mut bytes)? as usize;
    for_kind!(kind, T => append::<T>(out, bytes, rows)?);
    Ok(rows)
}
