//! TLV primitives
//!
//! Every wire structure in this crate is a sequence of `type | length | value`
//! triples. Type and length are VAR-NUMBERs:
//!
//! ```text
//! 0..=252      -> 1 byte
//! 253 + u16 BE -> values up to 0xFFFF
//! 254 + u32 BE -> values up to 0xFFFF_FFFF
//! 255 + u64 BE -> everything else
//! ```
//!
//! Natural-number fields are NonNegativeIntegers: the shortest of 1, 2, 4 or 8
//! big-endian bytes.

use bytes::{Buf, BufMut};

/// Errors raised while decoding wire structures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("unexpected end of input while reading {0}")]
    Truncated(&'static str),
    #[error("field {typ:#x} declares {length} bytes but only {remaining} remain")]
    Overrun {
        typ: u64,
        length: u64,
        remaining: usize,
    },
    #[error("expected type {expected:#x}, found {found:#x}")]
    UnexpectedType { expected: u64, found: u64 },
    #[error("missing required field {0:#x}")]
    MissingField(u64),
    #[error("unrecognized critical field {0:#x}")]
    UnknownCritical(u64),
    #[error("natural number cannot be {0} bytes long")]
    InvalidNatural(usize),
    #[error("field {0:#x} is not valid utf-8")]
    InvalidUtf8(u64),
    #[error("message carries no known variant")]
    EmptyMessage,
    #[error("message carries more than one variant")]
    AmbiguousMessage,
    #[error("trailing bytes after {0}")]
    TrailingBytes(&'static str),
    #[error("invalid {0}")]
    Invalid(&'static str),
}

/// Whether an unrecognized field of this type must abort parsing.
pub fn is_critical(typ: u64) -> bool {
    typ <= 31 || typ % 2 == 1
}

/// Encoded size of a VAR-NUMBER
pub fn var_number_len(value: u64) -> usize {
    match value {
        0..=252 => 1,
        253..=0xFFFF => 3,
        0x1_0000..=0xFFFF_FFFF => 5,
        _ => 9,
    }
}

pub fn write_var_number<B: BufMut>(buf: &mut B, value: u64) {
    match value {
        0..=252 => buf.put_u8(value as u8),
        253..=0xFFFF => {
            buf.put_u8(253);
            buf.put_u16(value as u16);
        }
        0x1_0000..=0xFFFF_FFFF => {
            buf.put_u8(254);
            buf.put_u32(value as u32);
        }
        _ => {
            buf.put_u8(255);
            buf.put_u64(value);
        }
    }
}

pub fn read_var_number(buf: &mut &[u8], what: &'static str) -> Result<u64, WireError> {
    if !buf.has_remaining() {
        return Err(WireError::Truncated(what));
    }
    let first = buf.get_u8();
    let width = match first {
        253 => 2,
        254 => 4,
        255 => 8,
        _ => return Ok(first as u64),
    };
    if buf.remaining() < width {
        return Err(WireError::Truncated(what));
    }
    Ok(match width {
        2 => buf.get_u16() as u64,
        4 => buf.get_u32() as u64,
        _ => buf.get_u64(),
    })
}

/// Encoded size of a NonNegativeInteger
pub fn natural_len(value: u64) -> usize {
    match value {
        0..=0xFF => 1,
        0x100..=0xFFFF => 2,
        0x1_0000..=0xFFFF_FFFF => 4,
        _ => 8,
    }
}

pub fn write_natural<B: BufMut>(buf: &mut B, value: u64) {
    match natural_len(value) {
        1 => buf.put_u8(value as u8),
        2 => buf.put_u16(value as u16),
        4 => buf.put_u32(value as u32),
        _ => buf.put_u64(value),
    }
}

pub fn read_natural(mut value: &[u8]) -> Result<u64, WireError> {
    Ok(match value.len() {
        1 => value.get_u8() as u64,
        2 => value.get_u16() as u64,
        4 => value.get_u32() as u64,
        8 => value.get_u64(),
        n => return Err(WireError::InvalidNatural(n)),
    })
}

/// Write a complete `type | length | value` triple
pub fn write_tlv<B: BufMut>(buf: &mut B, typ: u64, value: &[u8]) {
    write_var_number(buf, typ);
    write_var_number(buf, value.len() as u64);
    buf.put_slice(value);
}

pub fn write_natural_tlv<B: BufMut>(buf: &mut B, typ: u64, value: u64) {
    write_var_number(buf, typ);
    write_var_number(buf, natural_len(value) as u64);
    write_natural(buf, value);
}

/// Sequential reader over the fields of one TLV value
#[derive(Debug, Clone)]
pub struct TlvReader<'a> {
    buf: &'a [u8],
}

impl<'a> TlvReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Read the next field as `(type, value)`
    pub fn next_field(&mut self) -> Result<Option<(u64, &'a [u8])>, WireError> {
        if self.buf.is_empty() {
            return Ok(None);
        }
        let typ = read_var_number(&mut self.buf, "type")?;
        let length = read_var_number(&mut self.buf, "length")?;
        if length > self.buf.len() as u64 {
            return Err(WireError::Overrun {
                typ,
                length,
                remaining: self.buf.len(),
            });
        }
        let (value, rest) = self.buf.split_at(length as usize);
        self.buf = rest;
        Ok(Some((typ, value)))
    }

    /// Read exactly one field of the expected type and require nothing after it
    pub fn expect_single(mut self, expected: u64, what: &'static str) -> Result<&'a [u8], WireError> {
        let (typ, value) = self.next_field()?.ok_or(WireError::Truncated(what))?;
        if typ != expected {
            return Err(WireError::UnexpectedType {
                expected,
                found: typ,
            });
        }
        if !self.is_empty() {
            return Err(WireError::TrailingBytes(what));
        }
        Ok(value)
    }
}

/// Decide what to do with a field the parser does not recognize
pub(crate) fn skip_unknown(typ: u64, ignore_critical: bool) -> Result<(), WireError> {
    if is_critical(typ) && !ignore_critical {
        tracing::debug!(typ, "rejecting unrecognized critical field");
        return Err(WireError::UnknownCritical(typ));
    }
    Ok(())
}

pub(crate) fn required<T>(field: Option<T>, typ: u64) -> Result<T, WireError> {
    field.ok_or(WireError::MissingField(typ))
}
