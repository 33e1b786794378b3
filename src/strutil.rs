//! Byte cursor and string utilities (Component A).
//!
//! Small, dependency-free parsing helpers shared by the rest of the crate:
//! fixed-base unsigned integer parsing and HTTP whitespace trimming.

use crate::error::Error;

/// Parses a left-to-right sequence of base-10 ASCII digits into a `u64`.
///
/// Fails with [`Kind::InvalidArgument`](crate::error::Kind::InvalidArgument)
/// on empty input or a non-digit byte, and with
/// [`Kind::OverflowDetected`](crate::error::Kind::OverflowDetected) if the
/// value would not fit in a `u64`.
pub fn read_unsigned_num(bytes: &[u8]) -> Result<u64, Error> {
    read_unsigned(bytes, 10, digit_value)
}

/// Parses a left-to-right sequence of base-16 ASCII digits (either case)
/// into a `u64`, with the same failure modes as [`read_unsigned_num`].
pub fn read_unsigned_hex(bytes: &[u8]) -> Result<u64, Error> {
    read_unsigned(bytes, 16, hex_digit_value)
}

fn read_unsigned(
    bytes: &[u8],
    base: u64,
    digit_value: impl Fn(u8) -> Option<u64>,
) -> Result<u64, Error> {
    if bytes.is_empty() {
        return Err(Error::new_invalid_argument());
    }

    let mut value: u64 = 0;
    for &byte in bytes {
        let digit = digit_value(byte).ok_or_else(Error::new_invalid_argument)?;

        let prev = value;
        value = value
            .checked_mul(base)
            .ok_or_else(Error::new_overflow)?;
        value = value.checked_add(digit).ok_or_else(Error::new_overflow)?;
        if value < prev {
            // Can't actually happen given the checked ops above, but mirrors
            // the overflow check the original C implementation performs
            // after every multiply and every add.
            return Err(Error::new_overflow());
        }
    }

    Ok(value)
}

fn digit_value(byte: u8) -> Option<u64> {
    match byte {
        b'0'..=b'9' => Some((byte - b'0') as u64),
        _ => None,
    }
}

fn hex_digit_value(byte: u8) -> Option<u64> {
    match byte {
        b'0'..=b'9' => Some((byte - b'0') as u64),
        b'a'..=b'f' => Some((byte - b'a' + 10) as u64),
        b'A'..=b'F' => Some((byte - b'A' + 10) as u64),
        _ => None,
    }
}

fn is_http_whitespace(byte: u8) -> bool {
    byte == b' ' || byte == b'\t'
}

/// Trims leading and trailing `SP`/`HT` bytes from `bytes`, returning a
/// sub-slice. Idempotent: trimming an already-trimmed slice is a no-op.
pub fn trim_http_whitespace(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|&b| !is_http_whitespace(b))
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|&b| !is_http_whitespace(b))
        .map_or(start, |i| i + 1);
    &bytes[start..end]
}
