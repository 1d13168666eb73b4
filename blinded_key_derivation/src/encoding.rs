//! The textual wire format shared with whatever displays or transports the
//! exchange: lowercase hex with a literal `0x` prefix.

use crate::error::{ProtocolError, Result};

/// The prefix carried by every hex string on the wire.
pub const HEX_PREFIX: &str = "0x";

/// Encodes `bytes` as `0x` followed by two lowercase hex digits per byte.
///
/// An empty slice encodes to `"0x"`.
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(HEX_PREFIX.len() + bytes.len() * 2);
    out.push_str(HEX_PREFIX);
    out.push_str(&hex::encode(bytes));
    out
}

/// Decodes a `0x`-prefixed hex string.
///
/// Upper- and lowercase digits are accepted. The digit count must be even.
///
/// # Errors
/// Returns [MalformedEncoding](ProtocolError::MalformedEncoding) when the
/// prefix is missing, a digit is invalid, or the digit count is odd.
pub fn hex_to_bytes(s: &str) -> Result<Vec<u8>> {
    let digits = strip_prefix(s)?;
    Ok(hex::decode(digits)?)
}

/// Decodes a `0x`-prefixed hex string into exactly 32 bytes, left-padding
/// shorter values with zeros so `0x01` and `0x00..01` denote the same number.
///
/// An odd number of digits is allowed here, since a big-endian number does not
/// need a leading zero nibble.
pub(crate) fn hex_to_be32(s: &str) -> Result<[u8; 32]> {
    let digits = strip_prefix(s)?;
    if digits.is_empty() || digits.len() > 64 {
        return Err(ProtocolError::MalformedEncoding);
    }
    let mut padded = [b'0'; 64];
    padded[64 - digits.len()..].copy_from_slice(digits.as_bytes());
    let mut out = [0u8; 32];
    hex::decode_to_slice(padded, &mut out)?;
    Ok(out)
}

fn strip_prefix(s: &str) -> Result<&str> {
    s.strip_prefix(HEX_PREFIX)
        .ok_or(ProtocolError::MalformedEncoding)
}
