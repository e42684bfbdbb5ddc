//! Modified UTF-8, as used by length-prefixed string fields.
//!
//! Each UTF-16 code unit is encoded separately: `U+0001..=U+007F` in one
//! byte, `U+0000` and `U+0080..=U+07FF` in two, everything else
//! (surrogate halves included) in three.

use crate::error::AccessError;

/// Longest encoded body a `u16` length prefix can describe.
pub(crate) const MAX_ENCODED_LEN: usize = u16::MAX as usize;

fn unit_len(unit: u16) -> usize {
    match unit {
        0x0001..=0x007F => 1,
        0x0000 | 0x0080..=0x07FF => 2,
        _ => 3,
    }
}

/// Encoded length of `s`, rejecting strings over [`MAX_ENCODED_LEN`].
pub(crate) fn encoded_len(s: &str) -> Result<u16, AccessError> {
    let len: usize = s.encode_utf16().map(unit_len).sum();
    if len > MAX_ENCODED_LEN {
        return Err(AccessError::utf(format!("encoded string too long: {len} bytes")));
    }
    Ok(len as u16)
}

/// Encode `s` without the length prefix.
pub(crate) fn encode(s: &str) -> Result<Vec<u8>, AccessError> {
    let mut out = Vec::with_capacity(encoded_len(s)? as usize);
    for unit in s.encode_utf16() {
        match unit_len(unit) {
            1 => out.push(unit as u8),
            2 => {
                out.push(0xC0 | ((unit >> 6) & 0x1F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | ((unit >> 12) & 0x0F) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    Ok(out)
}

fn continuation(bytes: &[u8], at: usize) -> Result<u16, AccessError> {
    match bytes.get(at) {
        Some(&b) if b & 0xC0 == 0x80 => Ok(u16::from(b & 0x3F)),
        Some(&b) => Err(AccessError::utf(format!(
            "malformed input around byte {at}: 0x{b:02x}"
        ))),
        None => Err(AccessError::utf("partial character at end of input")),
    }
}

/// Decode a body produced by [`encode`].
pub(crate) fn decode(bytes: &[u8]) -> Result<String, AccessError> {
    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match b >> 4 {
            0x0..=0x7 => {
                units.push(u16::from(b));
                i += 1;
            }
            0xC | 0xD => {
                let low = continuation(bytes, i + 1)?;
                units.push((u16::from(b & 0x1F) << 6) | low);
                i += 2;
            }
            0xE => {
                let mid = continuation(bytes, i + 1)?;
                let low = continuation(bytes, i + 2)?;
                units.push((u16::from(b & 0x0F) << 12) | (mid << 6) | low);
                i += 3;
            }
            _ => {
                return Err(AccessError::utf(format!(
                    "malformed input around byte {i}: 0x{b:02x}"
                )))
            }
        }
    }
    String::from_utf16(&units).map_err(|e| AccessError::utf(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nul_takes_two_bytes() {
        assert_eq!(encode("\0").unwrap(), vec![0xC0, 0x80]);
        assert_eq!(decode(&[0xC0, 0x80]).unwrap(), "\0");
    }

    #[test]
    fn supplementary_characters_use_surrogate_pairs() {
        let s = "\u{1F600}";
        assert_eq!(encoded_len(s).unwrap(), 6);
        assert_eq!(decode(&encode(s).unwrap()).unwrap(), s);
    }

    #[test]
    fn mixed_widths() {
        let s = "aé€";
        assert_eq!(encoded_len(s).unwrap(), 1 + 2 + 3);
        assert_eq!(decode(&encode(s).unwrap()).unwrap(), s);
    }

    #[test]
    fn too_long_is_rejected() {
        let s = "é".repeat(MAX_ENCODED_LEN / 2 + 1);
        assert!(matches!(encoded_len(&s), Err(AccessError::Utf { .. })));
    }

    #[test]
    fn longest_encodable_string() {
        let s = "a".repeat(MAX_ENCODED_LEN);
        assert_eq!(encoded_len(&s).unwrap(), u16::MAX);
        let over = "a".repeat(MAX_ENCODED_LEN + 1);
        assert!(encoded_len(&over).is_err());
    }

    #[test]
    fn malformed_input_is_rejected() {
        assert!(decode(&[0x80]).is_err());
        assert!(decode(&[0xC3]).is_err());
        assert!(decode(&[0xE2, 0x82, 0x41]).is_err());
        // A lone high surrogate.
        assert!(decode(&[0xED, 0xA0, 0x80]).is_err());
    }
}
