//! Byte strings as written in lease files.
//!
//! `dhcpd` writes opaque identifiers either as a quoted string where
//! non-printable bytes are `\NNN` octal escapes, or as colon-separated hex
//! octets. Both forms decode to raw bytes here.

use crate::error::OctalDecodeError;

/// Length of the digit run following a backslash.
const ESCAPE_DIGITS: usize = 3;

/// Decodes a quoted, octal-escaped string literal into raw bytes.
///
/// `literal` is the string token text with its surrounding quotes. A `\`
/// must be followed by exactly three octal digits whose value fits in a byte;
/// every other byte is copied as-is.
///
/// # Errors
///
/// - [`OctalDecodeError::Unquoted`] if the text is not wrapped in `"`
/// - [`OctalDecodeError::Truncated`] if fewer than three characters follow a `\`
/// - [`OctalDecodeError::InvalidEscape`] if they are not an octal byte value
///
/// # Example
///
/// ```
/// let bytes = dhcpd_leases::octal::decode(r#""\001ab""#).unwrap();
/// assert_eq!(bytes, [1, b'a', b'b']);
/// ```
pub fn decode(literal: &str) -> Result<Vec<u8>, OctalDecodeError> {
    let inner = literal
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .ok_or(OctalDecodeError::Unquoted)?
        .as_bytes();

    let mut out = Vec::with_capacity(inner.len());
    let mut index = 0;
    while let Some(&byte) = inner.get(index) {
        if byte != b'\\' {
            out.push(byte);
            index += 1;
            continue;
        }

        let digits = inner
            .get(index + 1..index + 1 + ESCAPE_DIGITS)
            .ok_or(OctalDecodeError::Truncated { offset: index })?;
        let value = octal_byte(digits).ok_or_else(|| OctalDecodeError::InvalidEscape {
            offset: index,
            sequence: String::from_utf8_lossy(digits).into_owned(),
        })?;
        out.push(value);
        index += 1 + ESCAPE_DIGITS;
    }
    Ok(out)
}

fn octal_byte(digits: &[u8]) -> Option<u8> {
    let value = digits.iter().try_fold(0u16, |value, &digit| {
        matches!(digit, b'0'..=b'7').then(|| value * 8 + u16::from(digit - b'0'))
    })?;
    u8::try_from(value).ok()
}

/// Parses colon-separated hex octets (`01:0a:ff`) into raw bytes.
///
/// Each octet is one or two hex digits, as `dhcpd` does not zero-pad.
/// Returns `None` if any octet is malformed.
pub fn parse_hex(text: &str) -> Option<Vec<u8>> {
    text.split(':')
        .map(|octet| {
            if octet.is_empty()
                || octet.len() > 2
                || !octet.bytes().all(|digit| digit.is_ascii_hexdigit())
            {
                return None;
            }
            u8::from_str_radix(octet, 16).ok()
        })
        .collect()
}

/// Encodes bytes as lowercase colon-separated hex octets.
pub fn encode_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect::<Vec<_>>()
        .join(":")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_hex(bytes: &[u8]) -> String {
        bytes.iter().map(|byte| format!("{:02x}", byte)).collect()
    }

    #[test]
    fn test_decode_duid_fixture() {
        let input = r#""\276\257\244\320\000\003\000\001 \311\320\244\257\276""#;
        let bytes = decode(input).unwrap();
        assert_eq!(to_hex(&bytes), "beafa4d00003000120c9d0a4afbe");
        assert_eq!(bytes.len(), 14);
    }

    #[test]
    fn test_decode_plain_text() {
        assert_eq!(decode("\"MSFT 5.0\"").unwrap(), b"MSFT 5.0");
        assert!(decode("\"\"").unwrap().is_empty());
    }

    #[test]
    fn test_truncated_escape() {
        assert_eq!(
            decode(r#""\27""#),
            Err(OctalDecodeError::Truncated { offset: 0 })
        );
        assert_eq!(
            decode(r#""ab\""#),
            Err(OctalDecodeError::Truncated { offset: 2 })
        );
    }

    #[test]
    fn test_invalid_escape() {
        assert_eq!(
            decode(r#""\298""#),
            Err(OctalDecodeError::InvalidEscape {
                offset: 0,
                sequence: "298".to_string()
            })
        );
        assert!(matches!(
            decode(r#""\+17""#),
            Err(OctalDecodeError::InvalidEscape { .. })
        ));
    }

    #[test]
    fn test_escape_must_fit_in_byte() {
        assert_eq!(decode(r#""\377""#).unwrap(), [0xff]);
        assert!(matches!(
            decode(r#""\400""#),
            Err(OctalDecodeError::InvalidEscape { .. })
        ));
    }

    #[test]
    fn test_unquoted() {
        assert_eq!(decode("abc"), Err(OctalDecodeError::Unquoted));
        assert_eq!(decode("\""), Err(OctalDecodeError::Unquoted));
        assert_eq!(decode(""), Err(OctalDecodeError::Unquoted));
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(
            parse_hex("1:0:c:29:a8:92:f4"),
            Some(vec![1, 0, 0x0c, 0x29, 0xa8, 0x92, 0xf4])
        );
        assert_eq!(parse_hex("00:11:FF"), Some(vec![0, 0x11, 0xff]));
        assert_eq!(parse_hex("00::11"), None);
        assert_eq!(parse_hex("001:11"), None);
        assert_eq!(parse_hex("zz"), None);
        assert_eq!(parse_hex("+1:+2"), None);
        assert_eq!(parse_hex("1:-0"), None);
    }

    #[test]
    fn test_encode_hex() {
        assert_eq!(encode_hex(&[0x20, 0xc9, 0x0a]), "20:c9:0a");
        assert_eq!(encode_hex(&[]), "");
    }
}
