//! DHCPv6 Unique Identifiers per RFC 3315 §9.
//!
//! A `dhcpd6` lease header carries the identity association as one opaque
//! byte string: a 4-byte IAID followed by the client DUID. The DUID begins
//! with a 2-byte big-endian type code selecting one of three layouts:
//!
//! ```text
//! DUID-LLT (1): | type (2) | hardware type (2) | time (4) | link-layer address |
//! DUID-EN  (2): | type (2) | enterprise number (4) | identifier             |
//! DUID-LL  (3): | type (2) | hardware type (2) | link-layer address         |
//! ```
//!
//! # References
//!
//! - RFC 3315 §9: DHCP Unique Identifier (DUID)
//! - RFC 3315 §22.4: Identity Association for Non-temporary Addresses Option

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::error::DuidDecodeError;
use crate::octal::encode_hex;

/// Length of the IAID prefix in a lease header.
const IAID_SIZE: usize = 4;

/// DUID-LLT time base, as days since the Unix epoch (2000-12-30).
///
/// This is the value `dhcpd` lease consumers have historically decoded
/// against, kept so timestamps match existing tooling.
const DUID_EPOCH_DAYS_SINCE_UNIX: i64 = 11_321;

/// DUID type codes (RFC 3315 §9.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u16)]
pub enum DuidType {
    /// Link-layer address plus time.
    Llt = 1,
    /// Vendor-assigned unique ID based on enterprise number.
    En = 2,
    /// Link-layer address.
    Ll = 3,
}

impl TryFrom<u16> for DuidType {
    type Error = u16;

    fn try_from(value: u16) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Llt),
            2 => Ok(Self::En),
            3 => Ok(Self::Ll),
            other => Err(other),
        }
    }
}

impl fmt::Display for DuidType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Llt => write!(f, "DUID-LLT"),
            Self::En => write!(f, "DUID-EN"),
            Self::Ll => write!(f, "DUID-LL"),
        }
    }
}

/// IANA hardware type code (RFC 826 `ar$hrd` values).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct HardwareType(pub u16);

impl HardwareType {
    pub const ETHERNET: Self = Self(1);
}

/// A decoded DUID. Exactly one layout is populated by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Duid {
    Llt {
        #[serde(rename = "hwtype")]
        hardware_type: HardwareType,
        time: DateTime<Utc>,
        #[serde(rename = "hwaddr")]
        hardware_address: String,
    },
    En {
        #[serde(rename = "en")]
        enterprise_number: u32,
        /// Vendor-defined identifier, rendered like a hardware address since
        /// some vendors (HP JetDirect) put a MAC here.
        #[serde(rename = "hwaddr")]
        identifier: String,
    },
    Ll {
        #[serde(rename = "hwtype")]
        hardware_type: HardwareType,
        #[serde(rename = "hwaddr")]
        hardware_address: String,
    },
}

impl Duid {
    /// Decodes a DUID from its wire bytes, starting at the type code.
    ///
    /// # Errors
    ///
    /// - [`DuidDecodeError::UnknownType`] for type codes other than 1, 2 and 3
    /// - [`DuidDecodeError::UnsupportedHardwareType`] for non-Ethernet DUID-LL
    /// - [`DuidDecodeError::Truncated`] if a fixed-size field is cut short
    pub fn decode(bytes: &[u8]) -> Result<Self, DuidDecodeError> {
        let (type_code, rest) = take::<2>(bytes, "DUID type")?;
        let duid_type = DuidType::try_from(u16::from_be_bytes(type_code))
            .map_err(DuidDecodeError::UnknownType)?;

        match duid_type {
            DuidType::Llt => {
                let (hardware_type, rest) = take::<2>(rest, "DUID-LLT hardware type")?;
                let (seconds, rest) = take::<4>(rest, "DUID-LLT time")?;
                Ok(Self::Llt {
                    hardware_type: HardwareType(u16::from_be_bytes(hardware_type)),
                    time: duid_epoch() + TimeDelta::seconds(i64::from(u32::from_be_bytes(seconds))),
                    hardware_address: encode_hex(rest),
                })
            }
            DuidType::En => {
                let (enterprise_number, rest) = take::<4>(rest, "DUID-EN enterprise number")?;
                Ok(Self::En {
                    enterprise_number: u32::from_be_bytes(enterprise_number),
                    identifier: encode_hex(rest),
                })
            }
            DuidType::Ll => {
                let (hardware_type, rest) = take::<2>(rest, "DUID-LL hardware type")?;
                let hardware_type = HardwareType(u16::from_be_bytes(hardware_type));
                if hardware_type != HardwareType::ETHERNET {
                    return Err(DuidDecodeError::UnsupportedHardwareType(hardware_type.0));
                }
                Ok(Self::Ll {
                    hardware_type,
                    hardware_address: encode_hex(rest),
                })
            }
        }
    }

    /// Returns the type code of the populated layout.
    pub fn duid_type(&self) -> DuidType {
        match self {
            Self::Llt { .. } => DuidType::Llt,
            Self::En { .. } => DuidType::En,
            Self::Ll { .. } => DuidType::Ll,
        }
    }

    /// Returns the link-layer address for LLT and LL DUIDs.
    pub fn hardware_address(&self) -> Option<&str> {
        match self {
            Self::Llt {
                hardware_address, ..
            }
            | Self::Ll {
                hardware_address, ..
            } => Some(hardware_address),
            Self::En { .. } => None,
        }
    }
}

/// The identity association of a DHCPv6 lease: IAID plus client DUID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IaidDuid {
    pub iaid: [u8; IAID_SIZE],
    pub duid: Duid,
}

impl IaidDuid {
    /// Splits a lease header byte string into IAID and DUID and decodes the DUID.
    pub fn decode(bytes: &[u8]) -> Result<Self, DuidDecodeError> {
        let (iaid, rest) = take::<IAID_SIZE>(bytes, "IAID")?;
        Ok(Self {
            iaid,
            duid: Duid::decode(rest)?,
        })
    }
}

fn take<'a, const N: usize>(
    bytes: &'a [u8],
    field: &'static str,
) -> Result<([u8; N], &'a [u8]), DuidDecodeError> {
    bytes
        .split_first_chunk::<N>()
        .map(|(head, rest)| (*head, rest))
        .ok_or(DuidDecodeError::Truncated {
            field,
            needed: N,
            available: bytes.len(),
        })
}

fn duid_epoch() -> DateTime<Utc> {
    DateTime::UNIX_EPOCH + TimeDelta::days(DUID_EPOCH_DAYS_SINCE_UNIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::octal;
    use chrono::NaiveDate;

    const FIXTURE: &str = r#""\276\257\244\320\000\003\000\001 \311\320\244\257\276""#;

    #[test]
    fn test_epoch_is_2000_12_30() {
        let expected = NaiveDate::from_ymd_opt(2000, 12, 30)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc();
        assert_eq!(duid_epoch(), expected);
    }

    #[test]
    fn test_decode_fixture_ll() {
        let bytes = octal::decode(FIXTURE).unwrap();
        let decoded = IaidDuid::decode(&bytes).unwrap();

        assert_eq!(decoded.iaid, [0xbe, 0xaf, 0xa4, 0xd0]);
        assert_eq!(decoded.duid.duid_type(), DuidType::Ll);
        assert_eq!(
            decoded.duid,
            Duid::Ll {
                hardware_type: HardwareType::ETHERNET,
                hardware_address: "20:c9:d0:a4:af:be".to_string(),
            }
        );
        assert_eq!(decoded.duid.hardware_address(), Some("20:c9:d0:a4:af:be"));
    }

    #[test]
    fn test_decode_llt() {
        let bytes = [
            0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x0e, 0x10, 0x00, 0x0c, 0x29, 0x54, 0x9c, 0xed,
        ];
        let duid = Duid::decode(&bytes).unwrap();
        let Duid::Llt {
            hardware_type,
            time,
            hardware_address,
        } = duid
        else {
            panic!("expected DUID-LLT, got {:?}", duid);
        };
        assert_eq!(hardware_type, HardwareType::ETHERNET);
        assert_eq!(time, duid_epoch() + TimeDelta::hours(1));
        assert_eq!(hardware_address, "00:0c:29:54:9c:ed");
    }

    #[test]
    fn test_decode_en() {
        let bytes = [0x00, 0x02, 0x00, 0x00, 0x00, 0x0b, 0x00, 0x1b, 0x78, 0xaa];
        let duid = Duid::decode(&bytes).unwrap();
        assert_eq!(
            duid,
            Duid::En {
                enterprise_number: 11,
                identifier: "00:1b:78:aa".to_string(),
            }
        );
        assert_eq!(duid.duid_type().to_string(), "DUID-EN");
        assert_eq!(duid.hardware_address(), None);
    }

    #[test]
    fn test_unknown_type() {
        assert_eq!(
            Duid::decode(&[0x00, 0x04, 0x00, 0x01]),
            Err(DuidDecodeError::UnknownType(4))
        );
    }

    #[test]
    fn test_unsupported_hardware_type() {
        assert_eq!(
            Duid::decode(&[0x00, 0x03, 0x00, 0x06, 0xaa]),
            Err(DuidDecodeError::UnsupportedHardwareType(6))
        );
    }

    #[test]
    fn test_truncated_fields() {
        assert_eq!(
            IaidDuid::decode(&[0x01, 0x02]),
            Err(DuidDecodeError::Truncated {
                field: "IAID",
                needed: 4,
                available: 2
            })
        );
        assert!(matches!(
            IaidDuid::decode(&[0, 0, 0, 1]),
            Err(DuidDecodeError::Truncated { field: "DUID type", .. })
        ));
        assert!(matches!(
            Duid::decode(&[0x00, 0x01, 0x00, 0x01, 0x00]),
            Err(DuidDecodeError::Truncated { field: "DUID-LLT time", .. })
        ));
        assert!(matches!(
            Duid::decode(&[0x00, 0x02, 0x00]),
            Err(DuidDecodeError::Truncated { .. })
        ));
    }

    #[test]
    fn test_serialize_tagged() {
        let duid = Duid::Ll {
            hardware_type: HardwareType::ETHERNET,
            hardware_address: "20:c9:d0:a4:af:be".to_string(),
        };
        let json = serde_json::to_value(&duid).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "ll", "hwtype": 1, "hwaddr": "20:c9:d0:a4:af:be"})
        );

        let duid = Duid::En {
            enterprise_number: 11,
            identifier: "00:1b:78:aa".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&duid).unwrap(),
            serde_json::json!({"type": "en", "en": 11, "hwaddr": "00:1b:78:aa"})
        );
    }
}
