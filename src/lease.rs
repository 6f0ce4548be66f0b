//! Lease records produced by the parsers.
//!
//! [`LeaseV4`] mirrors a `lease` block of `dhcpd.leases`; [`LeaseV6`] mirrors
//! an `ia-na`, `ia-ta` or `ia-pd` block of `dhcpd6.leases` together with its
//! `iaaddr`/`iaprefix` sub-blocks. Every field other than the block's
//! address or identity is optional: `None` means the file had no statement
//! for it, which is distinct from an empty value.
//!
//! Records serialize with the lease file's own kebab-case field names, and
//! absent fields are omitted.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::duid::{Duid, IaidDuid};
use crate::octal::encode_hex;

fn serialize_hex<T, S>(bytes: &T, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    T: AsRef<[u8]>,
    S: Serializer,
{
    serializer.serialize_str(&encode_hex(bytes.as_ref()))
}

fn serialize_optional_hex<S>(
    bytes: &Option<Vec<u8>>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match bytes {
        Some(bytes) => serializer.serialize_some(&encode_hex(bytes)),
        None => serializer.serialize_none(),
    }
}

/// A DHCPv4 lease from `dhcpd.leases`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct LeaseV4 {
    /// The leased address from the block header.
    pub ip: Ipv4Addr,

    /// Start of the lease.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starts: Option<DateTime<Utc>>,
    /// End of the lease.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ends: Option<DateTime<Utc>>,
    /// Time the failover peer was told the lease expires.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tstp: Option<DateTime<Utc>>,
    /// Time the failover peer acknowledged the expiry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tsfp: Option<DateTime<Utc>>,
    /// Actual time sent from the failover partner.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub atsfp: Option<DateTime<Utc>>,
    /// Client's last transaction time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cltt: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub binding_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_binding_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rewind_binding_state: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hardware_ethernet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_hostname: Option<String>,
    /// Client identifier (Option 61) bytes.
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_optional_hex"
    )]
    pub uid: Option<Vec<u8>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_class_identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ddns_fwd_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ddns_txt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ddns_rev_name: Option<String>,
}

impl LeaseV4 {
    /// Creates a lease with only its address set.
    pub fn new(ip: Ipv4Addr) -> Self {
        Self {
            ip,
            starts: None,
            ends: None,
            tstp: None,
            tsfp: None,
            atsfp: None,
            cltt: None,
            binding_state: None,
            next_binding_state: None,
            rewind_binding_state: None,
            hardware_ethernet: None,
            client_hostname: None,
            uid: None,
            vendor_class_identifier: None,
            ddns_fwd_name: None,
            ddns_txt: None,
            ddns_rev_name: None,
        }
    }
}

/// Identity association kind of a DHCPv6 lease.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LeaseType {
    /// `ia-ta`
    #[serde(rename = "ia-ta")]
    Temporary,
    /// `ia-na`
    #[serde(rename = "ia-na")]
    NonTemporary,
    /// `ia-pd`
    #[serde(rename = "ia-pd")]
    PrefixDelegation,
}

impl LeaseType {
    /// Returns the block keyword for this lease type.
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Temporary => "ia-ta",
            Self::NonTemporary => "ia-na",
            Self::PrefixDelegation => "ia-pd",
        }
    }
}

impl TryFrom<&str> for LeaseType {
    type Error = ();

    fn try_from(keyword: &str) -> std::result::Result<Self, Self::Error> {
        match keyword {
            "ia-ta" => Ok(Self::Temporary),
            "ia-na" => Ok(Self::NonTemporary),
            "ia-pd" => Ok(Self::PrefixDelegation),
            _ => Err(()),
        }
    }
}

impl fmt::Display for LeaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// An `iaaddr` or `iaprefix` sub-block of a DHCPv6 lease.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct AddressEntry {
    pub ip: Ipv6Addr,
    /// Prefix length, present for delegated prefixes (`iaprefix`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix_len: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binding_state: Option<String>,
    /// Preferred lifetime in seconds.
    pub preferred_life: u32,
    /// Valid lifetime in seconds.
    pub max_life: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ends: Option<DateTime<Utc>>,
}

impl AddressEntry {
    pub fn new(ip: Ipv6Addr, prefix_len: Option<u8>) -> Self {
        Self {
            ip,
            prefix_len,
            binding_state: None,
            preferred_life: 0,
            max_life: 0,
            ends: None,
        }
    }
}

/// A DHCPv6 identity association lease from `dhcpd6.leases`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct LeaseV6 {
    #[serde(rename = "type")]
    pub lease_type: LeaseType,
    /// Identity association ID.
    #[serde(serialize_with = "serialize_hex")]
    pub iaid: [u8; 4],
    /// Client DUID.
    pub duid: Duid,
    /// Client's last transaction time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cltt: Option<DateTime<Utc>>,
    /// Address and prefix entries in file order.
    #[serde(rename = "addrs", skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<AddressEntry>,
}

impl LeaseV6 {
    /// Creates a lease from its header: kind plus decoded identity.
    pub fn new(lease_type: LeaseType, identity: IaidDuid) -> Self {
        Self {
            lease_type,
            iaid: identity.iaid,
            duid: identity.duid,
            cltt: None,
            addresses: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duid::HardwareType;
    use chrono::TimeZone;

    #[test]
    fn test_new_v4_lease_is_empty() {
        let lease = LeaseV4::new(Ipv4Addr::new(10, 0, 0, 5));
        assert_eq!(lease.ip, Ipv4Addr::new(10, 0, 0, 5));
        assert!(lease.starts.is_none());
        assert!(lease.binding_state.is_none());
        assert!(lease.uid.is_none());
    }

    #[test]
    fn test_v4_serialization_omits_absent_fields() {
        let mut lease = LeaseV4::new(Ipv4Addr::new(10, 0, 0, 5));
        lease.binding_state = Some("active".to_string());
        lease.client_hostname = Some(String::new());
        lease.uid = Some(vec![1, 0x00, 0x11, 0xaa]);
        lease.starts = Some(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap());

        let json = serde_json::to_value(&lease).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "ip": "10.0.0.5",
                "starts": "2023-01-01T00:00:00Z",
                "binding-state": "active",
                "client-hostname": "",
                "uid": "01:00:11:aa",
            })
        );
    }

    #[test]
    fn test_lease_type_keywords() {
        for keyword in ["ia-na", "ia-ta", "ia-pd"] {
            let lease_type = LeaseType::try_from(keyword).unwrap();
            assert_eq!(lease_type.to_string(), keyword);
        }
        assert!(LeaseType::try_from("lease").is_err());
    }

    #[test]
    fn test_v6_serialization() {
        let identity = IaidDuid {
            iaid: [0xbe, 0xaf, 0xa4, 0xd0],
            duid: Duid::Ll {
                hardware_type: HardwareType::ETHERNET,
                hardware_address: "20:c9:d0:a4:af:be".to_string(),
            },
        };
        let mut lease = LeaseV6::new(LeaseType::PrefixDelegation, identity);
        lease
            .addresses
            .push(AddressEntry::new("2001:db8:1::".parse().unwrap(), Some(64)));

        let json = serde_json::to_value(&lease).unwrap();
        assert_eq!(json["type"], "ia-pd");
        assert_eq!(json["iaid"], "be:af:a4:d0");
        assert_eq!(json["duid"]["type"], "ll");
        assert_eq!(json["addrs"][0]["ip"], "2001:db8:1::");
        assert_eq!(json["addrs"][0]["prefix-len"], 64);
        assert_eq!(json["addrs"][0]["max-life"], 0);
        assert!(json.get("cltt").is_none());
    }
}
