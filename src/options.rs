//! Lease statements as typed options.
//!
//! Each recognized field statement inside a lease block becomes one option
//! value carrying the parsed field. Applying an option to the record under
//! construction is the only way a field gets set, so each field's handling is
//! written once no matter where its statement appears in the block.
//!
//! # Statement Forms
//!
//! ```text
//! starts 3 2023/01/01 00:00:00;          timestamp: weekday, date, time (UTC)
//! ends never;                            timestamp: leaves the field unset
//! cltt epoch 1672531200;                 timestamp: seconds since the Unix epoch
//! binding state active;                  string
//! uid "\001\000\021ab";                  bytes: octal-escaped string or colon hex
//! set ddns-fwd-name = "host.example.";   string assigned with `set`
//! ```
//!
//! Statements this module does not recognize yield `None` and are ignored by
//! the parser.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{Error, Result};
use crate::lease::{AddressEntry, LeaseV4, LeaseV6};
use crate::lexer::{Token, TokenKind};
use crate::octal;

const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

pub(crate) fn invalid(keyword: &Token, values: &[Token]) -> Error {
    Error::InvalidValue {
        position: keyword.position,
        field: keyword.text.clone(),
        value: words(values).join(" "),
    }
}

fn words(values: &[Token]) -> Vec<&str> {
    values.iter().map(|token| token.text.as_str()).collect()
}

/// Parses the value of a timestamp statement.
///
/// The weekday is informational and only checked to be a number.
fn timestamp(keyword: &Token, values: &[Token]) -> Result<Option<DateTime<Utc>>> {
    match words(values).as_slice() {
        ["never"] => Ok(None),
        ["epoch", seconds] => seconds
            .parse::<i64>()
            .ok()
            .and_then(|seconds| DateTime::from_timestamp(seconds, 0))
            .map(Some)
            .ok_or_else(|| invalid(keyword, values)),
        [weekday, date, time] => {
            weekday
                .parse::<u8>()
                .map_err(|_| invalid(keyword, values))?;
            NaiveDateTime::parse_from_str(&format!("{} {}", date, time), TIMESTAMP_FORMAT)
                .map(|timestamp| Some(timestamp.and_utc()))
                .map_err(|_| invalid(keyword, values))
        }
        _ => Err(invalid(keyword, values)),
    }
}

/// Parses a string value; quoted values are unescaped.
fn text(value: &Token) -> Result<String> {
    match value.kind {
        TokenKind::String => octal::decode(&value.text)
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .map_err(|source| Error::Octal {
                position: value.position,
                source,
            }),
        _ => Ok(value.text.clone()),
    }
}

/// Parses a byte-string value: a quoted octal-escaped string or colon hex.
pub(crate) fn bytes(keyword: &Token, value: &Token) -> Result<Vec<u8>> {
    match value.kind {
        TokenKind::String => octal::decode(&value.text).map_err(|source| Error::Octal {
            position: value.position,
            source,
        }),
        _ => octal::parse_hex(&value.text)
            .ok_or_else(|| invalid(keyword, std::slice::from_ref(value))),
    }
}

fn integer(keyword: &Token, values: &[Token]) -> Result<u32> {
    match values {
        [value] => value
            .text
            .parse()
            .map_err(|_| invalid(keyword, values)),
        _ => Err(invalid(keyword, values)),
    }
}

/// A field statement of a `dhcpd.leases` lease block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum V4Option {
    Starts(DateTime<Utc>),
    Ends(DateTime<Utc>),
    Tstp(DateTime<Utc>),
    Tsfp(DateTime<Utc>),
    Atsfp(DateTime<Utc>),
    Cltt(DateTime<Utc>),
    BindingState(String),
    NextBindingState(String),
    RewindBindingState(String),
    HardwareEthernet(String),
    ClientHostname(String),
    Uid(Vec<u8>),
    /// `set vendor-class-identifier = ...`
    VendorClassIdentifier(String),
    /// `set ddns-fwd-name = ...`
    DdnsFwdName(String),
    /// `set ddns-txt = ...`
    DdnsTxt(String),
    /// `set ddns-rev-name = ...`
    DdnsRevName(String),
}

impl V4Option {
    /// Parses a `keyword values... ;` statement.
    ///
    /// Returns `Ok(None)` for statements that are not lease fields, and for
    /// timestamps written as `never`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidValue`] or [`Error::Octal`] when a recognized
    /// field has a malformed value.
    pub fn from_statement(keyword: &Token, values: &[Token]) -> Result<Option<Self>> {
        let option = match (keyword.text.as_str(), words(values).as_slice()) {
            ("starts", _) => timestamp(keyword, values)?.map(Self::Starts),
            ("ends", _) => timestamp(keyword, values)?.map(Self::Ends),
            ("tstp", _) => timestamp(keyword, values)?.map(Self::Tstp),
            ("tsfp", _) => timestamp(keyword, values)?.map(Self::Tsfp),
            ("atsfp", _) => timestamp(keyword, values)?.map(Self::Atsfp),
            ("cltt", _) => timestamp(keyword, values)?.map(Self::Cltt),
            ("binding", ["state", _]) => Some(Self::BindingState(text(&values[1])?)),
            ("next", ["binding", "state", _]) => Some(Self::NextBindingState(text(&values[2])?)),
            ("rewind", ["binding", "state", _]) => {
                Some(Self::RewindBindingState(text(&values[2])?))
            }
            ("hardware", ["ethernet", _]) => Some(Self::HardwareEthernet(text(&values[1])?)),
            ("uid", [_]) => Some(Self::Uid(bytes(keyword, &values[0])?)),
            ("client-hostname", [_]) => Some(Self::ClientHostname(text(&values[0])?)),
            ("uid" | "client-hostname", _) => return Err(invalid(keyword, values)),
            _ => None,
        };
        Ok(option)
    }

    /// Parses a `set name = value;` statement.
    pub fn from_set(name: &Token, value: &Token) -> Result<Option<Self>> {
        let option = match name.text.as_str() {
            "vendor-class-identifier" => Some(Self::VendorClassIdentifier(text(value)?)),
            "ddns-fwd-name" => Some(Self::DdnsFwdName(text(value)?)),
            "ddns-txt" => Some(Self::DdnsTxt(text(value)?)),
            "ddns-rev-name" => Some(Self::DdnsRevName(text(value)?)),
            _ => None,
        };
        Ok(option)
    }

    /// Stores the option's value in its field of `lease`.
    pub fn apply(self, lease: &mut LeaseV4) {
        match self {
            Self::Starts(at) => lease.starts = Some(at),
            Self::Ends(at) => lease.ends = Some(at),
            Self::Tstp(at) => lease.tstp = Some(at),
            Self::Tsfp(at) => lease.tsfp = Some(at),
            Self::Atsfp(at) => lease.atsfp = Some(at),
            Self::Cltt(at) => lease.cltt = Some(at),
            Self::BindingState(state) => lease.binding_state = Some(state),
            Self::NextBindingState(state) => lease.next_binding_state = Some(state),
            Self::RewindBindingState(state) => lease.rewind_binding_state = Some(state),
            Self::HardwareEthernet(address) => lease.hardware_ethernet = Some(address),
            Self::ClientHostname(hostname) => lease.client_hostname = Some(hostname),
            Self::Uid(uid) => lease.uid = Some(uid),
            Self::VendorClassIdentifier(vendor) => lease.vendor_class_identifier = Some(vendor),
            Self::DdnsFwdName(name) => lease.ddns_fwd_name = Some(name),
            Self::DdnsTxt(txt) => lease.ddns_txt = Some(txt),
            Self::DdnsRevName(name) => lease.ddns_rev_name = Some(name),
        }
    }
}

/// A lease-level statement of a `dhcpd6.leases` identity association block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum V6Option {
    Cltt(DateTime<Utc>),
    /// A completed `iaaddr`/`iaprefix` sub-block.
    Address(AddressEntry),
}

impl V6Option {
    pub fn from_statement(keyword: &Token, values: &[Token]) -> Result<Option<Self>> {
        let option = match keyword.text.as_str() {
            "cltt" => timestamp(keyword, values)?.map(Self::Cltt),
            _ => None,
        };
        Ok(option)
    }

    /// Stores the option in `lease`; addresses are appended in order.
    pub fn apply(self, lease: &mut LeaseV6) {
        match self {
            Self::Cltt(at) => lease.cltt = Some(at),
            Self::Address(address) => lease.addresses.push(address),
        }
    }
}

/// A statement inside an `iaaddr`/`iaprefix` sub-block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressOption {
    BindingState(String),
    PreferredLife(u32),
    MaxLife(u32),
    Ends(DateTime<Utc>),
}

impl AddressOption {
    pub fn from_statement(keyword: &Token, values: &[Token]) -> Result<Option<Self>> {
        let option = match (keyword.text.as_str(), words(values).as_slice()) {
            ("binding", ["state", _]) => Some(Self::BindingState(text(&values[1])?)),
            ("preferred-life", _) => Some(Self::PreferredLife(integer(keyword, values)?)),
            ("max-life", _) => Some(Self::MaxLife(integer(keyword, values)?)),
            ("ends", _) => timestamp(keyword, values)?.map(Self::Ends),
            _ => None,
        };
        Ok(option)
    }

    pub fn apply(self, address: &mut AddressEntry) {
        match self {
            Self::BindingState(state) => address.binding_state = Some(state),
            Self::PreferredLife(seconds) => address.preferred_life = seconds,
            Self::MaxLife(seconds) => address.max_life = seconds,
            Self::Ends(at) => address.ends = Some(at),
        }
    }
}
