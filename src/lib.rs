//! # dhcpd-leases
//!
//! A streaming parser for ISC `dhcpd` and `dhcpd6` lease databases.
//!
//! ## Features
//!
//! - `dhcpd.leases` (DHCPv4) and `dhcpd6.leases` (DHCPv6) grammars
//! - Lazy, in-order record streams; the file is never loaded whole
//! - Decoding of octal-escaped identifiers and DHCPv6 IAID/DUID headers
//! - Configurable handling of malformed entries (fail or skip)
//! - Async streaming with cancellation on Tokio
//!
//! ## Quick Start
//!
//! ```no_run
//! use dhcpd_leases::{Config, parse_v4};
//!
//! fn main() -> dhcpd_leases::Result<()> {
//!     let file = std::fs::File::open("/var/lib/dhcp/dhcpd.leases")?;
//!     for lease in parse_v4(file, &Config::default()) {
//!         let lease = lease?;
//!         println!("{} {:?}", lease.ip, lease.binding_state);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`lexer`] - Positioned tokens from the raw byte stream
//! - [`parser`] - Block grammar producing [`LeaseV4`] / [`LeaseV6`] records
//! - [`options`] - Typed field statements applied to records under construction
//! - [`octal`] - Octal-escaped and colon-hex byte strings
//! - [`duid`] - DHCPv6 IAID and DUID decoding
//! - [`LeaseStream`] - The same pipeline on Tokio's blocking pool

pub mod config;
pub mod duid;
pub mod error;
pub mod lease;
pub mod lexer;
pub mod octal;
pub mod options;
pub mod parser;
pub mod stream;

pub use config::{Config, MalformedPolicy};
pub use duid::{Duid, DuidType, HardwareType, IaidDuid};
pub use error::{DuidDecodeError, Error, LexError, OctalDecodeError, ParseError, Result};
pub use lease::{AddressEntry, LeaseType, LeaseV4, LeaseV6};
pub use parser::{parse_v4, parse_v6};
pub use stream::LeaseStream;
