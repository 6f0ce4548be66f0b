//! Error types for lease file parsing.
//!
//! The parse entry points yield [`Result<T>`] items; every failure is a
//! variant of [`Error`]. Lexing and grammar failures end the record stream.
//! Decoding failures ([`Error::Octal`], [`Error::Duid`], [`Error::InvalidValue`])
//! are local to the lease or address entry being built, and the configured
//! [`MalformedPolicy`](crate::config::MalformedPolicy) decides whether they end
//! the stream or only drop that entry.

use crate::lexer::{Position, Token};

/// Errors raised while turning lease file text into tokens.
#[derive(Debug, thiserror::Error)]
pub enum LexError {
    /// Input ended before the closing quote of a string literal.
    #[error("{position}: unterminated string literal")]
    UnterminatedString { position: Position },

    /// Reading the input failed for a reason other than end of input.
    #[error("IO error while lexing: {0}")]
    Io(#[from] std::io::Error),
}

/// A token arrived that the grammar does not allow in its current state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("{}: unexpected {:?} {:?}, expected {expected}", .token.position, .token.kind, .token.text)]
    UnexpectedToken { token: Token, expected: &'static str },

    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: &'static str },
}

/// Failures decoding a quoted, octal-escaped string literal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OctalDecodeError {
    /// The literal is not wrapped in a pair of double quotes.
    #[error("string literal is not quoted")]
    Unquoted,

    /// The three characters after a backslash are not an octal byte value.
    #[error("invalid octal escape \\{sequence} at offset {offset}")]
    InvalidEscape { offset: usize, sequence: String },

    /// A backslash is followed by fewer than three characters.
    #[error("truncated octal escape at offset {offset}")]
    Truncated { offset: usize },
}

/// Failures decoding an IAID + DUID byte sequence.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DuidDecodeError {
    #[error("unknown DUID type {0}")]
    UnknownType(u16),

    /// Only Ethernet link-layer DUIDs are understood.
    #[error("unsupported DUID-LL hardware type {0}")]
    UnsupportedHardwareType(u16),

    #[error("truncated {field}: needed {needed} bytes, {available} available")]
    Truncated {
        field: &'static str,
        needed: usize,
        available: usize,
    },
}

/// Errors that can occur while parsing a lease database.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File system I/O error (configuration or output).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("lex error: {0}")]
    Lex(#[from] LexError),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// A quoted byte string in a statement could not be decoded.
    #[error("{position}: {source}")]
    Octal {
        position: Position,
        source: OctalDecodeError,
    },

    /// A DHCPv6 lease header carries an undecodable IAID + DUID.
    #[error("{position}: {source}")]
    Duid {
        position: Position,
        source: DuidDecodeError,
    },

    /// A statement value (address, integer, timestamp, hex string) is malformed.
    #[error("{position}: invalid {field} value {value:?}")]
    InvalidValue {
        position: Position,
        field: String,
        value: String,
    },
}

impl Error {
    /// Returns true for errors confined to the entry being built, which the
    /// malformed-entry policy may skip instead of ending the parse.
    pub fn is_entry_local(&self) -> bool {
        matches!(
            self,
            Self::Octal { .. } | Self::Duid { .. } | Self::InvalidValue { .. }
        )
    }
}

/// A specialized Result type for lease parsing.
pub type Result<T> = std::result::Result<T, Error>;
