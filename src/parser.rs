//! Lease database grammar.
//!
//! The parser pulls tokens from a [`Lexer`] one at a time, groups them into
//! statements and drives a block state machine over those statements:
//!
//! ```text
//! file       := block*
//! block      := lease-keyword value '{' statement* '}'
//! statement  := word value* ';'
//!             | 'set' word '=' value ';'
//!             | word value* '{' statement* '}'      (nested block)
//! ```
//!
//! Blocks are tracked by depth: 0 is the top level, 1 a lease body and 2 a
//! DHCPv6 address body. Which nested blocks are tracked is up to the
//! [`Grammar`]; everything else (`on expiry { ... }`, top-level
//! `failover peer ... { ... }`) is skipped with balanced braces and its
//! statements are not checked beyond their terminators. Statements at
//! the top level, such as `server-duid` or `authoring-byte-order`, are ignored.
//!
//! A record is allocated as soon as its header is recognized, each statement
//! is applied to it as it is parsed, and it is emitted when its closing `}`
//! arrives. Records are therefore yielded in file order with only one record
//! in flight.
//!
//! # Errors
//!
//! Lexing and grammar errors are yielded as the final item of the iterator.
//! Decoding errors in a header or statement are handled by the configured
//! [`MalformedPolicy`]: `Fail` yields them as the final item, `Skip` drops the
//! innermost entry (an address entry, or the whole lease) and resumes after
//! its closing `}`.

use std::io::Read;
use std::iter::FusedIterator;
use std::net::{Ipv4Addr, Ipv6Addr};

use tracing::{debug, trace, warn};

use crate::config::{Config, MalformedPolicy};
use crate::duid::IaidDuid;
use crate::error::{Error, LexError, ParseError, Result};
use crate::lease::{AddressEntry, LeaseType, LeaseV4, LeaseV6};
use crate::lexer::{Lexer, Token, TokenKind};
use crate::options::{self, AddressOption, V4Option, V6Option, invalid};

/// Maximum prefix length of a delegated IPv6 prefix.
const MAX_PREFIX_LEN: u8 = 128;

fn unexpected(token: Token, expected: &'static str) -> Error {
    ParseError::UnexpectedToken { token, expected }.into()
}

/// One complete statement of the lease file.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Statement {
    /// `keyword values... ;`
    Field { keyword: Token, values: Vec<Token> },
    /// `set name = value ;`
    Set { name: Token, value: Token },
    /// `keyword values... {`
    Open {
        keyword: Token,
        values: Vec<Token>,
        brace: Token,
    },
    /// `}`
    Close(Token),
}

/// Shape of a statement inside a block being skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Skipped {
    /// Tokens up to a `;`.
    Statement,
    /// Tokens up to a `{`, with the first of them.
    Open(Option<Token>),
    /// A `}`, possibly preceded by an unterminated statement.
    Close,
}

/// Groups a token stream into statements.
struct Statements<I> {
    tokens: I,
}

impl<I> Statements<I>
where
    I: Iterator<Item = std::result::Result<Token, LexError>>,
{
    fn next_token(&mut self) -> Result<Option<Token>> {
        Ok(self.tokens.next().transpose()?)
    }

    fn expect(&mut self, expected: &'static str) -> Result<Token> {
        self.next_token()?
            .ok_or_else(|| ParseError::UnexpectedEof { expected }.into())
    }

    fn expect_kind(&mut self, kinds: &[TokenKind], expected: &'static str) -> Result<Token> {
        let token = self.expect(expected)?;
        if kinds.contains(&token.kind) {
            Ok(token)
        } else {
            Err(unexpected(token, expected))
        }
    }

    /// Consumes tokens up to the next `;`, `{` or `}` without checking them.
    ///
    /// Skipped blocks may hold expressions (`binary-to-ascii(10, 8, ...)`)
    /// that the statement grammar does not cover.
    fn skip_statement(&mut self) -> Result<Option<Skipped>> {
        let mut first = None;
        while let Some(token) = self.next_token()? {
            match token.kind {
                TokenKind::Semicolon => return Ok(Some(Skipped::Statement)),
                TokenKind::BeginBlock => return Ok(Some(Skipped::Open(first))),
                TokenKind::EndBlock => return Ok(Some(Skipped::Close)),
                _ => {
                    first.get_or_insert(token);
                }
            }
        }
        Ok(None)
    }

    fn next_statement(&mut self) -> Result<Option<Statement>> {
        let Some(first) = self.next_token()? else {
            return Ok(None);
        };
        let statement = match first.kind {
            TokenKind::EndBlock => Statement::Close(first),
            TokenKind::Set => self.set_statement()?,
            TokenKind::Word | TokenKind::Lease => self.statement(first)?,
            _ => return Err(unexpected(first, "a statement or `}`")),
        };
        Ok(Some(statement))
    }

    fn statement(&mut self, keyword: Token) -> Result<Statement> {
        let mut values = Vec::new();
        loop {
            let token = self.expect("a value, `;` or `{`")?;
            match token.kind {
                TokenKind::Semicolon => return Ok(Statement::Field { keyword, values }),
                TokenKind::BeginBlock => {
                    return Ok(Statement::Open {
                        keyword,
                        values,
                        brace: token,
                    });
                }
                TokenKind::Word | TokenKind::String => values.push(token),
                _ => return Err(unexpected(token, "a value, `;` or `{`")),
            }
        }
    }

    fn set_statement(&mut self) -> Result<Statement> {
        let name = self.expect_kind(&[TokenKind::Word], "a variable name after `set`")?;
        self.expect_kind(&[TokenKind::Assign], "`=`")?;
        let value = self.expect_kind(&[TokenKind::Word, TokenKind::String], "a value")?;
        self.expect_kind(&[TokenKind::Semicolon], "`;`")?;
        Ok(Statement::Set { name, value })
    }
}

/// Block-level actions of one lease database flavor.
///
/// The [`Parser`] guarantees `field`, `set`, `open` and `close` are only called
/// between a successful `begin` and the `close` that ends the lease.
pub trait Grammar {
    type Record;

    /// Allocates a record for a lease block header `keyword header {`.
    fn begin(&mut self, keyword: &Token, header: &Token) -> Result<()>;

    /// Handles a nested block header inside a lease.
    ///
    /// Returns `true` if the grammar tracks the block, `false` to skip it.
    fn open(&mut self, keyword: &Token, values: &[Token]) -> Result<bool>;

    /// Applies a `keyword values... ;` statement to the innermost entry.
    fn field(&mut self, keyword: &Token, values: &[Token]) -> Result<()>;

    /// Applies a `set name = value;` statement to the innermost entry.
    fn set(&mut self, name: &Token, value: &Token) -> Result<()>;

    /// Finishes the innermost tracked block, returning the record when the
    /// lease block itself closes.
    fn close(&mut self) -> Option<Self::Record>;

    /// Drops the innermost entry under construction.
    fn discard(&mut self);
}

/// Streaming lease parser.
///
/// Implements [`Iterator`] over `Result<G::Record>`. After an error item the
/// iterator is exhausted; dropping it early stops the parse.
pub struct Parser<I, G> {
    statements: Statements<I>,
    grammar: G,
    policy: MalformedPolicy,
    depth: usize,
    /// Open blocks being skipped.
    skipping: usize,
    finished: bool,
}

impl<I, G> Parser<I, G>
where
    I: Iterator<Item = std::result::Result<Token, LexError>>,
    G: Grammar,
{
    pub fn new(tokens: I, grammar: G, config: &Config) -> Self {
        Self {
            statements: Statements { tokens },
            grammar,
            policy: config.on_malformed,
            depth: 0,
            skipping: 0,
            finished: false,
        }
    }

    fn advance(&mut self) -> Result<Option<G::Record>> {
        loop {
            if self.skipping > 0 {
                match self.statements.skip_statement()? {
                    Some(Skipped::Open(Some(keyword))) if keyword.kind == TokenKind::Lease => {
                        return Err(unexpected(keyword, "a statement or `}`"));
                    }
                    Some(Skipped::Open(_)) => self.skipping += 1,
                    Some(Skipped::Close) => self.skipping -= 1,
                    Some(Skipped::Statement) => {}
                    None => break,
                }
                continue;
            }
            let Some(statement) = self.statements.next_statement()? else {
                break;
            };
            if let Some(record) = self.step(statement)? {
                return Ok(Some(record));
            }
        }

        if self.depth > 0 || self.skipping > 0 {
            return Err(ParseError::UnexpectedEof { expected: "`}`" }.into());
        }
        Ok(None)
    }

    fn step(&mut self, statement: Statement) -> Result<Option<G::Record>> {
        match statement {
            Statement::Open {
                keyword,
                values,
                brace,
            } => {
                self.open(keyword, values, brace)?;
                Ok(None)
            }
            Statement::Field { keyword, values } => {
                if self.depth == 0 {
                    debug!("Ignoring top-level `{}` at {}", keyword.text, keyword.position);
                    return Ok(None);
                }
                let result = self.grammar.field(&keyword, &values);
                self.recover(result, true)?;
                Ok(None)
            }
            Statement::Set { name, value } => {
                if self.depth == 0 {
                    debug!("Ignoring top-level `set {}` at {}", name.text, name.position);
                    return Ok(None);
                }
                let result = self.grammar.set(&name, &value);
                self.recover(result, true)?;
                Ok(None)
            }
            Statement::Close(brace) => {
                if self.depth == 0 {
                    return Err(unexpected(brace, "a lease block"));
                }
                self.depth -= 1;
                let record = self.grammar.close();
                if record.is_some() {
                    trace!("Lease closed at {}", brace.position);
                }
                Ok(record)
            }
        }
    }

    fn open(&mut self, keyword: Token, values: Vec<Token>, brace: Token) -> Result<()> {
        if self.depth == 0 {
            if keyword.kind != TokenKind::Lease {
                debug!("Skipping top-level `{}` block at {}", keyword.text, keyword.position);
                self.skipping = 1;
                return Ok(());
            }
            let header = match values.as_slice() {
                [header] => header,
                [] => return Err(unexpected(brace, "a lease block header value")),
                [_, extra, ..] => return Err(unexpected(extra.clone(), "`{`")),
            };
            let result = self.grammar.begin(&keyword, header);
            if result.is_ok() {
                self.depth = 1;
            }
            return self.recover(result, false);
        }

        if keyword.kind == TokenKind::Lease {
            return Err(unexpected(keyword, "a statement or `}`"));
        }
        match self.grammar.open(&keyword, &values) {
            Ok(true) => {
                self.depth += 1;
                Ok(())
            }
            Ok(false) => {
                debug!("Skipping `{}` block at {}", keyword.text, keyword.position);
                self.skipping = 1;
                Ok(())
            }
            Err(error) => self.recover(Err(error), false),
        }
    }

    /// Applies the malformed-entry policy to a statement outcome.
    ///
    /// `in_entry` is true when the statement belongs to the innermost tracked
    /// entry, false when it is the header of a block that was never entered.
    fn recover(&mut self, result: Result<()>, in_entry: bool) -> Result<()> {
        let error = match result {
            Err(error) if error.is_entry_local() && self.policy == MalformedPolicy::Skip => error,
            other => return other,
        };

        warn!("Skipping malformed entry: {}", error);
        if in_entry {
            self.grammar.discard();
            self.depth -= 1;
        }
        self.skipping = 1;
        Ok(())
    }
}

impl<I, G> Iterator for Parser<I, G>
where
    I: Iterator<Item = std::result::Result<Token, LexError>>,
    G: Grammar,
{
    type Item = Result<G::Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.advance() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(error) => {
                self.finished = true;
                Some(Err(error))
            }
        }
    }
}

impl<I, G> FusedIterator for Parser<I, G>
where
    I: Iterator<Item = std::result::Result<Token, LexError>>,
    G: Grammar,
{
}

/// Grammar of `dhcpd.leases`: flat `lease <ipv4> { ... }` blocks.
#[derive(Debug, Default)]
pub struct V4Grammar {
    lease: Option<LeaseV4>,
}

impl Grammar for V4Grammar {
    type Record = LeaseV4;

    fn begin(&mut self, keyword: &Token, header: &Token) -> Result<()> {
        if keyword.text != "lease" {
            return Err(unexpected(keyword.clone(), "`lease`"));
        }
        let ip: Ipv4Addr = match header.kind {
            TokenKind::Word => header.text.parse().ok(),
            _ => None,
        }
        .ok_or_else(|| invalid(keyword, std::slice::from_ref(header)))?;
        self.lease = Some(LeaseV4::new(ip));
        Ok(())
    }

    fn open(&mut self, _keyword: &Token, _values: &[Token]) -> Result<bool> {
        Ok(false)
    }

    fn field(&mut self, keyword: &Token, values: &[Token]) -> Result<()> {
        match V4Option::from_statement(keyword, values)? {
            Some(option) => {
                if let Some(lease) = self.lease.as_mut() {
                    option.apply(lease);
                }
            }
            None => debug!("Ignoring `{}` at {}", keyword.text, keyword.position),
        }
        Ok(())
    }

    fn set(&mut self, name: &Token, value: &Token) -> Result<()> {
        match V4Option::from_set(name, value)? {
            Some(option) => {
                if let Some(lease) = self.lease.as_mut() {
                    option.apply(lease);
                }
            }
            None => debug!("Ignoring `set {}` at {}", name.text, name.position),
        }
        Ok(())
    }

    fn close(&mut self) -> Option<LeaseV4> {
        self.lease.take()
    }

    fn discard(&mut self) {
        self.lease = None;
    }
}

/// Grammar of `dhcpd6.leases`: `ia-na`/`ia-ta`/`ia-pd` blocks holding
/// `iaaddr`/`iaprefix` address sub-blocks.
#[derive(Debug, Default)]
pub struct V6Grammar {
    lease: Option<LeaseV6>,
    address: Option<AddressEntry>,
}

impl V6Grammar {
    fn address_header(keyword: &Token, values: &[Token]) -> Result<AddressEntry> {
        let [value] = values else {
            return Err(invalid(keyword, values));
        };
        let parsed = if keyword.text == "iaprefix" {
            value.text.split_once('/').and_then(|(ip, len)| {
                let ip: Ipv6Addr = ip.parse().ok()?;
                let len: u8 = len.parse().ok().filter(|len| *len <= MAX_PREFIX_LEN)?;
                Some(AddressEntry::new(ip, Some(len)))
            })
        } else {
            value
                .text
                .parse()
                .ok()
                .map(|ip| AddressEntry::new(ip, None))
        };
        parsed.ok_or_else(|| invalid(keyword, values))
    }
}

impl Grammar for V6Grammar {
    type Record = LeaseV6;

    fn begin(&mut self, keyword: &Token, header: &Token) -> Result<()> {
        let lease_type = LeaseType::try_from(keyword.text.as_str())
            .map_err(|()| unexpected(keyword.clone(), "`ia-na`, `ia-ta` or `ia-pd`"))?;
        let bytes = options::bytes(keyword, header)?;
        let identity = IaidDuid::decode(&bytes).map_err(|source| Error::Duid {
            position: header.position,
            source,
        })?;
        self.lease = Some(LeaseV6::new(lease_type, identity));
        self.address = None;
        Ok(())
    }

    fn open(&mut self, keyword: &Token, values: &[Token]) -> Result<bool> {
        if self.address.is_some() || !matches!(keyword.text.as_str(), "iaaddr" | "iaprefix") {
            return Ok(false);
        }
        self.address = Some(Self::address_header(keyword, values)?);
        Ok(true)
    }

    fn field(&mut self, keyword: &Token, values: &[Token]) -> Result<()> {
        if let Some(address) = self.address.as_mut() {
            match AddressOption::from_statement(keyword, values)? {
                Some(option) => option.apply(address),
                None => debug!("Ignoring `{}` at {}", keyword.text, keyword.position),
            }
            return Ok(());
        }
        match V6Option::from_statement(keyword, values)? {
            Some(option) => {
                if let Some(lease) = self.lease.as_mut() {
                    option.apply(lease);
                }
            }
            None => debug!("Ignoring `{}` at {}", keyword.text, keyword.position),
        }
        Ok(())
    }

    fn set(&mut self, name: &Token, _value: &Token) -> Result<()> {
        debug!("Ignoring `set {}` at {}", name.text, name.position);
        Ok(())
    }

    fn close(&mut self) -> Option<LeaseV6> {
        if let Some(address) = self.address.take() {
            if let Some(lease) = self.lease.as_mut() {
                V6Option::Address(address).apply(lease);
            }
            return None;
        }
        self.lease.take()
    }

    fn discard(&mut self) {
        if self.address.take().is_none() {
            self.lease = None;
        }
    }
}

/// Parser over a `dhcpd.leases` byte stream.
pub type V4Parser<R> = Parser<Lexer<R>, V4Grammar>;

/// Parser over a `dhcpd6.leases` byte stream.
pub type V6Parser<R> = Parser<Lexer<R>, V6Grammar>;

/// Parses a `dhcpd.leases` database into a lazy stream of [`LeaseV4`] records.
///
/// # Example
///
/// ```
/// use dhcpd_leases::{Config, parse_v4};
///
/// let input = "lease 10.0.0.5 {\n  binding state active;\n}\n";
/// let leases: Vec<_> = parse_v4(input.as_bytes(), &Config::default())
///     .collect::<dhcpd_leases::Result<_>>()
///     .unwrap();
/// assert_eq!(leases[0].binding_state.as_deref(), Some("active"));
/// ```
pub fn parse_v4<R: Read>(input: R, config: &Config) -> V4Parser<R> {
    Parser::new(Lexer::new(input), V4Grammar::default(), config)
}

/// Parses a `dhcpd6.leases` database into a lazy stream of [`LeaseV6`] records.
pub fn parse_v6<R: Read>(input: R, config: &Config) -> V6Parser<R> {
    Parser::new(Lexer::new(input), V6Grammar::default(), config)
}
