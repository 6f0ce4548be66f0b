//! Lease file tokenizer.
//!
//! Turns the text of a `dhcpd.leases` / `dhcpd6.leases` file into a lazy
//! stream of positioned [`Token`]s. The lexer reads its input one byte at a
//! time through a buffered reader, so the file is never held in memory.
//!
//! # Token Rules
//!
//! At each position, in priority order:
//!
//! - `#` starts a comment running to the end of the line (not emitted)
//! - whitespace is skipped
//! - `"` starts a string literal, ending at the next `"`; the token text keeps
//!   both quotes and escapes are left for [`crate::octal`] to decode
//! - `;`, `{`, `}` and `=` are single-character tokens
//! - anything else is a word, ending at whitespace, `;`, `{` or `=`
//!
//! Words spelled `set` or one of the lease block keywords (`lease`, `ia-na`,
//! `ia-ta`, `ia-pd`) get their own [`TokenKind`].

use std::fmt;
use std::io::{BufReader, Bytes, Read};
use std::iter::Peekable;

use crate::error::LexError;

/// Words that open a lease block.
const LEASE_KEYWORDS: [&str; 4] = ["lease", "ia-na", "ia-ta", "ia-pd"];

/// Location of a token in the source text.
///
/// Stored zero-based; [`Display`](fmt::Display) renders the one-based
/// `line:column` form used in diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

/// Token kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// `{`
    BeginBlock,
    /// `}`
    EndBlock,
    /// Any unquoted run of characters that is not a keyword.
    Word,
    /// Double-quoted literal, quotes included in the text.
    String,
    /// `;`
    Semicolon,
    /// `=`
    Assign,
    /// The `set` keyword.
    Set,
    /// A lease block keyword: `lease`, `ia-na`, `ia-ta` or `ia-pd`.
    Lease,
}

impl TokenKind {
    /// Classifies a finished word.
    fn of_word(word: &str) -> Self {
        if word == "set" {
            Self::Set
        } else if LEASE_KEYWORDS.contains(&word) {
            Self::Lease
        } else {
            Self::Word
        }
    }
}

/// A lexical token with its source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub position: Position,
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    pub fn new(position: Position, kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            position,
            kind,
            text: text.into(),
        }
    }
}

fn is_space(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\r' | b'\x0b' | b'\x0c')
}

fn ends_word(byte: u8) -> bool {
    is_space(byte) || matches!(byte, b';' | b'{' | b'=')
}

/// Streaming lease file lexer.
///
/// Implements [`Iterator`] over `Result<Token, LexError>`. The iterator ends
/// cleanly at end of input; an error is always its last element.
///
/// # Example
///
/// ```
/// use dhcpd_leases::lexer::{Lexer, TokenKind};
///
/// let kinds: Vec<TokenKind> = Lexer::new("lease 10.0.0.5 {}".as_bytes())
///     .map(|token| token.unwrap().kind)
///     .collect();
/// assert_eq!(
///     kinds,
///     [TokenKind::Lease, TokenKind::Word, TokenKind::BeginBlock, TokenKind::EndBlock]
/// );
/// ```
pub struct Lexer<R: Read> {
    input: Peekable<Bytes<BufReader<R>>>,
    /// Position of the next unread byte.
    position: Position,
    finished: bool,
}

impl<R: Read> Lexer<R> {
    pub fn new(input: R) -> Self {
        Self {
            input: BufReader::new(input).bytes().peekable(),
            position: Position::default(),
            finished: false,
        }
    }

    /// Looks at the next byte without consuming it.
    fn peek(&mut self) -> Result<Option<u8>, LexError> {
        match self.input.peek() {
            None => Ok(None),
            Some(Ok(byte)) => Ok(Some(*byte)),
            Some(Err(_)) => match self.input.next() {
                Some(Err(error)) => Err(LexError::Io(error)),
                _ => Ok(None),
            },
        }
    }

    /// Consumes the next byte, keeping the position current.
    fn bump(&mut self) -> Result<Option<u8>, LexError> {
        let Some(byte) = self.input.next().transpose()? else {
            return Ok(None);
        };
        if byte == b'\n' {
            self.position.line += 1;
            self.position.column = 0;
        } else if byte & 0xc0 != 0x80 {
            // UTF-8 continuation bytes belong to the previous column.
            self.position.column += 1;
        }
        Ok(Some(byte))
    }

    fn lex_token(&mut self) -> Result<Option<Token>, LexError> {
        loop {
            let position = self.position;
            let Some(byte) = self.bump()? else {
                return Ok(None);
            };

            let kind = match byte {
                b'#' => {
                    self.skip_comment()?;
                    continue;
                }
                byte if is_space(byte) => continue,
                b'"' => return self.lex_string(position).map(Some),
                b';' => TokenKind::Semicolon,
                b'{' => TokenKind::BeginBlock,
                b'}' => TokenKind::EndBlock,
                b'=' => TokenKind::Assign,
                first => return self.lex_word(position, first).map(Some),
            };
            return Ok(Some(Token::new(position, kind, char::from(byte))));
        }
    }

    fn skip_comment(&mut self) -> Result<(), LexError> {
        while let Some(byte) = self.bump()? {
            if byte == b'\n' {
                break;
            }
        }
        Ok(())
    }

    fn lex_string(&mut self, position: Position) -> Result<Token, LexError> {
        let mut text = vec![b'"'];
        loop {
            match self.bump()? {
                Some(b'"') => {
                    text.push(b'"');
                    let text = String::from_utf8_lossy(&text).into_owned();
                    return Ok(Token::new(position, TokenKind::String, text));
                }
                Some(byte) => text.push(byte),
                None => return Err(LexError::UnterminatedString { position }),
            }
        }
    }

    fn lex_word(&mut self, position: Position, first: u8) -> Result<Token, LexError> {
        let mut text = vec![first];
        while let Some(byte) = self.peek()? {
            if ends_word(byte) {
                break;
            }
            self.bump()?;
            text.push(byte);
        }
        let text = String::from_utf8_lossy(&text).into_owned();
        Ok(Token::new(position, TokenKind::of_word(&text), text))
    }
}

impl<R: Read> Iterator for Lexer<R> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let item = self.lex_token().transpose();
        if !matches!(item, Some(Ok(_))) {
            self.finished = true;
        }
        item
    }
}
