//! Rune-level lexer.
//!
//! The lexer walks the input one Unicode scalar value at a time and groups
//! consecutive characters of the same kind into [`Token`]s. Grouping is
//! maximal-munch with a few context-sensitive exceptions:
//!
//! - `*` directly after a line break and followed by a space is a list marker,
//!   anywhere else it is an emphasis delimiter
//! - emphasis runs never mix `*` and `_` and never grow past three symbols
//! - `[!` on a quoted line opens a callout instead of a link
//! - link delimiters only group into `![`, `[`, `](` and `)`
//! - characters listed in [`RenderOptions`] replacements are always lexed alone
//!
//! A backslash forces the next character to be lexed as literal text and is
//! itself dropped, so concatenating the token texts gives back the input minus
//! its escape markers.

use std::collections::HashMap;
use std::fmt;

use crate::options::RenderOptions;
use crate::span::Span;
use crate::stream::TokenStream;

/// Delimiter sequences an [`TokenKind::External`] token may spell.
const EXTERNAL_PATTERNS: [&str; 4] = ["![", "[", "](", ")"];

/// Longest run of emphasis symbols kept in a single token.
const MAX_MODIFIER_RUN: usize = 3;

/// Kind of a lexical token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize),
    serde(rename_all = "lowercase")
)]
pub enum TokenKind {
    /// One or more consecutive line feeds.
    Break,
    /// Run of `*` or `_` (at most three).
    Modifier,
    /// Run of backticks.
    Code,
    /// Run of `#`.
    Heading,
    /// Run of `>`.
    Quote,
    /// List marker material: `-`, digits and `.` (or a leading `* `).
    List,
    /// Link or image delimiter: `![`, `[`, `](` or `)`.
    External,
    /// Callout opener `[!` or its closing `]`.
    Callout,
    /// Plain text.
    Literal,
    /// A single character substituted at render time.
    Replace,
}

impl TokenKind {
    /// Lower-case name used in debug output.
    pub const fn name(self) -> &'static str {
        match self {
            TokenKind::Break => "break",
            TokenKind::Modifier => "modifier",
            TokenKind::Code => "code",
            TokenKind::Heading => "heading",
            TokenKind::Quote => "quote",
            TokenKind::List => "list",
            TokenKind::External => "external",
            TokenKind::Callout => "callout",
            TokenKind::Literal => "literal",
            TokenKind::Replace => "replace",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A token: its kind, the text it covers and where that text came from.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Source bytes covered, escape backslashes included.
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            text: text.into(),
            span,
        }
    }

    /// Length of the run in characters.
    ///
    /// For every kind but `Literal` this is also the byte length, the run being ASCII.
    #[inline]
    pub fn width(&self) -> usize {
        self.text.chars().count()
    }

    /// Check both the kind and the exact text.
    #[inline]
    pub fn is(&self, kind: TokenKind, text: &str) -> bool {
        self.kind == kind && self.text == text
    }

    /// Check that this is a literal made only of spaces and tabs.
    #[inline]
    pub fn is_blank(&self) -> bool {
        self.kind == TokenKind::Literal && self.text.bytes().all(|b| b == b' ' || b == b'\t')
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind, self.text.escape_debug())
    }
}

/// Tokenize `input`.
///
/// Only [`RenderOptions::replacements`] is consulted; the rest of the options
/// matter at render time.
///
/// # Example
///
/// ```rust
/// use smallmark_core::lexer::{lex, TokenKind};
/// use smallmark_core::RenderOptions;
///
/// let stream = lex("# Title", &RenderOptions::default());
/// assert_eq!(stream.tokens()[0].kind, TokenKind::Heading);
/// assert_eq!(stream.tokens()[1].text, " Title");
/// ```
pub fn lex(input: &str, options: &RenderOptions) -> TokenStream {
    let mut lexer = Lexer::new(options.replacements());
    let mut chars = input.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        let next = chars.peek().map(|&(_, n)| n);
        if lexer.step(offset, c, next) {
            chars.next();
        }
    }

    TokenStream::new(lexer.finish())
}

/// What the current line looks like so far; callouts only open on quoted lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinePrefix {
    /// Nothing but blanks since the line break.
    Fresh,
    /// Only quote markers and blanks since the line break.
    Quoted,
    Other,
}

struct Lexer<'o> {
    replacements: &'o HashMap<char, String>,
    tokens: Vec<Token>,
    /// Text of the in-progress token.
    buffer: String,
    /// Kind of the in-progress token, meaningless while `buffer` is empty.
    kind: TokenKind,
    span: Span,
    new_line: bool,
    literal_next: bool,
    escape_at: Option<usize>,
    prefix: LinePrefix,
    callout_open: bool,
}

impl<'o> Lexer<'o> {
    fn new(replacements: &'o HashMap<char, String>) -> Self {
        Self {
            replacements,
            tokens: Vec::new(),
            buffer: String::new(),
            kind: TokenKind::Literal,
            span: Span::default(),
            new_line: true,
            literal_next: false,
            escape_at: None,
            prefix: LinePrefix::Fresh,
            callout_open: false,
        }
    }

    /// Lex one character. Returns `true` when `next` was consumed as well.
    fn step(&mut self, offset: usize, c: char, next: Option<char>) -> bool {
        if self.literal_next {
            self.literal_next = false;
            self.push(TokenKind::Literal, offset, c);
            self.new_line = false;
            self.prefix = LinePrefix::Other;
            return false;
        }
        if c == '\\' {
            self.literal_next = true;
            self.escape_at = Some(offset);
            return false;
        }

        let mut swallowed = false;
        match c {
            '*' if self.new_line && next == Some(' ') => {
                self.push_single(TokenKind::List, offset, c)
            }
            '*' | '_' => self.push_modifier(offset, c),
            '`' => self.push(TokenKind::Code, offset, c),
            '\n' => self.push(TokenKind::Break, offset, c),
            '#' => self.push(TokenKind::Heading, offset, c),
            '>' => self.push(TokenKind::Quote, offset, c),
            '[' if next == Some('!') && self.prefix == LinePrefix::Quoted => {
                self.flush();
                let start = self.escape_at.take().unwrap_or(offset);
                self.tokens.push(Token::new(
                    TokenKind::Callout,
                    "[!",
                    Span::new(start as u32, (offset + 2) as u32),
                ));
                self.callout_open = true;
                swallowed = true;
            }
            ']' if self.callout_open => {
                self.push_single(TokenKind::Callout, offset, c);
                self.callout_open = false;
            }
            '[' | ')' => self.push_external(offset, c),
            '!' if next == Some('[') => self.push_external(offset, c),
            ']' if next == Some('(') => self.push_external(offset, c),
            '(' if self.kind == TokenKind::External && self.buffer == "]" => {
                self.push_external(offset, c)
            }
            '-' | '.' | '0'..='9' => self.push(TokenKind::List, offset, c),
            c if self.replacements.contains_key(&c) => {
                self.push_single(TokenKind::Replace, offset, c)
            }
            _ => self.push(TokenKind::Literal, offset, c),
        }
        self.track_line(c);
        swallowed
    }

    fn track_line(&mut self, c: char) {
        if c == '\n' {
            self.new_line = true;
            self.prefix = LinePrefix::Fresh;
            self.callout_open = false;
            return;
        }
        self.new_line = false;
        self.prefix = match (self.prefix, c) {
            (LinePrefix::Fresh | LinePrefix::Quoted, '>') => LinePrefix::Quoted,
            (prefix, ' ' | '\t') => prefix,
            _ => LinePrefix::Other,
        };
    }

    /// Extend the in-progress token when it has the same kind, start a new one otherwise.
    #[inline]
    fn push(&mut self, kind: TokenKind, offset: usize, c: char) {
        let extend = self.kind == kind && !self.buffer.is_empty();
        self.push_run(kind, offset, c, extend);
    }

    fn push_modifier(&mut self, offset: usize, c: char) {
        let extend = self.kind == TokenKind::Modifier
            && self.buffer.starts_with(c)
            && self.buffer.len() < MAX_MODIFIER_RUN;
        self.push_run(TokenKind::Modifier, offset, c, extend);
    }

    fn push_external(&mut self, offset: usize, c: char) {
        let buffer = self.buffer.as_str();
        let extend = self.kind == TokenKind::External
            && !buffer.is_empty()
            && EXTERNAL_PATTERNS.iter().any(|pattern| {
                pattern.len() > buffer.len()
                    && pattern.starts_with(buffer)
                    && pattern[buffer.len()..].starts_with(c)
            });
        self.push_run(TokenKind::External, offset, c, extend);
    }

    /// Emit `c` as a token of its own.
    fn push_single(&mut self, kind: TokenKind, offset: usize, c: char) {
        self.push_run(kind, offset, c, false);
        self.flush();
    }

    fn push_run(&mut self, kind: TokenKind, offset: usize, c: char, extend: bool) {
        let start = self.escape_at.take().unwrap_or(offset);
        let end = (offset + c.len_utf8()) as u32;
        if extend {
            self.span.end = end;
        } else {
            self.flush();
            self.kind = kind;
            self.span = Span::new(start as u32, end);
        }
        self.buffer.push(c);
    }

    fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.buffer);
        self.tokens.push(Token::new(self.kind, text, self.span));
    }

    fn finish(mut self) -> Vec<Token> {
        // a trailing backslash escapes nothing, keep it as text
        if self.literal_next {
            if let Some(offset) = self.escape_at {
                self.push(TokenKind::Literal, offset, '\\');
            }
        }
        self.flush();
        self.tokens
    }
}
