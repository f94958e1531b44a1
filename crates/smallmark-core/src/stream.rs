//! Bidirectional cursor over the token sequence.
//!
//! The parser looks one token ahead almost everywhere and backs off when a
//! construct turns out not to match, so the stream exposes both directions and
//! explicit [`Mark`]s for backtracking.
//!
//! The cursor starts *before* the first token and may walk past either end;
//! [`TokenStream::advance`] and [`TokenStream::retreat`] are exact inverses of
//! each other wherever the cursor is.

use std::fmt;

use crate::lexer::{Token, TokenKind};

/// A saved cursor position, see [`TokenStream::save`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark(isize);

/// Owned token sequence plus a cursor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TokenStream {
    tokens: Vec<Token>,
    current: isize,
}

impl TokenStream {
    /// Wrap `tokens` with the cursor before the first one.
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            current: -1,
        }
    }

    /// Move to the next token. Returns `false` once past the end.
    #[inline]
    pub fn advance(&mut self) -> bool {
        self.current += 1;
        self.current().is_some()
    }

    /// Move to the previous token. Returns `false` once before the start.
    #[inline]
    pub fn retreat(&mut self) -> bool {
        self.current -= 1;
        self.current().is_some()
    }

    /// Token under the cursor, `None` when the cursor is outside the sequence.
    #[inline]
    pub fn current(&self) -> Option<&Token> {
        self.index().and_then(|i| self.tokens.get(i))
    }

    #[inline]
    pub fn current_kind(&self) -> Option<TokenKind> {
        self.current().map(|t| t.kind)
    }

    /// Token right after the cursor, without moving.
    #[inline]
    pub fn peek(&self) -> Option<&Token> {
        self.at(self.current + 1)
    }

    /// Token right before the cursor, without moving.
    #[inline]
    pub fn previous(&self) -> Option<&Token> {
        self.at(self.current - 1)
    }

    /// Check if the cursor went past the last token.
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.current >= self.tokens.len() as isize
    }

    /// Index of the token under the cursor.
    #[inline]
    pub fn index(&self) -> Option<usize> {
        usize::try_from(self.current).ok()
    }

    /// Remember the cursor position.
    #[inline]
    pub fn save(&self) -> Mark {
        Mark(self.current)
    }

    /// Put the cursor back where [`save`](Self::save) found it.
    #[inline]
    pub fn restore(&mut self, mark: Mark) {
        self.current = mark.0;
    }

    /// Put the cursor before the first token.
    #[inline]
    pub fn reset(&mut self) {
        self.current = -1;
    }

    #[inline]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter()
    }

    pub fn into_tokens(self) -> Vec<Token> {
        self.tokens
    }

    /// Concatenated token texts, i.e. the source without its escape markers.
    pub fn text(&self) -> String {
        self.tokens.iter().map(|t| t.text.as_str()).collect()
    }

    #[inline]
    fn at(&self, index: isize) -> Option<&Token> {
        usize::try_from(index).ok().and_then(|i| self.tokens.get(i))
    }
}

impl fmt::Display for TokenStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Tokens[")?;
        for token in &self.tokens {
            write!(f, "{} ", token)?;
        }
        f.write_str("]")
    }
}
