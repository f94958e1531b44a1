use thiserror::Error;

use crate::lexer::{Token, TokenKind};
use crate::span::Span;
use crate::stream::TokenStream;

/// What went wrong while parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ErrorKind {
    /// Heading marker longer than six `#`, or with nothing after it.
    #[error("invalid heading")]
    InvalidHeading,
    /// Emphasis never closed, or closed by a run of the wrong length.
    #[error("invalid modifier organization")]
    InvalidModifier,
    /// Emphasis nested deeper than the parser accepts.
    #[error("modifiers nested too deeply")]
    NestingTooDeep,
    /// Code fence never closed, inline code spanning a line break, or a
    /// backtick run that is neither inline code nor a fence.
    #[error("invalid code format")]
    InvalidCodeFormat,
    /// Code fence that does not start a line.
    #[error("invalid code block position")]
    InvalidCodeBlockPosition,
    /// Malformed `[!KIND]` opener.
    #[error("invalid callout")]
    InvalidCallout,
    /// Token that cannot appear where it is inside a paragraph.
    #[error("invalid paragraph")]
    InvalidParagraph,
    /// The block dispatcher met a token kind it has no rule for.
    ///
    /// This is a lexer/parser mismatch and should never happen.
    #[error("internal error: unknown token type {0}")]
    UnknownToken(TokenKind),
}

impl ErrorKind {
    /// Errors raised while parsing the inside of a paragraph.
    pub const fn is_paragraph_error(self) -> bool {
        matches!(
            self,
            ErrorKind::InvalidParagraph
                | ErrorKind::InvalidModifier
                | ErrorKind::NestingTooDeep
                | ErrorKind::InvalidCodeBlockPosition
        )
    }

    /// Errors revealing a bug rather than bad input.
    pub const fn is_internal(self) -> bool {
        matches!(self, ErrorKind::UnknownToken(_))
    }
}

/// A parse failure and a copy of the token stream at the failing position.
///
/// The copy is what lets [`ParseError::pretty`] rebuild the offending source
/// line long after the parser is gone.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct ParseError {
    kind: ErrorKind,
    stream: TokenStream,
}

/// Where the failing token sits in its line.
struct Location {
    /// First token of the line.
    start: usize,
    /// One past the last token of the line.
    end: usize,
    /// Failing token.
    anchor: usize,
    /// The failure is after the end of the line rather than on a token.
    at_end: bool,
}

impl ParseError {
    /// Capture `kind` with the stream as it is now.
    pub fn new(kind: ErrorKind, stream: &TokenStream) -> Self {
        tracing::debug!(kind = %kind, position = ?stream.index(), "parse failed");
        Self {
            kind,
            stream: stream.clone(),
        }
    }

    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The token the parser failed on, or the last token when it ran out of input.
    pub fn token(&self) -> Option<&Token> {
        self.locate().map(|loc| &self.stream.tokens()[loc.anchor])
    }

    /// Source span of [`token`](Self::token).
    pub fn span(&self) -> Option<Span> {
        self.token().map(|t| t.span)
    }

    /// 1-based line of the failure.
    pub fn line(&self) -> usize {
        let Some(loc) = self.locate() else {
            return 1;
        };
        1 + self.stream.tokens()[..loc.start]
            .iter()
            .filter(|t| t.kind == TokenKind::Break)
            .map(Token::width)
            .sum::<usize>()
    }

    /// 1-based column (in characters) of the failure.
    pub fn column(&self) -> usize {
        let Some(loc) = self.locate() else {
            return 1;
        };
        let before = if loc.at_end { loc.end } else { loc.anchor };
        1 + self.stream.tokens()[loc.start..before]
            .iter()
            .map(Token::width)
            .sum::<usize>()
    }

    /// Multi-line diagnostic: the message, the offending source line and a
    /// `~~~^~~` marker line pointing at the failing token.
    ///
    /// ```text
    /// invalid code block position (line 1, column 6)
    ///
    /// test ``` hehe
    /// ~~~~~^~~~~~~~
    /// ```
    pub fn pretty(&self) -> String {
        let Some(loc) = self.locate() else {
            return self.to_string();
        };
        let tokens = self.stream.tokens();

        let mut context = String::new();
        let mut marker = String::new();
        for (i, token) in tokens.iter().enumerate().take(loc.end).skip(loc.start) {
            context.push_str(&token.text);
            for n in 0..token.width() {
                let caret = !loc.at_end && i == loc.anchor && n == 0;
                marker.push(if caret { '^' } else { '~' });
            }
        }
        if loc.at_end {
            marker.push('^');
        }

        format!(
            "{} (line {}, column {})\n\n{}\n{}",
            self,
            self.line(),
            self.column(),
            context,
            marker
        )
    }

    fn locate(&self) -> Option<Location> {
        let tokens = self.stream.tokens();
        let last = tokens.len().checked_sub(1)?;
        let anchor = self.stream.index().unwrap_or(0).min(last);

        let (end, at_end) = if tokens[anchor].kind == TokenKind::Break {
            (anchor, true)
        } else {
            let end = tokens[anchor..]
                .iter()
                .position(|t| t.kind == TokenKind::Break)
                .map_or(tokens.len(), |p| anchor + p);
            (end, self.stream.is_finished())
        };
        let start = tokens[..anchor]
            .iter()
            .rposition(|t| t.kind == TokenKind::Break)
            .map_or(0, |p| p + 1);

        Some(Location {
            start,
            end,
            anchor,
            at_end,
        })
    }
}
