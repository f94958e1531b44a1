//! Block-level recursive descent parser.
//!
//! [`ast`] walks the token stream and asks [`get_block`] what starts at each
//! position. Whether the cursor sits at the start of a line decides most of
//! the dispatch: a `#` mid-sentence is text, at line start it is a heading.
//!
//! Like the inline parser, each construct is entered with the cursor on its
//! first token and leaves it on the last token it consumed.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, trace};

use crate::ast::{Block, Callout, Code, Document, Heading, Image, List, ListKind, Paragraph, Quote};
use crate::error::{ErrorKind, ParseError};
use crate::inline::{delimited, paragraph};
use crate::lexer::{Token, TokenKind};
use crate::stream::TokenStream;

static ORDERED_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\.$").expect("ordered marker pattern is valid"));

/// Deepest heading level.
const MAX_HEADING_LEVEL: usize = 6;

/// Parse the whole stream into a document.
///
/// The cursor is reset first, so a stream can be parsed more than once.
pub fn ast(stream: &mut TokenStream) -> Result<Document, ParseError> {
    let mut blocks = Vec::new();
    let mut new_line = true;

    stream.reset();
    while stream.advance() {
        if let Some(block) = get_block(stream, new_line)? {
            blocks.push(block);
        }
        new_line = stream.current_kind() == Some(TokenKind::Break);
    }

    Ok(Document { blocks })
}

/// Parse the block starting at the cursor. Line breaks produce nothing.
pub fn get_block(stream: &mut TokenStream, new_line: bool) -> Result<Option<Block>, ParseError> {
    let Some(token) = stream.current() else {
        return Ok(None);
    };
    let kind = token.kind;
    let width = token.width();
    let is_image = token.is(TokenKind::External, "![");
    trace!(%kind, new_line, position = ?stream.index(), "dispatch block");

    let block = match kind {
        TokenKind::Break => return Ok(None),
        TokenKind::Heading if new_line => Block::Heading(heading(stream)?),
        TokenKind::External if new_line && is_image => image(stream)?,
        TokenKind::Quote if new_line => quote(stream)?,
        TokenKind::List if new_line => list(stream)?,
        TokenKind::Code if width == 3 && !new_line => {
            return Err(ParseError::new(ErrorKind::InvalidCodeBlockPosition, stream))
        }
        TokenKind::Code if width == 3 => Block::Code(code(stream)?),
        TokenKind::Code if width != 1 => {
            return Err(ParseError::new(ErrorKind::InvalidCodeFormat, stream))
        }
        TokenKind::Callout if new_line => {
            return Err(ParseError::new(ErrorKind::UnknownToken(kind), stream))
        }
        _ => Block::Paragraph(paragraph(stream, false)?),
    };
    Ok(Some(block))
}

/// Check if the token at `index` opens a block when it starts a line.
pub fn starts_block(tokens: &[Token], index: usize) -> bool {
    let Some(token) = tokens.get(index) else {
        return false;
    };
    match token.kind {
        TokenKind::Heading | TokenKind::Quote => true,
        TokenKind::List => list_marker(tokens, index).is_some(),
        TokenKind::External => token.text == "![",
        TokenKind::Code => token.width() == 3,
        _ => false,
    }
}

/// Kind of the list item marker at `index`, if it is one.
///
/// A marker is `-`, `*` or digits followed by a dot, then a blank.
pub fn list_marker(tokens: &[Token], index: usize) -> Option<ListKind> {
    let token = tokens.get(index)?;
    if token.kind != TokenKind::List {
        return None;
    }
    let kind = match token.text.as_str() {
        "-" | "*" => ListKind::Unordered,
        text if ORDERED_MARKER.is_match(text) => ListKind::Ordered,
        _ => return None,
    };
    let next = tokens.get(index + 1)?;
    let spaced = next.kind == TokenKind::Literal && next.text.starts_with([' ', '\t']);
    spaced.then_some(kind)
}

fn heading(stream: &mut TokenStream) -> Result<Heading, ParseError> {
    let level = stream.current().map_or(0, Token::width);
    if level > MAX_HEADING_LEVEL {
        return Err(ParseError::new(ErrorKind::InvalidHeading, stream));
    }
    if !stream.advance() {
        return Err(ParseError::new(ErrorKind::InvalidHeading, stream));
    }
    let content = paragraph(stream, true)?;
    Ok(Heading {
        level: level as u8,
        content,
    })
}

/// Fenced code block. Text on the opening fence line is the language tag.
fn code(stream: &mut TokenStream) -> Result<Code, ParseError> {
    let fence = match stream.current() {
        Some(token) => token.text.clone(),
        None => return Err(ParseError::new(ErrorKind::InvalidCodeFormat, stream)),
    };
    let mut lang = String::new();
    let mut content = String::new();
    let mut in_body = false;

    loop {
        if !stream.advance() {
            return Err(ParseError::new(ErrorKind::InvalidCodeFormat, stream));
        }
        let Some(token) = stream.current() else {
            return Err(ParseError::new(ErrorKind::InvalidCodeFormat, stream));
        };
        if token.is(TokenKind::Code, &fence) {
            break;
        }
        if in_body {
            content.push_str(&token.text);
        } else if token.kind == TokenKind::Break {
            // the line break closing the fence line is not content
            content.push_str(token.text.get(1..).unwrap_or_default());
            in_body = true;
        } else {
            lang.push_str(&token.text);
        }
    }

    let lang = lang.trim();
    Ok(Code {
        content,
        lang: (!lang.is_empty()).then(|| lang.to_string()),
        multiline: true,
    })
}

/// Block image `![alt](src)`, alone on its line, then optional caption lines.
///
/// Anything else falls back to a paragraph starting with a literal `![`.
fn image(stream: &mut TokenStream) -> Result<Block, ParseError> {
    let mark = stream.save();
    let parsed = delimited(stream).filter(|_| {
        stream
            .peek()
            .map_or(true, |next| next.kind == TokenKind::Break)
    });
    let Some((alt, src)) = parsed else {
        stream.restore(mark);
        debug!(position = ?stream.index(), "malformed image kept as text");
        return Ok(Block::Paragraph(paragraph(stream, false)?));
    };

    let mut caption = Vec::new();
    if stream.peek().is_some_and(is_single_break) {
        stream.advance();
        while !next_starts_block(stream) {
            if !stream.advance() {
                stream.retreat();
                break;
            }
            caption.push(paragraph(stream, true)?);
            if !stream.current().is_some_and(is_single_break) {
                break;
            }
        }
    }

    Ok(Block::Image(Image { alt, src, caption }))
}

fn list(stream: &mut TokenStream) -> Result<Block, ParseError> {
    let kind = stream
        .index()
        .and_then(|i| list_marker(stream.tokens(), i));
    let Some(kind) = kind else {
        trace!(position = ?stream.index(), "list marker without item, parsed as text");
        return Ok(Block::Paragraph(paragraph(stream, false)?));
    };

    let mut items = Vec::new();
    loop {
        // a marker is always followed by the item text
        if !stream.advance() {
            stream.retreat();
            break;
        }
        items.push(paragraph(stream, true)?);

        if !stream.current().is_some_and(is_single_break) {
            break;
        }
        let next = stream.index().map(|i| i + 1);
        if next.and_then(|i| list_marker(stream.tokens(), i)) != Some(kind) {
            break;
        }
        stream.advance();
    }

    Ok(Block::List(List { kind, items }))
}

/// `>` lines, then attribution lines up to a blank line or another block.
fn quote(stream: &mut TokenStream) -> Result<Block, ParseError> {
    if let Some(callout) = try_callout(stream)? {
        return Ok(callout);
    }

    let mut quote = Quote::default();
    loop {
        if let Some(line) = quote_line(stream)? {
            quote.lines.push(line);
        }
        if !stream.current().is_some_and(is_single_break) {
            return Ok(Block::Quote(quote));
        }
        match stream.peek() {
            Some(next) if next.kind == TokenKind::Quote => {
                stream.advance();
            }
            Some(_) => break,
            None => return Ok(Block::Quote(quote)),
        }
    }

    while !next_starts_block(stream) {
        if !stream.advance() {
            stream.retreat();
            break;
        }
        quote.sources.push(paragraph(stream, true)?);
        if !stream.current().is_some_and(is_single_break) {
            break;
        }
    }

    Ok(Block::Quote(quote))
}

/// Parse the rest of a quoted line, the cursor being on its `>`.
///
/// Blank lines give `None`.
fn quote_line(stream: &mut TokenStream) -> Result<Option<Paragraph>, ParseError> {
    if !stream.advance() {
        stream.retreat();
        return Ok(None);
    }
    if stream.current_kind() == Some(TokenKind::Break) {
        return Ok(None);
    }
    let line = paragraph(stream, true)?;
    Ok((!line.is_blank()).then_some(line))
}

/// Switch to [`callout`] when the first quoted line opens with `[!`.
fn try_callout(stream: &mut TokenStream) -> Result<Option<Block>, ParseError> {
    let mark = stream.save();
    stream.advance();
    if stream.current().is_some_and(Token::is_blank) {
        stream.advance();
    }
    if stream
        .current()
        .is_some_and(|t| t.is(TokenKind::Callout, "[!"))
    {
        return callout(stream).map(Some);
    }
    stream.restore(mark);
    Ok(None)
}

/// `[!KIND] title` followed by `>` body lines. The cursor is on `[!`.
fn callout(stream: &mut TokenStream) -> Result<Block, ParseError> {
    let mut kind = String::new();
    loop {
        if !stream.advance() {
            return Err(ParseError::new(ErrorKind::InvalidCallout, stream));
        }
        let Some(token) = stream.current() else {
            return Err(ParseError::new(ErrorKind::InvalidCallout, stream));
        };
        match token.kind {
            TokenKind::Callout if token.text == "]" => break,
            TokenKind::Literal | TokenKind::List => kind.push_str(&token.text),
            _ => return Err(ParseError::new(ErrorKind::InvalidCallout, stream)),
        }
    }
    let kind = kind.trim().to_lowercase();
    if kind.is_empty() {
        return Err(ParseError::new(ErrorKind::InvalidCallout, stream));
    }

    let title = match stream.peek() {
        None => Paragraph::new(Vec::new(), true),
        Some(next) if next.kind == TokenKind::Break => {
            stream.advance();
            Paragraph::new(Vec::new(), true)
        }
        Some(_) => {
            stream.advance();
            paragraph(stream, true)?
        }
    };

    let mut content = Vec::new();
    while stream.current().is_some_and(is_single_break)
        && stream.peek().is_some_and(|t| t.kind == TokenKind::Quote)
    {
        stream.advance();
        if let Some(line) = quote_line(stream)? {
            content.push(line);
        }
    }

    Ok(Block::Callout(Callout {
        kind,
        title,
        content,
    }))
}

#[inline]
fn is_single_break(token: &Token) -> bool {
    token.kind == TokenKind::Break && token.width() == 1
}

/// Check if the line after the cursor is missing or opens another block.
fn next_starts_block(stream: &TokenStream) -> bool {
    match stream.index() {
        Some(i) => i + 1 >= stream.len() || starts_block(stream.tokens(), i + 1),
        None => true,
    }
}
