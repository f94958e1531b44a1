//! Inline parser: paragraphs and what can live inside them.
//!
//! Every function here is entered with the cursor on the first token of its
//! construct and leaves it on the last token it consumed, so the caller's
//! next [`TokenStream::advance`] lands on fresh input.

use tracing::debug;

use crate::ast::{Block, Code, Link, Modifier, ModifierTag, Paragraph};
use crate::error::{ErrorKind, ParseError};
use crate::lexer::TokenKind;
use crate::parser::starts_block;
use crate::stream::TokenStream;

/// Deepest emphasis nesting accepted before giving up.
pub const MAX_NESTING: usize = 64;

/// Parse a paragraph.
///
/// A one-line paragraph stops at the first line break; any other stops at a
/// blank line, or at a line that opens another block. Single line breaks in
/// between become [`Block::SoftBreak`].
pub fn paragraph(stream: &mut TokenStream, one_line: bool) -> Result<Paragraph, ParseError> {
    let max_break = if one_line { 1 } else { 2 };
    let mut content: Vec<Block> = Vec::new();
    let mut n = 0;

    stream.retreat();
    while stream.advance() && n < max_break {
        let Some(token) = stream.current().cloned() else {
            break;
        };
        if token.kind == TokenKind::Break {
            n += token.width();
            continue;
        }
        if n > 0 && stream.index().is_some_and(|i| starts_block(stream.tokens(), i)) {
            stream.retreat();
            return Ok(Paragraph::new(content, one_line));
        }

        let continued = n > 0 && !content.is_empty();
        n = 0;
        if continued && !token.is(TokenKind::External, "[") {
            content.push(Block::SoftBreak);
        }

        match token.kind {
            TokenKind::Code => match token.width() {
                1 => content.push(Block::Code(code_span(stream)?)),
                3 => {
                    return Err(ParseError::new(
                        ErrorKind::InvalidCodeBlockPosition,
                        stream,
                    ))
                }
                _ => return Err(ParseError::new(ErrorKind::InvalidParagraph, stream)),
            },
            TokenKind::Modifier => {
                content.push(Block::Modifier(modifier(stream, max_break)?));
            }
            TokenKind::External if token.text == "[" => match link(stream) {
                Some(mut link) => {
                    link.add_space = continued;
                    content.push(Block::Link(link));
                }
                None => {
                    if continued {
                        content.push(Block::SoftBreak);
                    }
                    push_text(&mut content, &token.text);
                }
            },
            TokenKind::Replace => push_replacer(&mut content, &token.text),
            _ => push_text(&mut content, &token.text),
        }
    }

    // the token that ended the loop belongs to the caller
    stream.retreat();
    Ok(Paragraph::new(content, one_line))
}

/// An emphasis run still waiting for its closer.
struct Frame {
    symbols: String,
    content: Vec<Block>,
}

impl Frame {
    fn new(symbols: &str) -> Self {
        Self {
            symbols: symbols.to_string(),
            content: Vec::new(),
        }
    }
}

/// Parse emphasis opened by the modifier under the cursor.
///
/// Open runs live on an explicit stack. A closer equal to the innermost open
/// run closes it. A shorter closer of the same symbol peels one tag off a
/// run of three and leaves the rest open. Any other run opens a new level.
pub fn modifier(stream: &mut TokenStream, max_break: usize) -> Result<Modifier, ParseError> {
    let mut stack = match stream.current() {
        Some(token) => vec![Frame::new(&token.text)],
        None => return Err(ParseError::new(ErrorKind::InvalidModifier, stream)),
    };

    while stream.advance() {
        let Some(token) = stream.current().cloned() else {
            break;
        };

        if token.kind == TokenKind::Modifier {
            let symbols = token.text.as_str();
            let (closes, partial) = match stack.last() {
                Some(top) => (top.symbols == symbols, partial_close(&top.symbols, symbols)),
                None => break,
            };

            if closes {
                let Some(frame) = stack.pop() else { break };
                let node = Modifier::closed_by(&frame.symbols, frame.content);
                match stack.last_mut() {
                    Some(parent) => parent.content.push(Block::Modifier(node)),
                    None => return Ok(node),
                }
            } else if let (Some(tag), Some(top)) = (partial, stack.last_mut()) {
                let content = std::mem::take(&mut top.content);
                top.content.push(Block::Modifier(Modifier {
                    symbols: symbols.to_string(),
                    tag,
                    content,
                }));
                top.symbols.truncate(top.symbols.len() - symbols.len());
            } else {
                if stack.len() >= MAX_NESTING {
                    return Err(ParseError::new(ErrorKind::NestingTooDeep, stream));
                }
                stack.push(Frame::new(symbols));
            }
            continue;
        }

        let Some(top) = stack.last_mut() else { break };
        match token.kind {
            TokenKind::Break if token.width() < max_break => top.content.push(Block::SoftBreak),
            TokenKind::Break => return Err(ParseError::new(ErrorKind::InvalidModifier, stream)),
            TokenKind::Code => match token.width() {
                1 => top.content.push(Block::Code(code_span(stream)?)),
                3 => {
                    return Err(ParseError::new(
                        ErrorKind::InvalidCodeBlockPosition,
                        stream,
                    ))
                }
                _ => return Err(ParseError::new(ErrorKind::InvalidParagraph, stream)),
            },
            TokenKind::External if token.text == "[" => match link(stream) {
                Some(link) => top.content.push(Block::Link(link)),
                None => push_text(&mut top.content, &token.text),
            },
            TokenKind::Replace => push_replacer(&mut top.content, &token.text),
            _ => push_text(&mut top.content, &token.text),
        }
    }

    Err(ParseError::new(ErrorKind::InvalidModifier, stream))
}

/// Tag peeled off an open run of three by a shorter closer of the same symbol.
fn partial_close(open: &str, closer: &str) -> Option<ModifierTag> {
    if open.len() == 3 && closer.len() < 3 && open.starts_with(closer) {
        ModifierTag::for_run(closer.len())
    } else {
        None
    }
}

/// Parse an inline code span. Its content is kept verbatim.
pub fn code_span(stream: &mut TokenStream) -> Result<Code, ParseError> {
    let fence = match stream.current() {
        Some(token) => token.text.clone(),
        None => return Err(ParseError::new(ErrorKind::InvalidCodeFormat, stream)),
    };
    let mut content = String::new();

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
        if token.kind == TokenKind::Break {
            return Err(ParseError::new(ErrorKind::InvalidCodeFormat, stream));
        }
        content.push_str(&token.text);
    }

    Ok(Code {
        content,
        lang: None,
        multiline: false,
    })
}

/// Parse `[text](href)`.
///
/// On malformed input the cursor goes back to the opening `[` and `None` is
/// returned; the caller keeps the bracket as text.
pub fn link(stream: &mut TokenStream) -> Option<Link> {
    let mark = stream.save();
    match delimited(stream) {
        Some((content, href)) => Some(Link {
            content,
            href,
            add_space: false,
        }),
        None => {
            stream.restore(mark);
            debug!(position = ?stream.index(), "malformed link kept as text");
            None
        }
    }
}

/// Read `text](target)` after an opening delimiter.
///
/// Leaves the cursor on the closing `)`. Returns `None` on a line break, on
/// the end of input, or on any delimiter out of place.
pub fn delimited(stream: &mut TokenStream) -> Option<(String, String)> {
    let text = read_until(stream, "](")?;
    let target = read_until(stream, ")")?;
    Some((text, target))
}

fn read_until(stream: &mut TokenStream, delimiter: &str) -> Option<String> {
    let mut out = String::new();
    while stream.advance() {
        let token = stream.current()?;
        match token.kind {
            TokenKind::External if token.text == delimiter => return Some(out),
            TokenKind::External | TokenKind::Break => return None,
            _ => out.push_str(&token.text),
        }
    }
    None
}

/// Append text, merging with a literal right before it.
fn push_text(content: &mut Vec<Block>, text: &str) {
    if let Some(Block::Literal(last)) = content.last_mut() {
        last.push_str(text);
        return;
    }
    content.push(Block::Literal(text.to_string()));
}

fn push_replacer(content: &mut Vec<Block>, text: &str) {
    if let Some(c) = text.chars().next() {
        content.push(Block::Replacer(c));
    }
}
