//! # smallmark core
//!
//! A small markdown dialect compiled to semantic HTML, written for personal
//! websites: headings, paragraphs, emphasis, code, links, captioned images,
//! lists, quotes with attribution and callouts.
//!
//! The pipeline is three passes over the input:
//!
//! 1. [`lexer::lex`] turns the text into a [`TokenStream`]
//! 2. [`parser::ast`] builds a [`Document`] with a recursive descent parser
//! 3. [`Document::render`] evaluates the tree to HTML
//!
//! ## Quick Start
//!
//! ```rust
//! use smallmark_core::{parse, RenderOptions};
//!
//! let html = parse("Hello **world**!", &RenderOptions::default()).unwrap();
//! assert_eq!(html, "<p>Hello <b>world</b>!</p>");
//! ```
//!
//! ## Errors
//!
//! Malformed emphasis or code fences are hard errors. A [`ParseError`] can
//! render a diagnostic pointing at the offending token:
//!
//! ```rust
//! use smallmark_core::{parse, RenderOptions};
//!
//! let err = parse("**bonsoir", &RenderOptions::default()).unwrap_err();
//! println!("{}", err.pretty());
//! ```
//!
//! Malformed links and images are not errors: they render as plain text.

pub mod ast;
pub mod error;
pub mod escape;
pub mod inline;
pub mod lexer;
pub mod options;
pub mod parser;
pub mod span;
pub mod stream;

pub use ast::{Block, Document};
pub use error::{ErrorKind, ParseError};
pub use lexer::{Token, TokenKind};
pub use options::RenderOptions;
pub use stream::TokenStream;

/// Parse `source` into a tree without rendering it.
pub fn parse_document(source: &str, options: &RenderOptions) -> Result<Document, ParseError> {
    let mut stream = lexer::lex(source, options);
    parser::ast(&mut stream)
}

/// Compile `source` to HTML.
pub fn parse(source: &str, options: &RenderOptions) -> Result<String, ParseError> {
    Ok(parse_document(source, options)?.render(options))
}

/// Compile UTF-8 bytes to HTML. Invalid sequences become U+FFFD.
pub fn parse_bytes(bytes: &[u8], options: &RenderOptions) -> Result<String, ParseError> {
    parse(&String::from_utf8_lossy(bytes), options)
}

/// A compiler bound to one set of options.
///
/// # Example
///
/// ```rust
/// use smallmark_core::{Parser, RenderOptions};
///
/// let parser = Parser::new(RenderOptions::new().with_poem_mode(true));
/// let html = parser.render("roses are red\nviolets are blue").unwrap();
/// assert_eq!(html, "<p>roses are red<br/>violets are blue</p>");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Parser {
    options: RenderOptions,
}

impl Parser {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    #[inline]
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Parse without rendering.
    pub fn parse(&self, source: &str) -> Result<Document, ParseError> {
        parse_document(source, &self.options)
    }

    pub fn render(&self, source: &str) -> Result<String, ParseError> {
        parse(source, &self.options)
    }

    pub fn render_bytes(&self, bytes: &[u8]) -> Result<String, ParseError> {
        parse_bytes(bytes, &self.options)
    }
}
