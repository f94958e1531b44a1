//! Abstract syntax tree and its HTML evaluator.
//!
//! Nodes own plain strings and never point back into the token stream, so a
//! [`Document`] outlives the source it was parsed from. Text is stored raw and
//! escaped while rendering.
//!
//! Rendering cannot fail: every node shape the parser can build has an HTML
//! form, so `render` returns a `String` rather than a `Result`.

use crate::escape::escape_html;
use crate::options::RenderOptions;

/// A parsed document: the root of the tree.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Document {
    /// Top-level blocks in source order.
    pub blocks: Vec<Block>,
}

/// Any node of the tree, block level or inline.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize),
    serde(rename_all = "snake_case")
)]
pub enum Block {
    Heading(Heading),
    Paragraph(Paragraph),
    Modifier(Modifier),
    Code(Code),
    Link(Link),
    Image(Image),
    List(List),
    Quote(Quote),
    Callout(Callout),
    /// Raw text, escaped at render time.
    Literal(String),
    /// A character rendered through [`RenderOptions`] replacements.
    Replacer(char),
    /// Single line break inside a paragraph.
    SoftBreak,
}

/// `#` to `######` followed by a one-line title.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Heading {
    /// 1 to 6.
    pub level: u8,
    pub content: Paragraph,
}

/// Inline content. A paragraph that is not `one_line` renders inside `<p>`;
/// a one-line paragraph is the bare content of a heading, list item, quote
/// line or caption.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Paragraph {
    pub content: Vec<Block>,
    pub one_line: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize),
    serde(rename_all = "lowercase")
)]
pub enum ModifierTag {
    Em,
    Bold,
}

impl ModifierTag {
    /// HTML element name.
    pub const fn tag(self) -> &'static str {
        match self {
            ModifierTag::Em => "em",
            ModifierTag::Bold => "b",
        }
    }

    /// Tag for a closing run of `len` symbols, `None` past two.
    pub const fn for_run(len: usize) -> Option<Self> {
        match len {
            1 => Some(ModifierTag::Em),
            2 => Some(ModifierTag::Bold),
            _ => None,
        }
    }
}

/// Emphasis. `***x***` is a bold node wrapping an italic one.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Modifier {
    /// Delimiter run this node was closed with, e.g. `**` or `_`.
    pub symbols: String,
    pub tag: ModifierTag,
    pub content: Vec<Block>,
}

impl Modifier {
    /// Node closed by a run of `symbols`, wrapping `content`.
    ///
    /// Runs of three build a bold node around an italic one.
    pub fn closed_by(symbols: &str, content: Vec<Block>) -> Self {
        let mut chars = symbols.chars();
        match (ModifierTag::for_run(symbols.len()), chars.next()) {
            (Some(tag), _) => Self {
                symbols: symbols.to_string(),
                tag,
                content,
            },
            (None, first) => {
                let symbol = first.map(String::from).unwrap_or_default();
                let inner = Self {
                    symbols: symbol.clone(),
                    tag: ModifierTag::Em,
                    content,
                };
                Self {
                    symbols: symbol.repeat(2),
                    tag: ModifierTag::Bold,
                    content: vec![Block::Modifier(inner)],
                }
            }
        }
    }
}

/// Inline code span or fenced block.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Code {
    pub content: String,
    /// Text on the opening fence line; kept but not rendered.
    pub lang: Option<String>,
    pub multiline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Link {
    pub content: String,
    pub href: String,
    /// The link starts a continuation line and renders after a soft break.
    pub add_space: bool,
}

/// Block-level image, optionally followed by caption lines.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Image {
    pub alt: String,
    pub src: String,
    pub caption: Vec<Paragraph>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize),
    serde(rename_all = "lowercase")
)]
pub enum ListKind {
    Unordered,
    Ordered,
}

impl ListKind {
    pub const fn tag(self) -> &'static str {
        match self {
            ListKind::Unordered => "ul",
            ListKind::Ordered => "ol",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct List {
    pub kind: ListKind,
    pub items: Vec<Paragraph>,
}

/// `>` lines plus the attribution lines right after them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Quote {
    pub lines: Vec<Paragraph>,
    pub sources: Vec<Paragraph>,
}

/// `> [!KIND] title` admonition.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Callout {
    /// Lower-cased kind, e.g. `note`.
    pub kind: String,
    pub title: Paragraph,
    pub content: Vec<Paragraph>,
}

impl Document {
    /// Render the whole document.
    pub fn render(&self, options: &RenderOptions) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            block.render_into(options, &mut out);
        }
        out
    }

    /// Plain text of the document, one line per top-level block.
    pub fn text(&self) -> String {
        let lines: Vec<String> = self.blocks.iter().map(Block::text).collect();
        lines.join("\n")
    }

    /// Text of the first heading, if any.
    pub fn title(&self) -> Option<String> {
        self.blocks.iter().find_map(|block| match block {
            Block::Heading(heading) => Some(heading.content.text().trim().to_string()),
            _ => None,
        })
    }
}

impl Block {
    /// Render to a fresh string.
    pub fn render(&self, options: &RenderOptions) -> String {
        let mut out = String::new();
        self.render_into(options, &mut out);
        out
    }

    /// Append the HTML of this node to `out`.
    pub fn render_into(&self, options: &RenderOptions, out: &mut String) {
        match self {
            Block::Heading(heading) => heading.render_into(options, out),
            Block::Paragraph(paragraph) => paragraph.render_into(options, out),
            Block::Modifier(modifier) => {
                let tag = modifier.tag.tag();
                out.push('<');
                out.push_str(tag);
                out.push('>');
                render_all(&modifier.content, options, out);
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
            Block::Code(code) => code.render_into(out),
            Block::Link(link) => {
                if link.add_space {
                    out.push_str(soft_break(options));
                }
                let mut content = String::new();
                escape_html(&mut content, &link.content);
                let mut href = String::new();
                escape_html(&mut href, &link.href);
                out.push_str(&options.render_link(&content, &href));
            }
            Block::Image(image) => image.render_into(options, out),
            Block::List(list) => {
                let tag = list.kind.tag();
                out.push('<');
                out.push_str(tag);
                out.push('>');
                for item in &list.items {
                    out.push_str("<li>");
                    out.push_str(item.render(options).trim());
                    out.push_str("</li>");
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
            Block::Quote(quote) => quote.render_into(options, out),
            Block::Callout(callout) => callout.render_into(options, out),
            Block::Literal(text) => escape_html(out, text),
            Block::Replacer(c) => match options.replacement(*c) {
                Some(html) => out.push_str(html),
                None => {
                    let mut buf = [0u8; 4];
                    escape_html(out, c.encode_utf8(&mut buf));
                }
            },
            Block::SoftBreak => out.push_str(soft_break(options)),
        }
    }

    /// Text content with every markup stripped.
    pub fn text(&self) -> String {
        match self {
            Block::Heading(heading) => heading.content.text().trim().to_string(),
            Block::Paragraph(paragraph) => paragraph.text().trim().to_string(),
            Block::Modifier(modifier) => modifier.content.iter().map(Block::text).collect(),
            Block::Code(code) => code.content.clone(),
            Block::Link(link) if link.add_space => format!(" {}", link.content),
            Block::Link(link) => link.content.clone(),
            Block::Image(image) => {
                let mut parts = vec![image.alt.clone()];
                parts.extend(image.caption.iter().map(|c| c.text().trim().to_string()));
                parts.join(" ")
            }
            Block::List(list) => list
                .items
                .iter()
                .map(|item| item.text().trim().to_string())
                .collect::<Vec<_>>()
                .join("\n"),
            Block::Quote(quote) => quote
                .lines
                .iter()
                .chain(&quote.sources)
                .map(|line| line.text().trim().to_string())
                .collect::<Vec<_>>()
                .join(" "),
            Block::Callout(callout) => std::iter::once(&callout.title)
                .chain(&callout.content)
                .map(|p| p.text().trim().to_string())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join("\n"),
            Block::Literal(text) => text.clone(),
            Block::Replacer(c) => c.to_string(),
            Block::SoftBreak => " ".to_string(),
        }
    }

    /// Short lower-case name of the node kind.
    pub const fn name(&self) -> &'static str {
        match self {
            Block::Heading(_) => "heading",
            Block::Paragraph(_) => "paragraph",
            Block::Modifier(_) => "modifier",
            Block::Code(_) => "code",
            Block::Link(_) => "link",
            Block::Image(_) => "image",
            Block::List(_) => "list",
            Block::Quote(_) => "quote",
            Block::Callout(_) => "callout",
            Block::Literal(_) => "literal",
            Block::Replacer(_) => "replacer",
            Block::SoftBreak => "soft_break",
        }
    }
}

impl Heading {
    fn render_into(&self, options: &RenderOptions, out: &mut String) {
        let level = self.level.to_string();
        out.push_str("<h");
        out.push_str(&level);
        out.push('>');
        out.push_str(self.content.render(options).trim());
        out.push_str("</h");
        out.push_str(&level);
        out.push('>');
    }
}

impl Paragraph {
    pub fn new(content: Vec<Block>, one_line: bool) -> Self {
        Self { content, one_line }
    }

    pub fn render(&self, options: &RenderOptions) -> String {
        let mut out = String::new();
        self.render_into(options, &mut out);
        out
    }

    pub fn render_into(&self, options: &RenderOptions, out: &mut String) {
        if self.one_line {
            render_all(&self.content, options, out);
            return;
        }
        let mut inner = String::new();
        render_all(&self.content, options, &mut inner);
        out.push_str("<p>");
        out.push_str(inner.trim());
        out.push_str("</p>");
    }

    pub fn text(&self) -> String {
        self.content.iter().map(Block::text).collect()
    }

    /// Check that the paragraph holds nothing but whitespace.
    pub fn is_blank(&self) -> bool {
        self.content.iter().all(|block| match block {
            Block::Literal(text) => text.trim().is_empty(),
            Block::SoftBreak => true,
            _ => false,
        })
    }
}

impl Code {
    fn render_into(&self, out: &mut String) {
        if self.multiline {
            out.push_str("<pre><code>");
            escape_html(out, &self.content);
            out.push_str("</code></pre>");
        } else {
            out.push_str("<code>");
            escape_html(out, &self.content);
            out.push_str("</code>");
        }
    }
}

impl Image {
    fn render_into(&self, options: &RenderOptions, out: &mut String) {
        out.push_str("<figure><img alt=\"");
        escape_html(out, &self.alt);
        out.push_str("\" src=\"");
        escape_html(out, &options.image_source(&self.src));
        out.push_str("\">");
        let caption = join_lines(&self.caption, options);
        if !caption.is_empty() {
            out.push_str("<figcaption>");
            out.push_str(&caption);
            out.push_str("</figcaption>");
        }
        out.push_str("</figure>");
    }
}

impl Quote {
    fn render_into(&self, options: &RenderOptions, out: &mut String) {
        out.push_str("<div class=\"quote\"><blockquote>");
        out.push_str(&join_lines(&self.lines, options));
        out.push_str("</blockquote>");
        let sources = join_lines(&self.sources, options);
        if !sources.is_empty() {
            out.push_str("<p>");
            out.push_str(&sources);
            out.push_str("</p>");
        }
        out.push_str("</div>");
    }
}

impl Callout {
    fn render_into(&self, options: &RenderOptions, out: &mut String) {
        out.push_str("<div data-kind=\"");
        escape_html(out, &self.kind);
        out.push_str("\" class=\"callout\"><h4>");
        let title = self.title.render(options);
        match title.trim() {
            "" => escape_html(out, &self.kind),
            title => out.push_str(title),
        }
        out.push_str("</h4><div>");
        for paragraph in &self.content {
            out.push_str("<p>");
            out.push_str(paragraph.render(options).trim());
            out.push_str("</p>");
        }
        out.push_str("</div></div>");
    }
}

#[inline]
fn render_all(blocks: &[Block], options: &RenderOptions, out: &mut String) {
    for block in blocks {
        block.render_into(options, out);
    }
}

#[inline]
fn soft_break(options: &RenderOptions) -> &'static str {
    if options.poem_mode() {
        "<br/>"
    } else {
        " "
    }
}

/// Render one-line paragraphs trimmed, skipping empty ones, separated by soft breaks.
fn join_lines(lines: &[Paragraph], options: &RenderOptions) -> String {
    let mut out = String::new();
    for line in lines {
        let rendered = line.render(options);
        let rendered = rendered.trim();
        if rendered.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push_str(soft_break(options));
        }
        out.push_str(rendered);
    }
    out
}
