//! Rendering options.
//!
//! [`RenderOptions`] is built once by the embedding application and passed by
//! reference to the lexer and to every render call. It is never mutated while
//! a document renders, and it is `Send + Sync` so a single value can serve
//! documents rendered on several threads.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

static EXTERNAL_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://").expect("external link pattern is valid"));

/// Hook rewriting an image `src`.
pub type ImageSource = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Hook building the `<a>` tag from already escaped content and href.
pub type LinkRenderer = Arc<dyn Fn(&str, &str) -> String + Send + Sync>;

/// Options controlling how a document is lexed and rendered.
///
/// # Example
///
/// ```rust
/// use smallmark_core::RenderOptions;
///
/// let options = RenderOptions::new()
///     .with_static_prefix("/static")
///     .with_replacement('~', "&nbsp;")
///     .with_current_page("/logs/");
/// assert_eq!(options.image_source("pfp.jpg"), "/static/pfp.jpg");
/// ```
#[derive(Clone, Default)]
pub struct RenderOptions {
    image_source: Option<ImageSource>,
    link_renderer: Option<LinkRenderer>,
    replacements: HashMap<char, String>,
    poem_mode: bool,
    current_page: Option<String>,
}

impl RenderOptions {
    /// Options with every default: identity image sources, the default link
    /// renderer, no replacements and prose line breaks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewrite image sources with `f`.
    pub fn with_image_source<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.image_source = Some(Arc::new(f));
        self
    }

    /// Serve relative image sources from `prefix`; `http(s)://` sources are kept.
    pub fn with_static_prefix(self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.with_image_source(move |src| static_source(&prefix, src))
    }

    /// Replace the default link renderer.
    ///
    /// The hook receives the escaped link text and the escaped href.
    pub fn with_link_renderer<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &str) -> String + Send + Sync + 'static,
    {
        self.link_renderer = Some(Arc::new(f));
        self
    }

    /// Render every `c` of the source as the raw HTML `html`.
    pub fn with_replacement(mut self, c: char, html: impl Into<String>) -> Self {
        self.replacements.insert(c, html.into());
        self
    }

    pub fn with_replacements<I, S>(mut self, replacements: I) -> Self
    where
        I: IntoIterator<Item = (char, S)>,
        S: Into<String>,
    {
        self.replacements
            .extend(replacements.into_iter().map(|(c, html)| (c, html.into())));
        self
    }

    /// In poem mode a line break inside a paragraph renders as `<br/>`.
    pub fn with_poem_mode(mut self, enabled: bool) -> Self {
        self.poem_mode = enabled;
        self
    }

    /// URL of the page being rendered, used to highlight links pointing to it.
    pub fn with_current_page(mut self, url: impl Into<String>) -> Self {
        self.current_page = Some(url.into());
        self
    }

    #[inline]
    pub fn replacements(&self) -> &HashMap<char, String> {
        &self.replacements
    }

    #[inline]
    pub fn replacement(&self, c: char) -> Option<&str> {
        self.replacements.get(&c).map(String::as_str)
    }

    #[inline]
    pub fn poem_mode(&self) -> bool {
        self.poem_mode
    }

    #[inline]
    pub fn current_page(&self) -> Option<&str> {
        self.current_page.as_deref()
    }

    /// Run the image source hook.
    pub fn image_source(&self, src: &str) -> String {
        match &self.image_source {
            Some(hook) => hook(src),
            None => src.to_string(),
        }
    }

    /// Run the link renderer hook, or [`render_link`] when none is set.
    pub fn render_link(&self, content: &str, href: &str) -> String {
        match &self.link_renderer {
            Some(hook) => hook(content, href),
            None => render_link(content, href, self.current_page()),
        }
    }
}

impl fmt::Debug for RenderOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderOptions")
            .field("image_source", &self.image_source.is_some())
            .field("link_renderer", &self.link_renderer.is_some())
            .field("replacements", &self.replacements)
            .field("poem_mode", &self.poem_mode)
            .field("current_page", &self.current_page)
            .finish()
    }
}

/// Check if `href` leaves the site.
#[inline]
pub fn is_external(href: &str) -> bool {
    EXTERNAL_LINK.is_match(href)
}

/// Default link renderer.
///
/// Links to the current page (or to one of its parents, the root excepted) get
/// `class="target"`; external links open in a new tab without a referrer.
pub fn render_link(content: &str, href: &str, current_page: Option<&str>) -> String {
    let mut out = String::with_capacity(content.len() + href.len() + 64);
    out.push_str("<a href=\"");
    out.push_str(href);
    out.push('"');
    if current_page.is_some_and(|page| is_current(href, page)) {
        out.push_str(" class=\"target\"");
    }
    if is_external(href) {
        out.push_str(" target=\"_blank\" rel=\"noreferrer\"");
    }
    out.push('>');
    out.push_str(content);
    out.push_str("</a>");
    out
}

fn is_current(href: &str, page: &str) -> bool {
    if href.is_empty() {
        return false;
    }
    href == page || (href != "/" && page != "/" && page.starts_with(href))
}

fn static_source(prefix: &str, src: &str) -> String {
    if is_external(src) {
        return src.to_string();
    }
    format!(
        "{}/{}",
        prefix.trim_end_matches('/'),
        src.trim_start_matches('/')
    )
}
