//! Python bindings for the smallmark compiler.

use std::collections::HashMap;

use pyo3::create_exception;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use smallmark_core::{
    lexer, ParseError as CoreParseError, Parser as CoreParser, RenderOptions,
    Token as CoreToken,
};

create_exception!(
    pysmark,
    ParseError,
    PyValueError,
    "Raised when a document cannot be compiled. The message is the caret diagnostic."
);

/// Build the Python exception for a core failure.
///
/// The exception carries `kind`, `line` and `column` attributes.
fn to_py_err(py: Python<'_>, err: CoreParseError) -> PyErr {
    let exc = ParseError::new_err(err.pretty());
    let value = exc.value(py);
    let annotated = value
        .setattr("kind", err.kind().to_string())
        .and_then(|()| value.setattr("line", err.line()))
        .and_then(|()| value.setattr("column", err.column()));
    match annotated {
        Ok(()) => exc,
        Err(e) => e,
    }
}

// ============================================================================
// Token
// ============================================================================

/// A lexical token with its byte offsets in the source.
#[pyclass(frozen, get_all, name = "Token")]
#[derive(Clone)]
pub struct PyToken {
    pub kind: String,
    pub text: String,
    pub start: u32,
    pub end: u32,
}

#[pymethods]
impl PyToken {
    fn __repr__(&self) -> String {
        format!(
            "Token({}, {:?}, {}..{})",
            self.kind, self.text, self.start, self.end
        )
    }

    fn __len__(&self) -> usize {
        self.end.saturating_sub(self.start) as usize
    }
}

impl From<&CoreToken> for PyToken {
    fn from(t: &CoreToken) -> Self {
        PyToken {
            kind: t.kind.name().to_string(),
            text: t.text.clone(),
            start: t.span.start,
            end: t.span.end,
        }
    }
}

// ============================================================================
// Renderer
// ============================================================================

fn build_options(
    replacements: Option<HashMap<char, String>>,
    poem_mode: bool,
    static_prefix: Option<String>,
    current_page: Option<String>,
) -> RenderOptions {
    let mut options = RenderOptions::new()
        .with_poem_mode(poem_mode)
        .with_replacements(replacements.unwrap_or_default());
    if let Some(prefix) = static_prefix {
        options = options.with_static_prefix(prefix);
    }
    if let Some(page) = current_page {
        options = options.with_current_page(page);
    }
    options
}

/// Compiler bound to one set of options.
///
/// Args:
///     replacements: dict mapping single characters to raw HTML
///     poem_mode: render line breaks inside paragraphs as <br/>
///     static_prefix: prefix for relative image sources
///     current_page: URL of the page, links to it get class="target"
#[pyclass(frozen, name = "Renderer")]
pub struct PyRenderer {
    parser: CoreParser,
}

#[pymethods]
impl PyRenderer {
    #[new]
    #[pyo3(
        signature = (replacements=None, poem_mode=false, static_prefix=None, current_page=None),
        text_signature = "(replacements=None, poem_mode=False, static_prefix=None, current_page=None)"
    )]
    fn new(
        replacements: Option<HashMap<char, String>>,
        poem_mode: bool,
        static_prefix: Option<String>,
        current_page: Option<String>,
    ) -> Self {
        let options = build_options(replacements, poem_mode, static_prefix, current_page);
        PyRenderer {
            parser: CoreParser::new(options),
        }
    }

    /// Compile a document to HTML. Raises ParseError on error.
    #[pyo3(text_signature = "(self, source)")]
    fn render(&self, py: Python<'_>, source: &str) -> PyResult<String> {
        self.parser.render(source).map_err(|e| to_py_err(py, e))
    }

    /// Raise ParseError if the document does not compile.
    #[pyo3(text_signature = "(self, source)")]
    fn check(&self, py: Python<'_>, source: &str) -> PyResult<()> {
        self.parser
            .parse(source)
            .map(|_| ())
            .map_err(|e| to_py_err(py, e))
    }

    /// Tokenize a document with this renderer's replacements.
    #[pyo3(text_signature = "(self, source)")]
    fn tokens(&self, source: &str) -> Vec<PyToken> {
        lexer::lex(source, self.parser.options())
            .iter()
            .map(PyToken::from)
            .collect()
    }

    fn __repr__(&self) -> String {
        let options = self.parser.options();
        format!(
            "Renderer(replacements={}, poem_mode={}, current_page={:?})",
            options.replacements().len(),
            options.poem_mode(),
            options.current_page()
        )
    }
}

// ============================================================================
// Module functions
// ============================================================================

/// Compile a document to HTML.
///
/// Args:
///     source: Document text
///     replacements: dict mapping single characters to raw HTML
///     poem_mode: render line breaks inside paragraphs as <br/>
///     static_prefix: prefix for relative image sources
///     current_page: URL of the page being rendered
///
/// Returns:
///     str: The HTML
///
/// Raises:
///     ParseError: On malformed emphasis, code, headings or callouts
#[pyfunction]
#[pyo3(
    signature = (source, replacements=None, poem_mode=false, static_prefix=None, current_page=None),
    text_signature = "(source, replacements=None, poem_mode=False, static_prefix=None, current_page=None)"
)]
fn render(
    py: Python<'_>,
    source: &str,
    replacements: Option<HashMap<char, String>>,
    poem_mode: bool,
    static_prefix: Option<String>,
    current_page: Option<String>,
) -> PyResult<String> {
    let options = build_options(replacements, poem_mode, static_prefix, current_page);
    smallmark_core::parse(source, &options).map_err(|e| to_py_err(py, e))
}

/// Tokenize a document.
///
/// Returns:
///     list[Token]: Tokens in source order
#[pyfunction]
#[pyo3(text_signature = "(source)")]
fn tokens(source: &str) -> Vec<PyToken> {
    lexer::lex(source, &RenderOptions::default())
        .iter()
        .map(PyToken::from)
        .collect()
}

// ============================================================================
// Module
// ============================================================================

/// smallmark - markdown dialect compiler for personal websites.
#[pymodule]
fn pysmark(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add("ParseError", m.py().get_type::<ParseError>())?;
    m.add_class::<PyToken>()?;
    m.add_class::<PyRenderer>()?;
    m.add_function(wrap_pyfunction!(render, m)?)?;
    m.add_function(wrap_pyfunction!(tokens, m)?)?;
    Ok(())
}
