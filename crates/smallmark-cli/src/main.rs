//! smallmark CLI - Compile, check and inspect smallmark documents
//!
//! Usage:
//!   smark [COMMAND] [OPTIONS] <FILE>
//!
//! Commands:
//!   render    Compile the document to HTML (default)
//!   check     Report the first error, if any
//!   tokens    Dump the token stream
//!   ast       Dump the document tree
//!   stats     Show document statistics

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::io::{self, Read};
use std::process;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use smallmark_core::ast::{Block, Paragraph};
use smallmark_core::{lexer, Document, ParseError, Parser, RenderOptions};
use tracing_subscriber::EnvFilter;

fn main() {
    let args: Vec<String> = env::args().collect();

    if let Err(e) = run(&args) {
        eprintln!("error: {:#}", e);
        process::exit(1);
    }
}

fn run(args: &[String]) -> Result<()> {
    let config = parse_args(args)?;
    init_logging(config.verbose);

    let options = match &config.options_file {
        Some(path) => load_options_file(path)?,
        None => OptionsFile::default(),
    };
    let parser = Parser::new(build_options(&config, options)?);

    let input = read_input(&config.file)?;
    let (front, body) = if config.front_matter {
        let (head, body) = split_front_matter(&input)?;
        (Some(parse_front_matter(head)?), body)
    } else {
        (None, input.as_str())
    };
    tracing::debug!(file = %config.file, bytes = body.len(), "input loaded");

    match config.command {
        Command::Render => cmd_render(&parser, front, body, &config),
        Command::Check => cmd_check(&parser, body, &config),
        Command::Tokens => cmd_tokens(&parser, body, &config),
        Command::Ast => cmd_ast(&parser, body, &config),
        Command::Stats => cmd_stats(&parser, body, &config),
    }
}

#[derive(Debug, PartialEq)]
struct Config {
    command: Command,
    file: String,
    format: OutputFormat,
    verbose: bool,
    options_file: Option<String>,
    poem: bool,
    static_prefix: Option<String>,
    page: Option<String>,
    front_matter: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Render,
    Check,
    Tokens,
    Ast,
    Stats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

fn parse_args(args: &[String]) -> Result<Config> {
    let mut command = Command::Render;
    let mut format = OutputFormat::Text;
    let mut verbose = false;
    let mut options_file = None;
    let mut poem = false;
    let mut static_prefix = None;
    let mut page = None;
    let mut front_matter = false;
    let mut file = None;

    let mut i = 1;
    while i < args.len() {
        let arg = &args[i];
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                process::exit(0);
            }
            "-V" | "--version" => {
                println!("smark {}", env!("CARGO_PKG_VERSION"));
                process::exit(0);
            }
            "-v" | "--verbose" => verbose = true,
            "-j" | "--json" => format = OutputFormat::Json,
            "-c" | "--config" => options_file = Some(option_value(args, &mut i)?),
            "--poem" => poem = true,
            "--static-prefix" => static_prefix = Some(option_value(args, &mut i)?),
            "--page" => page = Some(option_value(args, &mut i)?),
            "--front-matter" => front_matter = true,
            "render" => command = Command::Render,
            "check" => command = Command::Check,
            "tokens" => command = Command::Tokens,
            "ast" => command = Command::Ast,
            "stats" => command = Command::Stats,
            _ if arg.starts_with('-') && arg != "-" => {
                bail!("unknown option: {}", arg);
            }
            _ => {
                if file.is_some() {
                    bail!("multiple files specified");
                }
                file = Some(arg.clone());
            }
        }
        i += 1;
    }

    let file = file.ok_or_else(|| anyhow!("no input file specified"))?;

    Ok(Config {
        command,
        file,
        format,
        verbose,
        options_file,
        poem,
        static_prefix,
        page,
        front_matter,
    })
}

/// Consume the value following the flag at `args[*i]`.
fn option_value(args: &[String], i: &mut usize) -> Result<String> {
    let flag = &args[*i];
    *i += 1;
    args.get(*i)
        .cloned()
        .ok_or_else(|| anyhow!("missing value for {}", flag))
}

fn print_help() {
    eprintln!(
        r#"smark - smallmark compiler and checker

USAGE:
    smark [COMMAND] [OPTIONS] <FILE>

COMMANDS:
    render      Compile the document to HTML (default)
    check       Report the first error, if any
    tokens      Dump the token stream
    ast         Dump the document tree
    stats       Show document statistics

OPTIONS:
    -j, --json               Output in JSON format
    -v, --verbose            Enable debug logging
    -c, --config <FILE>      Load render options from a TOML file
        --poem               Render line breaks inside paragraphs as <br/>
        --static-prefix <P>  Serve relative image sources from <P>
        --page <URL>         Highlight links pointing to <URL>
        --front-matter       Split a TOML header off at the first ---
    -h, --help               Print help information
    -V, --version            Print version information

Use - as <FILE> to read from stdin. RUST_LOG overrides the log level.

EXAMPLES:
    smark page.md                         Compile a page
    smark check page.md                   Check a page for errors
    smark -j --front-matter log.md        Compile a log entry to JSON
    smark tokens -                        Tokenize stdin
"#
    );
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn read_input(file: &str) -> Result<String> {
    let bytes = if file == "-" {
        let mut buf = Vec::new();
        io::stdin()
            .read_to_end(&mut buf)
            .context("failed to read stdin")?;
        buf
    } else {
        fs::read(file).with_context(|| format!("failed to read '{}'", file))?
    };
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Turn a parse failure into a CLI error carrying the caret diagnostic.
fn diagnostic(err: ParseError) -> anyhow::Error {
    anyhow!("{}", err.pretty())
}

// =============================================================================
// Options File
// =============================================================================

/// Render options loaded from a TOML file.
///
/// ```toml
/// poem_mode = false
/// static_prefix = "/static"
/// current_page = "/logs/"
///
/// [replacements]
/// "~" = "&nbsp;"
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct OptionsFile {
    poem_mode: bool,
    static_prefix: Option<String>,
    current_page: Option<String>,
    replacements: BTreeMap<String, String>,
}

fn load_options_file(path: &str) -> Result<OptionsFile> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read config '{}'", path))?;
    toml::from_str(&raw).with_context(|| format!("invalid config '{}'", path))
}

/// Merge the options file with the command line; flags win.
fn build_options(config: &Config, file: OptionsFile) -> Result<RenderOptions> {
    let mut options = RenderOptions::new().with_poem_mode(config.poem || file.poem_mode);

    if let Some(prefix) = config.static_prefix.clone().or(file.static_prefix) {
        options = options.with_static_prefix(prefix);
    }
    if let Some(page) = config.page.clone().or(file.current_page) {
        options = options.with_current_page(page);
    }

    for (key, html) in file.replacements {
        let mut chars = key.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => options = options.with_replacement(c, html),
            _ => bail!("replacement key {:?} must be a single character", key),
        }
    }

    Ok(options)
}

// =============================================================================
// Front Matter
// =============================================================================

/// Header of a page, written in TOML above the first `---`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FrontMatter {
    title: String,
    description: String,
    image: Option<Image>,
    publication_date: Option<toml::value::Datetime>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
struct Image {
    src: String,
    alt: String,
    legend: String,
}

/// Split `input` at the first `---` into header and body.
fn split_front_matter(input: &str) -> Result<(&str, &str)> {
    input
        .split_once("---")
        .ok_or_else(|| anyhow!("missing front matter separator '---'"))
}

fn parse_front_matter(head: &str) -> Result<FrontMatter> {
    toml::from_str(head).context("invalid front matter")
}

// =============================================================================
// Render Command
// =============================================================================

#[derive(Debug, Serialize)]
struct JsonPage {
    title: String,
    description: String,
    image: Option<Image>,
    publication_date: Option<String>,
    content: String,
}

fn cmd_render(
    parser: &Parser,
    front: Option<FrontMatter>,
    body: &str,
    config: &Config,
) -> Result<()> {
    let content = parser.render(body).map_err(diagnostic)?;

    match config.format {
        OutputFormat::Text => println!("{}", content),
        OutputFormat::Json => {
            let page = render_page(parser, front.unwrap_or_default(), content)?;
            println!("{}", serde_json::to_string_pretty(&page)?);
        }
    }

    Ok(())
}

fn render_page(parser: &Parser, front: FrontMatter, content: String) -> Result<JsonPage> {
    let description = parser
        .render(&front.description)
        .map_err(diagnostic)
        .context("invalid description")?;

    Ok(JsonPage {
        title: front.title,
        description,
        image: front.image,
        publication_date: front.publication_date.map(|date| date.to_string()),
        content,
    })
}

// =============================================================================
// Check Command
// =============================================================================

fn cmd_check(parser: &Parser, body: &str, config: &Config) -> Result<()> {
    let err = match parser.parse(body) {
        Ok(_) => {
            match config.format {
                OutputFormat::Text => println!("ok"),
                OutputFormat::Json => println!(r#"{{"valid": true}}"#),
            }
            return Ok(());
        }
        Err(err) => err,
    };

    match config.format {
        OutputFormat::Text => eprintln!("{}", err.pretty()),
        OutputFormat::Json => {
            let report = serde_json::json!({
                "valid": false,
                "kind": err.kind().to_string(),
                "line": err.line(),
                "column": err.column(),
                "span": err.span().map(|s| serde_json::json!({"start": s.start, "end": s.end})),
                "message": err.pretty(),
            });
            println!("{}", report);
        }
    }
    bail!("{}:{}:{}: {}", config.file, err.line(), err.column(), err)
}

// =============================================================================
// Tokens Command
// =============================================================================

fn cmd_tokens(parser: &Parser, body: &str, config: &Config) -> Result<()> {
    let stream = lexer::lex(body, parser.options());

    match config.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(stream.tokens())?),
        OutputFormat::Text => {
            for token in stream.iter() {
                println!(
                    "{}({}) @{}..{}",
                    token.kind,
                    token.text.escape_debug(),
                    token.span.start,
                    token.span.end
                );
            }
        }
    }

    Ok(())
}

// =============================================================================
// Ast Command
// =============================================================================

fn cmd_ast(parser: &Parser, body: &str, config: &Config) -> Result<()> {
    let doc = parser.parse(body).map_err(diagnostic)?;

    match config.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&doc)?),
        OutputFormat::Text => {
            let mut out = String::new();
            for block in &doc.blocks {
                write_tree(&mut out, block, 0);
            }
            print!("{}", out);
        }
    }

    Ok(())
}

fn write_tree(out: &mut String, block: &Block, depth: usize) {
    out.push_str(&"  ".repeat(depth));
    out.push_str(&describe_block(block));
    out.push('\n');

    match block {
        Block::Heading(h) => write_children(out, &h.content.content, depth + 1),
        Block::Paragraph(p) => write_children(out, &p.content, depth + 1),
        Block::Modifier(m) => write_children(out, &m.content, depth + 1),
        Block::Image(image) => write_paragraphs(out, &image.caption, depth + 1),
        Block::List(list) => write_paragraphs(out, &list.items, depth + 1),
        Block::Quote(quote) => {
            write_paragraphs(out, &quote.lines, depth + 1);
            write_paragraphs(out, &quote.sources, depth + 1);
        }
        Block::Callout(callout) => {
            write_children(out, &callout.title.content, depth + 1);
            write_paragraphs(out, &callout.content, depth + 1);
        }
        _ => {}
    }
}

fn write_children(out: &mut String, blocks: &[Block], depth: usize) {
    for block in blocks {
        write_tree(out, block, depth);
    }
}

fn write_paragraphs(out: &mut String, paragraphs: &[Paragraph], depth: usize) {
    for paragraph in paragraphs {
        out.push_str(&"  ".repeat(depth));
        out.push_str("line\n");
        write_children(out, &paragraph.content, depth + 1);
    }
}

fn describe_block(block: &Block) -> String {
    match block {
        Block::Heading(h) => format!("heading (level {})", h.level),
        Block::Paragraph(p) if p.one_line => "paragraph (one line)".to_string(),
        Block::Paragraph(_) => "paragraph".to_string(),
        Block::Modifier(m) => format!("modifier {} ({})", m.tag.tag(), m.symbols),
        Block::Code(c) => match &c.lang {
            Some(lang) => format!("code (lang: {}) {:?}", lang, preview(&c.content)),
            None => format!("code {:?}", preview(&c.content)),
        },
        Block::Link(l) => format!("link {:?} -> {}", l.content, l.href),
        Block::Image(i) => format!("image {:?} -> {}", i.alt, i.src),
        Block::List(l) => format!("list ({}, {} items)", l.kind.tag(), l.items.len()),
        Block::Quote(q) => format!("quote ({} lines, {} sources)", q.lines.len(), q.sources.len()),
        Block::Callout(c) => format!("callout (kind: {})", c.kind),
        Block::Literal(text) => format!("literal {:?}", text),
        Block::Replacer(c) => format!("replacer {:?}", c),
        Block::SoftBreak => "soft_break".to_string(),
    }
}

fn preview(content: &str) -> String {
    let mut preview: String = content.chars().take(40).collect();
    if content.chars().count() > 40 {
        preview.push_str("...");
    }
    preview
}

// =============================================================================
// Stats Command
// =============================================================================

fn cmd_stats(parser: &Parser, body: &str, config: &Config) -> Result<()> {
    let doc = parser.parse(body).map_err(diagnostic)?;
    let stats = DocumentStats::from_document(&doc, body);

    if config.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Document Statistics");
    println!("-------------------");
    println!("Title:          {}", stats.title.as_deref().unwrap_or("-"));
    println!();
    println!("Content:");
    println!("  Total blocks:   {}", stats.total_blocks);
    println!("  Headings:       {}", stats.headings);
    println!("  Paragraphs:     {}", stats.paragraphs);
    println!("  Code blocks:    {}", stats.code_blocks);
    println!("  Images:         {}", stats.images);
    println!("  Lists:          {}", stats.lists);
    println!("  Quotes:         {}", stats.quotes);
    println!("  Callouts:       {}", stats.callouts);
    println!("  Links:          {}", stats.links);
    println!();
    println!("Size:");
    println!("  Characters:     {}", stats.chars);
    println!("  Words:          {}", stats.words);
    println!("  Lines:          {}", stats.lines);

    Ok(())
}

#[derive(Debug, Default, Serialize)]
struct DocumentStats {
    title: Option<String>,
    total_blocks: usize,
    headings: usize,
    paragraphs: usize,
    code_blocks: usize,
    images: usize,
    lists: usize,
    quotes: usize,
    callouts: usize,
    links: usize,
    chars: usize,
    words: usize,
    lines: usize,
}

impl DocumentStats {
    fn from_document(doc: &Document, input: &str) -> Self {
        let mut stats = Self {
            title: doc.title(),
            total_blocks: doc.blocks.len(),
            chars: input.chars().count(),
            words: doc.text().split_whitespace().count(),
            lines: input.lines().count(),
            ..Self::default()
        };

        for block in &doc.blocks {
            stats.count_block(block);
        }
        stats
    }

    fn count_block(&mut self, block: &Block) {
        match block {
            Block::Heading(h) => {
                self.headings += 1;
                self.count_inline(&h.content.content);
            }
            Block::Paragraph(p) => {
                self.paragraphs += 1;
                self.count_inline(&p.content);
            }
            Block::Code(c) if c.multiline => self.code_blocks += 1,
            Block::Image(i) => {
                self.images += 1;
                self.count_paragraphs(&i.caption);
            }
            Block::List(l) => {
                self.lists += 1;
                self.count_paragraphs(&l.items);
            }
            Block::Quote(q) => {
                self.quotes += 1;
                self.count_paragraphs(&q.lines);
                self.count_paragraphs(&q.sources);
            }
            Block::Callout(c) => {
                self.callouts += 1;
                self.count_inline(&c.title.content);
                self.count_paragraphs(&c.content);
            }
            _ => {}
        }
    }

    fn count_paragraphs(&mut self, paragraphs: &[Paragraph]) {
        for paragraph in paragraphs {
            self.count_inline(&paragraph.content);
        }
    }

    fn count_inline(&mut self, blocks: &[Block]) {
        for block in blocks {
            match block {
                Block::Link(_) => self.links += 1,
                Block::Modifier(m) => self.count_inline(&m.content),
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("smark")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    fn config(list: &[&str]) -> Config {
        parse_args(&args(list)).unwrap()
    }

    // =========================================================================
    // Arguments
    // =========================================================================

    #[test]
    fn test_defaults() {
        let config = config(&["page.md"]);
        assert_eq!(config.command, Command::Render);
        assert_eq!(config.format, OutputFormat::Text);
        assert_eq!(config.file, "page.md");
        assert!(!config.verbose);
        assert!(!config.poem);
        assert!(!config.front_matter);
        assert_eq!(config.options_file, None);
    }

    #[test]
    fn test_command_and_flags() {
        let config = config(&["check", "-j", "-v", "--poem", "--front-matter", "log.md"]);
        assert_eq!(config.command, Command::Check);
        assert_eq!(config.format, OutputFormat::Json);
        assert!(config.verbose);
        assert!(config.poem);
        assert!(config.front_matter);
    }

    #[test]
    fn test_flags_with_values() {
        let config = config(&[
            "--static-prefix",
            "/static",
            "--page",
            "/logs/",
            "-c",
            "site.toml",
            "tokens",
            "-",
        ]);
        assert_eq!(config.command, Command::Tokens);
        assert_eq!(config.static_prefix.as_deref(), Some("/static"));
        assert_eq!(config.page.as_deref(), Some("/logs/"));
        assert_eq!(config.options_file.as_deref(), Some("site.toml"));
        assert_eq!(config.file, "-");
    }

    #[test]
    fn test_missing_value() {
        let err = parse_args(&args(&["page.md", "--page"])).unwrap_err();
        assert_eq!(err.to_string(), "missing value for --page");
    }

    #[test]
    fn test_unknown_option() {
        let err = parse_args(&args(&["--fast", "page.md"])).unwrap_err();
        assert_eq!(err.to_string(), "unknown option: --fast");
    }

    #[test]
    fn test_file_count() {
        assert!(parse_args(&args(&["stats"])).is_err());
        assert!(parse_args(&args(&["a.md", "b.md"])).is_err());
    }

    // =========================================================================
    // Options
    // =========================================================================

    #[test]
    fn test_options_file() {
        let file: OptionsFile = toml::from_str(
            r#"
poem_mode = true
static_prefix = "/static"
current_page = "/logs/"

[replacements]
"~" = "&nbsp;"
"#,
        )
        .unwrap();
        let options = build_options(&config(&["page.md"]), file).unwrap();

        assert!(options.poem_mode());
        assert_eq!(options.current_page(), Some("/logs/"));
        assert_eq!(options.replacement('~'), Some("&nbsp;"));
        assert_eq!(options.image_source("cat.jpg"), "/static/cat.jpg");
    }

    #[test]
    fn test_flags_override_options_file() {
        let file: OptionsFile =
            toml::from_str("static_prefix = \"/static\"\ncurrent_page = \"/\"").unwrap();
        let config = config(&["--static-prefix", "/assets", "--page", "/about", "p.md"]);
        let options = build_options(&config, file).unwrap();

        assert_eq!(options.image_source("cat.jpg"), "/assets/cat.jpg");
        assert_eq!(options.current_page(), Some("/about"));
    }

    #[test]
    fn test_replacement_key_must_be_one_char() {
        let file: OptionsFile = toml::from_str("[replacements]\n\"--\" = \"&mdash;\"").unwrap();
        assert!(build_options(&config(&["page.md"]), file).is_err());
    }

    #[test]
    fn test_unknown_option_key() {
        assert!(toml::from_str::<OptionsFile>("poem = true").is_err());
    }

    // =========================================================================
    // Front Matter
    // =========================================================================

    const ENTRY: &str = r#"title = "First log"
description = "A *short* one"
publication_date = 2024-03-01
image = { src = "cat.jpg", alt = "A cat" }
---
# First log

Hello."#;

    #[test]
    fn test_split_front_matter() {
        let (head, body) = split_front_matter(ENTRY).unwrap();
        assert!(head.starts_with("title"));
        assert_eq!(body, "\n# First log\n\nHello.");
    }

    #[test]
    fn test_split_at_first_separator() {
        let (head, body) = split_front_matter("a = 1\n---\nx\n---\ny").unwrap();
        assert_eq!(head, "a = 1\n");
        assert_eq!(body, "\nx\n---\ny");
    }

    #[test]
    fn test_missing_separator() {
        assert!(split_front_matter("# no header").is_err());
    }

    #[test]
    fn test_front_matter_page() {
        let (head, body) = split_front_matter(ENTRY).unwrap();
        let front = parse_front_matter(head).unwrap();
        let parser = Parser::new(RenderOptions::new());
        let content = parser.render(body).unwrap();
        let page = render_page(&parser, front, content).unwrap();

        assert_eq!(page.title, "First log");
        assert_eq!(page.description, "<p>A <em>short</em> one</p>");
        assert_eq!(page.publication_date.as_deref(), Some("2024-03-01"));
        assert_eq!(
            page.image,
            Some(Image {
                src: "cat.jpg".to_string(),
                alt: "A cat".to_string(),
                legend: String::new(),
            })
        );
        assert_eq!(page.content, "<h1>First log</h1><p>Hello.</p>");
    }

    #[test]
    fn test_invalid_description() {
        let parser = Parser::default();
        let front = parse_front_matter("description = \"**open\"").unwrap();
        assert!(render_page(&parser, front, String::new()).is_err());
    }

    // =========================================================================
    // Stats
    // =========================================================================

    #[test]
    fn test_stats() {
        let input = "# Title\n\nSome **[link](/a)** and [another](/b).\n\n- one\n- two\n\n```\ncode\n```";
        let doc = Parser::default().parse(input).unwrap();
        let stats = DocumentStats::from_document(&doc, input);

        assert_eq!(stats.title.as_deref(), Some("Title"));
        assert_eq!(stats.total_blocks, 4);
        assert_eq!(stats.headings, 1);
        assert_eq!(stats.paragraphs, 1);
        assert_eq!(stats.lists, 1);
        assert_eq!(stats.code_blocks, 1);
        assert_eq!(stats.links, 2);
        assert_eq!(stats.lines, 10);
    }
}
