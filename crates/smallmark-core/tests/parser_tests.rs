//! Integration tests for the smallmark compiler

use smallmark_core::ast::{Block, Code, ListKind, ModifierTag};
use smallmark_core::lexer::{lex, TokenKind};
use smallmark_core::span::Span;
use smallmark_core::{parse, parse_bytes, parse_document, ErrorKind, Parser, RenderOptions};

fn render(input: &str) -> String {
    parse(input, &RenderOptions::default()).unwrap()
}

fn error(input: &str) -> ErrorKind {
    parse(input, &RenderOptions::default()).unwrap_err().kind()
}

fn kinds(input: &str) -> Vec<(TokenKind, String)> {
    lex(input, &RenderOptions::default())
        .iter()
        .map(|t| (t.kind, t.text.clone()))
        .collect()
}

fn tok(kind: TokenKind, text: &str) -> (TokenKind, String) {
    (kind, text.to_string())
}

// ============================================================================
// Lexer Tests
// ============================================================================

#[test]
fn test_lex_modifiers_and_literals() {
    assert_eq!(
        kinds("***hey***, what's up?"),
        vec![
            tok(TokenKind::Modifier, "***"),
            tok(TokenKind::Literal, "hey"),
            tok(TokenKind::Modifier, "***"),
            tok(TokenKind::Literal, ", what's up?"),
        ]
    );
}

#[test]
fn test_lex_escape_folds_into_literal() {
    let stream = lex(r"Xxx\_DarkEmperor\_xxX", &RenderOptions::default());
    assert_eq!(stream.len(), 1);
    let token = &stream.tokens()[0];
    assert_eq!(token.kind, TokenKind::Literal);
    assert_eq!(token.text, "Xxx_DarkEmperor_xxX");
    assert_eq!(token.span, Span::new(0, 21));
}

#[test]
fn test_lex_trailing_backslash_is_kept() {
    assert_eq!(kinds("abc\\"), vec![tok(TokenKind::Literal, "abc\\")]);
}

#[test]
fn test_lex_star_list_marker_only_at_line_start() {
    assert_eq!(
        kinds("* item"),
        vec![tok(TokenKind::List, "*"), tok(TokenKind::Literal, " item")]
    );
    assert_eq!(
        kinds("a * b"),
        vec![
            tok(TokenKind::Literal, "a "),
            tok(TokenKind::Modifier, "*"),
            tok(TokenKind::Literal, " b"),
        ]
    );
}

#[test]
fn test_lex_modifier_runs_split() {
    assert_eq!(
        kinds("****"),
        vec![tok(TokenKind::Modifier, "***"), tok(TokenKind::Modifier, "*")]
    );
    assert_eq!(
        kinds("**__"),
        vec![tok(TokenKind::Modifier, "**"), tok(TokenKind::Modifier, "__")]
    );
}

#[test]
fn test_lex_breaks_group() {
    assert_eq!(
        kinds("a\n\n\nb"),
        vec![
            tok(TokenKind::Literal, "a"),
            tok(TokenKind::Break, "\n\n\n"),
            tok(TokenKind::Literal, "b"),
        ]
    );
}

#[test]
fn test_lex_link_delimiters() {
    assert_eq!(
        kinds("![a](b)"),
        vec![
            tok(TokenKind::External, "!["),
            tok(TokenKind::Literal, "a"),
            tok(TokenKind::External, "]("),
            tok(TokenKind::Literal, "b"),
            tok(TokenKind::External, ")"),
        ]
    );
}

#[test]
fn test_lex_unmatched_brackets_are_text() {
    assert_eq!(
        kinds("wow! ]x"),
        vec![tok(TokenKind::Literal, "wow! ]x")]
    );
}

#[test]
fn test_lex_callout_only_in_quotes() {
    assert_eq!(
        kinds("> [!NOTE] hi"),
        vec![
            tok(TokenKind::Quote, ">"),
            tok(TokenKind::Literal, " "),
            tok(TokenKind::Callout, "[!"),
            tok(TokenKind::Literal, "NOTE"),
            tok(TokenKind::Callout, "]"),
            tok(TokenKind::Literal, " hi"),
        ]
    );
    assert_eq!(
        kinds("[!x]"),
        vec![tok(TokenKind::External, "["), tok(TokenKind::Literal, "!x]")]
    );
}

#[test]
fn test_lex_list_material() {
    assert_eq!(
        kinds("12. x"),
        vec![tok(TokenKind::List, "12."), tok(TokenKind::Literal, " x")]
    );
}

#[test]
fn test_lex_replacements_are_single() {
    let options = RenderOptions::new().with_replacement('~', "&nbsp;");
    let tokens: Vec<_> = lex("a~~b", &options)
        .iter()
        .map(|t| (t.kind, t.text.clone()))
        .collect();
    assert_eq!(
        tokens,
        vec![
            tok(TokenKind::Literal, "a"),
            tok(TokenKind::Replace, "~"),
            tok(TokenKind::Replace, "~"),
            tok(TokenKind::Literal, "b"),
        ]
    );
}

#[test]
fn test_lex_spans() {
    let stream = lex("# Title", &RenderOptions::default());
    assert_eq!(stream.tokens()[0].span, Span::new(0, 1));
    assert_eq!(stream.tokens()[1].span, Span::new(1, 7));
}

#[test]
fn test_stream_display() {
    let stream = lex("**a**", &RenderOptions::default());
    assert_eq!(
        stream.to_string(),
        "Tokens[modifier(**) literal(a) modifier(**) ]"
    );
}

// ============================================================================
// Token Stream Tests
// ============================================================================

#[test]
fn test_stream_starts_before_first_token() {
    let mut stream = lex("a\nb", &RenderOptions::default());
    assert!(stream.current().is_none());
    assert_eq!(stream.peek().map(|t| t.text.as_str()), Some("a"));
    assert!(stream.advance());
    assert_eq!(stream.current_kind(), Some(TokenKind::Literal));
    assert!(stream.advance());
    assert_eq!(stream.current_kind(), Some(TokenKind::Break));
    assert_eq!(stream.previous().map(|t| t.text.as_str()), Some("a"));
    assert!(stream.advance());
    assert!(!stream.advance());
    assert!(stream.is_finished());
    assert!(stream.retreat());
    assert_eq!(stream.current().map(|t| t.text.as_str()), Some("b"));
}

#[test]
fn test_stream_save_restore() {
    let mut stream = lex("a *b* c", &RenderOptions::default());
    stream.advance();
    let mark = stream.save();
    stream.advance();
    stream.advance();
    assert_eq!(stream.index(), Some(2));
    stream.restore(mark);
    assert_eq!(stream.index(), Some(0));
    stream.reset();
    assert_eq!(stream.index(), None);
}

// ============================================================================
// Paragraph and Emphasis Tests
// ============================================================================

#[test]
fn test_plain_paragraph() {
    assert_eq!(render("bonsoir"), "<p>bonsoir</p>");
}

#[test]
fn test_nested_emphasis() {
    assert_eq!(
        render("**bo*n*soir**, ça ***va* bien** ?"),
        "<p><b>bo<em>n</em>soir</b>, ça <b><em>va</em> bien</b> ?</p>"
    );
}

#[test]
fn test_triple_closed_by_double_first() {
    assert_eq!(
        render("***va** bien*"),
        "<p><em><b>va</b> bien</em></p>"
    );
}

#[test]
fn test_triple_closed_at_once() {
    assert_eq!(render("***all***"), "<p><b><em>all</em></b></p>");
}

#[test]
fn test_mixed_symbols() {
    assert_eq!(
        render("**_deux en même temps_**"),
        "<p><b><em>deux en même temps</em></b></p>"
    );
}

#[test]
fn test_three_levels_of_nesting() {
    assert_eq!(
        render("*a _b **c** d_ e*"),
        "<p><em>a <em>b <b>c</b> d</em> e</em></p>"
    );
}

#[test]
fn test_emphasis_tree_shape() {
    let doc = parse_document("***x***", &RenderOptions::default()).unwrap();
    let Block::Paragraph(p) = &doc.blocks[0] else {
        panic!("expected paragraph, got {:?}", doc.blocks[0]);
    };
    let Block::Modifier(outer) = &p.content[0] else {
        panic!("expected modifier");
    };
    assert_eq!(outer.tag, ModifierTag::Bold);
    let Block::Modifier(inner) = &outer.content[0] else {
        panic!("expected nested modifier");
    };
    assert_eq!(inner.tag, ModifierTag::Em);
    assert_eq!(inner.content, vec![Block::Literal("x".to_string())]);
}

#[test]
fn test_soft_break() {
    assert_eq!(render("a\nb"), "<p>a b</p>");
    assert_eq!(render("a\n\nb"), "<p>a</p><p>b</p>");
}

#[test]
fn test_soft_break_inside_emphasis() {
    assert_eq!(render("*a\nb*"), "<p><em>a b</em></p>");
}

#[test]
fn test_poem_mode() {
    let options = RenderOptions::new().with_poem_mode(true);
    assert_eq!(
        parse("roses\nviolets\n\nend", &options).unwrap(),
        "<p>roses<br/>violets</p><p>end</p>"
    );
}

#[test]
fn test_escaping() {
    assert_eq!(
        render("<script>alert('x')</script> & co"),
        "<p>&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt; &amp; co</p>"
    );
}

#[test]
fn test_escaped_markup_is_text() {
    assert_eq!(render(r"\*not bold\*"), "<p>*not bold*</p>");
    assert_eq!(render(r"\# not a heading"), "<p># not a heading</p>");
}

#[test]
fn test_replacements() {
    let options = RenderOptions::new().with_replacement('~', "&nbsp;");
    assert_eq!(parse("a~b", &options).unwrap(), "<p>a&nbsp;b</p>");
}

#[test]
fn test_mid_line_markers_are_text() {
    assert_eq!(render("a # b > c - d"), "<p>a # b &gt; c - d</p>");
}

#[test]
fn test_paragraph_ends_before_blocks() {
    assert_eq!(
        render("intro\n- a\n- b"),
        "<p>intro</p><ul><li>a</li><li>b</li></ul>"
    );
    assert_eq!(render("text\n# Title"), "<p>text</p><h1>Title</h1>");
    assert_eq!(
        render("text\n> quoted"),
        "<p>text</p><div class=\"quote\"><blockquote>quoted</blockquote></div>"
    );
}

#[test]
fn test_numbers_do_not_start_lists() {
    assert_eq!(render("-5 degrees"), "<p>-5 degrees</p>");
    assert_eq!(render("2024-01-01 was a day"), "<p>2024-01-01 was a day</p>");
}

// ============================================================================
// Heading Tests
// ============================================================================

#[test]
fn test_headings() {
    assert_eq!(render("# Title\ntext"), "<h1>Title</h1><p>text</p>");
    assert_eq!(render("###### Six"), "<h6>Six</h6>");
    assert_eq!(render("## *Styled* title"), "<h2><em>Styled</em> title</h2>");
}

#[test]
fn test_invalid_headings() {
    assert_eq!(error("####### Seven"), ErrorKind::InvalidHeading);
    assert_eq!(error("#"), ErrorKind::InvalidHeading);
}

// ============================================================================
// Code Tests
// ============================================================================

#[test]
fn test_inline_code() {
    assert_eq!(render("`mono`"), "<p><code>mono</code></p>");
    assert_eq!(render("bonjour `code` !"), "<p>bonjour <code>code</code> !</p>");
    assert_eq!(render("`<b>*x*</b>`"), "<p><code>&lt;b&gt;*x*&lt;/b&gt;</code></p>");
}

#[test]
fn test_fenced_code() {
    assert_eq!(
        render("```\nraw\nhehe```"),
        "<pre><code>raw\nhehe</code></pre>"
    );
}

#[test]
fn test_fenced_code_lang() {
    let doc = parse_document("``` rust\nlet x = 1;\n```", &RenderOptions::default()).unwrap();
    assert_eq!(
        doc.blocks,
        vec![Block::Code(Code {
            content: "let x = 1;\n".to_string(),
            lang: Some("rust".to_string()),
            multiline: true,
        })]
    );
}

#[test]
fn test_code_errors() {
    assert_eq!(error("```\nnever closed"), ErrorKind::InvalidCodeFormat);
    assert_eq!(error("`a\nb`"), ErrorKind::InvalidCodeFormat);
    assert_eq!(error("``x``"), ErrorKind::InvalidCodeFormat);
    assert_eq!(error("a ``x"), ErrorKind::InvalidParagraph);
    assert_eq!(error("test ``` hehe"), ErrorKind::InvalidCodeBlockPosition);
}

// ============================================================================
// Link and Image Tests
// ============================================================================

#[test]
fn test_link() {
    assert_eq!(
        render("[content](href)"),
        "<p><a href=\"href\">content</a></p>"
    );
}

#[test]
fn test_external_link() {
    assert_eq!(
        render("see [site](https://example.com)"),
        "<p>see <a href=\"https://example.com\" target=\"_blank\" rel=\"noreferrer\">site</a></p>"
    );
}

#[test]
fn test_link_after_soft_break() {
    assert_eq!(
        render("see\n[site](/site)"),
        "<p>see <a href=\"/site\">site</a></p>"
    );
}

#[test]
fn test_current_page_link() {
    let options = RenderOptions::new().with_current_page("/logs/");
    assert_eq!(
        parse("[logs](/logs/) [home](/)", &options).unwrap(),
        "<p><a href=\"/logs/\" class=\"target\">logs</a> <a href=\"/\">home</a></p>"
    );
}

#[test]
fn test_custom_link_renderer() {
    let options =
        RenderOptions::new().with_link_renderer(|content, href| format!("{content}@{href}"));
    assert_eq!(parse("[a](b)", &options).unwrap(), "<p>a@b</p>");
}

#[test]
fn test_malformed_links_are_text() {
    assert_eq!(render("[not a link"), "<p>[not a link</p>");
    assert_eq!(render("[a](b"), "<p>[a](b</p>");
    assert_eq!(render("[a]\n(b)"), "<p>[a] (b)</p>");
}

#[test]
fn test_image() {
    assert_eq!(
        render("![alt](src)"),
        "<figure><img alt=\"alt\" src=\"src\"></figure>"
    );
}

#[test]
fn test_image_caption() {
    assert_eq!(
        render("\n![image alt](image src)\nsource 1\nsource 2\n\nHors de la source\n"),
        "<figure><img alt=\"image alt\" src=\"image src\"><figcaption>source 1 source 2</figcaption></figure><p>Hors de la source</p>"
    );
}

#[test]
fn test_image_static_prefix() {
    let options = RenderOptions::new().with_static_prefix("/static/");
    assert_eq!(
        parse("![pfp](pfp.jpg)", &options).unwrap(),
        "<figure><img alt=\"pfp\" src=\"/static/pfp.jpg\"></figure>"
    );
    assert_eq!(
        parse("![pfp](https://cdn.example.com/pfp.jpg)", &options).unwrap(),
        "<figure><img alt=\"pfp\" src=\"https://cdn.example.com/pfp.jpg\"></figure>"
    );
}

#[test]
fn test_image_fallbacks() {
    assert_eq!(render("see ![a](b)"), "<p>see ![a](b)</p>");
    assert_eq!(render("![a](b) trailing"), "<p>![a](b) trailing</p>");
    assert_eq!(render("![a"), "<p>![a</p>");
}

// ============================================================================
// List Tests
// ============================================================================

#[test]
fn test_lists() {
    assert_eq!(
        render("- item A\n- item B\n* item C\n\n1. item 1\n2. item 2 \n"),
        "<ul><li>item A</li><li>item B</li><li>item C</li></ul><ol><li>item 1</li><li>item 2</li></ol>"
    );
}

#[test]
fn test_list_kind_change_starts_new_list() {
    let doc = parse_document("- a\n1. b\n- c", &RenderOptions::default()).unwrap();
    let kinds: Vec<_> = doc
        .blocks
        .iter()
        .map(|b| match b {
            Block::List(list) => list.kind,
            other => panic!("expected list, got {:?}", other),
        })
        .collect();
    assert_eq!(
        kinds,
        vec![ListKind::Unordered, ListKind::Ordered, ListKind::Unordered]
    );
}

// ============================================================================
// Quote and Callout Tests
// ============================================================================

#[test]
fn test_quote_with_source() {
    assert_eq!(
        render("\n> Bonsoir, je suis un **code**\navec une source\n"),
        "<div class=\"quote\"><blockquote>Bonsoir, je suis un <b>code</b></blockquote><p>avec une source</p></div>"
    );
}

#[test]
fn test_quote_without_source() {
    assert_eq!(
        render("> one\n> two\n\nafter"),
        "<div class=\"quote\"><blockquote>one two</blockquote></div><p>after</p>"
    );
}

#[test]
fn test_callout_simple() {
    assert_eq!(
        render("\n> [!NOTE]\n"),
        "<div data-kind=\"note\" class=\"callout\"><h4>note</h4><div></div></div>"
    );
}

#[test]
fn test_callout_multiline() {
    assert_eq!(
        render("\n> [!NOTE] Hey :3\n> content 1\n> content 2\n"),
        "<div data-kind=\"note\" class=\"callout\"><h4>Hey :3</h4><div><p>content 1</p><p>content 2</p></div></div>"
    );
}

#[test]
fn test_callout_then_paragraph() {
    assert_eq!(
        render("> [!WARNING]\n> careful\n\nafter"),
        "<div data-kind=\"warning\" class=\"callout\"><h4>warning</h4><div><p>careful</p></div></div><p>after</p>"
    );
}

#[test]
fn test_invalid_callouts() {
    assert_eq!(error("> [!]"), ErrorKind::InvalidCallout);
    assert_eq!(error("> [!NOTE"), ErrorKind::InvalidCallout);
}

// ============================================================================
// Whole Document Tests
// ============================================================================

const RAW: &str = "
# Je suis un titre
Avec une description classique,
sur plusieurs lignes !

Et je peux mettre du texte en **gras**,
en *italique* et les **_deux en même temps_** !

> Je suis une magnifique citation
> sur plusieurs lignes
avec une source
> qui recommence après !
qui a elle aussi une source :D

- Ceci est une liste
- pas ordonnée
1. et maintenant
2. elle l'est
- hehe

![Ceci est ma pfp :3](https://cdn.anhgelus.world/pfp.jpg)
[Ma pfp](https://now.anhgelus.world/) hehe :D
Elle est **magnifique**, n'est-ce pas ?
";

const PARSED: &str = r#"
<h1>Je suis un titre</h1>
<p>Avec une description classique, sur plusieurs lignes !</p>
<p>Et je peux mettre du texte en <b>gras</b>, en <em>italique</em> et les <b><em>deux en même temps</em></b> !</p>
<div class="quote"><blockquote>Je suis une magnifique citation sur plusieurs lignes</blockquote><p>avec une source</p></div>
<div class="quote"><blockquote>qui recommence après !</blockquote><p>qui a elle aussi une source :D</p></div>
<ul><li>Ceci est une liste</li><li>pas ordonnée</li></ul>
<ol><li>et maintenant</li><li>elle l&#39;est</li></ol>
<ul><li>hehe</li></ul>
<figure><img alt="Ceci est ma pfp :3" src="https://cdn.anhgelus.world/pfp.jpg">
<figcaption><a href="https://now.anhgelus.world/" target="_blank" rel="noreferrer">Ma pfp</a> hehe :D Elle est <b>magnifique</b>, n&#39;est-ce pas ?</figcaption>
</figure>
"#;

#[test]
fn test_whole_document() {
    assert_eq!(render(RAW), PARSED.replace('\n', ""));
}

#[test]
fn test_document_text_and_title() {
    let doc = parse_document("# My *page*\nSome [text](x).", &RenderOptions::default()).unwrap();
    assert_eq!(doc.title().as_deref(), Some("My page"));
    assert_eq!(doc.text(), "My page\nSome text.");
}

#[test]
fn test_parser_value() {
    let parser = Parser::new(RenderOptions::new().with_poem_mode(true));
    assert!(parser.options().poem_mode());
    assert_eq!(parser.render("a\nb").unwrap(), "<p>a<br/>b</p>");
    assert_eq!(parser.parse("a").unwrap().blocks.len(), 1);
    assert_eq!(parser.render_bytes(b"a\nb").unwrap(), "<p>a<br/>b</p>");
}

#[test]
fn test_parse_bytes_lossy() {
    assert_eq!(
        parse_bytes(b"caf\xff", &RenderOptions::default()).unwrap(),
        "<p>caf\u{FFFD}</p>"
    );
}

#[test]
fn test_empty_input() {
    assert_eq!(render(""), "");
    assert_eq!(render("\n\n\n"), "");
}

#[test]
fn test_options_are_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<RenderOptions>();
    assert_send_sync::<Parser>();
}

// ============================================================================
// Error Reporting Tests
// ============================================================================

#[test]
fn test_unclosed_bold() {
    let err = parse("**bonsoir", &RenderOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidModifier);
    assert_eq!(err.line(), 1);
    assert_eq!(err.column(), 10);
    assert_eq!(
        err.pretty(),
        "invalid modifier organization (line 1, column 10)\n\n**bonsoir\n~~~~~~~~~^"
    );
}

#[test]
fn test_mismatched_closers() {
    assert_eq!(error("bo*nso**ir"), ErrorKind::InvalidModifier);
    assert_eq!(error("**a*"), ErrorKind::InvalidModifier);
    assert_eq!(error("*a**"), ErrorKind::InvalidModifier);
    assert_eq!(error("*a\n\nb*"), ErrorKind::InvalidModifier);
    assert_eq!(error("# *a\nb*"), ErrorKind::InvalidModifier);
}

#[test]
fn test_code_position_pretty() {
    let err = parse("test ``` hehe", &RenderOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidCodeBlockPosition);
    assert!(err.kind().is_paragraph_error());
    assert!(!err.kind().is_internal());
    assert_eq!(err.span(), Some(Span::new(5, 8)));
    assert_eq!(
        err.pretty(),
        "invalid code block position (line 1, column 6)\n\ntest ``` hehe\n~~~~~^~~~~~~~"
    );
}

#[test]
fn test_error_on_later_line() {
    let err = parse("ok\n\n**oops", &RenderOptions::default()).unwrap_err();
    assert_eq!(err.line(), 3);
    assert_eq!(err.column(), 7);
    assert!(err.pretty().ends_with("\n\n**oops\n~~~~~~^"));
}

#[test]
fn test_nesting_limit() {
    let input = format!("{}x", "*_".repeat(40));
    assert_eq!(error(&input), ErrorKind::NestingTooDeep);
}

#[test]
fn test_error_display() {
    let err = parse("**a", &RenderOptions::default()).unwrap_err();
    assert_eq!(err.to_string(), "invalid modifier organization");
    assert_eq!(
        ErrorKind::UnknownToken(TokenKind::Callout).to_string(),
        "internal error: unknown token type callout"
    );
    assert!(ErrorKind::UnknownToken(TokenKind::Callout).is_internal());
}
