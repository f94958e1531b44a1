//! Benchmarks comparing smallmark against pulldown-cmark on the same page
//!
//! Run with: cargo bench -p smallmark-core

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pulldown_cmark::{html, Options, Parser as MdParser};
use smallmark_core::{lexer, Parser, RenderOptions};

/// A page using every construct of the dialect.
const SAMPLE: &str = r#"# Introduction

This is a paragraph with *emphasis*, **strong text**, and `inline code`.
It demonstrates the basic capabilities of the format,
with a [link](https://example.com) in the middle.

## Lists

- First item with some content
- Second item with more content
- Third item concluding the list

1. Step one of the process
2. Step two continues
3. Step three completes

## Code Example

```rust
fn fibonacci(n: u64) -> u64 {
    match n {
        0 => 0,
        1 => 1,
        _ => fibonacci(n - 1) + fibonacci(n - 2),
    }
}
```

## Callout

> [!NOTE] Performance
> One lexing pass and a recursive descent parser.
> Malformed links render as text.

## Quote

> The best code is no code at all.
> Every line of code you write is a liability.
Someone wise

![A figure](figure.png)
A caption spanning
two lines.

End of document.
"#;

/// CommonMark rendering of the same page, as close as it gets.
const MARKDOWN_SAMPLE: &str = r#"# Introduction

This is a paragraph with *emphasis*, **strong text**, and `inline code`.
It demonstrates the basic capabilities of the format,
with a [link](https://example.com) in the middle.

## Lists

- First item with some content
- Second item with more content
- Third item concluding the list

1. Step one of the process
2. Step two continues
3. Step three completes

## Code Example

```rust
fn fibonacci(n: u64) -> u64 {
    match n {
        0 => 0,
        1 => 1,
        _ => fibonacci(n - 1) + fibonacci(n - 2),
    }
}
```

## Callout

> **Performance**
>
> One lexing pass and a recursive descent parser.
> Malformed links render as text.

## Quote

> The best code is no code at all.
> Every line of code you write is a liability.

Someone wise

![A figure](figure.png)
A caption spanning
two lines.

End of document.
"#;

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    let parser = Parser::new(RenderOptions::new().with_static_prefix("/static"));

    group.throughput(Throughput::Bytes(SAMPLE.len() as u64));
    group.bench_function("smallmark", |b| {
        b.iter(|| {
            let out = parser.render(black_box(SAMPLE)).unwrap();
            black_box(out.len())
        })
    });

    group.throughput(Throughput::Bytes(MARKDOWN_SAMPLE.len() as u64));
    group.bench_function("markdown_pulldown", |b| {
        b.iter(|| {
            let events = MdParser::new_ext(black_box(MARKDOWN_SAMPLE), Options::empty());
            let mut out = String::new();
            html::push_html(&mut out, events);
            black_box(out.len())
        })
    });

    group.finish();
}

fn bench_stages(c: &mut Criterion) {
    let mut group = c.benchmark_group("stages");
    let options = RenderOptions::default();

    group.bench_function("lex", |b| {
        b.iter(|| black_box(lexer::lex(black_box(SAMPLE), &options).len()))
    });

    group.bench_function("parse", |b| {
        b.iter(|| {
            let doc = smallmark_core::parse_document(black_box(SAMPLE), &options).unwrap();
            black_box(doc.blocks.len())
        })
    });

    let doc = smallmark_core::parse_document(SAMPLE, &options).unwrap();
    group.bench_function("evaluate", |b| b.iter(|| black_box(doc.render(&options).len())));

    group.finish();
}

fn bench_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("scaling");
    let options = RenderOptions::default();

    for size in [1, 5, 10, 20].iter() {
        let content = SAMPLE.repeat(*size);
        let markdown = MARKDOWN_SAMPLE.repeat(*size);

        group.throughput(Throughput::Bytes(content.len() as u64));
        group.bench_with_input(BenchmarkId::new("smallmark", size), &content, |b, content| {
            b.iter(|| {
                let out = smallmark_core::parse(black_box(content), &options).unwrap();
                black_box(out.len())
            })
        });

        group.throughput(Throughput::Bytes(markdown.len() as u64));
        group.bench_with_input(BenchmarkId::new("markdown", size), &markdown, |b, content| {
            b.iter(|| {
                let mut out = String::new();
                html::push_html(&mut out, MdParser::new_ext(black_box(content), Options::empty()));
                black_box(out.len())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_render, bench_stages, bench_scaling);
criterion_main!(benches);
