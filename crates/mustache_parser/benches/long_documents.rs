use criterion::{criterion_group, criterion_main, Criterion};

use mustache_parser::{Parser, ParserConfig};

/// A template with deep nesting, standalone comments, and both interpolation
/// forms, repeated until it is long enough to be representative of a real
/// page template.
fn synthetic_template(repetitions: usize) -> String {
    let mut out = String::new();
    out.push_str("{{! template header }}\n");
    for i in 0..repetitions {
        out.push_str(&format!(
            "{{{{#item{i}}}}}\n  Name: {{{{name}}}}\n  Raw: {{{{{{description}}}}}}\n  {{{{^hidden}}}}visible{{{{/hidden}}}}\n{{{{/item{i}}}}}\n"
        ));
    }
    out
}

fn long_documents(c: &mut Criterion) {
    let content = synthetic_template(500);
    let mut group = c.benchmark_group("long documents");
    group.bench_function("mustache-parser-cached", |b| {
        b.iter(|| Parser::from_str(&content, ParserConfig::default()).unwrap().parse().unwrap())
    });
    group.finish();
}

fn short_templates(c: &mut Criterion) {
    let content = "Hello {{name}}, you have {{#unread}}{{count}} unread{{/unread}}{{^unread}}no unread{{/unread}} messages.";
    let mut group = c.benchmark_group("short templates");
    group.bench_function("mustache-parser-cached", |b| {
        b.iter(|| Parser::from_str(content, ParserConfig::default()).unwrap().parse().unwrap())
    });
    group.finish();
}

criterion_group!(benches, long_documents, short_templates);
criterion_main!(benches);
