use criterion::{black_box, criterion_group, criterion_main, Criterion};

use pt_html::{LinkExtractor, ParserExtractor, RegexExtractor};

fn synthetic_page(anchors: usize) -> String {
    let mut html = String::from("<!DOCTYPE html><html><head><title>bench</title></head><body>");
    for i in 0..anchors {
        match i % 4 {
            0 => html.push_str(&format!(r#"<p>Item {i} <a href="https://site{}.test/page/{i}">link</a></p>"#, i % 50)),
            1 => html.push_str(&format!(r#"<a class="nav" href='http://cdn.test/a?id={i}&amp;x=1'>cdn</a>"#)),
            2 => html.push_str(&format!(r#"<a href="/relative/{i}">rel</a>"#)),
            _ => html.push_str(r#"<div><span>filler text without links</span></div>"#),
        }
    }
    html.push_str("</body></html>");
    html
}

fn bench_extract(c: &mut Criterion) {
    let page = synthetic_page(2_000);

    let mut group = c.benchmark_group("extract");
    group.bench_function("regex", |b| {
        let extractor = RegexExtractor::new();
        b.iter(|| extractor.extract(black_box(&page)))
    });
    group.bench_function("parser", |b| {
        let extractor = ParserExtractor::new();
        b.iter(|| extractor.extract(black_box(&page)))
    });
    group.finish();
}

criterion_group!(benches, bench_extract);
criterion_main!(benches);
