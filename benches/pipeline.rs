use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use svg_necromancer::config::Config;
use svg_necromancer::extract::extract_truncated_svg;
use svg_necromancer::pipeline::prepare_for_injection;
use svg_necromancer::repair::repair;
use svg_necromancer::sanitize::sanitize;

/// A shape-heavy document with a handler and a script every `hostile_every`
/// shapes.
fn synthetic_svg(shapes: usize, hostile_every: usize) -> String {
    let mut out = String::from(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 1000 1000"><defs><linearGradient id="g"><stop offset="0" stop-color="red"/><stop offset="1" stop-color="blue"/></linearGradient></defs>"#,
    );
    for i in 0..shapes {
        let x = (i * 37) % 1000;
        let y = (i * 91) % 1000;
        if hostile_every > 0 && i % hostile_every == 0 {
            out.push_str(&format!(
                r#"<g onclick="f({i})"><script>alert({i})</script><circle cx="{x}" cy="{y}" r="4" fill="url(#g)"/></g>"#
            ));
        } else {
            out.push_str(&format!(
                r#"<path d="M{x} {y} C{x} 0 0 {y} 10 10" stroke="black" fill="none"/>"#
            ));
        }
    }
    out.push_str("</svg>");
    out
}

/// The same document as a model would emit it when cut off mid-stream:
/// fenced, no root xmlns, unclosed shapes, bare ampersands.
fn broken_reply(shapes: usize) -> String {
    let mut out = String::from("```svg\n<svg width=\"400\" height=\"300\">");
    for i in 0..shapes {
        out.push_str(&format!(
            r#"<text x="{i}" y="10">R&D {i}</text><rect x="{i}" y="{i}" width="3" height="3">"#
        ));
    }
    out
}

fn bench_sanitize(c: &mut Criterion) {
    let mut group = c.benchmark_group("sanitize");
    for (name, shapes, hostile_every) in [
        ("clean_small", 20, 0),
        ("clean_large", 2000, 0),
        ("hostile_small", 20, 3),
        ("hostile_large", 2000, 10),
    ] {
        let input = synthetic_svg(shapes, hostile_every);
        group.bench_with_input(BenchmarkId::from_parameter(name), &input, |b, data| {
            b.iter(|| {
                let svg = sanitize(black_box(data)).expect("sanitize rejected input");
                black_box(svg.len());
            });
        });
    }
    group.finish();
}

fn bench_repair(c: &mut Criterion) {
    let mut group = c.benchmark_group("repair");
    for shapes in [10usize, 200, 1000] {
        let input = extract_truncated_svg(&broken_reply(shapes)).expect("no svg in reply");
        group.bench_with_input(BenchmarkId::from_parameter(shapes), &input, |b, data| {
            b.iter(|| {
                let result = repair(black_box(data));
                black_box(result.fixed_text.len());
            });
        });
    }
    group.finish();
}

fn bench_end_to_end(c: &mut Criterion) {
    let mut group = c.benchmark_group("end_to_end");
    let config = Config::default();
    for shapes in [10usize, 200, 1000] {
        let reply = broken_reply(shapes);
        group.bench_with_input(BenchmarkId::from_parameter(shapes), &reply, |b, data| {
            b.iter(|| {
                let svg = extract_truncated_svg(black_box(data)).expect("no svg in reply");
                let revived = prepare_for_injection(&svg, &config).expect("unrecoverable");
                black_box(revived.markup.len());
            });
        });
    }
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default();
    targets = bench_sanitize, bench_repair, bench_end_to_end
);
criterion_main!(benches);
