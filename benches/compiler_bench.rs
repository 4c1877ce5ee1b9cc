// benches/compiler_bench.rs
//! Benchmarks for query compilation.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use notion_query::{prop, ConditionNode, PropertyType, Query, Schema};

fn wide_schema(width: usize) -> Schema {
    let mut schema: Schema = (0..width)
        .map(|i| (format!("Field {}", i), PropertyType::Number))
        .collect();
    schema.insert("Topic", PropertyType::Select);
    schema.insert("Released", PropertyType::Date);
    schema
}

/// A left-leaning AND chain alternating number and select predicates.
fn chained_condition(depth: usize) -> ConditionNode {
    (1..depth).fold(prop("Topic").equals("Tech"), |acc, i| {
        if i % 2 == 0 {
            acc & prop(format!("Field {}", i)).greater_than(i as i64)
        } else {
            acc | prop("Released").past_week()
        }
    })
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");
    let schema = wide_schema(256);

    for depth in [1, 8, 64, 256] {
        let query = Query::new()
            .filter(chained_condition(depth))
            .sort([prop("Released").desc()]);
        group.bench_with_input(BenchmarkId::new("chain", depth), &query, |b, query| {
            b.iter(|| query.compile(black_box(&schema)).unwrap())
        });
    }
    group.finish();
}

fn bench_request_body(c: &mut Criterion) {
    let schema = wide_schema(64);
    let compiled = Query::new()
        .filter(chained_condition(64))
        .compile(&schema)
        .unwrap();

    c.bench_function("request_body", |b| {
        b.iter(|| compiled.request_body(black_box(Some("cursor"))).unwrap())
    });
}

fn bench_render(c: &mut Criterion) {
    let condition = chained_condition(64);
    c.bench_function("render_condition", |b| {
        b.iter(|| black_box(&condition).to_string())
    });
}

criterion_group!(benches, bench_compile, bench_request_body, bench_render);
criterion_main!(benches);
