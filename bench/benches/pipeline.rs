use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use warc::{compile, CompileOptions};

static INPUTS: [(&str, &str); 3] = [
    ("fib", include_str!("../../demos/fib.war")),
    ("arrays", include_str!("../../demos/arrays.war")),
    ("counter", include_str!("../../demos/counter.war")),
];

fn criterion_benchmark(c: &mut Criterion) {
    let options = CompileOptions::default();

    let mut group = c.benchmark_group("pipeline");
    for (name, input) in INPUTS {
        group.bench_function(name, |b| {
            b.iter(|| {
                let module = compile(black_box(input), &options).unwrap();
                black_box(module.to_string());
            })
        });
    }
    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
