use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use warc::{lexer::Lexer, token::TokenKind};

static INPUT: &str = include_str!("../../demos/fib.war");

fn lexer(input: &str) {
    let mut i = 0;
    for token in Lexer::new(input) {
        if token.kind.is_error() {
            continue;
        }
        if matches!(token.kind, TokenKind::Eof) {
            break;
        }
        i += 1;
    }
    black_box(i);
}

fn criterion_benchmark(c: &mut Criterion) {
    let input = INPUT.repeat(64);

    c.bench_function("lexer", |b| {
        b.iter(|| {
            black_box(lexer(black_box(&input)));
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
