use criterion::{black_box, criterion_group, criterion_main, Criterion};
use engine::rules::Side;
use engine::uci::{parse_line, LineBuffer};

const SEARCH: &str = "info depth 1 seldepth 1 score cp 24 nodes 20 nps 20000 pv e2e4\n\
                      info depth 2 seldepth 3 score cp 11 nodes 112 nps 56000 pv e2e4 e7e5\n\
                      info depth 3 seldepth 5 score cp 30 nodes 843 nps 140500 pv d2d4 d7d5 c2c4\n\
                      info depth 4 seldepth 7 score mate 5 nodes 12877 nps 990000 pv g1f3\n\
                      info string book exhausted\n\
                      bestmove d2d4 ponder d7d5\n";

fn chunked(size: usize) -> Vec<&'static str> {
    let mut chunks = Vec::new();
    let mut rest = SEARCH;

    while !rest.is_empty() {
        let (head, tail) = rest.split_at(size.min(rest.len()));
        chunks.push(head);
        rest = tail;
    }

    chunks
}

fn criterion_benchmark(c: &mut Criterion) {
    let whole = chunked(SEARCH.len());
    let small = chunked(7);

    c.bench_function("reassemble whole output", |b| {
        b.iter(|| {
            let mut buf = LineBuffer::new();
            for chunk in &whole {
                black_box(buf.push(chunk));
            }
        })
    });

    c.bench_function("reassemble 7-byte chunks", |b| {
        b.iter(|| {
            let mut buf = LineBuffer::new();
            for chunk in &small {
                black_box(buf.push(chunk));
            }
        })
    });

    c.bench_function("parse search output", |b| {
        b.iter(|| {
            for line in SEARCH.lines() {
                black_box(parse_line(black_box(line), Side::Black));
            }
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
