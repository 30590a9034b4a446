//! Index build and search benchmarks
//!
//! Run with: cargo bench --bench indexing
//! Save baseline: `cargo bench -- --save-baseline main`
//! Compare: `cargo bench -- --baseline main`

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use tabula::{Coordinate, SearchIndex};

const WORDS: &[&str] = &[
    "apple", "banana", "cherry", "delta", "echo", "foxtrot", "golf", "hotel", "india", "juliet",
];

fn build_index(rows: usize, flush_every: usize) -> SearchIndex {
    let mut index = SearchIndex::new();
    for row in 0..rows {
        for column in 0..4 {
            let text = format!(
                "{} {} #{row}",
                WORDS[(row + column) % WORDS.len()],
                WORDS[(row * 7 + column) % WORDS.len()]
            );
            index
                .add(Coordinate::new(row, column), &text)
                .expect("Coordinate fits");
        }
        if (row + 1) % flush_every == 0 {
            index.flush();
        }
    }
    index.flush();
    index
}

fn bench_trigram_extraction(c: &mut Criterion) {
    let small_content = b"Street 42, Apt 7";
    let large_content = small_content.repeat(200);

    let mut group = c.benchmark_group("trigram_extraction");
    group.bench_function("cell_16b", |b| {
        b.iter(|| tabula::utils::extract_trigrams(black_box(small_content)))
    });
    group.bench_function("cell_3kb", |b| {
        b.iter(|| tabula::utils::extract_trigrams(black_box(&large_content)))
    });
    group.finish();
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_build");
    group.sample_size(10);
    group.bench_function("20k_rows_flush_1000", |b| {
        b.iter(|| build_index(black_box(20_000), 1000))
    });
    group.bench_function("20k_rows_flush_1000_compact", |b| {
        b.iter(|| {
            let mut index = build_index(black_box(20_000), 1000);
            index.compact().expect("Compaction failed")
        })
    });
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let segmented = build_index(20_000, 1000);
    let mut compacted = build_index(20_000, 1000);
    compacted.compact().expect("Compaction failed");

    let mut group = c.benchmark_group("search");
    for (name, index) in [("segmented", &segmented), ("compacted", &compacted)] {
        group.bench_function(format!("{name}/term"), |b| {
            b.iter(|| index.search(black_box("cherry")))
        });
        group.bench_function(format!("{name}/and_not"), |b| {
            b.iter(|| index.search(black_box("apple golf -hotel")))
        });
        group.bench_function(format!("{name}/short"), |b| {
            b.iter(|| index.search(black_box("#1")))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_trigram_extraction, bench_build, bench_search);
criterion_main!(benches);
