use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use stabilizer_core::bits::BitTable;

fn random_table(rows: usize, cols: usize) -> BitTable {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    BitTable::random(rows, cols, &mut rng)
}

pub fn transpose_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("bit_table_transpose");

    for &n in &[64usize, 256, 1024] {
        let square = random_table(n, n);
        group.bench_with_input(BenchmarkId::new("do_square_transpose", n), &n, |b, _| {
            b.iter(|| {
                let mut t = square.clone();
                t.do_square_transpose();
                t
            })
        });

        let rect = random_table(n, n * 2);
        group.bench_with_input(BenchmarkId::new("transposed", n), &n, |b, _| {
            b.iter(|| black_box(&rect).transposed())
        });
    }

    group.finish();
}

criterion_group!(benches, transpose_bench);
criterion_main!(benches);
