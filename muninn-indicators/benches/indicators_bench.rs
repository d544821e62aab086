//! Per-tick update cost of the streaming indicators.
//!
//! Every update must stay O(1); these benches catch accidental allocation or
//! window scans sneaking into the hot path.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use muninn_indicators::{HawkesIntensity, Level, MultivariateHawkes, OfiCalculator, VpinCalculator};

fn ofi_update_bench(c: &mut Criterion) {
    c.bench_function("ofi_update", |b| {
        let mut calc = OfiCalculator::new();
        calc.update(Level::new(100.0, 10.0), Level::new(100.5, 10.0));
        let mut size = 10.0;
        b.iter(|| {
            size = if size > 40.0 { 10.0 } else { size + 1.0 };
            black_box(calc.update(Level::new(100.0, size), Level::new(100.5, 10.0)));
        })
    });
}

fn vpin_update_bench(c: &mut Criterion) {
    c.bench_function("vpin_update", |b| {
        let mut calc = VpinCalculator::new(1000.0, 50).unwrap();
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            let signed = if i % 2 == 0 { 10.0 } else { -10.0 };
            black_box(calc.update_signed_volume(signed).unwrap());
        })
    });
}

fn hawkes_update_bench(c: &mut Criterion) {
    c.bench_function("hawkes_update", |b| {
        let mut calc = HawkesIntensity::new(0.1, 0.5, 1.0).unwrap();
        let mut t = 0.0;
        b.iter(|| {
            t += 0.001;
            black_box(calc.update(t).unwrap());
        })
    });

    c.bench_function("hawkes_multivariate_update_4types", |b| {
        let n = 4;
        let mut calc = MultivariateHawkes::new(
            vec![0.1; n],
            vec![0.2; n * n],
            vec![1.0; n],
        )
        .unwrap();
        let mut t = 0.0;
        let mut src = 0;
        b.iter(|| {
            t += 0.001;
            src = (src + 1) % n;
            black_box(calc.update(src, t).unwrap());
        })
    });
}

criterion_group!(benches, ofi_update_bench, vpin_update_bench, hawkes_update_bench);
criterion_main!(benches);
