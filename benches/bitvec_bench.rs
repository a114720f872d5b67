use criterion::{black_box, criterion_group, criterion_main, Criterion};
use infbits::{BitVector, StreamDeserializer, StreamSerializer};

type Bv = BitVector<512>;

fn sparse(offset: usize, step: usize, end: usize) -> Bv {
    let mut bv = Bv::new();
    for i in (offset..end).step_by(step) {
        bv.set(i, true);
    }
    bv
}

fn bench_set_and_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("bitvector");
    let base = sparse(0, 1000, 10_000_000);

    group.bench_function("set_and_count", |b| {
        b.iter(|| {
            let mut bv = base.clone();
            let mut total = 0;
            for r in 0..100 {
                bv.set(r * 12345, true);
                total += bv.count();
            }
            black_box(total)
        })
    });

    group.bench_function("copy_and_xor", |b| {
        b.iter(|| {
            let bv1 = sparse(2, 8263, 10_000_000);
            let mut bv2 = bv1.clone();
            for i in (3..10_000_000).step_by(3997) {
                bv2.set(i, true);
            }
            let mut bv3 = bv2.clone();
            bv3.bit_xor(&bv1);
            black_box(bv3.count())
        })
    });

    let mut bytes = Vec::new();
    base.serialize(&mut StreamSerializer::new(&mut bytes)).unwrap();
    group.bench_function("deserialize", |b| {
        b.iter(|| {
            let mut bv = BitVector::<4096>::new();
            bv.deserialize(&mut StreamDeserializer::new(&bytes[..]))
                .unwrap();
            black_box(bv)
        })
    });
}

criterion_group!(benches, bench_set_and_count);
criterion_main!(benches);
