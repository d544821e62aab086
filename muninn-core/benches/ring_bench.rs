//! Hot-path cost of the ring: publish, consume, and the framer peek.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use muninn_core::config::OverflowPolicy;
use muninn_core::ingest::FrameFilter;
use muninn_core::sbe::messages::encode_trade;
use muninn_core::sbe::SchemaRegistry;
use muninn_core::shm::{ReadOutcome, RegionOptions, RingReader, RingWriter, ShmRegion, StartMode};

fn ring_setup(dir: &tempfile::TempDir) -> (RingWriter, RingReader) {
    let path = dir.path().join("bench_ring");
    let opts = RegionOptions { slot_size: 256, slot_count: 1024, force: false };
    let region = ShmRegion::create_at(&path, &opts).unwrap();
    let writer = RingWriter::from_region(region, OverflowPolicy::Truncate).unwrap();
    let reader = RingReader::attach_at(&path, StartMode::FromStart).unwrap();
    (writer, reader)
}

fn publish_bench(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let (mut writer, _reader) = ring_setup(&dir);

    let mut frame = [0u8; 64];
    let len = encode_trade(&mut frame, 1, 2, None, 3).unwrap();
    let payload = &frame[..len];

    let mut group = c.benchmark_group("ring/publish");
    group.throughput(Throughput::Elements(1));
    group.bench_function("publish_37b", |b| {
        b.iter(|| black_box(writer.publish(black_box(payload))));
    });
    group.finish();
}

fn consume_bench(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let (mut writer, mut reader) = ring_setup(&dir);

    let mut frame = [0u8; 64];
    let len = encode_trade(&mut frame, 1, 2, None, 3).unwrap();

    let mut group = c.benchmark_group("ring/consume");
    group.throughput(Throughput::Elements(1));
    group.bench_function("publish_then_next", |b| {
        b.iter(|| {
            writer.publish(&frame[..len]);
            match reader.next() {
                ReadOutcome::Frame(view) => black_box(view.payload().len()),
                _ => 0,
            }
        });
    });
    group.bench_function("latest", |b| {
        writer.publish(&frame[..len]);
        b.iter(|| black_box(reader.latest().map(|v| v.seq())));
    });
    group.finish();
}

fn framer_bench(c: &mut Criterion) {
    let mut filter = FrameFilter::new(SchemaRegistry::builtin().admitted_templates());
    let mut frame = [0u8; 64];
    let len = encode_trade(&mut frame, 1, 2, None, 3).unwrap();

    c.bench_function("framer/inspect", |b| {
        b.iter(|| black_box(filter.inspect(black_box(&frame[..len]))));
    });
}

criterion_group!(benches, publish_bench, consume_bench, framer_bench);
criterion_main!(benches);
