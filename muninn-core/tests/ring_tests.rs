//! End-to-end ring buffer behavior over a real file-backed mapping: publish
//! visibility, wrap-around, overrun detection, truncation policy.

use muninn_core::config::OverflowPolicy;
use muninn_core::shm::{
    PublishOutcome, ReadOutcome, RegionOptions, RingReader, RingWriter, ShmRegion, StartMode,
};

use std::path::PathBuf;

struct Fixture {
    _dir: tempfile::TempDir,
    path: PathBuf,
}

fn fixture(slot_size: u16, slot_count: u32) -> (Fixture, RingWriter) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ring");
    let opts = RegionOptions { slot_size, slot_count, force: false };
    let region = ShmRegion::create_at(&path, &opts).unwrap();
    let writer = RingWriter::from_region(region, OverflowPolicy::Truncate).unwrap();
    (Fixture { _dir: dir, path }, writer)
}

fn reader(fx: &Fixture, start: StartMode) -> RingReader {
    RingReader::attach_at(&fx.path, start).unwrap()
}

fn seq_of(outcome: PublishOutcome) -> u64 {
    match outcome {
        PublishOutcome::Published(seq) => seq,
        PublishOutcome::Dropped => panic!("unexpected drop"),
    }
}

#[test]
fn published_payload_reads_back_bitwise() {
    let (fx, mut writer) = fixture(256, 64);
    let payload = b"tick: 2330.5 @ 123456";
    assert_eq!(seq_of(writer.publish(payload)), 0);
    assert_eq!(writer.cursor(), 1);

    let mut reader = reader(&fx, StartMode::FromStart);
    match reader.next() {
        ReadOutcome::Frame(view) => {
            assert_eq!(view.seq(), 0);
            assert_eq!(view.payload(), payload);
            assert!(!view.is_truncated());
            assert!(view.publish_ts_ns() > 0);
            assert!(view.revalidate());
        }
        other => panic!("expected frame, got {:?}", other),
    }
}

#[test]
fn latest_returns_none_on_empty_ring() {
    let (fx, _writer) = fixture(256, 64);
    let mut reader = reader(&fx, StartMode::Latest);
    assert!(reader.latest().is_none());
    assert!(matches!(reader.next(), ReadOutcome::Empty));
}

#[test]
fn burst_is_observed_in_order_without_overrun() {
    let (fx, mut writer) = fixture(256, 1024);
    let mut reader = reader(&fx, StartMode::FromStart);

    let mut last_cursor = 0;
    for i in 0..100u64 {
        writer.publish(format!("frame {:03}", i).as_bytes());
        // Cursor is monotonically non-decreasing throughout.
        assert!(writer.cursor() >= last_cursor);
        last_cursor = writer.cursor();
    }
    assert_eq!(writer.cursor(), 100);

    for i in 0..100u64 {
        match reader.next() {
            ReadOutcome::Frame(view) => {
                assert_eq!(view.seq(), i);
                assert_eq!(view.payload(), format!("frame {:03}", i).as_bytes());
            }
            other => panic!("expected frame {}, got {:?}", i, other),
        }
    }
    assert!(matches!(reader.next(), ReadOutcome::Empty));
    assert_eq!(reader.stats().overruns, 0);
    assert_eq!(reader.stats().frames, 100);
}

#[test]
fn sequences_map_to_physical_slots_after_wrap() {
    let (fx, mut writer) = fixture(256, 8);
    for i in 0..20u64 {
        assert_eq!(seq_of(writer.publish(&i.to_le_bytes())), i);
    }
    assert_eq!(writer.cursor(), 20);

    // The surviving lap is sequences 12..=19; each must still satisfy
    // seq % N == physical index, observable through in-order reads.
    let mut reader = reader(&fx, StartMode::FromStart);
    match reader.next() {
        ReadOutcome::Overrun { gap } => assert_eq!(gap, 16), // slot 0 holds seq 16
        other => panic!("expected overrun, got {:?}", other),
    }
    assert_eq!(reader.cursor(), 20);
}

#[test]
fn lapped_reader_detects_overrun_and_skips_to_latest() {
    let (fx, mut writer) = fixture(256, 1024);
    let mut reader = reader(&fx, StartMode::FromStart);
    reader.advance(100);

    for i in 0..2000u64 {
        writer.publish(&i.to_le_bytes());
    }

    // Slot 100 now carries sequence 1124.
    match reader.next() {
        ReadOutcome::Overrun { gap } => assert_eq!(gap, 1024),
        other => panic!("expected overrun, got {:?}", other),
    }
    assert_eq!(reader.cursor(), 2000);
    assert_eq!(reader.stats().overruns, 1);

    // Nothing new yet after the skip.
    assert!(matches!(reader.next(), ReadOutcome::Empty));
}

#[test]
fn jumbo_frame_is_truncated_with_flag() {
    let (fx, mut writer) = fixture(256, 64);
    assert_eq!(writer.payload_capacity(), 236);

    let jumbo = vec![0xA5u8; 300];
    assert_eq!(seq_of(writer.publish(&jumbo)), 0);
    assert_eq!(writer.cursor(), 1);
    assert_eq!(writer.stats().truncated, 1);

    let mut reader = reader(&fx, StartMode::FromStart);
    match reader.next() {
        ReadOutcome::Frame(view) => {
            assert_eq!(view.payload().len(), 236);
            assert!(view.is_truncated());
            assert_eq!(view.payload(), &jumbo[..236]);
        }
        other => panic!("expected frame, got {:?}", other),
    }
}

#[test]
fn drop_policy_skips_jumbo_frames() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ring_drop");
    let opts = RegionOptions { slot_size: 256, slot_count: 64, force: false };
    let region = ShmRegion::create_at(&path, &opts).unwrap();
    let mut writer = RingWriter::from_region(region, OverflowPolicy::Drop).unwrap();

    assert_eq!(writer.publish(&vec![0u8; 300]), PublishOutcome::Dropped);
    assert_eq!(writer.cursor(), 0);
    assert_eq!(writer.stats().dropped, 1);
    assert_eq!(writer.stats().published, 0);

    // A frame that fits still publishes at sequence 0.
    assert_eq!(seq_of(writer.publish(b"small")), 0);
    assert_eq!(writer.cursor(), 1);
}

#[test]
fn latest_tracks_the_most_recent_frame() {
    let (fx, mut writer) = fixture(256, 64);
    let mut reader = reader(&fx, StartMode::Latest);

    writer.publish(b"first");
    writer.publish(b"second");

    let view = reader.latest().expect("latest frame");
    assert_eq!(view.seq(), 1);
    assert_eq!(view.payload(), b"second");
}

#[test]
fn view_revalidation_fails_after_overwrite() {
    let (fx, mut writer) = fixture(256, 4);
    writer.publish(b"will be lapped");

    let mut reader = reader(&fx, StartMode::FromStart);
    let view = match reader.next() {
        ReadOutcome::Frame(view) => view,
        other => panic!("expected frame, got {:?}", other),
    };
    assert!(view.revalidate());

    // Wrap the ring; slot 0 now carries sequence 4.
    for i in 1..=4u64 {
        writer.publish(&i.to_le_bytes());
    }
    assert!(!view.revalidate());
}

#[test]
fn batch_publish_commits_cursor_once() {
    let (fx, mut writer) = fixture(256, 64);
    let frames: Vec<Vec<u8>> = (0..5u8).map(|i| vec![i; 16]).collect();

    let start = writer.reserve(frames.len() as u64).unwrap();
    assert_eq!(start, 0);
    let end = writer.publish_batch(&frames).unwrap();
    assert_eq!(end, 5);
    assert_eq!(writer.cursor(), 5);

    let mut reader = reader(&fx, StartMode::FromStart);
    for i in 0..5u64 {
        match reader.next() {
            ReadOutcome::Frame(view) => {
                assert_eq!(view.seq(), i);
                assert_eq!(view.payload(), vec![i as u8; 16].as_slice());
            }
            other => panic!("expected frame {}, got {:?}", i, other),
        }
    }
}

#[test]
fn batch_larger_than_ring_is_rejected() {
    let (_fx, writer) = fixture(256, 8);
    assert!(writer.reserve(9).is_err());
}

#[test]
fn lag_alert_fires_past_one_full_ring() {
    let (_fx, mut writer) = fixture(256, 8);
    for i in 0..10u64 {
        writer.publish(&i.to_le_bytes());
    }
    assert!(writer.lag_exceeds_capacity(0)); // 10 behind > 8
    assert!(!writer.lag_exceeds_capacity(5)); // 5 behind <= 8
}

#[test]
fn independent_readers_each_see_every_frame() {
    let (fx, mut writer) = fixture(256, 64);
    let mut first = reader(&fx, StartMode::FromStart);
    let mut second = reader(&fx, StartMode::FromStart);

    for i in 0..10u64 {
        writer.publish(&i.to_le_bytes());
    }

    for r in [&mut first, &mut second] {
        for i in 0..10u64 {
            match r.next() {
                ReadOutcome::Frame(view) => assert_eq!(view.seq(), i),
                other => panic!("expected frame {}, got {:?}", i, other),
            }
        }
    }
    assert_eq!(first.stats().frames, 10);
    assert_eq!(second.stats().frames, 10);
}

#[test]
fn header_records_geometry_and_producer() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ring_header");
    let opts = RegionOptions { slot_size: 512, slot_count: 16, force: false };
    drop(ShmRegion::create_at(&path, &opts).unwrap());

    let region = ShmRegion::attach_at(&path).unwrap();
    let header = region.header();
    assert_eq!(header.slot_size, 512);
    assert_eq!(header.slot_count, 16);
    assert_eq!(header.producer_pid, std::process::id());
    assert!(header.created_ns > 0);
}
