//! Benchmarks for per-tick segment resolution
//!
//! The resolver scans every segment once per track on every clock tick, so
//! its cost grows with timeline length.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use storyreel::core::{MediaKind, Track};
use storyreel::playback::{plan_sync, resolve, SurfaceSnapshot, SyncTarget};
use storyreel::timeline::{Asset, SegmentStore};

/// A timeline of `shots` back-to-back 4s shots, alternating stills and
/// videos, with music under every other shot and a logo overlay throughout.
fn build_timeline(shots: usize) -> SegmentStore {
    let mut store = SegmentStore::new();
    for i in 0..shots {
        let start = i as f64 * 4.0;
        let asset = if i % 2 == 0 {
            Asset::new(MediaKind::Image, format!("/media/still_{i}.png"), "still")
        } else {
            Asset::new(MediaKind::Video, format!("/media/clip_{i}.mp4"), "clip").with_duration(4.0)
        };
        store
            .place_asset(&asset, Track::MainVideo, start, 4.0)
            .expect("place shot");
        if i % 2 == 0 {
            let music = Asset::new(MediaKind::Audio, format!("/media/music_{i}.mp3"), "music")
                .with_duration(4.0);
            store
                .place_asset(&music, Track::Audio, start, 4.0)
                .expect("place music");
        }
    }
    let logo = Asset::new(MediaKind::Image, "/media/logo.png", "logo");
    store
        .place_asset(&logo, Track::Overlay, 0.0, shots as f64 * 4.0)
        .expect("place overlay");
    store
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");

    for shots in [10usize, 100, 1000] {
        let store = build_timeline(shots);
        let segments = store.segments();
        let end = shots as f64 * 4.0;
        group.throughput(Throughput::Elements(segments.len() as u64));

        // Early in the program: the first match is near the front.
        group.bench_with_input(BenchmarkId::new("start", shots), &segments, |b, segs| {
            b.iter(|| resolve(black_box(1.0), black_box(segs)))
        });

        // Late in the program: every track scans almost everything.
        group.bench_with_input(BenchmarkId::new("end", shots), &segments, |b, segs| {
            b.iter(|| resolve(black_box(end - 0.5), black_box(segs)))
        });

        // Past the end: the worst case, a full scan per track.
        group.bench_with_input(BenchmarkId::new("gap", shots), &segments, |b, segs| {
            b.iter(|| resolve(black_box(end + 1.0), black_box(segs)))
        });
    }

    group.finish();
}

fn bench_tick(c: &mut Criterion) {
    let store = build_timeline(100);
    let segments = store.segments();
    let active = resolve(202.0, segments);
    let observed = SurfaceSnapshot {
        source: active.main.map(|s| s.location.clone()),
        current_time: 1.9,
        paused: false,
        visible: true,
        muted: true,
    };

    c.bench_function("tick_resolve_and_plan", |b| {
        b.iter(|| {
            let active = resolve(black_box(202.0), black_box(segments));
            let target = SyncTarget {
                segment: active.main,
                time: 202.0,
                playing: true,
                muted: true,
                tolerance: 0.3,
            };
            plan_sync(&target, black_box(&observed))
        })
    });
}

criterion_group!(benches, bench_resolve, bench_tick);
criterion_main!(benches);
