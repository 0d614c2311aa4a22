//! Performance benchmarks for matching on join and expiry passes

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use matchmaker::queue::{LevelMatchFinder, MatchFinder, PlayerPool, QueueEntry};
use matchmaker::utils::current_timestamp;
use matchmaker::{MatchmakingOptions, MatchmakingResult, MatchmakingService, PlayerData};
use std::time::Duration;

fn bench_options(max_level_diff: u32) -> MatchmakingOptions {
    MatchmakingOptions::new(10, Duration::ZERO, Duration::ZERO, max_level_diff)
}

fn bench_player(index: usize, levels: i64) -> PlayerData {
    PlayerData::new(format!("player-{}", index), (index as i64 * 31) % levels, "US")
}

fn filled_pool(size: usize, levels: i64) -> PlayerPool {
    let mut pool = PlayerPool::new();
    let now = current_timestamp();
    for i in 0..size {
        pool.insert(QueueEntry::new(bench_player(i, levels), now, Duration::from_secs(60)))
            .unwrap();
    }
    pool
}

fn bench_find_match(c: &mut Criterion) {
    let finder = LevelMatchFinder::new();
    let options = bench_options(2);
    let mut group = c.benchmark_group("find_match");

    for size in [100, 1_000, 10_000] {
        // Wide level spread so the scan has to skip most of the pool
        let pool = filled_pool(size, 1_000);
        let anchor = bench_player(size + 1, 1_000);

        group.bench_with_input(BenchmarkId::from_parameter(size), &pool, |b, pool| {
            b.iter(|| black_box(finder.find_match(black_box(&anchor), pool, &options)))
        });
    }

    group.finish();
}

fn bench_join_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("join");

    for levels in [1, 10, 100] {
        group.bench_with_input(
            BenchmarkId::new("1000_players", levels),
            &levels,
            |b, &levels| {
                b.iter(|| {
                    let service = MatchmakingService::new(bench_options(2)).unwrap();
                    let mut matches = 0;
                    for i in 0..1_000 {
                        if service.join(bench_player(i, levels)).unwrap().match_found {
                            matches += 1;
                        }
                    }
                    black_box(matches)
                })
            },
        );
    }

    group.finish();
}

fn bench_expiry_pass(c: &mut Criterion) {
    c.bench_function("expiry_pass_1000_players", |b| {
        b.iter_with_setup(
            || {
                let service = MatchmakingService::new(bench_options(0)).unwrap();
                for i in 0..1_000 {
                    service.join(bench_player(i, 500)).unwrap();
                }
                service
            },
            |service| {
                let drain = |result: MatchmakingResult| {
                    black_box(result);
                };
                black_box(service.run_expiry_pass(&drain).unwrap())
            },
        )
    });
}

criterion_group!(
    benches,
    bench_find_match,
    bench_join_throughput,
    bench_expiry_pass
);
criterion_main!(benches);
