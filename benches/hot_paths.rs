use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use tickfold::dictionary::Dictionary;
use tickfold::report::key::ReportKey;
use tickfold::report::kinds::{CounterData, CounterReport, LatencyData, LatencyReport};
use tickfold::report::snapshot::{ReportSnapshot, TickSnapshot};
use tickfold::report::table::ReportTable;
use tickfold::report::window::Tick;
use tickfold::report::{DataKind, ReportInfo, ReportKind, Sample};

const ROWS_PER_TICK: u32 = 256;
const TICKS_PER_WINDOW: u64 = 16;

fn counter_info() -> ReportInfo {
    ReportInfo {
        name: Arc::from("requests"),
        kind: DataKind::Counter,
        tick_interval: Duration::from_secs(1),
        tick_count: TICKS_PER_WINDOW as usize,
        key_parts: 2,
        hv_enabled: false,
    }
}

fn latency_info() -> ReportInfo {
    ReportInfo {
        name: Arc::from("request_time"),
        kind: DataKind::Latency,
        tick_interval: Duration::from_secs(1),
        tick_count: TICKS_PER_WINDOW as usize,
        key_parts: 2,
        hv_enabled: true,
    }
}

fn bench_keys() -> Vec<ReportKey> {
    (0..ROWS_PER_TICK)
        .map(|i| ReportKey::new(&[i, i * 31 + 7]))
        .collect()
}

fn counter_tick(info: &ReportInfo, seq: u64) -> Arc<Tick<CounterData>> {
    let mut data = CounterData::default();
    for key in bench_keys() {
        CounterReport::record(
            info,
            &mut data,
            Sample {
                key,
                value: (seq % 91) as i64,
            },
        );
    }
    Arc::new(Tick {
        start_time: SystemTime::UNIX_EPOCH + Duration::from_secs(seq),
        end_time: SystemTime::UNIX_EPOCH + Duration::from_secs(seq + 1),
        data,
    })
}

fn latency_tick(info: &ReportInfo, seq: u64) -> Arc<Tick<LatencyData>> {
    let mut data = LatencyData::default();
    for key in bench_keys() {
        LatencyReport::record(
            info,
            &mut data,
            Sample {
                key,
                value: ((seq % 91) * 11_000) as i64,
            },
        );
    }
    Arc::new(Tick {
        start_time: SystemTime::UNIX_EPOCH + Duration::from_secs(seq),
        end_time: SystemTime::UNIX_EPOCH + Duration::from_secs(seq + 1),
        data,
    })
}

fn bench_key_hashing(c: &mut Criterion) {
    let keys = bench_keys();
    let mut map: HashMap<ReportKey, u64> = HashMap::with_capacity(keys.len());
    for (i, key) in keys.iter().enumerate() {
        map.insert(*key, i as u64);
    }

    c.bench_function("key/lookup_hot_map", |b| {
        b.iter(|| {
            let mut hits = 0u64;
            for key in &keys {
                if map.contains_key(black_box(key)) {
                    hits += 1;
                }
            }
            black_box(hits)
        })
    });
}

fn bench_record(c: &mut Criterion) {
    let info = counter_info();
    let keys = bench_keys();

    c.bench_function("record/counter_warm_tick", |b| {
        let mut data = CounterData::default();
        for &key in &keys {
            CounterReport::record(&info, &mut data, Sample { key, value: 1 });
        }
        b.iter(|| {
            for &key in &keys {
                CounterReport::record(&info, &mut data, Sample { key, value: 3 });
            }
            black_box(data.rows.len())
        })
    });
}

fn bench_merge(c: &mut Criterion) {
    let info = counter_info();
    let tick = counter_tick(&info, 1);

    c.bench_function("merge/counter_tick_into_warm_table", |b| {
        let mut table = ReportTable::new();
        CounterReport::merge_from_to(&info, Some(tick.as_ref()), &mut table);
        b.iter(|| {
            CounterReport::merge_from_to(&info, Some(black_box(tick.as_ref())), &mut table);
            black_box(table.len())
        })
    });
}

fn bench_snapshot_prepare(c: &mut Criterion) {
    let dictionary = Arc::new(Dictionary::new());

    c.bench_function("snapshot/prepare_counter_window", |b| {
        let info = counter_info();
        let ticks: Vec<_> = (0..TICKS_PER_WINDOW)
            .map(|seq| Some(counter_tick(&info, seq)))
            .collect();
        b.iter(|| {
            let mut snapshot = TickSnapshot::<CounterReport>::new(
                ticks.clone(),
                info.clone(),
                Arc::clone(&dictionary),
            );
            snapshot.prepare();
            black_box(snapshot.pos_last())
        })
    });

    c.bench_function("snapshot/prepare_latency_window_with_hv", |b| {
        let info = latency_info();
        let ticks: Vec<_> = (0..TICKS_PER_WINDOW)
            .map(|seq| Some(latency_tick(&info, seq)))
            .collect();
        b.iter(|| {
            let mut snapshot = TickSnapshot::<LatencyReport>::new(
                ticks.clone(),
                info.clone(),
                Arc::clone(&dictionary),
            );
            snapshot.prepare();
            black_box(snapshot.pos_last())
        })
    });
}

fn bench_cursor_walk(c: &mut Criterion) {
    let dictionary = Arc::new(Dictionary::new());
    let info = counter_info();
    let ticks: Vec<_> = (0..TICKS_PER_WINDOW)
        .map(|seq| Some(counter_tick(&info, seq)))
        .collect();
    let mut snapshot =
        TickSnapshot::<CounterReport>::new(ticks, info, Arc::clone(&dictionary));
    snapshot.prepare();

    c.bench_function("snapshot/cursor_full_walk", |b| {
        b.iter(|| {
            let mut rows = 0u64;
            let mut pos = snapshot.pos_first();
            while !snapshot.pos_equal(pos, snapshot.pos_last()) {
                black_box(snapshot.get_key(pos));
                black_box(snapshot.get_data(pos));
                rows += 1;
                pos = snapshot.pos_next(pos);
            }
            black_box(rows)
        })
    });
}

criterion_group!(
    benches,
    bench_key_hashing,
    bench_record,
    bench_merge,
    bench_snapshot_prepare,
    bench_cursor_walk
);
criterion_main!(benches);
