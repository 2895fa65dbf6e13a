use std::alloc::System;
use std::hint::black_box;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use serial_test::serial;
use stats_alloc::{Region, StatsAlloc, INSTRUMENTED_SYSTEM};

use tickfold::report::key::ReportKey;
use tickfold::report::kinds::{CounterData, CounterReport, LatencyData, LatencyReport};
use tickfold::report::table::ReportTable;
use tickfold::report::window::{Tick, TickWindow};
use tickfold::report::{DataKind, ReportInfo, ReportKind, Sample};

#[global_allocator]
static GLOBAL: &StatsAlloc<System> = &INSTRUMENTED_SYSTEM;

fn measure_alloc_counts<T>(f: impl FnOnce() -> T) -> (T, usize, usize) {
    // Calibrate for ambient allocator activity in the test harness process.
    let idle_region = Region::new(&GLOBAL);
    black_box(());
    let idle = idle_region.change();

    let region = Region::new(&GLOBAL);
    let output = f();
    let used = region.change();

    let allocations = used.allocations.saturating_sub(idle.allocations);
    let deallocations = used.deallocations.saturating_sub(idle.deallocations);
    (output, allocations, deallocations)
}

fn counter_info() -> ReportInfo {
    ReportInfo {
        name: Arc::from("requests"),
        kind: DataKind::Counter,
        tick_interval: Duration::from_millis(100),
        tick_count: 8,
        key_parts: 2,
        hv_enabled: false,
    }
}

fn latency_info() -> ReportInfo {
    ReportInfo {
        name: Arc::from("request_time"),
        kind: DataKind::Latency,
        tick_interval: Duration::from_millis(100),
        tick_count: 8,
        key_parts: 2,
        hv_enabled: true,
    }
}

fn keys(n: u32) -> Vec<ReportKey> {
    (0..n).map(|i| ReportKey::new(&[i, i * 7 + 1])).collect()
}

#[test]
#[serial]
fn record_into_warm_payload_allocates_zero() {
    let info = counter_info();
    let keys = keys(64);

    // Warm up: every key gets its row allocated once.
    let mut data = CounterData::default();
    for &key in &keys {
        CounterReport::record(&info, &mut data, Sample { key, value: 1 });
    }

    let (_, allocations, deallocations) = measure_alloc_counts(|| {
        for round in 0..128i64 {
            for &key in &keys {
                CounterReport::record(&info, &mut data, Sample { key, value: round });
            }
        }
        black_box(data.rows.len());
    });

    assert_eq!(
        allocations, 0,
        "warm counter record path must not allocate: {allocations}"
    );
    assert_eq!(
        deallocations, 0,
        "warm counter record path must not deallocate: {deallocations}"
    );
}

#[test]
#[serial]
fn warm_latency_record_allocation_budget() {
    let info = latency_info();
    let keys = keys(64);

    // Warm up allocates rows and their histograms.
    let mut data = LatencyData::default();
    for &key in &keys {
        LatencyReport::record(&info, &mut data, Sample { key, value: 5_000 });
    }

    let (_, allocations, _deallocations) = measure_alloc_counts(|| {
        for round in 0..128i64 {
            for &key in &keys {
                LatencyReport::record(
                    &info,
                    &mut data,
                    Sample {
                        key,
                        value: round * 1_000,
                    },
                );
            }
        }
        black_box(data.rows.len());
    });

    assert_eq!(
        allocations, 0,
        "warm latency record path must not allocate: {allocations}"
    );
}

#[test]
#[serial]
fn window_capture_allocation_budget() {
    let mut window: TickWindow<CounterData> = TickWindow::new(16, SystemTime::UNIX_EPOCH);
    for i in 1..=16 {
        window.tick(SystemTime::UNIX_EPOCH + Duration::from_secs(i));
    }

    let (captured, allocations, _deallocations) = measure_alloc_counts(|| {
        let captured = window.capture();
        black_box(captured.len());
        captured
    });

    assert_eq!(captured.len(), 16);
    // Capture clones one Vec of Arc pointers; refcount bumps are free.
    assert!(
        allocations <= 1,
        "capture allocation budget exceeded: {allocations}"
    );
}

#[test]
#[serial]
fn merge_reuses_existing_table_rows() {
    let info = counter_info();
    let keys = keys(64);

    let mut data = CounterData::default();
    for &key in &keys {
        CounterReport::record(&info, &mut data, Sample { key, value: 1 });
    }
    let tick = Tick {
        start_time: SystemTime::UNIX_EPOCH,
        end_time: SystemTime::UNIX_EPOCH + Duration::from_secs(1),
        data,
    };

    // First merge builds the table rows.
    let mut table = ReportTable::new();
    CounterReport::merge_from_to(&info, Some(&tick), &mut table);

    // Re-merging the same key set must only update rows in place.
    let (_, allocations, _deallocations) = measure_alloc_counts(|| {
        for _ in 0..16 {
            CounterReport::merge_from_to(&info, Some(&tick), &mut table);
        }
        black_box(table.len());
    });

    assert_eq!(table.len(), 64);
    assert_eq!(
        allocations, 0,
        "repeat merge allocation budget exceeded: {allocations}"
    );
}
