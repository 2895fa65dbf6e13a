use std::collections::HashMap;

use super::histogram::Histogram;
use super::key::ReportKey;
use super::table::ReportTable;
use super::window::Tick;
use super::{DataKind, ReportInfo, ReportKind, ReportValue, Sample};

/// Merged table entry for counter reports.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CounterValue {
    pub count: u64,
    pub sum: i64,
}

impl CounterValue {
    fn add(&mut self, value: i64) {
        self.count += 1;
        self.sum = self.sum.saturating_add(value);
    }

    fn merge_from(&mut self, other: &CounterValue) {
        self.count += other.count;
        self.sum = self.sum.saturating_add(other.sum);
    }
}

impl ReportValue for CounterValue {}

/// Per-tick payload for counter reports.
#[derive(Debug, Default)]
pub struct CounterData {
    pub rows: HashMap<ReportKey, CounterValue>,
}

/// Counter report: event count and value sum per key.
pub struct CounterReport;

impl ReportKind for CounterReport {
    type Data = CounterData;
    type Value = CounterValue;
    const KIND: DataKind = DataKind::Counter;

    fn record(_info: &ReportInfo, data: &mut CounterData, sample: Sample) {
        data.rows.entry(sample.key).or_default().add(sample.value);
    }

    fn merge_from_to(
        _info: &ReportInfo,
        from: Option<&Tick<CounterData>>,
        to: &mut ReportTable<CounterValue>,
    ) {
        let Some(tick) = from else { return };
        for (key, value) in &tick.data.rows {
            to.entry(*key).merge_from(value);
        }
    }
}

/// Merged table entry for latency reports.
///
/// `min`/`max` are only meaningful while `count > 0`.
#[derive(Debug, Clone)]
pub struct LatencyValue {
    pub count: u64,
    pub sum: i64,
    pub min: i64,
    pub max: i64,
    pub hv: Option<Histogram>,
}

impl Default for LatencyValue {
    fn default() -> Self {
        Self {
            count: 0,
            sum: 0,
            min: i64::MAX,
            max: i64::MIN,
            hv: None,
        }
    }
}

impl LatencyValue {
    fn record(&mut self, value: i64, hv_enabled: bool) {
        self.count += 1;
        self.sum = self.sum.saturating_add(value);
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        if hv_enabled {
            self.hv
                .get_or_insert_with(Histogram::new)
                .record(value.max(0) as u64);
        }
    }

    fn merge_from(&mut self, other: &LatencyValue) {
        self.count += other.count;
        self.sum = self.sum.saturating_add(other.sum);
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        if let Some(other_hv) = &other.hv {
            self.hv
                .get_or_insert_with(Histogram::new)
                .merge_from(other_hv);
        }
    }

    /// Mean latency, zero when nothing was recorded.
    pub fn mean(&self) -> i64 {
        if self.count == 0 {
            0
        } else {
            self.sum / self.count as i64
        }
    }
}

impl ReportValue for LatencyValue {
    fn histogram(&self) -> Option<&Histogram> {
        self.hv.as_ref()
    }
}

/// Per-tick payload for latency reports.
#[derive(Debug, Default)]
pub struct LatencyData {
    pub rows: HashMap<ReportKey, LatencyValue>,
}

/// Latency report: count/sum/min/max per key, with an optional per-row
/// histogram when the report has histogram collection enabled.
pub struct LatencyReport;

impl ReportKind for LatencyReport {
    type Data = LatencyData;
    type Value = LatencyValue;
    const KIND: DataKind = DataKind::Latency;

    fn record(info: &ReportInfo, data: &mut LatencyData, sample: Sample) {
        data.rows
            .entry(sample.key)
            .or_default()
            .record(sample.value, info.hv_enabled);
    }

    fn merge_from_to(
        _info: &ReportInfo,
        from: Option<&Tick<LatencyData>>,
        to: &mut ReportTable<LatencyValue>,
    ) {
        let Some(tick) = from else { return };
        for (key, value) in &tick.data.rows {
            to.entry(*key).merge_from(value);
        }
    }
}
