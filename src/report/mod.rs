pub mod histogram;
pub mod key;
pub mod kinds;
pub mod snapshot;
pub mod table;
pub mod window;

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use self::histogram::Histogram;
use self::key::ReportKey;
use self::table::ReportTable;
use self::window::Tick;

/// Discriminator for the concrete shape of a report's merged table values.
///
/// Consumers use it to pick the right decoder for [`snapshot::ReportSnapshot::get_data`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    Counter,
    Latency,
}

/// Immutable per-report metadata.
///
/// Copied into every snapshot at capture time, so reconfiguring a report
/// never affects an in-flight snapshot.
#[derive(Debug, Clone)]
pub struct ReportInfo {
    pub name: Arc<str>,
    pub kind: DataKind,
    /// Duration of one aggregation tick.
    pub tick_interval: Duration,
    /// Closed ticks retained in the window.
    pub tick_count: usize,
    /// Number of key components rows are grouped by.
    pub key_parts: usize,
    /// Whether per-row latency histograms are collected.
    pub hv_enabled: bool,
}

/// One producer-recorded measurement: a row key plus a value whose meaning
/// depends on the report kind (a count delta, a latency in nanoseconds...).
#[derive(Debug, Clone, Copy)]
pub struct Sample {
    pub key: ReportKey,
    pub value: i64,
}

/// Aggregated value stored in a merged report table.
///
/// The `Any` bound is what lets the type-erased cursor hand values out as
/// opaque references for consumers to downcast by [`DataKind`].
pub trait ReportValue: Any + Send {
    /// Histogram owned by this entry, if the value kind carries one.
    fn histogram(&self) -> Option<&Histogram> {
        None
    }
}

/// Capability implemented once per concrete report kind: how one event
/// updates a tick payload, and how one tick's payload folds into the
/// accumulating table.
pub trait ReportKind: Send + 'static {
    /// Per-tick aggregation payload.
    type Data: Default + Send + Sync + 'static;
    /// Merged table entry.
    type Value: ReportValue + Default;
    /// Tag matching this kind's table value shape.
    const KIND: DataKind;

    /// Folds one sample into the open tick's payload.
    fn record(info: &ReportInfo, data: &mut Self::Data, sample: Sample);

    /// Folds one tick's payload into `to`.
    ///
    /// `from` is `None` for history slots the window never filled; such
    /// slots contribute nothing. Merging must be associative-in-effect
    /// across ticks, but may read the tick's time bounds for rate-style
    /// aggregates.
    fn merge_from_to(
        info: &ReportInfo,
        from: Option<&Tick<Self::Data>>,
        to: &mut ReportTable<Self::Value>,
    );
}
