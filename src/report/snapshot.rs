use std::any::Any;
use std::sync::Arc;

use crate::dictionary::Dictionary;

use super::histogram::Histogram;
use super::key::ReportKey;
use super::table::ReportTable;
use super::window::Tick;
use super::{DataKind, ReportInfo, ReportKind, ReportValue};

/// Opaque cursor over a prepared snapshot's table.
///
/// Wraps a stable table slot index; consumers treat it as a token and move
/// it only through the position operations of [`ReportSnapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position(usize);

/// Type-erased view over a report snapshot.
///
/// Reporting code is written once against this interface and never learns
/// the concrete table shape; each report kind plugs in via
/// [`TickSnapshot`]. Position operations are only defined on a prepared
/// snapshot, and only for positions inside `[pos_first, pos_last)` (with
/// `pos_last` itself as the exclusive walk bound); stepping or reading
/// outside that range panics.
pub trait ReportSnapshot: Send {
    /// The immutable metadata copy taken at capture time.
    fn report_info(&self) -> &ReportInfo;

    /// The dictionary used to resolve key components to text.
    fn dictionary(&self) -> &Dictionary;

    /// Merges the captured ticks into the internal table, oldest first,
    /// releasing each tick as soon as it has been merged. No-op once done.
    fn prepare(&mut self);

    /// True once every captured tick has been consumed by merging.
    fn is_prepared(&self) -> bool;

    /// Tag telling the consumer how to decode [`Self::get_data`] values.
    fn data_kind(&self) -> DataKind;

    fn pos_first(&self) -> Position;
    fn pos_last(&self) -> Position;
    fn pos_next(&self, pos: Position) -> Position;
    fn pos_prev(&self, pos: Position) -> Position;
    fn pos_equal(&self, a: Position, b: Position) -> bool;

    /// Row key at `pos`.
    fn get_key(&self, pos: Position) -> ReportKey;

    /// Dictionary-resolved text for each key component, in key order.
    fn get_key_str(&self, pos: Position) -> Vec<Arc<str>>;

    /// Aggregated value at `pos`, downcast by the consumer according to
    /// [`Self::data_kind`].
    fn get_data(&self, pos: Position) -> &dyn Any;

    /// Histogram at `pos` when the report collects histograms; `None`
    /// otherwise - never fabricated.
    fn get_histogram(&self, pos: Position) -> Option<&Histogram>;
}

/// Point-in-time capture of a window's closed-tick history for one report.
///
/// Construction is cheap: it takes strong references to the captured ticks
/// and copies the report metadata. The merge into a queryable table is
/// deferred to [`ReportSnapshot::prepare`], which may run on a different
/// thread than the capture.
pub struct TickSnapshot<K: ReportKind> {
    /// Merged rows, populated by `prepare`.
    table: ReportTable<K::Value>,
    /// Captured ticks still awaiting merge; drained front to back.
    ticks: Vec<Option<Arc<Tick<K::Data>>>>,
    info: ReportInfo,
    dictionary: Arc<Dictionary>,
}

impl<K: ReportKind> TickSnapshot<K> {
    pub fn new(
        ticks: Vec<Option<Arc<Tick<K::Data>>>>,
        info: ReportInfo,
        dictionary: Arc<Dictionary>,
    ) -> Self {
        assert_eq!(
            info.kind,
            K::KIND,
            "report info kind does not match snapshot kind"
        );

        Self {
            table: ReportTable::new(),
            ticks,
            info,
            dictionary,
        }
    }
}

impl<K: ReportKind> ReportSnapshot for TickSnapshot<K> {
    fn report_info(&self) -> &ReportInfo {
        &self.info
    }

    fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    fn prepare(&mut self) {
        if self.is_prepared() {
            return;
        }

        for slot in &mut self.ticks {
            K::merge_from_to(&self.info, slot.as_deref(), &mut self.table);
            // Drop our reference as soon as the tick is merged so the
            // window's eviction can reclaim it while later ticks are still
            // being processed.
            *slot = None;
        }
        self.ticks.clear();
    }

    fn is_prepared(&self) -> bool {
        self.ticks.is_empty()
    }

    fn data_kind(&self) -> DataKind {
        self.info.kind
    }

    fn pos_first(&self) -> Position {
        Position(0)
    }

    fn pos_last(&self) -> Position {
        Position(self.table.len())
    }

    fn pos_next(&self, pos: Position) -> Position {
        assert!(pos.0 < self.table.len(), "pos_next past the end of the table");
        Position(pos.0 + 1)
    }

    fn pos_prev(&self, pos: Position) -> Position {
        assert!(pos.0 > 0, "pos_prev before the start of the table");
        Position(pos.0 - 1)
    }

    fn pos_equal(&self, a: Position, b: Position) -> bool {
        a == b
    }

    fn get_key(&self, pos: Position) -> ReportKey {
        self.table.key_at(pos.0)
    }

    fn get_key_str(&self, pos: Position) -> Vec<Arc<str>> {
        self.get_key(pos)
            .parts()
            .iter()
            .map(|id| self.dictionary.get_word(*id))
            .collect()
    }

    fn get_data(&self, pos: Position) -> &dyn Any {
        self.table.value_at(pos.0)
    }

    fn get_histogram(&self, pos: Position) -> Option<&Histogram> {
        if !self.info.hv_enabled {
            return None;
        }
        self.table.value_at(pos.0).histogram()
    }
}
