use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// One time-bounded aggregation bucket.
///
/// `end_time` stays at `UNIX_EPOCH` (the zero timestamp) while the tick is
/// open and is stamped exactly once when the window closes it. Closed ticks
/// are handed out behind `Arc` only, so nothing can mutate them afterwards;
/// that immutability is what makes sharing them across threads safe without
/// locking.
#[derive(Debug)]
pub struct Tick<D> {
    pub start_time: SystemTime,
    pub end_time: SystemTime,
    pub data: D,
}

impl<D: Default> Tick<D> {
    fn open(start_time: SystemTime) -> Self {
        Self {
            start_time,
            end_time: SystemTime::UNIX_EPOCH,
            data: D::default(),
        }
    }
}

impl<D> Tick<D> {
    /// Wall-clock span covered by a closed tick.
    pub fn span(&self) -> Duration {
        self.end_time
            .duration_since(self.start_time)
            .unwrap_or(Duration::ZERO)
    }
}

/// Bounded sliding window: the retained closed ticks plus the currently
/// open one.
///
/// History always holds exactly `tick_count` slots, oldest first; slots the
/// window has not lived long enough to fill are `None`, which merge
/// implementations treat as "no data for this interval". The open tick is
/// exclusively owned, so only the single producer holding `&mut` access can
/// write into it and no snapshot can observe it mid-write.
pub struct TickWindow<D> {
    tick_count: usize,
    ticks: Vec<Option<Arc<Tick<D>>>>,
    current: Tick<D>,
}

impl<D: Default> TickWindow<D> {
    /// Opens the window at `start_time` with `tick_count` history slots.
    ///
    /// Panics if `tick_count` is zero.
    pub fn new(tick_count: usize, start_time: SystemTime) -> Self {
        assert!(tick_count > 0, "tick window capacity must be non-zero");

        let mut ticks = Vec::with_capacity(tick_count + 1);
        ticks.resize_with(tick_count, || None);

        Self {
            tick_count,
            ticks,
            current: Tick::open(start_time),
        }
    }

    /// Closes the current tick at `now`, retires it into history and opens
    /// a fresh one.
    ///
    /// The single mutation point for history; exactly one producer may call
    /// this. Eviction drops only the window's own reference - a snapshot
    /// still holding the tick keeps it alive.
    pub fn tick(&mut self, now: SystemTime) {
        let mut closed = std::mem::replace(&mut self.current, Tick::open(now));
        closed.end_time = now;
        self.ticks.push(Some(Arc::new(closed)));

        if self.ticks.len() > self.tick_count {
            // O(window size) front eviction; capacities are small enough
            // that this beats the bookkeeping of a real ring buffer.
            self.ticks.remove(0);
        }
    }

    /// Read-only view of the history slots, oldest first.
    pub fn history(&self) -> &[Option<Arc<Tick<D>>>] {
        &self.ticks
    }

    /// Clones the history slots for a snapshot capture. Every clone is an
    /// additional strong reference; eviction proceeds independently.
    pub fn capture(&self) -> Vec<Option<Arc<Tick<D>>>> {
        self.ticks.clone()
    }

    /// The open tick.
    pub fn current(&self) -> &Tick<D> {
        &self.current
    }

    /// Mutable access to the open tick, for the producer to record into.
    pub fn current_mut(&mut self) -> &mut Tick<D> {
        &mut self.current
    }

    pub fn tick_count(&self) -> usize {
        self.tick_count
    }
}
