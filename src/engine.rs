use std::sync::Arc;
use std::time::SystemTime;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dictionary::Dictionary;
use crate::report::snapshot::TickSnapshot;
use crate::report::window::TickWindow;
use crate::report::{ReportInfo, ReportKind, Sample};

/// Sample channel depth; sized for event bursts between select rounds.
const CHANNEL_CAPACITY: usize = 65_536;

/// Commands drained from the channel per select round.
const BATCH_SIZE: usize = 256;

/// Commands accepted by a running report engine.
enum Command<K: ReportKind> {
    Sample(Sample),
    Snapshot(oneshot::Sender<TickSnapshot<K>>),
}

/// Error returned by handle operations once the engine task is gone.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("report engine is not running")]
    Stopped,
}

/// Handle for feeding samples to and taking snapshots from a running
/// report engine. Cheap to clone; all clones talk to the same engine task.
pub struct EngineHandle<K: ReportKind> {
    tx: mpsc::Sender<Command<K>>,
    info: ReportInfo,
}

impl<K: ReportKind> Clone for EngineHandle<K> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            info: self.info.clone(),
        }
    }
}

impl<K: ReportKind> EngineHandle<K> {
    /// Records one sample into the report's open tick.
    ///
    /// Non-blocking: when the engine is saturated the sample is dropped
    /// with a warning rather than stalling the producer.
    pub fn record(&self, sample: Sample) {
        if self.tx.try_send(Command::Sample(sample)).is_err() {
            warn!(report = %self.info.name, "engine channel full, dropping sample");
        }
    }

    /// Captures a snapshot of the report's closed-tick history.
    ///
    /// The capture runs on the engine task between window advances, so the
    /// returned snapshot always sees a consistent history. It comes back
    /// raw; call `prepare()` before using the cursor.
    pub async fn take_snapshot(&self) -> Result<TickSnapshot<K>, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Command::Snapshot(reply_tx))
            .await
            .map_err(|_| EngineError::Stopped)?;
        reply_rx.await.map_err(|_| EngineError::Stopped)
    }

    pub fn info(&self) -> &ReportInfo {
        &self.info
    }
}

/// Spawns the aggregation task for one report and returns its handle.
///
/// The task exclusively owns the tick window: samples, timer-driven window
/// advances and snapshot captures are all serialized through one select
/// loop, which is what upholds the single-writer contract.
pub fn spawn<K: ReportKind>(
    info: ReportInfo,
    dictionary: Arc<Dictionary>,
    cancel: CancellationToken,
) -> (EngineHandle<K>, tokio::task::JoinHandle<()>) {
    assert_eq!(
        info.kind,
        K::KIND,
        "report config kind does not match engine kind"
    );

    let (tx, mut rx) = mpsc::channel(CHANNEL_CAPACITY);
    let handle = EngineHandle {
        tx,
        info: info.clone(),
    };

    let task = tokio::spawn(async move {
        let mut window = TickWindow::<K::Data>::new(info.tick_count, SystemTime::now());
        let mut ticker = tokio::time::interval(info.tick_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // Consume the immediate first fire so the first tick spans a full
        // interval.
        ticker.tick().await;

        info!(
            report = %info.name,
            kind = ?info.kind,
            interval = ?info.tick_interval,
            tick_count = info.tick_count,
            "report engine started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    let closed = window.history().iter().flatten().count();
                    info!(report = %info.name, closed_ticks = closed, "report engine stopped");
                    return;
                }

                Some(cmd) = rx.recv() => {
                    handle_command(&info, &mut window, &dictionary, cmd);
                    // Drain a burst without re-entering the select.
                    for _ in 0..BATCH_SIZE - 1 {
                        match rx.try_recv() {
                            Ok(cmd) => handle_command(&info, &mut window, &dictionary, cmd),
                            Err(_) => break,
                        }
                    }
                }

                _ = ticker.tick() => {
                    window.tick(SystemTime::now());
                    debug!(report = %info.name, "window advanced");
                }
            }
        }
    });

    (handle, task)
}

fn handle_command<K: ReportKind>(
    info: &ReportInfo,
    window: &mut TickWindow<K::Data>,
    dictionary: &Arc<Dictionary>,
    cmd: Command<K>,
) {
    match cmd {
        Command::Sample(sample) => {
            K::record(info, &mut window.current_mut().data, sample);
        }
        Command::Snapshot(reply) => {
            let snapshot =
                TickSnapshot::<K>::new(window.capture(), info.clone(), Arc::clone(dictionary));
            // The requester may have given up waiting; nothing to do then.
            let _ = reply.send(snapshot);
        }
    }
}
