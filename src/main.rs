use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use tickfold::config::{Config, WorkloadConfig};
use tickfold::dictionary::Dictionary;
use tickfold::engine::{self, EngineHandle};
use tickfold::report::key::{ReportKey, WordId};
use tickfold::report::kinds::{CounterReport, CounterValue, LatencyReport, LatencyValue};
use tickfold::report::snapshot::ReportSnapshot;
use tickfold::report::{DataKind, ReportInfo, Sample};

/// Sliding-window metrics aggregation daemon.
#[derive(Parser)]
#[command(name = "tickfold", about)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Logging verbosity level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print version information and exit.
    Version,
}

/// Build-time version info.
mod version {
    /// Release version string (set at build time).
    pub const RELEASE: &str = env!("CARGO_PKG_VERSION");

    /// Git commit hash (set at build time via env, or "unknown").
    pub fn git_commit() -> &'static str {
        option_env!("GIT_COMMIT").unwrap_or("unknown")
    }

    /// Full version string with platform info.
    pub fn full() -> String {
        format!(
            "{} (commit: {}, {}/{})",
            RELEASE,
            git_commit(),
            std::env::consts::OS,
            std::env::consts::ARCH,
        )
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Handle version subcommand before anything else.
    if let Some(Command::Version) = &cli.command {
        println!("tickfold {}", version::full());
        return Ok(());
    }

    // Initialize tracing.
    let filter = EnvFilter::try_new(&cli.log_level)
        .with_context(|| format!("invalid log level: {}", cli.log_level))?;

    fmt().with_env_filter(filter).with_target(true).init();

    // Config is required for the daemon run.
    let config_path = cli
        .config
        .context("--config is required (use --help for usage)")?;

    let cfg = Config::load(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    tracing::info!(
        version = version::RELEASE,
        commit = version::git_commit(),
        "starting tickfold",
    );

    // Build and run the tokio runtime.
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;

    rt.block_on(async { run(cfg).await })
}

/// Engine handle for either shipped report kind.
enum AnyReport {
    Counter(EngineHandle<CounterReport>),
    Latency(EngineHandle<LatencyReport>),
}

impl AnyReport {
    fn record(&self, sample: Sample) {
        match self {
            AnyReport::Counter(handle) => handle.record(sample),
            AnyReport::Latency(handle) => handle.record(sample),
        }
    }

    async fn take_snapshot(&self) -> Result<Box<dyn ReportSnapshot>> {
        Ok(match self {
            AnyReport::Counter(handle) => Box::new(handle.take_snapshot().await?),
            AnyReport::Latency(handle) => Box::new(handle.take_snapshot().await?),
        })
    }

    fn info(&self) -> &ReportInfo {
        match self {
            AnyReport::Counter(handle) => handle.info(),
            AnyReport::Latency(handle) => handle.info(),
        }
    }
}

async fn run(cfg: Config) -> Result<()> {
    let cancel = CancellationToken::new();
    let dictionary = Arc::new(Dictionary::new());

    // Set up signal handling.
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to register SIGTERM handler");

        tokio::select! {
            _ = ctrl_c => {
                tracing::info!("received SIGINT, shutting down");
            }
            _ = sigterm.recv() => {
                tracing::info!("received SIGTERM, shutting down");
            }
        }
        signal_cancel.cancel();
    });

    let mut tasks = Vec::new();
    let mut reports = Vec::new();

    for report_cfg in &cfg.reports {
        let info = cfg.report_info(report_cfg);
        let (report, task) = match report_cfg.kind {
            DataKind::Counter => {
                let (handle, task) = engine::spawn::<CounterReport>(
                    info,
                    Arc::clone(&dictionary),
                    cancel.clone(),
                );
                (AnyReport::Counter(handle), task)
            }
            DataKind::Latency => {
                let (handle, task) = engine::spawn::<LatencyReport>(
                    info,
                    Arc::clone(&dictionary),
                    cancel.clone(),
                );
                (AnyReport::Latency(handle), task)
            }
        };
        tasks.push(task);
        reports.push(Arc::new(report));
    }

    for report in &reports {
        if cfg.workload.enabled {
            tasks.push(tokio::spawn(generate_workload(
                Arc::clone(report),
                Arc::clone(&dictionary),
                cfg.workload.clone(),
                cancel.clone(),
            )));
        }

        tasks.push(tokio::spawn(render_loop(
            Arc::clone(report),
            cfg.engine.report_interval,
            cancel.clone(),
        )));
    }

    info!(
        reports = reports.len(),
        workload = cfg.workload.enabled,
        "tickfold started"
    );

    cancel.cancelled().await;

    for task in tasks {
        if let Err(e) = task.await {
            warn!(error = %e, "task join failed");
        }
    }

    Ok(())
}

/// Feeds deterministic synthetic samples into one report.
///
/// Keys rotate through a fixed pool interned up front; values follow a
/// sawtooth so min/max and histogram buckets stay interesting without
/// pulling in an RNG.
async fn generate_workload(
    report: Arc<AnyReport>,
    dictionary: Arc<Dictionary>,
    cfg: WorkloadConfig,
    cancel: CancellationToken,
) {
    let info = report.info().clone();

    let keys: Vec<ReportKey> = (0..cfg.keys_per_report.max(1))
        .map(|i| {
            let parts: Vec<WordId> = (0..info.key_parts)
                .map(|part| dictionary.get_or_add(&format!("{}-w{part}-{i}", info.name)))
                .collect();
            ReportKey::new(&parts)
        })
        .collect();

    let mut ticker = tokio::time::interval(cfg.sample_interval);
    let mut seq: u64 = 0;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,

            _ = ticker.tick() => {
                let key = keys[(seq as usize) % keys.len()];
                let value = ((seq % 997) * 13_000) as i64;
                report.record(Sample { key, value });
                seq += 1;
            }
        }
    }
}

/// Periodically snapshots one report and renders it to the log.
async fn render_loop(report: Arc<AnyReport>, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // Skip the immediate first fire; there is nothing to report yet.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,

            _ = ticker.tick() => {
                match report.take_snapshot().await {
                    Ok(mut snapshot) => render_report(snapshot.as_mut()),
                    Err(e) => {
                        warn!(report = %report.info().name, error = %e, "snapshot request failed");
                        return;
                    }
                }
            }
        }
    }
}

/// Renders one snapshot through the type-erased cursor interface.
///
/// This is the binary's only snapshot consumer and it never sees a concrete
/// table type; values are decoded by the snapshot's data kind tag alone.
fn render_report(snapshot: &mut dyn ReportSnapshot) {
    snapshot.prepare();

    let info = snapshot.report_info().clone();
    let mut rows = 0usize;
    let mut pos = snapshot.pos_first();

    while !snapshot.pos_equal(pos, snapshot.pos_last()) {
        let key = snapshot.get_key(pos).resolve(snapshot.dictionary());

        match snapshot.data_kind() {
            DataKind::Counter => {
                let value = snapshot
                    .get_data(pos)
                    .downcast_ref::<CounterValue>()
                    .expect("counter table value");
                info!(
                    report = %info.name,
                    key = %key,
                    count = value.count,
                    sum = value.sum,
                    "row"
                );
            }
            DataKind::Latency => {
                let value = snapshot
                    .get_data(pos)
                    .downcast_ref::<LatencyValue>()
                    .expect("latency table value");
                let hv_samples = snapshot.get_histogram(pos).map(|h| h.total());
                info!(
                    report = %info.name,
                    key = %key,
                    count = value.count,
                    mean_ns = value.mean(),
                    min_ns = value.min,
                    max_ns = value.max,
                    hv_samples,
                    "row"
                );
            }
        }

        rows += 1;
        pos = snapshot.pos_next(pos);
    }

    info!(report = %info.name, rows, "report rendered");
}
