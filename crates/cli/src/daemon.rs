//! Daemon lifecycle and request dispatch
//!
//! `start()` wires watcher, pipeline, store, bus and detector together
//! and serves the query surface over IPC until SIGINT or SIGTERM.
//! [`DaemonContext`] owns request dispatch so the same code answers a
//! query whether it arrives over the socket or from a one-shot command
//! reading the store directly.

use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use vigil_core::EventBus;
use vigil_risk::{AnomalyDetector, BaselineTracker};
use vigil_store::SledStore;
use vigil_watcher::{resolve_watch_roots, NoiseFilter, Watcher, WatcherConfig};

use crate::config::{self, MonitorConfig};
use crate::ipc::{socket_path, DaemonStatus, IpcRequest, IpcResponse, IpcServer};
use crate::locks::{read_daemon_lock, DaemonLock};
use crate::pipeline::{AlertPolicy, Pipeline, PipelineMetrics};
use crate::util;

/// Everything request dispatch needs to answer queries
pub struct DaemonContext {
    store: Arc<SledStore>,
    detector: Arc<AnomalyDetector>,
    tracker: Arc<BaselineTracker>,
    config: MonitorConfig,
    actor: String,
    roots: Vec<PathBuf>,
    metrics: Arc<PipelineMetrics>,
    started: Instant,
}

impl DaemonContext {
    /// Context for a one-shot command reading the store directly,
    /// with no watcher behind it
    pub fn offline(store: Arc<SledStore>, config: MonitorConfig, actor: impl Into<String>) -> Self {
        let tracker = Arc::new(BaselineTracker::new(
            store.clone(),
            Duration::from_secs(config.anomaly.baseline_ttl_secs),
            config.anomaly.min_sample_events,
        ));
        let detector = Arc::new(
            AnomalyDetector::new(store.clone(), Arc::clone(&tracker))
                .with_window_hours(config.anomaly.window_hours),
        );

        Self {
            store,
            detector,
            tracker,
            config,
            actor: actor.into(),
            roots: Vec::new(),
            metrics: Arc::new(PipelineMetrics::default()),
            started: Instant::now(),
        }
    }

    /// Answer one request
    ///
    /// Failures never cross this boundary as `Err`; they become
    /// [`IpcResponse::Error`] so the transport stays a plain
    /// request/reply line protocol.
    pub async fn handle(&self, request: IpcRequest) -> IpcResponse {
        match request {
            IpcRequest::Status => IpcResponse::Status {
                status: self.status(),
            },
            IpcRequest::Events { filter } => match self.store.query_events(&filter) {
                Ok(events) => IpcResponse::Events { events },
                Err(error) => error_reply(error),
            },
            IpcRequest::Event { id } => match self.store.event(id) {
                Ok(record) => IpcResponse::Event { record },
                Err(error) => error_reply(error),
            },
            IpcRequest::Alerts {
                unresolved_only,
                limit,
            } => match self.store.alerts(unresolved_only, limit) {
                Ok(alerts) => IpcResponse::Alerts { alerts },
                Err(error) => error_reply(error),
            },
            IpcRequest::ResolveAlert { id } => match self.store.resolve_alert(id) {
                Ok(known) => IpcResponse::Resolved { known },
                Err(error) => error_reply(error),
            },
            IpcRequest::Anomalies => IpcResponse::Anomalies {
                anomalies: self.detector.detect(&self.actor).await,
            },
            IpcRequest::Baseline => IpcResponse::Baseline {
                baseline: self.tracker.baseline_for(&self.actor).await,
            },
            IpcRequest::Stats => {
                let summary = match self.store.risk_summary() {
                    Ok(summary) => summary,
                    Err(error) => return error_reply(error),
                };
                let stats = match self
                    .store
                    .event_stats(self.config.display.high_risk_threshold)
                {
                    Ok(stats) => stats,
                    Err(error) => return error_reply(error),
                };
                IpcResponse::Stats { summary, stats }
            }
            IpcRequest::Timeline { hours } => {
                let since = Utc::now() - chrono::Duration::hours(hours.max(1));
                match self.store.hourly_timeline(since) {
                    Ok(buckets) => IpcResponse::Timeline { buckets },
                    Err(error) => error_reply(error),
                }
            }
        }
    }

    fn status(&self) -> DaemonStatus {
        DaemonStatus {
            pid: std::process::id(),
            uptime_secs: self.started.elapsed().as_secs(),
            actor: self.actor.clone(),
            roots: self.roots.clone(),
            events_processed: self.metrics.events_processed.load(Ordering::Relaxed),
            alerts_raised: self.metrics.alerts_raised.load(Ordering::Relaxed),
        }
    }
}

fn error_reply(error: anyhow::Error) -> IpcResponse {
    IpcResponse::Error {
        message: format!("{:#}", error),
    }
}

/// Run the daemon in the foreground until a shutdown signal arrives
pub async fn start() -> Result<()> {
    // 1. Locate the data directory and load configuration
    let data_dir = util::find_data_dir()?;
    let config = config::load(&data_dir)?;

    // 2. One daemon per data directory
    let lock = DaemonLock::acquire(&data_dir)?;

    // 3. Open the activity store
    let store = Arc::new(
        SledStore::open(&data_dir.join("db")).context("Failed to open activity store")?,
    );

    // 4. Attach the watch layer
    let actor = util::current_actor();
    let roots = resolve_watch_roots(&config.watch.paths);
    if roots.is_empty() {
        anyhow::bail!("No watchable roots found (configure watch.paths in config.toml)");
    }
    let filter = NoiseFilter::new(&config.watch.ignore)?;
    let watcher_config = WatcherConfig {
        quiet: Duration::from_millis(config.watch.quiet_ms),
        poll: Duration::from_millis(config.watch.poll_ms),
        ..WatcherConfig::default()
    };
    let (watcher, changes) = Watcher::spawn(roots, filter, watcher_config)?;

    // 5. Wire the pipeline to the bus and the store
    let bus = EventBus::default();
    let policy = AlertPolicy {
        threshold: config.alerts.threshold,
    };
    let pipeline = Arc::new(Pipeline::new(
        store.clone(),
        bus.clone(),
        policy,
        actor.clone(),
    ));
    let metrics = pipeline.metrics();
    let pipeline_task = tokio::spawn(Arc::clone(&pipeline).run(changes));

    // 6. Baseline tracking and the periodic anomaly pass
    let tracker = Arc::new(BaselineTracker::new(
        store.clone(),
        Duration::from_secs(config.anomaly.baseline_ttl_secs),
        config.anomaly.min_sample_events,
    ));
    let detector = Arc::new(
        AnomalyDetector::new(store.clone(), Arc::clone(&tracker))
            .with_window_hours(config.anomaly.window_hours),
    );
    let cadence_task = spawn_anomaly_cadence(
        Arc::clone(&detector),
        bus.clone(),
        config.anomaly.cadence_secs,
        actor.clone(),
    );

    // 7. Log what flows through the bus
    let logger_task = spawn_bus_logger(&bus);

    // 8. Serve queries over the unix socket
    let context = Arc::new(DaemonContext {
        store,
        detector,
        tracker,
        config,
        actor,
        roots: watcher.roots().to_vec(),
        metrics,
        started: Instant::now(),
    });
    let socket = socket_path(&data_dir);
    let server = IpcServer::bind(&socket)?;
    let server_task = tokio::spawn(server.serve(Arc::clone(&context)));

    info!(
        pid = std::process::id(),
        roots = context.roots.len(),
        "daemon running"
    );

    // 9. Wait for SIGINT or SIGTERM, then unwind
    wait_for_shutdown().await?;

    info!("shutting down");
    watcher.stop();
    pipeline_task.abort();
    cadence_task.abort();
    logger_task.abort();
    server_task.abort();
    let _ = std::fs::remove_file(&socket);
    lock.release()?;

    Ok(())
}

/// Whether a live daemon holds the lock for this data directory
pub fn is_running(data_dir: &Path) -> bool {
    read_daemon_lock(data_dir).is_some()
}

/// Signal the daemon and wait for it to exit
pub async fn stop() -> Result<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let data_dir = util::find_data_dir()?;

    let Some(lock) = read_daemon_lock(&data_dir) else {
        println!("Daemon is not running");
        return Ok(());
    };

    kill(Pid::from_raw(lock.pid as i32), Signal::SIGTERM).context("Failed to signal daemon")?;

    // Give the daemon five seconds to unwind
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        if read_daemon_lock(&data_dir).is_none() {
            println!("Daemon stopped");
            return Ok(());
        }
    }

    anyhow::bail!("Daemon (pid {}) did not stop within 5 seconds", lock.pid)
}

fn spawn_anomaly_cadence(
    detector: Arc<AnomalyDetector>,
    bus: EventBus,
    cadence_secs: u64,
    actor: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(cadence_secs.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // interval fires immediately; skip that first tick so a fresh
        // daemon doesn't run detection against an empty window
        ticker.tick().await;

        loop {
            ticker.tick().await;
            for anomaly in detector.detect(&actor).await {
                warn!(
                    kind = %anomaly.kind,
                    severity = anomaly.severity,
                    description = %anomaly.description,
                    "anomaly detected"
                );
                bus.publish_anomaly(anomaly);
            }
        }
    })
}

fn spawn_bus_logger(bus: &EventBus) -> JoinHandle<()> {
    let mut events = bus.subscribe_events();
    let mut alerts = bus.subscribe_alerts();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                received = events.recv() => match received {
                    Ok(message) => debug!(
                        id = message.id,
                        event_type = %message.event_type,
                        path = %message.file_path,
                        score = message.risk_score,
                        "event"
                    ),
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "bus logger lagged behind events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                received = alerts.recv() => match received {
                    Ok(message) => warn!(
                        alert_type = %message.alert_type,
                        severity = message.severity,
                        score = message.risk_score,
                        description = %message.description,
                        "alert raised"
                    ),
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "bus logger lagged behind alerts");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    })
}

async fn wait_for_shutdown() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt =
        signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;
    let mut terminate =
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;

    tokio::select! {
        _ = interrupt.recv() => info!("received SIGINT"),
        _ = terminate.recv() => info!("received SIGTERM"),
    }
    Ok(())
}
