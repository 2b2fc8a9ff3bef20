// ── Monitor ──
//
// Lifecycle for one monitored vault room: owns the data sources and the
// command sink, runs the refresh ticker and the command processor, and
// publishes every cycle's result through the DashboardStore.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::Utc;
use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::{Backend, CommandTransport};
use crate::command::{Command, CommandEnvelope};
use crate::config::{MonitorConfig, RefreshConfig};
use crate::error::{CoreError, Stream};
use crate::model::{EnvBatch, LogBatch};
use crate::source::{CommandSink, EnvSource, LogSource};
use crate::store::{DashboardStore, DashboardView, Snapshot};

const COMMAND_CHANNEL_SIZE: usize = 16;

/// Monitor wired to the configured backend and command transport.
pub type ConfiguredMonitor = Monitor<Backend, Backend, CommandTransport>;

// ── Monitor ──────────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc`. Created idle: [`refresh_now()`](Self::refresh_now)
/// works immediately, while [`start()`](Self::start) spawns the background
/// ticker and the command processor.
pub struct Monitor<L, E, S> {
    inner: Arc<MonitorInner<L, E, S>>,
}

impl<L, E, S> Clone for Monitor<L, E, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct MonitorInner<L, E, S> {
    refresh: RefreshConfig,
    logs: L,
    env: E,
    sink: S,
    store: Arc<DashboardStore>,
    /// Cycle counter; each fetch-and-recompute takes the next number.
    cycle: AtomicU64,
    /// Present only while running.
    command_tx: Mutex<Option<mpsc::Sender<CommandEnvelope>>>,
    /// Child token for the current run, replaced on restart.
    cancel: Mutex<CancellationToken>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
    /// Set once the sink has been released; `start()` is refused after.
    released: AtomicBool,
}

impl ConfiguredMonitor {
    /// Build clients from configuration. Performs no network I/O beyond
    /// spawning the MQTT event loop, so it must run inside a Tokio runtime.
    pub fn from_config(config: &MonitorConfig) -> Result<Self, CoreError> {
        let backend = Backend::from_config(config)?;
        let transport = CommandTransport::from_config(config)?;
        Ok(Self::new(
            config.refresh.clone(),
            backend.clone(),
            backend,
            transport,
        ))
    }
}

impl<L, E, S> Monitor<L, E, S>
where
    L: LogSource,
    E: EnvSource,
    S: CommandSink,
{
    pub fn new(refresh: RefreshConfig, logs: L, env: E, sink: S) -> Self {
        Self {
            inner: Arc::new(MonitorInner {
                refresh,
                logs,
                env,
                sink,
                store: Arc::new(DashboardStore::new()),
                cycle: AtomicU64::new(0),
                command_tx: Mutex::new(None),
                cancel: Mutex::new(CancellationToken::new()),
                task_handles: Mutex::new(Vec::new()),
                released: AtomicBool::new(false),
            }),
        }
    }

    /// The log and environment sources.
    pub fn sources(&self) -> (&L, &E) {
        (&self.inner.logs, &self.inner.env)
    }

    pub fn sink(&self) -> &S {
        &self.inner.sink
    }

    /// Access the underlying store.
    pub fn store(&self) -> &Arc<DashboardStore> {
        &self.inner.store
    }

    /// Current view.
    pub fn view(&self) -> Arc<DashboardView> {
        self.inner.store.view()
    }

    /// Subscribe to view changes.
    pub fn subscribe(&self) -> watch::Receiver<Arc<DashboardView>> {
        self.inner.store.subscribe()
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    pub async fn is_running(&self) -> bool {
        self.inner.command_tx.lock().await.is_some()
    }

    /// Spawn the command processor and, for a non-zero interval, the
    /// refresh ticker. The ticker's first tick fires immediately.
    pub async fn start(&self) {
        let mut command_tx = self.inner.command_tx.lock().await;
        if command_tx.is_some() {
            debug!("monitor already running");
            return;
        }
        if self.inner.released.load(Ordering::Acquire) {
            warn!("monitor was shut down, not starting");
            return;
        }

        let cancel = CancellationToken::new();
        *self.inner.cancel.lock().await = cancel.clone();

        let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        *command_tx = Some(tx);

        let mut handles = self.inner.task_handles.lock().await;
        handles.push(tokio::spawn(command_processor_task(
            self.clone(),
            rx,
            cancel.clone(),
        )));

        let interval = self.inner.refresh.interval;
        if interval.is_zero() {
            info!("monitor started (manual refresh)");
        } else {
            handles.push(tokio::spawn(refresh_task(self.clone(), cancel)));
            info!(?interval, "monitor started");
        }
    }

    /// Cancel background tasks and wait for them.
    ///
    /// The sink stays connected and the last published view stays
    /// readable, so `start()` may be called again.
    pub async fn stop(&self) {
        let was_running = self.inner.command_tx.lock().await.take().is_some();
        self.inner.cancel.lock().await.cancel();

        let handles: Vec<_> = self.inner.task_handles.lock().await.drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }

        if was_running {
            info!("monitor stopped");
        }
    }

    /// Stop, then release the sink for good. Later `start()` calls are
    /// ignored and `dispatch()` fails with [`CoreError::MonitorStopped`].
    pub async fn shutdown(&self) {
        self.stop().await;
        if !self.inner.released.swap(true, Ordering::AcqRel) {
            self.inner.sink.shutdown().await;
            debug!("command sink released");
        }
    }

    // ── Refresh ──────────────────────────────────────────────────────

    /// Run one fetch-and-recompute cycle now and publish its result.
    ///
    /// Returns the cycle's snapshot, or the error that halted it. Either
    /// way the store reflects the outcome (a stale result is not applied).
    pub async fn refresh_now(&self) -> Result<Arc<Snapshot>, CoreError> {
        let cycle = self.inner.cycle.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(cycle, "refresh cycle started");

        let result = collect_cycle(
            &self.inner.logs,
            &self.inner.env,
            &self.inner.refresh,
            cycle,
        )
        .await;

        match result {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                if self.inner.store.apply_snapshot(Arc::clone(&snapshot)) {
                    debug!(
                        cycle,
                        entries = snapshot.logs.len(),
                        env = snapshot.env.is_available(),
                        "snapshot published"
                    );
                }
                Ok(snapshot)
            }
            Err(e) => {
                self.inner.store.record_failure(cycle, &e, Utc::now());
                Err(e)
            }
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Send a command to the device.
    ///
    /// Routed through the command processor task, so it never waits on a
    /// refresh cycle. Fails with [`CoreError::MonitorStopped`] when the
    /// monitor is not running.
    pub async fn dispatch(&self, command: Command) -> Result<(), CoreError> {
        let command_tx = self
            .inner
            .command_tx
            .lock()
            .await
            .clone()
            .ok_or(CoreError::MonitorStopped)?;

        let (response_tx, response_rx) = oneshot::channel();
        command_tx
            .send(CommandEnvelope {
                command,
                response_tx,
            })
            .await
            .map_err(|_| CoreError::MonitorStopped)?;

        response_rx.await.map_err(|_| CoreError::MonitorStopped)?
    }
}

// ── One-shot ─────────────────────────────────────────────────────────

/// Fetch both streams once and build a snapshot, without a monitor.
///
/// Used by callers that only need a single view and no command transport.
pub async fn fetch_snapshot<L, E>(
    logs: &L,
    env: &E,
    refresh: &RefreshConfig,
) -> Result<Snapshot, CoreError>
where
    L: LogSource,
    E: EnvSource,
{
    collect_cycle(logs, env, refresh, 1).await
}

/// Fetch both streams concurrently and project the result.
async fn collect_cycle<L, E>(
    logs: &L,
    env: &E,
    refresh: &RefreshConfig,
    cycle: u64,
) -> Result<Snapshot, CoreError>
where
    L: LogSource,
    E: EnvSource,
{
    let (log_result, env_result): (Result<LogBatch, _>, Result<EnvBatch, _>) = tokio::join!(
        fetch_with_retry(refresh, Stream::AccessLogs, move || logs.fetch_logs()),
        fetch_with_retry(refresh, Stream::Environment, move || env.fetch_env()),
    );

    if let Err(e) = &env_result {
        warn!(cycle, error = %e, "environment panel unavailable this cycle");
    }

    let batch = log_result.inspect_err(|e| warn!(cycle, error = %e, "refresh cycle failed"))?;
    Snapshot::build(cycle, Utc::now(), batch, env_result)
        .inspect_err(|e| warn!(cycle, error = %e, "refresh cycle produced no view"))
}

/// Retry transient failures up to `fetch_retries` extra times.
async fn fetch_with_retry<T, F, Fut>(
    refresh: &RefreshConfig,
    stream: Stream,
    mut fetch: F,
) -> Result<T, CoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CoreError>>,
{
    let mut attempt = 0;
    loop {
        match fetch().await {
            Err(e) if e.is_transient() && attempt < refresh.fetch_retries => {
                attempt += 1;
                debug!(%stream, attempt, error = %e, "transient fetch error, retrying");
                tokio::time::sleep(refresh.retry_delay).await;
            }
            result => return result,
        }
    }
}

// ── Background tasks ─────────────────────────────────────────────────

/// Periodically run a refresh cycle. Missed ticks are skipped, so cycles
/// started by the ticker never overlap.
async fn refresh_task<L, E, S>(monitor: Monitor<L, E, S>, cancel: CancellationToken)
where
    L: LogSource,
    E: EnvSource,
    S: CommandSink,
{
    let mut interval = tokio::time::interval(monitor.inner.refresh.interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                // Errors are already logged and recorded in the store.
                let _ = monitor.refresh_now().await;
            }
        }
    }
    debug!("refresh task stopped");
}

/// Process commands from the mpsc channel, forwarding each to the sink.
async fn command_processor_task<L, E, S>(
    monitor: Monitor<L, E, S>,
    mut rx: mpsc::Receiver<CommandEnvelope>,
    cancel: CancellationToken,
) where
    L: LogSource,
    E: EnvSource,
    S: CommandSink,
{
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            envelope = rx.recv() => {
                let Some(envelope) = envelope else { break };
                let command = envelope.command;
                let result = monitor.inner.sink.dispatch(command).await;
                match &result {
                    Ok(()) => info!(%command, "command dispatched"),
                    Err(e) => warn!(%command, error = %e, "command dispatch failed"),
                }
                let _ = envelope.response_tx.send(result);
            }
        }
    }
    debug!("command processor stopped");
}
