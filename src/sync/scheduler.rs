//! Periodic chain scheduler
//!
//! `start` bootstraps the engine, launches one chain right away and then one
//! more on every tick of a fixed interval. Ticks that land while a chain is
//! still running are absorbed by the engine's single-flight guard.

use crate::sync::engine::{BookmarkConsumer, ChainEnd, SyncEngine};
use crate::SyncError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Default time between two scheduled chains
pub const FETCH_INTERVAL: Duration = Duration::from_secs(60);

/// Drives an engine on a fixed interval until stopped
pub struct SyncScheduler {
    engine: Arc<SyncEngine>,
    consumer: Arc<dyn BookmarkConsumer>,
    interval: Duration,
    stop_tx: Option<oneshot::Sender<()>>,
    loop_handle: Option<JoinHandle<()>>,
}

impl SyncScheduler {
    pub fn new(engine: Arc<SyncEngine>, consumer: Arc<dyn BookmarkConsumer>) -> Self {
        Self {
            engine,
            consumer,
            interval: FETCH_INTERVAL,
            stop_tx: None,
            loop_handle: None,
        }
    }

    /// Overrides the tick interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Returns true between a successful `start` and `stop`
    pub fn is_started(&self) -> bool {
        self.loop_handle.is_some()
    }

    /// Bootstraps the engine and starts the periodic loop
    ///
    /// A bootstrap failure is logged and returned; no chain is launched and
    /// no timer is started in that case.
    pub async fn start(&mut self, resume: bool) -> Result<(), SyncError> {
        if self.is_started() {
            tracing::warn!("Scheduler already started");
            return Ok(());
        }

        if let Err(e) = self.engine.bootstrap().await {
            tracing::error!("Bootstrap failed, scheduler not started: {}", e);
            return Err(e);
        }

        spawn_chain(self.engine.clone(), self.consumer.clone(), resume);

        let (stop_tx, mut stop_rx) = oneshot::channel();
        let engine = self.engine.clone();
        let consumer = self.consumer.clone();
        let interval = self.interval;

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        tracing::debug!("Scheduler tick");
                        spawn_chain(engine.clone(), consumer.clone(), resume);
                    }
                    _ = &mut stop_rx => {
                        tracing::info!("Scheduler stopped");
                        break;
                    }
                }
            }
        });

        self.stop_tx = Some(stop_tx);
        self.loop_handle = Some(handle);
        tracing::info!("Scheduler started, fetching every {:?}", self.interval);
        Ok(())
    }

    /// Cancels the timer and waits for the loop to exit
    ///
    /// A chain already in flight runs to its own end.
    pub async fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(handle) = self.loop_handle.take() {
            if let Err(e) = handle.await {
                tracing::error!("Scheduler loop panicked: {}", e);
            }
        }
    }
}

/// Launches one chain on its own task
fn spawn_chain(engine: Arc<SyncEngine>, consumer: Arc<dyn BookmarkConsumer>, resume: bool) {
    tokio::spawn(async move {
        let Some(report) = engine.run_chain(resume, consumer.as_ref()).await else {
            return;
        };
        match report.end {
            ChainEnd::Failed(ref e) if e.is_upstream_unavailable() => {
                tracing::warn!(
                    "Chain ended with upstream unavailable; next tick retries (re-bootstrap if this persists)"
                );
            }
            ChainEnd::RetriesExhausted { ref errors } => {
                tracing::warn!(
                    "Chain gave up after {} API errors; identifiers may be stale",
                    errors.len()
                );
            }
            _ => {}
        }
    });
}
