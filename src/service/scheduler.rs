use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use chrono::Utc;
use futures::FutureExt;
use tokio::task::JoinHandle;

use super::events::{CollectionEvent, CollectionObserver};
use super::jobs::CollectionJob;
use super::stats::CollectionStats;
use crate::collectors::CycleResults;
use crate::constants::defaults;
use crate::helpers::{StopSignal, StopTrigger};

struct Worker {
    trigger: StopTrigger,
    handle: JoinHandle<()>,
}

struct Shared<J> {
    job: J,
    stats: Mutex<CollectionStats>,
    subscribers: Mutex<Vec<flume::Sender<CollectionEvent>>>,
    observer: RwLock<Option<Arc<dyn CollectionObserver>>>,
}

/// Runs a [`CollectionJob`] on a fixed interval in a background task
///
/// `start` and `stop` must be called from within a Tokio runtime. Cycles
/// triggered with `collect_now` run on the caller's task and are not
/// serialised against the background loop.
pub struct CollectionService<J> {
    shared: Arc<Shared<J>>,
    worker: Mutex<Option<Worker>>,
    stop_timeout: Duration,
}

impl<J: CollectionJob> CollectionService<J> {
    pub fn new(job: J) -> Self {
        Self {
            shared: Arc::new(Shared {
                job,
                stats: Mutex::new(CollectionStats::default()),
                subscribers: Mutex::new(Vec::new()),
                observer: RwLock::new(None),
            }),
            worker: Mutex::new(None),
            stop_timeout: defaults::SERVICE_STOP_TIMEOUT,
        }
    }

    /// How long `stop` waits for the background task before giving up on it
    pub fn with_stop_timeout(mut self, stop_timeout: Duration) -> Self {
        self.stop_timeout = stop_timeout;
        self
    }

    pub fn job(&self) -> &J {
        &self.shared.job
    }

    /// Spawn the collection loop; returns `false` if one is still running
    pub fn start(&self, interval: Duration) -> bool {
        let mut worker = lock(&self.worker);
        if worker.as_ref().is_some_and(|w| !w.handle.is_finished()) {
            log::warn!("{} service is already running", self.shared.job.name());
            return false;
        }

        let (trigger, stop) = StopSignal::channel();
        let handle = tokio::spawn(run_loop(self.shared.clone(), interval, stop));
        *worker = Some(Worker { trigger, handle });
        log::info!(
            "{} service started, interval {}s",
            self.shared.job.name(),
            interval.as_secs_f32()
        );
        true
    }

    /// Signal the loop and wait for it to exit
    ///
    /// A loop still busy after the stop timeout is left to finish on its own
    /// and keeps counting as running, so a following `start` cannot overlap it.
    pub async fn stop(&self) {
        let Some(mut worker) = lock(&self.worker).take() else {
            return;
        };
        worker.trigger.stop();

        match tokio::time::timeout(self.stop_timeout, &mut worker.handle).await {
            Ok(Ok(())) => log::info!("{} service stopped", self.shared.job.name()),
            Ok(Err(e)) => log::error!("{} service task failed: {}", self.shared.job.name(), e),
            Err(_) => {
                log::warn!(
                    "{} service did not stop within {}s, leaving it to finish",
                    self.shared.job.name(),
                    self.stop_timeout.as_secs_f32()
                );
                *lock(&self.worker) = Some(worker);
            }
        }
    }

    pub fn is_running(&self) -> bool {
        lock(&self.worker)
            .as_ref()
            .is_some_and(|w| !w.handle.is_finished())
    }

    /// Run one cycle now, on the calling task
    pub async fn collect_now(&self) -> Result<CycleResults> {
        self.shared.run_once(&StopSignal::never()).await
    }

    pub fn stats(&self) -> CollectionStats {
        lock(&self.shared.stats).clone()
    }

    pub fn reset_stats(&self) {
        *lock(&self.shared.stats) = CollectionStats::default();
    }

    pub fn subscribe(&self) -> flume::Receiver<CollectionEvent> {
        let (tx, rx) = flume::unbounded();
        lock(&self.shared.subscribers).push(tx);
        rx
    }

    pub fn set_observer(&self, observer: Option<Arc<dyn CollectionObserver>>) {
        *self.shared.observer.write().unwrap_or_else(|e| e.into_inner()) = observer;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

async fn run_loop<J: CollectionJob>(shared: Arc<Shared<J>>, interval: Duration, mut stop: StopSignal) {
    while !stop.is_stopped() {
        // Cycle-level errors are already recorded in the stats
        let _ = shared.run_once(&stop).await;

        tokio::select! {
            _ = stop.stopped() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
    log::debug!("{} loop exited", shared.job.name());
}

impl<J: CollectionJob> Shared<J> {
    async fn run_once(&self, stop: &StopSignal) -> Result<CycleResults> {
        let name = self.job.name();
        let started = Instant::now();
        {
            let mut stats = lock(&self.stats);
            stats.total += 1;
            stats.last_collection_time = Some(Utc::now());
        }

        let outcome = AssertUnwindSafe(self.job.run_cycle(stop))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(anyhow!("cycle panicked: {}", panic_message(&*panic))));
        let elapsed = started.elapsed();

        match outcome {
            Ok(results) => {
                {
                    let mut stats = lock(&self.stats);
                    if results.succeeded() > 0 {
                        stats.success += 1;
                        stats.last_success_time = Some(Utc::now());
                    } else {
                        stats.fail += 1;
                    }
                }
                log::info!(
                    "{} cycle finished in {:.2}s: {}/{} devices succeeded",
                    name,
                    elapsed.as_secs_f32(),
                    results.succeeded(),
                    results.attempted()
                );
                self.notify_complete(&results, elapsed);
                Ok(results)
            }
            Err(e) => {
                let message = format!("{e:#}");
                {
                    let mut stats = lock(&self.stats);
                    stats.fail += 1;
                    stats.last_error = Some(message.clone());
                }
                log::error!("{} cycle failed: {}", name, message);
                self.notify_error(&message);
                Err(e)
            }
        }
    }

    fn notify_complete(&self, results: &CycleResults, elapsed: Duration) {
        self.publish(CollectionEvent::Completed {
            job: self.job.name(),
            results: results.clone(),
            elapsed_ms: elapsed.as_millis() as u64,
        });
        self.with_observer(|observer| observer.on_complete(results, elapsed));
    }

    fn notify_error(&self, message: &str) {
        self.publish(CollectionEvent::Failed {
            job: self.job.name(),
            message: message.to_string(),
        });
        self.with_observer(|observer| observer.on_error(message));
    }

    /// Subscribers whose receiver is gone are dropped
    fn publish(&self, event: CollectionEvent) {
        lock(&self.subscribers).retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn with_observer(&self, f: impl FnOnce(&dyn CollectionObserver)) {
        let observer = self
            .observer
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        if let Some(observer) = observer {
            if let Err(panic) = std::panic::catch_unwind(AssertUnwindSafe(|| f(observer.as_ref()))) {
                log::error!(
                    "{} observer panicked: {}",
                    self.job.name(),
                    panic_message(&*panic)
                );
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
