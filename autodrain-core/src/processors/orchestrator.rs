//! Orchestrator processor.
//!
//! The Orchestrator is responsible for:
//! - Owning the global running flag and the per-run cancellation token
//! - Spawning one [`DrainWorker`] per credential on `start`
//! - Cancelling the run on `stop` without waiting for the workers
//! - Supervising each run, finishing it when every worker has exited
//!
//! Transitions are serialised by a short lifecycle lock; reading the running
//! flag is lock-free.

use kanau::processor::Processor;
use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use thiserror::Error;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::drain_worker::{DrainWorker, WorkerExit};
use crate::config::{DrainPlan, WorkerPolicy};
use crate::events::{Event, EventSink};
use crate::keys::KeyDeriver;
use crate::ledger::Ledger;

/// Commands accepted by the orchestrator.
#[derive(Debug)]
pub enum ControlCommand {
    Start(DrainPlan),
    Stop,
}

#[derive(Debug)]
pub enum ControlOutcome {
    Started { workers: usize },
    AlreadyRunning,
    Stopping(StoppedRun),
    AlreadyStopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started { workers: usize },
    AlreadyRunning,
}

/// How the workers of one run ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    pub spawned: usize,
    pub stopped: usize,
    pub init_failed: usize,
    pub panicked: usize,
}

#[derive(Debug, Error)]
pub enum RunJoinError {
    #[error("workers still running after {0:?}")]
    Timeout(Duration),

    #[error("run supervisor failed: {0}")]
    Supervisor(#[from] JoinError),
}

/// A run that was told to stop. Joining it is optional.
#[derive(Debug)]
pub struct StoppedRun {
    workers: usize,
    supervisor: JoinHandle<RunReport>,
}

impl StoppedRun {
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Wait up to `deadline` for every worker of the run to exit.
    pub async fn join(self, deadline: Duration) -> Result<RunReport, RunJoinError> {
        match tokio::time::timeout(deadline, self.supervisor).await {
            Ok(joined) => Ok(joined?),
            Err(_) => Err(RunJoinError::Timeout(deadline)),
        }
    }
}

struct ActiveRun {
    generation: u64,
    token: CancellationToken,
    workers: usize,
    supervisor: JoinHandle<RunReport>,
}

#[derive(Default)]
struct Lifecycle {
    generation: u64,
    active: Option<ActiveRun>,
}

struct Inner {
    running: AtomicBool,
    lifecycle: Mutex<Lifecycle>,
    sink: EventSink,
    ledger: Arc<dyn Ledger>,
    deriver: Arc<dyn KeyDeriver>,
    policy: Arc<WorkerPolicy>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Called by a supervisor whose workers all exited without a stop.
    fn finish_run(&self, generation: u64) {
        let mut lifecycle = self.lock();
        let current = lifecycle
            .active
            .as_ref()
            .is_some_and(|run| run.generation == generation);
        if !current {
            return;
        }
        lifecycle.active = None;
        self.running.store(false, Ordering::SeqCst);
        self.sink.publish(Event::info("All workers exited"));
        self.sink.publish(Event::status(false));
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let lifecycle = self
            .lifecycle
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(run) = lifecycle.active.take() {
            run.token.cancel();
        }
    }
}

/// Cheaply cloneable handle; all clones control the same workers.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        deriver: Arc<dyn KeyDeriver>,
        policy: WorkerPolicy,
        sink: EventSink,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                running: AtomicBool::new(false),
                lifecycle: Mutex::new(Lifecycle::default()),
                sink,
                ledger,
                deriver,
                policy: Arc::new(policy),
            }),
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    pub fn sink(&self) -> &EventSink {
        &self.inner.sink
    }

    /// Spawn one worker per credential. A no-op while already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, plan: DrainPlan) -> StartOutcome {
        let mut lifecycle = self.inner.lock();
        if self.is_running() {
            debug!("Start ignored, already running");
            return StartOutcome::AlreadyRunning;
        }

        lifecycle.generation += 1;
        let generation = lifecycle.generation;
        let token = CancellationToken::new();
        let workers = plan.worker_count();

        self.inner.running.store(true, Ordering::SeqCst);
        self.inner
            .sink
            .publish(Event::info(format!("Starting {workers} worker(s)")));
        self.inner.sink.publish(Event::status(true));

        let mut set = JoinSet::new();
        for config in plan.into_worker_configs() {
            let worker = DrainWorker::new(
                config,
                self.inner.policy.clone(),
                self.inner.ledger.clone(),
                self.inner.deriver.clone(),
                self.inner.sink.clone(),
                token.clone(),
            );
            set.spawn(worker.run());
        }
        let supervisor = tokio::spawn(supervise(
            Arc::downgrade(&self.inner),
            generation,
            token.clone(),
            set,
            workers,
        ));

        lifecycle.active = Some(ActiveRun {
            generation,
            token,
            workers,
            supervisor,
        });
        info!(generation, workers, "Run started");
        StartOutcome::Started { workers }
    }

    /// Signal every worker of the current run to stop. Returns `None` if
    /// nothing was running. Does not wait for the workers.
    pub fn stop(&self) -> Option<StoppedRun> {
        let mut lifecycle = self.inner.lock();
        if !self.inner.running.swap(false, Ordering::SeqCst) {
            debug!("Stop ignored, not running");
            return None;
        }
        let active = lifecycle.active.take();
        if let Some(run) = &active {
            run.token.cancel();
            info!(generation = run.generation, "Run stopping");
        }
        self.inner.sink.publish(Event::info("Stopping workers"));
        self.inner.sink.publish(Event::status(false));
        active.map(|run| StoppedRun {
            workers: run.workers,
            supervisor: run.supervisor,
        })
    }
}

async fn supervise(
    inner: Weak<Inner>,
    generation: u64,
    token: CancellationToken,
    mut set: JoinSet<WorkerExit>,
    spawned: usize,
) -> RunReport {
    let mut report = RunReport {
        spawned,
        ..RunReport::default()
    };
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(WorkerExit::Stopped) => report.stopped += 1,
            Ok(WorkerExit::InitFailed) => report.init_failed += 1,
            Err(e) if e.is_panic() => {
                error!(generation, error = %e, "Drain worker panicked");
                report.panicked += 1;
            }
            Err(_) => report.stopped += 1,
        }
    }

    if !token.is_cancelled() {
        if let Some(inner) = inner.upgrade() {
            inner.finish_run(generation);
        }
    }
    debug!(generation, ?report, "Run finished");
    report
}

impl Processor<ControlCommand> for Orchestrator {
    type Output = ControlOutcome;
    type Error = Infallible;

    async fn process(&self, command: ControlCommand) -> Result<ControlOutcome, Infallible> {
        Ok(match command {
            ControlCommand::Start(plan) => match self.start(plan) {
                StartOutcome::Started { workers } => ControlOutcome::Started { workers },
                StartOutcome::AlreadyRunning => ControlOutcome::AlreadyRunning,
            },
            ControlCommand::Stop => match self.stop() {
                Some(run) => ControlOutcome::Stopping(run),
                None => ControlOutcome::AlreadyStopped,
            },
        })
    }
}
