//! Worker pool supervision.
//!
//! # Responsibilities
//! - Launch one worker per slot at startup
//! - Replace every exited worker with exactly one new worker in the same slot
//! - Terminate all workers on shutdown
//!
//! # Design Decisions
//! - No backoff and no restart limit; clean and crashed exits are treated alike
//! - A slot whose replacement fails to launch stays empty
//! - Each worker is watched by its own task; dropping the task drops the
//!   process handle, which terminates the worker

use std::collections::HashMap;
use std::fmt;
use std::io;

use futures_util::future::BoxFuture;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::{Id, JoinSet};

use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("failed to launch worker {slot}: {source}")]
    Launch {
        slot: usize,
        #[source]
        source: io::Error,
    },
    #[error("no workers left running")]
    AllWorkersLost,
}

/// How a worker ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerExit {
    /// Exit code, `None` when killed by a signal.
    Status(Option<i32>),
    WaitFailed(String),
}

impl fmt::Display for WorkerExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerExit::Status(Some(code)) => write!(f, "exit code {code}"),
            WorkerExit::Status(None) => f.write_str("terminated by signal"),
            WorkerExit::WaitFailed(reason) => write!(f, "wait failed: {reason}"),
        }
    }
}

/// A running worker. Dropping it must terminate the worker.
pub trait WorkerProcess: Send + 'static {
    fn id(&self) -> Option<u32>;

    fn wait(&mut self) -> BoxFuture<'_, WorkerExit>;
}

/// Starts workers for the supervisor.
pub trait WorkerLauncher: Send + Sync {
    type Process: WorkerProcess;

    fn launch(&self, slot: usize) -> io::Result<Self::Process>;
}

/// Counts returned when the supervisor stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SupervisorReport {
    pub launched: usize,
    pub restarted: usize,
}

pub struct Supervisor<L> {
    launcher: L,
    workers: usize,
}

struct Watched {
    slot: usize,
    pid: Option<u32>,
    exit: WorkerExit,
}

impl<L: WorkerLauncher> Supervisor<L> {
    pub fn new(launcher: L, workers: usize) -> Self {
        Self {
            launcher,
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run until `shutdown` fires or every slot is empty.
    pub async fn run(
        self,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<SupervisorReport, SupervisorError> {
        let mut tasks = JoinSet::new();
        let mut slots: HashMap<Id, usize> = HashMap::new();
        let mut report = SupervisorReport::default();

        for slot in 0..self.workers {
            match self.launcher.launch(slot) {
                Ok(process) => {
                    watch(&mut tasks, &mut slots, slot, process);
                    report.launched += 1;
                }
                Err(source) => {
                    metrics::record_launch_failure();
                    tasks.shutdown().await;
                    return Err(SupervisorError::Launch { slot, source });
                }
            }
        }
        metrics::record_workers_running(tasks.len());
        tracing::info!(workers = report.launched, "Worker pool started");

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!(workers = tasks.len(), "Stopping workers");
                    tasks.shutdown().await;
                    metrics::record_workers_running(0);
                    return Ok(report);
                }
                joined = tasks.join_next_with_id() => {
                    let slot = match joined {
                        None => {
                            metrics::record_workers_running(0);
                            return Err(SupervisorError::AllWorkersLost);
                        }
                        Some(Ok((id, watched))) => {
                            slots.remove(&id);
                            tracing::warn!(
                                slot = watched.slot,
                                pid = ?watched.pid,
                                exit = %watched.exit,
                                "Worker {} died",
                                watched.pid.map(|p| p.to_string()).unwrap_or_else(|| "?".into())
                            );
                            watched.slot
                        }
                        Some(Err(e)) => match slots.remove(&e.id()) {
                            Some(slot) => {
                                tracing::error!(slot, error = %e, "Worker watcher failed");
                                slot
                            }
                            None => continue,
                        },
                    };

                    match self.launcher.launch(slot) {
                        Ok(process) => {
                            watch(&mut tasks, &mut slots, slot, process);
                            report.restarted += 1;
                            metrics::record_worker_restart();
                        }
                        Err(e) => {
                            metrics::record_launch_failure();
                            tracing::error!(slot, error = %e, "Failed to launch replacement worker");
                        }
                    }
                    metrics::record_workers_running(tasks.len());
                }
            }
        }
    }
}

fn watch<P: WorkerProcess>(
    tasks: &mut JoinSet<Watched>,
    slots: &mut HashMap<Id, usize>,
    slot: usize,
    mut process: P,
) {
    let pid = process.id();
    tracing::debug!(slot, pid = ?pid, "Worker launched");
    let handle = tasks.spawn(async move {
        let exit = process.wait().await;
        Watched { slot, pid, exit }
    });
    slots.insert(handle.id(), slot);
}
