//! Bounded worker pool with one-shot execution slots.
//!
//! Submitted invocations wait in a FIFO queue. A dispatcher task hands each
//! one to a freshly created slot as soon as fewer than `threads` slots are
//! live; the slot runs exactly one invocation and is then retired. Outcomes
//! travel back on a per-task channel, so results are always read in
//! submission order no matter which slot finished first.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use crate::error::{PatoError, Result};
use crate::execution::{ExecutionOutcome, ExecutionUnit};
use crate::template::Invocation;

mod slots;

pub use slots::PoolStats;
use slots::{SlotLease, SlotTable};

/// Largest slot count a pool can hold.
pub const MAX_THREADS: usize = Semaphore::MAX_PERMITS;

const LOST_SLOT: &str = "execution slot terminated before reporting an outcome";

struct Job {
    index: usize,
    invocation: Invocation,
    reply: oneshot::Sender<ExecutionOutcome>,
}

/// An invocation handed to the pool, waiting for its outcome.
#[derive(Debug)]
pub struct ScheduledTask {
    index: usize,
    invocation: Invocation,
    outcome: oneshot::Receiver<ExecutionOutcome>,
}

impl ScheduledTask {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn invocation(&self) -> &Invocation {
        &self.invocation
    }

    /// Take the outcome. Meant to be called once the pool has drained.
    pub fn resolve(mut self) -> ResolvedTask {
        let outcome = match self.outcome.try_recv() {
            Ok(outcome) => outcome,
            Err(oneshot::error::TryRecvError::Empty) => {
                ExecutionOutcome::Failed("task has not finished yet".to_string())
            }
            Err(oneshot::error::TryRecvError::Closed) => ExecutionOutcome::Failed(LOST_SLOT.to_string()),
        };
        ResolvedTask {
            index: self.index,
            invocation: self.invocation,
            outcome,
        }
    }
}

/// A task paired with its final outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTask {
    pub index: usize,
    pub invocation: Invocation,
    pub outcome: ExecutionOutcome,
}

pub struct WorkerPool {
    queue: mpsc::UnboundedSender<Job>,
    dispatcher: JoinHandle<PoolStats>,
    submitted: usize,
}

impl WorkerPool {
    /// Start a pool with `threads` slots. Must be called inside a tokio runtime.
    ///
    /// `threads` is capped at [`MAX_THREADS`].
    pub fn start(threads: NonZeroUsize, timeout: Option<Duration>, unit: ExecutionUnit) -> Self {
        let threads = clamp_threads(threads);
        let (queue, jobs) = mpsc::unbounded_channel();
        let dispatcher = tokio::spawn(dispatch(jobs, threads, timeout, Arc::new(unit)));
        info!(threads = threads.get(), ?timeout, "worker pool started");
        Self {
            queue,
            dispatcher,
            submitted: 0,
        }
    }

    pub fn submit(&mut self, invocation: Invocation) -> Result<ScheduledTask> {
        let (reply, outcome) = oneshot::channel();
        let index = self.submitted;
        self.queue
            .send(Job {
                index,
                invocation: invocation.clone(),
                reply,
            })
            .map_err(|_| PatoError::PoolClosed)?;
        self.submitted += 1;
        debug!(index, %invocation, "queued");
        Ok(ScheduledTask {
            index,
            invocation,
            outcome,
        })
    }

    /// Submit every invocation; tasks come back in the same order.
    pub fn schedule<I>(&mut self, invocations: I) -> Result<Vec<ScheduledTask>>
    where
        I: IntoIterator<Item = Invocation>,
    {
        invocations.into_iter().map(|inv| self.submit(inv)).collect()
    }

    /// Stop accepting work and wait until every submitted task has an outcome.
    pub async fn drain_and_join(self) -> PoolStats {
        let Self {
            queue, dispatcher, ..
        } = self;
        drop(queue);
        match dispatcher.await {
            Ok(stats) => {
                info!(slots = stats.slots_created, peak = stats.peak_active, "worker pool drained");
                stats
            }
            Err(e) => {
                warn!(error = %e, "dispatcher stopped abnormally");
                PoolStats::default()
            }
        }
    }
}

fn clamp_threads(threads: NonZeroUsize) -> NonZeroUsize {
    if threads.get() > MAX_THREADS {
        warn!(requested = threads.get(), max = MAX_THREADS, "thread count capped");
        NonZeroUsize::new(MAX_THREADS).unwrap_or(NonZeroUsize::MIN)
    } else {
        threads
    }
}

async fn dispatch(
    mut jobs: mpsc::UnboundedReceiver<Job>,
    threads: NonZeroUsize,
    timeout: Option<Duration>,
    unit: Arc<ExecutionUnit>,
) -> PoolStats {
    let capacity = Arc::new(Semaphore::new(threads.get()));
    let table = Arc::new(SlotTable::default());
    let mut running = JoinSet::new();

    while let Some(job) = jobs.recv().await {
        let Ok(permit) = capacity.clone().acquire_owned().await else {
            break;
        };
        let lease = SlotLease::open(&table, job.index, permit);
        let unit = Arc::clone(&unit);

        running.spawn(async move {
            let outcome = unit.run(&job.invocation, timeout).await;
            // Retire before replying so the slot count is settled when the outcome is seen.
            drop(lease);
            let _ = job.reply.send(outcome);
        });

        while let Some(res) = running.try_join_next() {
            reap(res);
        }
    }

    while let Some(res) = running.join_next().await {
        reap(res);
    }
    table.stats()
}

fn reap(res: std::result::Result<(), tokio::task::JoinError>) {
    if let Err(e) = res {
        warn!(error = %e, "{}", LOST_SLOT);
    }
}
