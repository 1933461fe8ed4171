//! Run a command template over a list of arguments under a bounded worker
//! pool, with a per-invocation timeout, and record every outcome.

pub mod cli;
pub mod config;
pub mod error;
pub mod execution;
pub mod pool;
pub mod printer;
pub mod report;
pub mod runner;
pub mod template;

pub use error::{PatoError, Result};
pub use execution::{Environment, ExecutionOutcome, ExecutionUnit};
pub use pool::{PoolStats, ResolvedTask, ScheduledTask, WorkerPool};
pub use template::{build, Invocation, Template};
