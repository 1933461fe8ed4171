//! Result aggregation: turn drained tasks into persisted records.

use std::time::Duration;

use crate::execution::ExecutionOutcome;
use crate::pool::{ResolvedTask, ScheduledTask};
use crate::printer::ConsolePrinter;

pub mod writer;

/// One row of the stats file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsRecord {
    /// Quoted command line.
    pub command: String,
    /// Seconds with two decimals; `None` for timeouts and failures.
    pub seconds: Option<String>,
    /// Set only when the invocation could not be started.
    pub error: bool,
}

impl StatsRecord {
    pub fn to_line(&self) -> String {
        format!(
            "{};{};{}",
            self.command,
            self.seconds.as_deref().unwrap_or(""),
            if self.error { "True" } else { "False" }
        )
    }
}

/// One entry of the stdout or stderr log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub command: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub stats: Vec<StatsRecord>,
    pub stdout_log: Vec<LogEntry>,
    pub stderr_log: Vec<LogEntry>,
}

impl Report {
    pub fn count(&self) -> Summary {
        let mut summary = Summary::default();
        for record in &self.stats {
            match (&record.seconds, record.error) {
                (Some(_), _) => summary.completed += 1,
                (None, true) => summary.failed += 1,
                (None, false) => summary.timed_out += 1,
            }
        }
        summary
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub completed: usize,
    pub timed_out: usize,
    pub failed: usize,
}

pub struct Aggregator {
    timeout: Option<Duration>,
    printer: ConsolePrinter,
}

impl Aggregator {
    pub fn new(timeout: Option<Duration>, printer: ConsolePrinter) -> Self {
        Self { timeout, printer }
    }

    /// Render tasks in submission order. Call only after the pool has drained.
    pub fn render(&self, tasks: Vec<ScheduledTask>) -> Report {
        let mut resolved: Vec<ResolvedTask> = tasks.into_iter().map(ScheduledTask::resolve).collect();
        resolved.sort_by_key(|t| t.index);
        self.render_resolved(&resolved)
    }

    pub fn render_resolved(&self, tasks: &[ResolvedTask]) -> Report {
        let mut report = Report::default();

        for task in tasks {
            let command = task.invocation.quoted();
            match &task.outcome {
                ExecutionOutcome::Completed {
                    duration,
                    stdout,
                    stderr,
                    exit_code,
                } => {
                    self.printer
                        .completed(&task.invocation, *duration, self.timeout, *exit_code, stdout, stderr);
                    report.stdout_log.push(LogEntry {
                        command: command.clone(),
                        content: stdout.clone(),
                    });
                    report.stderr_log.push(LogEntry {
                        command: command.clone(),
                        content: stderr.clone(),
                    });
                    report.stats.push(StatsRecord {
                        command,
                        seconds: Some(format!("{:.2}", duration.as_secs_f64())),
                        error: false,
                    });
                }
                ExecutionOutcome::TimedOut => {
                    self.printer.timed_out(&task.invocation, self.timeout);
                    report.stats.push(StatsRecord {
                        command,
                        seconds: None,
                        error: false,
                    });
                }
                ExecutionOutcome::Failed(error) => {
                    self.printer.failed(&task.invocation, error);
                    report.stderr_log.push(LogEntry {
                        command: command.clone(),
                        content: format!("{}\n", error),
                    });
                    report.stats.push(StatsRecord {
                        command,
                        seconds: None,
                        error: true,
                    });
                }
            }
        }

        report
    }
}
