//! One batch end to end: expand, schedule, drain, aggregate, persist.

use std::path::PathBuf;

use tracing::info;

use crate::{
    config::RunSettings,
    error::Result,
    execution::ExecutionUnit,
    pool::{PoolStats, WorkerPool},
    printer::ConsolePrinter,
    report::{
        writer::{write_report, OutputPaths},
        Aggregator, Report,
    },
    template::{build, Template},
};

#[derive(Debug)]
pub struct RunOutput {
    pub report: Report,
    pub pool: PoolStats,
    pub written: Vec<PathBuf>,
}

pub async fn run_batch(
    settings: &RunSettings,
    cmd: &[String],
    args: &[String],
    unit: ExecutionUnit,
    printer: ConsolePrinter,
    paths: &OutputPaths,
) -> Result<RunOutput> {
    printer.header(cmd, args, settings.timeout, settings.threads.get());

    let template = Template::with_placeholder(cmd.iter().cloned(), &settings.placeholder);
    let invocations = build(&template, args);

    let mut pool = WorkerPool::start(settings.threads, settings.timeout, unit);
    let mut tasks = Vec::with_capacity(invocations.len());
    for invocation in invocations {
        printer.scheduling(&invocation);
        tasks.push(pool.submit(invocation)?);
    }
    let pool = pool.drain_and_join().await;

    let report = Aggregator::new(settings.timeout, printer).render(tasks);
    let summary = report.count();
    info!(
        completed = summary.completed,
        timed_out = summary.timed_out,
        failed = summary.failed,
        "batch finished"
    );

    let written = write_report(&report, paths, settings.log)?;
    Ok(RunOutput {
        report,
        pool,
        written,
    })
}
