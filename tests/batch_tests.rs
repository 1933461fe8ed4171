#![cfg(unix)]

use std::fs;
use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use chrono::Local;
use pato::{
    config::RunSettings,
    execution::{Environment, ExecutionUnit},
    printer::ConsolePrinter,
    report::writer::OutputPaths,
    runner::run_batch,
};

fn settings(dir: &Path, threads: usize, timeout: Option<u64>, log: bool) -> RunSettings {
    RunSettings {
        threads: NonZeroUsize::new(threads).unwrap(),
        timeout: timeout.map(Duration::from_secs),
        log,
        output_dir: dir.to_path_buf(),
        placeholder: "%%%".to_string(),
        color: false,
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[tokio::test]
async fn test_echo_example_end_to_end() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let settings = settings(dir.path(), 2, Some(5), true);
    let paths = OutputPaths::new(dir.path(), Local::now());

    let out = run_batch(
        &settings,
        &strings(&["echo", "%%%"]),
        &strings(&["a", "b"]),
        ExecutionUnit::new(Environment::inherit()),
        ConsolePrinter::silent(),
        &paths,
    )
    .await?;

    assert_eq!(out.written.len(), 3);
    assert_eq!(out.pool.slots_created, 2);

    let stats = fs::read_to_string(&paths.stats)?;
    let lines: Vec<&str> = stats.lines().collect();
    assert_eq!(lines[0], "cmd;time;error");
    assert_eq!(lines.len(), 3);
    for (line, cmd) in lines[1..].iter().zip(["\"echo a\"", "\"echo b\""]) {
        let fields: Vec<&str> = line.split(';').collect();
        assert_eq!(fields[0], cmd);
        let secs: f64 = fields[1].parse()?;
        assert!(secs >= 0.0 && secs < 5.0);
        assert_eq!(fields[2], "False");
    }

    assert_eq!(fs::read_to_string(&paths.stdout_log)?, "\"echo a\"\na\n\"echo b\"\nb\n");
    assert_eq!(fs::read_to_string(&paths.stderr_log)?, "\"echo a\"\n\"echo b\"\n");
    Ok(())
}

#[tokio::test]
async fn test_missing_binary_recorded_as_error() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let settings = settings(dir.path(), 2, Some(5), true);
    let paths = OutputPaths::new(dir.path(), Local::now());

    let out = run_batch(
        &settings,
        &strings(&["%%%"]),
        &strings(&["pato-missing-binary", "true"]),
        ExecutionUnit::new(Environment::inherit()),
        ConsolePrinter::silent(),
        &paths,
    )
    .await?;

    let stats = fs::read_to_string(&paths.stats)?;
    let lines: Vec<&str> = stats.lines().collect();
    assert_eq!(lines[1], "\"pato-missing-binary\";;True");
    assert!(lines[2].starts_with("\"true\";") && lines[2].ends_with(";False"));
    assert_eq!(out.report.count().failed, 1);

    let stderr_log = fs::read_to_string(&paths.stderr_log)?;
    assert!(stderr_log.starts_with("\"pato-missing-binary\"\nfailed to start"));
    Ok(())
}

#[tokio::test]
async fn test_sleeper_times_out() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let settings = settings(dir.path(), 1, Some(1), false);
    let paths = OutputPaths::new(dir.path(), Local::now());

    let out = run_batch(
        &settings,
        &strings(&["sleep"]),
        &strings(&["10"]),
        ExecutionUnit::new(Environment::inherit()),
        ConsolePrinter::silent(),
        &paths,
    )
    .await?;

    assert_eq!(out.report.stats[0].to_line(), "\"sleep 10\";;False");
    Ok(())
}

#[tokio::test]
async fn test_bare_template_without_args() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let settings = settings(dir.path(), 4, None, true);
    let paths = OutputPaths::new(dir.path(), Local::now());

    let out = run_batch(
        &settings,
        &strings(&["sh", "-c", "echo %%%"]),
        &[],
        ExecutionUnit::new(Environment::inherit()),
        ConsolePrinter::silent(),
        &paths,
    )
    .await?;

    assert_eq!(out.report.stats.len(), 1);
    assert_eq!(out.report.stdout_log[0].content, "%%%\n");
    Ok(())
}

#[tokio::test]
async fn test_concurrency_never_exceeds_threads() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let settings = settings(dir.path(), 3, Some(10), false);
    let paths = OutputPaths::new(dir.path(), Local::now());
    let values: Vec<String> = (0..9).map(|i| format!("0.{}", i % 3 + 1)).collect();

    let out = run_batch(
        &settings,
        &strings(&["sleep"]),
        &values,
        ExecutionUnit::new(Environment::inherit()),
        ConsolePrinter::silent(),
        &paths,
    )
    .await?;

    assert_eq!(out.pool.slots_created, 9);
    assert_eq!(out.pool.peak_active, 3);
    assert_eq!(out.report.count().completed, 9);
    Ok(())
}

#[tokio::test]
async fn test_children_observe_bounded_parallelism() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let marks = tempfile::tempdir()?;
    let settings = settings(dir.path(), 2, Some(10), false);
    let paths = OutputPaths::new(dir.path(), Local::now());

    // Each child announces itself, waits, then reports how many peers are running.
    let script = format!(
        "d={}; touch $d/$$; sleep 0.3; ls $d | wc -l; rm $d/$$",
        marks.path().display()
    );
    let values: Vec<String> = (0..6).map(|i| i.to_string()).collect();

    let out = run_batch(
        &settings,
        &strings(&["sh", "-c", &script]),
        &values,
        ExecutionUnit::new(Environment::inherit()),
        ConsolePrinter::silent(),
        &paths,
    )
    .await?;

    let seen: Vec<usize> = out
        .report
        .stdout_log
        .iter()
        .map(|entry| entry.content.trim().parse::<usize>())
        .collect::<std::result::Result<_, _>>()?;
    assert_eq!(seen.len(), 6);
    assert!(seen.iter().all(|&n| (1..=2).contains(&n)), "observed {seen:?}");
    assert_eq!(seen.iter().max(), Some(&2), "never ran two at once: {seen:?}");
    Ok(())
}

#[tokio::test]
async fn test_threads_run_concurrently_by_wall_clock() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let settings = settings(dir.path(), 3, Some(10), false);
    let paths = OutputPaths::new(dir.path(), Local::now());

    let started = std::time::Instant::now();
    let out = run_batch(
        &settings,
        &strings(&["sleep"]),
        &strings(&["0.5", "0.5", "0.5"]),
        ExecutionUnit::new(Environment::inherit()),
        ConsolePrinter::silent(),
        &paths,
    )
    .await?;

    let elapsed = started.elapsed();
    assert!(elapsed < Duration::from_millis(1200), "took {elapsed:?}");
    assert_eq!(out.pool.peak_active, 3);
    Ok(())
}
