//! Persisted stats and stream logs.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::info;

use super::{LogEntry, Report};
use crate::error::{PatoError, Result};

pub const STATS_HEADER: &str = "cmd;time;error";

/// File names used by one run, all sharing the same timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub stats: PathBuf,
    pub stdout_log: PathBuf,
    pub stderr_log: PathBuf,
}

impl OutputPaths {
    pub fn new(dir: &Path, at: DateTime<Local>) -> Self {
        let stamp = timestamp(at);
        Self {
            stats: dir.join(format!("pato-{stamp}.stats")),
            stdout_log: dir.join(format!("pato-{stamp}-out.log")),
            stderr_log: dir.join(format!("pato-{stamp}-err.log")),
        }
    }
}

pub fn timestamp(at: DateTime<Local>) -> String {
    at.format("%Y-%m-%d-%H-%M-%S").to_string()
}

/// Write the stats file, and the stdout/stderr logs when `with_logs` is set.
///
/// Returns the paths actually written.
pub fn write_report(report: &Report, paths: &OutputPaths, with_logs: bool) -> Result<Vec<PathBuf>> {
    if let Some(dir) = paths.stats.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|source| PatoError::OutputDir {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let mut written = Vec::new();

    write_file(&paths.stats, |out| {
        writeln!(out, "{}", STATS_HEADER)?;
        for record in &report.stats {
            writeln!(out, "{}", record.to_line())?;
        }
        Ok(())
    })?;
    written.push(paths.stats.clone());

    if with_logs {
        write_log(&paths.stdout_log, &report.stdout_log)?;
        written.push(paths.stdout_log.clone());
        write_log(&paths.stderr_log, &report.stderr_log)?;
        written.push(paths.stderr_log.clone());
    }

    for path in &written {
        info!(path = %path.display(), "wrote");
    }
    Ok(written)
}

fn write_log(path: &Path, entries: &[LogEntry]) -> Result<()> {
    write_file(path, |out| {
        for entry in entries {
            writeln!(out, "{}", entry.command)?;
            out.write_all(entry.content.as_bytes())?;
        }
        Ok(())
    })
}

/// Create `path` and fill it; any I/O failure is reported with the path.
fn write_file<F>(path: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    let attempt = || -> io::Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        fill(&mut out)?;
        out.flush()
    };
    attempt().map_err(|source| PatoError::WriteFile {
        path: path.to_path_buf(),
        source,
    })
}
