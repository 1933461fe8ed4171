use anyhow::{bail, Context, Result};
use chrono::Local;
use is_terminal::IsTerminal;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use pato::{
    cli::Cli,
    config::{Config, RunSettings},
    execution::{Environment, ExecutionUnit},
    printer::ConsolePrinter,
    report::writer::OutputPaths,
    runner::run_batch,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.verbose)?;

    // Captured once; children see the environment as it was at startup.
    let started_at = Local::now();
    let cwd = std::env::current_dir().context("cannot determine current directory")?;
    let env = Environment::inherit();

    let cfg = Config::load();
    let settings = RunSettings::resolve(&args, &cfg, &cwd)
        .with_context(|| format!("invalid settings (config file: {})", cfg.config_path.display()))?;

    let printer = ConsolePrinter::new(settings.color && std::io::stdout().is_terminal());
    let paths = OutputPaths::new(&settings.output_dir, started_at);

    let unit = ExecutionUnit::new(env);
    let groups = unit.groups();

    tokio::select! {
        res = run_batch(&settings, &args.cmd, &args.args, unit, printer, &paths) => {
            res.context("batch run failed")?;
        }
        _ = tokio::signal::ctrl_c() => {
            // Children lead their own process groups and never see the terminal's SIGINT.
            let killed = groups.kill_all();
            warn!(killed, "interrupted, killed running process groups");
            bail!("interrupted; {} running invocation(s) killed, no records written", killed);
        }
    }

    // Individual invocation outcomes never affect the exit status.
    Ok(())
}

fn init_tracing(verbose: u8) -> Result<()> {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
    Ok(())
}
