use std::path::PathBuf;

use clap::{ArgAction, Parser};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "pato",
    about = "Execute commands in parallel with timeouts",
    version
)]
pub struct Cli {
    /// Command template. Tokens containing the placeholder (default `%%%`)
    /// receive each argument; otherwise the argument is appended.
    ///
    /// Tokens starting with `-` go after a `--` separator, with pato's own
    /// options first: `pato --args /tmp -- ls -l`.
    #[arg(value_name = "CMD", required = true, num_args = 1..)]
    pub cmd: Vec<String>,

    /// Values substituted into the command, one invocation each.
    #[arg(long, num_args = 0.., value_name = "ARG")]
    pub args: Vec<String>,

    /// Number of invocations running at the same time [default: 1, or PATO_THREADS].
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub threads: Option<u64>,

    /// Per-invocation timeout in seconds [default: none, or PATO_TIMEOUT].
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Also write captured stdout/stderr to log files.
    #[arg(long)]
    pub log: bool,

    /// Directory for the stats and log files [default: current directory].
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Placeholder marker replaced by each argument.
    #[arg(long, value_name = "MARK")]
    pub placeholder: Option<String>,

    /// Disable colored console output.
    #[arg(long = "no-color")]
    pub no_color: bool,

    /// Increase diagnostic verbosity (-v info, -vv debug).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
