use std::process::ExitCode;

use clap::{ArgAction, Parser, error::ErrorKind};
use tracing::Level;

/// Build, transform and export time-lapse tilestacks.
///
/// The script is a sequence of `--command args...` words run left to right against an
/// operand stack, e.g. `--load a.ts2 --viz '{"gain":2}' --save b.ts2`.
#[derive(Parser, Debug)]
#[command(name = "tilestacktool", disable_version_flag = true)]
struct Cli {
    /// More log output (-v debug, -vv trace). Must precede the script.
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,

    /// Silence everything but warnings.
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,

    /// Commands and their arguments.
    #[arg(
        trailing_var_arg = true,
        allow_hyphen_values = true,
        required = true,
        value_name = "SCRIPT"
    )]
    script: Vec<String>,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            let msg = e.to_string();
            eprintln!("Error: {}", msg.strip_prefix("error: ").unwrap_or(&msg).trim_end());
            return ExitCode::FAILURE;
        }
    };
    let level = match (cli.quiet, cli.verbose) {
        (true, _) => Level::WARN,
        (false, 0) => Level::INFO,
        (false, 1) => Level::DEBUG,
        (false, _) => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    tracing::debug!(args = ?cli.script, "starting");
    match tilestack::tool::run(cli.script) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", anyhow::Error::new(e));
            ExitCode::FAILURE
        }
    }
}
