#[path = "mxverify-cli/args.rs"]
mod args;
#[path = "mxverify-cli/logging.rs"]
mod logging;
#[path = "mxverify-cli/output.rs"]
mod output;
#[path = "mxverify-cli/prompt.rs"]
mod prompt;

use std::io;

use anyhow::{Context, Result};
use mxverify::check_mailbox;

use crate::args::Cli;
use crate::logging::LogConfig;

// exit codes: 0 exists, 2 definite negative, 3 undetermined, 1 fatal
fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_config = LogConfig::from_cli(&cli)?;
    let code = logging::scoped(&log_config, || run(&cli))?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

fn run(cli: &Cli) -> Result<i32> {
    let email = match cli.email.as_deref() {
        Some(email) => email.trim().to_string(),
        None => prompt::read_email(io::stdin().lock(), io::stdout())?,
    };

    let options = cli.verify_options();
    tracing::debug!(?options, "effective options");
    let report = check_mailbox(&email, &options).context("verification could not start")?;

    output::print_report(&report, &cli.format)?;
    Ok(report.status.exit_code())
}
