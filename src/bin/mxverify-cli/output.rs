use std::fmt::Write as _;

use anyhow::{Result, bail};
use mxverify::{HostOutcome, MailboxVerification, ServerAttempt};

pub fn print_report(report: &MailboxVerification, format: &str) -> Result<()> {
    match format {
        "human" => print!("{}", render_human(report)),
        "json" => {
            #[cfg(feature = "with-serde")]
            {
                println!("{}", serde_json::to_string_pretty(report)?);
            }
            #[cfg(not(feature = "with-serde"))]
            {
                bail!("format=json requires the 'with-serde' feature");
            }
        }
        other => bail!("unknown --format '{other}', use: human|json"),
    }
    Ok(())
}

pub fn render_human(report: &MailboxVerification) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Email:  {}", report.email);
    let _ = writeln!(out, "Domain: {}", report.domain);
    let _ = writeln!(out, "Result: {}", report.status);
    if !report.mx_servers.is_empty() {
        let _ = writeln!(out, "MX servers: {}", report.mx_servers.join(", "));
    }
    for attempt in &report.attempts {
        let _ = writeln!(
            out,
            "  {}: {}",
            attempt_label(attempt),
            outcome_summary(&attempt.outcome)
        );
        for line in &attempt.transcript {
            let _ = writeln!(out, "    {line}");
        }
    }
    out
}

fn attempt_label(attempt: &ServerAttempt) -> String {
    match &attempt.address {
        Some(address) => format!("{} ({address})", attempt.exchange),
        None => attempt.exchange.clone(),
    }
}

fn outcome_summary(outcome: &HostOutcome) -> String {
    match outcome {
        HostOutcome::Confirmed { reply } => format!("confirmed ({reply})"),
        HostOutcome::NotConfirmed { reply } => format!("not confirmed ({reply})"),
        HostOutcome::ConnectFailed { message } => format!("connect failed: {message}"),
        HostOutcome::ProtocolError { message } => format!("error: {message}"),
    }
}
