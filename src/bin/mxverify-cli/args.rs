use clap::Parser;
use mxverify::{SmtpOptions, VerifyOptions};

#[derive(Parser, Debug)]
#[command(
    name = "mxverify-cli",
    about = "Checks MX records and asks each mail server whether an address exists (SMTP VRFY)."
)]
pub struct Cli {
    /// address to verify; prompts on stdin when omitted
    pub email: Option<String>,

    /// format: human|json
    #[arg(long, default_value = "human")]
    pub format: String,

    /// SMTP port on each MX host
    #[arg(long, default_value_t = 25)]
    pub port: u16,

    /// name announced in EHLO/HELO
    #[arg(long, default_value = "localhost")]
    pub helo: String,

    /// connect/read timeout for DNS and SMTP (ms), 0 = system default
    #[arg(long = "timeout-ms", default_value_t = 0)]
    pub timeout_ms: u64,

    /// skip STARTTLS and send VRFY in clear text
    #[arg(long = "no-starttls")]
    pub no_starttls: bool,

    /// require a valid certificate and matching hostname after STARTTLS
    #[arg(long = "verify-tls")]
    pub verify_tls: bool,

    /// log level: error|warn|info|debug|trace
    #[arg(long = "log-level", default_value = "info")]
    pub log_level: String,

    /// log format: compact|json
    #[arg(long = "log-format", default_value = "compact")]
    pub log_format: String,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn verify_options(&self) -> VerifyOptions {
        VerifyOptions {
            dns_timeout_ms: self.timeout_ms,
            smtp: SmtpOptions {
                port: self.port,
                helo_name: self.helo.clone(),
                starttls: !self.no_starttls,
                accept_invalid_certs: !self.verify_tls,
                timeout_ms: self.timeout_ms,
            },
        }
    }
}
