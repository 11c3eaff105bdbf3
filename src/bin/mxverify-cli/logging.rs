use anyhow::{Result, bail};
use tracing::Dispatch;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt};

use crate::args::Cli;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

/// Logging setup for one invocation. Installed with [`scoped`], never as the
/// process-global default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub level: LevelFilter,
    pub format: LogFormat,
    pub ansi: bool,
}

impl LogConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let level = match cli.log_level.parse::<LevelFilter>() {
            Ok(level) => level,
            Err(_) => bail!("unknown --log-level '{}'", cli.log_level),
        };
        let format = match cli.log_format.as_str() {
            "compact" => LogFormat::Compact,
            "json" => LogFormat::Json,
            other => bail!("unknown --log-format '{other}', use: compact|json"),
        };
        Ok(Self {
            level,
            format,
            ansi: format == LogFormat::Compact,
        })
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "warn,mxverify={level},mxverify_cli={level}",
                level = self.level
            ))
        })
    }

    pub fn dispatch(&self) -> Dispatch {
        let registry = tracing_subscriber::registry().with(self.filter());
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_ansi(self.ansi);
        match self.format {
            LogFormat::Compact => Dispatch::new(registry.with(layer.compact())),
            LogFormat::Json => Dispatch::new(registry.with(layer.json())),
        }
    }
}

/// Runs `f` with `config` as the active subscriber for the current thread.
pub fn scoped<T>(config: &LogConfig, f: impl FnOnce() -> T) -> T {
    tracing::dispatcher::with_default(&config.dispatch(), f)
}
