use std::fmt;
use std::time::Duration;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

use crate::smtp::{Existence, ServerAttempt, SmtpOptions};

/// Settings for one [`check_mailbox`](super::check_mailbox) run.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyOptions {
    /// Per-query DNS timeout; `0` keeps the system resolver's default.
    pub dns_timeout_ms: u64,
    pub smtp: SmtpOptions,
}

impl VerifyOptions {
    pub fn dns_timeout(&self) -> Option<Duration> {
        if self.dns_timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.dns_timeout_ms))
        }
    }
}

/// Overall outcome of verifying one address.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailboxStatus {
    Exists { exchange: String },
    DoesNotExist,
    Undetermined,
    NoMailServer,
    InvalidSyntax,
    LookupFailed { message: String },
}

impl MailboxStatus {
    pub fn exists(&self) -> bool {
        matches!(self, Self::Exists { .. })
    }

    /// Process exit code used by the CLI: `0` exists, `2` definite negative,
    /// `3` no conclusion.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Exists { .. } => 0,
            Self::DoesNotExist | Self::NoMailServer | Self::InvalidSyntax => 2,
            Self::Undetermined | Self::LookupFailed { .. } => 3,
        }
    }
}

impl From<Existence> for MailboxStatus {
    fn from(existence: Existence) -> Self {
        match existence {
            Existence::Confirmed { exchange } => Self::Exists { exchange },
            Existence::Rejected => Self::DoesNotExist,
            Existence::Undetermined => Self::Undetermined,
        }
    }
}

impl fmt::Display for MailboxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exists { exchange } => write!(f, "exists (confirmed by {exchange})"),
            Self::DoesNotExist => f.write_str("does not exist on any of the servers"),
            Self::Undetermined => f.write_str("undetermined (no server answered VRFY)"),
            Self::NoMailServer => f.write_str("no MX records"),
            Self::InvalidSyntax => f.write_str("invalid address syntax"),
            Self::LookupFailed { message } => write!(f, "DNS lookup failed ({message})"),
        }
    }
}

/// Structured report of one run.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxVerification {
    pub email: String,
    pub domain: String,
    pub mx_servers: Vec<String>,
    pub status: MailboxStatus,
    pub attempts: Vec<ServerAttempt>,
}

impl MailboxVerification {
    pub(crate) fn new(email: &str, domain: &str, status: MailboxStatus) -> Self {
        Self {
            email: email.to_string(),
            domain: domain.to_string(),
            mx_servers: Vec::new(),
            status,
            attempts: Vec::new(),
        }
    }
}
