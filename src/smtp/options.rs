use std::time::Duration;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

/// Configuration knobs for [`SmtpProber`](super::SmtpProber).
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpOptions {
    pub port: u16,
    pub helo_name: String,
    pub starttls: bool,
    /// Skip certificate chain and hostname checks after `STARTTLS`. MX hosts
    /// commonly present self-signed or mismatched certificates.
    pub accept_invalid_certs: bool,
    pub timeout_ms: u64,
}

impl Default for SmtpOptions {
    fn default() -> Self {
        Self {
            port: 25,
            helo_name: "localhost".to_string(),
            starttls: true,
            accept_invalid_certs: true,
            timeout_ms: 0,
        }
    }
}

impl SmtpOptions {
    /// Return the timeout as a [`Duration`]. A zero timeout leaves connect and
    /// read deadlines to the operating system.
    pub fn timeout(&self) -> Option<Duration> {
        if self.timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.timeout_ms))
        }
    }

    pub fn helo_name(&self) -> &str {
        let trimmed = self.helo_name.trim();
        if trimmed.is_empty() { "localhost" } else { trimmed }
    }
}
