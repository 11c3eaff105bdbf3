use std::fmt;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

/// A raw SMTP reply: the status code and the text of every reply line.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpReply {
    pub code: u16,
    pub lines: Vec<String>,
}

impl SmtpReply {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            lines: vec![message.into()],
        }
    }

    pub fn is_positive_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }

    pub fn message(&self) -> String {
        self.lines.join(" ")
    }

    pub fn has_capability(&self, cap: &str) -> bool {
        self.lines.iter().any(|line| {
            line.split_whitespace()
                .next()
                .is_some_and(|token| token.eq_ignore_ascii_case(cap))
        })
    }
}

impl fmt::Display for SmtpReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.message())
    }
}

/// What happened on a single MX host.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostOutcome {
    /// `VRFY` answered `250`.
    Confirmed { reply: SmtpReply },
    /// `VRFY` answered with any other code.
    NotConfirmed { reply: SmtpReply },
    ConnectFailed { message: String },
    ProtocolError { message: String },
}

impl HostOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed { .. })
    }

    /// The `VRFY` reply, when the dialogue got that far.
    pub fn vrfy_reply(&self) -> Option<&SmtpReply> {
        match self {
            Self::Confirmed { reply } | Self::NotConfirmed { reply } => Some(reply),
            _ => None,
        }
    }
}

/// Report for one MX host interrogation.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAttempt {
    pub exchange: String,
    pub address: Option<String>,
    pub outcome: HostOutcome,
    pub transcript: Vec<String>,
}

impl ServerAttempt {
    pub fn new(exchange: impl Into<String>, outcome: HostOutcome) -> Self {
        Self {
            exchange: exchange.into(),
            address: None,
            outcome,
            transcript: Vec::new(),
        }
    }
}

/// Tri-state answer of the SMTP stage.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Existence {
    /// A server answered `VRFY` with `250`.
    Confirmed { exchange: String },
    /// At least one server answered `VRFY`, none with `250`.
    Rejected,
    /// No server produced a `VRFY` answer.
    Undetermined,
}

impl fmt::Display for Existence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Confirmed { exchange } => write!(f, "confirmed by {exchange}"),
            Self::Rejected => f.write_str("rejected"),
            Self::Undetermined => f.write_str("undetermined"),
        }
    }
}

/// Result of walking the MX host list.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpVerification {
    pub existence: Existence,
    pub attempts: Vec<ServerAttempt>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_lookup_is_case_insensitive() {
        let reply = SmtpReply {
            code: 250,
            lines: vec![
                "mx.example.com greets you".to_string(),
                "PIPELINING".to_string(),
                "starttls".to_string(),
            ],
        };
        assert!(reply.has_capability("STARTTLS"));
        assert!(!reply.has_capability("SMTPUTF8"));
    }

    #[test]
    fn vrfy_reply_only_for_answered_hosts() {
        let answered = HostOutcome::NotConfirmed {
            reply: SmtpReply::new(252, "Cannot VRFY user"),
        };
        assert_eq!(answered.vrfy_reply().map(|r| r.code), Some(252));
        let failed = HostOutcome::ConnectFailed {
            message: "refused".to_string(),
        };
        assert!(failed.vrfy_reply().is_none());
    }
}
