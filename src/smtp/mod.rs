//! SMTP `VRFY` probing.
//!
//! [`verify_hosts`] asks each MX host in turn whether the mailbox exists and
//! stops at the first `250`. The network dialogue lives in [`SmtpProber`];
//! anything implementing [`ProbeHost`] can stand in for it.

mod error;
mod options;
mod probe;
mod session;
mod types;

pub use error::SmtpError;
pub use options::SmtpOptions;
pub use probe::{ProbeHost, SmtpProber, verify_hosts};
pub use types::{Existence, HostOutcome, ServerAttempt, SmtpReply, SmtpVerification};
