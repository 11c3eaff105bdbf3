#![forbid(unsafe_code)]
//! mxverify — MX lookup and SMTP `VRFY` probing for a single e-mail address.

pub mod address;
pub use address::{extract_domain, validate_syntax};

pub mod mx;
pub use mx::{Error as MxError, LookupMx, MxRecord, MxStatus, check_mx};

pub mod smtp;
pub use smtp::{
    Existence, HostOutcome, ProbeHost, ServerAttempt, SmtpError, SmtpOptions, SmtpProber,
    SmtpReply, SmtpVerification, verify_hosts,
};

pub mod verify;
pub use verify::{
    MailboxStatus, MailboxVerification, VerifyError, VerifyOptions, check_mailbox, verify_with,
};
