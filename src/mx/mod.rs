//! DNS MX resolution.
//!
//! [`check_mx`] performs a blocking lookup using the system resolver
//! configuration and returns a [`MxStatus`]. "No answer" is a normal outcome
//! ([`MxStatus::NoRecords`]); every other DNS failure comes back as an
//! [`Error`] for the caller to report.

mod error;
mod resolver;
mod types;

pub use error::MxError as Error;
pub use resolver::{LookupMx, build_resolver, check_mx, normalize_domain, resolve_with};
pub use types::{MxRecord, MxStatus};
