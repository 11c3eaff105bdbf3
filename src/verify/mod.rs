//! The verification pipeline: domain extraction, MX lookup, syntax check and
//! SMTP probing, in that order.

mod error;
mod types;

pub use error::VerifyError;
pub use types::{MailboxStatus, MailboxVerification, VerifyOptions};

use tracing::{error, info};

use crate::address::{extract_domain, validate_syntax};
use crate::mx::{self, Error as MxError, LookupMx, MxStatus};
use crate::smtp::{ProbeHost, SmtpProber, verify_hosts};

/// Verifies `email` against the live DNS and the mail servers it names.
pub fn check_mailbox(
    email: &str,
    options: &VerifyOptions,
) -> Result<MailboxVerification, VerifyError> {
    let resolver = mx::build_resolver(options.dns_timeout())?;
    let prober = SmtpProber::new(options.smtp.clone())?;
    Ok(verify_with(email, &resolver, &prober))
}

/// Runs the pipeline with the given DNS and SMTP collaborators.
pub fn verify_with<R, P>(email: &str, resolver: &R, prober: &P) -> MailboxVerification
where
    R: LookupMx + ?Sized,
    P: ProbeHost + ?Sized,
{
    let domain = extract_domain(email);
    info!(email, domain, "verifying address");

    let lookup =
        mx::normalize_domain(domain).and_then(|ascii| mx::resolve_with(resolver, &ascii));
    let records = match lookup {
        Ok(MxStatus::Records(records)) => records,
        Ok(MxStatus::NoRecords) => {
            return MailboxVerification::new(email, domain, MailboxStatus::NoMailServer);
        }
        Err(MxError::EmptyDomain) => {
            error!("Email address has an empty domain; no MX records to look up.");
            return MailboxVerification::new(email, domain, MailboxStatus::NoMailServer);
        }
        Err(err) => {
            error!("DNS lookup failed for {domain}: {err}");
            return MailboxVerification::new(
                email,
                domain,
                MailboxStatus::LookupFailed {
                    message: err.to_string(),
                },
            );
        }
    };

    let mut report = MailboxVerification::new(email, domain, MailboxStatus::InvalidSyntax);
    report.mx_servers = records.into_iter().map(|r| r.exchange).collect();
    if !validate_syntax(email) {
        return report;
    }

    let smtp = verify_hosts(prober, &report.mx_servers, email);
    report.status = smtp.existence.into();
    report.attempts = smtp.attempts;
    report
}
