use std::time::Duration;

use tracing::{debug, error, info};
use trust_dns_resolver::{
    Resolver,
    error::{ResolveError, ResolveErrorKind},
    proto::op::ResponseCode,
    system_conf::read_system_conf,
};

use super::{Error, MxRecord, MxStatus};

/// Lookup MX records for `domain` using the system resolver.
///
/// The domain is normalized via IDNA before querying DNS.
pub fn check_mx(domain: &str, timeout: Option<Duration>) -> Result<MxStatus, Error> {
    let ascii = normalize_domain(domain)?;
    let resolver = build_resolver(timeout)?;
    resolve_with(&resolver, &ascii)
}

/// Builds a blocking resolver from the system configuration, optionally
/// overriding the per-query timeout.
pub fn build_resolver(timeout: Option<Duration>) -> Result<Resolver, Error> {
    let (config, mut opts) = read_system_conf().map_err(Error::resolver_init)?;
    if let Some(timeout) = timeout {
        opts.timeout = timeout;
    }
    Resolver::new(config, opts).map_err(Error::resolver_init)
}

pub fn resolve_with<R>(resolver: &R, ascii_domain: &str) -> Result<MxStatus, Error>
where
    R: LookupMx + ?Sized,
{
    debug!(domain = ascii_domain, "querying MX records");
    let records = resolver
        .lookup_mx(ascii_domain)
        .map_err(|err| Error::lookup(ascii_domain, err))?;

    if records.is_empty() {
        error!("No MX records found for the domain. Email address might be invalid.");
        return Ok(MxStatus::NoRecords);
    }

    let servers: Vec<&str> = records.iter().map(|r| r.exchange.as_str()).collect();
    info!("MX records found. Email server(s): {servers:?}");
    Ok(MxStatus::Records(records))
}

pub fn normalize_domain(domain: &str) -> Result<String, Error> {
    let trimmed = domain.trim();
    if trimmed.is_empty() {
        return Err(Error::EmptyDomain);
    }
    idna::domain_to_ascii(trimmed).map_err(Error::idna)
}

pub(crate) fn normalize_exchange(exchange: &str) -> String {
    exchange.trim_end_matches('.').to_ascii_lowercase()
}

/// DNS seam: anything able to answer an MX query.
///
/// An empty vector means the name exists in DNS (or not at all) but carries
/// no MX answer; errors are reserved for failures of the lookup itself.
pub trait LookupMx {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, ResolveError>;
}

impl LookupMx for Resolver {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, ResolveError> {
        let lookup = match Resolver::mx_lookup(self, domain) {
            Ok(lookup) => lookup,
            Err(err) if should_treat_as_empty(&err) => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };
        let mut records = Vec::new();
        for mx in lookup.iter() {
            let exchange = normalize_exchange(&mx.exchange().to_utf8());
            records.push(MxRecord::new(mx.preference(), exchange));
        }
        Ok(records)
    }
}

/// Only a clean `NOERROR` with no answer or an `NXDOMAIN` means "no MX".
/// trust-dns also reports `SERVFAIL`, `REFUSED` and friends as
/// `NoRecordsFound`; those stay errors.
pub(crate) fn should_treat_as_empty(err: &ResolveError) -> bool {
    matches!(
        err.kind(),
        ResolveErrorKind::NoRecordsFound {
            response_code: ResponseCode::NoError | ResponseCode::NXDomain,
            ..
        }
    )
}
