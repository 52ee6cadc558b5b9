//! Validity gate applied before any network attempt.

use crate::error::{Error, Result};
use url::Url;

/// Parses `raw` and requires both a scheme and a host.
///
/// The host must be spelled out as `scheme://host`: the WHATWG parser would
/// otherwise accept `http:example.com` and `http:///example.com` by inventing
/// an authority for them.
pub fn validate_url(raw: &str) -> Result<Url> {
    let invalid = || Error::InvalidUrl {
        url: raw.to_string(),
    };

    if !has_explicit_host(raw) {
        return Err(invalid());
    }
    let parsed = Url::parse(raw).map_err(|_| invalid())?;
    match parsed.host_str() {
        Some(host) if !host.is_empty() && !parsed.scheme().is_empty() => Ok(parsed),
        _ => Err(invalid()),
    }
}

pub fn is_valid_url(raw: &str) -> bool {
    validate_url(raw).is_ok()
}

/// `scheme://[userinfo@]host[:port]` with a non-empty host before the path.
fn has_explicit_host(raw: &str) -> bool {
    let Some((_, rest)) = raw.split_once(':') else {
        return false;
    };
    let Some(rest) = rest.strip_prefix("//") else {
        return false;
    };
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    !host.is_empty() && !host.starts_with(':')
}
