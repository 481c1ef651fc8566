//! URL validation for service endpoints and job callback URLs.
//!
//! Service URLs must be absolute HTTP(S) URLs. Callback URLs are fetched by
//! the Watson service itself during the allowlist challenge, so they must
//! also point at a host the service can reach: loopback, private and
//! link-local literal addresses are rejected up front instead of failing the
//! challenge later.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::core::error::WatsonError;

/// Errors that can occur during URL validation
#[derive(Debug, Error)]
pub enum UrlValidationError {
    #[error("Invalid URL format: {0}")]
    InvalidFormat(#[from] url::ParseError),

    #[error("URL scheme must be http or https, got: {0}")]
    UnsupportedScheme(String),

    #[error("URL must have a host")]
    MissingHost,

    #[error("URL points at a private or loopback address: {0}")]
    PrivateAddress(String),

    #[error("URL must not contain embedded credentials")]
    EmbeddedCredentials,
}

/// Checks if an IPv4 address is private/internal
///
/// Private addresses include:
/// - Loopback (127.0.0.0/8)
/// - Private (10.0.0.0/8, 172.16.0.0/12, 192.168.0.0/16)
/// - Link-local (169.254.0.0/16)
/// - Broadcast and unspecified
/// - Shared (100.64.0.0/10 - CGNAT)
pub fn is_private_ipv4(ip: &Ipv4Addr) -> bool {
    if ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_broadcast()
        || ip.is_unspecified()
    {
        return true;
    }
    // Shared address space (CGNAT) 100.64.0.0/10
    let octets = ip.octets();
    octets[0] == 100 && (octets[1] & 0xC0) == 64
}

/// Checks if an IPv6 address is private/internal
///
/// Covers loopback, unspecified, link-local (fe80::/10), unique local
/// (fc00::/7) and IPv4-mapped private addresses.
pub fn is_private_ipv6(ip: &Ipv6Addr) -> bool {
    if ip.is_loopback() || ip.is_unspecified() {
        return true;
    }
    let segments = ip.segments();
    if segments[0] & 0xFFC0 == 0xFE80 || segments[0] & 0xFE00 == 0xFC00 {
        return true;
    }
    if let Some(ipv4) = ip.to_ipv4_mapped() {
        return is_private_ipv4(&ipv4);
    }
    false
}

/// Checks if an IP address is private/internal
pub fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => is_private_ipv4(ipv4),
        IpAddr::V6(ipv6) => is_private_ipv6(ipv6),
    }
}

fn parse_http_url(url: &str) -> Result<Url, UrlValidationError> {
    let parsed = Url::parse(url.trim())?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(UrlValidationError::UnsupportedScheme(other.to_string())),
    }
    if parsed.host().is_none() {
        return Err(UrlValidationError::MissingHost);
    }
    Ok(parsed)
}

/// Parse and check the base URL of a service instance.
pub fn validate_service_url(url: &str) -> Result<Url, WatsonError> {
    if url.trim().is_empty() {
        return Err(WatsonError::Configuration(
            "service URL is required".to_string(),
        ));
    }
    let mut parsed = parse_http_url(url)
        .map_err(|e| WatsonError::Configuration(format!("Invalid service URL '{url}': {e}")))?;
    parsed.set_query(None);
    parsed.set_fragment(None);
    Ok(parsed)
}

/// Check a callback URL before asking the service to allowlist it.
///
/// The check is syntactic: no DNS lookups are performed.
pub fn validate_callback_url(url: &str) -> Result<Url, UrlValidationError> {
    let parsed = parse_http_url(url)?;

    if !parsed.username().is_empty() || parsed.password().is_some() {
        return Err(UrlValidationError::EmbeddedCredentials);
    }

    let private = match parsed.host() {
        Some(url::Host::Ipv4(ip)) => is_private_ipv4(&ip),
        Some(url::Host::Ipv6(ip)) => is_private_ipv6(&ip),
        Some(url::Host::Domain(domain)) => {
            let domain = domain.to_ascii_lowercase();
            domain == "localhost" || domain.ends_with(".localhost")
        }
        None => return Err(UrlValidationError::MissingHost),
    };

    if private {
        let host = parsed.host_str().unwrap_or_default().to_string();
        warn!(host = %host, "Callback URL is not reachable from the service");
        return Err(UrlValidationError::PrivateAddress(host));
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_private_ipv4_ranges() {
        assert!(is_private_ipv4(&Ipv4Addr::new(127, 0, 0, 1)));
        assert!(is_private_ipv4(&Ipv4Addr::new(10, 0, 0, 1)));
        assert!(is_private_ipv4(&Ipv4Addr::new(172, 16, 0, 1)));
        assert!(!is_private_ipv4(&Ipv4Addr::new(172, 32, 0, 1)));
        assert!(is_private_ipv4(&Ipv4Addr::new(192, 168, 1, 1)));
        assert!(is_private_ipv4(&Ipv4Addr::new(169, 254, 0, 1)));
        assert!(is_private_ipv4(&Ipv4Addr::new(100, 64, 0, 1)));
        assert!(!is_private_ipv4(&Ipv4Addr::new(100, 128, 0, 1)));
        assert!(!is_private_ipv4(&Ipv4Addr::new(8, 8, 8, 8)));
    }

    #[test]
    fn test_is_private_ipv6_ranges() {
        assert!(is_private_ipv6(&Ipv6Addr::LOCALHOST));
        assert!(is_private_ipv6(&Ipv6Addr::UNSPECIFIED));
        assert!(is_private_ipv6(&Ipv6Addr::new(0xFE80, 0, 0, 0, 0, 0, 0, 1)));
        assert!(is_private_ipv6(&Ipv6Addr::new(0xFD00, 0, 0, 0, 0, 0, 0, 1)));
        assert!(is_private_ipv6(&Ipv4Addr::new(10, 1, 2, 3).to_ipv6_mapped()));
        assert!(!is_private_ipv6(&Ipv6Addr::new(
            0x2001, 0x4860, 0x4860, 0, 0, 0, 0, 0x8888
        )));
    }

    #[test]
    fn test_service_url() {
        let url = validate_service_url("https://api.us-south.speech-to-text.watson.cloud.ibm.com/instances/x?foo=1").unwrap();
        assert_eq!(url.query(), None);
        assert!(validate_service_url("").is_err());
        assert!(validate_service_url("ftp://example.com").is_err());
        assert!(validate_service_url("not-a-url").is_err());
        // Local service URLs are fine: only callbacks must be publicly reachable.
        assert!(validate_service_url("http://127.0.0.1:8080").is_ok());
    }

    #[test]
    fn test_callback_url_accepts_public_hosts() {
        assert!(validate_callback_url("https://example.com/results").is_ok());
        assert!(validate_callback_url("http://callbacks.example.org:8443/stt").is_ok());
        assert!(validate_callback_url("https://8.8.8.8/hook").is_ok());
    }

    #[test]
    fn test_callback_url_rejections() {
        assert!(matches!(
            validate_callback_url("not-a-url"),
            Err(UrlValidationError::InvalidFormat(_))
        ));
        assert!(matches!(
            validate_callback_url("ws://example.com/hook"),
            Err(UrlValidationError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            validate_callback_url("https://localhost/hook"),
            Err(UrlValidationError::PrivateAddress(_))
        ));
        assert!(matches!(
            validate_callback_url("https://192.168.0.10/hook"),
            Err(UrlValidationError::PrivateAddress(_))
        ));
        assert!(matches!(
            validate_callback_url("https://[::1]/hook"),
            Err(UrlValidationError::PrivateAddress(_))
        ));
        assert!(matches!(
            validate_callback_url("https://user:pw@example.com/hook"),
            Err(UrlValidationError::EmbeddedCredentials)
        ));
    }
}
