use std::net::IpAddr;

use url::Url;

/// Validates a delivery target URL: must parse, must be `http`/`https`, and
/// must not resolve to a loopback, link-local, or private address (basic
/// SSRF guard against targets that would reach internal infrastructure).
pub fn validate(raw: &str) -> Result<(), String> {
    let parsed = Url::parse(raw).map_err(|e| format!("unparseable URL: {e}"))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(format!("unsupported scheme: {}", parsed.scheme()));
    }
    let Some(host) = parsed.host_str() else {
        return Err("URL has no host".to_string());
    };
    if let Ok(ip) = host.parse::<IpAddr>() {
        if is_disallowed_ip(&ip) {
            return Err(format!("target resolves to a disallowed address: {ip}"));
        }
    } else if host.eq_ignore_ascii_case("localhost") {
        return Err("target resolves to localhost".to_string());
    }
    Ok(())
}

fn is_disallowed_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_loopback() || v4.is_private() || v4.is_link_local() || v4.is_unspecified(),
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified() || (v6.segments()[0] & 0xfe00) == 0xfc00,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_https_url() {
        assert!(validate("https://example.com/webhook").is_ok());
    }

    #[test]
    fn rejects_non_http_scheme() {
        assert!(validate("ftp://example.com").is_err());
    }

    #[test]
    fn rejects_loopback_literal() {
        assert!(validate("http://127.0.0.1/hook").is_err());
    }

    #[test]
    fn rejects_localhost_hostname() {
        assert!(validate("http://localhost:8080/hook").is_err());
    }

    #[test]
    fn rejects_private_range() {
        assert!(validate("http://10.0.0.5/hook").is_err());
    }

    #[test]
    fn rejects_unparseable_url() {
        assert!(validate("not a url").is_err());
    }
}
