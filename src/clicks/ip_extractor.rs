//! Client IP extraction from HTTP headers with trust validation
//!
//! Forwarding headers are only believed when the proxy mode says so:
//! - `none`: the socket peer address is the client
//! - `standard`: RFC 7239 `Forwarded`, else `X-Forwarded-For`, walked right to
//!   left past trusted proxies
//! - `cloudflare`: `CF-Connecting-IP`

use axum::http::HeaderMap;
use ipnet::IpNet;
use std::net::{IpAddr, Ipv4Addr};
use tracing::debug;

use crate::config::{ClientIpConfig, TrustedProxyMode};

/// Extract the client IP address for a request received from `socket_addr`.
pub fn extract_client_ip(headers: &HeaderMap, socket_addr: IpAddr, config: &ClientIpConfig) -> IpAddr {
    match config.trusted_proxy_mode {
        TrustedProxyMode::None => socket_addr,
        TrustedProxyMode::Cloudflare => extract_cloudflare_ip(headers).unwrap_or_else(|| {
            debug!("CF-Connecting-IP header missing in cloudflare mode, using socket address");
            socket_addr
        }),
        TrustedProxyMode::Standard => extract_standard_ip(headers, socket_addr, &config.trusted_proxies),
    }
}

fn extract_cloudflare_ip(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("cf-connecting-ip")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
}

fn extract_standard_ip(headers: &HeaderMap, socket_addr: IpAddr, trusted: &[IpNet]) -> IpAddr {
    let chain = forwarded_chain(headers);

    // Without a trust list the direct peer is assumed to be the only proxy.
    if trusted.is_empty() {
        return chain.last().copied().unwrap_or(socket_addr);
    }

    let is_trusted = |ip: &IpAddr| trusted.iter().any(|net| net.contains(ip));

    if !is_trusted(&socket_addr) {
        return socket_addr;
    }

    chain
        .iter()
        .rev()
        .find(|ip| !is_trusted(*ip))
        .or_else(|| chain.first())
        .copied()
        .unwrap_or(socket_addr)
}

/// Addresses listed by forwarding headers, client first.
fn forwarded_chain(headers: &HeaderMap) -> Vec<IpAddr> {
    let from_forwarded: Vec<IpAddr> = headers
        .get_all("forwarded")
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|element| {
            element.split(';').find_map(|pair| {
                let (key, value) = pair.trim().split_once('=')?;
                key.eq_ignore_ascii_case("for").then(|| parse_node(value)).flatten()
            })
        })
        .collect();

    if !from_forwarded.is_empty() {
        return from_forwarded;
    }

    headers
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(parse_node)
        .collect()
}

/// Parse a node as it appears in forwarding headers: bare address,
/// quoted, bracketed IPv6 or IPv4 with a port.
fn parse_node(raw: &str) -> Option<IpAddr> {
    let value = raw.trim().trim_matches('"');

    if let Some(rest) = value.strip_prefix('[') {
        return rest.split(']').next()?.parse().ok();
    }

    if let Ok(ip) = value.parse::<IpAddr>() {
        return Some(ip);
    }

    let (host, _port) = value.rsplit_once(':')?;
    host.parse::<Ipv4Addr>().ok().map(IpAddr::V4)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn config(mode: TrustedProxyMode, trusted: &[&str]) -> ClientIpConfig {
        ClientIpConfig {
            trusted_proxy_mode: mode,
            trusted_proxies: trusted.iter().map(|s| s.parse().unwrap()).collect(),
        }
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_none_mode_ignores_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.1"));
        let result = extract_client_ip(&headers, ip("192.168.1.1"), &config(TrustedProxyMode::None, &[]));
        assert_eq!(result, ip("192.168.1.1"));
    }

    #[test]
    fn test_cloudflare_header() {
        let mut headers = HeaderMap::new();
        headers.insert("cf-connecting-ip", HeaderValue::from_static("203.0.113.1"));
        let cfg = config(TrustedProxyMode::Cloudflare, &[]);
        assert_eq!(extract_client_ip(&headers, ip("10.0.0.1"), &cfg), ip("203.0.113.1"));
        assert_eq!(extract_client_ip(&HeaderMap::new(), ip("10.0.0.1"), &cfg), ip("10.0.0.1"));
    }

    #[test]
    fn test_x_forwarded_for_without_trust_list_takes_rightmost() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.1, 198.51.100.1"),
        );
        let result = extract_client_ip(&headers, ip("10.0.0.1"), &config(TrustedProxyMode::Standard, &[]));
        assert_eq!(result, ip("198.51.100.1"));
    }

    #[test]
    fn test_x_forwarded_for_skips_trusted_proxies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("6.6.6.6, 203.0.113.7, 10.1.2.3"),
        );
        let cfg = config(TrustedProxyMode::Standard, &["10.0.0.0/8"]);
        assert_eq!(extract_client_ip(&headers, ip("10.0.0.1"), &cfg), ip("203.0.113.7"));
    }

    #[test]
    fn test_untrusted_peer_cannot_spoof() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("1.2.3.4"));
        let cfg = config(TrustedProxyMode::Standard, &["10.0.0.0/8"]);
        assert_eq!(extract_client_ip(&headers, ip("198.51.100.20"), &cfg), ip("198.51.100.20"));
    }

    #[test]
    fn test_forwarded_header_preferred() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "forwarded",
            HeaderValue::from_static("for=\"[2001:db8::17]:4711\";proto=https, for=192.0.2.60:8080"),
        );
        headers.insert("x-forwarded-for", HeaderValue::from_static("9.9.9.9"));
        let cfg = config(TrustedProxyMode::Standard, &["192.0.2.0/24", "10.0.0.0/8"]);
        assert_eq!(extract_client_ip(&headers, ip("10.0.0.1"), &cfg), ip("2001:db8::17"));
    }

    #[test]
    fn test_parse_node_forms() {
        assert_eq!(parse_node(" 192.0.2.1 "), Some(ip("192.0.2.1")));
        assert_eq!(parse_node("192.0.2.1:443"), Some(ip("192.0.2.1")));
        assert_eq!(parse_node("2001:db8::1"), Some(ip("2001:db8::1")));
        assert_eq!(parse_node("\"[2001:db8::1]:80\""), Some(ip("2001:db8::1")));
        assert_eq!(parse_node("unknown"), None);
        assert_eq!(parse_node("_hidden"), None);
    }
}
