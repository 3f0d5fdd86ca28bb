//! Client address resolution with proxy trust validation
//!
//! The address that identifies a visitor is:
//! - the socket peer address by default
//! - the right-most untrusted hop of `Forwarded` / `X-Forwarded-For` in standard mode,
//!   counting the socket peer as the last hop
//! - `CF-Connecting-IP` behind Cloudflare

use axum::http::HeaderMap;
use ipnet::IpNet;
use std::net::{IpAddr, SocketAddr};
use tracing::warn;

use crate::config::{ClientIpConfig, TrustedProxyMode};

/// Resolve the client address for a request.
///
/// # Arguments
/// * `headers` - HTTP request headers
/// * `peer` - The socket remote address (fallback)
/// * `config` - Proxy trust settings
pub fn resolve_client_ip(headers: &HeaderMap, peer: IpAddr, config: &ClientIpConfig) -> IpAddr {
    match config.trusted_proxy_mode {
        TrustedProxyMode::Cloudflare => cloudflare_ip(headers).unwrap_or_else(|| {
            warn!("CF-Connecting-IP header missing in Cloudflare mode, using socket address");
            peer
        }),
        TrustedProxyMode::Standard => {
            let forwarded = forwarded_chain(headers);
            let chain = if forwarded.is_empty() {
                x_forwarded_for_chain(headers)
            } else {
                forwarded
            };
            select_client(chain, peer, config)
        }
        TrustedProxyMode::None => peer,
    }
}

fn cloudflare_ip(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("cf-connecting-ip")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
}

/// RFC 7239 `Forwarded: for=...` chain
fn forwarded_chain(headers: &HeaderMap) -> Vec<IpAddr> {
    let Some(forwarded) = headers.get("forwarded").and_then(|h| h.to_str().ok()) else {
        return Vec::new();
    };

    forwarded
        .split(',')
        .flat_map(|element| element.split(';'))
        .filter_map(|param| {
            let (name, value) = param.trim().split_once('=')?;
            name.eq_ignore_ascii_case("for")
                .then(|| parse_node(value))
                .flatten()
        })
        .collect()
}

fn x_forwarded_for_chain(headers: &HeaderMap) -> Vec<IpAddr> {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .map(|xff| xff.split(',').filter_map(parse_node).collect())
        .unwrap_or_default()
}

/// Parse a node such as `192.0.2.1`, `"192.0.2.1:8080"` or `"[2001:db8::1]:443"`.
fn parse_node(value: &str) -> Option<IpAddr> {
    let value = value.trim().trim_matches('"');

    if let Some(rest) = value.strip_prefix('[') {
        return rest.split(']').next()?.parse().ok();
    }

    value
        .parse::<IpAddr>()
        .ok()
        .or_else(|| value.parse::<SocketAddr>().ok().map(|addr| addr.ip()))
}

/// Pick the client from a proxy chain (left = original client, right = closest hop).
///
/// The socket peer is appended as the right-most hop, so header entries are
/// only reached through peers that are trusted proxies.
fn select_client(mut chain: Vec<IpAddr>, peer: IpAddr, config: &ClientIpConfig) -> IpAddr {
    chain.push(peer);

    // Skip a fixed number of hops from the right
    if let Some(num_trusted) = config.num_trusted_proxies {
        return chain
            .len()
            .checked_sub(num_trusted.saturating_add(1))
            .map_or(chain[0], |index| chain[index]);
    }

    // Walk right-to-left past trusted proxies
    chain
        .iter()
        .rev()
        .find(|ip| !is_trusted(**ip, &config.trusted_proxies))
        .or_else(|| chain.first())
        .copied()
        .unwrap_or(peer)
}

fn is_trusted(ip: IpAddr, trusted: &[IpNet]) -> bool {
    trusted.iter().any(|net| net.contains(&ip))
}
