//! Decoded request records and the parsers that build them from the
//! gateway's environment variables.

use std::collections::HashMap;
use std::net::{Ipv4Addr, Ipv6Addr};

use url::form_urlencoded;

pub type VarMap = HashMap<String, String>;

/// Everything a worker needs to serve one request. Lives for a single
/// worker iteration.
#[derive(Debug, Default)]
pub struct RequestRecord {
    pub method: String,
    pub uri: String,
    pub host: String,
    pub getvars: VarMap,
    pub postvars: VarMap,
    pub cookies: VarMap,
    pub ip64: u64,
}

impl RequestRecord {
    /// Builds a record from the gateway environment and the (already
    /// size-capped) request body. Missing variables read as empty strings.
    pub fn from_env(env: &HashMap<String, String>, body: &[u8]) -> Self {
        let var = |key: &str| env.get(key).cloned().unwrap_or_default();
        Self {
            method: var("REQUEST_METHOD"),
            uri: var("DOCUMENT_URI"),
            host: var("HTTP_HOST"),
            getvars: parse_vars(var("QUERY_STRING").as_bytes()),
            postvars: parse_vars(body),
            cookies: parse_cookies(&var("HTTP_COOKIE")),
            ip64: client_key(&var("REMOTE_ADDR")),
        }
    }
}

/// Decodes an `application/x-www-form-urlencoded` string. Duplicate keys are
/// last-writer-wins; a piece without `=` becomes a key with an empty value.
pub fn parse_vars(input: &[u8]) -> VarMap {
    form_urlencoded::parse(input).into_owned().collect()
}

/// Decodes a `Cookie` header. Values are taken verbatim; callers that embed
/// non-token bytes must hex-encode them.
pub fn parse_cookies(input: &str) -> VarMap {
    let mut map = VarMap::new();
    for piece in input.split(';') {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }
        match piece.split_once('=') {
            Some((name, value)) => map.insert(name.to_string(), value.to_string()),
            None => map.insert(piece.to_string(), String::new()),
        };
    }
    map
}

/// Collapses a `REMOTE_ADDR` string into the limiter key.
///
/// IPv6 clients routinely hold a /64 or wider, so only the top 6 bytes of
/// the address count (one bucket per /48). IPv4 keys are the full address in
/// network byte order. Unparseable input maps to 0.
pub fn client_key(addr: &str) -> u64 {
    if let Ok(v6) = addr.parse::<Ipv6Addr>() {
        let o = v6.octets();
        return (u64::from(o[0]) << 40)
            | (u64::from(o[1]) << 32)
            | (u64::from(o[2]) << 24)
            | (u64::from(o[3]) << 16)
            | (u64::from(o[4]) << 8)
            | u64::from(o[5]);
    }
    if let Ok(v4) = addr.parse::<Ipv4Addr>() {
        return u64::from(u32::from(v4));
    }
    0
}
